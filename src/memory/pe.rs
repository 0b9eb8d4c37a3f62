// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryError, PointerWidth, SnapshotMemory};
use goblin::pe::section_table::{IMAGE_SCN_MEM_EXECUTE, IMAGE_SCN_MEM_READ, IMAGE_SCN_MEM_WRITE};
use goblin::pe::PE;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Loads a PE module from disk and lays it out the way the loader would, so
/// an on-disk image can be analyzed like a mapped module.
pub struct PeImage;

impl PeImage {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SnapshotMemory, MemoryError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file) }?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());

        Self::from_bytes(&name, &mmap)
    }

    pub fn from_bytes(name: &str, data: &[u8]) -> Result<SnapshotMemory, MemoryError> {
        let pe = PE::parse(data)
            .map_err(|e| MemoryError::BinaryParseError(format!("Failed to parse PE: {}", e)))?;

        let width = if pe.is_64 { PointerWidth::Bits64 } else { PointerWidth::Bits32 };
        let base = Address::new(pe.image_base as u64);
        let mut builder = SnapshotMemory::builder(name, base, width);

        for section in &pe.sections {
            let section_name = section.name().unwrap_or("<invalid>").to_string();
            let virtual_size = section.virtual_size.max(section.size_of_raw_data) as usize;
            if virtual_size == 0 {
                continue;
            }

            let mut bytes = vec![0u8; virtual_size];
            let raw_start = section.pointer_to_raw_data as usize;
            let raw_len = (section.size_of_raw_data as usize)
                .min(virtual_size)
                .min(data.len().saturating_sub(raw_start));
            if raw_len > 0 {
                bytes[..raw_len].copy_from_slice(&data[raw_start..raw_start + raw_len]);
            }

            let flags = section.characteristics;
            let executable = flags & IMAGE_SCN_MEM_EXECUTE != 0;
            let readonly = flags & IMAGE_SCN_MEM_READ != 0 && flags & IMAGE_SCN_MEM_WRITE == 0;
            let start = base + section.virtual_address as u64;

            log::debug!(
                "Mapped section {} at {} ({} bytes, exec={}, readonly={})",
                section_name, start, virtual_size, executable, readonly
            );
            builder = builder.section(&section_name, start, bytes, executable, readonly)?;
        }

        Ok(builder.build())
    }
}
