// Mon Oct 19 2026 - Alex

use crate::memory::{
    Address, MemoryError, MemoryRange, MemoryRegion, ModuleInfo, PointerWidth, Protection, Section,
    TargetMemory,
};

struct MappedRegion {
    region: MemoryRegion,
    bytes: Vec<u8>,
}

/// A frozen copy of a target's memory: the analyzed module plus any extra
/// regions (heap, stacks). Reads must fall entirely inside one region.
pub struct SnapshotMemory {
    module: ModuleInfo,
    regions: Vec<MappedRegion>,
}

impl SnapshotMemory {
    pub fn builder(name: impl Into<String>, base: Address, width: PointerWidth) -> SnapshotBuilder {
        SnapshotBuilder {
            module: ModuleInfo::new(name, base, width),
            regions: Vec::new(),
        }
    }

    fn region_for(&self, addr: Address, len: usize) -> Option<&MappedRegion> {
        self.regions
            .iter()
            .find(|m| m.region.range().contains_span(addr, len))
    }
}

impl TargetMemory for SnapshotMemory {
    fn module(&self) -> &ModuleInfo {
        &self.module
    }

    fn regions(&self) -> Vec<MemoryRegion> {
        self.regions.iter().map(|m| m.region.clone()).collect()
    }

    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        let mapped = self
            .region_for(addr, buf.len())
            .ok_or(MemoryError::ReadFailed { address: addr.as_u64(), size: buf.len() })?;

        let offset = (addr - mapped.region.start()) as usize;
        buf.copy_from_slice(&mapped.bytes[offset..offset + buf.len()]);
        Ok(())
    }
}

pub struct SnapshotBuilder {
    module: ModuleInfo,
    regions: Vec<MappedRegion>,
}

impl SnapshotBuilder {
    /// Adds a module section. It is also mapped as a region with matching
    /// protection so block scans see it.
    pub fn section(
        mut self,
        name: &str,
        start: Address,
        bytes: Vec<u8>,
        executable: bool,
        readonly: bool,
    ) -> Result<Self, MemoryError> {
        let end = start + bytes.len() as u64;
        self.module.sections.push(Section::new(name, start, end, executable, readonly)?);

        let mut protection = Protection::READ;
        if executable {
            protection |= Protection::EXECUTE;
        }
        if !readonly {
            protection |= Protection::WRITE;
        }
        Ok(self.region(name, start, bytes, protection))
    }

    pub fn region(mut self, name: &str, start: Address, bytes: Vec<u8>, protection: Protection) -> Self {
        let range = MemoryRange::from_start_size(start, bytes.len() as u64);
        self.regions.push(MappedRegion {
            region: MemoryRegion::new(range, protection, name),
            bytes,
        });
        self
    }

    pub fn build(mut self) -> SnapshotMemory {
        self.regions.sort_by_key(|m| m.region.start());
        SnapshotMemory {
            module: self.module,
            regions: self.regions,
        }
    }
}
