// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryRegion, PointerWidth};
use serde::Serialize;
use std::fmt;

/// What a scan looks for. The kinds only differ in which blocks they read,
/// how far they step and how bytes turn into a candidate vtable address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    /// rip-relative displacements on 64-bit, absolute operands on 32-bit
    CodeReference,
    /// objects whose first field is the vtable pointer
    Instance,
}

impl ScanKind {
    pub const ALL: [ScanKind; 2] = [ScanKind::CodeReference, ScanKind::Instance];

    pub fn wants(self, region: &MemoryRegion) -> bool {
        match self {
            Self::CodeReference => region.is_executable(),
            Self::Instance => region.is_readable() && !region.is_executable(),
        }
    }

    pub fn step(self, width: PointerWidth) -> usize {
        match self {
            Self::CodeReference => 1,
            Self::Instance => width.size(),
        }
    }

    /// Bytes consumed per candidate.
    pub fn window(self, width: PointerWidth) -> usize {
        match self {
            Self::CodeReference => 4,
            Self::Instance => width.size(),
        }
    }

    /// Decodes the candidate at the front of `bytes`, found at `location`.
    /// Candidates not aligned to the pointer size are dropped.
    pub fn candidate(self, width: PointerWidth, bytes: &[u8], location: Address) -> Option<Address> {
        let value = match (self, width) {
            (Self::CodeReference, PointerWidth::Bits64) => {
                let raw: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
                let displacement = i32::from_le_bytes(raw) as i64;
                location.offset(4 + displacement)
            }
            (Self::CodeReference, PointerWidth::Bits32) => {
                let raw: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
                Address::new(u32::from_le_bytes(raw) as u64)
            }
            (Self::Instance, _) => Address::new(width.read_pointer(bytes)?),
        };

        if value.is_null() || !value.is_aligned(width.size()) {
            return None;
        }
        Some(value)
    }

    /// Every `(location, candidate)` pair in one block.
    pub fn candidates<'a>(
        self,
        width: PointerWidth,
        block_address: Address,
        bytes: &'a [u8],
    ) -> impl Iterator<Item = (Address, Address)> + 'a {
        let window = self.window(width);
        let step = self.step(width);
        let last = bytes.len().checked_sub(window);

        last.into_iter()
            .flat_map(move |last| (0..=last).step_by(step))
            .filter_map(move |offset| {
                let location = block_address + offset as u64;
                self.candidate(width, &bytes[offset..], location)
                    .map(|target| (location, target))
            })
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CodeReference => write!(f, "code references"),
            Self::Instance => write!(f, "instances"),
        }
    }
}
