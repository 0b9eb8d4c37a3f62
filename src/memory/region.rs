// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryRange, Protection};
use std::fmt;

/// One committed range of the target's address space.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    range: MemoryRange,
    protection: Protection,
    name: String,
}

impl MemoryRegion {
    pub fn new(range: MemoryRange, protection: Protection, name: impl Into<String>) -> Self {
        Self { range, protection, name: name.into() }
    }

    pub fn range(&self) -> &MemoryRange {
        &self.range
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> Address {
        self.range.start()
    }

    pub fn end(&self) -> Address {
        self.range.end()
    }

    pub fn size(&self) -> u64 {
        self.range.size()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.range.contains(addr)
    }

    pub fn is_executable(&self) -> bool {
        self.protection.can_execute()
    }

    pub fn is_readable(&self) -> bool {
        self.protection.can_read()
    }

    pub fn is_writable(&self) -> bool {
        self.protection.can_write()
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.range, self.protection, self.name)
    }
}
