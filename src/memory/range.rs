// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRange {
    start: Address,
    end: Address,
}

impl MemoryRange {
    pub fn new(start: Address, end: Address) -> Result<Self, MemoryError> {
        if end < start {
            return Err(MemoryError::InvalidRange { start: start.as_u64(), end: end.as_u64() });
        }
        Ok(Self { start, end })
    }

    pub fn from_start_size(start: Address, size: u64) -> Self {
        Self { start, end: start + size }
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.is_within_range(self.start, self.end)
    }

    /// True when `[addr, addr + len)` lies entirely inside the range.
    pub fn contains_span(&self, addr: Address, len: usize) -> bool {
        addr >= self.start
            && addr.as_u64().checked_add(len as u64).map_or(false, |end| end <= self.end.as_u64())
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_range() {
        assert!(MemoryRange::new(Address::new(0x2000), Address::new(0x1000)).is_err());
        assert!(MemoryRange::new(Address::new(0x1000), Address::new(0x1000)).unwrap().is_empty());
    }

    #[test]
    fn test_contains_span() {
        let range = MemoryRange::from_start_size(Address::new(0x1000), 0x100);
        assert!(range.contains_span(Address::new(0x1000), 0x100));
        assert!(!range.contains_span(Address::new(0x10f8), 0x10));
        assert!(!range.contains_span(Address::new(0xff8), 0x10));
        assert!(!range.contains_span(Address::new(u64::MAX - 2), 8));
    }
}
