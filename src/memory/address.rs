// Mon Oct 19 2026 - Alex

use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address {
    value: u64,
}

impl Address {
    pub const fn new(value: u64) -> Self {
        Self { value }
    }

    pub const fn zero() -> Self {
        Self { value: 0 }
    }

    pub const fn as_u64(&self) -> u64 {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value == 0
    }

    pub fn is_aligned(&self, alignment: usize) -> bool {
        alignment == 0 || self.value % alignment as u64 == 0
    }

    pub fn align_down(&self, alignment: usize) -> Self {
        Self { value: self.value & !(alignment as u64 - 1) }
    }

    pub fn align_up(&self, alignment: usize) -> Self {
        Self { value: (self.value + alignment as u64 - 1) & !(alignment as u64 - 1) }
    }

    /// Signed displacement, wrapping like the target's pointer arithmetic.
    pub fn offset(&self, offset: i64) -> Self {
        Self { value: self.value.wrapping_add(offset as u64) }
    }

    pub fn is_within_range(&self, start: Self, end: Self) -> bool {
        self.value >= start.value && self.value < end.value
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.value, f)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:x}", self.value))
    }
}

impl Add<u64> for Address {
    type Output = Self;
    fn add(self, rhs: u64) -> Self::Output {
        Self { value: self.value.wrapping_add(rhs) }
    }
}

impl Sub<u64> for Address {
    type Output = Self;
    fn sub(self, rhs: u64) -> Self::Output {
        Self { value: self.value.wrapping_sub(rhs) }
    }
}

impl Sub<Address> for Address {
    type Output = u64;
    fn sub(self, rhs: Address) -> Self::Output {
        self.value.wrapping_sub(rhs.value)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.value
    }
}
