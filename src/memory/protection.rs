// Mon Oct 19 2026 - Alex

use bitflags::bitflags;
use std::fmt;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Protection: u32 {
        const READ = 1;
        const WRITE = 2;
        const EXECUTE = 4;
    }
}

impl Protection {
    pub const READ_WRITE: Self = Self::READ.union(Self::WRITE);
    pub const READ_EXECUTE: Self = Self::READ.union(Self::EXECUTE);

    pub fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn can_execute(self) -> bool {
        self.contains(Self::EXECUTE)
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.can_read() { 'r' } else { '-' },
            if self.can_write() { 'w' } else { '-' },
            if self.can_execute() { 'x' } else { '-' },
        )
    }
}
