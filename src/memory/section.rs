// Mon Oct 19 2026 - Alex

use crate::memory::{Address, MemoryError, MemoryRange};
use serde::Serialize;
use std::fmt;

/// Pointer width of the analyzed target. Never derived from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PointerWidth {
    Bits32,
    Bits64,
}

impl PointerWidth {
    pub const fn size(self) -> usize {
        match self {
            Self::Bits32 => 4,
            Self::Bits64 => 8,
        }
    }

    pub fn is_64(self) -> bool {
        self == Self::Bits64
    }

    /// Decodes one little-endian pointer from the front of `bytes`.
    pub fn read_pointer(self, bytes: &[u8]) -> Option<u64> {
        match self {
            Self::Bits32 => bytes
                .get(..4)
                .and_then(|b| b.try_into().ok())
                .map(|b| u32::from_le_bytes(b) as u64),
            Self::Bits64 => bytes
                .get(..8)
                .and_then(|b| b.try_into().ok())
                .map(u64::from_le_bytes),
        }
    }

    pub fn write_pointer(self, value: u64, out: &mut Vec<u8>) {
        match self {
            Self::Bits32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
            Self::Bits64 => out.extend_from_slice(&value.to_le_bytes()),
        }
    }
}

impl fmt::Display for PointerWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bits32 => write!(f, "32-bit"),
            Self::Bits64 => write!(f, "64-bit"),
        }
    }
}

/// A section of the analyzed module as described by its image headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    range: MemoryRange,
    executable: bool,
    readonly: bool,
}

impl Section {
    pub fn new(
        name: impl Into<String>,
        start: Address,
        end: Address,
        executable: bool,
        readonly: bool,
    ) -> Result<Self, MemoryError> {
        Ok(Self {
            name: name.into(),
            range: MemoryRange::new(start, end)?,
            executable,
            readonly,
        })
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

    pub fn range(&self) -> &MemoryRange {
        &self.range
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.range.contains(addr)
    }

    pub fn is_executable(&self) -> bool {
        self.executable
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}{}",
            self.name,
            self.range,
            if self.readonly { "ro" } else { "rw" },
            if self.executable { "x" } else { "" }
        )
    }
}

/// The module a session is bound to.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub base: Address,
    pub width: PointerWidth,
    pub sections: Vec<Section>,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>, base: Address, width: PointerWidth) -> Self {
        Self { name: name.into(), base, width, sections: Vec::new() }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn section_containing(&self, addr: Address) -> Option<&Section> {
        self.sections.iter().find(|s| s.contains(addr))
    }
}
