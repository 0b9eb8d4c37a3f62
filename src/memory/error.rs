// Mon Oct 19 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Read failed at address 0x{address:x} ({size} bytes)")]
    ReadFailed { address: u64, size: usize },
    #[error("Invalid memory range: 0x{start:x} - 0x{end:x}")]
    InvalidRange { start: u64, end: u64 },
    #[error("Binary parse error: {0}")]
    BinaryParseError(String),
}
