// Mon Oct 19 2026 - Alex

use crate::memory::MemoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RttiError {
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
    #[error("Out of memory allocating a {size} byte scratch buffer")]
    Allocation { size: usize },
    #[error("No class with vtable 0x{0:x}")]
    ClassNotFound(u64),
    #[error("Class with vtable 0x{vtable:x} has no virtual function 0x{function:x}")]
    FunctionNotFound { vtable: u64, function: u64 },
    #[error("Function label must not be empty")]
    EmptyLabel,
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),
    #[error("Background task panicked: {0}")]
    TaskPanicked(String),
}
