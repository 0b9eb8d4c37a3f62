// Mon Oct 19 2026 - Alex

pub mod address;
pub mod block;
pub mod error;
pub mod pe;
pub mod protection;
pub mod range;
pub mod region;
pub mod section;
pub mod snapshot;
pub mod traits;

pub use address::Address;
pub use block::{AsyncBlockReader, MemoryBlock, PendingBlock};
pub use error::MemoryError;
pub use pe::PeImage;
pub use protection::Protection;
pub use range::MemoryRange;
pub use region::MemoryRegion;
pub use section::{ModuleInfo, PointerWidth, Section};
pub use snapshot::{SnapshotBuilder, SnapshotMemory};
pub use traits::TargetMemory;
