// Mon Oct 19 2026 - Alex

pub mod gate;
pub mod session;
pub mod stage;
pub mod task;

pub use gate::{Gate, GateGuard};
pub use session::RttiSession;
pub use stage::{StageState, StageTracker};
pub use task::{CancellationToken, TaskHandle};
