// Mon Oct 19 2026 - Alex

pub mod config;
pub mod engine;
pub mod memory;
pub mod output;
pub mod rtti;
pub mod scan;
pub mod utils;

pub use config::{Config, InterfacePolicyKind};
pub use engine::{CancellationToken, RttiSession, StageState, TaskHandle};
pub use memory::{Address, PeImage, PointerWidth, SnapshotMemory, TargetMemory};
pub use output::{ClassReport, ModuleReport};
pub use rtti::{ClassGraph, ClassId, ClassMetadata, RttiError};
pub use scan::{ReferenceScanner, ScanKind, ScanResults};
