// Mon Oct 19 2026 - Alex

pub mod report;

pub use report::{describe, ClassReport, FunctionEntry, InterfaceEntry, ModuleReport, OutputError, ParentEntry};
