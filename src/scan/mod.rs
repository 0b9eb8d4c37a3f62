// Mon Oct 19 2026 - Alex

pub mod reference;
pub mod strategy;

pub use reference::{ReferenceScanner, ScanResults};
pub use strategy::ScanKind;
