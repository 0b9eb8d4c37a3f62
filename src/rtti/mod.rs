// Mon Oct 19 2026 - Alex

pub mod builder;
pub mod candidate;
pub mod class;
pub mod demangle;
pub mod error;
pub mod graph;
pub mod layout;
pub mod policy;
pub mod sections;
pub mod validator;
pub mod vtable;

#[cfg(test)]
pub mod fixture;

pub use builder::ClassGraphBuilder;
pub use candidate::{CandidateScanner, PotentialClass};
pub use class::{ClassId, ClassKind, ClassMetadata, ParentLink};
pub use demangle::demangle_type_name;
pub use error::RttiError;
pub use graph::ClassGraph;
pub use layout::{HierarchyAttributes, Pmd};
pub use policy::{policy_for, InterfacePolicy, NeverMerge, SameNameMultipleInheritance};
pub use sections::SectionSet;
pub use validator::{Rejection, RttiValidator};
pub use vtable::{VTableWalker, VirtualFunctions};
