// Mon Oct 19 2026 - Alex

use crate::config::InterfacePolicyKind;
use crate::rtti::ClassMetadata;

/// Decides whether a vtable is a secondary (interface) vtable of the class
/// that was retained right before it in name order.
pub trait InterfacePolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_interface_of(&self, candidate: &ClassMetadata, previous: &ClassMetadata) -> bool;
}

/// Same demangled name as the previous class and flagged multiple
/// inheritance. Matches what MSVC emits for secondary vtables, but two
/// distinct classes sharing a name after decoration stripping merge too.
#[derive(Debug, Clone, Copy, Default)]
pub struct SameNameMultipleInheritance;

impl InterfacePolicy for SameNameMultipleInheritance {
    fn name(&self) -> &'static str {
        "same_name_multiple_inheritance"
    }

    fn is_interface_of(&self, candidate: &ClassMetadata, previous: &ClassMetadata) -> bool {
        candidate.name == previous.name && candidate.is_multiple_inheritance()
    }
}

/// Every vtable becomes a top-level class.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverMerge;

impl InterfacePolicy for NeverMerge {
    fn name(&self) -> &'static str {
        "never_merge"
    }

    fn is_interface_of(&self, _candidate: &ClassMetadata, _previous: &ClassMetadata) -> bool {
        false
    }
}

pub fn policy_for(kind: InterfacePolicyKind) -> Box<dyn InterfacePolicy> {
    match kind {
        InterfacePolicyKind::SameNameMultipleInheritance => Box::new(SameNameMultipleInheritance),
        InterfacePolicyKind::NeverMerge => Box::new(NeverMerge),
    }
}
