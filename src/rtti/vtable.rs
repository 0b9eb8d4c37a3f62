// Mon Oct 19 2026 - Alex

use crate::memory::{Address, TargetMemory};
use crate::rtti::candidate::scratch_buffer;
use crate::rtti::{RttiError, SectionSet};
use std::collections::BTreeMap;

/// Virtual functions of one vtable, in slot order, with default labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualFunctions {
    pub functions: Vec<Address>,
    pub names: BTreeMap<Address, String>,
}

pub fn default_label(function: Address) -> String {
    format!("sub_{:x}", function.as_u64())
}

/// Reads vtable slots until a null or non-code pointer.
pub struct VTableWalker<'a> {
    target: &'a dyn TargetMemory,
    sections: &'a SectionSet,
    max_slots: usize,
    buffer: Vec<u8>,
}

impl<'a> VTableWalker<'a> {
    pub fn new(target: &'a dyn TargetMemory, sections: &'a SectionSet, max_slots: usize) -> Result<Self, RttiError> {
        let buffer = scratch_buffer(max_slots * target.module().width.size())?;
        Ok(Self { target, sections, max_slots, buffer })
    }

    pub fn walk(&mut self, vtable: Address) -> VirtualFunctions {
        let width = self.target.module().width;
        let ptr = width.size();

        // never read past the section holding the vtable
        let available = self
            .target
            .module()
            .section_containing(vtable)
            .map(|s| ((s.end() - vtable) as usize / ptr).min(self.max_slots))
            .unwrap_or(self.max_slots);

        let bytes = &mut self.buffer[..available * ptr];
        bytes.fill(0);
        if let Err(e) = self.target.read_into(vtable, bytes) {
            log::debug!("Could not read vtable {}: {}", vtable, e);
            return VirtualFunctions::default();
        }

        let mut result = VirtualFunctions::default();
        for slot in bytes.chunks_exact(ptr) {
            let Some(value) = width.read_pointer(slot) else {
                break;
            };
            let function = Address::new(value);
            if function.is_null() || !self.sections.in_executable(function) {
                break;
            }
            result.functions.push(function);
            result.names.entry(function).or_insert_with(|| default_label(function));
        }
        result
    }
}
