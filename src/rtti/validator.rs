// Mon Oct 19 2026 - Alex

use crate::config::Config;
use crate::engine::CancellationToken;
use crate::memory::TargetMemory;
use crate::rtti::demangle::demangle_type_name;
use crate::rtti::layout::{expected_signature, CompleteObjectLocator, ReferenceResolver, TypeDescriptorHeader};
use crate::rtti::{PotentialClass, RttiError, SectionSet};

/// Why a candidate was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnreadableLocator,
    Signature,
    TypeDescriptorOutsideData,
    UnreadableTypeDescriptor,
    NotTypeInfo,
    BadName,
}

pub struct RttiValidator<'a> {
    target: &'a dyn TargetMemory,
    sections: &'a SectionSet,
    resolver: ReferenceResolver,
    max_name_length: usize,
    printable_names_only: bool,
}

impl<'a> RttiValidator<'a> {
    pub fn new(target: &'a dyn TargetMemory, sections: &'a SectionSet, config: &Config) -> Self {
        Self {
            target,
            sections,
            resolver: ReferenceResolver::for_module(target.module()),
            max_name_length: config.max_name_length,
            printable_names_only: config.printable_names_only,
        }
    }

    /// Checks the RTTI records behind one candidate and fills in its names.
    pub fn check(&self, candidate: &mut PotentialClass) -> Result<(), Rejection> {
        let col = CompleteObjectLocator::read(self.target, candidate.locator)
            .map_err(|_| Rejection::UnreadableLocator)?;

        if col.signature != expected_signature(self.target.module().width) {
            return Err(Rejection::Signature);
        }

        let type_descriptor = self.resolver.resolve(col.type_descriptor);
        if !self.sections.in_readonly(type_descriptor) {
            return Err(Rejection::TypeDescriptorOutsideData);
        }

        let header = TypeDescriptorHeader::read(self.target, type_descriptor)
            .map_err(|_| Rejection::UnreadableTypeDescriptor)?;
        if !self.sections.in_readonly(header.vtable_pointer) {
            return Err(Rejection::NotTypeInfo);
        }

        let raw = TypeDescriptorHeader::read_name(self.target, type_descriptor, self.max_name_length)
            .map_err(|_| Rejection::BadName)?;
        if raw.is_empty() || (self.printable_names_only && !is_printable(&raw)) {
            return Err(Rejection::BadName);
        }

        let mangled = String::from_utf8_lossy(&raw).into_owned();
        candidate.demangled_name = Some(demangle_type_name(&mangled));
        candidate.mangled_name = Some(mangled);
        Ok(())
    }

    pub fn validate(
        &self,
        candidates: Vec<PotentialClass>,
        token: &CancellationToken,
    ) -> Result<Vec<PotentialClass>, RttiError> {
        let total = candidates.len();
        let mut valid = Vec::with_capacity(total);

        for (i, mut candidate) in candidates.into_iter().enumerate() {
            if i % 1024 == 0 {
                token.check()?;
            }
            match self.check(&mut candidate) {
                Ok(()) => valid.push(candidate),
                Err(reason) => log::trace!("Rejected {} at {}: {:?}", candidate.vtable, candidate.locator, reason),
            }
        }

        log::info!("Found {} valid classes out of {} candidates", valid.len(), total);
        Ok(valid)
    }
}

fn is_printable(name: &[u8]) -> bool {
    name.iter().all(|b| (0x20..0x7f).contains(b))
}
