// Mon Oct 19 2026 - Alex

use crate::engine::CancellationToken;
use crate::memory::{Address, TargetMemory};
use crate::rtti::{RttiError, SectionSet};
use itertools::Itertools;

/// A `{locator, vtable}` pair that looks like RTTI by section membership alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotentialClass {
    pub locator: Address,
    pub vtable: Address,
    pub mangled_name: Option<String>,
    pub demangled_name: Option<String>,
}

impl PotentialClass {
    pub fn new(locator: Address, vtable: Address) -> Self {
        Self { locator, vtable, mangled_name: None, demangled_name: None }
    }
}

pub(crate) fn scratch_buffer(size: usize) -> Result<Vec<u8>, RttiError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| RttiError::Allocation { size })?;
    buf.resize(size, 0);
    Ok(buf)
}

/// Sweeps read-only sections for a pointer into read-only data directly
/// followed by a pointer into code: the locator slot in front of a vtable.
pub struct CandidateScanner<'a> {
    target: &'a dyn TargetMemory,
    sections: &'a SectionSet,
}

impl<'a> CandidateScanner<'a> {
    pub fn new(target: &'a dyn TargetMemory, sections: &'a SectionSet) -> Self {
        Self { target, sections }
    }

    pub fn scan(&self, token: &CancellationToken) -> Result<Vec<PotentialClass>, RttiError> {
        let width = self.target.module().width;
        let ptr = width.size();

        let largest = self.sections.readonly().iter().map(|s| s.size()).max().unwrap_or(0);
        let mut buffer = scratch_buffer(largest as usize)?;
        let mut candidates = Vec::new();

        for section in self.sections.readonly() {
            token.check()?;

            let size = section.size() as usize;
            let bytes = &mut buffer[..size];
            bytes.fill(0);
            if let Err(e) = self.target.read_into(section.start(), bytes) {
                log::warn!("Could not read section {}: {}", section.name(), e);
                continue;
            }

            let before = candidates.len();
            for ((_, locator), (slot, function)) in bytes
                .chunks_exact(ptr)
                .filter_map(|chunk| width.read_pointer(chunk))
                .enumerate()
                .tuple_windows()
            {
                if locator == 0 {
                    continue;
                }
                if self.sections.in_readonly(Address::new(locator))
                    && self.sections.in_executable(Address::new(function))
                {
                    let vtable = section.start() + (slot * ptr) as u64;
                    candidates.push(PotentialClass::new(Address::new(locator), vtable));
                }
            }

            log::debug!("{}: {} potential classes", section.name(), candidates.len() - before);
        }

        log::info!(
            "Found {} potential classes in {}",
            candidates.len(),
            self.target.module().name
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{PointerWidth, SnapshotMemory};
    use crate::rtti::fixture::{FailingReads, RttiImageBuilder};

    #[test]
    fn test_candidates_are_well_formed() {
        let image = RttiImageBuilder::new(PointerWidth::Bits64)
            .class(".?AVBase@@", 3)
            .class(".?AVDerived@@", 2)
            .build();
        let sections = SectionSet::classify(&image.memory.module().sections);

        let candidates = CandidateScanner::new(&image.memory, &sections)
            .scan(&CancellationToken::new())
            .unwrap();

        assert!(candidates.len() >= 2);
        for candidate in &candidates {
            assert!(sections.in_readonly(candidate.locator));
            let target = image.memory.read_pointer(candidate.vtable).unwrap();
            assert!(sections.in_executable(target));
        }
        for vtable in image.vtables() {
            assert!(candidates.iter().any(|c| c.vtable == vtable));
        }
    }

    #[test]
    fn test_vtable_address_comes_from_position() {
        let base = Address::new(0x400000);
        let mut rdata = Vec::new();
        for value in [0u64, 0x402010, 0x401000, 0x401004, 0] {
            PointerWidth::Bits32.write_pointer(value, &mut rdata);
        }
        let memory = SnapshotMemory::builder("tiny.exe", base, PointerWidth::Bits32)
            .section(".text", Address::new(0x401000), vec![0xCC; 0x100], true, false)
            .unwrap()
            .section(".rdata", Address::new(0x402000), rdata, false, true)
            .unwrap()
            .build();
        let sections = SectionSet::classify(&memory.module().sections);

        let candidates = CandidateScanner::new(&memory, &sections)
            .scan(&CancellationToken::new())
            .unwrap();

        assert_eq!(candidates, vec![PotentialClass::new(Address::new(0x402010), Address::new(0x402008))]);
    }

    #[test]
    fn test_cancelled_scan_stops() {
        let image = RttiImageBuilder::new(PointerWidth::Bits32).class(".?AVBase@@", 1).build();
        let sections = SectionSet::classify(&image.memory.module().sections);
        let token = CancellationToken::new();
        token.cancel();

        let result = CandidateScanner::new(&image.memory, &sections).scan(&token);
        assert!(matches!(result, Err(RttiError::Cancelled)));
    }

    #[test]
    fn test_unreadable_section_is_skipped() {
        let mut rdata = Vec::new();
        for value in [0u64, 0x402010, 0x401000, 0x401004, 0] {
            PointerWidth::Bits32.write_pointer(value, &mut rdata);
        }
        let mut rdata2 = Vec::new();
        for value in [0x403008u64, 0x401008, 0, 0] {
            PointerWidth::Bits32.write_pointer(value, &mut rdata2);
        }
        let memory = SnapshotMemory::builder("tiny.exe", Address::new(0x400000), PointerWidth::Bits32)
            .section(".text", Address::new(0x401000), vec![0xCC; 0x100], true, false)
            .unwrap()
            .section(".rdata", Address::new(0x402000), rdata, false, true)
            .unwrap()
            .section(".rdata2", Address::new(0x403000), rdata2, false, true)
            .unwrap()
            .build();
        let memory = FailingReads::new(memory).fail_section(".rdata");
        let sections = SectionSet::classify(&memory.module().sections);
        assert_eq!(sections.readonly().len(), 2);

        let candidates = CandidateScanner::new(&memory, &sections)
            .scan(&CancellationToken::new())
            .unwrap();

        assert_eq!(candidates, vec![PotentialClass::new(Address::new(0x403008), Address::new(0x403004))]);
    }

    #[test]
    fn test_oversized_scratch_buffer_is_an_error() {
        assert!(matches!(scratch_buffer(usize::MAX), Err(RttiError::Allocation { size: usize::MAX })));
        assert_eq!(scratch_buffer(16).unwrap(), vec![0u8; 16]);
    }
}
