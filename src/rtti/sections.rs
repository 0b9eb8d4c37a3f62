// Mon Oct 19 2026 - Alex

use crate::memory::{Address, Section};

/// The two section views every RTTI heuristic filters against.
#[derive(Debug, Clone, Default)]
pub struct SectionSet {
    executable: Vec<Section>,
    readonly: Vec<Section>,
}

impl SectionSet {
    /// Splits a module's sections. A section flagged both executable and
    /// read-only only counts as executable.
    pub fn classify(sections: &[Section]) -> Self {
        let mut set = Self::default();

        for section in sections {
            if section.is_executable() {
                set.executable.push(section.clone());
            } else if section.is_readonly() {
                set.readonly.push(section.clone());
            }
        }

        log::debug!(
            "Classified {} sections: {} executable, {} read-only",
            sections.len(),
            set.executable.len(),
            set.readonly.len()
        );
        set
    }

    pub fn executable(&self) -> &[Section] {
        &self.executable
    }

    pub fn readonly(&self) -> &[Section] {
        &self.readonly
    }

    /// Both views must be populated for any class to be found.
    pub fn is_usable(&self) -> bool {
        !self.executable.is_empty() && !self.readonly.is_empty()
    }

    pub fn in_executable(&self, addr: Address) -> bool {
        self.executable.iter().any(|s| s.contains(addr))
    }

    pub fn in_readonly(&self, addr: Address) -> bool {
        self.readonly.iter().any(|s| s.contains(addr))
    }

    pub fn executable_containing(&self, addr: Address) -> Option<&Section> {
        self.executable.iter().find(|s| s.contains(addr))
    }
}
