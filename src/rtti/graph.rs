// Mon Oct 19 2026 - Alex

use crate::memory::Address;
use crate::rtti::{ClassId, ClassMetadata, RttiError};
use ahash::AHashMap;
use indexmap::IndexMap;

/// Every class recovered from one module, with lookup indices.
///
/// Classes live in one arena and refer to each other through [`ClassId`]s.
/// The name index is a multi-map in insertion order: the first class
/// inserted under a name wins [`find_first`](Self::find_first).
#[derive(Debug, Default, Clone)]
pub struct ClassGraph {
    classes: Vec<ClassMetadata>,
    by_vtable: AHashMap<Address, ClassId>,
    by_name: IndexMap<String, Vec<ClassId>>,
    generation: u64,
}

impl ClassGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Adds a class to the arena, assigning its id. Not indexed yet.
    pub(crate) fn push(&mut self, mut class: ClassMetadata) -> ClassId {
        let id = ClassId(self.classes.len());
        class.id = id;
        self.classes.push(class);
        id
    }

    /// Indexes a class by vtable and by its current name.
    pub(crate) fn index(&mut self, id: ClassId) {
        let Some(class) = self.classes.get(id.0) else {
            return;
        };
        if let Some(previous) = self.by_vtable.insert(class.vtable, id) {
            log::warn!("Duplicate vtable {} ({} replaces {})", class.vtable, id, previous);
        }
        self.by_name.entry(class.name.clone()).or_default().push(id);
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassMetadata> {
        self.classes.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: ClassId) -> Option<&mut ClassMetadata> {
        self.classes.get_mut(id.0)
    }

    /// Top-level classes; interface vtables hang off their owner.
    pub fn classes(&self) -> impl Iterator<Item = &ClassMetadata> {
        self.classes.iter().filter(|c| !c.is_interface)
    }

    pub fn all(&self) -> &[ClassMetadata] {
        &self.classes
    }

    pub fn id_for_vtable(&self, vtable: Address) -> Option<ClassId> {
        self.by_vtable.get(&vtable).copied()
    }

    pub fn vtable_index(&self) -> &AHashMap<Address, ClassId> {
        &self.by_vtable
    }

    pub fn find(&self, vtable: Address) -> Option<&ClassMetadata> {
        self.id_for_vtable(vtable).and_then(|id| self.get(id))
    }

    pub fn find_first(&self, name: &str) -> Option<&ClassMetadata> {
        self.by_name
            .get(name)
            .and_then(|ids| ids.first())
            .and_then(|&id| self.get(id))
    }

    /// Every class whose name contains `needle`, ignoring case.
    pub fn find_all(&self, needle: &str) -> Vec<&ClassMetadata> {
        let needle = needle.to_lowercase();
        self.by_name
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains(&needle))
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|&id| self.get(id))
            .collect()
    }

    pub fn find_child_classes(&self, parent: ClassId) -> Vec<&ClassMetadata> {
        self.classes
            .iter()
            .filter(|c| c.parents.iter().any(|p| p.resolved == Some(parent)))
            .collect()
    }

    pub fn interfaces_of(&self, id: ClassId) -> Vec<&ClassMetadata> {
        self.get(id)
            .map(|c| c.interfaces.iter().filter_map(|&i| self.get(i)).collect())
            .unwrap_or_default()
    }

    pub fn rename_function(&mut self, vtable: Address, function: Address, label: &str) -> Result<(), RttiError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(RttiError::EmptyLabel);
        }

        let class = self
            .id_for_vtable(vtable)
            .and_then(|id| self.classes.get_mut(id.0))
            .ok_or(RttiError::ClassNotFound(vtable.as_u64()))?;

        match class.function_names.get_mut(&function) {
            Some(name) => {
                *name = label.to_string();
                Ok(())
            }
            None => Err(RttiError::FunctionNotFound { vtable: vtable.as_u64(), function: function.as_u64() }),
        }
    }

    pub fn clear_scan_results(&mut self) {
        for class in &mut self.classes {
            class.code_references.clear();
            class.instances.clear();
        }
    }
}
