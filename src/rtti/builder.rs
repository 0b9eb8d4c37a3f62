// Mon Oct 19 2026 - Alex

use crate::config::Config;
use crate::engine::stage::{self, StageTracker};
use crate::engine::CancellationToken;
use crate::memory::{Address, TargetMemory};
use crate::rtti::demangle::demangle_type_name;
use crate::rtti::layout::{
    BaseClassDescriptor, ClassHierarchyDescriptor, CompleteObjectLocator, ReferenceResolver, TypeDescriptorHeader,
};
use crate::rtti::{
    ClassGraph, ClassId, ClassMetadata, InterfacePolicy, ParentLink, PotentialClass, RttiError, SectionSet,
    VTableWalker,
};
use std::collections::BTreeMap;

/// Upper bound on base-class array entries read per class.
const MAX_BASE_CLASSES: u32 = 0x4000;

/// Turns validated candidates into a [`ClassGraph`].
pub struct ClassGraphBuilder<'a> {
    target: &'a dyn TargetMemory,
    sections: &'a SectionSet,
    config: &'a Config,
    policy: &'a dyn InterfacePolicy,
    stage: &'a StageTracker,
    resolver: ReferenceResolver,
}

impl<'a> ClassGraphBuilder<'a> {
    pub fn new(
        target: &'a dyn TargetMemory,
        sections: &'a SectionSet,
        config: &'a Config,
        policy: &'a dyn InterfacePolicy,
        stage: &'a StageTracker,
    ) -> Self {
        Self {
            target,
            sections,
            config,
            policy,
            stage,
            resolver: ReferenceResolver::for_module(target.module()),
        }
    }

    pub fn build(&self, mut candidates: Vec<PotentialClass>, token: &CancellationToken) -> Result<ClassGraph, RttiError> {
        // stable: vtables of one type stay in address order
        candidates.sort_by(|a, b| a.demangled_name.cmp(&b.demangled_name));

        self.stage.set(stage::PROCESSING_CLASSES);
        let mut graph = ClassGraph::new();
        let mut base_arrays = Vec::with_capacity(candidates.len());
        let mut walker = VTableWalker::new(self.target, self.sections, self.config.max_virtual_functions)?;
        let mut previous: Option<ClassId> = None;

        for (i, candidate) in candidates.into_iter().enumerate() {
            if i % 256 == 0 {
                token.check()?;
            }

            let Some((mut class, base_array)) = self.read_class(candidate) else {
                continue;
            };

            let owner = previous
                .and_then(|id| graph.get(id))
                .filter(|prev| self.policy.is_interface_of(&class, prev))
                .map(|prev| prev.id);

            if let Some(owner) = owner {
                class.is_interface = true;
                class.owner = Some(owner);
                class.needs_review = true;
            }
            class.format_name();

            let functions = walker.walk(class.vtable);
            class.functions = functions.functions;
            class.function_names = functions.names;

            let id = graph.push(class);
            graph.index(id);
            base_arrays.push(base_array);

            match owner {
                Some(owner) => {
                    if let Some(owner) = graph.get_mut(owner) {
                        owner.interfaces.push(id);
                    }
                }
                None => previous = Some(id),
            }
        }

        token.check()?;
        self.stage.set(stage::PROCESSING_PARENTS);

        for (index, base_array) in base_arrays.into_iter().enumerate() {
            if index % 256 == 0 {
                token.check()?;
            }
            let id = ClassId(index);
            let Some(class) = graph.get(id) else {
                continue;
            };
            if class.num_base_classes <= 1 {
                continue;
            }

            let parents = self.read_parents(&graph, class, base_array);
            let rename = if class.is_interface {
                let offset = class.vtable_offset as i64;
                parents
                    .iter()
                    .find(|p| p.displacement.mdisp as i64 == offset)
                    .map(|p| (p.name.clone(), p.mangled_name.clone()))
            } else {
                None
            };

            if let Some(class) = graph.get_mut(id) {
                class.parents = parents;
                if let Some((name, mangled)) = rename {
                    log::debug!("Interface {} at {} resolves to {}", class.name, class.vtable, name);
                    class.formatted_name = format!("interface {} -> {}", class.name, name);
                    class.name = name;
                    class.mangled_name = mangled;
                    class.needs_review = true;
                }
            }
        }

        log::info!(
            "Found {} classes ({} interface vtables) in {}",
            graph.classes().count(),
            graph.all().iter().filter(|c| c.is_interface).count(),
            self.target.module().name
        );
        Ok(graph)
    }

    /// Reads the locator and hierarchy descriptor behind a validated
    /// candidate. Returns the class and the address of its base-class array.
    fn read_class(&self, candidate: PotentialClass) -> Option<(ClassMetadata, Address)> {
        let col = CompleteObjectLocator::read(self.target, candidate.locator)
            .map_err(|e| log::debug!("Locator at {} vanished: {}", candidate.locator, e))
            .ok()?;
        let chd = ClassHierarchyDescriptor::read(self.target, self.resolver.resolve(col.class_descriptor))
            .map_err(|e| log::debug!("Class descriptor of {} unreadable: {}", candidate.vtable, e))
            .ok()?;

        let mangled_name = candidate.mangled_name.unwrap_or_default();
        let name = candidate.demangled_name.unwrap_or_else(|| mangled_name.clone());
        let is_struct = mangled_name.as_bytes().get(3) == Some(&b'U');

        let class = ClassMetadata {
            id: ClassId(0),
            locator: candidate.locator,
            vtable: candidate.vtable,
            name,
            mangled_name,
            formatted_name: String::new(),
            vtable_offset: col.vtable_offset,
            ctor_displacement_offset: col.ctor_displacement_offset,
            num_base_classes: chd.num_base_classes,
            attributes: chd.attributes,
            is_struct,
            is_interface: false,
            functions: Vec::new(),
            function_names: BTreeMap::new(),
            parents: Vec::new(),
            interfaces: Vec::new(),
            owner: None,
            needs_review: false,
            code_references: Vec::new(),
            instances: Vec::new(),
        };
        Some((class, self.resolver.resolve(chd.base_class_array)))
    }

    /// Entry 0 of the base-class array is the class itself and is skipped.
    fn read_parents(&self, graph: &ClassGraph, class: &ClassMetadata, base_array: Address) -> Vec<ParentLink> {
        let count = class.num_base_classes.min(MAX_BASE_CLASSES);
        let mut parents = Vec::with_capacity(count as usize);
        let mut last_displacement = 0i32;
        let mut depth = 0u32;

        for i in 1..count {
            let entry = base_array + 4 * i as u64;
            let bcd = match self
                .target
                .read_u32(entry)
                .and_then(|raw| BaseClassDescriptor::read(self.target, self.resolver.resolve(raw)))
            {
                Ok(bcd) => bcd,
                Err(e) => {
                    log::debug!("Base class {} of {} unreadable: {}", i, class.name, e);
                    continue;
                }
            };

            let type_descriptor = self.resolver.resolve(bcd.type_descriptor);
            let mangled_name =
                match TypeDescriptorHeader::read_name(self.target, type_descriptor, self.config.max_name_length) {
                    Ok(raw) => String::from_utf8_lossy(&raw).into_owned(),
                    Err(e) => {
                        log::debug!("Base class name of {} unreadable: {}", class.name, e);
                        continue;
                    }
                };
            let name = demangle_type_name(&mangled_name);

            if bcd.displacement.mdisp == last_displacement {
                depth += 1;
            } else {
                last_displacement = bcd.displacement.mdisp;
                depth = 0;
            }

            parents.push(ParentLink {
                resolved: graph.find_first(&name).map(|c| c.id),
                name,
                mangled_name,
                num_contained_bases: bcd.num_contained_bases,
                displacement: bcd.displacement,
                attributes: bcd.attributes,
                tree_depth: depth,
                child: class.id,
            });
        }

        parents
    }
}
