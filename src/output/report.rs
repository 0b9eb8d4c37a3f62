// Mon Oct 19 2026 - Alex

use crate::memory::{Address, ModuleInfo, PointerWidth};
use crate::rtti::{ClassGraph, ClassKind, ClassMetadata, HierarchyAttributes, Pmd};
use crate::rtti::vtable::default_label;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionEntry {
    pub index: usize,
    pub address: Address,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentEntry {
    pub name: String,
    pub displacement: Pmd,
    pub tree_depth: u32,
    /// Vtable of the analyzed class this parent resolved to.
    pub resolved_vtable: Option<Address>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceEntry {
    pub name: String,
    pub vtable: Address,
    pub vtable_offset: u32,
}

/// Everything known about one class, flattened for export.
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub name: String,
    pub formatted_name: String,
    pub kind: ClassKind,
    pub mangled_name: String,
    pub locator: Address,
    pub vtable: Address,
    pub vtable_offset: u32,
    pub attributes: HierarchyAttributes,
    pub needs_review: bool,
    pub parents: Vec<ParentEntry>,
    pub interfaces: Vec<InterfaceEntry>,
    pub functions: Vec<FunctionEntry>,
    pub code_references: Vec<Address>,
    pub instances: Vec<Address>,
}

impl ClassReport {
    pub fn new(class: &ClassMetadata, graph: &ClassGraph) -> Self {
        let parents = class
            .parents
            .iter()
            .map(|p| ParentEntry {
                name: p.name.clone(),
                displacement: p.displacement,
                tree_depth: p.tree_depth,
                resolved_vtable: p.resolved.and_then(|id| graph.get(id)).map(|c| c.vtable),
            })
            .collect();

        let interfaces = graph
            .interfaces_of(class.id)
            .into_iter()
            .map(|i| InterfaceEntry {
                name: i.name.clone(),
                vtable: i.vtable,
                vtable_offset: i.vtable_offset,
            })
            .collect();

        Self {
            name: class.name.clone(),
            formatted_name: class.formatted_name.clone(),
            kind: class.kind(),
            mangled_name: class.mangled_name.clone(),
            locator: class.locator,
            vtable: class.vtable,
            vtable_offset: class.vtable_offset,
            attributes: class.attributes,
            needs_review: class.needs_review,
            parents,
            interfaces,
            functions: function_entries(class),
            code_references: class.code_references.clone(),
            instances: class.instances.clone(),
        }
    }
}

fn function_entries(class: &ClassMetadata) -> Vec<FunctionEntry> {
    class
        .functions
        .iter()
        .enumerate()
        .map(|(index, &address)| FunctionEntry {
            index,
            address,
            label: class
                .function_name(address)
                .map(str::to_string)
                .unwrap_or_else(|| default_label(address)),
        })
        .collect()
}

/// Report for a whole module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub module: String,
    pub width: PointerWidth,
    pub base: Address,
    pub generation: u64,
    pub class_count: usize,
    pub classes: Vec<ClassReport>,
}

impl ModuleReport {
    /// Top-level classes whose name contains `filter` (case-insensitive).
    pub fn new(module: &ModuleInfo, graph: &ClassGraph, filter: Option<&str>) -> Self {
        let classes: Vec<ClassReport> = match filter {
            Some(needle) => graph
                .find_all(needle)
                .into_iter()
                .filter(|c| !c.is_interface)
                .map(|c| ClassReport::new(c, graph))
                .collect(),
            None => graph.classes().map(|c| ClassReport::new(c, graph)).collect(),
        };

        Self {
            module: module.name.clone(),
            width: module.width,
            base: module.base,
            generation: graph.generation(),
            class_count: classes.len(),
            classes,
        }
    }

    pub fn to_json(&self) -> Result<String, OutputError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_text(&self, graph: &ClassGraph) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "RTTI Report: {}", self.module);
        let _ = writeln!(text, "{}", "=".repeat(60));
        let _ = writeln!(text, "Base: {} ({})", self.base, self.width);
        let _ = writeln!(text, "Classes: {}", self.class_count);

        for report in &self.classes {
            if let Some(class) = graph.find(report.vtable) {
                text.push('\n');
                text.push_str(&describe(class, graph));
            }
        }
        text
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), OutputError> {
        write_file(path, self.to_json()?.as_bytes())
    }

    pub fn save_text<P: AsRef<Path>>(&self, graph: &ClassGraph, path: P) -> Result<(), OutputError> {
        write_file(path, self.to_text(graph).as_bytes())
    }
}

fn write_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), OutputError> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    log::debug!("Wrote {} bytes to {}", bytes.len(), path.as_ref().display());
    Ok(())
}

/// Plain-text description of one class, in the layout used when copying a
/// class out of the inspector.
pub fn describe(class: &ClassMetadata, graph: &ClassGraph) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Name: {}", class.formatted_name);
    let _ = writeln!(text, "CompleteObjectLocator: {}", class.locator);

    let _ = writeln!(text, "Num Inherited: {}", class.parents.len());
    for parent in &class.parents {
        let _ = writeln!(text, "{}", parent.name);
    }

    let interfaces = graph.interfaces_of(class.id);
    let _ = writeln!(text, "Num Interfaces: {}", interfaces.len());
    for interface in interfaces {
        let _ = writeln!(text, "{}", interface.formatted_name);
    }

    let _ = writeln!(text, "Virtual Function Table: {}", class.vtable);
    let _ = writeln!(text, "Num Virtual Functions: {}", class.functions.len());
    for function in function_entries(class) {
        let _ = writeln!(text, "{} - {} : {}", function.index, function.address, function.label);
    }

    if !class.code_references.is_empty() {
        let _ = writeln!(text, "Code References: {}", class.code_references.len());
        for reference in &class.code_references {
            let _ = writeln!(text, "{}", reference);
        }
    }
    if !class.instances.is_empty() {
        let _ = writeln!(text, "Instances: {}", class.instances.len());
        for instance in &class.instances {
            let _ = writeln!(text, "{}", instance);
        }
    }
    text
}
