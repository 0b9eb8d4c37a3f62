// Mon Oct 19 2026 - Alex

use crate::memory::Address;
use crate::rtti::layout::{HierarchyAttributes, Pmd};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Handle of a class inside one [`ClassGraph`](crate::rtti::ClassGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClassId(pub(crate) usize);

impl ClassId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Class,
    Struct,
    Interface,
}

impl ClassKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Interface => "interface",
        }
    }
}

/// One entry of a class's base-class array.
#[derive(Debug, Clone, Serialize)]
pub struct ParentLink {
    pub name: String,
    pub mangled_name: String,
    pub num_contained_bases: u32,
    pub displacement: Pmd,
    pub attributes: u32,
    /// Position inside a run of bases sharing the same member displacement.
    pub tree_depth: u32,
    pub child: ClassId,
    /// The analyzed class with this name, if there is one.
    pub resolved: Option<ClassId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassMetadata {
    pub id: ClassId,
    pub locator: Address,
    pub vtable: Address,
    pub name: String,
    pub mangled_name: String,
    pub formatted_name: String,
    pub vtable_offset: u32,
    pub ctor_displacement_offset: u32,
    pub num_base_classes: u32,
    pub attributes: HierarchyAttributes,
    pub is_struct: bool,
    pub is_interface: bool,
    pub functions: Vec<Address>,
    pub function_names: BTreeMap<Address, String>,
    pub parents: Vec<ParentLink>,
    pub interfaces: Vec<ClassId>,
    /// Class whose interface list holds this vtable.
    pub owner: Option<ClassId>,
    /// Set when a naming heuristic decided how this class is presented.
    pub needs_review: bool,
    pub code_references: Vec<Address>,
    pub instances: Vec<Address>,
}

impl ClassMetadata {
    pub fn is_multiple_inheritance(&self) -> bool {
        self.attributes.contains(HierarchyAttributes::MULTIPLE_INHERITANCE)
    }

    pub fn is_virtual_inheritance(&self) -> bool {
        self.attributes.contains(HierarchyAttributes::VIRTUAL_INHERITANCE)
    }

    pub fn is_ambiguous(&self) -> bool {
        self.attributes.contains(HierarchyAttributes::AMBIGUOUS)
    }

    pub fn kind(&self) -> ClassKind {
        if self.is_interface {
            ClassKind::Interface
        } else if self.is_struct {
            ClassKind::Struct
        } else {
            ClassKind::Class
        }
    }

    pub fn format_name(&mut self) {
        self.formatted_name = format!("{} {}", self.kind().keyword(), self.name);
    }

    pub fn function_name(&self, function: Address) -> Option<&str> {
        self.function_names.get(&function).map(|s| s.as_str())
    }
}

impl fmt::Display for ClassMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.formatted_name, self.vtable)
    }
}
