// Mon Oct 19 2026 - Alex

//! MSVC RTTI record layouts.
//!
//! ```text
//! vtable[-1] -> CompleteObjectLocator
//!                 +0x00 signature        0 on 32-bit, 1 on 64-bit
//!                 +0x04 offset           vtable offset inside the complete object
//!                 +0x08 cdOffset         constructor displacement offset
//!                 +0x0c pTypeDescriptor  -> TypeDescriptor { pVFTable, spare, name[] }
//!                 +0x10 pClassDescriptor -> ClassHierarchyDescriptor
//!                                             +0x00 signature
//!                                             +0x04 attributes
//!                                             +0x08 numBaseClasses
//!                                             +0x0c pBaseClassArray -> [pBaseClassDescriptor; n]
//! ```
//!
//! Every 32-bit reference is an image-relative offset on 64-bit targets and an
//! absolute address on 32-bit targets.

use crate::memory::{Address, MemoryError, ModuleInfo, PointerWidth, TargetMemory};
use bitflags::bitflags;
use serde::Serialize;

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    u32_at(bytes, offset) as i32
}

/// Signature a CompleteObjectLocator must carry for the given target width.
pub fn expected_signature(width: PointerWidth) -> u32 {
    match width {
        PointerWidth::Bits32 => 0,
        PointerWidth::Bits64 => 1,
    }
}

/// Turns raw 32-bit RTTI references into target addresses.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver {
    base: u64,
}

impl ReferenceResolver {
    pub fn for_module(module: &ModuleInfo) -> Self {
        let base = match module.width {
            PointerWidth::Bits64 => module.base.as_u64(),
            PointerWidth::Bits32 => 0,
        };
        Self { base }
    }

    pub fn resolve(&self, raw: u32) -> Address {
        Address::new(self.base.wrapping_add(raw as u64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompleteObjectLocator {
    pub signature: u32,
    pub vtable_offset: u32,
    pub ctor_displacement_offset: u32,
    pub type_descriptor: u32,
    pub class_descriptor: u32,
}

impl CompleteObjectLocator {
    pub const SIZE: usize = 20;

    pub fn parse(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            signature: u32_at(bytes, 0),
            vtable_offset: u32_at(bytes, 4),
            ctor_displacement_offset: u32_at(bytes, 8),
            type_descriptor: u32_at(bytes, 12),
            class_descriptor: u32_at(bytes, 16),
        }
    }

    pub fn read(target: &dyn TargetMemory, addr: Address) -> Result<Self, MemoryError> {
        let mut buf = [0u8; Self::SIZE];
        target.read_into(addr, &mut buf)?;
        Ok(Self::parse(&buf))
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct HierarchyAttributes: u32 {
        const MULTIPLE_INHERITANCE = 1 << 0;
        const VIRTUAL_INHERITANCE = 1 << 1;
        const AMBIGUOUS = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassHierarchyDescriptor {
    pub signature: u32,
    pub attributes: HierarchyAttributes,
    pub num_base_classes: u32,
    pub base_class_array: u32,
}

impl ClassHierarchyDescriptor {
    pub const SIZE: usize = 16;

    pub fn parse(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            signature: u32_at(bytes, 0),
            attributes: HierarchyAttributes::from_bits_retain(u32_at(bytes, 4)),
            num_base_classes: u32_at(bytes, 8),
            base_class_array: u32_at(bytes, 12),
        }
    }

    pub fn read(target: &dyn TargetMemory, addr: Address) -> Result<Self, MemoryError> {
        let mut buf = [0u8; Self::SIZE];
        target.read_into(addr, &mut buf)?;
        Ok(Self::parse(&buf))
    }
}

/// Pointer-to-member displacement of a base inside the derived object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Pmd {
    /// member displacement
    pub mdisp: i32,
    /// vbtable displacement
    pub pdisp: i32,
    /// displacement inside the vbtable
    pub vdisp: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseClassDescriptor {
    pub type_descriptor: u32,
    pub num_contained_bases: u32,
    pub displacement: Pmd,
    pub attributes: u32,
}

impl BaseClassDescriptor {
    pub const SIZE: usize = 24;

    pub fn parse(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            type_descriptor: u32_at(bytes, 0),
            num_contained_bases: u32_at(bytes, 4),
            displacement: Pmd {
                mdisp: i32_at(bytes, 8),
                pdisp: i32_at(bytes, 12),
                vdisp: i32_at(bytes, 16),
            },
            attributes: u32_at(bytes, 20),
        }
    }

    pub fn read(target: &dyn TargetMemory, addr: Address) -> Result<Self, MemoryError> {
        let mut buf = [0u8; Self::SIZE];
        target.read_into(addr, &mut buf)?;
        Ok(Self::parse(&buf))
    }
}

/// The fixed part of a `type_info` object; the mangled name follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptorHeader {
    pub vtable_pointer: Address,
    pub spare: Address,
}

impl TypeDescriptorHeader {
    pub fn name_offset(width: PointerWidth) -> u64 {
        2 * width.size() as u64
    }

    pub fn read(target: &dyn TargetMemory, addr: Address) -> Result<Self, MemoryError> {
        let width = target.module().width;
        Ok(Self {
            vtable_pointer: target.read_pointer(addr)?,
            spare: target.read_pointer(addr + width.size() as u64)?,
        })
    }

    /// Reads the bounded, NUL-terminated mangled name of the descriptor at `addr`.
    pub fn read_name(target: &dyn TargetMemory, addr: Address, max_len: usize) -> Result<Vec<u8>, MemoryError> {
        let width = target.module().width;
        target.read_c_string(addr + Self::name_offset(width), max_len)
    }
}
