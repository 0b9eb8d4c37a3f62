// Mon Oct 19 2026 - Alex

//! Fabricated MSVC images for tests.
//!
//! Layout relative to the image base: `.text` at +0x1000 (filled with int3),
//! `.rdata` at +0x3000 holding every RTTI record and vtable, `.data` at +0x6000
//! holding object instances.

use crate::memory::{Address, MemoryError, MemoryRange, MemoryRegion, ModuleInfo, PointerWidth, SnapshotMemory, TargetMemory};
use ahash::AHashMap;

const TEXT_OFFSET: u64 = 0x1000;
const TEXT_SIZE: usize = 0x2000;
const RDATA_OFFSET: u64 = 0x3000;
const RDATA_SIZE: usize = 0x3000;
const DATA_OFFSET: u64 = 0x6000;
const DATA_SIZE: usize = 0x1000;
const CODE_REF_AREA: u64 = 0x1800;

pub const BASE_64: u64 = 0x1_4000_0000;
pub const BASE_32: u64 = 0x40_0000;

#[derive(Debug, Clone)]
pub struct BaseDef {
    pub mangled: String,
    pub mdisp: i32,
    pub num_contained: u32,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub mangled: String,
    pub functions: usize,
    pub bases: Vec<BaseDef>,
    pub attributes: u32,
    pub signature: Option<u32>,
    /// Extra vtables of the same class: `(vtable offset, function count)`.
    pub secondary: Vec<(u32, usize)>,
    pub code_references: usize,
    pub instances: usize,
    /// Put the TypeDescriptor in `.data` instead of `.rdata`.
    pub descriptor_in_data: bool,
    /// Point the TypeDescriptor's vtable slot into `.text`.
    pub type_info_in_code: bool,
}

impl ClassDef {
    pub fn new(mangled: &str, functions: usize) -> Self {
        Self {
            mangled: mangled.to_string(),
            functions,
            bases: Vec::new(),
            attributes: 0,
            signature: None,
            secondary: Vec::new(),
            code_references: 0,
            instances: 0,
            descriptor_in_data: false,
            type_info_in_code: false,
        }
    }

    pub fn base(mut self, mangled: &str, mdisp: i32) -> Self {
        self.bases.push(BaseDef { mangled: mangled.to_string(), mdisp, num_contained: 0 });
        self
    }

    pub fn attributes(mut self, attributes: u32) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn signature(mut self, signature: u32) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn secondary_vtable(mut self, offset: u32, functions: usize) -> Self {
        self.secondary.push((offset, functions));
        self
    }

    pub fn code_references(mut self, count: usize) -> Self {
        self.code_references = count;
        self
    }

    pub fn instances(mut self, count: usize) -> Self {
        self.instances = count;
        self
    }

    pub fn descriptor_in_data(mut self) -> Self {
        self.descriptor_in_data = true;
        self
    }

    pub fn type_info_in_code(mut self) -> Self {
        self.type_info_in_code = true;
        self
    }
}

/// Where a fabricated class ended up.
#[derive(Debug, Clone)]
pub struct FixtureClass {
    pub mangled: String,
    pub locator: Address,
    pub vtable: Address,
    pub functions: Vec<Address>,
    pub secondary_vtables: Vec<Address>,
    pub code_references: Vec<Address>,
    pub instances: Vec<Address>,
}

pub struct RttiImage {
    pub memory: SnapshotMemory,
    pub classes: Vec<FixtureClass>,
}

impl RttiImage {
    pub fn vtables(&self) -> Vec<Address> {
        self.classes.iter().map(|c| c.vtable).collect()
    }

    pub fn class(&self, mangled: &str) -> &FixtureClass {
        self.classes
            .iter()
            .find(|c| c.mangled == mangled)
            .unwrap_or_else(|| panic!("no fixture class {}", mangled))
    }
}

struct Area {
    start: u64,
    bytes: Vec<u8>,
    cursor: usize,
}

impl Area {
    fn new(start: u64, size: usize, fill: u8) -> Self {
        Self { start, bytes: vec![fill; size], cursor: 0 }
    }

    fn alloc(&mut self, size: usize, align: usize) -> u64 {
        self.cursor = (self.cursor + align - 1) / align * align;
        let at = self.start + self.cursor as u64;
        self.cursor += size;
        assert!(self.cursor <= self.bytes.len(), "fixture area overflow");
        at
    }

    fn write(&mut self, at: u64, data: &[u8]) {
        let offset = (at - self.start) as usize;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    fn write_u32(&mut self, at: u64, value: u32) {
        self.write(at, &value.to_le_bytes());
    }

    fn write_ptr(&mut self, width: PointerWidth, at: u64, value: u64) {
        let mut buf = Vec::new();
        width.write_pointer(value, &mut buf);
        self.write(at, &buf);
    }
}

pub struct RttiImageBuilder {
    width: PointerWidth,
    classes: Vec<ClassDef>,
}

impl RttiImageBuilder {
    pub fn new(width: PointerWidth) -> Self {
        Self { width, classes: Vec::new() }
    }

    pub fn class(self, mangled: &str, functions: usize) -> Self {
        self.define(ClassDef::new(mangled, functions))
    }

    pub fn define(mut self, def: ClassDef) -> Self {
        self.classes.push(def);
        self
    }

    pub fn base_address(&self) -> u64 {
        match self.width {
            PointerWidth::Bits64 => BASE_64,
            PointerWidth::Bits32 => BASE_32,
        }
    }

    fn reference(&self, addr: u64) -> u32 {
        match self.width {
            PointerWidth::Bits64 => (addr - BASE_64) as u32,
            PointerWidth::Bits32 => addr as u32,
        }
    }

    pub fn build(self) -> RttiImage {
        let width = self.width;
        let ptr = width.size();
        let base = self.base_address();
        let signature = if width.is_64() { 1 } else { 0 };

        let mut text = Area::new(base + TEXT_OFFSET, TEXT_SIZE, 0xCC);
        let mut rdata = Area::new(base + RDATA_OFFSET, RDATA_SIZE, 0);
        let mut data = Area::new(base + DATA_OFFSET, DATA_SIZE, 0);

        // stand-in for type_info's own vtable
        let type_info_vtable = rdata.alloc(ptr * 2, ptr);

        let mut descriptors: AHashMap<String, u64> = AHashMap::new();
        for def in self.classes.iter().filter(|d| d.descriptor_in_data || d.type_info_in_code) {
            let area = if def.descriptor_in_data { &mut data } else { &mut rdata };
            let td = area.alloc(ptr * 2 + def.mangled.len() + 1, ptr);
            let type_info = if def.type_info_in_code { text.start } else { type_info_vtable };
            area.write_ptr(width, td, type_info);
            area.write(td + (ptr * 2) as u64, def.mangled.as_bytes());
            descriptors.insert(def.mangled.clone(), td);
        }

        let mut names: Vec<&str> = Vec::new();
        for def in &self.classes {
            names.push(&def.mangled);
            names.extend(def.bases.iter().map(|b| b.mangled.as_str()));
        }
        for name in names {
            if descriptors.contains_key(name) {
                continue;
            }
            let td = rdata.alloc(ptr * 2 + name.len() + 1, ptr);
            rdata.write_ptr(width, td, type_info_vtable);
            rdata.write(td + (ptr * 2) as u64, name.as_bytes());
            descriptors.insert(name.to_string(), td);
        }

        let mut next_function = text.start;
        let mut classes = Vec::new();

        for def in &self.classes {
            let own_td = descriptors[&def.mangled];

            let mut bcds = Vec::new();
            let own_bcd = rdata.alloc(24, ptr);
            rdata.write_u32(own_bcd, self.reference(own_td));
            rdata.write_u32(own_bcd + 4, def.bases.len() as u32);
            bcds.push(own_bcd);
            for base_def in &def.bases {
                let bcd = rdata.alloc(24, ptr);
                rdata.write_u32(bcd, self.reference(descriptors[&base_def.mangled]));
                rdata.write_u32(bcd + 4, base_def.num_contained);
                rdata.write_u32(bcd + 8, base_def.mdisp as u32);
                rdata.write_u32(bcd + 12, u32::MAX);
                bcds.push(bcd);
            }

            let bca = rdata.alloc(4 * bcds.len(), ptr);
            for (i, bcd) in bcds.iter().enumerate() {
                rdata.write_u32(bca + 4 * i as u64, self.reference(*bcd));
            }

            let chd = rdata.alloc(16, ptr);
            rdata.write_u32(chd + 4, def.attributes);
            rdata.write_u32(chd + 8, bcds.len() as u32);
            rdata.write_u32(chd + 12, self.reference(bca));

            let mut write_vtable = |offset: u32, count: usize, rdata: &mut Area| {
                let col = rdata.alloc(20, ptr);
                rdata.write_u32(col, def.signature.unwrap_or(signature));
                rdata.write_u32(col + 4, offset);
                rdata.write_u32(col + 12, self.reference(own_td));
                rdata.write_u32(col + 16, self.reference(chd));

                let slot = rdata.alloc(ptr * (count + 2), ptr);
                rdata.write_ptr(width, slot, col);
                let mut functions = Vec::new();
                for i in 0..count {
                    rdata.write_ptr(width, slot + ((i + 1) * ptr) as u64, next_function);
                    functions.push(Address::new(next_function));
                    next_function += 0x10;
                }
                (Address::new(col), Address::new(slot + ptr as u64), functions)
            };

            let (locator, vtable, functions) = write_vtable(0, def.functions, &mut rdata);
            let secondary_vtables = def
                .secondary
                .iter()
                .map(|&(offset, count)| write_vtable(offset, count, &mut rdata).1)
                .collect();

            classes.push(FixtureClass {
                mangled: def.mangled.clone(),
                locator,
                vtable,
                functions,
                secondary_vtables,
                code_references: Vec::new(),
                instances: Vec::new(),
            });
        }

        // odd start offsets so only byte-granular scanning finds them
        let mut code_cursor = text.start + CODE_REF_AREA + 1;
        for (def, class) in self.classes.iter().zip(classes.iter_mut()) {
            for _ in 0..def.code_references {
                let location = code_cursor;
                let value = match width {
                    PointerWidth::Bits64 => {
                        class.vtable.as_u64().wrapping_sub(location + 4) as u32
                    }
                    PointerWidth::Bits32 => class.vtable.as_u64() as u32,
                };
                text.write_u32(location, value);
                class.code_references.push(Address::new(location));
                code_cursor += 0x11;
            }

            for _ in 0..def.instances {
                let object = data.alloc(ptr * 4, ptr);
                data.write_ptr(width, object, class.vtable.as_u64());
                class.instances.push(Address::new(object));
            }
        }

        let memory = SnapshotMemory::builder("fixture.exe", Address::new(base), width)
            .section(".text", Address::new(text.start), text.bytes, true, true)
            .and_then(|b| b.section(".rdata", Address::new(rdata.start), rdata.bytes, false, true))
            .and_then(|b| b.section(".data", Address::new(data.start), data.bytes, false, false))
            .unwrap_or_else(|e| panic!("fixture layout: {}", e))
            .build();

        RttiImage { memory, classes }
    }
}

/// Target wrapper whose reads fail, or panic, inside chosen sections.
pub struct FailingReads<T> {
    inner: T,
    failing: Vec<MemoryRange>,
    panicking: Vec<MemoryRange>,
}

impl<T: TargetMemory> FailingReads<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, failing: Vec::new(), panicking: Vec::new() }
    }

    fn section_range(&self, name: &str) -> MemoryRange {
        self.inner
            .module()
            .sections
            .iter()
            .find(|s| s.name() == name)
            .map(|s| *s.range())
            .unwrap_or_else(|| panic!("no section {}", name))
    }

    pub fn fail_section(mut self, name: &str) -> Self {
        let range = self.section_range(name);
        self.failing.push(range);
        self
    }

    pub fn panic_in_section(mut self, name: &str) -> Self {
        let range = self.section_range(name);
        self.panicking.push(range);
        self
    }
}

fn overlaps(range: &MemoryRange, addr: Address, len: usize) -> bool {
    addr < range.end() && addr + len as u64 > range.start()
}

impl<T: TargetMemory> TargetMemory for FailingReads<T> {
    fn module(&self) -> &ModuleInfo {
        self.inner.module()
    }

    fn regions(&self) -> Vec<MemoryRegion> {
        self.inner.regions()
    }

    fn read_into(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        if self.panicking.iter().any(|r| overlaps(r, addr, buf.len())) {
            panic!("read of {} crashed", addr);
        }
        if self.failing.iter().any(|r| overlaps(r, addr, buf.len())) {
            return Err(MemoryError::ReadFailed { address: addr.as_u64(), size: buf.len() });
        }
        self.inner.read_into(addr, buf)
    }
}
