// Copyright (c) 2025 knix
// All rights reserved.

//! The linker's symbol table, as populated by the object file reader

use std::fmt::Write as _;

use fxhash::FxHashMap;
use itertools::Itertools;
use log::trace;

use crate::nz_u32_id;
use crate::pool::Pool;

pub mod objfile;
pub mod objwriter;

#[cfg(test)]
mod objfile_test;

nz_u32_id!(LSymId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    pub byte_order: ByteOrder,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig { byte_order: ByteOrder::Little }
    }
}

/// Symbol kind as written by the assembler. Only the kinds the reader treats
/// specially are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SymKind(pub i16);

impl SymKind {
    pub const NONE: SymKind = SymKind(0);
    pub const TEXT: SymKind = SymKind(1);
    pub const RODATA: SymKind = SymKind(8);
    pub const NOPTRDATA: SymKind = SymKind(36);
    pub const DATA: SymKind = SymKind(38);
    pub const BSS: SymKind = SymKind(39);
    pub const NOPTRBSS: SymKind = SymKind(40);
    pub const XREF: SymKind = SymKind(42);

    pub fn is_data_or_bss(self) -> bool {
        matches!(self, SymKind::DATA | SymKind::BSS | SymKind::NOPTRBSS)
    }

    pub fn is_bss(self) -> bool {
        matches!(self, SymKind::BSS | SymKind::NOPTRBSS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attrs(u16);

impl Attrs {
    pub const DUPLICATE_OK: Attrs = Attrs(1 << 0);
    pub const LOCAL: Attrs = Attrs(1 << 1);
    pub const REACHABLE: Attrs = Attrs(1 << 2);
    pub const NO_SPLIT: Attrs = Attrs(1 << 3);
    pub const REFLECT_METHOD: Attrs = Attrs(1 << 4);
    pub const ON_LIST: Attrs = Attrs(1 << 5);

    pub fn has(self, a: Attrs) -> bool {
        self.0 & a.0 != 0
    }

    pub fn insert(&mut self, a: Attrs) {
        self.0 |= a.0
    }

    pub fn set(&mut self, a: Attrs, on: bool) {
        if on {
            self.0 |= a.0
        } else {
            self.0 &= !a.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reloc {
    pub off: i32,
    pub siz: u8,
    pub kind: i32,
    pub add: i64,
    pub sym: Option<LSymId>,
}

/// A stack-resident variable of a function, for debuggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auto {
    pub asym: Option<LSymId>,
    pub aoffset: i32,
    pub name: i16,
    pub gotype: Option<LSymId>,
}

/// Program counter tables of a function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pcln {
    pub pcsp: Vec<u8>,
    pub pcfile: Vec<u8>,
    pub pcline: Vec<u8>,
    pub pcdata: Vec<Vec<u8>>,
    pub funcdata: Vec<Option<LSymId>>,
    pub funcdataoff: Vec<i64>,
    pub file: Vec<Option<LSymId>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncInfo {
    pub args: i32,
    pub locals: i32,
    pub autom: Vec<Auto>,
    pub pcln: Pcln,
}

#[derive(Debug, Clone)]
pub struct LSym {
    pub name: String,
    pub version: i32,
    pub kind: SymKind,
    pub attrs: Attrs,
    pub size: i64,
    pub gotype: Option<LSymId>,
    /// Package of the defining object
    pub file: String,
    pub data: Vec<u8>,
    pub relocs: Vec<Reloc>,
    pub func: Option<Box<FuncInfo>>,
}

impl LSym {
    fn new(name: &str, version: i32) -> LSym {
        LSym {
            name: name.to_string(),
            version,
            kind: SymKind::NONE,
            attrs: Attrs::default(),
            size: 0,
            gotype: None,
            file: String::new(),
            data: Vec::new(),
            relocs: Vec::new(),
            func: None,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.kind != SymKind::NONE && self.kind != SymKind::XREF
    }
}

/// A package dependency and the object that asked for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub pkg: String,
    pub objref: String,
}

pub struct Link {
    pub config: LinkConfig,
    pub syms: Pool<LSym, LSymId>,
    hash: FxHashMap<(String, i32), LSymId>,
    /// Version given to package-local symbols of the object being read
    pub version: i32,
    /// Function symbols in the order their definitions were read
    pub textp: Vec<LSymId>,
    pub libs: Vec<Library>,
    /// Reference table of the object being read; index 0 is no symbol
    pub cur_refs: Vec<Option<LSymId>>,
    /// Throwaway target for duplicate definitions that are allowed
    pub dup: LSymId,
}

impl Link {
    pub fn new(config: LinkConfig) -> Link {
        let mut syms = Pool::with_capacity("link_syms", 4096);
        let dup = syms.add(LSym::new(".dup", 0));
        Link {
            config,
            syms,
            hash: FxHashMap::default(),
            version: 0,
            textp: Vec::new(),
            libs: Vec::new(),
            cur_refs: Vec::new(),
            dup,
        }
    }

    pub fn inc_version(&mut self) {
        self.version += 1;
    }

    /// The symbol named `name` at `version`, created if new
    pub fn lookup(&mut self, name: &str, version: i32) -> LSymId {
        if let Some(id) = self.hash.get(&(name.to_string(), version)) {
            return *id;
        }
        let id = self.syms.add(LSym::new(name, version));
        trace!("new symbol {}<{}>", name, version);
        self.hash.insert((name.to_string(), version), id);
        id
    }

    pub fn rlookup(&self, name: &str, version: i32) -> Option<LSymId> {
        self.hash.get(&(name.to_string(), version)).copied()
    }

    pub fn sym(&self, id: LSymId) -> &LSym {
        self.syms.get(id)
    }

    pub fn sym_mut(&mut self, id: LSymId) -> &mut LSym {
        self.syms.get_mut(id)
    }

    /// Records a package dependency once
    pub fn addlib(&mut self, pkg: &str, objref: &str) {
        if self.libs.iter().any(|l| l.pkg == pkg) {
            return;
        }
        self.libs.push(Library { pkg: pkg.to_string(), objref: objref.to_string() });
    }

    pub fn add_uint32(&mut self, s: LSymId, v: u32) {
        let bytes = match self.config.byte_order {
            ByteOrder::Little => v.to_le_bytes(),
            ByteOrder::Big => v.to_be_bytes(),
        };
        self.add_bytes(s, &bytes);
    }

    pub fn add_uint64(&mut self, s: LSymId, v: u64) {
        let bytes = match self.config.byte_order {
            ByteOrder::Little => v.to_le_bytes(),
            ByteOrder::Big => v.to_be_bytes(),
        };
        self.add_bytes(s, &bytes);
    }

    fn add_bytes(&mut self, s: LSymId, bytes: &[u8]) {
        let sym = self.sym_mut(s);
        sym.data.extend_from_slice(bytes);
        sym.size = sym.size.max(sym.data.len() as i64);
        sym.attrs.insert(Attrs::REACHABLE);
    }

    fn name_of(&self, s: Option<LSymId>) -> &str {
        s.map(|s| self.sym(s).name.as_str()).unwrap_or("-")
    }

    /// Symbol table listing: every defined symbol, the function order, then
    /// the libraries
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (id, s) in self.syms.iter_with_ids() {
            if id == self.dup || !s.is_defined() {
                continue;
            }
            let _ = write!(out, "{}<{}> kind={} size={}", s.name, s.version, s.kind.0, s.size);
            if s.attrs.has(Attrs::DUPLICATE_OK) {
                out.push_str(" dupok");
            }
            if s.attrs.has(Attrs::LOCAL) {
                out.push_str(" local");
            }
            if s.gotype.is_some() {
                let _ = write!(out, " type={}", self.name_of(s.gotype));
            }
            out.push('\n');
            for r in &s.relocs {
                let _ =
                    writeln!(out, "\trel {}+{} t={} {}+{}", r.off, r.siz, r.kind, self.name_of(r.sym), r.add);
            }
            if let Some(func) = &s.func {
                let _ = writeln!(
                    out,
                    "\targs={} locals={} autom={} pcsp={} pcline={}",
                    func.args,
                    func.locals,
                    func.autom.len(),
                    func.pcln.pcsp.len(),
                    func.pcln.pcline.len()
                );
            }
        }
        if !self.textp.is_empty() {
            let _ = writeln!(out, "text {}", self.textp.iter().map(|s| &self.sym(*s).name).join(" "));
        }
        for lib in &self.libs {
            let _ = writeln!(out, "lib {} (from {})", lib.pkg, lib.objref);
        }
        out
    }
}
