// Copyright (c) 2025 knix
// All rights reserved.

//! Writes the object file format `objfile` reads. Symbols are named rather
//! than resolved; the writer numbers references in order of first use.

use fxhash::FxHashMap;

use crate::link::SymKind;
use crate::link::objfile::{END, END_MAGIC, FLAG_DUPOK, FLAG_LOCAL, FLAG_REFLECT_METHOD, START_MAGIC, SYNC, VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymRef {
    pub name: String,
    /// 0 for global symbols, 1 for symbols local to the object
    pub version: i32,
}

pub fn sref(name: &str, version: i32) -> SymRef {
    SymRef { name: name.to_string(), version }
}

#[derive(Debug, Clone)]
pub struct RelocDef {
    pub off: i32,
    pub siz: u8,
    pub kind: i32,
    pub add: i64,
    pub sym: Option<SymRef>,
}

#[derive(Debug, Clone)]
pub struct AutoDef {
    pub asym: Option<SymRef>,
    pub aoffset: i32,
    pub name: i16,
    pub gotype: Option<SymRef>,
}

#[derive(Debug, Clone, Default)]
pub struct FuncDef {
    pub args: i32,
    pub locals: i32,
    pub nosplit: bool,
    pub reflect_method: bool,
    pub autom: Vec<AutoDef>,
    pub pcsp: Vec<u8>,
    pub pcfile: Vec<u8>,
    pub pcline: Vec<u8>,
    pub pcdata: Vec<Vec<u8>>,
    pub funcdata: Vec<(Option<SymRef>, i64)>,
    pub files: Vec<Option<SymRef>>,
}

#[derive(Debug, Clone)]
pub struct SymDef {
    pub kind: SymKind,
    pub sym: SymRef,
    pub dupok: bool,
    pub local: bool,
    pub size: i64,
    pub gotype: Option<SymRef>,
    pub data: Vec<u8>,
    pub relocs: Vec<RelocDef>,
    pub func: Option<FuncDef>,
}

impl SymDef {
    pub fn new(kind: SymKind, name: &str, version: i32) -> SymDef {
        SymDef {
            kind,
            sym: sref(name, version),
            dupok: false,
            local: false,
            size: 0,
            gotype: None,
            data: Vec::new(),
            relocs: Vec::new(),
            func: None,
        }
    }

    pub fn with_data(mut self, data: &[u8]) -> SymDef {
        self.data = data.to_vec();
        self.size = self.size.max(data.len() as i64);
        self
    }
}

#[derive(Default)]
pub struct ObjWriter {
    deps: Vec<String>,
    refs: Vec<SymRef>,
    ref_index: FxHashMap<SymRef, i64>,
    data: Vec<u8>,
    /// Encoded symbol records; they follow the data block
    body: Vec<u8>,
}

pub fn wrint(out: &mut Vec<u8>, v: i64) {
    let mut uv = ((v << 1) ^ (v >> 63)) as u64;
    while uv >= 0x80 {
        out.push((uv as u8) | 0x80);
        uv >>= 7;
    }
    out.push(uv as u8);
}

pub fn wrstring(out: &mut Vec<u8>, s: &str) {
    wrint(out, s.len() as i64);
    out.extend_from_slice(s.as_bytes());
}

impl ObjWriter {
    pub fn new() -> ObjWriter {
        ObjWriter::default()
    }

    pub fn add_dep(&mut self, pkg: &str) {
        self.deps.push(pkg.to_string());
    }

    /// Index of `s` in the reference table, adding it on first use
    pub fn add_ref(&mut self, s: &SymRef) -> i64 {
        if let Some(i) = self.ref_index.get(s) {
            return *i;
        }
        self.refs.push(s.clone());
        let i = self.refs.len() as i64;
        self.ref_index.insert(s.clone(), i);
        i
    }

    fn wrsym(&mut self, s: Option<&SymRef>) {
        let i = match s {
            Some(s) => self.add_ref(s),
            None => 0,
        };
        wrint(&mut self.body, i);
    }

    fn wrdata(&mut self, p: &[u8]) {
        self.data.extend_from_slice(p);
        wrint(&mut self.body, p.len() as i64);
    }

    pub fn add_sym(&mut self, def: &SymDef) {
        self.body.push(SYNC);
        wrint(&mut self.body, def.kind.0 as i64);
        self.wrsym(Some(&def.sym));
        let mut flags = 0;
        if def.dupok {
            flags |= FLAG_DUPOK;
        }
        if def.local {
            flags |= FLAG_LOCAL;
        }
        wrint(&mut self.body, flags);
        wrint(&mut self.body, def.size);
        self.wrsym(def.gotype.as_ref());
        self.wrdata(&def.data);
        wrint(&mut self.body, def.relocs.len() as i64);
        for r in &def.relocs {
            wrint(&mut self.body, r.off as i64);
            wrint(&mut self.body, r.siz as i64);
            wrint(&mut self.body, r.kind as i64);
            wrint(&mut self.body, r.add);
            self.wrsym(r.sym.as_ref());
        }

        if def.kind != SymKind::TEXT {
            return;
        }
        let empty = FuncDef::default();
        let func = def.func.as_ref().unwrap_or(&empty);
        wrint(&mut self.body, func.args as i64);
        wrint(&mut self.body, func.locals as i64);
        wrint(&mut self.body, func.nosplit as i64);
        wrint(&mut self.body, if func.reflect_method { FLAG_REFLECT_METHOD } else { 0 });
        wrint(&mut self.body, func.autom.len() as i64);
        for a in &func.autom {
            self.wrsym(a.asym.as_ref());
            wrint(&mut self.body, a.aoffset as i64);
            wrint(&mut self.body, a.name as i64);
            self.wrsym(a.gotype.as_ref());
        }
        self.wrdata(&func.pcsp);
        self.wrdata(&func.pcfile);
        self.wrdata(&func.pcline);
        wrint(&mut self.body, func.pcdata.len() as i64);
        for p in &func.pcdata {
            self.wrdata(p);
        }
        wrint(&mut self.body, func.funcdata.len() as i64);
        for (s, _) in &func.funcdata {
            self.wrsym(s.as_ref());
        }
        for (_, off) in &func.funcdata {
            wrint(&mut self.body, *off);
        }
        wrint(&mut self.body, func.files.len() as i64);
        for f in &func.files {
            self.wrsym(f.as_ref());
        }
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + self.data.len() + 64);
        out.extend_from_slice(START_MAGIC);
        out.push(VERSION);
        for dep in &self.deps {
            wrstring(&mut out, dep);
        }
        wrstring(&mut out, "");
        for r in &self.refs {
            out.push(SYNC);
            wrstring(&mut out, &r.name);
            if r.name.is_empty() {
                wrint(&mut out, 0);
            }
            wrint(&mut out, r.version as i64);
        }
        out.push(END);
        wrint(&mut out, self.data.len() as i64);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.body);
        out.extend_from_slice(END_MAGIC);
        out
    }
}
