// Copyright (c) 2025 knix
// All rights reserved.

use crate::ast::{NameInfo, Op};
use crate::span::SpanId;
use crate::typer::Typer;
use crate::typer::consts::Val;
use crate::typer::syms::{PkgId, SymId};
use crate::typer::types::*;

const BASIC_TYPES: [(&str, TypeId); 19] = [
    ("int8", INT8_TYPE_ID),
    ("int16", INT16_TYPE_ID),
    ("int32", INT32_TYPE_ID),
    ("int64", INT64_TYPE_ID),
    ("uint8", UINT8_TYPE_ID),
    ("uint16", UINT16_TYPE_ID),
    ("uint32", UINT32_TYPE_ID),
    ("uint64", UINT64_TYPE_ID),
    ("float32", FLOAT32_TYPE_ID),
    ("float64", FLOAT64_TYPE_ID),
    ("complex64", COMPLEX64_TYPE_ID),
    ("complex128", COMPLEX128_TYPE_ID),
    ("bool", BOOL_TYPE_ID),
    ("string", STRING_TYPE_ID),
    ("int", INT_TYPE_ID),
    ("uint", UINT_TYPE_ID),
    ("uintptr", UINTPTR_TYPE_ID),
    ("byte", BYTE_TYPE_ID),
    ("rune", RUNE_TYPE_ID),
];

const BUILTIN_FUNCS: [(&str, Op); 15] = [
    ("append", Op::Append),
    ("cap", Op::Cap),
    ("close", Op::Close),
    ("complex", Op::Complex),
    ("copy", Op::Copy),
    ("delete", Op::Delete),
    ("imag", Op::Imag),
    ("len", Op::Len),
    ("make", Op::Make),
    ("new", Op::New),
    ("panic", Op::Panic),
    ("print", Op::Print),
    ("println", Op::PrintN),
    ("real", Op::Real),
    ("recover", Op::Recover),
];

impl Typer {
    fn universe_sym(&mut self, pkg: PkgId, name: &str) -> SymId {
        let s = self.syms.lookup(pkg, name);
        self.syms.get_mut(s).block = -100;
        s
    }

    fn define_type_name(&mut self, pkg: PkgId, name: &str, t: TypeId) -> SymId {
        let s = self.universe_sym(pkg, name);
        self.types.get_mut(t).sym = Some(s);
        let n = self.typenod(t);
        self.node_mut(n).sym = Some(s);
        self.syms.get_mut(s).def = Some(n);
        s
    }

    /// Installs the predeclared identifiers
    pub(crate) fn lexinit(&mut self) {
        let builtin = self.syms.builtin_pkg;
        for (name, t) in BASIC_TYPES {
            self.define_type_name(builtin, name, t);
        }

        // error is interface { Error() string }
        let result = Field::new(None, STRING_TYPE_ID);
        let method_type = self.types.func_of(Vec::new(), Vec::new(), vec![result]);
        let error_method = self.syms.lookup(builtin, "Error");
        let mut method = Field::new(Some(error_method), method_type);
        method.offset = 0;
        *self.types.fields_mut(ERROR_TYPE_ID) = vec![method];
        self.define_type_name(builtin, "error", ERROR_TYPE_ID);

        let unsafe_pkg = self.syms.unsafe_pkg;
        self.define_type_name(unsafe_pkg, "Pointer", UNSAFE_PTR_TYPE_ID);

        for (name, b) in [("true", true), ("false", false)] {
            let s = self.universe_sym(builtin, name);
            let n = self.nodlit(Val::Bool(b), SpanId::NONE);
            let node = self.node_mut(n);
            node.sym = Some(s);
            node.name = Some(Box::default());
            self.syms.get_mut(s).def = Some(n);
        }

        let s = self.universe_sym(builtin, "nil");
        let n = self.nodlit(Val::Nil, SpanId::NONE);
        self.node_mut(n).sym = Some(s);
        self.syms.get_mut(s).def = Some(n);

        let s = self.universe_sym(builtin, "iota");
        let n = self.nodes.nod(Op::Name, None, None, SpanId::NONE);
        self.node_mut(n).sym = Some(s);
        self.syms.get_mut(s).def = Some(n);
        self.iota_node = Some(n);

        for (name, op) in BUILTIN_FUNCS {
            let s = self.universe_sym(builtin, name);
            let n = self.nodes.nod(Op::Name, None, None, SpanId::NONE);
            let node = self.node_mut(n);
            node.sym = Some(s);
            node.name = Some(Box::new(NameInfo { builtin: Some(op), ..NameInfo::default() }));
            self.syms.get_mut(s).def = Some(n);
        }

        let s = self.universe_sym(builtin, "_");
        let n = self.nodes.nod(Op::Name, None, None, SpanId::NONE);
        let node = self.node_mut(n);
        node.sym = Some(s);
        node.typ = Some(BLANK_TYPE_ID);
        node.name = Some(Box::default());
        self.syms.get_mut(s).def = Some(n);

        self.finish_universe();
    }

    /// Makes every universe name visible from the package being compiled
    fn finish_universe(&mut self) {
        let builtin = self.syms.builtin_pkg;
        let local = self.syms.local_pkg;
        let names: Vec<&str> = BASIC_TYPES
            .iter()
            .map(|(name, _)| *name)
            .chain(BUILTIN_FUNCS.iter().map(|(name, _)| *name))
            .chain(["error", "true", "false", "nil", "iota", "_"])
            .collect();
        for name in names {
            let s = self.syms.lookup(builtin, name);
            let (def, block) = {
                let sym = self.syms.get(s);
                (sym.def, sym.block)
            };
            let s1 = self.syms.lookup(local, name);
            let sym1 = self.syms.get_mut(s1);
            sym1.def = def;
            sym1.block = block;
        }
    }

    /// Predeclared types by name, in declaration order
    pub fn predeclared_types(&self) -> Vec<(&'static str, TypeId)> {
        let mut all: Vec<(&'static str, TypeId)> = BASIC_TYPES.to_vec();
        all.push(("error", ERROR_TYPE_ID));
        all.push(("unsafe.Pointer", UNSAFE_PTR_TYPE_ID));
        all
    }
}
