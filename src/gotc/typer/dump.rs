// Copyright (c) 2025 knix
// All rights reserved.

use std::fmt::Write;

use crate::ast::{NodeId, Op};
use crate::typer::Typer;
use crate::typer::syms::{SymId, Syms};
use crate::typer::types::*;

/// Source-syntax rendering of a type
pub fn display_type(types: &Types, syms: &Syms, w: &mut impl Write, t: TypeId) -> std::fmt::Result {
    display_type_ext(types, syms, w, t, false)
}

fn display_type_ext(
    types: &Types,
    syms: &Syms,
    w: &mut impl Write,
    t: TypeId,
    expand: bool,
) -> std::fmt::Result {
    let typ = types.get(t);
    if let Some(sym) = typ.sym {
        if !expand {
            return w.write_str(&syms.qualified_name(sym));
        }
    }
    match t {
        IDEAL_TYPE_ID => return w.write_str("untyped number"),
        IDEAL_STRING_TYPE_ID => return w.write_str("untyped string"),
        IDEAL_BOOL_TYPE_ID => return w.write_str("untyped bool"),
        _ => {}
    }
    match &typ.kind {
        TypeKind::Ptr(elem) => {
            w.write_char('*')?;
            display_type(types, syms, w, *elem)
        }
        TypeKind::Array(a) => {
            if a.bound == DDD_BOUND {
                w.write_str("[...]")?;
            } else if a.bound < 0 {
                w.write_str("[]")?;
            } else {
                write!(w, "[{}]", a.bound)?;
            }
            display_type(types, syms, w, a.elem)
        }
        TypeKind::Chan(c) => {
            match c.dir {
                ChanDir::RECV => w.write_str("<-chan ")?,
                ChanDir::SEND => w.write_str("chan<- ")?,
                _ => {
                    w.write_str("chan ")?;
                    let elem = types.get(c.elem);
                    if elem.sym.is_none() && elem.as_chan().is_some_and(|ec| ec.dir == ChanDir::RECV) {
                        w.write_char('(')?;
                        display_type(types, syms, w, c.elem)?;
                        return w.write_char(')');
                    }
                }
            }
            display_type(types, syms, w, c.elem)
        }
        TypeKind::Map(m) => {
            w.write_str("map[")?;
            display_type(types, syms, w, m.key)?;
            w.write_char(']')?;
            display_type(types, syms, w, m.val)
        }
        TypeKind::Func(f) => {
            w.write_str("func")?;
            display_signature(types, syms, w, f)
        }
        TypeKind::Struct(s) => {
            if let Some(part) = s.map_part {
                let role = match part.role {
                    MapRole::Bucket => "bucket",
                    MapRole::Hmap => "hdr",
                    MapRole::Hiter => "iter",
                };
                write!(w, "map.{}[", role)?;
                display_type(types, syms, w, types.key(part.map))?;
                w.write_char(']')?;
                return display_type(types, syms, w, types.val(part.map));
            }
            if s.funarg {
                return display_funarg(types, syms, w, &s.fields);
            }
            if s.fields.is_empty() {
                return w.write_str("struct {}");
            }
            w.write_str("struct { ")?;
            for (i, f) in s.fields.iter().enumerate() {
                if i > 0 {
                    w.write_str("; ")?;
                }
                if let Some(sym) = f.sym.filter(|_| !f.embedded.is_embedded()) {
                    write!(w, "{} ", syms.name(sym))?;
                }
                display_type(types, syms, w, f.typ)?;
                if let Some(note) = &f.note {
                    write!(w, " {:?}", note)?;
                }
            }
            w.write_str(" }")
        }
        TypeKind::Interface(i) => {
            if i.methods.is_empty() {
                return w.write_str("interface {}");
            }
            w.write_str("interface { ")?;
            for (idx, m) in i.methods.iter().enumerate() {
                if idx > 0 {
                    w.write_str("; ")?;
                }
                match m.sym {
                    Some(sym) if !m.embedded.is_embedded() => {
                        w.write_str(syms.name(sym))?;
                        match types.get(m.typ).as_func() {
                            Some(f) => display_signature(types, syms, w, f)?,
                            None => w.write_str("()")?,
                        }
                    }
                    _ => display_type(types, syms, w, m.typ)?,
                }
            }
            w.write_str(" }")
        }
        TypeKind::Forward(_) => w.write_str("undefined"),
        TypeKind::Nil => w.write_str("nil"),
        TypeKind::Any => w.write_str("any"),
        TypeKind::Blank => w.write_str("blank"),
        TypeKind::Ideal => w.write_str("untyped number"),
        k => write!(w, "{}", k.etype().to_string().to_lowercase()),
    }
}

fn display_signature(types: &Types, syms: &Syms, w: &mut impl Write, f: &FuncType) -> std::fmt::Result {
    display_funarg(types, syms, w, types.fields(f.params))?;
    let results = types.fields(f.results);
    match results.len() {
        0 => Ok(()),
        1 if param_name(syms, results[0].sym).is_none() => {
            w.write_char(' ')?;
            display_type(types, syms, w, results[0].typ)
        }
        _ => {
            w.write_char(' ')?;
            display_funarg(types, syms, w, results)
        }
    }
}

fn display_funarg(types: &Types, syms: &Syms, w: &mut impl Write, fields: &[Field]) -> std::fmt::Result {
    w.write_char('(')?;
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            w.write_str(", ")?;
        }
        if let Some(name) = param_name(syms, f.sym) {
            write!(w, "{} ", name)?;
        }
        if f.isddd {
            w.write_str("...")?;
            let elem = types.get(f.typ).elem().unwrap_or(f.typ);
            display_type(types, syms, w, elem)?;
        } else {
            display_type(types, syms, w, f.typ)?;
        }
    }
    w.write_char(')')
}

/// Parameter name as written: `~rN` stands for an unnamed result and `~bN`
/// for a blank one.
fn param_name(syms: &Syms, sym: Option<SymId>) -> Option<&str> {
    let name = syms.name(sym?);
    if name.starts_with("~r") {
        None
    } else if name.starts_with("~b") {
        Some("_")
    } else {
        Some(name)
    }
}

impl Typer {
    pub fn tstr(&self, t: TypeId) -> String {
        let mut s = String::new();
        let _ = display_type(&self.types, &self.syms, &mut s, t);
        s
    }

    pub fn tstr_opt(&self, t: Option<TypeId>) -> String {
        match t {
            Some(t) => self.tstr(t),
            None => "<T>".to_string(),
        }
    }

    /// Named types are followed by their underlying structure
    pub fn tstr_long(&self, t: TypeId) -> String {
        let mut s = String::new();
        let _ = display_type_ext(&self.types, &self.syms, &mut s, t, true);
        s
    }

    pub fn nstr(&self, n: NodeId) -> String {
        let mut s = String::new();
        let _ = self.display_node(&mut s, n);
        s
    }

    /// Expression followed by its type, for messages about mismatches
    pub fn nstr_long(&self, n: NodeId) -> String {
        match self.ty(n) {
            Some(t) if self.op(n) != Op::Type => format!("{} (type {})", self.nstr(n), self.tstr(t)),
            _ => self.nstr(n),
        }
    }

    fn display_list(&self, w: &mut impl Write, list: &[NodeId], sep: &str) -> std::fmt::Result {
        for (i, n) in list.iter().enumerate() {
            if i > 0 {
                w.write_str(sep)?;
            }
            self.display_node(w, *n)?;
        }
        Ok(())
    }

    fn display_opt(&self, w: &mut impl Write, n: Option<NodeId>) -> std::fmt::Result {
        match n {
            Some(n) => self.display_node(w, n),
            None => Ok(()),
        }
    }

    pub fn display_node(&self, w: &mut impl Write, n: NodeId) -> std::fmt::Result {
        let node = self.node(n);
        match node.op {
            Op::Name | Op::NoName | Op::Pack => match node.sym {
                Some(sym) => w.write_str(&self.syms.qualified_name(sym)),
                None => w.write_str("?"),
            },
            Op::Literal => {
                if let Some(sym) = node.sym {
                    if node.name.is_some() {
                        return w.write_str(&self.syms.qualified_name(sym));
                    }
                }
                match &node.val {
                    Some(v) => write!(w, "{}", v),
                    None => w.write_str("?"),
                }
            }
            Op::Type => match (node.typ, node.sym) {
                (Some(t), _) => w.write_str(&self.tstr(t)),
                (None, Some(sym)) => w.write_str(self.syms.name(sym)),
                _ => w.write_str("type"),
            },
            Op::TArray => {
                match node.left {
                    None => w.write_str("[]")?,
                    Some(l) if self.op(l) == Op::Ddd => w.write_str("[...]")?,
                    Some(l) => {
                        w.write_char('[')?;
                        self.display_node(w, l)?;
                        w.write_char(']')?;
                    }
                }
                self.display_opt(w, node.right)
            }
            Op::TMap => {
                w.write_str("map[")?;
                self.display_opt(w, node.left)?;
                w.write_char(']')?;
                self.display_opt(w, node.right)
            }
            Op::TChan => {
                match node.chan_dir {
                    crate::typer::types::ChanDir::RECV => w.write_str("<-chan ")?,
                    crate::typer::types::ChanDir::SEND => w.write_str("chan<- ")?,
                    _ => w.write_str("chan ")?,
                }
                self.display_opt(w, node.left)
            }
            Op::TStruct => w.write_str("struct { ... }"),
            Op::TInter => w.write_str("interface { ... }"),
            Op::TFunc => w.write_str("func(...)"),
            Op::Ddd => w.write_str("..."),
            Op::Dot | Op::DotPtr | Op::DotMeth | Op::DotInter | Op::XDot | Op::CallPart => {
                self.display_opt(w, node.left)?;
                w.write_char('.')?;
                match node.sym {
                    Some(sym) => w.write_str(self.syms.name(sym)),
                    None => w.write_str("<nil>"),
                }
            }
            Op::DotType | Op::DotType2 => {
                self.display_opt(w, node.left)?;
                w.write_str(".(")?;
                match (node.right, node.typ) {
                    (Some(r), _) => self.display_node(w, r)?,
                    (None, Some(t)) => w.write_str(&self.tstr(t))?,
                    _ => {}
                }
                w.write_char(')')
            }
            Op::Index | Op::IndexMap => {
                self.display_opt(w, node.left)?;
                w.write_char('[')?;
                self.display_opt(w, node.right)?;
                w.write_char(']')
            }
            Op::Slice | Op::SliceArr | Op::SliceStr | Op::Slice3 | Op::Slice3Arr => {
                self.display_opt(w, node.left)?;
                w.write_char('[')?;
                if let Some(key) = node.right {
                    let k = self.node(key);
                    self.display_opt(w, k.left)?;
                    w.write_char(':')?;
                    match k.right {
                        Some(hi) if self.op(hi) == Op::Key => {
                            let h = self.node(hi);
                            self.display_opt(w, h.left)?;
                            w.write_char(':')?;
                            self.display_opt(w, h.right)?;
                        }
                        hi => self.display_opt(w, hi)?,
                    }
                }
                w.write_char(']')
            }
            Op::Call | Op::CallFunc | Op::CallMeth | Op::CallInter | Op::Conv | Op::ConvIface | Op::ConvNop => {
                if matches!(node.op, Op::Conv | Op::ConvIface | Op::ConvNop) && node.left.is_some() && node.list.is_empty() {
                    match node.typ {
                        Some(t) => w.write_str(&self.tstr(t))?,
                        None => w.write_str("?")?,
                    }
                    w.write_char('(')?;
                    self.display_opt(w, node.left)?;
                    return w.write_char(')');
                }
                self.display_opt(w, node.left)?;
                w.write_char('(')?;
                self.display_list(w, &node.list, ", ")?;
                if node.isddd {
                    w.write_str("...")?;
                }
                w.write_char(')')
            }
            Op::Len
            | Op::Cap
            | Op::Close
            | Op::New
            | Op::Panic
            | Op::Print
            | Op::PrintN
            | Op::Recover
            | Op::Real
            | Op::Imag
            | Op::Complex
            | Op::Append
            | Op::Copy
            | Op::Delete
            | Op::Make
            | Op::MakeChan
            | Op::MakeMap
            | Op::MakeSlice => {
                let name = match node.op {
                    Op::MakeChan | Op::MakeMap | Op::MakeSlice => "make",
                    op => op.spelling(),
                };
                w.write_str(name)?;
                w.write_char('(')?;
                if node.left.is_some() {
                    self.display_opt(w, node.left)?;
                    if node.right.is_some() {
                        w.write_str(", ")?;
                        self.display_opt(w, node.right)?;
                    }
                } else {
                    self.display_list(w, &node.list, ", ")?;
                }
                if node.isddd {
                    w.write_str("...")?;
                }
                w.write_char(')')
            }
            Op::CompLit | Op::ArrayLit | Op::MapLit | Op::StructLit => {
                match (node.typ, node.right) {
                    (Some(t), _) => w.write_str(&self.tstr(t))?,
                    (None, Some(r)) => self.display_node(w, r)?,
                    _ => w.write_str("composite")?,
                }
                w.write_str(" literal")
            }
            Op::PtrLit => {
                w.write_char('&')?;
                match node.typ {
                    Some(t) => {
                        let elem = self.types.get(t).elem().unwrap_or(t);
                        w.write_str(&self.tstr(elem))?;
                    }
                    None => self.display_opt(w, node.left)?,
                }
                w.write_str(" literal")
            }
            Op::Closure => w.write_str("func literal"),
            Op::Key => {
                self.display_opt(w, node.left)?;
                w.write_char(':')?;
                self.display_opt(w, node.right)
            }
            Op::AddStr => self.display_list(w, &node.list, " + "),
            Op::Paren => {
                w.write_char('(')?;
                self.display_opt(w, node.left)?;
                w.write_char(')')
            }
            Op::Addr | Op::Ind | Op::Not | Op::Com | Op::Plus | Op::Minus | Op::Recv => {
                w.write_str(node.op.spelling())?;
                self.display_opt(w, node.left)
            }
            Op::Send => {
                self.display_opt(w, node.left)?;
                w.write_str(" <- ")?;
                self.display_opt(w, node.right)
            }
            Op::As | Op::AsOp => {
                self.display_opt(w, node.left)?;
                match (node.op, node.sub_op) {
                    (Op::AsOp, Some(sub)) => write!(w, " {}= ", sub)?,
                    _ if node.colas => w.write_str(" := ")?,
                    _ => w.write_str(" = ")?,
                }
                self.display_opt(w, node.right)
            }
            Op::As2 | Op::As2Func | Op::As2Recv | Op::As2MapR | Op::As2DotType => {
                self.display_list(w, &node.list, ", ")?;
                w.write_str(if node.colas { " := " } else { " = " })?;
                self.display_list(w, &node.rlist, ", ")
            }
            Op::Defer | Op::Proc => {
                write!(w, "{} ", node.op.spelling())?;
                self.display_opt(w, node.left)
            }
            Op::Return => {
                w.write_str("return")?;
                if !node.list.is_empty() {
                    w.write_char(' ')?;
                    self.display_list(w, &node.list, ", ")?;
                }
                Ok(())
            }
            op if node.left.is_some() && node.right.is_some() => {
                self.display_opt(w, node.left)?;
                write!(w, " {} ", op)?;
                self.display_opt(w, node.right)
            }
            op => write!(w, "{}", op),
        }
    }
}
