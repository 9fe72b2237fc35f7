// Copyright (c) 2025 knix
// All rights reserved.

//! Composite literals: `T{...}` for arrays, slices, maps and structs.

use fxhash::{FxHashMap, FxHashSet};
use log::trace;

use crate::ast::{NodeId, Op, TcState};
use crate::span::SpanId;
use crate::typer::consts::Val;
use crate::typer::syms::exportname;
use crate::typer::types::*;
use crate::typer::{Ctx, Typer};

/// Bucket of a constant map key. Keys in one bucket are compared for
/// equality; distinct buckets never hold equal keys.
fn keyhash(v: &Val) -> u32 {
    const PRIME1: u32 = 3;
    match v {
        Val::Int(i) | Val::Rune(i) => *i as u32,
        Val::Float(f) => {
            let mut x = f.to_bits();
            let mut h = 0u32;
            for _ in 0..8 {
                h = h.wrapping_mul(PRIME1).wrapping_add((x & 0xff) as u32);
                x >>= 8;
            }
            h
        }
        Val::Str(s) => s.bytes().fold(0u32, |h, b| h.wrapping_mul(PRIME1).wrapping_add(b as u32)),
        _ => 23,
    }
}

fn const_equal(a: &Val, b: &Val) -> bool {
    match (a, b) {
        (Val::Int(x) | Val::Rune(x), Val::Int(y) | Val::Rune(y)) => x == y,
        (Val::Float(x), Val::Float(y)) => x == y,
        (Val::Complex(xr, xi), Val::Complex(yr, yi)) => xr == yr && xi == yi,
        (Val::Str(x), Val::Str(y)) => x == y,
        (Val::Bool(x), Val::Bool(y)) => x == y,
        _ => false,
    }
}

impl Typer {
    /// Whether a literal of type `t` may omit its type inside an enclosing
    /// literal
    fn iscomptype(&self, t: TypeId) -> bool {
        let typ = self.types.get(t);
        let t = if typ.is_ptr() { self.types.elem(t) } else { t };
        matches!(self.types.etype(t), EType::Array | EType::Struct | EType::Map)
    }

    /// Gives an element literal with elided type the type `t`
    fn pushtype(&mut self, n: NodeId, t: TypeId) {
        if self.op(n) != Op::CompLit || !self.iscomptype(t) {
            return;
        }
        if self.node(n).right.is_none() {
            let tn = self.typenod(t);
            let node = self.node_mut(n);
            node.right = Some(tn);
            node.implicit = true;
        }
    }

    pub(crate) fn typecheck_complit(&mut self, n: NodeId) -> Option<NodeId> {
        let lno = self.lineno;
        let result = self.typecheck_complit1(n);
        self.lineno = lno;
        result
    }

    fn typecheck_complit1(&mut self, n: NodeId) -> Option<NodeId> {
        let Some(right) = self.node(n).right else {
            if let Some(&first) = self.node(n).list.first() {
                self.setlineno(first);
            }
            self.yyerror("missing type in composite literal");
            return None;
        };
        self.setlineno(right);
        let (_, lt) = self.tc_right(n, Ctx::ETYPE | Ctx::ECOMPLIT)?;
        let errors_before = self.nerrors;
        self.set_type(n, Some(lt));

        let mut t = lt;
        if self.types.get(t).is_ptr() {
            // Only the elided form inside another literal may be a pointer
            if !self.node(n).implicit {
                let elem = self.types.elem(t);
                let msg = format!(
                    "invalid pointer type {} for composite literal (use &{} instead)",
                    self.tstr(t),
                    self.tstr(elem)
                );
                self.yyerror(msg);
                return None;
            }
            if !self.iscomptype(t) {
                let msg = format!("invalid pointer type {} for composite literal", self.tstr(t));
                self.yyerror(msg);
                return None;
            }
            t = self.types.elem(t);
        }

        match self.types.etype(t) {
            EType::Array => self.typecheck_arraylit(n, t),
            EType::Map => self.typecheck_maplit(n, t),
            EType::Struct => self.typecheck_structlit(n, t),
            _ => {
                let msg = format!("invalid type for composite literal: {}", self.tstr(t));
                self.yyerror(msg);
                return None;
            }
        }
        trace!("composite literal of {}", self.tstr(t));

        if self.nerrors != errors_before || !self.types.get(lt).is_ptr() {
            return Some(n);
        }
        // The elided `&T{...}`
        let span = self.span(n);
        let p = self.nodes.nod(Op::PtrLit, Some(n), None, span);
        let node = self.node_mut(p);
        node.typ = Some(lt);
        node.typecheck = TcState::Done;
        let node = self.node_mut(n);
        node.typ = Some(t);
        node.typecheck = TcState::Done;
        Some(p)
    }

    fn typecheck_arraylit(&mut self, n: NodeId, t: TypeId) {
        let elem = self.types.elem(t);
        let mut elems = std::mem::take(&mut self.node_mut(n).list);
        let keyed = elems.iter().any(|e| self.op(*e) == Op::Key);
        let mut seen: FxHashSet<i64> = FxHashSet::default();
        let mut length: i64 = 0;
        let mut i: i64 = 0;
        let mut check_bounds = self.types.get(t).is_array() && !self.types.get(t).is_ddd_array();

        for e in elems.iter_mut() {
            self.setlineno(*e);
            let span = self.span(*e);
            if self.op(*e) != Op::Key {
                let index = self.nodintconst(i, span);
                self.node_mut(index).typecheck = TcState::Done;
                *e = self.nodes.nod(Op::Key, Some(index), Some(*e), span);
            }
            let Some(key) = self.node(*e).left else { continue };
            let key = self.typecheck(key, Ctx::ERV);
            self.evconst(key);
            self.node_mut(*e).left = Some(key);
            match self.nonnegconst(key) {
                Some(idx) => {
                    i = idx;
                    if keyed && !seen.insert(i) {
                        let msg = format!("duplicate index in array literal: {}", i);
                        self.yyerror(msg);
                    }
                }
                None => {
                    if !self.node(key).diag {
                        self.yyerror("index must be non-negative integer constant");
                        self.node_mut(key).diag = true;
                    }
                    // Stay negative for a while
                    i = -(1 << 30);
                }
            }
            i += 1;
            if i > length {
                length = i;
                if check_bounds && length > self.types.bound(t) {
                    self.setlineno(*e);
                    let msg = format!("array index {} out of bounds [0:{}]", length - 1, self.types.bound(t));
                    self.yyerror(msg);
                    check_bounds = false;
                }
            }

            let Some(value) = self.node(*e).right else { continue };
            self.pushtype(value, elem);
            let value = self.typecheck(value, Ctx::ERV);
            let value = self.defaultlit(value, Some(elem));
            let value = self.assignconv(value, elem, "array or slice literal");
            self.node_mut(*e).right = Some(value);
        }
        self.node_mut(n).list = elems;

        if self.types.get(t).is_ddd_array() {
            if let TypeKind::Array(a) = &mut self.types.get_mut(t).kind {
                a.bound = length;
            }
            self.checkwidth(t);
        }
        self.set_op(n, Op::ArrayLit);
    }

    fn typecheck_maplit(&mut self, n: NodeId, t: TypeId) {
        let (kt, vt) = (self.types.key(t), self.types.val(t));
        let mut elems = std::mem::take(&mut self.node_mut(n).list);
        let mut buckets: FxHashMap<u32, Vec<NodeId>> = FxHashMap::default();

        for e in elems.iter_mut() {
            self.setlineno(*e);
            if self.op(*e) != Op::Key {
                *e = self.typecheck(*e, Ctx::ERV);
                self.yyerror("missing key in map literal");
                continue;
            }
            if let Some(key) = self.node(*e).left {
                self.pushtype(key, kt);
                let key = self.typecheck(key, Ctx::ERV);
                let key = self.defaultlit(key, Some(kt));
                let key = self.assignconv(key, kt, "map key");
                self.node_mut(*e).left = Some(key);
                if self.op(key) != Op::Conv {
                    self.keydup(key, &mut buckets);
                }
            }
            if let Some(value) = self.node(*e).right {
                self.pushtype(value, vt);
                let value = self.typecheck(value, Ctx::ERV);
                let value = self.defaultlit(value, Some(vt));
                let value = self.assignconv(value, vt, "map value");
                self.node_mut(*e).right = Some(value);
            }
        }
        self.node_mut(n).list = elems;
        self.set_op(n, Op::MapLit);
    }

    /// Reports a constant key equal to one already in the literal. Keys that
    /// are not constants are never duplicates.
    fn keydup(&mut self, orig: NodeId, buckets: &mut FxHashMap<u32, Vec<NodeId>>) {
        let n = if self.op(orig) == Op::ConvIface { self.node(orig).left.unwrap_or(orig) } else { orig };
        self.evconst(n);
        if self.op(n) != Op::Literal {
            return;
        }
        let Some(val) = self.node(n).val.clone() else { return };
        let h = keyhash(&val);
        let bucket = buckets.entry(h).or_default();
        for &a in bucket.iter() {
            let a = if self.op(a) == Op::ConvIface && self.op(orig) == Op::ConvIface {
                self.node(a).left.unwrap_or(a)
            } else {
                a
            };
            if !self.types.eqtype_opt(self.ty(a), self.ty(n)) {
                continue;
            }
            if self.node(a).val.as_ref().is_some_and(|av| const_equal(av, &val)) {
                let msg = format!("duplicate key {} in map literal", self.nstr(n));
                self.yyerror(msg);
                return;
            }
        }
        bucket.push(orig);
    }

    fn typecheck_structlit(&mut self, n: NodeId, t: TypeId) {
        // Field offsets go into the keys
        self.dowidth(t);
        let fields: Vec<Field> = self.types.fields(t).to_vec();
        let mut elems = std::mem::take(&mut self.node_mut(n).list);
        let positional = !elems.is_empty() && elems.iter().all(|e| self.op(*e) != Op::Key);
        let mut bad = 0;

        if positional {
            let mut fields = fields.iter();
            let mut field = fields.next();
            for e in elems.iter_mut() {
                self.setlineno(*e);
                // Positional values never take an elided type
                let value = self.typecheck(*e, Ctx::ERV);
                *e = value;
                let Some(f) = field else {
                    if bad == 0 {
                        self.yyerror("too many values in struct initializer");
                    }
                    bad += 1;
                    continue;
                };
                if let Some(s) = f.sym {
                    let local = self.syms.get(s).pkg == self.syms.local_pkg;
                    if !exportname(self.syms.name(s)) && !local {
                        let msg = format!(
                            "implicit assignment of unexported field '{}' in {} literal",
                            self.syms.name(s),
                            self.tstr(t)
                        );
                        self.yyerror(msg);
                    }
                }
                let value = self.assignconv(value, f.typ, "field value");
                let span = self.span(value);
                let key = self.structkey(f, span);
                *e = self.nodes.nod(Op::Key, Some(key), Some(value), span);
                field = fields.next();
            }
            if field.is_some() {
                self.yyerror("too few values in struct initializer");
            }
        } else {
            let mut seen: FxHashSet<String> = FxHashSet::default();
            for e in elems.iter_mut() {
                self.setlineno(*e);
                if self.op(*e) != Op::Key {
                    if bad == 0 {
                        self.yyerror("mixture of field:value and value initializers");
                    }
                    bad += 1;
                    *e = self.typecheck(*e, Ctx::ERV);
                    continue;
                }
                let (key, value) = (self.node(*e).left, self.node(*e).right);
                let Some(s) = key.and_then(|k| self.node(k).sym) else {
                    let name = key.map(|k| self.nstr(k)).unwrap_or_default();
                    let msg = format!("invalid field name {} in struct initializer", name);
                    self.yyerror(msg);
                    if let Some(value) = value {
                        let value = self.typecheck(value, Ctx::ERV);
                        self.node_mut(*e).right = Some(value);
                    }
                    continue;
                };
                let Some(f) = self.lookdot1(None, s, t, &fields, 0) else {
                    let msg = format!("unknown {} field '{}' in struct literal", self.tstr(t), self.syms.name(s));
                    self.yyerror(msg);
                    continue;
                };
                let span = key.map(|k| self.span(k)).unwrap_or(self.span(*e));
                let key = self.structkey(&f, span);
                self.node_mut(*e).left = Some(key);

                let fname = f.sym.map(|s| self.syms.name(s).to_string()).unwrap_or_default();
                if !seen.insert(fname.clone()) {
                    let msg = format!("duplicate field name in struct literal: {}", fname);
                    self.yyerror(msg);
                }
                if let Some(value) = value {
                    let value = self.typecheck(value, Ctx::ERV);
                    let value = self.assignconv(value, f.typ, "field value");
                    self.node_mut(*e).right = Some(value);
                }
            }
        }
        self.node_mut(n).list = elems;
        self.set_op(n, Op::StructLit);
    }

    /// The key of a struct literal element: the field's name, carrying its
    /// offset
    fn structkey(&mut self, f: &Field, span: SpanId) -> NodeId {
        let key = match f.sym {
            Some(s) => self.newname(s, span),
            None => self.nodes.nod(Op::Name, None, None, span),
        };
        let node = self.node_mut(key);
        node.typ = Some(f.typ);
        node.xoffset = f.offset;
        node.typecheck = TcState::Done;
        key
    }
}
