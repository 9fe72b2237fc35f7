// Copyright (c) 2025 knix
// All rights reserved.

//! A total order over types for the optimizer's sorting and deduplication.
//! This is not language identity: it only has to be consistent, and it must
//! never separate byte from uint8 or rune from int32.

use std::cmp::Ordering;

use crate::panic_at_disco;
use crate::typer::syms::Syms;
use crate::typer::types::*;

impl Types {
    pub fn compare(&self, syms: &Syms, t: TypeId, x: TypeId) -> Ordering {
        if t == x {
            return Ordering::Equal;
        }
        let a = self.get(t);
        let b = self.get(x);
        if a.etype() != b.etype() {
            return a.etype().cmp(&b.etype());
        }

        if a.sym.is_some() || b.sym.is_some() {
            match a.etype() {
                EType::Uint8 if is_byte_alias(t) && is_byte_alias(x) => return Ordering::Equal,
                EType::Int32 if is_rune_alias(t) && is_rune_alias(x) => return Ordering::Equal,
                _ => {}
            }
        }
        match syms.cmpsym(a.sym, b.sym) {
            Ordering::Equal => {}
            c => return c,
        }
        if b.sym.is_some() {
            return a.vargen.cmp(&b.vargen);
        }

        match (&a.kind, &b.kind) {
            (TypeKind::Map(ma), TypeKind::Map(mb)) => {
                self.compare(syms, ma.key, mb.key).then_with(|| self.compare(syms, ma.val, mb.val))
            }
            (TypeKind::Ptr(ea), TypeKind::Ptr(eb)) => self.compare(syms, *ea, *eb),
            (TypeKind::Struct(sa), TypeKind::Struct(sb)) => {
                match (sa.map_part, sb.map_part) {
                    (None, None) => self.compare_fields(syms, &sa.fields, &sb.fields),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    // Family members compare by the map they belong to, never by
                    // walking back into the map through their fields
                    (Some(pa), Some(pb)) => {
                        pa.role.cmp(&pb.role).then_with(|| self.compare(syms, pa.map, pb.map))
                    }
                }
            }
            (TypeKind::Interface(ia), TypeKind::Interface(ib)) => {
                self.compare_fields(syms, &ia.methods, &ib.methods)
            }
            (TypeKind::Func(fa), TypeKind::Func(fb)) => {
                for (la, lb) in [(fa.recvs, fb.recvs), (fa.params, fb.params), (fa.results, fb.results)] {
                    let xs = self.fields(la);
                    let ys = self.fields(lb);
                    for (p, q) in xs.iter().zip(ys.iter()) {
                        if p.isddd != q.isddd {
                            // Non-variadic sorts first
                            return if !p.isddd { Ordering::Less } else { Ordering::Greater };
                        }
                        match self.compare(syms, p.typ, q.typ) {
                            Ordering::Equal => {}
                            c => return c,
                        }
                    }
                    if xs.len() != ys.len() {
                        return xs.len().cmp(&ys.len());
                    }
                }
                Ordering::Equal
            }
            (TypeKind::Array(aa), TypeKind::Array(ab)) => {
                aa.bound.cmp(&ab.bound).then_with(|| self.compare(syms, aa.elem, ab.elem))
            }
            (TypeKind::Chan(ca), TypeKind::Chan(cb)) => {
                ca.dir.cmp(&cb.dir).then_with(|| self.compare(syms, ca.elem, cb.elem))
            }
            (ka, _) if a.is_basic() || matches!(ka, TypeKind::String | TypeKind::Ideal | TypeKind::Nil | TypeKind::Blank | TypeKind::Any) => {
                Ordering::Equal
            }
            _ => panic_at_disco!("Do not know how to compare {} with {}", a.etype(), b.etype()),
        }
    }

    fn compare_fields(&self, syms: &Syms, xs: &[Field], ys: &[Field]) -> Ordering {
        for (p, q) in xs.iter().zip(ys.iter()) {
            if p.embedded != q.embedded {
                return p.embedded.cmp(&q.embedded);
            }
            if p.note != q.note {
                return p.note.cmp(&q.note);
            }
            match syms.cmpsym(p.sym, q.sym) {
                Ordering::Equal => {}
                c => return c,
            }
            match self.compare(syms, p.typ, q.typ) {
                Ordering::Equal => {}
                c => return c,
            }
        }
        xs.len().cmp(&ys.len())
    }
}
