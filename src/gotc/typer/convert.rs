// Copyright (c) 2025 knix
// All rights reserved.

//! Assignability and convertibility between types, and the implicit
//! conversion nodes an assignment inserts.

use crate::ast::{NodeId, Op, TcState};
use crate::typer::Typer;
use crate::typer::types::*;

impl Typer {
    /// The machine kind a sized or platform-dependent kind is represented as
    pub fn simtype(&self, et: EType) -> EType {
        let sized = |bytes: u32, signed: bool| match (bytes, signed) {
            (4, true) => EType::Int32,
            (4, false) => EType::Uint32,
            (_, true) => EType::Int64,
            (_, false) => EType::Uint64,
        };
        match et {
            EType::Int => sized(self.config.int_size, true),
            EType::Uint => sized(self.config.int_size, false),
            EType::Uintptr => sized(self.config.ptr_size, false),
            EType::Ptr | EType::UnsafePtr | EType::Map | EType::Chan | EType::Func => EType::Ptr,
            et => et,
        }
    }

    pub fn is_empty_interface(&self, t: TypeId) -> bool {
        let typ = self.types.get(t);
        typ.is_interface() && typ.fields().is_empty()
    }

    fn is_ptr_to_interface(&self, t: TypeId) -> bool {
        let typ = self.types.get(t);
        typ.is_ptr() && self.types.get(self.types.elem(t)).is_interface()
    }

    /// Whether a value of type `src` is assignable to `dst`. Returns the
    /// conversion the assignment needs, or None with the reason appended to
    /// the diagnostic.
    pub fn assignop(&mut self, src: TypeId, dst: TypeId) -> (Option<Op>, String) {
        let mut why = String::new();
        if src == dst {
            return (Some(Op::ConvNop), why);
        }
        if self.types.get(src).is_forward() || self.types.get(dst).is_forward() {
            return (None, why);
        }

        // Identical types
        if self.types.eqtype(src, dst) {
            return (Some(Op::ConvNop), why);
        }

        // Identical underlying types with at least one side unnamed. Distinct
        // non-empty interfaces still need their method table recomputed.
        let (src_orig, dst_orig) = (self.types.get(src).orig, self.types.get(dst).orig);
        let unnamed = self.types.get(src).sym.is_none() || self.types.get(dst).sym.is_none();
        if self.types.eqtype(src_orig, dst_orig) && (unnamed || self.is_empty_interface(src)) {
            return (Some(Op::ConvNop), why);
        }

        // dst is an interface that src implements
        if self.types.get(dst).is_interface() && src != NIL_TYPE_ID {
            match self.implements(src, dst) {
                Ok(()) => return (Some(Op::ConvIface), why),
                Err(m) => {
                    // The broken method was reported already
                    let broke = m.have.as_ref().is_some_and(|h| {
                        h.sym == m.missing.sym && (self.types.get(h.typ).broke || self.types.get(m.missing.typ).broke)
                    });
                    if broke {
                        return (Some(Op::ConvIface), why);
                    }
                    why = if self.is_ptr_to_interface(src) {
                        format!(":\n\t{} is pointer to interface, not interface", self.tstr(src))
                    } else {
                        self.missing_method_reason(src, dst, &m)
                    };
                    return (None, why);
                }
            }
        }

        if self.is_ptr_to_interface(dst) {
            why = format!(":\n\t{} is pointer to interface, not interface", self.tstr(dst));
            return (None, why);
        }

        if self.types.get(src).is_interface() && dst != BLANK_TYPE_ID {
            if self.implements(dst, src).is_ok() {
                why = ": need type assertion".to_string();
            }
            return (None, why);
        }

        // A bidirectional channel converts to a directional one of the same element
        if self.types.get(src).is_chan() && self.types.chan_dir(src) == ChanDir::BOTH && self.types.get(dst).is_chan() {
            let same_elem = self.types.eqtype(self.types.elem(src), self.types.elem(dst));
            if same_elem && unnamed {
                return (Some(Op::ConvNop), why);
            }
        }

        // nil to a nillable type
        if src == NIL_TYPE_ID {
            let typ = self.types.get(dst);
            let nillable = match typ.etype() {
                EType::Array => typ.is_slice(),
                EType::Ptr | EType::Func | EType::Map | EType::Chan | EType::Inter | EType::UnsafePtr => true,
                _ => false,
            };
            if nillable {
                return (Some(Op::ConvNop), why);
            }
        }

        // Anything typed can be discarded
        if dst == BLANK_TYPE_ID {
            return (Some(Op::ConvNop), why);
        }

        (None, why)
    }

    /// Whether an explicit conversion `dst(x)` with `x` of type `src` is legal
    pub fn convertop(&mut self, src: TypeId, dst: TypeId) -> (Option<Op>, String) {
        if src == dst {
            return (Some(Op::ConvNop), String::new());
        }
        let (op, why) = self.assignop(src, dst);
        if op.is_some() {
            return (op, why);
        }
        // The assignment message is the one to keep for interfaces
        let (s, d) = (self.types.get(src), self.types.get(dst));
        if s.is_interface() || d.is_interface() {
            return (None, why);
        }

        if self.types.eqtype(s.orig, d.orig) {
            return (Some(Op::ConvNop), String::new());
        }

        if s.is_ptr() && d.is_ptr() && s.sym.is_none() && d.sym.is_none() {
            let se = self.types.get(self.types.elem(src)).orig;
            let de = self.types.get(self.types.elem(dst)).orig;
            if self.types.eqtype(se, de) {
                return (Some(Op::ConvNop), String::new());
            }
        }

        let numeric = |t: &Type| t.is_integer() || t.is_float();
        if (numeric(s) && numeric(d)) || (s.is_complex() && d.is_complex()) {
            let op = if self.simtype(s.etype()) == self.simtype(d.etype()) { Op::ConvNop } else { Op::Conv };
            return (Some(op), String::new());
        }

        // Integer to string, and string to and from byte and rune slices
        if s.is_integer() && d.is_string() {
            return (Some(Op::Conv), String::new());
        }
        let is_bytes_or_runes = |t: TypeId| {
            let typ = self.types.get(t);
            typ.is_slice()
                && matches!(self.types.etype(self.types.elem(t)), EType::Uint8 | EType::Int32)
        };
        if (d.is_string() && is_bytes_or_runes(src)) || (s.is_string() && is_bytes_or_runes(dst)) {
            return (Some(Op::Conv), String::new());
        }

        // unsafe.Pointer to and from pointers and uintptr
        if (s.is_ptr() || s.etype() == EType::Uintptr) && d.is_unsafe_ptr() {
            return (Some(Op::ConvNop), String::new());
        }
        if s.is_unsafe_ptr() && (d.is_ptr() || d.etype() == EType::Uintptr) {
            return (Some(Op::ConvNop), String::new());
        }

        (None, String::new())
    }

    /// Converts `n` for assignment to a `t`. Untyped values take type `t`;
    /// otherwise an implicit conversion node is inserted.
    pub fn assignconv(&mut self, n: NodeId, t: TypeId, context: &str) -> NodeId {
        let Some(nt) = self.ty(n) else { return n };
        if self.types.get(nt).broke {
            return n;
        }
        if t == BLANK_TYPE_ID && nt == NIL_TYPE_ID {
            self.yyerror("use of untyped nil");
        }

        // Errors about the value itself are reported below
        let old_diag = self.node(n).diag;
        self.node_mut(n).diag = true;
        let mut n2 = self.defaultlit(n, Some(t));
        self.node_mut(n).diag = old_diag;
        self.node_mut(n2).diag = old_diag;
        if t == BLANK_TYPE_ID {
            return n2;
        }

        // An untyped bool name or constant used as a defined bool type
        if self.ty(n2) == Some(IDEAL_BOOL_TYPE_ID) && !self.types.get(t).is_boolean() {
            if matches!(self.op(n2), Op::Name | Op::Literal) {
                n2 = self.implicit_conv(Op::ConvNop, n2, BOOL_TYPE_ID);
            }
        }

        let Some(nt) = self.ty(n2) else { return n2 };
        if self.types.eqtype(nt, t) {
            return n2;
        }
        let (op, why) = self.assignop(nt, t);
        let op = match op {
            Some(op) => op,
            None => {
                let msg = format!("cannot use {} as type {} in {}{}", self.nstr_long(n2), self.tstr(t), context, why);
                self.yyerror(msg);
                Op::Conv
            }
        };
        self.implicit_conv(op, n2, t)
    }

    pub(crate) fn implicit_conv(&mut self, op: Op, n: NodeId, t: TypeId) -> NodeId {
        let span = self.span(n);
        let r = self.nodes.nod(op, Some(n), None, span);
        let node = self.node_mut(r);
        node.typ = Some(t);
        node.typecheck = TcState::Done;
        node.implicit = true;
        r
    }
}
