// Copyright (c) 2025 knix
// All rights reserved.

use std::fmt::{Display, Formatter};

use crate::ast::{NodeId, Op};
use crate::span::SpanId;
use crate::typer::Typer;
use crate::typer::types::*;

/// A compile-time constant value. Untyped integer constants are carried at
/// 128 bits, which covers every representable constant of a sized type.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Bool(bool),
    Int(i128),
    Rune(i128),
    Float(f64),
    Complex(f64, f64),
    Str(String),
    Nil,
}

/// Constant kinds, ordered so that the larger of two numeric kinds is the one
/// a mixed expression takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CType {
    Int,
    Rune,
    Float,
    Complex,
    Str,
    Bool,
    Nil,
}

impl Val {
    pub fn ctype(&self) -> CType {
        match self {
            Val::Bool(_) => CType::Bool,
            Val::Int(_) => CType::Int,
            Val::Rune(_) => CType::Rune,
            Val::Float(_) => CType::Float,
            Val::Complex(_, _) => CType::Complex,
            Val::Str(_) => CType::Str,
            Val::Nil => CType::Nil,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Val::Int(i) | Val::Rune(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Val::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn to_float(&self) -> Val {
        match self {
            Val::Int(i) | Val::Rune(i) => Val::Float(*i as f64),
            Val::Complex(re, _) => Val::Float(*re),
            v => v.clone(),
        }
    }

    fn to_complex(&self) -> Val {
        match self {
            Val::Int(i) | Val::Rune(i) => Val::Complex(*i as f64, 0.0),
            Val::Float(f) => Val::Complex(*f, 0.0),
            v => v.clone(),
        }
    }
}

impl Display for Val {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::Bool(b) => write!(f, "{}", b),
            Val::Int(i) => write!(f, "{}", i),
            Val::Rune(r) => match u32::try_from(*r).ok().and_then(char::from_u32) {
                Some(c) => write!(f, "{:?}", c),
                None => write!(f, "{}", r),
            },
            Val::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 1e21 {
                    write!(f, "{}", *x as i128)
                } else {
                    write!(f, "{}", x)
                }
            }
            Val::Complex(re, im) => write!(f, "({}+{}i)", re, im),
            Val::Str(s) => write!(f, "{:?}", s),
            Val::Nil => f.write_str("nil"),
        }
    }
}

impl Typer {
    pub fn nodlit(&mut self, val: Val, span: SpanId) -> NodeId {
        let typ = match &val {
            Val::Bool(_) => IDEAL_BOOL_TYPE_ID,
            Val::Int(_) | Val::Rune(_) | Val::Float(_) | Val::Complex(_, _) => IDEAL_TYPE_ID,
            Val::Str(_) => IDEAL_STRING_TYPE_ID,
            Val::Nil => NIL_TYPE_ID,
        };
        let n = self.nodes.nod(Op::Literal, None, None, span);
        let node = self.node_mut(n);
        node.val = Some(val);
        node.typ = Some(typ);
        n
    }

    pub fn nodintconst(&mut self, v: i64, span: SpanId) -> NodeId {
        let n = self.nodlit(Val::Int(v as i128), span);
        self.set_type(n, Some(INT_TYPE_ID));
        n
    }

    pub fn nodbool(&mut self, b: bool, span: SpanId) -> NodeId {
        self.nodlit(Val::Bool(b), span)
    }

    pub fn consttype(&self, n: NodeId) -> Option<CType> {
        let node = self.node(n);
        if node.op != Op::Literal {
            return None;
        }
        node.val.as_ref().map(|v| v.ctype())
    }

    pub fn isconst(&self, n: NodeId, ct: CType) -> bool {
        self.consttype(n) == Some(ct)
    }

    /// A constant expression in the language's sense
    pub fn is_go_const(&self, n: NodeId) -> bool {
        let node = self.node(n);
        node.op == Op::Literal && node.val.as_ref().is_some_and(|v| *v != Val::Nil)
    }

    /// A typed integer constant that fits in 32 bits
    pub fn smallintconst(&self, n: NodeId) -> bool {
        let node = self.node(n);
        if node.op != Op::Literal {
            return false;
        }
        let Some(t) = node.typ else { return false };
        if !self.types.get(t).is_integer() && t != IDEAL_TYPE_ID && t != BOOL_TYPE_ID {
            return false;
        }
        match &node.val {
            Some(Val::Int(i)) | Some(Val::Rune(i)) => *i >= i32::MIN as i128 && *i <= i32::MAX as i128,
            Some(Val::Bool(_)) => true,
            _ => false,
        }
    }

    /// The value of a non-negative integer constant that fits an int
    pub fn nonnegconst(&self, n: NodeId) -> Option<i64> {
        let node = self.node(n);
        if node.op != Op::Literal {
            return None;
        }
        match &node.val {
            Some(Val::Int(i)) | Some(Val::Rune(i)) if *i >= 0 && *i <= i32::MAX as i128 => Some(*i as i64),
            _ => None,
        }
    }

    /// Inclusive value range of an integer type on the configured target
    pub fn int_range(&self, t: TypeId) -> (i128, i128) {
        let (bits, signed) = match self.types.etype(t) {
            EType::Int8 => (8, true),
            EType::Uint8 => (8, false),
            EType::Int16 => (16, true),
            EType::Uint16 => (16, false),
            EType::Int32 => (32, true),
            EType::Uint32 => (32, false),
            EType::Int64 => (64, true),
            EType::Uint64 => (64, false),
            EType::Int => (self.config.int_size * 8, true),
            EType::Uint => (self.config.int_size * 8, false),
            EType::Uintptr => (self.config.ptr_size * 8, false),
            et => self.ice(format!("int_range of {}", et), None),
        };
        if signed {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        } else {
            (0, (1i128 << bits) - 1)
        }
    }

    pub(crate) fn doesoverflow(&self, v: &Val, t: TypeId) -> bool {
        let typ = self.types.get(t);
        match v {
            Val::Int(i) | Val::Rune(i) if typ.is_integer() => {
                let (lo, hi) = self.int_range(t);
                *i < lo || *i > hi
            }
            Val::Float(f) if typ.is_float() => flt_overflows(*f, t),
            Val::Complex(re, im) if typ.is_complex() => {
                let part = if t == COMPLEX64_TYPE_ID { FLOAT32_TYPE_ID } else { FLOAT64_TYPE_ID };
                flt_overflows(*re, part) || flt_overflows(*im, part)
            }
            _ => false,
        }
    }

    pub(crate) fn overflow(&mut self, v: &Val, t: Option<TypeId>) {
        let Some(t) = t else { return };
        if t == IDEAL_TYPE_ID || t == UNSAFE_PTR_TYPE_ID {
            return;
        }
        if self.doesoverflow(v, t) {
            let msg = format!("constant {} overflows {}", v, self.tstr(t));
            self.yyerror(msg);
        }
    }

    pub(crate) fn toint(&mut self, v: Val) -> Val {
        match v {
            Val::Float(f) => {
                if f.fract() != 0.0 || !f.is_finite() {
                    self.yyerror(format!("constant {} truncated to integer", Val::Float(f)));
                }
                Val::Int(f.trunc() as i128)
            }
            Val::Complex(re, im) => {
                if re.fract() != 0.0 || im != 0.0 {
                    self.yyerror(format!("constant {}{:+}i truncated to integer", re, im));
                }
                Val::Int(re.trunc() as i128)
            }
            Val::Rune(r) => Val::Int(r),
            v => v,
        }
    }

    pub(crate) fn toflt(&mut self, v: Val) -> Val {
        if let Val::Complex(re, im) = v {
            if im != 0.0 {
                self.yyerror(format!("constant {}{:+}i truncated to real", re, im));
            }
        }
        v.to_float()
    }

    /// Kind of the constant value an untyped expression produces
    pub(crate) fn idealkind(&self, n: NodeId) -> Option<CType> {
        let node = self.node(n);
        let t = node.typ?;
        if !is_untyped(t) {
            return None;
        }
        match node.op {
            Op::Literal => node.val.as_ref().map(|v| v.ctype()),
            Op::Add
            | Op::And
            | Op::AndNot
            | Op::Com
            | Op::Div
            | Op::Minus
            | Op::Mod
            | Op::Mul
            | Op::Sub
            | Op::Xor
            | Op::Or
            | Op::Plus => {
                let k1 = node.left.and_then(|l| self.idealkind(l));
                let k2 = node.right.and_then(|r| self.idealkind(r));
                k1.max(k2)
            }
            Op::Real | Op::Imag => Some(CType::Float),
            Op::Complex => Some(CType::Complex),
            Op::AddStr => Some(CType::Str),
            Op::AndAnd
            | Op::Eq
            | Op::Ge
            | Op::Gt
            | Op::Le
            | Op::Lt
            | Op::Ne
            | Op::Not
            | Op::OrOr => Some(CType::Bool),
            Op::Lsh | Op::Rsh => node.left.and_then(|l| self.idealkind(l)),
            _ => None,
        }
    }

    /// Literal nodes may be shared by every use of a constant; never retype one in place
    fn own_literal(&mut self, n: NodeId) -> NodeId {
        if self.op(n) == Op::Literal { self.nodes.copy(n) } else { n }
    }

    /// Gives an untyped expression its default type, or `t` when one is wanted
    pub fn defaultlit(&mut self, n: NodeId, t: Option<TypeId>) -> NodeId {
        let Some(nt) = self.ty(n) else { return n };
        if !is_untyped(nt) {
            return n;
        }
        let n = self.own_literal(n);
        let span = self.span(n);
        let lno = self.lineno;
        let saved = std::mem::replace(&mut self.lineno, if span.is_none() { lno } else { span });
        let result = match self.idealkind(n) {
            None | Some(CType::Nil) | Some(CType::Str) => {
                if let Some(t) = t {
                    self.convlit(n, t)
                } else if self.node(n).val == Some(Val::Nil) || nt == NIL_TYPE_ID {
                    if !self.node(n).diag {
                        self.yyerror("use of untyped nil");
                        self.node_mut(n).diag = true;
                    }
                    self.set_type(n, None);
                    n
                } else {
                    self.convlit(n, STRING_TYPE_ID)
                }
            }
            Some(CType::Bool) => {
                let t1 = match t {
                    Some(t) if self.types.get(t).is_boolean() => t,
                    _ => BOOL_TYPE_ID,
                };
                self.convlit(n, t1)
            }
            Some(k) => {
                let mut t1 = match k {
                    CType::Int => INT_TYPE_ID,
                    CType::Rune => RUNE_TYPE_ID,
                    CType::Float => FLOAT64_TYPE_ID,
                    _ => COMPLEX128_TYPE_ID,
                };
                if let Some(t) = t {
                    let typ = self.types.get(t);
                    let val = self.node(n).val.clone();
                    if typ.is_integer() {
                        t1 = t;
                        if let Some(v) = val {
                            let v = self.toint(v);
                            self.node_mut(n).val = Some(v);
                        }
                    } else if typ.is_float() {
                        t1 = t;
                        if let Some(v) = val {
                            let v = self.toflt(v);
                            self.node_mut(n).val = Some(v);
                        }
                    } else if typ.is_complex() {
                        t1 = t;
                        if let Some(v) = val {
                            self.node_mut(n).val = Some(v.to_complex());
                        }
                    }
                }
                if let Some(v) = self.node(n).val.clone() {
                    self.overflow(&v, Some(t1));
                }
                self.convlit(n, t1)
            }
        };
        self.lineno = saved;
        result
    }

    /// Defaults a pair of operands toward each other. With `force`, two untyped
    /// operands still get default types.
    pub fn defaultlit2(&mut self, l: NodeId, r: NodeId, force: bool) -> (NodeId, NodeId) {
        let (Some(lt), Some(rt)) = (self.ty(l), self.ty(r)) else {
            return (l, r);
        };
        if !is_untyped(lt) {
            let r = self.convlit(r, lt);
            return (l, r);
        }
        if !is_untyped(rt) {
            let l = self.convlit(l, rt);
            return (l, r);
        }
        if !force {
            return (l, r);
        }
        if self.types.get(lt).is_boolean() {
            let l = self.convlit(l, BOOL_TYPE_ID);
            let r = self.convlit(r, BOOL_TYPE_ID);
            return (l, r);
        }
        let lkind = self.idealkind(l);
        let rkind = self.idealkind(r);
        let t = match lkind.max(rkind) {
            Some(CType::Complex) => COMPLEX128_TYPE_ID,
            Some(CType::Float) => FLOAT64_TYPE_ID,
            Some(CType::Rune) => RUNE_TYPE_ID,
            Some(CType::Str) => STRING_TYPE_ID,
            _ => INT_TYPE_ID,
        };
        if lkind == Some(CType::Nil) || rkind == Some(CType::Nil) {
            return (l, r);
        }
        let l = self.convlit(l, t);
        let r = self.convlit(r, t);
        (l, r)
    }

    pub fn convlit(&mut self, n: NodeId, t: TypeId) -> NodeId {
        self.convlit1(n, t, false)
    }

    /// Converts a constant or untyped expression to type `t`. Explicit
    /// conversions additionally allow integer constants to become strings and
    /// typed constants to change type.
    pub fn convlit1(&mut self, n: NodeId, t: TypeId, explicit: bool) -> NodeId {
        let Some(nt) = self.ty(n) else { return n };
        if is_untyped(t) || nt == t {
            return n;
        }
        if !explicit && !is_untyped(nt) {
            return n;
        }
        let n = self.own_literal(n);

        match self.op(n) {
            Op::Literal => {
                if !self.types.etype(t).ok_for_const() && nt != NIL_TYPE_ID {
                    return self.defaultlit(n, None);
                }
            }
            Op::Lsh | Op::Rsh => {
                let Some(l) = self.node(n).left else { return n };
                let l_untyped = self.ty(l).is_some_and(is_untyped);
                let l = self.convlit1(l, t, explicit && l_untyped);
                self.node_mut(n).left = Some(l);
                let mut t = self.ty(l);
                if let Some(lt) = t {
                    if !self.types.get(lt).is_integer() {
                        let msg = format!(
                            "invalid operation: {} (shift of type {})",
                            self.nstr(n),
                            self.tstr(lt)
                        );
                        self.yyerror(msg);
                        t = None;
                    }
                }
                self.set_type(n, t);
                return n;
            }
            Op::Complex => {
                if nt == IDEAL_TYPE_ID {
                    let (t, part) = if t == COMPLEX64_TYPE_ID {
                        (COMPLEX64_TYPE_ID, FLOAT32_TYPE_ID)
                    } else {
                        (COMPLEX128_TYPE_ID, FLOAT64_TYPE_ID)
                    };
                    self.set_type(n, Some(t));
                    if let Some(l) = self.node(n).left {
                        let l = self.convlit(l, part);
                        self.node_mut(n).left = Some(l);
                    }
                    if let Some(r) = self.node(n).right {
                        let r = self.convlit(r, part);
                        self.node_mut(n).right = Some(r);
                    }
                }
                return n;
            }
            _ => {
                if nt == IDEAL_BOOL_TYPE_ID {
                    let bt = if self.types.get(t).is_boolean() { t } else { BOOL_TYPE_ID };
                    self.set_type(n, Some(bt));
                }
                if nt == IDEAL_TYPE_ID {
                    if let Some(l) = self.node(n).left {
                        let l = self.convlit(l, t);
                        self.node_mut(n).left = Some(l);
                    }
                    if let Some(r) = self.node(n).right {
                        let r = self.convlit(r, t);
                        self.node_mut(n).right = Some(r);
                    }
                    self.set_type(n, Some(t));
                }
                return n;
            }
        }

        if self.types.eqtype(nt, t) {
            return n;
        }
        let Some(val) = self.node(n).val.clone() else {
            return self.convlit_bad(n, t);
        };
        let et = self.types.etype(t);
        if et == EType::Inter {
            if val == Val::Nil && nt == NIL_TYPE_ID {
                self.set_type(n, Some(t));
                return n;
            }
            return self.defaultlit(n, None);
        }

        let new_val = match val {
            Val::Nil => match et {
                EType::String => return n,
                EType::Array if self.types.get(t).is_slice() => None,
                EType::Ptr | EType::Map | EType::Chan | EType::Func | EType::UnsafePtr => None,
                EType::Uintptr if nt == UNSAFE_PTR_TYPE_ID => Some(Val::Int(0)),
                _ => {
                    self.set_type(n, None);
                    return self.convlit_bad(n, t);
                }
            },
            Val::Str(_) | Val::Bool(_) => {
                if et != self.types.etype(nt) {
                    return self.convlit_bad(n, t);
                }
                None
            }
            v => {
                if nt == UNSAFE_PTR_TYPE_ID && et != EType::Uintptr {
                    return self.convlit_bad(n, t);
                }
                if et.is_int() {
                    let v = self.toint(v);
                    self.overflow(&v, Some(t));
                    Some(v)
                } else if et.is_float() {
                    let v = self.toflt(v);
                    let v = truncfltlit(v, t);
                    self.overflow(&v, Some(t));
                    Some(v)
                } else if et.is_complex() {
                    let v = v.to_complex();
                    self.overflow(&v, Some(t));
                    Some(v)
                } else if et == EType::String && explicit && matches!(v, Val::Int(_) | Val::Rune(_)) {
                    Some(tostr(&v))
                } else {
                    return self.convlit_bad(n, t);
                }
            }
        };
        if let Some(v) = new_val {
            self.node_mut(n).val = Some(v);
        }
        self.set_type(n, Some(t));
        n
    }

    fn convlit_bad(&mut self, n: NodeId, t: TypeId) -> NodeId {
        if !self.node(n).diag {
            if !self.types.get(t).broke {
                let msg = format!("cannot convert {} to type {}", self.nstr(n), self.tstr(t));
                self.yyerror(msg);
            }
            self.node_mut(n).diag = true;
        }
        if self.ty(n).is_some_and(is_untyped) {
            return self.defaultlit(n, None);
        }
        n
    }

    fn illegal_const(&mut self, n: NodeId, l: NodeId, r: NodeId) {
        if !self.node(n).diag {
            let msg = format!(
                "illegal constant expression: {} {} {}",
                self.tstr_opt(self.ty(l)),
                self.op(n),
                self.tstr_opt(self.ty(r))
            );
            self.yyerror(msg);
            self.node_mut(n).diag = true;
        }
    }

    /// Folds operators whose operands are constants, turning `n` into a literal
    pub fn evconst(&mut self, n: NodeId) {
        let op = self.op(n);
        match op {
            Op::Add
            | Op::And
            | Op::AndAnd
            | Op::AndNot
            | Op::Com
            | Op::Div
            | Op::Eq
            | Op::Ge
            | Op::Gt
            | Op::Le
            | Op::Lsh
            | Op::Lt
            | Op::Minus
            | Op::Mod
            | Op::Mul
            | Op::Ne
            | Op::Not
            | Op::Or
            | Op::OrOr
            | Op::Plus
            | Op::Rsh
            | Op::Sub
            | Op::Xor => {}
            Op::Conv => {
                let Some(t) = self.ty(n) else { return };
                if !self.types.etype(t).ok_for_const() && t != NIL_TYPE_ID {
                    return;
                }
            }
            Op::AddStr => {
                self.merge_string_constants(n);
                return;
            }
            _ => return,
        }

        let Some(nl) = self.node(n).left else { return };
        let Some(lt) = self.ty(nl) else { return };
        if self.consttype(nl).is_none() {
            return;
        }

        let Some(nr) = self.node(n).right else {
            self.evconst_unary(n, nl, lt);
            return;
        };
        let Some(rt) = self.ty(nr) else { return };
        if self.consttype(nr).is_none() {
            return;
        }

        let general = |typer: &Typer, t: TypeId| {
            let et = typer.types.etype(t);
            if et.is_int() || et.is_float() || et.is_complex() { EType::Ideal } else { et }
        };
        let wl = general(self, lt);
        let wr = general(self, rt);
        if wl != wr {
            self.illegal_const(n, nl, nr);
            return;
        }

        let (nl, nr) = if op.is_shift() {
            let nr = self.defaultlit(nr, Some(UINT_TYPE_ID));
            self.node_mut(n).right = Some(nr);
            if let Some(rt) = self.ty(nr) {
                let rtyp = self.types.get(rt);
                if rtyp.is_signed() || !rtyp.is_integer() {
                    self.illegal_const(n, nl, nr);
                    return;
                }
            }
            (nl, nr)
        } else {
            let mut nl = nl;
            let mut nr = nr;
            if self.ty(nl) != Some(IDEAL_TYPE_ID) {
                nr = self.defaultlit(nr, self.ty(nl));
                self.node_mut(n).right = Some(nr);
            }
            if self.ty(nr) != Some(IDEAL_TYPE_ID) {
                nl = self.defaultlit(nl, self.ty(nr));
                self.node_mut(n).left = Some(nl);
            }
            let (Some(lt), Some(rt)) = (self.ty(nl), self.ty(nr)) else { return };
            if self.types.etype(lt) != self.types.etype(rt) {
                self.illegal_const(n, nl, nr);
                return;
            }
            (nl, nr)
        };

        let (Some(mut v), Some(mut rv)) = (self.node(nl).val.clone(), self.node(nr).val.clone()) else {
            return;
        };
        if op.is_shift() {
            if v.ctype() != CType::Rune {
                v = self.toint(v);
            }
            rv = self.toint(rv);
        }
        if v.ctype() == CType::Complex || rv.ctype() == CType::Complex {
            v = v.to_complex();
            rv = rv.to_complex();
        }
        if v.ctype() == CType::Float || rv.ctype() == CType::Float {
            v = v.to_float();
            rv = rv.to_float();
        }
        match (&v, &rv) {
            (Val::Rune(_), Val::Int(i)) => rv = Val::Rune(*i),
            (Val::Int(i), Val::Rune(r)) => {
                if op.is_shift() {
                    rv = Val::Int(*r);
                } else {
                    v = Val::Rune(*i);
                }
            }
            _ => {}
        }
        if v.ctype() != rv.ctype() {
            if self.nerrors > 0 {
                return;
            }
            self.ice(format!("constant type mismatch {} {}", v, rv), None);
        }

        let result = match self.fold_binary(n, op, &v, &rv) {
            Folded::Value(v) => v,
            Folded::Bool(b) => {
                self.set_bool_result(n, nl, op, b);
                return;
            }
            Folded::Illegal => {
                self.illegal_const(n, nl, nr);
                return;
            }
            Folded::Stop => return,
        };
        self.finish_const(n, nl, result);
    }

    fn evconst_unary(&mut self, n: NodeId, nl: NodeId, lt: TypeId) {
        let op = self.op(n);
        let Some(v) = self.node(nl).val.clone() else { return };
        let result = match (op, v) {
            (Op::Conv, Val::Nil) if self.ty(n).is_some_and(|t| self.types.get(t).is_string()) => {
                Val::Str(String::new())
            }
            (Op::Conv, _) => {
                let Some(t) = self.ty(n) else { return };
                let converted = self.convlit1(nl, t, true);
                self.node_mut(n).left = Some(converted);
                match self.node(converted).val.clone() {
                    Some(v) => {
                        self.finish_const(n, converted, v);
                    }
                    None => {}
                }
                return;
            }
            (Op::Plus, v @ (Val::Int(_) | Val::Rune(_) | Val::Float(_) | Val::Complex(_, _))) => v,
            (Op::Minus, Val::Int(i)) => Val::Int(-i),
            (Op::Minus, Val::Rune(i)) => Val::Rune(-i),
            (Op::Minus, Val::Float(f)) => Val::Float(-f),
            (Op::Minus, Val::Complex(re, im)) => Val::Complex(-re, -im),
            (Op::Com, Val::Int(i)) | (Op::Com, Val::Rune(i)) => {
                let typ = self.types.get(lt);
                let mask = if typ.is_unsigned() { self.int_range(lt).1 } else { -1 };
                if matches!(self.node(nl).val, Some(Val::Rune(_))) { Val::Rune(i ^ mask) } else { Val::Int(i ^ mask) }
            }
            (Op::Not, Val::Bool(b)) => {
                self.set_bool_result(n, nl, op, !b);
                return;
            }
            _ => {
                if !self.node(n).diag {
                    let msg = format!("illegal constant expression {} {}", op, self.tstr(lt));
                    self.yyerror(msg);
                    self.node_mut(n).diag = true;
                }
                return;
            }
        };
        self.finish_const(n, nl, result);
    }

    fn fold_binary(&mut self, n: NodeId, op: Op, v: &Val, rv: &Val) -> Folded {
        macro_rules! checked {
            ($a:expr, $b:expr, $method:ident, $what:literal, $rune:expr) => {
                match $a.$method(*$b) {
                    Some(x) => Folded::Value(if $rune { Val::Rune(x) } else { Val::Int(x) }),
                    None => {
                        self.yyerror(concat!("constant ", $what, " overflow"));
                        Folded::Stop
                    }
                }
            };
        }
        match (v, rv) {
            (Val::Nil, Val::Nil) => match op {
                Op::Eq => Folded::Bool(true),
                Op::Ne => Folded::Bool(false),
                _ => Folded::Illegal,
            },
            (Val::Int(a), Val::Int(b)) | (Val::Rune(a), Val::Rune(b)) => {
                let rune = matches!(v, Val::Rune(_));
                match op {
                    Op::Add => checked!(a, b, checked_add, "addition", rune),
                    Op::Sub => checked!(a, b, checked_sub, "subtraction", rune),
                    Op::Mul => checked!(a, b, checked_mul, "multiplication", rune),
                    Op::Div | Op::Mod if *b == 0 => {
                        self.yyerror("division by zero");
                        Folded::Stop
                    }
                    Op::Div => checked!(a, b, checked_div, "division", rune),
                    Op::Mod => checked!(a, b, checked_rem, "division", rune),
                    Op::Lsh => {
                        if *b < 0 || *b >= 127 || (a.unsigned_abs().leading_zeros() as i128) <= *b {
                            if *a == 0 {
                                return Folded::Value(Val::Int(0));
                            }
                            self.yyerror("constant shift overflow");
                            return Folded::Stop;
                        }
                        Folded::Value(if rune { Val::Rune(a << b) } else { Val::Int(a << b) })
                    }
                    Op::Rsh => {
                        let shifted = if *b >= 127 { if *a < 0 { -1 } else { 0 } } else { a >> b };
                        Folded::Value(if rune { Val::Rune(shifted) } else { Val::Int(shifted) })
                    }
                    Op::Or => Folded::Value(Val::Int(a | b)),
                    Op::And => Folded::Value(Val::Int(a & b)),
                    Op::AndNot => Folded::Value(Val::Int(a & !b)),
                    Op::Xor => Folded::Value(Val::Int(a ^ b)),
                    Op::Eq => Folded::Bool(a == b),
                    Op::Ne => Folded::Bool(a != b),
                    Op::Lt => Folded::Bool(a < b),
                    Op::Le => Folded::Bool(a <= b),
                    Op::Gt => Folded::Bool(a > b),
                    Op::Ge => Folded::Bool(a >= b),
                    _ => Folded::Illegal,
                }
            }
            (Val::Float(a), Val::Float(b)) => match op {
                Op::Add => Folded::Value(Val::Float(a + b)),
                Op::Sub => Folded::Value(Val::Float(a - b)),
                Op::Mul => Folded::Value(Val::Float(a * b)),
                Op::Div => {
                    if *b == 0.0 {
                        self.yyerror("division by zero");
                        return Folded::Value(Val::Float(1.0));
                    }
                    Folded::Value(Val::Float(a / b))
                }
                Op::Mod => {
                    if !self.node(n).diag {
                        self.yyerror("illegal constant expression: floating-point % operation");
                        self.node_mut(n).diag = true;
                    }
                    Folded::Stop
                }
                Op::Eq => Folded::Bool(a == b),
                Op::Ne => Folded::Bool(a != b),
                Op::Lt => Folded::Bool(a < b),
                Op::Le => Folded::Bool(a <= b),
                Op::Gt => Folded::Bool(a > b),
                Op::Ge => Folded::Bool(a >= b),
                _ => Folded::Illegal,
            },
            (Val::Complex(ar, ai), Val::Complex(br, bi)) => match op {
                Op::Add => Folded::Value(Val::Complex(ar + br, ai + bi)),
                Op::Sub => Folded::Value(Val::Complex(ar - br, ai - bi)),
                Op::Mul => Folded::Value(Val::Complex(ar * br - ai * bi, ar * bi + ai * br)),
                Op::Div => {
                    let denom = br * br + bi * bi;
                    if denom == 0.0 {
                        self.yyerror("complex division by zero");
                        return Folded::Value(Val::Complex(1.0, 0.0));
                    }
                    Folded::Value(Val::Complex(
                        (ar * br + ai * bi) / denom,
                        (ai * br - ar * bi) / denom,
                    ))
                }
                Op::Eq => Folded::Bool(ar == br && ai == bi),
                Op::Ne => Folded::Bool(ar != br || ai != bi),
                _ => Folded::Illegal,
            },
            (Val::Str(a), Val::Str(b)) => match op {
                Op::Add => Folded::Value(Val::Str(format!("{}{}", a, b))),
                Op::Eq => Folded::Bool(a == b),
                Op::Ne => Folded::Bool(a != b),
                Op::Lt => Folded::Bool(a < b),
                Op::Le => Folded::Bool(a <= b),
                Op::Gt => Folded::Bool(a > b),
                Op::Ge => Folded::Bool(a >= b),
                _ => Folded::Illegal,
            },
            (Val::Bool(a), Val::Bool(b)) => match op {
                Op::OrOr => Folded::Bool(*a || *b),
                Op::AndAnd => Folded::Bool(*a && *b),
                Op::Eq => Folded::Bool(a == b),
                Op::Ne => Folded::Bool(a != b),
                _ => Folded::Illegal,
            },
            _ => Folded::Illegal,
        }
    }

    /// Turns `n` into a literal holding `v`, typed like the left operand
    fn finish_const(&mut self, n: NodeId, nl: NodeId, v: Val) {
        let t = self.ty(nl);
        let v = match (v, t) {
            (Val::Float(f), Some(t)) if t != IDEAL_TYPE_ID => truncfltlit(Val::Float(f), t),
            (v, _) => v,
        };
        let node = self.node_mut(n);
        node.orig_op = Some(node.orig_op.unwrap_or(node.op));
        node.op = Op::Literal;
        node.left = None;
        node.right = None;
        node.list.clear();
        node.typ = t;
        node.val = Some(v.clone());
        let span = self.span(n);
        let lno = self.lineno;
        let saved = std::mem::replace(&mut self.lineno, if span.is_none() { lno } else { span });
        self.overflow(&v, t);
        self.lineno = saved;
    }

    fn set_bool_result(&mut self, n: NodeId, nl: NodeId, op: Op, b: bool) {
        let t = if op.is_comparison() { IDEAL_BOOL_TYPE_ID } else { self.ty(nl).unwrap_or(IDEAL_BOOL_TYPE_ID) };
        let node = self.node_mut(n);
        node.orig_op = Some(node.orig_op.unwrap_or(node.op));
        node.op = Op::Literal;
        node.left = None;
        node.right = None;
        node.typ = Some(t);
        node.val = Some(Val::Bool(b));
    }

    /// Joins runs of adjacent constant operands of a string concatenation
    fn merge_string_constants(&mut self, n: NodeId) {
        let list = self.node(n).list.clone();
        let mut merged: Vec<NodeId> = Vec::with_capacity(list.len());
        for item in list {
            let is_str = self.is_go_const(item) && matches!(self.node(item).val, Some(Val::Str(_)));
            if is_str {
                if let Some(prev) = merged.last().copied() {
                    if let (Some(Val::Str(a)), Some(Val::Str(b))) =
                        (self.node(prev).val.clone(), self.node(item).val.clone())
                    {
                        let joined = self.nodes.copy(prev);
                        self.node_mut(joined).val = Some(Val::Str(a + &b));
                        merged.pop();
                        merged.push(joined);
                        continue;
                    }
                }
            }
            merged.push(item);
        }
        if merged.len() == 1 && self.is_go_const(merged[0]) {
            let v = self.node(merged[0]).val.clone();
            let t = self.ty(n);
            let node = self.node_mut(n);
            node.orig_op = Some(node.orig_op.unwrap_or(node.op));
            node.op = Op::Literal;
            node.list.clear();
            node.val = v;
            node.typ = t;
        } else {
            self.node_mut(n).list = merged;
        }
    }
}

enum Folded {
    Value(Val),
    Bool(bool),
    Illegal,
    /// Already diagnosed; leave the expression alone
    Stop,
}

fn flt_overflows(f: f64, t: TypeId) -> bool {
    if t == FLOAT32_TYPE_ID {
        f.is_finite() && f.abs() > f32::MAX as f64 || f.is_infinite()
    } else {
        f.is_infinite()
    }
}

/// Rounds a float constant to the precision of `t`
pub fn truncfltlit(v: Val, t: TypeId) -> Val {
    match v {
        Val::Float(f) if t == FLOAT32_TYPE_ID && f.abs() <= f32::MAX as f64 => Val::Float(f as f32 as f64),
        v => v,
    }
}

/// Integer to string conversion: invalid code points become U+FFFD
pub fn tostr(v: &Val) -> Val {
    match v {
        Val::Int(i) | Val::Rune(i) => {
            let c = u32::try_from(*i).ok().and_then(char::from_u32).unwrap_or('\u{FFFD}');
            Val::Str(c.to_string())
        }
        Val::Nil => Val::Str(String::new()),
        v => v.clone(),
    }
}
