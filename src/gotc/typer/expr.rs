// Copyright (c) 2025 knix
// All rights reserved.

//! Operators, selectors, indexing, calls and conversions.

use log::trace;

use crate::ast::{Class, NameInfo, NodeId, Op};
use crate::typer::consts::{CType, Val};
use crate::typer::syms::SymId;
use crate::typer::types::*;
use crate::typer::{Ctx, Typer};

impl Typer {
    /// Checks every operation not handled by the name and type cases
    pub(crate) fn typecheck_expr_or_stmt(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, Ctx)> {
        match self.op(n) {
            Op::Ind => self.typecheck_ind(n, top),
            Op::Addr => self.typecheck_addr(n),
            Op::Com | Op::Minus | Op::Not | Op::Plus => self.typecheck_unary(n, top),
            Op::Add
            | Op::And
            | Op::AndAnd
            | Op::AndNot
            | Op::Div
            | Op::Eq
            | Op::Ge
            | Op::Gt
            | Op::Le
            | Op::Lt
            | Op::Lsh
            | Op::Rsh
            | Op::Mod
            | Op::Mul
            | Op::Ne
            | Op::Or
            | Op::OrOr
            | Op::Sub
            | Op::Xor
            | Op::AsOp => self.typecheck_arith(n, top),
            Op::XDot | Op::Dot => self.typecheck_dot(n, top),
            Op::DotType => self.typecheck_dottype(n),
            Op::Index => self.typecheck_index(n),
            Op::Recv => self.typecheck_recv(n),
            Op::Send => self.typecheck_send(n),
            Op::Slice | Op::Slice3 => self.typecheck_slice(n),
            Op::Call => self.typecheck_call(n, top),
            Op::Conv | Op::ConvNop | Op::ConvIface => self.typecheck_conv(n, top),
            Op::Len
            | Op::Cap
            | Op::Real
            | Op::Imag
            | Op::Complex
            | Op::Close
            | Op::Delete
            | Op::Append
            | Op::Copy
            | Op::Make
            | Op::New
            | Op::Print
            | Op::PrintN
            | Op::Panic
            | Op::Recover => self.typecheck_builtin(n),
            Op::Closure => self.typecheck_closure(n),
            Op::CompLit => self.typecheck_complit(n).map(|n| (n, Ctx::ERV)),
            Op::Key => {
                self.yyerror("key:value pair outside of composite literal");
                None
            }
            Op::TypeSw => {
                self.yyerror("use of .(type) outside type switch");
                None
            }
            Op::As
            | Op::As2
            | Op::Block
            | Op::Break
            | Op::Case
            | Op::XCase
            | Op::Continue
            | Op::Dcl
            | Op::DclConst
            | Op::DclType
            | Op::DclFunc
            | Op::Defer
            | Op::Proc
            | Op::Empty
            | Op::Fall
            | Op::XFall
            | Op::For
            | Op::Goto
            | Op::If
            | Op::Label
            | Op::Range
            | Op::Return
            | Op::Select
            | Op::Switch => self.typecheck_stmt(n, top).map(|ok| (n, ok)),
            op => self.ice(format!("typecheck {}", op), None),
        }
    }

    /// How a kind is named in operator diagnostics
    pub(crate) fn typekind(&self, t: TypeId) -> String {
        let typ = self.types.get(t);
        if typ.is_slice() {
            return "slice".to_string();
        }
        let s = match typ.etype() {
            EType::Int8 => "int8",
            EType::Uint8 => "uint8",
            EType::Int16 => "int16",
            EType::Uint16 => "uint16",
            EType::Int32 => "int32",
            EType::Uint32 => "uint32",
            EType::Int64 => "int64",
            EType::Uint64 => "uint64",
            EType::Int => "int",
            EType::Uint => "uint",
            EType::Uintptr => "uintptr",
            EType::Complex64 => "complex64",
            EType::Complex128 => "complex128",
            EType::Float32 => "float32",
            EType::Float64 => "float64",
            EType::Bool => "bool",
            EType::String => "string",
            EType::Ptr => "pointer",
            EType::UnsafePtr => "unsafe.Pointer",
            EType::Struct => "struct",
            EType::Inter => "interface",
            EType::Chan => "chan",
            EType::Map => "map",
            EType::Array => "array",
            EType::Func => "func",
            EType::Nil => "nil",
            EType::Ideal => "untyped number",
            et => return format!("etype={}", et),
        };
        s.to_string()
    }

    pub(crate) fn isnil(&self, n: NodeId) -> bool {
        let node = self.node(n);
        node.op == Op::Literal && node.val == Some(Val::Nil)
    }

    /// `p[i]` and `len(p)` on a pointer to array go through the array
    pub(crate) fn implicitstar(&mut self, n: NodeId) -> NodeId {
        let Some(t) = self.ty(n) else { return n };
        if !self.types.get(t).is_ptr() || !self.types.get(self.types.elem(t)).is_array() {
            return n;
        }
        self.implicit_unary(Op::Ind, n, Ctx::ERV)
    }

    /// Untyped constant indexes are ints
    pub(crate) fn indexlit(&mut self, n: NodeId) -> NodeId {
        if !self.ty(n).is_some_and(is_untyped) {
            return n;
        }
        match self.consttype(n) {
            Some(CType::Int | CType::Rune | CType::Float | CType::Complex) => self.defaultlit(n, Some(INT_TYPE_ID)),
            _ => n,
        }
    }

    pub(crate) fn const_int(&self, n: NodeId) -> Option<i128> {
        if self.op(n) != Op::Literal {
            return None;
        }
        match &self.node(n).val {
            Some(Val::Int(i)) | Some(Val::Rune(i)) => Some(*i),
            _ => None,
        }
    }

    pub(crate) fn const_str_len(&self, n: NodeId) -> Option<usize> {
        match &self.node(n).val {
            Some(Val::Str(s)) if self.op(n) == Op::Literal => Some(s.len()),
            _ => None,
        }
    }

    fn typecheck_ind(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, Ctx)> {
        let mut ntop = Ctx::ERV | Ctx::ETYPE;
        if !top.has(Ctx::EADDR) {
            ntop = ntop | Ctx::EINDIR;
        }
        ntop = ntop | top.mask(Ctx::ECOMPLIT);
        let (l, t) = self.tc_left(n, ntop)?;
        if self.op(l) == Op::Type {
            let pt = self.types.ptr_to(t);
            let node = self.node_mut(n);
            node.op = Op::Type;
            node.typ = Some(pt);
            node.left = None;
            self.checkwidth(pt);
            return Some((n, Ctx::ETYPE));
        }
        if !self.types.get(t).is_ptr() {
            if top.has(Ctx::ERV | Ctx::ETOP) {
                let msg = format!("invalid indirect of {}", self.nstr_long(l));
                self.yyerror(msg);
            }
            return None;
        }
        let elem = self.types.elem(t);
        self.set_type(n, Some(elem));
        Some((n, Ctx::ERV))
    }

    fn typecheck_addr(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        // &T{...} allocates the literal
        if let Some(l) = self.node(n).left {
            if self.op(l) == Op::CompLit {
                let (lit, t) = self.tc_left(n, Ctx::ERV)?;
                let pt = self.types.ptr_to(t);
                let node = self.node_mut(n);
                node.op = Op::PtrLit;
                node.left = Some(lit);
                node.typ = Some(pt);
                return Some((n, Ctx::ERV));
            }
        }
        let (l, _) = self.tc_left(n, Ctx::ERV | Ctx::EADDR)?;
        self.checklvalue(l, "take the address of");
        let l = self.defaultlit(l, None);
        self.node_mut(n).left = Some(l);
        let t = self.ty(l)?;
        let pt = self.types.ptr_to(t);
        self.set_type(n, Some(pt));
        Some((n, Ctx::ERV))
    }

    fn typecheck_unary(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, Ctx)> {
        let (_, t) = self.tc_left(n, Ctx::ERV | top.mask(Ctx::EIOTA))?;
        let op = self.op(n);
        if !op_ok_for(op, self.types.etype(t)) {
            let msg = format!("invalid operation: {} {}", op, self.tstr(t));
            self.yyerror(msg);
            return None;
        }
        self.set_type(n, Some(t));
        Some((n, Ctx::ERV))
    }

    /// Binary operators, and the operator half of `x op= y`
    fn typecheck_arith(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, Ctx)> {
        let is_asop = self.op(n) == Op::AsOp;
        let mut ok = Ctx::ERV;
        let (l, r, op) = if is_asop {
            ok = ok | Ctx::ETOP;
            let l = self.tc_left(n, Ctx::ERV);
            let r = self.tc_right(n, Ctx::ERV);
            if let Some(left) = self.node(n).left {
                self.checkassign(left);
            }
            let ((l, _), (r, _)) = (l?, r?);
            let Some(op) = self.node(n).sub_op else {
                self.ice(format!("{} without an operator", self.nstr(n)), None);
            };
            (l, r, op)
        } else {
            let ctx = Ctx::ERV | top.mask(Ctx::EIOTA);
            let l = self.tc_left(n, ctx);
            let r = self.tc_right(n, ctx);
            let ((l, _), (r, _)) = (l?, r?);
            (l, r, self.op(n))
        };

        if op.is_shift() {
            let r = self.defaultlit(r, Some(UINT_TYPE_ID));
            self.node_mut(n).right = Some(r);
            let rt = self.ty(r)?;
            if !self.types.get(rt).is_integer() || self.types.get(rt).is_signed() {
                let msg = format!(
                    "invalid operation: {} (shift count type {}, must be unsigned integer)",
                    self.nstr(n),
                    self.tstr(rt)
                );
                self.yyerror(msg);
                return None;
            }
            // The left operand keeps its own type; shifts have their own rules
            let lt = self.ty(l)?;
            if lt != IDEAL_TYPE_ID && !self.types.get(lt).is_integer() {
                let msg = format!("invalid operation: {} (shift of type {})", self.nstr(n), self.tstr(lt));
                self.yyerror(msg);
                return None;
            }
            self.set_type(n, Some(lt));
            return Some((n, ok));
        }

        let (mut l, mut r) = self.defaultlit2(l, r, false);
        self.node_mut(n).left = Some(l);
        self.node_mut(n).right = Some(r);
        let (lt, rt) = (self.ty(l)?, self.ty(r)?);
        let mut t = if lt == IDEAL_TYPE_ID { rt } else { lt };
        let mut et = self.types.etype(t);
        if et == EType::Ideal {
            et = EType::Int;
        }

        let is_cmp = self.op(n).is_comparison();
        let mut aop = None;
        if is_cmp && self.types.etype(t) != EType::Ideal && !self.types.eqtype(lt, rt) {
            // Comparable as long as one side is assignable to the other
            if rt != BLANK_TYPE_ID {
                if let (Some(conv), _) = self.assignop(lt, rt) {
                    if self.types.get(rt).is_interface()
                        && !self.types.get(lt).is_interface()
                        && self.types.incomparable_component(lt).is_some()
                    {
                        let msg = format!(
                            "invalid operation: {} (operator {} not defined on {})",
                            self.nstr(n),
                            op,
                            self.typekind(lt)
                        );
                        self.yyerror(msg);
                        return None;
                    }
                    self.dowidth(lt);
                    if self.types.get(rt).is_interface() == self.types.get(lt).is_interface()
                        || self.types.get(lt).width >= 1 << 16
                    {
                        l = self.implicit_conv(conv, l, rt);
                        self.node_mut(n).left = Some(l);
                    }
                    t = rt;
                    aop = Some(conv);
                }
            }
            if aop.is_none() && lt != BLANK_TYPE_ID {
                if let (Some(conv), _) = self.assignop(rt, lt) {
                    if self.types.get(lt).is_interface()
                        && !self.types.get(rt).is_interface()
                        && self.types.incomparable_component(rt).is_some()
                    {
                        let msg = format!(
                            "invalid operation: {} (operator {} not defined on {})",
                            self.nstr(n),
                            op,
                            self.typekind(rt)
                        );
                        self.yyerror(msg);
                        return None;
                    }
                    self.dowidth(rt);
                    if self.types.get(rt).is_interface() == self.types.get(lt).is_interface()
                        || self.types.get(rt).width >= 1 << 16
                    {
                        r = self.implicit_conv(conv, r, lt);
                        self.node_mut(n).right = Some(r);
                    }
                    t = lt;
                    aop = Some(conv);
                }
            }
            et = self.types.etype(t);
        }

        if self.types.etype(t) != EType::Ideal && !self.types.eqtype(self.ty(l)?, self.ty(r)?) {
            let (l2, r2) = self.defaultlit2(l, r, true);
            l = l2;
            r = r2;
            self.node_mut(n).left = Some(l);
            self.node_mut(n).right = Some(r);
            let (lt, rt) = (self.ty(l)?, self.ty(r)?);
            if self.types.get(rt).is_interface() == self.types.get(lt).is_interface() || aop.is_none() {
                let msg = format!(
                    "invalid operation: {} (mismatched types {} and {})",
                    self.nstr(n),
                    self.tstr(lt),
                    self.tstr(rt)
                );
                self.yyerror(msg);
                return None;
            }
        }

        if !op_ok_for(op, et) {
            let msg = format!(
                "invalid operation: {} (operator {} not defined on {})",
                self.nstr(n),
                op,
                self.typekind(t)
            );
            self.yyerror(msg);
            return None;
        }

        // Arrays compare elementwise; slices, maps and funcs only against nil
        let lt = self.ty(l)?;
        let (l_nil, r_nil) = (self.isnil(l), self.isnil(r));
        if self.types.get(lt).is_array() && self.types.incomparable_component(lt).is_some() {
            let msg = format!("invalid operation: {} ({} cannot be compared)", self.nstr(n), self.tstr(lt));
            self.yyerror(msg);
            return None;
        }
        if !l_nil && !r_nil {
            let what = match self.types.etype(lt) {
                EType::Array if self.types.get(lt).is_slice() => Some("slice"),
                EType::Map => Some("map"),
                EType::Func => Some("func"),
                _ => None,
            };
            if let Some(what) = what {
                let msg = format!("invalid operation: {} ({} can only be compared to nil)", self.nstr(n), what);
                self.yyerror(msg);
            }
        }
        if self.types.get(lt).is_struct() {
            if let Some(bad) = self.types.incomparable_component(lt) {
                let msg = format!(
                    "invalid operation: {} (struct containing {} cannot be compared)",
                    self.nstr(n),
                    self.tstr(bad)
                );
                self.yyerror(msg);
            }
        }

        let rt = self.ty(r)?;
        let mut t = lt;
        if is_cmp {
            self.evconst(n);
            t = IDEAL_BOOL_TYPE_ID;
            if self.op(n) != Op::Literal {
                let (l, r) = self.defaultlit2(l, r, true);
                self.node_mut(n).left = Some(l);
                self.node_mut(n).right = Some(r);
            }
        } else if matches!(self.op(n), Op::AndAnd | Op::OrOr) {
            if lt == rt {
                t = lt;
            } else if lt == IDEAL_BOOL_TYPE_ID {
                t = rt;
            } else if rt == IDEAL_BOOL_TYPE_ID {
                t = lt;
            }
        } else if t == IDEAL_BOOL_TYPE_ID {
            // Other operators make untyped bools lose their untypedness
            t = BOOL_TYPE_ID;
        }

        if et == EType::String && self.op(n) == Op::Add {
            let mut list = if self.op(l) == Op::AddStr { self.node(l).list.clone() } else { vec![l] };
            if self.op(r) == Op::AddStr {
                list.extend(self.node(r).list.iter().copied());
            } else {
                list.push(r);
            }
            let node = self.node_mut(n);
            node.op = Op::AddStr;
            node.list = list;
            node.left = None;
            node.right = None;
        }

        if et == EType::Inter && self.op(n) != Op::Literal && l_nil && !r_nil {
            let node = self.node_mut(n);
            node.left = Some(r);
            node.right = Some(l);
        }

        if matches!(op, Op::Div | Op::Mod) {
            if let Some(r) = self.node(n).right {
                if self.isconst(r, CType::Int) && self.const_int(r) == Some(0) {
                    self.yyerror("division by zero");
                    return None;
                }
            }
        }

        self.set_type(n, Some(t));
        Some((n, ok))
    }

    /// `x.f`, `x.m`, `T.m`
    fn typecheck_dot(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, Ctx)> {
        if self.op(n) == Op::XDot {
            self.adddot(n);
            self.set_op(n, Op::Dot);
            self.node(n).left?;
        }
        let (l, _) = self.tc_left(n, Ctx::ERV | Ctx::ETYPE)?;
        let l = self.defaultlit(l, None);
        self.node_mut(n).left = Some(l);
        let mut t = self.ty(l)?;
        let s = self.node(n).sym?;

        if self.op(l) == Op::Type {
            return self.typecheck_method_expr(n, t, s);
        }

        if self.types.get(t).is_ptr() && !self.types.get(self.types.elem(t)).is_interface() {
            t = self.types.elem(t);
            self.set_op(n, Op::DotPtr);
            self.checkwidth(t);
        }

        if self.syms.is_blank(s) {
            self.yyerror("cannot refer to blank field or method");
            return None;
        }

        if self.lookdot(n, t, 0).is_none() {
            let lt = self.ty(l)?;
            let msg = if self.is_empty_interface(t) {
                format!("{} undefined (type {} is interface with no methods)", self.nstr(n), self.tstr(lt))
            } else if self.types.get(t).is_ptr() && self.types.get(self.types.elem(t)).is_interface() {
                format!("{} undefined (type {} is pointer to interface, not interface)", self.nstr(n), self.tstr(lt))
            } else if self.lookdot(n, t, 1).is_some() {
                format!("{} undefined (cannot refer to unexported field or method {})", self.nstr(n), self.syms.name(s))
            } else if let Some(f) = self.lookdot(n, t, 2) {
                let have = f.sym.map(|fs| self.syms.name(fs).to_string()).unwrap_or_default();
                format!(
                    "{} undefined (type {} has no field or method {}, but does have {})",
                    self.nstr(n),
                    self.tstr(lt),
                    self.syms.name(s),
                    have
                )
            } else {
                format!("{} undefined (type {} has no field or method {})", self.nstr(n), self.tstr(lt), self.syms.name(s))
            };
            self.yyerror(msg);
            return None;
        }

        match self.op(n) {
            Op::DotInter | Op::DotMeth if top.has(Ctx::ECALL) => Some((n, Ctx::ECALL)),
            Op::DotInter | Op::DotMeth => {
                // A method value binds its receiver now
                let mt = self.ty(n)?;
                let ft = self.methodfunc(mt, None);
                self.set_op(n, Op::CallPart);
                self.set_type(n, Some(ft));
                Some((n, Ctx::ERV))
            }
            _ => Some((n, Ctx::ERV)),
        }
    }

    /// `T.m` names a function whose first parameter is the receiver
    fn typecheck_method_expr(&mut self, n: NodeId, t: TypeId, s: SymId) -> Option<(NodeId, Ctx)> {
        if !self.looktypedot(n, t, 0) {
            let msg = if self.looktypedot(n, t, 1) {
                format!(
                    "{} undefined (type {} has no method {} (but does have {}))",
                    self.nstr(n),
                    self.tstr(t),
                    self.syms.name(s),
                    self.syms.name(s)
                )
            } else {
                format!("{} undefined (type {} has no method {})", self.nstr(n), self.tstr(t), self.syms.name(s))
            };
            self.yyerror(msg);
            return None;
        }
        let mt = self.ty(n)?;
        let is_method = self.types.get(mt).is_func()
            && (self.types.recv(mt).is_some() || self.types.get(t).is_interface());
        if !is_method {
            let msg = format!("type {} has no method {}", self.tstr(t), self.syms.name(s));
            self.yyerror(msg);
            return None;
        }
        trace!("method expression {}", self.nstr(n));
        let ft = self.methodfunc(mt, Some(t));
        let node = self.node_mut(n);
        node.op = Op::Name;
        node.typ = Some(ft);
        node.xoffset = 0;
        node.name = Some(Box::new(NameInfo { class: Class::Func, iota: -1, ..NameInfo::default() }));
        Some((n, Ctx::ERV))
    }

    fn typecheck_dottype(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let (l, _) = self.tc_left(n, Ctx::ERV)?;
        let l = self.defaultlit(l, None);
        self.node_mut(n).left = Some(l);
        let t = self.ty(l)?;
        if !self.types.get(t).is_interface() {
            let msg = format!("invalid type assertion: {} (non-interface type {} on left)", self.nstr(n), self.tstr(t));
            self.yyerror(msg);
            return None;
        }
        if self.node(n).right.is_some() {
            let asserted = self.tc_right(n, Ctx::ETYPE).map(|(_, t)| t);
            self.set_type(n, asserted);
            self.node_mut(n).right = None;
        }
        let target = self.ty(n)?;
        if !self.types.get(target).is_interface() {
            if let Err(m) = self.implements(target, t) {
                let why = self.missing_method_reason(target, t, &m);
                self.yyerror(format!("impossible type assertion{}", why));
                return None;
            }
        }
        Some((n, Ctx::ERV))
    }

    fn typecheck_index(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let l = self.tc_left(n, Ctx::ERV);
        let r = self.tc_right(n, Ctx::ERV);
        let ((l, _), (r, _)) = (l?, r?);
        let l = self.defaultlit(l, None);
        let l = self.implicitstar(l);
        self.node_mut(n).left = Some(l);
        let t = self.ty(l)?;

        let typ = self.types.get(t);
        if typ.is_string() || typ.is_array() || typ.is_slice() {
            let why = if typ.is_array() {
                "array"
            } else if typ.is_slice() {
                "slice"
            } else {
                "string"
            };
            let elem = if typ.is_string() { BYTE_TYPE_ID } else { self.types.elem(t) };
            let is_array = typ.is_array();
            let r = self.indexlit(r);
            self.node_mut(n).right = Some(r);
            self.set_type(n, Some(elem));
            let Some(rt) = self.ty(r) else { return Some((n, Ctx::ERV)) };
            if !self.types.get(rt).is_integer() && rt != IDEAL_TYPE_ID {
                let msg = format!("non-integer {} index {}", why, self.nstr(r));
                self.yyerror(msg);
                return Some((n, Ctx::ERV));
            }
            if !self.node(n).bounded {
                if let Some(x) = self.const_int(r) {
                    let msg = if x < 0 {
                        Some(format!("invalid {} index {} (index must be non-negative)", why, self.nstr(r)))
                    } else if is_array && x >= self.types.bound(t) as i128 {
                        Some(format!(
                            "invalid array index {} (out of bounds for {}-element array)",
                            self.nstr(r),
                            self.types.bound(t)
                        ))
                    } else if let Some(len) = self.const_str_len(l).filter(|len| x >= *len as i128) {
                        Some(format!("invalid string index {} (out of bounds for {}-byte string)", self.nstr(r), len))
                    } else if x > self.int_range(INT_TYPE_ID).1 {
                        Some(format!("invalid {} index {} (index too large)", why, self.nstr(r)))
                    } else {
                        None
                    };
                    if let Some(msg) = msg {
                        self.yyerror(msg);
                    }
                }
            }
            return Some((n, Ctx::ERV));
        }

        if self.types.get(t).is_map() {
            let (key, val) = (self.types.key(t), self.types.val(t));
            let mut r = self.defaultlit(r, Some(key));
            if self.ty(r).is_some() {
                r = self.assignconv(r, key, "map index");
            }
            let node = self.node_mut(n);
            node.right = Some(r);
            node.typ = Some(val);
            node.op = Op::IndexMap;
            return Some((n, Ctx::ERV));
        }

        let msg = format!("invalid operation: {} (type {} does not support indexing)", self.nstr(n), self.tstr(t));
        self.yyerror(msg);
        None
    }

    fn typecheck_recv(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let (l, _) = self.tc_left(n, Ctx::ERV)?;
        let l = self.defaultlit(l, None);
        self.node_mut(n).left = Some(l);
        let t = self.ty(l)?;
        if !self.types.get(t).is_chan() {
            let msg = format!("invalid operation: {} (receive from non-chan type {})", self.nstr(n), self.tstr(t));
            self.yyerror(msg);
            return None;
        }
        if !self.types.chan_dir(t).can_recv() {
            let msg = format!("invalid operation: {} (receive from send-only type {})", self.nstr(n), self.tstr(t));
            self.yyerror(msg);
            return None;
        }
        let elem = self.types.elem(t);
        self.set_type(n, Some(elem));
        Some((n, Ctx::ETOP | Ctx::ERV))
    }

    fn typecheck_send(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let l = self.tc_left(n, Ctx::ERV);
        let r = self.tc_right(n, Ctx::ERV);
        let ((l, _), (r, _)) = (l?, r?);
        let l = self.defaultlit(l, None);
        self.node_mut(n).left = Some(l);
        let t = self.ty(l)?;
        if !self.types.get(t).is_chan() {
            let msg = format!("invalid operation: {} (send to non-chan type {})", self.nstr(n), self.tstr(t));
            self.yyerror(msg);
            return None;
        }
        if !self.types.chan_dir(t).can_send() {
            let msg = format!("invalid operation: {} (send to receive-only type {})", self.nstr(n), self.tstr(t));
            self.yyerror(msg);
            return None;
        }
        let elem = self.types.elem(t);
        let r = self.defaultlit(r, Some(elem));
        self.ty(r)?;
        let r = self.assignconv(r, elem, "send");
        self.node_mut(n).right = Some(r);
        self.set_type(n, None);
        Some((n, Ctx::ETOP))
    }

    /// The `lo`, `hi`, `max` operands of a slice expression
    fn slice_bounds(&self, n: NodeId) -> (Option<NodeId>, Option<NodeId>, Option<NodeId>) {
        let Some(key) = self.node(n).right else { return (None, None, None) };
        let k = self.node(key);
        if self.op(n) == Op::Slice3 {
            match k.right {
                Some(hm) if self.op(hm) == Op::Key => {
                    let h = self.node(hm);
                    (k.left, h.left, h.right)
                }
                hi => (k.left, hi, None),
            }
        } else {
            (k.left, k.right, None)
        }
    }

    fn set_slice_bounds(&mut self, n: NodeId, lo: Option<NodeId>, hi: Option<NodeId>, max: Option<NodeId>) {
        let Some(key) = self.node(n).right else { return };
        if self.op(n) == Op::Slice3 {
            self.node_mut(key).left = lo;
            match self.node(key).right {
                Some(hm) if self.op(hm) == Op::Key => {
                    let h = self.node_mut(hm);
                    h.left = hi;
                    h.right = max;
                }
                _ => self.node_mut(key).right = hi,
            }
        } else {
            let k = self.node_mut(key);
            k.left = lo;
            k.right = hi;
        }
    }

    fn typecheck_slice(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let hasmax = self.op(n) == Op::Slice3;
        let l = self.tc_left(n, Ctx::ERV);
        let (lo, hi, max) = self.slice_bounds(n);
        let bound = |typer: &mut Typer, b: Option<NodeId>| {
            b.map(|b| {
                let b = typer.typecheck(b, Ctx::ERV);
                typer.indexlit(b)
            })
        };
        let lo = bound(self, lo);
        let hi = bound(self, hi);
        let max = bound(self, max);
        self.set_slice_bounds(n, lo, hi, max);
        let (mut l, _) = l?;
        l = self.defaultlit(l, None);
        self.node_mut(n).left = Some(l);

        if self.ty(l).is_some_and(|t| self.types.get(t).is_array()) {
            if !self.islvalue(l) {
                let msg = format!("invalid operation {} (slice of unaddressable value)", self.nstr(n));
                self.yyerror(msg);
                return None;
            }
            l = self.implicit_unary(Op::Addr, l, Ctx::ERV);
            self.node_mut(n).left = Some(l);
        }
        let t = self.ty(l)?;

        let mut tp = None;
        if self.types.get(t).is_string() {
            if hasmax {
                let msg = format!("invalid operation {} (3-index slice of string)", self.nstr(n));
                self.yyerror(msg);
                return None;
            }
            self.set_type(n, Some(t));
            self.set_op(n, Op::SliceStr);
        } else if self.types.get(t).is_ptr() && self.types.get(self.types.elem(t)).is_array() {
            let arr = self.types.elem(t);
            tp = Some(arr);
            let elem = self.types.elem(arr);
            let st = self.types.slice_of(elem);
            self.dowidth(st);
            self.set_type(n, Some(st));
            self.set_op(n, if hasmax { Op::Slice3Arr } else { Op::SliceArr });
        } else if self.types.get(t).is_slice() {
            self.set_type(n, Some(t));
        } else {
            let msg = format!("cannot slice {} (type {})", self.nstr(l), self.tstr(t));
            self.yyerror(msg);
            return None;
        }

        for b in [lo, hi, max].into_iter().flatten() {
            if !self.checksliceindex(l, b, tp) {
                return None;
            }
        }
        if !self.checksliceconst(lo, hi) || !self.checksliceconst(lo, max) || !self.checksliceconst(hi, max) {
            return None;
        }
        Some((n, Ctx::ERV))
    }

    fn checksliceindex(&mut self, l: NodeId, r: NodeId, tp: Option<TypeId>) -> bool {
        let Some(t) = self.ty(r) else { return false };
        if !self.types.get(t).is_integer() {
            let msg = format!("invalid slice index {} (type {})", self.nstr(r), self.tstr(t));
            self.yyerror(msg);
            return false;
        }
        let Some(x) = self.const_int(r) else { return true };
        let msg = if x < 0 {
            Some(format!("invalid slice index {} (index must be non-negative)", self.nstr(r)))
        } else if let Some(bound) = tp.map(|tp| self.types.bound(tp)).filter(|b| *b > 0 && x > *b as i128) {
            Some(format!("invalid slice index {} (out of bounds for {}-element array)", self.nstr(r), bound))
        } else if let Some(len) = self.const_str_len(l).filter(|len| x > *len as i128) {
            Some(format!("invalid slice index {} (out of bounds for {}-byte string)", self.nstr(r), len))
        } else if x > self.int_range(INT_TYPE_ID).1 {
            Some(format!("invalid slice index {} (index too large)", self.nstr(r)))
        } else {
            None
        };
        match msg {
            Some(msg) => {
                self.yyerror(msg);
                false
            }
            None => true,
        }
    }

    fn checksliceconst(&mut self, lo: Option<NodeId>, hi: Option<NodeId>) -> bool {
        let (Some(lo), Some(hi)) = (lo, hi) else { return true };
        if let (Some(a), Some(b)) = (self.const_int(lo), self.const_int(hi)) {
            if a > b {
                let msg = format!("invalid slice index: {} > {}", self.nstr(lo), self.nstr(hi));
                self.yyerror(msg);
                return false;
            }
        }
        true
    }

    fn typecheck_call(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, Ctx)> {
        let l = self.node(n).left?;
        let l = self.typecheck(l, Ctx::ERV | Ctx::ETYPE | Ctx::ECALL);
        self.node_mut(n).left = Some(l);
        if self.node(l).diag {
            self.node_mut(n).diag = true;
        }

        let builtin = if self.op(l) == Op::Name { self.node(l).name.as_ref().and_then(|info| info.builtin) } else { None };
        if let Some(bop) = builtin {
            if self.node(n).isddd && bop != Op::Append {
                let msg = format!("invalid use of ... with builtin {}", self.nstr(l));
                self.yyerror(msg);
            }
            let node = self.node_mut(n);
            node.op = bop;
            node.left = None;
            return self.typecheck_builtin(n);
        }

        let l = self.defaultlit(l, None);
        self.node_mut(n).left = Some(l);
        if self.op(l) == Op::Type {
            let lt = self.ty(l)?;
            if self.node(n).isddd || self.types.get(lt).is_ddd_array() {
                if !self.types.get(lt).broke {
                    let msg = format!("invalid use of ... in type conversion to {}", self.tstr(lt));
                    self.yyerror(msg);
                }
                self.node_mut(n).diag = true;
            }
            let node = self.node_mut(n);
            node.left = None;
            node.op = Op::Conv;
            node.typ = Some(lt);
            let what = format!("conversion to {}", self.tstr(lt));
            if !self.onearg(n, &what) {
                return None;
            }
            return self.typecheck_conv(n, top);
        }

        let args = std::mem::take(&mut self.node_mut(n).list);
        let isddd = self.node(n).isddd;
        let args = if args.len() == 1 && !isddd {
            vec![self.typecheck(args[0], Ctx::ERV | Ctx::EFNSTRUCT)]
        } else {
            self.typecheck_list(&args, Ctx::ERV)
        };
        self.node_mut(n).list = args;
        let t = self.ty(l)?;
        self.checkwidth(t);

        match self.op(l) {
            Op::DotInter => self.set_op(n, Op::CallInter),
            Op::DotMeth => self.set_op(n, Op::CallMeth),
            _ => {
                self.set_op(n, Op::CallFunc);
                if !self.types.get(t).is_func() {
                    let msg = format!("cannot call non-function {} (type {})", self.nstr(l), self.tstr(t));
                    self.yyerror(msg);
                    return None;
                }
            }
        }

        let desc = format!("argument to {}", self.nstr(l));
        let params = self.types.params(t);
        let args = std::mem::take(&mut self.node_mut(n).list);
        let args = self.typecheckaste(Op::Call, Some(l), isddd, params, args, &desc);
        self.node_mut(n).list = args;

        let results = self.types.results(t);
        match self.types.num_fields(results) {
            0 => Some((n, Ctx::ETOP)),
            1 => {
                let rt = self.types.field(results, 0).typ;
                self.set_type(n, Some(rt));
                Some((n, Ctx::ETOP | Ctx::ERV))
            }
            _ => {
                if top.has(Ctx::EFNSTRUCT | Ctx::ETOP) {
                    self.set_type(n, Some(results));
                } else {
                    let msg = format!("multiple-value {}() in single-value context", self.nstr(l));
                    self.yyerror(msg);
                }
                Some((n, Ctx::ETOP | Ctx::ERV))
            }
        }
    }

    /// `T(x)`; the target type is already in the node
    fn typecheck_conv(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, Ctx)> {
        let (l, _) = self.tc_left(n, Ctx::ERV | top.mask(Ctx::EINDIR | Ctx::EIOTA))?;
        let t = self.ty(n)?;
        let l = self.convlit1(l, t, true);
        self.node_mut(n).left = Some(l);
        let lt = self.ty(l)?;
        let (op, why) = self.convertop(lt, t);
        let op = match op {
            Some(op) => op,
            None => {
                if !self.node(n).diag && !self.types.get(t).broke {
                    let msg = format!("cannot convert {} to type {}{}", self.nstr_long(l), self.tstr(t), why);
                    self.yyerror(msg);
                    self.node_mut(n).diag = true;
                }
                Op::Conv
            }
        };
        self.set_op(n, op);
        if op == Op::ConvNop && self.op(l) == Op::Literal {
            let val = self.node(l).val.clone();
            let node = self.node_mut(n);
            node.orig_op = Some(Op::Conv);
            node.op = Op::Literal;
            node.val = val;
            node.left = None;
        }
        Some((n, Ctx::ERV))
    }

    /// Function literals inside a function are checked right away; those in
    /// package-level initializers wait for the function bodies.
    fn typecheck_closure(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let (_, t) = self.tc_left(n, Ctx::ETYPE)?;
        self.set_type(n, Some(t));
        if self.cur_fn.is_some() {
            self.check_func_body(n);
        } else {
            self.closures.push(n);
        }
        Some((n, Ctx::ERV))
    }
}
