// Copyright (c) 2025 knix
// All rights reserved.

//! Calls to the predeclared functions. By the time a call gets here its op is
//! the builtin's own op and the arguments are in `list`.

use crate::ast::{NodeId, Op};
use crate::typer::consts::{CType, Val};
use crate::typer::types::*;
use crate::typer::{Ctx, Typer};

impl Typer {
    pub(crate) fn typecheck_builtin(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        match self.op(n) {
            Op::Len | Op::Cap => self.typecheck_len_cap(n),
            Op::Real | Op::Imag => self.typecheck_real_imag(n),
            Op::Complex => self.typecheck_complex(n),
            Op::Close => {
                let what = self.op(n).to_string();
                if !self.onearg(n, &what) {
                    return None;
                }
                let (l, _) = self.tc_left(n, Ctx::ERV)?;
                let l = self.defaultlit(l, None);
                self.node_mut(n).left = Some(l);
                let t = self.ty(l)?;
                if !self.types.get(t).is_chan() {
                    let msg = format!("invalid operation: {} (non-chan type {})", self.nstr(n), self.tstr(t));
                    self.yyerror(msg);
                    return None;
                }
                if !self.types.chan_dir(t).can_send() {
                    let msg = format!("invalid operation: {} (cannot close receive-only channel)", self.nstr(n));
                    self.yyerror(msg);
                    return None;
                }
                Some((n, Ctx::ETOP))
            }
            Op::Delete => self.typecheck_delete(n),
            Op::Append => self.typecheck_append(n),
            Op::Copy => self.typecheck_copy(n),
            Op::Make => self.typecheck_make(n),
            Op::New => {
                let args = self.node(n).list.clone();
                let Some(&first) = args.first() else {
                    self.yyerror("missing argument to new");
                    return None;
                };
                let l = self.typecheck(first, Ctx::ETYPE);
                let t = self.ty(l)?;
                if args.len() > 1 {
                    let msg = format!("too many arguments to new({})", self.tstr(t));
                    self.yyerror(msg);
                    return None;
                }
                let pt = self.types.ptr_to(t);
                let node = self.node_mut(n);
                node.left = Some(l);
                node.list.clear();
                node.typ = Some(pt);
                Some((n, Ctx::ERV))
            }
            Op::Print | Op::PrintN => {
                let args = std::mem::take(&mut self.node_mut(n).list);
                let mut args = self.typecheck_list(&args, Ctx::ERV | Ctx::EINDIR);
                for a in args.iter_mut() {
                    // print's integer constants are int64, not int
                    let t = if self.isconst(*a, CType::Int) { Some(INT64_TYPE_ID) } else { None };
                    *a = self.defaultlit(*a, t);
                }
                self.node_mut(n).list = args;
                Some((n, Ctx::ETOP))
            }
            Op::Panic => {
                if !self.onearg(n, "panic") {
                    return None;
                }
                let (l, _) = self.tc_left(n, Ctx::ERV)?;
                let l = self.defaultlit(l, Some(EMPTY_INTERFACE_TYPE_ID));
                self.node_mut(n).left = Some(l);
                self.ty(l)?;
                Some((n, Ctx::ETOP))
            }
            Op::Recover => {
                if !self.node(n).list.is_empty() {
                    self.yyerror("too many arguments to recover");
                    return None;
                }
                self.set_type(n, Some(EMPTY_INTERFACE_TYPE_ID));
                Some((n, Ctx::ERV | Ctx::ETOP))
            }
            op => self.ice(format!("typecheck_builtin {}", op), None),
        }
    }

    /// Moves the single argument of `n` into `left`. `what` names the call
    /// in the arity errors.
    pub(crate) fn onearg(&mut self, n: NodeId, what: &str) -> bool {
        if self.node(n).left.is_some() {
            return true;
        }
        let list = self.node(n).list.clone();
        match list.len() {
            0 => {
                let msg = format!("missing argument to {}: {}", what, self.nstr(n));
                self.yyerror(msg);
                false
            }
            1 => {
                let node = self.node_mut(n);
                node.left = Some(list[0]);
                node.list.clear();
                true
            }
            _ => {
                let msg = format!("too many arguments to {}: {}", what, self.nstr(n));
                self.yyerror(msg);
                let node = self.node_mut(n);
                node.left = Some(list[0]);
                node.list.clear();
                false
            }
        }
    }

    /// Moves the two arguments of `n` into `left` and `right`
    pub(crate) fn twoarg(&mut self, n: NodeId) -> bool {
        if self.node(n).left.is_some() {
            return true;
        }
        let list = self.node(n).list.clone();
        let op = self.op(n);
        if list.len() != 2 {
            let what = if list.len() < 2 { "missing argument" } else { "too many arguments" };
            let msg = format!("{} to {} - {}", what, op, self.nstr(n));
            self.yyerror(msg);
            let node = self.node_mut(n);
            node.left = list.first().copied();
            node.list.clear();
            return false;
        }
        let node = self.node_mut(n);
        node.left = Some(list[0]);
        node.right = Some(list[1]);
        node.list.clear();
        true
    }

    /// Whether evaluating `n` may call a function or receive from a channel
    fn callrecv(&self, n: Option<NodeId>) -> bool {
        let Some(n) = n else { return false };
        let node = self.node(n);
        match node.op {
            Op::Call
            | Op::CallMeth
            | Op::CallInter
            | Op::CallFunc
            | Op::Recv
            | Op::Cap
            | Op::Len
            | Op::Copy
            | Op::New
            | Op::Append
            | Op::Delete => true,
            _ => {
                self.callrecv(node.left)
                    || self.callrecv(node.right)
                    || [&node.ninit, &node.nbody, &node.list, &node.rlist]
                        .into_iter()
                        .any(|l| l.iter().any(|n| self.callrecv(Some(*n))))
            }
        }
    }

    fn typecheck_len_cap(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let op = self.op(n);
        if !self.onearg(n, op.spelling()) {
            return None;
        }
        let (l, _) = self.tc_left(n, Ctx::ERV)?;
        let l = self.defaultlit(l, None);
        let l = self.implicitstar(l);
        self.node_mut(n).left = Some(l);
        let t = self.ty(l)?;
        let et = self.types.etype(t);
        let ok = if op == Op::Len { et.ok_for_len() } else { et.ok_for_cap() };
        if !ok {
            let msg = format!("invalid argument {} for {}", self.nstr_long(l), op);
            self.yyerror(msg);
            return None;
        }

        // The result might be constant
        let res = match et {
            EType::String => self.const_str_len(l).map(|len| len as i64),
            EType::Array if self.types.get(t).is_array() && !self.callrecv(Some(l)) => Some(self.types.bound(t)),
            _ => None,
        };
        if let Some(res) = res {
            let span = self.span(n);
            let lit = self.nodlit(Val::Int(res as i128), span);
            return Some((lit, Ctx::ERV));
        }
        self.set_type(n, Some(INT_TYPE_ID));
        Some((n, Ctx::ERV))
    }

    fn typecheck_real_imag(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let op = self.op(n);
        if !self.onearg(n, op.spelling()) {
            return None;
        }
        let (l, t) = self.tc_left(n, Ctx::ERV)?;
        let et = self.types.etype(t);
        if et != EType::Ideal && !et.is_complex() {
            let msg = format!("invalid argument {} for {}", self.nstr_long(l), op);
            self.yyerror(msg);
            return None;
        }
        let part_type = match et {
            EType::Complex64 => FLOAT32_TYPE_ID,
            EType::Complex128 => FLOAT64_TYPE_ID,
            _ => IDEAL_TYPE_ID,
        };
        let part = match (self.op(l), &self.node(l).val) {
            (Op::Literal, Some(Val::Complex(re, im))) => Some(if op == Op::Real { *re } else { *im }),
            (Op::Literal, Some(v)) if et == EType::Ideal => match v {
                Val::Int(i) | Val::Rune(i) => Some(if op == Op::Real { *i as f64 } else { 0.0 }),
                Val::Float(f) => Some(if op == Op::Real { *f } else { 0.0 }),
                _ => None,
            },
            _ => None,
        };
        if let Some(part) = part {
            let span = self.span(n);
            let lit = self.nodlit(Val::Float(part), span);
            self.set_type(lit, Some(part_type));
            return Some((lit, Ctx::ERV));
        }
        self.set_type(n, Some(part_type));
        Some((n, Ctx::ERV))
    }

    fn typecheck_complex(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let list = self.node(n).list.clone();
        let (lt, rt, operands) = if list.len() == 1 {
            // complex(f()) where f returns two floats
            let call = self.typecheck(list[0], Ctx::ERV | Ctx::EFNSTRUCT);
            self.node_mut(n).list = vec![call];
            if !matches!(self.op(call), Op::CallFunc | Op::CallMeth) {
                self.yyerror("invalid operation: complex expects two arguments");
                return None;
            }
            let ct = self.ty(call)?;
            let results: Vec<TypeId> = if self.types.get(ct).is_funarg() {
                self.types.fields(ct).iter().map(|f| f.typ).collect()
            } else {
                vec![ct]
            };
            if results.len() != 2 {
                let msg = format!(
                    "invalid operation: complex expects two arguments, {} returns {} results",
                    self.nstr(call),
                    results.len()
                );
                self.yyerror(msg);
                return None;
            }
            (results[0], results[1], None)
        } else {
            if !self.twoarg(n) {
                return None;
            }
            let l = self.tc_left(n, Ctx::ERV);
            let r = self.tc_right(n, Ctx::ERV);
            let ((l, _), (r, _)) = (l?, r?);
            let (l, r) = self.defaultlit2(l, r, false);
            let node = self.node_mut(n);
            node.left = Some(l);
            node.right = Some(r);
            (self.ty(l)?, self.ty(r)?, Some((l, r)))
        };

        if !self.types.eqtype(lt, rt) {
            let msg =
                format!("invalid operation: {} (mismatched types {} and {})", self.nstr(n), self.tstr(lt), self.tstr(rt));
            self.yyerror(msg);
            return None;
        }
        let t = match self.types.etype(lt) {
            EType::Ideal => IDEAL_TYPE_ID,
            EType::Float32 => COMPLEX64_TYPE_ID,
            EType::Float64 => COMPLEX128_TYPE_ID,
            _ => {
                let msg = format!(
                    "invalid operation: {} (arguments have type {}, expected floating-point)",
                    self.nstr(n),
                    self.tstr(lt)
                );
                self.yyerror(msg);
                return None;
            }
        };

        if let Some((l, r)) = operands {
            let as_float = |v: &Option<Val>| match v {
                Some(Val::Int(i)) | Some(Val::Rune(i)) => Some(*i as f64),
                Some(Val::Float(f)) => Some(*f),
                _ => None,
            };
            let lit_parts = (self.op(l) == Op::Literal && self.op(r) == Op::Literal)
                .then(|| as_float(&self.node(l).val).zip(as_float(&self.node(r).val)))
                .flatten();
            if let Some((re, im)) = lit_parts {
                let span = self.span(n);
                let lit = self.nodlit(Val::Complex(re, im), span);
                self.set_type(lit, Some(t));
                return Some((lit, Ctx::ERV));
            }
        }
        self.set_type(n, Some(t));
        Some((n, Ctx::ERV))
    }

    fn typecheck_delete(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let args = self.node(n).list.clone();
        match args.len() {
            0 => {
                self.yyerror("missing arguments to delete");
                return None;
            }
            1 => {
                self.yyerror("missing second (key) argument to delete");
                return None;
            }
            2 => {}
            _ => {
                self.yyerror("too many arguments to delete");
                return None;
            }
        }
        let mut args = self.typecheck_list(&args, Ctx::ERV);
        let lt = self.ty(args[0]);
        if let Some(lt) = lt {
            if !self.types.get(lt).is_map() {
                let msg = format!("first argument to delete must be map; have {}", self.tstr_long(lt));
                self.yyerror(msg);
                self.node_mut(n).list = args;
                return None;
            }
            let key = self.types.key(lt);
            args[1] = self.assignconv(args[1], key, "delete");
        }
        self.node_mut(n).list = args;
        Some((n, Ctx::ETOP))
    }

    fn typecheck_append(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let args = std::mem::take(&mut self.node_mut(n).list);
        if args.is_empty() {
            self.yyerror("missing arguments to append");
            return None;
        }
        let isddd = self.node(n).isddd;
        let mut args = if args.len() == 1 && !isddd {
            vec![self.typecheck(args[0], Ctx::ERV | Ctx::EFNSTRUCT)]
        } else {
            self.typecheck_list(&args, Ctx::ERV)
        };
        self.node_mut(n).list = args.clone();
        let mut t = self.ty(args[0])?;

        // append(f()) with f returning the slice and the values
        let mut funarg = None;
        if self.types.get(t).is_funarg() {
            funarg = Some(t);
            t = self.types.fields(t).first()?.typ;
        }
        self.set_type(n, Some(t));
        if !self.types.get(t).is_slice() {
            if self.isconst(args[0], CType::Nil) {
                self.yyerror("first argument to append must be typed slice; have untyped nil");
            } else {
                let msg = format!("first argument to append must be slice; have {}", self.tstr_long(t));
                self.yyerror(msg);
            }
            return None;
        }
        let elem = self.types.elem(t);

        if isddd {
            if args.len() == 1 {
                self.yyerror("cannot use ... on first argument to append");
                return None;
            }
            if args.len() != 2 {
                self.yyerror("too many arguments to append");
                return None;
            }
            // append(bytes, s...) with s a string
            let second_is_string = self.ty(args[1]).is_some_and(|t| self.types.get(t).is_string());
            if self.types.etype(elem) == EType::Uint8 && second_is_string {
                args[1] = self.defaultlit(args[1], Some(STRING_TYPE_ID));
            } else {
                let orig = self.types.get(t).orig;
                args[1] = self.assignconv(args[1], orig, "append");
            }
            self.node_mut(n).list = args;
            return Some((n, Ctx::ERV));
        }

        if let Some(funarg) = funarg {
            let rest: Vec<TypeId> = self.types.fields(funarg).iter().skip(1).map(|f| f.typ).collect();
            for rt in rest {
                if self.assignop(rt, elem).0.is_none() {
                    let msg = format!("cannot append {} value to []{}", self.tstr(rt), self.tstr(elem));
                    self.yyerror(msg);
                }
            }
        } else {
            for a in args.iter_mut().skip(1) {
                if self.ty(*a).is_some() {
                    *a = self.assignconv(*a, elem, "append");
                }
            }
        }
        self.node_mut(n).list = args;
        Some((n, Ctx::ERV))
    }

    fn typecheck_copy(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let args = std::mem::take(&mut self.node_mut(n).list);
        if args.len() < 2 {
            self.yyerror("missing arguments to copy");
            return None;
        }
        if args.len() > 2 {
            self.yyerror("too many arguments to copy");
            return None;
        }
        let node = self.node_mut(n);
        node.left = Some(args[0]);
        node.right = Some(args[1]);
        node.typ = Some(INT_TYPE_ID);
        let l = self.tc_left(n, Ctx::ERV);
        let r = self.tc_right(n, Ctx::ERV);
        let ((l, _), (r, _)) = (l?, r?);
        let l = self.defaultlit(l, None);
        let r = self.defaultlit(r, None);
        let node = self.node_mut(n);
        node.left = Some(l);
        node.right = Some(r);
        let (lt, rt) = (self.ty(l)?, self.ty(r)?);
        let (l_slice, r_slice) = (self.types.get(lt).is_slice(), self.types.get(rt).is_slice());

        // copy(bytes, s) with s a string
        if l_slice && self.types.get(rt).is_string() {
            if self.types.eqtype(self.types.elem(lt), BYTE_TYPE_ID) {
                return Some((n, Ctx::ETOP | Ctx::ERV));
            }
            let msg = format!("arguments to copy have different element types: {} and string", self.tstr_long(lt));
            self.yyerror(msg);
            return None;
        }
        if !l_slice || !r_slice {
            let msg = if !l_slice && !r_slice {
                format!("arguments to copy must be slices; have {}, {}", self.tstr_long(lt), self.tstr_long(rt))
            } else if !l_slice {
                format!("first argument to copy should be slice; have {}", self.tstr_long(lt))
            } else {
                format!("second argument to copy should be slice or string; have {}", self.tstr_long(rt))
            };
            self.yyerror(msg);
            return None;
        }
        if !self.types.eqtype(self.types.elem(lt), self.types.elem(rt)) {
            let msg = format!(
                "arguments to copy have different element types: {} and {}",
                self.tstr_long(lt),
                self.tstr_long(rt)
            );
            self.yyerror(msg);
            return None;
        }
        Some((n, Ctx::ETOP | Ctx::ERV))
    }

    fn typecheck_make(&mut self, n: NodeId) -> Option<(NodeId, Ctx)> {
        let args = std::mem::take(&mut self.node_mut(n).list);
        let Some(&first) = args.first() else {
            self.yyerror("missing argument to make");
            return None;
        };
        let l = self.typecheck(first, Ctx::ETYPE);
        let t = self.ty(l)?;
        let mut rest = args[1..].iter().copied();
        let span = self.span(n);

        let (is_slice, is_map, is_chan) = {
            let typ = self.types.get(t);
            (typ.is_slice(), typ.is_map(), typ.is_chan())
        };
        if is_slice {
            let Some(len) = rest.next() else {
                let msg = format!("missing len argument to make({})", self.tstr(t));
                self.yyerror(msg);
                return None;
            };
            let len = self.typecheck(len, Ctx::ERV);
            let cap = rest.next().map(|c| self.typecheck(c, Ctx::ERV));
            self.ty(len)?;
            if let Some(cap) = cap {
                self.ty(cap)?;
            }
            let len = self.checkmake(t, "len", len)?;
            let cap = match cap {
                Some(cap) => Some(self.checkmake(t, "cap", cap)?),
                None => None,
            };
            if let (Some(lv), Some(cv)) = (self.const_int(len), cap.and_then(|c| self.const_int(c))) {
                if lv > cv {
                    let msg = format!("len larger than cap in make({})", self.tstr(t));
                    self.yyerror(msg);
                    return None;
                }
            }
            let node = self.node_mut(n);
            node.left = Some(len);
            node.right = cap;
            node.op = Op::MakeSlice;
        } else if is_map || is_chan {
            let (what, op) = if is_map { ("size", Op::MakeMap) } else { ("buffer", Op::MakeChan) };
            let arg = match rest.next() {
                Some(a) => {
                    let a = self.typecheck(a, Ctx::ERV);
                    self.ty(a)?;
                    self.checkmake(t, what, a)?
                }
                None => self.nodintconst(0, span),
            };
            let node = self.node_mut(n);
            node.left = Some(arg);
            node.op = op;
        } else {
            let msg = format!("cannot make type {}", self.tstr(t));
            self.yyerror(msg);
            return None;
        }

        if rest.next().is_some() {
            let msg = format!("too many arguments to make({})", self.tstr(t));
            self.yyerror(msg);
            self.set_op(n, Op::Make);
            return None;
        }
        self.set_type(n, Some(t));
        Some((n, Ctx::ERV))
    }

    /// Checks a size argument of `make(t, ...)`. Constants must be
    /// non-negative and fit in an int.
    fn checkmake(&mut self, t: TypeId, arg: &str, n: NodeId) -> Option<NodeId> {
        if self.op(n) == Op::Literal {
            if let Some(v) = self.node(n).val.clone() {
                if matches!(v.ctype(), CType::Int | CType::Rune | CType::Float | CType::Complex) {
                    let v = self.toint(v);
                    let iv = v.as_int().unwrap_or(0);
                    self.node_mut(n).val = Some(v);
                    if iv < 0 {
                        let msg = format!("negative {} argument in make({})", arg, self.tstr(t));
                        self.yyerror(msg);
                        return None;
                    }
                    if iv > self.int_range(INT_TYPE_ID).1 {
                        let msg = format!("{} argument too large in make({})", arg, self.tstr(t));
                        self.yyerror(msg);
                        return None;
                    }
                    // Range is checked first so an oversized constant is
                    // reported once
                    return Some(self.defaultlit(n, Some(INT_TYPE_ID)));
                }
            }
        }
        let nt = self.ty(n)?;
        if !self.types.get(nt).is_integer() && self.types.etype(nt) != EType::Ideal {
            let msg = format!("non-integer {} argument in make({}) - {}", arg, self.tstr(t), self.tstr(nt));
            self.yyerror(msg);
            return None;
        }
        // A non-constant untyped value, such as 1<<k
        Some(self.defaultlit(n, Some(INT_TYPE_ID)))
    }
}
