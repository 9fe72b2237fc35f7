// Copyright (c) 2025 knix
// All rights reserved.

//! Assignments, and matching argument lists against parameter lists.

use crate::SV8;
use crate::ast::{Class, NodeId, Op, TcState};
use crate::typer::types::*;
use crate::typer::{Ctx, Typer};

/// How an argument list failed to line up with its parameters
enum Arity {
    Ok,
    NotEnough(Option<NodeId>),
    TooMany,
}

impl Typer {
    /// Checks the values `args` against the fields of `tstruct`, converting
    /// each to its parameter type. Used for calls (`call` is the callee) and
    /// for `return`. A single multi-value call may supply every parameter.
    pub(crate) fn typecheckaste(
        &mut self,
        op: Op,
        call: Option<NodeId>,
        isddd: bool,
        tstruct: TypeId,
        mut args: Vec<NodeId>,
        desc: &str,
    ) -> Vec<NodeId> {
        let lno = self.lineno;
        let arity = self.match_args(op, call, isddd, tstruct, &mut args, desc);
        match arity {
            Arity::Ok => {}
            Arity::NotEnough(n) => {
                if !n.is_some_and(|n| self.node(n).diag) {
                    let msg = match call {
                        Some(call) => format!("not enough arguments in call to {}", self.nstr(call)),
                        None => format!("not enough arguments to {}", op),
                    };
                    self.yyerror(msg);
                    if let Some(n) = n {
                        self.node_mut(n).diag = true;
                    }
                }
            }
            Arity::TooMany => {
                let msg = match call {
                    Some(call) => format!("too many arguments in call to {}", self.nstr(call)),
                    None => format!("too many arguments to {}", op),
                };
                self.yyerror(msg);
            }
        }
        self.lineno = lno;
        args
    }

    fn match_args(
        &mut self,
        op: Op,
        call: Option<NodeId>,
        isddd: bool,
        tstruct: TypeId,
        args: &mut [NodeId],
        desc: &str,
    ) -> Arity {
        if self.types.get(tstruct).broke {
            return Arity::Ok;
        }
        let params: SV8<Field> = self.types.fields(tstruct).iter().cloned().collect();
        let hasddd = self.types.has_ddd_param(tstruct);

        // f(g()) where g returns several values
        if args.len() == 1 {
            let n = args[0];
            if let Some(nt) = self.ty(n) {
                if self.types.get(nt).is_funarg() {
                    let results: Vec<TypeId> = self.types.fields(nt).iter().map(|f| f.typ).collect();
                    if !hasddd {
                        if results.len() > params.len() {
                            return Arity::TooMany;
                        }
                        if results.len() < params.len() {
                            return Arity::NotEnough(Some(n));
                        }
                    }
                    let mut results = results.into_iter();
                    for param in &params {
                        if param.isddd {
                            let elem = self.types.elem(param.typ);
                            for rt in results.by_ref() {
                                self.check_multi_value_arg(rt, elem, call, desc);
                            }
                            return Arity::Ok;
                        }
                        let Some(rt) = results.next() else { return Arity::NotEnough(Some(n)) };
                        self.check_multi_value_arg(rt, param.typ, call, desc);
                    }
                    if results.next().is_some() {
                        return Arity::TooMany;
                    }
                    return Arity::Ok;
                }
            }
        }

        let (n1, n2) = (params.len(), args.len());
        if !hasddd || isddd {
            if n2 > n1 {
                return Arity::TooMany;
            }
            if n2 < n1 {
                return Arity::NotEnough(args.last().copied());
            }
        } else if n2 + 1 < n1 {
            return Arity::NotEnough(args.last().copied());
        }

        let mut i = 0;
        for param in &params {
            if param.isddd {
                if isddd {
                    // f(xs...) passes the slice itself
                    if i >= args.len() {
                        return Arity::NotEnough(None);
                    }
                    if args.len() - i > 1 {
                        return Arity::TooMany;
                    }
                    self.setlineno(args[i]);
                    if self.ty(args[i]).is_some() {
                        args[i] = self.assignconv(args[i], param.typ, desc);
                    }
                    return Arity::Ok;
                }
                let elem = self.types.elem(param.typ);
                while i < args.len() {
                    self.setlineno(args[i]);
                    if self.ty(args[i]).is_some() {
                        args[i] = self.assignconv(args[i], elem, desc);
                    }
                    i += 1;
                }
                return Arity::Ok;
            }
            if i >= args.len() {
                return Arity::NotEnough(args.last().copied());
            }
            self.setlineno(args[i]);
            if self.ty(args[i]).is_some() {
                args[i] = self.assignconv(args[i], param.typ, desc);
            }
            i += 1;
        }
        if i < args.len() {
            return Arity::TooMany;
        }
        if isddd {
            let msg = match call {
                Some(call) => format!("invalid use of ... in call to {}", self.nstr(call)),
                None => format!("invalid use of ... in {}", op),
            };
            self.yyerror(msg);
        }
        Arity::Ok
    }

    fn check_multi_value_arg(&mut self, src: TypeId, dst: TypeId, call: Option<NodeId>, desc: &str) {
        let (op, why) = self.assignop(src, dst);
        if op.is_some() {
            return;
        }
        let msg = match call {
            Some(call) => {
                format!("cannot use {} as type {} in argument to {}{}", self.tstr(src), self.tstr(dst), self.nstr(call), why)
            }
            None => format!("cannot use {} as type {} in {}{}", self.tstr(src), self.tstr(dst), desc, why),
        };
        self.yyerror(msg);
    }

    /// Whether `n` denotes a storage location
    pub(crate) fn islvalue(&self, n: NodeId) -> bool {
        let node = self.node(n);
        match node.op {
            Op::Index => {
                let Some(l) = node.left else { return false };
                match self.ty(l) {
                    Some(lt) if self.types.get(lt).is_array() => self.islvalue(l),
                    Some(lt) if self.types.get(lt).is_string() => false,
                    _ => true,
                }
            }
            Op::Ind | Op::DotPtr => true,
            Op::Dot => node.left.is_some_and(|l| self.islvalue(l)),
            Op::Name => node.class() != Class::Func,
            _ => false,
        }
    }

    pub(crate) fn checklvalue(&mut self, n: NodeId, verb: &str) {
        if !self.islvalue(n) {
            let msg = format!("cannot {} {}", verb, self.nstr(n));
            self.yyerror(msg);
        }
    }

    /// Reports `n` if it cannot be assigned to
    pub(crate) fn checkassign(&mut self, n: NodeId) {
        if self.islvalue(n) {
            return;
        }
        match self.op(n) {
            // Assigning to a map element is fine
            Op::IndexMap => return,
            // Undefined; already reported
            Op::NoName => return,
            _ => {}
        }
        let in_map = self.op(n) == Op::Dot && self.node(n).left.is_some_and(|l| self.op(l) == Op::IndexMap);
        let msg = if in_map {
            format!("cannot assign to struct field {} in map", self.nstr(n))
        } else {
            format!("cannot assign to {}", self.nstr(n))
        };
        self.yyerror(msg);
    }

    /// Whether `n` is a name declared by `stmt` whose type comes from the
    /// right-hand side
    fn declared_by(&self, n: NodeId, stmt: NodeId) -> bool {
        self.node(n)
            .name
            .as_ref()
            .is_some_and(|info| info.defn == Some(stmt) && info.ntype.is_none())
    }

    /// `x = y`, and `x := y` or `var x = y` where the declared name takes the
    /// type of the value
    pub(crate) fn typecheckas(&mut self, n: NodeId) {
        let Some(left) = self.node(n).left else {
            self.ice("assignment without a left-hand side", None)
        };
        // The name may be checked from its declaration, which checks this
        // statement; it gets its type at the end instead
        let left = if self.declared_by(left, n) { left } else { self.typecheck(left, Ctx::ERV | Ctx::EASGN) };
        self.node_mut(n).left = Some(left);
        let right = self.node(n).right.map(|r| self.typecheck(r, Ctx::ERV));
        self.node_mut(n).right = right;
        self.checkassign(left);

        if let (Some(r), Some(lt)) = (right, self.ty(left)) {
            if self.ty(r).is_some() {
                let r = self.assignconv(r, lt, "assignment");
                self.node_mut(n).right = Some(r);
            }
        }
        if self.declared_by(left, n) {
            if let Some(r) = self.node(n).right {
                let r = self.defaultlit(r, None);
                self.node_mut(n).right = Some(r);
                let rt = self.ty(r);
                self.set_type(left, rt);
            }
        }

        self.node_mut(n).typecheck = TcState::Done;
        if self.node(left).typecheck == TcState::Unvisited {
            let left = self.typecheck(left, Ctx::ERV | Ctx::EASGN);
            self.node_mut(n).left = Some(left);
        }
    }

    /// `a, b = x, y`, `a, b = f()`, and the comma-ok forms `v, ok = m[k]`,
    /// `v, ok = <-c` and `v, ok = x.(T)`
    pub(crate) fn typecheckas2(&mut self, n: NodeId) {
        let mut lhs = std::mem::take(&mut self.node_mut(n).list);
        for l in lhs.iter_mut() {
            *l = self.resolve(*l);
            if !self.declared_by(*l, n) {
                *l = self.typecheck(*l, Ctx::ERV | Ctx::EASGN);
            }
        }
        self.node_mut(n).list = lhs.clone();

        let cl = lhs.len();
        let mut rhs = std::mem::take(&mut self.node_mut(n).rlist);
        if cl > 1 && rhs.len() == 1 {
            rhs[0] = self.typecheck(rhs[0], Ctx::ERV | Ctx::EFNSTRUCT);
        } else {
            rhs = self.typecheck_list(&rhs, Ctx::ERV);
        }
        let cr = rhs.len();
        for l in &lhs {
            self.checkassign(*l);
        }

        if cl == cr {
            for (l, r) in lhs.iter().zip(rhs.iter_mut()) {
                if let (Some(lt), Some(_)) = (self.ty(*l), self.ty(*r)) {
                    *r = self.assignconv(*r, lt, "assignment");
                }
                if self.declared_by(*l, n) {
                    *r = self.defaultlit(*r, None);
                    let rt = self.ty(*r);
                    self.set_type(*l, rt);
                }
            }
            self.node_mut(n).rlist = rhs;
            self.finish_as2(n);
            return;
        }
        self.node_mut(n).rlist = rhs.clone();

        let mismatch = 'check: {
            let r = rhs[0];
            if cr != 1 {
                break 'check true;
            }
            let Some(rt) = self.ty(r) else { break 'check false };

            // x, y, z = f()
            if matches!(self.op(r), Op::CallFunc | Op::CallMeth | Op::CallInter) && self.types.get(rt).is_funarg() {
                let results: Vec<TypeId> = self.types.fields(rt).iter().map(|f| f.typ).collect();
                if results.len() != cl {
                    let msg = format!("assignment count mismatch: {} = {}", cl, results.len());
                    self.yyerror(msg);
                    break 'check false;
                }
                self.set_op(n, Op::As2Func);
                for (l, t) in lhs.iter().zip(results) {
                    if self.ty(*l).is_some() {
                        self.checkassignto(t, *l);
                    }
                    if self.declared_by(*l, n) {
                        self.set_type(*l, Some(t));
                    }
                }
                break 'check false;
            }

            // x, ok = y
            if cl == 2 && matches!(self.op(r), Op::IndexMap | Op::Recv | Op::DotType) {
                let op = match self.op(r) {
                    Op::IndexMap => Op::As2MapR,
                    Op::Recv => Op::As2Recv,
                    _ => {
                        self.set_op(r, Op::DotType2);
                        Op::As2DotType
                    }
                };
                self.set_op(n, op);
                let (v, ok) = (lhs[0], lhs[1]);
                if self.ty(v).is_some() {
                    self.checkassignto(rt, v);
                }
                if self.node(v).name.as_ref().is_some_and(|info| info.defn == Some(n)) {
                    self.set_type(v, Some(rt));
                }
                if let Some(okt) = self.ty(ok) {
                    if !self.types.get(okt).is_boolean() {
                        self.checkassignto(BOOL_TYPE_ID, ok);
                    }
                }
                if self.declared_by(ok, n) {
                    self.set_type(ok, Some(BOOL_TYPE_ID));
                }
                break 'check false;
            }
            true
        };
        if mismatch {
            let msg = format!("assignment count mismatch: {} = {}", cl, cr);
            self.yyerror(msg);
        }
        self.finish_as2(n);
    }

    /// Names declared by `n` are checked now that they have their types
    fn finish_as2(&mut self, n: NodeId) {
        self.node_mut(n).typecheck = TcState::Done;
        let mut lhs = std::mem::take(&mut self.node_mut(n).list);
        for l in lhs.iter_mut() {
            if self.node(*l).typecheck == TcState::Unvisited {
                *l = self.typecheck(*l, Ctx::ERV | Ctx::EASGN);
            }
        }
        self.node_mut(n).list = lhs;
    }

    fn checkassignto(&mut self, src: TypeId, dst: NodeId) {
        let Some(dt) = self.ty(dst) else { return };
        let (op, why) = self.assignop(src, dt);
        if op.is_none() {
            let msg =
                format!("cannot assign {} to {} in multiple assignment{}", self.tstr(src), self.nstr_long(dst), why);
            self.yyerror(msg);
        }
    }
}
