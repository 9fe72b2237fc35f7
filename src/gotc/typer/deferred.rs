// Copyright (c) 2025 knix
// All rights reserved.

//! Resolving the definition behind a name, and completing types that were
//! used before their declaration finished.
//!
//! A type name is bound to a forward type as soon as its declaration starts.
//! When the declaration completes, the forward type's slot is overwritten
//! with the finished type, so every holder of the handle sees the result.
//! Interface method signatures and map key checks wait until no type
//! declaration is in flight.

use log::debug;

use crate::ast::{NodeId, Op, TcState};
use crate::typer::consts::CType;
use crate::typer::types::*;
use crate::typer::{Ctx, Typer};

impl Typer {
    /// Gives the declared entity behind the named node `n` its type (and, for
    /// constants, its value)
    pub(crate) fn typecheckdef(&mut self, n: NodeId) {
        let lno = self.setlineno(n);

        if self.op(n) == Op::NoName {
            if !self.node(n).diag {
                self.node_mut(n).diag = true;
                let sym = self.node(n).sym;
                let is_iota = self.iota_node.is_some() && sym.is_some_and(|s| self.syms.get(s).def == self.iota_node);
                let msg = if is_iota {
                    "cannot use iota outside constant declaration".to_string()
                } else {
                    format!("undefined: {}", self.nstr(n))
                };
                let span = self.span(n);
                self.yyerror_at(span, msg);
            }
            self.lineno = lno;
            return;
        }

        match self.node(n).walkdef {
            TcState::Done => {
                self.lineno = lno;
                return;
            }
            TcState::InProgress => {
                let names = self.defstack_names();
                self.ice(format!("typecheckdef loop:{}", names), None);
            }
            TcState::Unvisited => {}
        }

        self.defstack_push(n);
        self.node_mut(n).walkdef = TcState::InProgress;
        if self.ty(n).is_none() && self.node(n).sym.is_some() {
            match self.op(n) {
                Op::Literal => self.typecheckdef_const(n),
                Op::Name => self.typecheckdef_var(n),
                Op::Type => self.typecheckdef_type(n),
                Op::Pack => {}
                op => self.ice(format!("typecheckdef {}", op), None),
            }
        }

        if self.op(n) != Op::Literal {
            if let Some(t) = self.ty(n) {
                if is_untyped(t) && t != NIL_TYPE_ID {
                    self.ice(format!("got {} for {}", self.tstr(t), self.nstr(n)), None);
                }
            }
        }
        self.defstack_pop(n);
        self.lineno = lno;
        self.node_mut(n).walkdef = TcState::Done;
    }

    fn typecheckdef_const(&mut self, n: NodeId) {
        let ntype = self.node(n).name.as_ref().and_then(|info| info.ntype);
        if let Some(ntype) = ntype {
            let nt = self.typecheck(ntype, Ctx::ETYPE);
            let t = self.ty(nt);
            self.set_type(n, t);
            self.node_mut(n).expect_name_mut().ntype = None;
            if t.is_none() {
                self.node_mut(n).diag = true;
                return;
            }
        }

        let defn = self.node_mut(n).name.as_mut().and_then(|info| info.defn.take());
        let Some(e) = defn else {
            let span = self.span(n);
            self.yyerror_at(span, format!("missing value for constant {}", self.nstr(n)));
            return;
        };
        let mut e = self.typecheck(e, Ctx::ERV | Ctx::EIOTA);
        if self.isconst(e, CType::Nil) {
            self.yyerror("const initializer cannot be nil");
            return;
        }
        if (self.ty(e).is_some() && self.op(e) != Op::Literal) || !self.is_go_const(e) {
            if !self.node(e).diag {
                let msg = format!("const initializer {} is not a constant", self.nstr(e));
                self.yyerror(msg);
                self.node_mut(e).diag = true;
            }
            return;
        }
        if let Some(t) = self.ty(n) {
            if !self.types.etype(t).ok_for_const() {
                let msg = format!("invalid constant type {}", self.tstr(t));
                self.yyerror(msg);
                return;
            }
            let et = self.ty(e);
            if let Some(et) = et {
                if !is_untyped(et) && !self.types.eqtype(t, et) {
                    let msg = format!("cannot use {} as type {} in const initializer", self.nstr_long(e), self.tstr(t));
                    self.yyerror(msg);
                    return;
                }
            }
            e = self.convlit(e, t);
        }
        let (val, typ) = {
            let node = self.node(e);
            (node.val.clone(), node.typ)
        };
        let node = self.node_mut(n);
        node.val = val;
        node.typ = typ;
    }

    fn typecheckdef_var(&mut self, n: NodeId) {
        let ntype = self.node(n).name.as_ref().and_then(|info| info.ntype);
        if let Some(ntype) = ntype {
            let nt = self.typecheck(ntype, Ctx::ETYPE);
            self.node_mut(n).expect_name_mut().ntype = Some(nt);
            let t = self.ty(nt);
            self.set_type(n, t);
            if t.is_none() {
                self.node_mut(n).diag = true;
                return;
            }
        }
        if self.ty(n).is_some() {
            return;
        }
        let defn = self.node(n).name.as_ref().and_then(|info| info.defn);
        let Some(defn) = defn else {
            if self.node(n).name.as_ref().is_some_and(|info| info.builtin.is_some()) || self.nerrors > 0 {
                return;
            }
            self.ice(format!("var without type, init: {}", self.nstr(n)), None);
        };
        if self.op(defn) == Op::Name {
            let d = self.typecheck(defn, Ctx::ERV);
            self.node_mut(n).expect_name_mut().defn = Some(d);
            let t = self.ty(d);
            self.set_type(n, t);
            return;
        }
        // The declaring assignment fills in the type
        let d = self.typecheck(defn, Ctx::ETOP);
        self.node_mut(n).expect_name_mut().defn = Some(d);
    }

    fn typecheckdef_type(&mut self, n: NodeId) {
        let in_fn = self.cur_fn.is_some();
        if in_fn {
            self.defercheckwidth();
        }
        self.node_mut(n).walkdef = TcState::Done;
        let span = self.span(n);
        let t = self.types.forward(span);
        self.types.get_mut(t).sym = self.node(n).sym;
        self.set_type(n, Some(t));
        let errors_before = self.nerrors;
        self.typecheckdeftype(n);
        if self.types.get(t).is_forward() && self.nerrors > errors_before {
            // Already reported; keep later uses quiet
            self.types.get_mut(t).broke = true;
        }
        if in_fn {
            self.resumecheckwidth();
        }
    }

    /// Checks the definition of the declared type `n` and completes its
    /// forward type. Queued work runs once the outermost declaration is done.
    fn typecheckdeftype(&mut self, n: NodeId) {
        self.ntypecheckdeftype += 1;
        let lno = self.setlineno(n);
        self.node_mut(n).typecheck = TcState::Done;

        let ntype = self.node(n).name.as_ref().and_then(|info| info.ntype);
        let def = ntype.map(|nt| self.typecheck(nt, Ctx::ETYPE));
        if let Some(info) = self.node_mut(n).name.as_mut() {
            info.ntype = def;
        }
        match def.and_then(|d| self.ty(d)) {
            Some(t) => self.copytype(n, t),
            None => {
                self.node_mut(n).diag = true;
                self.set_type(n, None);
            }
        }

        self.lineno = lno;
        if self.ntypecheckdeftype == 1 {
            self.drain_queues();
        }
        self.ntypecheckdeftype -= 1;
    }

    fn drain_queues(&mut self) {
        loop {
            let methods = std::mem::take(&mut self.methodqueue);
            if methods.is_empty() {
                break;
            }
            debug!("resolving {} queued interface methods", methods.len());
            for m in methods {
                self.domethod(m);
            }
        }
        let maps = std::mem::take(&mut self.mapqueue);
        for decl in maps {
            let Some(key) = self.ty(decl) else { continue };
            if let Some(span) = self.types.get(key).maplineno {
                self.lineno = span;
            }
            if self.types.incomparable_component(key).is_some() {
                let msg = format!("invalid map key type {}", self.tstr(key));
                self.yyerror(msg);
            }
        }
    }

    /// Completes the forward type of declaration `n` with the contents of `t`
    /// and then every declaration that was waiting on it.
    fn copytype(&mut self, n: NodeId, t: TypeId) {
        if self.types.get(t).is_forward() {
            // Defined as another type still being declared; finish together
            if let Some(fwd) = self.types.get_mut(t).as_forward_mut() {
                fwd.copyto.push(n);
            }
            return;
        }
        let Some(nt) = self.ty(n) else { return };

        let (maplineno, embedlineno, copyto) = {
            let forward = self.types.get_mut(nt);
            let copyto = forward.as_forward_mut().map(|f| std::mem::take(&mut f.copyto)).unwrap_or_default();
            (forward.maplineno, forward.embedlineno, copyto)
        };
        debug!("completing {} as {} for {} waiting", self.nstr(n), self.tstr(t), copyto.len());

        let sym = self.node(n).sym;
        let vargen = self.node(n).name.as_ref().map(|info| info.vargen).unwrap_or(0);
        let local = sym.is_some_and(|s| self.syms.get(s).pkg == self.syms.local_pkg);
        self.types.overwrite(nt, t);
        {
            let typ = self.types.get_mut(nt);
            typ.sym = sym;
            typ.local = local;
            typ.vargen = vargen;
            typ.nod = None;
            typ.methods = Vec::new();
            typ.all_methods = Vec::new();
            typ.deferwidth = false;
        }

        // Double-check use of the type as an embedded type
        let lno = self.lineno;
        if let Some(span) = embedlineno {
            self.lineno = span;
            if self.types.get(nt).is_ptr() || self.types.get(nt).is_unsafe_ptr() {
                self.yyerror("embedded type cannot be a pointer");
            }
        }
        self.lineno = lno;

        for waiting in copyto {
            self.copytype(waiting, nt);
        }

        // Map keys are checked once every declaration in flight has settled
        if maplineno.is_some() {
            self.types.get_mut(nt).maplineno = maplineno;
            self.mapqueue.push(n);
        }
    }

    /// Resolves the signature of the interface method declared by field `n`
    /// now, or after the type declarations in flight complete.
    pub(crate) fn queuemethod(&mut self, n: NodeId) {
        if self.ntypecheckdeftype == 0 {
            self.domethod(n);
            return;
        }
        self.methodqueue.push(n);
    }

    fn domethod(&mut self, n: NodeId) {
        let Some(placeholder) = self.ty(n) else { return };
        let Some(sig) = self.types.get(placeholder).nname else { return };
        let sig = self.typecheck(sig, Ctx::ETYPE);
        let Some(st) = self.ty(sig) else {
            // Leave the empty signature
            self.types.get_mut(placeholder).nname = None;
            return;
        };

        // `M(_ int)` still prints its parameter as `_`
        let params = self.types.params(st);
        let blank_params: Vec<usize> = self
            .types
            .fields(params)
            .iter()
            .enumerate()
            .filter(|(_, f)| f.sym.is_some() && f.nname.is_some_and(|nn| self.is_blank(nn)))
            .map(|(i, _)| i)
            .collect();
        for i in blank_params {
            self.types.fields_mut(params)[i].sym = None;
        }

        self.types.overwrite(placeholder, st);
        let typ = self.types.get_mut(placeholder);
        typ.nod = None;
        typ.nname = None;
        self.checkwidth(placeholder);
    }
}
