// Copyright (c) 2025 knix
// All rights reserved.

//! Declarations: binding names in scopes, grouping constant and variable
//! declarations, and turning type expressions into types.

use std::cmp::Ordering;

use fxhash::FxHashSet;
use log::trace;

use crate::ast::{Class, NameInfo, NodeId, Op, TcState};
use crate::span::SpanId;
use crate::typer::consts::{CType, Val};
use crate::typer::syms::{SymId, Syms, exportname};
use crate::typer::types::*;
use crate::typer::{Ctx, Typer};

impl Typer {
    /// A fresh name node for `sym`, not yet bound in any scope
    pub fn newname(&mut self, sym: SymId, span: SpanId) -> NodeId {
        let n = self.nodes.nod(Op::Name, None, None, span);
        let node = self.node_mut(n);
        node.sym = Some(sym);
        node.name = Some(Box::new(NameInfo { iota: -1, ..NameInfo::default() }));
        n
    }

    /// A reference to `sym`. Names not declared yet are resolved again when
    /// they are checked, so a later top-level declaration can still satisfy
    /// them.
    pub fn oldname(&mut self, sym: SymId, span: SpanId) -> NodeId {
        match self.syms.get(sym).def {
            Some(def) if Some(def) != self.iota_node => def,
            _ => {
                let n = self.newname(sym, span);
                self.set_op(n, Op::NoName);
                let iota = self.iota;
                self.node_mut(n).expect_name_mut().iota = iota;
                n
            }
        }
    }

    /// The canonical type node of `t`
    pub fn typenod(&mut self, t: TypeId) -> NodeId {
        if let Some(n) = self.types.get(t).nod {
            return n;
        }
        let typ = self.types.get(t);
        let (span, sym) = (typ.span, typ.sym);
        let n = self.nodes.nod(Op::Type, None, None, span);
        let node = self.node_mut(n);
        node.typ = Some(t);
        node.sym = sym;
        node.typecheck = TcState::Done;
        self.types.get_mut(t).nod = Some(n);
        n
    }

    pub(crate) fn dclcontext(&self) -> Class {
        if self.in_function_scope() { Class::Auto } else { Class::Extern }
    }

    /// Binds the name node `n` in the current block
    pub fn declare(&mut self, n: NodeId, ctxt: Class) {
        if self.is_blank(n) {
            return;
        }
        let Some(s) = self.node(n).sym else { return };
        if self.node(n).name.is_none() {
            self.node_mut(n).name = Some(Box::default());
        }
        let span = self.span(n);
        if ctxt == Class::Extern && self.syms.name(s) == "init" {
            self.yyerror_at(span, "cannot declare init - must be func");
        }

        if ctxt == Class::Extern {
            self.externdcl.push(n);
        }
        let mut vgen = 0;
        if ctxt != Class::Extern {
            if self.op(n) == Op::Type {
                self.typegen += 1;
                vgen = self.typegen;
            } else if self.op(n) == Op::Name && ctxt == Class::Auto {
                self.vargen += 1;
                vgen = self.vargen;
            }
        }
        if ctxt == Class::Auto {
            self.node_mut(n).xoffset = 0;
        }
        // Duplicate parameters are reported when the signature is built
        if self.syms.get(s).block == self.block && ctxt != Class::Param && ctxt != Class::ParamOut {
            self.redeclare(s, span, "in this block");
        }
        self.push_binding(s, n);
        let info = self.node_mut(n).expect_name_mut();
        info.vargen = vgen;
        info.class = ctxt;
    }

    fn redeclare(&mut self, s: SymId, span: SpanId, place: &str) {
        let prev = self.syms.get(s).lastlineno;
        let msg = format!(
            "{} redeclared {}\n\tprevious declaration at {}",
            self.syms.name(s),
            place,
            self.spans.location(prev)
        );
        self.yyerror_at(span, msg);
    }

    // Constant groups

    /// Starts a parenthesized `const (...)` group; `iota` counts from zero
    pub fn begin_const_group(&mut self) {
        self.iota = 0;
        self.lastconst.clear();
        self.lasttype = None;
    }

    pub fn end_const_group(&mut self) {
        self.iota = -1;
        self.lastconst.clear();
        self.lasttype = None;
    }

    /// Declares one line of a constant group. An empty `values` repeats the
    /// previous line's expressions and type, with `iota` advanced.
    pub fn constiter(&mut self, names: &[NodeId], ntype: Option<NodeId>, values: Vec<NodeId>) -> Vec<NodeId> {
        let (cl, t, span) = if values.is_empty() {
            if ntype.is_some() {
                self.yyerror("const declaration cannot have type without expression");
            }
            (self.lastconst.clone(), self.lasttype, names.first().map(|n| self.span(*n)))
        } else {
            self.lastconst = values.clone();
            self.lasttype = ntype;
            (values, ntype, None)
        };

        let clcopy: Vec<NodeId> = cl.iter().map(|c| self.treecopy(*c, span)).collect();
        let mut rest = clcopy.into_iter();
        let ctxt = self.dclcontext();
        let mut out = Vec::with_capacity(names.len());
        for &v in names {
            let Some(c) = rest.next() else {
                self.yyerror("missing value in const declaration");
                break;
            };
            self.set_op(v, Op::Literal);
            self.declare(v, ctxt);
            let info = self.node_mut(v).expect_name_mut();
            info.ntype = t;
            info.defn = Some(c);
            let span = self.span(v);
            out.push(self.nodes.nod(Op::DclConst, Some(v), None, span));
        }
        if rest.next().is_some() {
            self.yyerror("extra expression in const declaration");
        }
        self.iota += 1;
        out
    }

    /// Copies an expression for an implicitly repeated constant line. Every
    /// reference to `iota` gets its own node carrying the current value.
    fn treecopy(&mut self, n: NodeId, span: Option<SpanId>) -> NodeId {
        match self.op(n) {
            Op::NoName => {
                let is_iota = self.iota_node.is_some()
                    && self.node(n).sym.is_some_and(|s| self.syms.get(s).def == self.iota_node);
                if !is_iota {
                    return n;
                }
                let m = self.nodes.copy(n);
                let iota = self.iota;
                let node = self.node_mut(m);
                if let Some(span) = span {
                    node.span = span;
                }
                node.expect_name_mut().iota = iota;
                m
            }
            Op::Name | Op::Literal | Op::Type => n,
            _ => {
                let m = self.nodes.copy(n);
                if let Some(l) = self.node(n).left {
                    let l = self.treecopy(l, span);
                    self.node_mut(m).left = Some(l);
                }
                if let Some(r) = self.node(n).right {
                    let r = self.treecopy(r, span);
                    self.node_mut(m).right = Some(r);
                }
                let list = self.node(n).list.clone();
                let list = list.into_iter().map(|x| self.treecopy(x, span)).collect();
                let node = self.node_mut(m);
                node.list = list;
                node.typecheck = TcState::Unvisited;
                if let Some(span) = span {
                    node.span = span;
                }
                m
            }
        }
    }

    /// Declares `var names [ntype] [= values]` and returns the statements
    /// that initialize them.
    pub fn variter(&mut self, names: &[NodeId], ntype: Option<NodeId>, values: Vec<NodeId>) -> Vec<NodeId> {
        let ctxt = self.dclcontext();
        let local = ctxt == Class::Auto;
        let mut init = Vec::new();

        if values.len() == 1 && names.len() > 1 {
            let span = self.span(values[0]);
            let as2 = self.nodes.nod(Op::As2, None, None, span);
            {
                let node = self.node_mut(as2);
                node.list = names.to_vec();
                node.rlist = values;
            }
            for &v in names {
                self.set_op(v, Op::Name);
                self.declare(v, ctxt);
                let info = self.node_mut(v).expect_name_mut();
                info.ntype = ntype;
                info.defn = Some(as2);
                if local {
                    let span = self.span(v);
                    init.push(self.nodes.nod(Op::Dcl, Some(v), None, span));
                }
            }
            init.push(as2);
            return init;
        }

        let doexpr = !values.is_empty();
        let mut rest = values.into_iter();
        for &v in names {
            let e = if doexpr {
                match rest.next() {
                    Some(e) => Some(e),
                    None => {
                        self.yyerror("missing expression in var declaration");
                        break;
                    }
                }
            } else {
                None
            };
            self.set_op(v, Op::Name);
            self.declare(v, ctxt);
            if let Some(info) = self.node_mut(v).name.as_mut() {
                info.ntype = ntype;
            }
            if e.is_some() || local || self.is_blank(v) {
                let span = self.span(v);
                if local {
                    init.push(self.nodes.nod(Op::Dcl, Some(v), None, span));
                }
                let assign = self.nodes.nod(Op::As, Some(v), e, span);
                init.push(assign);
                if e.is_some() {
                    if let Some(info) = self.node_mut(v).name.as_mut() {
                        info.defn = Some(assign);
                    }
                }
            }
        }
        if rest.next().is_some() {
            self.yyerror("extra expression in var declaration");
        }
        init
    }

    /// Declares the type name `n` as `ntype`
    pub fn typedcl(&mut self, n: NodeId, ntype: NodeId) -> NodeId {
        self.set_op(n, Op::Type);
        let ctxt = self.dclcontext();
        self.declare(n, ctxt);
        if let Some(info) = self.node_mut(n).name.as_mut() {
            info.ntype = Some(ntype);
        }
        let span = self.span(n);
        self.nodes.nod(Op::DclType, Some(n), None, span)
    }

    /// A field, parameter or method line: `name type`
    pub fn dclfield(&mut self, name: Option<SymId>, typ: NodeId, span: SpanId) -> NodeId {
        let left = name.map(|s| self.newname(s, span));
        self.nodes.nod(Op::DclField, left, Some(typ), span)
    }

    /// Opens a function declaration. The parameters are bound in a new block
    /// that `funcbody` closes.
    pub fn funchdr(
        &mut self,
        sym: SymId,
        recv: Option<NodeId>,
        params: Vec<NodeId>,
        results: Vec<NodeId>,
        span: SpanId,
    ) -> NodeId {
        let ntype = self.nodes.nod(Op::TFunc, recv, None, span);
        {
            let node = self.node_mut(ntype);
            node.list = params;
            node.rlist = results;
        }
        let f = self.nodes.nod(Op::DclFunc, None, None, span);
        let nname = match recv {
            Some(recv) => {
                let shortname = self.newname(sym, span);
                let recv_type = self.node(recv).right.map(|r| self.nstr(r)).unwrap_or_default();
                let full = if recv_type.starts_with('*') {
                    format!("({}).{}", recv_type, self.syms.name(sym))
                } else {
                    format!("{}.{}", recv_type, self.syms.name(sym))
                };
                let full = self.syms.local(&full);
                self.node_mut(f).right = Some(shortname);
                self.newname(full, span)
            }
            None => {
                let nname = self.newname(sym, span);
                self.declare(nname, Class::Func);
                nname
            }
        };
        {
            let info = self.node_mut(nname).expect_name_mut();
            info.ntype = Some(ntype);
            info.defn = Some(f);
            info.class = Class::Func;
        }
        self.node_mut(f).left = Some(nname);
        self.markdcl();
        self.funcargs(ntype);
        f
    }

    /// Opens a function literal of signature `ntype`
    pub fn closurehdr(&mut self, ntype: NodeId) -> NodeId {
        let span = self.span(ntype);
        let f = self.nodes.nod(Op::Closure, Some(ntype), None, span);
        self.markdcl();
        self.funcargs(ntype);
        f
    }

    pub fn funcbody(&mut self, f: NodeId, body: Vec<NodeId>) {
        self.node_mut(f).nbody = body;
        self.popdcl();
    }

    /// Declares the receiver, parameters and results of a signature. Unnamed
    /// results are named `~rN` and blank ones `~bN` so returns can assign them.
    fn funcargs(&mut self, nt: NodeId) {
        let (recv, params, results) = {
            let node = self.node(nt);
            (node.left, node.list.clone(), node.rlist.clone())
        };
        for n in recv.into_iter().chain(params.iter().copied()) {
            if let Some(l) = self.node(n).left {
                let right = self.node(n).right;
                self.set_op(l, Op::Name);
                if let Some(info) = self.node_mut(l).name.as_mut() {
                    info.ntype = right;
                }
                self.declare(l, Class::Param);
            }
        }

        let mut vgen = params.len();
        for n in results {
            let l = match self.node(n).left {
                Some(l) if !self.is_blank(l) => l,
                Some(l) => {
                    let sym = self.syms.local(&format!("~b{}", vgen));
                    vgen += 1;
                    let m = self.nodes.copy(l);
                    self.node_mut(m).sym = Some(sym);
                    self.node_mut(n).left = Some(m);
                    m
                }
                None => {
                    let sym = self.syms.local(&format!("~r{}", vgen));
                    vgen += 1;
                    let span = self.span(n);
                    let m = self.newname(sym, span);
                    self.node_mut(n).left = Some(m);
                    m
                }
            };
            let right = self.node(n).right;
            self.set_op(l, Op::Name);
            if let Some(info) = self.node_mut(l).name.as_mut() {
                info.ntype = right;
            }
            self.declare(l, Class::ParamOut);
        }
    }

    // Type expressions

    /// Turns a type expression node into an OTYPE node carrying its type
    pub(crate) fn typecheck_type_expr(&mut self, n: NodeId, top: Ctx) -> Option<()> {
        let span = self.span(n);
        let op = self.op(n);
        let t = match op {
            Op::TArray => {
                let mut broke = false;
                let bound = match self.node(n).left {
                    None => SLICE_BOUND,
                    Some(l) if self.op(l) == Op::Ddd => {
                        if !top.has(Ctx::ECOMPLIT) && !self.node(n).diag {
                            broke = true;
                            self.node_mut(n).diag = true;
                            self.yyerror("use of [...] array outside of array literal");
                        }
                        DDD_BOUND
                    }
                    Some(_) => self.array_bound(n)?,
                };
                let (_, elem) = self.tc_right(n, Ctx::ETYPE)?;
                let t = self.types.array_of(elem, bound);
                let typ = self.types.get_mut(t);
                typ.span = span;
                typ.broke = broke;
                t
            }
            Op::TMap => {
                let key = self.tc_left(n, Ctx::ETYPE);
                let val = self.tc_right(n, Ctx::ETYPE);
                let ((_, key), (_, val)) = (key?, val?);
                self.maptype(key, val, span)
            }
            Op::TChan => {
                let (_, elem) = self.tc_left(n, Ctx::ETYPE)?;
                let dir = self.node(n).chan_dir;
                let t = self.types.chan_of(elem, dir);
                self.types.get_mut(t).span = span;
                t
            }
            Op::TStruct => {
                let list = self.node(n).list.clone();
                let t = self.tostruct(&list, span);
                if self.types.get(t).broke {
                    return None;
                }
                t
            }
            Op::TInter => {
                let list = self.node(n).list.clone();
                self.tointerface(&list, span)
            }
            Op::TFunc => {
                let node = self.node(n);
                let (this, params, results) = (node.left, node.list.clone(), node.rlist.clone());
                self.functype(this, &params, &results, span)
            }
            _ => self.ice(format!("typecheck_type_expr {}", op), None),
        };
        trace!("type expression {} is {}", op, self.tstr(t));

        self.set_op(n, Op::Type);
        self.set_type(n, Some(t));
        if op == Op::TArray {
            self.node_mut(n).left = None;
            self.node_mut(n).right = None;
            if self.types.bound(t) != DDD_BOUND {
                self.checkwidth(t);
            }
        }
        Some(())
    }

    fn array_bound(&mut self, n: NodeId) -> Option<i64> {
        let l = self.node(n).left?;
        let l = self.typecheck(l, Ctx::ERV);
        self.node_mut(n).left = Some(l);
        let v = match (self.consttype(l), self.node(l).val.clone()) {
            (Some(CType::Int | CType::Rune), Some(v)) => v,
            (Some(CType::Float), Some(v)) => self.toint(v),
            _ => {
                let integer = self.ty(l).is_some_and(|t| self.types.get(t).is_integer());
                let msg = if integer && self.op(l) != Op::Literal {
                    format!("non-constant array bound {}", self.nstr(l))
                } else {
                    format!("invalid array bound {}", self.nstr(l))
                };
                self.yyerror(msg);
                return None;
            }
        };
        if self.doesoverflow(&v, INT_TYPE_ID) {
            self.yyerror("array bound is too large");
            return None;
        }
        let bound = v.as_int()?;
        if bound < 0 {
            self.yyerror("array bound must be non-negative");
            return None;
        }
        Some(bound as i64)
    }

    /// `map[key]val`. A key that is still being declared is validated once
    /// its declaration completes.
    pub(crate) fn maptype(&mut self, key: TypeId, val: TypeId, span: SpanId) -> TypeId {
        if let Some(bad) = self.types.incomparable_component(key) {
            match self.types.etype(bad) {
                EType::Any => {}
                EType::Forw => {
                    let lineno = self.lineno;
                    let k = self.types.get_mut(key);
                    if k.maplineno.is_none() {
                        k.maplineno = Some(lineno);
                    }
                }
                _ => {
                    let msg = format!("invalid map key type {}", self.tstr(key));
                    self.yyerror(msg);
                }
            }
        }
        let t = self.types.map_of(key, val);
        self.types.get_mut(t).span = span;
        t
    }

    pub(crate) fn tostruct(&mut self, l: &[NodeId], span: SpanId) -> TypeId {
        let mut broke = false;
        let mut fields = Vec::with_capacity(l.len());
        for &n in l {
            let f = self.structfield(n);
            broke |= f.broke;
            fields.push(f);
        }
        let t = self.types.typ(TypeKind::Struct(StructType { fields, funarg: false, map_part: None }), span);
        self.types.get_mut(t).broke = broke;
        self.checkdupfields("field", &[t]);
        if !broke {
            self.checkwidth(t);
        }
        t
    }

    fn structfield(&mut self, n: NodeId) -> Field {
        let lno = self.setlineno(n);
        if self.op(n) != Op::DclField {
            self.ice(format!("structfield: {}", self.op(n)), None);
        }
        let (left, embedded, isddd) = {
            let node = self.node(n);
            (node.left, node.embedded, node.isddd)
        };

        let mut typ = None;
        if self.node(n).right.is_some() {
            typ = self.tc_right(n, Ctx::ETYPE).map(|(_, t)| t);
            self.set_type(n, typ);
            if let Some(l) = left {
                self.set_type(l, typ);
            }
            if embedded {
                self.checkembeddedtype(typ);
            }
        }

        let mut f = Field::new(None, typ.unwrap_or(ANY_TYPE_ID));
        f.isddd = isddd;
        f.broke = typ.is_none();
        match self.node(n).val.clone() {
            None => {}
            Some(Val::Str(note)) => f.note = Some(note),
            Some(_) => {
                self.yyerror("field annotation must be string");
                f.broke = true;
            }
        }
        if let Some(l) = left {
            if self.op(l) == Op::Name {
                f.nname = Some(l);
                f.sym = self.node(l).sym;
                if embedded {
                    let typ = self.types.get(f.typ);
                    f.embedded = if typ.sym.is_none() && typ.is_ptr() {
                        Embedding::Pointer
                    } else {
                        Embedding::Value
                    };
                }
            }
        }
        self.lineno = lno;
        f
    }

    pub(crate) fn checkembeddedtype(&mut self, t: Option<TypeId>) {
        let Some(mut t) = t else { return };
        let typ = self.types.get(t);
        if typ.sym.is_none() && typ.is_ptr() {
            t = self.types.elem(t);
            if self.types.get(t).is_interface() {
                self.yyerror("embedded type cannot be a pointer to interface");
            }
        }
        let typ = self.types.get(t);
        if typ.is_ptr() || typ.is_unsafe_ptr() {
            self.yyerror("embedded type cannot be a pointer");
        } else if typ.is_forward() && typ.embedlineno.is_none() {
            let lineno = self.lineno;
            self.types.get_mut(t).embedlineno = Some(lineno);
        }
    }

    fn checkdupfields(&mut self, what: &str, ts: &[TypeId]) {
        let mut seen = FxHashSet::default();
        let mut dups = Vec::new();
        for &t in ts {
            for f in self.types.fields(t) {
                let (Some(sym), Some(nname)) = (f.sym, f.nname) else { continue };
                if self.is_blank(nname) {
                    continue;
                }
                if !seen.insert(sym) {
                    dups.push((self.span(nname), sym));
                }
            }
        }
        for (span, sym) in dups {
            let msg = format!("duplicate {} {}", what, self.syms.name(sym));
            self.yyerror_at(span, msg);
        }
    }

    pub(crate) fn tointerface(&mut self, l: &[NodeId], span: SpanId) -> TypeId {
        let t = self.types.interface_of(Vec::new());
        self.types.get_mut(t).span = span;
        let mut fields = Vec::new();
        let mut broke = false;
        for &n in l {
            let f = self.interfacefield(n);
            let inline = self.node(n).left.is_none() && !f.broke && self.types.get(f.typ).is_interface();
            if inline {
                let inherited: Vec<Field> = self.types.fields(f.typ).to_vec();
                for m in inherited {
                    let mut f1 = Field::new(m.sym, m.typ);
                    f1.broke = m.broke;
                    if let Some(sym) = m.sym {
                        f1.nname = Some(self.newname(sym, span));
                    }
                    broke |= f1.broke;
                    fields.push(f1);
                }
            } else {
                broke |= f.broke;
                fields.push(f);
            }
        }
        fields.sort_by(|a, b| methcmp(&self.syms, a, b));
        *self.types.fields_mut(t) = fields;
        self.types.get_mut(t).broke = broke;
        self.checkdupfields("argument", &[t]);
        self.checkwidth(t);
        t
    }

    fn interfacefield(&mut self, n: NodeId) -> Field {
        let lno = self.setlineno(n);
        if self.op(n) != Op::DclField {
            self.ice(format!("interfacefield: {}", self.op(n)), None);
        }
        if self.node(n).val.is_some() {
            self.yyerror("interface method cannot have annotation");
        }
        let (left, right, embedded, isddd) = {
            let node = self.node(n);
            (node.left, node.right, node.embedded, node.isddd)
        };

        let mut f = Field::new(None, ANY_TYPE_ID);
        f.isddd = isddd;
        let mut typ = None;
        if let Some(right) = right {
            match left {
                Some(left) => {
                    // Only the name is needed now; the signature is resolved
                    // later so that recursive interfaces can refer to themselves
                    let placeholder = self.types.func_of(Vec::new(), Vec::new(), Vec::new());
                    self.types.get_mut(placeholder).nname = Some(right);
                    typ = Some(placeholder);
                    self.set_type(n, typ);
                    self.set_type(left, typ);
                    self.queuemethod(n);
                    if self.op(left) == Op::Name {
                        f.nname = Some(left);
                        f.sym = self.node(left).sym;
                    }
                }
                None => {
                    let r = self.typecheck(right, Ctx::ETYPE);
                    self.node_mut(n).right = Some(r);
                    typ = self.ty(r);
                    self.set_type(n, typ);
                    if embedded {
                        self.checkembeddedtype(typ);
                    }
                    if let Some(t) = typ {
                        match self.types.etype(t) {
                            EType::Inter => {}
                            EType::Forw => {
                                let msg = format!("interface type loop involving {}", self.tstr(t));
                                self.yyerror(msg);
                                f.broke = true;
                            }
                            _ => {
                                let msg = format!("interface contains embedded non-interface {}", self.tstr(t));
                                self.yyerror(msg);
                                f.broke = true;
                            }
                        }
                    }
                }
            }
        }
        match typ {
            Some(t) => f.typ = t,
            None => f.broke = true,
        }
        self.lineno = lno;
        f
    }

    pub(crate) fn functype(
        &mut self,
        this: Option<NodeId>,
        params: &[NodeId],
        results: &[NodeId],
        span: SpanId,
    ) -> TypeId {
        let rcvr: Vec<NodeId> = this.into_iter().collect();
        let recvs = self.tofunargs(&rcvr);
        let res = self.tofunargs(results);
        let ps = self.tofunargs(params);
        self.checkdupfields("argument", &[recvs, res, ps]);
        let broke = [recvs, res, ps].iter().any(|t| self.types.get(*t).broke);
        // `~r` names stand for unnamed results
        let outnamed = results
            .first()
            .and_then(|n| self.node(*n).left)
            .and_then(|l| self.node(l).sym)
            .is_some_and(|s| !self.syms.name(s).starts_with("~r"));
        let t = self.types.typ(
            TypeKind::Func(FuncType { recvs, params: ps, results: res, outnamed, argwid: BADWIDTH }),
            span,
        );
        self.types.get_mut(t).broke = broke;
        t
    }

    fn tofunargs(&mut self, l: &[NodeId]) -> TypeId {
        let mut fields = Vec::with_capacity(l.len());
        let mut broke = false;
        for &n in l {
            let f = self.structfield(n);
            broke |= f.broke;
            fields.push(f);
        }
        let t = self.types.funarg_struct(fields);
        self.types.get_mut(t).broke = broke;
        t
    }
}

/// Interface methods sort by name; unexported names from different packages
/// further by package path.
fn methcmp(syms: &Syms, a: &Field, b: &Field) -> Ordering {
    match (a.sym, b.sym) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => {
            let (nx, ny) = (syms.name(x), syms.name(y));
            if nx != ny {
                return nx.cmp(ny);
            }
            if exportname(nx) {
                return Ordering::Equal;
            }
            let px = &syms.pkg(syms.get(x).pkg).path;
            let py = &syms.pkg(syms.get(y).pkg).path;
            px.cmp(py)
        }
    }
}

#[cfg(test)]
mod test {
    use crate::compiler::CheckerConfig;
    use crate::typer::Typer;
    use crate::typer::types::*;

    use super::*;

    #[test]
    fn methods_sort_by_name() {
        let mut syms = Syms::new("main");
        let b = syms.local("b");
        let a = syms.local("A");
        let fb = Field::new(Some(b), INT_TYPE_ID);
        let fa = Field::new(Some(a), INT_TYPE_ID);
        assert_eq!(methcmp(&syms, &fa, &fb), Ordering::Less);
        assert_eq!(methcmp(&syms, &fb, &fb), Ordering::Equal);
        assert_eq!(methcmp(&syms, &Field::new(None, INT_TYPE_ID), &fa), Ordering::Less);
    }

    #[test]
    fn redeclared_in_block() {
        let mut typer = Typer::new(CheckerConfig::default(), "main");
        let x = typer.syms.local("x");
        let a = typer.newname(x, SpanId::NONE);
        let b = typer.newname(x, SpanId::NONE);
        typer.declare(a, Class::Extern);
        assert_eq!(typer.syms.get(x).def, Some(a));
        typer.declare(b, Class::Extern);
        assert_eq!(typer.nerrors, 1);
        assert!(typer.errors[0].message.starts_with("x redeclared in this block"));
    }

    #[test]
    fn block_restores_shadowed_binding() {
        let mut typer = Typer::new(CheckerConfig::default(), "main");
        let x = typer.syms.local("x");
        let outer = typer.newname(x, SpanId::NONE);
        typer.declare(outer, Class::Extern);
        typer.markdcl();
        let inner = typer.newname(x, SpanId::NONE);
        typer.declare(inner, Class::Auto);
        assert_eq!(typer.syms.get(x).def, Some(inner));
        typer.popdcl();
        assert_eq!(typer.syms.get(x).def, Some(outer));
        assert_eq!(typer.nerrors, 0);
    }

    #[test]
    fn unnamed_results_get_placeholder_names() {
        let mut typer = Typer::new(CheckerConfig::default(), "main");
        let f = typer.syms.local("f");
        let int = typer.syms.local("int");
        let int_ref = typer.oldname(int, SpanId::NONE);
        let result = typer.nodes.nod(Op::DclField, None, Some(int_ref), SpanId::NONE);
        let decl = typer.funchdr(f, None, Vec::new(), vec![result], SpanId::NONE);
        typer.funcbody(decl, Vec::new());
        let name = typer.node(result).left.and_then(|l| typer.node(l).sym);
        assert_eq!(name.map(|s| typer.syms.name(s).to_string()), Some("~r0".to_string()));
    }
}
