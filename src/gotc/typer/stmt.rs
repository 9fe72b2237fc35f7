// Copyright (c) 2025 knix
// All rights reserved.

//! Statements, and the checks that run over a whole function body once its
//! statements are typed: missing returns and branch targets.

use fxhash::FxHashMap;
use log::debug;

use crate::ast::{NodeId, Op, TcState};
use crate::typer::syms::SymId;
use crate::typer::types::*;
use crate::typer::{Ctx, Typer};

/// A statement a `break` or `continue` can leave
struct BranchTarget {
    label: Option<SymId>,
    is_loop: bool,
}

#[derive(Default)]
struct LabelScope {
    /// Label name to its statement, and whether any branch uses it
    defined: FxHashMap<SymId, (NodeId, bool)>,
    targets: Vec<BranchTarget>,
}

impl Typer {
    pub(crate) fn typecheck_stmt(&mut self, n: NodeId, _top: Ctx) -> Option<Ctx> {
        match self.op(n) {
            Op::As => self.typecheckas(n),
            Op::As2 => self.typecheckas2(n),
            Op::Break | Op::Continue | Op::Dcl | Op::Empty | Op::Goto | Op::Fall | Op::XFall => {}
            Op::Block => self.tc_list_in_place(n, Ctx::ETOP),
            Op::Label => {
                self.decldepth += 1;
                if let Some(stmt) = self.node(n).right {
                    let stmt = self.typecheck(stmt, Ctx::ETOP);
                    self.node_mut(n).right = Some(stmt);
                }
            }
            Op::Defer => {
                let l = self.node(n).left?;
                let l = self.typecheck(l, Ctx::ETOP | Ctx::ERV);
                self.node_mut(n).left = Some(l);
                if !self.node(l).diag {
                    self.checkdefergo(n);
                }
            }
            Op::Proc => {
                let l = self.node(n).left?;
                let l = self.typecheck(l, Ctx::ETOP | Ctx::EPROC | Ctx::ERV);
                self.node_mut(n).left = Some(l);
                self.checkdefergo(n);
            }
            Op::For => {
                self.tc_ninit_in_place(n);
                self.decldepth += 1;
                if let Some((cond, t)) = self.tc_left(n, Ctx::ERV) {
                    if !self.types.get(t).is_boolean() {
                        let msg = format!("non-bool {} used as for condition", self.nstr_long(cond));
                        self.yyerror(msg);
                    }
                }
                if let Some(post) = self.node(n).right {
                    let post = self.typecheck(post, Ctx::ETOP);
                    self.node_mut(n).right = Some(post);
                }
                self.tc_body_in_place(n);
                self.decldepth -= 1;
            }
            Op::If => {
                self.tc_ninit_in_place(n);
                if let Some((cond, t)) = self.tc_left(n, Ctx::ERV) {
                    if !self.types.get(t).is_boolean() {
                        let msg = format!("non-bool {} used as if condition", self.nstr_long(cond));
                        self.yyerror(msg);
                    }
                }
                self.tc_body_in_place(n);
                let els = std::mem::take(&mut self.node_mut(n).rlist);
                let els = self.typecheck_list(&els, Ctx::ETOP);
                self.node_mut(n).rlist = els;
            }
            Op::Return => {
                let list = std::mem::take(&mut self.node_mut(n).list);
                let list = if list.len() == 1 {
                    vec![self.typecheck(list[0], Ctx::ERV | Ctx::EFNSTRUCT)]
                } else {
                    self.typecheck_list(&list, Ctx::ERV)
                };
                self.node_mut(n).list = list.clone();
                let Some(f) = self.cur_fn else {
                    self.yyerror("return outside function");
                    return None;
                };
                let ft = self.ty(f)?;
                if self.types.get(ft).expect_func().outnamed && list.is_empty() {
                    return Some(Ctx::ETOP);
                }
                let results = self.types.results(ft);
                let list = self.typecheckaste(Op::Return, None, false, results, list, "return argument");
                self.node_mut(n).list = list;
            }
            Op::Select => self.typecheckselect(n),
            Op::Switch => self.typecheckswitch(n),
            Op::Range => self.typecheckrange(n),
            Op::Case | Op::XCase => {
                self.tc_list_in_place(n, Ctx::ERV);
                self.tc_body_in_place(n);
            }
            Op::DclFunc => self.typecheckfunc(n),
            Op::DclConst => {
                self.tc_left(n, Ctx::ERV);
            }
            Op::DclType => {
                if let Some((_, t)) = self.tc_left(n, Ctx::ETYPE) {
                    self.checkwidth(t);
                }
            }
            op => self.ice(format!("typecheck_stmt {}", op), None),
        }
        Some(Ctx::ETOP)
    }

    /// Types the function's name from its signature and attaches methods to
    /// their receiver's type
    fn typecheckfunc(&mut self, n: NodeId) {
        let Some(nname) = self.node(n).left else { return };
        let nname = self.typecheck(nname, Ctx::ERV | Ctx::EASGN);
        self.node_mut(n).left = Some(nname);
        let Some(t) = self.ty(nname) else { return };
        self.set_type(n, Some(t));

        let has_recv = self.types.recv(t).is_some();
        let shortname = self.node(n).right.and_then(|s| self.node(s).sym);
        if let (true, Some(msym)) = (has_recv, shortname) {
            debug!("method {} on {}", self.syms.name(msym), self.tstr(t));
            let local = self.syms.get(msym).pkg == self.syms.local_pkg;
            self.addmethod(msym, t, local, false);
        }
    }

    /// The operand of `go` and `defer` must be a call whose result may be
    /// discarded
    fn checkdefergo(&mut self, n: NodeId) {
        let what = if self.op(n) == Op::Proc { "go" } else { "defer" };
        let Some(l) = self.node(n).left else { return };
        match self.op(l) {
            Op::CallInter
            | Op::CallMeth
            | Op::CallFunc
            | Op::Close
            | Op::Copy
            | Op::Delete
            | Op::Panic
            | Op::Print
            | Op::PrintN
            | Op::Recover => return,
            // A constant conversion folded to its value
            Op::Literal if self.node(l).orig_op == Some(Op::Conv) => {}
            Op::Append
            | Op::Cap
            | Op::Complex
            | Op::Imag
            | Op::Len
            | Op::Make
            | Op::MakeSlice
            | Op::MakeChan
            | Op::MakeMap
            | Op::New
            | Op::Real
            | Op::Literal => {
                let msg = format!("{} discards result of {}", what, self.nstr(l));
                self.yyerror(msg);
                return;
            }
            _ => {}
        }
        // A broken type was reported already
        match self.ty(l) {
            None => return,
            Some(t) if self.types.get(t).broke => return,
            Some(_) => {}
        }
        if !self.node(n).diag {
            self.node_mut(n).diag = true;
            // Syntactically a call, so this must be a conversion
            let msg = format!("{} requires function call, not conversion", what);
            self.yyerror(msg);
        }
    }

    fn typecheckswitch(&mut self, n: NodeId) {
        let lno = self.lineno;
        self.tc_ninit_in_place(n);

        let guard = self.node(n).left.filter(|l| self.op(*l) == Op::TypeSw);
        let mut nilonly = None;
        let t = match guard {
            Some(guard) => {
                self.node_mut(guard).typecheck = TcState::Done;
                let t = self.tc_right(guard, Ctx::ERV).map(|(_, t)| t);
                if let (Some(t), Some(x)) = (t, self.node(guard).right) {
                    if !self.types.get(t).is_interface() {
                        let msg = format!("cannot type switch on non-interface value {}", self.nstr_long(x));
                        self.yyerror(msg);
                    }
                }
                t
            }
            None => {
                let t = match self.node(n).left {
                    Some(tag) => {
                        let tag = self.typecheck(tag, Ctx::ERV);
                        let tag = self.defaultlit(tag, None);
                        self.node_mut(n).left = Some(tag);
                        self.ty(tag)
                    }
                    None => Some(BOOL_TYPE_ID),
                };
                if let Some(t) = t {
                    nilonly = self.check_switch_tag(n, t);
                }
                t
            }
        };

        let cases = self.node(n).list.clone();
        let mut default: Option<NodeId> = None;
        for (ci, &ncase) in cases.iter().enumerate() {
            self.setlineno(ncase);
            let exprs = std::mem::take(&mut self.node_mut(ncase).list);
            if exprs.is_empty() {
                match default {
                    Some(def) => {
                        let msg = format!("multiple defaults in switch (first at {})", self.spans.location(self.span(def)));
                        self.yyerror(msg);
                    }
                    None => default = Some(ncase),
                }
            }
            let mut checked = Vec::with_capacity(exprs.len());
            for e in exprs {
                self.setlineno(e);
                let e = self.typecheck(e, Ctx::ERV | Ctx::ETYPE);
                let e = match (self.ty(e), t) {
                    (Some(_), Some(t)) => {
                        self.setlineno(ncase);
                        match guard {
                            Some(guard) => self.check_type_case(guard, e, t),
                            None => self.check_expr_case(n, e, t, nilonly),
                        }
                    }
                    _ => e,
                };
                checked.push(e);
            }
            self.node_mut(ncase).list = checked.clone();

            if let (Some(_), Some(t)) = (guard, t) {
                if let Some(&nvar) = self.node(ncase).rlist.first() {
                    // A single-type case declares the variable with that type
                    let single = match checked.as_slice() {
                        [only] => self.ty(*only).filter(|ct| *ct != NIL_TYPE_ID),
                        _ => None,
                    };
                    let tn = self.typenod(single.unwrap_or(t));
                    if let Some(info) = self.node_mut(nvar).name.as_mut() {
                        info.ntype = Some(tn);
                    }
                    let nvar = self.typecheck(nvar, Ctx::ERV | Ctx::EASGN);
                    self.node_mut(ncase).rlist[0] = nvar;
                }
            }
            self.tc_body_in_place(ncase);

            // A valid fallthrough ends a case of an expression switch
            if let Some(&last) = self.node(ncase).nbody.last() {
                if self.op(last) == Op::XFall {
                    self.setlineno(last);
                    if guard.is_some() {
                        self.yyerror("cannot fallthrough in type switch");
                    } else if ci + 1 == cases.len() {
                        self.yyerror("cannot fallthrough final case in switch");
                    }
                    self.set_op(last, Op::Fall);
                }
            }
        }
        self.lineno = lno;
    }

    /// Checks that values of type `t` can be switched on. Returns the kind
    /// name when cases may only be nil.
    fn check_switch_tag(&mut self, n: NodeId, t: TypeId) -> Option<&'static str> {
        let tag = self.node(n).left.map(|l| self.nstr_long(l)).unwrap_or_default();
        let typ = self.types.get(t);
        let et = typ.etype();
        let (is_slice, is_array, is_struct) = (typ.is_slice(), typ.is_array(), typ.is_struct());
        if !et.ok_for_eq() {
            self.yyerror(format!("cannot switch on {}", tag));
            return None;
        }
        if is_slice {
            return Some("slice");
        }
        let bad = self.types.incomparable_component(t);
        if is_array && bad.is_some() {
            self.yyerror(format!("cannot switch on {}", tag));
            return None;
        }
        if is_struct {
            if let Some(bad) = bad {
                let msg = format!("cannot switch on {} (struct containing {} cannot be compared)", tag, self.tstr(bad));
                self.yyerror(msg);
            }
            return None;
        }
        match et {
            EType::Func => Some("func"),
            EType::Map => Some("map"),
            _ => None,
        }
    }

    fn check_expr_case(&mut self, n: NodeId, e: NodeId, t: TypeId, nilonly: Option<&str>) -> NodeId {
        let e = self.defaultlit(e, Some(t));
        let Some(et) = self.ty(e) else { return e };
        let tag = self.node(n).left;
        if self.op(e) == Op::Type {
            let msg = format!("type {} is not an expression", self.tstr(et));
            self.yyerror(msg);
        } else if self.assignop(et, t).0.is_none() && self.assignop(t, et).0.is_none() {
            let msg = match tag {
                Some(tag) => format!(
                    "invalid case {} in switch on {} (mismatched types {} and {})",
                    self.nstr(e),
                    self.nstr(tag),
                    self.tstr(et),
                    self.tstr(t)
                ),
                None => format!("invalid case {} in switch (mismatched types {} and bool)", self.nstr(e), self.tstr(et)),
            };
            self.yyerror(msg);
        } else if let (Some(kind), false) = (nilonly, self.isnil(e)) {
            let tag = tag.map(|t| self.nstr(t)).unwrap_or_default();
            let msg = format!("invalid case {} in switch (can only compare {} {} to nil)", self.nstr(e), kind, tag);
            self.yyerror(msg);
        } else if self.types.get(t).is_interface()
            && !self.types.get(et).is_interface()
            && self.types.incomparable_component(et).is_some()
        {
            let msg = format!("invalid case {} in switch (incomparable type)", self.nstr_long(e));
            self.yyerror(msg);
        }
        e
    }

    fn check_type_case(&mut self, guard: NodeId, e: NodeId, t: TypeId) -> NodeId {
        if self.isnil(e) {
            return e;
        }
        let Some(et) = self.ty(e) else { return e };
        if self.op(e) != Op::Type {
            let msg = format!("{} is not a type", self.nstr_long(e));
            self.yyerror(msg);
            // Fall back to the switched-on value
            return self.node(guard).right.unwrap_or(e);
        }
        if self.types.get(et).is_interface() || !self.types.get(t).is_interface() {
            return e;
        }
        let Err(m) = self.implements(et, t) else { return e };
        let x = self.node(guard).right.map(|x| self.nstr_long(x)).unwrap_or_default();
        let name = |s: Option<SymId>| s.map(|s| self.syms.name(s).to_string()).unwrap_or_default();
        let msg = match &m.have {
            Some(have) if !m.missing.broke && !have.broke => format!(
                "impossible type switch case: {} cannot have dynamic type {} (wrong type for {} method)\n\thave {}{}\n\twant {}{}",
                x,
                self.tstr(et),
                name(m.missing.sym),
                name(have.sym),
                self.signature_str(have.typ),
                name(m.missing.sym),
                self.signature_str(m.missing.typ)
            ),
            None if !m.missing.broke => format!(
                "impossible type switch case: {} cannot have dynamic type {} (missing {} method)",
                x,
                self.tstr(et),
                name(m.missing.sym)
            ),
            _ => return e,
        };
        self.yyerror(msg);
        e
    }

    fn typecheckrange(&mut self, n: NodeId) {
        let t = self.tc_right(n, Ctx::ERV).map(|(_, t)| t);
        let mut vars = self.node(n).list.clone();
        if let Some(mut t) = t {
            for v in vars.iter_mut() {
                if self.node(*v).name.as_ref().map_or(true, |info| info.defn != Some(n)) {
                    *v = self.typecheck(*v, Ctx::ERV | Ctx::EASGN);
                }
            }
            self.node_mut(n).list = vars.clone();
            self.range_vars(n, &mut t, &mut vars);
        }

        self.node_mut(n).typecheck = TcState::Done;
        let mut vars = std::mem::take(&mut self.node_mut(n).list);
        for v in vars.iter_mut() {
            if self.node(*v).typecheck == TcState::Unvisited {
                *v = self.typecheck(*v, Ctx::ERV | Ctx::EASGN);
            }
        }
        self.node_mut(n).list = vars;

        self.decldepth += 1;
        self.tc_body_in_place(n);
        self.decldepth -= 1;
    }

    /// Types the iteration variables of `for k, v := range x` with `x` of
    /// type `t`
    fn range_vars(&mut self, n: NodeId, t: &mut TypeId, vars: &mut Vec<NodeId>) {
        if self.types.get(*t).is_ptr() && self.types.get(self.types.elem(*t)).is_array() {
            *t = self.types.elem(*t);
        }
        let t = *t;
        let mut toomany = false;
        let (t1, t2) = match self.types.etype(t) {
            EType::Array => (INT_TYPE_ID, Some(self.types.elem(t))),
            EType::Map => (self.types.key(t), Some(self.types.val(t))),
            EType::String => (INT_TYPE_ID, Some(RUNE_TYPE_ID)),
            EType::Chan => {
                if !self.types.chan_dir(t).can_recv() {
                    let x = self.node(n).right;
                    let msg = format!(
                        "invalid operation: range {} (receive from send-only type {})",
                        x.map(|x| self.nstr(x)).unwrap_or_default(),
                        self.tstr(t)
                    );
                    self.yyerror(msg);
                    return;
                }
                toomany = vars.len() == 2;
                (self.types.elem(t), None)
            }
            _ => {
                let x = self.node(n).right.map(|x| self.nstr_long(x)).unwrap_or_default();
                let msg = format!("cannot range over {}", x);
                self.yyerror(msg);
                return;
            }
        };
        if vars.len() > 2 || toomany {
            self.yyerror("too many variables in range");
        }

        let v1 = vars.first().copied();
        let mut v2 = vars.get(1).copied();
        // `for k, _ := range x` is `for k := range x`
        if v2.is_some_and(|v| self.is_blank(v)) {
            if let Some(v1) = v1 {
                vars.truncate(1);
                self.node_mut(n).list = vec![v1];
            }
            v2 = None;
        }
        for (v, vt) in [(v1, Some(t1)), (v2, t2)] {
            let (Some(v), Some(vt)) = (v, vt) else { continue };
            if self.node(v).name.as_ref().is_some_and(|info| info.defn == Some(n)) {
                self.set_type(v, Some(vt));
            } else if let Some(have) = self.ty(v) {
                let (op, why) = self.assignop(vt, have);
                if op.is_none() {
                    let msg = format!("cannot assign type {} to {} in range{}", self.tstr(vt), self.nstr_long(v), why);
                    self.yyerror(msg);
                }
            }
            self.checkassign(v);
        }
    }

    fn typecheckselect(&mut self, sel: NodeId) {
        let lno = self.setlineno(sel);
        self.tc_ninit_in_place(sel);
        let cases = self.node(sel).list.clone();
        let mut default: Option<NodeId> = None;
        for ncase in cases {
            self.setlineno(ncase);
            match self.node(ncase).left {
                None => match default {
                    Some(def) => {
                        let msg = format!("multiple defaults in select (first at {})", self.spans.location(self.span(def)));
                        self.yyerror(msg);
                    }
                    None => default = Some(ncase),
                },
                Some(comm) => {
                    let comm = self.typecheck(comm, Ctx::ETOP);
                    self.node_mut(ncase).left = Some(comm);
                    self.setlineno(comm);
                    self.check_select_comm(comm);
                }
            }
            self.tc_body_in_place(ncase);
        }
        self.lineno = lno;
    }

    /// A select case must send, receive, or assign a received value
    fn check_select_comm(&mut self, comm: NodeId) {
        let recv = match self.op(comm) {
            Op::Send | Op::Recv => return,
            Op::As => {
                // The implicit conversion the assignment added does not count
                let mut r = self.node(comm).right;
                if let Some(rr) = r {
                    if matches!(self.op(rr), Op::ConvNop | Op::ConvIface) && self.node(rr).implicit {
                        r = self.node(rr).left;
                    }
                }
                r
            }
            Op::As2Recv => self.node(comm).rlist.first().copied(),
            _ => {
                self.yyerror("select case must be receive, send or assign recv");
                return;
            }
        };
        if !recv.is_some_and(|r| self.op(r) == Op::Recv) {
            self.yyerror("select assignment must have receive on right hand side");
        }
    }

    // Function-level checks

    /// Marks every statement that an unlabeled or labeled `break` leaves
    fn markbreak(&mut self, n: NodeId, implicit: Option<NodeId>, labels: &mut FxHashMap<SymId, NodeId>) {
        match self.op(n) {
            Op::Closure => {}
            Op::Break => {
                let target = match self.node(n).left.and_then(|l| self.node(l).sym) {
                    None => implicit,
                    Some(s) => labels.get(&s).copied(),
                };
                if let Some(target) = target {
                    self.node_mut(target).hasbreak = true;
                }
            }
            Op::Label => {
                let sym = self.node(n).left.and_then(|l| self.node(l).sym);
                let Some(stmt) = self.node(n).right else { return };
                let breakable = matches!(self.op(stmt), Op::For | Op::Switch | Op::Select | Op::Range);
                match sym {
                    Some(s) if breakable => {
                        labels.insert(s, stmt);
                        self.markbreak(stmt, implicit, labels);
                        labels.remove(&s);
                    }
                    _ => self.markbreak(stmt, implicit, labels),
                }
            }
            op => {
                let implicit = if matches!(op, Op::For | Op::Switch | Op::Select | Op::Range) { Some(n) } else { implicit };
                let node = self.node(n);
                let children: Vec<NodeId> = node
                    .left
                    .into_iter()
                    .chain(node.right)
                    .chain(node.ninit.iter().copied())
                    .chain(node.nbody.iter().copied())
                    .chain(node.list.iter().copied())
                    .chain(node.rlist.iter().copied())
                    .collect();
                for c in children {
                    self.markbreak(c, implicit, labels);
                }
            }
        }
    }

    /// Whether control cannot fall off the end of `list`
    fn isterminating(&self, list: &[NodeId]) -> bool {
        let Some(&last) = list.last() else { return false };
        let mut n = last;
        while self.op(n) == Op::Label {
            match self.node(n).right {
                Some(stmt) => n = stmt,
                None => return false,
            }
        }
        let node = self.node(n);
        match node.op {
            Op::Block => self.isterminating(&node.list),
            Op::Goto | Op::Return | Op::Panic | Op::Fall | Op::XFall => true,
            Op::For => node.left.is_none() && !node.hasbreak,
            Op::If => self.isterminating(&node.nbody) && self.isterminating(&node.rlist),
            Op::Switch | Op::Select => {
                if node.hasbreak {
                    return false;
                }
                let mut has_default = false;
                for &c in &node.list {
                    let case = self.node(c);
                    if !self.isterminating(&case.nbody) {
                        return false;
                    }
                    let is_default = if node.op == Op::Select { case.left.is_none() } else { case.list.is_empty() };
                    has_default |= is_default;
                }
                node.op == Op::Select || has_default
            }
            _ => false,
        }
    }

    /// Reports a function with results whose body can run off its end
    pub(crate) fn checkreturn(&mut self, f: NodeId) {
        let Some(ft) = self.ty(f) else { return };
        if !self.types.get(ft).is_func() {
            return;
        }
        let results = self.types.results(ft);
        if self.types.num_fields(results) == 0 || self.node(f).nbody.is_empty() {
            return;
        }
        let body = self.node(f).nbody.clone();
        let mut labels = FxHashMap::default();
        for s in &body {
            self.markbreak(*s, None, &mut labels);
        }
        if !self.isterminating(&body) {
            let span = self.span(f);
            self.yyerror_at(span, "missing return at end of function");
        }
    }

    /// Checks labels and the targets of `break`, `continue`, `goto` and
    /// `fallthrough` in the body of `f`
    pub(crate) fn checklabels(&mut self, f: NodeId) {
        let body = self.node(f).nbody.clone();
        let mut scope = LabelScope::default();
        for s in &body {
            self.collect_labels(*s, &mut scope);
        }
        for s in &body {
            self.check_branches(*s, None, &mut scope);
        }
        let mut unused: Vec<(NodeId, SymId)> =
            scope.defined.iter().filter(|(_, (_, used))| !used).map(|(s, (label, _))| (*label, *s)).collect();
        unused.sort_by_key(|(label, _)| *label);
        for (label, s) in unused {
            let span = self.span(label);
            let msg = format!("label {} defined and not used", self.syms.name(s));
            self.yyerror_at(span, msg);
        }
    }

    fn label_sym(&self, n: NodeId) -> Option<SymId> {
        self.node(n).left.and_then(|l| self.node(l).sym)
    }

    fn children(&self, n: NodeId) -> Vec<NodeId> {
        let node = self.node(n);
        node.left
            .into_iter()
            .chain(node.right)
            .chain(node.ninit.iter().copied())
            .chain(node.nbody.iter().copied())
            .chain(node.list.iter().copied())
            .chain(node.rlist.iter().copied())
            .collect()
    }

    fn collect_labels(&mut self, n: NodeId, scope: &mut LabelScope) {
        match self.op(n) {
            Op::Closure => return,
            Op::Label => {
                if let Some(s) = self.label_sym(n) {
                    if let Some((prev, _)) = scope.defined.get(&s) {
                        let msg = format!(
                            "label {} already defined at {}",
                            self.syms.name(s),
                            self.spans.location(self.span(*prev))
                        );
                        let span = self.span(n);
                        self.yyerror_at(span, msg);
                    } else {
                        scope.defined.insert(s, (n, false));
                    }
                }
            }
            _ => {}
        }
        for c in self.children(n) {
            self.collect_labels(c, scope);
        }
    }

    fn check_branches(&mut self, n: NodeId, label: Option<SymId>, scope: &mut LabelScope) {
        let op = self.op(n);
        match op {
            Op::Closure => return,
            Op::Label => {
                let s = self.label_sym(n);
                if let Some(stmt) = self.node(n).right {
                    self.check_branches(stmt, s, scope);
                }
                return;
            }
            Op::Goto => {
                if let Some(s) = self.label_sym(n) {
                    match scope.defined.get_mut(&s) {
                        Some((_, used)) => *used = true,
                        None => {
                            let msg = format!("label {} not defined", self.syms.name(s));
                            self.yyerror_at(self.span(n), msg);
                        }
                    }
                }
                return;
            }
            Op::Break | Op::Continue => {
                self.check_branch(n, scope);
                return;
            }
            Op::XFall => {
                self.yyerror_at(self.span(n), "fallthrough statement out of place");
                return;
            }
            _ => {}
        }
        let target = matches!(op, Op::For | Op::Range | Op::Switch | Op::Select);
        if target {
            scope.targets.push(BranchTarget { label, is_loop: matches!(op, Op::For | Op::Range) });
        }
        for c in self.children(n) {
            self.check_branches(c, None, scope);
        }
        if target {
            scope.targets.pop();
        }
    }

    fn check_branch(&mut self, n: NodeId, scope: &mut LabelScope) {
        let is_break = self.op(n) == Op::Break;
        let span = self.span(n);
        let Some(s) = self.label_sym(n) else {
            let ok = if is_break { !scope.targets.is_empty() } else { scope.targets.iter().any(|t| t.is_loop) };
            if !ok {
                let msg = if is_break { "break is not in a loop, switch, or select" } else { "continue is not in a loop" };
                self.yyerror_at(span, msg);
            }
            return;
        };
        let what = if is_break { "break" } else { "continue" };
        let Some((_, used)) = scope.defined.get_mut(&s) else {
            let msg = format!("{} label not defined: {}", what, self.syms.name(s));
            self.yyerror_at(span, msg);
            return;
        };
        *used = true;
        let valid = scope.targets.iter().any(|t| t.label == Some(s) && (is_break || t.is_loop));
        if !valid {
            let msg = format!("invalid {} label {}", what, self.syms.name(s));
            self.yyerror_at(span, msg);
        }
    }
}
