// Copyright (c) 2025 knix
// All rights reserved.

//! Selectors and method sets: finding fields and methods through embedded
//! fields, attaching methods to named types, and interface satisfaction.

use fxhash::FxHashSet;

use crate::ast::{NodeId, Op};
use crate::typer::syms::SymId;
use crate::typer::types::*;
use crate::typer::{Ctx, Typer};

/// Outcome of searching the embedding tree below a type for a name
pub(crate) enum DotSearch {
    /// Found at the shallowest depth exactly once. `path` lists the embedded
    /// fields walked through, outermost first.
    Found { path: Vec<Field>, field: Field, in_interface: bool },
    /// More than one match at the shallowest depth
    Ambiguous,
    NotFound,
}

/// Why a type does not implement an interface
#[derive(Debug, Clone)]
pub struct MissingMethod {
    pub missing: Field,
    /// A method with the same name but the wrong type, or with a name that
    /// only differs in case
    pub have: Option<Field>,
    /// The method exists but needs a pointer receiver
    pub ptr: bool,
}

fn eq_fold(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl Typer {
    /// The type whose method set a value of type `t` uses: `T` for `T` and
    /// `*T`, or an unnamed struct. None when `t` cannot have methods.
    pub fn methtype(&self, t: TypeId, mustname: bool) -> Option<TypeId> {
        let mut t = t;
        let typ = self.types.get(t);
        if typ.is_ptr() {
            if typ.sym.is_some() {
                return None;
            }
            t = self.types.elem(t);
        }
        let typ = self.types.get(t);
        if typ.sym.is_none() && (mustname || !typ.is_struct()) {
            return None;
        }
        if typ.is_basic() && !typ.is_unsafe_ptr() {
            return Some(t);
        }
        match typ.etype() {
            EType::Struct | EType::Array | EType::Map | EType::Chan | EType::String | EType::Func => Some(t),
            _ => None,
        }
    }

    pub(crate) fn derefall(&self, t: TypeId) -> TypeId {
        let mut t = t;
        while self.types.get(t).is_ptr() {
            t = self.types.elem(t);
        }
        t
    }

    /// Interface methods carry no receiver; declared methods always do
    pub(crate) fn is_iface_method(&self, f: &Field) -> bool {
        self.types.get(f.typ).is_func() && self.types.recv(f.typ).is_none()
    }

    fn is_method_field(&self, f: &Field, in_interface: bool) -> bool {
        self.types.get(f.typ).is_func() && (in_interface || self.types.recv(f.typ).is_some())
    }

    /// Wraps `l` in an implicit `*l` or `&l` and checks the result
    pub(crate) fn implicit_unary(&mut self, op: Op, l: NodeId, top: Ctx) -> NodeId {
        let span = self.span(l);
        let n = self.nodes.nod(op, Some(l), None, span);
        self.node_mut(n).implicit = true;
        self.typecheck(n, top)
    }

    /// Attaches the method `msym` of signature `t` to its receiver's base type
    pub(crate) fn addmethod(&mut self, msym: SymId, t: TypeId, local: bool, nointerface: bool) {
        let Some(rf) = self.types.recv(t).map(|f| f.typ) else {
            self.yyerror("missing receiver");
            return;
        };
        let mt = self.methtype(rf, false).filter(|mt| self.types.get(*mt).sym.is_some());
        let Some(pa) = mt else {
            let mut base = rf;
            let recv = self.tstr(rf);
            if self.types.get(base).is_ptr() {
                if self.types.get(base).sym.is_some() {
                    let msg = format!("invalid receiver type {} ({} is a pointer type)", recv, self.tstr(base));
                    self.yyerror(msg);
                    return;
                }
                base = self.types.elem(base);
            }
            let typ = self.types.get(base);
            let msg = if typ.broke {
                None
            } else if typ.sym.is_none() {
                Some(format!("invalid receiver type {} ({} is an unnamed type)", recv, self.tstr(base)))
            } else if typ.is_ptr() {
                Some(format!("invalid receiver type {} ({} is a pointer type)", recv, self.tstr(base)))
            } else if typ.is_interface() {
                Some(format!("invalid receiver type {} ({} is an interface type)", recv, self.tstr(base)))
            } else {
                Some(format!("invalid receiver type {} ({})", recv, self.tstr_long(base)))
            };
            if let Some(msg) = msg {
                self.yyerror(msg);
            }
            return;
        };

        if local && !self.types.get(pa).local {
            let msg = format!("cannot define new methods on non-local type {}", self.tstr(pa));
            self.yyerror(msg);
            return;
        }
        if self.types.get(pa).is_struct() && self.types.fields(pa).iter().any(|f| f.sym == Some(msym)) {
            let msg = format!("type {} has both field and method named {}", self.tstr(pa), self.syms.name(msym));
            self.yyerror(msg);
            return;
        }

        let name = self.syms.name(msym).to_string();
        let existing = self.types.get(pa).methods.iter().find(|f| f.sym.is_some_and(|s| self.syms.name(s) == name)).cloned();
        if let Some(f) = existing {
            let same_recv = match (self.types.recv(t).map(|r| r.typ), self.types.recv(f.typ).map(|r| r.typ)) {
                (Some(a), Some(b)) => self.types.eqtype(a, b),
                _ => false,
            };
            if !self.types.eqtype(t, f.typ) || !same_recv {
                let msg = format!(
                    "method redeclared: {}.{}\n\t{}\n\t{}",
                    self.tstr(pa),
                    name,
                    self.tstr(f.typ),
                    self.tstr(t)
                );
                self.yyerror(msg);
            }
            return;
        }

        let span = self.lineno;
        let nname = self.newname(msym, span);
        self.set_type(nname, Some(t));
        let mut f = Field::new(Some(msym), t);
        f.nname = Some(nname);
        f.nointerface = nointerface;
        self.types.get_mut(pa).methods.push(f);
    }

    /// Finds `s` among `fs`. With `dostrcmp` 1 names match by spelling, with 2
    /// also ignoring case; both are used only to improve error messages.
    pub(crate) fn lookdot1(&mut self, errnode: Option<NodeId>, s: SymId, t: TypeId, fs: &[Field], dostrcmp: u8) -> Option<Field> {
        let name = self.syms.name(s).to_string();
        let mut r: Option<Field> = None;
        for f in fs {
            let Some(fsym) = f.sym else { continue };
            let fname = self.syms.name(fsym);
            if dostrcmp != 0 && fname == name {
                return Some(f.clone());
            }
            if dostrcmp == 2 && eq_fold(fname, &name) {
                return Some(f.clone());
            }
            if fsym != s {
                continue;
            }
            if r.is_some() {
                let msg = match errnode {
                    Some(e) => format!("ambiguous selector {}", self.nstr(e)),
                    None if self.types.get(t).is_ptr() => format!("ambiguous selector ({}).{}", self.tstr(t), name),
                    None => format!("ambiguous selector {}.{}", self.tstr(t), name),
                };
                self.yyerror(msg);
                break;
            }
            r = Some(f.clone());
        }
        r
    }

    /// Resolves the selector `n` (`x.sym`) against type `t`: a field, or a
    /// method of `t`. Inserts the implicit `&x` or `*x` a method receiver
    /// needs, and rewrites `n` to `DotInter`/`DotMeth` as appropriate.
    pub(crate) fn lookdot(&mut self, n: NodeId, t: TypeId, dostrcmp: u8) -> Option<Field> {
        let s = self.node(n).sym?;
        self.dowidth(t);
        let f1 = {
            let typ = self.types.get(t);
            if typ.is_struct() || typ.is_interface() {
                let fs = typ.fields().to_vec();
                self.lookdot1(Some(n), s, t, &fs, dostrcmp)
            } else {
                None
            }
        };

        let left = self.node(n).left?;
        let lt = self.ty(left)?;
        let mut f2 = None;
        if lt == t || self.types.get(lt).sym.is_none() {
            if let Some(mt) = self.methtype(t, false) {
                let ms = self.types.get(mt).methods.clone();
                f2 = self.lookdot1(Some(n), s, mt, &ms, dostrcmp);
            }
        }

        if let Some(f1) = f1 {
            if dostrcmp > 1 {
                return Some(f1);
            }
            if f2.is_some() {
                let msg = format!("{} is both field and method", self.syms.name(s));
                self.yyerror(msg);
            }
            if f1.offset == BADWIDTH {
                self.ice(format!("lookdot badwidth {}", self.syms.name(s)), None);
            }
            self.node_mut(n).xoffset = f1.offset;
            self.set_type(n, Some(f1.typ));
            if self.types.get(t).is_interface() {
                if self.types.get(lt).is_ptr() {
                    let ind = self.implicit_unary(Op::Ind, left, Ctx::ERV);
                    self.node_mut(n).left = Some(ind);
                }
                self.set_op(n, Op::DotInter);
            }
            return Some(f1);
        }

        let f2 = f2?;
        if dostrcmp > 1 {
            return Some(f2);
        }
        let mut tt = lt;
        self.dowidth(tt);
        let Some(rcvr) = self.types.recv(f2.typ).map(|f| f.typ) else {
            self.ice(format!("method {} without receiver", self.syms.name(s)), None);
        };
        if !self.types.eqtype(rcvr, tt) {
            let rptr = self.types.get(rcvr).is_ptr();
            let tptr = self.types.get(tt).is_ptr();
            if rptr && self.types.eqtype(self.types.elem(rcvr), tt) {
                self.checklvalue(left, "call pointer method on");
                let addr = self.implicit_unary(Op::Addr, left, Ctx::ETYPE | Ctx::ERV);
                self.node_mut(n).left = Some(addr);
            } else if tptr && !rptr && self.types.eqtype(self.types.elem(tt), rcvr) {
                let ind = self.implicit_unary(Op::Ind, left, Ctx::ETYPE | Ctx::ERV);
                self.node_mut(n).left = Some(ind);
            } else if tptr
                && self.types.get(self.types.elem(tt)).is_ptr()
                && self.types.eqtype(self.derefall(tt), self.derefall(rcvr))
            {
                let msg = format!(
                    "calling method {} with receiver {} requires explicit dereference",
                    self.syms.name(s),
                    self.nstr_long(left)
                );
                self.yyerror(msg);
                let mut l = left;
                while self.types.get(tt).is_ptr() {
                    // One level short for a pointer receiver
                    if rptr && !self.types.get(self.types.elem(tt)).is_ptr() {
                        break;
                    }
                    l = self.implicit_unary(Op::Ind, l, Ctx::ETYPE | Ctx::ERV);
                    tt = self.types.elem(tt);
                }
                self.node_mut(n).left = Some(l);
            } else {
                self.ice(format!("method mismatch: {} for {}", self.tstr(rcvr), self.tstr(tt)), None);
            }
        }

        // A named pointer type is never dereferenced implicitly to select a method
        let mut pll = n;
        let mut ll = self.node(n).left?;
        while let Some(next) = self.node(ll).left {
            if !matches!(self.op(ll), Op::Dot | Op::DotPtr | Op::Ind) {
                break;
            }
            pll = ll;
            ll = next;
        }
        if self.node(pll).implicit {
            if let Some(llt) = self.ty(ll) {
                let lty = self.types.get(llt);
                let named_ptr = lty.is_ptr()
                    && lty.sym.is_some_and(|sym| {
                        self.syms.get(sym).def.is_some_and(|d| self.op(d) == Op::Type)
                    });
                if named_ptr {
                    self.node_mut(n).left = Some(ll);
                    return None;
                }
            }
        }

        self.node_mut(n).xoffset = f2.offset;
        self.set_type(n, Some(f2.typ));
        self.set_op(n, Op::DotMeth);
        Some(f2)
    }

    /// Method expression `T.m`: looks `m` up in the method set of `T`
    pub(crate) fn looktypedot(&mut self, n: NodeId, t: TypeId, dostrcmp: u8) -> bool {
        let Some(s) = self.node(n).sym else { return false };
        if self.types.get(t).is_interface() {
            let fs = self.types.fields(t).to_vec();
            let Some(f1) = self.lookdot1(Some(n), s, t, &fs, dostrcmp) else { return false };
            self.node_mut(n).xoffset = f1.offset;
            self.set_type(n, Some(f1.typ));
            self.set_op(n, Op::DotInter);
            return true;
        }

        let Some(mt) = self.methtype(t, false) else { return false };
        self.expandmeth(mt);
        let ms = self.types.get(mt).all_methods.clone();
        let Some(f2) = self.lookdot1(Some(n), s, mt, &ms, dostrcmp) else { return false };

        // T.m is not in the method set of T when m wants *T
        let ptr_recv = self.types.recv(f2.typ).is_some_and(|r| self.types.get(r.typ).is_ptr());
        if ptr_recv && !self.types.get(t).is_ptr() && f2.embedded != Embedding::Pointer && !self.is_iface_method(&f2) {
            let msg = format!(
                "invalid method expression {} (needs pointer receiver: (*{}).{})",
                self.nstr(n),
                self.tstr(t),
                self.syms.name(s)
            );
            self.yyerror(msg);
            return false;
        }
        self.node_mut(n).xoffset = f2.offset;
        self.set_type(n, Some(f2.typ));
        self.set_op(n, Op::DotMeth);
        true
    }

    /// The function type of a method expression: the receiver becomes the
    /// first parameter
    pub(crate) fn methodfunc(&mut self, f: TypeId, receiver: Option<TypeId>) -> TypeId {
        let mut params = Vec::new();
        if let Some(r) = receiver {
            params.push(Field::new(None, r));
        }
        for p in self.types.fields(self.types.params(f)) {
            let mut d = Field::new(None, p.typ);
            d.isddd = p.isddd;
            params.push(d);
        }
        let results = self.types.fields(self.types.results(f)).iter().map(|r| Field::new(None, r.typ)).collect();
        self.types.func_of(Vec::new(), params, results)
    }

    /// Fills in the implicit selections of embedded fields in `x.sym`
    pub(crate) fn adddot(&mut self, n: NodeId) -> NodeId {
        let Some(left) = self.node(n).left else { return n };
        let left = self.typecheck(left, Ctx::ETYPE | Ctx::ERV);
        self.node_mut(n).left = Some(left);
        if self.node(left).diag {
            self.node_mut(n).diag = true;
        }
        let Some(t) = self.ty(left) else { return n };
        if self.op(left) == Op::Type {
            return n;
        }
        let Some(s) = self.node(n).sym else { return n };
        match self.dotpath(s, t, false) {
            DotSearch::Found { path, .. } => {
                let mut l = left;
                for f in path.iter() {
                    let span = self.span(n);
                    let dot = self.nodes.nod(Op::Dot, Some(l), None, span);
                    let node = self.node_mut(dot);
                    node.sym = f.sym;
                    node.implicit = true;
                    l = dot;
                }
                self.node_mut(n).left = Some(l);
            }
            DotSearch::Ambiguous => {
                let msg = format!("ambiguous selector {}", self.nstr(n));
                self.yyerror(msg);
                self.node_mut(n).left = None;
            }
            DotSearch::NotFound => {}
        }
        n
    }

    /// Finds the shallowest fields or methods named `s` below `t`, searching
    /// one embedding depth at a time.
    pub(crate) fn dotpath(&self, s: SymId, t: TypeId, ignorecase: bool) -> DotSearch {
        let mut dotlist: Vec<Option<Field>> = Vec::new();
        let mut d = 0usize;
        loop {
            if dotlist.len() < d {
                dotlist.resize(d, None);
            }
            let mut save = None;
            let mut recur = FxHashSet::default();
            let (c, more) = self.adddot1(s, t, d as i32, &mut save, ignorecase, &mut dotlist, &mut recur);
            if c == 1 {
                let Some((field, in_interface)) = save else { return DotSearch::NotFound };
                let path = dotlist[..d].iter().rev().flatten().cloned().collect();
                return DotSearch::Found { path, field, in_interface };
            }
            if c > 1 {
                return DotSearch::Ambiguous;
            }
            if !more {
                return DotSearch::NotFound;
            }
            d += 1;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn adddot1(
        &self,
        s: SymId,
        t: TypeId,
        d: i32,
        save: &mut Option<(Field, bool)>,
        ignorecase: bool,
        dotlist: &mut Vec<Option<Field>>,
        recur: &mut FxHashSet<TypeId>,
    ) -> (usize, bool) {
        if !recur.insert(t) {
            return (0, false);
        }
        let mut c = 0;
        let mut more = false;
        let d = d - 1;
        'out: {
            if d < 0 {
                // At the target depth; a miss here still leaves deeper levels
                c = self.lookdot0(s, t, save, ignorecase);
                if c != 0 {
                    break 'out;
                }
            }
            let mut u = t;
            if self.types.get(u).is_ptr() {
                u = self.types.elem(u);
            }
            let ut = self.types.get(u);
            if !ut.is_struct() && !ut.is_interface() {
                break 'out;
            }
            for f in ut.fields() {
                if !f.embedded.is_embedded() || f.sym.is_none() {
                    continue;
                }
                if d < 0 {
                    more = true;
                    break 'out;
                }
                let (a, more1) = self.adddot1(s, f.typ, d, save, ignorecase, dotlist, recur);
                if a != 0 && c == 0 {
                    dotlist[d as usize] = Some(f.clone());
                }
                c += a;
                more |= more1;
            }
        }
        recur.remove(&t);
        (c, more)
    }

    fn lookdot0(&self, s: SymId, t: TypeId, save: &mut Option<(Field, bool)>, ignorecase: bool) -> usize {
        let name = self.syms.name(s);
        let mut c = 0;
        let mut u = t;
        if self.types.get(u).is_ptr() {
            u = self.types.elem(u);
        }
        let ut = self.types.get(u);
        if ut.is_struct() || ut.is_interface() {
            let iface = ut.is_interface();
            for f in ut.fields() {
                let hit = f.sym == Some(s)
                    || (ignorecase && iface && f.sym.is_some_and(|fs| eq_fold(self.syms.name(fs), name)));
                if hit {
                    *save = Some((f.clone(), iface));
                    c += 1;
                }
            }
        }
        if let Some(mt) = self.methtype(t, false) {
            for f in self.types.get(mt).methods.iter() {
                let hit = f.sym == Some(s) || (ignorecase && f.sym.is_some_and(|fs| eq_fold(self.syms.name(fs), name)));
                if !f.embedded.is_embedded() && hit {
                    *save = Some((f.clone(), false));
                    c += 1;
                }
            }
        }
        c
    }

    /// Computes the full method set of `t`, including methods promoted from
    /// embedded fields. Promoted methods reachable two ways at the same depth
    /// are left out.
    pub fn expandmeth(&mut self, t: TypeId) {
        if !self.types.get(t).all_methods.is_empty() {
            return;
        }
        let mut uniq: FxHashSet<SymId> = self.types.get(t).methods.iter().filter_map(|f| f.sym).collect();
        let mut slist = Vec::new();
        let mut recur = FxHashSet::default();
        self.expand1(t, true, &mut uniq, &mut slist, &mut recur);

        let mut ms = Vec::new();
        for sym in slist {
            let DotSearch::Found { path, field, in_interface } = self.dotpath(sym, t, false) else { continue };
            // The search may have dug out a field of the same name
            if !self.is_method_field(&field, in_interface) {
                continue;
            }
            let mut f = field;
            f.embedded = if path.iter().any(|d| self.types.get(d.typ).is_ptr()) {
                Embedding::Pointer
            } else {
                Embedding::Value
            };
            ms.push(f);
        }
        ms.extend(self.types.get(t).methods.iter().cloned());
        self.types.get_mut(t).all_methods = ms;
    }

    fn expand1(
        &self,
        t: TypeId,
        top: bool,
        uniq: &mut FxHashSet<SymId>,
        slist: &mut Vec<SymId>,
        recur: &mut FxHashSet<TypeId>,
    ) {
        if !recur.insert(t) {
            return;
        }
        if !top {
            self.expand0(t, uniq, slist);
        }
        let mut u = t;
        if self.types.get(u).is_ptr() {
            u = self.types.elem(u);
        }
        let ut = self.types.get(u);
        if ut.is_struct() || ut.is_interface() {
            for f in ut.fields() {
                if f.embedded.is_embedded() && f.sym.is_some() {
                    self.expand1(f.typ, false, uniq, slist, recur);
                }
            }
        }
        recur.remove(&t);
    }

    fn expand0(&self, t: TypeId, uniq: &mut FxHashSet<SymId>, slist: &mut Vec<SymId>) {
        let mut u = t;
        if self.types.get(u).is_ptr() {
            u = self.types.elem(u);
        }
        if self.types.get(u).is_interface() {
            for f in self.types.fields(u) {
                if let Some(s) = f.sym {
                    if uniq.insert(s) {
                        slist.push(s);
                    }
                }
            }
            return;
        }
        if let Some(mt) = self.methtype(t, false) {
            for f in self.types.get(mt).methods.iter() {
                if let Some(s) = f.sym {
                    if uniq.insert(s) {
                        slist.push(s);
                    }
                }
            }
        }
    }

    /// Whether `t` has every method of `iface`. On failure reports the first
    /// missing method and what was found instead.
    pub fn implements(&mut self, t: TypeId, iface: TypeId) -> Result<(), MissingMethod> {
        let imethods = self.types.fields(iface).to_vec();
        if self.types.get(t).is_interface() {
            let tmethods = self.types.fields(t).to_vec();
            for im in imethods {
                match tmethods.iter().find(|tm| tm.sym == im.sym) {
                    Some(tm) if self.types.eqtype(tm.typ, im.typ) => {}
                    Some(tm) => return Err(MissingMethod { missing: im, have: Some(tm.clone()), ptr: false }),
                    None => return Err(MissingMethod { missing: im, have: None, ptr: false }),
                }
            }
            return Ok(());
        }

        let mt = self.methtype(t, false);
        if let Some(mt) = mt {
            self.expandmeth(mt);
        }
        for im in imethods {
            if im.broke {
                continue;
            }
            let Some(s) = im.sym else { continue };
            let found = self.ifacelookdot(s, mt, false);
            let ok = found.as_ref().is_some_and(|(tm, _)| !tm.nointerface && self.types.eqtype(tm.typ, im.typ));
            if !ok {
                let have = match found {
                    Some((tm, _)) => Some(tm),
                    None => self.ifacelookdot(s, mt, true).map(|(f, _)| f),
                };
                return Err(MissingMethod { missing: im, have, ptr: false });
            }
            let Some((tm, followptr)) = found else { continue };
            // Pointer-receiver methods are not in the method set of a value
            if let Some(rcvr) = self.types.recv(tm.typ).map(|r| r.typ) {
                if self.types.get(rcvr).is_ptr() && !self.types.get(t).is_ptr() && !followptr {
                    return Err(MissingMethod { missing: im, have: None, ptr: true });
                }
            }
        }
        Ok(())
    }

    fn ifacelookdot(&mut self, s: SymId, t: Option<TypeId>, ignorecase: bool) -> Option<(Field, bool)> {
        let t = t?;
        match self.dotpath(s, t, ignorecase) {
            DotSearch::NotFound => None,
            DotSearch::Ambiguous => {
                let msg = format!("{}.{} is ambiguous", self.tstr(t), self.syms.name(s));
                self.yyerror(msg);
                None
            }
            DotSearch::Found { path, field, in_interface } => {
                let followptr = path.iter().any(|d| self.types.get(d.typ).is_ptr());
                if !self.is_method_field(&field, in_interface) {
                    let msg = format!("{}.{} is a field, not a method", self.tstr(t), self.syms.name(s));
                    self.yyerror(msg);
                    return None;
                }
                Some((field, followptr))
            }
        }
    }

    /// The message suffix explaining why `src` does not implement `dst`
    pub(crate) fn missing_method_reason(&self, src: TypeId, dst: TypeId, m: &MissingMethod) -> String {
        let missing = m.missing.sym.map(|s| self.syms.name(s)).unwrap_or("?");
        match &m.have {
            Some(have) if have.sym == m.missing.sym && have.nointerface => format!(
                ":\n\t{} does not implement {} ({} method is marked 'nointerface')",
                self.tstr(src),
                self.tstr(dst),
                missing
            ),
            Some(have) if have.sym == m.missing.sym => format!(
                ":\n\t{} does not implement {} (wrong type for {} method)\n\t\thave {}{}\n\t\twant {}{}",
                self.tstr(src),
                self.tstr(dst),
                missing,
                missing,
                self.signature_str(have.typ),
                missing,
                self.signature_str(m.missing.typ)
            ),
            _ if m.ptr => format!(
                ":\n\t{} does not implement {} ({} method has pointer receiver)",
                self.tstr(src),
                self.tstr(dst),
                missing
            ),
            Some(have) => {
                let have_name = have.sym.map(|s| self.syms.name(s)).unwrap_or("?");
                format!(
                    ":\n\t{} does not implement {} (missing {} method)\n\t\thave {}{}\n\t\twant {}{}",
                    self.tstr(src),
                    self.tstr(dst),
                    missing,
                    have_name,
                    self.signature_str(have.typ),
                    missing,
                    self.signature_str(m.missing.typ)
                )
            }
            None => format!(":\n\t{} does not implement {} (missing {} method)", self.tstr(src), self.tstr(dst), missing),
        }
    }

    /// A function type without its `func` keyword
    pub(crate) fn signature_str(&self, t: TypeId) -> String {
        let s = self.tstr(t);
        s.strip_prefix("func").map(|rest| rest.to_string()).unwrap_or(s)
    }
}
