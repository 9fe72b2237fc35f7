// Copyright (c) 2025 knix
// All rights reserved.

//! The checker: assigns a type to every node of a package's tree, enforcing the
//! typing rules, and rewrites nodes into the more specific operations later
//! stages want.

pub mod assign;
pub mod builtins;
pub mod complit;
pub mod consts;
pub mod convert;
pub mod dcl;
pub mod deferred;
pub mod dump;
pub mod expr;
pub mod layout;
pub mod lookup;
pub mod stmt;
pub mod syms;
pub mod type_cmp;
pub mod types;
pub mod universe;

#[cfg(test)]
mod assign_test;
#[cfg(test)]
mod builtins_test;
#[cfg(test)]
mod complit_test;
#[cfg(test)]
mod deferred_test;
#[cfg(test)]
mod expr_test;
#[cfg(test)]
mod lookup_test;
#[cfg(test)]
mod typer_test;

use std::fmt::{Display, Formatter};
use std::ops::BitOr;

use colored::Colorize;
use log::{debug, trace};

use crate::ast::{Node, NodeId, Nodes, Op, TcState};
use crate::compiler::CheckerConfig;
use crate::span::{SpanId, Spans};
use crate::typer::syms::{SymId, Syms};
use crate::typer::types::{TypeId, Types};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorLevel {
    Error,
    Warn,
    Info,
    Hint,
}

impl Display for ErrorLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorLevel::Error => f.write_str("error"),
            ErrorLevel::Warn => f.write_str("warn"),
            ErrorLevel::Info => f.write_str("info"),
            ErrorLevel::Hint => f.write_str("hint"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TyperError {
    pub message: String,
    pub span: SpanId,
    pub level: ErrorLevel,
}

impl TyperError {
    fn make(message: impl AsRef<str>, span: SpanId) -> TyperError {
        TyperError { message: message.as_ref().to_owned(), span, level: ErrorLevel::Error }
    }
}

impl Display for TyperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("typer error {}: {:?}", self.message, self))
    }
}

pub type TyperResult<A> = Result<A, TyperError>;

pub fn make_error<T: AsRef<str>>(message: T, span: SpanId) -> TyperError {
    TyperError::make(message.as_ref(), span)
}

pub fn make_fail_span<A, T: AsRef<str>>(message: T, span: SpanId) -> TyperResult<A> {
    Err(make_error(message, span))
}

/// thanks heather
#[macro_export]
macro_rules! panic_at_disco {
    ($($format_args:expr),*) => {
        {
            let s: String = format!($($format_args),*);
            panic!("Panic!! at disco!!!: {}", s)
        }
    };
}

#[macro_export]
macro_rules! errf {
    ($span:expr, $($format_args:expr),* $(,)?) => {
        {
            let s: String = format!($($format_args),*);
            $crate::typer::make_error(&s, $span)
        }
    };
}

#[macro_export]
macro_rules! failf {
    ($span:expr, $($format_args:expr),* $(,)?) => {
        {
            let s: String = format!($($format_args),*);
            $crate::typer::make_fail_span(&s, $span)
        }
    };
}

pub fn write_error(
    w: &mut impl std::io::Write,
    spans: &Spans,
    message: impl AsRef<str>,
    level: ErrorLevel,
    span: SpanId,
) -> std::io::Result<()> {
    let level_str = match level {
        ErrorLevel::Error => level.to_string().red(),
        ErrorLevel::Warn => level.to_string().yellow(),
        ErrorLevel::Info | ErrorLevel::Hint => level.to_string().blue(),
    };
    writeln!(w, "{} at {}:\n\t{}", level_str, spans.location(span), message.as_ref())?;
    Ok(())
}

/// Which kinds of operand are acceptable where a node appears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ctx(u16);

impl Ctx {
    pub const NONE: Ctx = Ctx(0);
    /// Statement
    pub const ETOP: Ctx = Ctx(1 << 1);
    /// Value
    pub const ERV: Ctx = Ctx(1 << 2);
    pub const ETYPE: Ctx = Ctx(1 << 3);
    /// Callee position; builtins are only legal here
    pub const ECALL: Ctx = Ctx(1 << 4);
    /// Multi-value call allowed
    pub const EFNSTRUCT: Ctx = Ctx(1 << 5);
    /// `iota` is meaningful
    pub const EIOTA: Ctx = Ctx(1 << 6);
    /// Assignment target
    pub const EASGN: Ctx = Ctx(1 << 7);
    /// Implicit dereference ok
    pub const EINDIR: Ctx = Ctx(1 << 8);
    /// Implicit address-of ok
    pub const EADDR: Ctx = Ctx(1 << 9);
    /// Operand of `go`/`defer`
    pub const EPROC: Ctx = Ctx(1 << 10);
    /// Type of a composite literal
    pub const ECOMPLIT: Ctx = Ctx(1 << 11);

    pub fn has(self, other: Ctx) -> bool {
        self.0 & other.0 != 0
    }

    /// The bits of `self` that are in `mask`
    pub fn mask(self, mask: Ctx) -> Ctx {
        Ctx(self.0 & mask.0)
    }

    pub fn without(self, other: Ctx) -> Ctx {
        Ctx(self.0 & !other.0)
    }
}

impl BitOr for Ctx {
    type Output = Ctx;
    fn bitor(self, rhs: Ctx) -> Ctx {
        Ctx(self.0 | rhs.0)
    }
}

/// A saved binding, restored when the enclosing block closes
struct DclEntry {
    sym: SymId,
    def: Option<NodeId>,
    block: i32,
    lastlineno: SpanId,
}

enum DclMark {
    /// Start of a block; holds the enclosing block number
    Block(i32),
    Binding(DclEntry),
}

pub struct Typer {
    pub config: CheckerConfig,
    pub nodes: Nodes,
    pub types: Types,
    pub syms: Syms,
    pub spans: Spans,
    pub errors: Vec<TyperError>,
    pub nerrors: usize,
    /// Print diagnostics to stderr as they are reported
    pub echo_errors: bool,
    /// Nodes whose checking is in progress, innermost last
    tcstack: Vec<NodeId>,
    defstack: Vec<NodeId>,
    pub(crate) methodqueue: Vec<NodeId>,
    pub(crate) mapqueue: Vec<NodeId>,
    /// Number of type declarations currently being resolved
    pub(crate) ntypecheckdeftype: u32,
    pub(crate) defercalc: u32,
    pub(crate) deferred_width: Vec<layout::WidthJob>,
    pub cur_fn: Option<NodeId>,
    pub(crate) decldepth: i32,
    pub(crate) lineno: SpanId,
    dclstack: Vec<DclMark>,
    pub(crate) block: i32,
    blockgen: i32,
    pub(crate) vargen: i32,
    pub(crate) typegen: i32,
    /// The node standing for `iota`
    pub(crate) iota_node: Option<NodeId>,
    /// Value of `iota` in the constant declaration being built; -1 outside one
    pub iota: i64,
    pub(crate) lastconst: Vec<NodeId>,
    pub(crate) lasttype: Option<NodeId>,
    /// Function literals met outside any function body
    pub(crate) closures: Vec<NodeId>,
    /// Every package-level name, in declaration order
    pub(crate) externdcl: Vec<NodeId>,
}

impl Typer {
    pub fn new(config: CheckerConfig, local_pkg_path: &str) -> Typer {
        let mut typer = Typer {
            config,
            nodes: Nodes::new(),
            types: Types::new(),
            syms: Syms::new(local_pkg_path),
            spans: Spans::new(),
            errors: Vec::new(),
            nerrors: 0,
            echo_errors: false,
            tcstack: Vec::with_capacity(64),
            defstack: Vec::new(),
            methodqueue: Vec::new(),
            mapqueue: Vec::new(),
            ntypecheckdeftype: 0,
            defercalc: 0,
            deferred_width: Vec::new(),
            cur_fn: None,
            decldepth: 0,
            lineno: SpanId::NONE,
            dclstack: Vec::new(),
            block: 1,
            blockgen: 1,
            vargen: 0,
            typegen: 0,
            iota_node: None,
            iota: -1,
            lastconst: Vec::new(),
            lasttype: None,
            closures: Vec::new(),
            externdcl: Vec::new(),
        };
        typer.lexinit();
        typer
    }

    pub fn node(&self, n: NodeId) -> &Node {
        self.nodes.get(n)
    }

    pub fn node_mut(&mut self, n: NodeId) -> &mut Node {
        self.nodes.get_mut(n)
    }

    pub fn ty(&self, n: NodeId) -> Option<TypeId> {
        self.nodes.get(n).typ
    }

    pub(crate) fn set_type(&mut self, n: NodeId, t: Option<TypeId>) {
        self.nodes.get_mut(n).typ = t;
    }

    pub(crate) fn op(&self, n: NodeId) -> Op {
        self.nodes.get(n).op
    }

    pub(crate) fn set_op(&mut self, n: NodeId, op: Op) {
        self.nodes.get_mut(n).op = op;
    }

    pub(crate) fn span(&self, n: NodeId) -> SpanId {
        self.nodes.get(n).span
    }

    pub fn push_error(&mut self, e: TyperError) {
        self.nerrors += 1;
        if let Some(last) = self.errors.last() {
            if last.span == e.span && last.message == e.message {
                return;
            }
        }
        if self.config.max_errors != 0 && self.errors.len() >= self.config.max_errors {
            debug!("dropping error past the limit: {}", e.message);
            return;
        }
        if self.echo_errors {
            let _ = self.write_error(&mut std::io::stderr(), &e);
        }
        self.errors.push(e);
    }

    /// Reports a diagnostic at the position currently being checked
    pub fn yyerror(&mut self, msg: impl AsRef<str>) {
        let span = self.lineno;
        self.push_error(make_error(msg, span));
    }

    pub fn yyerror_at(&mut self, span: SpanId, msg: impl AsRef<str>) {
        self.push_error(make_error(msg, span));
    }

    pub fn write_error(
        &self,
        w: &mut impl std::io::Write,
        error: &TyperError,
    ) -> std::io::Result<()> {
        write_error(w, &self.spans, &error.message, error.level, error.span)
    }

    pub fn ice(&self, msg: impl AsRef<str>, error: Option<&TyperError>) -> ! {
        if let Some(error) = error {
            let _ = self.write_error(&mut std::io::stderr(), error);
        }
        panic!("Internal Compiler Error: {}", msg.as_ref())
    }

    fn setlineno(&mut self, n: NodeId) -> SpanId {
        let saved = self.lineno;
        let span = self.span(n);
        if !span.is_none() {
            self.lineno = span;
        }
        saved
    }

    // Scopes

    pub fn markdcl(&mut self) {
        self.dclstack.push(DclMark::Block(self.block));
        self.blockgen += 1;
        self.block = self.blockgen;
    }

    pub fn popdcl(&mut self) {
        while let Some(mark) = self.dclstack.pop() {
            match mark {
                DclMark::Block(outer) => {
                    self.block = outer;
                    return;
                }
                DclMark::Binding(entry) => {
                    let s = self.syms.get_mut(entry.sym);
                    s.def = entry.def;
                    s.block = entry.block;
                    s.lastlineno = entry.lastlineno;
                }
            }
        }
        self.ice("popdcl without markdcl", None)
    }

    /// Binds `sym` to `n` in the current block, remembering the previous binding
    pub(crate) fn push_binding(&mut self, sym: SymId, n: NodeId) {
        let s = self.syms.get(sym);
        let saved = DclEntry { sym, def: s.def, block: s.block, lastlineno: s.lastlineno };
        if !self.dclstack.is_empty() {
            self.dclstack.push(DclMark::Binding(saved));
        }
        let span = self.span(n);
        let block = self.block;
        let s = self.syms.get_mut(sym);
        s.def = Some(n);
        s.block = block;
        s.lastlineno = span;
    }

    pub(crate) fn in_function_scope(&self) -> bool {
        !self.dclstack.is_empty()
    }

    /// Replaces a reference to a not-yet-seen name with its definition, and
    /// `iota` with its value in the enclosing constant declaration.
    fn resolve(&mut self, n: NodeId) -> NodeId {
        let node = self.node(n);
        if node.op != Op::NoName {
            return n;
        }
        let Some(sym) = node.sym else { return n };
        let Some(def) = self.syms.get(sym).def else { return n };
        if Some(def) == self.iota_node {
            let iota = node.name.as_ref().map(|info| info.iota).unwrap_or(-1);
            if iota >= 0 {
                let span = node.span;
                return self.nodintconst(iota, span);
            }
            return n;
        }
        def
    }

    /// Checks `n` in context `top` and returns the node that stands in its
    /// place. Completed nodes are not rechecked, except names, types, literals
    /// and packages whose acceptability depends on the context.
    pub fn typecheck(&mut self, n: NodeId, top: Ctx) -> NodeId {
        let lno = self.setlineno(n);

        let mut n = n;
        while self.op(n) == Op::Paren {
            match self.node(n).left {
                Some(l) => n = l,
                None => break,
            }
        }
        let n = self.resolve(n);

        match self.node(n).typecheck {
            TcState::Done => match self.op(n) {
                Op::Name | Op::Type | Op::Literal | Op::Pack => {}
                _ => {
                    self.lineno = lno;
                    return n;
                }
            },
            TcState::InProgress => {
                self.report_typecheck_loop(n, top);
                self.lineno = lno;
                return n;
            }
            TcState::Unvisited => {}
        }

        trace!("typecheck {} {}", n, self.op(n));
        self.node_mut(n).typecheck = TcState::InProgress;
        self.tcstack.push(n);
        let mut self_ = scopeguard::guard(self, |self_| {
            self_.tcstack.pop();
        });
        let result = self_.typecheck1(n, top);
        self_.node_mut(n).typecheck = TcState::Done;
        self_.node_mut(result).typecheck = TcState::Done;
        self_.lineno = lno;
        result
    }

    fn report_typecheck_loop(&mut self, n: NodeId, top: Ctx) {
        let errors_before = self.nerrors;
        match self.op(n) {
            Op::Name => {
                if top.mask(Ctx::ERV | Ctx::ETYPE) == Ctx::ETYPE {
                    let msg = format!("{} is not a type", self.nstr(n));
                    self.yyerror(msg);
                }
            }
            Op::Literal => {
                if top.mask(Ctx::ERV | Ctx::ETYPE) == Ctx::ETYPE {
                    let msg = format!("{} is not a type", self.nstr(n));
                    self.yyerror(msg);
                } else {
                    let mut chain = String::new();
                    if errors_before == 0 {
                        let stack = self.tcstack.clone();
                        self.depchain(&mut chain, &stack, n, n);
                    }
                    let span = self.span(n);
                    self.yyerror_at(span, format!("constant definition loop{}", chain));
                }
            }
            _ => {}
        }
        if self.nerrors == 0 {
            let mut trace = String::new();
            for x in self.tcstack.iter().rev() {
                trace.push_str(&format!("\n\t{} {}", self.spans.location(self.span(*x)), self.nstr(*x)));
            }
            let msg = format!("typechecking loop involving {}{}", self.nstr(n), trace);
            self.yyerror(msg);
        }
    }

    fn depchain(&self, out: &mut String, stack: &[NodeId], cur: NodeId, first: NodeId) {
        for i in (0..stack.len()).rev() {
            let n = stack[i];
            if self.op(n) == self.op(cur) {
                if n != first {
                    self.depchain(out, &stack[..i], n, first);
                }
                out.push_str(&format!(
                    "\n\t{}: {} uses {}",
                    self.spans.location(self.span(n)),
                    self.nstr(n),
                    self.nstr(cur)
                ));
                return;
            }
        }
    }

    pub fn typecheck_list(&mut self, list: &[NodeId], top: Ctx) -> Vec<NodeId> {
        list.iter().map(|n| self.typecheck(*n, top)).collect()
    }

    /// Checks the left child in place and returns it with its type
    pub(crate) fn tc_left(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, TypeId)> {
        let l = self.node(n).left?;
        let l = self.typecheck(l, top);
        self.node_mut(n).left = Some(l);
        self.ty(l).map(|t| (l, t))
    }

    pub(crate) fn tc_right(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, TypeId)> {
        let r = self.node(n).right?;
        let r = self.typecheck(r, top);
        self.node_mut(n).right = Some(r);
        self.ty(r).map(|t| (r, t))
    }

    pub(crate) fn tc_list_in_place(&mut self, n: NodeId, top: Ctx) {
        let list = std::mem::take(&mut self.node_mut(n).list);
        let list = self.typecheck_list(&list, top);
        self.node_mut(n).list = list;
    }

    pub(crate) fn tc_body_in_place(&mut self, n: NodeId) {
        let body = std::mem::take(&mut self.node_mut(n).nbody);
        let body = self.typecheck_list(&body, Ctx::ETOP);
        self.node_mut(n).nbody = body;
    }

    pub(crate) fn tc_ninit_in_place(&mut self, n: NodeId) {
        let init = std::mem::take(&mut self.node_mut(n).ninit);
        let init = self.typecheck_list(&init, Ctx::ETOP);
        self.node_mut(n).ninit = init;
    }

    fn typecheck1(&mut self, n: NodeId, top: Ctx) -> NodeId {
        // Selectors carry their field name in sym but name no definition
        let names_def = matches!(self.op(n), Op::Name | Op::NoName | Op::Literal | Op::Type | Op::Pack);
        if names_def && self.node(n).sym.is_some() {
            let builtin = self.node(n).name.as_ref().and_then(|info| info.builtin);
            if self.op(n) == Op::Name && builtin.is_some() && !top.has(Ctx::ECALL) {
                let msg = format!("use of builtin {} not in function call", self.nstr(n));
                self.yyerror(msg);
                self.set_type(n, None);
                return n;
            }
            self.typecheckdef(n);
            if self.op(n) == Op::NoName {
                self.set_type(n, None);
                return n;
            }
        }

        let (n, ok) = match self.typecheck_op(n, top) {
            Some((n, ok)) => (n, ok),
            None => {
                self.set_type(n, None);
                return n;
            }
        };

        if let Some(t) = self.ty(n) {
            if !self.types.get(t).is_funarg() && self.op(n) != Op::Type {
                match self.types.etype(t) {
                    types::EType::Func
                    | types::EType::Any
                    | types::EType::Forw
                    | types::EType::Ideal
                    | types::EType::Nil
                    | types::EType::Blank => {}
                    _ => self.checkwidth(t),
                }
            }
        }

        self.evconst(n);

        if self.op(n) == Op::Type && !top.has(Ctx::ETYPE) {
            let msg = format!("type {} is not an expression", self.tstr_opt(self.ty(n)));
            self.yyerror(msg);
            self.set_type(n, None);
            return n;
        }
        if top.mask(Ctx::ERV | Ctx::ETYPE) == Ctx::ETYPE && self.op(n) != Op::Type {
            let msg = format!("{} is not a type", self.nstr(n));
            self.yyerror(msg);
            self.set_type(n, None);
            return n;
        }
        if top.has(Ctx::ECALL | Ctx::ERV | Ctx::ETYPE)
            && !top.has(Ctx::ETOP)
            && !ok.has(Ctx::ERV | Ctx::ETYPE | Ctx::ECALL)
        {
            let msg = format!("{} used as value", self.nstr(n));
            self.yyerror(msg);
            self.set_type(n, None);
            return n;
        }
        if top.has(Ctx::ETOP) && !top.has(Ctx::ECALL | Ctx::ERV | Ctx::ETYPE) && !ok.has(Ctx::ETOP) {
            if !self.node(n).diag {
                let msg = format!("{} evaluated but not used", self.nstr(n));
                self.yyerror(msg);
                self.node_mut(n).diag = true;
            }
            self.set_type(n, None);
            return n;
        }
        n
    }

    /// Per-operation checking. Returns the resulting node and the contexts the
    /// result is acceptable in, or None when the node could not be typed.
    fn typecheck_op(&mut self, n: NodeId, top: Ctx) -> Option<(NodeId, Ctx)> {
        let ok = match self.op(n) {
            Op::Name => {
                if self.node(n).name.as_ref().is_some_and(|info| info.funcdepth == 0) {
                    let decldepth = self.decldepth;
                    if let Some(info) = self.node_mut(n).name.as_mut() {
                        info.funcdepth = decldepth;
                    }
                }
                if self.node(n).name.as_ref().is_some_and(|info| info.builtin.is_some()) {
                    return Some((n, Ctx::ECALL));
                }
                if !top.has(Ctx::EASGN) {
                    if self.is_blank(n) {
                        self.yyerror("cannot use _ as value");
                        return None;
                    }
                    self.node_mut(n).used = true;
                }
                Ctx::ERV
            }
            Op::Pack => {
                let msg = format!("use of package {} without selector", self.nstr(n));
                self.yyerror(msg);
                return None;
            }
            Op::Ddd => Ctx::NONE,
            Op::Type => {
                self.ty(n)?;
                Ctx::ETYPE
            }
            Op::Literal => {
                if self.ty(n).is_none() {
                    if let Some(consts::Val::Str(_)) = self.node(n).val {
                        self.set_type(n, Some(types::IDEAL_STRING_TYPE_ID));
                    }
                }
                Ctx::ERV
            }
            Op::NoName => Ctx::ERV,
            Op::TArray | Op::TMap | Op::TChan | Op::TStruct | Op::TInter | Op::TFunc => {
                self.typecheck_type_expr(n, top)?;
                Ctx::ETYPE
            }
            _ => return self.typecheck_expr_or_stmt(n, top),
        };
        Some((n, ok))
    }

    pub(crate) fn is_blank(&self, n: NodeId) -> bool {
        self.node(n).sym.is_some_and(|s| self.syms.is_blank(s))
    }

    /// Phase-ordered checking of a package's top-level declarations
    pub fn check_package(&mut self, xtop: &mut [NodeId]) {
        self.defercheckwidth();
        for decl in xtop.iter_mut() {
            if !matches!(self.op(*decl), Op::Dcl | Op::As | Op::As2) {
                *decl = self.typecheck(*decl, Ctx::ETOP);
            }
        }
        for decl in xtop.iter_mut() {
            if matches!(self.op(*decl), Op::Dcl | Op::As | Op::As2) {
                *decl = self.typecheck(*decl, Ctx::ETOP);
            }
        }
        self.resumecheckwidth();

        for decl in xtop.iter() {
            if self.op(*decl) == Op::DclFunc {
                self.check_func_body(*decl);
            }
        }
        loop {
            let closures = std::mem::take(&mut self.closures);
            if closures.is_empty() {
                break;
            }
            for c in closures {
                self.check_func_body(c);
            }
        }

        // Variables declared without a value are not reached from any statement
        let externs = std::mem::take(&mut self.externdcl);
        for n in externs.iter() {
            if self.op(*n) == Op::Name {
                self.typecheck(*n, Ctx::ERV);
            }
        }
        self.externdcl = externs;
    }

    /// Checks the body of a function declaration or literal. A body with
    /// errors is dropped so later stages never see it.
    pub(crate) fn check_func_body(&mut self, f: NodeId) {
        debug!("checking body of {}", self.nstr(f));
        let saved_fn = self.cur_fn.replace(f);
        let saved_depth = std::mem::replace(&mut self.decldepth, 1);
        let errors_before = self.nerrors;
        self.tc_body_in_place(f);
        self.checklabels(f);
        self.checkreturn(f);
        if self.nerrors != errors_before {
            self.node_mut(f).nbody.clear();
        }
        self.decldepth = saved_depth;
        self.cur_fn = saved_fn;
    }

    pub(crate) fn defstack_push(&mut self, n: NodeId) {
        self.defstack.push(n);
    }

    pub(crate) fn defstack_pop(&mut self, n: NodeId) {
        match self.defstack.pop() {
            Some(top) if top == n => {}
            other => self.ice(format!("typecheckdef stack corrupted: {:?} vs {}", other, n), None),
        }
    }

    pub(crate) fn defstack_names(&self) -> String {
        let mut s = String::new();
        for n in self.defstack.iter().rev() {
            s.push(' ');
            s.push_str(&self.nstr(*n));
        }
        s
    }
}
