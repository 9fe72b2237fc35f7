// Copyright (c) 2025 knix
// All rights reserved.

use crate::ast::{Class, NodeId, Op};
use crate::compiler::CheckerConfig;
use crate::span::{Span, SpanId};
use crate::typer::consts::Val;
use crate::typer::syms::SymId;
use crate::typer::types::*;
use crate::typer::Typer;

/// Builds a package tree the way the parser would, one source line per node
pub(crate) struct Pkg {
    pub t: Typer,
    pub xtop: Vec<NodeId>,
    file: u32,
    line: u32,
}

impl Pkg {
    pub fn new() -> Pkg {
        Pkg::with_config(CheckerConfig::default())
    }

    pub fn with_config(config: CheckerConfig) -> Pkg {
        let mut t = Typer::new(config, "main");
        let file = t.spans.add_file("a.go");
        Pkg { t, xtop: Vec::new(), file, line: 0 }
    }

    pub fn sp(&mut self) -> SpanId {
        self.line += 1;
        self.t.spans.add(Span { file_id: self.file, line: self.line, col: 0 })
    }

    pub fn sym(&mut self, name: &str) -> SymId {
        self.t.syms.local(name)
    }

    pub fn name(&mut self, name: &str) -> NodeId {
        let s = self.sym(name);
        let sp = self.sp();
        self.t.oldname(s, sp)
    }

    fn newname(&mut self, name: &str) -> NodeId {
        let s = self.sym(name);
        let sp = self.sp();
        self.t.newname(s, sp)
    }

    pub fn lit(&mut self, v: Val) -> NodeId {
        let sp = self.sp();
        self.t.nodlit(v, sp)
    }

    pub fn int(&mut self, v: i128) -> NodeId {
        self.lit(Val::Int(v))
    }

    pub fn string(&mut self, s: &str) -> NodeId {
        self.lit(Val::Str(s.to_string()))
    }

    pub fn nod(&mut self, op: Op, l: Option<NodeId>, r: Option<NodeId>) -> NodeId {
        let sp = self.sp();
        self.t.nodes.nod(op, l, r, sp)
    }

    pub fn with_list(&mut self, n: NodeId, list: Vec<NodeId>) -> NodeId {
        self.t.node_mut(n).list = list;
        n
    }

    pub fn bin(&mut self, op: Op, l: NodeId, r: NodeId) -> NodeId {
        self.nod(op, Some(l), Some(r))
    }

    pub fn un(&mut self, op: Op, l: NodeId) -> NodeId {
        self.nod(op, Some(l), None)
    }

    pub fn call(&mut self, f: NodeId, args: Vec<NodeId>) -> NodeId {
        let n = self.nod(Op::Call, Some(f), None);
        self.with_list(n, args)
    }

    pub fn call_name(&mut self, f: &str, args: Vec<NodeId>) -> NodeId {
        let f = self.name(f);
        self.call(f, args)
    }

    pub fn dot(&mut self, x: NodeId, sel: &str) -> NodeId {
        let n = self.nod(Op::XDot, Some(x), None);
        let s = self.sym(sel);
        self.t.node_mut(n).sym = Some(s);
        n
    }

    pub fn index(&mut self, x: NodeId, i: NodeId) -> NodeId {
        self.bin(Op::Index, x, i)
    }

    // Type expressions

    pub fn ptr_t(&mut self, elem: NodeId) -> NodeId {
        self.un(Op::Ind, elem)
    }

    pub fn slice_t(&mut self, elem: NodeId) -> NodeId {
        self.nod(Op::TArray, None, Some(elem))
    }

    pub fn array_t(&mut self, bound: i128, elem: NodeId) -> NodeId {
        let b = self.int(bound);
        self.nod(Op::TArray, Some(b), Some(elem))
    }

    /// `[...]elem`
    pub fn ddd_array_t(&mut self, elem: NodeId) -> NodeId {
        let ddd = self.nod(Op::Ddd, None, None);
        self.nod(Op::TArray, Some(ddd), Some(elem))
    }

    pub fn map_t(&mut self, k: NodeId, v: NodeId) -> NodeId {
        self.nod(Op::TMap, Some(k), Some(v))
    }

    pub fn chan_t(&mut self, elem: NodeId, dir: ChanDir) -> NodeId {
        let n = self.nod(Op::TChan, Some(elem), None);
        self.t.node_mut(n).chan_dir = dir;
        n
    }

    pub fn field(&mut self, name: Option<&str>, typ: NodeId) -> NodeId {
        let s = name.map(|n| self.sym(n));
        let sp = self.sp();
        self.t.dclfield(s, typ, sp)
    }

    pub fn embedded(&mut self, typ: NodeId) -> NodeId {
        let f = self.field(None, typ);
        let s = self.t.node(typ).sym;
        let sp = self.t.span(typ);
        let l = s.map(|s| self.t.newname(s, sp));
        let node = self.t.node_mut(f);
        node.left = l;
        node.embedded = true;
        f
    }

    pub fn struct_t(&mut self, fields: &[(&str, NodeId)]) -> NodeId {
        let list = fields.iter().map(|(name, typ)| self.field(Some(name), *typ)).collect();
        let n = self.nod(Op::TStruct, None, None);
        self.with_list(n, list)
    }

    /// `interface { name(params) results; ... }`
    pub fn iface_t(&mut self, methods: Vec<(&str, NodeId)>) -> NodeId {
        let list = methods.into_iter().map(|(name, ft)| self.field(Some(name), ft)).collect();
        let n = self.nod(Op::TInter, None, None);
        self.with_list(n, list)
    }

    pub fn func_t(&mut self, params: Vec<NodeId>, results: Vec<NodeId>) -> NodeId {
        let params = params.into_iter().map(|p| self.field(None, p)).collect();
        let results = results.into_iter().map(|r| self.field(None, r)).collect();
        let n = self.nod(Op::TFunc, None, None);
        let node = self.t.node_mut(n);
        node.list = params;
        node.rlist = results;
        n
    }

    pub fn complit(&mut self, typ: Option<NodeId>, elems: Vec<NodeId>) -> NodeId {
        let n = self.nod(Op::CompLit, None, typ);
        self.with_list(n, elems)
    }

    pub fn key(&mut self, k: NodeId, v: NodeId) -> NodeId {
        self.bin(Op::Key, k, v)
    }

    // Declarations. At top level they go straight into the package; inside a
    // function body the returned statements belong to the body.

    pub fn var(&mut self, name: &str, typ: Option<NodeId>, val: Option<NodeId>) -> Vec<NodeId> {
        let n = self.newname(name);
        let stmts = self.t.variter(&[n], typ, val.into_iter().collect());
        if !self.t.in_function_scope() {
            self.xtop.extend(stmts.iter().copied());
        }
        stmts
    }

    pub fn vars(&mut self, names: &[&str], typ: Option<NodeId>, vals: Vec<NodeId>) -> Vec<NodeId> {
        let ns: Vec<NodeId> = names.iter().map(|n| self.newname(n)).collect();
        let stmts = self.t.variter(&ns, typ, vals);
        if !self.t.in_function_scope() {
            self.xtop.extend(stmts.iter().copied());
        }
        stmts
    }

    pub fn const_(&mut self, name: &str, typ: Option<NodeId>, val: NodeId) -> Vec<NodeId> {
        self.t.begin_const_group();
        let n = self.newname(name);
        let stmts = self.t.constiter(&[n], typ, vec![val]);
        self.t.end_const_group();
        if !self.t.in_function_scope() {
            self.xtop.extend(stmts.iter().copied());
        }
        stmts
    }

    pub fn type_(&mut self, name: &str, ntype: NodeId) -> NodeId {
        let n = self.newname(name);
        let dcl = self.t.typedcl(n, ntype);
        if !self.t.in_function_scope() {
            self.xtop.push(dcl);
        }
        dcl
    }

    /// `func name(params) (results) { body }`; parameters are `(name, type)`
    pub fn func(
        &mut self,
        name: &str,
        params: Vec<(&str, NodeId)>,
        results: Vec<NodeId>,
        body: impl FnOnce(&mut Pkg) -> Vec<NodeId>,
    ) -> NodeId {
        self.func_with_recv(None, name, params, results, body)
    }

    pub fn method(
        &mut self,
        recv: (&str, NodeId),
        name: &str,
        params: Vec<(&str, NodeId)>,
        results: Vec<NodeId>,
        body: impl FnOnce(&mut Pkg) -> Vec<NodeId>,
    ) -> NodeId {
        self.func_with_recv(Some(recv), name, params, results, body)
    }

    fn func_with_recv(
        &mut self,
        recv: Option<(&str, NodeId)>,
        name: &str,
        params: Vec<(&str, NodeId)>,
        results: Vec<NodeId>,
        body: impl FnOnce(&mut Pkg) -> Vec<NodeId>,
    ) -> NodeId {
        let recv = recv.map(|(n, t)| self.field(Some(n), t));
        let params = params.into_iter().map(|(n, t)| self.field(Some(n), t)).collect();
        let results = results.into_iter().map(|r| self.field(None, r)).collect();
        let s = self.sym(name);
        let sp = self.sp();
        let f = self.t.funchdr(s, recv, params, results, sp);
        let stmts = body(self);
        self.t.funcbody(f, stmts);
        self.xtop.push(f);
        f
    }

    /// `names := values`
    pub fn define(&mut self, names: &[&str], values: Vec<NodeId>) -> NodeId {
        let ns: Vec<NodeId> = names.iter().map(|n| self.newname(n)).collect();
        let stmt = if ns.len() == 1 && values.len() == 1 {
            self.nod(Op::As, Some(ns[0]), Some(values[0]))
        } else {
            let n = self.nod(Op::As2, None, None);
            let node = self.t.node_mut(n);
            node.list = ns.clone();
            node.rlist = values;
            n
        };
        let mut dcls = Vec::new();
        for v in ns {
            self.t.declare(v, Class::Auto);
            self.t.node_mut(v).expect_name_mut().defn = Some(stmt);
            let sp = self.t.span(v);
            dcls.push(self.t.nodes.nod(Op::Dcl, Some(v), None, sp));
        }
        let node = self.t.node_mut(stmt);
        node.colas = true;
        node.ninit = dcls;
        stmt
    }

    pub fn assign(&mut self, l: NodeId, r: NodeId) -> NodeId {
        self.bin(Op::As, l, r)
    }

    pub fn ret(&mut self, vals: Vec<NodeId>) -> NodeId {
        let n = self.nod(Op::Return, None, None);
        self.with_list(n, vals)
    }

    pub fn if_(&mut self, cond: NodeId, body: Vec<NodeId>, els: Vec<NodeId>) -> NodeId {
        let n = self.nod(Op::If, Some(cond), None);
        let node = self.t.node_mut(n);
        node.nbody = body;
        node.rlist = els;
        n
    }

    pub fn for_(&mut self, cond: Option<NodeId>, body: Vec<NodeId>) -> NodeId {
        let n = self.nod(Op::For, cond, None);
        self.t.node_mut(n).nbody = body;
        n
    }

    pub fn branch(&mut self, op: Op, label: Option<&str>) -> NodeId {
        let l = label.map(|l| self.newname(l));
        self.nod(op, l, None)
    }

    pub fn label(&mut self, name: &str, stmt: NodeId) -> NodeId {
        let l = self.newname(name);
        self.nod(Op::Label, Some(l), Some(stmt))
    }

    pub fn case(&mut self, exprs: Vec<NodeId>, body: Vec<NodeId>) -> NodeId {
        let n = self.nod(Op::Case, None, None);
        let node = self.t.node_mut(n);
        node.list = exprs;
        node.nbody = body;
        n
    }

    pub fn switch(&mut self, tag: Option<NodeId>, cases: Vec<NodeId>) -> NodeId {
        let n = self.nod(Op::Switch, tag, None);
        self.with_list(n, cases)
    }

    pub fn check(&mut self) {
        let mut xtop = std::mem::take(&mut self.xtop);
        self.t.check_package(&mut xtop);
        self.xtop = xtop;
    }

    pub fn messages(&self) -> Vec<String> {
        self.t.errors.iter().map(|e| e.message.clone()).collect()
    }

    #[track_caller]
    pub fn assert_clean(&self) {
        assert!(self.t.errors.is_empty(), "unexpected errors: {:#?}", self.messages());
    }

    #[track_caller]
    pub fn assert_error(&self, msg: &str) {
        assert!(
            self.messages().iter().any(|m| m.contains(msg)),
            "no error containing {:?} in {:#?}",
            msg,
            self.messages()
        );
    }

    pub fn typ_of(&self, n: NodeId) -> String {
        self.t.tstr_opt(self.t.ty(n))
    }
}

#[test]
fn undefined_name() {
    let mut p = Pkg::new();
    let y = p.name("y");
    p.var("x", None, Some(y));
    p.check();
    assert_eq!(p.messages(), vec!["undefined: y".to_string()]);
}

#[test]
fn const_self_reference_is_a_loop() {
    let mut p = Pkg::new();
    let sym = p.sym("X");
    let sp = p.sp();
    p.t.begin_const_group();
    let n = p.t.newname(sym, sp);
    // `X` on the right resolves to the constant being declared
    let r = p.t.oldname(sym, sp);
    let stmts = p.t.constiter(&[n], None, vec![r]);
    p.t.end_const_group();
    p.xtop.extend(stmts);
    p.check();
    assert!(!p.messages().is_empty());
    p.assert_error("X");
}

#[test]
fn const_initializer_must_be_constant() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.var("v", Some(int), None);
    let v = p.name("v");
    p.const_("C", None, v);
    p.check();
    p.assert_error("const initializer v is not a constant");
}

#[test]
fn typed_constant_expression() {
    let mut p = Pkg::new();
    let one = p.int(1);
    let two = p.int(2);
    let sum = p.bin(Op::Add, one, two);
    let int8 = p.name("int8");
    let stmts = p.const_("K", Some(int8), sum);
    p.check();
    p.assert_clean();
    let k = p.t.node(stmts[0]).left.unwrap();
    assert_eq!(p.typ_of(k), "int8");
    assert_eq!(p.t.node(k).val, Some(Val::Int(3)));
}

#[test]
fn constant_overflow() {
    let mut p = Pkg::new();
    let big = p.int(300);
    let uint8 = p.name("uint8");
    p.const_("B", Some(uint8), big);
    p.check();
    p.assert_error("constant 300 overflows uint8");
}

#[test]
fn self_referential_struct_through_pointer() {
    let mut p = Pkg::new();
    let node_ref = p.name("Node");
    let next = p.ptr_t(node_ref);
    let int = p.name("int");
    let st = p.struct_t(&[("val", int), ("next", next)]);
    let dcl = p.type_("Node", st);
    p.check();
    p.assert_clean();

    let node_t = p.t.ty(p.t.node(dcl).left.unwrap()).unwrap();
    assert!(p.t.types.get(node_t).is_struct());
    let next_t = p.t.types.field(node_t, 1).typ;
    // The pointer built before the declaration finished sees the final struct
    assert_eq!(p.t.types.elem(next_t), node_t);
    assert_eq!(p.t.types.size(node_t), 16);
}

#[test]
fn function_missing_return() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.func("f", vec![], vec![int], |_| vec![]);
    let int = p.name("int");
    p.func("g", vec![], vec![int], |p| {
        let one = p.int(1);
        let cond = p.name("true");
        let r = p.ret(vec![one]);
        let tail = p.nod(Op::Empty, None, None);
        vec![p.if_(cond, vec![r], vec![]), tail]
    });
    p.check();
    // f has an empty body, so only g is reported
    assert_eq!(p.messages(), vec!["missing return at end of function".to_string()]);
}

#[test]
fn terminating_statements() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.func("loop", vec![], vec![int], |p| vec![p.for_(None, vec![])]);
    let int = p.name("int");
    p.func("both", vec![("b", int)], vec![], |_| vec![]);
    let int = p.name("int");
    let bool_t = p.name("bool");
    p.func("branches", vec![("c", bool_t)], vec![int], |p| {
        let c = p.name("c");
        let one = p.int(1);
        let two = p.int(2);
        let r1 = p.ret(vec![one]);
        let r2 = p.ret(vec![two]);
        vec![p.if_(c, vec![r1], vec![r2])]
    });
    p.check();
    p.assert_clean();
}

#[test]
fn loop_with_break_does_not_terminate() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.func("f", vec![], vec![int], |p| {
        let brk = p.branch(Op::Break, None);
        vec![p.for_(None, vec![brk])]
    });
    p.check();
    p.assert_error("missing return at end of function");
}

#[test]
fn return_argument_count() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let string = p.name("string");
    p.func("f", vec![], vec![int, string], |p| {
        let one = p.int(1);
        vec![p.ret(vec![one])]
    });
    let int = p.name("int");
    p.func("g", vec![], vec![int], |p| {
        let one = p.int(1);
        let two = p.int(2);
        vec![p.ret(vec![one, two])]
    });
    p.check();
    p.assert_error("not enough arguments to return");
    p.assert_error("too many arguments to return");
}

#[test]
fn return_outside_function() {
    let mut p = Pkg::new();
    let r = p.ret(vec![]);
    p.xtop.push(r);
    p.check();
    p.assert_error("return outside function");
}

#[test]
fn non_bool_condition() {
    let mut p = Pkg::new();
    p.func("f", vec![], vec![], |p| {
        let one = p.int(1);
        vec![p.if_(one, vec![], vec![])]
    });
    p.check();
    p.assert_error("non-bool 1");
    p.assert_error("used as if condition");
}

#[test]
fn labels_and_branches() {
    let mut p = Pkg::new();
    p.func("f", vec![], vec![], |p| {
        let brk = p.branch(Op::Break, Some("outer"));
        let inner = p.for_(None, vec![brk]);
        let outer_loop = p.for_(None, vec![inner]);
        let outer = p.label("outer", outer_loop);
        let unused_stmt = p.nod(Op::Empty, None, None);
        let unused = p.label("unused", unused_stmt);
        let stray = p.branch(Op::Continue, None);
        let missing = p.branch(Op::Goto, Some("nowhere"));
        vec![outer, unused, stray, missing]
    });
    p.check();
    p.assert_error("label unused defined and not used");
    p.assert_error("continue is not in a loop");
    p.assert_error("label nowhere not defined");
    assert!(!p.messages().iter().any(|m| m.contains("outer")), "{:?}", p.messages());
}

#[test]
fn break_label_must_enclose() {
    let mut p = Pkg::new();
    p.func("f", vec![], vec![], |p| {
        let empty = p.nod(Op::Empty, None, None);
        let l = p.label("L", empty);
        let brk = p.branch(Op::Break, Some("L"));
        let lp = p.for_(None, vec![brk]);
        vec![l, lp]
    });
    p.check();
    p.assert_error("invalid break label L");
}

#[test]
fn expression_switch() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.func("f", vec![("x", int)], vec![], |p| {
        let x = p.name("x");
        let one = p.int(1);
        let s = p.string("two");
        let c1 = p.case(vec![one], vec![]);
        let c2 = p.case(vec![s], vec![]);
        let d1 = p.case(vec![], vec![]);
        let d2 = p.case(vec![], vec![]);
        vec![p.switch(Some(x), vec![c1, c2, d1, d2])]
    });
    p.check();
    p.assert_error("multiple defaults in switch");
    p.assert_error("cannot convert \"two\" to type int");
}

#[test]
fn fallthrough_placement() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.func("f", vec![("x", int)], vec![], |p| {
        let x = p.name("x");
        let one = p.int(1);
        let two = p.int(2);
        let ft1 = p.nod(Op::XFall, None, None);
        let ft2 = p.nod(Op::XFall, None, None);
        let c1 = p.case(vec![one], vec![ft1]);
        let c2 = p.case(vec![two], vec![ft2]);
        let sw = p.switch(Some(x), vec![c1, c2]);
        let stray = p.nod(Op::XFall, None, None);
        vec![sw, stray]
    });
    p.check();
    p.assert_error("cannot fallthrough final case in switch");
    p.assert_error("fallthrough statement out of place");
    assert_eq!(p.messages().len(), 2, "{:?}", p.messages());
}

#[test]
fn range_over_map_and_int() {
    let mut p = Pkg::new();
    let string = p.name("string");
    let int = p.name("int");
    let mt = p.map_t(string, int);
    let int2 = p.name("int");
    p.func("f", vec![("m", mt), ("n", int2)], vec![], |p| {
        let k = p.newname("k");
        let v = p.newname("v");
        let m = p.name("m");
        let r = p.nod(Op::Range, None, Some(m));
        for name in [k, v] {
            p.t.declare(name, Class::Auto);
            p.t.node_mut(name).expect_name_mut().defn = Some(r);
        }
        {
            let node = p.t.node_mut(r);
            node.list = vec![k, v];
            node.colas = true;
        }
        let n = p.name("n");
        let bad = p.nod(Op::Range, None, Some(n));
        vec![r, bad]
    });
    p.check();
    assert_eq!(p.messages(), vec!["cannot range over n (type int)".to_string()]);
}

#[test]
fn defer_discards_result() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let sl = p.slice_t(int);
    p.func("f", vec![("s", sl)], vec![], |p| {
        let s = p.name("s");
        let len = p.call_name("len", vec![s]);
        let d = p.un(Op::Defer, len);
        let conv_target = p.name("int");
        let one = p.int(1);
        let conv = p.call(conv_target, vec![one]);
        let g = p.un(Op::Proc, conv);
        vec![d, g]
    });
    p.check();
    p.assert_error("defer discards result of len(s)");
    p.assert_error("go requires function call, not conversion");
}

#[test]
fn method_is_attached_to_receiver_type() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.type_("Celsius", int);
    let recv = p.name("Celsius");
    let float64 = p.name("float64");
    p.method(("c", recv), "F", vec![], vec![float64], |p| {
        let c = p.name("c");
        let float64 = p.name("float64");
        let conv = p.call(float64, vec![c]);
        vec![p.ret(vec![conv])]
    });
    let celsius = p.name("Celsius");
    p.func("g", vec![("c", celsius)], vec![], |p| {
        let c = p.name("c");
        let m = p.dot(c, "F");
        let call = p.call(m, vec![]);
        let x = p.define(&["x"], vec![call]);
        let blank = p.name("_");
        let x_ref = p.name("x");
        vec![x, p.assign(blank, x_ref)]
    });
    p.check();
    p.assert_clean();
}

#[test]
fn max_errors_limits_reports() {
    let mut p = Pkg::with_config(CheckerConfig { max_errors: 2, ..CheckerConfig::default() });
    for name in ["a", "b", "c", "d"] {
        let undefined = p.name(&format!("{}_missing", name));
        p.var(name, None, Some(undefined));
    }
    p.check();
    assert_eq!(p.t.errors.len(), 2);
    assert_eq!(p.t.nerrors, 4);
}

#[test]
fn predeclared_types_have_expected_ids() {
    let p = Pkg::new();
    let all = p.t.predeclared_types();
    assert!(all.iter().any(|(name, id)| *name == "byte" && *id == BYTE_TYPE_ID));
    assert!(all.iter().any(|(name, id)| *name == "uint8" && *id == UINT8_TYPE_ID));
    assert!(all.iter().any(|(name, id)| *name == "rune" && *id == RUNE_TYPE_ID));
    assert!(all.iter().any(|(name, id)| *name == "error" && *id == ERROR_TYPE_ID));
    // Distinct for messages, one type for everything else
    assert_ne!(BYTE_TYPE_ID, UINT8_TYPE_ID);
    assert_eq!(p.t.types.compare(&p.t.syms, BYTE_TYPE_ID, UINT8_TYPE_ID), std::cmp::Ordering::Equal);
    assert!(p.t.types.eqtype(BYTE_TYPE_ID, UINT8_TYPE_ID));
}

#[test]
fn package_name_without_selector() {
    let mut p = Pkg::new();
    p.func("f", vec![], vec![], |p| {
        let pkg = p.nod(Op::Pack, None, None);
        let fmt = p.sym("fmt");
        p.t.node_mut(pkg).sym = Some(fmt);
        let blank = p.name("_");
        vec![p.assign(blank, pkg)]
    });
    p.check();
    p.assert_error("use of package fmt without selector");
}

#[test]
fn values_and_types_in_the_wrong_place() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.var("x", Some(int), None);
    let x = p.name("x");
    p.var("y", Some(x), None);
    p.func("g", vec![], vec![], |_| vec![]);
    let int = p.name("int");
    p.func("f", vec![("n", int)], vec![], |p| {
        let blank = p.name("_");
        let int = p.name("int");
        let type_as_value = p.assign(blank, int);
        let g = p.call_name("g", vec![]);
        let no_value = p.define(&["v"], vec![g]);
        let n = p.name("n");
        vec![type_as_value, no_value, n]
    });
    p.check();
    p.assert_error("x is not a type");
    p.assert_error("type int is not an expression");
    p.assert_error("g() used as value");
    p.assert_error("n evaluated but not used");
}
