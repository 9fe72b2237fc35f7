// Copyright (c) 2025 knix
// All rights reserved.

use crate::ast::{NodeId, Op};
use crate::typer::typer_test::Pkg;

/// `func f(a int, b string) {}`
fn declare_f(p: &mut Pkg) {
    let int = p.name("int");
    let string = p.name("string");
    p.func("f", vec![("a", int), ("b", string)], vec![], |_| vec![]);
}

/// `func two() (int, string) { return 1, "x" }`
fn declare_two(p: &mut Pkg) {
    let int = p.name("int");
    let string = p.name("string");
    p.func("two", vec![], vec![int, string], |p| {
        let one = p.int(1);
        let x = p.string("x");
        vec![p.ret(vec![one, x])]
    });
}

/// `func v(xs ...int) {}`
fn declare_variadic(p: &mut Pkg) {
    let int = p.name("int");
    let sl = p.slice_t(int);
    let s = p.sym("v");
    let xs = p.field(Some("xs"), sl);
    p.t.node_mut(xs).isddd = true;
    let sp = p.sp();
    let f = p.t.funchdr(s, None, vec![xs], Vec::new(), sp);
    p.t.funcbody(f, Vec::new());
    p.xtop.push(f);
}

fn in_func(p: &mut Pkg, body: impl FnOnce(&mut Pkg) -> Vec<NodeId>) {
    p.func("test", vec![], vec![], body);
}

#[test]
fn call_argument_count() {
    let mut p = Pkg::new();
    declare_f(&mut p);
    in_func(&mut p, |p| {
        let one = p.int(1);
        let c1 = p.call_name("f", vec![one]);
        let (a, b, c) = (p.int(1), p.string("x"), p.int(3));
        let c2 = p.call_name("f", vec![a, b, c]);
        vec![c1, c2]
    });
    p.check();
    assert_eq!(
        p.messages(),
        vec!["not enough arguments in call to f".to_string(), "too many arguments in call to f".to_string()]
    );
}

#[test]
fn call_argument_type() {
    let mut p = Pkg::new();
    declare_f(&mut p);
    in_func(&mut p, |p| {
        let (a, b) = (p.string("x"), p.string("y"));
        vec![p.call_name("f", vec![a, b])]
    });
    p.check();
    p.assert_error("as type int in argument to f");
    assert_eq!(p.messages().len(), 1);
}

#[test]
fn variadic_calls() {
    let mut p = Pkg::new();
    declare_variadic(&mut p);
    let int = p.name("int");
    let sl = p.slice_t(int);
    in_func(&mut p, |p| {
        let none = p.call_name("v", vec![]);
        let args: Vec<NodeId> = (1..=3).map(|i| p.int(i)).collect();
        let several = p.call_name("v", args);
        let mut stmts = p.var("s", Some(sl), None);
        let s = p.name("s");
        let spread = p.call_name("v", vec![s]);
        p.t.node_mut(spread).isddd = true;
        let one = p.int(1);
        let s2 = p.name("s");
        let extra = p.call_name("v", vec![one, s2]);
        p.t.node_mut(extra).isddd = true;
        stmts.extend([none, several, spread, extra]);
        stmts
    });
    p.check();
    assert_eq!(p.messages(), vec!["too many arguments in call to v".to_string()]);
}

#[test]
fn multi_value_call_as_arguments() {
    let mut p = Pkg::new();
    declare_f(&mut p);
    declare_two(&mut p);
    in_func(&mut p, |p| {
        let two = p.call_name("two", vec![]);
        vec![p.call_name("f", vec![two])]
    });
    p.check();
    p.assert_clean();
}

#[test]
fn multi_value_assignment() {
    let mut p = Pkg::new();
    declare_two(&mut p);
    let mut stmt = None;
    let mut names = Vec::new();
    in_func(&mut p, |p| {
        let call = p.call_name("two", vec![]);
        let s = p.define(&["a", "b"], vec![call]);
        names = p.t.node(s).list.clone();
        stmt = Some(s);
        let call2 = p.call_name("two", vec![]);
        let bad = p.define(&["x", "y", "z"], vec![call2]);
        vec![s, bad]
    });
    p.check();
    assert_eq!(p.messages(), vec!["assignment count mismatch: 3 = 2".to_string()]);
    assert_eq!(p.t.op(stmt.unwrap()), Op::As2Func);
    assert_eq!(p.typ_of(names[0]), "int");
    assert_eq!(p.typ_of(names[1]), "string");
}

#[test]
fn count_mismatch_with_values() {
    let mut p = Pkg::new();
    in_func(&mut p, |p| {
        let vals: Vec<NodeId> = (1..=3).map(|i| p.int(i)).collect();
        vec![p.define(&["a", "b"], vals)]
    });
    p.check();
    p.assert_error("assignment count mismatch: 2 = 3");
}

#[test]
fn comma_ok_map_index() {
    let mut p = Pkg::new();
    let string = p.name("string");
    let int = p.name("int");
    let mt = p.map_t(string, int);
    let mut stmt = None;
    p.func("test", vec![("m", mt)], vec![], |p| {
        let m = p.name("m");
        let k = p.string("k");
        let idx = p.index(m, k);
        let s = p.define(&["v", "ok"], vec![idx]);
        stmt = Some(s);
        vec![s]
    });
    p.check();
    p.assert_clean();
    let stmt = stmt.unwrap();
    assert_eq!(p.t.op(stmt), Op::As2MapR);
    let lhs = p.t.node(stmt).list.clone();
    assert_eq!(p.typ_of(lhs[0]), "int");
    assert_eq!(p.typ_of(lhs[1]), "bool");
}

#[test]
fn multiple_assignment_types() {
    let mut p = Pkg::new();
    declare_two(&mut p);
    in_func(&mut p, |p| {
        let string = p.name("string");
        let int = p.name("int");
        let mut stmts = p.var("s", Some(string), None);
        stmts.extend(p.var("i", Some(int), None));
        let call = p.call_name("two", vec![]);
        let (s, i) = (p.name("s"), p.name("i"));
        let as2 = p.nod(Op::As2, None, None);
        {
            let node = p.t.node_mut(as2);
            node.list = vec![s, i];
            node.rlist = vec![call];
        }
        stmts.push(as2);
        stmts
    });
    p.check();
    p.assert_error("cannot assign int to s (type string) in multiple assignment");
    p.assert_error("cannot assign string to i (type int) in multiple assignment");
}

#[test]
fn unassignable_operands() {
    let mut p = Pkg::new();
    declare_f(&mut p);
    let string = p.name("string");
    let int = p.name("int");
    let st = p.struct_t(&[("x", int)]);
    p.type_("T", st);
    let key = p.name("string");
    let val = p.name("T");
    let mt = p.map_t(key, val);
    p.func("test", vec![("s", string), ("m", mt)], vec![], |p| {
        let f = p.name("f");
        let nil = p.name("nil");
        let to_func = p.assign(f, nil);

        let s = p.name("s");
        let zero = p.int(0);
        let idx = p.index(s, zero);
        let c = p.int(97);
        let to_string_byte = p.assign(idx, c);

        let m = p.name("m");
        let k = p.string("k");
        let mi = p.index(m, k);
        let field = p.dot(mi, "x");
        let one = p.int(1);
        let to_map_field = p.assign(field, one);
        vec![to_func, to_string_byte, to_map_field]
    });
    p.check();
    p.assert_error("cannot assign to f");
    p.assert_error("cannot assign to s[0]");
    p.assert_error("cannot assign to struct field");
}
