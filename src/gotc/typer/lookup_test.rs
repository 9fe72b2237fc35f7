// Copyright (c) 2025 knix
// All rights reserved.

use crate::ast::{NodeId, Op};
use crate::typer::typer_test::Pkg;

/// `_ = x`
fn discard(p: &mut Pkg, x: NodeId) -> NodeId {
    let blank = p.name("_");
    p.assign(blank, x)
}

/// `type name struct { field int }`
fn struct_with(p: &mut Pkg, name: &str, field: &str) {
    let int = p.name("int");
    let st = p.struct_t(&[(field, int)]);
    p.type_(name, st);
}

/// `type I interface { M() }`
fn iface_m(p: &mut Pkg) {
    let m = p.func_t(vec![], vec![]);
    let it = p.iface_t(vec![("M", m)]);
    p.type_("I", it);
}

#[test]
fn field_selector() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let st = p.struct_t(&[("x", int)]);
    p.var("s", Some(st), None);
    let mut sel = None;
    p.func("f", vec![], vec![], |p| {
        let s = p.name("s");
        let x = p.dot(s, "x");
        sel = Some(x);
        vec![p.define(&["y"], vec![x])]
    });
    p.check();
    p.assert_clean();
    let sel = sel.unwrap();
    assert_eq!(p.t.op(sel), Op::Dot);
    assert_eq!(p.typ_of(sel), "int");
}

#[test]
fn promoted_field_through_embedding() {
    let mut p = Pkg::new();
    struct_with(&mut p, "A", "x");
    let a = p.name("A");
    let emb = p.embedded(a);
    let st = p.nod(Op::TStruct, None, None);
    let st = p.with_list(st, vec![emb]);
    p.type_("B", st);
    let b = p.name("B");
    let mut sel = None;
    p.func("f", vec![("b", b)], vec![], |p| {
        let b = p.name("b");
        let x = p.dot(b, "x");
        sel = Some(x);
        vec![discard(p, x)]
    });
    p.check();
    p.assert_clean();
    let sel = sel.unwrap();
    assert_eq!(p.typ_of(sel), "int");
    // b.x reads b.A.x
    let inner = p.t.node(sel).left.unwrap();
    assert_eq!(p.t.op(inner), Op::Dot);
    assert!(p.t.node(inner).implicit);
}

#[test]
fn ambiguous_selector() {
    let mut p = Pkg::new();
    struct_with(&mut p, "A", "X");
    struct_with(&mut p, "B", "X");
    let (a, b) = (p.name("A"), p.name("B"));
    let (ea, eb) = (p.embedded(a), p.embedded(b));
    let st = p.nod(Op::TStruct, None, None);
    let st = p.with_list(st, vec![ea, eb]);
    p.type_("C", st);
    let c = p.name("C");
    p.func("f", vec![("c", c)], vec![], |p| {
        let c = p.name("c");
        let x = p.dot(c, "X");
        vec![discard(p, x)]
    });
    p.check();
    p.assert_error("ambiguous selector c.X");
}

#[test]
fn method_through_double_pointer() {
    let mut p = Pkg::new();
    let st = p.struct_t(&[]);
    p.type_("T", st);
    let t = p.name("T");
    p.method(("t", t), "M", vec![], vec![], |_| vec![]);
    let t = p.name("T");
    let pt = p.ptr_t(t);
    let ppt = p.ptr_t(pt);
    p.func("f", vec![("pp", ppt)], vec![], |p| {
        let pp = p.name("pp");
        let m = p.dot(pp, "M");
        vec![p.call(m, vec![])]
    });
    p.check();
    p.assert_error("calling method M with receiver pp");
    p.assert_error("requires explicit dereference");
}

#[test]
fn pointer_receiver_through_addressable_value() {
    let mut p = Pkg::new();
    let st = p.struct_t(&[]);
    p.type_("T", st);
    let t = p.name("T");
    let pt = p.ptr_t(t);
    p.method(("t", pt), "M", vec![], vec![], |_| vec![]);
    let t = p.name("T");
    let mut sel = None;
    p.func("f", vec![("v", t)], vec![], |p| {
        let v = p.name("v");
        let m = p.dot(v, "M");
        sel = Some(m);
        vec![p.call(m, vec![])]
    });
    p.check();
    p.assert_clean();
    // v.M() takes &v
    let recv = p.t.node(sel.unwrap()).left.unwrap();
    assert_eq!(p.t.op(recv), Op::Addr);
}

#[test]
fn assertion_from_non_interface() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.func("f", vec![("n", int)], vec![], |p| {
        let n = p.name("n");
        let int = p.name("int");
        let a = p.bin(Op::DotType, n, int);
        vec![discard(p, a)]
    });
    p.check();
    p.assert_error("invalid type assertion: n.(int) (non-interface type int on left)");
}

#[test]
fn impossible_assertion() {
    let mut p = Pkg::new();
    iface_m(&mut p);
    let st = p.struct_t(&[]);
    p.type_("T", st);
    let i = p.name("I");
    p.func("f", vec![("i", i)], vec![], |p| {
        let i = p.name("i");
        let t = p.name("T");
        let a = p.bin(Op::DotType, i, t);
        vec![discard(p, a)]
    });
    p.check();
    p.assert_error("impossible type assertion:");
    p.assert_error("does not implement I (missing M method)");
}

#[test]
fn assertion_to_pointer_receiver_implementation() {
    let mut p = Pkg::new();
    iface_m(&mut p);
    let st = p.struct_t(&[]);
    p.type_("T", st);
    let t = p.name("T");
    let pt = p.ptr_t(t);
    p.method(("t", pt), "M", vec![], vec![], |_| vec![]);
    let i = p.name("I");
    let i2 = p.name("I");
    let mut asserted = None;
    p.func("f", vec![("i", i), ("j", i2)], vec![], |p| {
        let i = p.name("i");
        let t = p.name("T");
        let by_value = p.bin(Op::DotType, i, t);
        let j = p.name("j");
        let t = p.name("T");
        let pt = p.ptr_t(t);
        let by_ptr = p.bin(Op::DotType, j, pt);
        asserted = Some(by_ptr);
        vec![discard(p, by_value), discard(p, by_ptr)]
    });
    p.check();
    let msgs = p.messages();
    assert_eq!(msgs.len(), 1, "{:#?}", msgs);
    assert!(msgs[0].contains("(M method has pointer receiver)"), "{}", msgs[0]);
    assert_eq!(p.typ_of(asserted.unwrap()), "*T");
}
