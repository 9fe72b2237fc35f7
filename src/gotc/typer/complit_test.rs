// Copyright (c) 2025 knix
// All rights reserved.

use crate::ast::{NodeId, Op};
use crate::typer::typer_test::Pkg;

/// `type Point struct { x, y int }`
fn point(p: &mut Pkg) {
    let int1 = p.name("int");
    let int2 = p.name("int");
    let st = p.struct_t(&[("x", int1), ("y", int2)]);
    p.type_("Point", st);
}

fn var_init(p: &mut Pkg, name: &str, value: NodeId) -> NodeId {
    let stmts = p.var(name, None, Some(value));
    p.t.node(stmts[0]).left.unwrap()
}

fn ints(p: &mut Pkg, vals: &[i128]) -> Vec<NodeId> {
    vals.iter().map(|v| p.int(*v)).collect()
}

#[test]
fn ddd_array_bound_from_highest_index() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let at = p.ddd_array_t(int);
    let (k0, k5, v0, v5) = (p.int(0), p.int(5), p.int(1), p.int(2));
    let e0 = p.key(k0, v0);
    let e5 = p.key(k5, v5);
    let lit = p.complit(Some(at), vec![e0, e5]);
    let a = var_init(&mut p, "a", lit);
    p.check();
    p.assert_clean();
    assert_eq!(p.typ_of(a), "[6]int");
}

#[test]
fn ddd_array_positional_after_key() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let at = p.ddd_array_t(int);
    let (k3, v3) = (p.int(3), p.int(30));
    let e3 = p.key(k3, v3);
    let mut elems = vec![e3];
    elems.extend(ints(&mut p, &[40, 50]));
    let lit = p.complit(Some(at), elems);
    let a = var_init(&mut p, "a", lit);
    p.check();
    p.assert_clean();
    assert_eq!(p.typ_of(a), "[6]int");
}

#[test]
fn duplicate_array_index() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let at = p.ddd_array_t(int);
    let (k0, k5a, k5b) = (p.int(0), p.int(5), p.int(5));
    let (v0, v1, v2) = (p.int(1), p.int(2), p.int(3));
    let e0 = p.key(k0, v0);
    let e1 = p.key(k5a, v1);
    let e2 = p.key(k5b, v2);
    let lit = p.complit(Some(at), vec![e0, e1, e2]);
    var_init(&mut p, "a", lit);
    p.check();
    assert_eq!(p.messages(), vec!["duplicate index in array literal: 5".to_string()]);
}

#[test]
fn array_literal_out_of_bounds() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let at = p.array_t(2, int);
    let elems = ints(&mut p, &[1, 2, 3, 4]);
    let lit = p.complit(Some(at), elems);
    var_init(&mut p, "a", lit);
    p.check();
    // Reported once, at the first element past the end
    assert_eq!(p.messages(), vec!["array index 2 out of bounds [0:2]".to_string()]);
}

#[test]
fn negative_array_index() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let sl = p.slice_t(int);
    let one = p.int(1);
    let neg = p.un(Op::Minus, one);
    let v = p.int(7);
    let e = p.key(neg, v);
    let lit = p.complit(Some(sl), vec![e]);
    var_init(&mut p, "s", lit);
    p.check();
    p.assert_error("index must be non-negative integer constant");
}

#[test]
fn struct_literal_arity() {
    let mut p = Pkg::new();
    point(&mut p);
    let t1 = p.name("Point");
    let few = ints(&mut p, &[1]);
    let lit1 = p.complit(Some(t1), few);
    var_init(&mut p, "a", lit1);
    let t2 = p.name("Point");
    let many = ints(&mut p, &[1, 2, 3, 4]);
    let lit2 = p.complit(Some(t2), many);
    var_init(&mut p, "b", lit2);
    p.check();
    assert_eq!(
        p.messages(),
        vec!["too few values in struct initializer".to_string(), "too many values in struct initializer".to_string()]
    );
}

#[test]
fn struct_literal_keyed() {
    let mut p = Pkg::new();
    point(&mut p);
    let t = p.name("Point");
    let (ky, kx) = (p.name("y"), p.name("x"));
    let (vy, vx) = (p.int(2), p.int(1));
    let ey = p.key(ky, vy);
    let ex = p.key(kx, vx);
    let lit = p.complit(Some(t), vec![ey, ex]);
    let a = var_init(&mut p, "a", lit);
    p.check();
    p.assert_clean();
    assert_eq!(p.t.op(lit), Op::StructLit);
    assert_eq!(p.typ_of(a), "Point");

    // Keys carry the field offsets
    let first_key = p.t.node(p.t.node(lit).list[0]).left.unwrap();
    assert_eq!(p.t.node(first_key).xoffset, 8);
}

#[test]
fn struct_literal_key_errors() {
    let mut p = Pkg::new();
    point(&mut p);
    let t = p.name("Point");
    let (kx1, kx2, kz) = (p.name("x"), p.name("x"), p.name("z"));
    let (v1, v2, v3) = (p.int(1), p.int(2), p.int(3));
    let e1 = p.key(kx1, v1);
    let e2 = p.key(kx2, v2);
    let e3 = p.key(kz, v3);
    let positional = p.int(4);
    let lit = p.complit(Some(t), vec![e1, e2, e3, positional]);
    var_init(&mut p, "a", lit);
    p.check();
    p.assert_error("duplicate field name in struct literal: x");
    p.assert_error("field 'z' in struct literal");
    p.assert_error("mixture of field:value and value initializers");
}

#[test]
fn map_literal_duplicate_constant_keys() {
    let mut p = Pkg::new();
    let string = p.name("string");
    let int = p.name("int");
    let mt = p.map_t(string, int);
    let (ka, kb, ka2) = (p.string("a"), p.string("b"), p.string("a"));
    let (v1, v2, v3) = (p.int(1), p.int(2), p.int(3));
    let e1 = p.key(ka, v1);
    let e2 = p.key(kb, v2);
    let e3 = p.key(ka2, v3);
    let lit = p.complit(Some(mt), vec![e1, e2, e3]);
    var_init(&mut p, "m", lit);
    p.check();
    assert_eq!(p.messages(), vec!["duplicate key \"a\" in map literal".to_string()]);
    assert_eq!(p.t.op(lit), Op::MapLit);
}

#[test]
fn map_literal_variable_keys_are_not_duplicates() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.var("k", Some(int), None);
    let int = p.name("int");
    let int2 = p.name("int");
    let mt = p.map_t(int, int2);
    let (k1, k2) = (p.name("k"), p.name("k"));
    let (v1, v2) = (p.int(1), p.int(2));
    let e1 = p.key(k1, v1);
    let e2 = p.key(k2, v2);
    let lit = p.complit(Some(mt), vec![e1, e2]);
    var_init(&mut p, "m", lit);
    p.check();
    p.assert_clean();
}

#[test]
fn map_literal_missing_key() {
    let mut p = Pkg::new();
    let string = p.name("string");
    let int = p.name("int");
    let mt = p.map_t(string, int);
    let one = p.int(1);
    let lit = p.complit(Some(mt), vec![one]);
    var_init(&mut p, "m", lit);
    p.check();
    p.assert_error("missing key in map literal");
}

#[test]
fn elided_element_types() {
    let mut p = Pkg::new();
    point(&mut p);
    let pt = p.name("Point");
    let sl = p.slice_t(pt);
    let inner1 = ints(&mut p, &[1, 2]);
    let e1 = p.complit(None, inner1);
    let inner2 = ints(&mut p, &[3, 4]);
    let e2 = p.complit(None, inner2);
    let lit = p.complit(Some(sl), vec![e1, e2]);
    var_init(&mut p, "pts", lit);

    let pt = p.name("Point");
    let ptr = p.ptr_t(pt);
    let psl = p.slice_t(ptr);
    let inner3 = ints(&mut p, &[5, 6]);
    let e3 = p.complit(None, inner3);
    let plit = p.complit(Some(psl), vec![e3]);
    var_init(&mut p, "ptrs", plit);
    p.check();
    p.assert_clean();

    assert_eq!(p.t.op(e1), Op::StructLit);
    assert!(p.t.node(e1).implicit);
    // The element of a []*Point literal becomes &Point{...}
    let elem = p.t.node(p.t.node(plit).list[0]).right.unwrap();
    assert_eq!(p.t.op(elem), Op::PtrLit);
    assert_eq!(p.typ_of(elem), "*Point");
}

#[test]
fn explicit_pointer_type_rejected() {
    let mut p = Pkg::new();
    point(&mut p);
    let pt = p.name("Point");
    let ptr = p.ptr_t(pt);
    let lit = p.complit(Some(ptr), vec![]);
    var_init(&mut p, "a", lit);
    p.check();
    p.assert_error("invalid pointer type *Point for composite literal (use &Point instead)");
}

#[test]
fn missing_and_invalid_literal_types() {
    let mut p = Pkg::new();
    let one = p.int(1);
    let lit = p.complit(None, vec![one]);
    var_init(&mut p, "a", lit);
    let int = p.name("int");
    let lit2 = p.complit(Some(int), vec![]);
    var_init(&mut p, "b", lit2);
    p.check();
    p.assert_error("missing type in composite literal");
    p.assert_error("invalid type for composite literal: int");
}
