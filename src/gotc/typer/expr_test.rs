// Copyright (c) 2025 knix
// All rights reserved.

use crate::ast::{NodeId, Op};
use crate::typer::consts::Val;
use crate::typer::typer_test::Pkg;

fn var_of(p: &mut Pkg, name: &str, typ: &str) {
    let t = p.name(typ);
    p.var(name, Some(t), None);
}

fn var_init(p: &mut Pkg, name: &str, value: NodeId) -> NodeId {
    let stmts = p.var(name, None, Some(value));
    p.t.node(stmts[0]).left.unwrap()
}

#[test]
fn shift_takes_left_operand_type() {
    let mut p = Pkg::new();
    var_of(&mut p, "x", "int8");
    var_of(&mut p, "s", "uint");
    var_of(&mut p, "i", "int");
    let (x, s) = (p.name("x"), p.name("s"));
    let shl = p.bin(Op::Lsh, x, s);
    let y = var_init(&mut p, "y", shl);
    let (x2, i) = (p.name("x"), p.name("i"));
    let bad = p.bin(Op::Rsh, x2, i);
    var_init(&mut p, "z", bad);
    p.check();
    assert_eq!(p.typ_of(y), "int8");
    assert_eq!(p.messages().len(), 1);
    p.assert_error("(shift count type int, must be unsigned integer)");
}

#[test]
fn shift_of_non_integer() {
    let mut p = Pkg::new();
    var_of(&mut p, "f", "float64");
    let (f, one) = (p.name("f"), p.int(1));
    let shl = p.bin(Op::Lsh, f, one);
    var_init(&mut p, "g", shl);
    p.check();
    p.assert_error("(shift of type float64)");
}

#[test]
fn division_by_constant_zero() {
    let mut p = Pkg::new();
    var_of(&mut p, "a", "int");
    let (a, zero) = (p.name("a"), p.int(0));
    let div = p.bin(Op::Div, a, zero);
    var_init(&mut p, "b", div);
    let (a2, zero2) = (p.name("a"), p.int(0));
    let rem = p.bin(Op::Mod, a2, zero2);
    var_init(&mut p, "c", rem);
    p.check();
    assert_eq!(p.messages(), vec!["division by zero".to_string(), "division by zero".to_string()]);
}

#[test]
fn string_concatenation_is_flattened() {
    let mut p = Pkg::new();
    var_of(&mut p, "s", "string");
    let (s, a, b) = (p.name("s"), p.string("a"), p.string("b"));
    let inner = p.bin(Op::Add, s, a);
    let outer = p.bin(Op::Add, inner, b);
    let t = var_init(&mut p, "t", outer);
    p.check();
    p.assert_clean();
    assert_eq!(p.typ_of(t), "string");
    assert_eq!(p.t.op(outer), Op::AddStr);
    // Adjacent constants are merged
    let list = p.t.node(outer).list.clone();
    assert_eq!(list.len(), 2);
    assert_eq!(p.t.node(list[1]).val, Some(Val::Str("ab".to_string())));
}

#[test]
fn constant_string_concatenation_folds() {
    let mut p = Pkg::new();
    let (a, b) = (p.string("go"), p.string("pher"));
    let add = p.bin(Op::Add, a, b);
    let stmts = p.const_("C", None, add);
    p.check();
    p.assert_clean();
    let c = p.t.node(stmts[0]).left.unwrap();
    assert_eq!(p.t.node(c).val, Some(Val::Str("gopher".to_string())));
}

#[test]
fn comparison_operands() {
    let mut p = Pkg::new();
    var_of(&mut p, "a", "int");
    var_of(&mut p, "b", "string");
    let int = p.name("int");
    let sl = p.slice_t(int);
    p.var("s", Some(sl), None);

    let (a, b) = (p.name("a"), p.name("b"));
    let mismatched = p.bin(Op::Eq, a, b);
    var_init(&mut p, "c1", mismatched);

    let (s1, s2) = (p.name("s"), p.name("s"));
    let slices = p.bin(Op::Eq, s1, s2);
    var_init(&mut p, "c2", slices);

    let (s3, nil) = (p.name("s"), p.name("nil"));
    let against_nil = p.bin(Op::Ne, s3, nil);
    let c3 = var_init(&mut p, "c3", against_nil);

    let (a2, one) = (p.name("a"), p.int(1));
    let less = p.bin(Op::Lt, a2, one);
    let c4 = var_init(&mut p, "c4", less);
    p.check();

    assert_eq!(p.messages().len(), 2);
    p.assert_error("(mismatched types int and string)");
    p.assert_error("(slice can only be compared to nil)");
    assert_eq!(p.typ_of(c3), "bool");
    assert_eq!(p.typ_of(c4), "bool");
}

#[test]
fn method_calls_and_selectors() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let st = p.struct_t(&[("x", int)]);
    p.type_("T", st);
    let recv = p.name("T");
    let int = p.name("int");
    p.method(("t", recv), "Get", vec![], vec![int], |p| {
        let t = p.name("t");
        let x = p.dot(t, "x");
        vec![p.ret(vec![x])]
    });

    let mut call = None;
    let mut value = None;
    let mut got = None;
    p.func("use", vec![], vec![], |p| {
        let typ = p.name("T");
        let mut stmts = p.var("v", Some(typ), None);
        let v = p.name("v");
        let sel = p.dot(v, "Get");
        let c = p.call(sel, vec![]);
        call = Some(c);
        let d = p.define(&["n"], vec![c]);
        got = Some(p.t.node(d).left.unwrap());
        stmts.push(d);

        let v2 = p.name("v");
        let mv = p.dot(v2, "Get");
        value = Some(mv);
        stmts.push(p.define(&["f"], vec![mv]));

        let v3 = p.name("v");
        let missing = p.dot(v3, "Missing");
        stmts.push(p.define(&["m"], vec![missing]));
        stmts
    });
    p.check();

    assert_eq!(p.messages(), vec!["v.Missing undefined (type T has no field or method Missing)".to_string()]);
    assert_eq!(p.t.op(call.unwrap()), Op::CallMeth);
    assert_eq!(p.typ_of(got.unwrap()), "int");
    // A method value without a call binds its receiver
    assert_eq!(p.t.op(value.unwrap()), Op::CallPart);
}

#[test]
fn constant_indexes_are_bounds_checked() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let at = p.array_t(3, int);
    p.var("a", Some(at), None);
    var_of(&mut p, "i", "int");

    let (a, five) = (p.name("a"), p.int(5));
    let oob = p.index(a, five);
    var_init(&mut p, "x", oob);

    let (lit, ten) = (p.string("abc"), p.int(10));
    let soob = p.index(lit, ten);
    let y = var_init(&mut p, "y", soob);

    let (i, zero) = (p.name("i"), p.int(0));
    let not_indexable = p.index(i, zero);
    var_init(&mut p, "z", not_indexable);

    let (a2, two) = (p.name("a"), p.int(2));
    let fine = p.index(a2, two);
    let w = var_init(&mut p, "w", fine);
    p.check();

    assert_eq!(p.messages().len(), 3);
    p.assert_error("invalid array index 5 (out of bounds for 3-element array)");
    p.assert_error("invalid string index 10 (out of bounds for 3-byte string)");
    p.assert_error("(type int does not support indexing)");
    assert_eq!(p.typ_of(y), "byte");
    assert_eq!(p.typ_of(w), "int");
}

#[test]
fn call_results_in_expressions() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let string = p.name("string");
    p.func("two", vec![], vec![int, string], |p| {
        let (one, x) = (p.int(1), p.string("x"));
        vec![p.ret(vec![one, x])]
    });
    var_of(&mut p, "i", "int");

    let call = p.call_name("two", vec![]);
    let one = p.int(1);
    let sum = p.bin(Op::Add, call, one);
    var_init(&mut p, "a", sum);

    let not_func = p.call_name("i", vec![]);
    var_init(&mut p, "b", not_func);
    p.check();

    p.assert_error("multiple-value two() in single-value context");
    p.assert_error("cannot call non-function i (type int)");
}
