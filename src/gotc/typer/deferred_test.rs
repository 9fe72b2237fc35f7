// Copyright (c) 2025 knix
// All rights reserved.

use crate::ast::{NodeId, Op};
use crate::typer::typer_test::Pkg;

fn type_of_decl(p: &Pkg, dcl: NodeId) -> String {
    let name = p.t.node(dcl).left.unwrap();
    p.typ_of(name)
}

#[test]
fn types_refer_to_later_declarations() {
    let mut p = Pkg::new();
    // type A struct { b *B }
    let b = p.name("B");
    let pb = p.ptr_t(b);
    let sa = p.struct_t(&[("b", pb)]);
    let a_dcl = p.type_("A", sa);
    // type B struct { a A; n int }
    let (a, int) = (p.name("A"), p.name("int"));
    let sb = p.struct_t(&[("a", a), ("n", int)]);
    let b_dcl = p.type_("B", sb);
    p.check();
    p.assert_clean();

    let ta = p.t.ty(p.t.node(a_dcl).left.unwrap()).unwrap();
    let tb = p.t.ty(p.t.node(b_dcl).left.unwrap()).unwrap();
    assert_eq!(p.t.types.size(ta), 8);
    assert_eq!(p.t.types.size(tb), 16);
    let field = p.t.types.field(ta, 0).typ;
    assert_eq!(p.t.types.elem(field), tb);
    assert_eq!(p.t.types.field(tb, 0).typ, ta);
}

#[test]
fn chain_of_defined_types() {
    let mut p = Pkg::new();
    let b = p.name("B");
    let a_dcl = p.type_("A", b);
    let c = p.name("C");
    let b_dcl = p.type_("B", c);
    let int = p.name("int");
    p.type_("C", int);

    let (ta, one) = (p.name("A"), p.int(1));
    p.var("a", Some(ta), Some(one));
    let (tb, a) = (p.name("B"), p.name("a"));
    p.var("b", Some(tb), Some(a));
    p.check();

    assert_eq!(type_of_decl(&p, a_dcl), "A");
    assert_eq!(type_of_decl(&p, b_dcl), "B");
    // Each declaration is its own type even with the same underlying type
    assert_eq!(p.messages(), vec!["cannot use a (type A) as type B in assignment".to_string()]);
}

#[test]
fn self_referential_interface() {
    let mut p = Pkg::new();
    // type I interface { Next() I; Len() int }
    let i = p.name("I");
    let next = p.func_t(vec![], vec![i]);
    let int = p.name("int");
    let len = p.func_t(vec![], vec![int]);
    let it = p.iface_t(vec![("Next", next), ("Len", len)]);
    let i_dcl = p.type_("I", it);

    let ti = p.name("I");
    p.var("i", Some(ti), None);
    let x = p.name("i");
    let sel = p.dot(x, "Next");
    let c1 = p.call(sel, vec![]);
    let sel2 = p.dot(c1, "Len");
    let c2 = p.call(sel2, vec![]);
    let stmts = p.var("n", None, Some(c2));
    p.check();
    p.assert_clean();

    let n = p.t.node(stmts[0]).left.unwrap();
    assert_eq!(p.typ_of(n), "int");
    assert_eq!(p.t.op(c1), Op::CallInter);

    // Methods are kept sorted by name
    let ti = p.t.ty(p.t.node(i_dcl).left.unwrap()).unwrap();
    let names: Vec<String> = p
        .t
        .types
        .fields(ti)
        .iter()
        .map(|f| p.t.syms.name(f.sym.unwrap()).to_string())
        .collect();
    assert_eq!(names, vec!["Len".to_string(), "Next".to_string()]);
}

#[test]
fn map_key_checked_after_declaration_completes() {
    let mut p = Pkg::new();
    // type K struct { m map[K]bool }
    let (k, b) = (p.name("K"), p.name("bool"));
    let mt = p.map_t(k, b);
    let sk = p.struct_t(&[("m", mt)]);
    p.type_("K", sk);
    // type Q struct { next *map[Q]int }
    let (q, int) = (p.name("Q"), p.name("int"));
    let mq = p.map_t(q, int);
    let pm = p.ptr_t(mq);
    let sq = p.struct_t(&[("next", pm)]);
    p.type_("Q", sq);
    p.check();
    assert_eq!(p.messages(), vec!["invalid map key type K".to_string()]);
}

#[test]
fn invalid_map_key_reported_directly() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let sl = p.slice_t(int);
    let b = p.name("bool");
    let mt = p.map_t(sl, b);
    p.var("m", Some(mt), None);
    p.check();
    assert_eq!(p.messages(), vec!["invalid map key type []int".to_string()]);
}

#[test]
fn package_vars_without_values_are_checked() {
    let mut p = Pkg::new();
    let missing = p.name("nosuch");
    p.vars(&["a", "b"], Some(missing), vec![]);
    let int = p.name("int");
    p.var("n", Some(int), None);
    p.check();
    p.assert_error("undefined: nosuch");
    let n = p.sym("n");
    let def = p.t.syms.get(n).def.unwrap();
    assert_eq!(p.typ_of(def), "int");
}

#[test]
fn embedded_pointer_resolved_late() {
    let mut p = Pkg::new();
    // type P *S; type S struct { P }
    let s = p.name("S");
    let ps = p.ptr_t(s);
    p.type_("P", ps);
    let pn = p.name("P");
    let emb = p.embedded(pn);
    let st = p.nod(Op::TStruct, None, None);
    let st = p.with_list(st, vec![emb]);
    p.type_("S", st);
    p.check();
    assert_eq!(p.messages(), vec!["embedded type cannot be a pointer".to_string()]);
}

#[test]
fn undefined_type_is_reported_once() {
    let mut p = Pkg::new();
    let missing = p.name("Missing");
    p.type_("T", missing);
    let (t1, t2) = (p.name("T"), p.name("T"));
    p.var("a", Some(t1), None);
    p.var("b", Some(t2), None);
    p.check();
    let undefined = p.messages().iter().filter(|m| m.starts_with("undefined")).count();
    assert_eq!(undefined, 1);
    assert_eq!(p.messages()[0], "undefined: Missing");
}
