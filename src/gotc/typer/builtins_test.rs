// Copyright (c) 2025 knix
// All rights reserved.

use crate::ast::{NodeId, Op};
use crate::typer::consts::Val;
use crate::typer::typer_test::Pkg;
use crate::typer::types::ChanDir;

fn slice_of(p: &mut Pkg, elem: &str) -> NodeId {
    let e = p.name(elem);
    p.slice_t(e)
}

/// `_ = x`
fn discard(p: &mut Pkg, x: NodeId) -> NodeId {
    let blank = p.name("_");
    p.assign(blank, x)
}

fn spread(p: &mut Pkg, call: NodeId) -> NodeId {
    p.t.node_mut(call).isddd = true;
    call
}

#[test]
fn append_spread_arity() {
    let mut p = Pkg::new();
    let ints = slice_of(&mut p, "int");
    let bytes = slice_of(&mut p, "byte");
    p.func("f", vec![("s", ints), ("b", bytes)], vec![], |p| {
        let s = p.name("s");
        let only_first = p.call_name("append", vec![s]);
        let only_first = spread(p, only_first);
        let (s, one, s2) = (p.name("s"), p.int(1), p.name("s"));
        let too_many = p.call_name("append", vec![s, one, s2]);
        let too_many = spread(p, too_many);
        let (b, xyz) = (p.name("b"), p.string("xyz"));
        let bytes_of_string = p.call_name("append", vec![b, xyz]);
        let bytes_of_string = spread(p, bytes_of_string);
        vec![discard(p, only_first), discard(p, too_many), discard(p, bytes_of_string)]
    });
    p.check();
    assert_eq!(
        p.messages(),
        vec!["cannot use ... on first argument to append".to_string(), "too many arguments to append".to_string()]
    );
}

#[test]
fn append_needs_a_slice() {
    let mut p = Pkg::new();
    let int = p.name("int");
    p.func("f", vec![("n", int)], vec![], |p| {
        let (n, one) = (p.name("n"), p.int(1));
        let call = p.call_name("append", vec![n, one]);
        let nil = p.name("nil");
        let nil_call = p.call_name("append", vec![nil]);
        vec![discard(p, call), discard(p, nil_call)]
    });
    p.check();
    p.assert_error("first argument to append must be slice; have ");
    p.assert_error("first argument to append must be typed slice; have untyped nil");
}

#[test]
fn make_size_arguments() {
    let mut p = Pkg::new();
    p.func("f", vec![], vec![], |p| {
        let sl = slice_of(p, "int");
        let no_len = p.call_name("make", vec![sl]);
        let sl = slice_of(p, "int");
        let (three, one) = (p.int(3), p.int(1));
        let inverted = p.call_name("make", vec![sl, three, one]);
        let (k, v) = (p.name("string"), p.name("int"));
        let m = p.map_t(k, v);
        let minus = p.int(-1);
        let negative = p.call_name("make", vec![m, minus]);
        let int = p.name("int");
        let two = p.int(2);
        let not_makeable = p.call_name("make", vec![int, two]);
        vec![discard(p, no_len), discard(p, inverted), discard(p, negative), discard(p, not_makeable)]
    });
    p.check();
    assert_eq!(
        p.messages(),
        vec![
            "missing len argument to make([]int)".to_string(),
            "len larger than cap in make([]int)".to_string(),
            "negative size argument in make(map[string]int)".to_string(),
            "cannot make type int".to_string(),
        ]
    );
}

#[test]
fn make_chan_with_string_buffer() {
    let mut p = Pkg::new();
    p.func("f", vec![], vec![], |p| {
        let int = p.name("int");
        let ch = p.chan_t(int, ChanDir::BOTH);
        let x = p.string("x");
        let mk = p.call_name("make", vec![ch, x]);
        vec![discard(p, mk)]
    });
    p.check();
    let msgs = p.messages();
    assert_eq!(msgs.len(), 1, "{:#?}", msgs);
    assert!(msgs[0].starts_with("non-integer buffer argument in make(chan int)"), "{}", msgs[0]);
}

#[test]
fn make_chan_defaults_its_buffer() {
    let mut p = Pkg::new();
    let mut made = None;
    p.func("f", vec![], vec![], |p| {
        let int = p.name("int");
        let ch = p.chan_t(int, ChanDir::BOTH);
        let four = p.lit(Val::Float(4.0));
        let mk = p.call_name("make", vec![ch, four]);
        made = Some(mk);
        vec![discard(p, mk)]
    });
    p.check();
    p.assert_clean();
    let mk = made.unwrap();
    assert_eq!(p.t.op(mk), Op::MakeChan);
    assert_eq!(p.typ_of(mk), "chan int");
    let buf = p.t.node(mk).left.unwrap();
    assert_eq!(p.typ_of(buf), "int");
}

#[test]
fn close_receive_only_channel() {
    let mut p = Pkg::new();
    let int = p.name("int");
    let recv = p.chan_t(int, ChanDir::RECV);
    p.func("f", vec![("c", recv)], vec![], |p| {
        let c = p.name("c");
        vec![p.call_name("close", vec![c])]
    });
    p.check();
    p.assert_error("(cannot close receive-only channel)");
}

#[test]
fn copy_arguments() {
    let mut p = Pkg::new();
    let ints = slice_of(&mut p, "int");
    let strs = slice_of(&mut p, "string");
    let bytes = slice_of(&mut p, "byte");
    let int = p.name("int");
    p.func("f", vec![("s", ints), ("t", strs), ("b", bytes), ("n", int)], vec![], |p| {
        let (b, hi) = (p.name("b"), p.string("hi"));
        let from_string = p.call_name("copy", vec![b, hi]);
        let (s, t) = (p.name("s"), p.name("t"));
        let mixed = p.call_name("copy", vec![s, t]);
        let (n, n2) = (p.name("n"), p.name("n"));
        let scalars = p.call_name("copy", vec![n, n2]);
        let s = p.name("s");
        let one_arg = p.call_name("copy", vec![s]);
        vec![from_string, mixed, scalars, one_arg]
    });
    p.check();
    let msgs = p.messages();
    assert_eq!(msgs.len(), 3, "{:#?}", msgs);
    assert_eq!(msgs[0], "arguments to copy have different element types: []int and []string");
    assert!(msgs[1].starts_with("arguments to copy must be slices; have "), "{}", msgs[1]);
    assert_eq!(msgs[2], "missing arguments to copy");
}

#[test]
fn delete_arguments() {
    let mut p = Pkg::new();
    let (k, v) = (p.name("string"), p.name("int"));
    let m = p.map_t(k, v);
    let ints = slice_of(&mut p, "int");
    p.func("f", vec![("m", m), ("s", ints)], vec![], |p| {
        let (m, key) = (p.name("m"), p.string("k"));
        let ok = p.call_name("delete", vec![m, key]);
        let m = p.name("m");
        let no_key = p.call_name("delete", vec![m]);
        let (s, zero) = (p.name("s"), p.int(0));
        let not_map = p.call_name("delete", vec![s, zero]);
        vec![ok, no_key, not_map]
    });
    p.check();
    assert_eq!(
        p.messages(),
        vec![
            "missing second (key) argument to delete".to_string(),
            "first argument to delete must be map; have []int".to_string(),
        ]
    );
}

#[test]
fn complex_operands() {
    let mut p = Pkg::new();
    let (r1, r2) = (p.name("float64"), p.name("float64"));
    p.func("pair", vec![], vec![r1, r2], |p| {
        let (a, b) = (p.lit(Val::Float(1.0)), p.lit(Val::Float(2.0)));
        vec![p.ret(vec![a, b])]
    });
    let (single, double) = (p.name("float32"), p.name("float64"));
    let int = p.name("int");
    let mut from_pair = None;
    p.func("f", vec![("x", single), ("y", double), ("i", int)], vec![], |p| {
        let (x, y) = (p.name("x"), p.name("y"));
        let mixed = p.call_name("complex", vec![x, y]);
        let (i, i2) = (p.name("i"), p.name("i"));
        let ints = p.call_name("complex", vec![i, i2]);
        let pair = p.call_name("pair", vec![]);
        let c = p.call_name("complex", vec![pair]);
        from_pair = Some(c);
        vec![discard(p, mixed), discard(p, ints), discard(p, c)]
    });
    p.check();
    assert_eq!(p.messages().len(), 2, "{:#?}", p.messages());
    p.assert_error("(mismatched types float32 and float64)");
    p.assert_error("(arguments have type int, expected floating-point)");
    assert_eq!(p.typ_of(from_pair.unwrap()), "complex128");
}
