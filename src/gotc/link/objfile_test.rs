// Copyright (c) 2025 knix
// All rights reserved.

use anyhow::Result;

use crate::link::objfile::{END, END_MAGIC, START_MAGIC, SYNC, ldobjfile};
use crate::link::objwriter::{AutoDef, FuncDef, ObjWriter, RelocDef, SymDef, sref, wrint, wrstring};
use crate::link::{Attrs, ByteOrder, Link, LinkConfig, SymKind};

fn load(link: &mut Link, pkg: &str, bytes: &[u8]) -> Result<()> {
    let mut r = bytes;
    ldobjfile(link, &mut r, pkg, bytes.len() as u64, "test.o")
}

fn obj(defs: &[SymDef]) -> Vec<u8> {
    let mut w = ObjWriter::new();
    for def in defs {
        w.add_sym(def);
    }
    w.finish()
}

fn defined_count(link: &Link) -> usize {
    link.syms.iter_with_ids().filter(|(id, s)| *id != link.dup && s.is_defined()).count()
}

#[test]
fn minimal_stream() -> Result<()> {
    let mut bytes = START_MAGIC.to_vec();
    bytes.push(1);
    wrstring(&mut bytes, "");
    bytes.push(SYNC);
    wrstring(&mut bytes, "x");
    wrint(&mut bytes, 0);
    bytes.push(END);
    wrint(&mut bytes, 0);
    bytes.extend_from_slice(END_MAGIC);

    let mut link = Link::new(LinkConfig::default());
    load(&mut link, "main", &bytes)?;
    assert_eq!(defined_count(&link), 0);
    assert!(link.textp.is_empty());
    assert_eq!(link.cur_refs.len(), 2);
    assert_eq!(link.cur_refs[1], link.rlookup("x", 0));
    Ok(())
}

#[test]
fn round_trip() -> Result<()> {
    let mut w = ObjWriter::new();
    w.add_dep("runtime");
    w.add_dep("fmt");

    let mut data = SymDef::new(SymKind::DATA, "\"\".table", 0).with_data(&[1, 2, 3, 4, 5, 6, 7, 8]);
    data.gotype = Some(sref("type.[2]int32", 0));
    data.relocs.push(RelocDef { off: 0, siz: 8, kind: 1, add: -4, sym: Some(sref("\"\".f", 0)) });
    w.add_sym(&data);

    let mut text = SymDef::new(SymKind::TEXT, "\"\".f", 0).with_data(&[0x90, 0xc3]);
    text.relocs.push(RelocDef { off: 1, siz: 4, kind: 3, add: 0, sym: Some(sref("runtime.morestack", 0)) });
    text.func = Some(FuncDef {
        args: 16,
        locals: 32,
        nosplit: true,
        reflect_method: true,
        autom: vec![AutoDef {
            asym: Some(sref("\"\".x", 1)),
            aoffset: -8,
            name: 2,
            gotype: Some(sref("type.int", 0)),
        }],
        pcsp: vec![2, 4],
        pcfile: vec![6],
        pcline: vec![8, 10, 12],
        pcdata: vec![vec![1], vec![]],
        funcdata: vec![(Some(sref("gclocals·1", 0)), 0), (None, 16)],
        files: vec![Some(sref("gofile..a.go", 0))],
    });
    w.add_sym(&text);

    let mut bss = SymDef::new(SymKind::BSS, "\"\".buf", 1);
    bss.size = 64;
    bss.local = true;
    w.add_sym(&bss);
    let bytes = w.finish();

    let mut link = Link::new(LinkConfig::default());
    load(&mut link, "main", &bytes)?;
    assert_eq!(link.libs.iter().map(|l| l.pkg.as_str()).collect::<Vec<_>>(), vec!["runtime", "fmt"]);

    let table = link.rlookup("main.table", 0).unwrap();
    let f = link.rlookup("main.f", 0).unwrap();
    let t = link.sym(table);
    assert_eq!(t.kind, SymKind::DATA);
    assert_eq!(t.data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(t.size, 8);
    assert_eq!(t.gotype, link.rlookup("type.[2]int32", 0));
    assert_eq!(t.relocs.len(), 1);
    assert_eq!((t.relocs[0].off, t.relocs[0].siz, t.relocs[0].add), (0, 8, -4));
    assert_eq!(t.relocs[0].sym, Some(f));
    assert_eq!(t.file, "main");

    let fs = link.sym(f);
    assert_eq!(fs.data, vec![0x90, 0xc3]);
    assert!(fs.attrs.has(Attrs::NO_SPLIT));
    assert!(fs.attrs.has(Attrs::REFLECT_METHOD));
    let func = fs.func.as_ref().unwrap();
    assert_eq!((func.args, func.locals), (16, 32));
    assert_eq!(func.autom.len(), 1);
    assert_eq!(func.autom[0].aoffset, -8);
    // Version 1 means local to this object
    assert_eq!(func.autom[0].asym, link.rlookup("main.x", link.version));
    assert_eq!(func.pcln.pcsp, vec![2, 4]);
    assert_eq!(func.pcln.pcfile, vec![6]);
    assert_eq!(func.pcln.pcline, vec![8, 10, 12]);
    assert_eq!(func.pcln.pcdata, vec![vec![1], vec![]]);
    assert_eq!(func.pcln.funcdata, vec![link.rlookup("gclocals·1", 0), None]);
    assert_eq!(func.pcln.funcdataoff, vec![0, 16]);
    assert_eq!(func.pcln.file, vec![link.rlookup("gofile..a.go", 0)]);
    assert_eq!(link.textp, vec![f]);

    let buf = link.rlookup("main.buf", link.version).unwrap();
    let b = link.sym(buf);
    assert_eq!((b.kind, b.size), (SymKind::BSS, 64));
    assert!(b.attrs.has(Attrs::LOCAL));
    assert!(b.data.is_empty());

    let dump = link.dump();
    assert!(dump.contains("main.table<0> kind=38 size=8 type=type.[2]int32\n\trel 0+8 t=1 main.f+-4\n"), "{}", dump);
    assert!(dump.contains("\ntext main.f\n"), "{}", dump);
    assert!(dump.ends_with("lib runtime (from test.o)\nlib fmt (from test.o)\n"), "{}", dump);
    Ok(())
}

#[test]
fn placeholder_definitions_merge() -> Result<()> {
    let mut small = SymDef::new(SymKind::BSS, "buf", 0);
    small.size = 8;
    let mut large = small.clone();
    large.size = 16;
    large.gotype = Some(sref("type.[16]uint8", 0));
    let mut link = Link::new(LinkConfig::default());
    load(&mut link, "main", &obj(&[small.clone(), large]))?;
    load(&mut link, "main", &obj(&[small]))?;

    let s = link.sym(link.rlookup("buf", 0).unwrap());
    assert_eq!(s.size, 16);
    assert_eq!(s.gotype, link.rlookup("type.[16]uint8", 0));
    assert_eq!(defined_count(&link), 1);
    Ok(())
}

#[test]
fn placeholder_is_overwritten_by_content() -> Result<()> {
    let mut decl = SymDef::new(SymKind::BSS, "v", 0);
    decl.size = 4;
    let def = SymDef::new(SymKind::DATA, "v", 0).with_data(&[9, 9, 9, 9]);
    let mut link = Link::new(LinkConfig::default());
    load(&mut link, "main", &obj(&[decl]))?;
    load(&mut link, "main", &obj(&[def]))?;
    let s = link.sym(link.rlookup("v", 0).unwrap());
    assert_eq!(s.kind, SymKind::DATA);
    assert_eq!(s.data, vec![9, 9, 9, 9]);
    Ok(())
}

#[test]
fn duplicate_definitions() -> Result<()> {
    let first = SymDef::new(SymKind::DATA, "x", 0).with_data(&[1]);
    let second = SymDef::new(SymKind::DATA, "x", 0).with_data(&[2]);
    let mut link = Link::new(LinkConfig::default());
    load(&mut link, "a", &obj(&[first.clone()]))?;
    let err = load(&mut link, "b", &obj(&[second.clone()])).unwrap_err();
    assert!(err.to_string().starts_with("duplicate symbol x (types 38 and 38) in a and test.o"), "{}", err);

    // Allowed duplicates are read into a throwaway symbol
    let mut dupok = second;
    dupok.dupok = true;
    let mut link = Link::new(LinkConfig::default());
    load(&mut link, "a", &obj(&[first]))?;
    load(&mut link, "b", &obj(&[dupok]))?;
    let x = link.sym(link.rlookup("x", 0).unwrap());
    assert_eq!(x.data, vec![1]);
    assert_eq!(x.file, "a");
    assert_eq!(link.sym(link.dup).data, vec![2]);
    Ok(())
}

#[test]
fn text_symbol_listed_once() -> Result<()> {
    let f = SymDef::new(SymKind::TEXT, "f", 0);
    let mut again = f.clone();
    again.dupok = true;
    let mut link = Link::new(LinkConfig::default());
    load(&mut link, "main", &obj(&[f]))?;
    let err = load(&mut link, "main", &obj(&[again])).unwrap_err();
    assert_eq!(err.to_string(), "symbol f listed multiple times");
    Ok(())
}

#[test]
fn package_placeholder_and_versions() -> Result<()> {
    let local = SymDef::new(SymKind::DATA, "\"\".s", 1).with_data(&[1]);
    let mut link = Link::new(LinkConfig::default());
    load(&mut link, "strings", &obj(&[local.clone()]))?;
    let v1 = link.version;
    // The same local name in another object is another symbol
    load(&mut link, "strings", &obj(&[local]))?;
    assert_ne!(v1, link.version);
    assert!(link.rlookup("strings.s", v1).is_some());
    assert!(link.rlookup("strings.s", link.version).is_some());
    assert_eq!(defined_count(&link), 2);
    Ok(())
}

#[test]
fn constant_symbols_are_materialized() -> Result<()> {
    let mut def = SymDef::new(SymKind::DATA, "consts", 0).with_data(&[0; 8]);
    for (i, name) in ["$f64.3ff0000000000000", "$f32.3f800000", "runtime.gcbits.01"].iter().enumerate() {
        def.relocs.push(RelocDef { off: i as i32, siz: 1, kind: 1, add: 0, sym: Some(sref(name, 0)) });
    }
    let mut link = Link::new(LinkConfig { byte_order: ByteOrder::Little });
    load(&mut link, "main", &obj(&[def]))?;

    let f64s = link.sym(link.rlookup("$f64.3ff0000000000000", 0).unwrap());
    assert_eq!(f64s.kind, SymKind::RODATA);
    assert_eq!(f64s.data, 0x3ff0000000000000u64.to_le_bytes().to_vec());
    assert!(f64s.attrs.has(Attrs::LOCAL));
    assert!(!f64s.attrs.has(Attrs::REACHABLE));
    let f32s = link.sym(link.rlookup("$f32.3f800000", 0).unwrap());
    assert_eq!(f32s.data, vec![0x00, 0x00, 0x80, 0x3f]);
    assert_eq!(f32s.size, 4);
    assert!(link.sym(link.rlookup("runtime.gcbits.01", 0).unwrap()).attrs.has(Attrs::LOCAL));

    let mut big = Link::new(LinkConfig { byte_order: ByteOrder::Big });
    let def = SymDef::new(SymKind::DATA, "d", 0).with_data(&[0]);
    let mut w = ObjWriter::new();
    w.add_ref(&sref("$i64.0102", 0));
    w.add_sym(&def);
    load(&mut big, "main", &w.finish())?;
    let i64s = big.sym(big.rlookup("$i64.0102", 0).unwrap());
    assert_eq!(i64s.data, vec![0, 0, 0, 0, 0, 0, 1, 2]);
    Ok(())
}

#[test]
fn bad_constant_symbols() {
    for name in ["$f32.100000000", "$f64.xyz", "$abc.10"] {
        let mut w = ObjWriter::new();
        w.add_ref(&sref(name, 0));
        let mut link = Link::new(LinkConfig::default());
        assert!(load(&mut link, "main", &w.finish()).is_err(), "{}", name);
    }
}

#[test]
fn empty_names_skip_a_varint() -> Result<()> {
    let mut w = ObjWriter::new();
    w.add_ref(&sref("", 0));
    w.add_ref(&sref("y", 0));
    let mut link = Link::new(LinkConfig::default());
    load(&mut link, "main", &w.finish())?;
    assert_eq!(link.cur_refs.len(), 3);
    assert_eq!(link.cur_refs[2], link.rlookup("y", 0));
    Ok(())
}

#[test]
fn malformed_input() {
    let good = obj(&[SymDef::new(SymKind::DATA, "x", 0).with_data(&[1])]);
    let cases: Vec<(Vec<u8>, u64, &str)> = vec![
        (b"\x00\x00go12ld\x01".to_vec(), 9, "invalid file start"),
        ([&START_MAGIC[..], &[2u8][..]].concat(), 9, "invalid file version number 2"),
        (good.clone(), good.len() as u64 + 1, "unexpected end at"),
        (good[..good.len() - 3].to_vec(), good.len() as u64 - 3, "error reading input"),
        ([&START_MAGIC[..], &[1u8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff][..]].concat(), 19, "corrupt input"),
    ];
    for (bytes, len, want) in cases {
        let mut link = Link::new(LinkConfig::default());
        let mut r = bytes.as_slice();
        let err = ldobjfile(&mut link, &mut r, "main", len, "test.o").unwrap_err();
        assert!(format!("{:#}", err).contains(want), "{:#} does not mention {}", err, want);
    }
}
