// Copyright (c) 2025 knix
// All rights reserved.

//! Reader for the object file symbol table format.
//!
//! ```text
//! magic     "\x00\x00go13ld", then the version byte 1
//! deps      strings, ended by an empty string
//! refs      0xfe name version, ... ended by 0xff
//! data      length, then the bytes every symbol slices its content from
//! syms      0xfe symbol, ...
//! magic     "\xff\xffgo13ld", whose first byte ends the symbols
//! ```
//!
//! Integers are zig-zag varints. A string is a length and that many bytes. A
//! data item is a length into the data block. A symbol reference is an index
//! into the ref table, 0 meaning none.
//!
//! Symbol:
//! kind, name ref, flags (1 dupok, 2 local), size, type ref, data, nreloc,
//! then nreloc times: off, siz, kind, add, sym ref.
//! Text symbols continue with args, locals, nosplit, flags (4 reflect method),
//! nauto autos (sym ref, offset, name kind, type ref), then the pcln tables:
//! pcsp, pcfile, pcline, npcdata data items, nfuncdata funcdata refs followed
//! by their nfuncdata offsets, nfile file refs.

use std::io::BufRead;

use anyhow::{Context, Result, bail};
use log::{debug, trace};

use crate::link::{Attrs, Auto, FuncInfo, LSymId, Link, Pcln, Reloc, SymKind};

pub const START_MAGIC: &[u8; 8] = b"\x00\x00go13ld";
pub const END_MAGIC: &[u8; 8] = b"\xff\xffgo13ld";
pub const VERSION: u8 = 1;
pub const SYNC: u8 = 0xfe;
pub const END: u8 = 0xff;

pub const FLAG_DUPOK: i64 = 1 << 0;
pub const FLAG_LOCAL: i64 = 1 << 1;
pub const FLAG_REFLECT_METHOD: i64 = 1 << 2;

/// Prefix of garbage collection bitmaps, which stay local to their object
const GCBITS_PREFIX: &str = "runtime.gcbits.";

/// Reads one object file of `length` bytes from `f` into `link`. `pkg`
/// replaces the `"".` placeholder in symbol names; `pn` names the file in
/// messages.
pub fn ldobjfile<R: BufRead>(link: &mut Link, f: &mut R, pkg: &str, length: u64, pn: &str) -> Result<()> {
    let mut r = ObjReader { f, pkg, pn, offset: 0, rdbuf: Vec::new(), data: Vec::new(), data_pos: 0 };
    link.inc_version();
    debug!("reading {} for package {} at version {}", pn, pkg, link.version);

    let mut magic = [0u8; 8];
    r.read_exact(&mut magic)?;
    if &magic != START_MAGIC {
        bail!("{}: invalid file start {:02x?}", pn, magic);
    }
    let version = r.read_byte()?;
    if version != VERSION {
        bail!("{}: invalid file version number {}", pn, version);
    }

    loop {
        let lib = r.rdstring()?;
        if lib.is_empty() {
            break;
        }
        link.addlib(&lib, pn);
    }

    link.cur_refs = vec![None];
    loop {
        if r.peek_byte()? == END {
            r.read_byte()?;
            break;
        }
        r.readref(link)?;
    }

    let data_len = r.rdint64()?;
    let data_len = usize::try_from(data_len).with_context(|| format!("{}: invalid data length {}", pn, data_len))?;
    let mut data = vec![0u8; data_len];
    r.read_exact(&mut data)?;
    r.data = data;

    loop {
        if r.peek_byte()? == END {
            break;
        }
        r.readsym(link)?;
    }

    let mut magic = [0u8; 8];
    r.read_exact(&mut magic)?;
    if &magic != END_MAGIC {
        bail!("{}: invalid file end", pn);
    }
    if r.offset != length {
        bail!("{}: unexpected end at {}, want {}", pn, r.offset, length);
    }
    Ok(())
}

struct ObjReader<'a, R: BufRead> {
    f: &'a mut R,
    pkg: &'a str,
    pn: &'a str,
    /// Bytes consumed so far
    offset: u64,
    /// Scratch space for names and strings
    rdbuf: Vec<u8>,
    data: Vec<u8>,
    data_pos: usize,
}

impl<R: BufRead> ObjReader<'_, R> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.f.read_exact(buf).with_context(|| format!("{}: error reading input", self.pn))?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn peek_byte(&mut self) -> Result<u8> {
        let buf = self.f.fill_buf().with_context(|| format!("{}: peeking", self.pn))?;
        match buf.first() {
            Some(b) => Ok(*b),
            None => bail!("{}: peeking: unexpected end of file", self.pn),
        }
    }

    fn rdint64(&mut self) -> Result<i64> {
        let mut uv: u64 = 0;
        let mut shift = 0;
        loop {
            if shift >= 64 {
                bail!("{}: corrupt input", self.pn);
            }
            let c = self.read_byte()?;
            uv |= ((c & 0x7f) as u64) << shift;
            if c & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(((uv >> 1) as i64) ^ -((uv & 1) as i64))
    }

    fn rdint(&mut self) -> Result<i64> {
        self.rdint64()
    }

    fn rdint32(&mut self) -> Result<i32> {
        let n = self.rdint64()?;
        i32::try_from(n).map_err(|_| anyhow::anyhow!("{}: {} out of range for int32", self.pn, n))
    }

    fn rdint16(&mut self) -> Result<i16> {
        let n = self.rdint64()?;
        i16::try_from(n).map_err(|_| anyhow::anyhow!("{}: {} out of range for int16", self.pn, n))
    }

    fn rduint8(&mut self) -> Result<u8> {
        let n = self.rdint64()?;
        u8::try_from(n).map_err(|_| anyhow::anyhow!("{}: {} out of range for uint8", self.pn, n))
    }

    fn rdlen(&mut self) -> Result<usize> {
        let n = self.rdint()?;
        usize::try_from(n).map_err(|_| anyhow::anyhow!("{}: invalid length {}", self.pn, n))
    }

    /// Reads `n` bytes into the scratch buffer
    fn rdbytes(&mut self, n: usize) -> Result<()> {
        let mut buf = std::mem::take(&mut self.rdbuf);
        buf.clear();
        buf.resize(n, 0);
        let res = self.read_exact(&mut buf);
        self.rdbuf = buf;
        res
    }

    fn rdstring(&mut self) -> Result<String> {
        let n = self.rdlen()?;
        self.rdbytes(n)?;
        Ok(String::from_utf8_lossy(&self.rdbuf).into_owned())
    }

    /// A symbol name with every `"".` replaced by the package path
    fn rdsym_name(&mut self) -> Result<String> {
        let n = self.rdlen()?;
        if n == 0 {
            self.rdint64()?;
            return Ok(String::new());
        }
        self.rdbytes(n)?;
        let orig = String::from_utf8_lossy(&self.rdbuf);
        Ok(orig.replace("\"\".", &format!("{}.", self.pkg)))
    }

    /// The next `n` bytes of the data block
    fn rddata(&mut self) -> Result<Vec<u8>> {
        let n = self.rdlen()?;
        let end = self.data_pos + n;
        if end > self.data.len() {
            bail!("{}: data item of {} bytes overruns the data block", self.pn, n);
        }
        let p = self.data[self.data_pos..end].to_vec();
        self.data_pos = end;
        Ok(p)
    }

    fn rdsym(&mut self, link: &Link) -> Result<Option<LSymId>> {
        let i = self.rdint()?;
        match usize::try_from(i).ok().and_then(|i| link.cur_refs.get(i)) {
            Some(s) => Ok(*s),
            None => bail!("{}: symbol reference {} out of range", self.pn, i),
        }
    }

    fn readref(&mut self, link: &mut Link) -> Result<()> {
        if self.read_byte()? != SYNC {
            bail!("{}: readref out of sync", self.pn);
        }
        let name = self.rdsym_name()?;
        let v = self.rdint()?;
        let v = match v {
            0 => 0,
            1 => link.version,
            v => bail!("{}: invalid symbol version {}", self.pn, v),
        };
        let s = link.lookup(&name, v);
        link.cur_refs.push(Some(s));
        if v != 0 {
            return Ok(());
        }

        let sym = link.sym(s);
        if name.starts_with('$') && name.len() > 5 && sym.kind == SymKind::NONE && sym.data.is_empty() {
            materialize_constant(link, s, &name)?;
        }
        if name.starts_with(GCBITS_PREFIX) {
            link.sym_mut(s).attrs.insert(Attrs::LOCAL);
        }
        Ok(())
    }

    fn readsym(&mut self, link: &mut Link) -> Result<()> {
        if self.read_byte()? != SYNC {
            bail!("{}: readsym out of sync", self.pn);
        }
        let t = SymKind(self.rdint16()?);
        let Some(mut s) = self.rdsym(link)? else {
            bail!("{}: symbol definition without a name", self.pn);
        };
        let flags = self.rdint()?;
        let dupok = flags & FLAG_DUPOK != 0;
        let local = flags & FLAG_LOCAL != 0;
        let size = self.rdint()?;
        let typ = self.rdsym(link)?;
        let data = self.rddata()?;
        let nreloc = self.rdlen()?;

        let mut dup = None;
        let existing = link.sym(s);
        if existing.is_defined() {
            // A size-only declaration merges into whatever is there
            if t.is_data_or_bss() && data.is_empty() && nreloc == 0 {
                trace!("merging declaration of {} (size {})", existing.name, size);
                let sym = link.sym_mut(s);
                sym.size = sym.size.max(size);
                if sym.gotype.is_none() {
                    sym.gotype = typ;
                }
                return Ok(());
            }
            let placeholder = existing.kind.is_data_or_bss() && existing.data.is_empty() && existing.relocs.is_empty();
            if !placeholder {
                if !existing.kind.is_bss() && !dupok && !existing.attrs.has(Attrs::DUPLICATE_OK) {
                    bail!(
                        "duplicate symbol {} (types {} and {}) in {} and {}",
                        existing.name,
                        existing.kind.0,
                        t.0,
                        existing.file,
                        self.pn
                    );
                }
                if !existing.data.is_empty() {
                    debug!("duplicate definition of {} from {} discarded", existing.name, self.pn);
                    dup = Some(s);
                    s = link.dup;
                }
            }
        }

        if t == SymKind::XREF {
            bail!("{}: bad sxref", self.pn);
        }
        if t == SymKind::NONE {
            bail!("{}: missing type for {}", self.pn, link.sym(s).name);
        }
        {
            let sym = link.sym_mut(s);
            sym.file = self.pkg.to_string();
            if dupok {
                sym.attrs.insert(Attrs::DUPLICATE_OK);
            }
            let t = if t == SymKind::BSS && (sym.kind == SymKind::RODATA || sym.kind == SymKind::NOPTRBSS) {
                sym.kind
            } else {
                t
            };
            sym.kind = t;
            sym.size = sym.size.max(size);
            sym.attrs.set(Attrs::LOCAL, local);
            if typ.is_some() {
                sym.gotype = typ;
            }
            sym.data = data;
        }
        // A bss symbol defined more than once takes its type from any definition
        if let (Some(d), Some(_)) = (dup, typ) {
            link.sym_mut(d).gotype = typ;
        }

        let mut relocs = Vec::with_capacity(nreloc);
        for _ in 0..nreloc {
            relocs.push(Reloc {
                off: self.rdint32()?,
                siz: self.rduint8()?,
                kind: self.rdint32()?,
                add: self.rdint64()?,
                sym: self.rdsym(link)?,
            });
        }
        link.sym_mut(s).relocs = relocs;

        if link.sym(s).kind == SymKind::TEXT {
            let func = self.rdfunc(link, s)?;
            link.sym_mut(s).func = Some(Box::new(func));
            if dup.is_none() {
                let sym = link.sym_mut(s);
                if sym.attrs.has(Attrs::ON_LIST) {
                    bail!("symbol {} listed multiple times", sym.name);
                }
                sym.attrs.insert(Attrs::ON_LIST);
                link.textp.push(s);
            }
        }
        Ok(())
    }

    fn rdfunc(&mut self, link: &mut Link, s: LSymId) -> Result<FuncInfo> {
        let args = self.rdint32()?;
        let locals = self.rdint32()?;
        if self.rduint8()? != 0 {
            link.sym_mut(s).attrs.insert(Attrs::NO_SPLIT);
        }
        let flags = self.rdint()?;
        if flags & FLAG_REFLECT_METHOD != 0 {
            link.sym_mut(s).attrs.insert(Attrs::REFLECT_METHOD);
        }
        let n = self.rdlen()?;
        let mut autom = Vec::with_capacity(n);
        for _ in 0..n {
            autom.push(Auto {
                asym: self.rdsym(link)?,
                aoffset: self.rdint32()?,
                name: self.rdint16()?,
                gotype: self.rdsym(link)?,
            });
        }

        let mut pc = Pcln { pcsp: self.rddata()?, pcfile: self.rddata()?, pcline: self.rddata()?, ..Pcln::default() };
        let n = self.rdlen()?;
        for _ in 0..n {
            pc.pcdata.push(self.rddata()?);
        }
        let n = self.rdlen()?;
        for _ in 0..n {
            pc.funcdata.push(self.rdsym(link)?);
        }
        for _ in 0..n {
            pc.funcdataoff.push(self.rdint64()?);
        }
        let n = self.rdlen()?;
        for _ in 0..n {
            pc.file.push(self.rdsym(link)?);
        }
        Ok(FuncInfo { args, locals, autom, pcln: pc })
    }
}

/// `$f32.`, `$f64.` and `$i64.` symbols name their own contents in hex
fn materialize_constant(link: &mut Link, s: LSymId, name: &str) -> Result<()> {
    let (prefix, hex) = match (name.get(..5), name.get(5..)) {
        (Some(prefix), Some(hex)) => (prefix, hex),
        _ => bail!("unrecognized $-symbol: {}", name),
    };
    let x = u64::from_str_radix(hex, 16).with_context(|| format!("failed to parse $-symbol {}", name))?;
    {
        let sym = link.sym_mut(s);
        sym.kind = SymKind::RODATA;
        sym.attrs.insert(Attrs::LOCAL);
    }
    match prefix {
        "$f32." => {
            let Ok(v) = u32::try_from(x) else {
                bail!("$-symbol {} too large: {}", name, x);
            };
            link.add_uint32(s, v);
        }
        "$f64." | "$i64." => link.add_uint64(s, x),
        _ => bail!("unrecognized $-symbol: {}", name),
    }
    debug!("materialized {} as {} bytes of rodata", name, link.sym(s).data.len());
    link.sym_mut(s).attrs.set(Attrs::REACHABLE, false);
    Ok(())
}
