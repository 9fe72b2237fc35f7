// Copyright (c) 2025 knix
// All rights reserved.

use log::trace;

use crate::typer::Typer;
use crate::typer::types::*;

/// Marks a type whose layout is being computed
const WIDTH_IN_PROGRESS: i64 = -2;

/// Layout work postponed while declarations are still settling
#[derive(Debug, Clone, Copy)]
pub(crate) enum WidthJob {
    Type(TypeId),
    /// Argument frame of a function type
    FuncArgs(TypeId),
    /// Element size limit of a channel type
    ChanArgs(TypeId),
}

pub fn rnd(o: i64, r: i64) -> i64 {
    if !(1..=8).contains(&r) || r & (r - 1) != 0 {
        panic!("rnd {}", r);
    }
    (o + r - 1) & !(r - 1)
}

impl Typer {
    fn max_width(&self) -> i64 {
        if self.config.ptr_size == 8 { 1 << 50 } else { (1 << 32) - 1 }
    }

    fn ptr_width(&self) -> i64 {
        self.config.ptr_size as i64
    }

    fn reg_width(&self) -> i64 {
        self.config.reg_size as i64
    }

    fn int_width(&self) -> i64 {
        self.config.int_size as i64
    }

    /// Lays out the fields of `t` starting at offset `o`. `flag` is the
    /// minimum alignment; zero means the result is not rounded.
    fn widstruct(&mut self, errtype: TypeId, t: TypeId, o: i64, flag: i64) -> i64 {
        let starto = o;
        let mut o = o;
        let mut maxalign = flag.max(1);
        let mut lastzero = 0;
        let nfields = self.types.num_fields(t);
        for i in 0..nfields {
            let ft = self.types.field(t, i).typ;
            if self.types.get(ft).broke {
                continue;
            }
            self.dowidth(ft);
            let fty = self.types.get(ft);
            let (w, align) = (fty.width, fty.align as i64);
            if align > maxalign {
                maxalign = align;
            }
            if w < 0 {
                self.ice(format!("invalid width {} for field of {}", w, self.tstr(errtype)), None);
            }
            if align > 0 {
                o = rnd(o, align);
            }
            self.types.fields_mut(t)[i].offset = o;
            if let Some(nname) = self.types.field(t, i).nname {
                self.node_mut(nname).xoffset = o;
            }
            if w == 0 {
                lastzero = o;
            }
            o += w;
            if o >= self.max_width() {
                let msg = format!("type {} too large", self.tstr_long(errtype));
                self.yyerror(msg);
                o = 8;
            }
        }
        // A trailing zero-size field must not point past the end of the object
        if flag == 1 && o > starto && o == lastzero {
            o += 1;
        }
        if flag != 0 {
            o = rnd(o, maxalign);
        }
        let typ = self.types.get_mut(t);
        typ.align = maxalign as u8;
        typ.width = o - starto;
        o
    }

    /// Computes and caches the width and alignment of `t`
    pub fn dowidth(&mut self, t: TypeId) {
        let typ = self.types.get(t);
        let (width, broke, span) = (typ.width, typ.broke, typ.span);
        if width > 0 {
            return;
        }
        if width == WIDTH_IN_PROGRESS {
            if !broke {
                self.types.get_mut(t).broke = true;
                let span = self.types.get(t).span;
                let msg = format!("invalid recursive type {}", self.tstr(t));
                self.yyerror_at(span, msg);
            }
            self.types.get_mut(t).width = 0;
            return;
        }
        if broke && width == 0 {
            return;
        }

        self.defercalc += 1;
        let lno = self.lineno;
        if !span.is_none() {
            self.lineno = span;
        }
        {
            let typ = self.types.get_mut(t);
            typ.width = WIDTH_IN_PROGRESS;
            typ.align = 0;
        }

        let ptr = self.ptr_width();
        let reg = self.reg_width();
        let mut align: u8 = 0;
        let kind = self.types.get(t).kind.clone();
        let w: i64 = match kind {
            TypeKind::Int8 | TypeKind::Uint8 | TypeKind::Bool => 1,
            TypeKind::Int16 | TypeKind::Uint16 => 2,
            TypeKind::Int32 | TypeKind::Uint32 | TypeKind::Float32 => 4,
            TypeKind::Int64 | TypeKind::Uint64 | TypeKind::Float64 | TypeKind::Complex64 => {
                align = reg as u8;
                8
            }
            TypeKind::Int | TypeKind::Uint => {
                let w = self.int_width();
                if w == 8 {
                    align = reg as u8;
                }
                w
            }
            TypeKind::Uintptr | TypeKind::UnsafePtr => ptr,
            TypeKind::Complex128 => {
                align = reg as u8;
                16
            }
            TypeKind::Ptr(elem) => {
                self.checkwidth(elem);
                ptr
            }
            TypeKind::Interface(_) => {
                align = ptr as u8;
                self.offmod(t);
                2 * ptr
            }
            TypeKind::Chan(c) => {
                self.checkwidth(c.elem);
                self.queue_width_job(WidthJob::ChanArgs(t));
                ptr
            }
            TypeKind::Map(m) => {
                self.checkwidth(m.val);
                self.checkwidth(m.key);
                ptr
            }
            TypeKind::Forward(_) => {
                if !self.types.get(t).broke {
                    let msg = format!("invalid recursive type {}", self.tstr(t));
                    self.yyerror(msg);
                }
                1
            }
            TypeKind::Any | TypeKind::Ideal | TypeKind::Nil | TypeKind::Blank => {
                self.ice(format!("dowidth of {}", self.tstr(t)), None)
            }
            TypeKind::String => {
                align = ptr as u8;
                ptr + self.int_width()
            }
            TypeKind::Array(a) => {
                if a.bound == DDD_BOUND {
                    if !self.types.get(t).broke {
                        self.yyerror("use of [...] array outside of array literal");
                        self.types.get_mut(t).broke = true;
                    }
                    0
                } else if a.bound >= 0 {
                    self.dowidth(a.elem);
                    let elem = self.types.get(a.elem);
                    let (ew, ealign) = (elem.width, elem.align);
                    if ew != 0 {
                        let cap = (self.max_width() as u64 - 1) / ew as u64;
                        if a.bound as u64 > cap {
                            let msg = format!("type {} larger than address space", self.tstr_long(t));
                            self.yyerror(msg);
                        }
                    }
                    align = ealign;
                    a.bound.saturating_mul(ew)
                } else {
                    self.checkwidth(a.elem);
                    align = ptr as u8;
                    ptr + 2 * self.int_width()
                }
            }
            TypeKind::Struct(s) => {
                if s.funarg {
                    self.ice(format!("dowidth fn struct {}", self.tstr(t)), None);
                }
                self.widstruct(t, t, 0, 1);
                let typ = self.types.get(t);
                align = typ.align;
                typ.width
            }
            TypeKind::Func(_) => {
                self.queue_width_job(WidthJob::FuncArgs(t));
                ptr
            }
        };

        if ptr == 4 && w != w as i32 as i64 {
            let msg = format!("type {} too large", self.tstr(t));
            self.yyerror(msg);
        }
        if align == 0 {
            if w > 8 || (w & (w - 1)) != 0 {
                self.ice(format!("invalid alignment for {}", self.tstr(t)), None);
            }
            align = w.max(1) as u8;
        }
        let typ = self.types.get_mut(t);
        typ.width = w;
        typ.align = align;
        trace!("dowidth {} = {} align {}", t, w, align);

        self.lineno = lno;
        if self.defercalc == 1 {
            self.resumecheckwidth();
        } else {
            self.defercalc -= 1;
        }
    }

    /// Bucket, header and iterator types of map type `t`, laid out
    pub fn map_runtime_types(&mut self, t: TypeId) -> MapFamily {
        let family = self.types.map_family(t);
        for member in [family.bucket, family.hmap, family.hiter] {
            self.dowidth(member);
        }
        family
    }

    /// Lays out the receiver, parameter and result lists of a function type
    fn dofuncargs(&mut self, f: TypeId) {
        let [recvs, params, results] = self.types.recvs_params_results(f);
        let reg = self.reg_width();
        let w = self.widstruct(f, recvs, 0, 0);
        let w = self.widstruct(f, params, w, reg);
        let w = self.widstruct(f, results, w, reg);
        self.types.get_mut(f).expect_func_mut().argwid = w;
    }

    fn dochanargs(&mut self, c: TypeId) {
        let elem = self.types.elem(c);
        self.dowidth(elem);
        if self.types.get(elem).width >= 1 << 16 {
            self.yyerror("channel element type too large (>64kB)");
        }
    }

    /// Interface methods sit at consecutive pointer-sized slots
    fn offmod(&mut self, t: TypeId) {
        let ptr = self.ptr_width();
        let mut o = 0;
        for f in self.types.fields_mut(t).iter_mut() {
            f.offset = o;
            o += ptr;
            if o >= (1 << 50) {
                panic!("interface too large");
            }
        }
    }

    fn run_width_job(&mut self, job: WidthJob) {
        match job {
            WidthJob::Type(t) => self.dowidth(t),
            WidthJob::FuncArgs(t) => self.dofuncargs(t),
            WidthJob::ChanArgs(t) => self.dochanargs(t),
        }
    }

    fn queue_width_job(&mut self, job: WidthJob) {
        if self.defercalc == 0 {
            self.run_width_job(job);
        } else {
            self.deferred_width.push(job);
        }
    }

    /// Lays out `t` now, or later if layout is currently deferred
    pub fn checkwidth(&mut self, t: TypeId) {
        if self.types.get(t).is_funarg() {
            self.ice(format!("checkwidth {}", self.tstr(t)), None);
        }
        if self.defercalc == 0 {
            self.dowidth(t);
            return;
        }
        if self.types.get(t).deferwidth {
            return;
        }
        self.types.get_mut(t).deferwidth = true;
        self.deferred_width.push(WidthJob::Type(t));
    }

    pub fn defercheckwidth(&mut self) {
        if self.defercalc != 0 && self.nerrors == 0 {
            self.ice("defercheckwidth while already deferring", None);
        }
        self.defercalc = 1;
    }

    pub fn resumecheckwidth(&mut self) {
        if self.defercalc == 0 {
            self.ice("resumecheckwidth without defercheckwidth", None);
        }
        while let Some(job) = self.deferred_width.pop() {
            if let WidthJob::Type(t) = job {
                self.types.get_mut(t).deferwidth = false;
            }
            self.run_width_job(job);
        }
        self.defercalc = 0;
    }
}
