// Copyright (c) 2025 knix
// All rights reserved.

use std::fmt::{Display, Formatter};

use ahash::HashMapExt;
use fxhash::{FxHashMap, FxHashSet};

use crate::ast::{NodeId, Op};
use crate::nz_u32_id;
use crate::pool::Pool;
use crate::span::SpanId;
use crate::typer::syms::SymId;

nz_u32_id!(TypeId);

/// Width of a type whose layout has not been computed yet
pub const BADWIDTH: i64 = -1_000_000_000;
/// Arrays declared as `[...]T` start life with this bound
pub const DDD_BOUND: i64 = -100;
pub const SLICE_BOUND: i64 = -1;

/// The kind discriminator. The declaration order is significant: it is the
/// primary key of the backend's total order over types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EType {
    Int8 = 1,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Int,
    Uint,
    Uintptr,
    Complex64,
    Complex128,
    Float32,
    Float64,
    Bool,
    Ptr,
    Func,
    Array,
    Struct,
    Chan,
    Map,
    Inter,
    Forw,
    Any,
    String,
    UnsafePtr,
    Ideal,
    Nil,
    Blank,
}

impl Display for EType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EType::Int8 => "INT8",
            EType::Uint8 => "UINT8",
            EType::Int16 => "INT16",
            EType::Uint16 => "UINT16",
            EType::Int32 => "INT32",
            EType::Uint32 => "UINT32",
            EType::Int64 => "INT64",
            EType::Uint64 => "UINT64",
            EType::Int => "INT",
            EType::Uint => "UINT",
            EType::Uintptr => "UINTPTR",
            EType::Complex64 => "COMPLEX64",
            EType::Complex128 => "COMPLEX128",
            EType::Float32 => "FLOAT32",
            EType::Float64 => "FLOAT64",
            EType::Bool => "BOOL",
            EType::Ptr => "PTR64",
            EType::Func => "FUNC",
            EType::Array => "ARRAY",
            EType::Struct => "STRUCT",
            EType::Chan => "CHAN",
            EType::Map => "MAP",
            EType::Inter => "INTER",
            EType::Forw => "FORW",
            EType::Any => "ANY",
            EType::String => "STRING",
            EType::UnsafePtr => "TUNSAFEPTR",
            EType::Ideal => "IDEAL",
            EType::Nil => "NIL",
            EType::Blank => "BLANK",
        };
        f.write_str(s)
    }
}

impl EType {
    pub fn is_int(self) -> bool {
        self >= EType::Int8 && self <= EType::Uintptr
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            EType::Uint8 | EType::Uint16 | EType::Uint32 | EType::Uint64 | EType::Uint | EType::Uintptr
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, EType::Float32 | EType::Float64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, EType::Complex64 | EType::Complex128)
    }

    /// Untyped numeric constants allow everything an integer does
    fn is_int_or_ideal(self) -> bool {
        self.is_int() || self == EType::Ideal
    }

    pub fn ok_for_eq(self) -> bool {
        self.is_int_or_ideal()
            || self.is_float()
            || self.is_complex()
            || matches!(
                self,
                EType::Bool
                    | EType::String
                    | EType::Ptr
                    | EType::UnsafePtr
                    | EType::Inter
                    | EType::Chan
                    | EType::Map
                    | EType::Func
                    | EType::Array
                    | EType::Struct
                    | EType::Nil
            )
    }

    pub fn ok_for_cmp(self) -> bool {
        self.is_int_or_ideal() || self.is_float() || self == EType::String
    }

    pub fn ok_for_add(self) -> bool {
        self.is_int_or_ideal() || self.is_float() || self.is_complex() || self == EType::String
    }

    pub fn ok_for_and(self) -> bool {
        self.is_int_or_ideal()
    }

    pub fn ok_for_arith(self) -> bool {
        self.is_int_or_ideal() || self.is_float() || self.is_complex()
    }

    pub fn ok_for_bool(self) -> bool {
        self == EType::Bool
    }

    pub fn ok_for_len(self) -> bool {
        matches!(self, EType::Array | EType::Chan | EType::Map | EType::String)
    }

    pub fn ok_for_cap(self) -> bool {
        matches!(self, EType::Array | EType::Chan)
    }

    pub fn ok_for_const(self) -> bool {
        self.is_int_or_ideal() || self.is_float() || self.is_complex() || self == EType::Bool || self == EType::String
    }
}

/// Whether operator `op` is defined on operands of kind `et`
pub fn op_ok_for(op: Op, et: EType) -> bool {
    match op {
        Op::Add => et.ok_for_add(),
        Op::And | Op::AndNot | Op::Mod | Op::Or | Op::Xor | Op::Lsh | Op::Rsh | Op::Com => {
            et.ok_for_and()
        }
        Op::AndAnd | Op::OrOr | Op::Not => et.ok_for_bool(),
        Op::Div | Op::Mul | Op::Sub | Op::Minus | Op::Plus => et.ok_for_arith(),
        Op::Eq | Op::Ne => et.ok_for_eq(),
        Op::Ge | Op::Gt | Op::Le | Op::Lt => et.ok_for_cmp(),
        Op::Cap => et.ok_for_cap(),
        Op::Len => et.ok_for_len(),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChanDir(pub u8);

impl ChanDir {
    pub const RECV: ChanDir = ChanDir(1);
    pub const SEND: ChanDir = ChanDir(2);
    pub const BOTH: ChanDir = ChanDir(3);

    pub fn can_recv(self) -> bool {
        self.0 & ChanDir::RECV.0 != 0
    }

    pub fn can_send(self) -> bool {
        self.0 & ChanDir::SEND.0 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Embedding {
    #[default]
    None,
    Value,
    /// Embedded through an unnamed pointer, `*T`
    Pointer,
}

impl Embedding {
    pub fn is_embedded(self) -> bool {
        self != Embedding::None
    }
}

/// A struct field, an interface method, a function parameter, or a method
/// attached to a named type.
#[derive(Debug, Clone)]
pub struct Field {
    pub sym: Option<SymId>,
    pub nname: Option<NodeId>,
    pub typ: TypeId,
    /// Byte offset within the enclosing struct; BADWIDTH until laid out
    pub offset: i64,
    pub embedded: Embedding,
    pub isddd: bool,
    pub funarg: bool,
    pub broke: bool,
    pub nointerface: bool,
    pub note: Option<String>,
}

impl Field {
    pub fn new(sym: Option<SymId>, typ: TypeId) -> Field {
        Field {
            sym,
            nname: None,
            typ,
            offset: BADWIDTH,
            embedded: Embedding::None,
            isddd: false,
            funarg: false,
            broke: false,
            nointerface: false,
            note: None,
        }
    }

    /// Offset of the first byte after this field
    pub fn end(&self, types: &Types) -> i64 {
        self.offset + types.get(self.typ).width
    }
}

#[derive(Debug, Clone)]
pub struct FuncType {
    pub recvs: TypeId,
    pub params: TypeId,
    pub results: TypeId,
    pub outnamed: bool,
    pub argwid: i64,
}

#[derive(Debug, Clone)]
pub struct ArrayType {
    pub elem: TypeId,
    /// Non-negative: fixed size. Negative: slice. DDD_BOUND: `[...]T`
    pub bound: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MapRole {
    Bucket,
    Hmap,
    Hiter,
}

/// Marks a struct as one of the synthesized members of a map's type family
#[derive(Debug, Clone, Copy)]
pub struct MapPart {
    pub map: TypeId,
    pub role: MapRole,
}

#[derive(Debug, Clone)]
pub struct StructType {
    pub fields: Vec<Field>,
    pub funarg: bool,
    pub map_part: Option<MapPart>,
}

#[derive(Debug, Clone)]
pub struct ChanType {
    pub elem: TypeId,
    pub dir: ChanDir,
}

/// Runtime representation types of a map, created together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapFamily {
    pub bucket: TypeId,
    pub hmap: TypeId,
    pub hiter: TypeId,
}

#[derive(Debug, Clone)]
pub struct MapType {
    pub key: TypeId,
    pub val: TypeId,
    pub family: Option<MapFamily>,
}

#[derive(Debug, Clone)]
pub struct InterfaceType {
    pub methods: Vec<Field>,
}

#[derive(Debug, Clone, Default)]
pub struct ForwardType {
    /// Type declarations waiting for this type to be completed
    pub copyto: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Int,
    Uint,
    Uintptr,
    Complex64,
    Complex128,
    Float32,
    Float64,
    Bool,
    Ptr(TypeId),
    Func(FuncType),
    Array(ArrayType),
    Struct(StructType),
    Chan(ChanType),
    Map(MapType),
    Interface(InterfaceType),
    Forward(ForwardType),
    Any,
    String,
    UnsafePtr,
    Ideal,
    Nil,
    Blank,
}

impl TypeKind {
    pub fn etype(&self) -> EType {
        match self {
            TypeKind::Int8 => EType::Int8,
            TypeKind::Uint8 => EType::Uint8,
            TypeKind::Int16 => EType::Int16,
            TypeKind::Uint16 => EType::Uint16,
            TypeKind::Int32 => EType::Int32,
            TypeKind::Uint32 => EType::Uint32,
            TypeKind::Int64 => EType::Int64,
            TypeKind::Uint64 => EType::Uint64,
            TypeKind::Int => EType::Int,
            TypeKind::Uint => EType::Uint,
            TypeKind::Uintptr => EType::Uintptr,
            TypeKind::Complex64 => EType::Complex64,
            TypeKind::Complex128 => EType::Complex128,
            TypeKind::Float32 => EType::Float32,
            TypeKind::Float64 => EType::Float64,
            TypeKind::Bool => EType::Bool,
            TypeKind::Ptr(_) => EType::Ptr,
            TypeKind::Func(_) => EType::Func,
            TypeKind::Array(_) => EType::Array,
            TypeKind::Struct(_) => EType::Struct,
            TypeKind::Chan(_) => EType::Chan,
            TypeKind::Map(_) => EType::Map,
            TypeKind::Interface(_) => EType::Inter,
            TypeKind::Forward(_) => EType::Forw,
            TypeKind::Any => EType::Any,
            TypeKind::String => EType::String,
            TypeKind::UnsafePtr => EType::UnsafePtr,
            TypeKind::Ideal => EType::Ideal,
            TypeKind::Nil => EType::Nil,
            TypeKind::Blank => EType::Blank,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub sym: Option<SymId>,
    pub vargen: i32,
    /// The original type literal or predeclared type. A fresh type is its own
    /// original; completing a declaration keeps the literal's handle here.
    pub orig: TypeId,
    /// Canonical OTYPE node
    pub nod: Option<NodeId>,
    /// For interface methods: the signature expression, resolved after the
    /// declarations in flight settle
    pub nname: Option<NodeId>,
    pub methods: Vec<Field>,
    pub all_methods: Vec<Field>,
    pub width: i64,
    pub align: u8,
    pub noalg: bool,
    pub local: bool,
    pub broke: bool,
    pub deferwidth: bool,
    pub span: SpanId,
    /// First use of a forward type as a map key
    pub maplineno: Option<SpanId>,
    /// First use of a forward type as an embedded field
    pub embedlineno: Option<SpanId>,
}

impl Type {
    pub fn etype(&self) -> EType {
        self.kind.etype()
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind, TypeKind::Bool)
    }

    pub fn is_integer(&self) -> bool {
        self.etype().is_int()
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Int8 | TypeKind::Int16 | TypeKind::Int32 | TypeKind::Int64 | TypeKind::Int
        )
    }

    pub fn is_unsigned(&self) -> bool {
        self.etype().is_unsigned()
    }

    pub fn is_float(&self) -> bool {
        self.etype().is_float()
    }

    pub fn is_complex(&self) -> bool {
        self.etype().is_complex()
    }

    /// A real pointer: `*T`
    pub fn is_ptr(&self) -> bool {
        matches!(self.kind, TypeKind::Ptr(_))
    }

    /// Represented as a single machine pointer
    pub fn is_ptr_shaped(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Ptr(_)
                | TypeKind::UnsafePtr
                | TypeKind::Map(_)
                | TypeKind::Chan(_)
                | TypeKind::Func(_)
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, TypeKind::String)
    }

    pub fn is_map(&self) -> bool {
        matches!(self.kind, TypeKind::Map(_))
    }

    pub fn is_chan(&self) -> bool {
        matches!(self.kind, TypeKind::Chan(_))
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, TypeKind::Func(_))
    }

    pub fn is_slice(&self) -> bool {
        matches!(&self.kind, TypeKind::Array(a) if a.bound < 0)
    }

    pub fn is_array(&self) -> bool {
        matches!(&self.kind, TypeKind::Array(a) if a.bound >= 0)
    }

    pub fn is_ddd_array(&self) -> bool {
        matches!(&self.kind, TypeKind::Array(a) if a.bound == DDD_BOUND)
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct(_))
    }

    pub fn is_funarg(&self) -> bool {
        matches!(&self.kind, TypeKind::Struct(s) if s.funarg)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface(_))
    }

    pub fn is_forward(&self) -> bool {
        matches!(self.kind, TypeKind::Forward(_))
    }

    pub fn is_unsafe_ptr(&self) -> bool {
        matches!(self.kind, TypeKind::UnsafePtr)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.kind, TypeKind::Nil)
    }

    pub fn is_ideal(&self) -> bool {
        matches!(self.kind, TypeKind::Ideal)
    }

    pub fn as_func(&self) -> Option<&FuncType> {
        match &self.kind {
            TypeKind::Func(f) => Some(f),
            _ => None,
        }
    }

    pub fn expect_func(&self) -> &FuncType {
        match &self.kind {
            TypeKind::Func(f) => f,
            _ => panic!("expect_func called on: {}", self.etype()),
        }
    }

    pub fn expect_func_mut(&mut self) -> &mut FuncType {
        match &mut self.kind {
            TypeKind::Func(f) => f,
            k => panic!("expect_func_mut called on: {}", k.etype()),
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match &self.kind {
            TypeKind::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn expect_array(&self) -> &ArrayType {
        match &self.kind {
            TypeKind::Array(a) => a,
            _ => panic!("expect_array called on: {}", self.etype()),
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match &self.kind {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn expect_struct(&self) -> &StructType {
        match &self.kind {
            TypeKind::Struct(s) => s,
            _ => panic!("expect_struct called on: {}", self.etype()),
        }
    }

    pub fn as_map(&self) -> Option<&MapType> {
        match &self.kind {
            TypeKind::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn expect_map(&self) -> &MapType {
        match &self.kind {
            TypeKind::Map(m) => m,
            _ => panic!("expect_map called on: {}", self.etype()),
        }
    }

    pub fn as_chan(&self) -> Option<&ChanType> {
        match &self.kind {
            TypeKind::Chan(c) => Some(c),
            _ => None,
        }
    }

    pub fn expect_chan(&self) -> &ChanType {
        match &self.kind {
            TypeKind::Chan(c) => c,
            _ => panic!("expect_chan called on: {}", self.etype()),
        }
    }

    pub fn as_interface(&self) -> Option<&InterfaceType> {
        match &self.kind {
            TypeKind::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_forward_mut(&mut self) -> Option<&mut ForwardType> {
        match &mut self.kind {
            TypeKind::Forward(f) => Some(f),
            _ => None,
        }
    }

    /// Element type of pointer, array, slice, channel, and the value type of a map
    pub fn elem(&self) -> Option<TypeId> {
        match &self.kind {
            TypeKind::Ptr(e) => Some(*e),
            TypeKind::Array(a) => Some(a.elem),
            TypeKind::Chan(c) => Some(c.elem),
            TypeKind::Map(m) => Some(m.val),
            _ => None,
        }
    }

    /// Fields of a struct or methods of an interface
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            TypeKind::Struct(s) => &s.fields,
            TypeKind::Interface(i) => &i.methods,
            _ => panic!("fields: type {} does not have fields", self.etype()),
        }
    }

    pub fn fields_mut(&mut self) -> &mut Vec<Field> {
        match &mut self.kind {
            TypeKind::Struct(s) => &mut s.fields,
            TypeKind::Interface(i) => &mut i.methods,
            k => panic!("fields_mut: type {} does not have fields", k.etype()),
        }
    }

    /// Predeclared kinds with no substructure
    pub fn is_basic(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Bool
                | TypeKind::Float32
                | TypeKind::Float64
                | TypeKind::Complex64
                | TypeKind::Complex128
                | TypeKind::UnsafePtr
                | TypeKind::Uintptr
                | TypeKind::Int8
                | TypeKind::Int16
                | TypeKind::Int32
                | TypeKind::Int64
                | TypeKind::Int
                | TypeKind::Uint8
                | TypeKind::Uint16
                | TypeKind::Uint32
                | TypeKind::Uint64
                | TypeKind::Uint
        )
    }
}

const fn tid(n: u32) -> TypeId {
    TypeId::from_const(n)
}

pub const INT8_TYPE_ID: TypeId = tid(1);
pub const UINT8_TYPE_ID: TypeId = tid(2);
pub const INT16_TYPE_ID: TypeId = tid(3);
pub const UINT16_TYPE_ID: TypeId = tid(4);
pub const INT32_TYPE_ID: TypeId = tid(5);
pub const UINT32_TYPE_ID: TypeId = tid(6);
pub const INT64_TYPE_ID: TypeId = tid(7);
pub const UINT64_TYPE_ID: TypeId = tid(8);
pub const INT_TYPE_ID: TypeId = tid(9);
pub const UINT_TYPE_ID: TypeId = tid(10);
pub const UINTPTR_TYPE_ID: TypeId = tid(11);
pub const COMPLEX64_TYPE_ID: TypeId = tid(12);
pub const COMPLEX128_TYPE_ID: TypeId = tid(13);
pub const FLOAT32_TYPE_ID: TypeId = tid(14);
pub const FLOAT64_TYPE_ID: TypeId = tid(15);
pub const BOOL_TYPE_ID: TypeId = tid(16);
pub const STRING_TYPE_ID: TypeId = tid(17);
pub const UNSAFE_PTR_TYPE_ID: TypeId = tid(18);
pub const ANY_TYPE_ID: TypeId = tid(19);
/// Untyped numeric constants
pub const IDEAL_TYPE_ID: TypeId = tid(20);
pub const NIL_TYPE_ID: TypeId = tid(21);
pub const BLANK_TYPE_ID: TypeId = tid(22);
/// Named alias of uint8, kept apart for diagnostics
pub const BYTE_TYPE_ID: TypeId = tid(23);
/// Named alias of int32, kept apart for diagnostics
pub const RUNE_TYPE_ID: TypeId = tid(24);
pub const IDEAL_STRING_TYPE_ID: TypeId = tid(25);
pub const IDEAL_BOOL_TYPE_ID: TypeId = tid(26);
/// The predeclared `error` interface; completed by the universe setup
pub const ERROR_TYPE_ID: TypeId = tid(27);
/// `interface{}`, the type of `panic`'s argument and `recover`'s result
pub const EMPTY_INTERFACE_TYPE_ID: TypeId = tid(28);

const PREDECLARED_KINDS: [TypeKind; 28] = [
    TypeKind::Int8,
    TypeKind::Uint8,
    TypeKind::Int16,
    TypeKind::Uint16,
    TypeKind::Int32,
    TypeKind::Uint32,
    TypeKind::Int64,
    TypeKind::Uint64,
    TypeKind::Int,
    TypeKind::Uint,
    TypeKind::Uintptr,
    TypeKind::Complex64,
    TypeKind::Complex128,
    TypeKind::Float32,
    TypeKind::Float64,
    TypeKind::Bool,
    TypeKind::String,
    TypeKind::UnsafePtr,
    TypeKind::Any,
    TypeKind::Ideal,
    TypeKind::Nil,
    TypeKind::Blank,
    TypeKind::Uint8,
    TypeKind::Int32,
    TypeKind::String,
    TypeKind::Bool,
    TypeKind::Interface(InterfaceType { methods: Vec::new() }),
    TypeKind::Interface(InterfaceType { methods: Vec::new() }),
];

pub struct Types {
    pool: Pool<Type, TypeId>,
    ptr_cache: FxHashMap<TypeId, TypeId>,
}

impl Default for Types {
    fn default() -> Self {
        Types::new()
    }
}

impl Types {
    pub fn new() -> Types {
        let mut types = Types { pool: Pool::with_capacity("types", 1024), ptr_cache: FxHashMap::new() };
        for kind in PREDECLARED_KINDS {
            types.typ(kind, SpanId::NONE);
        }
        debug_assert!(matches!(types.get(INT8_TYPE_ID).kind, TypeKind::Int8));
        debug_assert!(matches!(types.get(BOOL_TYPE_ID).kind, TypeKind::Bool));
        debug_assert!(matches!(types.get(BYTE_TYPE_ID).kind, TypeKind::Uint8));
        debug_assert!(matches!(types.get(RUNE_TYPE_ID).kind, TypeKind::Int32));
        debug_assert!(matches!(types.get(ERROR_TYPE_ID).kind, TypeKind::Interface(_)));
        types
    }

    /// The predeclared type of a basic kind
    pub fn basic(et: EType) -> Option<TypeId> {
        let id = match et {
            EType::Int8 => INT8_TYPE_ID,
            EType::Uint8 => UINT8_TYPE_ID,
            EType::Int16 => INT16_TYPE_ID,
            EType::Uint16 => UINT16_TYPE_ID,
            EType::Int32 => INT32_TYPE_ID,
            EType::Uint32 => UINT32_TYPE_ID,
            EType::Int64 => INT64_TYPE_ID,
            EType::Uint64 => UINT64_TYPE_ID,
            EType::Int => INT_TYPE_ID,
            EType::Uint => UINT_TYPE_ID,
            EType::Uintptr => UINTPTR_TYPE_ID,
            EType::Complex64 => COMPLEX64_TYPE_ID,
            EType::Complex128 => COMPLEX128_TYPE_ID,
            EType::Float32 => FLOAT32_TYPE_ID,
            EType::Float64 => FLOAT64_TYPE_ID,
            EType::Bool => BOOL_TYPE_ID,
            EType::String => STRING_TYPE_ID,
            EType::UnsafePtr => UNSAFE_PTR_TYPE_ID,
            EType::Any => ANY_TYPE_ID,
            EType::Ideal => IDEAL_TYPE_ID,
            EType::Nil => NIL_TYPE_ID,
            EType::Blank => BLANK_TYPE_ID,
            _ => return None,
        };
        Some(id)
    }

    pub fn typ(&mut self, kind: TypeKind, span: SpanId) -> TypeId {
        let id = self.pool.next_id();
        self.pool.add(Type {
            kind,
            sym: None,
            vargen: 0,
            orig: id,
            nod: None,
            nname: None,
            methods: Vec::new(),
            all_methods: Vec::new(),
            width: BADWIDTH,
            align: 0,
            noalg: false,
            local: false,
            broke: false,
            deferwidth: false,
            span,
            maplineno: None,
            embedlineno: None,
        })
    }

    /// Shallow copy. A type that was its own original stays its own original.
    pub fn copy(&mut self, t: TypeId) -> TypeId {
        let mut nt = self.get(t).clone();
        let id = self.pool.next_id();
        if nt.orig == t {
            nt.orig = id;
        }
        self.pool.add(nt)
    }

    /// Overwrites the contents of `dst` with those of `src` while every holder of
    /// `dst` keeps its handle.
    pub fn overwrite(&mut self, dst: TypeId, src: TypeId) {
        if dst == src {
            return;
        }
        let (d, s) = self.pool.get_two_mut(dst, src);
        d.clone_from(s);
    }

    pub fn get(&self, t: TypeId) -> &Type {
        self.pool.get(t)
    }

    pub fn get_mut(&mut self, t: TypeId) -> &mut Type {
        self.pool.get_mut(t)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.pool.iter_with_ids()
    }

    pub fn etype(&self, t: TypeId) -> EType {
        self.get(t).etype()
    }

    pub fn ptr_to(&mut self, elem: TypeId) -> TypeId {
        if let Some(p) = self.ptr_cache.get(&elem) {
            return *p;
        }
        let p = self.typ(TypeKind::Ptr(elem), SpanId::NONE);
        self.ptr_cache.insert(elem, p);
        p
    }

    pub fn array_of(&mut self, elem: TypeId, bound: i64) -> TypeId {
        self.typ(TypeKind::Array(ArrayType { elem, bound }), SpanId::NONE)
    }

    pub fn slice_of(&mut self, elem: TypeId) -> TypeId {
        self.array_of(elem, SLICE_BOUND)
    }

    pub fn chan_of(&mut self, elem: TypeId, dir: ChanDir) -> TypeId {
        self.typ(TypeKind::Chan(ChanType { elem, dir }), SpanId::NONE)
    }

    /// Unchecked map constructor; key validation is the checker's job
    pub fn map_of(&mut self, key: TypeId, val: TypeId) -> TypeId {
        self.typ(TypeKind::Map(MapType { key, val, family: None }), SpanId::NONE)
    }

    pub fn struct_of(&mut self, fields: Vec<Field>) -> TypeId {
        self.typ(TypeKind::Struct(StructType { fields, funarg: false, map_part: None }), SpanId::NONE)
    }

    /// A parameter list: a struct flagged as funarg whose fields are too
    pub fn funarg_struct(&mut self, mut fields: Vec<Field>) -> TypeId {
        for f in fields.iter_mut() {
            f.funarg = true;
        }
        self.typ(TypeKind::Struct(StructType { fields, funarg: true, map_part: None }), SpanId::NONE)
    }

    pub fn interface_of(&mut self, methods: Vec<Field>) -> TypeId {
        self.typ(TypeKind::Interface(InterfaceType { methods }), SpanId::NONE)
    }

    pub fn func_of(&mut self, recvs: Vec<Field>, params: Vec<Field>, results: Vec<Field>) -> TypeId {
        let outnamed = results.first().is_some_and(|f| f.sym.is_some());
        let recvs = self.funarg_struct(recvs);
        let params = self.funarg_struct(params);
        let results = self.funarg_struct(results);
        self.typ(
            TypeKind::Func(FuncType { recvs, params, results, outnamed, argwid: BADWIDTH }),
            SpanId::NONE,
        )
    }

    pub fn forward(&mut self, span: SpanId) -> TypeId {
        self.typ(TypeKind::Forward(ForwardType::default()), span)
    }

    fn want(&self, t: TypeId, et: EType) -> &Type {
        let typ = self.get(t);
        if typ.etype() != et {
            panic!("want {}, but have {}", et, typ.etype())
        }
        typ
    }

    pub fn key(&self, t: TypeId) -> TypeId {
        self.want(t, EType::Map).expect_map().key
    }

    pub fn val(&self, t: TypeId) -> TypeId {
        self.want(t, EType::Map).expect_map().val
    }

    pub fn recvs(&self, t: TypeId) -> TypeId {
        self.want(t, EType::Func).expect_func().recvs
    }

    pub fn params(&self, t: TypeId) -> TypeId {
        self.want(t, EType::Func).expect_func().params
    }

    pub fn results(&self, t: TypeId) -> TypeId {
        self.want(t, EType::Func).expect_func().results
    }

    /// Receiver, parameter, and result lists of a function type, in that order
    pub fn recvs_params_results(&self, t: TypeId) -> [TypeId; 3] {
        let f = self.want(t, EType::Func).expect_func();
        [f.recvs, f.params, f.results]
    }

    pub fn recv(&self, t: TypeId) -> Option<&Field> {
        self.fields(self.recvs(t)).first()
    }

    pub fn fields(&self, t: TypeId) -> &[Field] {
        self.get(t).fields()
    }

    pub fn fields_mut(&mut self, t: TypeId) -> &mut Vec<Field> {
        self.get_mut(t).fields_mut()
    }

    pub fn field(&self, t: TypeId, i: usize) -> &Field {
        &self.fields(t)[i]
    }

    pub fn num_fields(&self, t: TypeId) -> usize {
        self.fields(t).len()
    }

    pub fn bound(&self, t: TypeId) -> i64 {
        self.want(t, EType::Array).expect_array().bound
    }

    pub fn elem(&self, t: TypeId) -> TypeId {
        match self.get(t).elem() {
            Some(e) => e,
            None => panic!("elem called on {}", self.etype(t)),
        }
    }

    pub fn chan_dir(&self, t: TypeId) -> ChanDir {
        self.want(t, EType::Chan).expect_chan().dir
    }

    pub fn is_variadic(&self, t: TypeId) -> bool {
        self.fields(self.params(t)).last().is_some_and(|f| f.isddd)
    }

    /// Language type identity. Named types are identical only to themselves,
    /// except that byte/uint8 and rune/int32 are interchangeable.
    pub fn eqtype(&self, t1: TypeId, t2: TypeId) -> bool {
        let mut assumed = FxHashSet::default();
        self.eqtype1(t1, t2, &mut assumed)
    }

    pub fn eqtype_opt(&self, t1: Option<TypeId>, t2: Option<TypeId>) -> bool {
        match (t1, t2) {
            (Some(a), Some(b)) => self.eqtype(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    fn eqtype1(&self, t1: TypeId, t2: TypeId, assumed: &mut FxHashSet<(TypeId, TypeId)>) -> bool {
        if t1 == t2 {
            return true;
        }
        let a = self.get(t1);
        let b = self.get(t2);
        if a.etype() != b.etype() || a.broke || b.broke {
            return false;
        }
        if a.sym.is_some() || b.sym.is_some() {
            return match a.etype() {
                EType::Uint8 => is_byte_alias(t1) && is_byte_alias(t2),
                EType::Int32 => is_rune_alias(t1) && is_rune_alias(t2),
                _ => false,
            };
        }
        if !assumed.insert((t1, t2)) {
            return true;
        }
        match (&a.kind, &b.kind) {
            (TypeKind::Struct(_), TypeKind::Struct(_))
            | (TypeKind::Interface(_), TypeKind::Interface(_)) => {
                let fa = a.fields();
                let fb = b.fields();
                if fa.len() != fb.len() {
                    return false;
                }
                fa.iter().zip(fb.iter()).all(|(x, y)| {
                    x.sym == y.sym
                        && x.embedded == y.embedded
                        && x.note == y.note
                        && self.eqtype1(x.typ, y.typ, assumed)
                })
            }
            (TypeKind::Func(fa), TypeKind::Func(fb)) => {
                // Receivers never matter for identity
                for (la, lb) in [(fa.params, fb.params), (fa.results, fb.results)] {
                    let xs = self.fields(la);
                    let ys = self.fields(lb);
                    if xs.len() != ys.len() {
                        return false;
                    }
                    for (x, y) in xs.iter().zip(ys.iter()) {
                        if x.isddd != y.isddd || !self.eqtype1(x.typ, y.typ, assumed) {
                            return false;
                        }
                    }
                }
                true
            }
            (TypeKind::Array(x), TypeKind::Array(y)) => {
                x.bound == y.bound && self.eqtype1(x.elem, y.elem, assumed)
            }
            (TypeKind::Chan(x), TypeKind::Chan(y)) => {
                x.dir == y.dir && self.eqtype1(x.elem, y.elem, assumed)
            }
            (TypeKind::Map(x), TypeKind::Map(y)) => {
                self.eqtype1(x.key, y.key, assumed) && self.eqtype1(x.val, y.val, assumed)
            }
            (TypeKind::Ptr(x), TypeKind::Ptr(y)) => self.eqtype1(*x, *y, assumed),
            _ => true,
        }
    }

    /// Whether values of this type can be compared with == at all; when not,
    /// the offending component type is returned.
    pub fn incomparable_component(&self, t: TypeId) -> Option<TypeId> {
        let mut seen = FxHashSet::default();
        self.incomparable1(t, &mut seen)
    }

    fn incomparable1(&self, t: TypeId, seen: &mut FxHashSet<TypeId>) -> Option<TypeId> {
        if !seen.insert(t) {
            return None;
        }
        let typ = self.get(t);
        if typ.noalg {
            return Some(t);
        }
        match &typ.kind {
            TypeKind::Func(_) | TypeKind::Map(_) | TypeKind::Any | TypeKind::Forward(_) => Some(t),
            TypeKind::Array(a) if a.bound < 0 => Some(t),
            TypeKind::Array(a) => self.incomparable1(a.elem, seen),
            TypeKind::Struct(s) => {
                for f in s.fields.iter() {
                    if let Some(bad) = self.incomparable1(f.typ, seen) {
                        return Some(bad);
                    }
                }
                None
            }
            _ => None,
        }
    }

    pub fn has_ddd_param(&self, t: TypeId) -> bool {
        self.fields(t).iter().any(|f| f.isddd)
    }

    // Backend view: the narrow surface the code generator consumes

    pub fn equal(&self, a: TypeId, b: TypeId) -> bool {
        self.eqtype(a, b)
    }

    pub fn elem_type(&self, t: TypeId) -> TypeId {
        match &self.get(t).kind {
            TypeKind::Array(a) => a.elem,
            TypeKind::Ptr(e) => *e,
            _ => panic!("ElemType on invalid type {}", self.etype(t)),
        }
    }

    pub fn field_type(&self, t: TypeId, i: usize) -> TypeId {
        self.field(t, i).typ
    }

    pub fn field_off(&self, t: TypeId, i: usize) -> i64 {
        self.field(t, i).offset
    }

    pub fn num_elem(&self, t: TypeId) -> i64 {
        match &self.get(t).kind {
            TypeKind::Array(a) => a.bound,
            _ => panic!("NumElem on non-array {}", self.etype(t)),
        }
    }

    /// Width of an already laid out type
    pub fn size(&self, t: TypeId) -> i64 {
        let w = self.get(t).width;
        if w == BADWIDTH {
            panic!("size of type {} before layout", t)
        }
        w
    }

    pub fn alignment(&self, t: TypeId) -> i64 {
        let _ = self.size(t);
        self.get(t).align as i64
    }
}

pub fn is_byte_alias(t: TypeId) -> bool {
    t == UINT8_TYPE_ID || t == BYTE_TYPE_ID
}

pub fn is_rune_alias(t: TypeId) -> bool {
    t == INT32_TYPE_ID || t == RUNE_TYPE_ID
}

/// Untyped constant types
pub fn is_untyped(t: TypeId) -> bool {
    t == IDEAL_TYPE_ID || t == IDEAL_STRING_TYPE_ID || t == IDEAL_BOOL_TYPE_ID || t == NIL_TYPE_ID
}

/// Entries per map bucket
pub const BUCKET_SIZE: i64 = 8;

impl Types {
    /// Builds the runtime representation types of a map once; later calls
    /// return the same family.
    pub fn map_family(&mut self, map: TypeId) -> MapFamily {
        let (key, val, family) = {
            let m = self.get(map).expect_map();
            (m.key, m.val, m.family)
        };
        if let Some(family) = family {
            return family;
        }
        let uint8 = UINT8_TYPE_ID;
        let keys = self.array_of(key, BUCKET_SIZE);
        let vals = self.array_of(val, BUCKET_SIZE);
        let tophash = self.array_of(uint8, BUCKET_SIZE);
        let bucket = self.typ(
            TypeKind::Struct(StructType { fields: Vec::new(), funarg: false, map_part: Some(MapPart { map, role: MapRole::Bucket }) }),
            crate::span::SpanId::NONE,
        );
        let bucket_ptr = self.ptr_to(bucket);
        let bucket_fields = vec![
            Field::new(None, tophash),
            Field::new(None, keys),
            Field::new(None, vals),
            Field::new(None, bucket_ptr),
        ];
        *self.fields_mut(bucket) = bucket_fields;

        let hmap_fields = vec![
            Field::new(None, INT_TYPE_ID),
            Field::new(None, UINT8_TYPE_ID),
            Field::new(None, UINT8_TYPE_ID),
            Field::new(None, UINT16_TYPE_ID),
            Field::new(None, UINT32_TYPE_ID),
            Field::new(None, bucket_ptr),
            Field::new(None, bucket_ptr),
            Field::new(None, UINTPTR_TYPE_ID),
            Field::new(None, UNSAFE_PTR_TYPE_ID),
        ];
        let hmap = self.typ(
            TypeKind::Struct(StructType { fields: hmap_fields, funarg: false, map_part: Some(MapPart { map, role: MapRole::Hmap }) }),
            crate::span::SpanId::NONE,
        );
        let hmap_ptr = self.ptr_to(hmap);
        let key_ptr = self.ptr_to(key);
        let val_ptr = self.ptr_to(val);
        let hiter_fields = vec![
            Field::new(None, key_ptr),
            Field::new(None, val_ptr),
            Field::new(None, UNSAFE_PTR_TYPE_ID),
            Field::new(None, hmap_ptr),
            Field::new(None, bucket_ptr),
            Field::new(None, bucket_ptr),
            Field::new(None, UINTPTR_TYPE_ID),
            Field::new(None, UINTPTR_TYPE_ID),
            Field::new(None, UINTPTR_TYPE_ID),
            Field::new(None, BOOL_TYPE_ID),
            Field::new(None, UINT8_TYPE_ID),
            Field::new(None, UINTPTR_TYPE_ID),
            Field::new(None, UNSAFE_PTR_TYPE_ID),
        ];
        let hiter = self.typ(
            TypeKind::Struct(StructType { fields: hiter_fields, funarg: false, map_part: Some(MapPart { map, role: MapRole::Hiter }) }),
            crate::span::SpanId::NONE,
        );
        for member in [bucket, hmap, hiter] {
            self.get_mut(member).noalg = true;
        }
        let family = MapFamily { bucket, hmap, hiter };
        if let TypeKind::Map(m) = &mut self.get_mut(map).kind {
            m.family = Some(family);
        }
        family
    }
}
