// Copyright (c) 2025 knix
// All rights reserved.

//! The expression/statement tree handed to the checker by the parser.
//!
//! Nodes live in one arena and reference each other by `NodeId`. The checker
//! annotates nodes in place: it fills in `typ`, may rewrite `op` to a more
//! specific operation, and may splice in new nodes (implicit conversions,
//! implicit `&x`/`*x`).

use std::fmt::{Display, Formatter};

use crate::nz_u32_id;
use crate::pool::Pool;
use crate::span::SpanId;
use crate::typer::consts::Val;
use crate::typer::syms::SymId;
use crate::typer::types::{ChanDir, TypeId};

nz_u32_id!(NodeId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Xxx,

    // names and literals
    Name,
    NoName,
    Type,
    Pack,
    Literal,

    // expressions
    Add,
    Sub,
    Or,
    Xor,
    AddStr,
    Addr,
    AndAnd,
    Append,
    As,
    As2,
    As2Func,
    As2Recv,
    As2MapR,
    As2DotType,
    AsOp,
    Call,
    CallFunc,
    CallMeth,
    CallInter,
    CallPart,
    Cap,
    Close,
    Closure,
    CompLit,
    MapLit,
    StructLit,
    ArrayLit,
    PtrLit,
    Conv,
    ConvIface,
    ConvNop,
    Copy,
    Dcl,
    DclFunc,
    DclField,
    DclConst,
    DclType,
    Delete,
    Dot,
    DotPtr,
    DotMeth,
    DotInter,
    XDot,
    DotType,
    DotType2,
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
    Ind,
    Index,
    IndexMap,
    Key,
    Len,
    Make,
    MakeChan,
    MakeMap,
    MakeSlice,
    Mul,
    Div,
    Mod,
    Lsh,
    Rsh,
    And,
    AndNot,
    New,
    Not,
    Com,
    Plus,
    Minus,
    OrOr,
    Panic,
    Print,
    PrintN,
    Paren,
    Send,
    Slice,
    SliceArr,
    SliceStr,
    Slice3,
    Slice3Arr,
    Recover,
    Recv,
    Real,
    Imag,
    Complex,

    // statements
    Block,
    Break,
    Case,
    XCase,
    Continue,
    Defer,
    Empty,
    Fall,
    XFall,
    For,
    Goto,
    If,
    Label,
    Proc,
    Range,
    Return,
    Select,
    Switch,
    TypeSw,

    // type expressions
    TChan,
    TMap,
    TStruct,
    TInter,
    TFunc,
    TArray,

    // misc
    Ddd,
}

impl Op {
    /// How the operator is spelled in source, for diagnostics
    pub fn spelling(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Or => "|",
            Op::Xor => "^",
            Op::AddStr => "+",
            Op::Addr => "&",
            Op::AndAnd => "&&",
            Op::Append => "append",
            Op::As => "=",
            Op::As2 => "=",
            Op::AsOp => "op=",
            Op::Cap => "cap",
            Op::Close => "close",
            Op::Complex => "complex",
            Op::Copy => "copy",
            Op::Delete => "delete",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::Gt => ">",
            Op::Ind => "*",
            Op::Len => "len",
            Op::Make => "make",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Lsh => "<<",
            Op::Rsh => ">>",
            Op::And => "&",
            Op::AndNot => "&^",
            Op::New => "new",
            Op::Not => "!",
            Op::Com => "^",
            Op::Plus => "+",
            Op::Minus => "-",
            Op::OrOr => "||",
            Op::Panic => "panic",
            Op::Print => "print",
            Op::PrintN => "println",
            Op::Send => "<-",
            Op::Recv => "<-",
            Op::Recover => "recover",
            Op::Real => "real",
            Op::Imag => "imag",
            Op::Defer => "defer",
            Op::Proc => "go",
            Op::Return => "return",
            _ => "",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Ge | Op::Gt)
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, Op::Lsh | Op::Rsh)
    }

    pub fn is_binary_arith(&self) -> bool {
        matches!(
            self,
            Op::Add
                | Op::Sub
                | Op::Or
                | Op::Xor
                | Op::Mul
                | Op::Div
                | Op::Mod
                | Op::And
                | Op::AndNot
                | Op::AndAnd
                | Op::OrOr
        )
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = self.spelling();
        if s.is_empty() { write!(f, "{:?}", self) } else { f.write_str(s) }
    }
}

/// Three-valued progress marker, used both for typechecking and for
/// resolving the definition behind a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TcState {
    #[default]
    Unvisited,
    InProgress,
    Done,
}

/// Storage class of a declared name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Class {
    #[default]
    Xxx,
    Extern,
    Auto,
    Param,
    ParamOut,
    Func,
}

#[derive(Debug, Clone, Default)]
pub struct NameInfo {
    pub class: Class,
    /// Declared type expression
    pub ntype: Option<NodeId>,
    /// Constant: the initializer expression. Variable: the declaring assignment.
    pub defn: Option<NodeId>,
    pub vargen: i32,
    pub funcdepth: i32,
    pub iota: i64,
    /// Builtin function this name stands for
    pub builtin: Option<Op>,
    pub readonly: bool,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub list: Vec<NodeId>,
    pub rlist: Vec<NodeId>,
    pub ninit: Vec<NodeId>,
    pub nbody: Vec<NodeId>,
    pub typ: Option<TypeId>,
    pub sym: Option<SymId>,
    pub val: Option<Val>,
    /// The operator of an `AsOp`, the underlying op of a rewritten call
    pub sub_op: Option<Op>,
    /// The op of a constant expression before it was folded into a literal
    pub orig_op: Option<Op>,
    pub chan_dir: ChanDir,
    pub span: SpanId,
    pub typecheck: TcState,
    pub walkdef: TcState,
    pub diag: bool,
    pub implicit: bool,
    pub isddd: bool,
    pub used: bool,
    pub colas: bool,
    pub embedded: bool,
    pub local: bool,
    pub addable: bool,
    pub bounded: bool,
    /// A `break` targets this statement
    pub hasbreak: bool,
    pub xoffset: i64,
    pub name: Option<Box<NameInfo>>,
}

impl Node {
    pub fn new(op: Op, left: Option<NodeId>, right: Option<NodeId>, span: SpanId) -> Node {
        Node {
            op,
            left,
            right,
            list: Vec::new(),
            rlist: Vec::new(),
            ninit: Vec::new(),
            nbody: Vec::new(),
            typ: None,
            sym: None,
            val: None,
            sub_op: None,
            orig_op: None,
            chan_dir: ChanDir::BOTH,
            span,
            typecheck: TcState::Unvisited,
            walkdef: TcState::Unvisited,
            diag: false,
            implicit: false,
            isddd: false,
            used: false,
            colas: false,
            embedded: false,
            local: false,
            addable: false,
            bounded: false,
            hasbreak: false,
            xoffset: 0,
            name: None,
        }
    }

    pub fn expect_name(&self) -> &NameInfo {
        match &self.name {
            Some(n) => n,
            None => panic!("expect_name called on {:?} node", self.op),
        }
    }

    pub fn expect_name_mut(&mut self) -> &mut NameInfo {
        match &mut self.name {
            Some(n) => n,
            None => panic!("expect_name_mut called on {:?} node", self.op),
        }
    }

    pub fn class(&self) -> Class {
        self.name.as_ref().map(|n| n.class).unwrap_or_default()
    }

    pub fn is_literal(&self) -> bool {
        self.op == Op::Literal
    }
}

pub struct Nodes {
    pool: Pool<Node, NodeId>,
}

impl Default for Nodes {
    fn default() -> Self {
        Nodes::new()
    }
}

impl Nodes {
    pub fn new() -> Nodes {
        Nodes { pool: Pool::with_capacity("nodes", 1024) }
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.pool.add(node)
    }

    pub fn nod(
        &mut self,
        op: Op,
        left: Option<NodeId>,
        right: Option<NodeId>,
        span: SpanId,
    ) -> NodeId {
        self.pool.add(Node::new(op, left, right, span))
    }

    pub fn get(&self, id: NodeId) -> &Node {
        self.pool.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.pool.get_mut(id)
    }

    /// Shallow copy; the copy shares children with the original
    pub fn copy(&mut self, id: NodeId) -> NodeId {
        let n = self.pool.get(id).clone();
        self.pool.add(n)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
