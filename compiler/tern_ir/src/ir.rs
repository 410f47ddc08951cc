//! Function bodies: blocks, instructions, terminators.
//!
//! - **[`Function`]**: signature, parameters, blocks, variable types
//! - **[`Block`]**: block parameters, body instructions, terminator
//! - **[`Instr`]**: a single non-terminating instruction
//! - **[`Terminator`]**: block exit (return, jump, branch, unreachable)
//!
//! Values are named via [`VarId`]. Control flow uses [`BlockId`]
//! references between blocks.

use smallvec::{smallvec, SmallVec};
use tern_ast::{BinaryOp, Name};

use crate::{Constant, FnType, IrType};

// ── ID newtypes ─────────────────────────────────────────────────────

/// Variable ID within a function. Allocated sequentially from 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct VarId(u32);

impl VarId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Get the index as `usize` (for indexing into `Vec`s).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Basic block ID within a function. Allocated sequentially from 0; the
/// entry block is always 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Values ──────────────────────────────────────────────────────────

/// Literal constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    Unit,
    Int(i64),
    Bool(bool),
}

impl Literal {
    pub fn ty(self) -> IrType {
        match self {
            Literal::Unit => IrType::Unit,
            Literal::Int(_) => IrType::Int,
            Literal::Bool(_) => IrType::Bool,
        }
    }
}

/// Right-hand side of a [`Instr::Let`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Var(VarId),
    Literal(Literal),
    PrimOp { op: BinaryOp, args: Vec<VarId> },
    /// All-zero storage for a value-semantics aggregate, filled in by
    /// subsequent [`Instr::Set`]s.
    Zeroed,
}

// ── Instructions ────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Instr {
    /// `let dst: ty = value`.
    Let {
        dst: VarId,
        ty: IrType,
        value: Value,
    },

    /// Direct call: `let dst: ty = func(args...)`.
    Apply {
        dst: VarId,
        ty: IrType,
        func: Constant,
        args: Vec<VarId>,
    },

    /// Call through a function value.
    ApplyIndirect {
        dst: VarId,
        ty: IrType,
        callee: VarId,
        args: Vec<VarId>,
    },

    /// Materialize a generated function as a function value.
    FunctionRef {
        dst: VarId,
        ty: IrType,
        func: Constant,
    },

    /// Allocate uninitialized heap storage for a reference-semantics type.
    /// The result is owned with a reference count of one.
    Alloc { dst: VarId, ty: IrType },

    /// Field read: `let dst: ty = value.field`.
    Project {
        dst: VarId,
        ty: IrType,
        value: VarId,
        field: u32,
    },

    /// Field write: `base.field = value`.
    Set {
        base: VarId,
        field: u32,
        value: VarId,
    },

    /// Increment the reference count of `var`.
    Retain { var: VarId },

    /// Decrement the reference count of `var`, destroying it at zero.
    Release { var: VarId },
}

impl Instr {
    /// Returns the variable defined by this instruction, if any.
    pub fn defined_var(&self) -> Option<VarId> {
        match self {
            Instr::Let { dst, .. }
            | Instr::Apply { dst, .. }
            | Instr::ApplyIndirect { dst, .. }
            | Instr::FunctionRef { dst, .. }
            | Instr::Alloc { dst, .. }
            | Instr::Project { dst, .. } => Some(*dst),

            Instr::Set { .. } | Instr::Retain { .. } | Instr::Release { .. } => None,
        }
    }

    /// Returns the IR type of the defined variable, if any.
    pub fn defined_type(&self) -> Option<&IrType> {
        match self {
            Instr::Let { ty, .. }
            | Instr::Apply { ty, .. }
            | Instr::ApplyIndirect { ty, .. }
            | Instr::FunctionRef { ty, .. }
            | Instr::Alloc { ty, .. }
            | Instr::Project { ty, .. } => Some(ty),

            Instr::Set { .. } | Instr::Retain { .. } | Instr::Release { .. } => None,
        }
    }

    /// Returns all variables read by this instruction.
    pub fn used_vars(&self) -> Vec<VarId> {
        match self {
            Instr::Let { value, .. } => match value {
                Value::Var(v) => vec![*v],
                Value::Literal(_) | Value::Zeroed => vec![],
                Value::PrimOp { args, .. } => args.clone(),
            },
            Instr::Apply { args, .. } => args.clone(),
            Instr::ApplyIndirect { callee, args, .. } => {
                let mut vars = Vec::with_capacity(1 + args.len());
                vars.push(*callee);
                vars.extend_from_slice(args);
                vars
            }
            Instr::FunctionRef { .. } | Instr::Alloc { .. } => vec![],
            Instr::Project { value, .. } => vec![*value],
            Instr::Set { base, value, .. } => vec![*base, *value],
            Instr::Retain { var } | Instr::Release { var } => vec![*var],
        }
    }
}

// ── Terminators ─────────────────────────────────────────────────────

/// How control leaves a basic block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Terminator {
    Return {
        value: VarId,
    },

    /// Unconditional jump, passing arguments to the target's parameters.
    Jump {
        target: BlockId,
        args: Vec<VarId>,
    },

    Branch {
        cond: VarId,
        then_block: BlockId,
        else_block: BlockId,
    },

    /// Control never reaches the end of this block.
    Unreachable,
}

impl Terminator {
    pub fn used_vars(&self) -> Vec<VarId> {
        match self {
            Terminator::Return { value } => vec![*value],
            Terminator::Jump { args, .. } => args.clone(),
            Terminator::Branch { cond, .. } => vec![*cond],
            Terminator::Unreachable => vec![],
        }
    }

    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Terminator::Return { .. } | Terminator::Unreachable => SmallVec::new(),
            Terminator::Jump { target, .. } => smallvec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => smallvec![*then_block, *else_block],
        }
    }
}

// ── Blocks ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    pub id: BlockId,
    /// Values passed from predecessors via `Jump` arguments.
    pub params: Vec<(VarId, IrType)>,
    pub body: Vec<Instr>,
    /// `None` only for a block lowering left open; the verifier rejects it.
    pub terminator: Option<Terminator>,
}

// ── Functions ───────────────────────────────────────────────────────

/// A generated function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    /// Human-readable symbol, e.g. `Node.init!allocator`.
    pub name: Name,
    pub sig: FnType,
    /// Entry parameters, one per `sig.params` entry.
    pub params: Vec<VarId>,
    /// Blocks in definition order. `blocks[entry.index()]` is the entry.
    pub blocks: Vec<Block>,
    pub entry: BlockId,
    /// Type of each variable, indexed by `VarId::index()`.
    pub var_types: Vec<IrType>,
}

impl Function {
    pub fn var_type(&self, var: VarId) -> Option<&IrType> {
        self.var_types.get(var.index())
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    /// All instructions in block order.
    pub fn instrs(&self) -> impl Iterator<Item = &Instr> + '_ {
        self.blocks.iter().flat_map(|block| block.body.iter())
    }

    /// All present terminators in block order.
    pub fn terminators(&self) -> impl Iterator<Item = &Terminator> + '_ {
        self.blocks.iter().filter_map(|block| block.terminator.as_ref())
    }

    /// Number of `Return` terminators.
    pub fn return_count(&self) -> usize {
        self.terminators()
            .filter(|t| matches!(t, Terminator::Return { .. }))
            .count()
    }
}
