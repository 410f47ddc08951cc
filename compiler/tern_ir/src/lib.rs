//! Basic-block IR for the Tern compiler.
//!
//! This crate defines the output of lowering:
//!
//! - **[`Constant`]**: the identity of one generatable function: a
//!   declaration plus a [`ConstantKind`] role.
//! - **[`IrType`] / [`FnType`] / [`TypeLayout`]**: lowered types and
//!   calling-convention signatures.
//! - **[`Function`]**, **[`Block`]**, **[`Instr`]**, **[`Terminator`]**: the
//!   control-flow-explicit function body.
//! - **[`Module`]**: the function table keyed by [`Constant`], plus the
//!   optional top-level entry function.
//! - **[`verify_function`]**: the structural verifier run on every
//!   finished function.
//! - **[`Printer`]**: textual dumps for diagnostics.
//!
//! # Design
//!
//! Blocks use parameters instead of phi nodes, like MIR-style and LCNF
//! IRs. Values are SSA variables ([`VarId`]); the only in-place mutation
//! is [`Instr::Set`] on aggregate storage.

mod constant;
pub mod ir;
mod module;
mod print;
mod ty;
pub mod verify;

pub use constant::{Constant, ConstantKind};
pub use ir::{Block, BlockId, Function, Instr, Literal, Terminator, Value, VarId};
pub use module::Module;
pub use print::Printer;
pub use ty::{FnType, IrType, TypeLayout};
pub use verify::{verify_function, VerifyEnv, VerifyError};
