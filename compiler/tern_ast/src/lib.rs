//! Typed AST for the Tern compiler.
//!
//! This crate holds the program representation that the lowering engine
//! (`tern_lower`) consumes. Parsing and type checking happen upstream; by the
//! time a [`TranslationUnit`] reaches this crate every name is resolved,
//! every expression carries enough type information to lower it, and every
//! generatable declaration has a stable [`DeclId`].
//!
//! # Contents
//!
//! - [`Name`] / [`StringInterner`]: compact interned identifiers.
//! - [`Decl`], [`NominalTypeDecl`], [`Member`]: top-level and member
//!   declarations.
//! - [`Ty`], [`Semantics`]: semantic types, with the reference/value split
//!   resolved on every nominal type.
//! - [`Block`], [`Stmt`], [`Expr`]: function bodies.
//! - [`visit`]: read-only traversal helpers.

mod body;
mod decl;
mod interner;
mod name;
mod ty;
pub mod visit;

pub use body::{BinaryOp, Block, ClosureExpr, Expr, Stmt};
pub use decl::{
    ConstructorDecl, Decl, DeclId, DeclIdAllocator, DestructorDecl, FieldDecl, FuncDecl, Member,
    NominalTypeDecl, Param, PatternBindingDecl, TopLevelCodeDecl, TranslationUnit, UnitKind,
};
pub use interner::{InternError, StringInterner};
pub use name::Name;
pub use ty::{Semantics, Ty};
