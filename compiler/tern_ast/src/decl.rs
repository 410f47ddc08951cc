//! Declarations and translation units.

use crate::{Block, Expr, Name, Semantics, Ty};

/// Stable identity of a declaration (or closure) within one translation unit.
///
/// Assigned by the front end. Lowering keys generated functions by
/// `(DeclId, role)`, so two declarations must never share an ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct DeclId(u32);

impl DeclId {
    /// Create a declaration ID from a raw index.
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Sequential [`DeclId`] source for front ends and test fixtures.
#[derive(Debug, Default)]
pub struct DeclIdAllocator {
    next: u32,
}

impl DeclIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next unused ID.
    pub fn fresh(&mut self) -> DeclId {
        let id = DeclId::new(self.next);
        self.next += 1;
        id
    }
}

/// What a translation unit is compiled as.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// A library: only declarations, no entry point.
    Library,
    /// A program with an implicit main-line entry point.
    Executable,
    /// An interactive session; top-level code accumulates like a program.
    InteractiveSession,
}

impl UnitKind {
    /// Whether top-level statements are collected into an implicit
    /// entry-point function.
    pub fn has_toplevel(self) -> bool {
        match self {
            UnitKind::Library => false,
            UnitKind::Executable | UnitKind::InteractiveSession => true,
        }
    }
}

/// A type-checked translation unit.
#[derive(Clone, Debug)]
pub struct TranslationUnit {
    pub kind: UnitKind,
    /// Declarations in source order.
    pub decls: Vec<Decl>,
}

/// A top-level declaration.
#[derive(Clone, Debug)]
pub enum Decl {
    Func(FuncDecl),
    /// A global `let` binding.
    PatternBinding(PatternBindingDecl),
    Nominal(NominalTypeDecl),
    /// Statements executed by the implicit entry point, in source order.
    TopLevelCode(TopLevelCodeDecl),
}

/// A function parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Name,
    pub ty: Ty,
}

/// A free function or a method.
#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub id: DeclId,
    pub name: Name,
    pub params: Vec<Param>,
    pub result: Ty,
    /// `None` for a prototype.
    pub body: Option<Block>,
}

/// A global variable binding.
#[derive(Clone, Debug)]
pub struct PatternBindingDecl {
    pub id: DeclId,
    pub name: Name,
    pub ty: Ty,
    pub init: Option<Expr>,
}

/// A stored field of a nominal type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: Ty,
}

/// A `class` (reference semantics) or `struct` (value semantics).
#[derive(Clone, Debug)]
pub struct NominalTypeDecl {
    pub id: DeclId,
    pub name: Name,
    pub semantics: Semantics,
    /// Stored fields in declaration order; field indices follow this order.
    pub fields: Vec<FieldDecl>,
    pub members: Vec<Member>,
}

impl NominalTypeDecl {
    /// The semantic type of `self` inside this declaration.
    pub fn self_ty(&self) -> Ty {
        Ty::Nominal {
            name: self.name,
            semantics: self.semantics,
        }
    }
}

/// A member of a nominal type.
#[derive(Clone, Debug)]
pub enum Member {
    Constructor(ConstructorDecl),
    Destructor(DestructorDecl),
    /// An instance method; `self` is passed as the last argument.
    Method(FuncDecl),
    Nested(NominalTypeDecl),
}

/// `init(...) { ... }`.
#[derive(Clone, Debug)]
pub struct ConstructorDecl {
    pub id: DeclId,
    pub params: Vec<Param>,
    /// `None` for a prototype (including implicitly declared constructors).
    pub body: Option<Block>,
}

/// `deinit { ... }`.
#[derive(Clone, Debug)]
pub struct DestructorDecl {
    pub id: DeclId,
    pub body: Block,
}

/// A run of top-level statements.
#[derive(Clone, Debug)]
pub struct TopLevelCodeDecl {
    pub body: Block,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_hands_out_sequential_ids() {
        let mut ids = DeclIdAllocator::new();
        assert_eq!(ids.fresh(), DeclId::new(0));
        assert_eq!(ids.fresh(), DeclId::new(1));
        assert_eq!(ids.fresh().raw(), 2);
    }

    #[test]
    fn only_library_units_lack_toplevel() {
        assert!(!UnitKind::Library.has_toplevel());
        assert!(UnitKind::Executable.has_toplevel());
        assert!(UnitKind::InteractiveSession.has_toplevel());
    }
}
