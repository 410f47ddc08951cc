//! Constant identities: the keys of the module function table.

use std::fmt;

use tern_ast::DeclId;

/// The role a generated function plays for its declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstantKind {
    /// The declaration itself: a function, method, closure, or a
    /// value-semantics constructor.
    Primary,
    /// Reference-semantics constructor: initializes already allocated
    /// storage passed as `self`.
    Initializer,
    /// Reference-semantics constructor: allocates storage, then applies the
    /// initializer.
    Allocator,
    /// Destructor of a reference-semantics type. Keyed by the type
    /// declaration, not the `deinit` declaration, since every class has one.
    Destructor,
}

impl ConstantKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstantKind::Primary => "primary",
            ConstantKind::Initializer => "initializer",
            ConstantKind::Allocator => "allocator",
            ConstantKind::Destructor => "destructor",
        }
    }
}

/// Identity of exactly one generated function.
///
/// Equality and hashing are by `(decl, kind)`. A module holds at most one
/// function per constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct Constant {
    pub decl: DeclId,
    pub kind: ConstantKind,
}

impl Constant {
    pub fn new(decl: DeclId, kind: ConstantKind) -> Self {
        Self { decl, kind }
    }

    pub fn primary(decl: DeclId) -> Self {
        Self::new(decl, ConstantKind::Primary)
    }

    pub fn initializer(decl: DeclId) -> Self {
        Self::new(decl, ConstantKind::Initializer)
    }

    pub fn allocator(decl: DeclId) -> Self {
        Self::new(decl, ConstantKind::Allocator)
    }

    pub fn destructor(decl: DeclId) -> Self {
        Self::new(decl, ConstantKind::Destructor)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConstantKind::Primary => write!(f, "@{}", self.decl.raw()),
            kind => write!(f, "@{}!{}", self.decl.raw(), kind.as_str()),
        }
    }
}
