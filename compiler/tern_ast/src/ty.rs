//! Semantic types as produced by the type checker.

use crate::Name;

/// Whether instances of a nominal type have shared identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Semantics {
    /// Heap-allocated, shared identity (classes). Constructors split into
    /// allocator and initializer entry points; the type owns a destructor.
    Reference,
    /// Inline, copied on assignment (structs). Constructed in one step and
    /// never owns a destructor.
    Value,
}

impl Semantics {
    #[inline]
    pub fn is_reference(self) -> bool {
        self == Semantics::Reference
    }
}

/// A fully resolved semantic type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Ty {
    /// The empty tuple `()`.
    Unit,
    Int,
    Bool,
    /// A user-declared nominal type. The type checker resolves its
    /// semantics so lowering never needs to look the declaration up.
    Nominal { name: Name, semantics: Semantics },
    /// A function value type.
    Function { params: Vec<Ty>, result: Box<Ty> },
}

impl Ty {
    /// Shorthand for a reference-semantics nominal type.
    pub fn class(name: Name) -> Self {
        Ty::Nominal {
            name,
            semantics: Semantics::Reference,
        }
    }

    /// Shorthand for a value-semantics nominal type.
    pub fn structure(name: Name) -> Self {
        Ty::Nominal {
            name,
            semantics: Semantics::Value,
        }
    }

    /// Returns `true` for the unit type, the only type whose function
    /// bodies may fall off the end.
    #[inline]
    pub fn is_unit(&self) -> bool {
        matches!(self, Ty::Unit)
    }

    /// Returns `true` if values of this type are reference counted.
    #[inline]
    pub fn has_reference_semantics(&self) -> bool {
        matches!(
            self,
            Ty::Nominal {
                semantics: Semantics::Reference,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unit_is_unit() {
        assert!(Ty::Unit.is_unit());
        assert!(!Ty::Int.is_unit());
        assert!(!Ty::Function {
            params: vec![],
            result: Box::new(Ty::Unit),
        }
        .is_unit());
    }

    #[test]
    fn reference_semantics_follows_nominal_kind() {
        let name = Name::from_raw(9);
        assert!(Ty::class(name).has_reference_semantics());
        assert!(!Ty::structure(name).has_reference_semantics());
        assert!(!Ty::Bool.has_reference_semantics());
    }
}
