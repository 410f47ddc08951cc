//! Lowered types and function signatures.

use tern_ast::{Name, Semantics};

/// A type at the IR level.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum IrType {
    Unit,
    Int,
    Bool,
    /// Strong reference to a heap object of a reference-semantics type.
    Ref(Name),
    /// Inline aggregate of a value-semantics type.
    Value(Name),
    /// Function value.
    Func(Box<FnType>),
}

impl IrType {
    /// Returns `true` if values of this type carry a reference count.
    #[inline]
    pub fn needs_rc(&self) -> bool {
        matches!(self, IrType::Ref(_))
    }

    /// The nominal type whose layout describes this type's fields, if any.
    #[inline]
    pub fn nominal(&self) -> Option<Name> {
        match self {
            IrType::Ref(name) | IrType::Value(name) => Some(*name),
            IrType::Unit | IrType::Int | IrType::Bool | IrType::Func(_) => None,
        }
    }
}

/// Calling-convention signature of a generated function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FnType {
    pub params: Vec<IrType>,
    pub result: IrType,
}

impl FnType {
    pub fn new(params: Vec<IrType>, result: IrType) -> Self {
        Self { params, result }
    }
}

/// Field layout of a nominal type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeLayout {
    pub name: Name,
    pub semantics: Semantics,
    /// Lowered field types, indexed by declaration order.
    pub fields: Vec<IrType>,
}

impl TypeLayout {
    /// The IR type of `self` for this layout.
    pub fn self_type(&self) -> IrType {
        match self.semantics {
            Semantics::Reference => IrType::Ref(self.name),
            Semantics::Value => IrType::Value(self.name),
        }
    }

    pub fn field(&self, index: u32) -> Option<&IrType> {
        self.fields.get(index as usize)
    }
}
