//! The lowered module: function table plus optional entry point.

use rustc_hash::FxHashMap;
use tern_ast::Name;

use crate::{Constant, ConstantKind, Function, TypeLayout};

/// A lowered translation unit.
///
/// Functions are keyed by [`Constant`]; the top-level entry function of an
/// executable or interactive unit is held separately since it has no
/// declaration.
#[derive(Clone, Debug, Default)]
pub struct Module {
    pub functions: FxHashMap<Constant, Function>,
    pub toplevel: Option<Function>,
    pub layouts: FxHashMap<Name, TypeLayout>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has_function(&self, constant: Constant) -> bool {
        self.functions.contains_key(&constant)
    }

    pub fn function(&self, constant: Constant) -> Option<&Function> {
        self.functions.get(&constant)
    }

    /// Constants of every registered function with the given role, sorted.
    pub fn constants_of_kind(&self, kind: ConstantKind) -> Vec<Constant> {
        let mut constants: Vec<_> = self
            .functions
            .keys()
            .filter(|c| c.kind == kind)
            .copied()
            .collect();
        constants.sort();
        constants
    }

    /// All registered constants, sorted for deterministic iteration.
    pub fn sorted_constants(&self) -> Vec<Constant> {
        let mut constants: Vec<_> = self.functions.keys().copied().collect();
        constants.sort();
        constants
    }
}
