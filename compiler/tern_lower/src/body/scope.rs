//! Name bindings for body lowering.

use rustc_hash::FxHashMap;
use tern_ast::Name;
use tern_ir::{IrType, VarId};

/// A name bound to a variable of the function being lowered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub var: VarId,
    pub ty: IrType,
}

/// Stack of lexical frames, innermost last.
///
/// Bindings are immutable, so a frame is only ever added to. Lookups walk
/// outward from the innermost frame, which gives shadowing for free.
#[derive(Debug)]
pub struct LexicalScope {
    frames: Vec<FxHashMap<Name, Binding>>,
}

impl Default for LexicalScope {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalScope {
    /// A scope with one (function-level) frame.
    pub fn new() -> Self {
        Self {
            frames: vec![FxHashMap::default()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Drop the innermost frame. The function-level frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn bind(&mut self, name: Name, binding: Binding) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name, binding);
        }
    }

    pub fn lookup(&self, name: Name) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|frame| frame.get(&name))
    }
}

#[cfg(test)]
mod tests {
    use tern_ast::Name;
    use tern_ir::{IrType, VarId};

    use super::{Binding, LexicalScope};

    fn binding(var: u32) -> Binding {
        Binding {
            var: VarId::new(var),
            ty: IrType::Int,
        }
    }

    #[test]
    fn inner_frames_shadow_and_pop() {
        let x = Name::from_raw(5);
        let mut scope = LexicalScope::new();
        scope.bind(x, binding(0));
        scope.push();
        scope.bind(x, binding(1));
        assert_eq!(scope.lookup(x).map(|b| b.var), Some(VarId::new(1)));
        scope.pop();
        assert_eq!(scope.lookup(x).map(|b| b.var), Some(VarId::new(0)));
    }

    #[test]
    fn function_frame_survives_extra_pops() {
        let x = Name::from_raw(5);
        let mut scope = LexicalScope::new();
        scope.bind(x, binding(0));
        scope.pop();
        scope.pop();
        assert!(scope.lookup(x).is_some());
        assert!(scope.lookup(Name::from_raw(6)).is_none());
    }
}
