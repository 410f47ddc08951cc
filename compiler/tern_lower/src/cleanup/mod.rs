//! Pending cleanup actions of a function being lowered.
//!
//! Lowering pushes a [`Cleanup`] whenever it acquires ownership of a
//! reference that must be given up when control leaves the enclosing
//! scope. Cleanups run in LIFO order:
//!
//! - a scope that ends by falling through pops back to its entry depth
//!   ([`CleanupStack::pop_scope`]),
//! - an early exit emits everything above a depth without popping
//!   ([`CleanupStack::emit_cleanups_to`]), since the scope is still open
//!   for the statements that follow in other blocks,
//! - the final return unwinds the whole stack once
//!   ([`CleanupStack::emit_return_and_cleanups`]).

use tern_ir::{IrType, VarId};

use crate::builder::IrBuilder;
use crate::LowerError;

/// One pending cleanup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cleanup {
    /// Release an owned local.
    Release { var: VarId },
    /// Release a reference stored in a field of `base`.
    ReleaseField { base: VarId, field: u32, ty: IrType },
}

impl Cleanup {
    /// Emit this cleanup at the builder's insertion point.
    pub fn emit(&self, builder: &mut IrBuilder) {
        match self {
            Cleanup::Release { var } => builder.emit_release(*var),
            Cleanup::ReleaseField { base, field, ty } => {
                let value = builder.emit_project(ty.clone(), *base, *field);
                builder.emit_release(value);
            }
        }
    }
}

/// Stack height marking where a scope's cleanups begin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CleanupDepth(usize);

impl CleanupDepth {
    /// The bottom of the stack: every cleanup of the function.
    pub const FUNCTION: CleanupDepth = CleanupDepth(0);
}

/// LIFO stack of [`Cleanup`]s for one function.
#[derive(Debug, Default)]
pub struct CleanupStack {
    entries: Vec<Cleanup>,
    unwound: bool,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cleanup: Cleanup) {
        tracing::trace!(?cleanup, depth = self.entries.len(), "push cleanup");
        self.entries.push(cleanup);
    }

    #[inline]
    pub fn depth(&self) -> CleanupDepth {
        CleanupDepth(self.entries.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending cleanups, oldest first.
    pub fn entries(&self) -> &[Cleanup] {
        &self.entries
    }

    /// Emit every cleanup above `depth`, innermost first, leaving the
    /// stack untouched.
    pub fn emit_cleanups_to(&self, depth: CleanupDepth, builder: &mut IrBuilder) {
        let start = depth.0.min(self.entries.len());
        for cleanup in self.entries[start..].iter().rev() {
            cleanup.emit(builder);
        }
    }

    /// Leave a scope entered at `depth`.
    ///
    /// The scope's cleanups are emitted when control falls through to the
    /// end of the scope, and are discarded when it does not: every exit
    /// that left the scope early already emitted them.
    pub fn pop_scope(&mut self, depth: CleanupDepth, builder: &mut IrBuilder) {
        if builder.has_insertion_point() {
            self.emit_cleanups_to(depth, builder);
        }
        self.entries.truncate(depth.0);
    }

    /// Run every pending cleanup and return `value`.
    ///
    /// Allowed once per function; afterwards the stack is empty and the
    /// builder has no insertion point.
    pub fn emit_return_and_cleanups(
        &mut self,
        builder: &mut IrBuilder,
        value: VarId,
    ) -> Result<(), LowerError> {
        if self.unwound {
            return Err(LowerError::CleanupsAlreadyUnwound);
        }
        self.unwound = true;
        self.emit_cleanups_to(CleanupDepth::FUNCTION, builder);
        self.entries.clear();
        builder.terminate_return(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
