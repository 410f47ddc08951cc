//! Per-function lowering state.
//!
//! A [`FunctionGen`] lives from [`open`](FunctionGen::open) to
//! [`close`](FunctionGen::close) and is never reused. It owns the
//! [`IrBuilder`], the [`CleanupStack`], and the optional epilog block.
//!
//! # Returns
//!
//! An explicit `return` emits the cleanups pending at that point and jumps
//! to the epilog, created on first use, which holds the function's single
//! `Return`. When the body ends, [`finish_body`](FunctionGen::finish_body)
//! routes any fall-through into the epilog and emits its `Return`.
//! A body that never returned explicitly ends at `close`, which either
//! unwinds the cleanups and returns `()` or marks the end unreachable.

use tern_ast::Name;
use tern_ir::{BlockId, FnType, Function, IrType, VarId};

use crate::builder::IrBuilder;
use crate::cleanup::{Cleanup, CleanupDepth, CleanupStack};
use crate::LowerError;

/// The shared exit block of a function with explicit returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Epilog {
    pub block: BlockId,
    /// Block parameter carrying the returned value.
    pub value: VarId,
}

pub struct FunctionGen {
    name: Name,
    symbol: String,
    sig: FnType,
    params: Vec<VarId>,
    implicit_unit_return: bool,
    epilog: Option<Epilog>,
    pub(crate) builder: IrBuilder,
    pub(crate) cleanups: CleanupStack,
}

impl FunctionGen {
    /// Start a function, binding one variable per signature parameter.
    ///
    /// `implicit_unit_return` says whether falling off the end of the body
    /// returns `()`; when false, the end of the body is unreachable.
    pub fn open(name: Name, symbol: String, sig: FnType, implicit_unit_return: bool) -> Self {
        let mut builder = IrBuilder::new();
        let params = sig
            .params
            .iter()
            .map(|ty| builder.fresh_var(ty.clone()))
            .collect();
        Self {
            name,
            symbol,
            sig,
            params,
            implicit_unit_return,
            epilog: None,
            builder,
            cleanups: CleanupStack::new(),
        }
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline]
    pub fn sig(&self) -> &FnType {
        &self.sig
    }

    /// Entry parameters in signature order.
    #[inline]
    pub fn params(&self) -> &[VarId] {
        &self.params
    }

    #[inline]
    pub fn implicit_unit_return(&self) -> bool {
        self.implicit_unit_return
    }

    #[inline]
    pub fn epilog(&self) -> Option<Epilog> {
        self.epilog
    }

    // Cleanups

    pub fn push_cleanup(&mut self, cleanup: Cleanup) {
        self.cleanups.push(cleanup);
    }

    pub fn cleanup_depth(&self) -> CleanupDepth {
        self.cleanups.depth()
    }

    /// Leave a scope entered at `depth`.
    pub fn pop_scope(&mut self, depth: CleanupDepth) {
        self.cleanups.pop_scope(depth, &mut self.builder);
    }

    // Returns

    /// The epilog block, created on first request.
    pub fn get_or_create_epilog(&mut self) -> Epilog {
        if let Some(epilog) = self.epilog {
            return epilog;
        }
        let block = self.builder.new_block();
        let value = self.builder.add_block_param(block, self.sig.result.clone());
        let epilog = Epilog { block, value };
        tracing::trace!(function = %self.symbol, block = block.raw(), "created epilog");
        self.epilog = Some(epilog);
        epilog
    }

    /// Lower an explicit `return value`: emit every pending cleanup and
    /// jump to the epilog.
    pub fn emit_return(&mut self, value: VarId) {
        let epilog = self.get_or_create_epilog();
        self.cleanups
            .emit_cleanups_to(CleanupDepth::FUNCTION, &mut self.builder);
        self.builder.terminate_jump(epilog.block, vec![value]);
    }

    /// Return `value` from the end of the body.
    ///
    /// Goes through the epilog when one exists; otherwise unwinds the
    /// cleanup stack and returns directly.
    pub fn emit_trailing_return(&mut self, value: VarId) -> Result<(), LowerError> {
        if self.epilog.is_some() {
            self.emit_return(value);
            Ok(())
        } else {
            self.cleanups
                .emit_return_and_cleanups(&mut self.builder, value)
        }
    }

    /// Finish a body that may have created an epilog.
    ///
    /// Fall-through at the end of the body jumps to the epilog with `()`
    /// in an implicit-unit-return function and is unreachable otherwise.
    /// The epilog then receives its `Return`, leaving no insertion point
    /// for [`close`](Self::close).
    pub fn finish_body(&mut self) {
        let Some(epilog) = self.epilog else {
            return;
        };
        if self.builder.has_insertion_point() {
            if self.implicit_unit_return {
                let unit = self.builder.emit_unit();
                self.emit_return(unit);
            } else {
                self.builder.terminate_unreachable();
            }
        }
        self.builder.position_at(epilog.block);
        self.builder.terminate_return(epilog.value);
    }

    /// Finalize the function.
    ///
    /// With no insertion point the body already ended in a return or an
    /// unreachable, and nothing is emitted. Otherwise the end of the body
    /// is reachable: an implicit-unit-return function unwinds its cleanups
    /// and returns `()`, which requires that no epilog exists; any other
    /// function marks the end unreachable. Code emitted after a
    /// terminator leaves a detached block and fails with
    /// [`LowerError::Malformed`].
    pub fn close(mut self) -> Result<Function, LowerError> {
        if self.builder.has_insertion_point() {
            if self.implicit_unit_return {
                if self.epilog.is_some() {
                    return Err(LowerError::EpilogConflict {
                        function: self.symbol,
                    });
                }
                let unit = self.builder.emit_unit();
                self.cleanups
                    .emit_return_and_cleanups(&mut self.builder, unit)?;
            } else {
                self.builder.terminate_unreachable();
            }
        }
        if let Some(&block) = self.builder.detached_blocks().first() {
            return Err(LowerError::Malformed {
                function: self.symbol,
                message: format!("code emitted after a terminator into bb{}", block.raw()),
            });
        }
        Ok(self.builder.finish(self.name, self.sig, self.params))
    }

    /// Type of a variable created by this function's builder.
    pub fn var_type(&self, var: VarId) -> Option<&IrType> {
        self.builder.var_type(var)
    }
}

#[cfg(test)]
mod tests;
