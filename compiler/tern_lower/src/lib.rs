//! Lowering from the typed AST to basic-block IR.
//!
//! [`construct_module`] turns one type-checked [`TranslationUnit`] into a
//! [`Module`]: one verified [`Function`](tern_ir::Function) per generatable
//! [`Constant`](tern_ir::Constant), plus the implicit entry function of an
//! executable or interactive unit.
//!
//! # Architecture
//!
//! - [`DeclIndex`] maps every declaration ID to its declaration, so calls
//!   may name functions lowered later in the unit.
//! - [`TypeLowering`] derives and memoizes each constant's signature.
//! - [`ModuleGen`] dispatches declarations and owns the function table.
//! - [`TypeGen`] walks one nominal type and emits its destructor last.
//! - [`FunctionGen`] owns one function in progress: its [`IrBuilder`],
//!   [`CleanupStack`], and epilog.
//! - The body lowerer turns statements and expressions into blocks,
//!   inserting reference-count operations as it goes.
//!
//! # Tracing
//!
//! Set `RUST_LOG=tern_lower=debug` (or `trace`) and call [`init_tracing`]
//! to see per-function emission. [`LowerOptions::verbose`] separately
//! dumps every function to stderr.

mod body;
mod builder;
mod cleanup;
mod error;
mod function_gen;
mod index;
mod module_gen;
mod type_gen;
mod types;

#[cfg(test)]
mod test_helpers;

use std::sync::Once;

use tern_ast::{StringInterner, TranslationUnit};
use tern_ir::Module;

pub use builder::IrBuilder;
pub use cleanup::{Cleanup, CleanupDepth, CleanupStack};
pub use error::LowerError;
pub use function_gen::{Epilog, FunctionGen};
pub use index::{DeclIndex, DeclInfo};
pub use module_gen::ModuleGen;
pub use type_gen::TypeGen;
pub use types::{lower_type, TypeLowering};

/// Configuration for lowering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LowerOptions {
    /// Print each constant and signature before emission and each finished
    /// function after, to stderr. Does not change the output.
    pub verbose: bool,
}

impl LowerOptions {
    /// Enable verbose output.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Lower a type-checked translation unit.
///
/// Declarations are lowered in source order. The first internal error
/// aborts lowering and no module is produced.
pub fn construct_module(
    unit: &TranslationUnit,
    interner: &StringInterner,
    options: LowerOptions,
) -> Result<Module, LowerError> {
    let index = DeclIndex::build(unit)?;
    index.check_type_names(interner)?;
    tracing::debug!(
        kind = ?unit.kind,
        decls = unit.decls.len(),
        indexed = index.len(),
        "lowering translation unit"
    );
    let types = TypeLowering::new(index);
    let mut sgm = ModuleGen::new(types, interner, unit.kind.has_toplevel(), options);
    for decl in &unit.decls {
        sgm.visit_decl(decl)?;
    }
    sgm.finish()
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=tern_lower=debug` or `RUST_LOG=tern_lower=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builder() {
        assert!(!LowerOptions::default().verbose);
        assert!(LowerOptions::default().with_verbose(true).verbose);
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
