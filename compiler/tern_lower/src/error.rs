//! Lowering failures.
//!
//! Every variant is an internal-consistency violation: the typed AST handed
//! to lowering, or lowering itself, broke an invariant. None of them is a
//! diagnostic for the user's program, and none is recovered from. The first
//! one aborts lowering of the whole translation unit.

use tern_ast::DeclId;
use tern_ir::{Constant, VerifyError};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    /// A second function was about to be generated for one constant.
    #[error("already generated function for {symbol} ({constant})")]
    DuplicateDefinition { constant: Constant, symbol: String },

    /// A body created an epilog block and still fell off its end into the
    /// implicit unit return.
    #[error("{function}: epilog block not terminated before implicit return")]
    EpilogConflict { function: String },

    /// A value-semantics type recorded a destructor.
    #[error("destructor in value type `{ty}`")]
    DestructorOnValueType { ty: String },

    /// A type declared more than one destructor.
    #[error("`{ty}` declares more than one destructor")]
    DuplicateDestructor { ty: String },

    /// Two nominal types share one name.
    #[error("type `{ty}` declared more than once")]
    DuplicateTypeName { ty: String },

    /// The structural verifier rejected a finished function.
    #[error("{function} failed verification: {}", render_verify_errors(.errors))]
    Verification {
        function: String,
        constant: Option<Constant>,
        errors: Vec<VerifyError>,
    },

    /// The cleanup stack was asked to unwind and return a second time.
    #[error("cleanups already unwound for this function")]
    CleanupsAlreadyUnwound,

    /// A constant whose role does not apply to its declaration, or whose
    /// declaration is not in the unit.
    #[error("no declaration lowers to {constant}")]
    UnknownConstant { constant: Constant },

    /// Two declarations share one ID.
    #[error("declaration id {} used more than once", .decl.raw())]
    DuplicateDeclId { decl: DeclId },

    #[error("{function}: unbound name `{name}`")]
    UnboundName { function: String, name: String },

    #[error("`return` outside of a function body")]
    ReturnOutsideFunction,

    /// Top-level code in a unit that has no implicit entry point.
    #[error("top-level code in a library unit")]
    MissingToplevel,

    /// A body the type checker should have rejected.
    #[error("{function}: {message}")]
    Malformed { function: String, message: String },
}

fn render_verify_errors(errors: &[VerifyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
