//! Body lowering: statements and expressions into blocks.
//!
//! [`BodyLowerer`] walks one body against the [`FunctionGen`] it belongs
//! to. The `emit_*` entry points below set up parameters, `self`, and
//! the return convention for each kind of generated function.
//!
//! # Ownership
//!
//! Every lowered expression is either *owned* (a call, construction, or
//! allocation result, carrying +1) or *borrowed* (a parameter, local,
//! `self`, or field read). Reference-typed values follow these rules:
//!
//! - `let` takes ownership, retaining a borrowed value, and registers a
//!   release cleanup for the binding's scope.
//! - Call arguments are borrowed by the callee; owned temporaries are
//!   released right after the call.
//! - A discarded owned result is released immediately.
//! - `return` hands an owned value to the caller, retaining a borrowed one.
//! - A field store consumes an owned value and releases the field's old
//!   value, except when a constructor initializes a field of `self`.

mod expr;
mod scope;
mod stmt;

use tern_ast::{Block, ClosureExpr, ConstructorDecl, FuncDecl, NominalTypeDecl, Param, Stmt};
use tern_ir::{Constant, IrType, Value, VarId};

use crate::cleanup::Cleanup;
use crate::function_gen::FunctionGen;
use crate::module_gen::ModuleGen;
use crate::types::lower_type;
use crate::LowerError;

pub use self::scope::{Binding, LexicalScope};

/// A lowered expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Lowered {
    pub var: VarId,
    pub ty: IrType,
    /// Whether this expression produced a +1 reference the lowerer must
    /// consume or release.
    pub owned: bool,
}

impl Lowered {
    fn owned(var: VarId, ty: IrType) -> Self {
        Self {
            var,
            ty,
            owned: true,
        }
    }

    fn borrowed(var: VarId, ty: IrType) -> Self {
        Self {
            var,
            ty,
            owned: false,
        }
    }
}

/// What `return` means in the body being lowered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ReturnMode {
    /// `return` / `return value` from an ordinary body.
    Value,
    /// A struct constructor: `return` yields `self`.
    SelfValue,
    /// Top-level code.
    Forbidden,
}

pub(crate) struct BodyLowerer<'a, 'ast> {
    sgm: &'a mut ModuleGen<'ast>,
    fgen: &'a mut FunctionGen,
    scope: &'a mut LexicalScope,
    self_binding: Option<Binding>,
    returns: ReturnMode,
    /// Field stores to `self` initialize rather than overwrite.
    initializing: bool,
}

impl<'a, 'ast> BodyLowerer<'a, 'ast> {
    pub(crate) fn new(
        sgm: &'a mut ModuleGen<'ast>,
        fgen: &'a mut FunctionGen,
        scope: &'a mut LexicalScope,
        returns: ReturnMode,
    ) -> Self {
        Self {
            sgm,
            fgen,
            scope,
            self_binding: None,
            returns,
            initializing: false,
        }
    }

    /// Bind source parameters to the leading entry parameters.
    fn bind_params(&mut self, params: &[Param]) {
        for (param, &var) in params.iter().zip(self.fgen.params()) {
            self.scope.bind(
                param.name,
                Binding {
                    var,
                    ty: lower_type(&param.ty),
                },
            );
        }
    }

    /// Bind `self` to the trailing entry parameter.
    fn bind_trailing_self(&mut self) -> Result<(), LowerError> {
        let var = self.fgen.params().last().copied();
        let ty = self.fgen.sig().params.last().cloned();
        match (var, ty) {
            (Some(var), Some(ty)) => {
                self.self_binding = Some(Binding { var, ty });
                Ok(())
            }
            _ => Err(self.malformed("`self` parameter missing from signature")),
        }
    }

    /// Lower a complete body and finish its epilog.
    fn lower_body(mut self, body: &Block) -> Result<(), LowerError> {
        self.lower_stmts(&body.stmts)?;
        self.fgen.finish_body();
        Ok(())
    }

    // Helpers shared by statement and expression lowering

    fn malformed(&self, message: impl Into<String>) -> LowerError {
        LowerError::Malformed {
            function: self.fgen.symbol().to_owned(),
            message: message.into(),
        }
    }

    /// Take a +1 reference to `value`, retaining it if it was borrowed.
    fn take_ownership(&mut self, value: &Lowered) -> VarId {
        if value.ty.needs_rc() && !value.owned {
            self.fgen.builder.emit_retain(value.var);
        }
        value.var
    }

    /// Release an owned reference that nothing consumed.
    fn release_temporary(&mut self, value: &Lowered) {
        if value.owned && value.ty.needs_rc() {
            self.fgen.builder.emit_release(value.var);
        }
    }

    /// Lowered type of a stored field of the aggregate type `base`.
    fn field_type(&self, base: &IrType, field: u32) -> Result<IrType, LowerError> {
        base.nominal()
            .and_then(|name| self.sgm.types.layout(name))
            .and_then(|layout| layout.field(field).cloned())
            .ok_or_else(|| self.malformed(format!("no field {field} in {base:?}")))
    }
}

// Entry points

/// Lower a free function or method body.
pub(crate) fn emit_function_body(
    sgm: &mut ModuleGen<'_>,
    fgen: &mut FunctionGen,
    decl: &FuncDecl,
    is_method: bool,
    body: &Block,
) -> Result<(), LowerError> {
    let mut scope = LexicalScope::new();
    let mut lowerer = BodyLowerer::new(sgm, fgen, &mut scope, ReturnMode::Value);
    lowerer.bind_params(&decl.params);
    if is_method {
        lowerer.bind_trailing_self()?;
    }
    lowerer.lower_body(body)
}

/// Lower a closure body. Closures see only their own parameters.
pub(crate) fn emit_closure_body(
    sgm: &mut ModuleGen<'_>,
    fgen: &mut FunctionGen,
    closure: &ClosureExpr,
) -> Result<(), LowerError> {
    let mut scope = LexicalScope::new();
    let mut lowerer = BodyLowerer::new(sgm, fgen, &mut scope, ReturnMode::Value);
    lowerer.bind_params(&closure.params);
    lowerer.lower_body(&closure.body)
}

/// Class allocator: allocate, run the initializer on the new object, and
/// return it.
pub(crate) fn emit_class_allocator(
    sgm: &mut ModuleGen<'_>,
    fgen: &mut FunctionGen,
    initializer: Constant,
) -> Result<(), LowerError> {
    let init_sig = sgm.types.constant_type(initializer)?;
    let self_ty = fgen.sig().result.clone();
    let object = fgen.builder.emit_alloc(self_ty);
    let mut args = fgen.params().to_vec();
    args.push(object);
    fgen.builder.emit_apply(init_sig.result, initializer, args);
    fgen.emit_trailing_return(object)
}

/// Class initializer: the constructor body run against storage passed in
/// as the trailing `self` parameter.
pub(crate) fn emit_class_initializer(
    sgm: &mut ModuleGen<'_>,
    fgen: &mut FunctionGen,
    ctor: &ConstructorDecl,
    body: &Block,
) -> Result<(), LowerError> {
    let mut scope = LexicalScope::new();
    let mut lowerer = BodyLowerer::new(sgm, fgen, &mut scope, ReturnMode::Value);
    lowerer.bind_params(&ctor.params);
    lowerer.bind_trailing_self()?;
    lowerer.initializing = true;
    lowerer.lower_body(body)
}

/// Struct constructor: fill zeroed storage through `self`, then return it.
pub(crate) fn emit_value_constructor(
    sgm: &mut ModuleGen<'_>,
    fgen: &mut FunctionGen,
    ctor: &ConstructorDecl,
    body: &Block,
) -> Result<(), LowerError> {
    let self_ty = fgen.sig().result.clone();
    let self_var = fgen.builder.emit_let(self_ty.clone(), Value::Zeroed);

    let mut scope = LexicalScope::new();
    let mut lowerer = BodyLowerer::new(sgm, fgen, &mut scope, ReturnMode::SelfValue);
    lowerer.bind_params(&ctor.params);
    lowerer.self_binding = Some(Binding {
        var: self_var,
        ty: self_ty,
    });
    lowerer.initializing = true;
    lowerer.lower_stmts(&body.stmts)?;

    if fgen.builder.has_insertion_point() {
        fgen.emit_trailing_return(self_var)?;
    }
    fgen.finish_body();
    Ok(())
}

/// Class destructor: release every reference-typed field after the user
/// body, last field first.
pub(crate) fn emit_destructor_body(
    sgm: &mut ModuleGen<'_>,
    fgen: &mut FunctionGen,
    owner: &NominalTypeDecl,
    body: Option<&Block>,
) -> Result<(), LowerError> {
    let Some(&self_var) = fgen.params().first() else {
        return Err(LowerError::Malformed {
            function: fgen.symbol().to_owned(),
            message: "destructor without `self`".to_owned(),
        });
    };
    for (field, index) in owner.fields.iter().zip(0u32..) {
        let ty = lower_type(&field.ty);
        if ty.needs_rc() {
            fgen.push_cleanup(Cleanup::ReleaseField {
                base: self_var,
                field: index,
                ty,
            });
        }
    }

    let mut scope = LexicalScope::new();
    let mut lowerer = BodyLowerer::new(sgm, fgen, &mut scope, ReturnMode::Value);
    lowerer.bind_trailing_self()?;
    match body {
        Some(body) => lowerer.lower_body(body),
        None => lowerer.lower_body(&Block::empty()),
    }
}

/// Append top-level statements to the entry function.
///
/// Bindings and their cleanups live in `scope` until the entry function
/// closes, so later top-level code can refer to them.
pub(crate) fn emit_toplevel_code(
    sgm: &mut ModuleGen<'_>,
    fgen: &mut FunctionGen,
    scope: &mut LexicalScope,
    stmts: &[Stmt],
) -> Result<(), LowerError> {
    let mut lowerer = BodyLowerer::new(sgm, fgen, scope, ReturnMode::Forbidden);
    lowerer.lower_stmts(stmts)
}
