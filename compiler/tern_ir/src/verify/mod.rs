//! Structural verifier for finished functions.
//!
//! Run on every function before it enters the module. Checks that:
//!
//! - every block is terminated exactly once (no open blocks remain),
//! - block IDs are dense and every branch target exists,
//! - every variable is defined exactly once and every use refers to a
//!   defined variable,
//! - operand and result types agree with the signature, callee signatures,
//!   block parameters, and nominal type layouts.
//!
//! Failures are internal errors in lowering, never source-program errors.

use tern_ast::Name;

use crate::{
    Block, BlockId, Constant, FnType, Function, Instr, IrType, Terminator, TypeLayout, Value,
    VarId,
};

/// Signatures and layouts the verifier checks against.
pub trait VerifyEnv {
    /// Lowered signature of a callee.
    fn signature(&self, constant: Constant) -> Option<&FnType>;

    /// Field layout of a nominal type.
    fn layout(&self, name: Name) -> Option<&TypeLayout>;
}

/// One verifier finding.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}{message}", .block.map(block_prefix).unwrap_or_default())]
pub struct VerifyError {
    /// The offending block, or `None` for function-level problems.
    pub block: Option<BlockId>,
    pub message: String,
}

fn block_prefix(block: BlockId) -> String {
    format!("bb{}: ", block.raw())
}

/// Verify a finished function.
pub fn verify_function(func: &Function, env: &dyn VerifyEnv) -> Result<(), Vec<VerifyError>> {
    let mut verifier = Verifier {
        func,
        env,
        defined: vec![false; func.var_types.len()],
        errors: Vec::new(),
    };
    verifier.collect_definitions();
    verifier.check_signature();
    for block in &func.blocks {
        verifier.check_block(block);
    }

    if verifier.errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(
            function = func.name.raw(),
            errors = verifier.errors.len(),
            "function failed verification"
        );
        Err(verifier.errors)
    }
}

struct Verifier<'a> {
    func: &'a Function,
    env: &'a dyn VerifyEnv,
    defined: Vec<bool>,
    errors: Vec<VerifyError>,
}

impl<'a> Verifier<'a> {
    fn error(&mut self, block: Option<BlockId>, message: String) {
        self.errors.push(VerifyError { block, message });
    }

    // Definitions

    fn define(&mut self, block: Option<BlockId>, var: VarId) {
        match self.defined.get(var.index()).copied() {
            Some(true) => self.error(block, format!("%{} defined more than once", var.raw())),
            Some(false) => self.defined[var.index()] = true,
            None => self.error(block, format!("%{} has no recorded type", var.raw())),
        }
    }

    fn collect_definitions(&mut self) {
        let func = self.func;
        for &param in &func.params {
            self.define(None, param);
        }
        for block in &func.blocks {
            for &(var, _) in &block.params {
                self.define(Some(block.id), var);
            }
            for instr in &block.body {
                if let Some(dst) = instr.defined_var() {
                    self.define(Some(block.id), dst);
                }
            }
        }
    }

    /// Type of a used variable, reporting undefined uses.
    fn use_type(&mut self, block: BlockId, var: VarId) -> Option<&'a IrType> {
        let func = self.func;
        if self.defined.get(var.index()).copied().unwrap_or(false) {
            func.var_type(var)
        } else {
            self.error(Some(block), format!("use of undefined %{}", var.raw()));
            None
        }
    }

    fn expect_type(&mut self, block: BlockId, var: VarId, expected: &IrType, what: &str) {
        if let Some(actual) = self.use_type(block, var) {
            if actual != expected {
                self.error(
                    Some(block),
                    format!(
                        "{what}: %{} has type {actual:?}, expected {expected:?}",
                        var.raw()
                    ),
                );
            }
        }
    }

    fn expect_args(&mut self, block: BlockId, args: &[VarId], params: &[IrType], what: &str) {
        if args.len() != params.len() {
            self.error(
                Some(block),
                format!(
                    "{what}: {} arguments passed, {} expected",
                    args.len(),
                    params.len()
                ),
            );
            return;
        }
        for (&arg, param) in args.iter().zip(params) {
            self.expect_type(block, arg, param, what);
        }
    }

    fn check_dst(&mut self, block: BlockId, dst: VarId, ty: &IrType) {
        if self.func.var_type(dst) != Some(ty) {
            self.error(
                Some(block),
                format!("%{} annotated {ty:?} but recorded differently", dst.raw()),
            );
        }
    }

    fn field_type(&mut self, block: BlockId, base_ty: &IrType, field: u32) -> Option<IrType> {
        let Some(name) = base_ty.nominal() else {
            self.error(
                Some(block),
                format!("field access on non-aggregate {base_ty:?}"),
            );
            return None;
        };
        let env = self.env;
        let Some(layout) = env.layout(name) else {
            self.error(Some(block), format!("no layout for {name:?}"));
            return None;
        };
        if layout.self_type() != *base_ty {
            self.error(
                Some(block),
                format!("{base_ty:?} disagrees with the semantics of its layout"),
            );
        }
        let field_ty = layout.field(field).cloned();
        if field_ty.is_none() {
            self.error(
                Some(block),
                format!("field {field} out of range for {name:?}"),
            );
        }
        field_ty
    }

    // Function-level checks

    fn check_signature(&mut self) {
        let func = self.func;
        if func.params.len() != func.sig.params.len() {
            self.error(
                None,
                format!(
                    "{} parameters bound, signature has {}",
                    func.params.len(),
                    func.sig.params.len()
                ),
            );
        }
        for (&param, ty) in func.params.iter().zip(&func.sig.params) {
            if func.var_type(param) != Some(ty) {
                self.error(
                    None,
                    format!("parameter %{} does not match signature {ty:?}", param.raw()),
                );
            }
        }
        for (index, block) in func.blocks.iter().enumerate() {
            if block.id.index() != index {
                self.error(
                    Some(block.id),
                    format!("block stored at index {index}"),
                );
            }
        }
        match func.block(func.entry) {
            None => self.error(None, format!("entry block bb{} missing", func.entry.raw())),
            Some(entry) if !entry.params.is_empty() => {
                self.error(Some(entry.id), "entry block has parameters".to_owned());
            }
            Some(_) => {}
        }
    }

    // Block-level checks

    fn check_block(&mut self, block: &'a Block) {
        for (var, ty) in &block.params {
            if self.func.var_type(*var) != Some(ty) {
                self.error(
                    Some(block.id),
                    format!("block parameter %{} type mismatch", var.raw()),
                );
            }
        }
        for instr in &block.body {
            self.check_instr(block.id, instr);
        }
        match &block.terminator {
            Some(terminator) => self.check_terminator(block.id, terminator),
            None => self.error(Some(block.id), "block has no terminator".to_owned()),
        }
    }

    fn check_instr(&mut self, block: BlockId, instr: &Instr) {
        let env = self.env;
        if let (Some(dst), Some(ty)) = (instr.defined_var(), instr.defined_type()) {
            self.check_dst(block, dst, ty);
        }

        match instr {
            Instr::Let { ty, value, .. } => self.check_value(block, ty, value),
            Instr::Apply { ty, func, args, .. } => {
                let Some(sig) = env.signature(*func) else {
                    self.error(Some(block), format!("call to unknown function {func}"));
                    return;
                };
                self.expect_args(block, args, &sig.params, "call");
                if sig.result != *ty {
                    self.error(
                        Some(block),
                        format!("call to {func} yields {:?}, annotated {ty:?}", sig.result),
                    );
                }
            }
            Instr::ApplyIndirect {
                ty, callee, args, ..
            } => {
                let Some(callee_ty) = self.use_type(block, *callee) else {
                    return;
                };
                let IrType::Func(sig) = callee_ty else {
                    self.error(
                        Some(block),
                        format!("indirect call through non-function {callee_ty:?}"),
                    );
                    return;
                };
                self.expect_args(block, args, &sig.params, "indirect call");
                if sig.result != *ty {
                    self.error(
                        Some(block),
                        format!("indirect call yields {:?}, annotated {ty:?}", sig.result),
                    );
                }
            }
            Instr::FunctionRef { ty, func, .. } => match env.signature(*func) {
                Some(sig) => {
                    if *ty != IrType::Func(Box::new(sig.clone())) {
                        self.error(
                            Some(block),
                            format!("function reference to {func} annotated {ty:?}"),
                        );
                    }
                }
                None => self.error(Some(block), format!("reference to unknown function {func}")),
            },
            Instr::Alloc { ty, .. } => match ty {
                IrType::Ref(name) => {
                    if env.layout(*name).is_none() {
                        self.error(Some(block), format!("allocation of unknown type {name:?}"));
                    }
                }
                other => self.error(Some(block), format!("allocation of non-reference {other:?}")),
            },
            Instr::Project {
                ty, value, field, ..
            } => {
                let Some(base_ty) = self.use_type(block, *value) else {
                    return;
                };
                if let Some(field_ty) = self.field_type(block, base_ty, *field) {
                    if field_ty != *ty {
                        self.error(
                            Some(block),
                            format!("projection of field {field} annotated {ty:?}, field is {field_ty:?}"),
                        );
                    }
                }
            }
            Instr::Set { base, field, value } => {
                let Some(base_ty) = self.use_type(block, *base) else {
                    return;
                };
                if let Some(field_ty) = self.field_type(block, base_ty, *field) {
                    self.expect_type(block, *value, &field_ty, "field store");
                }
            }
            Instr::Retain { var } | Instr::Release { var } => {
                if let Some(ty) = self.use_type(block, *var) {
                    if !ty.needs_rc() {
                        self.error(
                            Some(block),
                            format!("reference count operation on {ty:?}"),
                        );
                    }
                }
            }
        }
    }

    fn check_value(&mut self, block: BlockId, ty: &IrType, value: &Value) {
        match value {
            Value::Var(var) => self.expect_type(block, *var, ty, "copy"),
            Value::Literal(lit) => {
                if lit.ty() != *ty {
                    self.error(Some(block), format!("literal {lit:?} annotated {ty:?}"));
                }
            }
            Value::PrimOp { op, args } => {
                let operand = if op.takes_bool() {
                    IrType::Bool
                } else {
                    IrType::Int
                };
                let result = if op.yields_bool() {
                    IrType::Bool
                } else {
                    IrType::Int
                };
                self.expect_args(block, args, &[operand.clone(), operand], op.as_symbol());
                if result != *ty {
                    self.error(
                        Some(block),
                        format!("`{}` yields {result:?}, annotated {ty:?}", op.as_symbol()),
                    );
                }
            }
            Value::Zeroed => {
                if !matches!(ty, IrType::Value(_)) {
                    self.error(Some(block), format!("zeroed storage of non-value {ty:?}"));
                }
            }
        }
    }

    fn check_terminator(&mut self, block: BlockId, terminator: &Terminator) {
        for target in terminator.successors() {
            if self.func.block(target).is_none() {
                self.error(
                    Some(block),
                    format!("branch to missing block bb{}", target.raw()),
                );
            }
        }

        match terminator {
            Terminator::Return { value } => {
                let func = self.func;
                let result = &func.sig.result;
                self.expect_type(block, *value, result, "return");
            }
            Terminator::Jump { target, args } => {
                if let Some(target_block) = self.func.block(*target) {
                    let params: Vec<IrType> =
                        target_block.params.iter().map(|(_, ty)| ty.clone()).collect();
                    self.expect_args(block, args, &params, "jump");
                }
            }
            Terminator::Branch { cond, .. } => {
                self.expect_type(block, *cond, &IrType::Bool, "branch condition");
            }
            Terminator::Unreachable => {}
        }
    }
}
