//! Expression lowering.

use tern_ast::{ClosureExpr, DeclId, Expr, Name, Semantics};
use tern_ir::{Constant, IrType, Literal, Value};

use super::{BodyLowerer, Lowered};
use crate::index::DeclInfo;
use crate::LowerError;

impl BodyLowerer<'_, '_> {
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Result<Lowered, LowerError> {
        match expr {
            Expr::Unit => Ok(self.lower_literal(Literal::Unit)),
            Expr::Int(n) => Ok(self.lower_literal(Literal::Int(*n))),
            Expr::Bool(b) => Ok(self.lower_literal(Literal::Bool(*b))),
            Expr::Var(name) => self.lower_var(*name),
            Expr::SelfRef => match &self.self_binding {
                Some(binding) => Ok(Lowered::borrowed(binding.var, binding.ty.clone())),
                None => Err(self.unbound("self")),
            },
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(lhs)?;
                let rhs = self.lower_expr(rhs)?;
                let ty = if op.yields_bool() {
                    IrType::Bool
                } else {
                    IrType::Int
                };
                let var = self.fgen.builder.emit_let(
                    ty.clone(),
                    Value::PrimOp {
                        op: *op,
                        args: vec![lhs.var, rhs.var],
                    },
                );
                Ok(Lowered::owned(var, ty))
            }
            Expr::Call { callee, args } => {
                self.lower_direct_call(Constant::primary(*callee), args, None)
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver = self.lower_expr(receiver)?;
                self.lower_direct_call(Constant::primary(*method), args, Some(receiver))
            }
            Expr::New { ctor, args } => {
                let entry = self.constructor_entry(*ctor)?;
                self.lower_direct_call(entry, args, None)
            }
            Expr::Closure(closure) => self.lower_closure(closure),
            Expr::CallValue { callee, args } => {
                let callee = self.lower_expr(callee)?;
                let IrType::Func(sig) = &callee.ty else {
                    return Err(self.malformed(format!(
                        "call through non-function value of type {:?}",
                        callee.ty
                    )));
                };
                let result = sig.result.clone();
                let args = self.lower_args(args)?;
                let vars = args.iter().map(|arg| arg.var).collect();
                let var = self
                    .fgen
                    .builder
                    .emit_apply_indirect(result.clone(), callee.var, vars);
                for arg in &args {
                    self.release_temporary(arg);
                }
                Ok(Lowered::owned(var, result))
            }
            Expr::Field { base, field } => self.lower_field_read(base, *field),
        }
    }

    fn lower_literal(&mut self, lit: Literal) -> Lowered {
        let var = self.fgen.builder.emit_literal(lit);
        Lowered::owned(var, lit.ty())
    }

    fn lower_var(&mut self, name: Name) -> Result<Lowered, LowerError> {
        match self.scope.lookup(name) {
            Some(binding) => Ok(Lowered::borrowed(binding.var, binding.ty.clone())),
            None => {
                let text = self.sgm.interner().lookup(name);
                Err(self.unbound(text))
            }
        }
    }

    fn unbound(&self, name: &str) -> LowerError {
        LowerError::UnboundName {
            function: self.fgen.symbol().to_owned(),
            name: name.to_owned(),
        }
    }

    fn lower_args(&mut self, args: &[Expr]) -> Result<Vec<Lowered>, LowerError> {
        args.iter().map(|arg| self.lower_expr(arg)).collect()
    }

    /// Emit a call to a generated function. `receiver`, already lowered,
    /// is passed last as `self`.
    fn lower_direct_call(
        &mut self,
        callee: Constant,
        args: &[Expr],
        receiver: Option<Lowered>,
    ) -> Result<Lowered, LowerError> {
        let sig = self.sgm.types.constant_type(callee)?;
        let mut args = self.lower_args(args)?;
        args.extend(receiver);

        let vars = args.iter().map(|arg| arg.var).collect();
        let var = self
            .fgen
            .builder
            .emit_apply(sig.result.clone(), callee, vars);
        for arg in &args {
            self.release_temporary(arg);
        }
        Ok(Lowered::owned(var, sig.result))
    }

    /// The constant a construction expression calls: the allocator of a
    /// class, the constructor itself for a struct.
    fn constructor_entry(&self, ctor: DeclId) -> Result<Constant, LowerError> {
        match self.sgm.types.index().get(ctor) {
            Some(DeclInfo::Constructor { owner, .. }) => Ok(match owner.semantics {
                Semantics::Reference => Constant::allocator(ctor),
                Semantics::Value => Constant::primary(ctor),
            }),
            _ => Err(self.malformed(format!(
                "construction through non-constructor declaration {}",
                ctor.raw()
            ))),
        }
    }

    /// Emit the closure's function, then refer to it as a value.
    fn lower_closure(&mut self, closure: &ClosureExpr) -> Result<Lowered, LowerError> {
        let constant = self.sgm.emit_closure(closure)?;
        let sig = self.sgm.types.constant_type(constant)?;
        let var = self.fgen.builder.emit_function_ref(sig.clone(), constant);
        Ok(Lowered::owned(var, IrType::Func(Box::new(sig))))
    }

    fn lower_field_read(&mut self, base: &Expr, field: u32) -> Result<Lowered, LowerError> {
        let base = self.lower_expr(base)?;
        let field_ty = self.field_type(&base.ty, field)?;
        let var = self
            .fgen
            .builder
            .emit_project(field_ty.clone(), base.var, field);

        if base.owned && base.ty.needs_rc() {
            // The base is a temporary that dies here; keep the field alive.
            if field_ty.needs_rc() {
                self.fgen.builder.emit_retain(var);
            }
            self.fgen.builder.emit_release(base.var);
            Ok(Lowered::owned(var, field_ty))
        } else {
            Ok(Lowered::borrowed(var, field_ty))
        }
    }
}
