//! Statement lowering.

use tern_ast::{Block, Expr, Name, Stmt, Ty};

use super::{Binding, BodyLowerer, ReturnMode};
use crate::cleanup::Cleanup;
use crate::types::lower_type;
use crate::LowerError;

impl BodyLowerer<'_, '_> {
    /// Lower `stmts` in the current frame.
    ///
    /// Statements after a terminator are unreachable and are not lowered.
    pub(crate) fn lower_stmts(&mut self, stmts: &[Stmt]) -> Result<(), LowerError> {
        for (index, stmt) in stmts.iter().enumerate() {
            if !self.fgen.builder.has_insertion_point() {
                tracing::trace!(
                    function = self.fgen.symbol(),
                    skipped = stmts.len() - index,
                    "skipping unreachable statements"
                );
                break;
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    /// Lower a nested block in its own frame and cleanup scope.
    pub(crate) fn lower_block(&mut self, block: &Block) -> Result<(), LowerError> {
        let depth = self.fgen.cleanup_depth();
        self.scope.push();
        let result = self.lower_stmts(&block.stmts);
        self.scope.pop();
        result?;
        self.fgen.pop_scope(depth);
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), LowerError> {
        match stmt {
            Stmt::Let { name, ty, init } => self.lower_let(*name, ty, init),
            Stmt::Expr(expr) => {
                let value = self.lower_expr(expr)?;
                self.release_temporary(&value);
                Ok(())
            }
            Stmt::Return(value) => self.lower_return(value.as_ref()),
            Stmt::Scope(block) => self.lower_block(block),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => self.lower_if(cond, then_block, else_block.as_ref()),
            Stmt::While { cond, body } => self.lower_while(cond, body),
            Stmt::AssignField { base, field, value } => {
                self.lower_assign_field(base, *field, value)
            }
        }
    }

    fn lower_let(&mut self, name: Name, ty: &Ty, init: &Expr) -> Result<(), LowerError> {
        let value = self.lower_expr(init)?;
        let var = self.take_ownership(&value);
        let ty = lower_type(ty);
        if ty.needs_rc() {
            self.fgen.push_cleanup(Cleanup::Release { var });
        }
        self.scope.bind(name, Binding { var, ty });
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&Expr>) -> Result<(), LowerError> {
        let var = match (self.returns, value) {
            (ReturnMode::Forbidden, _) => return Err(LowerError::ReturnOutsideFunction),
            (ReturnMode::SelfValue, None) => match &self.self_binding {
                Some(binding) => binding.var,
                None => return Err(self.malformed("constructor without `self`")),
            },
            (ReturnMode::SelfValue, Some(_)) => {
                return Err(self.malformed("constructor returns a value"));
            }
            (ReturnMode::Value, Some(expr)) => {
                let value = self.lower_expr(expr)?;
                self.take_ownership(&value)
            }
            (ReturnMode::Value, None) => self.fgen.builder.emit_unit(),
        };
        self.fgen.emit_return(var);
        Ok(())
    }

    fn lower_if(
        &mut self,
        cond: &Expr,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> Result<(), LowerError> {
        let cond = self.lower_expr(cond)?;
        let then_bb = self.fgen.builder.new_block();
        // Without an else the false edge goes straight to the merge block;
        // with one, the merge block exists only if some branch falls through.
        let (else_bb, mut merge) = match else_block {
            Some(_) => (self.fgen.builder.new_block(), None),
            None => {
                let merge = self.fgen.builder.new_block();
                (merge, Some(merge))
            }
        };
        self.fgen.builder.terminate_branch(cond.var, then_bb, else_bb);

        self.fgen.builder.position_at(then_bb);
        self.lower_block(then_block)?;
        self.jump_to_merge(&mut merge);

        if let Some(else_block) = else_block {
            self.fgen.builder.position_at(else_bb);
            self.lower_block(else_block)?;
            self.jump_to_merge(&mut merge);
        }

        if let Some(merge) = merge {
            self.fgen.builder.position_at(merge);
        }
        Ok(())
    }

    /// If control falls through, jump to the merge block, creating it.
    fn jump_to_merge(&mut self, merge: &mut Option<tern_ir::BlockId>) {
        if !self.fgen.builder.has_insertion_point() {
            return;
        }
        let target = match *merge {
            Some(block) => block,
            None => {
                let block = self.fgen.builder.new_block();
                *merge = Some(block);
                block
            }
        };
        self.fgen.builder.terminate_jump(target, vec![]);
    }

    fn lower_while(&mut self, cond: &Expr, body: &Block) -> Result<(), LowerError> {
        let header = self.fgen.builder.new_block();
        self.fgen.builder.terminate_jump(header, vec![]);

        self.fgen.builder.position_at(header);
        let cond = self.lower_expr(cond)?;
        let body_bb = self.fgen.builder.new_block();
        let exit = self.fgen.builder.new_block();
        self.fgen.builder.terminate_branch(cond.var, body_bb, exit);

        self.fgen.builder.position_at(body_bb);
        self.lower_block(body)?;
        if self.fgen.builder.has_insertion_point() {
            self.fgen.builder.terminate_jump(header, vec![]);
        }

        self.fgen.builder.position_at(exit);
        Ok(())
    }

    fn lower_assign_field(
        &mut self,
        base_expr: &Expr,
        field: u32,
        value: &Expr,
    ) -> Result<(), LowerError> {
        let base = self.lower_expr(base_expr)?;
        let field_ty = self.field_type(&base.ty, field)?;
        let value = self.lower_expr(value)?;
        let new_value = self.take_ownership(&value);

        let initializing = self.initializing && matches!(base_expr, Expr::SelfRef);
        let old_value = (field_ty.needs_rc() && !initializing)
            .then(|| self.fgen.builder.emit_project(field_ty.clone(), base.var, field));

        self.fgen.builder.emit_set(base.var, field, new_value);
        if let Some(old_value) = old_value {
            self.fgen.builder.emit_release(old_value);
        }
        self.release_temporary(&base);
        Ok(())
    }
}
