//! AST visitor.
//!
//! A single [`Visitor`] trait walks a translation unit read-only. Default
//! `visit_*` methods call the matching `walk_*` function, so overriding a
//! method and calling `walk_*` from it keeps the traversal going.

use crate::{
    Block, ClosureExpr, ConstructorDecl, Decl, DestructorDecl, Expr, FuncDecl, Member,
    NominalTypeDecl, Stmt, TranslationUnit,
};

pub trait Visitor<'ast> {
    fn visit_unit(&mut self, unit: &'ast TranslationUnit) {
        walk_unit(self, unit);
    }

    fn visit_decl(&mut self, decl: &'ast Decl) {
        walk_decl(self, decl);
    }

    fn visit_func(&mut self, func: &'ast FuncDecl) {
        walk_func(self, func);
    }

    fn visit_nominal(&mut self, nominal: &'ast NominalTypeDecl) {
        walk_nominal(self, nominal);
    }

    fn visit_method(&mut self, owner: &'ast NominalTypeDecl, method: &'ast FuncDecl) {
        let _ = owner;
        walk_func(self, method);
    }

    fn visit_constructor(&mut self, owner: &'ast NominalTypeDecl, ctor: &'ast ConstructorDecl) {
        let _ = owner;
        if let Some(body) = &ctor.body {
            self.visit_block(body);
        }
    }

    fn visit_destructor(&mut self, owner: &'ast NominalTypeDecl, dtor: &'ast DestructorDecl) {
        let _ = owner;
        self.visit_block(&dtor.body);
    }

    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_closure(&mut self, closure: &'ast ClosureExpr) {
        self.visit_block(&closure.body);
    }
}

pub fn walk_unit<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, unit: &'ast TranslationUnit) {
    for decl in &unit.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, decl: &'ast Decl) {
    match decl {
        Decl::Func(func) => v.visit_func(func),
        Decl::PatternBinding(binding) => {
            if let Some(init) = &binding.init {
                v.visit_expr(init);
            }
        }
        Decl::Nominal(nominal) => v.visit_nominal(nominal),
        Decl::TopLevelCode(code) => v.visit_block(&code.body),
    }
}

pub fn walk_func<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, func: &'ast FuncDecl) {
    if let Some(body) = &func.body {
        v.visit_block(body);
    }
}

pub fn walk_nominal<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, nominal: &'ast NominalTypeDecl) {
    for member in &nominal.members {
        match member {
            Member::Constructor(ctor) => v.visit_constructor(nominal, ctor),
            Member::Destructor(dtor) => v.visit_destructor(nominal, dtor),
            Member::Method(method) => v.visit_method(nominal, method),
            Member::Nested(nested) => v.visit_nominal(nested),
        }
    }
}

pub fn walk_block<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, block: &'ast Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, stmt: &'ast Stmt) {
    match stmt {
        Stmt::Let { init, .. } | Stmt::Expr(init) => v.visit_expr(init),
        Stmt::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        Stmt::Scope(block) => v.visit_block(block),
        Stmt::If {
            cond,
            then_block,
            else_block,
        } => {
            v.visit_expr(cond);
            v.visit_block(then_block);
            if let Some(else_block) = else_block {
                v.visit_block(else_block);
            }
        }
        Stmt::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_block(body);
        }
        Stmt::AssignField { base, value, .. } => {
            v.visit_expr(base);
            v.visit_expr(value);
        }
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, expr: &'ast Expr) {
    match expr {
        Expr::Unit | Expr::Int(_) | Expr::Bool(_) | Expr::Var(_) | Expr::SelfRef => {}
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Call { args, .. } | Expr::New { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::MethodCall { receiver, args, .. } => {
            v.visit_expr(receiver);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Closure(closure) => v.visit_closure(closure),
        Expr::CallValue { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        Expr::Field { base, .. } => v.visit_expr(base),
    }
}
