//! Function bodies: blocks, statements, expressions.
//!
//! Bodies are plain owned trees. Every call site names its callee by
//! [`DeclId`], and every local reference names a binding that the type
//! checker has already resolved.

use crate::{DeclId, Name, Param, Ty};

/// A braced sequence of statements; also a lexical scope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// A statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    /// `let name: ty = init`. Bindings are immutable.
    Let { name: Name, ty: Ty, init: Expr },
    /// An expression evaluated for its effects.
    Expr(Expr),
    /// `return` / `return value`.
    Return(Option<Expr>),
    /// A nested `{ ... }` scope.
    Scope(Block),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    /// `base.field = value`, with the field given by declaration index.
    AssignField { base: Expr, field: u32, value: Expr },
}

/// Binary primitive operators over `int` and `bool`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    /// Source spelling of the operator.
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Whether the operands are `bool` (logical) rather than `int`.
    pub fn takes_bool(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Whether the result is `bool` rather than `int`.
    pub fn yields_bool(self) -> bool {
        !matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul)
    }
}

/// An expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Unit,
    Int(i64),
    Bool(bool),
    /// A local binding or parameter.
    Var(Name),
    /// The implicit `self` of a method, constructor, or destructor.
    SelfRef,
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Direct call to a free function.
    Call { callee: DeclId, args: Vec<Expr> },
    /// Direct call to a method; the receiver is passed as `self`.
    MethodCall {
        receiver: Box<Expr>,
        method: DeclId,
        args: Vec<Expr>,
    },
    /// Construction through a constructor declaration.
    New { ctor: DeclId, args: Vec<Expr> },
    Closure(ClosureExpr),
    /// Call through a function value.
    CallValue { callee: Box<Expr>, args: Vec<Expr> },
    /// Stored field read by declaration index.
    Field { base: Box<Expr>, field: u32 },
}

/// An anonymous function. Closures do not capture locals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosureExpr {
    pub id: DeclId,
    pub params: Vec<Param>,
    pub result: Ty,
    pub body: Block,
}

impl ClosureExpr {
    /// The function type of this closure as a value.
    pub fn ty(&self) -> Ty {
        Ty::Function {
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
            result: Box::new(self.result.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_ops_yield_bool() {
        assert!(BinaryOp::Lt.yields_bool());
        assert!(BinaryOp::And.yields_bool());
        assert!(!BinaryOp::Add.yields_bool());
    }

    #[test]
    fn only_logical_ops_take_bool() {
        assert!(BinaryOp::Or.takes_bool());
        assert!(!BinaryOp::Eq.takes_bool());
    }

    #[test]
    fn closure_type_mirrors_signature() {
        let closure = ClosureExpr {
            id: DeclId::new(3),
            params: vec![Param {
                name: Name::from_raw(1),
                ty: Ty::Int,
            }],
            result: Ty::Bool,
            body: Block::empty(),
        };
        assert_eq!(
            closure.ty(),
            Ty::Function {
                params: vec![Ty::Int],
                result: Box::new(Ty::Bool),
            }
        );
    }
}
