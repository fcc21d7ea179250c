//! Expression node definitions.

use crate::ast::ast::{ArgId, ExprId, FnBody, StmtId};
use crate::ast::types::TypeExpr;

/// Binary operators, matching the operand and result typing rules in the
/// checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
}

impl BinaryOp {
    /// Source-level spelling, used in error messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
        }
    }
}

/// The closed set of expression kinds.
///
/// `Lambda` and `ChannelLoad` are reserved surface area, rejected by the
/// checker with `NotSupported`.
#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Variable(String),
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Negate(ExprId),
    ArrayAccess {
        array: ExprId,
        index: ExprId,
    },
    ArrayLiteral(Vec<ExprId>),
    FunctionCall {
        name: String,
        generic: Option<TypeExpr>,
        arguments: Vec<ExprId>,
    },
    Await(ExprId),
    Block {
        statements: Vec<StmtId>,
        result: ExprId,
    },
    Lambda {
        is_async: bool,
        args: Vec<ArgId>,
        return_type: TypeExpr,
        body: FnBody,
    },
    ChannelLoad(ExprId),
}
