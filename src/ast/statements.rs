//! Statement node definitions.

use crate::ast::ast::{ArgId, ExprId, FnBody, StmtId};
use crate::ast::types::TypeExpr;

/// The closed set of statement kinds the two passes walk.
///
/// `For` and `ChannelPush` are reserved surface area: the front end may build
/// them, but the type checker rejects them with `NotSupported` and the
/// lowering pass never sees them.
#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Vec<StmtId>),
    Declaration {
        name: String,
        is_constant: bool,
        value: ExprId,
    },
    Assignment {
        name: String,
        value: ExprId,
    },
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    Return(Option<ExprId>),
    ExternFunction {
        name: String,
        vararg: bool,
        signature: TypeExpr,
    },
    FunctionDefinition {
        name: String,
        is_async: bool,
        args: Vec<ArgId>,
        return_type: TypeExpr,
        body: FnBody,
    },
    FunctionCall {
        name: String,
        generic: Option<TypeExpr>,
        arguments: Vec<ExprId>,
    },
    Await(ExprId),
    For {
        variable: String,
        parallel: bool,
        iterable: ExprId,
        body: StmtId,
    },
    ChannelPush {
        channel: ExprId,
        value: ExprId,
    },
}
