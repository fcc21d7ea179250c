//! Core AST storage: the node arena, node ids and the top-level chunk.
//!
//! Nodes are immutable once built. The external front end allocates every
//! statement, expression and function argument into one [`Ast`] arena and
//! refers to children by index; the indices double as the node identities the
//! type checker keys its annotation table by. Two structurally identical
//! sub-expressions at different tree positions therefore get distinct ids and
//! are tracked independently.

use crate::ast::expressions::Expr;
use crate::ast::statements::Stmt;
use crate::ast::types::TypeExpr;

/// Identity of a statement node, assigned at arena insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(pub u32);

/// Identity of an expression node, assigned at arena insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// Identity of a function-argument node, assigned at arena insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgId(pub u32);

/// A declared parameter of a function definition or lambda.
#[derive(Debug, Clone)]
pub struct FunctionArg {
    pub name: String,
    pub ty: TypeExpr,
}

/// The body of a function definition: either a statement (normally a block)
/// or a bare expression.
#[derive(Debug, Clone, Copy)]
pub enum FnBody {
    Stmt(StmtId),
    Expr(ExprId),
}

/// A parsed program: the ordered list of top-level statements.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub statements: Vec<StmtId>,
}

/// Arena owning every node of one parsed tree.
#[derive(Debug, Default)]
pub struct Ast {
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
    args: Vec<FunctionArg>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub fn add_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.stmts.push(stmt);
        StmtId(self.stmts.len() as u32 - 1)
    }

    pub fn add_expr(&mut self, expr: Expr) -> ExprId {
        self.exprs.push(expr);
        ExprId(self.exprs.len() as u32 - 1)
    }

    pub fn add_arg(&mut self, arg: FunctionArg) -> ArgId {
        self.args.push(arg);
        ArgId(self.args.len() as u32 - 1)
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0 as usize]
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn arg(&self, id: ArgId) -> &FunctionArg {
        &self.args[id.0 as usize]
    }

    /// Number of expression nodes in the arena.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }
}
