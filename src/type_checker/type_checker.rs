//! The type checking pass.
//!
//! [`type_check`] walks the tree exactly once, in source order, and fills a
//! [`TypeTable`] keyed by node id. Every expression gets an entry; statements
//! get one only when they carry a type another pass needs (blocks, branches,
//! loops, returns, extern signatures and function bodies). Checking stops at
//! the first error.
//!
//! Typing is strictly structural: there are no implicit conversions, and two
//! types are compatible exactly when they are equal.

use std::collections::HashMap;

use crate::ast::ast::{ArgId, Ast, Chunk, ExprId, FnBody, StmtId};
use crate::ast::expressions::{BinaryOp, Expr};
use crate::ast::statements::Stmt;
use crate::ast::types::{Ty, TypeExpr};
use crate::errors::errors::SemanticError;
use crate::scope::ScopeStack;

/// The annotation table produced by a successful check.
///
/// The lowering pass looks types up here instead of re-deriving them, so
/// entries are total over the expressions the checker visited.
#[derive(Debug, Default, PartialEq)]
pub struct TypeTable {
    expr_types: HashMap<ExprId, Ty>,
    stmt_types: HashMap<StmtId, Ty>,
    arg_types: HashMap<ArgId, Ty>,
}

impl TypeTable {
    fn set_expr(&mut self, id: ExprId, ty: Ty) {
        self.expr_types.insert(id, ty);
    }

    fn set_stmt(&mut self, id: StmtId, ty: Ty) {
        self.stmt_types.insert(id, ty);
    }

    fn set_arg(&mut self, id: ArgId, ty: Ty) {
        self.arg_types.insert(id, ty);
    }

    /// The recorded type of an expression. Panics if the expression was
    /// never checked, which is a bug in the caller.
    pub fn expr_ty(&self, id: ExprId) -> &Ty {
        self.expr_types
            .get(&id)
            .unwrap_or_else(|| panic!("expression {id:?} has no recorded type"))
    }

    /// The recorded type of a statement, if it carries one.
    pub fn stmt_ty(&self, id: StmtId) -> Option<&Ty> {
        self.stmt_types.get(&id)
    }

    /// The resolved type of a function argument. Panics if the argument was
    /// never checked, which is a bug in the caller.
    pub fn arg_ty(&self, id: ArgId) -> &Ty {
        self.arg_types
            .get(&id)
            .unwrap_or_else(|| panic!("argument {id:?} has no recorded type"))
    }

    /// Number of recorded expression entries.
    pub fn expr_entries(&self) -> usize {
        self.expr_types.len()
    }
}

/// Checks a whole tree and returns its annotation table.
pub fn type_check(chunk: &Chunk, ast: &Ast) -> Result<TypeTable, SemanticError> {
    let mut checker = TypeChecker::new(ast);
    for &stmt in &chunk.statements {
        checker.check_stmt(stmt)?;
    }
    Ok(checker.table)
}

struct TypeChecker<'ast> {
    ast: &'ast Ast,
    table: TypeTable,
    scope: ScopeStack<Ty>,
}

impl<'ast> TypeChecker<'ast> {
    fn new(ast: &'ast Ast) -> Self {
        TypeChecker {
            ast,
            table: TypeTable::default(),
            scope: ScopeStack::new(),
        }
    }

    /// Runs `f` inside a fresh scope frame, popping it again whether or not
    /// `f` succeeds.
    fn in_scope<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, SemanticError>,
    ) -> Result<R, SemanticError> {
        self.scope.push();
        let result = f(self);
        self.scope.pop();
        result
    }

    /// Resolves surface type syntax into the checked algebra. Array syntax
    /// has no length, so it resolves to length zero; function syntax is
    /// never variadic on its own, externs opt in separately.
    fn resolve_type(&self, ty: &TypeExpr) -> Ty {
        match ty {
            TypeExpr::Int => Ty::Int,
            TypeExpr::Bool => Ty::Bool,
            TypeExpr::Float => Ty::Float,
            TypeExpr::String => Ty::String,
            TypeExpr::Void => Ty::Void,
            TypeExpr::Array(elem) => Ty::Array {
                elem: Box::new(self.resolve_type(elem)),
                len: 0,
            },
            TypeExpr::Promise(inner) => Ty::Promise(Box::new(self.resolve_type(inner))),
            TypeExpr::Channel(inner) => Ty::Channel(Box::new(self.resolve_type(inner))),
            TypeExpr::Function {
                return_type,
                params,
            } => Ty::Function {
                return_type: Box::new(self.resolve_type(return_type)),
                params: params.iter().map(|p| self.resolve_type(p)).collect(),
                vararg: false,
            },
        }
    }

    /// Checks one statement. Returns the statement's type when it carries
    /// one, which is also recorded in the table.
    fn check_stmt(&mut self, id: StmtId) -> Result<Option<Ty>, SemanticError> {
        let stmt = self.ast.stmt(id);
        match stmt {
            Stmt::Block(statements) => {
                let ty = self.check_block(statements)?;
                self.table.set_stmt(id, ty.clone());
                Ok(Some(ty))
            }
            Stmt::Declaration { name, value, .. } => {
                let ty = self.check_expr(*value)?;
                if !self.scope.define(name, ty) {
                    return Err(SemanticError::DuplicateBinding { name: name.clone() });
                }
                Ok(None)
            }
            Stmt::Assignment { name, value } => {
                let expected = match self.scope.lookup(name) {
                    Some(ty) if !ty.is_function() => ty.clone(),
                    _ => {
                        return Err(SemanticError::UndefinedVariable { name: name.clone() });
                    }
                };
                let found = self.check_expr(*value)?;
                if found != expected {
                    return Err(SemanticError::TypeMismatch {
                        name: name.clone(),
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
                Ok(None)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_condition(*condition)?;
                let then_ty = self.check_stmt(*then_branch)?.unwrap_or(Ty::Void);
                if let Some(else_branch) = else_branch {
                    let else_ty = self.check_stmt(*else_branch)?.unwrap_or(Ty::Void);
                    if else_ty != then_ty {
                        return Err(SemanticError::BranchTypeMismatch {
                            then_ty: then_ty.to_string(),
                            else_ty: else_ty.to_string(),
                        });
                    }
                }
                self.table.set_stmt(id, then_ty.clone());
                Ok(Some(then_ty))
            }
            Stmt::While { condition, body } => {
                self.check_condition(*condition)?;
                let body_ty = self.check_stmt(*body)?.unwrap_or(Ty::Void);
                self.table.set_stmt(id, body_ty.clone());
                Ok(Some(body_ty))
            }
            Stmt::Return(value) => {
                let ty = match value {
                    Some(value) => self.check_expr(*value)?,
                    None => Ty::Void,
                };
                self.table.set_stmt(id, ty.clone());
                Ok(Some(ty))
            }
            Stmt::ExternFunction {
                name,
                vararg,
                signature,
            } => {
                if !self.scope.is_top_level() {
                    return Err(SemanticError::NestedDeclarationNotAllowed {
                        function: name.clone(),
                    });
                }
                let ty = match self.resolve_type(signature) {
                    Ty::Function {
                        return_type,
                        params,
                        ..
                    } => Ty::Function {
                        return_type,
                        params,
                        vararg: *vararg,
                    },
                    _ => {
                        return Err(SemanticError::NonFunctionExtern { name: name.clone() });
                    }
                };
                self.table.set_stmt(id, ty.clone());
                if !self.scope.define(name, ty) {
                    return Err(SemanticError::DuplicateBinding { name: name.clone() });
                }
                Ok(None)
            }
            Stmt::FunctionDefinition {
                name,
                is_async,
                args,
                return_type,
                body,
            } => {
                self.check_function_definition(id, name, *is_async, args, return_type, *body)?;
                Ok(None)
            }
            Stmt::FunctionCall { arguments, .. } => {
                // A bare call statement accepts any callee, the arguments
                // still need annotations for lowering.
                for &arg in arguments {
                    self.check_expr(arg)?;
                }
                Ok(None)
            }
            Stmt::Await(value) => {
                let ty = self.check_expr(*value)?;
                match ty {
                    Ty::Promise(_) => Ok(None),
                    other => Err(SemanticError::AwaitOnNonPromise {
                        found: other.to_string(),
                    }),
                }
            }
            Stmt::For { .. } => Err(SemanticError::NotSupported {
                construct: "for".to_string(),
            }),
            Stmt::ChannelPush { .. } => Err(SemanticError::NotSupported {
                construct: "channel push".to_string(),
            }),
        }
    }

    /// Checks a block's statements in a fresh frame. The block's type is the
    /// common type of its typed statements, or void when none carry one.
    fn check_block(&mut self, statements: &[StmtId]) -> Result<Ty, SemanticError> {
        let statements = statements.to_vec();
        self.in_scope(|checker| {
            let mut block_ty: Option<Ty> = None;
            for stmt in statements {
                let Some(ty) = checker.check_stmt(stmt)? else {
                    continue;
                };
                match &block_ty {
                    None => block_ty = Some(ty),
                    Some(first) if *first != ty => {
                        return Err(SemanticError::InconsistentBlockType {
                            first: first.to_string(),
                            other: ty.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
            Ok(block_ty.unwrap_or(Ty::Void))
        })
    }

    fn check_condition(&mut self, condition: ExprId) -> Result<(), SemanticError> {
        let ty = self.check_expr(condition)?;
        if ty != Ty::Bool {
            return Err(SemanticError::NonBooleanCondition {
                found: ty.to_string(),
            });
        }
        Ok(())
    }

    fn check_function_definition(
        &mut self,
        id: StmtId,
        name: &str,
        is_async: bool,
        args: &[ArgId],
        return_type: &TypeExpr,
        body: FnBody,
    ) -> Result<(), SemanticError> {
        if name == "main" {
            return Err(SemanticError::ReservedFunctionName {
                name: name.to_string(),
            });
        }
        if !self.scope.is_top_level() {
            return Err(SemanticError::NestedDeclarationNotAllowed {
                function: name.to_string(),
            });
        }

        let declared = self.resolve_type(return_type);
        if is_async && !matches!(declared, Ty::Promise(_)) {
            return Err(SemanticError::AsyncMustReturnPromise {
                function: name.to_string(),
            });
        }

        let mut params = Vec::with_capacity(args.len());
        for &arg in args {
            let ty = self.resolve_type(&self.ast.arg(arg).ty);
            self.table.set_arg(arg, ty.clone());
            params.push(ty);
        }
        let fn_ty = Ty::Function {
            return_type: Box::new(declared.clone()),
            params: params.clone(),
            vararg: false,
        };

        // Bodies see only their parameters and already-declared top-level
        // names that live in the root frame of a fresh stack; the enclosing
        // stack is set aside rather than pushed on so the restore also holds
        // on the error path.
        let saved = std::mem::take(&mut self.scope);
        let result = self.check_function_body(name, args, &params, &fn_ty, body);
        self.scope = saved;
        let body_ty = result?;

        let computed = if is_async {
            Ty::Promise(Box::new(body_ty.clone()))
        } else {
            body_ty.clone()
        };
        if computed != declared {
            return Err(SemanticError::SignatureMismatch {
                function: name.to_string(),
                declared: declared.to_string(),
                found: computed.to_string(),
            });
        }

        self.table.set_stmt(id, body_ty);
        if !self.scope.define(name, fn_ty) {
            return Err(SemanticError::DuplicateBinding {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn check_function_body(
        &mut self,
        name: &str,
        args: &[ArgId],
        params: &[Ty],
        fn_ty: &Ty,
        body: FnBody,
    ) -> Result<Ty, SemanticError> {
        self.scope.push();
        for (&arg, ty) in args.iter().zip(params) {
            let arg_name = self.ast.arg(arg).name.clone();
            if !self.scope.define(&arg_name, ty.clone()) {
                return Err(SemanticError::DuplicateBinding { name: arg_name });
            }
        }
        // Recursion: the function may call itself. A parameter shadowing
        // the function name wins.
        self.scope.define(name, fn_ty.clone());

        match body {
            FnBody::Stmt(stmt) => Ok(self.check_stmt(stmt)?.unwrap_or(Ty::Void)),
            FnBody::Expr(expr) => self.check_expr(expr),
        }
    }

    /// Checks one expression and records its type in the table.
    fn check_expr(&mut self, id: ExprId) -> Result<Ty, SemanticError> {
        let expr = self.ast.expr(id);
        let ty = match expr {
            Expr::Int(_) => Ty::Int,
            Expr::Float(_) => Ty::Float,
            Expr::Bool(_) => Ty::Bool,
            Expr::Str(_) => Ty::String,
            Expr::Variable(name) => match self.scope.lookup(name) {
                Some(ty) if !ty.is_function() => ty.clone(),
                _ => {
                    return Err(SemanticError::UndefinedVariable { name: name.clone() });
                }
            },
            Expr::Negate(value) => {
                let ty = self.check_expr(*value)?;
                if ty != Ty::Bool {
                    return Err(SemanticError::NonBooleanNegation {
                        found: ty.to_string(),
                    });
                }
                Ty::Bool
            }
            Expr::Binary { op, left, right } => self.check_binary(*op, *left, *right)?,
            Expr::ArrayAccess { array, index } => {
                let array_ty = self.check_expr(*array)?;
                let index_ty = self.check_expr(*index)?;
                if index_ty != Ty::Int {
                    return Err(SemanticError::NonIntegerIndex {
                        found: index_ty.to_string(),
                    });
                }
                match array_ty {
                    Ty::Array { elem, .. } => *elem,
                    other => {
                        return Err(SemanticError::IndexOnNonArray {
                            found: other.to_string(),
                        });
                    }
                }
            }
            Expr::ArrayLiteral(items) => {
                let items = items.clone();
                if items.is_empty() {
                    return Err(SemanticError::EmptyArrayLiteral);
                }
                let mut elem: Option<Ty> = None;
                for &item in &items {
                    let ty = self.check_expr(item)?;
                    match &elem {
                        None => elem = Some(ty),
                        Some(first) if *first != ty => {
                            return Err(SemanticError::ArrayElementTypeMismatch {
                                first: first.to_string(),
                                other: ty.to_string(),
                            });
                        }
                        Some(_) => {}
                    }
                }
                Ty::Array {
                    elem: Box::new(elem.unwrap_or(Ty::Void)),
                    len: items.len() as u32,
                }
            }
            Expr::FunctionCall {
                name, arguments, ..
            } => self.check_call(name.clone(), arguments.clone())?,
            Expr::Await(value) => {
                let ty = self.check_expr(*value)?;
                match ty {
                    Ty::Promise(inner) => *inner,
                    other => {
                        return Err(SemanticError::AwaitOnNonPromise {
                            found: other.to_string(),
                        });
                    }
                }
            }
            Expr::Block { statements, result } => {
                let statements = statements.clone();
                let result = *result;
                self.in_scope(|checker| {
                    for stmt in statements {
                        checker.check_stmt(stmt)?;
                    }
                    checker.check_expr(result)
                })?
            }
            Expr::Lambda { .. } => {
                return Err(SemanticError::NotSupported {
                    construct: "lambda".to_string(),
                });
            }
            Expr::ChannelLoad(_) => {
                return Err(SemanticError::NotSupported {
                    construct: "channel load".to_string(),
                });
            }
        };
        self.table.set_expr(id, ty.clone());
        Ok(ty)
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    ) -> Result<Ty, SemanticError> {
        let left_ty = self.check_expr(left)?;
        let right_ty = self.check_expr(right)?;
        if left_ty != right_ty {
            return Err(SemanticError::OperandTypeMismatch {
                op: op.symbol().to_string(),
                left: left_ty.to_string(),
                right: right_ty.to_string(),
            });
        }

        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                if !left_ty.is_numeric() {
                    return Err(SemanticError::NonNumericOperand {
                        op: op.symbol().to_string(),
                        found: left_ty.to_string(),
                    });
                }
                Ok(left_ty)
            }
            BinaryOp::Rem => {
                if left_ty != Ty::Int {
                    return Err(SemanticError::NonNumericOperand {
                        op: op.symbol().to_string(),
                        found: left_ty.to_string(),
                    });
                }
                Ok(Ty::Int)
            }
            BinaryOp::Lt
            | BinaryOp::Lte
            | BinaryOp::Gt
            | BinaryOp::Gte
            | BinaryOp::Eq
            | BinaryOp::Neq => {
                if !left_ty.is_numeric() {
                    return Err(SemanticError::NonNumericOperand {
                        op: op.symbol().to_string(),
                        found: left_ty.to_string(),
                    });
                }
                Ok(Ty::Bool)
            }
            BinaryOp::And | BinaryOp::Or => {
                if left_ty != Ty::Bool {
                    return Err(SemanticError::NonBooleanOperand {
                        op: op.symbol().to_string(),
                        found: left_ty.to_string(),
                    });
                }
                Ok(Ty::Bool)
            }
        }
    }

    fn check_call(&mut self, name: String, arguments: Vec<ExprId>) -> Result<Ty, SemanticError> {
        let (return_type, params, vararg) = match self.scope.lookup(&name) {
            Some(Ty::Function {
                return_type,
                params,
                vararg,
            }) => (return_type.as_ref().clone(), params.clone(), *vararg),
            Some(_) => {
                return Err(SemanticError::NotAFunction { name });
            }
            None => {
                return Err(SemanticError::UndefinedFunction { name });
            }
        };

        // Arguments are always visited so the table stays total, even when
        // a variadic signature skips the per-position checks.
        for &arg in &arguments {
            self.check_expr(arg)?;
        }
        if vararg {
            return Ok(return_type);
        }

        if arguments.len() != params.len() {
            return Err(SemanticError::ArgumentMismatch {
                function: name,
                expected: format!("{} arguments", params.len()),
                found: format!("{} arguments", arguments.len()),
            });
        }
        for (&arg, param) in arguments.iter().zip(&params) {
            let found = self.table.expr_ty(arg);
            if found != param {
                return Err(SemanticError::ArgumentMismatch {
                    function: name,
                    expected: param.to_string(),
                    found: found.to_string(),
                });
            }
        }
        Ok(return_type)
    }
}
