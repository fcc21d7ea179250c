//! Integration tests for end-to-end lowering.
//!
//! These tests build trees the way the front end would, run them through
//! type checking and lowering, and check the verified LLVM module.

use inkwell::context::Context;
use twinec::{
    ast::{
        ast::{Ast, Chunk, FnBody, FunctionArg},
        expressions::{BinaryOp, Expr},
        statements::Stmt,
        types::TypeExpr,
    },
    compiler::compiler::compile,
    type_checker::type_checker::type_check,
};

fn check_and_compile(chunk: Chunk, ast: Ast, name: &str, context: &Context) -> String {
    let table = type_check(&chunk, &ast).expect("type checking should succeed");
    let compiler = compile(chunk, ast, table, name, context).expect("lowering should verify");
    compiler.module.print_to_string().to_string()
}

#[test]
fn test_compile_empty_program() {
    let ast = Ast::new();
    let chunk = Chunk { statements: vec![] };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "empty", &context);
    assert!(ir.contains("define void @main()"));
}

#[test]
fn test_compile_declarations_and_arithmetic() {
    let mut ast = Ast::new();
    let one = ast.add_expr(Expr::Int(1));
    let two = ast.add_expr(Expr::Int(2));
    let sum = ast.add_expr(Expr::Binary {
        op: BinaryOp::Add,
        left: one,
        right: two,
    });
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "x".to_string(),
        is_constant: false,
        value: sum,
    });
    let x = ast.add_expr(Expr::Variable("x".to_string()));
    let three = ast.add_expr(Expr::Int(3));
    let product = ast.add_expr(Expr::Binary {
        op: BinaryOp::Mul,
        left: x,
        right: three,
    });
    let decl_y = ast.add_stmt(Stmt::Declaration {
        name: "y".to_string(),
        is_constant: false,
        value: product,
    });
    let chunk = Chunk {
        statements: vec![decl, decl_y],
    };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "arith", &context);
    // Variables live in heap cells, not stack slots.
    assert!(ir.contains("malloc"));
}

#[test]
fn test_compile_float_arithmetic() {
    let mut ast = Ast::new();
    let half = ast.add_expr(Expr::Float(0.5));
    let quarter = ast.add_expr(Expr::Float(0.25));
    let sum = ast.add_expr(Expr::Binary {
        op: BinaryOp::Add,
        left: half,
        right: quarter,
    });
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "x".to_string(),
        is_constant: false,
        value: sum,
    });
    let chunk = Chunk {
        statements: vec![decl],
    };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "floats", &context);
    assert!(ir.contains("fadd"));
}

#[test]
fn test_compile_control_flow() {
    let mut ast = Ast::new();
    let ten = ast.add_expr(Expr::Int(10));
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "x".to_string(),
        is_constant: false,
        value: ten,
    });
    let x = ast.add_expr(Expr::Variable("x".to_string()));
    let five = ast.add_expr(Expr::Int(5));
    let cond = ast.add_expr(Expr::Binary {
        op: BinaryOp::Gt,
        left: x,
        right: five,
    });
    let one = ast.add_expr(Expr::Int(1));
    let then_assign = ast.add_stmt(Stmt::Assignment {
        name: "x".to_string(),
        value: one,
    });
    let zero = ast.add_expr(Expr::Int(0));
    let else_assign = ast.add_stmt(Stmt::Assignment {
        name: "x".to_string(),
        value: zero,
    });
    let then_block = ast.add_stmt(Stmt::Block(vec![then_assign]));
    let else_block = ast.add_stmt(Stmt::Block(vec![else_assign]));
    let branch = ast.add_stmt(Stmt::If {
        condition: cond,
        then_branch: then_block,
        else_branch: Some(else_block),
    });
    let chunk = Chunk {
        statements: vec![decl, branch],
    };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "control_flow", &context);
    assert!(ir.contains("then:"));
    assert!(ir.contains("else:"));
}

#[test]
fn test_compile_while_loop() {
    let mut ast = Ast::new();
    let zero = ast.add_expr(Expr::Int(0));
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "i".to_string(),
        is_constant: false,
        value: zero,
    });
    let i = ast.add_expr(Expr::Variable("i".to_string()));
    let ten = ast.add_expr(Expr::Int(10));
    let cond = ast.add_expr(Expr::Binary {
        op: BinaryOp::Lt,
        left: i,
        right: ten,
    });
    let i_again = ast.add_expr(Expr::Variable("i".to_string()));
    let one = ast.add_expr(Expr::Int(1));
    let next = ast.add_expr(Expr::Binary {
        op: BinaryOp::Add,
        left: i_again,
        right: one,
    });
    let step = ast.add_stmt(Stmt::Assignment {
        name: "i".to_string(),
        value: next,
    });
    let body = ast.add_stmt(Stmt::Block(vec![step]));
    let while_stmt = ast.add_stmt(Stmt::While {
        condition: cond,
        body,
    });
    let chunk = Chunk {
        statements: vec![decl, while_stmt],
    };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "while_loop", &context);
    assert!(ir.contains("cond:"));
    assert!(ir.contains("body:"));
}

#[test]
fn test_compile_function_and_call() {
    let mut ast = Ast::new();
    let arg_a = ast.add_arg(FunctionArg {
        name: "a".to_string(),
        ty: TypeExpr::Int,
    });
    let arg_b = ast.add_arg(FunctionArg {
        name: "b".to_string(),
        ty: TypeExpr::Int,
    });
    let a = ast.add_expr(Expr::Variable("a".to_string()));
    let b = ast.add_expr(Expr::Variable("b".to_string()));
    let sum = ast.add_expr(Expr::Binary {
        op: BinaryOp::Add,
        left: a,
        right: b,
    });
    let ret = ast.add_stmt(Stmt::Return(Some(sum)));
    let body = ast.add_stmt(Stmt::Block(vec![ret]));
    let def = ast.add_stmt(Stmt::FunctionDefinition {
        name: "add".to_string(),
        is_async: false,
        args: vec![arg_a, arg_b],
        return_type: TypeExpr::Int,
        body: FnBody::Stmt(body),
    });
    let one = ast.add_expr(Expr::Int(1));
    let two = ast.add_expr(Expr::Int(2));
    let call = ast.add_expr(Expr::FunctionCall {
        name: "add".to_string(),
        generic: None,
        arguments: vec![one, two],
    });
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "result".to_string(),
        is_constant: false,
        value: call,
    });
    let chunk = Chunk {
        statements: vec![def, decl],
    };

    let context = Context::create();
    let table = type_check(&chunk, &ast).expect("type checking should succeed");
    let compiler = compile(chunk, ast, table, "functions", &context).unwrap();

    let function = compiler.module.get_function("add").unwrap();
    assert_eq!(function.count_params(), 2);
}

#[test]
fn test_compile_function_returning_on_both_branches() {
    let mut ast = Ast::new();
    let arg_a = ast.add_arg(FunctionArg {
        name: "a".to_string(),
        ty: TypeExpr::Int,
    });
    let arg_b = ast.add_arg(FunctionArg {
        name: "b".to_string(),
        ty: TypeExpr::Int,
    });
    let a = ast.add_expr(Expr::Variable("a".to_string()));
    let b = ast.add_expr(Expr::Variable("b".to_string()));
    let cond = ast.add_expr(Expr::Binary {
        op: BinaryOp::Gt,
        left: a,
        right: b,
    });
    let a_again = ast.add_expr(Expr::Variable("a".to_string()));
    let b_again = ast.add_expr(Expr::Variable("b".to_string()));
    let then_ret = ast.add_stmt(Stmt::Return(Some(a_again)));
    let else_ret = ast.add_stmt(Stmt::Return(Some(b_again)));
    let then_block = ast.add_stmt(Stmt::Block(vec![then_ret]));
    let else_block = ast.add_stmt(Stmt::Block(vec![else_ret]));
    let branch = ast.add_stmt(Stmt::If {
        condition: cond,
        then_branch: then_block,
        else_branch: Some(else_block),
    });
    let body = ast.add_stmt(Stmt::Block(vec![branch]));
    let def = ast.add_stmt(Stmt::FunctionDefinition {
        name: "max".to_string(),
        is_async: false,
        args: vec![arg_a, arg_b],
        return_type: TypeExpr::Int,
        body: FnBody::Stmt(body),
    });
    let chunk = Chunk {
        statements: vec![def],
    };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "both_branches", &context);
    assert!(ir.contains("unreachable"));
}

#[test]
fn test_compile_extern_vararg() {
    let mut ast = Ast::new();
    let ext = ast.add_stmt(Stmt::ExternFunction {
        name: "printf".to_string(),
        vararg: true,
        signature: TypeExpr::Function {
            return_type: Box::new(TypeExpr::Int),
            params: vec![TypeExpr::String],
        },
    });
    let fmt = ast.add_expr(Expr::Str("%d\n".to_string()));
    let answer = ast.add_expr(Expr::Int(42));
    let call = ast.add_stmt(Stmt::FunctionCall {
        name: "printf".to_string(),
        generic: None,
        arguments: vec![fmt, answer],
    });
    let chunk = Chunk {
        statements: vec![ext, call],
    };

    let context = Context::create();
    let table = type_check(&chunk, &ast).expect("type checking should succeed");
    let compiler = compile(chunk, ast, table, "externs", &context).unwrap();

    let printf = compiler.module.get_function("printf").unwrap();
    assert!(printf.get_type().is_var_arg());
}

#[test]
fn test_compile_array_literal_and_access() {
    let mut ast = Ast::new();
    let one = ast.add_expr(Expr::Int(1));
    let two = ast.add_expr(Expr::Int(2));
    let three = ast.add_expr(Expr::Int(3));
    let literal = ast.add_expr(Expr::ArrayLiteral(vec![one, two, three]));
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "xs".to_string(),
        is_constant: false,
        value: literal,
    });
    let xs = ast.add_expr(Expr::Variable("xs".to_string()));
    let index = ast.add_expr(Expr::Int(1));
    let access = ast.add_expr(Expr::ArrayAccess { array: xs, index });
    let read = ast.add_stmt(Stmt::Declaration {
        name: "second".to_string(),
        is_constant: false,
        value: access,
    });
    let chunk = Chunk {
        statements: vec![decl, read],
    };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "arrays", &context);
    assert!(ir.contains("getelementptr"));
}

#[test]
fn test_compile_string_literal() {
    let mut ast = Ast::new();
    let greeting = ast.add_expr(Expr::Str("hello".to_string()));
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "s".to_string(),
        is_constant: false,
        value: greeting,
    });
    let chunk = Chunk {
        statements: vec![decl],
    };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "strings", &context);
    // Six bytes: the five characters and the terminator.
    assert!(ir.contains("[6 x i8]"));
}

#[test]
fn test_compile_async_spawn_and_await() {
    let mut ast = Ast::new();
    let arg = ast.add_arg(FunctionArg {
        name: "n".to_string(),
        ty: TypeExpr::Int,
    });
    let n = ast.add_expr(Expr::Variable("n".to_string()));
    let one = ast.add_expr(Expr::Int(1));
    let sum = ast.add_expr(Expr::Binary {
        op: BinaryOp::Add,
        left: n,
        right: one,
    });
    let ret = ast.add_stmt(Stmt::Return(Some(sum)));
    let body = ast.add_stmt(Stmt::Block(vec![ret]));
    let def = ast.add_stmt(Stmt::FunctionDefinition {
        name: "work".to_string(),
        is_async: true,
        args: vec![arg],
        return_type: TypeExpr::Promise(Box::new(TypeExpr::Int)),
        body: FnBody::Stmt(body),
    });
    let five = ast.add_expr(Expr::Int(5));
    let call = ast.add_expr(Expr::FunctionCall {
        name: "work".to_string(),
        generic: None,
        arguments: vec![five],
    });
    let awaited = ast.add_expr(Expr::Await(call));
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "result".to_string(),
        is_constant: false,
        value: awaited,
    });
    let chunk = Chunk {
        statements: vec![def, decl],
    };

    let context = Context::create();
    let table = type_check(&chunk, &ast).expect("type checking should succeed");
    let compiler = compile(chunk, ast, table, "async", &context).unwrap();

    let ir = compiler.module.print_to_string().to_string();
    assert!(ir.contains("pthread_create"));
    assert!(ir.contains("pthread_join"));

    // The async entry takes the packed record, not the declared arguments.
    let work = compiler.module.get_function("work").unwrap();
    assert_eq!(work.count_params(), 1);
    assert!(work.get_type().get_return_type().unwrap().is_pointer_type());
}

#[test]
fn test_compile_await_statement_discards_result() {
    let mut ast = Ast::new();
    let one = ast.add_expr(Expr::Int(1));
    let def = ast.add_stmt(Stmt::FunctionDefinition {
        name: "work".to_string(),
        is_async: true,
        args: vec![],
        return_type: TypeExpr::Promise(Box::new(TypeExpr::Int)),
        body: FnBody::Expr(one),
    });
    let call = ast.add_expr(Expr::FunctionCall {
        name: "work".to_string(),
        generic: None,
        arguments: vec![],
    });
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "p".to_string(),
        is_constant: false,
        value: call,
    });
    let p = ast.add_expr(Expr::Variable("p".to_string()));
    let await_stmt = ast.add_stmt(Stmt::Await(p));
    let chunk = Chunk {
        statements: vec![def, decl, await_stmt],
    };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "await_stmt", &context);
    assert!(ir.contains("pthread_join"));
}

#[test]
fn test_compile_async_void_body() {
    let mut ast = Ast::new();
    let ret = ast.add_stmt(Stmt::Return(None));
    let body = ast.add_stmt(Stmt::Block(vec![ret]));
    let def = ast.add_stmt(Stmt::FunctionDefinition {
        name: "background".to_string(),
        is_async: true,
        args: vec![],
        return_type: TypeExpr::Promise(Box::new(TypeExpr::Void)),
        body: FnBody::Stmt(body),
    });
    let call = ast.add_expr(Expr::FunctionCall {
        name: "background".to_string(),
        generic: None,
        arguments: vec![],
    });
    let decl = ast.add_stmt(Stmt::Declaration {
        name: "p".to_string(),
        is_constant: false,
        value: call,
    });
    let p = ast.add_expr(Expr::Variable("p".to_string()));
    let await_stmt = ast.add_stmt(Stmt::Await(p));
    let chunk = Chunk {
        statements: vec![def, decl, await_stmt],
    };

    let context = Context::create();
    let ir = check_and_compile(chunk, ast, "async_void", &context);
    assert!(ir.contains("pthread_create"));
}
