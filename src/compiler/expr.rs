use inkwell::{
    types::BasicType,
    values::{BasicMetadataValueEnum, BasicValueEnum, IntValue},
    AddressSpace, FloatPredicate, IntPredicate,
};

use crate::ast::{
    ast::ExprId,
    expressions::{BinaryOp, Expr},
    types::Ty,
};

use super::compiler::Compiler;

pub fn gen_expression<'a>(compiler: &mut Compiler<'a>, id: ExprId) -> BasicValueEnum<'a> {
    let expression = compiler.ast.expr(id).clone();
    match expression {
        Expr::Int(value) => compiler
            .context
            .i32_type()
            .const_int(value as u64, false)
            .into(),
        Expr::Float(value) => compiler.context.f64_type().const_float(value).into(),
        Expr::Bool(value) => compiler
            .context
            .bool_type()
            .const_int(value as u64, false)
            .into(),
        Expr::Str(value) => gen_string(compiler, &value),
        Expr::Variable(name) => {
            let cell = *compiler
                .scope
                .lookup(&name)
                .unwrap_or_else(|| panic!("variable `{name}` has no storage"));
            compiler.builder.build_load(cell, &name).unwrap()
        }
        Expr::Negate(value) => {
            let value = gen_expression(compiler, value).into_int_value();
            let one = compiler.context.bool_type().const_int(1, false);
            compiler.builder.build_xor(value, one, "not").unwrap().into()
        }
        Expr::Binary { op, left, right } => gen_binary(compiler, op, left, right),
        Expr::ArrayAccess { array, index } => {
            let array = gen_expression(compiler, array).into_pointer_value();
            let index = gen_expression(compiler, index).into_int_value();
            let element = unsafe { compiler.builder.build_gep(array, &[index], "elem").unwrap() };
            compiler.builder.build_load(element, "elem").unwrap()
        }
        Expr::ArrayLiteral(items) => gen_array_literal(compiler, id, &items),
        Expr::FunctionCall {
            name, arguments, ..
        } => gen_call(compiler, &name, &arguments)
            .unwrap_or_else(|| compiler.context.i32_type().const_zero().into()),
        Expr::Await(value) => gen_await(compiler, id, value),
        Expr::Block { statements, result } => {
            compiler.scope.push();
            for stmt in statements {
                super::stmt::gen_statement(compiler, stmt);
            }
            let value = gen_expression(compiler, result);
            compiler.scope.pop();
            value
        }
        Expr::Lambda { .. } | Expr::ChannelLoad(_) => {
            panic!("expression was rejected before lowering");
        }
    }
}

/// Lowers a string literal to a heap copy of its NUL terminated bytes.
fn gen_string<'a>(compiler: &mut Compiler<'a>, value: &str) -> BasicValueEnum<'a> {
    let bytes: Vec<IntValue<'a>> = value
        .bytes()
        .chain(std::iter::once(0))
        .map(|byte| compiler.context.i8_type().const_int(byte as u64, false))
        .collect();
    let array = compiler.context.i8_type().const_array(&bytes);

    let storage = compiler.heap_alloc(array.get_type().into(), "str");
    compiler.builder.build_store(storage, array).unwrap();
    compiler
        .builder
        .build_pointer_cast(storage, compiler.i8_ptr(), "str")
        .unwrap()
        .into()
}

fn gen_binary<'a>(
    compiler: &mut Compiler<'a>,
    op: BinaryOp,
    left: ExprId,
    right: ExprId,
) -> BasicValueEnum<'a> {
    let rhs = gen_expression(compiler, right);
    let lhs = gen_expression(compiler, left);
    let builder = &compiler.builder;

    if lhs.is_float_value() {
        let lhs = lhs.into_float_value();
        let rhs = rhs.into_float_value();
        match op {
            BinaryOp::Add => builder.build_float_add(lhs, rhs, "add").unwrap().into(),
            BinaryOp::Sub => builder.build_float_sub(lhs, rhs, "sub").unwrap().into(),
            BinaryOp::Mul => builder.build_float_mul(lhs, rhs, "mul").unwrap().into(),
            BinaryOp::Div => builder.build_float_div(lhs, rhs, "div").unwrap().into(),
            BinaryOp::Rem => builder.build_float_rem(lhs, rhs, "rem").unwrap().into(),
            BinaryOp::Lt => builder
                .build_float_compare(FloatPredicate::OLT, lhs, rhs, "lt")
                .unwrap()
                .into(),
            BinaryOp::Lte => builder
                .build_float_compare(FloatPredicate::OLE, lhs, rhs, "lte")
                .unwrap()
                .into(),
            BinaryOp::Gt => builder
                .build_float_compare(FloatPredicate::OGT, lhs, rhs, "gt")
                .unwrap()
                .into(),
            BinaryOp::Gte => builder
                .build_float_compare(FloatPredicate::OGE, lhs, rhs, "gte")
                .unwrap()
                .into(),
            BinaryOp::Eq => builder
                .build_float_compare(FloatPredicate::OEQ, lhs, rhs, "eq")
                .unwrap()
                .into(),
            BinaryOp::Neq => builder
                .build_float_compare(FloatPredicate::ONE, lhs, rhs, "neq")
                .unwrap()
                .into(),
            BinaryOp::And | BinaryOp::Or => {
                panic!("boolean operator on float operands");
            }
        }
    } else {
        let lhs = lhs.into_int_value();
        let rhs = rhs.into_int_value();
        match op {
            BinaryOp::Add => builder.build_int_add(lhs, rhs, "add").unwrap().into(),
            BinaryOp::Sub => builder.build_int_sub(lhs, rhs, "sub").unwrap().into(),
            BinaryOp::Mul => builder.build_int_mul(lhs, rhs, "mul").unwrap().into(),
            BinaryOp::Div => builder
                .build_int_signed_div(lhs, rhs, "div")
                .unwrap()
                .into(),
            BinaryOp::Rem => builder
                .build_int_signed_rem(lhs, rhs, "rem")
                .unwrap()
                .into(),
            BinaryOp::And => builder.build_and(lhs, rhs, "and").unwrap().into(),
            BinaryOp::Or => builder.build_or(lhs, rhs, "or").unwrap().into(),
            BinaryOp::Lt => builder
                .build_int_compare(IntPredicate::SLT, lhs, rhs, "lt")
                .unwrap()
                .into(),
            BinaryOp::Lte => builder
                .build_int_compare(IntPredicate::SLE, lhs, rhs, "lte")
                .unwrap()
                .into(),
            BinaryOp::Gt => builder
                .build_int_compare(IntPredicate::SGT, lhs, rhs, "gt")
                .unwrap()
                .into(),
            BinaryOp::Gte => builder
                .build_int_compare(IntPredicate::SGE, lhs, rhs, "gte")
                .unwrap()
                .into(),
            BinaryOp::Eq => builder
                .build_int_compare(IntPredicate::EQ, lhs, rhs, "eq")
                .unwrap()
                .into(),
            BinaryOp::Neq => builder
                .build_int_compare(IntPredicate::NE, lhs, rhs, "neq")
                .unwrap()
                .into(),
        }
    }
}

fn gen_array_literal<'a>(
    compiler: &mut Compiler<'a>,
    id: ExprId,
    items: &[ExprId],
) -> BasicValueEnum<'a> {
    // Items are evaluated right to left, matching argument evaluation.
    let mut values: Vec<BasicValueEnum<'a>> = items
        .iter()
        .rev()
        .map(|&item| gen_expression(compiler, item))
        .collect();
    values.reverse();

    let Ty::Array { elem, len } = compiler.table.expr_ty(id).clone() else {
        panic!("array literal has a non-array type");
    };
    let elem_ty = compiler.convert_type(&elem);
    let storage = compiler.heap_alloc(elem_ty.array_type(len).into(), "array");

    let zero = compiler.context.i32_type().const_zero();
    for (i, value) in values.iter().enumerate() {
        let index = compiler.context.i32_type().const_int(i as u64, false);
        let slot = unsafe {
            compiler
                .builder
                .build_gep(storage, &[zero, index], "")
                .unwrap()
        };
        compiler.builder.build_store(slot, *value).unwrap();
    }

    compiler
        .builder
        .build_pointer_cast(storage, elem_ty.ptr_type(AddressSpace::default()), "array")
        .unwrap()
        .into()
}

/// Joins the producing thread and loads its result.
///
/// The promise value is the handle cell the call site allocated; joining
/// yields the producer's result cell, which holds the actual value.
fn gen_await<'a>(compiler: &mut Compiler<'a>, id: ExprId, value: ExprId) -> BasicValueEnum<'a> {
    let inner_ty = compiler.table.expr_ty(id).clone();

    let cell = gen_expression(compiler, value).into_pointer_value();
    let handle = compiler
        .builder
        .build_load(cell, "handle")
        .unwrap()
        .into_pointer_value();

    let slot_ty = if inner_ty == Ty::Void {
        compiler.context.i32_type().into()
    } else {
        compiler.convert_type(&inner_ty)
    };
    let slot = compiler.heap_alloc(slot_ty.ptr_type(AddressSpace::default()).into(), "await");
    let raw_slot = compiler
        .builder
        .build_pointer_cast(slot, compiler.i8_ptr().ptr_type(AddressSpace::default()), "")
        .unwrap();
    compiler
        .builder
        .build_call(compiler.pthread_join, &[handle.into(), raw_slot.into()], "")
        .unwrap();

    let result_cell = compiler
        .builder
        .build_load(slot, "")
        .unwrap()
        .into_pointer_value();
    compiler.builder.build_load(result_cell, "await").unwrap()
}

/// Lowers a call to a declared function.
///
/// Synchronous calls become plain `call` instructions and return the callee's
/// value, or `None` for `void`. Async calls pack their arguments into the
/// callee's record, spawn a thread at its entry and return the promise, the
/// handle cell the new thread id is written into.
pub fn gen_call<'a>(
    compiler: &mut Compiler<'a>,
    name: &str,
    arguments: &[ExprId],
) -> Option<BasicValueEnum<'a>> {
    let mut values: Vec<BasicValueEnum<'a>> = arguments
        .iter()
        .rev()
        .map(|&argument| gen_expression(compiler, argument))
        .collect();
    values.reverse();

    let function = compiler
        .functions
        .get(name)
        .unwrap_or_else(|| panic!("function `{name}` is not defined"))
        .clone();

    if let Some(record) = function.arg_record {
        let record_ptr = compiler.heap_alloc(record.into(), "args");
        for (i, value) in values.iter().enumerate() {
            let field = compiler
                .builder
                .build_struct_gep(record_ptr, i as u32, "")
                .unwrap();
            compiler.builder.build_store(field, *value).unwrap();
        }

        let handle_cell = compiler.heap_alloc(compiler.i8_ptr().into(), "promise");
        let raw_cell = compiler
            .builder
            .build_pointer_cast(handle_cell, compiler.i8_ptr(), "")
            .unwrap();
        let raw_record = compiler
            .builder
            .build_pointer_cast(record_ptr, compiler.i8_ptr(), "")
            .unwrap();
        let entry = function.value.as_global_value().as_pointer_value();

        compiler
            .builder
            .build_call(
                compiler.pthread_create,
                &[
                    raw_cell.into(),
                    compiler.i8_ptr().const_null().into(),
                    entry.into(),
                    raw_record.into(),
                ],
                "",
            )
            .unwrap();

        Some(handle_cell.into())
    } else {
        let args: Vec<BasicMetadataValueEnum<'a>> =
            values.iter().map(|&value| value.into()).collect();
        compiler
            .builder
            .build_call(function.value, &args, "")
            .unwrap()
            .try_as_basic_value()
            .left()
    }
}
