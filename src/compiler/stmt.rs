use inkwell::{
    module::Linkage,
    types::{BasicMetadataTypeEnum, BasicTypeEnum},
    AddressSpace,
};

use crate::ast::{
    ast::{ArgId, FnBody, StmtId},
    statements::Stmt,
    types::Ty,
};

use super::{
    compiler::{Compiler, StoredFunction},
    expr::{gen_call, gen_expression},
};

pub fn gen_statement<'a>(compiler: &mut Compiler<'a>, id: StmtId) {
    let statement = compiler.ast.stmt(id).clone();
    match statement {
        Stmt::Block(statements) => {
            compiler.scope.push();
            for stmt in statements {
                gen_statement(compiler, stmt);
            }
            compiler.scope.pop();
        }
        Stmt::Declaration { name, value, .. } => {
            let value = gen_expression(compiler, value);
            let cell = compiler.heap_alloc(value.get_type(), &name);
            compiler.builder.build_store(cell, value).unwrap();
            compiler.scope.define(&name, cell);
        }
        Stmt::Assignment { name, value } => {
            let value = gen_expression(compiler, value);
            let cell = *compiler
                .scope
                .lookup(&name)
                .unwrap_or_else(|| panic!("variable `{name}` has no storage"));
            compiler.builder.build_store(cell, value).unwrap();
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let condition = gen_expression(compiler, condition).into_int_value();

            let parent_function = compiler
                .builder
                .get_insert_block()
                .unwrap()
                .get_parent()
                .unwrap();
            let then_block = compiler.context.append_basic_block(parent_function, "then");
            let else_block =
                else_branch.map(|_| compiler.context.append_basic_block(parent_function, "else"));
            let end_block = compiler.context.append_basic_block(parent_function, "end");

            compiler
                .builder
                .build_conditional_branch(condition, then_block, else_block.unwrap_or(end_block))
                .unwrap();

            compiler.builder.position_at_end(then_block);
            compiler.scope.push();
            gen_statement(compiler, then_branch);
            compiler.scope.pop();
            branch_to_if_open(compiler, end_block);

            if let (Some(else_block), Some(else_branch)) = (else_block, else_branch) {
                compiler.builder.position_at_end(else_block);
                compiler.scope.push();
                gen_statement(compiler, else_branch);
                compiler.scope.pop();
                branch_to_if_open(compiler, end_block);
            }

            compiler.builder.position_at_end(end_block);
        }
        Stmt::While { condition, body } => {
            let parent_function = compiler
                .builder
                .get_insert_block()
                .unwrap()
                .get_parent()
                .unwrap();
            let condition_block = compiler.context.append_basic_block(parent_function, "cond");
            let body_block = compiler.context.append_basic_block(parent_function, "body");
            let end_block = compiler.context.append_basic_block(parent_function, "end");

            compiler
                .builder
                .build_unconditional_branch(condition_block)
                .unwrap();

            compiler.builder.position_at_end(condition_block);
            let condition = gen_expression(compiler, condition).into_int_value();
            compiler
                .builder
                .build_conditional_branch(condition, body_block, end_block)
                .unwrap();

            compiler.builder.position_at_end(body_block);
            compiler.scope.push();
            gen_statement(compiler, body);
            compiler.scope.pop();
            branch_to_if_open(compiler, condition_block);

            compiler.builder.position_at_end(end_block);
        }
        Stmt::Return(value) => {
            let value = value.map(|value| gen_expression(compiler, value));

            if let Some(result_cell) = compiler.async_result {
                // Async functions hand their result cell back to the joiner
                // instead of returning the value itself.
                if let Some(value) = value {
                    compiler.builder.build_store(result_cell, value).unwrap();
                }
                let handle = compiler
                    .builder
                    .build_pointer_cast(result_cell, compiler.i8_ptr(), "result")
                    .unwrap();
                compiler.builder.build_return(Some(&handle)).unwrap();
            } else {
                match value {
                    Some(value) => compiler.builder.build_return(Some(&value)).unwrap(),
                    None => compiler.builder.build_return(None).unwrap(),
                };
            }
        }
        Stmt::ExternFunction { name, vararg, .. } => {
            let Some(Ty::Function {
                return_type,
                params,
                ..
            }) = compiler.table.stmt_ty(id).cloned()
            else {
                panic!("extern `{name}` has no recorded signature");
            };

            let param_types: Vec<BasicMetadataTypeEnum<'a>> = params
                .iter()
                .map(|param| compiler.convert_type(param).into())
                .collect();
            let function_type = compiler.fn_type_of(&return_type, &param_types, vararg);

            let value = compiler
                .module
                .add_function(&name, function_type, Some(Linkage::External));
            compiler.functions.insert(
                name,
                StoredFunction {
                    value,
                    arg_record: None,
                },
            );
        }
        Stmt::FunctionDefinition {
            name,
            is_async,
            args,
            body,
            ..
        } => {
            gen_function_definition(compiler, id, &name, is_async, &args, body);
        }
        Stmt::FunctionCall {
            name, arguments, ..
        } => {
            gen_call(compiler, &name, &arguments);
        }
        Stmt::Await(value) => {
            // Join the thread without keeping its result.
            let cell = gen_expression(compiler, value).into_pointer_value();
            let handle = compiler
                .builder
                .build_load(cell, "handle")
                .unwrap()
                .into_pointer_value();
            let discard = compiler
                .i8_ptr()
                .ptr_type(AddressSpace::default())
                .const_null();
            compiler
                .builder
                .build_call(
                    compiler.pthread_join,
                    &[handle.into(), discard.into()],
                    "",
                )
                .unwrap();
        }
        Stmt::For { .. } | Stmt::ChannelPush { .. } => {
            panic!("statement was rejected before lowering");
        }
    }
}

/// Branches to `target` unless the current block already ended, which
/// happens when the body returned on every path.
fn branch_to_if_open<'a>(compiler: &Compiler<'a>, target: inkwell::basic_block::BasicBlock<'a>) {
    if compiler
        .builder
        .get_insert_block()
        .unwrap()
        .get_terminator()
        .is_none()
    {
        compiler.builder.build_unconditional_branch(target).unwrap();
    }
}

fn gen_function_definition<'a>(
    compiler: &mut Compiler<'a>,
    id: StmtId,
    name: &str,
    is_async: bool,
    args: &[ArgId],
    body: FnBody,
) {
    let previous_position = compiler.builder.get_insert_block();

    let body_ty = compiler
        .table
        .stmt_ty(id)
        .unwrap_or_else(|| panic!("function `{name}` has no recorded body type"))
        .clone();
    let arg_types: Vec<BasicTypeEnum<'a>> = args
        .iter()
        .map(|&arg| compiler.convert_type(compiler.table.arg_ty(arg)))
        .collect();

    compiler.scope.push();

    if is_async {
        let function = compiler.create_function(name, compiler.async_entry_type());

        // The single raw parameter is the argument record the call site
        // packed; unpack every field into its own cell.
        let record = compiler.context.struct_type(&arg_types, false);
        let raw = function.get_nth_param(0).unwrap().into_pointer_value();
        let record_ptr = compiler
            .builder
            .build_pointer_cast(raw, record.ptr_type(AddressSpace::default()), "args")
            .unwrap();
        for (i, &arg) in args.iter().enumerate() {
            let arg_name = compiler.ast.arg(arg).name.clone();
            let field = compiler
                .builder
                .build_struct_gep(record_ptr, i as u32, &arg_name)
                .unwrap();
            let value = compiler.builder.build_load(field, &arg_name).unwrap();
            let cell = compiler.heap_alloc(value.get_type(), &arg_name);
            compiler.builder.build_store(cell, value).unwrap();
            compiler.scope.define(&arg_name, cell);
        }

        let result_ty = if body_ty == Ty::Void {
            compiler.context.i32_type().into()
        } else {
            compiler.convert_type(&body_ty)
        };
        compiler.async_result = Some(compiler.heap_alloc(result_ty, "result"));

        compiler.functions.insert(
            name.to_string(),
            StoredFunction {
                value: function,
                arg_record: Some(record),
            },
        );
    } else {
        let params: Vec<BasicMetadataTypeEnum<'a>> =
            arg_types.iter().map(|&ty| ty.into()).collect();
        let function_type = compiler.fn_type_of(&body_ty, &params, false);
        let function = compiler.create_function(name, function_type);

        for (i, &arg) in args.iter().enumerate() {
            let arg_name = compiler.ast.arg(arg).name.clone();
            let value = function.get_nth_param(i as u32).unwrap();
            let cell = compiler.heap_alloc(value.get_type(), &arg_name);
            compiler.builder.build_store(cell, value).unwrap();
            compiler.scope.define(&arg_name, cell);
        }

        compiler.functions.insert(
            name.to_string(),
            StoredFunction {
                value: function,
                arg_record: None,
            },
        );
    }

    match body {
        FnBody::Stmt(stmt) => {
            gen_statement(compiler, stmt);
            if compiler
                .builder
                .get_insert_block()
                .unwrap()
                .get_terminator()
                .is_none()
            {
                if let Some(result_cell) = compiler.async_result {
                    let handle = compiler
                        .builder
                        .build_pointer_cast(result_cell, compiler.i8_ptr(), "result")
                        .unwrap();
                    compiler.builder.build_return(Some(&handle)).unwrap();
                } else if body_ty == Ty::Void {
                    compiler.builder.build_return(None).unwrap();
                } else {
                    // Every path through a value-returning body returns, so
                    // falling off the end is dead.
                    compiler.builder.build_unreachable().unwrap();
                }
            }
        }
        FnBody::Expr(expr) => {
            let value = gen_expression(compiler, expr);
            if let Some(result_cell) = compiler.async_result {
                compiler.builder.build_store(result_cell, value).unwrap();
                let handle = compiler
                    .builder
                    .build_pointer_cast(result_cell, compiler.i8_ptr(), "result")
                    .unwrap();
                compiler.builder.build_return(Some(&handle)).unwrap();
            } else if body_ty == Ty::Void {
                compiler.builder.build_return(None).unwrap();
            } else {
                compiler.builder.build_return(Some(&value)).unwrap();
            }
        }
    }

    compiler.async_result = None;
    compiler.scope.pop();

    if let Some(position) = previous_position {
        compiler.builder.position_at_end(position);
    } else {
        compiler.builder.clear_insertion_position();
    }
}
