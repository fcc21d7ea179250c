//! Main compiler structure and the lowering entry point.
//!
//! This module holds the [`Compiler`] state shared by the statement and
//! expression generators: the LLVM context, module and builder, the scope of
//! variable cells, and the declared functions. It also owns module setup
//! (target triple, data layout, the pthread declarations, the synthetic
//! `main`) and final verification.

use std::{collections::HashMap, path::Path};

use inkwell::{
    attributes::{Attribute, AttributeLoc},
    builder::Builder,
    context::Context,
    module::{Linkage, Module},
    targets::{InitializationConfig, Target, TargetMachine},
    types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType, PointerType, StructType},
    values::{FunctionValue, PointerValue},
    AddressSpace,
};

use crate::{
    ast::{
        ast::{Ast, Chunk},
        types::Ty,
    },
    errors::errors::CompileError,
    scope::ScopeStack,
    type_checker::type_checker::TypeTable,
};

use super::stmt::gen_statement;

/// A function declared in the module, as call sites need to see it.
///
/// For async functions `value` is the thread entry with the `i8* (i8*)`
/// signature and `arg_record` is the struct the call site packs the real
/// arguments into. For everything else `arg_record` is `None` and `value`
/// has the declared signature.
#[derive(Debug, Clone)]
pub struct StoredFunction<'a> {
    pub value: FunctionValue<'a>,
    pub arg_record: Option<StructType<'a>>,
}

/// The state of one lowering run.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the LLVM context
pub struct Compiler<'a> {
    /// The node arena of the tree being lowered
    pub ast: Ast,
    /// The top-level statements to lower into `main`
    pub chunk: Chunk,
    /// The annotation table the checker produced for this tree
    pub table: TypeTable,

    /// Variable names to their heap cells, by scope
    pub scope: ScopeStack<PointerValue<'a>>,
    /// Declared functions by name
    pub functions: HashMap<String, StoredFunction<'a>>,
    /// The result cell of the async function currently being lowered
    pub async_result: Option<PointerValue<'a>>,

    /// Reference to the LLVM context
    pub context: &'a Context,
    /// The LLVM module being built
    pub module: Module<'a>,
    /// The LLVM IR builder
    pub builder: Builder<'a>,

    /// Declaration of `pthread_create`
    pub pthread_create: FunctionValue<'a>,
    /// Declaration of `pthread_join`
    pub pthread_join: FunctionValue<'a>,
}

impl<'a> Compiler<'a> {
    /// Creates a new Compiler instance with the pthread primitives already
    /// declared in a fresh module.
    pub fn new(
        chunk: Chunk,
        ast: Ast,
        table: TypeTable,
        context: &'a Context,
        module_name: &str,
    ) -> Self {
        let module = context.create_module(module_name);

        let i8_ptr = context.i8_type().ptr_type(AddressSpace::default());
        let entry_ptr = i8_ptr
            .fn_type(&[i8_ptr.into()], false)
            .ptr_type(AddressSpace::default());

        // int pthread_create(handle_out, attrs, entry, argument)
        let create_type = context.i32_type().fn_type(
            &[
                i8_ptr.into(),
                i8_ptr.into(),
                entry_ptr.into(),
                i8_ptr.into(),
            ],
            false,
        );
        let pthread_create =
            module.add_function("pthread_create", create_type, Some(Linkage::External));

        // int pthread_join(handle, result_out)
        let join_type = context.i32_type().fn_type(
            &[
                i8_ptr.into(),
                i8_ptr.ptr_type(AddressSpace::default()).into(),
            ],
            false,
        );
        let pthread_join =
            module.add_function("pthread_join", join_type, Some(Linkage::External));

        Compiler {
            ast,
            chunk,
            table,
            scope: ScopeStack::new(),
            functions: HashMap::new(),
            async_result: None,
            module,
            builder: context.create_builder(),
            context,
            pthread_create,
            pthread_join,
        }
    }

    /// Saves the textual IR of the module to a file.
    pub fn save_module_to_file(&self, output_file: &Path) {
        self.module.print_to_file(output_file).unwrap();
    }

    /// Writes the module as bitcode, the artifact the external backend links.
    pub fn write_bitcode_to_file(&self, output_file: &Path) -> bool {
        self.module.write_bitcode_to_path(output_file)
    }

    /// Sets up the target machine and lowers the whole tree.
    ///
    /// Top-level statements land in the body of a synthetic `void main()`;
    /// function definitions reposition the builder into their own bodies and
    /// restore it when done.
    fn compile(&mut self) {
        Target::initialize_all(&InitializationConfig::default());
        let target_triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&target_triple).unwrap();
        let target_machine = target
            .create_target_machine(
                &target_triple,
                "generic",
                "",
                inkwell::OptimizationLevel::Default,
                inkwell::targets::RelocMode::PIC,
                inkwell::targets::CodeModel::Default,
            )
            .unwrap();

        self.module.set_triple(&target_triple);
        self.module
            .set_data_layout(&target_machine.get_target_data().get_data_layout());

        self.create_function("main", self.context.void_type().fn_type(&[], false));

        let statements = self.chunk.statements.clone();
        for statement in statements {
            gen_statement(self, statement);
        }

        self.builder.build_return(None).unwrap();
    }

    fn verify(&self) -> Result<(), CompileError> {
        self.module.verify().map_err(|message| CompileError::Verification {
            message: message.to_string(),
        })
    }

    /// Converts a resolved type to the LLVM type its values have.
    ///
    /// Strings and arrays are heap pointers; promises and channels only
    /// occur behind cells and are given an opaque one-field struct shape.
    ///
    /// # Panics
    ///
    /// Panics on `void` and function types, which never have first-class
    /// values in a checked tree.
    pub fn convert_type(&self, ty: &Ty) -> BasicTypeEnum<'a> {
        match ty {
            Ty::Int => self.context.i32_type().into(),
            Ty::Bool => self.context.bool_type().into(),
            Ty::Float => self.context.f64_type().into(),
            Ty::String => self.i8_ptr().into(),
            Ty::Array { elem, .. } => self
                .convert_type(elem)
                .ptr_type(AddressSpace::default())
                .into(),
            Ty::Promise(inner) | Ty::Channel(inner) => self
                .context
                .struct_type(&[self.convert_type(inner)], false)
                .into(),
            Ty::Void => panic!("attempted to convert the void type"),
            Ty::Function { .. } => panic!("attempted to convert a function type"),
        }
    }

    /// Builds an LLVM function type, routing `void` returns through the
    /// dedicated void type.
    pub fn fn_type_of(
        &self,
        return_type: &Ty,
        params: &[BasicMetadataTypeEnum<'a>],
        vararg: bool,
    ) -> FunctionType<'a> {
        if *return_type == Ty::Void {
            self.context.void_type().fn_type(params, vararg)
        } else {
            self.convert_type(return_type).fn_type(params, vararg)
        }
    }

    pub fn i8_ptr(&self) -> PointerType<'a> {
        self.context.i8_type().ptr_type(AddressSpace::default())
    }

    /// The uniform signature every async function is lowered to: it takes
    /// the packed argument record and returns its result cell, both as raw
    /// pointers.
    pub fn async_entry_type(&self) -> FunctionType<'a> {
        self.i8_ptr().fn_type(&[self.i8_ptr().into()], false)
    }

    /// Allocates a heap cell for a value of the given type.
    pub fn heap_alloc(&self, ty: BasicTypeEnum<'a>, name: &str) -> PointerValue<'a> {
        self.builder.build_malloc(ty, name).unwrap()
    }

    /// Creates a new function in the module, positions the builder in its
    /// entry block and adds the usual attributes.
    pub fn create_function(
        &self,
        name: &str,
        function_type: FunctionType<'a>,
    ) -> FunctionValue<'a> {
        let function = self
            .module
            .add_function(name, function_type, Some(Linkage::External));

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let attributes = [
            self.context
                .create_enum_attribute(Attribute::get_named_enum_kind_id("uwtable"), 0),
            self.context
                .create_enum_attribute(Attribute::get_named_enum_kind_id("nounwind"), 0),
        ];
        for attribute in attributes.iter() {
            function.add_attribute(AttributeLoc::Function, *attribute);
        }

        function
    }
}

/// Lowers a checked tree to a verified LLVM module.
///
/// This is the primary entry point for lowering. It:
/// 1. Creates a new Compiler instance with a fresh module
/// 2. Lowers every top-level statement
/// 3. Verifies the module, surfacing LLVM's diagnostics on failure
///
/// The tree and table must come from a successful [`type_check`] run on the
/// same arena; inconsistencies between them are bugs and panic.
///
/// [`type_check`]: crate::type_checker::type_checker::type_check
pub fn compile<'a>(
    chunk: Chunk,
    ast: Ast,
    table: TypeTable,
    module_name: &str,
    context: &'a Context,
) -> Result<Compiler<'a>, CompileError> {
    let mut compiler = Compiler::new(chunk, ast, table, context, module_name);

    compiler.compile();
    compiler.verify()?;

    Ok(compiler)
}
