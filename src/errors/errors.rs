//! Error types for the two compilation passes.
//!
//! [`SemanticError`] covers everything the type checker can reject; each
//! variant has a stable [`SemanticError::name`] so callers can match on
//! error identity without parsing messages. [`CompileError`] covers the
//! lowering pass, which only fails on LLVM module verification.

use thiserror::Error;

/// An error found while type checking a tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("variable `{name}` is not defined")]
    UndefinedVariable { name: String },

    #[error("`{name}` is already defined in this scope")]
    DuplicateBinding { name: String },

    #[error("cannot assign `{found}` to `{name}` of type `{expected}`")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("condition must be `bool`, found `{found}`")]
    NonBooleanCondition { found: String },

    #[error("if branches have mismatched types: `{then_ty}` and `{else_ty}`")]
    BranchTypeMismatch { then_ty: String, else_ty: String },

    #[error("block mixes statement types `{first}` and `{other}`")]
    InconsistentBlockType { first: String, other: String },

    #[error("function `{function}` declares `{declared}` but its body has type `{found}`")]
    SignatureMismatch {
        function: String,
        declared: String,
        found: String,
    },

    #[error("async function `{function}` must declare a promise return type")]
    AsyncMustReturnPromise { function: String },

    #[error("cannot await a value of type `{found}`")]
    AwaitOnNonPromise { found: String },

    #[error("call to `{function}` expected `{expected}` but got `{found}`")]
    ArgumentMismatch {
        function: String,
        expected: String,
        found: String,
    },

    #[error("array literal must have at least one element")]
    EmptyArrayLiteral,

    #[error("array literal mixes element types `{first}` and `{other}`")]
    ArrayElementTypeMismatch { first: String, other: String },

    #[error("function `{function}` may only be declared at the top level")]
    NestedDeclarationNotAllowed { function: String },

    #[error("operator `{op}` cannot combine `{left}` and `{right}`")]
    OperandTypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    #[error("operator `{op}` requires numeric operands, found `{found}`")]
    NonNumericOperand { op: String, found: String },

    #[error("operator `{op}` requires boolean operands, found `{found}`")]
    NonBooleanOperand { op: String, found: String },

    #[error("negation requires a `bool` operand, found `{found}`")]
    NonBooleanNegation { found: String },

    #[error("extern `{name}` must have a function signature")]
    NonFunctionExtern { name: String },

    #[error("the function name `{name}` is reserved")]
    ReservedFunctionName { name: String },

    #[error("array index must be `int`, found `{found}`")]
    NonIntegerIndex { found: String },

    #[error("cannot index a value of type `{found}`")]
    IndexOnNonArray { found: String },

    #[error("`{name}` is not a function")]
    NotAFunction { name: String },

    #[error("function `{name}` is not defined")]
    UndefinedFunction { name: String },

    #[error("`{construct}` is not supported")]
    NotSupported { construct: String },
}

impl SemanticError {
    /// Stable identifier for the error kind, independent of message wording.
    pub fn name(&self) -> &'static str {
        match self {
            SemanticError::UndefinedVariable { .. } => "UndefinedVariable",
            SemanticError::DuplicateBinding { .. } => "DuplicateBinding",
            SemanticError::TypeMismatch { .. } => "TypeMismatch",
            SemanticError::NonBooleanCondition { .. } => "NonBooleanCondition",
            SemanticError::BranchTypeMismatch { .. } => "BranchTypeMismatch",
            SemanticError::InconsistentBlockType { .. } => "InconsistentBlockType",
            SemanticError::SignatureMismatch { .. } => "SignatureMismatch",
            SemanticError::AsyncMustReturnPromise { .. } => "AsyncMustReturnPromise",
            SemanticError::AwaitOnNonPromise { .. } => "AwaitOnNonPromise",
            SemanticError::ArgumentMismatch { .. } => "ArgumentMismatch",
            SemanticError::EmptyArrayLiteral => "EmptyArrayLiteral",
            SemanticError::ArrayElementTypeMismatch { .. } => "ArrayElementTypeMismatch",
            SemanticError::NestedDeclarationNotAllowed { .. } => "NestedDeclarationNotAllowed",
            SemanticError::OperandTypeMismatch { .. } => "OperandTypeMismatch",
            SemanticError::NonNumericOperand { .. } => "NonNumericOperand",
            SemanticError::NonBooleanOperand { .. } => "NonBooleanOperand",
            SemanticError::NonBooleanNegation { .. } => "NonBooleanNegation",
            SemanticError::NonFunctionExtern { .. } => "NonFunctionExtern",
            SemanticError::ReservedFunctionName { .. } => "ReservedFunctionName",
            SemanticError::NonIntegerIndex { .. } => "NonIntegerIndex",
            SemanticError::IndexOnNonArray { .. } => "IndexOnNonArray",
            SemanticError::NotAFunction { .. } => "NotAFunction",
            SemanticError::UndefinedFunction { .. } => "UndefinedFunction",
            SemanticError::NotSupported { .. } => "NotSupported",
        }
    }
}

/// An error found while lowering a checked tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("module verification failed: {message}")]
    Verification { message: String },
}
