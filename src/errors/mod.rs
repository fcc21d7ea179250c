/// Errors module
/// Contains the error types produced by type checking and lowering
pub mod errors;
