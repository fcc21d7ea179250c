#![allow(clippy::module_inception)]

//! Semantic analysis and lowering core for the Twine language.
//!
//! The crate sits between an external front end and an external backend:
//! it takes an already-parsed syntax tree (an [`ast::ast::Chunk`] plus the
//! [`ast::ast::Ast`] arena the front end filled in), type checks it, and
//! lowers the checked tree to an LLVM module ready for verification and
//! artifact emission.
//!
//! The pipeline is two strictly sequential passes:
//!
//! 1. [`type_checker::type_checker::type_check`] walks the tree once and
//!    produces a `TypeTable` mapping every checked node to its resolved type,
//!    or fails with a [`errors::errors::SemanticError`].
//! 2. [`compiler::compiler::compile`] walks the tree a second time, consuming
//!    the table, and emits IR: control flow, heap storage for every variable,
//!    and the async/await-to-pthread protocol.
//!
//! The second pass is only ever run on a tree the first pass accepted; any
//! inconsistency it finds (a missing table entry, an undeclared function) is
//! a checker bug and panics rather than returning an error.

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod scope;
pub mod type_checker;
