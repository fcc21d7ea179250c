//! Code generation module.
//!
//! This module contains the LLVM-based lowering pass that transforms a
//! checked tree into LLVM IR. It handles:
//!
//! - Lowering of expressions and statements
//! - Type conversion from resolved types to LLVM types
//! - Heap cells for every variable binding
//! - The async/await to pthread protocol
pub mod compiler;
pub mod expr;
pub mod stmt;
