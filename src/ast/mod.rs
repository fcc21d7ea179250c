/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: The node arena, node ids and the top-level chunk
/// - expressions: Definitions for various expression kinds
/// - statements: Definitions for various statement kinds
/// - types: Surface type syntax and the resolved type algebra
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
