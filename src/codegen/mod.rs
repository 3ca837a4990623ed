//! # Code Generation
//!
//! Lowering of script graphs into linear, goto-based statements.

pub mod ast;
mod block_handlers;
mod context;
mod writer;

pub use block_handlers::{EmitsStatements, ProducesExpression};
pub use context::{BasicBlock, CompilerContext};
pub use writer::{GeneratedField, GeneratedFunction, GeneratedSource, SourceWriter};
