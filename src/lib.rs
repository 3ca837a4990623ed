//! # Visual Script Graph Compiler (VSGC)
//!
//! Compiles node-and-wire script graphs into linear, goto-based imperative
//! source code.
//!
//! A graph is a set of blocks connected by execution links (what runs next)
//! and value links (where an input gets its value). VSGC turns every entry
//! point into one method:
//! - Control flow is discovered from the possibly cyclic execution links and
//!   laid out as basic blocks, with a `goto` only where fallthrough is not
//!   possible
//! - Value inputs are resolved recursively into expressions, falling back to
//!   literal defaults when unconnected
//! - Problems are reported as diagnostics; compilation always completes
//!
//! ## Quick Start
//!
//! ```rust
//! use vsgc::{compile_graph, BlockKind, DiagnosticLog, EntryPoint, Graph, MethodCall};
//!
//! let mut graph = Graph::new("Greeter");
//! let start = graph.add_block(BlockKind::EntryPoint(EntryPoint { name: "Start".into() }));
//! let call = graph.add_block(BlockKind::MethodCall(MethodCall {
//!     method: "Foo".into(),
//!     instance: false,
//!     parameters: vec![],
//!     return_type: None,
//! }));
//! graph.connect_execution(start, "Output", call)?;
//!
//! let mut log = DiagnosticLog::new();
//! let source = compile_graph(&graph, &mut log);
//! assert_eq!(source.functions[0].body_text(), "{ Foo(); return; }");
//! # Ok::<(), vsgc::GraphError>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **Fields** - One field per graph variable
//! 2. **Entry Points** - Every entry point block starts a function
//! 3. **Basic Blocks** - A worklist drains the reachable blocks (see [`codegen::CompilerContext`])
//! 4. **Assembly** - Basic blocks are concatenated and written out as a class

pub mod codegen;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod syntax;

// Re-export the main compilation API
pub use compiler::{compile_graph, compile_graph_with_options};

pub use codegen::{GeneratedField, GeneratedFunction, GeneratedSource};
pub use config::CompilerOptions;
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticLog, DiagnosticSink, Severity};
pub use error::{CodegenError, ConfigError, GraphError};

// Re-export graph types for convenience
pub use graph::{
    BinaryOp, BinaryOperator, Block, BlockId, BlockKind, Comment, ConditionalBranch, CustomCode,
    CustomExpression, EntryPoint, Graph, Link, LinkId, Literal, MethodCall, Parameter,
    PropertyGet, PropertySet, Slot, SlotDirection, SlotFlags, SlotId, SlotKind, SlotRef, TypeRef,
    UnaryOp, UnaryOperator, Value, Variable, VariableGet, VariableSet,
};
