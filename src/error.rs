//! # Errors
//!
//! Graph editing operations fail with [`GraphError`]. Block generators fail
//! with [`CodegenError`], which the compiler turns into diagnostics instead of
//! aborting the compile.

use crate::graph::{BlockId, SlotDirection, SlotKind, SlotRef};
use crate::syntax::SyntaxError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Slot not found: {0}")]
    SlotNotFound(SlotRef),

    #[error("Slot '{name}' not found on block {block}")]
    NamedSlotNotFound { block: BlockId, name: String },

    #[error("Slot {slot} must be an {expected:?} slot")]
    DirectionMismatch { slot: SlotRef, expected: SlotDirection },

    #[error("Cannot link a {source_kind:?} slot to a {target_kind:?} slot")]
    KindMismatch {
        source_kind: SlotKind,
        target_kind: SlotKind,
    },

    #[error("Execution slot {0} cannot carry a value")]
    ValueOnExecutionSlot(SlotRef),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Block {block} has no '{slot}' slot")]
    MissingSlot { block: BlockId, slot: String },

    #[error("Block {0} cannot produce an expression")]
    NotAnExpression(BlockId),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid compiler options: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid compiler options: {0}")]
    Invalid(String),
}
