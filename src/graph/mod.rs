//! # Script Graph Model
//!
//! The in-memory program graph consumed by the compiler: variables, blocks
//! with their slots, and the links between slots.
//!
//! All collections are kept in insertion order so that compiling the same
//! graph twice walks it in the same order.

mod block;
mod link;
mod slot;
mod value;

pub use block::{
    BinaryOp, BinaryOperator, Block, BlockKind, Comment, ConditionalBranch, CustomCode,
    CustomExpression, EntryPoint, Literal, MethodCall, Parameter, PropertyGet, PropertySet,
    UnaryOp, UnaryOperator, VariableGet, VariableSet,
};
pub use link::Link;
pub use slot::{names as slot_names, Slot, SlotDirection, SlotFlags, SlotKind};
pub use value::{TypeRef, Value};

use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Graph-wide address of a slot: slot ids are only unique within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub block: BlockId,
    pub slot: SlotId,
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.block, self.slot)
    }
}

/// A graph variable, materialized as a field of the generated class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub type_ref: Option<TypeRef>,
    pub default: Option<Value>,
}

impl Variable {
    pub fn new(name: impl Into<String>, type_ref: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            type_ref,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// One compilable unit: variables, blocks and links.
///
/// Populated by an editor or build step before compilation and treated as
/// read-only by the compiler. The execution subgraph may contain cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    variables: Vec<Variable>,
    blocks: Vec<Block>,
    links: Vec<Link>,
    next_block_id: u32,
    next_link_id: u32,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_variable(&mut self, variable: Variable) {
        self.variables.push(variable);
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn add_block(&mut self, kind: BlockKind) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.push(Block::new(id, kind));
        id
    }

    /// Removes a block. Links touching it are left in place, the same state an
    /// interrupted edit leaves behind; the compiler treats them as dangling.
    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        let index = self.block_index(id)?;
        Some(self.blocks.remove(index))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.block_index(id).map(|index| &self.blocks[index])
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.block_index(id).map(move |index| &mut self.blocks[index])
    }

    /// Blocks are stored sorted by id since ids only ever grow.
    fn block_index(&self, id: BlockId) -> Option<usize> {
        self.blocks.binary_search_by_key(&id, |block| block.id).ok()
    }

    pub fn entry_points(&self) -> impl Iterator<Item = (&Block, &EntryPoint)> {
        self.blocks.iter().filter_map(|block| match block.kind() {
            BlockKind::EntryPoint(entry) => Some((block, entry)),
            _ => None,
        })
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn slot(&self, slot: SlotRef) -> Option<&Slot> {
        self.block(slot.block)?.slot(slot.slot)
    }

    pub fn find_slot(
        &self,
        block: BlockId,
        direction: SlotDirection,
        kind: SlotKind,
        name: Option<&str>,
    ) -> Option<SlotRef> {
        let block = self.block(block)?;
        block
            .find_slot(direction, kind, name)
            .map(|slot| block.slot_ref(slot.id))
    }

    /// Links `source` to `target` after checking both exist, run output to
    /// input, and share a kind.
    pub fn connect(&mut self, source: SlotRef, target: SlotRef) -> Result<LinkId, GraphError> {
        let source_slot = self.existing_slot(source)?;
        let target_slot = self.existing_slot(target)?;

        if source_slot.direction != SlotDirection::Output {
            return Err(GraphError::DirectionMismatch {
                slot: source,
                expected: SlotDirection::Output,
            });
        }
        if target_slot.direction != SlotDirection::Input {
            return Err(GraphError::DirectionMismatch {
                slot: target,
                expected: SlotDirection::Input,
            });
        }
        if source_slot.kind != target_slot.kind {
            return Err(GraphError::KindMismatch {
                source_kind: source_slot.kind,
                target_kind: target_slot.kind,
            });
        }

        let id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        self.links.push(Link { id, source, target });
        Ok(id)
    }

    /// Connects the named output execution slot of `from` to the input
    /// execution slot of `to`.
    pub fn connect_execution(&mut self, from: BlockId, output: &str, to: BlockId) -> Result<LinkId, GraphError> {
        let source = self.named_slot(from, SlotDirection::Output, SlotKind::Execution, output)?;
        let target = self.named_slot(to, SlotDirection::Input, SlotKind::Execution, slot_names::IN)?;
        self.connect(source, target)
    }

    /// Connects the named output value slot of `from` to the named input value
    /// slot of `to`.
    pub fn connect_value(&mut self, from: BlockId, output: &str, to: BlockId, input: &str) -> Result<LinkId, GraphError> {
        let source = self.named_slot(from, SlotDirection::Output, SlotKind::Value, output)?;
        let target = self.named_slot(to, SlotDirection::Input, SlotKind::Value, input)?;
        self.connect(source, target)
    }

    fn existing_slot(&self, slot: SlotRef) -> Result<&Slot, GraphError> {
        self.block(slot.block)
            .ok_or(GraphError::BlockNotFound(slot.block))?
            .slot(slot.slot)
            .ok_or(GraphError::SlotNotFound(slot))
    }

    fn named_slot(
        &self,
        block: BlockId,
        direction: SlotDirection,
        kind: SlotKind,
        name: &str,
    ) -> Result<SlotRef, GraphError> {
        let owner = self.block(block).ok_or(GraphError::BlockNotFound(block))?;
        owner
            .find_slot(direction, kind, Some(name))
            .map(|slot| owner.slot_ref(slot.id))
            .ok_or_else(|| GraphError::NamedSlotNotFound { block, name: name.to_string() })
    }

    pub fn disconnect(&mut self, id: LinkId) -> Option<Link> {
        let index = self.links.iter().position(|link| link.id == id)?;
        Some(self.links.remove(index))
    }

    pub fn set_slot_value(&mut self, slot: SlotRef, value: Value) -> Result<(), GraphError> {
        let target = self
            .block_mut(slot.block)
            .ok_or(GraphError::BlockNotFound(slot.block))?
            .slot_mut(slot.slot)
            .ok_or(GraphError::SlotNotFound(slot))?;
        if target.kind == SlotKind::Execution {
            return Err(GraphError::ValueOnExecutionSlot(slot));
        }
        target.value = Some(value);
        Ok(())
    }

    /// Sets the literal default of a block's named value input.
    pub fn set_input_value(&mut self, block: BlockId, input: &str, value: impl Into<Value>) -> Result<(), GraphError> {
        let slot = self.named_slot(block, SlotDirection::Input, SlotKind::Value, input)?;
        self.set_slot_value(slot, value.into())
    }

    /// The first link whose target is `slot`. If an editor left several links
    /// on one input, the earliest one wins.
    pub fn link_to_target(&self, slot: SlotRef) -> Option<&Link> {
        self.links.iter().find(|link| link.target == slot)
    }

    /// The first link whose source is `slot`.
    pub fn link_from_source(&self, slot: SlotRef) -> Option<&Link> {
        self.links.iter().find(|link| link.source == slot)
    }

    pub fn has_consumers(&self, slot: SlotRef) -> bool {
        self.link_from_source(slot).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(method: &str) -> BlockKind {
        BlockKind::MethodCall(MethodCall {
            method: method.to_string(),
            instance: false,
            parameters: vec![Parameter::new("value")],
            return_type: Some(TypeRef::from("int")),
        })
    }

    #[test]
    fn connect_rejects_kind_mismatch() {
        let mut graph = Graph::new("test");
        let a = graph.add_block(call("A"));
        let b = graph.add_block(call("B"));

        let exec_out = graph
            .find_slot(a, SlotDirection::Output, SlotKind::Execution, None)
            .unwrap();
        let value_in = graph
            .find_slot(b, SlotDirection::Input, SlotKind::Value, Some("value"))
            .unwrap();

        let err = graph.connect(exec_out, value_in).unwrap_err();
        assert!(matches!(err, GraphError::KindMismatch { .. }));
    }

    #[test]
    fn connect_rejects_wrong_direction() {
        let mut graph = Graph::new("test");
        let a = graph.add_block(call("A"));
        let b = graph.add_block(call("B"));

        let input = graph
            .find_slot(a, SlotDirection::Input, SlotKind::Value, Some("value"))
            .unwrap();
        let other = graph
            .find_slot(b, SlotDirection::Input, SlotKind::Value, Some("value"))
            .unwrap();

        let err = graph.connect(input, other).unwrap_err();
        assert!(matches!(
            err,
            GraphError::DirectionMismatch { expected: SlotDirection::Output, .. }
        ));
    }

    #[test]
    fn connecting_a_removed_block_reports_the_block() {
        let mut graph = Graph::new("test");
        let a = graph.add_block(call("A"));
        let b = graph.add_block(call("B"));
        graph.remove_block(b);

        let err = graph.connect_value(a, slot_names::RESULT, b, "value").unwrap_err();
        assert_eq!(err, GraphError::BlockNotFound(b));

        let err = graph.connect_execution(b, slot_names::OUT, a).unwrap_err();
        assert_eq!(err, GraphError::BlockNotFound(b));

        let err = graph.set_input_value(b, "value", 1).unwrap_err();
        assert_eq!(err, GraphError::BlockNotFound(b));

        let err = graph.connect_value(a, slot_names::RESULT, a, "missing").unwrap_err();
        assert!(matches!(err, GraphError::NamedSlotNotFound { .. }));
    }

    #[test]
    fn lookups_return_none_instead_of_failing() {
        let mut graph = Graph::new("test");
        let a = graph.add_block(call("A"));
        let missing = SlotRef { block: BlockId(42), slot: SlotId(0) };

        assert!(graph.slot(missing).is_none());
        assert!(graph.link_to_target(missing).is_none());
        assert!(graph.link_from_source(missing).is_none());
        assert!(graph.find_slot(a, SlotDirection::Output, SlotKind::Value, Some("Nope")).is_none());
    }

    #[test]
    fn first_link_wins_on_shared_input() {
        let mut graph = Graph::new("test");
        let a = graph.add_block(call("A"));
        let b = graph.add_block(call("B"));
        let c = graph.add_block(call("C"));

        let first = graph.connect_value(a, slot_names::RESULT, c, "value").unwrap();
        graph.connect_value(b, slot_names::RESULT, c, "value").unwrap();

        let input = graph
            .find_slot(c, SlotDirection::Input, SlotKind::Value, Some("value"))
            .unwrap();
        assert_eq!(graph.link_to_target(input).map(|link| link.id), Some(first));
    }

    #[test]
    fn execution_slots_refuse_values() {
        let mut graph = Graph::new("test");
        let a = graph.add_block(call("A"));
        let exec_in = graph
            .find_slot(a, SlotDirection::Input, SlotKind::Execution, None)
            .unwrap();

        let err = graph.set_slot_value(exec_in, Value::Int(1)).unwrap_err();
        assert!(matches!(err, GraphError::ValueOnExecutionSlot(_)));
    }

    #[test]
    fn removing_a_block_leaves_links_dangling() {
        let mut graph = Graph::new("test");
        let a = graph.add_block(call("A"));
        let b = graph.add_block(call("B"));
        graph.connect_execution(a, slot_names::OUT, b).unwrap();

        assert!(graph.remove_block(b).is_some());
        assert_eq!(graph.links().len(), 1);
        assert!(graph.block(b).is_none());
        assert!(graph.block(a).is_some());
    }
}
