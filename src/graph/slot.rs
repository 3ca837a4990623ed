//! # Slots
//!
//! Typed connection points owned by a [`Block`](super::Block).

use super::{SlotId, TypeRef, Value};
use serde::{Deserialize, Serialize};

/// Well-known slot names used by the built-in block variants.
pub mod names {
    pub const IN: &str = "In";
    pub const OUT: &str = "Out";
    pub const OUTPUT: &str = "Output";
    pub const TRUE: &str = "True";
    pub const FALSE: &str = "False";
    pub const CONDITION: &str = "Condition";
    pub const TARGET: &str = "Target";
    pub const VALUE: &str = "Value";
    pub const RESULT: &str = "Result";
    pub const LEFT: &str = "Left";
    pub const RIGHT: &str = "Right";
    pub const OPERAND: &str = "Operand";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    Execution,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SlotFlags {
    #[default]
    None,
    /// Followed automatically once the owning block has generated its code,
    /// unless the block already resolved it explicitly.
    AutoflowExecution,
}

/// A connection point on a block.
///
/// Execution slots never carry a literal value; [`Slot::with_value`] and
/// [`Graph::set_slot_value`](super::Graph::set_slot_value) enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub direction: SlotDirection,
    pub kind: SlotKind,
    pub name: Option<String>,
    pub type_ref: Option<TypeRef>,
    pub value: Option<Value>,
    #[serde(default)]
    pub flags: SlotFlags,
}

impl Slot {
    pub fn new(id: SlotId, direction: SlotDirection, kind: SlotKind, name: Option<String>) -> Self {
        Self {
            id,
            direction,
            kind,
            name,
            type_ref: None,
            value: None,
            flags: SlotFlags::None,
        }
    }

    pub fn with_type(mut self, type_ref: Option<TypeRef>) -> Self {
        if self.kind == SlotKind::Value {
            self.type_ref = type_ref;
        }
        self
    }

    pub fn with_value(mut self, value: Option<Value>) -> Self {
        if self.kind == SlotKind::Value {
            self.value = value;
        }
        self
    }

    pub fn with_flags(mut self, flags: SlotFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_autoflow(&self) -> bool {
        self.flags == SlotFlags::AutoflowExecution
    }

    /// True when this slot answers to `direction`, `kind` and (if given) `name`.
    pub fn matches(&self, direction: SlotDirection, kind: SlotKind, name: Option<&str>) -> bool {
        self.direction == direction
            && self.kind == kind
            && (name.is_none() || self.name.as_deref() == name)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_slot_drops_value_and_type() {
        let slot = Slot::new(SlotId(0), SlotDirection::Input, SlotKind::Execution, None)
            .with_type(Some(TypeRef::from("int")))
            .with_value(Some(Value::Int(3)));
        assert_eq!(slot.value, None);
        assert_eq!(slot.type_ref, None);
    }

    #[test]
    fn matches_ignores_name_when_absent() {
        let slot = Slot::new(
            SlotId(1),
            SlotDirection::Output,
            SlotKind::Value,
            Some(names::RESULT.to_string()),
        );
        assert!(slot.matches(SlotDirection::Output, SlotKind::Value, None));
        assert!(slot.matches(SlotDirection::Output, SlotKind::Value, Some("Result")));
        assert!(!slot.matches(SlotDirection::Output, SlotKind::Value, Some("Value")));
        assert!(!slot.matches(SlotDirection::Input, SlotKind::Value, None));
    }
}
