//! # Blocks
//!
//! Nodes of a script graph. A block owns an ordered list of [`Slot`]s that is
//! rebuilt from its variant configuration by [`Block::regenerate_slots`].
//! Editors call that after changing the configuration; the compiler only ever
//! reads the current slot set.

use super::slot::names;
use super::{BlockId, Slot, SlotDirection, SlotFlags, SlotId, SlotKind, SlotRef, TypeRef, Value};
use serde::{Deserialize, Serialize};

/// A named, optionally typed value input declared by a call or code block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_ref: Option<TypeRef>,
    pub default: Option<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_ref: None,
            default: None,
        }
    }

    pub fn typed(mut self, type_ref: impl Into<TypeRef>) -> Self {
        self.type_ref = Some(type_ref.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    fn result_type(self) -> Option<TypeRef> {
        match self {
            BinaryOp::Add
            | BinaryOp::Subtract
            | BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::Modulo => None,
            _ => Some(TypeRef::from("bool")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
        }
    }

    fn result_type(self) -> Option<TypeRef> {
        match self {
            UnaryOp::Not => Some(TypeRef::from("bool")),
            UnaryOp::Negate => None,
        }
    }
}

/// Marks where generation of one target function begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBranch {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Method name, possibly qualified (`Console.WriteLine`).
    pub method: String,
    /// Instance calls expose a `Target` input.
    #[serde(default)]
    pub instance: bool,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeRef>,
}

/// Inline statements. Value inputs are referenced as `$name` in the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCode {
    pub code: String,
    #[serde(default)]
    pub inputs: Vec<Parameter>,
}

/// Inline expression. Value inputs are referenced as `$name` in the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomExpression {
    pub code: String,
    #[serde(default)]
    pub inputs: Vec<Parameter>,
    pub result_type: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableGet {
    pub name: String,
    pub type_ref: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSet {
    pub name: String,
    pub type_ref: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyGet {
    pub member: String,
    pub type_ref: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    pub member: String,
    pub type_ref: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOperator {
    pub op: BinaryOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOperator {
    pub op: UnaryOp,
}

/// Editor annotation. Has no slots and never takes part in compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    EntryPoint(EntryPoint),
    ConditionalBranch(ConditionalBranch),
    MethodCall(MethodCall),
    CustomCode(CustomCode),
    CustomExpression(CustomExpression),
    VariableGet(VariableGet),
    VariableSet(VariableSet),
    PropertyGet(PropertyGet),
    PropertySet(PropertySet),
    Literal(Literal),
    BinaryOperator(BinaryOperator),
    UnaryOperator(UnaryOperator),
    Comment(Comment),
}

/// Slot shape requested by a block variant.
#[derive(Debug, Clone)]
struct SlotSpec {
    direction: SlotDirection,
    kind: SlotKind,
    name: String,
    type_ref: Option<TypeRef>,
    default: Option<Value>,
    flags: SlotFlags,
}

impl SlotSpec {
    fn exec_in() -> Self {
        Self::exec(SlotDirection::Input, names::IN, SlotFlags::None)
    }

    fn exec_out(name: &str, flags: SlotFlags) -> Self {
        Self::exec(SlotDirection::Output, name, flags)
    }

    fn exec(direction: SlotDirection, name: &str, flags: SlotFlags) -> Self {
        Self {
            direction,
            kind: SlotKind::Execution,
            name: name.to_string(),
            type_ref: None,
            default: None,
            flags,
        }
    }

    fn value(direction: SlotDirection, name: &str, type_ref: Option<TypeRef>) -> Self {
        Self {
            direction,
            kind: SlotKind::Value,
            name: name.to_string(),
            type_ref,
            default: None,
            flags: SlotFlags::None,
        }
    }

    fn parameter(parameter: &Parameter) -> Self {
        let mut spec = Self::value(SlotDirection::Input, &parameter.name, parameter.type_ref.clone());
        spec.default = parameter.default.clone();
        spec
    }
}

impl BlockKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            BlockKind::EntryPoint(_) => "EntryPoint",
            BlockKind::ConditionalBranch(_) => "ConditionalBranch",
            BlockKind::MethodCall(_) => "MethodCall",
            BlockKind::CustomCode(_) => "CustomCode",
            BlockKind::CustomExpression(_) => "CustomExpression",
            BlockKind::VariableGet(_) => "VariableGet",
            BlockKind::VariableSet(_) => "VariableSet",
            BlockKind::PropertyGet(_) => "PropertyGet",
            BlockKind::PropertySet(_) => "PropertySet",
            BlockKind::Literal(_) => "Literal",
            BlockKind::BinaryOperator(_) => "BinaryOperator",
            BlockKind::UnaryOperator(_) => "UnaryOperator",
            BlockKind::Comment(_) => "Comment",
        }
    }

    fn slot_layout(&self) -> Vec<SlotSpec> {
        use SlotDirection::{Input, Output};

        let autoflow = SlotFlags::AutoflowExecution;
        match self {
            BlockKind::EntryPoint(_) => vec![SlotSpec::exec_out(names::OUTPUT, autoflow)],
            BlockKind::ConditionalBranch(_) => {
                let mut condition = SlotSpec::value(Input, names::CONDITION, Some(TypeRef::from("bool")));
                condition.default = Some(Value::Bool(false));
                vec![
                    SlotSpec::exec_in(),
                    condition,
                    SlotSpec::exec_out(names::TRUE, SlotFlags::None),
                    SlotSpec::exec_out(names::FALSE, autoflow),
                ]
            }
            BlockKind::MethodCall(call) => {
                let mut layout = vec![SlotSpec::exec_in(), SlotSpec::exec_out(names::OUT, autoflow)];
                if call.instance {
                    layout.push(SlotSpec::value(Input, names::TARGET, None));
                }
                layout.extend(call.parameters.iter().map(SlotSpec::parameter));
                if let Some(return_type) = &call.return_type {
                    layout.push(SlotSpec::value(Output, names::RESULT, Some(return_type.clone())));
                }
                layout
            }
            BlockKind::CustomCode(code) => {
                let mut layout = vec![SlotSpec::exec_in(), SlotSpec::exec_out(names::OUT, autoflow)];
                layout.extend(code.inputs.iter().map(SlotSpec::parameter));
                layout
            }
            BlockKind::CustomExpression(expr) => {
                let mut layout: Vec<_> = expr.inputs.iter().map(SlotSpec::parameter).collect();
                layout.push(SlotSpec::value(Output, names::RESULT, expr.result_type.clone()));
                layout
            }
            BlockKind::VariableGet(get) => {
                vec![SlotSpec::value(Output, names::VALUE, get.type_ref.clone())]
            }
            BlockKind::VariableSet(set) => vec![
                SlotSpec::exec_in(),
                SlotSpec::exec_out(names::OUT, autoflow),
                SlotSpec::value(Input, names::VALUE, set.type_ref.clone()),
            ],
            BlockKind::PropertyGet(get) => vec![
                SlotSpec::value(Input, names::TARGET, None),
                SlotSpec::value(Output, names::VALUE, get.type_ref.clone()),
            ],
            BlockKind::PropertySet(set) => vec![
                SlotSpec::exec_in(),
                SlotSpec::exec_out(names::OUT, autoflow),
                SlotSpec::value(Input, names::TARGET, None),
                SlotSpec::value(Input, names::VALUE, set.type_ref.clone()),
            ],
            BlockKind::Literal(literal) => vec![SlotSpec::value(
                Output,
                names::VALUE,
                Some(literal.value.natural_type()),
            )],
            BlockKind::BinaryOperator(binary) => vec![
                SlotSpec::value(Input, names::LEFT, None),
                SlotSpec::value(Input, names::RIGHT, None),
                SlotSpec::value(Output, names::RESULT, binary.op.result_type()),
            ],
            BlockKind::UnaryOperator(unary) => vec![
                SlotSpec::value(Input, names::OPERAND, None),
                SlotSpec::value(Output, names::RESULT, unary.op.result_type()),
            ],
            BlockKind::Comment(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    kind: BlockKind,
    slots: Vec<Slot>,
    next_slot_id: u32,
}

impl Block {
    pub fn new(id: BlockId, kind: BlockKind) -> Self {
        let mut block = Self {
            id,
            kind,
            slots: Vec::new(),
            next_slot_id: 0,
        };
        block.regenerate_slots();
        block
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    /// Mutable access to the variant configuration. Call
    /// [`Block::regenerate_slots`] afterwards to refresh the slot set.
    pub fn kind_mut(&mut self) -> &mut BlockKind {
        &mut self.kind
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub(crate) fn slot_mut(&mut self, id: SlotId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }

    pub fn find_slot(&self, direction: SlotDirection, kind: SlotKind, name: Option<&str>) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.matches(direction, kind, name))
    }

    pub fn value_input(&self, name: &str) -> Option<&Slot> {
        self.find_slot(SlotDirection::Input, SlotKind::Value, Some(name))
    }

    pub fn value_output(&self, name: &str) -> Option<&Slot> {
        self.find_slot(SlotDirection::Output, SlotKind::Value, Some(name))
    }

    pub fn execution_input(&self) -> Option<&Slot> {
        self.find_slot(SlotDirection::Input, SlotKind::Execution, None)
    }

    pub fn execution_output(&self, name: &str) -> Option<&Slot> {
        self.find_slot(SlotDirection::Output, SlotKind::Execution, Some(name))
    }

    /// The first output execution slot flagged as autoflow, if any.
    pub fn autoflow_output(&self) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|slot| slot.direction == SlotDirection::Output && slot.kind == SlotKind::Execution && slot.is_autoflow())
    }

    /// Global address of one of this block's slots.
    pub fn slot_ref(&self, slot: SlotId) -> SlotRef {
        SlotRef { block: self.id, slot }
    }

    /// Rebuilds the slot list from the variant configuration.
    ///
    /// Slots whose direction, kind and name survive keep their id and literal
    /// value so existing links stay attached. New slots get fresh ids.
    pub fn regenerate_slots(&mut self) {
        let mut previous = std::mem::take(&mut self.slots);
        for spec in self.kind.slot_layout() {
            let existing = previous
                .iter()
                .position(|slot| slot.matches(spec.direction, spec.kind, Some(spec.name.as_str())));

            let slot = match existing {
                Some(index) => {
                    let mut slot = previous.remove(index);
                    slot.flags = spec.flags;
                    slot.type_ref = None;
                    let value = slot.value.take().or(spec.default);
                    slot.with_type(spec.type_ref).with_value(value)
                }
                None => {
                    let id = SlotId(self.next_slot_id);
                    self.next_slot_id += 1;
                    Slot::new(id, spec.direction, spec.kind, Some(spec.name))
                        .with_type(spec.type_ref)
                        .with_value(spec.default)
                        .with_flags(spec.flags)
                }
            };
            self.slots.push(slot);
        }

        if !previous.is_empty() {
            tracing::debug!(
                "[VSGC] Block {} dropped {} slot(s) during regeneration",
                self.id,
                previous.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(parameters: Vec<Parameter>) -> BlockKind {
        BlockKind::MethodCall(MethodCall {
            method: "Log".to_string(),
            instance: false,
            parameters,
            return_type: None,
        })
    }

    #[test]
    fn branch_layout_has_autoflow_false() {
        let block = Block::new(BlockId(0), BlockKind::ConditionalBranch(ConditionalBranch {}));
        let false_slot = block.execution_output(names::FALSE).unwrap();
        assert!(false_slot.is_autoflow());
        assert!(!block.execution_output(names::TRUE).unwrap().is_autoflow());
        assert_eq!(block.autoflow_output().map(|s| s.id), Some(false_slot.id));
        assert_eq!(
            block.value_input(names::CONDITION).unwrap().value,
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn regeneration_preserves_surviving_slots() {
        let mut block = Block::new(BlockId(3), call(vec![Parameter::new("message")]));
        let message = block.value_input("message").unwrap().id;
        block.slot_mut(message).unwrap().value = Some(Value::from("hello"));

        if let BlockKind::MethodCall(call) = block.kind_mut() {
            call.parameters.push(Parameter::new("level").with_default(2));
            call.return_type = Some(TypeRef::from("bool"));
        }
        block.regenerate_slots();

        let kept = block.value_input("message").unwrap();
        assert_eq!(kept.id, message);
        assert_eq!(kept.value, Some(Value::from("hello")));

        let level = block.value_input("level").unwrap();
        assert_ne!(level.id, message);
        assert_eq!(level.value, Some(Value::Int(2)));
        assert!(block.value_output(names::RESULT).is_some());
    }

    #[test]
    fn regeneration_drops_removed_slots() {
        let mut block = Block::new(BlockId(1), call(vec![Parameter::new("a"), Parameter::new("b")]));
        if let BlockKind::MethodCall(call) = block.kind_mut() {
            call.parameters.retain(|p| p.name != "a");
        }
        block.regenerate_slots();
        assert!(block.value_input("a").is_none());
        assert!(block.value_input("b").is_some());
        assert_eq!(block.slots().len(), 3);
    }

    #[test]
    fn comment_has_no_slots() {
        let block = Block::new(
            BlockId(0),
            BlockKind::Comment(Comment { text: "note".to_string() }),
        );
        assert!(block.slots().is_empty());
        assert!(block.autoflow_output().is_none());
    }
}
