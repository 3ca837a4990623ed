//! # Block Handlers
//!
//! Code generation for each block variant. A variant takes part in
//! compilation through two capabilities: [`EmitsStatements`] for blocks on
//! the execution path and [`ProducesExpression`] for blocks feeding value
//! inputs. [`BlockKind::statement_emitter`] and
//! [`BlockKind::expression_producer`] expose whichever a variant has.

use super::ast::{Expression, Statement};
use super::context::CompilerContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::CodegenError;
use crate::graph::{
    slot_names, BinaryOperator, Block, BlockKind, ConditionalBranch, CustomCode, CustomExpression,
    EntryPoint, Literal, MethodCall, PropertyGet, PropertySet, Slot, SlotId, UnaryOperator,
    VariableGet, VariableSet,
};
use crate::syntax::{self, CodeFragment};
use std::collections::HashMap;

/// Blocks that generate statements into the current basic block.
pub trait EmitsStatements {
    fn generate_code(&self, block: &Block, ctx: &mut CompilerContext<'_>) -> Result<(), CodegenError>;
}

/// Blocks that produce an expression for one of their output value slots.
pub trait ProducesExpression {
    fn generate_expression(
        &self,
        block: &Block,
        slot: SlotId,
        ctx: &mut CompilerContext<'_>,
    ) -> Result<Expression, CodegenError>;
}

impl BlockKind {
    pub fn statement_emitter(&self) -> Option<&dyn EmitsStatements> {
        match self {
            BlockKind::EntryPoint(entry) => Some(entry),
            BlockKind::ConditionalBranch(branch) => Some(branch),
            BlockKind::MethodCall(call) => Some(call),
            BlockKind::CustomCode(code) => Some(code),
            BlockKind::VariableSet(set) => Some(set),
            BlockKind::PropertySet(set) => Some(set),
            _ => None,
        }
    }

    pub fn expression_producer(&self) -> Option<&dyn ProducesExpression> {
        match self {
            BlockKind::MethodCall(call) => Some(call),
            BlockKind::CustomExpression(expr) => Some(expr),
            BlockKind::VariableGet(get) => Some(get),
            BlockKind::PropertyGet(get) => Some(get),
            BlockKind::Literal(literal) => Some(literal),
            BlockKind::BinaryOperator(binary) => Some(binary),
            BlockKind::UnaryOperator(unary) => Some(unary),
            _ => None,
        }
    }
}

fn require_input<'b>(block: &'b Block, name: &str) -> Result<&'b Slot, CodegenError> {
    block.value_input(name).ok_or_else(|| CodegenError::MissingSlot {
        block: block.id,
        slot: name.to_string(),
    })
}

fn input_expression(block: &Block, name: &str, ctx: &mut CompilerContext<'_>) -> Result<Expression, CodegenError> {
    let slot = require_input(block, name)?;
    Ok(ctx.generate_expression(block.slot_ref(slot.id)))
}

/// Resolves an optional `Target` input. An unconnected target without a
/// literal means the member is accessed unqualified.
fn qualified(block: &Block, member: &str, ctx: &mut CompilerContext<'_>) -> Result<Expression, CodegenError> {
    let slot = require_input(block, slot_names::TARGET)?;
    Ok(match ctx.try_generate_expression(block.slot_ref(slot.id)) {
        Some(target) => Expression::member(target, member),
        None => Expression::identifier(member),
    })
}

fn check_variable(block: &Block, name: &str, ctx: &mut CompilerContext<'_>) {
    let graph = ctx.graph();
    if graph.variable(name).is_none() {
        ctx.report_once(
            Diagnostic::warning(
                DiagnosticCode::UnknownVariable,
                format!("variable '{}' is not declared in graph '{}'", name, graph.name),
            )
            .at_block(block.id),
        );
    }
}

/// Resolves every `$name` used by `fragments` to expression text, in order of
/// first use.
fn resolve_placeholders<'f>(
    block: &Block,
    fragments: impl IntoIterator<Item = &'f CodeFragment>,
    ctx: &mut CompilerContext<'_>,
) -> Result<HashMap<String, String>, CodegenError> {
    let mut resolved = HashMap::new();
    for fragment in fragments {
        for name in fragment.placeholders() {
            if resolved.contains_key(name) {
                continue;
            }
            let text = input_expression(block, name, ctx)?.to_primary_string();
            resolved.insert(name.to_string(), text);
        }
    }
    Ok(resolved)
}

impl EmitsStatements for EntryPoint {
    fn generate_code(&self, _block: &Block, _ctx: &mut CompilerContext<'_>) -> Result<(), CodegenError> {
        // Pure attachment point: its autoflow output seeds the function body.
        Ok(())
    }
}

impl EmitsStatements for ConditionalBranch {
    fn generate_code(&self, block: &Block, ctx: &mut CompilerContext<'_>) -> Result<(), CodegenError> {
        let condition = input_expression(block, slot_names::CONDITION, ctx)?;

        // The false successor is resolved first so that, when newly discovered,
        // it lands right after this block and is reached by fallthrough.
        let false_target = block
            .execution_output(slot_names::FALSE)
            .and_then(|slot| ctx.get_or_create_basic_block_from_slot(block.slot_ref(slot.id)));
        let true_target = block
            .execution_output(slot_names::TRUE)
            .and_then(|slot| ctx.get_or_create_basic_block_from_slot(block.slot_ref(slot.id)));

        if let Some(target) = true_target {
            let label = ctx.get_or_create_label(target);
            ctx.add_statement(Statement::ConditionalGoto { condition, label });
        }
        ctx.set_next_block(false_target);
        Ok(())
    }
}

impl MethodCall {
    /// `<method>_<block id>`, with qualifiers folded into the identifier
    /// (`Console.ReadLine` on block 4 stores into `Console_ReadLine_4`).
    fn result_local(&self, block: &Block) -> String {
        let method: String = self
            .method
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        format!("{}_{}", method, block.id.0)
    }
}

impl EmitsStatements for MethodCall {
    fn generate_code(&self, block: &Block, ctx: &mut CompilerContext<'_>) -> Result<(), CodegenError> {
        let callee = if self.instance {
            qualified(block, &self.method, ctx)?
        } else {
            Expression::identifier(self.method.as_str())
        };

        let mut arguments = Vec::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            arguments.push(input_expression(block, &parameter.name, ctx)?);
        }
        let call = Expression::call(callee, arguments);

        let result_used = block
            .value_output(slot_names::RESULT)
            .is_some_and(|slot| ctx.graph().has_consumers(block.slot_ref(slot.id)));
        if result_used {
            ctx.add_statement(Statement::LocalDeclaration {
                name: self.result_local(block),
                value: call,
            });
        } else {
            ctx.add_statement(Statement::Expression(call));
        }
        Ok(())
    }
}

/// A call runs as a statement; consumers read the local it was stored in.
impl ProducesExpression for MethodCall {
    fn generate_expression(
        &self,
        block: &Block,
        slot: SlotId,
        _ctx: &mut CompilerContext<'_>,
    ) -> Result<Expression, CodegenError> {
        match block.value_output(slot_names::RESULT) {
            Some(result) if result.id == slot => Ok(Expression::Identifier(self.result_local(block))),
            _ => Err(CodegenError::MissingSlot {
                block: block.id,
                slot: slot_names::RESULT.to_string(),
            }),
        }
    }
}

impl EmitsStatements for CustomCode {
    fn generate_code(&self, block: &Block, ctx: &mut CompilerContext<'_>) -> Result<(), CodegenError> {
        // Parse everything up front: a broken fragment emits nothing at all.
        let fragments = syntax::parse_statements(&self.code)?;
        let resolved = resolve_placeholders(block, &fragments, ctx)?;
        for fragment in &fragments {
            let text = fragment.render(|name| resolved.get(name).cloned().unwrap_or_default());
            ctx.add_statement(Statement::Raw(text));
        }
        Ok(())
    }
}

impl ProducesExpression for CustomExpression {
    fn generate_expression(
        &self,
        block: &Block,
        _slot: SlotId,
        ctx: &mut CompilerContext<'_>,
    ) -> Result<Expression, CodegenError> {
        let fragment = syntax::parse_expression(&self.code)?;
        let resolved = resolve_placeholders(block, [&fragment], ctx)?;
        Ok(Expression::Raw(
            fragment.render(|name| resolved.get(name).cloned().unwrap_or_default()),
        ))
    }
}

impl EmitsStatements for VariableSet {
    fn generate_code(&self, block: &Block, ctx: &mut CompilerContext<'_>) -> Result<(), CodegenError> {
        check_variable(block, &self.name, ctx);
        let value = input_expression(block, slot_names::VALUE, ctx)?;
        ctx.add_statement(Statement::Assignment {
            target: Expression::identifier(self.name.as_str()),
            value,
        });
        Ok(())
    }
}

impl ProducesExpression for VariableGet {
    fn generate_expression(
        &self,
        block: &Block,
        _slot: SlotId,
        ctx: &mut CompilerContext<'_>,
    ) -> Result<Expression, CodegenError> {
        check_variable(block, &self.name, ctx);
        Ok(Expression::identifier(self.name.as_str()))
    }
}

impl EmitsStatements for PropertySet {
    fn generate_code(&self, block: &Block, ctx: &mut CompilerContext<'_>) -> Result<(), CodegenError> {
        let target = qualified(block, &self.member, ctx)?;
        let value = input_expression(block, slot_names::VALUE, ctx)?;
        ctx.add_statement(Statement::Assignment { target, value });
        Ok(())
    }
}

impl ProducesExpression for PropertyGet {
    fn generate_expression(
        &self,
        block: &Block,
        _slot: SlotId,
        ctx: &mut CompilerContext<'_>,
    ) -> Result<Expression, CodegenError> {
        qualified(block, &self.member, ctx)
    }
}

impl ProducesExpression for Literal {
    fn generate_expression(
        &self,
        _block: &Block,
        _slot: SlotId,
        _ctx: &mut CompilerContext<'_>,
    ) -> Result<Expression, CodegenError> {
        Ok(Expression::Literal(self.value.clone()))
    }
}

impl ProducesExpression for BinaryOperator {
    fn generate_expression(
        &self,
        block: &Block,
        _slot: SlotId,
        ctx: &mut CompilerContext<'_>,
    ) -> Result<Expression, CodegenError> {
        let left = input_expression(block, slot_names::LEFT, ctx)?;
        let right = input_expression(block, slot_names::RIGHT, ctx)?;
        Ok(Expression::Binary {
            op: self.op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }
}

impl ProducesExpression for UnaryOperator {
    fn generate_expression(
        &self,
        block: &Block,
        _slot: SlotId,
        ctx: &mut CompilerContext<'_>,
    ) -> Result<Expression, CodegenError> {
        let operand = input_expression(block, slot_names::OPERAND, ctx)?;
        Ok(Expression::unary(self.op, operand))
    }
}
