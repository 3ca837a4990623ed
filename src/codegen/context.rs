//! # Compiler Context
//!
//! Per-function state of one compilation run: the basic blocks discovered so
//! far, the worklist of blocks still waiting for code, label allocation, and
//! value-flow resolution.
//!
//! Every script block is mapped to its own basic block. The mapping is
//! registered before the block is generated and the block is queued rather
//! than visited recursively, so each block is generated at most once no
//! matter how many execution links (including loop back-edges) reach it.
//! After the worklist drains, basic blocks are concatenated in discovery
//! order; a jump is only synthesized where a successor is not the very next
//! basic block.

use super::ast::{Expression, Label, Statement};
use crate::config::CompilerOptions;
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Severity};
use crate::error::CodegenError;
use crate::graph::{BlockId, Graph, SlotId, SlotRef};
use std::collections::{HashMap, HashSet, VecDeque};

/// A straight run of generated statements with at most one successor.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub index: usize,
    pub statements: Vec<Statement>,
    pub label: Option<Label>,
    pub next_block: Option<usize>,
}

impl BasicBlock {
    fn new(index: usize) -> Self {
        Self {
            index,
            statements: Vec::new(),
            label: None,
            next_block: None,
        }
    }
}

pub struct CompilerContext<'a> {
    graph: &'a Graph,
    options: &'a CompilerOptions,
    sink: &'a mut dyn DiagnosticSink,
    block_map: HashMap<BlockId, usize>,
    basic_blocks: Vec<BasicBlock>,
    worklist: VecDeque<(usize, BlockId)>,
    current_basic_block: usize,
    current_block: Option<BlockId>,
    /// Output execution slots of the current block resolved by its generator.
    resolved_outputs: Vec<SlotId>,
    label_count: usize,
    /// Producer blocks whose expression is being built, innermost last.
    expression_stack: Vec<BlockId>,
    /// Block diagnostics already sent through [`report_once`](Self::report_once).
    reported: HashSet<(BlockId, DiagnosticCode)>,
}

impl<'a> CompilerContext<'a> {
    pub fn new(graph: &'a Graph, options: &'a CompilerOptions, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            graph,
            options,
            sink,
            block_map: HashMap::new(),
            basic_blocks: Vec::new(),
            worklist: VecDeque::new(),
            current_basic_block: 0,
            current_block: None,
            resolved_outputs: Vec::new(),
            label_count: 0,
            expression_stack: Vec::new(),
            reported: HashSet::new(),
        }
    }

    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    pub fn options(&self) -> &'a CompilerOptions {
        self.options
    }

    pub fn basic_blocks(&self) -> &[BasicBlock] {
        &self.basic_blocks
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current_block
    }

    pub fn current_basic_block(&self) -> usize {
        self.current_basic_block
    }

    /// Returns the basic block of `block`, allocating and queueing a new one
    /// the first time the block is reached.
    pub fn get_or_create_basic_block(&mut self, block: BlockId) -> usize {
        if let Some(&index) = self.block_map.get(&block) {
            return index;
        }

        let index = self.basic_blocks.len();
        self.basic_blocks.push(BasicBlock::new(index));
        self.block_map.insert(block, index);
        self.worklist.push_back((index, block));
        tracing::debug!("[VSGC] Basic block {} created for block {}", index, block);
        index
    }

    /// Follows the execution link leaving `slot`, if any, to its successor's
    /// basic block.
    pub fn get_or_create_basic_block_from_slot(&mut self, slot: SlotRef) -> Option<usize> {
        if Some(slot.block) == self.current_block {
            self.resolved_outputs.push(slot.slot);
        }

        let graph = self.graph;
        let link = graph.link_from_source(slot)?;
        if graph.slot(link.target).is_none() {
            self.report(
                Diagnostic::warning(
                    DiagnosticCode::UnresolvedReference,
                    format!("execution link from {} points at missing slot {}", slot, link.target),
                )
                .at_block(slot.block),
            );
            return None;
        }
        Some(self.get_or_create_basic_block(link.target.block))
    }

    /// The label bound to basic block `index`, allocated on first use.
    ///
    /// A block with no statements yet gets a labeled `;` placeholder, which the
    /// first real statement added to it replaces.
    pub fn get_or_create_label(&mut self, index: usize) -> Label {
        if let Some(label) = &self.basic_blocks[index].label {
            return label.clone();
        }

        self.label_count += 1;
        let label = Label(format!("{}{}", self.options.label_prefix, self.label_count));
        tracing::debug!("[VSGC] Label {} bound to basic block {}", label, index);

        let basic_block = &mut self.basic_blocks[index];
        basic_block.label = Some(label.clone());
        if basic_block.statements.is_empty() {
            basic_block.statements.push(Statement::Empty);
        }
        let first = &mut basic_block.statements[0];
        let statement = std::mem::replace(first, Statement::Empty);
        *first = Statement::Labeled {
            label: label.clone(),
            statement: Box::new(statement),
        };
        label
    }

    /// Appends a statement to the current basic block.
    pub fn add_statement(&mut self, statement: Statement) {
        let basic_block = &mut self.basic_blocks[self.current_basic_block];
        if basic_block.statements.len() == 1 && basic_block.statements[0].is_label_placeholder() {
            if let Statement::Labeled { statement: anchor, .. } = &mut basic_block.statements[0] {
                **anchor = statement;
                return;
            }
        }
        basic_block.statements.push(statement);
    }

    /// Sets the successor of the current basic block.
    pub fn set_next_block(&mut self, next: Option<usize>) {
        self.basic_blocks[self.current_basic_block].next_block = next;
    }

    /// Resolves a value input to an expression, falling back to the slot's
    /// literal and then to the placeholder identifier.
    pub fn generate_expression(&mut self, slot: SlotRef) -> Expression {
        self.try_generate_expression(slot)
            .unwrap_or_else(|| Expression::Identifier(self.options.placeholder_identifier.clone()))
    }

    /// Like [`generate_expression`](Self::generate_expression) but yields
    /// `None` when there is neither a producer nor a literal.
    pub fn try_generate_expression(&mut self, slot: SlotRef) -> Option<Expression> {
        let graph = self.graph;
        if let Some(link) = graph.link_to_target(slot) {
            if let Some(expression) = self.expression_from_producer(link.source, slot) {
                return Some(expression);
            }
        }
        graph
            .slot(slot)
            .and_then(|slot| slot.value.clone())
            .map(Expression::Literal)
    }

    fn expression_from_producer(&mut self, source: SlotRef, consumer: SlotRef) -> Option<Expression> {
        let graph = self.graph;
        let Some(block) = graph.block(source.block).filter(|block| block.slot(source.slot).is_some()) else {
            self.report(
                Diagnostic::warning(
                    DiagnosticCode::UnresolvedReference,
                    format!("value link into {} comes from missing slot {}", consumer, source),
                )
                .at_block(consumer.block),
            );
            return None;
        };

        let Some(producer) = block.kind().expression_producer() else {
            self.report_codegen_error(consumer.block, CodegenError::NotAnExpression(block.id));
            return None;
        };

        if self.expression_stack.contains(&block.id) {
            self.report(
                Diagnostic::warning(
                    DiagnosticCode::CyclicValue,
                    format!("value of {} depends on itself", source),
                )
                .at_block(block.id),
            );
            return None;
        }

        self.expression_stack.push(block.id);
        let result = producer.generate_expression(block, source.slot, self);
        self.expression_stack.pop();

        match result {
            Ok(expression) => Some(expression),
            Err(err) => {
                self.report_codegen_error(block.id, err);
                None
            }
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => tracing::error!("[VSGC] {}", diagnostic),
            Severity::Warning => tracing::warn!("[VSGC] {}", diagnostic),
            Severity::Info => tracing::info!("[VSGC] {}", diagnostic),
        }
        self.sink.report(diagnostic);
    }

    /// Reports `diagnostic` unless one with the same code was already
    /// reported for its block. Producers are regenerated at every consumer,
    /// so their findings would otherwise repeat.
    pub fn report_once(&mut self, diagnostic: Diagnostic) {
        if let Some(block) = diagnostic.block {
            if !self.reported.insert((block, diagnostic.code)) {
                return;
            }
        }
        self.report(diagnostic);
    }

    pub(crate) fn report_codegen_error(&mut self, block: BlockId, err: CodegenError) {
        let diagnostic = match &err {
            CodegenError::Syntax(syntax) => {
                Diagnostic::new(syntax.severity, DiagnosticCode::Syntax, err.to_string())
            }
            _ => Diagnostic::error(DiagnosticCode::Codegen, err.to_string()),
        };
        self.report(diagnostic.at_block(block));
    }

    /// Generates queued blocks until none are left.
    pub fn drain_worklist(&mut self) {
        while let Some((index, block)) = self.worklist.pop_front() {
            self.generate_basic_block(index, block);
        }
    }

    fn generate_basic_block(&mut self, index: usize, block_id: BlockId) {
        self.current_basic_block = index;
        self.current_block = Some(block_id);
        self.resolved_outputs.clear();

        let graph = self.graph;
        if let Some(block) = graph.block(block_id) {
            tracing::debug!(
                "[VSGC] Generating {} block {} into basic block {}",
                block.kind().type_name(),
                block_id,
                index
            );
            if let Some(emitter) = block.kind().statement_emitter() {
                if let Err(err) = emitter.generate_code(block, self) {
                    self.report_codegen_error(block_id, err);
                }
            }

            if let Some(autoflow) = block.autoflow_output() {
                if !self.resolved_outputs.contains(&autoflow.id) {
                    let next = self.get_or_create_basic_block_from_slot(block.slot_ref(autoflow.id));
                    if next.is_some() {
                        self.set_next_block(next);
                    }
                }
            }
        } else {
            self.report(Diagnostic::warning(
                DiagnosticCode::UnresolvedReference,
                format!("block {} no longer exists", block_id),
            ));
        }

        match self.basic_blocks[index].next_block {
            None => self.add_statement(Statement::Return),
            Some(next) if next == index + 1 => {}
            Some(next) => {
                let label = self.get_or_create_label(next);
                tracing::debug!("[VSGC] Jump from basic block {} to {} ({})", index, next, label);
                self.add_statement(Statement::Goto(label));
            }
        }
    }

    /// Concatenates the basic blocks in discovery order.
    pub fn into_statements(self) -> Vec<Statement> {
        self.basic_blocks
            .into_iter()
            .flat_map(|basic_block| basic_block.statements)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BlockKind, EntryPoint, Value};

    fn entry_graph() -> (Graph, BlockId) {
        let mut graph = Graph::new("test");
        let entry = graph.add_block(BlockKind::EntryPoint(EntryPoint { name: "Run".to_string() }));
        (graph, entry)
    }

    #[test]
    fn basic_blocks_are_registered_once() {
        let (graph, entry) = entry_graph();
        let options = CompilerOptions::default();
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut context = CompilerContext::new(&graph, &options, &mut sink);

        assert_eq!(context.get_or_create_basic_block(entry), 0);
        assert_eq!(context.get_or_create_basic_block(entry), 0);
        assert_eq!(context.basic_blocks().len(), 1);
        assert_eq!(context.worklist.len(), 1);
    }

    #[test]
    fn first_statement_replaces_label_placeholder() {
        let (graph, entry) = entry_graph();
        let options = CompilerOptions::default();
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut context = CompilerContext::new(&graph, &options, &mut sink);

        let index = context.get_or_create_basic_block(entry);
        let label = context.get_or_create_label(index);
        assert_eq!(label.0, "block1");
        assert!(context.basic_blocks()[index].statements[0].is_label_placeholder());

        context.current_basic_block = index;
        context.add_statement(Statement::Return);
        context.add_statement(Statement::Return);

        let statements = &context.basic_blocks()[index].statements;
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].to_string(), "block1: return;");
        assert_eq!(context.get_or_create_label(index), label);
    }

    #[test]
    fn label_wraps_existing_first_statement() {
        let (graph, entry) = entry_graph();
        let options = CompilerOptions::default();
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut context = CompilerContext::new(&graph, &options, &mut sink);

        let index = context.get_or_create_basic_block(entry);
        context.current_basic_block = index;
        context.add_statement(Statement::Expression(Expression::identifier("a")));
        context.add_statement(Statement::Expression(Expression::identifier("b")));
        context.get_or_create_label(index);

        let rendered: Vec<String> = context.basic_blocks()[index]
            .statements
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(rendered, vec!["block1: a;", "b;"]);
    }

    #[test]
    fn dangling_value_link_falls_back_to_literal() {
        let mut graph = Graph::new("test");
        let set = graph.add_block(BlockKind::VariableSet(crate::graph::VariableSet {
            name: "x".to_string(),
            type_ref: None,
        }));
        let get = graph.add_block(BlockKind::VariableGet(crate::graph::VariableGet {
            name: "y".to_string(),
            type_ref: None,
        }));
        graph.connect_value(get, "Value", set, "Value").unwrap();
        graph.set_input_value(set, "Value", 5).unwrap();
        graph.remove_block(get);

        let options = CompilerOptions::default();
        let mut sink: Vec<Diagnostic> = Vec::new();
        let mut context = CompilerContext::new(&graph, &options, &mut sink);
        let input = graph.block(set).unwrap().value_input("Value").unwrap().id;
        let expression = context.generate_expression(SlotRef { block: set, slot: input });

        assert_eq!(expression, Expression::Literal(Value::Int(5)));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].code, DiagnosticCode::UnresolvedReference);
    }
}
