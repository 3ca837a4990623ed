//! # Script Compiler
//!
//! Main entry points for compiling script graphs to source code.

use crate::codegen::{CompilerContext, GeneratedField, GeneratedFunction, GeneratedSource, SourceWriter};
use crate::config::CompilerOptions;
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use crate::graph::{Block, EntryPoint, Graph};

/// Compile a script graph with default options.
///
/// Compilation never fails: problems are reported to `sink` and the output is
/// the best code that could be produced.
///
/// # Examples
///
/// ```rust
/// use vsgc::{compile_graph, DiagnosticLog, Graph};
///
/// let graph = Graph::new("Empty");
/// let mut log = DiagnosticLog::new();
/// let source = compile_graph(&graph, &mut log);
/// assert!(source.functions.is_empty());
/// assert!(log.is_empty());
/// ```
pub fn compile_graph(graph: &Graph, sink: &mut dyn DiagnosticSink) -> GeneratedSource {
    compile_graph_with_options(graph, &CompilerOptions::default(), sink)
}

/// Compile a script graph.
///
/// # Arguments
///
/// * `graph` - The graph to compile; read-only for the whole compile
/// * `options` - Output naming and layout
/// * `sink` - Receives every warning and error
///
/// # Returns
///
/// One class holding a field per graph variable and a method per entry point.
pub fn compile_graph_with_options(
    graph: &Graph,
    options: &CompilerOptions,
    sink: &mut dyn DiagnosticSink,
) -> GeneratedSource {
    tracing::info!("[VSGC] Starting script compilation");
    tracing::info!("[VSGC] Graph: {} ({} blocks, {} links, {} variables)",
        graph.name,
        graph.blocks().len(),
        graph.links().len(),
        graph.variables().len());

    // Phase 1: Materialize variables as fields
    tracing::info!("[VSGC] Phase 1: Declaring fields...");
    let fields = declare_fields(graph, options, sink);

    // Phase 2: Find entry points
    tracing::info!("[VSGC] Phase 2: Finding entry points...");
    let entry_points: Vec<(&Block, &EntryPoint)> = graph.entry_points().collect();
    tracing::info!("[VSGC] Found {} entry point(s)", entry_points.len());

    // Phase 3: Compile one function per entry point
    tracing::info!("[VSGC] Phase 3: Generating functions...");
    let functions: Vec<GeneratedFunction> = entry_points
        .into_iter()
        .map(|(block, entry)| compile_entry_point(graph, block, entry, options, &mut *sink))
        .collect();

    // Phase 4: Assemble source text
    tracing::info!("[VSGC] Phase 4: Writing source...");
    let class_name = options.class_name.clone().unwrap_or_else(|| graph.name.clone());
    let text = SourceWriter::new(options).write_program(&class_name, &fields, &functions);

    tracing::info!("[VSGC] Code generation complete ({} bytes)", text.len());

    GeneratedSource {
        class_name,
        fields,
        functions,
        text,
    }
}

fn declare_fields(graph: &Graph, options: &CompilerOptions, sink: &mut dyn DiagnosticSink) -> Vec<GeneratedField> {
    graph
        .variables()
        .iter()
        .map(|variable| {
            let type_name = match &variable.type_ref {
                Some(type_ref) => type_ref.to_string(),
                None => {
                    let diagnostic = Diagnostic::warning(
                        DiagnosticCode::MissingVariableType,
                        format!(
                            "variable '{}' has no type, using '{}'",
                            variable.name, options.fallback_type
                        ),
                    );
                    tracing::warn!("[VSGC] {}", diagnostic);
                    sink.report(diagnostic);
                    options.fallback_type.clone()
                }
            };
            GeneratedField {
                name: variable.name.clone(),
                type_name,
                initializer: variable.default.as_ref().map(|value| value.to_string()),
            }
        })
        .collect()
}

fn compile_entry_point(
    graph: &Graph,
    block: &Block,
    entry: &EntryPoint,
    options: &CompilerOptions,
    sink: &mut dyn DiagnosticSink,
) -> GeneratedFunction {
    let name = entry.name.clone();

    let mut context = CompilerContext::new(graph, options, sink);
    context.get_or_create_basic_block(block.id);
    context.drain_worklist();

    let basic_block_count = context.basic_blocks().len();
    let statements = context.into_statements();
    tracing::info!("[VSGC]   - {}: {} basic block(s), {} statement(s)",
        name,
        basic_block_count,
        statements.len());

    GeneratedFunction {
        name,
        statements,
        basic_block_count,
    }
}
