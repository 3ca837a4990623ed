//! # Source Writer
//!
//! Lays out the compiled functions and fields as one class of target source.

use super::ast::Statement;
use crate::config::CompilerOptions;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedField {
    pub name: String,
    pub type_name: String,
    pub initializer: Option<String>,
}

/// One entry point compiled to a linear statement list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedFunction {
    pub name: String,
    pub statements: Vec<Statement>,
    pub basic_block_count: usize,
}

impl GeneratedFunction {
    /// The body on one line: `{ Foo(); return; }`.
    pub fn body_text(&self) -> String {
        let mut body = String::from("{ ");
        for statement in &self.statements {
            body.push_str(&statement.to_string());
            body.push(' ');
        }
        body.push('}');
        body
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedSource {
    pub class_name: String,
    pub fields: Vec<GeneratedField>,
    pub functions: Vec<GeneratedFunction>,
    pub text: String,
}

impl GeneratedSource {
    pub fn function(&self, name: &str) -> Option<&GeneratedFunction> {
        self.functions.iter().find(|function| function.name == name)
    }
}

pub struct SourceWriter<'a> {
    options: &'a CompilerOptions,
    code: String,
    level: usize,
}

impl<'a> SourceWriter<'a> {
    pub fn new(options: &'a CompilerOptions) -> Self {
        Self {
            options,
            code: String::new(),
            level: 0,
        }
    }

    fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.code.push('\n');
            return;
        }
        for line in text.lines() {
            self.code.push_str(&" ".repeat(self.level * self.options.indent));
            self.code.push_str(line);
            self.code.push('\n');
        }
    }

    fn open(&mut self, header: &str) {
        self.line(header);
        self.line("{");
        self.level += 1;
    }

    fn close(&mut self) {
        self.level = self.level.saturating_sub(1);
        self.line("}");
    }

    pub fn write_program(
        mut self,
        class_name: &str,
        fields: &[GeneratedField],
        functions: &[GeneratedFunction],
    ) -> String {
        if self.options.emit_header {
            self.line("// Auto-generated code from a visual script graph");
            self.line("// DO NOT EDIT - Changes will be overwritten");
            self.line("// Compiled with VSGC (Visual Script Graph Compiler)");
            self.line("");
        }

        let namespace = self.options.namespace.clone();
        if let Some(namespace) = &namespace {
            self.open(&format!("namespace {}", namespace));
        }
        self.open(&format!("public partial class {}", class_name));

        for field in fields {
            match &field.initializer {
                Some(value) => self.line(&format!("public {} {} = {};", field.type_name, field.name, value)),
                None => self.line(&format!("public {} {};", field.type_name, field.name)),
            }
        }

        for (index, function) in functions.iter().enumerate() {
            if index > 0 || !fields.is_empty() {
                self.line("");
            }
            self.write_function(function);
        }

        self.close();
        if namespace.is_some() {
            self.close();
        }
        self.code
    }

    fn write_function(&mut self, function: &GeneratedFunction) {
        self.open(&format!("public void {}()", function.name));
        for statement in &function.statements {
            self.line(&statement.to_string());
        }
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ast::{Expression, Label};

    fn function() -> GeneratedFunction {
        GeneratedFunction {
            name: "Start".to_string(),
            statements: vec![
                Statement::Expression(Expression::call(Expression::identifier("Foo"), vec![])),
                Statement::Labeled {
                    label: Label("block1".to_string()),
                    statement: Box::new(Statement::Return),
                },
            ],
            basic_block_count: 2,
        }
    }

    #[test]
    fn body_text_is_compact() {
        assert_eq!(function().body_text(), "{ Foo(); block1: return; }");
        let empty = GeneratedFunction {
            name: "Empty".to_string(),
            statements: vec![],
            basic_block_count: 0,
        };
        assert_eq!(empty.body_text(), "{ }");
    }

    #[test]
    fn writes_namespace_class_fields_and_methods() {
        let options = CompilerOptions {
            namespace: Some("Game.Scripts".to_string()),
            emit_header: false,
            indent: 2,
            ..Default::default()
        };
        let fields = vec![GeneratedField {
            name: "speed".to_string(),
            type_name: "float".to_string(),
            initializer: Some("1.5".to_string()),
        }];
        let text = SourceWriter::new(&options).write_program("Mover", &fields, &[function()]);
        let expected = "\
namespace Game.Scripts
{
  public partial class Mover
  {
    public float speed = 1.5;

    public void Start()
    {
      Foo();
      block1: return;
    }
  }
}
";
        assert_eq!(text, expected);
    }
}
