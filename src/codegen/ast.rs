//! # Generated Code Tree
//!
//! Statements and expressions of the target language. `Display` renders each
//! node in single-line form; the writer adds layout.

use crate::graph::{BinaryOp, UnaryOp, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub String);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Literal(Value),
    Identifier(String),
    Member {
        target: Box<Expression>,
        member: String,
    },
    Invocation {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    /// User-written expression text, already checked.
    Raw(String),
}

impl Expression {
    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn member(target: Expression, member: impl Into<String>) -> Self {
        Expression::Member {
            target: Box::new(target),
            member: member.into(),
        }
    }

    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Invocation {
            callee: Box::new(callee),
            arguments,
        }
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Whether the rendered text stays one operand next to `.`, `(` or an
    /// operator. A leading sign or user text does not.
    pub fn is_primary(&self) -> bool {
        match self {
            Expression::Literal(Value::Int(i)) => *i >= 0,
            Expression::Literal(Value::Float(x)) => !x.is_finite() || !x.is_sign_negative(),
            Expression::Unary { .. } | Expression::Raw(_) => false,
            _ => true,
        }
    }

    /// Renders for splicing into surrounding code, parenthesized unless
    /// primary.
    pub fn to_primary_string(&self) -> String {
        if self.is_primary() {
            self.to_string()
        } else {
            format!("({})", self)
        }
    }

    fn fmt_primary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_primary() {
            write!(f, "{}", self)
        } else {
            write!(f, "({})", self)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Identifier(name) => f.write_str(name),
            Expression::Member { target, member } => {
                target.fmt_primary(f)?;
                write!(f, ".{}", member)
            }
            Expression::Invocation { callee, arguments } => {
                callee.fmt_primary(f)?;
                f.write_str("(")?;
                for (index, argument) in arguments.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                f.write_str(")")
            }
            Expression::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Unary { op, operand } => {
                f.write_str(op.symbol())?;
                operand.fmt_primary(f)
            }
            Expression::Raw(code) => f.write_str(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Expression(Expression),
    Assignment {
        target: Expression,
        value: Expression,
    },
    LocalDeclaration {
        name: String,
        value: Expression,
    },
    Goto(Label),
    ConditionalGoto {
        condition: Expression,
        label: Label,
    },
    Return,
    /// `;`, used as the anchor of a label whose block has no code yet.
    Empty,
    /// A checked statement from a custom code block.
    Raw(String),
    Labeled {
        label: Label,
        statement: Box<Statement>,
    },
}

impl Statement {
    pub fn label(&self) -> Option<&Label> {
        match self {
            Statement::Labeled { label, .. } => Some(label),
            _ => None,
        }
    }

    /// True for a labeled `;` waiting to be replaced by real code.
    pub(crate) fn is_label_placeholder(&self) -> bool {
        matches!(self, Statement::Labeled { statement, .. } if **statement == Statement::Empty)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Expression(expression) => write!(f, "{};", expression),
            Statement::Assignment { target, value } => write!(f, "{} = {};", target, value),
            Statement::LocalDeclaration { name, value } => write!(f, "var {} = {};", name, value),
            Statement::Goto(label) => write!(f, "goto {};", label),
            Statement::ConditionalGoto { condition, label } => {
                write!(f, "if ({}) goto {};", condition, label)
            }
            Statement::Return => f.write_str("return;"),
            Statement::Empty => f.write_str(";"),
            Statement::Raw(code) => f.write_str(code),
            Statement::Labeled { label, statement } => write!(f, "{}: {}", label, statement),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_calls_and_members() {
        let call = Expression::call(
            Expression::member(Expression::identifier("player"), "Jump"),
            vec![Expression::Literal(Value::Float(2.5)), Expression::identifier("force")],
        );
        assert_eq!(call.to_string(), "player.Jump(2.5, force)");
        assert_eq!(Statement::Expression(call).to_string(), "player.Jump(2.5, force);");
    }

    #[test]
    fn raw_targets_are_parenthesized() {
        let member = Expression::member(Expression::Raw("a ?? b".to_string()), "Length");
        assert_eq!(member.to_string(), "(a ?? b).Length");
    }

    #[test]
    fn renders_control_statements() {
        let label = Label("block1".to_string());
        let branch = Statement::ConditionalGoto {
            condition: Expression::Literal(Value::Bool(true)),
            label: label.clone(),
        };
        assert_eq!(branch.to_string(), "if (true) goto block1;");

        let labeled = Statement::Labeled {
            label,
            statement: Box::new(Statement::Empty),
        };
        assert!(labeled.is_label_placeholder());
        assert_eq!(labeled.to_string(), "block1: ;");
    }

    #[test]
    fn binary_expressions_are_parenthesized() {
        let sum = Expression::Binary {
            op: BinaryOp::Add,
            left: Box::new(Expression::identifier("a")),
            right: Box::new(Expression::Binary {
                op: BinaryOp::Multiply,
                left: Box::new(Expression::identifier("b")),
                right: Box::new(Expression::Literal(Value::Int(2))),
            }),
        };
        assert_eq!(sum.to_string(), "(a + (b * 2))");
    }

    #[test]
    fn negative_literals_are_parenthesized_as_targets() {
        let member = Expression::member(Expression::Literal(Value::Int(-5)), "X");
        assert_eq!(member.to_string(), "(-5).X");
        assert_eq!(Expression::Literal(Value::Float(-0.5)).to_primary_string(), "(-0.5)");
        assert_eq!(Expression::Literal(Value::Int(5)).to_primary_string(), "5");
    }

    #[test]
    fn unary_operands_keep_their_sign() {
        let negate = Expression::unary(UnaryOp::Negate, Expression::Literal(Value::Int(-5)));
        assert_eq!(negate.to_string(), "-(-5)");

        let not = Expression::unary(UnaryOp::Not, Expression::identifier("done"));
        assert_eq!(not.to_string(), "!done");
        assert_eq!(not.to_primary_string(), "(!done)");

        let sum = Expression::Binary {
            op: BinaryOp::Subtract,
            left: Box::new(Expression::identifier("a")),
            right: Box::new(Expression::unary(UnaryOp::Negate, Expression::identifier("b"))),
        };
        assert_eq!(sum.to_string(), "(a - -b)");
    }
}
