//! Abstract Syntax Tree for tinylang.
//!
//! Nodes are built once by the parser and never mutated; each parent
//! uniquely owns its children. The `Display` impls produce the nested
//! text form used for program inspection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lexer::Token;
use crate::span::Span;

/// An expression producing a numeric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Arithmetic or relational operation: `left op right`
    Binary {
        left: Box<Expression>,
        operator: Token,
        right: Box<Expression>,
    },
    /// Parenthesized sub-expression
    Grouping { inner: Box<Expression> },
    /// Integer literal token
    Number(Token),
    /// String literal token; only legal as a direct `write` operand
    String(Token),
    /// Variable reference
    Variable(Token),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Binary { left, right, .. } => left.span().merge(&right.span()),
            Expression::Grouping { inner } => inner.span(),
            Expression::Number(token)
            | Expression::String(token)
            | Expression::Variable(token) => token.span,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Binary {
                left,
                operator,
                right,
            } => write!(f, "BinaryExpr({} {} {})", left, operator.text, right),
            Expression::Grouping { inner } => write!(f, "GroupingExpression({})", inner),
            Expression::Number(token) => write!(f, "NumberExpr({})", token.text),
            Expression::String(token) => write!(f, "LiteralExpr(\"{}\")", token.text),
            Expression::Variable(token) => write!(f, "VariableExpr({})", token.text),
        }
    }
}

/// A statement producing side effects against the symbol registry and the
/// I/O channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `target := value;`
    Assignment { target: Token, value: Expression },
    /// `if condition then ... else ... end`
    If {
        condition: Expression,
        then_branch: Vec<Statement>,
        else_branch: Vec<Statement>,
    },
    /// `repeat ... until condition;` (body runs at least once)
    Repeat {
        body: Vec<Statement>,
        condition: Expression,
    },
    /// `write operand, ...;`
    Write { operands: Vec<Expression> },
    /// `read target, ...;`
    Read { targets: Vec<Token> },
}

impl Statement {
    /// Append the nested text form at the given indentation (2 spaces per
    /// nesting level).
    pub fn render(&self, indent: usize, out: &mut String) {
        let pad = " ".repeat(indent);
        match self {
            Statement::Assignment { target, value } => {
                out.push_str(&format!(
                    "{}AssignmentStatement({}, {});\n",
                    pad, target.text, value
                ));
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push_str(&format!("{}IfStatement({}) Then\n", pad, condition));
                for statement in then_branch {
                    statement.render(indent + 2, out);
                }
                out.push_str(&format!("{}End\n", pad));
                if !else_branch.is_empty() {
                    out.push_str(&format!("{}Else\n", pad));
                    for statement in else_branch {
                        statement.render(indent + 2, out);
                    }
                    out.push_str(&format!("{}End\n", pad));
                }
            }
            Statement::Repeat { body, condition } => {
                out.push_str(&format!("{}RepeatStatement\n", pad));
                for statement in body {
                    statement.render(indent + 2, out);
                }
                out.push_str(&format!("{}Until ({});\n", pad, condition));
            }
            Statement::Write { operands } => {
                let rendered: Vec<String> = operands.iter().map(|o| o.to_string()).collect();
                out.push_str(&format!("{}WriteStatement({});\n", pad, rendered.join(", ")));
            }
            Statement::Read { targets } => {
                let names: Vec<&str> = targets.iter().map(|t| t.text.as_str()).collect();
                out.push_str(&format!("{}ReadStatement({});\n", pad, names.join(", ")));
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(0, &mut out);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn token(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, text, Span::default())
    }

    fn number(text: &str) -> Expression {
        Expression::Number(token(TokenKind::Number, text))
    }

    #[test]
    fn expression_display_forms() {
        let sum = Expression::Binary {
            left: Box::new(number("1")),
            operator: token(TokenKind::Plus, "+"),
            right: Box::new(Expression::Variable(token(TokenKind::Identifier, "x"))),
        };
        assert_eq!(sum.to_string(), "BinaryExpr(NumberExpr(1) + VariableExpr(x))");

        let grouped = Expression::Grouping {
            inner: Box::new(number("2")),
        };
        assert_eq!(grouped.to_string(), "GroupingExpression(NumberExpr(2))");

        let literal = Expression::String(token(TokenKind::Literal, "hi"));
        assert_eq!(literal.to_string(), "LiteralExpr(\"hi\")");
    }

    #[test]
    fn assignment_display_is_a_single_line() {
        let statement = Statement::Assignment {
            target: token(TokenKind::Identifier, "x"),
            value: number("7"),
        };
        assert_eq!(statement.to_string(), "AssignmentStatement(x, NumberExpr(7));\n");
    }

    #[test]
    fn nested_statements_indent_by_two_spaces() {
        let statement = Statement::If {
            condition: Expression::Variable(token(TokenKind::Identifier, "x")),
            then_branch: vec![Statement::Write {
                operands: vec![number("1")],
            }],
            else_branch: vec![Statement::Write {
                operands: vec![number("0")],
            }],
        };
        assert_eq!(
            statement.to_string(),
            "IfStatement(VariableExpr(x)) Then\n  WriteStatement(NumberExpr(1));\nEnd\nElse\n  WriteStatement(NumberExpr(0));\nEnd\n"
        );
    }
}
