//! Interpreter for the tinylang language.
//!
//! A single synchronous recursive walk over the parsed statement list.
//! The interpreter exclusively owns the symbol registry and the two I/O
//! channels for the duration of one `interpret` call; the first runtime
//! error aborts the remaining statements and propagates to the caller.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::ast::{Expression, Statement};
use crate::lexer::{Token, TokenKind};
use crate::span::Span;

/// Integer form accepted by `read`: optional sign, digits, nothing else.
fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?[0-9]+$").expect("hard-coded pattern compiles"))
}

/// A runtime failure. All variants abort the current `interpret` call.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Division by zero at operator '{operator}' at line {}, column {}", .span.start.line, .span.start.column)]
    DivisionByZero { operator: String, span: Span },

    #[error("Invalid literal type for evaluation: \"{lexeme}\" at line {}, column {}", .span.start.line, .span.start.column)]
    StringOperand { lexeme: String, span: Span },

    #[error("Undefined variable: '{name}' at line {}, column {}", .span.start.line, .span.start.column)]
    UndefinedVariable { name: String, span: Span },

    #[error("Invalid input for variable '{name}': {input} at line {}, column {}", .span.start.line, .span.start.column)]
    InvalidInput {
        name: String,
        input: String,
        span: Span,
    },

    #[error("Invalid numeric literal '{lexeme}' at line {}, column {}", .span.start.line, .span.start.column)]
    InvalidNumber { lexeme: String, span: Span },

    #[error("Unknown operator '{operator}' at line {}, column {}", .span.start.line, .span.start.column)]
    UnknownOperator { operator: String, span: Span },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Flat mutable mapping from variable name to numeric value.
///
/// No declarations: assignment or `read` creates the entry; looking up an
/// unset name yields `None` (an undefined-variable error at evaluation).
#[derive(Debug, Default, Clone)]
pub struct SymbolRegistry {
    table: HashMap<String, f64>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.table.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.table.get(name).copied()
    }
}

/// The tinylang interpreter.
pub struct Interpreter<R, W> {
    symbols: SymbolRegistry,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Interpreter<R, W> {
    /// Create an interpreter with a fresh registry over the given channels.
    pub fn new(input: R, output: W) -> Self {
        Self {
            symbols: SymbolRegistry::new(),
            input,
            output,
        }
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.symbols
    }

    pub fn registry_mut(&mut self) -> &mut SymbolRegistry {
        &mut self.symbols
    }

    /// Execute the statements in program order, stopping at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Statement]) -> Result<(), RuntimeError> {
        for statement in statements {
            self.execute(statement)?;
        }
        Ok(())
    }

    fn execute(&mut self, statement: &Statement) -> Result<(), RuntimeError> {
        match statement {
            Statement::Assignment { target, value } => {
                let value = self.evaluate(value)?;
                self.symbols.set(target.text.clone(), value);
                Ok(())
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)? != 0.0 {
                    self.interpret(then_branch)
                } else {
                    self.interpret(else_branch)
                }
            }
            Statement::Repeat { body, condition } => loop {
                self.interpret(body)?;
                if self.evaluate(condition)? != 0.0 {
                    return Ok(());
                }
            },
            Statement::Write { operands } => {
                for operand in operands {
                    match operand {
                        // String literals are legal only here; they emit
                        // their raw text instead of evaluating.
                        Expression::String(token) => {
                            write!(self.output, "{}", token.text)?;
                        }
                        other => {
                            let value = self.evaluate(other)?;
                            write!(self.output, "{}", value)?;
                        }
                    }
                }
                writeln!(self.output)?;
                Ok(())
            }
            Statement::Read { targets } => {
                for target in targets {
                    let word = self.next_input_token()?;
                    if !integer_pattern().is_match(&word) {
                        return Err(RuntimeError::InvalidInput {
                            name: target.text.clone(),
                            input: word,
                            span: target.span,
                        });
                    }
                    let value = match word.parse::<f64>() {
                        Ok(value) => value,
                        Err(_) => {
                            return Err(RuntimeError::InvalidInput {
                                name: target.text.clone(),
                                input: word,
                                span: target.span,
                            })
                        }
                    };
                    self.symbols.set(target.text.clone(), value);
                }
                Ok(())
            }
        }
    }

    fn evaluate(&self, expression: &Expression) -> Result<f64, RuntimeError> {
        match expression {
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;
                let right_value = self.evaluate(right)?;
                apply_operator(operator, left_value, right_value)
            }
            Expression::Grouping { inner } => self.evaluate(inner),
            Expression::Number(token) => {
                token.text.parse().map_err(|_| RuntimeError::InvalidNumber {
                    lexeme: token.text.clone(),
                    span: token.span,
                })
            }
            Expression::String(token) => Err(RuntimeError::StringOperand {
                lexeme: token.text.clone(),
                span: token.span,
            }),
            Expression::Variable(token) => {
                self.symbols
                    .get(&token.text)
                    .ok_or_else(|| RuntimeError::UndefinedVariable {
                        name: token.text.clone(),
                        span: token.span,
                    })
            }
        }
    }

    /// Read one whitespace-delimited token from the input channel. Returns
    /// an empty string when the input is exhausted.
    fn next_input_token(&mut self) -> Result<String, std::io::Error> {
        let mut word = String::new();
        loop {
            let buffer = self.input.fill_buf()?;
            if buffer.is_empty() {
                break;
            }
            let mut used = 0;
            let mut done = false;
            for &byte in buffer {
                if byte.is_ascii_whitespace() {
                    if word.is_empty() {
                        used += 1;
                        continue;
                    }
                    done = true;
                    break;
                }
                word.push(byte as char);
                used += 1;
            }
            self.input.consume(used);
            if done {
                break;
            }
        }
        Ok(word)
    }
}

fn bool_value(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn apply_operator(operator: &Token, left: f64, right: f64) -> Result<f64, RuntimeError> {
    match operator.kind {
        TokenKind::Slash if right == 0.0 => Err(RuntimeError::DivisionByZero {
            operator: operator.text.clone(),
            span: operator.span,
        }),
        TokenKind::Plus => Ok(left + right),
        TokenKind::Minus => Ok(left - right),
        TokenKind::Star => Ok(left * right),
        TokenKind::Slash => Ok(left / right),
        TokenKind::Less => Ok(bool_value(left < right)),
        TokenKind::LessEqual => Ok(bool_value(left <= right)),
        TokenKind::Greater => Ok(bool_value(left > right)),
        TokenKind::GreaterEqual => Ok(bool_value(left >= right)),
        TokenKind::Equal => Ok(bool_value(left == right)),
        TokenKind::NotEqual => Ok(bool_value(left != right)),
        // Unreachable given the grammar; surfaced rather than swallowed.
        _ => Err(RuntimeError::UnknownOperator {
            operator: operator.text.clone(),
            span: operator.span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse(source: &str) -> Vec<Statement> {
        let (statements, diagnostics) = Parser::new(source).parse();
        assert!(
            !diagnostics.has_errors(),
            "unexpected diagnostics: {:?}",
            diagnostics
        );
        statements
    }

    fn run(source: &str, input: &str) -> (SymbolRegistry, String) {
        let statements = parse(source);
        let mut reader = input.as_bytes();
        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut reader, &mut output);
        interpreter.interpret(&statements).expect("program runs");
        let registry = interpreter.registry().clone();
        drop(interpreter);
        (registry, String::from_utf8(output).expect("valid utf-8"))
    }

    fn run_err(source: &str, input: &str) -> (RuntimeError, String) {
        let statements = parse(source);
        let mut reader = input.as_bytes();
        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut reader, &mut output);
        let error = interpreter
            .interpret(&statements)
            .expect_err("program should fail");
        drop(interpreter);
        (error, String::from_utf8(output).expect("valid utf-8"))
    }

    #[test]
    fn precedence_multiply_before_add() {
        let (registry, _) = run("x := 1 + 2 * 3;", "");
        assert_eq!(registry.get("x"), Some(7.0));
    }

    #[test]
    fn prompt_then_read_then_echo() {
        let source = "write \"input an integer: \";\nread x;\nwrite x;";
        let (registry, output) = run(source, "2");
        assert_eq!(registry.get("x"), Some(2.0));
        assert_eq!(output, "input an integer: \n2\n");
    }

    #[test]
    fn repeat_runs_body_exactly_until_condition_holds() {
        let source = "repeat x := x - 1; c := c + 1; until x = 0;";
        let statements = parse(source);
        let mut reader = "".as_bytes();
        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut reader, &mut output);
        interpreter.registry_mut().set("x", 3.0);
        interpreter.registry_mut().set("c", 0.0);
        interpreter.interpret(&statements).expect("program runs");
        assert_eq!(interpreter.registry().get("x"), Some(0.0));
        assert_eq!(interpreter.registry().get("c"), Some(3.0));
    }

    #[test]
    fn repeat_runs_body_at_least_once() {
        let (registry, _) = run("repeat y := 1; until 1 = 1;", "");
        assert_eq!(registry.get("y"), Some(1.0));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let (error, _) = run_err("x := 1 / 0;", "");
        assert!(matches!(error, RuntimeError::DivisionByZero { .. }));
        assert!(error.to_string().contains("Division by zero"));
    }

    #[test]
    fn division_by_nonzero_variable_succeeds() {
        let (registry, _) = run("a := 8; b := 2; x := a / b;", "");
        assert_eq!(registry.get("x"), Some(4.0));
    }

    #[test]
    fn undefined_variable_names_the_variable() {
        let (error, _) = run_err("write y;", "");
        match &error {
            RuntimeError::UndefinedVariable { name, .. } => assert_eq!(name, "y"),
            other => panic!("expected undefined variable, got {:?}", other),
        }
        assert!(error.to_string().contains("'y'"));
    }

    #[test]
    fn read_rejects_non_integer_input() {
        let (error, _) = run_err("read x;", "abc");
        match error {
            RuntimeError::InvalidInput { name, input, .. } => {
                assert_eq!(name, "x");
                assert_eq!(input, "abc");
            }
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn read_rejects_exhausted_input() {
        let (error, _) = run_err("read x;", "");
        assert!(matches!(error, RuntimeError::InvalidInput { .. }));
    }

    #[test]
    fn read_accepts_signed_integers() {
        let (registry, _) = run("read x;", "-5");
        assert_eq!(registry.get("x"), Some(-5.0));
    }

    #[test]
    fn read_fills_targets_in_input_order() {
        let (registry, _) = run("read a, b;", "1 2");
        assert_eq!(registry.get("a"), Some(1.0));
        assert_eq!(registry.get("b"), Some(2.0));
    }

    #[test]
    fn relational_operators_yield_one_or_zero() {
        let source = "t := 1 < 2; f := 2 < 1; e := 3 = 3; n := 3 != 3;";
        let (registry, _) = run(source, "");
        assert_eq!(registry.get("t"), Some(1.0));
        assert_eq!(registry.get("f"), Some(0.0));
        assert_eq!(registry.get("e"), Some(1.0));
        assert_eq!(registry.get("n"), Some(0.0));
    }

    #[test]
    fn string_literal_cannot_be_evaluated() {
        let (error, _) = run_err("x := \"hi\";", "");
        assert!(matches!(error, RuntimeError::StringOperand { .. }));
    }

    #[test]
    fn if_takes_the_else_branch_on_zero() {
        let (_, output) = run("if 0 then write 1; else write 0; end", "");
        assert_eq!(output, "0\n");
    }

    #[test]
    fn if_takes_the_then_branch_on_nonzero() {
        let (_, output) = run("if 5 then write 1; end", "");
        assert_eq!(output, "1\n");
    }

    #[test]
    fn write_concatenates_operands_with_one_newline() {
        let (_, output) = run("write \"x = \", 1 + 1;", "");
        assert_eq!(output, "x = 2\n");
    }

    #[test]
    fn write_formats_numbers_without_trailing_zeros() {
        let (_, output) = run("write 7; write 5 / 2;", "");
        assert_eq!(output, "7\n2.5\n");
    }

    #[test]
    fn runtime_error_aborts_remaining_statements() {
        let (error, output) = run_err("write 1; x := 1 / 0; write 2;", "");
        assert!(matches!(error, RuntimeError::DivisionByZero { .. }));
        assert_eq!(output, "1\n");
    }
}
