//! Parser for the tinylang language.
//!
//! Recursive descent with panic-mode recovery: a malformed statement is
//! recorded as a diagnostic, the token stream is resynchronized at the
//! next statement boundary, and parsing continues, so one pass reports
//! every syntax error in the source.

use crate::ast::{Expression, Statement};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::lexer::{Lexer, Token, TokenKind};

/// Parser for the tinylang language.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Diagnostics,
}

impl Parser {
    /// Tokenize the source and set up for parsing. Lexical diagnostics are
    /// folded into the parser's collection.
    pub fn new(source: &str) -> Self {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        let diagnostics = lexer.take_diagnostics();

        Self {
            tokens,
            pos: 0,
            diagnostics,
        }
    }

    /// Parse the entire program: the ordered list of top-level statements
    /// plus every diagnostic accumulated along the way.
    pub fn parse(mut self) -> (Vec<Statement>, Diagnostics) {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.statement() {
                statements.push(statement);
            }
        }
        if let Err(diagnostic) = self.expect(TokenKind::Eof, "Expect end of file.") {
            self.diagnostics.push(diagnostic);
        }
        (statements, self.diagnostics)
    }

    /// Parse one statement; on a syntax error, record it, resynchronize,
    /// and yield nothing so the enclosing loop can continue.
    fn statement(&mut self) -> Option<Statement> {
        match self.parse_statement() {
            Ok(statement) => Some(statement),
            Err(diagnostic) => {
                self.diagnostics.push(diagnostic);
                self.synchronize();
                None
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, Diagnostic> {
        match self.current().kind {
            TokenKind::Identifier => self.assignment(),
            TokenKind::If => self.if_statement(),
            TokenKind::Repeat => self.repeat_statement(),
            TokenKind::Write => self.write_statement(),
            TokenKind::Read => self.read_statement(),
            _ => Err(self.syntax_error("Unexpected token.")),
        }
    }

    fn assignment(&mut self) -> Result<Statement, Diagnostic> {
        let target = self.expect(TokenKind::Identifier, "Expect identifier.")?;
        self.expect(TokenKind::Assign, "Expect ':=' after identifier.")?;
        let value = self.expression()?;
        self.expect(TokenKind::Semicolon, "Expect ';' after statement.")?;
        Ok(Statement::Assignment { target, value })
    }

    fn if_statement(&mut self) -> Result<Statement, Diagnostic> {
        self.expect(TokenKind::If, "Expect 'if' keyword.")?;
        let condition = self.expression()?;
        self.expect(TokenKind::Then, "Expect 'then' keyword.")?;

        // The then-branch stops at 'end', 'else', or end of input, so an
        // 'if' cannot swallow an unrelated 'end'.
        let mut then_branch = Vec::new();
        while !self.check(TokenKind::End) && !self.check(TokenKind::Else) && !self.is_at_end() {
            if let Some(statement) = self.statement() {
                then_branch.push(statement);
            }
        }

        let mut else_branch = Vec::new();
        if self.check(TokenKind::Else) {
            self.advance();
            while !self.check(TokenKind::End) && !self.is_at_end() {
                if let Some(statement) = self.statement() {
                    else_branch.push(statement);
                }
            }
        }

        self.expect(TokenKind::End, "Expect 'end' keyword.")?;
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn repeat_statement(&mut self) -> Result<Statement, Diagnostic> {
        self.expect(TokenKind::Repeat, "Expect 'repeat' keyword.")?;

        let mut body = Vec::new();
        while !self.check(TokenKind::Until) && !self.is_at_end() {
            if let Some(statement) = self.statement() {
                body.push(statement);
            }
        }

        self.expect(TokenKind::Until, "Expect 'until' keyword.")?;
        let condition = self.expression()?;
        self.expect(TokenKind::Semicolon, "Expect ';' after statement.")?;
        Ok(Statement::Repeat { body, condition })
    }

    fn write_statement(&mut self) -> Result<Statement, Diagnostic> {
        self.expect(TokenKind::Write, "Expect 'write' keyword.")?;
        let mut operands = vec![self.expression()?];
        while self.check(TokenKind::Comma) {
            self.advance();
            operands.push(self.expression()?);
        }
        self.expect(TokenKind::Semicolon, "Expect ';' after statement.")?;
        Ok(Statement::Write { operands })
    }

    fn read_statement(&mut self) -> Result<Statement, Diagnostic> {
        self.expect(TokenKind::Read, "Expect 'read' keyword.")?;
        let mut targets = vec![self.expect(TokenKind::Identifier, "Expect identifier.")?];
        while self.check(TokenKind::Comma) {
            self.advance();
            targets.push(self.expect(TokenKind::Identifier, "Expect identifier.")?);
        }
        self.expect(TokenKind::Semicolon, "Expect ';' after statement.")?;
        Ok(Statement::Read { targets })
    }

    // Expression grammar, ascending precedence, all levels left-associative.

    fn expression(&mut self) -> Result<Expression, Diagnostic> {
        self.equality()
    }

    fn equality(&mut self) -> Result<Expression, Diagnostic> {
        let mut left = self.comparison()?;
        while self.check(TokenKind::Equal) || self.check(TokenKind::NotEqual) {
            let operator = self.advance();
            let right = self.comparison()?;
            left = Expression::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expression, Diagnostic> {
        let mut left = self.term()?;
        while matches!(
            self.current().kind,
            TokenKind::Less | TokenKind::Greater | TokenKind::LessEqual | TokenKind::GreaterEqual
        ) {
            let operator = self.advance();
            let right = self.term()?;
            left = Expression::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expression, Diagnostic> {
        let mut left = self.factor()?;
        while matches!(self.current().kind, TokenKind::Plus | TokenKind::Minus) {
            let operator = self.advance();
            let right = self.factor()?;
            left = Expression::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expression, Diagnostic> {
        let mut left = self.primary()?;
        while matches!(self.current().kind, TokenKind::Star | TokenKind::Slash) {
            let operator = self.advance();
            let right = self.primary()?;
            left = Expression::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expression, Diagnostic> {
        match self.current().kind {
            TokenKind::Number => Ok(Expression::Number(self.advance())),
            TokenKind::Literal => Ok(Expression::String(self.advance())),
            TokenKind::Identifier => Ok(Expression::Variable(self.advance())),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(TokenKind::RightParen, "Expect ')' after expression.")?;
                Ok(Expression::Grouping {
                    inner: Box::new(inner),
                })
            }
            _ => Err(self.syntax_error("Expect expression.")),
        }
    }

    // Helper methods

    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or(&self.tokens[self.tokens.len() - 1])
    }

    fn previous(&self) -> &Token {
        if self.pos > 0 {
            &self.tokens[self.pos - 1]
        } else {
            self.current()
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.pos += 1;
            self.tokens[self.pos - 1].clone()
        } else {
            self.current().clone()
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.syntax_error(message))
        }
    }

    fn syntax_error(&self, message: &str) -> Diagnostic {
        let token = self.current();
        Diagnostic::error(
            "E001",
            format!("Syntax error: {} Found: {}", message, token),
        )
        .with_span(token.span)
        .build()
    }

    fn starts_statement(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::If
                | TokenKind::Repeat
                | TokenKind::Write
                | TokenKind::Read
                | TokenKind::Identifier
        )
    }

    fn at_block_boundary(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::End | TokenKind::Else | TokenKind::Until | TokenKind::Then
        )
    }

    /// Panic-mode recovery: discard tokens until a statement boundary.
    ///
    /// If the current token can already begin a statement, nothing is
    /// discarded. Otherwise tokens are consumed until a statement
    /// terminator was just passed, a statement start or block boundary
    /// comes up, or the input ends.
    fn synchronize(&mut self) {
        if Self::starts_statement(self.current().kind) {
            return;
        }
        while !self.is_at_end() {
            self.advance();
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            let kind = self.current().kind;
            if Self::starts_statement(kind) || Self::at_block_boundary(kind) {
                return;
            }
        }
    }
}
