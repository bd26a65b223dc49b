//! Lexer for the tinylang language.
//!
//! Uses the `logos` crate for efficient tokenization.

use std::fmt;

use logos::Logos;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::span::{Position, Span};

/// Lexical error categories surfaced by the logos machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
    UnterminatedComment,
}

/// Consume a `{ ... }` comment. Comments do not nest.
fn lex_comment(lex: &mut logos::Lexer<'_, TokenKind>) -> Result<(), LexErrorKind> {
    match lex.remainder().find('}') {
        Some(close) => {
            lex.bump(close + 1);
            Ok(())
        }
        None => {
            lex.bump(lex.remainder().len());
            Err(LexErrorKind::UnterminatedComment)
        }
    }
}

/// Consume a `"`-delimited string literal. May span newlines.
fn lex_string(lex: &mut logos::Lexer<'_, TokenKind>) -> Result<(), LexErrorKind> {
    match lex.remainder().find('"') {
        Some(close) => {
            lex.bump(close + 1);
            Ok(())
        }
        None => {
            lex.bump(lex.remainder().len());
            Err(LexErrorKind::UnterminatedString)
        }
    }
}

/// Token kinds for the tinylang language.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[logos(skip r"[ \t\r]+")]
#[logos(error = LexErrorKind)]
pub enum TokenKind {
    // Keywords
    #[token("if")]
    If,

    #[token("then")]
    Then,

    #[token("else")]
    Else,

    #[token("end")]
    End,

    #[token("repeat")]
    Repeat,

    #[token("until")]
    Until,

    #[token("write")]
    Write,

    #[token("read")]
    Read,

    // Operators
    #[token(":=")]
    Assign,

    #[token("=")]
    Equal,

    #[token("!=")]
    NotEqual,

    #[token("<=")]
    LessEqual,

    #[token("<")]
    Less,

    #[token(">=")]
    GreaterEqual,

    #[token(">")]
    Greater,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    // Punctuation
    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    // Newline (line accounting happens in the wrapper, then the token is dropped)
    #[regex(r"\n")]
    Newline,

    // Comments `{ ... }` (consumed by callback, dropped by the wrapper)
    #[token("{", lex_comment)]
    Comment,

    // String literals
    #[token("\"", lex_string)]
    Literal,

    // Number literals (integer only; unary minus belongs to the grammar)
    #[regex(r"[0-9]+")]
    Number,

    // Identifiers
    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*")]
    Identifier,

    // End of input
    Eof,
}

impl TokenKind {
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Comment)
    }

    /// Screaming-case name used in the displayable token form.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::If => "IF",
            TokenKind::Then => "THEN",
            TokenKind::Else => "ELSE",
            TokenKind::End => "END",
            TokenKind::Repeat => "REPEAT",
            TokenKind::Until => "UNTIL",
            TokenKind::Write => "WRITE",
            TokenKind::Read => "READ",
            TokenKind::Assign => "ASSIGNMENT",
            TokenKind::Equal => "EQUAL",
            TokenKind::NotEqual => "NOT_EQUAL",
            TokenKind::LessEqual => "LESS_EQUAL",
            TokenKind::Less => "LESS_THAN",
            TokenKind::GreaterEqual => "GREATER_EQUAL",
            TokenKind::Greater => "GREATER_THAN",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "MULTIPLY",
            TokenKind::Slash => "DIVIDE",
            TokenKind::LeftParen => "LEFT_PARENTHESIS",
            TokenKind::RightParen => "RIGHT_PARENTHESIS",
            TokenKind::Semicolon => "SEMI_COLON",
            TokenKind::Comma => "COMMA",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Comment => "COMMENT",
            TokenKind::Literal => "LITERAL",
            TokenKind::Number => "NUMBER",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Eof => "ENDOFFILE",
        }
    }
}

/// A token with its kind, text, and source span.
///
/// For string literals `text` is the unquoted content; for everything else
/// it is the exact source slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({}, \"{}\", {}:{} - {}:{})",
            self.kind.name(),
            self.text,
            self.span.start.line,
            self.span.start.column,
            self.span.end.line,
            self.span.end.column
        )
    }
}

/// Lexer for the tinylang language.
///
/// Wraps the logos machinery with line/column accounting and error
/// recovery: lexical problems are accumulated as diagnostics and scanning
/// continues, so the stream always terminates with an `Eof` token.
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, TokenKind>,
    current_line: usize,
    line_start_offset: usize,
    diagnostics: Diagnostics,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: TokenKind::lexer(source),
            current_line: 1,
            line_start_offset: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Whether the raw scan position has consumed the whole source.
    ///
    /// `next_token` keeps returning `Eof` tokens once this is true.
    pub fn is_at_end(&self) -> bool {
        self.inner.remainder().is_empty()
    }

    /// Diagnostics accumulated so far (lexical errors and warnings).
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Drain the accumulated diagnostics.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    fn position_at(&self, offset: usize) -> Position {
        Position::new(
            self.current_line,
            offset - self.line_start_offset + 1,
            offset,
        )
    }

    /// Update line accounting for a consumed slice (tokens may span lines).
    fn track_newlines(&mut self, text: &str, start_offset: usize) {
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                self.current_line += 1;
                self.line_start_offset = start_offset + i + 1;
            }
        }
    }

    fn eof_token(&self) -> Token {
        let pos = self.position_at(self.source.len());
        Token::new(TokenKind::Eof, "", Span::new(pos, pos))
    }

    /// Get the next token, recovering from lexical errors.
    pub fn next_token(&mut self) -> Token {
        loop {
            match self.inner.next() {
                Some(Ok(kind)) => {
                    let range = self.inner.span();
                    let text = self.inner.slice();
                    let start = self.position_at(range.start);
                    let owned = text.to_string();
                    self.track_newlines(&owned, range.start);
                    let span = Span::new(start, self.position_at(range.end));

                    match kind {
                        kind if kind.is_trivia() => continue,
                        TokenKind::Literal => {
                            // Strip the delimiters; the lexeme is the content.
                            let value = owned[1..owned.len() - 1].to_string();
                            return Token::new(TokenKind::Literal, value, span);
                        }
                        _ => return Token::new(kind, owned, span),
                    }
                }
                Some(Err(error)) => {
                    let range = self.inner.span();
                    let text = self.inner.slice().to_string();
                    let start = self.position_at(range.start);
                    self.track_newlines(&text, range.start);
                    let span = Span::new(start, self.position_at(range.end));

                    match error {
                        LexErrorKind::UnexpectedCharacter => {
                            self.diagnostics.push(
                                Diagnostic::error(
                                    "L001",
                                    format!("Unexpected character: '{}'", text),
                                )
                                .with_span(span)
                                .build(),
                            );
                            continue;
                        }
                        LexErrorKind::UnterminatedString => {
                            self.diagnostics.push(
                                Diagnostic::error("L002", "Unterminated string literal.")
                                    .with_span(span)
                                    .build(),
                            );
                            return self.eof_token();
                        }
                        LexErrorKind::UnterminatedComment => {
                            self.diagnostics.push(
                                Diagnostic::warning("L003", "Unterminated comment")
                                    .with_span(span)
                                    .build(),
                            );
                            continue;
                        }
                    }
                }
                None => return self.eof_token(),
            }
        }
    }

    /// Tokenize the entire source. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn arithmetic_expression_token_stream() {
        assert_eq!(
            kinds("1+2*3"),
            vec![
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::Star,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn token_display_form() {
        let mut lexer = Lexer::new("1+2*3");
        let first = lexer.next_token();
        assert_eq!(first.to_string(), "Token(NUMBER, \"1\", 1:1 - 1:2)");
        let second = lexer.next_token();
        assert_eq!(second.to_string(), "Token(PLUS, \"+\", 1:2 - 1:3)");
    }

    #[test]
    fn keywords_are_reserved() {
        assert_eq!(
            kinds("if then else end repeat until write read"),
            vec![
                TokenKind::If,
                TokenKind::Then,
                TokenKind::Else,
                TokenKind::End,
                TokenKind::Repeat,
                TokenKind::Until,
                TokenKind::Write,
                TokenKind::Read,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_still_an_identifier() {
        let tokens = Lexer::new("iffy repeated x_1").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "iffy");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].text, "x_1");
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("<= < >= > != := ="),
            vec![
                TokenKind::LessEqual,
                TokenKind::Less,
                TokenKind::GreaterEqual,
                TokenKind::Greater,
                TokenKind::NotEqual,
                TokenKind::Assign,
                TokenKind::Equal,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literal_text_is_unquoted() {
        let tokens = Lexer::new("write \"input an integer: \";").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Literal);
        assert_eq!(tokens[1].text, "input an integer: ");
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("x { this is a comment } := 1;"),
            vec![
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_comment_warns_and_reaches_eof() {
        let mut lexer = Lexer::new("x := 1; { no close");
        let tokens = lexer.tokenize();
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
        assert!(!lexer.diagnostics().has_errors());
        assert_eq!(lexer.diagnostics().warnings().count(), 1);
    }

    #[test]
    fn unterminated_string_reports_error_and_returns_eof() {
        let mut lexer = Lexer::new("write \"no close");
        let write = lexer.next_token();
        assert_eq!(write.kind, TokenKind::Write);
        let next = lexer.next_token();
        assert_eq!(next.kind, TokenKind::Eof);
        assert!(lexer.diagnostics().has_errors());
    }

    #[test]
    fn bare_bang_is_reported_and_scanning_recovers() {
        let mut lexer = Lexer::new("! x");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.text, "x");
        let errors: Vec<_> = lexer.diagnostics().errors().cloned().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Unexpected character"));
    }

    #[test]
    fn bare_colon_is_reported_and_scanning_recovers() {
        let mut lexer = Lexer::new("x : = 1");
        let tokens = lexer.tokenize();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
        assert!(lexer.diagnostics().has_errors());
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let source = "x := 1;\nwrite x;";
        let tokens = Lexer::new(source).tokenize();
        let write = tokens.iter().find(|t| t.kind == TokenKind::Write).unwrap();
        assert_eq!(write.span.start.line, 2);
        assert_eq!(write.span.start.column, 1);
        assert_eq!(write.span.end.column, 6);
    }

    #[test]
    fn start_positions_are_non_decreasing() {
        let source = "x := 1;\nrepeat\n  x := x - 1;\nuntil x = 0;\n";
        let tokens = Lexer::new(source).tokenize();
        for pair in tokens.windows(2) {
            assert!(pair[0].span.start <= pair[1].span.start);
        }
    }

    #[test]
    fn is_at_end_tracks_scan_position() {
        let mut lexer = Lexer::new("x");
        assert!(!lexer.is_at_end());
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Identifier);
        assert!(lexer.is_at_end());
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}
