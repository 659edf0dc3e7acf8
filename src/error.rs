//! Stage-specific diagnostics.
//!
//! Each stage of the pipeline (lex, parse, resolve, evaluate) reports through
//! its own small error type rather than a shared one — the same split the
//! driver (`crate::driver::Lox`) uses to decide between exit code 65 and 70.
//! Rendering follows spec.md §6 exactly since the format is an external
//! contract, not a logging concern.

use std::fmt::Display;

use crate::token::{Token, TokenKind};

/// A lexical error: scanning continues after this is reported.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}] Error: {}", self.line, self.message)
    }
}

impl std::error::Error for LexError {}

/// A syntax error anchored to the offending token.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}] Error{}: {}", self.token.line, where_clause(&self.token), self.message)
    }
}

impl std::error::Error for ParseError {}

/// A static semantic error discovered by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveError {
    pub token: Token,
    pub message: String,
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}] Error{}: {}", self.token.line, where_clause(&self.token), self.message)
    }
}

impl std::error::Error for ResolveError {}

/// A runtime error: aborts the currently executing top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n[line {}]", self.message, self.token.line)
    }
}

impl std::error::Error for RuntimeError {}

/// Renders the `<where>` slot shared by parse and resolve diagnostics:
/// `" at end"` at EOF, `" at '<lexeme>'"` elsewhere.
fn where_clause(token: &Token) -> String {
    if token.kind == TokenKind::Eof {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}
