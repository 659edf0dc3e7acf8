//! Source text → token stream.
//!
//! Structured the way the teacher's own hand-written scanning experiments
//! did it (`crates/why_lib/src/lexer/mod.rs`): a cursor over the source
//! bytes tracking `line`, with one `scan_*` helper per lexical class, plus
//! a static keyword table built once via `once_cell`.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::LexError;
use crate::token::{Literal, Token, TokenKind};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind::*;
    HashMap::from([
        ("and", And),
        ("class", Class),
        ("else", Else),
        ("false", False),
        ("for", For),
        ("fun", Fun),
        ("if", If),
        ("nil", Nil),
        ("or", Or),
        ("print", Print),
        ("return", Return),
        ("super", Super),
        ("this", This),
        ("true", True),
        ("var", Var),
        ("while", While),
    ])
});

/// Scans a complete source string into tokens. Lexical errors are collected
/// but never stop the scan — the lexer always terminates in a single `EOF`.
pub struct Lexer<'a> {
    source: &'a [u8],
    tokens: Vec<Token>,
    errors: Vec<LexError>,
    start: usize,
    current: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scans the whole source, returning the tokens and any lexical errors
    /// collected along the way. The token stream is always present, even
    /// with errors, so the parser can attempt panic-mode recovery on it.
    pub fn scan_tokens(mut self) -> (Vec<Token>, Vec<LexError>) {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens.push(Token::eof(self.line));
        log::debug!("lexed {} tokens ({} errors)", self.tokens.len(), self.errors.len());
        (self.tokens, self.errors)
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        use TokenKind::*;
        match c {
            b'(' => self.add_token(LeftParen),
            b')' => self.add_token(RightParen),
            b'{' => self.add_token(LeftBrace),
            b'}' => self.add_token(RightBrace),
            b',' => self.add_token(Comma),
            b'.' => self.add_token(Dot),
            b'-' => self.add_token(Minus),
            b'+' => self.add_token(Plus),
            b';' => self.add_token(Semicolon),
            b'*' => self.add_token(Star),
            b'!' => {
                let kind = if self.match_char(b'=') { BangEqual } else { Bang };
                self.add_token(kind);
            }
            b'=' => {
                let kind = if self.match_char(b'=') { EqualEqual } else { Equal };
                self.add_token(kind);
            }
            b'<' => {
                let kind = if self.match_char(b'=') { LessEqual } else { Less };
                self.add_token(kind);
            }
            b'>' => {
                let kind = if self.match_char(b'=') { GreaterEqual } else { Greater };
                self.add_token(kind);
            }
            b'/' => {
                if self.match_char(b'/') {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(Slash);
                }
            }
            b' ' | b'\r' | b'\t' => {}
            b'\n' => self.line += 1,
            b'"' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if is_alpha(c) => self.scan_identifier(),
            _ => self.error("Unexpected character."),
        }
    }

    fn scan_string(&mut self) {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.error("Unterminated string.");
            return;
        }

        self.advance(); // the closing quote
        let value = self.slice(self.start + 1, self.current - 1);
        self.add_token_literal(TokenKind::String, Some(Literal::String(value)));
    }

    fn scan_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // the '.'
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.slice(self.start, self.current);
        let value: f64 = text.parse().expect("scanned number literal must parse");
        self.add_token_literal(TokenKind::Number, Some(Literal::Number(value)));
    }

    fn scan_identifier(&mut self) {
        while is_alphanumeric(self.peek()) {
            self.advance();
        }

        let text = self.slice(self.start, self.current);
        let kind = KEYWORDS.get(text.as_str()).copied().unwrap_or(TokenKind::Identifier);
        self.add_token(kind);
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_token_literal(kind, None);
    }

    fn add_token_literal(&mut self, kind: TokenKind, literal: Option<Literal>) {
        let lexeme = self.slice(self.start, self.current);
        self.tokens.push(Token::new(kind, lexeme, literal, self.line));
    }

    fn error(&mut self, message: &str) {
        self.errors.push(LexError {
            line: self.line,
            message: message.to_string(),
        });
    }

    fn slice(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.source[start..end]).into_owned()
    }

    fn advance(&mut self) -> u8 {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn match_char(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.source.len() {
            0
        } else {
            self.source[self.current + 1]
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

fn is_alpha(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphabetic()
}

fn is_alphanumeric(c: u8) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(source).scan_tokens();
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_punctuation_and_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("(){};,+-*!===<=>=!=<>/."),
            vec![
                LeftParen, RightParen, LeftBrace, RightBrace, Semicolon, Comma, Plus, Minus, Star,
                BangEqual, EqualEqual, LessEqual, GreaterEqual, BangEqual, Less, Greater, Slash,
                Dot, Eof,
            ]
        );
    }

    #[test]
    fn scans_string_literal_with_embedded_newline() {
        let (tokens, errors) = Lexer::new("\"a\nb\" 1").scan_tokens();
        assert!(errors.is_empty());
        assert_eq!(tokens[0].literal, Some(Literal::String("a\nb".to_string())));
        // the NUMBER token should be on line 2
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn reports_unterminated_string() {
        let (_, errors) = Lexer::new("\"abc").scan_tokens();
        assert_eq!(errors[0].message, "Unterminated string.");
    }

    #[test]
    fn number_requires_trailing_digit_after_dot() {
        let (tokens, _) = Lexer::new("123.").scan_tokens();
        assert_eq!(tokens[0].literal, Some(Literal::Number(123.0)));
        assert_eq!(tokens[1].kind, TokenKind::Dot);
    }

    #[test]
    fn keywords_and_identifiers() {
        let (tokens, _) = Lexer::new("fun orchid").scan_tokens();
        assert_eq!(tokens[0].kind, TokenKind::Fun);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn reports_unexpected_character_and_continues() {
        let (tokens, errors) = Lexer::new("@ 1").scan_tokens();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unexpected character.");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }
}
