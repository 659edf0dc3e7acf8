//! The `lex → parse → resolve → evaluate` pipeline and the two sticky error
//! flags that decide the process exit code, mirroring `golox`'s `lox`
//! struct (`examples/original_source/lox/lox.go`): `hadError` for any
//! lex/parse/resolve failure, `hadRuntimeError` for an evaluation failure.
//! A REPL clears both between prompts (spec.md §6) so one bad line doesn't
//! poison the rest of the session.

use crate::interpreter::Interpreter;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::resolver::Resolver;

pub struct Lox {
    had_error: bool,
    had_runtime_error: bool,
}

impl Lox {
    pub fn new() -> Self {
        Self {
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Clears both sticky flags, used by the REPL between prompts.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Runs one complete source unit end to end. Diagnostics are printed to
    /// stderr as they're produced; the caller inspects `had_error`/
    /// `had_runtime_error` afterwards to decide the exit code (spec.md §6).
    pub fn run(&mut self, source: &str) {
        let (tokens, lex_errors) = Lexer::new(source).scan_tokens();
        for err in &lex_errors {
            eprintln!("{err}");
        }
        if !lex_errors.is_empty() {
            self.had_error = true;
        }

        let (statements, parse_errors) = Parser::new(tokens).parse();
        for err in &parse_errors {
            eprintln!("{err}");
        }
        if !parse_errors.is_empty() {
            self.had_error = true;
        }

        if self.had_error {
            return;
        }

        let (locals, resolve_errors) = Resolver::new().resolve(&statements);
        for err in &resolve_errors {
            eprintln!("{err}");
        }
        if !resolve_errors.is_empty() {
            self.had_error = true;
            return;
        }

        if let Err(err) = Interpreter::new(locals).interpret(&statements) {
            eprintln!("{err}");
            self.had_runtime_error = true;
        }
    }
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_program_sets_no_flags() {
        let mut lox = Lox::new();
        lox.run("print 1 + 1;");
        assert!(!lox.had_error());
        assert!(!lox.had_runtime_error());
    }

    #[test]
    fn syntax_error_sets_had_error_only() {
        let mut lox = Lox::new();
        lox.run("var a = ;");
        assert!(lox.had_error());
        assert!(!lox.had_runtime_error());
    }

    #[test]
    fn runtime_error_sets_had_runtime_error_only() {
        let mut lox = Lox::new();
        lox.run("print 1 + nil;");
        assert!(!lox.had_error());
        assert!(lox.had_runtime_error());
    }

    #[test]
    fn reset_clears_both_flags() {
        let mut lox = Lox::new();
        lox.run("var a = ;");
        assert!(lox.had_error());
        lox.reset();
        assert!(!lox.had_error());
        assert!(!lox.had_runtime_error());
    }
}
