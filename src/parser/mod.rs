//! Token stream → AST.
//!
//! A straight recursive-descent parser following spec.md §4.2's grammar,
//! one method per precedence level. Errors are collected rather than
//! thrown across a callback boundary (spec.md: "the parser does not throw
//! across the callback boundary") — each `declaration()` iteration catches
//! its own `Result`, records the error, and resynchronizes, mirroring the
//! teacher's panic-mode parsers (`y-lang`'s abandoned `src/parser.rs`,
//! `why_lib`'s combinator parser) which likewise keep going after a bad
//! statement rather than aborting the whole parse.

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, LiteralValue, Stmt};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};
use std::rc::Rc;

const MAX_ARGS: usize = 255;

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: u32,
    pub errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            next_id: 0,
            errors: Vec::new(),
        }
    }

    /// Parses as many top-level declarations as possible. Parse errors are
    /// recorded on `self.errors`, not returned — the driver decides what to
    /// do with a partially-parsed program (spec.md §4.2).
    pub fn parse(mut self) -> (Vec<Stmt>, Vec<ParseError>) {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        log::debug!("parsed {} top-level statements ({} errors)", statements.len(), self.errors.len());
        (statements, self.errors)
    }

    fn mk(&mut self, kind: ExprKind) -> Expr {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        Expr { id, kind }
    }

    // ---- declarations -----------------------------------------------

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_token(&[TokenKind::Class]) {
            self.class_declaration()
        } else if self.match_token(&[TokenKind::Fun]) {
            self.function("function").map(Stmt::Function)
        } else if self.match_token(&[TokenKind::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(err) => {
                self.errors.push(err);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect class name.")?;

        let superclass = if self.match_token(&[TokenKind::Less]) {
            let super_name = self.consume(TokenKind::Identifier, "Expect superclass name.")?;
            Some(self.mk(ExprKind::Variable(super_name)))
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(Rc::new(self.function("method")?));
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class(name, superclass, methods))
    }

    fn function(&mut self, kind: &str) -> PResult<FunctionDecl> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name."))?;
        self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name."))?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;

        self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block()?;

        Ok(FunctionDecl { name, params, body })
    }

    fn var_declaration(&mut self) -> PResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;

        let initializer = if self.match_token(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var(name, initializer))
    }

    // ---- statements ---------------------------------------------------

    fn statement(&mut self) -> PResult<Stmt> {
        if self.match_token(&[TokenKind::For]) {
            return self.for_statement();
        }
        if self.match_token(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.match_token(&[TokenKind::Print]) {
            return self.print_statement();
        }
        if self.match_token(&[TokenKind::Return]) {
            return self.return_statement();
        }
        if self.match_token(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.match_token(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    /// Desugars to `{ init?; while (cond) { body; incr? } }` at parse time
    /// (spec.md §4.2) — there is no `For` AST node.
    fn for_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_token(&[TokenKind::Semicolon]) {
            None
        } else if self.match_token(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or_else(|| self.mk(ExprKind::Literal(LiteralValue::Bool(true))));
        body = Stmt::While(condition, Box::new(body));

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If(condition, then_branch, else_branch))
    }

    fn print_statement(&mut self) -> PResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> PResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return(keyword, value))
    }

    fn while_statement(&mut self) -> PResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While(condition, body))
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    // ---- expressions ----------------------------------------------------

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    /// Assignment is parsed as an expression (spec.md §4.2): first parse
    /// the left side as a normal expression, then if an `=` follows,
    /// re-check that the already-parsed left side was a valid l-value.
    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.or()?;

        if self.match_token(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr.kind {
                ExprKind::Variable(name) => Ok(self.mk(ExprKind::Assign(name, Box::new(value)))),
                ExprKind::Get(object, name) => Ok(self.mk(ExprKind::Set(object, name, Box::new(value)))),
                _ => Err(ParseError {
                    token: equals,
                    message: "Invalid assignment target.".to_string(),
                }),
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> PResult<Expr> {
        let mut expr = self.and()?;
        while self.match_token(&[TokenKind::Or]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = self.mk(ExprKind::Logical(Box::new(expr), operator, Box::new(right)));
        }
        Ok(expr)
    }

    fn and(&mut self) -> PResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_token(&[TokenKind::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = self.mk(ExprKind::Logical(Box::new(expr), operator, Box::new(right)));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.comparison()?;
        while self.match_token(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = self.mk(ExprKind::Binary(Box::new(expr), operator, Box::new(right)));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.term()?;
        while self.match_token(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = self.mk(ExprKind::Binary(Box::new(expr), operator, Box::new(right)));
        }
        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr = self.factor()?;
        while self.match_token(&[TokenKind::Minus, TokenKind::Plus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = self.mk(ExprKind::Binary(Box::new(expr), operator, Box::new(right)));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        while self.match_token(&[TokenKind::Slash, TokenKind::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = self.mk(ExprKind::Binary(Box::new(expr), operator, Box::new(right)));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if self.match_token(&[TokenKind::Bang, TokenKind::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(self.mk(ExprKind::Unary(operator, Box::new(right))));
        }
        self.call()
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(&[TokenKind::Dot]) {
                let name = self.consume(TokenKind::Identifier, "Expect property name after '.'.")?;
                expr = self.mk(ExprKind::Get(Box::new(expr), name));
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> PResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    self.error_at_current("Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(self.mk(ExprKind::Call(Box::new(callee), paren, arguments)))
    }

    fn primary(&mut self) -> PResult<Expr> {
        if self.match_token(&[TokenKind::False]) {
            return Ok(self.mk(ExprKind::Literal(LiteralValue::Bool(false))));
        }
        if self.match_token(&[TokenKind::True]) {
            return Ok(self.mk(ExprKind::Literal(LiteralValue::Bool(true))));
        }
        if self.match_token(&[TokenKind::Nil]) {
            return Ok(self.mk(ExprKind::Literal(LiteralValue::Nil)));
        }
        if self.match_token(&[TokenKind::Number]) {
            let value = match &self.previous().literal {
                Some(crate::token::Literal::Number(n)) => *n,
                _ => unreachable!("NUMBER token without a numeric literal"),
            };
            return Ok(self.mk(ExprKind::Literal(LiteralValue::Number(value))));
        }
        if self.match_token(&[TokenKind::String]) {
            let value = match &self.previous().literal {
                Some(crate::token::Literal::String(s)) => s.clone(),
                _ => unreachable!("STRING token without a string literal"),
            };
            return Ok(self.mk(ExprKind::Literal(LiteralValue::String(value))));
        }
        if self.match_token(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenKind::Identifier, "Expect superclass method name.")?;
            return Ok(self.mk(ExprKind::Super(keyword, method)));
        }
        if self.match_token(&[TokenKind::This]) {
            let keyword = self.previous().clone();
            return Ok(self.mk(ExprKind::This(keyword)));
        }
        if self.match_token(&[TokenKind::Identifier]) {
            let name = self.previous().clone();
            return Ok(self.mk(ExprKind::Variable(name)));
        }
        if self.match_token(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(self.mk(ExprKind::Grouping(Box::new(expr))));
        }

        Err(ParseError {
            token: self.peek().clone(),
            message: "Expect expression.".to_string(),
        })
    }

    // ---- token-stream plumbing -----------------------------------------

    fn match_token(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        Err(ParseError {
            token: self.peek().clone(),
            message: message.to_string(),
        })
    }

    fn error_at_current(&mut self, message: &str) {
        self.errors.push(ParseError {
            token: self.peek().clone(),
            message: message.to_string(),
        });
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    /// Panic-mode recovery: discard tokens until the previous one is a
    /// `;` or the next one begins a new statement (spec.md §4.2).
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<ParseError>) {
        let (tokens, lex_errors) = Lexer::new(source).scan_tokens();
        assert!(lex_errors.is_empty());
        Parser::new(tokens).parse()
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let (stmts, errors) = parse("print 3 + 4 * 2;");
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 1);
        let Stmt::Print(expr) = &stmts[0] else { panic!("expected print") };
        let ExprKind::Binary(_, op, _) = &expr.kind else { panic!("expected binary") };
        assert_eq!(op.kind, TokenKind::Plus);
    }

    #[test]
    fn desugars_for_loop_into_while() {
        let (stmts, errors) = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(errors.is_empty());
        let Stmt::Block(outer) = &stmts[0] else { panic!("expected block") };
        assert!(matches!(outer[0], Stmt::Var(..)));
        assert!(matches!(outer[1], Stmt::While(..)));
    }

    #[test]
    fn invalid_assignment_target_is_an_error_not_a_panic() {
        let (_, errors) = parse("1 = 2;");
        assert_eq!(errors[0].message, "Invalid assignment target.");
    }

    #[test]
    fn missing_semicolon_synchronizes_at_next_statement() {
        let (stmts, errors) = parse("print 1 print 2;");
        assert_eq!(errors.len(), 1);
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn parses_class_with_superclass_and_methods() {
        let (stmts, errors) = parse("class B < A { greet() { return 1; } }");
        assert!(errors.is_empty());
        let Stmt::Class(name, superclass, methods) = &stmts[0] else { panic!("expected class") };
        assert_eq!(name.lexeme, "B");
        assert!(superclass.is_some());
        assert_eq!(methods.len(), 1);
    }
}
