//! Static scope resolution (spec.md §4.3, §4.4). Runs between parsing and
//! evaluation and never touches values: for every `Variable`/`Assign`/`This`/
//! `Super` expression it records how many enclosing blocks separate the use
//! from its declaration, so the evaluator can jump straight to the right
//! environment frame instead of walking outward and guessing.
//!
//! Matches over `&Expr`/`&Stmt` directly, same as `src/parser/mod.rs` and
//! `src/interpreter/mod.rs` — no Visitor trait, unlike
//! `examples/other_examples/3085745f_martonmoro-lox-interpreter-rs__src-resolver.rs.rs`,
//! which this crate's design deliberately departs from (spec.md §9).

use std::collections::HashMap;

use crate::ast::{Expr, ExprKind, FunctionDecl, Stmt};
use crate::error::ResolveError;
use crate::token::Token;

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// The side table the evaluator consults: `ExprId -> depth`, where `depth`
/// is the number of enclosing environment frames to skip (spec.md §4.3).
pub type Locals = HashMap<u32, usize>;

pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>,
    locals: Locals,
    current_function: FunctionType,
    current_class: ClassType,
    pub errors: Vec<ResolveError>,
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            locals: Locals::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> (Locals, Vec<ResolveError>) {
        self.resolve_stmts(statements);
        log::debug!("resolved {} local references ({} errors)", self.locals.len(), self.errors.len());
        (self.locals, self.errors)
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Var(name, initializer) => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Block(body) => {
                self.begin_scope();
                self.resolve_stmts(body);
                self.end_scope();
            }
            Stmt::If(condition, then_branch, else_branch) => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(condition, body) => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }
            Stmt::Return(keyword, value) => {
                if self.current_function == FunctionType::None {
                    self.errors.push(ResolveError {
                        token: keyword.clone(),
                        message: "Can't return from top-level code.".to_string(),
                    });
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.errors.push(ResolveError {
                            token: keyword.clone(),
                            message: "Can't return a value from initializer.".to_string(),
                        });
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class(name, superclass, methods) => {
                self.resolve_class(name, superclass.as_ref(), methods);
            }
        }
    }

    fn resolve_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[std::rc::Rc<FunctionDecl>]) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let ExprKind::Variable(super_name) = &superclass.kind {
                if super_name.lexeme == name.lexeme {
                    self.errors.push(ResolveError {
                        token: super_name.clone(),
                        message: "A class can't inherit from itself.".to_string(),
                    });
                }
            }
            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.scopes.last_mut().unwrap().insert("super".to_string(), true);
        }

        self.begin_scope();
        self.scopes.last_mut().unwrap().insert("this".to_string(), true);

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Variable(name) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.errors.push(ResolveError {
                            token: name.clone(),
                            message: "Can't read local variable in its own initializer.".to_string(),
                        });
                    }
                }
                self.resolve_local(expr.id.0, name);
            }
            ExprKind::Assign(name, value) => {
                self.resolve_expr(value);
                self.resolve_local(expr.id.0, name);
            }
            ExprKind::Unary(_, right) => self.resolve_expr(right),
            ExprKind::Binary(left, _, right) | ExprKind::Logical(left, _, right) => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Grouping(inner) => self.resolve_expr(inner),
            ExprKind::Call(callee, _, arguments) => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            ExprKind::Get(object, _) => self.resolve_expr(object),
            ExprKind::Set(object, _, value) => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            ExprKind::This(keyword) => {
                if self.current_class == ClassType::None {
                    self.errors.push(ResolveError {
                        token: keyword.clone(),
                        message: "Can't use 'this' outside of a class.".to_string(),
                    });
                    return;
                }
                self.resolve_local(expr.id.0, keyword);
            }
            ExprKind::Super(keyword, _) => {
                match self.current_class {
                    ClassType::None => {
                        self.errors.push(ResolveError {
                            token: keyword.clone(),
                            message: "Can't use 'super' outside of a class.".to_string(),
                        });
                        return;
                    }
                    ClassType::Class => {
                        self.errors.push(ResolveError {
                            token: keyword.clone(),
                            message: "Can't use 'super' in a class with no superclass.".to_string(),
                        });
                        return;
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(expr.id.0, keyword);
            }
        }
    }

    fn resolve_local(&mut self, expr_id: u32, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(expr_id, depth);
                return;
            }
        }
        // Not found in any local scope: treated as global, resolved at
        // evaluation time via `Environment::get`'s outward walk.
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
        log::trace!("pushed scope (depth now {})", self.scopes.len());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
        log::trace!("popped scope (depth now {})", self.scopes.len());
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.errors.push(ResolveError {
                    token: name.clone(),
                    message: "Already a variable with this name in this scope.".to_string(),
                });
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn resolve(source: &str) -> Vec<ResolveError> {
        let (tokens, _) = Lexer::new(source).scan_tokens();
        let (statements, _) = Parser::new(tokens).parse();
        let (_, errors) = Resolver::new().resolve(&statements);
        errors
    }

    #[test]
    fn shadowing_a_local_in_the_same_scope_is_rejected() {
        let errors = resolve("fun f() { var a = 1; var a = 2; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Already a variable with this name in this scope.");
    }

    #[test]
    fn reading_a_variable_in_its_own_initializer_is_rejected() {
        let errors = resolve("var a = 1; { var a = a; }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Can't read local variable in its own initializer.");
    }

    #[test]
    fn top_level_return_is_rejected() {
        let errors = resolve("return 1;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Can't return from top-level code.");
    }

    #[test]
    fn returning_a_value_from_init_is_rejected() {
        let errors = resolve("class C { init() { return 1; } }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Can't return a value from initializer.");
    }

    #[test]
    fn this_outside_a_class_is_rejected() {
        let errors = resolve("print this;");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Can't use 'this' outside of a class.");
    }

    #[test]
    fn super_without_a_superclass_is_rejected() {
        let errors = resolve("class C { f() { super.f(); } }");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Can't use 'super' in a class with no superclass.");
    }

    #[test]
    fn class_inheriting_from_itself_is_rejected() {
        let errors = resolve("class C < C {}");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "A class can't inherit from itself.");
    }

    #[test]
    fn well_formed_program_resolves_without_errors() {
        let errors = resolve("class A { f() { return 1; } } class B < A { f() { return super.f() + 1; } }");
        assert_eq!(errors, Vec::new());
    }
}
