use std::rc::Rc;

use crate::token::Token;

use super::expr::Expr;

/// A `fun` declaration's static shape — name, parameters and body. Shared
/// (`Rc`) between the AST and every runtime closure created from it, so a
/// function doesn't get re-cloned on each call or each time it's assigned
/// to a new variable.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),
    Print(Expr),
    Var(Token, Option<Expr>),
    Block(Vec<Stmt>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    While(Expr, Box<Stmt>),
    Function(Rc<FunctionDecl>),
    Return(Token, Option<Expr>),
    Class(Token, Option<Expr>, Vec<Rc<FunctionDecl>>),
}
