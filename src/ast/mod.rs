//! AST node types produced by the parser and walked by the resolver and
//! interpreter. Split the way the teacher splits its AST, one file per
//! syntactic concern (`expr`, `stmt`), rather than per individual node —
//! Lox's AST is small enough that a node-per-file split (as in
//! `crates/why_lib/src/parser/ast/expression/*.rs`) would be mostly
//! boilerplate.

mod expr;
mod stmt;

pub use expr::{Expr, ExprId, ExprKind, LiteralValue};
pub use stmt::{FunctionDecl, Stmt};
