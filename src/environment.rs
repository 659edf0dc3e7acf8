//! Lexical scope frames, linked the way the teacher's type-checking `Scope`
//! links frames (`crates/why_lib/src/typechecker/scope.rs`): each frame is a
//! cheaply-cloned, shared, mutable handle (`Rc<RefCell<_>>`-shaped), but
//! here the chain is parent-linked rather than a flat stack, since a
//! closure must hold on to one *specific* ancestor frame rather than "the
//! stack as it stood."

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

pub struct Environment {
    values: RefCell<HashMap<String, Value>>,
    pub enclosing: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new_global() -> Rc<Environment> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            enclosing: None,
        })
    }

    pub fn with_enclosing(enclosing: Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            values: RefCell::new(HashMap::new()),
            enclosing: Some(enclosing),
        })
    }

    /// Declares (or redeclares — Lox allows shadowing within the same
    /// block at the global scope) a binding in this frame.
    pub fn define(&self, name: &str, value: Value) {
        self.values.borrow_mut().insert(name.to_string(), value);
    }

    /// Walks outward from this frame until `name` is found (spec.md §3:
    /// `get`/`assign` walk outward). Used only for unresolved (global)
    /// references — resolved locals use `get_at`.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.get(name);
        }

        Err(RuntimeError::new(name.clone(), format!("Undefined variable '{}'.", name.lexeme)))
    }

    pub fn assign(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if self.values.borrow().contains_key(&name.lexeme) {
            self.values.borrow_mut().insert(name.lexeme.clone(), value);
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.assign(name, value);
        }

        Err(RuntimeError::new(name.clone(), format!("Undefined variable '{}'.", name.lexeme)))
    }

    /// Skips exactly `depth` enclosing frames and looks up `name` *only* in
    /// that frame — no further fallback walk (spec.md §3 invariant (iii)).
    pub fn get_at(self: &Rc<Self>, depth: usize, name: &str) -> Value {
        self.ancestor(depth)
            .values
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("resolver soundness violated: '{name}' missing at depth {depth}"))
    }

    pub fn assign_at(self: &Rc<Self>, depth: usize, name: &Token, value: Value) -> Result<(), RuntimeError> {
        let frame = self.ancestor(depth);
        if !frame.values.borrow().contains_key(&name.lexeme) {
            panic!("resolver soundness violated: '{}' missing at depth {depth}", name.lexeme);
        }
        frame.values.borrow_mut().insert(name.lexeme.clone(), value);
        Ok(())
    }

    fn ancestor(self: &Rc<Self>, depth: usize) -> Rc<Environment> {
        let mut env = Rc::clone(self);
        for _ in 0..depth {
            env = env
                .enclosing
                .clone()
                .expect("resolver soundness violated: ran out of enclosing frames");
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn token(name: &str) -> Token {
        Token::new(TokenKind::Identifier, name, None, 1)
    }

    #[test]
    fn get_at_skips_exactly_depth_frames() {
        let global = Environment::new_global();
        global.define("x", Value::Number(1.0));
        let inner = Environment::with_enclosing(Rc::clone(&global));
        inner.define("x", Value::Number(2.0));

        assert_eq!(inner.get_at(0, "x"), Value::Number(2.0));
        assert_eq!(inner.get_at(1, "x"), Value::Number(1.0));
    }

    #[test]
    fn assign_walks_outward_to_the_declaring_frame() {
        let global = Environment::new_global();
        global.define("x", Value::Number(1.0));
        let inner = Environment::with_enclosing(Rc::clone(&global));

        inner.assign(&token("x"), Value::Number(9.0)).unwrap();
        assert_eq!(global.get(&token("x")).unwrap(), Value::Number(9.0));
    }

    #[test]
    fn get_on_undefined_global_is_a_runtime_error() {
        let global = Environment::new_global();
        let err = global.get(&token("missing")).unwrap_err();
        assert_eq!(err.message, "Undefined variable 'missing'.");
    }
}
