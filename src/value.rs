//! Runtime values (spec.md §3). Behavior that needs the evaluator itself —
//! calling a function, constructing an instance — lives in
//! `crate::interpreter` rather than on these types, the way `golox`'s
//! `loxFunction.Call` takes an `*Interpreter` parameter
//! (`examples/original_source/interpreter/callable.go`) instead of the
//! function value closing over an evaluator of its own.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Display;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::Environment;

/// A native function exposed in the global environment (spec.md §6: just
/// `clock()`), implemented as a boxed Rust closure rather than a variant
/// per builtin so new natives don't need a new `Value` case.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub function: Box<dyn Fn(&[Value]) -> Value>,
}

pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<Environment>,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produces the *bound method* described in spec.md §3: a new function
    /// value whose closure is a one-deep frame binding `this` to the
    /// instance, enclosing the original closure.
    pub fn bind(&self, instance: Value) -> LoxFunction {
        let env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", instance);
        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    /// Method lookup walks the superclass chain (spec.md §3).
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass.as_ref()?.find_method(name)
    }

    /// A class's arity equals `init`'s arity, or 0 if there is no `init`
    /// (spec.md §4.5).
    pub fn arity(&self) -> usize {
        self.find_method("init").map(|init| init.arity()).unwrap_or(0)
    }
}

pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    pub fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Instance(Rc<RefCell<LoxInstance>>),
    Native(Rc<NativeFunction>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    /// `nil` and `false` are falsey; everything else is truthy (spec.md §4.5),
    /// including `0` and `""`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Native(_) => "native function",
        }
    }
}

impl PartialEq for Value {
    /// No implicit coercions; two values are equal iff they share a tag and
    /// their contents compare equal (spec.md §4.5). Callables compare by
    /// reference identity, since Lox has no structural notion of function
    /// equality.
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Number(a), Number(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Function(a), Function(b)) => Rc::ptr_eq(a, b),
            (Class(a), Class(b)) => Rc::ptr_eq(a, b),
            (Instance(a), Instance(b)) => Rc::ptr_eq(a, b),
            (Native(a), Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl Display for Value {
    /// `print`'s formatting rules (spec.md §4.5): numbers print via their
    /// shortest round-trip representation with a trailing `.0` stripped
    /// when integral (spec.md §9 open question), `nil` prints as `nil`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s}"),
            Value::Function(func) => write!(f, "<fn {}>", func.declaration.name.lexeme),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),
            Value::Native(native) => write!(f, "<native fn {}>", native.name),
        }
    }
}

/// Shortest round-trip `f64` rendering with the trailing `.0` stripped when
/// the value is integral (spec.md §9).
pub fn format_number(n: f64) -> String {
    let text = format!("{n}");
    text.strip_suffix(".0").map(str::to_string).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_print_without_trailing_zero() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(100.0), "100");
    }

    #[test]
    fn fractional_floats_keep_their_digits() {
        assert_eq!(format_number(1.5), "1.5");
    }

    #[test]
    fn truthiness_excludes_only_nil_and_false() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn equality_has_no_implicit_coercion() {
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_eq!(Value::Nil, Value::Nil);
    }
}
