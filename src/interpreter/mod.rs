//! The evaluator (spec.md §4.5). Walks the AST directly with `match`, the
//! same dispatch style `crates/why_lib`'s own `Interpreter::run_statement`/
//! `run_expression` use (`examples/H1ghBre4k3r-y-lang/src/interpreter/mod.rs`)
//! rather than the Visitor pattern.
//!
//! Calling a function or constructing an instance is evaluator-owned logic,
//! not a method on `Value`'s callable variants — mirroring
//! `examples/original_source/interpreter/callable.go`, where `loxFunction.Call`
//! takes the `*Interpreter` as a parameter instead of the function value
//! holding an evaluator of its own.

use std::rc::Rc;

use crate::ast::{Expr, ExprKind, FunctionDecl, Stmt};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::resolver::Locals;
use crate::token::{Token, TokenKind};
use crate::value::{LoxClass, LoxFunction, LoxInstance, NativeFunction, Value};

/// What a statement's execution produced: ordinary fallthrough, or a
/// `return` unwinding to the nearest function call (spec.md §4.5's evaluator
/// state machine). Not an error — `Result`'s `Err` arm is reserved for
/// actual runtime errors.
pub enum Flow {
    Normal,
    Return(Value),
}

type ExecResult = Result<Flow, RuntimeError>;
type EvalResult = Result<Value, RuntimeError>;

pub struct Interpreter {
    globals: Rc<Environment>,
    environment: Rc<Environment>,
    locals: Locals,
}

impl Interpreter {
    pub fn new(locals: Locals) -> Self {
        let globals = Environment::new_global();
        define_natives(&globals);
        Self {
            environment: Rc::clone(&globals),
            globals,
            locals,
        }
    }

    /// Runs a whole program, stopping at the first runtime error (spec.md
    /// §4.5: a runtime error aborts the current top-level statement; the
    /// driver decides what that means for the remaining program).
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            self.execute(stmt)?;
        }
        log::debug!("interpreted {} top-level statements", statements.len());
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                println!("{value}");
                Ok(Flow::Normal)
            }
            Stmt::Var(name, initializer) => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(&name.lexeme, value);
                Ok(Flow::Normal)
            }
            Stmt::Block(body) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(body, scope)
            }
            Stmt::If(condition, then_branch, else_branch) => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While(condition, body) => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(decl) => {
                let function = Value::Function(Rc::new(LoxFunction {
                    declaration: Rc::clone(decl),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                }));
                self.environment.define(&decl.name.lexeme, function);
                Ok(Flow::Normal)
            }
            Stmt::Return(_, value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Class(name, superclass_expr, methods) => {
                self.execute_class(name, superclass_expr.as_ref(), methods)
            }
        }
    }

    /// Shared by block statements and function bodies (spec.md §4.5 step 5):
    /// executes a sequence of statements under a given environment, stopping
    /// early on the first `Return` or error.
    fn execute_block(&mut self, body: &[Stmt], scope: Rc<Environment>) -> ExecResult {
        let previous = std::mem::replace(&mut self.environment, scope);
        let mut result = Ok(Flow::Normal);
        for stmt in body {
            match self.execute(stmt) {
                Ok(Flow::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.environment = previous;
        result
    }

    fn execute_class(&mut self, name: &Token, superclass_expr: Option<&Expr>, methods: &[Rc<FunctionDecl>]) -> ExecResult {
        let superclass = match superclass_expr {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        return Err(RuntimeError::new(
                            superclass_token(expr).clone(),
                            "Superclass must be a class.".to_string(),
                        ))
                    }
                }
            }
            None => None,
        };

        self.environment.define(&name.lexeme, Value::Nil);

        let method_env = if let Some(superclass) = &superclass {
            let env = Environment::with_enclosing(Rc::clone(&self.environment));
            env.define("super", Value::Class(Rc::clone(superclass)));
            env
        } else {
            Rc::clone(&self.environment)
        };

        let previous = std::mem::replace(&mut self.environment, method_env);
        let mut method_table = std::collections::HashMap::new();
        for method in methods {
            let function = LoxFunction {
                declaration: Rc::clone(method),
                closure: Rc::clone(&self.environment),
                is_initializer: method.name.lexeme == "init",
            };
            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }
        self.environment = previous;

        let class = Value::Class(Rc::new(LoxClass {
            name: name.lexeme.clone(),
            superclass,
            methods: method_table,
        }));
        self.environment.assign(name, class)?;
        Ok(Flow::Normal)
    }

    fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(literal_value(literal)),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Variable(name) => self.lookup_variable(expr.id.0, name),
            ExprKind::Assign(name, value_expr) => {
                let value = self.evaluate(value_expr)?;
                match self.locals.get(&expr.id.0) {
                    Some(depth) => self.environment.assign_at(*depth, name, value.clone())?,
                    None => self.globals.assign(name, value.clone())?,
                }
                Ok(value)
            }
            ExprKind::Unary(operator, right_expr) => self.evaluate_unary(operator, right_expr),
            ExprKind::Binary(left_expr, operator, right_expr) => self.evaluate_binary(left_expr, operator, right_expr),
            ExprKind::Logical(left_expr, operator, right_expr) => self.evaluate_logical(left_expr, operator, right_expr),
            ExprKind::Call(callee_expr, paren, argument_exprs) => {
                let callee = self.evaluate(callee_expr)?;
                let mut arguments = Vec::with_capacity(argument_exprs.len());
                for argument in argument_exprs {
                    arguments.push(self.evaluate(argument)?);
                }
                self.call(callee, arguments, paren)
            }
            ExprKind::Get(object_expr, name) => {
                let object = self.evaluate(object_expr)?;
                self.get_property(&object, name)
            }
            ExprKind::Set(object_expr, name, value_expr) => {
                let object = self.evaluate(object_expr)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::new(name.clone(), "Only instances have fields.".to_string()));
                };
                let value = self.evaluate(value_expr)?;
                instance.borrow_mut().fields.insert(name.lexeme.clone(), value.clone());
                Ok(value)
            }
            ExprKind::This(keyword) => self.lookup_variable(expr.id.0, keyword),
            ExprKind::Super(keyword, method) => self.evaluate_super(expr.id.0, keyword, method),
        }
    }

    fn lookup_variable(&self, expr_id: u32, name: &Token) -> EvalResult {
        match self.locals.get(&expr_id) {
            Some(depth) => Ok(self.environment.get_at(*depth, &name.lexeme)),
            None => self.globals.get(name),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right_expr: &Expr) -> EvalResult {
        let right = self.evaluate(right_expr)?;
        match operator.kind {
            TokenKind::Minus => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::new(operator.clone(), "Operand must be a number.".to_string())),
            },
            TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
            _ => unreachable!("parser only produces Minus/Bang unary operators"),
        }
    }

    fn evaluate_logical(&mut self, left_expr: &Expr, operator: &Token, right_expr: &Expr) -> EvalResult {
        let left = self.evaluate(left_expr)?;
        match operator.kind {
            TokenKind::Or if left.is_truthy() => Ok(left),
            TokenKind::Or => self.evaluate(right_expr),
            TokenKind::And if !left.is_truthy() => Ok(left),
            TokenKind::And => self.evaluate(right_expr),
            _ => unreachable!("parser only produces And/Or logical operators"),
        }
    }

    fn evaluate_binary(&mut self, left_expr: &Expr, operator: &Token, right_expr: &Expr) -> EvalResult {
        let left = self.evaluate(left_expr)?;
        let right = self.evaluate(right_expr)?;

        macro_rules! numeric {
            ($op:tt) => {
                match (&left, &right) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a $op b)),
                    _ => Err(RuntimeError::new(operator.clone(), "Operands must be numbers.".to_string())),
                }
            };
        }
        macro_rules! comparison {
            ($op:tt) => {
                match (&left, &right) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a $op b)),
                    _ => Err(RuntimeError::new(operator.clone(), "Operands must be numbers.".to_string())),
                }
            };
        }

        match operator.kind {
            TokenKind::Minus => numeric!(-),
            TokenKind::Slash => numeric!(/),
            TokenKind::Star => numeric!(*),
            TokenKind::Greater => comparison!(>),
            TokenKind::GreaterEqual => comparison!(>=),
            TokenKind::Less => comparison!(<),
            TokenKind::LessEqual => comparison!(<=),
            TokenKind::BangEqual => Ok(Value::Bool(left != right)),
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::Plus => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::string(format!("{a}{b}"))),
                _ => Err(RuntimeError::new(
                    operator.clone(),
                    "Operands must be two numbers or two strings.".to_string(),
                )),
            },
            _ => unreachable!("parser only produces arithmetic/comparison/equality binary operators"),
        }
    }

    fn evaluate_super(&mut self, expr_id: u32, keyword: &Token, method: &Token) -> EvalResult {
        let depth = *self.locals.get(&expr_id).expect("resolver always resolves 'super'");
        let Value::Class(superclass) = self.environment.get_at(depth, "super") else {
            unreachable!("'super' slot always holds a class");
        };
        // `this` lives one scope inside the `super` binding (spec.md §4.5).
        let this = self.environment.get_at(depth - 1, "this");

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(this)))),
            None => Err(RuntimeError::new(method.clone(), format!("Undefined property '{}'.", method.lexeme))),
        }
    }

    fn get_property(&self, object: &Value, name: &Token) -> EvalResult {
        let Value::Instance(instance) = object else {
            return Err(RuntimeError::new(name.clone(), "Only instances have properties.".to_string()));
        };
        let instance_ref = instance.borrow();
        if let Some(value) = instance_ref.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }
        if let Some(method) = instance_ref.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Value::Instance(Rc::clone(instance))))));
        }
        Err(RuntimeError::new(name.clone(), format!("Undefined property '{}'.", name.lexeme)))
    }

    /// The call protocol (spec.md §4.5): arity check, fresh environment,
    /// body execution, `return`-signal handling, `init` special-casing.
    fn call(&mut self, callee: Value, arguments: Vec<Value>, paren: &Token) -> EvalResult {
        match callee {
            Value::Function(function) => self.call_function(&function, arguments, paren),
            Value::Class(class) => self.construct(&class, arguments, paren),
            Value::Native(native) => {
                check_arity(native.arity, arguments.len(), paren)?;
                log::trace!("calling native '{}' with {} argument(s)", native.name, arguments.len());
                Ok((native.function)(&arguments))
            }
            _ => Err(RuntimeError::new(paren.clone(), "Can only call functions and classes.".to_string())),
        }
    }

    fn call_function(&mut self, function: &LoxFunction, arguments: Vec<Value>, paren: &Token) -> EvalResult {
        check_arity(function.arity(), arguments.len(), paren)?;
        log::trace!(
            "calling '{}' with {} argument(s)",
            function.declaration.name.lexeme,
            arguments.len()
        );

        let call_env = Environment::with_enclosing(Rc::clone(&function.closure));
        for (param, argument) in function.declaration.params.iter().zip(arguments) {
            call_env.define(&param.lexeme, argument);
        }

        let flow = self.execute_block(&function.declaration.body, call_env)?;

        if function.is_initializer {
            return Ok(function.closure.get_at(0, "this"));
        }

        match flow {
            Flow::Normal => Ok(Value::Nil),
            Flow::Return(value) => Ok(value),
        }
    }

    fn construct(&mut self, class: &Rc<LoxClass>, arguments: Vec<Value>, paren: &Token) -> EvalResult {
        let instance = Rc::new(std::cell::RefCell::new(LoxInstance::new(Rc::clone(class))));
        let value = Value::Instance(Rc::clone(&instance));

        if let Some(initializer) = class.find_method("init") {
            let bound = initializer.bind(value.clone());
            self.call_function(&bound, arguments, paren)?;
        } else {
            check_arity(0, arguments.len(), paren)?;
        }

        Ok(value)
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<(), RuntimeError> {
    if expected != got {
        return Err(RuntimeError::new(paren.clone(), format!("Expected {expected} arguments but got {got}.")));
    }
    Ok(())
}

fn literal_value(literal: &crate::ast::LiteralValue) -> Value {
    use crate::ast::LiteralValue as L;
    match literal {
        L::Nil => Value::Nil,
        L::Bool(b) => Value::Bool(*b),
        L::Number(n) => Value::Number(*n),
        L::String(s) => Value::string(s.clone()),
    }
}

/// `Stmt::Class`'s superclass slot is an `Expr` so the resolver treats it as
/// an ordinary variable reference; recovering its token back out for error
/// reporting when it doesn't evaluate to a class.
fn superclass_token(expr: &Expr) -> &Token {
    match &expr.kind {
        ExprKind::Variable(name) => name,
        _ => unreachable!("parser only ever builds superclass expressions as Variable"),
    }
}

fn define_natives(globals: &Rc<Environment>) {
    globals.define(
        "clock",
        Value::Native(Rc::new(NativeFunction {
            name: "clock",
            arity: 0,
            function: Box::new(|_args| {
                let seconds = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                Value::Number(seconds)
            }),
        })),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::resolver::Resolver;

    fn run(source: &str) -> Result<(), RuntimeError> {
        let (tokens, _) = Lexer::new(source).scan_tokens();
        let (statements, _) = Parser::new(tokens).parse();
        let (locals, _) = Resolver::new().resolve(&statements);
        Interpreter::new(locals).interpret(&statements)
    }

    #[test]
    fn arithmetic_and_print_do_not_error() {
        assert!(run("print 1 + 2 * 3;").is_ok());
    }

    #[test]
    fn string_concatenation_with_plus() {
        assert!(run(r#"print "a" + "b";"#).is_ok());
    }

    #[test]
    fn mixing_number_and_string_with_plus_is_a_runtime_error() {
        let err = run(r#"print 1 + "a";"#).unwrap_err();
        assert_eq!(err.message, "Operands must be two numbers or two strings.");
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    return i;
                }
                return count;
            }
            var counter = makeCounter();
            print counter();
            print counter();
        "#;
        assert!(run(source).is_ok());
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let err = run("var a = 1; a();").unwrap_err();
        assert_eq!(err.message, "Can only call functions and classes.");
    }

    #[test]
    fn wrong_arity_is_a_runtime_error() {
        let err = run("fun f(a) { return a; } f(1, 2);").unwrap_err();
        assert_eq!(err.message, "Expected 1 arguments but got 2.");
    }

    #[test]
    fn init_return_value_is_always_the_instance() {
        let source = r#"
            class Box {
                init(value) {
                    this.value = value;
                }
            }
            var b = Box(10);
            print b.value;
        "#;
        assert!(run(source).is_ok());
    }

    #[test]
    fn inheritance_dispatches_through_super() {
        let source = r#"
            class Animal {
                speak() { return "..."; }
            }
            class Dog < Animal {
                speak() { return super.speak(); }
            }
            print Dog().speak();
        "#;
        assert!(run(source).is_ok());
    }

    #[test]
    fn undefined_property_access_is_a_runtime_error() {
        let err = run("class C {} print C().missing;").unwrap_err();
        assert_eq!(err.message, "Undefined property 'missing'.");
    }
}
