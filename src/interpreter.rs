//! Tree-walking evaluator for resolved Lox programs.
//!
//! Statements execute against a chain of environments rooted in a global
//! environment that is pre-populated with the native functions.  Expression
//! evaluation yields a [`Value`]; statement execution yields a
//! [`Completion`], which is how `return` travels up through blocks and loops
//! without abusing the error channel.  Runtime errors unwind to the top,
//! restoring each replaced environment on the way.
//!
//! Variable accesses use the distances the resolver wrote into the AST:
//! a resolved slot walks exactly that many environments up, an unresolved
//! slot consults the globals.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, FunctionDecl, FunctionKind, LiteralValue, Stmt};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::function::{LoxFunction, NativeFunction};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Lox call frames allowed before "Stack overflow." is raised.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

/// How a statement finished: fell off the end, or hit a `return`.
#[derive(Debug)]
pub enum Completion {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    call_depth: usize,
    max_call_depth: usize,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Build an interpreter whose `print` statement writes to `output`
    /// instead of stdout.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock_native,
            })),
        );

        info!("Interpreter initialized with native functions");

        Interpreter {
            environment: globals.clone(),
            globals,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            output,
        }
    }

    /// Override the Lox recursion cap (default [`DEFAULT_MAX_CALL_DEPTH`]).
    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    /// Execute a resolved program.  The first runtime error aborts execution
    /// and is returned; interpreter state stays usable (the REPL relies on
    /// that).
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            self.execute(stmt)?;
        }

        Ok(())
    }

    // ── statements ──────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<Completion> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Completion::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value)?;

                Ok(Completion::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = self.evaluate(initializer)?;

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(Completion::Normal)
            }

            Stmt::Block(statements) => self.execute_block(
                statements,
                Environment::with_enclosing(self.environment.clone()),
            ),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Completion::Return(value) = self.execute(body)? {
                        return Ok(Completion::Return(value));
                    }
                }

                Ok(Completion::Normal)
            }

            Stmt::Function(decl) => {
                let function = LoxFunction::new(
                    decl.clone(),
                    self.environment.clone(),
                    decl.kind == FunctionKind::Initializer,
                );

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Completion::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Completion::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class_decl(name, superclass.as_ref(), methods),
        }
    }

    fn execute_class_decl(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<Completion> {
        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    let at: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(LoxError::runtime(at, "Superclass must be a class."));
                }
            },

            None => None,
        };

        // Bound to nil first so the methods being built below can already
        // refer to the class by name.
        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let previous: Rc<RefCell<Environment>> = self.environment.clone();

        if let Some(superclass) = &superclass_value {
            let mut env = Environment::with_enclosing(previous.clone());
            env.define("super", Value::Class(superclass.clone()));
            self.environment = Rc::new(RefCell::new(env));
        }

        let mut method_table: HashMap<String, LoxFunction> = HashMap::new();

        for method in methods {
            let function = LoxFunction::new(
                method.clone(),
                self.environment.clone(),
                method.kind == FunctionKind::Initializer,
            );

            method_table.insert(method.name.lexeme.clone(), function);
        }

        let class = LoxClass::new(name.lexeme.clone(), superclass_value, method_table);

        self.environment = previous;

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;

        Ok(Completion::Normal)
    }

    /// Run `statements` inside `environment`, restoring the previous
    /// environment afterwards whether the block completed, returned, or
    /// failed.
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Environment,
    ) -> Result<Completion> {
        let previous: Rc<RefCell<Environment>> = std::mem::replace(
            &mut self.environment,
            Rc::new(RefCell::new(environment)),
        );

        let mut completion: Result<Completion> = Ok(Completion::Normal);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Completion::Normal) => {}

                other => {
                    completion = other;
                    break;
                }
            }
        }

        self.environment = previous;

        completion
    }

    // ── expressions ─────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),

                        _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
                    },

                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

                    _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                self.binary_op(left, operator, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                // The operand itself is the result, never a coerced boolean.
                match operator.token_type {
                    TokenType::OR if left.is_truthy() => Ok(left),
                    TokenType::AND if !left.is_truthy() => Ok(left),
                    _ => self.evaluate(right),
                }
            }

            Expr::Variable { name, slot } => self.look_up_variable(name, slot),

            Expr::Assign { name, value, slot } => {
                let value: Value = self.evaluate(value)?;

                match slot.get() {
                    Some(distance) => {
                        let assigned = self.environment.borrow_mut().assign_at(
                            distance,
                            &name.lexeme,
                            value.clone(),
                        );

                        if !assigned {
                            return Err(LoxError::runtime(
                                name,
                                format!("Undefined variable '{}'.", name.lexeme),
                            ));
                        }
                    }

                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                if self.call_depth >= self.max_call_depth {
                    return Err(LoxError::runtime(paren, "Stack overflow."));
                }

                self.call_depth += 1;

                let result: Result<Value> = match callee {
                    Value::NativeFunction(native) => {
                        self.check_arity(native.arity, args.len(), paren)
                            .and_then(|_| (native.func)(&args))
                    }

                    Value::Function(function) => self
                        .check_arity(function.arity(), args.len(), paren)
                        .and_then(|_| self.call_function(&function, args)),

                    Value::Class(class) => self
                        .check_arity(class.arity(), args.len(), paren)
                        .and_then(|_| self.instantiate(&class, args)),

                    _ => Err(LoxError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    )),
                };

                self.call_depth -= 1;

                result
            }

            Expr::Get { object, name } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        // Fields shadow methods.
                        if let Some(value) = instance.borrow().field(&name.lexeme) {
                            return Ok(value);
                        }

                        let method = instance.borrow().class.find_method(&name.lexeme);

                        match method {
                            Some(method) => Ok(Value::Function(Rc::new(
                                method.bind(Value::Instance(instance.clone())),
                            ))),

                            None => Err(LoxError::runtime(
                                name,
                                format!("Undefined property '{}'.", name.lexeme),
                            )),
                        }
                    }

                    _ => Err(LoxError::runtime(name, "Only instances have properties.")),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object: Value = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value: Value = self.evaluate(value)?;

                        instance.borrow_mut().set_field(&name.lexeme, value.clone());

                        Ok(value)
                    }

                    _ => Err(LoxError::runtime(name, "Only instances have fields.")),
                }
            }

            Expr::This { keyword, slot } => self.look_up_variable(keyword, slot),

            Expr::Super {
                keyword,
                method,
                slot,
            } => self.evaluate_super(keyword, method, slot),
        }
    }

    fn binary_op(&mut self, left: Value, operator: &Token, right: Value) -> Result<Value> {
        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::STAR => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            // Division by zero follows IEEE-754: inf or NaN, never an error.
            TokenType::SLASH => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::GREATER => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::GREATER_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::LESS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::LESS_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(LoxError::runtime(operator, "Operands must be numbers.")),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left.lox_eq(&right))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!left.lox_eq(&right))),

            _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
        }
    }

    // ── calls and construction ──────────────────────────────────────────

    fn check_arity(&self, expected: usize, got: usize, paren: &Token) -> Result<()> {
        if expected != got {
            return Err(LoxError::runtime(
                paren,
                format!("Expected {} arguments but got {}.", expected, got),
            ));
        }

        Ok(())
    }

    /// Invoke a user function: fresh environment over the closure, parameters
    /// bound by position, body executed there.
    fn call_function(&mut self, function: &LoxFunction, args: Vec<Value>) -> Result<Value> {
        debug!(
            "Calling <fn {}> at depth {}",
            function.name(),
            self.call_depth
        );

        let mut environment = Environment::with_enclosing(function.closure.clone());

        for (param, arg) in function.declaration.params.iter().zip(args) {
            environment.define(&param.lexeme, arg);
        }

        let completion: Completion = self.execute_block(&function.declaration.body, environment)?;

        // An initializer always hands back its `this`, even on a bare
        // `return;`.  Returning a value was already rejected by the resolver.
        if function.is_initializer {
            return self.closure_this(function);
        }

        match completion {
            Completion::Return(value) => Ok(value),
            Completion::Normal => Ok(Value::Nil),
        }
    }

    fn closure_this(&self, function: &LoxFunction) -> Result<Value> {
        function
            .closure
            .borrow()
            .get_at(0, "this")
            .ok_or_else(|| LoxError::runtime(&function.declaration.name, "Undefined variable 'this'."))
    }

    /// A class used as a callee constructs an instance, running the bound
    /// initializer when one exists.  The initializer's own result is
    /// discarded; construction always yields the instance.
    fn instantiate(&mut self, class: &Rc<LoxClass>, args: Vec<Value>) -> Result<Value> {
        debug!("Instantiating class '{}'", class.name);

        let instance = Rc::new(RefCell::new(LoxInstance::new(class.clone())));

        if let Some(initializer) = class.initializer() {
            let bound: LoxFunction = initializer.bind(Value::Instance(instance.clone()));
            self.call_function(&bound, args)?;
        }

        Ok(Value::Instance(instance))
    }

    // ── variable plumbing ───────────────────────────────────────────────

    fn look_up_variable(&self, name: &Token, slot: &Cell<Option<usize>>) -> Result<Value> {
        match slot.get() {
            Some(distance) => self
                .environment
                .borrow()
                .get_at(distance, &name.lexeme)
                .ok_or_else(|| {
                    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
                }),

            None => self.globals.borrow().get(name),
        }
    }

    fn evaluate_super(
        &mut self,
        keyword: &Token,
        method: &Token,
        slot: &Cell<Option<usize>>,
    ) -> Result<Value> {
        let distance: usize = match slot.get() {
            Some(distance) => distance,
            None => {
                return Err(LoxError::runtime(keyword, "Undefined variable 'super'."));
            }
        };

        let superclass: Rc<LoxClass> = match self.environment.borrow().get_at(distance, "super") {
            Some(Value::Class(class)) => class,
            _ => {
                return Err(LoxError::runtime(keyword, "Undefined variable 'super'."));
            }
        };

        // `this` sits one environment closer than `super` by construction.
        let instance: Value = self
            .environment
            .borrow()
            .get_at(distance - 1, "this")
            .ok_or_else(|| LoxError::runtime(keyword, "Undefined variable 'this'."))?;

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),

            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn clock_native(_args: &[Value]) -> Result<Value> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LoxError::Runtime {
            message: format!("Clock error: {}", e),
            line: 0,
        })?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}
