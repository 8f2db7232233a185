//! Static resolution pass.
//!
//! A single AST walk that runs between parsing and interpretation to:
//!
//! 1. **Build lexical scopes**: maintains a stack of `HashMap<&str, bool>`
//!    tracking declared (false) and fully defined (true) names in each nested
//!    block or function.
//! 2. **Enforce static rules**: redeclaration in the same scope, reading a
//!    variable in its own initializer, `return` outside a function, returning
//!    a value from an initializer, `this`/`super` misuse, and a class
//!    inheriting from itself.
//! 3. **Record binding distances**: every `Variable`, `Assign`, `This`, and
//!    `Super` node gets its resolution slot written with the number of scopes
//!    between the use and the declaration.  Names found in no scope stay
//!    unresolved and fall through to the global environment at runtime.
//!
//! Errors do not stop the walk; the resolver keeps going and reports them
//! all at once, mirroring the parser's recovery behaviour.

use std::cell::Cell;
use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{Expr, FunctionDecl, FunctionKind, Stmt};
use crate::error::LoxError;
use crate::token::Token;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ClassType {
    /// Not inside any class
    None,

    /// Inside a class declaration _without_ a superclass
    Class,

    /// Inside a class declaration _with_ a superclass
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and writes binding
/// distances into the AST's resolution slots.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top-level statements.  Returns every static error found.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Result<(), Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn error<S: Into<String>>(&mut self, token: &Token, msg: S) {
        self.errors.push(LoxError::resolve(token, msg));
    }

    // ── statement resolution ────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing_class: ClassType = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(superclass) = superclass {
                    if let Expr::Variable {
                        name: super_name, ..
                    } = superclass
                    {
                        if super_name.lexeme == name.lexeme {
                            self.error(super_name, "A class can't inherit from itself.");
                        }
                    }

                    self.current_class = ClassType::Subclass;
                    self.resolve_expr(superclass);

                    // Scope holding `super` for every method closure.
                    self.begin_scope();
                    self.scopes.last_mut().unwrap().insert("super", true);
                }

                // Implicit `this` scope around the method bodies.
                self.begin_scope();
                self.scopes.last_mut().unwrap().insert("this", true);

                for method in methods {
                    let declaration = match method.kind {
                        FunctionKind::Initializer => FunctionType::Initializer,
                        _ => FunctionType::Method,
                    };

                    self.resolve_function(method, declaration);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }

            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s);
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // Declared-but-not-defined until the initializer has been
                // resolved; reading the name in between is the self-init
                // error.
                self.declare(name);
                self.resolve_expr(initializer);
                self.define(name);
            }

            Stmt::Function(decl) => {
                // Define eagerly so the function can call itself.
                self.declare(&decl.name);
                self.define(&decl.name);

                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }

                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ── expression resolution ───────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { name, slot } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }

                self.resolve_local(slot, name);
            }

            Expr::Assign { name, value, slot } => {
                self.resolve_expr(value);
                self.resolve_local(slot, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => {
                self.resolve_expr(object);
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { keyword, slot } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(slot, keyword);
            }

            Expr::Super { keyword, slot, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                        return;
                    }

                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                        return;
                    }

                    ClassType::Subclass => {}
                }

                self.resolve_local(slot, keyword);
            }
        }
    }

    // ── function helper ─────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, decl: &'a FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();

        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }

        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        self.current_function = enclosing;
    }

    // ── scope management ────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme.as_str()) {
                self.error(name, "Already a variable with this name in this scope.");
                return;
            }

            self.scopes
                .last_mut()
                .unwrap()
                .insert(name.lexeme.as_str(), false);
        }
    }

    fn define(&mut self, name: &'a Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.as_str(), true);
        }
    }

    // ── binding-distance helper ─────────────────────────────────────────

    /// Record this name use as a local at the depth of the innermost scope
    /// containing it, or leave the slot unresolved (global) otherwise.
    fn resolve_local(&mut self, slot: &Cell<Option<usize>>, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme.as_str()) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                slot.set(Some(depth));
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}

impl Default for Resolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}
