use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::error::Result;
use crate::value::Value;

/// A host-provided function pre-bound in the global environment.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value>,
}

/// A user-declared function value: the declaration it was built from plus the
/// environment that was active at declaration time.  Calling it evaluates the
/// body in a fresh environment enclosing that closure.
#[derive(Debug, Clone)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this function whose `this` is pre-bound to
    /// `instance`, by wrapping the closure in a one-entry environment.
    pub fn bind(&self, instance: Value) -> LoxFunction {
        debug!("Binding method '{}' to an instance", self.name());

        let mut env = Environment::with_enclosing(self.closure.clone());
        env.define("this", instance);

        LoxFunction {
            declaration: self.declaration.clone(),
            closure: Rc::new(RefCell::new(env)),
            is_initializer: self.is_initializer,
        }
    }
}
