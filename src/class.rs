use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::function::LoxFunction;
use crate::value::Value;

/// A class value.  The method table is frozen once the class declaration has
/// executed; `init`, if any, is looked up along the superclass chain at
/// construction time and cached for arity checks and instantiation.
#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, LoxFunction>,
    initializer: Option<LoxFunction>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, LoxFunction>,
    ) -> Self {
        let initializer = methods
            .get("init")
            .cloned()
            .or_else(|| superclass.as_ref().and_then(|s| s.initializer.clone()));

        debug!(
            "Built class '{}' ({} method(s), initializer: {})",
            name,
            methods.len(),
            initializer.is_some()
        );

        LoxClass {
            name,
            superclass,
            methods,
            initializer,
        }
    }

    /// First match walking up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    pub fn initializer(&self) -> Option<&LoxFunction> {
        self.initializer.as_ref()
    }

    /// A class called as a constructor expects its initializer's arguments.
    pub fn arity(&self) -> usize {
        self.initializer.as_ref().map_or(0, LoxFunction::arity)
    }
}

/// An instance: a pointer to its class and a mutable bag of fields.  Fields
/// shadow methods on property access.
#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}
