//! The native binding surface: how host (Rust) functions and classes are
//! exposed to running Vela programs.
//!
//! `CallNativeFunction`/`CreateNativeClassInstance` dispatch by exact name
//! match against the tables built here. There is no signature checking
//! beyond arity — a native function's handler is responsible for
//! interpreting whatever payloads it finds on `FUNCTION_PARAM`.

use hashbrown::HashMap;
use std::rc::Rc;

use crate::errors::RuntimeError;
use crate::values::Value;

/// A bound native function. `arity` is checked before calling `handler`'s
/// prologue pops exactly that many values off `FUNCTION_PARAM`.
pub struct NativeFunction {
    pub arity: usize,
    pub handler: Rc<dyn Fn(&[Value]) -> Result<Value, RuntimeError>>,
}

impl NativeFunction {
    pub fn new(
        arity: usize,
        handler: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        Self {
            arity,
            handler: Rc::new(handler),
        }
    }
}

/// A getter/setter pair bound under a native class's property name.
pub struct PropertyDescriptor {
    pub get: Rc<dyn Fn(&Value) -> Result<Value, RuntimeError>>,
    pub set: Option<Rc<dyn Fn(&Value, &Value) -> Result<(), RuntimeError>>>,
}

/// A bound native class: a constructor plus its property table.
pub struct NativeClass {
    pub construct: Rc<dyn Fn(&[Value]) -> Result<Value, RuntimeError>>,
    pub properties: HashMap<String, PropertyDescriptor>,
}

/// Host-populated binding tables, consulted by `CallNativeFunction` and
/// `CreateNativeClassInstance`.
#[derive(Default)]
pub struct NativeRegistry {
    functions: HashMap<String, NativeFunction>,
    classes: HashMap<String, NativeClass>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_function(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        handler: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) {
        self.functions
            .insert(name.into(), NativeFunction::new(arity, handler));
    }

    pub fn bind_class(&mut self, tag: impl Into<String>, class: NativeClass) {
        self.classes.insert(tag.into(), class);
    }

    pub fn function(&self, name: &str) -> Result<&NativeFunction, RuntimeError> {
        self.functions
            .get(name)
            .ok_or_else(|| RuntimeError::UnboundNativeFunction(name.to_string()))
    }

    pub fn class(&self, tag: &str) -> Result<&NativeClass, RuntimeError> {
        self.classes
            .get(tag)
            .ok_or_else(|| RuntimeError::UnboundNativeClass(tag.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_and_call_a_native_function() {
        let mut registry = NativeRegistry::new();
        registry.bind_function("abs", 1, |args| {
            Ok(Value::int(args[0].as_int().unwrap_or(0).abs()))
        });
        let f = registry.function("abs").unwrap();
        assert_eq!(f.arity, 1);
        let result = (f.handler)(&[Value::int(-5)]).unwrap();
        assert_eq!(result.as_int(), Some(5));
    }

    #[test]
    fn unbound_function_is_an_error() {
        let registry = NativeRegistry::new();
        assert!(registry.function("missing").is_err());
    }

    #[test]
    fn unbound_class_is_an_error() {
        let registry = NativeRegistry::new();
        assert!(registry.class("Missing").is_err());
    }
}
