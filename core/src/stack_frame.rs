//! A single block/function activation record.
//!
//! Holds the frame's own variable slots, its `Evaluator`, and the
//! `last_if_result` flag `ElseStatement`/`LoopBreak`/`LoopContinue`
//! consult. Frames are owned by the `Module`'s level stack; dropping a
//! frame eagerly drops its slots' `Rc` references.

use hashbrown::HashMap;

use crate::errors::RuntimeError;
use crate::evaluator::Evaluator;
use crate::values::Value;

#[derive(Debug)]
pub struct StackFrame {
    slots: HashMap<String, Value>,
    pub evaluator: Evaluator,
    pub last_if_result: bool,
}

impl StackFrame {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            evaluator: Evaluator::new(),
            last_if_result: false,
        }
    }

    pub fn create_var(&mut self, name: &str) {
        self.slots.insert(name.to_string(), Value::null());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }

    /// `ClearVar`: drops the payload of a matching slot without removing
    /// the slot itself.
    pub fn clear_var(&mut self, name: &str) -> Result<(), RuntimeError> {
        let slot = self
            .slots
            .get(name)
            .ok_or_else(|| RuntimeError::UndeclaredIdentifier(name.to_string()))?;
        slot.copy_assign(&Value::null())
    }

    /// `DeleteVar`: removes the slot entirely.
    pub fn delete_var(&mut self, name: &str) {
        self.slots.remove(name);
    }

    /// Reference-assignment: the slot now shares `value`'s underlying
    /// cell, rather than copying its payload.
    pub fn bind_reference(&mut self, name: &str, value: Value) {
        self.slots.insert(name.to_string(), value);
    }
}

impl Default for StackFrame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_var_starts_null() {
        let mut frame = StackFrame::new();
        frame.create_var("x");
        assert!(frame.get("x").unwrap().is_null());
    }

    #[test]
    fn clear_var_keeps_slot_but_resets_payload() {
        let mut frame = StackFrame::new();
        frame.create_var("x");
        frame.get("x").unwrap().copy_assign(&Value::int(5)).unwrap();
        frame.clear_var("x").unwrap();
        assert!(frame.get("x").unwrap().is_null());
    }

    #[test]
    fn delete_var_removes_the_slot() {
        let mut frame = StackFrame::new();
        frame.create_var("x");
        frame.delete_var("x");
        assert!(frame.get("x").is_none());
    }

    #[test]
    fn bind_reference_shares_the_underlying_cell() {
        let mut frame = StackFrame::new();
        let shared = Value::int(1);
        frame.bind_reference("a", shared.clone());
        frame.get("a").unwrap().copy_assign(&Value::int(42)).unwrap();
        assert_eq!(shared.as_int(), Some(42));
    }
}
