//! The per-frame expression stack.
//!
//! Each `StackFrame` owns one `Evaluator`. Binary/unary instructions pop
//! their operands off the top of this stack and push a fresh result;
//! `LoadVariable` pushes a *shared* reference to a frame slot (so writing
//! through the evaluator's top writes through to the owning slot).

use crate::errors::RuntimeError;
use crate::values::Value;

#[derive(Debug, Default)]
pub struct Evaluator {
    stack: Vec<Value>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::MalformedBytecode("evaluator stack underflow".into()))
    }

    pub fn top(&self) -> Option<&Value> {
        self.stack.last()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Pops right-then-left (the evaluator holds left-below-right) and
    /// pushes the result of applying `op`.
    pub fn binary(
        &mut self,
        op: impl FnOnce(&Value, &Value) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = op(&left, &right)?;
        self.push(result);
        Ok(())
    }

    pub fn unary(
        &mut self,
        op: impl FnOnce(&Value) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let operand = self.pop()?;
        let result = op(&operand)?;
        self.push(result);
        Ok(())
    }

    /// `OpAssign`: pop right, pop left, copy right's payload into left,
    /// push left back (so `a = b = 1` chains left to right).
    pub fn assign(&mut self) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        left.copy_assign(&right)?;
        self.push(left);
        Ok(())
    }

    /// `OpAddAssign` etc.: apply `op(left, right)` and copy the result's
    /// payload back into `left` in place.
    pub fn assign_with(
        &mut self,
        op: impl FnOnce(&Value, &Value) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = op(&left, &right)?;
        left.copy_assign(&result)?;
        self.push(left);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values;

    #[test]
    fn binary_pops_both_operands_and_pushes_one_result() {
        let mut eval = Evaluator::new();
        eval.push(Value::int(2));
        eval.push(Value::int(3));
        eval.binary(values::add).unwrap();
        assert_eq!(eval.len(), 1);
        assert_eq!(eval.pop().unwrap().as_int(), Some(5));
    }

    #[test]
    fn assign_copies_payload_and_leaves_left_on_top() {
        let mut eval = Evaluator::new();
        let left = Value::int(1);
        eval.push(left.clone());
        eval.push(Value::int(9));
        eval.assign().unwrap();
        assert_eq!(left.as_int(), Some(9));
        assert_eq!(eval.pop().unwrap().as_int(), Some(9));
    }

    #[test]
    fn assign_fails_on_const_destination() {
        let mut eval = Evaluator::new();
        let left = Value::int(1);
        left.set_const(true);
        eval.push(left);
        eval.push(Value::int(9));
        assert!(eval.assign().is_err());
    }

    #[test]
    fn pop_on_empty_stack_errors_instead_of_panicking() {
        let mut eval = Evaluator::new();
        assert!(eval.pop().is_err());
    }
}
