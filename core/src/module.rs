//! The `Module`: owns the frame stack, the label table, the global
//! function table, and the call chain for one running program.
//!
//! Frame index `0` is the global frame (compile-time level `-1`); frame
//! index `n` is level `n - 1`. `IncreaseBlockLevel`/`DecreaseBlockLevel`
//! push/pop frames here in lockstep with the VM's `block_level` counter.

use hashbrown::HashMap;

use crate::errors::RuntimeError;
use crate::stack_frame::StackFrame;

#[derive(Debug, Default)]
pub struct Module {
    frames: Vec<StackFrame>,
    /// `CreateBlock` label table: block id -> body stream position.
    labels: HashMap<i32, u64>,
    /// `CreateFunction` table: mangled function name -> body stream position.
    global_functions: HashMap<String, u64>,
    /// Return addresses pushed by `CallFunction`, popped by `LeaveFunction`.
    call_chain: Vec<u64>,
    /// Pushed/popped by `Import(file, ...)` while lowering an inlined module.
    current_module_stack: Vec<String>,
}

impl Module {
    pub fn new() -> Self {
        Self {
            frames: vec![StackFrame::new()],
            ..Default::default()
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(StackFrame::new());
    }

    pub fn pop_frame(&mut self) -> Option<StackFrame> {
        if self.frames.len() <= 1 {
            return None;
        }
        self.frames.pop()
    }

    pub fn current_frame(&self) -> &StackFrame {
        self.frames.last().expect("module always has a global frame")
    }

    pub fn current_frame_mut(&mut self) -> &mut StackFrame {
        self.frames
            .last_mut()
            .expect("module always has a global frame")
    }

    pub fn global_frame_mut(&mut self) -> &mut StackFrame {
        self.frames.first_mut().expect("module always has a global frame")
    }

    /// `LoadVariable`: search from the current (innermost) frame down to
    /// global.
    pub fn find_var(&self, name: &str) -> Option<&crate::values::Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn register_label(&mut self, id: i32, pos: u64) {
        self.labels.insert(id, pos);
    }

    pub fn label_pos(&self, id: i32) -> Result<u64, RuntimeError> {
        self.labels
            .get(&id)
            .copied()
            .ok_or_else(|| RuntimeError::MalformedBytecode(format!("unknown block label {id}")))
    }

    pub fn register_function(&mut self, name: &str, pos: u64) {
        self.global_functions.insert(name.to_string(), pos);
    }

    pub fn function_pos(&self, name: &str) -> Result<u64, RuntimeError> {
        self.global_functions
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UndeclaredIdentifier(name.to_string()))
    }

    pub fn call_depth(&self) -> usize {
        self.call_chain.len()
    }

    /// Sets `last_if_result` on the frame `levels` up from the current one
    /// (the current frame itself is `levels == 0`). `LoopBreak`/
    /// `LoopContinue` use this to signal the loop-label frame their
    /// `read_level -= levels` unwinds back into.
    pub fn set_if_result_levels_up(&mut self, levels: i32, value: bool) {
        let up = levels.max(0) as usize;
        let idx = self.frames.len().saturating_sub(1 + up);
        if let Some(frame) = self.frames.get_mut(idx) {
            frame.last_if_result = value;
        }
    }

    pub fn push_return(&mut self, pos: u64) {
        self.call_chain.push(pos);
    }

    pub fn pop_return(&mut self) -> Result<u64, RuntimeError> {
        self.call_chain
            .pop()
            .ok_or_else(|| RuntimeError::MalformedBytecode("call chain underflow".into()))
    }

    /// Rebinds an existing slot to share `value`'s cell, searching from the
    /// innermost frame outward. Used by `EndClassInstance` to bind the
    /// finished object into the slot `CreateVar` already reserved for it,
    /// by reference rather than by copy.
    pub fn rebind_var(&mut self, name: &str, value: crate::values::Value) -> Result<(), RuntimeError> {
        for frame in self.frames.iter_mut().rev() {
            if frame.get(name).is_some() {
                frame.bind_reference(name, value);
                return Ok(());
            }
        }
        Err(RuntimeError::UndeclaredIdentifier(name.to_string()))
    }

    pub fn enter_module(&mut self, name: &str) {
        self.current_module_stack.push(name.to_string());
    }

    pub fn leave_module(&mut self) {
        self.current_module_stack.pop();
    }

    pub fn current_module(&self) -> Option<&str> {
        self.current_module_stack.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::Value;

    #[test]
    fn global_frame_survives_pop_frame_on_empty_stack() {
        let mut module = Module::new();
        assert!(module.pop_frame().is_none());
    }

    #[test]
    fn find_var_searches_innermost_to_outermost() {
        let mut module = Module::new();
        module.global_frame_mut().create_var("x");
        module
            .global_frame_mut()
            .get("x")
            .unwrap()
            .copy_assign(&Value::int(1))
            .unwrap();
        module.push_frame();
        module.current_frame_mut().create_var("y");
        assert_eq!(module.find_var("x").unwrap().as_int(), Some(1));
        assert!(module.find_var("y").is_some());
        module.pop_frame();
        assert!(module.find_var("y").is_none());
    }

    #[test]
    fn call_chain_round_trips() {
        let mut module = Module::new();
        module.push_return(42);
        assert_eq!(module.pop_return().unwrap(), 42);
        assert!(module.pop_return().is_err());
    }

    #[test]
    fn rebind_var_shares_the_new_cell_with_the_existing_slot() {
        let mut module = Module::new();
        module.global_frame_mut().create_var("p");
        let shared = Value::int(7);
        module.rebind_var("p", shared.clone()).unwrap();
        assert_eq!(module.find_var("p").unwrap().as_int(), Some(7));
        shared.copy_assign(&Value::int(8)).unwrap();
        assert_eq!(module.find_var("p").unwrap().as_int(), Some(8));
    }

    #[test]
    fn rebind_var_errors_on_unknown_name() {
        let mut module = Module::new();
        assert!(module.rebind_var("nope", Value::null()).is_err());
    }

    #[test]
    fn labels_and_functions_are_registered_and_resolved() {
        let mut module = Module::new();
        module.register_label(3, 100);
        module.register_function("$_Mmain_Ifoo_A0", 200);
        assert_eq!(module.label_pos(3).unwrap(), 100);
        assert_eq!(module.function_pos("$_Mmain_Ifoo_A0").unwrap(), 200);
        assert!(module.label_pos(99).is_err());
    }
}
