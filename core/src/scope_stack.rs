//! Lowering-time scope tracking.
//!
//! The lowering pass keeps an integer `level` starting at `-1` (global) and
//! a stack of [`Level`] records, one per nested block. `increase_block`/
//! `decrease_block` push and pop levels and are the compile-time mirror of
//! the `IncreaseBlockLevel`/`DecreaseBlockLevel` instructions the same call
//! emits into the stream.

use hashbrown::HashMap;

use crate::ast::ClassMember;

/// What kind of block introduced a [`Level`]; recorded so lowering can tell
/// a function body apart from an `if`/`for` body when synthesizing
/// `LeaveBlock` counts for `Return`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Global,
    Function,
    IfStatement,
    ElseStatement,
    Undefined,
    Label,
}

/// A declared variable's scope-stack record. `is_class` and `class_ast`
/// start `false`/`None` and are promoted by `New` once the variable is
/// known to hold a class instance.
#[derive(Debug, Clone)]
pub struct VarSlot {
    pub is_class: bool,
    pub class_name: Option<String>,
}

impl VarSlot {
    pub fn plain() -> Self {
        Self {
            is_class: false,
            class_name: None,
        }
    }
}

/// One lowering-time scope frame.
#[derive(Debug)]
pub struct Level {
    pub block_type: BlockType,
    /// Ordered so `fnInScope` can report the first declared match; overload
    /// resolution is by arity only.
    functions: Vec<(String, usize)>,
    variables: HashMap<String, VarSlot>,
    classes: HashMap<String, ()>,
}

impl Level {
    fn new(block_type: BlockType) -> Self {
        Self {
            block_type,
            functions: Vec::new(),
            variables: HashMap::new(),
            classes: HashMap::new(),
        }
    }
}

/// Result of a function lookup: arity mismatches are reported distinctly
/// from "no such function" so the caller can raise `TOO_MANY_ARGS`/
/// `TOO_FEW_ARGS` instead of `FUNCTION_NOT_FOUND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnLookup {
    Found,
    TooFewArgs { expected: usize },
    TooManyArgs { expected: usize },
    NotFound,
}

pub struct ScopeStack {
    levels: Vec<Level>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// Starts with the single global level (compile-time `level == -1`).
    pub fn new() -> Self {
        Self {
            levels: vec![Level::new(BlockType::Global)],
        }
    }

    /// Compile-time `level`: `-1` for global, `0` and up for nested blocks.
    pub fn level(&self) -> i64 {
        self.levels.len() as i64 - 2
    }

    pub fn is_global(&self) -> bool {
        self.levels.len() == 1
    }

    pub fn increase_block(&mut self, block_type: BlockType) {
        self.levels.push(Level::new(block_type));
    }

    pub fn decrease_block(&mut self) {
        debug_assert!(self.levels.len() > 1, "cannot decrease past the global level");
        self.levels.pop();
    }

    pub fn current_block_type(&self) -> BlockType {
        self.levels.last().expect("scope stack is never empty").block_type
    }

    /// Declares a variable in the current level. Returns `false` if the
    /// mangled name already occupies a variable slot in *this* level (the
    /// caller is responsible for the module/function/class-slot parts of
    /// `isIdentifier`).
    pub fn declare_variable(&mut self, mangled: &str, slot: VarSlot) -> bool {
        let level = self.levels.last_mut().expect("scope stack is never empty");
        if level.variables.contains_key(mangled) {
            return false;
        }
        level.variables.insert(mangled.to_string(), slot);
        true
    }

    /// Promotes an already-declared variable to a class instance, per
    /// `New`'s slot-record update.
    pub fn promote_to_class(&mut self, mangled: &str, class_name: &str) {
        for level in self.levels.iter_mut().rev() {
            if let Some(slot) = level.variables.get_mut(mangled) {
                slot.is_class = true;
                slot.class_name = Some(class_name.to_string());
                return;
            }
        }
    }

    /// `varInScope`: walks from the current level down to global.
    pub fn var_in_scope(&self, mangled: &str) -> Option<&VarSlot> {
        for level in self.levels.iter().rev() {
            if let Some(slot) = level.variables.get(mangled) {
                return Some(slot);
            }
        }
        None
    }

    /// `mangled` is the function's mangled name *without* the `_A<arity>`
    /// suffix; arity is tracked alongside it so a later call site with a
    /// mismatched argument count can be told apart from "not found".
    pub fn declare_function(&mut self, mangled_without_arity: &str, arity: usize) -> bool {
        let level = self.levels.last_mut().expect("scope stack is never empty");
        if level
            .functions
            .iter()
            .any(|(name, a)| name == mangled_without_arity && *a == arity)
        {
            return false;
        }
        level.functions.push((mangled_without_arity.to_string(), arity));
        true
    }

    /// `fnInScope`: walks from the current level down to global.
    pub fn fn_in_scope(&self, mangled_without_arity: &str, call_arity: usize) -> FnLookup {
        let mut best_mismatch: Option<FnLookup> = None;
        for level in self.levels.iter().rev() {
            for (name, arity) in &level.functions {
                if name == mangled_without_arity {
                    if *arity == call_arity {
                        return FnLookup::Found;
                    }
                    best_mismatch.get_or_insert(if call_arity < *arity {
                        FnLookup::TooFewArgs { expected: *arity }
                    } else {
                        FnLookup::TooManyArgs { expected: *arity }
                    });
                }
            }
        }
        best_mismatch.unwrap_or(FnLookup::NotFound)
    }

    pub fn declare_class(&mut self, mangled: &str) -> bool {
        let level = self.levels.last_mut().expect("scope stack is never empty");
        if level.classes.contains_key(mangled) {
            return false;
        }
        level.classes.insert(mangled.to_string(), ());
        true
    }

    pub fn class_in_scope(&self, mangled: &str) -> bool {
        self.levels.iter().rev().any(|level| level.classes.contains_key(mangled))
    }

    /// Counts levels from the current one up to (but not including) the
    /// nearest enclosing `Function` level. `Return` lowering uses this to
    /// know how many `LeaveBlock`s to emit before the final `LeaveFunction`.
    pub fn non_function_levels_since_function(&self) -> usize {
        let mut count = 0;
        for level in self.levels.iter().rev() {
            if level.block_type == BlockType::Function {
                break;
            }
            count += 1;
        }
        count
    }
}

/// The compile-time `self` pair threaded through lowering: the class tag,
/// the instance's mangled name, and the class body it was constructed from.
/// `None` (held by the caller, not represented here) means `SELF_GLOBAL`.
#[derive(Debug, Clone)]
pub struct SelfContext {
    pub class_tag: String,
    pub mangled_name: String,
    pub class_members: Vec<ClassMember>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_level_starts_at_minus_one() {
        let stack = ScopeStack::new();
        assert_eq!(stack.level(), -1);
        assert!(stack.is_global());
    }

    #[test]
    fn increase_and_decrease_block_tracks_level() {
        let mut stack = ScopeStack::new();
        stack.increase_block(BlockType::Function);
        assert_eq!(stack.level(), 0);
        stack.increase_block(BlockType::IfStatement);
        assert_eq!(stack.level(), 1);
        stack.decrease_block();
        assert_eq!(stack.level(), 0);
        stack.decrease_block();
        assert_eq!(stack.level(), -1);
    }

    #[test]
    fn declare_variable_rejects_duplicate_in_same_level() {
        let mut stack = ScopeStack::new();
        assert!(stack.declare_variable("$_Mmain_Ix", VarSlot::plain()));
        assert!(!stack.declare_variable("$_Mmain_Ix", VarSlot::plain()));
    }

    #[test]
    fn var_in_scope_walks_outward() {
        let mut stack = ScopeStack::new();
        stack.declare_variable("$_Mmain_Ix", VarSlot::plain());
        stack.increase_block(BlockType::IfStatement);
        assert!(stack.var_in_scope("$_Mmain_Ix").is_some());
        assert!(stack.var_in_scope("$_Mmain_Iy").is_none());
    }

    #[test]
    fn var_declared_in_inner_block_is_not_visible_outside() {
        let mut stack = ScopeStack::new();
        stack.increase_block(BlockType::IfStatement);
        stack.declare_variable("$_Mmain_Iy", VarSlot::plain());
        stack.decrease_block();
        assert!(stack.var_in_scope("$_Mmain_Iy").is_none());
    }

    #[test]
    fn fn_in_scope_reports_found_on_exact_arity() {
        let mut stack = ScopeStack::new();
        stack.declare_function("$_Mmain_Iadd_A2", 2);
        assert_eq!(stack.fn_in_scope("$_Mmain_Iadd_A2", 2), FnLookup::Found);
    }

    #[test]
    fn fn_in_scope_reports_too_few_and_too_many() {
        let mut stack = ScopeStack::new();
        stack.declare_function("$_Mmain_Iadd_A2", 2);
        assert_eq!(
            stack.fn_in_scope("$_Mmain_Iadd_A2", 1),
            FnLookup::TooFewArgs { expected: 2 }
        );
        assert_eq!(
            stack.fn_in_scope("$_Mmain_Iadd_A2", 3),
            FnLookup::TooManyArgs { expected: 2 }
        );
    }

    #[test]
    fn fn_in_scope_reports_not_found() {
        let stack = ScopeStack::new();
        assert_eq!(stack.fn_in_scope("$_Mmain_Imissing_A0", 0), FnLookup::NotFound);
    }

    #[test]
    fn promote_to_class_updates_slot_in_enclosing_level() {
        let mut stack = ScopeStack::new();
        stack.declare_variable("$_Mmain_Ip", VarSlot::plain());
        stack.increase_block(BlockType::Undefined);
        stack.promote_to_class("$_Mmain_Ip", "Point");
        let slot = stack.var_in_scope("$_Mmain_Ip").unwrap();
        assert!(slot.is_class);
        assert_eq!(slot.class_name.as_deref(), Some("Point"));
    }

    #[test]
    fn declare_class_rejects_duplicate() {
        let mut stack = ScopeStack::new();
        assert!(stack.declare_class("$_Mmain_CPoint"));
        assert!(!stack.declare_class("$_Mmain_CPoint"));
        assert!(stack.class_in_scope("$_Mmain_CPoint"));
    }
}
