//! Script-defined object instances.
//!
//! A `ScriptObject` is an ordered mapping from member name to [`Value`],
//! plus a mapping from method name to the bytecode offset of that method's
//! body. Order matters because member initializers run in declaration
//! order during `CreateClassInstance`/`AddMember`.

use hashbrown::HashMap;

use super::Value;

#[derive(Debug)]
pub struct ScriptObject {
    pub class_name: String,
    members: Vec<(String, Value)>,
    methods: HashMap<String, u64>,
}

impl ScriptObject {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            members: Vec::new(),
            methods: HashMap::new(),
        }
    }

    /// Appends a member in declaration order. Later inserts of the same
    /// name overwrite the value but keep the original position.
    pub fn add_member(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.members.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.members.push((name, value));
        }
    }

    pub fn get_member(&self, name: &str) -> Option<Value> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(n, _)| n.as_str())
    }

    pub fn bind_method(&mut self, name: impl Into<String>, function_handle: u64) {
        self.methods.insert(name.into(), function_handle);
    }

    pub fn get_method(&self, name: &str) -> Option<u64> {
        self.methods.get(name).copied()
    }
}
