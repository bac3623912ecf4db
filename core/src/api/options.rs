//! Host-facing knobs for compiling and running a module.
//!
//! Plain structs with a `Default` impl, not builders — mirrors how the
//! teacher's own `api::options` module is shaped, just with the merge
//! machinery dropped since Vela has no engine-level option bundling (each
//! compile and each run is configured independently).

/// Options for lowering a parsed [`crate::ast::ModuleAst`] into bytecode.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Write `CreateBlock`/`CreateFunction` label records to the very
    /// start of the stream instead of inline at their declaration point.
    /// Defaults to `false`: this implementation always lays bodies out
    /// inline (see `DESIGN.md`), so flipping this currently has no
    /// observable effect — it is kept because the option is part of the
    /// documented compile-time surface, not because two layouts are
    /// wired up.
    pub write_labels_to_beginning: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            write_labels_to_beginning: false,
        }
    }
}

/// Options for running already-compiled bytecode.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Caps nested script function/method calls (`CallFunction`/
    /// `InvokeMethod`); exceeded depth is a [`crate::errors::RuntimeError::CallChainDepthExceeded`].
    pub max_call_chain_depth: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_call_chain_depth: 1000,
        }
    }
}
