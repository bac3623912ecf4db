//! Vela - a small scripting language with a stack-machine bytecode VM.
//!
//! This crate is the public facade over `vela-core`: it re-exports the
//! compile/run API and adds `ariadne`-backed error rendering for hosts
//! (principally the `vela` CLI binary) that want to print diagnostics to a
//! terminal.
//!
//! # Quick start
//!
//! ```
//! use vela::{compile, run, CompileOptions, RunOptions};
//! use vela_core::native::NativeRegistry;
//! use vela_core::stdlib;
//!
//! let source = "module main\nvar x = 2 + 3 * 4;\nprint(x);\n";
//! let module = compile(source, "main.vela", &CompileOptions::default()).unwrap();
//!
//! let mut natives = NativeRegistry::new();
//! stdlib::install(&mut natives);
//!
//! run(&module, &natives, &RunOptions::default()).unwrap();
//! ```

pub mod error_renderer;

pub use vela_core::api::{compile, run, CompileOptions, CompiledModule, Error, RunOptions};
pub use vela_core::diagnostics::{Diagnostic, Severity};
pub use vela_core::native::NativeRegistry;

pub use error_renderer::{render_error, render_error_to, render_error_to_string};
