//! The public error surface returned by [`crate::api::compile`]/[`crate::api::run`].
//!
//! Mirrors the teacher's own `api::error` shape (`Compilation`/`Runtime`/
//! `Api` variants, each carrying the source text so a host can render it
//! without going back to disk), narrowed to the two diagnostic families
//! this crate actually produces.

use std::fmt;

use crate::diagnostics::Diagnostic;
use crate::errors::RuntimeError;

#[derive(Debug, Clone)]
pub enum Error {
    /// One or more [`Diagnostic`]s raised while lowering the source.
    Compilation {
        diagnostics: Vec<Diagnostic>,
        source: String,
    },
    /// A fatal VM halt, rendered the same way a compile diagnostic is.
    Runtime {
        error: RuntimeError,
        source: String,
    },
    /// Host-side misuse, e.g. calling `run` on bytecode from a different
    /// `compile` call than the one that produced it.
    Api(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compilation { diagnostics, .. } => {
                write!(f, "{} compile error(s)", diagnostics.len())
            }
            Error::Runtime { error, .. } => write!(f, "runtime error: {error}"),
            Error::Api(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}
