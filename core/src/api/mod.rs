//! The public API surface: parse + lower a source file to bytecode, then
//! run it. Mirrors the teacher's own `api` module's re-export style.

pub mod error;
pub mod options;

pub use error::Error;
pub use options::{CompileOptions, RunOptions};

use crate::compiler;
use crate::diagnostics::Span;
use crate::native::NativeRegistry;
use crate::parser;
use crate::vm::Vm;

/// Bytecode plus the source text it came from, kept together so a
/// `Runtime` error can still be rendered against the original file.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    bytecode: Vec<u8>,
    source: String,
    file: String,
}

impl CompiledModule {
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Parses and lowers `source` (named `file` for diagnostics) into bytecode.
pub fn compile(
    source: &str,
    file: &str,
    options: &CompileOptions,
) -> Result<CompiledModule, Error> {
    tracing::debug!(file, bytes = source.len(), "loading module");
    let ast = parser::parse(source, file).map_err(|diagnostic| Error::Compilation {
        diagnostics: vec![diagnostic],
        source: source.to_string(),
    })?;

    let bytecode =
        compiler::lower(&ast, options).map_err(|diagnostics| Error::Compilation {
            diagnostics,
            source: source.to_string(),
        })?;

    Ok(CompiledModule {
        bytecode,
        source: source.to_string(),
        file: file.to_string(),
    })
}

/// Runs previously compiled bytecode against a host-provided native
/// registry. There is no return value on success: side effects (e.g.
/// `print`) are the only observable output, matching the source
/// language's lack of a top-level expression result.
pub fn run(
    module: &CompiledModule,
    natives: &NativeRegistry,
    options: &RunOptions,
) -> Result<(), Error> {
    tracing::debug!(file = %module.file, "starting module");
    let mut vm = Vm::new(&module.bytecode, natives, options);
    vm.run().map_err(|error| Error::Runtime {
        error,
        source: module.source.clone(),
    })
}

/// A synthetic span over the whole file, used when a diagnostic has no
/// more precise location (e.g. a parse failure with no recovered AST).
pub(crate) fn whole_file_span(file: &str) -> Span {
    Span::synthetic(file)
}
