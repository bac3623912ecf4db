//! Vela - a small scripting language with a stack-machine bytecode VM.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};
use vela::{compile, render_error, run, CompileOptions, RunOptions};
use vela_core::native::NativeRegistry;
use vela_core::stdlib;

/// Run a Vela source file.
#[derive(Parser, Debug)]
#[command(name = "vela")]
#[command(about = "Run a Vela source file", long_about = None)]
struct Args {
    /// Path to the `.vela` source file to run.
    source_file: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_env("VELA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap();

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let source = match std::fs::read_to_string(&args.source_file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", args.source_file.display());
            return ExitCode::FAILURE;
        }
    };

    let file = args.source_file.display().to_string();

    let module = match compile(&source, &file, &CompileOptions::default()) {
        Ok(module) => module,
        Err(error) => {
            render_error(&error);
            return ExitCode::FAILURE;
        }
    };

    let mut natives = NativeRegistry::new();
    stdlib::install(&mut natives);

    match run(&module, &natives, &RunOptions::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            render_error(&error);
            ExitCode::FAILURE
        }
    }
}
