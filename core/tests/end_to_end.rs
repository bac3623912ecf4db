//! End-to-end compile+run coverage for the whole pipeline: source text in,
//! bytecode out, bytecode executed against a native registry.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use vela_core::api::{compile, run, CompileOptions, Error, RunOptions};
use vela_core::native::NativeRegistry;
use vela_core::stdlib;

/// A registry with the stdlib installed plus `print` rerouted into an
/// in-memory buffer so assertions don't have to scrape stdout.
fn test_registry() -> (NativeRegistry, Rc<RefCell<Vec<String>>>) {
    let mut registry = NativeRegistry::new();
    stdlib::install(&mut registry);
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    registry.bind_function("print", 1, move |args| {
        sink.borrow_mut().push(args[0].str_value());
        Ok(vela_core::values::Value::null())
    });
    (registry, log)
}

fn run_source(source: &str) -> Result<Vec<String>, Error> {
    let module = compile(source, "test.vela", &CompileOptions::default())?;
    let (registry, log) = test_registry();
    run(&module, &registry, &RunOptions::default())?;
    Ok(Rc::try_unwrap(log).unwrap().into_inner())
}

#[test]
fn arithmetic_and_print() {
    let output = run_source(
        r#"
        module main
        var x = 2 + 3 * 4;
        print(x);
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["14"]);
}

#[test]
fn if_else_chooses_the_taken_branch() {
    let output = run_source(
        r#"
        module main
        var x = 5;
        if (x > 10) {
            print("big");
        } else {
            print("small");
        }
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["small"]);
}

#[test]
fn function_call_with_return_value() {
    let output = run_source(
        r#"
        module main
        fn add(a, b) {
            return a + b;
        }
        print(add(3, 4));
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["7"]);
}

#[test]
fn for_loop_sums_into_an_accumulator() {
    let output = run_source(
        r#"
        module main
        var total = 0;
        for (var i = 0; i < 5; i = i + 1) {
            total = total + i;
        }
        print(total);
        "#,
    )
    .unwrap();
    assert_eq!(output, vec!["10"]);
}

#[test]
fn reassigning_a_literal_initialized_field_halts_on_const_violation() {
    let source = r#"
        module main
        class Point {
            var x = 1;
        }
        var p = new Point();
        p.x = 2;
        "#;
    let module = compile(source, "test.vela", &CompileOptions::default()).unwrap();
    let (registry, _log) = test_registry();
    let err = run(&module, &registry, &RunOptions::default()).unwrap_err();
    match err {
        Error::Runtime { error, .. } => {
            assert_eq!(error.to_string(), "cannot change the value of a const");
        }
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn unresolved_identifier_fails_compilation_without_running() {
    let source = r#"
        module main
        print(never_declared);
        "#;
    let err = compile(source, "test.vela", &CompileOptions::default()).unwrap_err();
    match err {
        Error::Compilation { diagnostics, .. } => {
            assert!(diagnostics
                .iter()
                .any(|d| d.code == Some("UNDECLARED_IDENTIFIER")));
        }
        other => panic!("expected a compilation error, got {other:?}"),
    }
}
