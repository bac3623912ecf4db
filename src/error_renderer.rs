//! Beautiful error rendering using `ariadne`.
//!
//! Compile-time diagnostics get the full source-snippet treatment; a
//! runtime halt has no span to anchor a snippet to (see
//! [`vela_core::errors::RuntimeError`]), so it is printed as a plain
//! message instead. Both paths write to the same writer, so a host that
//! only cares about "did it print something readable" doesn't need to
//! branch on which family it got.

use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;
use vela_core::api::Error;
use vela_core::diagnostics::{Diagnostic, Severity};

/// Render an error with rich formatting to stderr.
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer.
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a `String` (useful for tests).
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(error: &Error, writer: &mut dyn Write, use_color: bool) -> std::io::Result<()> {
    match error {
        Error::Compilation { diagnostics, source } => {
            render_diagnostics(source, diagnostics, writer, use_color)
        }
        Error::Runtime { error, .. } => writeln!(writer, "runtime error: {error}"),
        Error::Api(msg) => writeln!(writer, "error: {msg}"),
    }
}

fn render_diagnostics(
    source: &str,
    diagnostics: &[Diagnostic],
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    for diag in diagnostics {
        let mut colors = ColorGenerator::new();
        colors.next();

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };

        let file = diag.span.file.clone();
        let range = diag.span.start..diag.span.end;

        let mut report = Report::build(kind, (file.clone(), range.clone()))
            .with_message(&diag.message)
            .with_config(ariadne::Config::default().with_color(use_color));

        if let Some(code) = diag.code {
            report = report.with_code(code);
        }

        let color = colors.next();
        report = report.with_label(
            Label::new((file.clone(), range))
                .with_message(&diag.message)
                .with_color(color),
        );

        for related in &diag.related {
            let color = colors.next();
            report = report.with_label(
                Label::new((file.clone(), related.span.start..related.span.end))
                    .with_message(&related.message)
                    .with_color(color),
            );
        }

        for help_msg in &diag.help {
            report = report.with_help(help_msg);
        }

        report
            .finish()
            .write((file, Source::from(source)), &mut *writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_core::api::compile;
    use vela_core::api::CompileOptions;

    #[test]
    fn renders_an_undeclared_identifier_diagnostic() {
        let source = "module main\nprint(y);\n";
        let result = compile(source, "main.vela", &CompileOptions::default());

        assert!(result.is_err());
        let output = render_error_to_string(&result.unwrap_err());
        assert!(output.contains("undeclared") || output.contains("UNDECLARED"));
    }
}
