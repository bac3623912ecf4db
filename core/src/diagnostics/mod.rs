//! Diagnostic types shared by the lowering pass and the VM.
//!
//! Compile-time diagnostics accumulate on the lowering state and are never
//! turned into a runtime halt; the VM in turn never produces one of these.
//! Both are rendered through the same `ariadne`-backed path (see the root
//! `vela` crate's `error_renderer`), but the two families stay separate
//! all the way down, per the error-handling design.

use std::fmt;

/// A half-open byte range into the original source text, plus the file it
/// came from. Every AST node and every diagnostic carries one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub file: String,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(file: impl Into<String>, start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            start,
            end,
            line,
            column,
        }
    }

    /// A span with no useful source location, used for synthesized nodes
    /// (e.g. the implicit `return;` appended to non-returning functions).
    pub fn synthetic(file: impl Into<String>) -> Self {
        Self::new(file, 0, 0, 0, 0)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A secondary location attached to a diagnostic, e.g. "previously declared
/// here". Gives the ariadne renderer its breadcrumb labels.
#[derive(Debug, Clone)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}

/// One compile-time diagnostic. Carries a stable `code` (the `CompileErrorKind`
/// tag) so hosts can match on it without parsing the message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub code: Option<&'static str>,
    pub related: Vec<RelatedInfo>,
    pub help: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span, code: &'static str) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            code: Some(code),
            related: Vec::new(),
            help: Vec::new(),
        }
    }

    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(RelatedInfo {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

/// Accumulates diagnostics during lowering. Sorted by `(file, line)` before
/// being handed to the host, as the external CLI surface requires.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by(|a, b| (&a.span.file, a.span.line).cmp(&(&b.span.file, b.span.line)));
        self.diagnostics
    }
}
