pub mod api;
pub mod ast;
pub mod compiler;
pub mod diagnostics;
pub mod errors;
pub mod evaluator;
pub mod mangle;
pub mod module;
pub mod native;
pub mod parser;
pub mod scope_stack;
pub mod stack_frame;
pub mod stdlib;
pub mod values;
pub mod vm;

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_type_inference() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{fmt, EnvFilter};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
