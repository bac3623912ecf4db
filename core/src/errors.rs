//! Compile-time and runtime error taxonomies.
//!
//! The two families never cross: lowering only ever produces a
//! [`CompileErrorKind`] (accumulated on a [`crate::diagnostics::DiagnosticSink`]),
//! and the VM only ever produces a [`RuntimeError`], which is fatal and
//! printed to stderr before the process exits non-zero.

use crate::diagnostics::{Diagnostic, Span};
use thiserror::Error;

/// The full compile-time diagnostic taxonomy.
#[derive(Debug, Clone, Error)]
pub enum CompileErrorKind {
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("illegal syntax")]
    IllegalSyntax,
    #[error("illegal expression")]
    IllegalExpression,
    #[error("illegal operator")]
    IllegalOperator,
    #[error("unbalanced expression")]
    UnbalancedExpression,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unexpected identifier '{0}'")]
    UnexpectedIdentifier(String),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unrecognized escape sequence '\\{0}'")]
    UnrecognizedEscapeSequence(char),
    #[error("unterminated string literal")]
    UnterminatedStringLiteral,
    #[error("'{0}' is already defined")]
    AlreadyDefined(String),
    #[error("positional argument after keyword arguments")]
    ArgumentAfterKeywordArgs,
    #[error("positional argument after variadic arguments")]
    ArgumentAfterVariadicArgs,
    #[error("function '{0}' not found")]
    FunctionNotFound(String),
    #[error("too many arguments to '{name}': expected {expected}, got {got}")]
    TooManyArgs {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("too few arguments to '{name}': expected {expected}, got {got}")]
    TooFewArgs {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("'{0}' is redeclared in this scope")]
    RedeclaredIdentifier(String),
    #[error("undeclared identifier '{0}'")]
    UndeclaredIdentifier(String),
    #[error("expected identifier")]
    ExpectedIdentifier,
    #[error("'{0}' is ambiguous")]
    AmbiguousIdentifier(String),
    #[error("invalid constructor expression")]
    InvalidConstructor,
    #[error("unknown class type '{0}'")]
    UnknownClassType(String),
    #[error("expected token '{0}'")]
    ExpectedToken(String),
    #[error("unexpected end of file")]
    UnexpectedEndOfFile,
    #[error("expected a module declaration")]
    ExpectedModuleDeclaration,
    #[error("module '{0}' not found")]
    ModuleNotFound(String),
    #[error("module '{0}' is already defined")]
    ModuleAlreadyDefined(String),
    #[error("import statement outside global scope")]
    ImportOutsideGlobal,
    #[error("'self' is not defined in this context")]
    SelfNotDefined,
}

impl CompileErrorKind {
    /// The stable code used as the diagnostic's `code` field, matching the
    /// taxonomy's own variant names (e.g. `UNDECLARED_IDENTIFIER`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::InternalError(_) => "INTERNAL_ERROR",
            Self::IllegalSyntax => "ILLEGAL_SYNTAX",
            Self::IllegalExpression => "ILLEGAL_EXPRESSION",
            Self::IllegalOperator => "ILLEGAL_OPERATOR",
            Self::UnbalancedExpression => "UNBALANCED_EXPRESSION",
            Self::UnexpectedCharacter(_) => "UNEXPECTED_CHARACTER",
            Self::UnexpectedIdentifier(_) => "UNEXPECTED_IDENTIFIER",
            Self::UnexpectedToken(_) => "UNEXPECTED_TOKEN",
            Self::UnrecognizedEscapeSequence(_) => "UNRECOGNIZED_ESCAPE_SEQUENCE",
            Self::UnterminatedStringLiteral => "UNTERMINATED_STRING_LITERAL",
            Self::AlreadyDefined(_) => "ALREADY_DEFINED",
            Self::ArgumentAfterKeywordArgs => "ARGUMENT_AFTER_KEYWORD_ARGS",
            Self::ArgumentAfterVariadicArgs => "ARGUMENT_AFTER_VARIADIC_ARGS",
            Self::FunctionNotFound(_) => "FUNCTION_NOT_FOUND",
            Self::TooManyArgs { .. } => "TOO_MANY_ARGS",
            Self::TooFewArgs { .. } => "TOO_FEW_ARGS",
            Self::RedeclaredIdentifier(_) => "REDECLARED_IDENTIFIER",
            Self::UndeclaredIdentifier(_) => "UNDECLARED_IDENTIFIER",
            Self::ExpectedIdentifier => "EXPECTED_IDENTIFIER",
            Self::AmbiguousIdentifier(_) => "AMBIGUOUS_IDENTIFIER",
            Self::InvalidConstructor => "INVALID_CONSTRUCTOR",
            Self::UnknownClassType(_) => "UNKNOWN_CLASS_TYPE",
            Self::ExpectedToken(_) => "EXPECTED_TOKEN",
            Self::UnexpectedEndOfFile => "UNEXPECTED_END_OF_FILE",
            Self::ExpectedModuleDeclaration => "EXPECTED_MODULE_DECLARATION",
            Self::ModuleNotFound(_) => "MODULE_NOT_FOUND",
            Self::ModuleAlreadyDefined(_) => "MODULE_ALREADY_DEFINED",
            Self::ImportOutsideGlobal => "IMPORT_OUTSIDE_GLOBAL",
            Self::SelfNotDefined => "SELF_NOT_DEFINED",
        }
    }

    pub fn to_diagnostic(&self, span: Span) -> Diagnostic {
        Diagnostic::error(self.to_string(), span, self.code())
    }
}

/// Fatal runtime errors. Printed to stderr and turned into a non-zero exit;
/// there is no in-language way to catch them.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("binary operator not defined between {left_type} and {right_type}")]
    BinaryOperatorException {
        left_type: String,
        right_type: String,
    },
    #[error("unary operator not defined for {operand_type}")]
    UnaryOperatorException { operand_type: String },
    #[error("cannot change the value of a const")]
    ConstValueChangedException,
    #[error("null value used where a value was required")]
    NullValueUsedException,
    #[error("unknown instruction opcode {0:#x}")]
    UnknownInstruction(u32),
    #[error("undeclared identifier '{0}' at runtime")]
    UndeclaredIdentifier(String),
    #[error("function '{0}' is not bound")]
    UnboundNativeFunction(String),
    #[error("native class '{0}' is not bound")]
    UnboundNativeClass(String),
    #[error("malformed bytecode: {0}")]
    MalformedBytecode(String),
    #[error("member '{0}' not found")]
    UndeclaredMember(String),
    #[error("call chain exceeded the configured maximum depth of {0}")]
    CallChainDepthExceeded(usize),
    #[error("'{function}' expects {expected}")]
    NativeArgumentType {
        function: &'static str,
        expected: &'static str,
    },
}
