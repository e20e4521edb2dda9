use std::io;

use thiserror::Error;

/// Expected-token set attached to a parse error, rendered as a comma list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedSet(pub Vec<&'static str>);

impl std::fmt::Display for ExpectedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" or "))
    }
}

#[derive(Debug, Error)]
pub enum ParseErrorCode {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: ExpectedSet, found: String },

    #[error("unterminated <<if>>: no matching <<endif>>")]
    UnterminatedIf,

    #[error("nested <<if>> is not supported")]
    NestedIfUnsupported,

    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("unknown special \"{0}\"")]
    UnknownSpecial(String),

    #[error("invalid number literal \"{0}\"")]
    InvalidNumber(String),
}

/// A parse error, carrying enough context to reconstruct a source position.
#[derive(Debug, Error)]
#[error("{passage}:{line}:{column}: {code}")]
pub struct ParseError {
    pub passage: String,
    pub line: usize,
    pub column: usize,
    #[source]
    pub code: ParseErrorCode,
}

impl ParseError {
    pub fn new(passage: impl Into<String>, line: usize, column: usize, code: ParseErrorCode) -> Self {
        ParseError {
            passage: passage.into(),
            line,
            column,
            code,
        }
    }
}

/// A fatal VM runtime error. Always the last side effect of a `run()` call.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("Unknown jump target \"{0}\".")]
    UnknownJumpTarget(String),

    #[error("Unknown call target \"{0}\".")]
    UnknownCallTarget(String),

    #[error("Unknown selection target \"{0}\".")]
    UnknownSelectionTarget(String),

    #[error("Return with an empty call stack.")]
    EmptyCallStackReturn,

    #[error("Call stack overflow (depth exceeds {0}).")]
    CallStackOverflow(usize),

    #[error("Function \"{name}\" expected {expected} argument(s), got {got}.")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Function \"{name}\" expected {expected} for argument {index}, got {got}.")]
    ArgumentTypeMismatch {
        name: String,
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    #[error("Unknown function \"{0}\".")]
    UnknownFunction(String),

    #[error("Division by zero.")]
    DivisionByZero,
}

/// Host-facing load errors: the caller's translation layer sits outside this
/// crate, but a missing `Start` passage and malformed JSON caches originate
/// here.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("passage \"Start\" is missing")]
    MissingStart,

    #[error("parse error")]
    Parse(#[from] ParseError),

    #[error("failed to read source")]
    Io(#[from] io::Error),

    #[error("failed to (de)serialize compiled program")]
    Json(#[from] serde_json::Error),
}
