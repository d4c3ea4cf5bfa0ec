// Error handling for the opchain runtime

use std::fmt;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Runtime errors that can occur while decoding or interpreting a chain
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// A call step's dotted path does not resolve to an invocable operation
    MethodNotFound(String),

    /// A textual chain expression failed to parse or evaluate
    ExpressionError(String),

    /// Type errors (wrong type for operation)
    TypeError {
        expected: String,
        actual: String,
        operation: String,
    },

    /// Invalid argument errors
    InvalidArgument(String),

    /// JSON encoding/decoding errors
    JsonError(String),

    Generic(String),
}

impl RuntimeError {
    pub fn new(message: &str) -> RuntimeError {
        RuntimeError::Generic(message.to_string())
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::MethodNotFound(path) => {
                write!(f, "Method not found: {}", path)
            }
            RuntimeError::ExpressionError(message) => {
                write!(f, "Expression error: {}", message)
            }
            RuntimeError::TypeError {
                expected,
                actual,
                operation,
            } => {
                write!(
                    f,
                    "Type error in {}: expected {}, got {}",
                    operation, expected, actual
                )
            }
            RuntimeError::InvalidArgument(msg) => {
                write!(f, "Invalid argument: {}", msg)
            }
            RuntimeError::JsonError(msg) => {
                write!(f, "JSON error: {}", msg)
            }
            RuntimeError::Generic(message) => write!(f, "Runtime error: {}", message),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        RuntimeError::JsonError(err.to_string())
    }
}
