use sprout_dom::NodeId;
use sprout_expr::{ParseError, Span};
use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Failures raised while evaluating or assigning through an expression.
///
/// These never escape [`crate::evaluate`] or [`crate::assign`]; they are logged
/// there and the result degrades to `undefined`.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Syntax error: {0}")]
    Parse(#[from] ParseError),

    #[error("ReferenceError: '{name}' is not defined at {span:?}")]
    Reference { name: String, span: Span },

    #[error("TypeError at {span:?}: {message}")]
    Type { message: String, span: Span },

    #[error("{function}: {message}")]
    Native { function: String, message: String },

    #[error("Cannot assign to '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl EvalError {
    pub(crate) fn type_error(message: impl Into<String>, span: Span) -> Self {
        EvalError::Type {
            message: message.into(),
            span,
        }
    }

    pub(crate) fn native(function: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::Native {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Failures surfaced to callers of the runtime's mounting API
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("No constructor registered under '{name}'")]
    UnknownConstructor { name: String },

    #[error("Invalid state JSON: {0}")]
    InvalidState(#[source] serde_json::Error),

    #[error("Invalid runtime configuration: {0}")]
    Config(#[source] serde_json::Error),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),
}
