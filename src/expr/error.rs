//! Evaluation errors.

use thiserror::Error;

/// Failure to compile or evaluate a guard or action.
///
/// Errors are cloneable so that the engine can both record a fault in a
/// step record and return it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("name '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("unsupported operand type(s) for {operation}: {operands}")]
    TypeMismatch { operation: String, operands: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}() expects {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("{function}() got an unexpected keyword argument '{keyword}'")]
    UnexpectedKeyword { function: String, keyword: String },

    #[error("capability denied: {0}")]
    CapabilityDenied(String),

    #[error("no event is bound in this evaluation")]
    NoEvent,

    #[error("event has no field '{0}'")]
    MissingEventField(String),

    #[error("unknown state '{0}'")]
    UnknownState(String),

    #[error("'{type_name}' value has no attribute '{attribute}'")]
    Attribute {
        type_name: String,
        attribute: String,
    },
}

impl EvalError {
    pub(crate) fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        EvalError::Syntax {
            message: message.into(),
            line,
            column,
        }
    }
}
