//! Run-time errors and fault records.

use super::clock::ClockError;
use super::interpreter::Status;
use crate::core::{Clause, ConfigurationError, TransitionId};
use crate::expr::EvalError;
use crate::validation::ValidationError;
use std::fmt;
use thiserror::Error;

/// Errors returned by [`Interpreter`](super::Interpreter) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("Cannot {operation} an interpreter that is {status}")]
    InvalidInstanceState {
        operation: &'static str,
        status: Status,
    },

    #[error("History state '{history}' has no memory and no default")]
    NoHistory { history: String },

    #[error("Action failed in {location}: {source}")]
    ActionFailed { location: String, source: EvalError },

    #[error("{} contract violation(s): {}", .0.len(), render(.0))]
    ContractViolation(Vec<ContractViolation>),

    #[error("No stable configuration after {passes} eventless passes")]
    Livelock { passes: usize },

    #[error("State '{0}' refers to a state that does not exist")]
    UnresolvedReference(String),

    #[error("Configuration is invalid: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Definition(#[from] ValidationError),
}

fn render(violations: &[ContractViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A guard that could not be evaluated. It counts as false.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardFault {
    pub transition: TransitionId,
    pub description: String,
    pub error: EvalError,
}

/// An action that failed. The rest of its transition's actions were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionFault {
    pub transition: Option<TransitionId>,
    pub location: String,
    pub error: EvalError,
}

/// A contract condition that was false or could not be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractViolation {
    /// `state 'x'` or `transition a -> b`.
    pub subject: String,
    pub clause: Clause,
    pub condition: String,
    pub error: Option<EvalError>,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} failed: {}", self.clause, self.subject, self.condition)?;
        if let Some(error) = &self.error {
            write!(f, " ({error})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violations_render_with_their_cause() {
        let error = ExecutionError::ContractViolation(vec![
            ContractViolation {
                subject: "state 'a'".into(),
                clause: Clause::Invariant,
                condition: "x >= 0".into(),
                error: None,
            },
            ContractViolation {
                subject: "transition a -> b".into(),
                clause: Clause::Precondition,
                condition: "y".into(),
                error: Some(EvalError::UndefinedVariable("y".into())),
            },
        ]);
        assert_eq!(
            error.to_string(),
            "2 contract violation(s): invariant of state 'a' failed: x >= 0; \
             precondition of transition a -> b failed: y (name 'y' is not defined)"
        );
    }

    #[test]
    fn instance_state_errors_name_the_operation() {
        let error = ExecutionError::InvalidInstanceState {
            operation: "send events to",
            status: Status::NotStarted,
        };
        assert_eq!(
            error.to_string(),
            "Cannot send events to an interpreter that is not started"
        );
    }
}
