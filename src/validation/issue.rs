//! Definition issues found by the validator.

use crate::expr::EvalError;
use thiserror::Error;

/// One structural defect of a statechart definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionIssue {
    #[error("state name '{0}' is used more than once")]
    DuplicateState(String),

    #[error("root state '{state}' cannot be a {kind} state")]
    InvalidRoot { state: String, kind: &'static str },

    #[error("{kind} state '{state}' cannot have children")]
    ChildrenNotAllowed { state: String, kind: &'static str },

    #[error("compound state '{0}' does not declare an initial state")]
    MissingInitial(String),

    #[error("initial state '{initial}' of '{state}' does not exist")]
    UnresolvedInitial { state: String, initial: String },

    #[error("initial state '{initial}' of '{state}' is not one of its children")]
    InitialNotChild { state: String, initial: String },

    #[error("history state '{history}', initial of '{state}', declares no default")]
    InitialHistoryWithoutDefault { state: String, history: String },

    #[error("parallel state '{0}' has no regions")]
    EmptyParallel(String),

    #[error("history state '{0}' must be the child of a compound state")]
    HistoryOutsideCompound(String),

    #[error("default '{default}' of history state '{history}' does not exist")]
    UnresolvedHistoryDefault { history: String, default: String },

    #[error("default '{default}' of history state '{history}' is outside its parent")]
    HistoryDefaultOutsideOwner { history: String, default: String },

    #[error("default '{default}' of history state '{history}' is itself a history state")]
    HistoryDefaultIsHistory { history: String, default: String },

    #[error("history state '{0}' cannot have transitions")]
    HistoryWithTransitions(String),

    #[error("history state '{0}' cannot have entry or exit actions")]
    HistoryWithActions(String),

    #[error("target '{target}' of transition {transition} does not exist")]
    UnresolvedTarget { transition: String, target: String },

    #[error("{kind} state '{state}' cannot have outgoing transitions")]
    InvalidTransitionSource { state: String, kind: &'static str },

    #[error("internal transition {0} needs an event or a guard")]
    UnguardedInternal(String),

    #[error("{location}: {error}")]
    InvalidCode { location: String, error: EvalError },
}
