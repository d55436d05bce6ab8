//! Build errors for statechart builders and the definition loader.

use thiserror::Error;

/// Errors that can occur when building a statechart model.
///
/// These cover what cannot be represented in a model at all. Everything that
/// can be represented but is wrong (dangling references, missing initial
/// states) is left to [`validate`](crate::validation::validate).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Root state not specified. Call .root(state) before .build()")]
    MissingRoot,

    #[error("State '{0}' declares both 'states' and 'parallel states'")]
    ConflictingChildren(String),

    #[error("State '{state}' is a {kind} state and cannot declare an initial state")]
    InitialNotAllowed { state: String, kind: &'static str },

    #[error("State '{0}' is not a history state and cannot be deep")]
    DeepNotAllowed(String),

    #[error("Malformed definition: {0}")]
    Json(#[from] serde_json::Error),
}
