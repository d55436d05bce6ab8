//! Transitions between states.

use super::event::Event;
use super::guard::{Contract, Guard};
use super::state::{StateId, StateRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a transition in its model's transition table.
///
/// Ids follow declaration order, which is also the tie-break priority
/// between transitions leaving the same state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub(crate) usize);

impl TransitionId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A transition leaving `source`.
///
/// Without a target the transition is internal: only its action runs.
/// Without an event it is eventless and re-checked on every stabilization
/// pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub(crate) id: TransitionId,
    pub(crate) source: StateId,
    pub(crate) target: Option<StateRef>,
    pub(crate) event: Option<String>,
    pub(crate) guard: Option<Guard>,
    pub(crate) action: Option<String>,
    pub(crate) contract: Contract,
}

impl Transition {
    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn source(&self) -> StateId {
        self.source
    }

    pub fn target(&self) -> Option<&StateRef> {
        self.target.as_ref()
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn is_internal(&self) -> bool {
        self.target.is_none()
    }

    pub fn is_eventless(&self) -> bool {
        self.event.is_none()
    }

    /// Whether the transition listens to this intake.
    ///
    /// With an event, only transitions naming it match; on an eventless pass
    /// (`None`), only eventless transitions do.
    pub fn matches(&self, event: Option<&Event>) -> bool {
        match (self.event.as_deref(), event) {
            (Some(expected), Some(event)) => expected == event.name(),
            (None, None) => true,
            _ => false,
        }
    }
}
