//! The set of active states.

use super::model::StatechartModel;
use super::state::{StateId, StateKind};
use super::LogicalTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Structural defects of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("root state '{0}' is not active")]
    RootInactive(String),

    #[error("state '{state}' is active but its parent '{parent}' is not")]
    Orphan { state: String, parent: String },

    #[error("history pseudostate '{0}' is active")]
    PseudostateActive(String),

    #[error("compound state '{state}' has {count} active children, expected exactly one")]
    ActiveChildren { state: String, count: usize },

    #[error("parallel state '{state}' is missing active region '{region}'")]
    MissingRegion { state: String, region: String },
}

/// Active states, each with the logical time at which it was entered.
///
/// Iteration is in document order, so parents always come before their
/// children.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    active: BTreeMap<StateId, LogicalTime>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, state: StateId) -> bool {
        self.active.contains_key(&state)
    }

    /// Logical time at which an active state was entered.
    pub fn entered_at(&self, state: StateId) -> Option<LogicalTime> {
        self.active.get(&state).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.active.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub(crate) fn insert(&mut self, state: StateId, at: LogicalTime) {
        self.active.insert(state, at);
    }

    pub(crate) fn remove(&mut self, state: StateId) {
        self.active.remove(&state);
    }

    pub(crate) fn clear(&mut self) {
        self.active.clear();
    }

    /// Active states with no active child.
    pub fn leaves(&self, model: &StatechartModel) -> Vec<StateId> {
        self.iter()
            .filter(|&state| {
                !model
                    .children_of(state)
                    .iter()
                    .any(|&child| self.contains(child))
            })
            .collect()
    }

    /// First active child of `state`, in document order.
    pub fn active_child(&self, model: &StatechartModel, state: StateId) -> Option<StateId> {
        model
            .children_of(state)
            .iter()
            .copied()
            .find(|&child| self.contains(child))
    }

    /// Names of the active states in document order.
    pub fn names<'m>(&self, model: &'m StatechartModel) -> Vec<&'m str> {
        self.iter().map(|state| model.name_of(state)).collect()
    }

    /// Whether execution has reached its end: the root is a final state, or
    /// the root's active child is one.
    pub fn is_final(&self, model: &StatechartModel) -> bool {
        let root = model.root();
        if !self.contains(root) {
            return false;
        }
        match model.state(root).kind() {
            StateKind::Final => true,
            StateKind::Compound { .. } => self
                .active_child(model, root)
                .is_some_and(|child| model.state(child).is_final()),
            _ => false,
        }
    }

    /// Verify the structural invariant: the root is active, every active
    /// state's parent is active, no history pseudostate is active, an active
    /// compound has exactly one active child and an active parallel state has
    /// all of its regions active.
    pub fn check(&self, model: &StatechartModel) -> Result<(), ConfigurationError> {
        let root = model.root();
        if !self.contains(root) {
            return Err(ConfigurationError::RootInactive(
                model.name_of(root).to_string(),
            ));
        }

        for state in self.iter() {
            let node = model.state(state);
            if let Some(parent) = node.parent() {
                if !self.contains(parent) {
                    return Err(ConfigurationError::Orphan {
                        state: node.name().to_string(),
                        parent: model.name_of(parent).to_string(),
                    });
                }
            }

            match node.kind() {
                StateKind::History { .. } => {
                    return Err(ConfigurationError::PseudostateActive(
                        node.name().to_string(),
                    ));
                }
                StateKind::Compound { .. } => {
                    let count = node
                        .children()
                        .iter()
                        .filter(|&&child| self.contains(child))
                        .count();
                    if count != 1 {
                        return Err(ConfigurationError::ActiveChildren {
                            state: node.name().to_string(),
                            count,
                        });
                    }
                }
                StateKind::Parallel => {
                    let missing = node
                        .children()
                        .iter()
                        .copied()
                        .find(|&child| !self.contains(child));
                    if let Some(region) = missing {
                        return Err(ConfigurationError::MissingRegion {
                            state: node.name().to_string(),
                            region: model.name_of(region).to_string(),
                        });
                    }
                }
                StateKind::Simple | StateKind::Final => {}
            }
        }
        Ok(())
    }
}
