//! Memory of history pseudostates.
//!
//! Tracks, per history pseudostate, what its owning compound state had
//! active the last time it was exited. Following the functional style of the
//! rest of the core, recording returns a new tracker and leaves the original
//! untouched, so a transition can compute the memory it would write before
//! committing to any of its effects.

use super::configuration::Configuration;
use super::model::StatechartModel;
use super::state::{StateId, StateKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// History pseudostate id → recorded states.
///
/// Entries are written only when the owner is exited, read only when the
/// history pseudostate is entered, and never expire.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{StateBuilder, StatechartBuilder};
/// use statecraft::core::HistoryTracker;
///
/// let model = StatechartBuilder::new("player")
///     .root(
///         StateBuilder::compound("player")
///             .initial("stopped")
///             .child(StateBuilder::shallow_history("H"))
///             .child(StateBuilder::simple("stopped"))
///             .child(StateBuilder::simple("playing")),
///     )
///     .build()
///     .unwrap();
///
/// let h = model.id_of("H").unwrap();
/// let playing = model.id_of("playing").unwrap();
///
/// let tracker = HistoryTracker::new();
/// let updated = tracker.record(h, vec![playing]);
///
/// assert!(tracker.get(h).is_none()); // original unchanged
/// assert_eq!(updated.get(h), Some(&[playing][..]));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryTracker {
    memory: BTreeMap<StateId, Vec<StateId>>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `states` for `history`, returning a new tracker.
    pub fn record(&self, history: StateId, states: Vec<StateId>) -> Self {
        let mut memory = self.memory.clone();
        memory.insert(history, states);
        Self { memory }
    }

    /// Record the memory of every history pseudostate owned by `owner`,
    /// as seen in `configuration` just before `owner` is exited.
    ///
    /// Shallow history keeps the owner's active child; deep history keeps the
    /// owner's active leaf descendants. Owners without history pseudostates
    /// leave the tracker unchanged.
    pub fn record_exit(
        &self,
        model: &StatechartModel,
        configuration: &Configuration,
        owner: StateId,
    ) -> Self {
        let mut tracker = self.clone();
        for history in model.history_states_of(owner) {
            let StateKind::History { deep, .. } = model.state(history).kind() else {
                continue;
            };
            let recorded: Vec<StateId> = if *deep {
                let active: Vec<StateId> = configuration
                    .iter()
                    .filter(|&state| model.is_ancestor(owner, state))
                    .collect();
                model.leaves_of(&active)
            } else {
                configuration.active_child(model, owner).into_iter().collect()
            };
            if !recorded.is_empty() {
                tracker.memory.insert(history, recorded);
            }
        }
        tracker
    }

    pub fn get(&self, history: StateId) -> Option<&[StateId]> {
        self.memory.get(&history).map(Vec::as_slice)
    }

    pub fn contains(&self, history: StateId) -> bool {
        self.memory.contains_key(&history)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, &[StateId])> {
        self.memory
            .iter()
            .map(|(history, states)| (*history, states.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}
