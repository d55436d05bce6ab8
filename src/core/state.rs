//! States of a statechart.
//!
//! States live in a flat table owned by [`StatechartModel`](super::StatechartModel)
//! and refer to each other by [`StateId`]. Parent links are plain indices, so
//! the tree has no cyclic ownership.

use super::guard::Contract;
use super::transition::TransitionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a state in its model's state table.
///
/// Ids are assigned in document (preorder) order: a state's id is always
/// greater than its parent's, and siblings are numbered in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateId(pub(crate) usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// By-name reference to another state.
///
/// The id is filled in when the model is built. A reference whose name does
/// not exist keeps `id == None` so validation can report it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRef {
    name: String,
    id: Option<StateId>,
}

impl StateRef {
    pub(crate) fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub(crate) fn resolve(&mut self, id: Option<StateId>) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<StateId> {
        self.id
    }
}

/// The closed set of state kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    /// Leaf state hosting transitions.
    Simple,
    /// Exactly one child active at a time, starting from `initial`.
    Compound { initial: Option<StateRef> },
    /// Orthogonal regions: every child is active while the state is.
    Parallel,
    /// Terminal leaf. Entering a top-level final state ends execution.
    Final,
    /// Pseudostate restoring what its parent had active when last exited.
    History {
        deep: bool,
        default: Option<StateRef>,
    },
}

impl StateKind {
    pub fn label(&self) -> &'static str {
        match self {
            StateKind::Simple => "simple",
            StateKind::Compound { .. } => "compound",
            StateKind::Parallel => "parallel",
            StateKind::Final => "final",
            StateKind::History { deep: false, .. } => "shallow history",
            StateKind::History { deep: true, .. } => "deep history",
        }
    }

    pub(crate) fn reference_mut(&mut self) -> Option<&mut StateRef> {
        match self {
            StateKind::Compound { initial } => initial.as_mut(),
            StateKind::History { default, .. } => default.as_mut(),
            _ => None,
        }
    }
}

/// One entry of the state table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateNode {
    pub(crate) id: StateId,
    pub(crate) name: String,
    pub(crate) kind: StateKind,
    pub(crate) parent: Option<StateId>,
    pub(crate) children: Vec<StateId>,
    pub(crate) depth: usize,
    pub(crate) on_entry: Option<String>,
    pub(crate) on_exit: Option<String>,
    pub(crate) contract: Contract,
    pub(crate) transitions: Vec<TransitionId>,
}

impl StateNode {
    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    /// Children in document order.
    pub fn children(&self) -> &[StateId] {
        &self.children
    }

    /// Depth in the tree; the root has depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn on_entry(&self) -> Option<&str> {
        self.on_entry.as_deref()
    }

    pub fn on_exit(&self) -> Option<&str> {
        self.on_exit.as_deref()
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Outgoing transitions in declaration order.
    pub fn transitions(&self) -> &[TransitionId] {
        &self.transitions
    }

    /// The `initial` child of a compound state, if declared.
    pub fn initial(&self) -> Option<&StateRef> {
        match &self.kind {
            StateKind::Compound { initial } => initial.as_ref(),
            _ => None,
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.kind, StateKind::Compound { .. })
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.kind, StateKind::Parallel)
    }

    pub fn is_final(&self) -> bool {
        matches!(self.kind, StateKind::Final)
    }

    pub fn is_history(&self) -> bool {
        matches!(self.kind, StateKind::History { .. })
    }

    /// Compound and parallel states may have children.
    pub fn is_composite(&self) -> bool {
        self.is_compound() || self.is_parallel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: StateKind) -> StateNode {
        StateNode {
            id: StateId(0),
            name: "s".to_string(),
            kind,
            parent: None,
            children: Vec::new(),
            depth: 1,
            on_entry: None,
            on_exit: None,
            contract: Contract::default(),
            transitions: Vec::new(),
        }
    }

    #[test]
    fn kind_labels_distinguish_history_depth() {
        let shallow = StateKind::History {
            deep: false,
            default: None,
        };
        let deep = StateKind::History {
            deep: true,
            default: None,
        };
        assert_eq!(shallow.label(), "shallow history");
        assert_eq!(deep.label(), "deep history");
        assert_eq!(StateKind::Parallel.label(), "parallel");
    }

    #[test]
    fn predicates_match_kind() {
        assert!(node(StateKind::Final).is_final());
        assert!(node(StateKind::Parallel).is_composite());
        assert!(node(StateKind::Compound { initial: None }).is_composite());
        assert!(!node(StateKind::Simple).is_composite());
        assert!(node(StateKind::History {
            deep: true,
            default: None
        })
        .is_history());
    }

    #[test]
    fn initial_is_only_reported_for_compound_states() {
        let mut initial = StateRef::unresolved("idle");
        initial.resolve(Some(StateId(1)));
        let compound = node(StateKind::Compound {
            initial: Some(initial),
        });
        assert_eq!(compound.initial().and_then(StateRef::id), Some(StateId(1)));

        let history = node(StateKind::History {
            deep: false,
            default: Some(StateRef::unresolved("idle")),
        });
        assert!(history.initial().is_none());
    }

    #[test]
    fn state_ids_order_by_index() {
        assert!(StateId(1) < StateId(2));
        assert_eq!(StateId(7).to_string(), "#7");
    }
}
