//! Builder for states and their subtrees.

use super::error::BuildError;
use super::transition::TransitionBuilder;
use crate::core::{Contract, StateId, StateKind, StateNode, StateRef, Transition, TransitionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Simple,
    Compound,
    Parallel,
    Final,
    History { deep: bool },
}

/// Builder for one state and, recursively, its children.
#[derive(Debug, Clone)]
pub struct StateBuilder {
    name: String,
    shape: Shape,
    initial: Option<String>,
    on_entry: Option<String>,
    on_exit: Option<String>,
    contract: Contract,
    children: Vec<StateBuilder>,
    transitions: Vec<TransitionBuilder>,
}

impl StateBuilder {
    fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            initial: None,
            on_entry: None,
            on_exit: None,
            contract: Contract::default(),
            children: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Simple)
    }

    /// State with exactly one active child. Requires [`initial`](Self::initial).
    pub fn compound(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Compound)
    }

    /// State whose children are orthogonal regions.
    pub fn parallel(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Parallel)
    }

    pub fn final_state(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Final)
    }

    pub fn shallow_history(name: impl Into<String>) -> Self {
        Self::new(name, Shape::History { deep: false })
    }

    pub fn deep_history(name: impl Into<String>) -> Self {
        Self::new(name, Shape::History { deep: true })
    }

    /// Initial child of a compound state.
    pub fn initial(mut self, child: impl Into<String>) -> Self {
        self.initial = Some(child.into());
        self
    }

    /// Fallback of a history state that has no memory yet.
    pub fn default(self, state: impl Into<String>) -> Self {
        self.initial(state)
    }

    pub fn on_entry(mut self, action: impl Into<String>) -> Self {
        self.on_entry = Some(action.into());
        self
    }

    pub fn on_exit(mut self, action: impl Into<String>) -> Self {
        self.on_exit = Some(action.into());
        self
    }

    pub fn child(mut self, child: StateBuilder) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = StateBuilder>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn transition(mut self, transition: TransitionBuilder) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Condition checked when the state is entered, before `on_entry`.
    pub fn precondition(mut self, condition: impl Into<String>) -> Self {
        self.contract.preconditions.push(condition.into());
        self
    }

    /// Condition checked when the state is exited, after `on_exit`.
    pub fn postcondition(mut self, condition: impl Into<String>) -> Self {
        self.contract.postconditions.push(condition.into());
        self
    }

    /// Condition checked after every pass while the state is active.
    pub fn invariant(mut self, condition: impl Into<String>) -> Self {
        self.contract.invariants.push(condition.into());
        self
    }

    fn kind(&mut self) -> Result<StateKind, BuildError> {
        let initial = self.initial.take().map(StateRef::unresolved);
        let kind = match self.shape {
            Shape::Compound => return Ok(StateKind::Compound { initial }),
            Shape::History { deep } => {
                return Ok(StateKind::History {
                    deep,
                    default: initial,
                })
            }
            Shape::Simple => StateKind::Simple,
            Shape::Parallel => StateKind::Parallel,
            Shape::Final => StateKind::Final,
        };
        match initial {
            Some(_) => Err(BuildError::InitialNotAllowed {
                state: self.name.clone(),
                kind: kind.label(),
            }),
            None => Ok(kind),
        }
    }

    /// Append this subtree to the flat tables in preorder: the state, then
    /// its own transitions, then each child subtree.
    pub(crate) fn flatten(
        mut self,
        parent: Option<StateId>,
        depth: usize,
        states: &mut Vec<StateNode>,
        transitions: &mut Vec<Transition>,
    ) -> Result<StateId, BuildError> {
        let id = StateId(states.len());
        let kind = self.kind()?;

        let mut outgoing = Vec::with_capacity(self.transitions.len());
        for builder in self.transitions {
            let tid = TransitionId(transitions.len());
            transitions.push(builder.build(tid, id));
            outgoing.push(tid);
        }

        states.push(StateNode {
            id,
            name: self.name,
            kind,
            parent,
            children: Vec::new(),
            depth,
            on_entry: self.on_entry,
            on_exit: self.on_exit,
            contract: self.contract,
            transitions: outgoing,
        });

        let mut children = Vec::with_capacity(self.children.len());
        for child in self.children {
            children.push(child.flatten(Some(id), depth + 1, states, transitions)?);
        }
        states[id.0].children = children;

        Ok(id)
    }
}
