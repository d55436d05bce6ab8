//! The immutable statechart definition consumed by the interpreter.

use super::state::{StateId, StateNode};
use super::transition::{Transition, TransitionId};
use std::collections::{BTreeSet, HashMap};

/// A loaded statechart: a flat state table plus every transition.
///
/// The root is always `StateId` 0 and ids follow document order. Models are
/// built by [`StatechartBuilder`](crate::builder::StatechartBuilder) or
/// [`load`](crate::builder::load) and never change afterwards.
#[derive(Clone, Debug)]
pub struct StatechartModel {
    name: String,
    description: Option<String>,
    preamble: Option<String>,
    states: Vec<StateNode>,
    transitions: Vec<Transition>,
    index: HashMap<String, StateId>,
}

impl StatechartModel {
    /// Assemble a model from a preorder state table.
    ///
    /// When two states share a name, lookups resolve to the first one;
    /// validation reports the duplicate.
    pub(crate) fn from_parts(
        name: String,
        description: Option<String>,
        preamble: Option<String>,
        states: Vec<StateNode>,
        transitions: Vec<Transition>,
    ) -> Self {
        let mut index = HashMap::with_capacity(states.len());
        for state in &states {
            index.entry(state.name.clone()).or_insert(state.id);
        }
        Self {
            name,
            description,
            preamble,
            states,
            transitions,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// One-shot initialization action, run before the initial configuration
    /// is entered.
    pub fn preamble(&self) -> Option<&str> {
        self.preamble.as_deref()
    }

    pub fn root(&self) -> StateId {
        StateId(0)
    }

    pub fn states(&self) -> &[StateNode] {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Look up a state by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from this model.
    pub fn state(&self, id: StateId) -> &StateNode {
        &self.states[id.0]
    }

    /// Look up a transition by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from this model.
    pub fn transition(&self, id: TransitionId) -> &Transition {
        &self.transitions[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<StateId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&StateNode> {
        self.id_of(name).map(|id| self.state(id))
    }

    pub fn name_of(&self, id: StateId) -> &str {
        &self.state(id).name
    }

    pub fn names_of<'i>(&self, ids: impl IntoIterator<Item = &'i StateId>) -> Vec<&str> {
        ids.into_iter().map(|id| self.name_of(*id)).collect()
    }

    pub fn parent_of(&self, id: StateId) -> Option<StateId> {
        self.state(id).parent
    }

    pub fn children_of(&self, id: StateId) -> &[StateId] {
        &self.state(id).children
    }

    pub fn depth_of(&self, id: StateId) -> usize {
        self.state(id).depth
    }

    /// Proper ancestors, deepest first.
    pub fn ancestors_of(&self, id: StateId) -> Vec<StateId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent_of(parent);
        }
        ancestors
    }

    /// Proper descendants, by increasing depth.
    pub fn descendants_of(&self, id: StateId) -> Vec<StateId> {
        let mut descendants = Vec::new();
        let mut cursor = 0;
        descendants.extend_from_slice(self.children_of(id));
        while cursor < descendants.len() {
            let next = descendants[cursor];
            descendants.extend_from_slice(self.children_of(next));
            cursor += 1;
        }
        descendants
    }

    /// Whether `ancestor` is a proper ancestor of `state`.
    pub fn is_ancestor(&self, ancestor: StateId, state: StateId) -> bool {
        // Preorder ids: an ancestor always has a smaller id.
        if ancestor >= state {
            return false;
        }
        let mut current = self.parent_of(state);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            if parent < ancestor {
                return false;
            }
            current = self.parent_of(parent);
        }
        false
    }

    /// Whether `state` is `ancestor` or one of its descendants.
    pub fn is_within(&self, state: StateId, ancestor: StateId) -> bool {
        state == ancestor || self.is_ancestor(ancestor, state)
    }

    /// Deepest state that is a proper ancestor of both arguments.
    ///
    /// Returns `None` when either argument is the root.
    pub fn least_common_ancestor(&self, first: StateId, second: StateId) -> Option<StateId> {
        let theirs = self.ancestors_of(second);
        self.ancestors_of(first)
            .into_iter()
            .find(|ancestor| theirs.contains(ancestor))
    }

    /// The child of `ancestor` on the path down to `descendant`.
    ///
    /// Returns `None` unless `ancestor` is a proper ancestor of `descendant`.
    pub fn child_toward(&self, ancestor: StateId, descendant: StateId) -> Option<StateId> {
        let mut current = descendant;
        while let Some(parent) = self.parent_of(current) {
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
        None
    }

    /// Members of `ids` that have no descendant in `ids`.
    pub fn leaves_of(&self, ids: &[StateId]) -> Vec<StateId> {
        ids.iter()
            .copied()
            .filter(|&candidate| {
                !ids.iter()
                    .any(|&other| self.is_ancestor(candidate, other))
            })
            .collect()
    }

    /// History pseudostates owned by `id`, in document order.
    pub fn history_states_of(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.children_of(id)
            .iter()
            .copied()
            .filter(|&child| self.state(child).is_history())
    }

    /// Outgoing transitions of a state, in declaration order.
    pub fn transitions_from(&self, id: StateId) -> impl Iterator<Item = &Transition> {
        self.state(id)
            .transitions
            .iter()
            .map(|&tid| self.transition(tid))
    }

    /// Transitions entering `id`, including internal transitions on it.
    pub fn transitions_to(&self, id: StateId) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| match t.target() {
            Some(target) => target.id() == Some(id),
            None => t.source() == id,
        })
    }

    pub fn transitions_with<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions
            .iter()
            .filter(move |t| t.event() == Some(event))
    }

    /// Sorted names of every event some transition listens to.
    pub fn events(&self) -> Vec<&str> {
        self.transitions
            .iter()
            .filter_map(Transition::event)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted names of the events accepted by transitions leaving `ids`.
    pub fn events_for(&self, ids: &[StateId]) -> Vec<&str> {
        ids.iter()
            .flat_map(|&id| self.transitions_from(id))
            .filter_map(Transition::event)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Human-readable form, e.g. `doorsOpen -> doorsClosed` or
    /// `floorSelecting+floorSelected -> [floorSelecting]` for an internal one.
    pub fn describe(&self, id: TransitionId) -> String {
        let transition = self.transition(id);
        let source = self.name_of(transition.source());
        let event = transition
            .event()
            .map(|e| format!("+{e}"))
            .unwrap_or_default();
        let target = match transition.target() {
            Some(target) => target.name().to_string(),
            None => format!("[{source}]"),
        };
        format!("{source}{event} -> {target}")
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::{StateBuilder, StatechartBuilder, TransitionBuilder};
    use crate::core::StatechartModel;

    fn model() -> StatechartModel {
        StatechartBuilder::new("queries")
            .root(
                StateBuilder::compound("root")
                    .initial("a")
                    .child(
                        StateBuilder::compound("a")
                            .initial("a1")
                            .child(
                                StateBuilder::simple("a1")
                                    .transition(TransitionBuilder::to("a2").event("next")),
                            )
                            .child(StateBuilder::simple("a2"))
                            .transition(TransitionBuilder::to("b").event("leave")),
                    )
                    .child(
                        StateBuilder::parallel("b")
                            .child(StateBuilder::simple("b1"))
                            .child(
                                StateBuilder::simple("b2")
                                    .transition(TransitionBuilder::internal().event("poke")),
                            ),
                    ),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn ids_follow_document_order() {
        let model = model();
        let names: Vec<&str> = model.states().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["root", "a", "a1", "a2", "b", "b1", "b2"]);
        assert_eq!(model.depth_of(model.id_of("a1").unwrap()), 3);
    }

    #[test]
    fn ancestors_are_deepest_first() {
        let model = model();
        let a1 = model.id_of("a1").unwrap();
        assert_eq!(model.names_of(&model.ancestors_of(a1)), vec!["a", "root"]);
        assert!(model.ancestors_of(model.root()).is_empty());
    }

    #[test]
    fn descendants_are_breadth_first() {
        let model = model();
        let names = model.names_of(&model.descendants_of(model.root()));
        assert_eq!(names, vec!["a", "b", "a1", "a2", "b1", "b2"]);
    }

    #[test]
    fn lca_is_a_proper_common_ancestor() {
        let model = model();
        let id = |n| model.id_of(n).unwrap();
        assert_eq!(model.least_common_ancestor(id("a1"), id("a2")), Some(id("a")));
        assert_eq!(model.least_common_ancestor(id("a1"), id("b1")), Some(id("root")));
        // A state is not its own ancestor: self-transitions leave and re-enter.
        assert_eq!(model.least_common_ancestor(id("a"), id("a")), Some(id("root")));
        assert_eq!(model.least_common_ancestor(id("a"), id("a1")), Some(id("root")));
        assert_eq!(model.least_common_ancestor(id("root"), id("a1")), None);
    }

    #[test]
    fn ancestry_checks() {
        let model = model();
        let id = |n| model.id_of(n).unwrap();
        assert!(model.is_ancestor(id("root"), id("b2")));
        assert!(!model.is_ancestor(id("a"), id("b2")));
        assert!(!model.is_ancestor(id("a"), id("a")));
        assert!(model.is_within(id("a"), id("a")));
        assert_eq!(model.child_toward(id("root"), id("a2")), Some(id("a")));
        assert_eq!(model.child_toward(id("b"), id("a2")), None);
    }

    #[test]
    fn leaves_drop_states_with_descendants_in_the_set() {
        let model = model();
        let ids: Vec<_> = ["root", "a", "a1"]
            .iter()
            .map(|n| model.id_of(n).unwrap())
            .collect();
        assert_eq!(model.names_of(&model.leaves_of(&ids)), vec!["a1"]);
    }

    #[test]
    fn events_are_sorted_and_unique() {
        let model = model();
        assert_eq!(model.events(), vec!["leave", "next", "poke"]);
        let a = model.id_of("a").unwrap();
        assert_eq!(model.events_for(&[a]), vec!["leave"]);
    }

    #[test]
    fn transition_queries_and_description() {
        let model = model();
        let a2 = model.id_of("a2").unwrap();
        let b2 = model.id_of("b2").unwrap();
        assert_eq!(model.transitions_to(a2).count(), 1);
        assert_eq!(model.transitions_to(b2).count(), 1);
        assert_eq!(model.transitions_with("leave").count(), 1);

        let descriptions: Vec<String> = model
            .transitions()
            .iter()
            .map(|t| model.describe(t.id()))
            .collect();
        assert_eq!(
            descriptions,
            vec!["a+leave -> b", "a1+next -> a2", "b2+poke -> [b2]"]
        );
    }
}
