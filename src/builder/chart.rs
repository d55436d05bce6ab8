//! Builder for whole statecharts.

use super::error::BuildError;
use super::state::StateBuilder;
use crate::core::{StateId, StatechartModel};
use std::collections::HashMap;

/// Builder for constructing a [`StatechartModel`] with a fluent API.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{on_event, StateBuilder, StatechartBuilder};
///
/// let model = StatechartBuilder::new("switch")
///     .preamble("presses = 0")
///     .root(
///         StateBuilder::compound("switch")
///             .initial("off")
///             .child(StateBuilder::simple("off").transition(on_event("press", "on")))
///             .child(StateBuilder::simple("on").transition(on_event("press", "off"))),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(model.states().len(), 3);
/// assert_eq!(model.events(), vec!["press"]);
/// ```
#[derive(Debug, Clone)]
pub struct StatechartBuilder {
    name: String,
    description: Option<String>,
    preamble: Option<String>,
    root: Option<StateBuilder>,
}

impl StatechartBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            preamble: None,
            root: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Action run once, before the initial configuration is entered.
    pub fn preamble(mut self, action: impl Into<String>) -> Self {
        self.preamble = Some(action.into());
        self
    }

    /// Set the root state (required).
    pub fn root(mut self, root: StateBuilder) -> Self {
        self.root = Some(root);
        self
    }

    /// Build the model.
    ///
    /// Returns an error only for definitions that cannot be represented.
    /// References are resolved by name; the ones that do not resolve are
    /// kept for [`validate`](crate::validation::validate) to report.
    pub fn build(self) -> Result<StatechartModel, BuildError> {
        let root = self.root.ok_or(BuildError::MissingRoot)?;

        let mut states = Vec::new();
        let mut transitions = Vec::new();
        root.flatten(None, 1, &mut states, &mut transitions)?;

        let mut index: HashMap<String, StateId> = HashMap::with_capacity(states.len());
        for state in &states {
            index.entry(state.name().to_string()).or_insert(state.id());
        }
        let lookup = |name: &str| index.get(name).copied();

        for state in &mut states {
            if let Some(reference) = state.kind.reference_mut() {
                let id = lookup(reference.name());
                reference.resolve(id);
            }
        }
        for transition in &mut transitions {
            if let Some(target) = transition.target.as_mut() {
                let id = lookup(target.name());
                target.resolve(id);
            }
        }

        Ok(StatechartModel::from_parts(
            self.name,
            self.description,
            self.preamble,
            states,
            transitions,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TransitionBuilder;
    use crate::core::StateRef;

    #[test]
    fn builder_requires_a_root() {
        let result = StatechartBuilder::new("empty").build();
        assert!(matches!(result, Err(BuildError::MissingRoot)));
    }

    #[test]
    fn references_are_resolved_by_name() {
        let model = StatechartBuilder::new("refs")
            .description("reference resolution")
            .root(
                StateBuilder::compound("root")
                    .initial("a")
                    .child(StateBuilder::simple("a").transition(TransitionBuilder::to("b")))
                    .child(StateBuilder::simple("b").transition(TransitionBuilder::to("c"))),
            )
            .build()
            .unwrap();

        let root = model.state(model.root());
        assert_eq!(root.initial().and_then(StateRef::id), model.id_of("a"));

        let targets: Vec<Option<StateId>> = model
            .transitions()
            .iter()
            .map(|t| t.target().and_then(StateRef::id))
            .collect();
        assert_eq!(targets, vec![model.id_of("b"), None]);
        assert_eq!(model.description(), Some("reference resolution"));
    }

    #[test]
    fn initial_on_final_state_fails() {
        let result = StatechartBuilder::new("bad")
            .root(
                StateBuilder::compound("root")
                    .initial("done")
                    .child(StateBuilder::final_state("done").initial("x")),
            )
            .build();
        assert!(matches!(
            result,
            Err(BuildError::InitialNotAllowed { kind: "final", .. })
        ));
    }
}
