//! Declarative statechart definitions.
//!
//! A [`StatechartDefinition`] mirrors the usual textual statechart format
//! field for field (`root state`, `parallel states`, `on entry`, ...). Any
//! serde format can produce one; [`from_json`] covers JSON.
//!
//! ```rust
//! use statecraft::builder::from_json;
//!
//! let model = from_json(r#"{
//!     "statechart": {
//!         "name": "door",
//!         "preamble": "opened = 0",
//!         "root state": {
//!             "name": "door",
//!             "initial": "closed",
//!             "states": [
//!                 {"name": "closed", "transitions": [
//!                     {"target": "open", "event": "open", "action": "opened += 1"}
//!                 ]},
//!                 {"name": "open", "transitions": [{"target": "closed", "event": "close"}]}
//!             ]
//!         }
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(model.name(), "door");
//! assert_eq!(model.events(), vec!["close", "open"]);
//! ```

use super::error::BuildError;
use super::state::StateBuilder;
use super::transition::TransitionBuilder;
use super::StatechartBuilder;
use crate::core::StatechartModel;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatechartDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "on entry", skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    #[serde(rename = "root state", default)]
    pub root: Option<StateDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateType {
    #[serde(rename = "final")]
    Final,
    /// Shallow unless `deep: true`.
    #[serde(rename = "history")]
    History,
    #[serde(rename = "shallow history")]
    ShallowHistory,
    #[serde(rename = "deep history")]
    DeepHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDefinition {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StateType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(rename = "on entry", default, skip_serializing_if = "Option::is_none")]
    pub on_entry: Option<String>,
    #[serde(rename = "on exit", default, skip_serializing_if = "Option::is_none")]
    pub on_exit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<TransitionDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<StateDefinition>>,
    #[serde(rename = "parallel states", default, skip_serializing_if = "Option::is_none")]
    pub parallel_states: Option<Vec<StateDefinition>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contract: Vec<ContractClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contract: Vec<ContractClause>,
}

/// One contract entry: `{"before": ...}`, `{"after": ...}` or `{"always": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractClause {
    Before(String),
    After(String),
    Always(String),
}

/// Turn a definition into a model.
///
/// The result still has to pass [`validate`](crate::validation::validate)
/// before it can run; the interpreter does that on construction.
pub fn load(definition: StatechartDefinition) -> Result<StatechartModel, BuildError> {
    let mut builder = StatechartBuilder::new(definition.name);
    if let Some(description) = definition.description {
        builder = builder.description(description);
    }
    if let Some(preamble) = definition.preamble {
        builder = builder.preamble(preamble);
    }
    if let Some(root) = definition.root {
        builder = builder.root(state(root)?);
    }
    builder.build()
}

/// Parse a JSON definition, either bare or wrapped in a `statechart` key.
pub fn from_json(json: &str) -> Result<StatechartModel, BuildError> {
    let mut value: serde_json::Value = serde_json::from_str(json)?;
    if let Some(inner) = value.get_mut("statechart") {
        value = inner.take();
    }
    let definition: StatechartDefinition = serde_json::from_value(value)?;
    load(definition)
}

fn state(definition: StateDefinition) -> Result<StateBuilder, BuildError> {
    let StateDefinition {
        name,
        kind,
        deep,
        initial,
        on_entry,
        on_exit,
        transitions,
        states,
        parallel_states,
        contract,
    } = definition;

    let is_history = matches!(
        kind,
        Some(StateType::History | StateType::ShallowHistory | StateType::DeepHistory)
    );
    if deep.is_some() && !is_history {
        return Err(BuildError::DeepNotAllowed(name));
    }

    if states.is_some() && parallel_states.is_some() {
        return Err(BuildError::ConflictingChildren(name));
    }
    let parallel = parallel_states.is_some();
    let children = states.or(parallel_states);

    let mut builder = match kind {
        Some(StateType::Final) => StateBuilder::final_state(name),
        Some(StateType::History) if deep == Some(true) => StateBuilder::deep_history(name),
        Some(StateType::History | StateType::ShallowHistory) => StateBuilder::shallow_history(name),
        Some(StateType::DeepHistory) => StateBuilder::deep_history(name),
        None if parallel => StateBuilder::parallel(name),
        None if children.is_some() || initial.is_some() => StateBuilder::compound(name),
        None => StateBuilder::simple(name),
    };

    if let Some(initial) = initial {
        builder = builder.initial(initial);
    }
    if let Some(action) = on_entry {
        builder = builder.on_entry(action);
    }
    if let Some(action) = on_exit {
        builder = builder.on_exit(action);
    }
    for clause in contract {
        builder = match clause {
            ContractClause::Before(condition) => builder.precondition(condition),
            ContractClause::After(condition) => builder.postcondition(condition),
            ContractClause::Always(condition) => builder.invariant(condition),
        };
    }
    for transition in transitions {
        builder = builder.transition(self::transition(transition));
    }
    for child in children.into_iter().flatten() {
        builder = builder.child(state(child)?);
    }
    Ok(builder)
}

fn transition(definition: TransitionDefinition) -> TransitionBuilder {
    let mut builder = match definition.target {
        Some(target) => TransitionBuilder::to(target),
        None => TransitionBuilder::internal(),
    };
    if let Some(event) = definition.event {
        builder = builder.event(event);
    }
    if let Some(guard) = definition.guard {
        builder = builder.guard(guard);
    }
    if let Some(action) = definition.action {
        builder = builder.action(action);
    }
    for clause in definition.contract {
        builder = match clause {
            ContractClause::Before(condition) => builder.precondition(condition),
            ContractClause::After(condition) => builder.postcondition(condition),
            // Transitions have no lasting extent for an invariant to hold over.
            ContractClause::Always(_) => builder,
        };
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateKind;

    #[test]
    fn missing_root_is_reported() {
        let result = from_json(r#"{"name": "empty"}"#);
        assert!(matches!(result, Err(BuildError::MissingRoot)));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(from_json("{"), Err(BuildError::Json(_))));
        assert!(matches!(
            from_json(r#"{"name": 3}"#),
            Err(BuildError::Json(_))
        ));
    }

    #[test]
    fn kinds_are_inferred_from_fields() {
        let model = from_json(
            r#"{
                "name": "kinds",
                "on entry": "x = 1",
                "root state": {
                    "name": "root",
                    "initial": "p",
                    "states": [
                        {"name": "p", "parallel states": [
                            {"name": "r1", "initial": "H", "states": [
                                {"name": "H", "type": "history", "deep": true},
                                {"name": "leaf"}
                            ]},
                            {"name": "r2", "initial": "H2", "states": [
                                {"name": "H2", "type": "shallow history", "initial": "other"},
                                {"name": "other"}
                            ]}
                        ]},
                        {"name": "done", "type": "final"}
                    ]
                }
            }"#,
        )
        .unwrap();

        let kind = |name: &str| model.get(name).map(|s| s.kind().label());
        assert_eq!(kind("root"), Some("compound"));
        assert_eq!(kind("p"), Some("parallel"));
        assert_eq!(kind("H"), Some("deep history"));
        assert_eq!(kind("H2"), Some("shallow history"));
        assert_eq!(kind("leaf"), Some("simple"));
        assert_eq!(kind("done"), Some("final"));
        assert_eq!(model.preamble(), Some("x = 1"));

        let Some(StateKind::History { default, .. }) = model.get("H2").map(|s| s.kind()) else {
            panic!("expected a history state");
        };
        assert_eq!(default.as_ref().and_then(|d| d.id()), model.id_of("other"));
    }

    #[test]
    fn conflicting_children_are_rejected() {
        let result = from_json(
            r#"{"name": "c", "root state": {"name": "root", "states": [], "parallel states": []}}"#,
        );
        assert!(matches!(result, Err(BuildError::ConflictingChildren(name)) if name == "root"));
    }

    #[test]
    fn deep_outside_history_is_rejected() {
        let result = from_json(r#"{"name": "d", "root state": {"name": "root", "deep": true}}"#);
        assert!(matches!(result, Err(BuildError::DeepNotAllowed(_))));
    }

    #[test]
    fn initial_on_parallel_state_is_rejected() {
        let result = from_json(
            r#"{"name": "p", "root state": {"name": "root", "initial": "a",
                "parallel states": [{"name": "a"}]}}"#,
        );
        assert!(matches!(result, Err(BuildError::InitialNotAllowed { .. })));
    }

    #[test]
    fn contracts_map_to_clauses() {
        let model = from_json(
            r#"{"name": "c", "root state": {"name": "root", "initial": "a",
                "contract": [{"always": "x >= 0"}],
                "states": [{"name": "a", "transitions": [{"target": "a", "event": "e",
                    "contract": [{"before": "x > 0"}, {"after": "x > 1"}, {"always": "x > 2"}]}]}]}}"#,
        )
        .unwrap();
        assert_eq!(
            model.state(model.root()).contract().invariants,
            vec!["x >= 0".to_string()]
        );
        let contract = model.transitions()[0].contract();
        assert_eq!(contract.preconditions, vec!["x > 0".to_string()]);
        assert_eq!(contract.postconditions, vec!["x > 1".to_string()]);
        assert!(contract.invariants.is_empty());
    }

    #[test]
    fn definitions_round_trip_through_serde() {
        let definition = StatechartDefinition {
            name: "rt".into(),
            description: None,
            preamble: Some("x = 0".into()),
            root: Some(StateDefinition {
                name: "root".into(),
                kind: None,
                deep: None,
                initial: None,
                on_entry: None,
                on_exit: None,
                transitions: vec![TransitionDefinition {
                    target: None,
                    event: Some("tick".into()),
                    guard: None,
                    action: Some("x += 1".into()),
                    contract: Vec::new(),
                }],
                states: None,
                parallel_states: None,
                contract: Vec::new(),
            }),
        };
        let json = serde_json::to_string(&definition).unwrap();
        assert!(json.contains("\"root state\""));
        let back: StatechartDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, definition);
    }
}
