//! One-time structural validation of a statechart model.
//!
//! Validation accumulates every issue instead of stopping at the first one,
//! using stillwater's `Validation`. A definition author sees the complete
//! list of problems in a single report:
//!
//! ```rust
//! use statecraft::builder::{StateBuilder, StatechartBuilder, TransitionBuilder};
//! use statecraft::validation::{validate, DefinitionIssue};
//!
//! let model = StatechartBuilder::new("broken")
//!     .root(
//!         StateBuilder::compound("root")
//!             .child(StateBuilder::simple("a").transition(TransitionBuilder::to("nowhere")))
//!             .child(StateBuilder::simple("a")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let error = validate(&model).unwrap_err();
//! assert_eq!(error.issues().len(), 3);
//! assert!(error.issues().contains(&DefinitionIssue::MissingInitial("root".into())));
//! ```

mod issue;
mod rules;

pub use issue::DefinitionIssue;

use crate::core::StatechartModel;
use crate::expr::Evaluator;
use rules::Check;
use stillwater::validation::Validation;
use thiserror::Error;

/// Every issue found in one statechart.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("statechart '{chart}' is invalid: {}", render(.issues))]
pub struct ValidationError {
    chart: String,
    issues: Vec<DefinitionIssue>,
}

impl ValidationError {
    pub fn chart(&self) -> &str {
        &self.chart
    }

    pub fn issues(&self) -> &[DefinitionIssue] {
        &self.issues
    }
}

fn render(issues: &[DefinitionIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check the structure of `model`: names, roots, initial states, histories
/// and transitions.
pub fn validate(model: &StatechartModel) -> Result<(), ValidationError> {
    finish(model, structure(model))
}

/// Like [`validate`], and additionally compile every guard, action, contract
/// condition and the preamble with `evaluator`.
pub fn validate_with<E>(model: &StatechartModel, evaluator: &mut E) -> Result<(), ValidationError>
where
    E: Evaluator + ?Sized,
{
    let mut checks = structure(model);
    checks.extend(rules::code(model, evaluator));
    finish(model, checks)
}

fn structure(model: &StatechartModel) -> Vec<Check> {
    let mut checks = rules::unique_names(model);
    checks.push(rules::root(model));
    for node in model.states() {
        checks.extend(rules::state(model, node));
    }
    for transition in model.transitions() {
        checks.extend(rules::transition(model, transition));
    }
    checks
}

fn finish(model: &StatechartModel, checks: Vec<Check>) -> Result<(), ValidationError> {
    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => Err(ValidationError {
            chart: model.name().to_string(),
            issues: errors.iter().cloned().collect(),
        }),
    }
}
