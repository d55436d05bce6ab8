//! Guard conditions and design-by-contract clauses.
//!
//! Guards and contract conditions are boolean expressions in the evaluator's
//! language. They are stored as source text; an `Evaluator` decides what the
//! text means.

use super::LogicalTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean condition that must hold for a transition to be eligible.
///
/// # Example
///
/// ```rust
/// use statecraft::core::Guard;
///
/// let guard = Guard::new("destination != current");
/// assert_eq!(guard.code(), "destination != current");
///
/// let timeout = Guard::after(10);
/// assert_eq!(timeout.code(), "after(10)");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guard(String);

impl Guard {
    pub fn new(code: impl Into<String>) -> Self {
        Guard(code.into())
    }

    /// Guard that holds once `units` logical time units have elapsed since
    /// the source state was entered.
    pub fn after(units: LogicalTime) -> Self {
        Guard(format!("after({units})"))
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Guard {
    fn from(code: &str) -> Self {
        Guard::new(code)
    }
}

impl From<String> for Guard {
    fn from(code: String) -> Self {
        Guard(code)
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which part of a contract a condition belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clause {
    Precondition,
    Postcondition,
    Invariant,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Precondition => write!(f, "precondition"),
            Clause::Postcondition => write!(f, "postcondition"),
            Clause::Invariant => write!(f, "invariant"),
        }
    }
}

/// Conditions attached to a state or a transition.
///
/// For states, preconditions are checked on entry, postconditions on exit and
/// invariants after every pass while the state is active. For transitions,
/// preconditions are checked before the action and postconditions after it;
/// invariants are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub postconditions: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<String>,
}

impl Contract {
    pub fn is_empty(&self) -> bool {
        self.preconditions.is_empty()
            && self.postconditions.is_empty()
            && self.invariants.is_empty()
    }

    pub fn clause(&self, clause: Clause) -> &[String] {
        match clause {
            Clause::Precondition => &self.preconditions,
            Clause::Postcondition => &self.postconditions,
            Clause::Invariant => &self.invariants,
        }
    }

    /// Every condition with the clause it belongs to.
    pub fn conditions(&self) -> impl Iterator<Item = (Clause, &str)> {
        [Clause::Precondition, Clause::Postcondition, Clause::Invariant]
            .into_iter()
            .flat_map(move |clause| {
                self.clause(clause)
                    .iter()
                    .map(move |condition| (clause, condition.as_str()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn after_guard_spells_builtin_call() {
        assert_eq!(Guard::after(0).code(), "after(0)");
        assert_eq!(Guard::after(250).to_string(), "after(250)");
    }

    #[test]
    fn guard_converts_from_strings() {
        let a: Guard = "x > 1".into();
        let b: Guard = String::from("x > 1").into();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_contract_reports_empty() {
        assert!(Contract::default().is_empty());
        let contract = Contract {
            invariants: vec!["x >= 0".into()],
            ..Contract::default()
        };
        assert!(!contract.is_empty());
    }

    #[test]
    fn conditions_are_tagged_in_clause_order() {
        let contract = Contract {
            preconditions: vec!["a".into()],
            postconditions: vec!["b".into()],
            invariants: vec!["c".into(), "d".into()],
        };
        let tagged: Vec<(Clause, &str)> = contract.conditions().collect();
        assert_eq!(
            tagged,
            vec![
                (Clause::Precondition, "a"),
                (Clause::Postcondition, "b"),
                (Clause::Invariant, "c"),
                (Clause::Invariant, "d"),
            ]
        );
        assert_eq!(contract.clause(Clause::Invariant).len(), 2);
    }

    #[test]
    fn guard_serializes_as_plain_string() {
        let json = serde_json::to_string(&Guard::new("ok")).unwrap();
        assert_eq!(json, "\"ok\"");
    }
}
