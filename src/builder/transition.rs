//! Builder for transitions.

use crate::core::{Contract, Guard, LogicalTime, StateId, StateRef, Transition, TransitionId};

/// Builder for constructing transitions with a fluent API.
///
/// A transition is attached to its source with
/// [`StateBuilder::transition`](super::StateBuilder::transition).
#[derive(Debug, Clone)]
pub struct TransitionBuilder {
    target: Option<String>,
    event: Option<String>,
    guard: Option<Guard>,
    action: Option<String>,
    contract: Contract,
}

impl TransitionBuilder {
    /// External transition to the state named `target`.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::internal()
        }
    }

    /// Internal transition: runs its action without leaving the source.
    pub fn internal() -> Self {
        Self {
            target: None,
            event: None,
            guard: None,
            action: None,
            contract: Contract::default(),
        }
    }

    /// Fire only on this event (optional; without it the transition is
    /// eventless).
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn guard(mut self, guard: impl Into<Guard>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    /// Require `units` of logical time since the source was entered, on top
    /// of any guard already set.
    pub fn after(mut self, units: LogicalTime) -> Self {
        let timer = Guard::after(units);
        self.guard = Some(match self.guard.take() {
            Some(guard) => Guard::new(format!("{timer} and ({guard})")),
            None => timer,
        });
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Condition checked before the action runs.
    pub fn precondition(mut self, condition: impl Into<String>) -> Self {
        self.contract.preconditions.push(condition.into());
        self
    }

    /// Condition checked after the action has run.
    pub fn postcondition(mut self, condition: impl Into<String>) -> Self {
        self.contract.postconditions.push(condition.into());
        self
    }

    pub(crate) fn build(self, id: TransitionId, source: StateId) -> Transition {
        Transition {
            id,
            source,
            target: self.target.map(StateRef::unresolved),
            event: self.event,
            guard: self.guard,
            action: self.action,
            contract: self.contract,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_external_transition() {
        let transition = TransitionBuilder::to("b")
            .event("go")
            .guard("x > 1")
            .action("x = 0")
            .build(TransitionId(3), StateId(1));

        assert_eq!(transition.id(), TransitionId(3));
        assert_eq!(transition.source(), StateId(1));
        assert_eq!(transition.target().map(StateRef::name), Some("b"));
        assert_eq!(transition.event(), Some("go"));
        assert_eq!(transition.guard().map(Guard::code), Some("x > 1"));
        assert_eq!(transition.action(), Some("x = 0"));
        assert!(!transition.is_internal());
    }

    #[test]
    fn internal_transition_has_no_target() {
        let transition = TransitionBuilder::internal()
            .event("tick")
            .build(TransitionId(0), StateId(0));
        assert!(transition.is_internal());
        assert!(transition.target().is_none());
    }

    #[test]
    fn after_combines_with_existing_guard() {
        let timer_only = TransitionBuilder::to("b").after(10).build(TransitionId(0), StateId(0));
        assert_eq!(timer_only.guard().map(Guard::code), Some("after(10)"));

        let combined = TransitionBuilder::to("b")
            .guard("current > 0")
            .after(10)
            .build(TransitionId(0), StateId(0));
        assert_eq!(
            combined.guard().map(Guard::code),
            Some("after(10) and (current > 0)")
        );
    }

    #[test]
    fn contract_clauses_accumulate() {
        let transition = TransitionBuilder::to("b")
            .precondition("x > 0")
            .precondition("y > 0")
            .postcondition("x == 0")
            .build(TransitionId(0), StateId(0));
        assert_eq!(transition.contract().preconditions.len(), 2);
        assert_eq!(transition.contract().postconditions, vec!["x == 0".to_string()]);
    }
}
