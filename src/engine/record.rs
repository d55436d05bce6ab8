//! Records of what a macro-step did.

use super::error::{ActionFault, GuardFault};
use crate::core::{Event, LogicalTime, StateId, TransitionId};

/// One fired transition with the states it left and entered.
#[derive(Debug, Clone, PartialEq)]
pub struct MicroStep {
    /// Name of the triggering event; `None` on eventless passes.
    pub event: Option<String>,
    /// `None` for the initial entry.
    pub transition: Option<TransitionId>,
    /// In exit order.
    pub exited: Vec<StateId>,
    /// In entry order.
    pub entered: Vec<StateId>,
}

/// Everything that happened while processing one event (or one eventless
/// stabilization) to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroStep {
    pub time: LogicalTime,
    pub event: Option<Event>,
    pub steps: Vec<MicroStep>,
    pub guard_faults: Vec<GuardFault>,
    pub action_faults: Vec<ActionFault>,
    /// Events sent by actions, queued for delivery once this step is stable.
    pub emitted: Vec<Event>,
}

impl MacroStep {
    pub(crate) fn new(time: LogicalTime, event: Option<Event>) -> Self {
        Self {
            time,
            event,
            steps: Vec::new(),
            guard_faults: Vec::new(),
            action_faults: Vec::new(),
            emitted: Vec::new(),
        }
    }

    /// Fired transitions in firing order.
    pub fn transitions(&self) -> Vec<TransitionId> {
        self.steps.iter().filter_map(|step| step.transition).collect()
    }

    pub fn entered_states(&self) -> Vec<StateId> {
        self.steps
            .iter()
            .flat_map(|step| step.entered.iter().copied())
            .collect()
    }

    pub fn exited_states(&self) -> Vec<StateId> {
        self.steps
            .iter()
            .flat_map(|step| step.exited.iter().copied())
            .collect()
    }

    /// Whether nothing fired.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
