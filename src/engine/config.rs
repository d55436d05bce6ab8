//! Interpreter configuration.

use crate::core::LogicalTime;
use serde::{Deserialize, Serialize};

/// What to do when an action fails at run time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultStrategy {
    /// Finish the current pass structurally, then stop the macro-step with
    /// an error.
    #[default]
    Abort,

    /// Record the fault, log a warning and keep going.
    IgnoreAndLog,
}

/// Tunables for one [`Interpreter`](super::Interpreter).
///
/// # Example
///
/// ```rust
/// use statecraft::engine::{FaultStrategy, InterpreterConfig};
///
/// let config = InterpreterConfig::default()
///     .max_stabilization_passes(100)
///     .on_action_fault(FaultStrategy::IgnoreAndLog);
///
/// assert_eq!(config.max_stabilization_passes, 100);
/// assert!(config.check_contracts);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Upper bound on eventless passes in one macro-step.
    pub max_stabilization_passes: usize,
    pub on_action_fault: FaultStrategy,
    pub check_contracts: bool,
    /// Clock reading when the interpreter is created.
    pub initial_time: LogicalTime,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_stabilization_passes: 10_000,
            on_action_fault: FaultStrategy::Abort,
            check_contracts: true,
            initial_time: 0,
        }
    }
}

impl InterpreterConfig {
    pub fn max_stabilization_passes(mut self, passes: usize) -> Self {
        self.max_stabilization_passes = passes;
        self
    }

    pub fn on_action_fault(mut self, strategy: FaultStrategy) -> Self {
        self.on_action_fault = strategy;
        self
    }

    pub fn check_contracts(mut self, enabled: bool) -> Self {
        self.check_contracts = enabled;
        self
    }

    pub fn initial_time(mut self, time: LogicalTime) -> Self {
        self.initial_time = time;
        self
    }
}
