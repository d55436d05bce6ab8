//! The statechart interpreter: event queues, lifecycle and clock around the
//! step engine.

use super::clock::LogicalClock;
use super::config::InterpreterConfig;
use super::error::ExecutionError;
use super::record::MacroStep;
use super::step::{Runtime, StepEngine};
use crate::core::{
    Configuration, Event, ExecutionContext, HistoryTracker, LogicalTime, StatechartModel,
};
use crate::expr::{Evaluator, ScriptEvaluator};
use crate::validation::validate_with;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle of an interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    Running,
    /// A final configuration was reached; no more events are accepted.
    Finished,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NotStarted => write!(f, "not started"),
            Status::Running => write!(f, "running"),
            Status::Finished => write!(f, "finished"),
        }
    }
}

/// Executes one statechart instance.
///
/// The interpreter owns the execution context, the configuration and the
/// history memory of its instance. All mutation goes through `&mut self`;
/// hosts with several producers serialize events before calling
/// [`send`](Self::send) or [`queue`](Self::queue).
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{on_event, StateBuilder, StatechartBuilder};
/// use statecraft::core::Event;
/// use statecraft::engine::Interpreter;
///
/// let model = StatechartBuilder::new("switch")
///     .root(
///         StateBuilder::compound("switch")
///             .initial("off")
///             .child(StateBuilder::simple("off").transition(on_event("press", "on")))
///             .child(StateBuilder::simple("on").transition(on_event("press", "off"))),
///     )
///     .build()
///     .unwrap();
///
/// let mut interpreter = Interpreter::new(model).unwrap();
/// interpreter.start().unwrap();
/// assert_eq!(interpreter.active_states(), vec!["switch", "off"]);
///
/// interpreter.send(Event::new("press")).unwrap();
/// assert_eq!(interpreter.active_states(), vec!["switch", "on"]);
/// ```
pub struct Interpreter<E: Evaluator = ScriptEvaluator> {
    id: Uuid,
    model: Arc<StatechartModel>,
    evaluator: E,
    config: InterpreterConfig,
    runtime: Runtime,
    status: Status,
    internal: VecDeque<Event>,
    external: VecDeque<Event>,
}

impl Interpreter<ScriptEvaluator> {
    /// Validate `model` and create an interpreter with the built-in
    /// evaluator and the default configuration.
    pub fn new(model: impl Into<Arc<StatechartModel>>) -> Result<Self, ExecutionError> {
        Self::with_evaluator(model, ScriptEvaluator::new(), InterpreterConfig::default())
    }
}

impl<E: Evaluator> Interpreter<E> {
    /// Validate `model` once, compiling every piece of code with `evaluator`.
    pub fn with_evaluator(
        model: impl Into<Arc<StatechartModel>>,
        mut evaluator: E,
        config: InterpreterConfig,
    ) -> Result<Self, ExecutionError> {
        let model = model.into();
        validate_with(&model, &mut evaluator)?;

        let id = Uuid::new_v4();
        debug!(%id, chart = model.name(), "interpreter created");
        Ok(Self {
            id,
            runtime: Runtime::new(LogicalClock::new(config.initial_time)),
            model,
            evaluator,
            config,
            status: Status::NotStarted,
            internal: VecDeque::new(),
            external: VecDeque::new(),
        })
    }

    /// Run the preamble and enter the initial configuration.
    ///
    /// Variables set through [`context_mut`](Self::context_mut) beforehand
    /// are visible to the preamble.
    ///
    /// A fault raised once the initial configuration has been entered is
    /// returned, but the instance is `Running` (or `Finished`) all the same,
    /// exactly as after a failed [`send`](Self::send).
    pub fn start(&mut self) -> Result<MacroStep, ExecutionError> {
        self.require(Status::NotStarted, "start")?;
        info!(id = %self.id, chart = self.model.name(), "starting");

        let result = StepEngine::new(&self.model, &mut self.evaluator, &self.config)
            .initialize(&mut self.runtime);
        if !self.runtime.configuration.is_empty() {
            self.status = Status::Running;
        }
        self.settle(result)
    }

    /// Append an external event to the queue without processing it.
    pub fn queue(&mut self, event: Event) {
        self.external.push_back(event);
    }

    /// Process `event` and everything it causes, then return the resulting
    /// configuration.
    pub fn send(&mut self, event: Event) -> Result<Configuration, ExecutionError> {
        self.dispatch(event)?;
        Ok(self.runtime.configuration.clone())
    }

    /// Queue `event` and process the queues until they are empty.
    pub fn dispatch(&mut self, event: Event) -> Result<Vec<MacroStep>, ExecutionError> {
        self.require(Status::Running, "send events to")?;
        self.queue(event);

        let mut steps = Vec::new();
        while let Some(step) = self.execute_once()? {
            steps.push(step);
        }
        Ok(steps)
    }

    /// Process the next queued event, internal events first.
    ///
    /// Returns `Ok(None)` when both queues are empty or the instance has
    /// finished.
    pub fn execute_once(&mut self) -> Result<Option<MacroStep>, ExecutionError> {
        if self.status == Status::Finished {
            return Ok(None);
        }
        self.require(Status::Running, "execute")?;

        let Some(event) = self
            .internal
            .pop_front()
            .or_else(|| self.external.pop_front())
        else {
            return Ok(None);
        };

        let result = StepEngine::new(&self.model, &mut self.evaluator, &self.config)
            .macro_step(&mut self.runtime, Some(event));
        self.settle(result).map(Some)
    }

    /// Move the clock forward by `delta` and let `after(n)` guards fire.
    pub fn advance_time(&mut self, delta: LogicalTime) -> Result<MacroStep, ExecutionError> {
        self.require(Status::Running, "advance the clock of")?;
        self.runtime.clock.advance(delta)?;
        self.settle_time()
    }

    /// Set the clock to `time`, which must not be in the past.
    pub fn set_time(&mut self, time: LogicalTime) -> Result<MacroStep, ExecutionError> {
        self.require(Status::Running, "advance the clock of")?;
        self.runtime.clock.set(time)?;
        self.settle_time()
    }

    fn settle_time(&mut self) -> Result<MacroStep, ExecutionError> {
        debug!(id = %self.id, time = self.runtime.clock.now(), "clock moved");
        let result = StepEngine::new(&self.model, &mut self.evaluator, &self.config)
            .macro_step(&mut self.runtime, None);
        self.settle(result)
    }

    /// Events are queued only from successful steps; a final configuration
    /// finishes the instance either way.
    fn settle(
        &mut self,
        result: Result<MacroStep, ExecutionError>,
    ) -> Result<MacroStep, ExecutionError> {
        if let Ok(step) = &result {
            self.internal.extend(step.emitted.iter().cloned());
        }
        self.finish_if_final();
        result
    }

    fn finish_if_final(&mut self) {
        if self.status == Status::Running && self.runtime.configuration.is_final(&self.model) {
            self.status = Status::Finished;
            self.internal.clear();
            self.external.clear();
            info!(id = %self.id, chart = self.model.name(), "finished");
        }
    }

    fn require(&self, expected: Status, operation: &'static str) -> Result<(), ExecutionError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(ExecutionError::InvalidInstanceState {
                operation,
                status: self.status,
            })
        }
    }

    /// Unique id of this instance.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The validated model being executed.
    pub fn model(&self) -> &StatechartModel {
        &self.model
    }

    /// The configuration this interpreter was created with.
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// The active states with their entry times.
    pub fn configuration(&self) -> &Configuration {
        &self.runtime.configuration
    }

    /// Names of the active states in document order.
    pub fn active_states(&self) -> Vec<&str> {
        self.runtime.configuration.names(&self.model)
    }

    /// Names of the active states that have no active child.
    pub fn active_leaves(&self) -> Vec<&str> {
        let leaves = self.runtime.configuration.leaves(&self.model);
        self.model.names_of(&leaves)
    }

    /// Whether the state called `name` is active.
    pub fn is_active(&self, name: &str) -> bool {
        self.model
            .id_of(name)
            .is_some_and(|id| self.runtime.configuration.contains(id))
    }

    /// The variables of this instance.
    pub fn context(&self) -> &ExecutionContext {
        &self.runtime.context
    }

    /// Host-side access to the variables, e.g. to seed them before
    /// [`start`](Self::start).
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.runtime.context
    }

    /// What each history state has recorded so far.
    pub fn history(&self) -> &HistoryTracker {
        &self.runtime.history
    }

    /// Current logical time.
    pub fn time(&self) -> LogicalTime {
        self.runtime.clock.now()
    }

    /// Where the instance is in its lifecycle.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether the active configuration is final.
    pub fn is_final(&self) -> bool {
        self.runtime.configuration.is_final(&self.model)
    }

    /// Number of events waiting in both queues.
    pub fn pending(&self) -> usize {
        self.internal.len() + self.external.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{goto, on_event, StateBuilder, StatechartBuilder, TransitionBuilder};
    use crate::core::Value;
    use crate::validation::DefinitionIssue;

    fn toggle() -> StatechartModel {
        StatechartBuilder::new("toggle")
            .preamble("presses = 0")
            .root(
                StateBuilder::compound("root")
                    .initial("off")
                    .child(
                        StateBuilder::simple("off")
                            .transition(on_event("press", "on").action("presses += 1")),
                    )
                    .child(
                        StateBuilder::simple("on")
                            .transition(on_event("press", "off").action("presses += 1"))
                            .transition(on_event("stop", "done")),
                    )
                    .child(StateBuilder::final_state("done")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn invalid_models_are_rejected_once() {
        let model = StatechartBuilder::new("bad")
            .root(StateBuilder::compound("root").child(StateBuilder::simple("a")))
            .build()
            .unwrap();
        let Err(ExecutionError::Definition(error)) = Interpreter::new(model) else {
            panic!("expected a definition error");
        };
        assert_eq!(
            error.issues(),
            &[DefinitionIssue::MissingInitial("root".into())]
        );
    }

    #[test]
    fn lifecycle_is_enforced() {
        let mut interpreter = Interpreter::new(toggle()).unwrap();
        assert_eq!(interpreter.status(), Status::NotStarted);
        assert!(matches!(
            interpreter.send(Event::new("press")),
            Err(ExecutionError::InvalidInstanceState {
                status: Status::NotStarted,
                ..
            })
        ));

        interpreter.start().unwrap();
        assert_eq!(interpreter.status(), Status::Running);
        assert!(matches!(
            interpreter.start(),
            Err(ExecutionError::InvalidInstanceState {
                status: Status::Running,
                ..
            })
        ));
    }

    #[test]
    fn reaching_a_final_state_finishes_the_instance() {
        let mut interpreter = Interpreter::new(toggle()).unwrap();
        interpreter.start().unwrap();
        interpreter.send(Event::new("press")).unwrap();
        interpreter.queue(Event::new("stop"));
        interpreter.queue(Event::new("press"));

        assert_eq!(interpreter.execute_once().unwrap().map(|s| s.transitions().len()), Some(1));
        assert_eq!(interpreter.status(), Status::Finished);
        assert!(interpreter.is_final());
        assert_eq!(interpreter.pending(), 0);
        assert_eq!(interpreter.execute_once().unwrap(), None);
        assert!(matches!(
            interpreter.advance_time(1),
            Err(ExecutionError::InvalidInstanceState {
                status: Status::Finished,
                ..
            })
        ));
    }

    #[test]
    fn unhandled_event_changes_nothing() {
        let mut interpreter = Interpreter::new(toggle()).unwrap();
        interpreter.start().unwrap();
        let configuration = interpreter.configuration().clone();
        let context = interpreter.context().clone();

        let steps = interpreter.dispatch(Event::new("unknown")).unwrap();
        assert_eq!(steps.len(), 1);
        assert!(steps[0].is_empty());
        assert_eq!(interpreter.configuration(), &configuration);
        assert_eq!(interpreter.context(), &context);
    }

    #[test]
    fn emitted_events_are_processed_before_external_ones() {
        let model = StatechartBuilder::new("relay")
            .preamble("order = ''")
            .root(
                StateBuilder::compound("root")
                    .initial("idle")
                    .child(
                        StateBuilder::simple("idle")
                            .transition(
                                on_event("go", "busy").action("send('ping')\norder += 'g'"),
                            ),
                    )
                    .child(
                        StateBuilder::simple("busy")
                            .transition(
                                TransitionBuilder::internal()
                                    .event("ping")
                                    .action("order += 'p'"),
                            )
                            .transition(
                                TransitionBuilder::internal()
                                    .event("later")
                                    .action("order += 'l'"),
                            ),
                    ),
            )
            .build()
            .unwrap();
        let mut interpreter = Interpreter::new(model).unwrap();
        interpreter.start().unwrap();
        interpreter.queue(Event::new("go"));
        interpreter.queue(Event::new("later"));

        while interpreter.execute_once().unwrap().is_some() {}
        assert_eq!(interpreter.context().get("order"), Some(&Value::from("gpl")));
    }

    #[test]
    fn timed_transitions_follow_the_clock() {
        let model = StatechartBuilder::new("timer")
            .root(
                StateBuilder::compound("root")
                    .initial("waiting")
                    .child(StateBuilder::simple("waiting").transition(goto("expired").after(10)))
                    .child(StateBuilder::simple("expired")),
            )
            .build()
            .unwrap();
        let config = InterpreterConfig::default().initial_time(3);
        let mut interpreter =
            Interpreter::with_evaluator(model, ScriptEvaluator::new(), config).unwrap();
        interpreter.start().unwrap();

        interpreter.advance_time(9).unwrap();
        assert_eq!(interpreter.time(), 12);
        assert!(interpreter.is_active("waiting"));

        interpreter.set_time(13).unwrap();
        assert!(interpreter.is_active("expired"));

        assert!(matches!(
            interpreter.set_time(5),
            Err(ExecutionError::Clock(_))
        ));
    }

    #[test]
    fn seeded_context_is_visible_to_the_preamble() {
        let model = StatechartBuilder::new("seed")
            .preamble("total = base * 2")
            .root(StateBuilder::simple("only"))
            .build()
            .unwrap();
        let mut interpreter = Interpreter::new(model).unwrap();
        interpreter.context_mut().set("base", 21);
        interpreter.start().unwrap();
        assert_eq!(interpreter.context().get("total"), Some(&Value::from(42)));
        assert_eq!(interpreter.active_leaves(), vec!["only"]);
    }

    #[test]
    fn failed_step_into_a_final_state_finishes_the_instance() {
        let model = StatechartBuilder::new("faulty stop")
            .root(
                StateBuilder::compound("root")
                    .initial("a")
                    .child(
                        StateBuilder::simple("a")
                            .transition(on_event("stop", "done").action("missing += 1")),
                    )
                    .child(StateBuilder::final_state("done")),
            )
            .build()
            .unwrap();
        let mut interpreter = Interpreter::new(model).unwrap();
        interpreter.start().unwrap();
        interpreter.queue(Event::new("stop"));
        interpreter.queue(Event::new("later"));

        assert!(matches!(
            interpreter.execute_once(),
            Err(ExecutionError::ActionFailed { .. })
        ));
        assert!(interpreter.is_final());
        assert_eq!(interpreter.status(), Status::Finished);
        assert_eq!(interpreter.pending(), 0);
        assert!(matches!(
            interpreter.send(Event::new("stop")),
            Err(ExecutionError::InvalidInstanceState {
                status: Status::Finished,
                ..
            })
        ));
    }

    #[test]
    fn faulting_initial_entry_still_starts_the_instance() {
        let model = StatechartBuilder::new("faulty entry")
            .preamble("n = 0")
            .root(
                StateBuilder::compound("root")
                    .initial("a")
                    .child(
                        StateBuilder::simple("a")
                            .on_entry("n += 1\nboom += 1")
                            .transition(on_event("go", "b")),
                    )
                    .child(StateBuilder::simple("b")),
            )
            .build()
            .unwrap();
        let mut interpreter = Interpreter::new(model).unwrap();

        assert!(matches!(
            interpreter.start(),
            Err(ExecutionError::ActionFailed { .. })
        ));
        assert_eq!(interpreter.status(), Status::Running);
        assert_eq!(interpreter.active_states(), vec!["root", "a"]);
        assert_eq!(interpreter.context().get("n"), Some(&Value::from(1)));
        assert!(matches!(
            interpreter.start(),
            Err(ExecutionError::InvalidInstanceState {
                status: Status::Running,
                ..
            })
        ));

        interpreter.send(Event::new("go")).unwrap();
        assert_eq!(interpreter.active_leaves(), vec!["b"]);
        assert_eq!(interpreter.context().get("n"), Some(&Value::from(1)));
    }

    #[test]
    fn interpreter_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Interpreter>();
    }
}
