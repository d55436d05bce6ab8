//! Run-to-completion step semantics.
//!
//! A macro-step consumes at most one event. The first pass fires the
//! transitions enabled by that event; eventless passes follow until nothing
//! is enabled or the configuration is final. Every pass is split in two:
//! candidates are selected and conflicts resolved against the configuration
//! as it was at the start of the pass, then the accepted transitions are
//! applied one after another in document order of their sources.
//!
//! Applying an external transition is itself split: the exit set, the new
//! history memory and the entry set are planned without side effects, so a
//! history state with nothing to restore fails before any action has run.

use super::clock::LogicalClock;
use super::config::{FaultStrategy, InterpreterConfig};
use super::contract::{check_clause, collect};
use super::error::{ActionFault, ContractViolation, ExecutionError, GuardFault};
use super::record::{MacroStep, MicroStep};
use crate::core::{
    Clause, Configuration, Event, ExecutionContext, HistoryTracker, LogicalTime, StateId,
    StateKind, StateRef, StatechartModel, Transition, TransitionId,
};
use crate::expr::{Evaluator, Scope, StateQuery};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use tracing::{debug, trace, warn};

/// Mutable state of one running statechart.
#[derive(Debug, Clone, Default)]
pub(crate) struct Runtime {
    pub(crate) configuration: Configuration,
    pub(crate) context: ExecutionContext,
    pub(crate) history: HistoryTracker,
    pub(crate) clock: LogicalClock,
}

impl Runtime {
    pub(crate) fn new(clock: LogicalClock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }
}

/// `active('name')` as seen by guards and actions.
struct ActiveView<'a> {
    model: &'a StatechartModel,
    configuration: &'a Configuration,
}

impl StateQuery for ActiveView<'_> {
    fn is_active(&self, name: &str) -> Option<bool> {
        self.model
            .id_of(name)
            .map(|id| self.configuration.contains(id))
    }
}

/// Side-effect free plan of one external transition.
struct Plan {
    /// Deepest first.
    exits: Vec<StateId>,
    /// Memory after the exits have been recorded.
    history: HistoryTracker,
    /// Shallowest first.
    entries: Vec<StateId>,
}

struct EntrySet<'p> {
    /// Active states that stay active.
    active: &'p BTreeSet<StateId>,
    history: &'p HistoryTracker,
    states: BTreeSet<StateId>,
}

impl EntrySet<'_> {
    fn includes(&self, state: StateId) -> bool {
        self.active.contains(&state) || self.states.contains(&state)
    }
}

/// What one transition, or the initial entry, is doing.
struct Firing<'e> {
    event: Option<&'e Event>,
    transition: Option<TransitionId>,
    /// Set by the first failing action; later actions are skipped.
    faulted: bool,
}

/// Outcome of one pass, settled once every accepted transition is applied.
struct Pass<'r> {
    record: &'r mut MacroStep,
    failure: Option<ActionFault>,
    violations: Vec<ContractViolation>,
}

impl<'r> Pass<'r> {
    fn new(record: &'r mut MacroStep) -> Self {
        Self {
            record,
            failure: None,
            violations: Vec::new(),
        }
    }

    fn settle(self) -> Result<(), ExecutionError> {
        if let Some(fault) = self.failure {
            return Err(ExecutionError::ActionFailed {
                location: fault.location,
                source: fault.error,
            });
        }
        if !self.violations.is_empty() {
            return Err(ExecutionError::ContractViolation(self.violations));
        }
        Ok(())
    }
}

/// Executes macro-steps of one model against a [`Runtime`].
pub(crate) struct StepEngine<'a, E: Evaluator + ?Sized> {
    model: &'a StatechartModel,
    evaluator: &'a mut E,
    config: &'a InterpreterConfig,
}

impl<'a, E: Evaluator + ?Sized> StepEngine<'a, E> {
    pub(crate) fn new(
        model: &'a StatechartModel,
        evaluator: &'a mut E,
        config: &'a InterpreterConfig,
    ) -> Self {
        Self {
            model,
            evaluator,
            config,
        }
    }

    /// Run the preamble, enter the initial configuration and stabilize.
    pub(crate) fn initialize(&mut self, runtime: &mut Runtime) -> Result<MacroStep, ExecutionError> {
        let model = self.model;
        let mut record = MacroStep::new(runtime.clock.now(), None);
        runtime.configuration.clear();

        let mut pass = Pass::new(&mut record);
        let mut preamble = Firing {
            event: None,
            transition: None,
            faulted: false,
        };
        self.run(runtime, &mut preamble, &mut pass, model.preamble(), None, || {
            "preamble".to_string()
        });

        let mut firing = Firing {
            event: None,
            transition: None,
            faulted: false,
        };
        let active = BTreeSet::new();
        let entries = self.entry_set(&active, &runtime.history, None, model.root())?;
        for &state in &entries {
            self.enter(runtime, state, &mut firing, &mut pass);
        }
        pass.record.steps.push(MicroStep {
            event: None,
            transition: None,
            exited: Vec::new(),
            entered: entries,
        });
        self.check_invariants(runtime, None, &mut pass);
        pass.settle()?;

        self.stabilize(runtime, &mut record)?;
        runtime.configuration.check(model)?;
        Ok(record)
    }

    /// Process `event` (or only stabilize, without one) to completion.
    pub(crate) fn macro_step(
        &mut self,
        runtime: &mut Runtime,
        event: Option<Event>,
    ) -> Result<MacroStep, ExecutionError> {
        let mut record = MacroStep::new(runtime.clock.now(), event.clone());
        debug!(
            chart = self.model.name(),
            event = event.as_ref().map(Event::name),
            time = record.time,
            "macro-step started"
        );

        if let Some(event) = &event {
            let selected = self.select(runtime, Some(event), &mut record);
            if selected.is_empty() {
                trace!(event = event.name(), "event enabled no transition");
            } else {
                self.pass(runtime, Some(event), selected, &mut record)?;
            }
        }
        self.stabilize(runtime, &mut record)?;
        runtime.configuration.check(self.model)?;

        debug!(
            chart = self.model.name(),
            fired = record.transitions().len(),
            "macro-step completed"
        );
        Ok(record)
    }

    fn stabilize(
        &mut self,
        runtime: &mut Runtime,
        record: &mut MacroStep,
    ) -> Result<(), ExecutionError> {
        let mut passes = 0;
        while !runtime.configuration.is_final(self.model) {
            let selected = self.select(runtime, None, record);
            if selected.is_empty() {
                break;
            }
            if passes == self.config.max_stabilization_passes {
                warn!(chart = self.model.name(), passes, "no stable configuration");
                return Err(ExecutionError::Livelock { passes });
            }
            passes += 1;
            self.pass(runtime, None, selected, record)?;
        }
        Ok(())
    }

    fn pass(
        &mut self,
        runtime: &mut Runtime,
        event: Option<&Event>,
        selected: Vec<TransitionId>,
        record: &mut MacroStep,
    ) -> Result<(), ExecutionError> {
        let mut pass = Pass::new(record);
        for transition in selected {
            self.fire(runtime, event, transition, &mut pass)?;
        }
        self.check_invariants(runtime, event, &mut pass);
        pass.settle()
    }

    /// Enabled transitions of this pass, conflict-free, in application order.
    fn select(
        &mut self,
        runtime: &Runtime,
        event: Option<&Event>,
        record: &mut MacroStep,
    ) -> Vec<TransitionId> {
        let model = self.model;
        let view = ActiveView {
            model,
            configuration: &runtime.configuration,
        };
        let now = runtime.clock.now();

        let mut candidates = Vec::new();
        for state in runtime.configuration.iter() {
            for transition in model.transitions_from(state) {
                if !transition.matches(event) {
                    continue;
                }
                let Some(guard) = transition.guard() else {
                    candidates.push(transition);
                    continue;
                };
                let scope = Scope::new(&view)
                    .with_event(event)
                    .with_time(now)
                    .with_entry_time(runtime.configuration.entered_at(state));
                match self
                    .evaluator
                    .evaluate_guard(guard.code(), &runtime.context, &scope)
                {
                    Ok(true) => candidates.push(transition),
                    Ok(false) => {}
                    Err(error) => {
                        let description = model.describe(transition.id());
                        warn!(
                            transition = %description,
                            guard = guard.code(),
                            %error,
                            "guard failed and counts as false"
                        );
                        record.guard_faults.push(GuardFault {
                            transition: transition.id(),
                            description,
                            error,
                        });
                    }
                }
            }
        }

        trace!(candidates = candidates.len(), "candidates collected");
        self.resolve_conflicts(candidates)
    }

    /// Deepest source first, then declaration order; keep each candidate that
    /// does not conflict with one already kept.
    fn resolve_conflicts(&self, mut candidates: Vec<&Transition>) -> Vec<TransitionId> {
        let model = self.model;
        candidates.sort_by_key(|t| (Reverse(model.depth_of(t.source())), t.id()));

        let mut accepted: Vec<&Transition> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if accepted.iter().all(|other| !self.conflicts(candidate, other)) {
                accepted.push(candidate);
            } else {
                trace!(transition = %model.describe(candidate.id()), "preempted");
            }
        }

        accepted.sort_by_key(|t| (t.source(), t.id()));
        accepted.into_iter().map(Transition::id).collect()
    }

    fn conflicts(&self, first: &Transition, second: &Transition) -> bool {
        let model = self.model;
        let (a, b) = (first.source(), second.source());
        if model.is_within(a, b) || model.is_within(b, a) {
            return true;
        }
        let leaves_scope = |transition: &Transition, other: StateId| {
            self.exit_scope(transition)
                .iter()
                .any(|&root| model.is_within(other, root))
        };
        leaves_scope(first, b) || leaves_scope(second, a)
    }

    /// Subtrees an external transition may exit; empty for internal ones.
    fn exit_scope(&self, transition: &Transition) -> Vec<StateId> {
        match transition.target().and_then(StateRef::id) {
            Some(target) => self.exit_roots(transition.source(), target),
            None => Vec::new(),
        }
    }

    /// Children of the LCA on the way to `source` and `target`, or the root
    /// when the LCA is the virtual super-root.
    fn exit_roots(&self, source: StateId, target: StateId) -> Vec<StateId> {
        let model = self.model;
        let Some(lca) = model.least_common_ancestor(source, target) else {
            return vec![model.root()];
        };
        let mut roots = Vec::with_capacity(2);
        for state in [source, target] {
            if let Some(child) = model.child_toward(lca, state) {
                if !roots.contains(&child) {
                    roots.push(child);
                }
            }
        }
        roots
    }

    fn fire(
        &mut self,
        runtime: &mut Runtime,
        event: Option<&Event>,
        id: TransitionId,
        pass: &mut Pass<'_>,
    ) -> Result<(), ExecutionError> {
        let model = self.model;
        let transition = model.transition(id);
        debug!(transition = %model.describe(id), "firing");

        let source_entry = runtime.configuration.entered_at(transition.source());
        let mut firing = Firing {
            event,
            transition: Some(id),
            faulted: false,
        };

        let target = match transition.target() {
            Some(target) => Some(target.id().ok_or_else(|| {
                ExecutionError::UnresolvedReference(model.name_of(transition.source()).to_string())
            })?),
            None => None,
        };

        let Some(target) = target else {
            self.transition_body(runtime, transition, source_entry, &mut firing, pass);
            pass.record.steps.push(MicroStep {
                event: event.map(|e| e.name().to_string()),
                transition: Some(id),
                exited: Vec::new(),
                entered: Vec::new(),
            });
            return Ok(());
        };

        let Plan {
            exits,
            history,
            entries,
        } = self.plan(runtime, transition.source(), target)?;

        for &state in &exits {
            self.exit(runtime, state, &mut firing, pass);
        }
        runtime.history = history;
        self.transition_body(runtime, transition, source_entry, &mut firing, pass);
        for &state in &entries {
            self.enter(runtime, state, &mut firing, pass);
        }

        pass.record.steps.push(MicroStep {
            event: event.map(|e| e.name().to_string()),
            transition: Some(id),
            exited: exits,
            entered: entries,
        });
        Ok(())
    }

    fn plan(
        &self,
        runtime: &Runtime,
        source: StateId,
        target: StateId,
    ) -> Result<Plan, ExecutionError> {
        let model = self.model;
        let roots = self.exit_roots(source, target);

        let mut exits: Vec<StateId> = runtime
            .configuration
            .iter()
            .filter(|&state| roots.iter().any(|&root| model.is_within(state, root)))
            .collect();
        exits.sort_by_key(|&state| Reverse((model.depth_of(state), state)));

        let history = exits.iter().fold(runtime.history.clone(), |tracker, &state| {
            tracker.record_exit(model, &runtime.configuration, state)
        });

        let remaining: BTreeSet<StateId> = runtime
            .configuration
            .iter()
            .filter(|state| !exits.contains(state))
            .collect();
        let anchor = model.least_common_ancestor(source, target);
        let entries = self.entry_set(&remaining, &history, anchor, target)?;

        Ok(Plan {
            exits,
            history,
            entries,
        })
    }

    /// States to enter so that `target` is active and the configuration is
    /// complete again, shallowest first.
    fn entry_set(
        &self,
        active: &BTreeSet<StateId>,
        history: &HistoryTracker,
        anchor: Option<StateId>,
        target: StateId,
    ) -> Result<Vec<StateId>, ExecutionError> {
        let model = self.model;
        let mut set = EntrySet {
            active,
            history,
            states: BTreeSet::new(),
        };
        self.mark(&mut set, anchor, target)?;
        self.complete(&mut set, anchor)?;

        let mut entries: Vec<StateId> = set.states.into_iter().collect();
        entries.sort_by_key(|&state| (model.depth_of(state), state));
        Ok(entries)
    }

    /// Add `target` and its ancestors below `above`. History targets are
    /// replaced by what they restore.
    fn mark(
        &self,
        set: &mut EntrySet<'_>,
        above: Option<StateId>,
        target: StateId,
    ) -> Result<(), ExecutionError> {
        let model = self.model;
        if Some(target) == above {
            return Ok(());
        }

        if model.state(target).is_history() {
            let owner = model.parent_of(target).ok_or_else(|| {
                ExecutionError::UnresolvedReference(model.name_of(target).to_string())
            })?;
            self.mark(set, above, owner)?;
            for restored in self.restore(set.history, target)? {
                self.mark(set, Some(owner), restored)?;
            }
            return Ok(());
        }

        let ancestors = model.ancestors_of(target);
        let path = std::iter::once(target).chain(
            ancestors
                .into_iter()
                .take_while(|&ancestor| Some(ancestor) != above),
        );
        for state in path {
            if !set.includes(state) {
                set.states.insert(state);
            }
        }
        Ok(())
    }

    fn restore(
        &self,
        history: &HistoryTracker,
        state: StateId,
    ) -> Result<Vec<StateId>, ExecutionError> {
        let model = self.model;
        if let Some(recorded) = history.get(state).filter(|recorded| !recorded.is_empty()) {
            trace!(history = model.name_of(state), "restoring memory");
            return Ok(recorded.to_vec());
        }
        let name = || model.name_of(state).to_string();
        match model.state(state).kind() {
            StateKind::History {
                default: Some(default),
                ..
            } => default
                .id()
                .map(|id| vec![id])
                .ok_or_else(|| ExecutionError::UnresolvedReference(name())),
            _ => Err(ExecutionError::NoHistory { history: name() }),
        }
    }

    /// Default completion: compound states enter their initial child,
    /// parallel states every missing region, until nothing is missing.
    fn complete(
        &self,
        set: &mut EntrySet<'_>,
        anchor: Option<StateId>,
    ) -> Result<(), ExecutionError> {
        let model = self.model;
        loop {
            let pending: Vec<StateId> = anchor
                .into_iter()
                .chain(set.states.iter().copied())
                .filter(|&state| self.incomplete(set, state))
                .collect();
            if pending.is_empty() {
                return Ok(());
            }

            for state in pending {
                if !self.incomplete(set, state) {
                    continue;
                }
                match model.state(state).kind() {
                    StateKind::Compound { initial } => {
                        let initial = initial.as_ref().and_then(StateRef::id).ok_or_else(|| {
                            ExecutionError::UnresolvedReference(model.name_of(state).to_string())
                        })?;
                        self.mark(set, Some(state), initial)?;
                    }
                    StateKind::Parallel => {
                        for &region in model.children_of(state) {
                            if !set.includes(region) {
                                self.mark(set, Some(state), region)?;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn incomplete(&self, set: &EntrySet<'_>, state: StateId) -> bool {
        let children = self.model.children_of(state);
        match self.model.state(state).kind() {
            StateKind::Compound { .. } => !children.iter().any(|&child| set.includes(child)),
            StateKind::Parallel => children.iter().any(|&child| !set.includes(child)),
            _ => false,
        }
    }

    fn exit(
        &mut self,
        runtime: &mut Runtime,
        state: StateId,
        firing: &mut Firing<'_>,
        pass: &mut Pass<'_>,
    ) {
        let model = self.model;
        let node = model.state(state);
        let entered = runtime.configuration.entered_at(state);
        self.run(runtime, firing, pass, node.on_exit(), entered, || {
            format!("on exit of state '{}'", node.name())
        });
        self.check(
            runtime,
            firing.event,
            pass,
            || format!("state '{}'", node.name()),
            Clause::Postcondition,
            &node.contract().postconditions,
            entered,
        );
        runtime.configuration.remove(state);
        trace!(state = node.name(), "exited");
    }

    fn enter(
        &mut self,
        runtime: &mut Runtime,
        state: StateId,
        firing: &mut Firing<'_>,
        pass: &mut Pass<'_>,
    ) {
        let model = self.model;
        let node = model.state(state);
        let now = runtime.clock.now();
        runtime.configuration.insert(state, now);
        trace!(state = node.name(), time = now, "entered");
        self.check(
            runtime,
            firing.event,
            pass,
            || format!("state '{}'", node.name()),
            Clause::Precondition,
            &node.contract().preconditions,
            Some(now),
        );
        self.run(runtime, firing, pass, node.on_entry(), Some(now), || {
            format!("on entry of state '{}'", node.name())
        });
    }

    fn transition_body(
        &mut self,
        runtime: &mut Runtime,
        transition: &Transition,
        source_entry: Option<LogicalTime>,
        firing: &mut Firing<'_>,
        pass: &mut Pass<'_>,
    ) {
        let model = self.model;
        let subject = || format!("transition {}", model.describe(transition.id()));
        let contract = transition.contract();
        self.check(
            runtime,
            firing.event,
            pass,
            subject,
            Clause::Precondition,
            &contract.preconditions,
            source_entry,
        );
        self.run(runtime, firing, pass, transition.action(), source_entry, || {
            format!("action of transition {}", model.describe(transition.id()))
        });
        self.check(
            runtime,
            firing.event,
            pass,
            subject,
            Clause::Postcondition,
            &contract.postconditions,
            source_entry,
        );
    }

    fn check_invariants(&mut self, runtime: &Runtime, event: Option<&Event>, pass: &mut Pass<'_>) {
        if !self.config.check_contracts {
            return;
        }
        let model = self.model;
        for state in runtime.configuration.iter() {
            let node = model.state(state);
            self.check(
                runtime,
                event,
                pass,
                || format!("state '{}'", node.name()),
                Clause::Invariant,
                &node.contract().invariants,
                runtime.configuration.entered_at(state),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check(
        &mut self,
        runtime: &Runtime,
        event: Option<&Event>,
        pass: &mut Pass<'_>,
        subject: impl FnOnce() -> String,
        clause: Clause,
        conditions: &[String],
        entered_at: Option<LogicalTime>,
    ) {
        if !self.config.check_contracts || conditions.is_empty() {
            return;
        }
        let view = ActiveView {
            model: self.model,
            configuration: &runtime.configuration,
        };
        let scope = Scope::new(&view)
            .with_event(event)
            .with_time(runtime.clock.now())
            .with_entry_time(entered_at);
        let evaluator = &mut *self.evaluator;
        let context = &runtime.context;
        let check = check_clause(&subject(), clause, conditions, |condition| {
            evaluator.evaluate_guard(condition, context, &scope)
        });
        collect(check, &mut pass.violations);
    }

    fn run(
        &mut self,
        runtime: &mut Runtime,
        firing: &mut Firing<'_>,
        pass: &mut Pass<'_>,
        code: Option<&str>,
        entered_at: Option<LogicalTime>,
        location: impl FnOnce() -> String,
    ) {
        let Some(code) = code else {
            return;
        };
        if firing.faulted {
            trace!(location = %location(), "skipped after an earlier fault");
            return;
        }

        let view = ActiveView {
            model: self.model,
            configuration: &runtime.configuration,
        };
        let scope = Scope::new(&view)
            .with_event(firing.event)
            .with_time(runtime.clock.now())
            .with_entry_time(entered_at);
        let result = self.evaluator.execute_action(
            code,
            &mut runtime.context,
            &scope,
            &mut pass.record.emitted,
        );

        if let Err(error) = result {
            firing.faulted = true;
            let location = location();
            warn!(%location, %error, "action failed");
            let fault = ActionFault {
                transition: firing.transition,
                location,
                error,
            };
            match self.config.on_action_fault {
                FaultStrategy::Abort => {
                    pass.failure.get_or_insert(fault);
                }
                FaultStrategy::IgnoreAndLog => pass.record.action_faults.push(fault),
            }
        }
    }
}
