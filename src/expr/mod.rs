//! Guard and action evaluation.
//!
//! The interpreter talks to code only through the [`Evaluator`] trait. The
//! built-in [`ScriptEvaluator`] implements a small, sandboxed Python-flavoured
//! language:
//!
//! - statements separated by newlines or `;`: `x = 1`, `x += 1`, `send('go')`
//! - literals, variables, `event.name` and `event.<field>`
//! - `+ - * / // %`, chained comparisons, `and or not`
//! - builtins `after(n)`, `active('state')`, `abs`, `min`, `max`, and
//!   `send(name, key=value, ...)` in actions
//!
//! Guards are single expressions. They cannot assign, and they cannot send
//! events. Nothing can assign `event`.
//!
//! # Example
//!
//! ```rust
//! use statecraft::core::{Event, ExecutionContext, Value};
//! use statecraft::expr::{Evaluator, Scope, ScriptEvaluator};
//!
//! let mut evaluator = ScriptEvaluator::new();
//! let mut context = ExecutionContext::new();
//! let mut outbox = Vec::new();
//!
//! let event = Event::new("floorSelected").with("floor", 5);
//! let scope = Scope::new(&()).with_event(Some(&event));
//!
//! evaluator
//!     .execute_action("destination = event.floor", &mut context, &scope, &mut outbox)
//!     .unwrap();
//! assert_eq!(context.get("destination"), Some(&Value::Int(5)));
//!
//! let scope = Scope::new(&());
//! assert!(evaluator.evaluate_guard("destination > 4", &context, &scope).unwrap());
//! ```

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;

pub use ast::{BinaryOp, CompareOp, Expr, Program, SourceLocation, Stmt, UnaryOp};
pub use error::EvalError;
pub use parser::{parse_guard, parse_program};

use crate::core::{Event, ExecutionContext, LogicalTime};
use std::collections::HashMap;

/// Whether a piece of code is a guard (a boolean expression) or an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Guard,
    Action,
}

/// Answers `active('name')` for the evaluator.
pub trait StateQuery {
    /// `Some(active)` for a known state, `None` if no state has that name.
    fn is_active(&self, name: &str) -> Option<bool>;
}

/// No states at all.
impl StateQuery for () {
    fn is_active(&self, _name: &str) -> Option<bool> {
        None
    }
}

/// A plain list of active state names; every other name is inactive.
impl StateQuery for Vec<&str> {
    fn is_active(&self, name: &str) -> Option<bool> {
        Some(self.contains(&name))
    }
}

/// Read-only bindings of one evaluation.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    event: Option<&'a Event>,
    now: LogicalTime,
    entered_at: Option<LogicalTime>,
    states: &'a dyn StateQuery,
}

impl<'a> Scope<'a> {
    pub fn new(states: &'a dyn StateQuery) -> Self {
        Self {
            event: None,
            now: 0,
            entered_at: None,
            states,
        }
    }

    pub fn with_event(mut self, event: Option<&'a Event>) -> Self {
        self.event = event;
        self
    }

    pub fn with_time(mut self, now: LogicalTime) -> Self {
        self.now = now;
        self
    }

    /// Entry time of the state owning the guard or action, for `after(n)`.
    pub fn with_entry_time(mut self, entered_at: Option<LogicalTime>) -> Self {
        self.entered_at = entered_at;
        self
    }

    pub fn event(&self) -> Option<&'a Event> {
        self.event
    }

    pub fn now(&self) -> LogicalTime {
        self.now
    }

    pub fn entered_at(&self) -> Option<LogicalTime> {
        self.entered_at
    }

    pub fn is_active(&self, name: &str) -> Option<bool> {
        self.states.is_active(name)
    }
}

/// Evaluates guards and executes actions on behalf of the interpreter.
///
/// Implementations must not keep references to the context or the scope.
/// Actions may change the context and push events onto `outbox`; those events
/// are delivered only after the current macro-step has stabilized.
pub trait Evaluator {
    /// Check that `code` compiles. Called once per piece of code by
    /// [`validate_with`](crate::validation::validate_with).
    fn prepare(&mut self, code: &str, kind: CodeKind) -> Result<(), EvalError> {
        let _ = (code, kind);
        Ok(())
    }

    fn evaluate_guard(
        &mut self,
        code: &str,
        context: &ExecutionContext,
        scope: &Scope<'_>,
    ) -> Result<bool, EvalError>;

    fn execute_action(
        &mut self,
        code: &str,
        context: &mut ExecutionContext,
        scope: &Scope<'_>,
        outbox: &mut Vec<Event>,
    ) -> Result<(), EvalError>;
}

/// The built-in evaluator. Compiled code is cached per source text.
#[derive(Debug, Default, Clone)]
pub struct ScriptEvaluator {
    guards: HashMap<String, Expr>,
    actions: HashMap<String, Program>,
}

impl ScriptEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&mut self, code: &str) -> Result<&Expr, EvalError> {
        if !self.guards.contains_key(code) {
            let expr = parse_guard(code)?;
            self.guards.insert(code.to_string(), expr);
        }
        self.guards
            .get(code)
            .ok_or_else(|| EvalError::syntax("guard missing from cache", 1, 1))
    }

    fn action(&mut self, code: &str) -> Result<&Program, EvalError> {
        if !self.actions.contains_key(code) {
            let program = parse_program(code)?;
            self.actions.insert(code.to_string(), program);
        }
        self.actions
            .get(code)
            .ok_or_else(|| EvalError::syntax("action missing from cache", 1, 1))
    }

    /// Number of distinct compiled guards and actions.
    pub fn cached(&self) -> usize {
        self.guards.len() + self.actions.len()
    }
}

impl Evaluator for ScriptEvaluator {
    fn prepare(&mut self, code: &str, kind: CodeKind) -> Result<(), EvalError> {
        match kind {
            CodeKind::Guard => self.guard(code).map(|_| ()),
            CodeKind::Action => self.action(code).map(|_| ()),
        }
    }

    fn evaluate_guard(
        &mut self,
        code: &str,
        context: &ExecutionContext,
        scope: &Scope<'_>,
    ) -> Result<bool, EvalError> {
        let expr = self.guard(code)?;
        eval::evaluate_guard(expr, context, scope)
    }

    fn execute_action(
        &mut self,
        code: &str,
        context: &mut ExecutionContext,
        scope: &Scope<'_>,
        outbox: &mut Vec<Event>,
    ) -> Result<(), EvalError> {
        let program = self.action(code)?;
        eval::execute_action(program, context, scope, outbox)
    }
}
