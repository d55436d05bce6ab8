//! Statecraft: a Harel statechart interpreter
//!
//! Statecraft executes hierarchical state machines with compound and
//! parallel states, shallow and deep history, guards, actions, timed
//! transitions and design-by-contract checks, under run-to-completion
//! semantics.
//!
//! The model is immutable data; execution state lives in an [`Interpreter`]
//! and every guard and action is evaluated against that interpreter's own
//! context.
//!
//! # Core Concepts
//!
//! - **Model**: a flat, validated state tree built with the builders or
//!   loaded from a declarative definition
//! - **Configuration**: the set of active states, always structurally valid
//!   between macro-steps
//! - **Macro-step**: one event processed to completion, followed by
//!   eventless transitions until the configuration is stable
//! - **Evaluator**: the language guards and actions are written in
//!
//! # Example
//!
//! ```rust
//! use statecraft::builder::{on_event, StateBuilder, StatechartBuilder};
//! use statecraft::{Event, Interpreter};
//!
//! let model = StatechartBuilder::new("player")
//!     .preamble("plays = 0")
//!     .root(
//!         StateBuilder::compound("player")
//!             .initial("stopped")
//!             .child(
//!                 StateBuilder::simple("stopped")
//!                     .transition(on_event("play", "playing").action("plays += 1")),
//!             )
//!             .child(StateBuilder::simple("playing").transition(on_event("stop", "stopped"))),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut interpreter = Interpreter::new(model).unwrap();
//! interpreter.start().unwrap();
//! interpreter.send(Event::new("play")).unwrap();
//!
//! assert_eq!(interpreter.active_leaves(), vec!["playing"]);
//! assert_eq!(interpreter.context().get("plays").and_then(|v| v.as_int()), Some(1));
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod expr;
pub mod validation;

// Re-export commonly used types
pub use builder::{from_json, load, StateBuilder, StatechartBuilder, TransitionBuilder};
pub use core::{Configuration, Event, ExecutionContext, StatechartModel, Value};
pub use engine::{ExecutionError, Interpreter, InterpreterConfig, MacroStep, Status};
pub use expr::{Evaluator, ScriptEvaluator};
pub use validation::{validate, ValidationError};
