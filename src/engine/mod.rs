//! Statechart execution.
//!
//! [`Interpreter`] drives one statechart instance: it owns the execution
//! context, the active configuration, the history memory and the logical
//! clock, and processes events one macro-step at a time.
//!
//! # Example
//!
//! ```rust
//! use statecraft::builder::from_json;
//! use statecraft::core::Event;
//! use statecraft::engine::Interpreter;
//!
//! let model = from_json(r#"{
//!     "name": "counter",
//!     "preamble": "count = 0",
//!     "root state": {
//!         "name": "counting",
//!         "transitions": [{"event": "inc", "action": "count += event.by"}]
//!     }
//! }"#).unwrap();
//!
//! let mut interpreter = Interpreter::new(model).unwrap();
//! interpreter.start().unwrap();
//! interpreter.send(Event::new("inc").with("by", 3)).unwrap();
//! interpreter.send(Event::new("inc").with("by", 4)).unwrap();
//!
//! assert_eq!(interpreter.context().get("count").and_then(|v| v.as_int()), Some(7));
//! ```

mod clock;
mod config;
mod contract;
mod error;
mod interpreter;
mod record;
mod step;

pub use clock::{ClockError, LogicalClock};
pub use config::{FaultStrategy, InterpreterConfig};
pub use error::{ActionFault, ContractViolation, ExecutionError, GuardFault};
pub use interpreter::{Interpreter, Status};
pub use record::{MacroStep, MicroStep};
