//! Core statechart types.
//!
//! This module contains the immutable model and the pure data the
//! interpreter threads through every step:
//! - The flat state table and transitions (`StatechartModel`)
//! - Events, values and the execution context
//! - The active configuration and history memory
//!
//! Nothing in here evaluates code or performs side effects; that is the job
//! of [`expr`](crate::expr) and [`engine`](crate::engine).

mod configuration;
mod context;
mod event;
mod guard;
mod history;
mod model;
mod state;
mod transition;
mod value;

/// Logical clock reading. One unit has no physical meaning.
pub type LogicalTime = u64;

pub use configuration::{Configuration, ConfigurationError};
pub use context::ExecutionContext;
pub use event::Event;
pub use guard::{Clause, Contract, Guard};
pub use history::HistoryTracker;
pub use model::StatechartModel;
pub use state::{StateId, StateKind, StateNode, StateRef};
pub use transition::{Transition, TransitionId};
pub use value::Value;
