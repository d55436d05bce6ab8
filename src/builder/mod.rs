//! Builder API for statechart construction.
//!
//! Charts can be assembled in code with [`StatechartBuilder`] and
//! [`StateBuilder`], or loaded from a declarative [`StatechartDefinition`].
//! Both routes produce the same [`StatechartModel`](crate::core::StatechartModel).

pub mod chart;
pub mod definition;
pub mod error;
pub mod state;
pub mod transition;

pub use chart::StatechartBuilder;
pub use definition::{
    from_json, load, ContractClause, StateDefinition, StateType, StatechartDefinition,
    TransitionDefinition,
};
pub use error::BuildError;
pub use state::StateBuilder;
pub use transition::TransitionBuilder;

/// Create an eventless transition to `target`.
///
/// # Example
///
/// ```
/// use statecraft::builder::{goto, StateBuilder};
///
/// let state = StateBuilder::simple("loading").transition(goto("ready").guard("loaded"));
/// ```
pub fn goto(target: impl Into<String>) -> TransitionBuilder {
    TransitionBuilder::to(target)
}

/// Create a transition to `target` triggered by `event`.
///
/// # Example
///
/// ```
/// use statecraft::builder::{on_event, StateBuilder};
///
/// let state = StateBuilder::simple("stopped").transition(on_event("play", "playing"));
/// ```
pub fn on_event(event: impl Into<String>, target: impl Into<String>) -> TransitionBuilder {
    TransitionBuilder::to(target).event(event)
}
