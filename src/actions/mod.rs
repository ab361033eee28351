//! Actions and their selection chains.
//!
//! An action is declared once with [`ActionBuilder`]: labeled conditions,
//! an ordered list of [`Selection`]s and an execute callback. The
//! [`ActionExecutor`] answers every runtime question about it:
//!
//! - which values a selection offers given the earlier choices
//! - whether a supplied value (or full argument set) is valid
//! - whether the action can be completed at all, by searching the whole
//!   remaining chain ([`PathSearch`])
//! - running it, and recording it as a [`SerializedAction`]
//!
//! Multi-step and repeating actions are tracked by [`PendingActionState`],
//! a serializable record that survives reconnects.

pub mod definition;
pub mod executor;
pub mod lookahead;
pub mod pending;
pub mod registry;
pub mod result;
pub mod selection;
pub mod trace;

pub use definition::{ActionBuilder, ActionDefinition, ConditionContext, ConditionFn, ExecuteFn};
pub use executor::ActionExecutor;
pub use lookahead::PathSearch;
pub use pending::{PendingActionState, RepeatProgress};
pub use registry::ActionRegistry;
pub use result::{ActionResult, Seat, SerializedAction};
pub use selection::{
    Choice, ChoiceSet, RepeatConfig, Selection, SelectionContext, SelectionKind, SelectionType,
};
pub use trace::{ActionDebugInfo, ConditionTrace, SelectionDebugInfo};
