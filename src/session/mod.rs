//! Host-facing session.
//!
//! A [`Session`] owns the game value and everything needed to play it:
//! the flow engine, the action registry, each player's pending action and
//! an append-only history of [`SerializedAction`](crate::actions::SerializedAction)s.
//! Hosts drive it with two kinds of calls:
//!
//! - [`Session::perform_action`] with a full argument set
//! - [`Session::submit_selection`] one value at a time, for clients that
//!   walk the player through an action's selections
//!
//! A session can be rebuilt from its history with [`Session::replay`].

mod host;
mod replay;

pub use host::{Session, StepOutcome};
