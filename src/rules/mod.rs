//! Game contract.
//!
//! The engine calls into `GameRules` but never interprets game-specific
//! concepts directly; rules live in action definitions and flow nodes.

pub mod engine;

pub use engine::GameRules;
