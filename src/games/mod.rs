//! Game implementations.
//!
//! Built-in games that double as worked examples of the action and flow
//! APIs.

pub mod simple;
