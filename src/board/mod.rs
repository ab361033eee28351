//! Element tree interface and the bundled board implementation.
//!
//! - [`ElementTree`]: what the engine needs from any host object model
//! - [`ElementPath`]: stable element references for history and clients
//! - [`Board`]: zones of ordered elements, used by the bundled game and tests

mod manager;
mod tree;

pub use manager::{Board, ZoneId, ZonePosition};
pub use tree::{ElementPath, ElementTree};
