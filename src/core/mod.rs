//! Core engine types: element ids, player seats, argument values, RNG,
//! configuration and errors.
//!
//! Everything here is game-agnostic and serializable. Games describe their
//! rules with the `actions` and `flow` modules; those build on these types.

pub mod entity;
pub mod player;
pub mod rng;
pub mod config;
pub mod value;
pub mod error;

pub use entity::EntityId;
pub use player::{PlayerId, PlayerMap};
pub use rng::{GameRng, GameRngState};
pub use config::EngineConfig;
pub use value::{ArgValue, Args, RawArgs, Value};
pub use error::{DefinitionError, FlowError, ValidationError};
