//! Simple card game built on the engine.
//!
//! A small game that exercises every part of the engine:
//! - Each player starts with 20 life, a shuffled deck and a hand of 3
//! - Cards have a "power" value; playing one damages an opponent
//! - On your turn: draw, play, discard, trade, or pass; taunting and trashing
//!   cards don't end the turn
//! - Every other round all players act at once during upkeep
//! - Last player standing wins, or the healthiest after the final round
//!
//! Supports 2-8 players.

mod actions;
mod flow;
mod game;

pub use actions::registry;
pub use flow::{flow, TURN_ACTIONS, UPKEEP_ACTIONS};
pub use game::{PlayerZones, SimpleGame, SimpleGameBuilder, POWER};

use crate::core::{DefinitionError, EngineConfig};
use crate::session::Session;

/// A session for `game` with the game's actions and flow. Call
/// [`Session::start`] to begin.
pub fn session(game: SimpleGame, config: EngineConfig) -> Result<Session<SimpleGame>, DefinitionError> {
    Session::new(game, registry()?, flow(), config)
}
