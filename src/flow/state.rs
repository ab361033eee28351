//! Snapshots and notifications exposed to hosts.

use serde::{Deserialize, Serialize};

use super::position::{FlowPosition, PositionStep};
use crate::core::PlayerId;

/// A player the flow is waiting on, with the actions open to them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitingPlayer {
    pub player: PlayerId,
    pub actions: Vec<String>,
}

/// Serializable snapshot of where the flow stands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub position: FlowPosition,
    pub awaiting_input: bool,
    /// Acting player of a single-actor step.
    pub current_player: Option<PlayerId>,
    /// Players still owed a decision in a simultaneous step.
    pub awaiting_players: Vec<AwaitingPlayer>,
    /// Actions available to the current player, or to anyone awaited.
    pub available_actions: Vec<String>,
    pub prompt: Option<String>,
    /// Innermost phase.
    pub phase: Option<String>,
    pub complete: bool,
    pub winners: Vec<PlayerId>,
    /// Most recent rejected attempt, rendered.
    pub action_error: Option<String>,
}

impl FlowState {
    /// Check whether `player` may act now.
    #[must_use]
    pub fn is_awaiting(&self, player: PlayerId) -> bool {
        self.awaiting_input
            && (self.current_player == Some(player)
                || self.awaiting_players.iter().any(|a| a.player == player))
    }

    /// Actions open to `player` right now.
    #[must_use]
    pub fn actions_for(&self, player: PlayerId) -> Vec<String> {
        if self.current_player == Some(player) {
            return self.available_actions.clone();
        }
        self.awaiting_players
            .iter()
            .find(|a| a.player == player)
            .map(|a| a.actions.clone())
            .unwrap_or_default()
    }
}

/// Something observable happened while the flow ran.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    PhaseEntered { name: String },
    PhaseExited { name: String },
    TurnStarted { player: PlayerId },
    ActionStepEntered { name: String, player: Option<PlayerId> },
    FlowCompleted { winners: Vec<PlayerId> },
}

/// Outcome of restoring a saved position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Frames kept from the saved position.
    pub restored: usize,
    /// Frames dropped, innermost last.
    pub discarded: Vec<PositionStep>,
    /// Every frame matched the current flow tree.
    pub exact: bool,
    /// Why the first discarded frame did not match, or why the flow could
    /// not continue afterwards.
    pub reason: Option<String>,
}

impl RestoreReport {
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.exact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_for() {
        let state = FlowState {
            awaiting_input: true,
            awaiting_players: vec![AwaitingPlayer {
                player: PlayerId::new(2),
                actions: vec!["vote".to_string()],
            }],
            ..FlowState::default()
        };
        assert!(state.is_awaiting(PlayerId::new(2)));
        assert!(!state.is_awaiting(PlayerId::new(0)));
        assert_eq!(state.actions_for(PlayerId::new(2)), vec!["vote".to_string()]);
        assert!(state.actions_for(PlayerId::new(0)).is_empty());
    }

    #[test]
    fn test_flow_state_json() {
        let state = FlowState {
            awaiting_input: true,
            current_player: Some(PlayerId::new(1)),
            available_actions: vec!["draw".to_string()],
            ..FlowState::default()
        };
        let json = serde_json::to_string(&state).unwrap();
        let back: FlowState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
