//! Flow positions.
//!
//! A position is the stack of frames from the root node down to the node
//! that is currently running. Each frame records the node's kind and name
//! (so a saved position can be checked against a changed flow tree) and the
//! node's own progress: a sequence index, a loop counter, the player order of
//! an each-player iteration, the moves made in an action step.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::node::NodeKind;
use crate::actions::SerializedAction;
use crate::core::{FlowError, PlayerId, Value};

/// One player's accepted move in a simultaneous step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub player: PlayerId,
    pub action: SerializedAction,
}

/// Progress of one node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameState {
    /// Child `index` runs next (or is running, if a frame sits above).
    Sequence { index: usize },
    Loop { iteration: u32 },
    /// `done` once the body has completed.
    Phase { done: bool },
    EachPlayer { players: Vec<PlayerId>, index: usize },
    ForEach { items: Vec<Value>, index: usize },
    /// Chosen arm of a switch or if; `None` when nothing matched.
    Branch { arm: Option<usize>, done: bool },
    Execute,
    ActionStep {
        player: PlayerId,
        moves: Vec<SerializedAction>,
        finished: bool,
    },
    Simultaneous {
        awaiting: Vec<PlayerId>,
        responses: Vec<Response>,
    },
}

impl FrameState {
    /// The node kind this frame belongs to. `Branch` frames serve both
    /// switch and if nodes.
    #[must_use]
    pub fn fits(&self, kind: NodeKind) -> bool {
        matches!(
            (self, kind),
            (Self::Sequence { .. }, NodeKind::Sequence)
                | (Self::Loop { .. }, NodeKind::Loop)
                | (Self::Phase { .. }, NodeKind::Phase)
                | (Self::EachPlayer { .. }, NodeKind::EachPlayer)
                | (Self::ForEach { .. }, NodeKind::ForEach)
                | (Self::Branch { .. }, NodeKind::Switch | NodeKind::If)
                | (Self::Execute, NodeKind::Execute)
                | (Self::ActionStep { .. }, NodeKind::ActionStep)
                | (Self::Simultaneous { .. }, NodeKind::Simultaneous)
        )
    }
}

/// One frame of a position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionStep {
    pub kind: NodeKind,
    pub name: String,
    pub frame: FrameState,
}

impl std::fmt::Display for PositionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.frame {
            FrameState::Sequence { index } => write!(f, "{}[{index}]", self.name),
            FrameState::Loop { iteration } => write!(f, "{}#{iteration}", self.name),
            FrameState::EachPlayer { players, index } => match players.get(*index) {
                Some(player) => write!(f, "{}({player})", self.name),
                None => write!(f, "{}(done)", self.name),
            },
            FrameState::ForEach { index, .. } => write!(f, "{}[{index}]", self.name),
            FrameState::Branch { arm: Some(arm), .. } => write!(f, "{}->{arm}", self.name),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// Serializable location inside a flow tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPosition {
    pub steps: SmallVec<[PositionStep; 8]>,
}

impl FlowPosition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The innermost frame.
    #[must_use]
    pub fn leaf(&self) -> Option<&PositionStep> {
        self.steps.last()
    }

    /// Names of the frames, root first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name.as_str())
    }

    /// Encode for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FlowError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a persisted position.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FlowError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl std::fmt::Display for FlowPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " / ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> FlowPosition {
        FlowPosition {
            steps: SmallVec::from_vec(vec![
                PositionStep {
                    kind: NodeKind::Loop,
                    name: "rounds".to_string(),
                    frame: FrameState::Loop { iteration: 2 },
                },
                PositionStep {
                    kind: NodeKind::EachPlayer,
                    name: "turns".to_string(),
                    frame: FrameState::EachPlayer {
                        players: vec![PlayerId::new(1), PlayerId::new(0)],
                        index: 0,
                    },
                },
                PositionStep {
                    kind: NodeKind::ActionStep,
                    name: "act".to_string(),
                    frame: FrameState::ActionStep {
                        player: PlayerId::new(1),
                        moves: Vec::new(),
                        finished: false,
                    },
                },
            ]),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(position().to_string(), "rounds#2 / turns(Player 1) / act");
    }

    #[test]
    fn test_bincode_roundtrip() {
        let position = position();
        let bytes = position.to_bytes().unwrap();
        assert_eq!(FlowPosition::from_bytes(&bytes).unwrap(), position);
    }

    #[test]
    fn test_frame_fits_kind() {
        assert!(FrameState::Branch { arm: None, done: false }.fits(NodeKind::If));
        assert!(FrameState::Branch { arm: None, done: false }.fits(NodeKind::Switch));
        assert!(!FrameState::Execute.fits(NodeKind::Loop));
    }

    #[test]
    fn test_garbage_bytes_are_an_error() {
        assert!(FlowPosition::from_bytes(&[0xff, 0xff, 0xff]).is_err());
    }
}
