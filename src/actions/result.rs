//! Action outcomes and the serialized history form.

use serde::{Deserialize, Serialize};

use crate::core::{PlayerId, RawArgs, ValidationError};
use crate::flow::FlowState;

/// Acting player reference in the wire shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seat {
    pub seat: u8,
}

impl From<PlayerId> for Seat {
    fn from(player: PlayerId) -> Self {
        Self { seat: player.0 }
    }
}

impl From<Seat> for PlayerId {
    fn from(seat: Seat) -> Self {
        PlayerId(seat.seat)
    }
}

/// A completed action as stored in history.
///
/// Element arguments are stable paths captured before the action ran, so a
/// history can be replayed against a game rebuilt from scratch.
///
/// ```
/// use rust_tabletop::actions::{Seat, SerializedAction};
/// use rust_tabletop::core::RawArgs;
///
/// let action = SerializedAction {
///     name: "pass".to_string(),
///     player: Seat { seat: 1 },
///     args: RawArgs::new(),
///     undoable: true,
/// };
/// let json = serde_json::to_string(&action).unwrap();
/// assert_eq!(json, r#"{"name":"pass","player":{"seat":1},"args":{},"undoable":true}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedAction {
    pub name: String,
    pub player: Seat,
    pub args: RawArgs,
    pub undoable: bool,
}

impl SerializedAction {
    #[must_use]
    pub fn player_id(&self) -> PlayerId {
        self.player.into()
    }
}

/// Outcome of performing an action.
///
/// Invalid input is reported here, never by panicking.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    pub error: Option<ValidationError>,
    /// Set on success.
    pub action: Option<SerializedAction>,
    /// Flow state after the action, when a flow engine handled it.
    pub state: Option<FlowState>,
}

impl ActionResult {
    #[must_use]
    pub fn succeeded(action: SerializedAction) -> Self {
        Self {
            success: true,
            error: None,
            action: Some(action),
            state: None,
        }
    }

    #[must_use]
    pub fn failed(error: ValidationError) -> Self {
        Self {
            success: false,
            error: Some(error),
            action: None,
            state: None,
        }
    }

    /// Attach the flow state (builder pattern).
    #[must_use]
    pub fn with_state(mut self, state: FlowState) -> Self {
        self.state = Some(state);
        self
    }
}
