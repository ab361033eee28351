//! Error types.
//!
//! - [`ValidationError`]: a player supplied something the engine cannot
//!   accept. Always returned as a value; the caller retries with new input.
//! - [`DefinitionError`]: the game's rules are malformed. Detected when an
//!   action is built or registered, or when a flow engine is created.
//! - [`FlowError`]: the flow could not make progress or a snapshot could not
//!   be encoded.

use thiserror::Error;

use super::player::PlayerId;

/// Invalid player input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Action '{action}' is not available{}", format_failed(.failed))]
    NotAvailable { action: String, failed: Vec<String> },

    #[error("The game is not waiting for input")]
    NotAwaitingInput,

    #[error("The game is already complete")]
    GameComplete,

    #[error("It is not {player}'s turn")]
    NotYourTurn { player: PlayerId },

    #[error("Action '{action}' cannot be taken at this step")]
    NotAllowedHere { action: String },

    #[error("Missing value for selection '{0}'")]
    MissingSelection(String),

    #[error("Action '{action}' has no selection named '{selection}'")]
    UnknownSelection { action: String, selection: String },

    #[error("Invalid value for '{selection}': {reason}")]
    InvalidChoice { selection: String, reason: String },

    #[error("Value for '{selection}' matches {candidates} choices")]
    Ambiguous { selection: String, candidates: usize },

    #[error("Could not resolve element reference for '{selection}': {reference}")]
    UnresolvedElement { selection: String, reference: String },

    #[error("{player} has no action in progress")]
    NoPendingAction { player: PlayerId },

    #[error("Action '{action}' failed: {reason}")]
    ExecutionFailed { action: String, reason: String },
}

fn format_failed(failed: &[String]) -> String {
    if failed.is_empty() {
        String::new()
    } else {
        format!(" (failed: {})", failed.join(", "))
    }
}

impl ValidationError {
    /// Name of the selection this error concerns, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        match self {
            Self::MissingSelection(selection)
            | Self::UnknownSelection { selection, .. }
            | Self::InvalidChoice { selection, .. }
            | Self::Ambiguous { selection, .. }
            | Self::UnresolvedElement { selection, .. } => Some(selection),
            _ => None,
        }
    }
}

/// Malformed rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Action '{action}' declares selection '{selection}' twice")]
    DuplicateSelection { action: String, selection: String },

    #[error("Selection '{selection}' of action '{action}' depends on unknown selection '{dependency}'")]
    UnknownDependency {
        action: String,
        selection: String,
        dependency: String,
    },

    #[error("Selection '{selection}' of action '{action}' depends on '{dependency}', which is declared after it")]
    ForwardDependency {
        action: String,
        selection: String,
        dependency: String,
    },

    #[error("Action '{action}' declares condition '{label}' twice")]
    DuplicateCondition { action: String, label: String },

    #[error("Action '{0}' is already registered")]
    DuplicateAction(String),

    #[error("Action '{0}' has no execute callback")]
    MissingExecute(String),

    #[error("Selection '{selection}' of action '{action}' has invalid bounds: {reason}")]
    InvalidBounds {
        action: String,
        selection: String,
        reason: String,
    },

    #[error("Repeating selection '{selection}' of action '{action}' must be the last selection")]
    RepeatNotLast { action: String, selection: String },

    #[error("Action '{action}' applies '{modifier}' before declaring any selection")]
    OrphanModifier {
        action: String,
        modifier: &'static str,
    },

    #[error("Flow step '{step}' refers to unregistered action '{action}'")]
    UnknownFlowAction { step: String, action: String },

    #[error("Flow step '{0}' lists no actions")]
    EmptyActionStep(String),

    #[error("A game needs 1 to 255 players, not {0}")]
    InvalidPlayerCount(usize),
}

/// The flow could not proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("Flow exceeded {0} transitions without waiting for input")]
    StepLimitExceeded(usize),

    #[error("Flow has not been started")]
    NotStarted,

    #[error("Flow position does not match the flow tree: {0}")]
    InvalidPosition(String),

    #[error("Snapshot encoding failed: {0}")]
    Snapshot(String),

    #[error("Replay diverged at entry {index} ('{action}'): {reason}")]
    ReplayDiverged {
        index: usize,
        action: String,
        reason: String,
    },
}

impl From<bincode::Error> for FlowError {
    fn from(err: bincode::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}
