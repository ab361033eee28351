//! # rust-tabletop
//!
//! A flow state machine and action resolution engine for turn-based and
//! simultaneous-turn tabletop games.
//!
//! ## Design Principles
//!
//! 1. **Declarative Rules**: Games describe *what* can happen as actions
//!    (ordered chains of player selections) and *when* as a tree of flow
//!    nodes. The engine decides legality and drives play.
//!
//! 2. **Suspension Is Data**: Every waiting point (a flow position, a
//!    half-built action, a repeating selection) is a serializable value.
//!    Nothing lives on a call stack between host calls.
//!
//! 3. **Errors Are Values**: Bad player input comes back as a
//!    `ValidationError` inside the result. Malformed rules are caught when
//!    they are built, as a `DefinitionError`.
//!
//! ## Modules
//!
//! - `core`: Entity IDs, players, argument values, RNG, configuration, errors
//! - `board`: `ElementTree` trait and the bundled zone-based `Board`
//! - `rules`: `GameRules` trait for game implementations
//! - `actions`: Selections, action definitions, executor and lookahead
//! - `flow`: Flow nodes, positions and the `FlowEngine`
//! - `session`: Host facade with pending actions, history and replay
//! - `games`: Example game

pub mod core;
pub mod board;
pub mod rules;
pub mod actions;
pub mod flow;
pub mod session;
pub mod games;

// Re-export commonly used types
pub use crate::core::{
    EntityId, PlayerId, PlayerMap,
    GameRng, GameRngState,
    Value, ArgValue, Args, RawArgs,
    EngineConfig,
    ValidationError, DefinitionError, FlowError,
};

pub use crate::board::{Board, ElementPath, ElementTree, ZoneId, ZonePosition};

pub use crate::rules::GameRules;

pub use crate::actions::{
    ActionBuilder, ActionDefinition, ActionExecutor, ActionRegistry,
    ActionResult, SerializedAction, Seat,
    Selection, SelectionContext, Choice, ChoiceSet,
    PendingActionState,
    ActionDebugInfo, SelectionDebugInfo, ConditionTrace,
};

pub use crate::flow::{
    FlowDefinition, FlowNode, FlowEngine, FlowState, FlowPosition,
    FlowEvent, RestoreReport,
};

pub use crate::session::{Session, StepOutcome};
