//! Flow: a game's turn structure as a tree of nodes, run by [`FlowEngine`].
//!
//! The engine runs node transitions until a player decision is needed, then
//! returns a [`FlowState`] describing who may act and with which actions.
//! Hosts feed moves back through [`FlowEngine::resume`] (or, for actions
//! built up selection by selection, [`FlowEngine::resume_after_external_action`]).
//!
//! Positions are plain data: save one with [`FlowPosition::to_bytes`] and
//! bring it back with [`FlowEngine::try_restore`], which tolerates a flow
//! tree that changed in the meantime.

mod engine;
pub mod node;
pub mod position;
mod restore;
pub mod state;

pub use engine::FlowEngine;
pub use node::{
    ActionStepNode, EachPlayerNode, ExecuteNode, FlowContext, FlowDefinition, FlowNode, FlowScope,
    ForEachNode, IfNode, LoopNode, NodeKind, PhaseNode, SequenceNode, SimultaneousNode, SwitchNode,
};
pub use position::{FlowPosition, FrameState, PositionStep, Response};
pub use state::{AwaitingPlayer, FlowEvent, FlowState, RestoreReport};
