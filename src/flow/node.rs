//! Flow nodes: the tree a game's turn structure is written in.
//!
//! Each node kind is its own struct with `with`-style modifiers, converted
//! into [`FlowNode`] with `into()`. Constructors on `FlowNode` return the
//! specific struct so modifiers chain naturally:
//!
//! ```
//! use rust_tabletop::flow::FlowNode;
//! use rust_tabletop::games::simple::SimpleGame;
//!
//! let turn: FlowNode<SimpleGame> = FlowNode::phase(
//!     "main",
//!     FlowNode::each_player(FlowNode::action_step("act", ["draw", "pass"]).prompt("Your move")),
//! )
//! .into();
//!
//! assert_eq!(turn.name(), "main");
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::position::{FrameState, Response};
use crate::actions::SerializedAction;
use crate::core::{EntityId, PlayerId, Value};

/// Bindings visible to flow callbacks: the player of the enclosing
/// each-player iteration or action step, and for-each items by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowScope {
    pub player: Option<PlayerId>,
    pub bindings: BTreeMap<String, Value>,
}

impl FlowScope {
    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        self.player
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    #[must_use]
    pub fn element(&self, name: &str) -> Option<EntityId> {
        self.get(name).and_then(Value::as_element)
    }
}

/// What flow callbacks can see.
pub struct FlowContext<'a, G> {
    pub game: &'a G,
    pub scope: &'a FlowScope,
}

impl<G> FlowContext<'_, G> {
    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        self.scope.player
    }
}

pub type GuardFn<G> = Arc<dyn Fn(&FlowContext<'_, G>) -> bool + Send + Sync>;
pub type HookFn<G> = Arc<dyn Fn(&mut G, &FlowScope) + Send + Sync>;
pub type PlayerFn<G> = Arc<dyn Fn(&FlowContext<'_, G>) -> PlayerId + Send + Sync>;
pub type PlayersFn<G> = Arc<dyn Fn(&FlowContext<'_, G>) -> Vec<PlayerId> + Send + Sync>;
pub type PlayerFilterFn<G> = Arc<dyn Fn(&FlowContext<'_, G>, PlayerId) -> bool + Send + Sync>;
pub type ItemsFn<G> = Arc<dyn Fn(&FlowContext<'_, G>) -> Vec<Value> + Send + Sync>;
pub type SwitchFn<G> = Arc<dyn Fn(&FlowContext<'_, G>) -> Value + Send + Sync>;
/// Whether an action step is finished after the moves made in it.
pub type MovesDoneFn<G> =
    Arc<dyn Fn(&FlowContext<'_, G>, &[SerializedAction]) -> bool + Send + Sync>;
/// Whether one player is finished in a simultaneous step.
pub type PlayerDoneFn<G> =
    Arc<dyn Fn(&FlowContext<'_, G>, PlayerId, &[SerializedAction]) -> bool + Send + Sync>;
/// Whether a simultaneous step is finished early, given every response.
pub type AllDoneFn<G> = Arc<dyn Fn(&FlowContext<'_, G>, &[Response]) -> bool + Send + Sync>;

/// Node kind tag, recorded in positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Sequence,
    Loop,
    Phase,
    EachPlayer,
    ForEach,
    ActionStep,
    Simultaneous,
    Switch,
    If,
    Execute,
}

impl NodeKind {
    #[must_use]
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Loop => "loop",
            Self::Phase => "phase",
            Self::EachPlayer => "each-player",
            Self::ForEach => "for-each",
            Self::ActionStep => "action-step",
            Self::Simultaneous => "simultaneous",
            Self::Switch => "switch",
            Self::If => "if",
            Self::Execute => "execute",
        }
    }
}

/// One node of the flow tree.
pub enum FlowNode<G> {
    Sequence(SequenceNode<G>),
    Loop(LoopNode<G>),
    Phase(PhaseNode<G>),
    EachPlayer(EachPlayerNode<G>),
    ForEach(ForEachNode<G>),
    ActionStep(ActionStepNode<G>),
    Simultaneous(SimultaneousNode<G>),
    Switch(SwitchNode<G>),
    If(IfNode<G>),
    Execute(ExecuteNode<G>),
}

/// Run children in order.
pub struct SequenceNode<G> {
    pub name: String,
    pub children: Vec<FlowNode<G>>,
}

/// Run the body while the guard holds, checked before every iteration.
pub struct LoopNode<G> {
    pub name: String,
    /// No guard means loop until the iteration cap or game end.
    pub guard: Option<GuardFn<G>>,
    /// Falls back to `EngineConfig::max_loop_iterations`.
    pub max_iterations: Option<u32>,
    pub body: Box<FlowNode<G>>,
}

/// A named section with observable entry and exit.
pub struct PhaseNode<G> {
    pub name: String,
    pub body: Box<FlowNode<G>>,
    pub on_enter: Option<HookFn<G>>,
    pub on_exit: Option<HookFn<G>>,
}

/// Run the body once per player in turn order.
pub struct EachPlayerNode<G> {
    pub name: String,
    pub filter: Option<PlayerFilterFn<G>>,
    /// Rotate turn order to start at this player.
    pub starting: Option<PlayerFn<G>>,
    pub body: Box<FlowNode<G>>,
}

/// Run the body once per item, with the item bound under `binding`.
pub struct ForEachNode<G> {
    pub name: String,
    pub binding: String,
    pub items: ItemsFn<G>,
    pub body: Box<FlowNode<G>>,
}

/// Wait for one player to take one of `actions`.
pub struct ActionStepNode<G> {
    pub name: String,
    pub actions: Vec<String>,
    /// Defaults to the scope's player, then the game's current player.
    pub player: Option<PlayerFn<G>>,
    pub skip_if: Option<GuardFn<G>>,
    /// Defaults to finishing after one move.
    pub repeat_until: Option<MovesDoneFn<G>>,
    pub prompt: Option<String>,
}

/// Wait for several players to act independently.
pub struct SimultaneousNode<G> {
    pub name: String,
    pub actions: Vec<String>,
    /// Defaults to every player in turn order.
    pub players: Option<PlayersFn<G>>,
    /// Defaults to finishing a player after one move.
    pub player_done: Option<PlayerDoneFn<G>>,
    pub all_done: Option<AllDoneFn<G>>,
    pub prompt: Option<String>,
}

/// Branch on a computed value.
pub struct SwitchNode<G> {
    pub name: String,
    pub on: SwitchFn<G>,
    pub cases: Vec<(Value, FlowNode<G>)>,
    pub default: Option<Box<FlowNode<G>>>,
}

/// Branch on a predicate.
pub struct IfNode<G> {
    pub name: String,
    pub condition: GuardFn<G>,
    pub then: Box<FlowNode<G>>,
    pub otherwise: Option<Box<FlowNode<G>>>,
}

/// Run a side effect and move on.
pub struct ExecuteNode<G> {
    pub name: String,
    pub run: HookFn<G>,
}

impl<G: 'static> FlowNode<G> {
    pub fn sequence(children: impl IntoIterator<Item = FlowNode<G>>) -> SequenceNode<G> {
        SequenceNode {
            name: NodeKind::Sequence.default_name().to_string(),
            children: children.into_iter().collect(),
        }
    }

    pub fn loop_while<F>(guard: F, body: impl Into<FlowNode<G>>) -> LoopNode<G>
    where
        F: Fn(&FlowContext<'_, G>) -> bool + Send + Sync + 'static,
    {
        LoopNode {
            name: NodeKind::Loop.default_name().to_string(),
            guard: Some(Arc::new(guard)),
            max_iterations: None,
            body: Box::new(body.into()),
        }
    }

    /// Loop with no guard.
    pub fn repeat(body: impl Into<FlowNode<G>>) -> LoopNode<G> {
        LoopNode {
            name: NodeKind::Loop.default_name().to_string(),
            guard: None,
            max_iterations: None,
            body: Box::new(body.into()),
        }
    }

    pub fn phase(name: impl Into<String>, body: impl Into<FlowNode<G>>) -> PhaseNode<G> {
        PhaseNode {
            name: name.into(),
            body: Box::new(body.into()),
            on_enter: None,
            on_exit: None,
        }
    }

    pub fn each_player(body: impl Into<FlowNode<G>>) -> EachPlayerNode<G> {
        EachPlayerNode {
            name: NodeKind::EachPlayer.default_name().to_string(),
            filter: None,
            starting: None,
            body: Box::new(body.into()),
        }
    }

    pub fn for_each<F>(binding: impl Into<String>, items: F, body: impl Into<FlowNode<G>>) -> ForEachNode<G>
    where
        F: Fn(&FlowContext<'_, G>) -> Vec<Value> + Send + Sync + 'static,
    {
        ForEachNode {
            name: NodeKind::ForEach.default_name().to_string(),
            binding: binding.into(),
            items: Arc::new(items),
            body: Box::new(body.into()),
        }
    }

    pub fn action_step<S: Into<String>>(
        name: impl Into<String>,
        actions: impl IntoIterator<Item = S>,
    ) -> ActionStepNode<G> {
        ActionStepNode {
            name: name.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            player: None,
            skip_if: None,
            repeat_until: None,
            prompt: None,
        }
    }

    pub fn simultaneous<S: Into<String>>(
        name: impl Into<String>,
        actions: impl IntoIterator<Item = S>,
    ) -> SimultaneousNode<G> {
        SimultaneousNode {
            name: name.into(),
            actions: actions.into_iter().map(Into::into).collect(),
            players: None,
            player_done: None,
            all_done: None,
            prompt: None,
        }
    }

    pub fn switch<F>(on: F) -> SwitchNode<G>
    where
        F: Fn(&FlowContext<'_, G>) -> Value + Send + Sync + 'static,
    {
        SwitchNode {
            name: NodeKind::Switch.default_name().to_string(),
            on: Arc::new(on),
            cases: Vec::new(),
            default: None,
        }
    }

    pub fn if_then<F>(condition: F, then: impl Into<FlowNode<G>>) -> IfNode<G>
    where
        F: Fn(&FlowContext<'_, G>) -> bool + Send + Sync + 'static,
    {
        IfNode {
            name: NodeKind::If.default_name().to_string(),
            condition: Arc::new(condition),
            then: Box::new(then.into()),
            otherwise: None,
        }
    }

    pub fn execute<F>(name: impl Into<String>, run: F) -> ExecuteNode<G>
    where
        F: Fn(&mut G, &FlowScope) + Send + Sync + 'static,
    {
        ExecuteNode {
            name: name.into(),
            run: Arc::new(run),
        }
    }
}

impl<G> FlowNode<G> {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Sequence(_) => NodeKind::Sequence,
            Self::Loop(_) => NodeKind::Loop,
            Self::Phase(_) => NodeKind::Phase,
            Self::EachPlayer(_) => NodeKind::EachPlayer,
            Self::ForEach(_) => NodeKind::ForEach,
            Self::ActionStep(_) => NodeKind::ActionStep,
            Self::Simultaneous(_) => NodeKind::Simultaneous,
            Self::Switch(_) => NodeKind::Switch,
            Self::If(_) => NodeKind::If,
            Self::Execute(_) => NodeKind::Execute,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Sequence(n) => &n.name,
            Self::Loop(n) => &n.name,
            Self::Phase(n) => &n.name,
            Self::EachPlayer(n) => &n.name,
            Self::ForEach(n) => &n.name,
            Self::ActionStep(n) => &n.name,
            Self::Simultaneous(n) => &n.name,
            Self::Switch(n) => &n.name,
            Self::If(n) => &n.name,
            Self::Execute(n) => &n.name,
        }
    }

    /// The child a frame of this node is running, if any.
    #[must_use]
    pub fn child_for(&self, frame: &FrameState) -> Option<&FlowNode<G>> {
        match (self, frame) {
            (Self::Sequence(n), FrameState::Sequence { index }) => n.children.get(*index),
            (Self::Loop(n), FrameState::Loop { .. }) => Some(&n.body),
            (Self::Phase(n), FrameState::Phase { .. }) => Some(&n.body),
            (Self::EachPlayer(n), FrameState::EachPlayer { .. }) => Some(&n.body),
            (Self::ForEach(n), FrameState::ForEach { .. }) => Some(&n.body),
            (Self::Switch(n), FrameState::Branch { arm: Some(arm), .. }) => n
                .cases
                .get(*arm)
                .map(|(_, node)| node)
                .or_else(|| (*arm == n.cases.len()).then_some(n.default.as_deref()).flatten()),
            (Self::If(n), FrameState::Branch { arm: Some(0), .. }) => Some(&n.then),
            (Self::If(n), FrameState::Branch { arm: Some(1), .. }) => n.otherwise.as_deref(),
            _ => None,
        }
    }

    /// Direct children, in declaration order.
    #[must_use]
    pub fn children(&self) -> Vec<&FlowNode<G>> {
        match self {
            Self::Sequence(n) => n.children.iter().collect(),
            Self::Loop(n) => vec![&n.body],
            Self::Phase(n) => vec![&n.body],
            Self::EachPlayer(n) => vec![&n.body],
            Self::ForEach(n) => vec![&n.body],
            Self::Switch(n) => n
                .cases
                .iter()
                .map(|(_, node)| node)
                .chain(n.default.as_deref())
                .collect(),
            Self::If(n) => std::iter::once(&*n.then).chain(n.otherwise.as_deref()).collect(),
            Self::ActionStep(_) | Self::Simultaneous(_) | Self::Execute(_) => Vec::new(),
        }
    }

    /// Visit this node and every descendant, depth first.
    pub fn walk<'n>(&'n self, visit: &mut impl FnMut(&'n FlowNode<G>)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

macro_rules! named {
    ($($node:ident => $variant:ident),* $(,)?) => {
        $(
            impl<G> $node<G> {
                /// Set the node's name, used to validate saved positions.
                #[must_use]
                pub fn named(mut self, name: impl Into<String>) -> Self {
                    self.name = name.into();
                    self
                }
            }

            impl<G> From<$node<G>> for FlowNode<G> {
                fn from(node: $node<G>) -> Self {
                    FlowNode::$variant(node)
                }
            }
        )*
    };
}

named! {
    SequenceNode => Sequence,
    LoopNode => Loop,
    PhaseNode => Phase,
    EachPlayerNode => EachPlayer,
    ForEachNode => ForEach,
    ActionStepNode => ActionStep,
    SimultaneousNode => Simultaneous,
    SwitchNode => Switch,
    IfNode => If,
    ExecuteNode => Execute,
}

impl<G> SequenceNode<G> {
    #[must_use]
    pub fn then(mut self, child: impl Into<FlowNode<G>>) -> Self {
        self.children.push(child.into());
        self
    }
}

impl<G> LoopNode<G> {
    #[must_use]
    pub fn max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = Some(max);
        self
    }
}

impl<G> PhaseNode<G> {
    #[must_use]
    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut G, &FlowScope) + Send + Sync + 'static,
    {
        self.on_enter = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut G, &FlowScope) + Send + Sync + 'static,
    {
        self.on_exit = Some(Arc::new(hook));
        self
    }
}

impl<G> EachPlayerNode<G> {
    /// Only include players for whom `filter` holds.
    #[must_use]
    pub fn players_where<F>(mut self, filter: F) -> Self
    where
        F: Fn(&FlowContext<'_, G>, PlayerId) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Start the rotation at the returned player.
    #[must_use]
    pub fn starting_with<F>(mut self, start: F) -> Self
    where
        F: Fn(&FlowContext<'_, G>) -> PlayerId + Send + Sync + 'static,
    {
        self.starting = Some(Arc::new(start));
        self
    }
}

impl<G> ActionStepNode<G> {
    /// Choose the acting player.
    #[must_use]
    pub fn player<F>(mut self, player: F) -> Self
    where
        F: Fn(&FlowContext<'_, G>) -> PlayerId + Send + Sync + 'static,
    {
        self.player = Some(Arc::new(player));
        self
    }

    #[must_use]
    pub fn skip_if<F>(mut self, skip: F) -> Self
    where
        F: Fn(&FlowContext<'_, G>) -> bool + Send + Sync + 'static,
    {
        self.skip_if = Some(Arc::new(skip));
        self
    }

    /// Keep the step open for more moves until `done` holds.
    #[must_use]
    pub fn repeat_until<F>(mut self, done: F) -> Self
    where
        F: Fn(&FlowContext<'_, G>, &[SerializedAction]) -> bool + Send + Sync + 'static,
    {
        self.repeat_until = Some(Arc::new(done));
        self
    }

    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

impl<G> SimultaneousNode<G> {
    #[must_use]
    pub fn players<F>(mut self, players: F) -> Self
    where
        F: Fn(&FlowContext<'_, G>) -> Vec<PlayerId> + Send + Sync + 'static,
    {
        self.players = Some(Arc::new(players));
        self
    }

    #[must_use]
    pub fn player_done<F>(mut self, done: F) -> Self
    where
        F: Fn(&FlowContext<'_, G>, PlayerId, &[SerializedAction]) -> bool + Send + Sync + 'static,
    {
        self.player_done = Some(Arc::new(done));
        self
    }

    #[must_use]
    pub fn all_done<F>(mut self, done: F) -> Self
    where
        F: Fn(&FlowContext<'_, G>, &[Response]) -> bool + Send + Sync + 'static,
    {
        self.all_done = Some(Arc::new(done));
        self
    }

    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

impl<G> SwitchNode<G> {
    #[must_use]
    pub fn case(mut self, value: impl Into<Value>, node: impl Into<FlowNode<G>>) -> Self {
        self.cases.push((value.into(), node.into()));
        self
    }

    #[must_use]
    pub fn default(mut self, node: impl Into<FlowNode<G>>) -> Self {
        self.default = Some(Box::new(node.into()));
        self
    }
}

impl<G> IfNode<G> {
    #[must_use]
    pub fn otherwise(mut self, node: impl Into<FlowNode<G>>) -> Self {
        self.otherwise = Some(Box::new(node.into()));
        self
    }
}

/// Is-complete check for a whole flow.
pub type CompleteFn<G> = Arc<dyn Fn(&G) -> bool + Send + Sync>;
/// Winner computation for a finished flow.
pub type WinnersFn<G> = Arc<dyn Fn(&G) -> Vec<PlayerId> + Send + Sync>;

/// A game's full flow: the node tree plus end-of-game checks.
pub struct FlowDefinition<G> {
    pub root: FlowNode<G>,
    /// Checked before every transition.
    pub is_complete: Option<CompleteFn<G>>,
    pub winners: Option<WinnersFn<G>>,
}

impl<G> FlowDefinition<G> {
    pub fn new(root: impl Into<FlowNode<G>>) -> Self {
        Self {
            root: root.into(),
            is_complete: None,
            winners: None,
        }
    }

    /// End the game as soon as `done` holds.
    #[must_use]
    pub fn complete_when<F>(mut self, done: F) -> Self
    where
        F: Fn(&G) -> bool + Send + Sync + 'static,
    {
        self.is_complete = Some(Arc::new(done));
        self
    }

    #[must_use]
    pub fn winners<F>(mut self, winners: F) -> Self
    where
        F: Fn(&G) -> Vec<PlayerId> + Send + Sync + 'static,
    {
        self.winners = Some(Arc::new(winners));
        self
    }
}
