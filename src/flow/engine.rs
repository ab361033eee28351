//! The flow interpreter.
//!
//! `FlowEngine` walks the node tree, keeping its progress in a
//! [`FlowPosition`]. Control returns to the host whenever an action step (or
//! simultaneous step) needs input; "suspension" is nothing more than the
//! position sitting on that step.
//!
//! ## Transitions
//!
//! Every transition looks at the innermost frame and asks its node what to
//! do next ([`FlowEngine::advance`], the single dispatch point over node
//! kinds):
//!
//! - descend into the child the frame points at
//! - await input
//! - finish, popping the frame and telling the parent its child completed
//!
//! Both resume entry points funnel into one completion routine,
//! `complete_action_step`, so a move is recorded the same way however it
//! reached the engine.

use std::sync::Arc;

use tracing::{debug, warn};

use super::node::{FlowContext, FlowDefinition, FlowNode, FlowScope};
use super::position::{FlowPosition, FrameState, PositionStep, Response};
use super::state::{AwaitingPlayer, FlowEvent, FlowState};
use crate::actions::{ActionExecutor, ActionRegistry, ActionResult, SerializedAction};
use crate::core::{
    DefinitionError, EngineConfig, FlowError, PlayerId, RawArgs, ValidationError,
};
use crate::rules::GameRules;

enum Advance {
    Descend,
    Await,
    Done,
}

/// Drives a game through its flow definition.
pub struct FlowEngine<G> {
    pub(super) definition: Arc<FlowDefinition<G>>,
    registry: Arc<ActionRegistry<G>>,
    pub(super) config: EngineConfig,
    pub(super) position: FlowPosition,
    pub(super) started: bool,
    pub(super) complete: bool,
    pub(super) winners: Vec<PlayerId>,
    pub(super) action_error: Option<ValidationError>,
    last_action: Option<SerializedAction>,
    events: Vec<FlowEvent>,
}

impl<G> std::fmt::Debug for FlowEngine<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowEngine")
            .field("position", &self.position.to_string())
            .field("started", &self.started)
            .field("complete", &self.complete)
            .field("winners", &self.winners)
            .finish_non_exhaustive()
    }
}

impl<G: GameRules> FlowEngine<G> {
    /// Create an engine. Every action step must name registered actions.
    pub fn new(
        definition: FlowDefinition<G>,
        registry: Arc<ActionRegistry<G>>,
        config: EngineConfig,
    ) -> Result<Self, DefinitionError> {
        validate_definition(&definition, &registry)?;
        Ok(Self {
            definition: Arc::new(definition),
            registry,
            config,
            position: FlowPosition::new(),
            started: false,
            complete: false,
            winners: Vec::new(),
            action_error: None,
            last_action: None,
            events: Vec::new(),
        })
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ActionRegistry<G>> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn position(&self) -> &FlowPosition {
        &self.position
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    #[must_use]
    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    /// The move most recently accepted by an action step.
    #[must_use]
    pub fn last_action(&self) -> Option<&SerializedAction> {
        self.last_action.as_ref()
    }

    /// Drain the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<FlowEvent> {
        std::mem::take(&mut self.events)
    }

    /// Swap in a new flow definition, keeping the current position.
    ///
    /// Follow with [`FlowEngine::try_restore`] to check the position
    /// against the new tree.
    pub fn reload(&mut self, definition: FlowDefinition<G>) -> Result<(), DefinitionError> {
        validate_definition(&definition, &self.registry)?;
        self.definition = Arc::new(definition);
        debug!("flow definition reloaded");
        Ok(())
    }

    /// Begin the flow from the root and run to the first decision point.
    pub fn start(&mut self, game: &mut G) -> Result<FlowState, FlowError> {
        self.position = FlowPosition::new();
        self.started = true;
        self.complete = false;
        self.winners.clear();
        self.action_error = None;
        self.last_action = None;

        let definition = Arc::clone(&self.definition);
        let root = self.enter(game, &definition.root, &FlowScope::default());
        self.position.steps.push(root);
        debug!("flow started");
        self.run(game)?;
        Ok(self.flow_state(game))
    }

    /// Perform `action` for `player` at the current step and advance.
    ///
    /// Invalid input is reported in the returned result; `Err` means the
    /// flow itself could not continue.
    pub fn resume(
        &mut self,
        game: &mut G,
        action: &str,
        args: &RawArgs,
        player: PlayerId,
    ) -> Result<ActionResult, FlowError> {
        if !self.started {
            return Err(FlowError::NotStarted);
        }
        let registry = Arc::clone(&self.registry);
        let Some(definition) = registry.get(action) else {
            return Ok(self.reject(game, ValidationError::UnknownAction(action.to_string())));
        };
        if let Err(err) = self.check_awaiting(action, player) {
            return Ok(self.reject(game, err));
        }

        let config = self.config.clone();
        let result = ActionExecutor::new(&config).execute_action(definition, args, game, player);
        if result.success {
            if let Some(performed) = result.action.clone() {
                return self.complete_action_step(game, player, performed);
            }
        }
        self.action_error = result.error.clone();
        Ok(result.with_state(self.flow_state(game)))
    }

    /// Advance after an action that was executed outside the engine, such
    /// as a pending multi-step action completed by the host.
    pub fn resume_after_external_action(
        &mut self,
        game: &mut G,
        result: &ActionResult,
    ) -> Result<ActionResult, FlowError> {
        if !self.started {
            return Err(FlowError::NotStarted);
        }
        if !result.success {
            self.action_error = result.error.clone();
            return Ok(result.clone().with_state(self.flow_state(game)));
        }
        let Some(performed) = &result.action else {
            return Ok(self.reject(game, ValidationError::NotAwaitingInput));
        };

        let player = performed.player_id();
        if let Err(err) = self.check_awaiting(&performed.name, player) {
            warn!(action = %performed.name, %player, error = %err, "external action does not fit the current step");
            return Ok(self.reject(game, err));
        }
        self.complete_action_step(game, player, performed.clone())
    }

    /// Actions `player` can take right now.
    pub fn available_actions(&self, game: &G, player: PlayerId) -> Vec<String> {
        self.flow_state(game).actions_for(player)
    }

    /// Snapshot of the current state.
    pub fn flow_state(&self, game: &G) -> FlowState {
        let mut state = FlowState {
            position: self.position.clone(),
            complete: self.complete,
            winners: self.winners.clone(),
            action_error: self.action_error.as_ref().map(ToString::to_string),
            ..FlowState::default()
        };
        if self.complete || !self.started {
            return state;
        }
        let Some((node, _)) = locate(&self.definition.root, &self.position.steps) else {
            return state;
        };

        state.phase = self
            .position
            .steps
            .iter()
            .rev()
            .find(|s| matches!(s.frame, FrameState::Phase { .. }))
            .map(|s| s.name.clone());

        let Some(leaf) = self.position.leaf() else {
            return state;
        };
        match (node, &leaf.frame) {
            (
                FlowNode::ActionStep(step),
                FrameState::ActionStep {
                    player,
                    finished: false,
                    ..
                },
            ) => {
                state.awaiting_input = true;
                state.current_player = Some(*player);
                state.available_actions =
                    open_actions(&self.registry, &self.config, game, *player, &step.actions);
                state.prompt = step.prompt.clone();
            }
            (FlowNode::Simultaneous(step), FrameState::Simultaneous { awaiting, .. }) => {
                state.awaiting_input = !awaiting.is_empty();
                state.awaiting_players = awaiting
                    .iter()
                    .map(|&player| AwaitingPlayer {
                        player,
                        actions: open_actions(&self.registry, &self.config, game, player, &step.actions),
                    })
                    .collect();
                for awaiting in &state.awaiting_players {
                    for action in &awaiting.actions {
                        if !state.available_actions.contains(action) {
                            state.available_actions.push(action.clone());
                        }
                    }
                }
                state.prompt = step.prompt.clone();
            }
            _ => {}
        }
        state
    }

    fn reject(&mut self, game: &G, err: ValidationError) -> ActionResult {
        debug!(error = %err, "action rejected by flow");
        self.action_error = Some(err.clone());
        ActionResult::failed(err).with_state(self.flow_state(game))
    }

    /// Check that `player` may take `action` at the current step.
    pub(crate) fn check_awaiting(&self, action: &str, player: PlayerId) -> Result<(), ValidationError> {
        if self.complete {
            return Err(ValidationError::GameComplete);
        }
        let Some((node, _)) = locate(&self.definition.root, &self.position.steps) else {
            return Err(ValidationError::NotAwaitingInput);
        };
        let Some(leaf) = self.position.leaf() else {
            return Err(ValidationError::NotAwaitingInput);
        };

        let allowed = match (node, &leaf.frame) {
            (
                FlowNode::ActionStep(step),
                FrameState::ActionStep {
                    player: acting,
                    finished: false,
                    ..
                },
            ) => {
                if *acting != player {
                    return Err(ValidationError::NotYourTurn { player });
                }
                &step.actions
            }
            (FlowNode::Simultaneous(step), FrameState::Simultaneous { awaiting, .. }) => {
                if !awaiting.contains(&player) {
                    return Err(ValidationError::NotYourTurn { player });
                }
                &step.actions
            }
            _ => return Err(ValidationError::NotAwaitingInput),
        };

        if allowed.iter().any(|a| a == action) {
            Ok(())
        } else {
            Err(ValidationError::NotAllowedHere {
                action: action.to_string(),
            })
        }
    }

    /// Record an accepted move on the current step and run on.
    fn complete_action_step(
        &mut self,
        game: &mut G,
        player: PlayerId,
        performed: SerializedAction,
    ) -> Result<ActionResult, FlowError> {
        let definition = Arc::clone(&self.definition);
        let (node, scope) = locate(&definition.root, &self.position.steps)
            .ok_or_else(|| FlowError::InvalidPosition(self.position.to_string()))?;
        let step = self
            .position
            .steps
            .last_mut()
            .ok_or_else(|| FlowError::InvalidPosition("empty position".to_string()))?;

        let recorded = match (node, &mut step.frame) {
            (FlowNode::ActionStep(node), FrameState::ActionStep { moves, finished, .. }) => {
                moves.push(performed.clone());
                let ctx = FlowContext { game: &*game, scope: &scope };
                if node.repeat_until.as_ref().map_or(true, |done| done(&ctx, moves)) {
                    *finished = true;
                    moves.clear();
                }
                true
            }
            (FlowNode::Simultaneous(node), FrameState::Simultaneous { awaiting, responses }) => {
                responses.push(Response {
                    player,
                    action: performed.clone(),
                });
                let mine: Vec<SerializedAction> = responses
                    .iter()
                    .filter(|r| r.player == player)
                    .map(|r| r.action.clone())
                    .collect();
                let ctx = FlowContext { game: &*game, scope: &scope };
                if node.player_done.as_ref().map_or(true, |done| done(&ctx, player, &mine)) {
                    awaiting.retain(|p| *p != player);
                }
                true
            }
            _ => false,
        };
        if !recorded {
            return Err(FlowError::InvalidPosition(self.position.to_string()));
        }

        self.action_error = None;
        self.last_action = Some(performed.clone());
        debug!(action = %performed.name, %player, "action step advanced");
        self.run(game)?;
        Ok(ActionResult::succeeded(performed).with_state(self.flow_state(game)))
    }

    /// Run transitions until input is needed or the flow completes.
    pub(super) fn run(&mut self, game: &mut G) -> Result<(), FlowError> {
        let definition = Arc::clone(&self.definition);

        for _ in 0..self.config.max_flow_steps {
            if self.complete {
                return Ok(());
            }
            if definition.is_complete.as_ref().is_some_and(|done| done(&*game)) {
                self.finish(game, &definition);
                return Ok(());
            }
            if self.position.is_empty() {
                self.finish(game, &definition);
                return Ok(());
            }

            let (node, scope) = locate(&definition.root, &self.position.steps)
                .ok_or_else(|| FlowError::InvalidPosition(self.position.to_string()))?;

            match self.advance(game, node, &scope) {
                Advance::Await => return Ok(()),
                Advance::Descend => {
                    let child = self
                        .position
                        .leaf()
                        .and_then(|leaf| node.child_for(&leaf.frame))
                        .ok_or_else(|| FlowError::InvalidPosition(self.position.to_string()))?;
                    let step = self.enter(game, child, &scope);
                    self.position.steps.push(step);
                }
                Advance::Done => {
                    self.position.steps.pop();
                    self.leave(game, node, &scope);
                    if let Some(parent) = self.position.steps.last_mut() {
                        child_completed(&mut parent.frame);
                    }
                }
            }
        }

        warn!(limit = self.config.max_flow_steps, "flow step limit exceeded");
        Err(FlowError::StepLimitExceeded(self.config.max_flow_steps))
    }

    /// Decide what the innermost frame does next.
    fn advance(&mut self, game: &mut G, node: &FlowNode<G>, scope: &FlowScope) -> Advance {
        let registry = &self.registry;
        let config = &self.config;
        let events = &mut self.events;
        let Some(step) = self.position.steps.last_mut() else {
            return Advance::Done;
        };

        match (node, &mut step.frame) {
            (FlowNode::Sequence(n), FrameState::Sequence { index }) => {
                if *index < n.children.len() {
                    Advance::Descend
                } else {
                    Advance::Done
                }
            }
            (FlowNode::Loop(n), FrameState::Loop { iteration }) => {
                let cap = n.max_iterations.unwrap_or(config.max_loop_iterations);
                if *iteration >= cap {
                    if n.max_iterations.is_none() {
                        warn!(node = %n.name, cap, "loop iteration cap reached");
                    }
                    return Advance::Done;
                }
                let ctx = FlowContext { game: &*game, scope };
                if n.guard.as_ref().map_or(true, |guard| guard(&ctx)) {
                    Advance::Descend
                } else {
                    Advance::Done
                }
            }
            (FlowNode::Phase(_), FrameState::Phase { done }) => {
                if *done {
                    Advance::Done
                } else {
                    Advance::Descend
                }
            }
            (FlowNode::EachPlayer(_), FrameState::EachPlayer { players, index }) => {
                match players.get(*index) {
                    Some(&player) => {
                        game.set_current_player(player);
                        events.push(FlowEvent::TurnStarted { player });
                        debug!(%player, "turn started");
                        Advance::Descend
                    }
                    None => Advance::Done,
                }
            }
            (FlowNode::ForEach(_), FrameState::ForEach { items, index }) => {
                if *index < items.len() {
                    Advance::Descend
                } else {
                    Advance::Done
                }
            }
            (FlowNode::Switch(_) | FlowNode::If(_), FrameState::Branch { arm, done }) => {
                if !*done && arm.is_some() {
                    Advance::Descend
                } else {
                    Advance::Done
                }
            }
            (FlowNode::Execute(n), FrameState::Execute) => {
                debug!(node = %n.name, "execute");
                (n.run)(game, scope);
                Advance::Done
            }
            (FlowNode::ActionStep(n), FrameState::ActionStep { player, moves, finished }) => {
                if *finished {
                    return Advance::Done;
                }
                let view: &G = game;
                let ctx = FlowContext { game: view, scope };
                if n.skip_if.as_ref().is_some_and(|skip| skip(&ctx)) {
                    debug!(step = %n.name, %player, "action step skipped");
                    return Advance::Done;
                }
                if open_actions(registry, config, view, *player, &n.actions).is_empty() {
                    if moves.is_empty() {
                        debug!(step = %n.name, %player, "no available actions; step skipped");
                    }
                    return Advance::Done;
                }
                Advance::Await
            }
            (FlowNode::Simultaneous(n), FrameState::Simultaneous { awaiting, responses }) => {
                let view: &G = game;
                let ctx = FlowContext { game: view, scope };
                if n.all_done.as_ref().is_some_and(|done| done(&ctx, responses)) {
                    return Advance::Done;
                }
                awaiting.retain(|&player| {
                    let open = !open_actions(registry, config, view, player, &n.actions).is_empty();
                    if !open {
                        debug!(step = %n.name, %player, "no available actions; player released");
                    }
                    open
                });
                if awaiting.is_empty() {
                    Advance::Done
                } else {
                    Advance::Await
                }
            }
            (node, frame) => {
                warn!(node = %node.name(), ?frame, "frame does not match node");
                Advance::Done
            }
        }
    }

    /// Create the frame for a node being entered, running entry hooks.
    fn enter(&mut self, game: &mut G, node: &FlowNode<G>, scope: &FlowScope) -> PositionStep {
        let frame = match node {
            FlowNode::Sequence(_) => FrameState::Sequence { index: 0 },
            FlowNode::Loop(_) => FrameState::Loop { iteration: 0 },
            FlowNode::Phase(n) => {
                debug!(phase = %n.name, "phase entered");
                self.events.push(FlowEvent::PhaseEntered { name: n.name.clone() });
                if let Some(on_enter) = &n.on_enter {
                    on_enter(game, scope);
                }
                FrameState::Phase { done: false }
            }
            FlowNode::EachPlayer(n) => {
                let ctx = FlowContext { game: &*game, scope };
                let mut order = game.turn_order();
                if let Some(start) = &n.starting {
                    let first = start(&ctx);
                    if let Some(offset) = order.iter().position(|p| *p == first) {
                        order.rotate_left(offset);
                    }
                }
                if let Some(filter) = &n.filter {
                    order.retain(|p| filter(&ctx, *p));
                }
                FrameState::EachPlayer {
                    players: order,
                    index: 0,
                }
            }
            FlowNode::ForEach(n) => {
                let ctx = FlowContext { game: &*game, scope };
                FrameState::ForEach {
                    items: (n.items)(&ctx),
                    index: 0,
                }
            }
            FlowNode::Switch(n) => {
                let ctx = FlowContext { game: &*game, scope };
                let value = (n.on)(&ctx);
                let arm = n
                    .cases
                    .iter()
                    .position(|(case, _)| *case == value)
                    .or_else(|| n.default.as_ref().map(|_| n.cases.len()));
                FrameState::Branch { arm, done: false }
            }
            FlowNode::If(n) => {
                let ctx = FlowContext { game: &*game, scope };
                let arm = if (n.condition)(&ctx) {
                    Some(0)
                } else if n.otherwise.is_some() {
                    Some(1)
                } else {
                    None
                };
                FrameState::Branch { arm, done: false }
            }
            FlowNode::Execute(_) => FrameState::Execute,
            FlowNode::ActionStep(n) => {
                let ctx = FlowContext { game: &*game, scope };
                let player = match &n.player {
                    Some(choose) => choose(&ctx),
                    None => scope
                        .player
                        .or_else(|| game.current_player())
                        .unwrap_or(PlayerId::new(0)),
                };
                self.events.push(FlowEvent::ActionStepEntered {
                    name: n.name.clone(),
                    player: Some(player),
                });
                FrameState::ActionStep {
                    player,
                    moves: Vec::new(),
                    finished: false,
                }
            }
            FlowNode::Simultaneous(n) => {
                let ctx = FlowContext { game: &*game, scope };
                let players = match &n.players {
                    Some(players) => players(&ctx),
                    None => game.turn_order(),
                };
                self.events.push(FlowEvent::ActionStepEntered {
                    name: n.name.clone(),
                    player: None,
                });
                FrameState::Simultaneous {
                    awaiting: players,
                    responses: Vec::new(),
                }
            }
        };

        PositionStep {
            kind: node.kind(),
            name: node.name().to_string(),
            frame,
        }
    }

    /// Exit hooks for a node whose frame was just popped.
    fn leave(&mut self, game: &mut G, node: &FlowNode<G>, scope: &FlowScope) {
        if let FlowNode::Phase(n) = node {
            if let Some(on_exit) = &n.on_exit {
                on_exit(game, scope);
            }
            self.events.push(FlowEvent::PhaseExited { name: n.name.clone() });
            debug!(phase = %n.name, "phase exited");
        }
    }

    fn finish(&mut self, game: &G, definition: &FlowDefinition<G>) {
        self.complete = true;
        self.position.steps.clear();
        self.winners = definition
            .winners
            .as_ref()
            .map(|winners| winners(game))
            .unwrap_or_default();
        self.events.push(FlowEvent::FlowCompleted {
            winners: self.winners.clone(),
        });
        debug!(winners = ?self.winners, "flow complete");
    }

    /// Replace the position without validation.
    pub(super) fn set_position(&mut self, position: FlowPosition) {
        self.position = position;
        self.started = true;
        self.complete = false;
        self.winners.clear();
        self.action_error = None;
    }

    pub(super) fn enter_root(&mut self, game: &mut G) {
        let definition = Arc::clone(&self.definition);
        let root = self.enter(game, &definition.root, &FlowScope::default());
        self.position.steps.push(root);
    }
}

/// Find the node for the innermost frame and the scope visible to it.
pub(super) fn locate<'n, G>(
    root: &'n FlowNode<G>,
    steps: &[PositionStep],
) -> Option<(&'n FlowNode<G>, FlowScope)> {
    let (last, parents) = steps.split_last()?;
    let mut scope = FlowScope::default();
    let mut node = root;
    for step in parents {
        bind(&mut scope, node, &step.frame);
        node = node.child_for(&step.frame)?;
    }
    bind(&mut scope, node, &last.frame);
    Some((node, scope))
}

fn bind<G>(scope: &mut FlowScope, node: &FlowNode<G>, frame: &FrameState) {
    match (node, frame) {
        (_, FrameState::EachPlayer { players, index }) => {
            if let Some(player) = players.get(*index) {
                scope.player = Some(*player);
            }
        }
        (FlowNode::ForEach(n), FrameState::ForEach { items, index }) => {
            if let Some(item) = items.get(*index) {
                scope.bindings.insert(n.binding.clone(), item.clone());
            }
        }
        (_, FrameState::ActionStep { player, .. }) => scope.player = Some(*player),
        _ => {}
    }
}

fn child_completed(frame: &mut FrameState) {
    match frame {
        FrameState::Sequence { index }
        | FrameState::EachPlayer { index, .. }
        | FrameState::ForEach { index, .. } => *index += 1,
        FrameState::Loop { iteration } => *iteration += 1,
        FrameState::Phase { done } | FrameState::Branch { done, .. } => *done = true,
        FrameState::Execute | FrameState::ActionStep { .. } | FrameState::Simultaneous { .. } => {}
    }
}

/// Names from `actions` that `player` can take now.
fn open_actions<G: GameRules>(
    registry: &ActionRegistry<G>,
    config: &EngineConfig,
    game: &G,
    player: PlayerId,
    actions: &[String],
) -> Vec<String> {
    let executor = ActionExecutor::new(config);
    actions
        .iter()
        .filter(|name| {
            registry
                .get(name)
                .is_some_and(|definition| executor.is_action_available(definition, game, player))
        })
        .cloned()
        .collect()
}

fn validate_definition<G>(
    definition: &FlowDefinition<G>,
    registry: &ActionRegistry<G>,
) -> Result<(), DefinitionError> {
    let mut error = None;
    definition.root.walk(&mut |node| {
        if error.is_some() {
            return;
        }
        let (name, actions) = match node {
            FlowNode::ActionStep(n) => (&n.name, &n.actions),
            FlowNode::Simultaneous(n) => (&n.name, &n.actions),
            _ => return,
        };
        if actions.is_empty() {
            error = Some(DefinitionError::EmptyActionStep(name.clone()));
        } else if let Some(missing) = actions.iter().find(|a| !registry.contains(a)) {
            error = Some(DefinitionError::UnknownFlowAction {
                step: name.clone(),
                action: missing.clone(),
            });
        }
    });
    error.map_or(Ok(()), Err)
}
