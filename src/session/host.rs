//! The `Session` facade.

use std::sync::Arc;

use im::Vector;
use tracing::debug;

use crate::actions::{
    ActionDebugInfo, ActionDefinition, ActionExecutor, ActionRegistry, ActionResult, ChoiceSet,
    PendingActionState, SerializedAction,
};
use crate::core::{
    ArgValue, DefinitionError, EngineConfig, FlowError, PlayerId, PlayerMap, RawArgs, ValidationError,
};
use crate::flow::{FlowDefinition, FlowEngine, FlowState};
use crate::rules::GameRules;

/// Result of feeding one selection value to a multi-step action.
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// More input is needed: the next selection and what it offers.
    Awaiting { selection: String, choices: ChoiceSet },
    /// Every selection was filled and the action ran (or failed to).
    Completed(ActionResult),
    /// The value was not accepted. Pending progress is unchanged.
    Rejected(ValidationError),
}

/// A running game: the game state, its flow, its actions, each player's
/// action in progress and the history of completed actions.
pub struct Session<G> {
    game: G,
    pub(super) flow: FlowEngine<G>,
    pub(super) registry: Arc<ActionRegistry<G>>,
    config: EngineConfig,
    pending: PlayerMap<Option<PendingActionState>>,
    pub(super) history: Vector<SerializedAction>,
}

impl<G: GameRules> Session<G> {
    /// Bundle a game with its rules. Call [`Session::start`] before playing.
    ///
    /// Fails if the rules are malformed or the game seats no players.
    pub fn new(
        game: G,
        registry: ActionRegistry<G>,
        definition: FlowDefinition<G>,
        config: EngineConfig,
    ) -> Result<Self, DefinitionError> {
        let players = game.player_count();
        if !(1..=255).contains(&players) {
            return Err(DefinitionError::InvalidPlayerCount(players));
        }
        let registry = Arc::new(registry);
        let flow = FlowEngine::new(definition, Arc::clone(&registry), config.clone())?;
        let pending = PlayerMap::with_default(players);
        Ok(Self {
            game,
            flow,
            registry,
            config,
            pending,
            history: Vector::new(),
        })
    }

    /// Run the flow to the first decision.
    pub fn start(&mut self) -> Result<FlowState, FlowError> {
        self.history.clear();
        for (_, slot) in self.pending.iter_mut() {
            *slot = None;
        }
        self.flow.start(&mut self.game)
    }

    #[must_use]
    pub fn game(&self) -> &G {
        &self.game
    }

    #[must_use]
    pub fn flow(&self) -> &FlowEngine<G> {
        &self.flow
    }

    /// Direct access for hosts that restore flow positions or reload rules.
    pub fn flow_and_game_mut(&mut self) -> (&mut FlowEngine<G>, &mut G) {
        (&mut self.flow, &mut self.game)
    }

    #[must_use]
    pub fn registry(&self) -> &ActionRegistry<G> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Completed actions, oldest first.
    #[must_use]
    pub fn history(&self) -> &Vector<SerializedAction> {
        &self.history
    }

    #[must_use]
    pub fn flow_state(&self) -> FlowState {
        self.flow.flow_state(&self.game)
    }

    #[must_use]
    pub fn available_actions(&self, player: PlayerId) -> Vec<String> {
        self.flow.available_actions(&self.game, player)
    }

    /// Perform an action with every argument supplied at once.
    ///
    /// A pending action of the same player is dropped once this succeeds.
    pub fn perform_action(
        &mut self,
        action: &str,
        player: PlayerId,
        args: &RawArgs,
    ) -> Result<ActionResult, FlowError> {
        let result = self.flow.resume(&mut self.game, action, args, player)?;
        if let Some(performed) = result.action.as_ref().filter(|_| result.success) {
            if let Some(slot) = self.pending.get_mut(player) {
                if slot.take().is_some() {
                    debug!(%player, action, "pending action superseded");
                }
            }
            self.history.push_back(performed.clone());
        }
        Ok(result)
    }

    /// Valid choices for `selection` of `action`, given wire values for the
    /// earlier selections.
    pub fn get_choices(
        &self,
        action: &str,
        selection: &str,
        player: PlayerId,
        prior: &RawArgs,
    ) -> Result<ChoiceSet, ValidationError> {
        let definition = self.definition(action)?;
        let executor = ActionExecutor::new(&self.config);
        let prior = executor.resolve_args(definition, prior, &self.game)?;
        executor.get_choices(definition, selection, &self.game, player, &prior)
    }

    /// Diagnostic trace for `action`, optionally checking supplied values.
    pub fn action_debug(
        &self,
        action: &str,
        player: PlayerId,
        supplied: Option<&RawArgs>,
    ) -> Result<ActionDebugInfo, ValidationError> {
        let definition = self.definition(action)?;
        Ok(ActionExecutor::new(&self.config).debug_action(definition, &self.game, player, supplied))
    }

    #[must_use]
    pub fn pending_state(&self, player: PlayerId) -> Option<&PendingActionState> {
        self.pending.get(player).and_then(Option::as_ref)
    }

    /// Drop `player`'s action in progress.
    ///
    /// Values already applied by a repeating selection's per-step callback
    /// stay applied; undoing them is up to the host's command log.
    pub fn cancel_pending(&mut self, player: PlayerId) -> Option<PendingActionState> {
        let cancelled = self.pending.get_mut(player).and_then(Option::take);
        if let Some(state) = &cancelled {
            debug!(%player, action = %state.action, "pending action cancelled");
        }
        cancelled
    }

    /// Put back a pending action saved earlier, for example after a
    /// reconnect.
    pub fn restore_pending(&mut self, state: PendingActionState) -> Result<(), ValidationError> {
        let definition = self.definition(&state.action)?;
        if state.selection_index > definition.selections.len() {
            return Err(ValidationError::InvalidChoice {
                selection: state.action.clone(),
                reason: format!("saved progress points past selection {}", definition.selections.len()),
            });
        }
        let player = state.player;
        let slot = self
            .pending
            .get_mut(player)
            .ok_or(ValidationError::NotYourTurn { player })?;
        *slot = Some(state);
        Ok(())
    }

    /// Choices for `player`'s next pending selection.
    pub fn pending_choices(&self, player: PlayerId) -> Result<(String, ChoiceSet), ValidationError> {
        let state = self
            .pending_state(player)
            .ok_or(ValidationError::NoPendingAction { player })?;
        let definition = self.definition(&state.action)?;
        let executor = ActionExecutor::new(&self.config);
        let choices = executor.pending_choices(definition, state, &self.game)?;
        let name = definition
            .selections
            .get(state.selection_index)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        Ok((name, choices))
    }

    /// Supply the next selection value of `action`.
    ///
    /// Starts a pending action if `player` has none, replacing one for a
    /// different action. Runs the action and advances the flow once the
    /// last selection is filled.
    pub fn submit_selection(
        &mut self,
        action: &str,
        player: PlayerId,
        value: &ArgValue,
    ) -> Result<StepOutcome, FlowError> {
        self.step(action, player, Some(value))
    }

    /// Skip `player`'s next pending selection, if it is optional.
    pub fn skip_selection(&mut self, player: PlayerId) -> Result<StepOutcome, FlowError> {
        let Some(action) = self.pending_state(player).map(|s| s.action.clone()) else {
            return Ok(StepOutcome::Rejected(ValidationError::NoPendingAction { player }));
        };
        self.step(&action, player, None)
    }

    fn step(
        &mut self,
        action: &str,
        player: PlayerId,
        value: Option<&ArgValue>,
    ) -> Result<StepOutcome, FlowError> {
        let registry = Arc::clone(&self.registry);
        let Some(definition) = registry.get(action) else {
            return Ok(StepOutcome::Rejected(ValidationError::UnknownAction(action.to_string())));
        };
        if let Err(err) = self.check_turn(action, player) {
            return Ok(StepOutcome::Rejected(err));
        }

        let mut state = match self.pending_state(player) {
            Some(state) if state.action == action => state.clone(),
            existing => {
                if let Some(old) = existing {
                    debug!(%player, old = %old.action, new = action, "pending action superseded");
                }
                match ActionExecutor::new(&self.config).create_pending_action_state(
                    definition,
                    &self.game,
                    player,
                ) {
                    Ok(state) => state,
                    Err(err) => return Ok(StepOutcome::Rejected(err)),
                }
            }
        };

        if let Err(err) = self.apply(definition, &mut state, value) {
            return Ok(StepOutcome::Rejected(err));
        }
        self.settle(definition, state)
    }

    /// Feed one value (or a skip) into `state`.
    pub(super) fn apply(
        &mut self,
        definition: &ActionDefinition<G>,
        state: &mut PendingActionState,
        value: Option<&ArgValue>,
    ) -> Result<(), ValidationError> {
        let executor = ActionExecutor::new(&self.config);
        let current = definition
            .selections
            .get(state.selection_index)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        match value {
            None => executor.skip_selection(definition, state, &self.game),
            Some(value) if executor.is_repeating_selection(definition, &current) => {
                executor.process_repeating_step(definition, state, value, &mut self.game)
            }
            Some(value) => executor.process_selection_step(definition, state, value, &self.game),
        }
    }

    /// Store `state` as pending, or run it if it is complete.
    pub(super) fn settle(
        &mut self,
        definition: &ActionDefinition<G>,
        state: PendingActionState,
    ) -> Result<StepOutcome, FlowError> {
        let player = state.player;
        let executor = ActionExecutor::new(&self.config);

        if !executor.is_pending_action_complete(definition, &state) {
            let next = definition
                .selections
                .get(state.selection_index)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            let choices = match executor.pending_choices(definition, &state, &self.game) {
                Ok(choices) => choices,
                Err(err) => return Ok(StepOutcome::Rejected(err)),
            };
            if let Some(slot) = self.pending.get_mut(player) {
                *slot = Some(state);
            }
            return Ok(StepOutcome::Awaiting {
                selection: next,
                choices,
            });
        }

        if let Some(slot) = self.pending.get_mut(player) {
            *slot = None;
        }
        let result = executor.execute_pending_action(definition, &state, &mut self.game);
        let result = self.flow.resume_after_external_action(&mut self.game, &result)?;
        if let Some(performed) = result.action.as_ref().filter(|_| result.success) {
            self.history.push_back(performed.clone());
        }
        Ok(StepOutcome::Completed(result))
    }

    /// Whether the flow would accept `action` from `player` right now.
    ///
    /// Availability is not rechecked here: a repeating selection's callbacks
    /// may change the game mid-action, and a new pending action checks it
    /// when it is created.
    fn check_turn(&self, action: &str, player: PlayerId) -> Result<(), ValidationError> {
        self.flow.check_awaiting(action, player)
    }

    pub(super) fn definition(&self, action: &str) -> Result<&ActionDefinition<G>, ValidationError> {
        self.registry
            .get(action)
            .ok_or_else(|| ValidationError::UnknownAction(action.to_string()))
    }
}

impl<G> std::fmt::Debug for Session<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("flow", &self.flow)
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}
