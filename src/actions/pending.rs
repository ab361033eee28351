//! Pending actions: multi-step and repeating selections in flight.
//!
//! A `PendingActionState` is plain data. It records which selection comes
//! next, the live and wire values chosen so far, and, while the last
//! selection repeats, the values accumulated by the repeat loop. Hosts can
//! persist it with [`PendingActionState::to_bytes`] and resume after a
//! reconnect.
//!
//! ## Lifecycle
//!
//! 1. `create_pending_action_state` when the player starts the action
//! 2. `process_selection_step` / `skip_selection` for ordinary selections
//! 3. `process_repeating_step` once per value of the repeating selection
//! 4. `execute_pending_action` once `is_pending_action_complete`

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::definition::ActionDefinition;
use super::executor::{wire_value, ActionExecutor};
use super::lookahead::PathSearch;
use super::result::{ActionResult, SerializedAction};
use super::selection::{Choice, ChoiceSet, SelectionContext};
use crate::core::{ArgValue, Args, FlowError, PlayerId, RawArgs, ValidationError, Value};
use crate::rules::GameRules;

/// Progress of a repeating selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatProgress {
    pub selection: String,
    pub iterations: usize,
    pub values: Vec<Value>,
    /// Values as paths, captured before each `on_each`.
    pub wire_values: Vec<ArgValue>,
    pub stopped: bool,
}

/// Serializable progress of one player's action in flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingActionState {
    pub action: String,
    pub player: PlayerId,
    /// Index of the next selection to fill.
    pub selection_index: usize,
    pub args: Args,
    pub wire_args: RawArgs,
    pub repeat: Option<RepeatProgress>,
}

impl PendingActionState {
    /// Values accumulated by the repeating selection so far.
    #[must_use]
    pub fn repeated_values(&self) -> &[Value] {
        self.repeat.as_ref().map_or(&[], |r| r.values.as_slice())
    }

    /// Encode for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FlowError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a persisted state.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FlowError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl ActionExecutor<'_> {
    /// Check whether the named selection repeats.
    pub fn is_repeating_selection<G>(&self, definition: &ActionDefinition<G>, selection: &str) -> bool {
        definition
            .selection(selection)
            .is_some_and(|(_, s)| s.is_repeating())
    }

    /// Begin tracking an action for `player`. Fails if the action is not
    /// available.
    pub fn create_pending_action_state<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        game: &G,
        player: PlayerId,
    ) -> Result<PendingActionState, ValidationError> {
        let failed: Vec<String> = self
            .evaluate_conditions(definition, game, player)
            .into_iter()
            .filter(|c| !c.passed)
            .map(|c| c.label)
            .collect();
        if !failed.is_empty() || !self.has_valid_selection_path(definition, game, player, &Args::new(), 0) {
            return Err(ValidationError::NotAvailable {
                action: definition.name.clone(),
                failed,
            });
        }

        debug!(action = %definition.name, %player, "pending action started");
        Ok(PendingActionState {
            action: definition.name.clone(),
            player,
            selection_index: 0,
            args: Args::new(),
            wire_args: RawArgs::new(),
            repeat: None,
        })
    }

    /// Choices for the next selection of a pending action.
    ///
    /// While repeating, the terminator is offered once at least one value
    /// has been accepted.
    pub fn pending_choices<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        state: &PendingActionState,
        game: &G,
    ) -> Result<ChoiceSet, ValidationError> {
        let selection = definition
            .selections
            .get(state.selection_index)
            .ok_or_else(|| complete_error(definition))?;

        if !selection.is_repeating() {
            return self.get_choices(definition, &selection.name, game, state.player, &state.args);
        }

        let ctx = SelectionContext {
            game,
            player: state.player,
            args: &state.args,
            repeated: state.repeated_values(),
        };
        let mut choices = selection.repeat_choices(&ctx, self.config());
        if let (ChoiceSet::Options(options), Some(terminator)) = (
            &mut choices,
            selection.repeat.as_ref().and_then(|r| r.terminator.as_ref()),
        ) {
            if !state.repeated_values().is_empty() {
                options.push(Choice {
                    value: terminator.clone(),
                    label: selection.label_for(game, terminator),
                    path: None,
                });
            }
        }
        Ok(choices)
    }

    /// Fill the next (non-repeating) selection.
    pub fn process_selection_step<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        state: &mut PendingActionState,
        raw: &ArgValue,
        game: &G,
    ) -> Result<(), ValidationError> {
        let selection = definition
            .selections
            .get(state.selection_index)
            .ok_or_else(|| complete_error(definition))?;
        if selection.is_repeating() {
            return Err(ValidationError::InvalidChoice {
                selection: selection.name.clone(),
                reason: "this selection repeats; submit values one at a time".to_string(),
            });
        }

        let value = self.validate_selection(
            definition,
            &selection.name,
            raw,
            game,
            state.player,
            &state.args,
        )?;
        state
            .wire_args
            .insert(selection.name.clone(), wire_value(&value, game));
        state.args.insert(selection.name.clone(), value);
        state.selection_index += 1;
        Ok(())
    }

    /// Leave the next selection out. Only optional selections can be skipped,
    /// and only if the action can still be completed without them.
    pub fn skip_selection<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        state: &mut PendingActionState,
        game: &G,
    ) -> Result<(), ValidationError> {
        let selection = definition
            .selections
            .get(state.selection_index)
            .ok_or_else(|| complete_error(definition))?;
        if !selection.optional {
            return Err(ValidationError::MissingSelection(selection.name.clone()));
        }
        let mut search = PathSearch::new(definition, game, state.player, self.config());
        if !search.completes_from(state.selection_index + 1, &state.args) {
            return Err(ValidationError::InvalidChoice {
                selection: selection.name.clone(),
                reason: "the action cannot be completed without it".to_string(),
            });
        }
        state.selection_index += 1;
        Ok(())
    }

    /// Accept one value of the repeating selection.
    ///
    /// The value's wire path is captured, then `on_each` runs against the
    /// game. A value already accumulated is refused. The loop stops when the
    /// terminator is chosen, `until` holds, `max_repeats` is reached, or
    /// nothing further can be chosen; the selection index then advances past
    /// the repeating selection.
    pub fn process_repeating_step<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        state: &mut PendingActionState,
        raw: &ArgValue,
        game: &mut G,
    ) -> Result<(), ValidationError> {
        let selection = definition
            .selections
            .get(state.selection_index)
            .ok_or_else(|| complete_error(definition))?;
        let Some(repeat) = &selection.repeat else {
            return Err(ValidationError::InvalidChoice {
                selection: selection.name.clone(),
                reason: "this selection does not repeat".to_string(),
            });
        };

        let progress = state.repeat.get_or_insert_with(|| RepeatProgress {
            selection: selection.name.clone(),
            iterations: 0,
            values: Vec::new(),
            wire_values: Vec::new(),
            stopped: false,
        });

        if self.is_terminator(selection, raw, &*game) {
            if progress.values.is_empty() {
                return Err(ValidationError::InvalidChoice {
                    selection: selection.name.clone(),
                    reason: "choose at least one value before stopping".to_string(),
                });
            }
            progress.stopped = true;
        } else {
            let value = {
                let ctx = SelectionContext {
                    game: &*game,
                    player: state.player,
                    args: &state.args,
                    repeated: &progress.values,
                };
                self.resolve_repeat_item(selection, raw, &ctx)?
            };
            progress.wire_values.push(wire_value(&value, &*game));
            if let Some(on_each) = &repeat.on_each {
                on_each(game, state.player, &value);
            }
            progress.values.push(value);
            progress.iterations += 1;

            let ctx = SelectionContext {
                game: &*game,
                player: state.player,
                args: &state.args,
                repeated: &progress.values,
            };
            progress.stopped = self.repeat_finished(selection, &ctx);
        }

        debug!(
            action = %definition.name,
            selection = %selection.name,
            iterations = progress.iterations,
            stopped = progress.stopped,
            "repeating step"
        );

        if progress.stopped {
            state.args.insert(selection.name.clone(), Value::List(progress.values.clone()));
            state
                .wire_args
                .insert(selection.name.clone(), ArgValue::List(progress.wire_values.clone()));
            state.selection_index += 1;
        }
        Ok(())
    }

    /// True once every selection is filled or skipped, including a stopped
    /// repeat loop.
    pub fn is_pending_action_complete<G>(
        &self,
        definition: &ActionDefinition<G>,
        state: &PendingActionState,
    ) -> bool {
        state.selection_index >= definition.selections.len()
    }

    /// Run the execute callback with everything collected.
    ///
    /// `on_each` has already been applied for every repeated value, so it is
    /// not run again. The recorded action uses the paths captured when each
    /// value was chosen.
    pub fn execute_pending_action<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        state: &PendingActionState,
        game: &mut G,
    ) -> ActionResult {
        if let Some(next) = definition.selections.get(state.selection_index) {
            return ActionResult::failed(ValidationError::MissingSelection(next.name.clone()));
        }
        let serialized = SerializedAction {
            name: definition.name.clone(),
            player: state.player.into(),
            args: state.wire_args.clone(),
            undoable: definition.undoable,
        };
        self.commit(definition, &state.args, game, state.player, serialized)
    }
}

fn complete_error<G>(definition: &ActionDefinition<G>) -> ValidationError {
    ValidationError::InvalidChoice {
        selection: definition.name.clone(),
        reason: "every selection has already been made".to_string(),
    }
}
