//! Rebuilding a session from serialized history.
//!
//! Plain actions are performed again with their recorded arguments. Actions
//! with a repeating selection are fed value by value through the pending
//! machinery, because each recorded path was captured against the game as
//! it stood at that step, after the earlier steps' callbacks had run.

use std::sync::Arc;

use tracing::debug;

use super::host::{Session, StepOutcome};
use crate::actions::executor::wire_value;
use crate::actions::{ActionDefinition, ActionExecutor, ActionResult, SerializedAction};
use crate::core::{ArgValue, FlowError, ValidationError};
use crate::rules::GameRules;

impl<G: GameRules> Session<G> {
    /// Apply recorded actions in order to a freshly started session.
    ///
    /// Stops at the first entry that no longer applies.
    pub fn replay(&mut self, history: &[SerializedAction]) -> Result<(), FlowError> {
        for (index, entry) in history.iter().enumerate() {
            let diverged = |reason: String| FlowError::ReplayDiverged {
                index,
                action: entry.name.clone(),
                reason,
            };

            let registry = Arc::clone(&self.registry);
            let definition = registry
                .get(&entry.name)
                .ok_or_else(|| diverged(ValidationError::UnknownAction(entry.name.clone()).to_string()))?;

            let result = if definition.repeating_selection().is_some() {
                self.replay_stepwise(definition, entry)?
            } else {
                self.perform_action(&entry.name, entry.player_id(), &entry.args)?
            };

            if !result.success {
                let reason = result
                    .error
                    .map_or_else(|| "action failed".to_string(), |err| err.to_string());
                return Err(diverged(reason));
            }
        }
        debug!(entries = history.len(), "history replayed");
        Ok(())
    }

    fn replay_stepwise(
        &mut self,
        definition: &ActionDefinition<G>,
        entry: &SerializedAction,
    ) -> Result<ActionResult, FlowError> {
        let player = entry.player_id();
        self.cancel_pending(player);

        let executor = ActionExecutor::new(self.config());
        let mut state = match executor.create_pending_action_state(definition, self.game(), player) {
            Ok(state) => state,
            Err(err) => return Ok(ActionResult::failed(err)),
        };

        for selection in &definition.selections {
            let step = match (entry.args.get(&selection.name), &selection.repeat) {
                (Some(ArgValue::List(values)), Some(repeat)) => {
                    let mut outcome = Ok(());
                    for value in values {
                        outcome = self.apply(definition, &mut state, Some(value));
                        if outcome.is_err() || state.repeat.as_ref().is_some_and(|r| r.stopped) {
                            break;
                        }
                    }
                    let stopped = state.repeat.as_ref().is_some_and(|r| r.stopped);
                    match (&repeat.terminator, outcome.is_ok() && !stopped) {
                        (Some(terminator), true) => {
                            let terminator = wire_value(terminator, self.game());
                            self.apply(definition, &mut state, Some(&terminator))
                        }
                        _ => outcome,
                    }
                }
                (Some(value), _) => self.apply(definition, &mut state, Some(value)),
                (None, _) => self.apply(definition, &mut state, None),
            };
            if let Err(err) = step {
                return Ok(ActionResult::failed(err));
            }
        }

        match self.settle(definition, state)? {
            StepOutcome::Completed(result) => Ok(result),
            StepOutcome::Rejected(err) => Ok(ActionResult::failed(err)),
            StepOutcome::Awaiting { selection, .. } => {
                Ok(ActionResult::failed(ValidationError::MissingSelection(selection)))
            }
        }
    }
}
