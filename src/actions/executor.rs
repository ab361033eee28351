//! The action executor: choices, validation, availability and execution.
//!
//! ## Smart resolve
//!
//! Clients send loose values (a bare id, a label, a path). A supplied value
//! is matched against the choices the selection actually offers:
//!
//! 1. An exact match of the resolved value wins.
//! 2. Otherwise loose matches are collected: an integer against element ids
//!    and player seats, text against labels, text values and paths, a path
//!    against element paths.
//! 3. One loose match is accepted. Several are ambiguous. None is invalid.

use tracing::debug;

use super::definition::{ActionDefinition, ConditionContext};
use super::lookahead::PathSearch;
use super::pending::PendingActionState;
use super::result::{ActionResult, SerializedAction};
use super::selection::{Choice, ChoiceSet, Selection, SelectionContext, SelectionKind};
use super::trace::{ActionDebugInfo, ConditionTrace, SelectionDebugInfo};
use crate::board::{ElementPath, ElementTree};
use crate::core::{ArgValue, Args, EngineConfig, EntityId, PlayerId, RawArgs, ValidationError, Value};
use crate::rules::GameRules;

/// Resolves, validates and executes actions for one engine configuration.
///
/// The executor holds no game state; every method takes the game and the
/// acting player explicitly.
#[derive(Clone, Copy, Debug)]
pub struct ActionExecutor<'a> {
    config: &'a EngineConfig,
}

impl<'a> ActionExecutor<'a> {
    #[must_use]
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }
}

impl ActionExecutor<'_> {
    /// Evaluate every condition. All are run, even after a failure.
    pub fn evaluate_conditions<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        game: &G,
        player: PlayerId,
    ) -> Vec<ConditionTrace> {
        let ctx = ConditionContext { game, player };
        definition
            .conditions
            .iter()
            .map(|(label, predicate)| match predicate(&ctx) {
                Ok(()) => ConditionTrace {
                    label: label.clone(),
                    passed: true,
                    reason: None,
                },
                Err(reason) => ConditionTrace {
                    label: label.clone(),
                    passed: false,
                    reason: Some(reason),
                },
            })
            .collect()
    }

    fn failed_conditions<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        game: &G,
        player: PlayerId,
    ) -> Vec<String> {
        self.evaluate_conditions(definition, game, player)
            .into_iter()
            .filter(|c| !c.passed)
            .map(|c| c.label)
            .collect()
    }

    /// Check whether `player` could complete `definition` right now.
    ///
    /// True only if every condition holds and some complete assignment of the
    /// selection chain would pass validation.
    pub fn is_action_available<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        game: &G,
        player: PlayerId,
    ) -> bool {
        self.failed_conditions(definition, game, player).is_empty()
            && self.has_valid_selection_path(definition, game, player, &Args::new(), 0)
    }

    /// Check whether selections `from..` can be completed after `prior`.
    pub fn has_valid_selection_path<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        game: &G,
        player: PlayerId,
        prior: &Args,
        from: usize,
    ) -> bool {
        PathSearch::new(definition, game, player, self.config).completes_from(from, prior)
    }

    /// Valid choices for one selection, given the values chosen for earlier
    /// selections.
    ///
    /// Choices that lead to no complete action are left out. A multi-element
    /// selection lists its candidates as-is, or nothing if no subset can
    /// complete the action.
    pub fn get_choices<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        selection: &str,
        game: &G,
        player: PlayerId,
        prior: &Args,
    ) -> Result<ChoiceSet, ValidationError> {
        let (index, sel) = lookup(definition, selection)?;
        if let Some(missing) = definition.selections[..index]
            .iter()
            .find(|s| !s.optional && !prior.contains(&s.name))
        {
            return Err(ValidationError::MissingSelection(missing.name.clone()));
        }

        let mut search = PathSearch::new(definition, game, player, self.config);
        Ok(self.choices_at(&mut search, index, sel, game, player, prior))
    }

    fn choices_at<G: GameRules>(
        &self,
        search: &mut PathSearch<'_, G>,
        index: usize,
        selection: &Selection<G>,
        game: &G,
        player: PlayerId,
        prior: &Args,
    ) -> ChoiceSet {
        let ctx = SelectionContext::new(game, player, prior);
        let options = match selection.raw_choices(&ctx, self.config) {
            ChoiceSet::Free => return ChoiceSet::Free,
            ChoiceSet::Options(options) => options,
        };

        if selection.is_repeating() {
            return ChoiceSet::Options(options);
        }
        if let SelectionKind::Elements { .. } = selection.kind {
            let mut without = prior.clone();
            without.remove(&selection.name);
            return if search.completes_from(index, &without) {
                ChoiceSet::Options(options)
            } else {
                ChoiceSet::Options(Vec::new())
            };
        }

        ChoiceSet::Options(
            options
                .into_iter()
                .filter(|choice| search.completes_with(index, prior, choice.value.clone()))
                .collect(),
        )
    }

    /// Turn wire arguments into live values without checking them against
    /// the offered choices.
    pub fn resolve_args<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        raw: &RawArgs,
        game: &G,
    ) -> Result<Args, ValidationError> {
        let mut args = Args::new();
        for (name, value) in raw {
            lookup(definition, name)?;
            let live = live_value(value, game).ok_or_else(|| ValidationError::UnresolvedElement {
                selection: name.clone(),
                reference: value.to_string(),
            })?;
            args.insert(name.clone(), live);
        }
        Ok(args)
    }

    /// Validate one supplied value for `selection` after `prior`.
    pub fn validate_selection<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        selection: &str,
        raw: &ArgValue,
        game: &G,
        player: PlayerId,
        prior: &Args,
    ) -> Result<Value, ValidationError> {
        let (index, sel) = lookup(definition, selection)?;
        let mut search = PathSearch::new(definition, game, player, self.config);
        self.accept(&mut search, index, sel, raw, game, player, prior)
    }

    /// Resolve and check a value, including that the rest of the chain can
    /// still be completed.
    #[allow(clippy::too_many_arguments)]
    fn accept<G: GameRules>(
        &self,
        search: &mut PathSearch<'_, G>,
        index: usize,
        selection: &Selection<G>,
        raw: &ArgValue,
        game: &G,
        player: PlayerId,
        prior: &Args,
    ) -> Result<Value, ValidationError> {
        if selection.is_repeating() {
            return self.resolve_repeated(selection, raw, game, player, prior);
        }

        let ctx = SelectionContext::new(game, player, prior);
        let value = self.resolve_one(selection, raw, &ctx)?;

        if !search.completes_with(index, prior, value.clone()) {
            return Err(ValidationError::InvalidChoice {
                selection: selection.name.clone(),
                reason: "no way to complete the action after this choice".to_string(),
            });
        }
        Ok(value)
    }

    /// Resolve one value against the choices offered in `ctx`.
    pub(crate) fn resolve_one<G: GameRules>(
        &self,
        selection: &Selection<G>,
        raw: &ArgValue,
        ctx: &SelectionContext<'_, G>,
    ) -> Result<Value, ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidChoice {
            selection: selection.name.clone(),
            reason,
        };

        let options = match selection.raw_choices(ctx, self.config) {
            ChoiceSet::Free => {
                let value = free_value(selection, raw).map_err(&invalid)?;
                selection.check_constraints(&value).map_err(&invalid)?;
                selection.run_check(ctx, &value).map_err(&invalid)?;
                return Ok(value);
            }
            ChoiceSet::Options(options) => options,
        };

        if !matches!(selection.kind, SelectionKind::Elements { .. }) {
            return smart_resolve(&selection.name, raw, &options, ctx.game);
        }

        let items: &[ArgValue] = match raw {
            ArgValue::List(items) => items,
            single => std::slice::from_ref(single),
        };
        let mut chosen = Vec::with_capacity(items.len());
        for item in items {
            let value = smart_resolve(&selection.name, item, &options, ctx.game)?;
            if chosen.contains(&value) {
                return Err(invalid(format!("{value} is chosen more than once")));
            }
            chosen.push(value);
        }
        let value = Value::List(chosen);
        selection.check_constraints(&value).map_err(&invalid)?;
        selection.run_check(ctx, &value).map_err(&invalid)?;
        Ok(value)
    }

    /// Resolve one value of a repeating selection. A value already
    /// accumulated is refused.
    pub(crate) fn resolve_repeat_item<G: GameRules>(
        &self,
        selection: &Selection<G>,
        raw: &ArgValue,
        ctx: &SelectionContext<'_, G>,
    ) -> Result<Value, ValidationError> {
        let value = self.resolve_one(selection, raw, ctx)?;
        if ctx.repeated.contains(&value) {
            return Err(ValidationError::InvalidChoice {
                selection: selection.name.clone(),
                reason: format!("{value} is already chosen"),
            });
        }
        Ok(value)
    }

    /// Check whether a repeat loop stops with `ctx.repeated` accepted: `until`
    /// holds, `max_repeats` is reached, or nothing further can be chosen.
    pub(crate) fn repeat_finished<G: GameRules>(
        &self,
        selection: &Selection<G>,
        ctx: &SelectionContext<'_, G>,
    ) -> bool {
        let Some(repeat) = &selection.repeat else {
            return true;
        };
        repeat.until.as_ref().is_some_and(|until| until(ctx, ctx.repeated))
            || repeat.max_repeats.is_some_and(|max| ctx.repeated.len() >= max)
            || selection.repeat_choices(ctx, self.config).is_empty()
    }

    /// Check whether `raw` names the terminator of a repeating selection.
    pub(crate) fn is_terminator<G: GameRules>(
        &self,
        selection: &Selection<G>,
        raw: &ArgValue,
        game: &G,
    ) -> bool {
        let Some(terminator) = selection.repeat.as_ref().and_then(|r| r.terminator.as_ref()) else {
            return false;
        };
        live_value(raw, game).as_ref() == Some(terminator)
            || smart_resolve(
                &selection.name,
                raw,
                &[Choice {
                    value: terminator.clone(),
                    label: selection.label_for(game, terminator),
                    path: None,
                }],
                game,
            )
            .is_ok()
    }

    /// Resolve a whole repeating selection supplied at once, with the rules
    /// of the step-by-step path: each value sees the earlier ones, the loop
    /// stops on the terminator or [`Self::repeat_finished`], and values left
    /// after the stop are refused. A list that ends before the loop stops is
    /// only complete if the selection has a terminator.
    ///
    /// The game is not changed here, so `on_each` effects of earlier values
    /// are not visible to later ones; [`Self::execute_action`] applies them.
    fn resolve_repeated<G: GameRules>(
        &self,
        selection: &Selection<G>,
        raw: &ArgValue,
        game: &G,
        player: PlayerId,
        prior: &Args,
    ) -> Result<Value, ValidationError> {
        let items: &[ArgValue] = match raw {
            ArgValue::List(items) => items,
            single => std::slice::from_ref(single),
        };
        let invalid = |reason: String| ValidationError::InvalidChoice {
            selection: selection.name.clone(),
            reason,
        };

        let mut values = Vec::with_capacity(items.len());
        let mut finished = false;
        for (index, item) in items.iter().enumerate() {
            if finished {
                return Err(invalid(format!(
                    "{} value(s) left over after the selection stopped",
                    items.len() - index
                )));
            }
            if self.is_terminator(selection, item, game) {
                if values.is_empty() {
                    return Err(invalid("choose at least one value before stopping".to_string()));
                }
                finished = true;
                continue;
            }
            let value = {
                let ctx = SelectionContext {
                    game,
                    player,
                    args: prior,
                    repeated: &values,
                };
                self.resolve_repeat_item(selection, item, &ctx)?
            };
            values.push(value);
            let ctx = SelectionContext {
                game,
                player,
                args: prior,
                repeated: &values,
            };
            finished = self.repeat_finished(selection, &ctx);
        }

        if values.is_empty() {
            return Err(ValidationError::MissingSelection(selection.name.clone()));
        }
        let has_terminator = selection.repeat.as_ref().is_some_and(|r| r.terminator.is_some());
        if !finished && !has_terminator {
            return Err(invalid("more values are needed before the selection stops".to_string()));
        }
        Ok(Value::List(values))
    }

    /// Validate a complete argument set.
    ///
    /// Conditions are checked first, then every selection in order. Omitted
    /// optional selections are skipped.
    pub fn validate_action<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        raw: &RawArgs,
        game: &G,
        player: PlayerId,
    ) -> Result<Args, ValidationError> {
        let failed = self.failed_conditions(definition, game, player);
        if !failed.is_empty() {
            return Err(ValidationError::NotAvailable {
                action: definition.name.clone(),
                failed,
            });
        }

        for name in raw.keys() {
            lookup(definition, name)?;
        }

        let mut search = PathSearch::new(definition, game, player, self.config);
        let mut args = Args::new();
        if !search.completes_from(0, &args) {
            return Err(ValidationError::NotAvailable {
                action: definition.name.clone(),
                failed: Vec::new(),
            });
        }
        for (index, selection) in definition.selections.iter().enumerate() {
            match raw.get(&selection.name) {
                None if selection.optional => {}
                None => return Err(ValidationError::MissingSelection(selection.name.clone())),
                Some(value) => {
                    let value = self.accept(&mut search, index, selection, value, game, player, &args)?;
                    args.insert(selection.name.clone(), value);
                }
            }
        }
        Ok(args)
    }

    /// Validate and run an action.
    ///
    /// Invalid input yields a failed result; the game is untouched. If the
    /// execute callback itself fails the game may be partly changed. Values
    /// of a repeating selection are applied one at a time, as
    /// [`Self::process_repeating_step`] applies them.
    pub fn execute_action<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        raw: &RawArgs,
        game: &mut G,
        player: PlayerId,
    ) -> ActionResult {
        let args = match self.validate_action(definition, raw, game, player) {
            Ok(args) => args,
            Err(err) => {
                debug!(action = %definition.name, %player, error = %err, "action rejected");
                return ActionResult::failed(err);
            }
        };

        let Some(selection) = definition
            .repeating_selection()
            .filter(|s| args.contains(&s.name))
        else {
            let serialized = self.serialize_action(definition, &args, game, player);
            return self.commit(definition, &args, game, player, serialized);
        };

        match self.apply_repeated(definition, selection, raw, args, game, player) {
            Ok(state) => self.execute_pending_action(definition, &state, game),
            Err(err) => {
                debug!(action = %definition.name, %player, error = %err, "repeated values rejected");
                ActionResult::failed(err)
            }
        }
    }

    /// Feed the values of a repeating selection through
    /// [`Self::process_repeating_step`], so `on_each` runs between values
    /// exactly as it does for values submitted one at a time.
    ///
    /// A value refused here leaves the `on_each` effects of the values
    /// before it applied, as cancelling a pending action does.
    fn apply_repeated<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        selection: &Selection<G>,
        raw: &RawArgs,
        mut args: Args,
        game: &mut G,
        player: PlayerId,
    ) -> Result<PendingActionState, ValidationError> {
        args.remove(&selection.name);
        let wire_args = args
            .iter()
            .map(|(name, value)| (name.clone(), wire_value(value, &*game)))
            .collect();
        let mut state = PendingActionState {
            action: definition.name.clone(),
            player,
            selection_index: definition.selections.len() - 1,
            args,
            wire_args,
            repeat: None,
        };

        let items: &[ArgValue] = match raw.get(&selection.name) {
            Some(ArgValue::List(items)) => items,
            Some(single) => std::slice::from_ref(single),
            None => &[],
        };
        for item in items {
            self.process_repeating_step(definition, &mut state, item, game)?;
        }
        if !self.is_pending_action_complete(definition, &state) {
            if let Some(terminator) = selection.repeat.as_ref().and_then(|r| r.terminator.as_ref()) {
                let terminator = wire_value(terminator, &*game);
                self.process_repeating_step(definition, &mut state, &terminator, game)?;
            }
        }
        Ok(state)
    }

    /// Run the execute callback on already validated arguments.
    pub(crate) fn commit<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        args: &Args,
        game: &mut G,
        player: PlayerId,
        serialized: SerializedAction,
    ) -> ActionResult {
        if let Err(reason) = (definition.execute)(game, player, args) {
            debug!(action = %definition.name, %player, %reason, "execute failed");
            return ActionResult::failed(ValidationError::ExecutionFailed {
                action: definition.name.clone(),
                reason,
            });
        }
        debug!(action = %definition.name, %player, args = args.len(), "action executed");
        ActionResult::succeeded(serialized)
    }

    /// Wire form of an action, with elements expressed as paths.
    pub fn serialize_action<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        args: &Args,
        game: &G,
        player: PlayerId,
    ) -> SerializedAction {
        SerializedAction {
            name: definition.name.clone(),
            player: player.into(),
            args: args
                .iter()
                .map(|(name, value)| (name.clone(), wire_value(value, game)))
                .collect(),
            undoable: definition.undoable,
        }
    }

    /// Explain whether an action is available and how the supplied values
    /// fare. Does not change control flow or game state.
    pub fn debug_action<G: GameRules>(
        &self,
        definition: &ActionDefinition<G>,
        game: &G,
        player: PlayerId,
        supplied: Option<&RawArgs>,
    ) -> ActionDebugInfo {
        let conditions = self.evaluate_conditions(definition, game, player);
        let mut failure = conditions.iter().find(|c| !c.passed).map(|c| {
            format!(
                "condition '{}' failed: {}",
                c.label,
                c.reason.as_deref().unwrap_or("no reason given")
            )
        });

        let mut search = PathSearch::new(definition, game, player, self.config);
        let mut selections = Vec::with_capacity(definition.selections.len());
        let mut args = Args::new();

        for (index, selection) in definition.selections.iter().enumerate() {
            let choices = self.choices_at(&mut search, index, selection, game, player, &args);
            let raw = supplied.and_then(|s| s.get(&selection.name));
            let rejection = raw.and_then(|raw| {
                match self.accept(&mut search, index, selection, raw, game, player, &args) {
                    Ok(value) => {
                        args.insert(selection.name.clone(), value);
                        None
                    }
                    Err(err) => Some(err.to_string()),
                }
            });
            let dead_end = choices.is_empty() && !selection.optional;
            if dead_end && failure.is_none() {
                failure = Some(format!("no valid choice for '{}'", selection.name));
            }

            let stop = !selection.optional && (raw.is_none() || rejection.is_some());
            selections.push(SelectionDebugInfo {
                name: selection.name.clone(),
                kind: selection.selection_type(),
                choice_count: choices.len(),
                free_input: matches!(choices, ChoiceSet::Free),
                choices: choices.options().to_vec(),
                dead_end,
                supplied: raw.map(ToString::to_string),
                rejection,
            });
            if stop {
                break;
            }
        }

        let path_exists = search.completes_from(0, &Args::new());
        let available = conditions.iter().all(|c| c.passed) && path_exists;
        if !available && failure.is_none() {
            failure = Some("no complete selection path".to_string());
        }

        ActionDebugInfo {
            action: definition.name.clone(),
            player,
            available,
            conditions,
            selections,
            search_exhausted: search.exhausted(),
            failure,
        }
    }
}

fn lookup<'d, G>(
    definition: &'d ActionDefinition<G>,
    selection: &str,
) -> Result<(usize, &'d Selection<G>), ValidationError> {
    definition
        .selection(selection)
        .ok_or_else(|| ValidationError::UnknownSelection {
            action: definition.name.clone(),
            selection: selection.to_string(),
        })
}

/// Live form of a wire value. `None` if a path names no element.
pub(crate) fn live_value<T: ElementTree + ?Sized>(raw: &ArgValue, tree: &T) -> Option<Value> {
    Some(match raw {
        ArgValue::Bool(b) => Value::Bool(*b),
        ArgValue::Int(n) => Value::Int(*n),
        ArgValue::Text(s) => Value::Text(s.clone()),
        ArgValue::Player(p) => Value::Player(*p),
        ArgValue::Element(id) => Value::Element(*id),
        ArgValue::Path(path) => Value::Element(tree.element_at(path)?),
        ArgValue::List(items) => Value::List(
            items
                .iter()
                .map(|item| live_value(item, tree))
                .collect::<Option<Vec<_>>>()?,
        ),
    })
}

/// Wire form of a live value. Elements become paths where the tree knows them.
pub(crate) fn wire_value<T: ElementTree + ?Sized>(value: &Value, tree: &T) -> ArgValue {
    match value {
        Value::Element(id) => tree
            .element_path(*id)
            .map_or(ArgValue::Element(*id), ArgValue::Path),
        Value::List(items) => ArgValue::List(items.iter().map(|v| wire_value(v, tree)).collect()),
        other => ArgValue::from(other),
    }
}

fn free_value<G>(selection: &Selection<G>, raw: &ArgValue) -> Result<Value, String> {
    match (&selection.kind, raw) {
        (SelectionKind::Text { .. }, ArgValue::Text(s)) => Ok(Value::Text(s.clone())),
        (SelectionKind::Text { .. }, other) => Err(format!("expected text, got {other}")),
        (SelectionKind::Number { .. }, ArgValue::Int(n)) => Ok(Value::Int(*n)),
        (SelectionKind::Number { .. }, ArgValue::Text(s)) => s
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| format!("expected a number, got '{s}'")),
        (SelectionKind::Number { .. }, other) => Err(format!("expected a number, got {other}")),
        (_, other) => Err(format!("unexpected value {other}")),
    }
}

/// Match a client value against offered choices.
pub(crate) fn smart_resolve<T: ElementTree + ?Sized>(
    selection: &str,
    raw: &ArgValue,
    options: &[Choice],
    tree: &T,
) -> Result<Value, ValidationError> {
    let live = live_value(raw, tree);
    if let Some(live) = &live {
        if options.iter().any(|c| &c.value == live) {
            return Ok(live.clone());
        }
    }

    let mut candidates: Vec<&Value> = options
        .iter()
        .filter(|choice| loose_match(raw, choice))
        .map(|choice| &choice.value)
        .collect();
    candidates.sort();
    candidates.dedup();

    match candidates.as_slice() {
        [only] => Ok((*only).clone()),
        [] if live.is_none() => Err(ValidationError::UnresolvedElement {
            selection: selection.to_string(),
            reference: raw.to_string(),
        }),
        [] => Err(ValidationError::InvalidChoice {
            selection: selection.to_string(),
            reason: format!("{raw} is not one of the {} valid choices", options.len()),
        }),
        many => Err(ValidationError::Ambiguous {
            selection: selection.to_string(),
            candidates: many.len(),
        }),
    }
}

fn loose_match(raw: &ArgValue, choice: &Choice) -> bool {
    match (raw, &choice.value) {
        (ArgValue::Int(n), Value::Element(id)) => EntityId::from_i64(*n) == Some(*id),
        (ArgValue::Int(n), Value::Player(p)) => i64::from(p.0) == *n,
        (ArgValue::Text(s), value) => {
            choice.label == *s
                || matches!(value, Value::Text(t) if t.eq_ignore_ascii_case(s))
                || s
                    .parse::<ElementPath>()
                    .is_ok_and(|path| choice.path.as_ref() == Some(&path))
        }
        (ArgValue::Path(path), _) => choice.path.as_ref() == Some(path),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(value: Value, label: &str, path: Option<ElementPath>) -> Choice {
        Choice {
            value,
            label: label.to_string(),
            path,
        }
    }

    struct Tree;

    impl ElementTree for Tree {
        fn element_path(&self, id: EntityId) -> Option<ElementPath> {
            Some(ElementPath::new([0, id.raw()]))
        }

        fn element_at(&self, path: &ElementPath) -> Option<EntityId> {
            match path.indices() {
                [0, id] => Some(EntityId(*id)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_smart_resolve_exact_match() {
        let options = vec![
            choice(Value::Element(EntityId(4)), "Ace", Some(ElementPath::new([0, 4]))),
            choice(Value::Element(EntityId(7)), "King", Some(ElementPath::new([0, 7]))),
        ];
        assert_eq!(
            smart_resolve("card", &ArgValue::Element(EntityId(7)), &options, &Tree),
            Ok(Value::Element(EntityId(7)))
        );
        assert_eq!(
            smart_resolve("card", &ArgValue::Path(ElementPath::new([0, 4])), &options, &Tree),
            Ok(Value::Element(EntityId(4)))
        );
    }

    #[test]
    fn test_smart_resolve_loose_matches() {
        let options = vec![
            choice(Value::Element(EntityId(4)), "Ace", Some(ElementPath::new([0, 4]))),
            choice(Value::Player(PlayerId::new(1)), "Player 1", None),
        ];
        assert_eq!(
            smart_resolve("x", &ArgValue::Int(4), &options, &Tree),
            Ok(Value::Element(EntityId(4)))
        );
        assert_eq!(
            smart_resolve("x", &ArgValue::Int(1), &options, &Tree),
            Ok(Value::Player(PlayerId::new(1)))
        );
        assert_eq!(
            smart_resolve("x", &ArgValue::from("Ace"), &options, &Tree),
            Ok(Value::Element(EntityId(4)))
        );
        assert_eq!(
            smart_resolve("x", &ArgValue::from("0/4"), &options, &Tree),
            Ok(Value::Element(EntityId(4)))
        );
        assert!(matches!(
            smart_resolve("x", &ArgValue::Int(-4), &options, &Tree),
            Err(ValidationError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_smart_resolve_ambiguous_and_invalid() {
        let options = vec![
            choice(Value::Element(EntityId(1)), "Pawn", None),
            choice(Value::Element(EntityId(2)), "Pawn", None),
        ];
        assert_eq!(
            smart_resolve("piece", &ArgValue::from("Pawn"), &options, &Tree),
            Err(ValidationError::Ambiguous {
                selection: "piece".to_string(),
                candidates: 2,
            })
        );
        assert!(matches!(
            smart_resolve("piece", &ArgValue::Int(9), &options, &Tree),
            Err(ValidationError::InvalidChoice { .. })
        ));
        assert!(matches!(
            smart_resolve("piece", &ArgValue::Path(ElementPath::new([5, 5])), &options, &Tree),
            Err(ValidationError::UnresolvedElement { .. })
        ));
    }

    #[test]
    fn test_wire_value_uses_paths() {
        let value = Value::List(vec![Value::Element(EntityId(2)), Value::Int(3)]);
        assert_eq!(
            wire_value(&value, &Tree),
            ArgValue::List(vec![ArgValue::Path(ElementPath::new([0, 2])), ArgValue::Int(3)])
        );
        assert_eq!(live_value(&wire_value(&value, &Tree), &Tree), Some(value));
    }
}
