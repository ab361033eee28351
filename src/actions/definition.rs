//! Action definitions and the fluent builder that produces them.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::selection::{
    RepeatConfig, Selection, SelectionContext, SelectionKind,
};
use crate::core::{Args, DefinitionError, EntityId, PlayerId, Value};

/// What an availability condition can see.
pub struct ConditionContext<'a, G> {
    pub game: &'a G,
    pub player: PlayerId,
}

/// Labeled availability predicate. `Err` carries the reason it failed.
pub type ConditionFn<G> =
    Arc<dyn Fn(&ConditionContext<'_, G>) -> Result<(), String> + Send + Sync>;

/// Applies a fully resolved action to the game.
pub type ExecuteFn<G> = Arc<dyn Fn(&mut G, PlayerId, &Args) -> Result<(), String> + Send + Sync>;

/// A player-triggerable move: labeled conditions, an ordered selection
/// chain and an execute callback.
///
/// Immutable once built. Construct with [`ActionDefinition::builder`].
pub struct ActionDefinition<G> {
    pub name: String,
    pub prompt: String,
    /// Evaluated in declaration order; all must pass.
    pub conditions: Vec<(String, ConditionFn<G>)>,
    pub selections: Vec<Selection<G>>,
    pub execute: ExecuteFn<G>,
    /// Recorded on the serialized action for the host's undo policy.
    pub undoable: bool,
}

impl<G> Clone for ActionDefinition<G> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            prompt: self.prompt.clone(),
            conditions: self.conditions.clone(),
            selections: self.selections.clone(),
            execute: Arc::clone(&self.execute),
            undoable: self.undoable,
        }
    }
}

impl<G> std::fmt::Debug for ActionDefinition<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("name", &self.name)
            .field(
                "conditions",
                &self.conditions.iter().map(|(label, _)| label).collect::<Vec<_>>(),
            )
            .field("selections", &self.selections)
            .field("undoable", &self.undoable)
            .finish()
    }
}

impl<G: 'static> ActionDefinition<G> {
    /// Start building an action.
    pub fn builder(name: impl Into<String>) -> ActionBuilder<G> {
        ActionBuilder::new(name)
    }
}

impl<G> ActionDefinition<G> {
    /// Look up a selection and its position in the chain.
    #[must_use]
    pub fn selection(&self, name: &str) -> Option<(usize, &Selection<G>)> {
        self.selections
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == name)
    }

    #[must_use]
    pub fn selection_index(&self, name: &str) -> Option<usize> {
        self.selection(name).map(|(index, _)| index)
    }

    /// The repeating selection, if the action has one. It is always last.
    #[must_use]
    pub fn repeating_selection(&self) -> Option<&Selection<G>> {
        self.selections.last().filter(|s| s.is_repeating())
    }

    /// Check whether the action needs several inputs or a repeat loop.
    #[must_use]
    pub fn is_multi_step(&self) -> bool {
        self.selections.len() > 1 || self.repeating_selection().is_some()
    }
}

/// Fluent builder for [`ActionDefinition`].
///
/// Selection modifiers (`optional`, `check`, `display`, `depends_on`,
/// repeat options) apply to the most recently added selection.
///
/// ```
/// use rust_tabletop::actions::ActionDefinition;
/// use rust_tabletop::core::Value;
/// use rust_tabletop::games::simple::SimpleGame;
///
/// let bid = ActionDefinition::<SimpleGame>::builder("bid")
///     .prompt("Place a bid")
///     .condition("has life", |ctx| ctx.game.life(ctx.player) > 0)
///     .enter_number("amount", "How much?", Some(1), Some(5))
///     .execute(|_game, _player, args| {
///         assert!(args.int("amount").is_some());
///         Ok(())
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(bid.selections.len(), 1);
/// ```
pub struct ActionBuilder<G> {
    name: String,
    prompt: String,
    conditions: Vec<(String, ConditionFn<G>)>,
    selections: Vec<Selection<G>>,
    execute: Option<ExecuteFn<G>>,
    undoable: bool,
    error: Option<DefinitionError>,
}

impl<G: 'static> ActionBuilder<G> {
    /// Create a builder for an action with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            prompt: name.clone(),
            name,
            conditions: Vec::new(),
            selections: Vec::new(),
            execute: None,
            undoable: true,
            error: None,
        }
    }

    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Add a labeled availability condition.
    #[must_use]
    pub fn condition<F>(self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ConditionContext<'_, G>) -> bool + Send + Sync + 'static,
    {
        let label = label.into();
        let reason = format!("{label} is not satisfied");
        self.condition_with_reason(label, move |ctx| {
            if predicate(ctx) {
                Ok(())
            } else {
                Err(reason.clone())
            }
        })
    }

    /// Add a labeled condition that explains its own failure.
    #[must_use]
    pub fn condition_with_reason<F>(mut self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ConditionContext<'_, G>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.conditions.push((label.into(), Arc::new(predicate)));
        self
    }

    /// Choose one value from a computed list.
    #[must_use]
    pub fn choose_from<F>(self, name: impl Into<String>, prompt: impl Into<String>, choices: F) -> Self
    where
        F: Fn(&SelectionContext<'_, G>) -> Vec<Value> + Send + Sync + 'static,
    {
        self.push(Selection::new(
            name,
            prompt,
            SelectionKind::Choice {
                choices: Arc::new(choices),
            },
        ))
    }

    /// Choose one element.
    #[must_use]
    pub fn choose_element<F>(self, name: impl Into<String>, prompt: impl Into<String>, elements: F) -> Self
    where
        F: Fn(&SelectionContext<'_, G>) -> Vec<EntityId> + Send + Sync + 'static,
    {
        self.push(Selection::new(
            name,
            prompt,
            SelectionKind::Element {
                elements: Arc::new(elements),
            },
        ))
    }

    /// Choose between `min` and `max` distinct elements.
    #[must_use]
    pub fn choose_elements<F>(
        self,
        name: impl Into<String>,
        prompt: impl Into<String>,
        min: usize,
        max: Option<usize>,
        elements: F,
    ) -> Self
    where
        F: Fn(&SelectionContext<'_, G>) -> Vec<EntityId> + Send + Sync + 'static,
    {
        self.push(Selection::new(
            name,
            prompt,
            SelectionKind::Elements {
                elements: Arc::new(elements),
                min,
                max,
            },
        ))
    }

    /// Free text input.
    #[must_use]
    pub fn enter_text(self, name: impl Into<String>, prompt: impl Into<String>) -> Self {
        self.push(Selection::new(
            name,
            prompt,
            SelectionKind::Text {
                min_length: 0,
                max_length: None,
            },
        ))
    }

    /// Integer input. Small bounded ranges are offered as a list.
    #[must_use]
    pub fn enter_number(
        self,
        name: impl Into<String>,
        prompt: impl Into<String>,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Self {
        self.push(Selection::new(name, prompt, SelectionKind::Number { min, max }))
    }

    /// Declare the earlier selections the last selection's filter reads.
    ///
    /// The declaration is checked when the action is built: every name must
    /// be a selection declared before this one. It does not narrow what the
    /// filter sees at runtime; [`SelectionContext::arg`] returns the value of
    /// any earlier selection.
    #[must_use]
    pub fn depends_on(self, names: &[&str]) -> Self {
        self.modify("depends_on", |s| {
            s.depends_on.extend(names.iter().map(|n| (*n).to_string()));
        })
    }

    /// Let the player leave the last selection out.
    #[must_use]
    pub fn optional(self) -> Self {
        self.modify("optional", |s| s.optional = true)
    }

    /// Extra validation on the last selection's value.
    #[must_use]
    pub fn check<F>(self, check: F) -> Self
    where
        F: Fn(&SelectionContext<'_, G>, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.modify("check", |s| s.check = Some(Arc::new(check)))
    }

    /// Display mapping for the last selection's offered values.
    #[must_use]
    pub fn display<F>(self, label: F) -> Self
    where
        F: Fn(&G, &Value) -> String + Send + Sync + 'static,
    {
        self.modify("display", |s| s.label = Some(Arc::new(label)))
    }

    /// Length bounds for the last (text) selection.
    #[must_use]
    pub fn text_length(self, min: usize, max: Option<usize>) -> Self {
        self.modify("text_length", |s| {
            if let SelectionKind::Text {
                min_length,
                max_length,
            } = &mut s.kind
            {
                *min_length = min;
                *max_length = max;
            }
        })
    }

    /// Make the last selection repeat until `until` holds over the values
    /// accepted so far.
    #[must_use]
    pub fn repeat_until<F>(self, until: F) -> Self
    where
        F: Fn(&SelectionContext<'_, G>, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.modify("repeat_until", |s| {
            s.repeat.get_or_insert_with(RepeatConfig::default).until = Some(Arc::new(until));
        })
    }

    /// Make the last selection repeat at most `count` times.
    #[must_use]
    pub fn max_repeats(self, count: usize) -> Self {
        self.modify("max_repeats", |s| {
            s.repeat.get_or_insert_with(RepeatConfig::default).max_repeats = Some(count);
        })
    }

    /// Make the last selection repeat until the player picks `value`.
    #[must_use]
    pub fn terminator(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.modify("terminator", |s| {
            s.repeat.get_or_insert_with(RepeatConfig::default).terminator = Some(value);
        })
    }

    /// Apply `on_each` to the game every time the repeating selection
    /// accepts a value.
    #[must_use]
    pub fn on_each<F>(self, on_each: F) -> Self
    where
        F: Fn(&mut G, PlayerId, &Value) + Send + Sync + 'static,
    {
        self.modify("on_each", |s| {
            s.repeat.get_or_insert_with(RepeatConfig::default).on_each = Some(Arc::new(on_each));
        })
    }

    /// Set the execute callback.
    #[must_use]
    pub fn execute<F>(mut self, execute: F) -> Self
    where
        F: Fn(&mut G, PlayerId, &Args) -> Result<(), String> + Send + Sync + 'static,
    {
        self.execute = Some(Arc::new(execute));
        self
    }

    #[must_use]
    pub fn undoable(mut self, undoable: bool) -> Self {
        self.undoable = undoable;
        self
    }

    fn push(mut self, selection: Selection<G>) -> Self {
        self.selections.push(selection);
        self
    }

    fn modify(mut self, modifier: &'static str, apply: impl FnOnce(&mut Selection<G>)) -> Self {
        match self.selections.last_mut() {
            Some(selection) => apply(selection),
            None => {
                self.error.get_or_insert(DefinitionError::OrphanModifier {
                    action: self.name.clone(),
                    modifier,
                });
            }
        }
        self
    }

    /// Validate and produce the definition.
    pub fn build(self) -> Result<ActionDefinition<G>, DefinitionError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let action = &self.name;
        let mut labels = FxHashSet::default();
        for (label, _) in &self.conditions {
            if !labels.insert(label.as_str()) {
                return Err(DefinitionError::DuplicateCondition {
                    action: action.clone(),
                    label: label.clone(),
                });
            }
        }

        let last = self.selections.len().saturating_sub(1);
        for (index, selection) in self.selections.iter().enumerate() {
            let earlier = &self.selections[..index];
            if earlier.iter().any(|s| s.name == selection.name) {
                return Err(DefinitionError::DuplicateSelection {
                    action: action.clone(),
                    selection: selection.name.clone(),
                });
            }

            for dependency in &selection.depends_on {
                if earlier.iter().any(|s| &s.name == dependency) {
                    continue;
                }
                let declared_later = self.selections[index..]
                    .iter()
                    .any(|s| &s.name == dependency);
                return Err(if declared_later {
                    DefinitionError::ForwardDependency {
                        action: action.clone(),
                        selection: selection.name.clone(),
                        dependency: dependency.clone(),
                    }
                } else {
                    DefinitionError::UnknownDependency {
                        action: action.clone(),
                        selection: selection.name.clone(),
                        dependency: dependency.clone(),
                    }
                });
            }

            check_bounds(action, selection)?;

            if let Some(repeat) = &selection.repeat {
                if index != last {
                    return Err(DefinitionError::RepeatNotLast {
                        action: action.clone(),
                        selection: selection.name.clone(),
                    });
                }
                let invalid = |reason: &str| DefinitionError::InvalidBounds {
                    action: action.clone(),
                    selection: selection.name.clone(),
                    reason: reason.to_string(),
                };
                if matches!(selection.kind, SelectionKind::Elements { .. }) {
                    return Err(invalid("multi-element selections cannot repeat"));
                }
                if repeat.max_repeats == Some(0) {
                    return Err(invalid("max_repeats must be at least 1"));
                }
            }
        }

        let execute = self
            .execute
            .ok_or_else(|| DefinitionError::MissingExecute(self.name.clone()))?;

        Ok(ActionDefinition {
            name: self.name,
            prompt: self.prompt,
            conditions: self.conditions,
            selections: self.selections,
            execute,
            undoable: self.undoable,
        })
    }
}

fn check_bounds<G>(action: &str, selection: &Selection<G>) -> Result<(), DefinitionError> {
    let reason = match &selection.kind {
        SelectionKind::Elements { min, max: Some(max), .. } if min > max => {
            Some(format!("min {min} exceeds max {max}"))
        }
        SelectionKind::Number {
            min: Some(min),
            max: Some(max),
        } if min > max => Some(format!("min {min} exceeds max {max}")),
        SelectionKind::Text {
            min_length,
            max_length: Some(max),
        } if min_length > max => Some(format!("min length {min_length} exceeds max length {max}")),
        _ => None,
    };
    match reason {
        Some(reason) => Err(DefinitionError::InvalidBounds {
            action: action.to_string(),
            selection: selection.name.clone(),
            reason,
        }),
        None => Ok(()),
    }
}
