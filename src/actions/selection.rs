//! Selections: the input steps of an action.
//!
//! A selection is one thing a player must pick before an action can run:
//! an entry from a list, one element, several elements, free text or a
//! number. Its valid values are computed by a filter that sees the values of
//! the selections declared before it (the *dependent filter*), so "pick a
//! card, then pick a space that card can move to" is expressed directly.

use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::board::ElementPath;
use crate::core::{Args, EngineConfig, EntityId, PlayerId, Value};
use crate::rules::GameRules;

/// What a selection filter can see.
pub struct SelectionContext<'a, G> {
    /// Current game state.
    pub game: &'a G,
    /// The player making the selection.
    pub player: PlayerId,
    /// Values of earlier selections in the same action.
    pub args: &'a Args,
    /// Values already accumulated by a repeating selection.
    pub repeated: &'a [Value],
}

impl<'a, G> SelectionContext<'a, G> {
    /// Create a context with no repeated values.
    pub fn new(game: &'a G, player: PlayerId, args: &'a Args) -> Self {
        Self {
            game,
            player,
            args,
            repeated: &[],
        }
    }

    /// Value of an earlier selection, declared in `depends_on` or not.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Element chosen by an earlier selection.
    #[must_use]
    pub fn element(&self, name: &str) -> Option<EntityId> {
        self.args.element(name)
    }

    /// Number entered by an earlier selection.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.args.int(name)
    }

    /// Player chosen by an earlier selection.
    #[must_use]
    pub fn chosen_player(&self, name: &str) -> Option<PlayerId> {
        self.args.player(name)
    }
}

/// Computes the values offered by a choice selection.
pub type ChoicesFn<G> = Arc<dyn Fn(&SelectionContext<'_, G>) -> Vec<Value> + Send + Sync>;
/// Computes the elements offered by an element selection.
pub type ElementsFn<G> = Arc<dyn Fn(&SelectionContext<'_, G>) -> Vec<EntityId> + Send + Sync>;
/// Extra validation of a complete selection value.
pub type CheckFn<G> =
    Arc<dyn Fn(&SelectionContext<'_, G>, &Value) -> Result<(), String> + Send + Sync>;
/// Display label for an offered value.
pub type LabelFn<G> = Arc<dyn Fn(&G, &Value) -> String + Send + Sync>;
/// Stop condition of a repeating selection, given everything accumulated.
pub type UntilFn<G> = Arc<dyn Fn(&SelectionContext<'_, G>, &[Value]) -> bool + Send + Sync>;
/// Side effect applied each time a repeating selection accepts a value.
pub type OnEachFn<G> = Arc<dyn Fn(&mut G, PlayerId, &Value) + Send + Sync>;

/// The kind of input a selection asks for, with its constraints.
pub enum SelectionKind<G> {
    /// One value from a computed list.
    Choice { choices: ChoicesFn<G> },
    /// One element of the tree.
    Element { elements: ElementsFn<G> },
    /// Between `min` and `max` distinct elements.
    Elements {
        elements: ElementsFn<G>,
        min: usize,
        max: Option<usize>,
    },
    /// Free text.
    Text {
        min_length: usize,
        max_length: Option<usize>,
    },
    /// An integer, optionally bounded.
    Number { min: Option<i64>, max: Option<i64> },
}

impl<G> Clone for SelectionKind<G> {
    fn clone(&self) -> Self {
        match self {
            Self::Choice { choices } => Self::Choice {
                choices: Arc::clone(choices),
            },
            Self::Element { elements } => Self::Element {
                elements: Arc::clone(elements),
            },
            Self::Elements { elements, min, max } => Self::Elements {
                elements: Arc::clone(elements),
                min: *min,
                max: *max,
            },
            Self::Text {
                min_length,
                max_length,
            } => Self::Text {
                min_length: *min_length,
                max_length: *max_length,
            },
            Self::Number { min, max } => Self::Number {
                min: *min,
                max: *max,
            },
        }
    }
}

impl<G> SelectionKind<G> {
    /// Serializable tag for this kind.
    #[must_use]
    pub fn selection_type(&self) -> SelectionType {
        match self {
            Self::Choice { .. } => SelectionType::Choice,
            Self::Element { .. } => SelectionType::Element,
            Self::Elements { .. } => SelectionType::Elements,
            Self::Text { .. } => SelectionType::Text,
            Self::Number { .. } => SelectionType::Number,
        }
    }
}

/// Selection kind tag, for clients and traces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionType {
    Choice,
    Element,
    Elements,
    Text,
    Number,
}

/// Repeat policy for the last selection of an action.
///
/// The selection keeps accepting values until one of these fires:
/// the player picks `terminator`, `until` holds over the accumulated values,
/// `max_repeats` values have been accepted, or no further value is valid.
pub struct RepeatConfig<G> {
    pub until: Option<UntilFn<G>>,
    pub max_repeats: Option<usize>,
    pub terminator: Option<Value>,
    pub on_each: Option<OnEachFn<G>>,
}

impl<G> Default for RepeatConfig<G> {
    fn default() -> Self {
        Self {
            until: None,
            max_repeats: None,
            terminator: None,
            on_each: None,
        }
    }
}

impl<G> Clone for RepeatConfig<G> {
    fn clone(&self) -> Self {
        Self {
            until: self.until.clone(),
            max_repeats: self.max_repeats,
            terminator: self.terminator.clone(),
            on_each: self.on_each.clone(),
        }
    }
}

impl<G> std::fmt::Debug for RepeatConfig<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepeatConfig")
            .field("has_until", &self.until.is_some())
            .field("max_repeats", &self.max_repeats)
            .field("terminator", &self.terminator)
            .field("has_on_each", &self.on_each.is_some())
            .finish()
    }
}

/// One input step of an action.
pub struct Selection<G> {
    pub name: String,
    pub prompt: String,
    pub kind: SelectionKind<G>,
    /// The player may leave this selection out.
    pub optional: bool,
    /// Earlier selections the filter reads.
    pub depends_on: Vec<String>,
    pub check: Option<CheckFn<G>>,
    pub label: Option<LabelFn<G>>,
    pub repeat: Option<RepeatConfig<G>>,
}

impl<G> Clone for Selection<G> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            prompt: self.prompt.clone(),
            kind: self.kind.clone(),
            optional: self.optional,
            depends_on: self.depends_on.clone(),
            check: self.check.clone(),
            label: self.label.clone(),
            repeat: self.repeat.clone(),
        }
    }
}

impl<G> std::fmt::Debug for Selection<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("name", &self.name)
            .field("type", &self.kind.selection_type())
            .field("optional", &self.optional)
            .field("depends_on", &self.depends_on)
            .field("repeat", &self.repeat)
            .finish_non_exhaustive()
    }
}

impl<G> Selection<G> {
    /// Create a selection of the given kind.
    pub fn new(name: impl Into<String>, prompt: impl Into<String>, kind: SelectionKind<G>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            kind,
            optional: false,
            depends_on: Vec::new(),
            check: None,
            label: None,
            repeat: None,
        }
    }

    #[must_use]
    pub fn selection_type(&self) -> SelectionType {
        self.kind.selection_type()
    }

    /// Check if this selection repeats until a stop condition.
    #[must_use]
    pub fn is_repeating(&self) -> bool {
        self.repeat.is_some()
    }

    /// Check if the valid values can be listed up front.
    #[must_use]
    pub fn is_free_input(&self, config: &EngineConfig) -> bool {
        match &self.kind {
            SelectionKind::Text { .. } => true,
            SelectionKind::Number { min, max } => enumerable_range(*min, *max, config).is_none(),
            _ => false,
        }
    }
}

/// `Some((lo, hi))` if the range is small enough to list as choices.
fn enumerable_range(min: Option<i64>, max: Option<i64>, config: &EngineConfig) -> Option<(i64, i64)> {
    let (lo, hi) = (min?, max?);
    let width = hi.checked_sub(lo)?;
    let width = usize::try_from(width).ok()?;
    (width < config.max_enumerated_numbers).then_some((lo, hi))
}

/// A value offered to the player.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    pub value: Value,
    pub label: String,
    /// Stable reference for element choices.
    pub path: Option<ElementPath>,
}

/// The valid values of a selection at one point of an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceSet {
    /// An explicit list.
    Options(Vec<Choice>),
    /// Any value meeting the selection's constraints.
    Free,
}

impl ChoiceSet {
    /// True when an explicit list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Options(options) if options.is_empty())
    }

    /// Number of listed options (0 for free input).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Options(options) => options.len(),
            Self::Free => 0,
        }
    }

    #[must_use]
    pub fn options(&self) -> &[Choice] {
        match self {
            Self::Options(options) => options,
            Self::Free => &[],
        }
    }

    /// Offered values, in order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.options().iter().map(|c| &c.value)
    }

    /// Check whether a value is listed.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.values().any(|v| v == value)
    }
}

impl<G: GameRules> Selection<G> {
    /// Label shown for an offered value.
    pub fn label_for(&self, game: &G, value: &Value) -> String {
        if let Some(label) = &self.label {
            return label(game, value);
        }
        match value {
            Value::Element(id) => game.element_label(*id),
            other => other.to_string(),
        }
    }

    fn choice(&self, game: &G, value: Value) -> Choice {
        let path = value.as_element().and_then(|id| game.element_path(id));
        Choice {
            label: self.label_for(game, &value),
            path,
            value,
        }
    }

    /// Offered values before any lookahead.
    ///
    /// For single-value kinds the custom check already filters the list.
    /// For multi-element selections the list holds the candidate elements;
    /// the check applies to the chosen subset instead.
    pub fn raw_choices(&self, ctx: &SelectionContext<'_, G>, config: &EngineConfig) -> ChoiceSet {
        let offered: Vec<Value> = match &self.kind {
            SelectionKind::Choice { choices } => choices(ctx),
            SelectionKind::Element { elements } => {
                elements(ctx).into_iter().map(Value::Element).collect()
            }
            SelectionKind::Elements { elements, .. } => {
                return ChoiceSet::Options(
                    elements(ctx)
                        .into_iter()
                        .unique()
                        .map(|id| self.choice(ctx.game, Value::Element(id)))
                        .collect(),
                );
            }
            SelectionKind::Number { min, max } => match enumerable_range(*min, *max, config) {
                Some((lo, hi)) => (lo..=hi).map(Value::Int).collect(),
                None => return ChoiceSet::Free,
            },
            SelectionKind::Text { .. } => return ChoiceSet::Free,
        };

        ChoiceSet::Options(
            offered
                .into_iter()
                .filter(|v| self.passes_check(ctx, v))
                .map(|v| self.choice(ctx.game, v))
                .collect(),
        )
    }

    /// Offered values of a repeating selection, without the values it has
    /// already accumulated.
    pub fn repeat_choices(&self, ctx: &SelectionContext<'_, G>, config: &EngineConfig) -> ChoiceSet {
        match self.raw_choices(ctx, config) {
            ChoiceSet::Options(options) => ChoiceSet::Options(
                options
                    .into_iter()
                    .filter(|choice| !ctx.repeated.contains(&choice.value))
                    .collect(),
            ),
            ChoiceSet::Free => ChoiceSet::Free,
        }
    }

    /// Run the custom check, if any.
    pub fn passes_check(&self, ctx: &SelectionContext<'_, G>, value: &Value) -> bool {
        self.run_check(ctx, value).is_ok()
    }

    pub(crate) fn run_check(&self, ctx: &SelectionContext<'_, G>, value: &Value) -> Result<(), String> {
        match &self.check {
            Some(check) => check(ctx, value),
            None => Ok(()),
        }
    }

    /// Validate a value against the kind's own constraints (not the offered list).
    pub(crate) fn check_constraints(&self, value: &Value) -> Result<(), String> {
        match (&self.kind, value) {
            (SelectionKind::Text { min_length, max_length }, Value::Text(text)) => {
                let len = text.chars().count();
                if len < *min_length {
                    return Err(format!("must be at least {min_length} characters"));
                }
                if let Some(max) = max_length {
                    if len > *max {
                        return Err(format!("must be at most {max} characters"));
                    }
                }
                Ok(())
            }
            (SelectionKind::Text { .. }, _) => Err("expected text".to_string()),
            (SelectionKind::Number { min, max }, Value::Int(n)) => {
                if min.is_some_and(|lo| *n < lo) || max.is_some_and(|hi| *n > hi) {
                    return Err(format!(
                        "{n} is outside {}..={}",
                        min.map_or("-inf".to_string(), |v| v.to_string()),
                        max.map_or("inf".to_string(), |v| v.to_string())
                    ));
                }
                Ok(())
            }
            (SelectionKind::Number { .. }, _) => Err("expected a number".to_string()),
            (SelectionKind::Elements { min, max, .. }, Value::List(items)) => {
                if items.len() < *min {
                    return Err(format!("choose at least {min}"));
                }
                if let Some(max) = max {
                    if items.len() > *max {
                        return Err(format!("choose at most {max}"));
                    }
                }
                Ok(())
            }
            (SelectionKind::Elements { .. }, _) => Err("expected a list of elements".to_string()),
            _ => Ok(()),
        }
    }
}
