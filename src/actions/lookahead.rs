//! Selection-path search.
//!
//! An action is available only if some complete assignment of its
//! selections passes validation. `PathSearch` answers that question
//! depth-first from any prefix of chosen values, memoizing on
//! `(selection index, prefix signature)` and stopping after a fixed number
//! of visited nodes.
//!
//! ## Rules
//!
//! - Free inputs (text, wide numeric ranges) are satisfiable; later filters
//!   see them as absent.
//! - Optional selections may be skipped.
//! - A repeating selection needs one valid value.
//! - Multi-element selections try subsets up to `max_subset_size` (or `min`
//!   if larger) when a custom check or a later selection can observe them.
//! - When the budget runs out the search answers `true`.

use itertools::Itertools;
use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use super::definition::ActionDefinition;
use super::selection::{ChoiceSet, Selection, SelectionContext, SelectionKind};
use crate::core::{Args, EngineConfig, PlayerId, Value};
use crate::rules::GameRules;

/// Depth-first search for a complete selection path.
pub struct PathSearch<'a, G> {
    definition: &'a ActionDefinition<G>,
    game: &'a G,
    player: PlayerId,
    config: &'a EngineConfig,
    memo: FxHashMap<(usize, u64), bool>,
    visited: usize,
    exhausted: bool,
}

impl<'a, G: GameRules> PathSearch<'a, G> {
    /// Create a search for one availability check.
    pub fn new(
        definition: &'a ActionDefinition<G>,
        game: &'a G,
        player: PlayerId,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            definition,
            game,
            player,
            config,
            memo: FxHashMap::default(),
            visited: 0,
            exhausted: false,
        }
    }

    /// The budget ran out at least once.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// Check whether selections `index..` can be completed after `args`.
    pub fn completes_from(&mut self, index: usize, args: &Args) -> bool {
        let mut scratch = args.clone();
        self.completes(index, &mut scratch)
    }

    /// Check whether choosing `value` for selection `index` still leads to a
    /// complete action.
    pub fn completes_with(&mut self, index: usize, args: &Args, value: Value) -> bool {
        let definition = self.definition;
        let Some(selection) = definition.selections.get(index) else {
            return false;
        };
        let mut scratch = args.clone();
        scratch.insert(selection.name.clone(), value);
        self.completes(index + 1, &mut scratch)
    }

    fn spend(&mut self) -> bool {
        if self.visited >= self.config.lookahead_budget {
            if !self.exhausted {
                warn!(
                    action = %self.definition.name,
                    player = %self.player,
                    budget = self.config.lookahead_budget,
                    "lookahead budget exhausted; treating action as available"
                );
                self.exhausted = true;
            }
            return false;
        }
        self.visited += 1;
        true
    }

    fn completes(&mut self, index: usize, args: &mut Args) -> bool {
        let definition = self.definition;
        let Some(selection) = definition.selections.get(index) else {
            return true;
        };

        let key = (index, args.signature());
        if let Some(&known) = self.memo.get(&key) {
            return known;
        }
        if !self.spend() {
            return true;
        }

        let found = (selection.optional && self.completes(index + 1, args))
            || self.satisfiable(index, selection, args);

        if !found {
            trace!(
                action = %definition.name,
                selection = %selection.name,
                "no complete path from this prefix"
            );
        }
        self.memo.insert(key, found);
        found
    }

    fn satisfiable(&mut self, index: usize, selection: &Selection<G>, args: &mut Args) -> bool {
        if selection.is_free_input(self.config) {
            return self.completes(index + 1, args);
        }

        let options = {
            let ctx = SelectionContext::new(self.game, self.player, args);
            selection.raw_choices(&ctx, self.config)
        };
        let ChoiceSet::Options(options) = options else {
            return self.completes(index + 1, args);
        };

        if selection.is_repeating() {
            return !options.is_empty();
        }

        let values: Vec<Value> = options.into_iter().map(|c| c.value).collect();
        match &selection.kind {
            SelectionKind::Elements { min, max, .. } => {
                self.any_subset(index, selection, values, *min, *max, args)
            }
            _ => self.any_value(index, selection, values, args),
        }
    }

    fn any_value(
        &mut self,
        index: usize,
        selection: &Selection<G>,
        values: Vec<Value>,
        args: &mut Args,
    ) -> bool {
        if index + 1 == self.definition.selections.len() {
            return !values.is_empty();
        }
        for value in values {
            if self.try_value(index, selection, value, args) {
                return true;
            }
            if self.exhausted {
                return true;
            }
        }
        false
    }

    fn any_subset(
        &mut self,
        index: usize,
        selection: &Selection<G>,
        candidates: Vec<Value>,
        min: usize,
        max: Option<usize>,
        args: &mut Args,
    ) -> bool {
        if candidates.len() < min {
            return false;
        }
        let is_last = index + 1 == self.definition.selections.len();
        if is_last && selection.check.is_none() {
            return true;
        }

        let upper = max
            .unwrap_or(candidates.len())
            .min(candidates.len())
            .min(self.config.max_subset_size.max(min));

        for size in min..=upper {
            for subset in candidates.iter().cloned().combinations(size) {
                if !self.spend() {
                    return true;
                }
                let value = Value::List(subset);
                let passes = {
                    let ctx = SelectionContext::new(self.game, self.player, args);
                    selection.passes_check(&ctx, &value)
                };
                if !passes {
                    continue;
                }
                if is_last || self.try_value(index, selection, value, args) {
                    return true;
                }
            }
        }
        false
    }

    fn try_value(&mut self, index: usize, selection: &Selection<G>, value: Value, args: &mut Args) -> bool {
        let previous = args.insert(selection.name.clone(), value);
        let found = self.completes(index + 1, args);
        match previous {
            Some(previous) => {
                args.insert(selection.name.clone(), previous);
            }
            None => {
                args.remove(&selection.name);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, ElementPath, ElementTree};
    use crate::core::EntityId;

    struct Game {
        board: Board,
        hand: Vec<EntityId>,
    }

    impl ElementTree for Game {
        fn element_path(&self, id: EntityId) -> Option<ElementPath> {
            self.board.element_path(id)
        }

        fn element_at(&self, path: &ElementPath) -> Option<EntityId> {
            self.board.element_at(path)
        }
    }

    impl GameRules for Game {
        fn player_count(&self) -> usize {
            2
        }
    }

    fn game(cards: usize) -> Game {
        let mut board = Board::new(3);
        let hand_zone = board.add_zone("hand", None);
        let hand = (0..cards)
            .map(|i| board.create(hand_zone, format!("card {i}")))
            .collect();
        Game { board, hand }
    }

    fn trade() -> ActionDefinition<Game> {
        ActionDefinition::<Game>::builder("trade")
            .choose_element("card", "Card", |ctx| ctx.game.hand.clone())
            .choose_from("target", "Target", |ctx| {
                PlayerId::all(2)
                    .filter(|p| *p != ctx.player)
                    .map(Value::Player)
                    .collect()
            })
            .execute(|_, _, _| Ok(()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_later_choices_do_not_make_action_available() {
        let def = trade();
        let config = EngineConfig::default();

        let empty = game(0);
        let mut search = PathSearch::new(&def, &empty, PlayerId::new(0), &config);
        assert!(!search.completes_from(0, &Args::new()));

        let full = game(2);
        let mut search = PathSearch::new(&def, &full, PlayerId::new(0), &config);
        assert!(search.completes_from(0, &Args::new()));
    }

    #[test]
    fn test_dependent_dead_end() {
        // The second selection offers only cards other than the first, so a
        // one-card hand can never complete.
        let def = ActionDefinition::<Game>::builder("swap")
            .choose_element("a", "First", |ctx| ctx.game.hand.clone())
            .choose_element("b", "Second", |ctx| {
                let first = ctx.element("a");
                ctx.game.hand.iter().copied().filter(|id| Some(*id) != first).collect()
            })
            .depends_on(&["a"])
            .execute(|_, _, _| Ok(()))
            .build()
            .unwrap();
        let config = EngineConfig::default();

        let one = game(1);
        let mut search = PathSearch::new(&def, &one, PlayerId::new(0), &config);
        assert!(!search.completes_from(0, &Args::new()));

        let two = game(2);
        let mut search = PathSearch::new(&def, &two, PlayerId::new(0), &config);
        assert!(search.completes_from(0, &Args::new()));
        assert!(search.completes_with(0, &Args::new(), Value::Element(two.hand[0])));
    }

    #[test]
    fn test_subset_check_is_searched() {
        let def = ActionDefinition::<Game>::builder("pair")
            .choose_elements("cards", "Two cards", 2, Some(2), |ctx| ctx.game.hand.clone())
            .check(|_, v| {
                let ids = v.elements();
                if ids.iter().map(|id| id.raw()).sum::<u32>() % 2 == 0 {
                    Ok(())
                } else {
                    Err("sum must be even".to_string())
                }
            })
            .execute(|_, _, _| Ok(()))
            .build()
            .unwrap();
        let config = EngineConfig::default();

        // Ids 1 and 2 sum to 3.
        let two = game(2);
        let mut search = PathSearch::new(&def, &two, PlayerId::new(0), &config);
        assert!(!search.completes_from(0, &Args::new()));

        // Ids 1 and 3 sum to 4.
        let three = game(3);
        let mut search = PathSearch::new(&def, &three, PlayerId::new(0), &config);
        assert!(search.completes_from(0, &Args::new()));
    }

    #[test]
    fn test_budget_exhaustion_is_optimistic() {
        let def = trade();
        let config = EngineConfig::default().with_lookahead_budget(0);
        let empty = game(0);

        let mut search = PathSearch::new(&def, &empty, PlayerId::new(0), &config);
        assert!(search.completes_from(0, &Args::new()));
        assert!(search.exhausted());
    }

    #[test]
    fn test_optional_selection_can_be_skipped() {
        let def = ActionDefinition::<Game>::builder("maybe")
            .choose_element("card", "Card", |ctx| ctx.game.hand.clone())
            .optional()
            .execute(|_, _, _| Ok(()))
            .build()
            .unwrap();
        let config = EngineConfig::default();
        let empty = game(0);

        let mut search = PathSearch::new(&def, &empty, PlayerId::new(0), &config);
        assert!(search.completes_from(0, &Args::new()));
    }
}
