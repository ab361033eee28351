//! Actions of the simple game.
//!
//! | Action | Selections |
//! |---|---|
//! | `draw` | none; needs a non-empty deck |
//! | `play` | `card` from hand, then `target`: a living opponent |
//! | `discard` | `card` from hand |
//! | `tradeCards` | `myCard` from hand, then `targetPlayer`: another player |
//! | `trash` | `cards`, repeating: one card from hand at a time until `"done"` |
//! | `taunt` | `message`: free text |
//! | `pass` | none |
//! | `heal` | `amount`: 1 to 3 |
//! | `mulligan` | `cards`: one or two cards from hand |

use crate::actions::{ActionDefinition, ActionRegistry};
use crate::board::ElementTree;
use crate::core::{DefinitionError, EntityId, PlayerId, Value};
use crate::rules::GameRules;

use super::game::SimpleGame;

type Action = ActionDefinition<SimpleGame>;

fn hand_of(game: &SimpleGame, player: PlayerId) -> Vec<EntityId> {
    game.hand(player).to_vec()
}

fn card_label(game: &SimpleGame, value: &Value) -> String {
    match value.as_element() {
        Some(card) => format!("{} ({})", game.element_label(card), game.power(card)),
        None => value.to_string(),
    }
}

/// Every action of the game, registered.
pub fn registry() -> Result<ActionRegistry<SimpleGame>, DefinitionError> {
    let mut registry = ActionRegistry::new();
    registry.register_all([
        draw()?,
        play()?,
        discard()?,
        trade_cards()?,
        trash()?,
        taunt()?,
        pass()?,
        heal()?,
        mulligan()?,
    ])?;
    Ok(registry)
}

pub fn draw() -> Result<Action, DefinitionError> {
    Action::builder("draw")
        .prompt("Draw a card")
        .condition("deck not empty", |ctx| ctx.game.deck_size(ctx.player) > 0)
        .execute(|game, player, _| {
            game.draw(player).map(|_| ()).ok_or_else(|| "deck is empty".to_string())
        })
        .build()
}

pub fn play() -> Result<Action, DefinitionError> {
    Action::builder("play")
        .prompt("Play a card against an opponent")
        .choose_element("card", "Choose a card to play", |ctx| hand_of(ctx.game, ctx.player))
        .display(card_label)
        .choose_from("target", "Choose a target", |ctx| {
            ctx.game
                .alive_players()
                .into_iter()
                .filter(|&p| p != ctx.player)
                .map(Value::Player)
                .collect()
        })
        .execute(|game, player, args| {
            let card = args.element("card").ok_or("missing card")?;
            let target = args.player("target").ok_or("missing target")?;
            let damage = game.power(card);
            game.discard(player, card)?;
            game.deal_damage(target, damage);
            Ok(())
        })
        .build()
}

pub fn discard() -> Result<Action, DefinitionError> {
    Action::builder("discard")
        .prompt("Discard a card")
        .choose_element("card", "Choose a card to discard", |ctx| hand_of(ctx.game, ctx.player))
        .display(card_label)
        .execute(|game, player, args| {
            let card = args.element("card").ok_or("missing card")?;
            game.discard(player, card)
        })
        .build()
}

/// Trading needs a card to give; the target list alone never makes the
/// action available.
pub fn trade_cards() -> Result<Action, DefinitionError> {
    Action::builder("tradeCards")
        .prompt("Trade a card with another player")
        .choose_element("myCard", "Choose a card to give", |ctx| hand_of(ctx.game, ctx.player))
        .display(card_label)
        .choose_from("targetPlayer", "Choose who to trade with", |ctx| {
            PlayerId::all(ctx.game.player_count())
                .filter(|&p| p != ctx.player)
                .map(Value::Player)
                .collect()
        })
        .depends_on(&["myCard"])
        .execute(|game, player, args| {
            let card = args.element("myCard").ok_or("missing card")?;
            let target = args.player("targetPlayer").ok_or("missing target")?;
            game.trade(player, target, card)
        })
        .build()
}

pub fn trash() -> Result<Action, DefinitionError> {
    Action::builder("trash")
        .prompt("Trash cards from your hand")
        .condition("has two cards", |ctx| ctx.game.hand(ctx.player).len() >= 2)
        .choose_from("cards", "Choose a card to trash, or done", |ctx| {
            ctx.game
                .hand(ctx.player)
                .iter()
                .copied()
                .map(Value::Element)
                .collect()
        })
        .display(card_label)
        .terminator("done")
        .max_repeats(3)
        .on_each(|game, player, value| {
            if let Some(card) = value.as_element() {
                game.trash_card(player, card);
            }
        })
        .execute(|game, player, args| {
            let count = args.get("cards").and_then(Value::as_list).map_or(0, <[Value]>::len);
            game.record(format!("{player} trashed {count} card(s)"));
            Ok(())
        })
        .undoable(false)
        .build()
}

pub fn taunt() -> Result<Action, DefinitionError> {
    Action::builder("taunt")
        .prompt("Say something")
        .enter_text("message", "Message")
        .text_length(1, Some(40))
        .execute(|game, player, args| {
            let message = args.text("message").unwrap_or_default();
            game.record(format!("{player}: {message}"));
            Ok(())
        })
        .build()
}

pub fn pass() -> Result<Action, DefinitionError> {
    Action::builder("pass")
        .prompt("End your turn")
        .execute(|_, _, _| Ok(()))
        .build()
}

pub fn heal() -> Result<Action, DefinitionError> {
    Action::builder("heal")
        .prompt("Recover some life")
        .enter_number("amount", "How much?", Some(1), Some(3))
        .execute(|game, player, args| {
            let amount = args.int("amount").ok_or("missing amount")?;
            game.gain_life(player, amount);
            Ok(())
        })
        .build()
}

/// Put one or two cards at the bottom of the deck and draw as many.
pub fn mulligan() -> Result<Action, DefinitionError> {
    Action::builder("mulligan")
        .prompt("Replace cards from your hand")
        .choose_elements("cards", "Choose cards to replace", 1, Some(2), |ctx| {
            hand_of(ctx.game, ctx.player)
        })
        .display(card_label)
        .execute(|game, player, args| {
            let cards = args.elements("cards");
            for &card in &cards {
                game.tuck(player, card);
            }
            for _ in &cards {
                game.draw(player);
            }
            Ok(())
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionExecutor, ChoiceSet};
    use crate::core::{Args, EngineConfig};
    use crate::games::simple::SimpleGameBuilder;

    #[test]
    fn test_registry_has_every_action() {
        let registry = registry().unwrap();
        assert_eq!(registry.len(), 9);
        assert!(registry.contains("tradeCards"));
    }

    #[test]
    fn test_draw_unavailable_on_empty_deck() {
        let game = SimpleGameBuilder::new().cards_per_player(3).build(1);
        let config = EngineConfig::default();
        let executor = ActionExecutor::new(&config);
        assert!(!executor.is_action_available(&draw().unwrap(), &game, PlayerId::new(0)));
    }

    #[test]
    fn test_trade_targets_exclude_self() {
        let game = SimpleGameBuilder::new().player_count(3).build(1);
        let config = EngineConfig::default();
        let executor = ActionExecutor::new(&config);
        let trade = trade_cards().unwrap();
        let player = PlayerId::new(1);
        let prior = Args::new().with("myCard", game.hand(player)[0]);

        let choices = executor
            .get_choices(&trade, "targetPlayer", &game, player, &prior)
            .unwrap();
        let targets: Vec<_> = choices.values().cloned().collect();
        assert_eq!(
            targets,
            vec![Value::Player(PlayerId::new(0)), Value::Player(PlayerId::new(2))]
        );
    }

    #[test]
    fn test_heal_offers_enumerated_amounts() {
        let game = SimpleGameBuilder::new().build(1);
        let config = EngineConfig::default();
        let executor = ActionExecutor::new(&config);
        let choices = executor
            .get_choices(&heal().unwrap(), "amount", &game, PlayerId::new(0), &Args::new())
            .unwrap();
        assert!(matches!(choices, ChoiceSet::Options(_)));
        assert_eq!(choices.len(), 3);
    }
}
