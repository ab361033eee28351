//! Turn structure of the simple game.
//!
//! ```text
//! rounds (loop while the game is not over)
//! ├── main (phase)
//! │   └── turns (each living player, starting seat rotates per round)
//! │       └── turn (sequence)
//! │           ├── empty-hand (if) → refill (execute)
//! │           └── act (action step; taunt and trash keep the turn open)
//! ├── upkeep-check (switch on round parity)
//! │   ├── 1 → upkeep (phase) → upkeep (simultaneous: heal / mulligan / pass)
//! │   └── _ → rest (execute)
//! └── end-round (execute)
//! ```

use crate::core::{PlayerId, Value};
use crate::flow::{FlowDefinition, FlowNode};
use crate::rules::GameRules;

use super::game::SimpleGame;

type Node = FlowNode<SimpleGame>;

/// Actions offered on a player's turn.
pub const TURN_ACTIONS: [&str; 7] = ["draw", "play", "discard", "tradeCards", "trash", "taunt", "pass"];

/// Actions offered to everyone during upkeep.
pub const UPKEEP_ACTIONS: [&str; 3] = ["heal", "mulligan", "pass"];

/// Actions that leave the turn open for another move.
const FREE_ACTIONS: [&str; 2] = ["taunt", "trash"];

/// The game's full flow.
pub fn flow() -> FlowDefinition<SimpleGame> {
    let turn = Node::sequence([
        Node::if_then(
            |ctx| ctx.player().is_some_and(|p| ctx.game.hand(p).is_empty()),
            Node::execute("refill", |game, scope| {
                if let Some(player) = scope.player() {
                    game.draw(player);
                }
            }),
        )
        .named("empty-hand")
        .into(),
        Node::action_step("act", TURN_ACTIONS)
            .prompt("Your move")
            .repeat_until(|_, moves| {
                moves
                    .last()
                    .is_some_and(|m| !FREE_ACTIONS.contains(&m.name.as_str()))
            })
            .into(),
    ])
    .named("turn");

    let main = Node::phase(
        "main",
        Node::each_player(turn)
            .starting_with(|ctx| {
                let seat = ctx.game.round() as usize % ctx.game.player_count();
                PlayerId::new(seat as u8)
            })
            .named("turns"),
    );

    let upkeep = Node::switch(|ctx| Value::Int(i64::from(ctx.game.round() % 2)))
        .case(
            1i64,
            Node::phase(
                "upkeep",
                Node::simultaneous("upkeep", UPKEEP_ACTIONS).prompt("Heal, mulligan or pass"),
            ),
        )
        .default(Node::execute("rest", |_, _| {}))
        .named("upkeep-check");

    let round = Node::sequence([
        main.into(),
        upkeep.into(),
        Node::execute("end-round", |game, _| game.next_round()).into(),
    ])
    .named("round");

    FlowDefinition::new(Node::loop_while(|ctx| !ctx.game.is_over(), round).named("rounds"))
        .complete_when(|game| game.alive_players().len() <= 1)
        .winners(SimpleGame::leaders)
}
