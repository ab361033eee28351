//! Session tests.
//!
//! These tests drive the simple game through the `Session` facade: one-shot
//! actions, step-by-step selections, repeating selections, history replay
//! and game completion.

mod common;

use std::sync::Arc;

use common::{args, started, tally_registry, Tally, P0, P1};
use rust_tabletop::actions::ActionExecutor;
use rust_tabletop::core::{ArgValue, Args, DefinitionError, EngineConfig, PlayerId, ValidationError, Value};
use rust_tabletop::flow::{FlowDefinition, FlowNode};
use rust_tabletop::games::simple::{self, SimpleGameBuilder, TURN_ACTIONS};
use rust_tabletop::{ChoiceSet, PendingActionState, SelectionContext, Session, StepOutcome};

fn element(value: &Value) -> ArgValue {
    ArgValue::Element(value.as_element().unwrap())
}

/// A hand of three cards offers three discards; discarding one leaves two
/// and hands the turn to the next player.
#[test]
fn test_discard_from_hand() {
    let mut session = started(SimpleGameBuilder::new(), 42);

    let state = session.flow_state();
    assert!(state.awaiting_input);
    assert_eq!(state.current_player, Some(P0));
    assert_eq!(state.phase.as_deref(), Some("main"));
    assert_eq!(state.available_actions, TURN_ACTIONS.map(String::from).to_vec());

    let choices = session.get_choices("discard", "card", P0, &Default::default()).unwrap();
    assert_eq!(choices.len(), 3);

    let card = choices.options()[1].value.clone();
    let result = session
        .perform_action("discard", P0, &args([("card", element(&card))]))
        .unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(session.game().hand(P0).len(), 2);
    assert!(!session.game().hand(P0).contains(&card.as_element().unwrap()));
    assert_eq!(session.game().discard_size(P0), 1);

    let state = session.flow_state();
    assert!(state.awaiting_input);
    assert_eq!(state.current_player, Some(P1));
    assert_eq!(result.state.as_ref(), Some(&state));
}

/// With an empty hand the trade target list alone does not make the action
/// available.
#[test]
fn test_trade_unavailable_with_empty_hand() {
    let session = started(
        SimpleGameBuilder::new().cards_per_player(0).starting_hand_size(0),
        3,
    );
    assert_eq!(session.available_actions(P0), vec!["taunt".to_string(), "pass".to_string()]);

    let trade = session.registry().get("tradeCards").unwrap();
    let config = EngineConfig::default();
    let executor = ActionExecutor::new(&config);
    assert!(!executor.is_action_available(trade, session.game(), P0));

    let (_, target) = trade.selection("targetPlayer").unwrap();
    let empty = Args::new();
    let ctx = SelectionContext::new(session.game(), P0, &empty);
    assert_eq!(target.raw_choices(&ctx, &config).len(), 1);
}

#[test]
fn test_trade_without_args_is_rejected() {
    let mut session = started(
        SimpleGameBuilder::new().cards_per_player(0).starting_hand_size(0),
        3,
    );
    let result = session.perform_action("tradeCards", P0, &Default::default()).unwrap();
    assert!(!result.success);
    assert!(session.history().is_empty());
    assert_eq!(session.flow_state().current_player, Some(P0));
}

#[test]
fn test_wrong_player_is_rejected() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    let card = session.game().hand(P1)[0];

    let result = session
        .perform_action("discard", P1, &args([("card", ArgValue::Element(card))]))
        .unwrap();
    assert_eq!(result.error, Some(ValidationError::NotYourTurn { player: P1 }));
    assert!(result.state.unwrap().action_error.is_some());
    assert_eq!(session.game().hand(P1).len(), 3);
}

#[test]
fn test_action_outside_step_is_rejected() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    let result = session
        .perform_action("heal", P0, &args([("amount", ArgValue::Int(2))]))
        .unwrap();
    assert_eq!(
        result.error,
        Some(ValidationError::NotAllowedHere {
            action: "heal".to_string()
        })
    );
    assert_eq!(session.game().life(P0), 20);
}

/// Playing a card one selection at a time.
#[test]
fn test_play_step_by_step() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    let card = session.game().hand(P0)[0];
    let damage = session.game().power(card);

    let outcome = session
        .submit_selection("play", P0, &ArgValue::Element(card))
        .unwrap();
    let StepOutcome::Awaiting { selection, choices } = outcome else {
        panic!("expected more input, got {outcome:?}");
    };
    assert_eq!(selection, "target");
    assert_eq!(choices.values().cloned().collect::<Vec<_>>(), vec![Value::Player(P1)]);
    assert_eq!(session.pending_state(P0).unwrap().selection_index, 1);

    let outcome = session
        .submit_selection("play", P0, &ArgValue::Player(P1))
        .unwrap();
    let StepOutcome::Completed(result) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert!(result.success);
    assert!(session.pending_state(P0).is_none());
    assert_eq!(session.game().life(P1), 20 - damage);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.flow_state().current_player, Some(P1));
}

#[test]
fn test_invalid_step_keeps_progress() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    let card = session.game().hand(P0)[0];
    session.submit_selection("play", P0, &ArgValue::Element(card)).unwrap();

    let outcome = session
        .submit_selection("play", P0, &ArgValue::Player(P0))
        .unwrap();
    assert!(matches!(outcome, StepOutcome::Rejected(ValidationError::InvalidChoice { .. })));
    assert_eq!(session.pending_state(P0).unwrap().selection_index, 1);

    let (next, choices) = session.pending_choices(P0).unwrap();
    assert_eq!(next, "target");
    assert_eq!(choices.len(), 1);
}

/// A pending action survives being saved, dropped and put back.
#[test]
fn test_pending_action_restored_after_reconnect() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    let card = session.game().hand(P0)[2];
    session.submit_selection("play", P0, &ArgValue::Element(card)).unwrap();

    let bytes = session.pending_state(P0).unwrap().to_bytes().unwrap();
    assert!(session.cancel_pending(P0).is_some());
    assert!(matches!(
        session.pending_choices(P0),
        Err(ValidationError::NoPendingAction { .. })
    ));

    session.restore_pending(PendingActionState::from_bytes(&bytes).unwrap()).unwrap();
    let outcome = session.submit_selection("play", P0, &ArgValue::Player(P1)).unwrap();
    assert!(matches!(outcome, StepOutcome::Completed(ref r) if r.success));
    assert_eq!(session.game().discard_size(P0), 1);
}

#[test]
fn test_completed_action_supersedes_pending() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    let hand = session.game().hand(P0).to_vec();
    session.submit_selection("play", P0, &ArgValue::Element(hand[0])).unwrap();
    assert!(session.pending_state(P0).is_some());

    let result = session
        .perform_action("discard", P0, &args([("card", ArgValue::Element(hand[1]))]))
        .unwrap();
    assert!(result.success);
    assert!(session.pending_state(P0).is_none());
}

/// Trashing repeats card by card until the player says "done"; the turn
/// stays open afterwards.
#[test]
fn test_trash_repeats_until_done() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    let hand = session.game().hand(P0).to_vec();

    let outcome = session
        .submit_selection("trash", P0, &ArgValue::Element(hand[0]))
        .unwrap();
    let StepOutcome::Awaiting { selection, choices } = outcome else {
        panic!("expected more input, got {outcome:?}");
    };
    assert_eq!(selection, "cards");
    assert_eq!(choices.len(), 3);
    assert!(choices.contains(&Value::text("done")));
    assert_eq!(session.game().hand(P0).len(), 2);
    assert_eq!(session.pending_state(P0).unwrap().repeated_values(), &[Value::Element(hand[0])]);

    let outcome = session
        .submit_selection("trash", P0, &ArgValue::Text("done".to_string()))
        .unwrap();
    let StepOutcome::Completed(result) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert!(result.success);
    let performed = result.action.unwrap();
    assert!(!performed.undoable);
    assert!(matches!(performed.args.get("cards"), Some(ArgValue::List(items)) if items.len() == 1));

    let game = session.game();
    assert_eq!(game.board().zone_size(game.trash()), 1);
    assert!(game.log().last().unwrap().contains("trashed 1 card"));

    let state = session.flow_state();
    assert_eq!(state.current_player, Some(P0));
    assert!(state.available_actions.contains(&"discard".to_string()));
}

#[test]
fn test_trash_stops_at_max_repeats() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    let hand = session.game().hand(P0).to_vec();

    for card in &hand[..2] {
        let outcome = session.submit_selection("trash", P0, &ArgValue::Element(*card)).unwrap();
        assert!(matches!(outcome, StepOutcome::Awaiting { .. }));
    }
    let outcome = session.submit_selection("trash", P0, &ArgValue::Element(hand[2])).unwrap();
    assert!(matches!(outcome, StepOutcome::Completed(ref r) if r.success));
    assert!(session.game().hand(P0).is_empty());

    // The turn goes on; drawing is still possible.
    assert_eq!(session.available_actions(P0), vec!["draw".to_string(), "taunt".to_string(), "pass".to_string()]);
}

#[test]
fn test_terminator_needs_a_value_first() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    let outcome = session
        .submit_selection("trash", P0, &ArgValue::Text("done".to_string()))
        .unwrap();
    assert!(matches!(outcome, StepOutcome::Rejected(ValidationError::InvalidChoice { .. })));
    assert!(session.pending_state(P0).is_none());
    assert_eq!(session.game().hand(P0).len(), 3);
}

#[test]
fn test_free_actions_keep_the_turn() {
    let mut session = started(SimpleGameBuilder::new(), 42);

    let result = session
        .perform_action("taunt", P0, &args([("message", ArgValue::from("too slow"))]))
        .unwrap();
    assert!(result.success);
    assert_eq!(session.flow_state().current_player, Some(P0));
    assert_eq!(session.game().log().last().map(String::as_str), Some("Player 0: too slow"));

    let too_long = "x".repeat(41);
    let result = session
        .perform_action("taunt", P0, &args([("message", ArgValue::Text(too_long))]))
        .unwrap();
    assert!(matches!(result.error, Some(ValidationError::InvalidChoice { .. })));

    let result = session.perform_action("pass", P0, &Default::default()).unwrap();
    assert!(result.success);
    assert_eq!(session.flow_state().current_player, Some(P1));
}

/// Even rounds rest; odd rounds open upkeep to everyone at once.
#[test]
fn test_round_structure() {
    let mut session = started(SimpleGameBuilder::new(), 42);
    session.perform_action("pass", P0, &Default::default()).unwrap();
    session.perform_action("pass", P1, &Default::default()).unwrap();

    // Round 1 starts with player 1.
    assert_eq!(session.game().round(), 1);
    assert_eq!(session.flow_state().current_player, Some(P1));
    session.perform_action("pass", P1, &Default::default()).unwrap();
    session.perform_action("pass", P0, &Default::default()).unwrap();

    let state = session.flow_state();
    assert_eq!(state.phase.as_deref(), Some("upkeep"));
    assert_eq!(state.current_player, None);
    assert!(state.is_awaiting(P0) && state.is_awaiting(P1));
    assert_eq!(state.actions_for(P0), vec!["heal".to_string(), "mulligan".to_string(), "pass".to_string()]);
}

#[test]
fn test_game_completes_with_winner() {
    let mut session = started(SimpleGameBuilder::new().starting_life(1), 42);
    let card = session.game().hand(P0)[0];

    let result = session
        .perform_action(
            "play",
            P0,
            &args([("card", ArgValue::Element(card)), ("target", ArgValue::Player(P1))]),
        )
        .unwrap();
    assert!(result.success);

    let state = session.flow_state();
    assert!(state.complete);
    assert!(!state.awaiting_input);
    assert_eq!(state.winners, vec![P0]);
    assert!(session.flow().is_complete());

    let result = session.perform_action("pass", P1, &Default::default()).unwrap();
    assert_eq!(result.error, Some(ValidationError::GameComplete));
}

#[test]
fn test_action_debug_reports_failed_condition() {
    let session = started(SimpleGameBuilder::new().cards_per_player(3), 42);
    let info = session.action_debug("draw", P0, None).unwrap();
    assert!(!info.available);
    assert_eq!(info.failed_conditions().collect::<Vec<_>>(), vec!["deck not empty"]);
    assert!(info.failure.unwrap().contains("deck not empty"));

    let info = session.action_debug("discard", P0, None).unwrap();
    assert!(info.available);
    assert_eq!(info.selection("card").unwrap().choice_count, 3);
}

/// A history recorded in one session rebuilds the same game in another.
#[test]
fn test_replay_reproduces_session() {
    let mut original = started(SimpleGameBuilder::new(), 9);

    let card = original.game().hand(P0)[0];
    original
        .perform_action("discard", P0, &args([("card", ArgValue::Element(card))]))
        .unwrap();
    let hand = original.game().hand(P1).to_vec();
    original.submit_selection("trash", P1, &ArgValue::Element(hand[2])).unwrap();
    original.submit_selection("trash", P1, &ArgValue::Element(hand[0])).unwrap();
    original
        .submit_selection("trash", P1, &ArgValue::Text("done".to_string()))
        .unwrap();
    original
        .perform_action("taunt", P1, &args([("message", ArgValue::from("gg"))]))
        .unwrap();
    original.perform_action("pass", P1, &Default::default()).unwrap();
    original.perform_action("draw", P1, &Default::default()).unwrap();
    assert_eq!(original.history().len(), 5);

    let history: Vec<_> = original.history().iter().cloned().collect();
    let mut copy = started(SimpleGameBuilder::new(), 9);
    copy.replay(&history).unwrap();

    assert_eq!(copy.flow_state(), original.flow_state());
    assert_eq!(copy.history(), original.history());
    for player in PlayerId::all(2) {
        assert_eq!(copy.game().hand(player), original.game().hand(player));
        assert_eq!(copy.game().life(player), original.game().life(player));
    }
    assert_eq!(copy.game().log(), original.game().log());
}

/// Trashing with every card named at once follows the same rules as
/// trashing card by card, so its history replays.
#[test]
fn test_trash_all_at_once_replays() {
    let mut original = started(SimpleGameBuilder::new(), 9);
    let hand = original.game().hand(P0).to_vec();
    let twice = args([(
        "cards",
        ArgValue::List(vec![ArgValue::Element(hand[0]), ArgValue::Element(hand[0])]),
    )]);

    let result = original.perform_action("trash", P0, &twice).unwrap();
    assert!(matches!(
        result.error,
        Some(ValidationError::InvalidChoice { ref reason, .. }) if reason.contains("already chosen")
    ));
    assert_eq!(original.game().hand(P0).len(), 3);
    assert!(original.history().is_empty());

    let two = args([(
        "cards",
        ArgValue::List(vec![ArgValue::Element(hand[2]), ArgValue::Element(hand[0])]),
    )]);
    let result = original.perform_action("trash", P0, &two).unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(original.game().hand(P0), &[hand[1]]);
    let game = original.game();
    assert_eq!(game.board().zone_size(game.trash()), 2);
    assert!(game.log().last().unwrap().contains("trashed 2 card"));
    original.perform_action("pass", P0, &Default::default()).unwrap();

    let history: Vec<_> = original.history().iter().cloned().collect();
    assert_eq!(history.len(), 2);
    let mut copy = started(SimpleGameBuilder::new(), 9);
    copy.replay(&history).unwrap();

    assert_eq!(copy.history(), original.history());
    assert_eq!(copy.flow_state(), original.flow_state());
    assert_eq!(copy.game().hand(P0), original.game().hand(P0));
    assert_eq!(copy.game().log(), original.game().log());
}

#[test]
fn test_replay_reports_divergence() {
    let mut original = started(SimpleGameBuilder::new(), 9);
    original.perform_action("pass", P0, &Default::default()).unwrap();
    let mut history: Vec<_> = original.history().iter().cloned().collect();
    history.push(history[0].clone());

    let mut copy = started(SimpleGameBuilder::new(), 9);
    let err = copy.replay(&history).unwrap_err();
    assert!(matches!(err, rust_tabletop::FlowError::ReplayDiverged { index: 1, .. }));
}

/// Completing the same move through either resume path leaves the flow in
/// the same state.
#[test]
fn test_resume_paths_converge() {
    let mut direct = started(SimpleGameBuilder::new(), 5);
    let mut external = started(SimpleGameBuilder::new(), 5);
    let card = direct.game().hand(P0)[1];
    let raw = args([("card", ArgValue::Element(card))]);

    let through_flow = direct.perform_action("discard", P0, &raw).unwrap();

    let config = EngineConfig::default();
    let (flow, game) = external.flow_and_game_mut();
    let registry = Arc::clone(flow.registry());
    let discard = registry.get("discard").unwrap();
    let executed = ActionExecutor::new(&config).execute_action(discard, &raw, game, P0);
    let after_external = flow.resume_after_external_action(game, &executed).unwrap();

    assert_eq!(through_flow.state, after_external.state);
    assert_eq!(through_flow.action, after_external.action);
    assert_eq!(direct.flow_state(), external.flow_state());
}

#[test]
fn test_sessions_for_more_players() {
    let mut session = simple::session(
        SimpleGameBuilder::new().player_count(4).build(2),
        EngineConfig::default(),
    )
    .unwrap();
    assert!(matches!(
        session.get_choices("discard", "card", P0, &Default::default()),
        Ok(ChoiceSet::Options(_))
    ));
    let state = session.start().unwrap();
    assert_eq!(state.current_player, Some(P0));

    for seat in 0..4 {
        session
            .perform_action("pass", PlayerId::new(seat), &Default::default())
            .unwrap();
    }
    assert_eq!(session.flow_state().current_player, Some(PlayerId::new(1)));
}

#[test]
fn test_session_needs_a_seated_player() {
    let tally_session = |players: usize| {
        let registry = Arc::try_unwrap(tally_registry()).ok().unwrap();
        let flow = FlowDefinition::new(FlowNode::each_player(FlowNode::action_step("act", ["pass"])));
        Session::new(Tally::new(players), registry, flow, EngineConfig::default())
    };

    assert_eq!(
        tally_session(0).unwrap_err(),
        DefinitionError::InvalidPlayerCount(0)
    );
    assert_eq!(
        tally_session(256).unwrap_err(),
        DefinitionError::InvalidPlayerCount(256)
    );

    let mut session = tally_session(2).unwrap();
    assert_eq!(session.start().unwrap().current_player, Some(P0));
}
