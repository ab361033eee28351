//! Flow engine tests.
//!
//! These tests build small flow trees over the `Tally` game and check how
//! each node kind moves the engine: where it stops for input, which events
//! it reports and when the flow completes.

mod common;

use common::{tally_engine, Tally, P0, P1, P2};
use rust_tabletop::core::{ArgValue, DefinitionError, EngineConfig, FlowError, PlayerId, Value};
use rust_tabletop::flow::{FlowDefinition, FlowEngine, FlowEvent, FlowNode, FlowPosition, NodeKind};

type Node = FlowNode<Tally>;

fn turns() -> FlowDefinition<Tally> {
    FlowDefinition::new(Node::phase("play", Node::each_player(Node::action_step("act", ["score", "pass"]))))
}

fn pass(engine: &mut FlowEngine<Tally>, game: &mut Tally, player: PlayerId) {
    let result = engine.resume(game, "pass", &Default::default(), player).unwrap();
    assert!(result.success, "{:?}", result.error);
}

#[test]
fn test_each_player_takes_a_turn() {
    let (mut engine, mut game) = tally_engine(3, turns(), EngineConfig::default());

    let state = engine.flow_state(&game);
    assert!(state.awaiting_input);
    assert_eq!(state.current_player, Some(P0));
    assert_eq!(state.phase.as_deref(), Some("play"));
    assert_eq!(state.available_actions, vec!["score".to_string(), "pass".to_string()]);
    assert_eq!(game.current, Some(P0));

    engine.resume(&mut game, "score", &Default::default(), P0).unwrap();
    assert_eq!(engine.flow_state(&game).current_player, Some(P1));
    pass(&mut engine, &mut game, P1);
    assert_eq!(engine.flow_state(&game).current_player, Some(P2));
    pass(&mut engine, &mut game, P2);

    let state = engine.flow_state(&game);
    assert!(state.complete);
    assert!(!state.awaiting_input);
    assert!(engine.position().is_empty());
    assert_eq!(game.score, vec![1, 0, 0]);
}

#[test]
fn test_events_are_reported() {
    let (mut engine, mut game) = tally_engine(2, turns(), EngineConfig::default());
    assert_eq!(
        engine.take_events(),
        vec![
            FlowEvent::PhaseEntered { name: "play".to_string() },
            FlowEvent::TurnStarted { player: P0 },
            FlowEvent::ActionStepEntered {
                name: "act".to_string(),
                player: Some(P0)
            },
        ]
    );

    pass(&mut engine, &mut game, P0);
    assert_eq!(
        engine.take_events(),
        vec![
            FlowEvent::TurnStarted { player: P1 },
            FlowEvent::ActionStepEntered {
                name: "act".to_string(),
                player: Some(P1)
            },
        ]
    );

    pass(&mut engine, &mut game, P1);
    assert_eq!(
        engine.take_events(),
        vec![
            FlowEvent::PhaseExited { name: "play".to_string() },
            FlowEvent::FlowCompleted { winners: Vec::new() },
        ]
    );
    assert!(engine.take_events().is_empty());
}

#[test]
fn test_rejected_moves_leave_the_flow_alone() {
    let (mut engine, mut game) = tally_engine(2, turns(), EngineConfig::default());
    let before = engine.position().clone();

    let result = engine.resume(&mut game, "score", &Default::default(), P1).unwrap();
    assert!(!result.success);
    assert!(result.state.unwrap().action_error.is_some());

    let result = engine.resume(&mut game, "claim", &Default::default(), P0).unwrap();
    assert!(!result.success);

    let result = engine.resume(&mut game, "jump", &Default::default(), P0).unwrap();
    assert!(!result.success);

    assert_eq!(engine.position(), &before);
    assert_eq!(game.score, vec![0, 0]);

    // A good move clears the error.
    pass(&mut engine, &mut game, P0);
    assert_eq!(engine.flow_state(&game).action_error, None);
}

#[test]
fn test_resume_before_start() {
    let mut game = Tally::new(2);
    let mut engine =
        FlowEngine::new(turns(), common::tally_registry(), EngineConfig::default()).unwrap();
    let err = engine
        .resume(&mut game, "pass", &Default::default(), P0)
        .unwrap_err();
    assert_eq!(err, FlowError::NotStarted);
    assert!(!engine.flow_state(&game).awaiting_input);
}

#[test]
fn test_unknown_actions_in_flow_are_rejected() {
    let registry = common::tally_registry();

    let bad = FlowDefinition::new(Node::action_step("act", ["score", "dance"]));
    let err = FlowEngine::new(bad, registry.clone(), EngineConfig::default()).unwrap_err();
    assert_eq!(
        err,
        DefinitionError::UnknownFlowAction {
            step: "act".to_string(),
            action: "dance".to_string()
        }
    );

    let empty = FlowDefinition::new(Node::simultaneous("vote", Vec::<&str>::new()));
    let err = FlowEngine::new(empty, registry, EngineConfig::default()).unwrap_err();
    assert_eq!(err, DefinitionError::EmptyActionStep("vote".to_string()));
}

#[test]
fn test_loop_limits() {
    let tick = || Node::execute("tick", |game: &mut Tally, _| game.ticks += 1);

    let capped = FlowDefinition::new(Node::repeat(tick()).max_iterations(3));
    let (engine, game) = tally_engine(2, capped, EngineConfig::default());
    assert!(engine.is_complete());
    assert_eq!(game.ticks, 3);

    let guarded = FlowDefinition::new(Node::loop_while(|ctx| ctx.game.ticks < 4, tick()));
    let (_, game) = tally_engine(2, guarded, EngineConfig::default());
    assert_eq!(game.ticks, 4);

    let unbounded = FlowDefinition::new(Node::repeat(tick()));
    let (engine, game) = tally_engine(
        2,
        unbounded,
        EngineConfig::default().with_max_loop_iterations(7),
    );
    assert!(engine.is_complete());
    assert_eq!(game.ticks, 7);
}

#[test]
fn test_step_limit() {
    let mut game = Tally::new(2);
    let endless = FlowDefinition::new(Node::repeat(Node::execute("tick", |game: &mut Tally, _| {
        game.ticks += 1;
    })));
    let config = EngineConfig::default().with_max_flow_steps(50);
    let mut engine = FlowEngine::new(endless, common::tally_registry(), config).unwrap();

    let err = engine.start(&mut game).unwrap_err();
    assert_eq!(err, FlowError::StepLimitExceeded(50));
    assert!(game.ticks > 0);
}

#[test]
fn test_branches() {
    let log = |text: &'static str| Node::execute(text, move |game: &mut Tally, _| game.log.push(text.to_string()));
    let definition = FlowDefinition::new(Node::sequence([
        Node::switch(|ctx| Value::Int(ctx.game.players as i64))
            .case(2i64, log("two"))
            .case(3i64, log("three"))
            .default(log("many"))
            .into(),
        Node::switch(|_| Value::text("nothing"))
            .case("something", log("matched"))
            .into(),
        Node::if_then(|ctx| ctx.game.ticks > 0, log("ticked"))
            .otherwise(log("idle"))
            .into(),
        Node::if_then(|_| false, log("never")).into(),
    ]));

    let (engine, game) = tally_engine(3, definition, EngineConfig::default());
    assert!(engine.is_complete());
    assert_eq!(game.log, vec!["three", "idle"]);

    let definition = FlowDefinition::new(
        Node::switch(|ctx| Value::Int(ctx.game.players as i64))
            .case(2i64, log("two"))
            .default(log("many")),
    );
    let (_, game) = tally_engine(5, definition, EngineConfig::default());
    assert_eq!(game.log, vec!["many"]);
}

#[test]
fn test_for_each_binds_items() {
    let definition = FlowDefinition::new(Node::for_each(
        "n",
        |_| vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        Node::execute("add", |game: &mut Tally, scope| {
            game.ticks += scope.get("n").and_then(Value::as_int).unwrap_or(0);
        }),
    ));
    let (_, game) = tally_engine(2, definition, EngineConfig::default());
    assert_eq!(game.ticks, 6);
}

#[test]
fn test_phase_hooks_run_once() {
    let definition = FlowDefinition::new(
        Node::phase("scoring", Node::each_player(Node::action_step("act", ["score"])))
            .on_enter(|game: &mut Tally, _| game.log.push("enter".to_string()))
            .on_exit(|game: &mut Tally, _| game.log.push("exit".to_string())),
    );
    let (mut engine, mut game) = tally_engine(2, definition, EngineConfig::default());
    assert_eq!(game.log, vec!["enter"]);

    engine.resume(&mut game, "score", &Default::default(), P0).unwrap();
    engine.resume(&mut game, "score", &Default::default(), P1).unwrap();
    assert_eq!(game.log, vec!["enter", "score 0", "score 1", "exit"]);
}

#[test]
fn test_each_player_order() {
    let definition = FlowDefinition::new(
        Node::each_player(
            Node::execute("note", |game: &mut Tally, scope| {
                if let Some(player) = scope.player() {
                    game.log.push(player.0.to_string());
                }
            }),
        )
        .starting_with(|_| PlayerId(2))
        .players_where(|_, player| player != PlayerId(3)),
    );
    let (_, game) = tally_engine(4, definition, EngineConfig::default());
    assert_eq!(game.log, vec!["2", "0", "1"]);
    assert_eq!(game.current, Some(P1));
}

#[test]
fn test_action_steps_without_open_actions_are_skipped() {
    let definition = FlowDefinition::new(Node::sequence([
        Node::action_step("closed", ["never"]).into(),
        Node::action_step("skipped", ["score"]).skip_if(|_| true).into(),
        Node::action_step("open", ["score"]).into(),
    ]));
    let (mut engine, mut game) = tally_engine(2, definition, EngineConfig::default());

    let state = engine.flow_state(&game);
    assert_eq!(engine.position().leaf().unwrap().name, "open");
    assert_eq!(state.current_player, Some(P0));

    engine.resume(&mut game, "score", &Default::default(), P0).unwrap();
    assert!(engine.is_complete());
}

#[test]
fn test_action_step_player_and_repeat() {
    let definition = FlowDefinition::new(
        Node::action_step("act", ["score", "pass"])
            .player(|_| PlayerId(1))
            .prompt("Score twice")
            .repeat_until(|_, moves| moves.len() >= 2),
    );
    let (mut engine, mut game) = tally_engine(2, definition, EngineConfig::default());

    let state = engine.flow_state(&game);
    assert_eq!(state.current_player, Some(P1));
    assert_eq!(state.prompt.as_deref(), Some("Score twice"));

    engine.resume(&mut game, "score", &Default::default(), P1).unwrap();
    assert!(!engine.is_complete());
    assert_eq!(engine.last_action().map(|a| a.name.as_str()), Some("score"));

    engine.resume(&mut game, "pass", &Default::default(), P1).unwrap();
    assert!(engine.is_complete());
    assert_eq!(game.score, vec![0, 1]);
}

#[test]
fn test_completion_check_and_winners() {
    let definition = FlowDefinition::new(Node::repeat(Node::each_player(Node::action_step("act", ["score"]))))
        .complete_when(|game: &Tally| game.score.iter().any(|&s| s >= 2))
        .winners(|game: &Tally| {
            game.score
                .iter()
                .enumerate()
                .filter(|(_, s)| **s >= 2)
                .map(|(i, _)| PlayerId(i as u8))
                .collect()
        });
    let (mut engine, mut game) = tally_engine(2, definition, EngineConfig::default());

    for player in [P0, P1, P0] {
        engine.resume(&mut game, "score", &Default::default(), player).unwrap();
    }
    assert!(engine.is_complete());
    assert_eq!(engine.winners(), &[P0]);

    let result = engine.resume(&mut game, "score", &Default::default(), P1).unwrap();
    assert!(!result.success);
    assert_eq!(game.score, vec![2, 1]);
}

#[test]
fn test_position_names_and_bytes() {
    let definition = FlowDefinition::new(
        Node::repeat(Node::phase("play", Node::each_player(Node::action_step("act", ["pass"])).named("turns")))
            .named("rounds"),
    );
    let (mut engine, mut game) = tally_engine(2, definition, EngineConfig::default());
    pass(&mut engine, &mut game, P0);

    let position = engine.position().clone();
    assert_eq!(position.names().collect::<Vec<_>>(), vec!["rounds", "play", "turns", "act"]);
    assert_eq!(position.leaf().map(|s| s.kind), Some(NodeKind::ActionStep));
    assert_eq!(position.to_string(), "rounds#0 / play / turns(Player 1) / act");

    let bytes = position.to_bytes().unwrap();
    assert_eq!(FlowPosition::from_bytes(&bytes).unwrap(), position);
}

#[test]
fn test_wire_args_reach_the_action() {
    let definition = FlowDefinition::new(Node::action_step("act", ["score"]));
    let (mut engine, mut game) = tally_engine(2, definition, EngineConfig::default());

    let mut raw = rust_tabletop::core::RawArgs::new();
    raw.insert("extra".to_string(), ArgValue::Int(1));
    let result = engine.resume(&mut game, "score", &raw, P0).unwrap();
    assert!(!result.success);
    assert!(!engine.is_complete());
}
