//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rust_tabletop::actions::{ActionDefinition, ActionRegistry};
use rust_tabletop::board::{ElementPath, ElementTree};
use rust_tabletop::core::{ArgValue, EngineConfig, EntityId, PlayerId, RawArgs};
use rust_tabletop::flow::{FlowDefinition, FlowEngine};
use rust_tabletop::games::simple::{self, SimpleGame, SimpleGameBuilder};
use rust_tabletop::rules::GameRules;
use rust_tabletop::Session;
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness. Set `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const P0: PlayerId = PlayerId(0);
pub const P1: PlayerId = PlayerId(1);
pub const P2: PlayerId = PlayerId(2);

/// A started session of the simple game.
pub fn started(builder: SimpleGameBuilder, seed: u64) -> Session<SimpleGame> {
    init_tracing();
    let mut session = simple::session(builder.build(seed), EngineConfig::default()).unwrap();
    session.start().unwrap();
    session
}

/// Build raw arguments from name/value pairs.
pub fn args<const N: usize>(pairs: [(&str, ArgValue); N]) -> RawArgs {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// A bare scorekeeping game for exercising flow structure.
#[derive(Clone, Debug, Default)]
pub struct Tally {
    pub players: usize,
    pub current: Option<PlayerId>,
    pub score: Vec<i64>,
    pub ticks: i64,
    pub log: Vec<String>,
}

impl Tally {
    pub fn new(players: usize) -> Self {
        Self {
            players,
            score: vec![0; players],
            ..Self::default()
        }
    }
}

impl ElementTree for Tally {
    fn element_path(&self, _id: EntityId) -> Option<ElementPath> {
        None
    }

    fn element_at(&self, _path: &ElementPath) -> Option<EntityId> {
        None
    }
}

impl GameRules for Tally {
    fn player_count(&self) -> usize {
        self.players
    }

    fn current_player(&self) -> Option<PlayerId> {
        self.current
    }

    fn set_current_player(&mut self, player: PlayerId) {
        self.current = Some(player);
    }
}

/// `score` adds a point, `pass` does nothing, `claim` is closed to player 1
/// and `never` is closed to everyone.
pub fn tally_registry() -> Arc<ActionRegistry<Tally>> {
    let mut registry = ActionRegistry::new();
    registry
        .register_all([
            ActionDefinition::<Tally>::builder("score")
                .execute(|game, player, _| {
                    game.score[player.index()] += 1;
                    game.log.push(format!("score {}", player.0));
                    Ok(())
                })
                .build()
                .unwrap(),
            ActionDefinition::<Tally>::builder("pass")
                .execute(|_, _, _| Ok(()))
                .build()
                .unwrap(),
            ActionDefinition::<Tally>::builder("claim")
                .condition("not player 1", |ctx| ctx.player != PlayerId(1))
                .execute(|game, player, _| {
                    game.log.push(format!("claim {}", player.0));
                    Ok(())
                })
                .build()
                .unwrap(),
            ActionDefinition::<Tally>::builder("never")
                .condition("closed", |_| false)
                .execute(|_, _, _| Ok(()))
                .build()
                .unwrap(),
        ])
        .unwrap();
    Arc::new(registry)
}

/// A started engine over a fresh `Tally`.
pub fn tally_engine(
    players: usize,
    definition: FlowDefinition<Tally>,
    config: EngineConfig,
) -> (FlowEngine<Tally>, Tally) {
    init_tracing();
    let mut game = Tally::new(players);
    let mut engine = FlowEngine::new(definition, tally_registry(), config).unwrap();
    engine.start(&mut game).unwrap();
    (engine, game)
}
