//! Simple game state.

use crate::board::{Board, ElementPath, ElementTree, ZoneId, ZonePosition};
use crate::core::{EntityId, PlayerId, PlayerMap};
use crate::rules::GameRules;

/// Attribute holding a card's damage.
pub const POWER: &str = "power";

/// Zone IDs for one player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerZones {
    pub deck: ZoneId,
    pub hand: ZoneId,
    pub discard: ZoneId,
}

/// Simple game state.
#[derive(Clone, Debug)]
pub struct SimpleGame {
    board: Board,
    zones: PlayerMap<PlayerZones>,
    /// Shared zone for trashed cards.
    trash: ZoneId,
    life: PlayerMap<i64>,
    current: PlayerId,
    round: u32,
    max_rounds: u32,
    /// Messages sent with the `taunt` action.
    log: Vec<String>,
}

/// Builder for creating a SimpleGame.
pub struct SimpleGameBuilder {
    player_count: usize,
    starting_life: i64,
    cards_per_player: usize,
    starting_hand_size: usize,
    max_rounds: u32,
}

impl Default for SimpleGameBuilder {
    fn default() -> Self {
        Self {
            player_count: 2,
            starting_life: 20,
            cards_per_player: 10,
            starting_hand_size: 3,
            max_rounds: 10,
        }
    }
}

impl SimpleGameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_count(mut self, count: usize) -> Self {
        assert!((2..=8).contains(&count), "Player count must be 2-8");
        self.player_count = count;
        self
    }

    pub fn starting_life(mut self, life: i64) -> Self {
        self.starting_life = life;
        self
    }

    pub fn cards_per_player(mut self, count: usize) -> Self {
        self.cards_per_player = count;
        self
    }

    pub fn starting_hand_size(mut self, size: usize) -> Self {
        self.starting_hand_size = size;
        self
    }

    pub fn max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Build the game: every player gets a shuffled deck of cards with power
    /// 1 to 5 and draws a starting hand.
    pub fn build(self, seed: u64) -> SimpleGame {
        let mut board = Board::new(seed);

        let mut player_zones = Vec::with_capacity(self.player_count);
        for player in PlayerId::all(self.player_count) {
            player_zones.push(PlayerZones {
                deck: board.add_zone(format!("{player} Deck"), Some(player)),
                hand: board.add_zone(format!("{player} Hand"), Some(player)),
                discard: board.add_zone(format!("{player} Discard"), Some(player)),
            });
        }
        let zones = PlayerMap::new(self.player_count, |player| player_zones[player.index()]);
        let trash = board.add_zone("Trash", None);

        for (player, z) in zones.iter() {
            for i in 0..self.cards_per_player {
                let power = (i % 5) as i64 + 1;
                let card = board.create(z.deck, format!("{player} Card {power}"));
                board.set_attr(card, POWER, power);
            }
            board.shuffle(z.deck);
        }

        let mut game = SimpleGame {
            board,
            zones,
            trash,
            life: PlayerMap::with_value(self.player_count, self.starting_life),
            current: PlayerId::new(0),
            round: 0,
            max_rounds: self.max_rounds,
            log: Vec::new(),
        };
        for player in PlayerId::all(self.player_count) {
            for _ in 0..self.starting_hand_size {
                game.draw(player);
            }
        }
        game
    }
}

impl SimpleGame {
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[must_use]
    pub fn zones(&self, player: PlayerId) -> Option<PlayerZones> {
        self.zones.get(player).copied()
    }

    #[must_use]
    pub fn trash(&self) -> ZoneId {
        self.trash
    }

    /// Life of `player`, 0 for an invalid seat.
    #[must_use]
    pub fn life(&self, player: PlayerId) -> i64 {
        self.life.get(player).copied().unwrap_or(0)
    }

    pub fn gain_life(&mut self, player: PlayerId, amount: i64) {
        if let Some(life) = self.life.get_mut(player) {
            *life += amount;
        }
    }

    pub fn deal_damage(&mut self, player: PlayerId, amount: i64) {
        self.gain_life(player, -amount);
    }

    #[must_use]
    pub fn is_alive(&self, player: PlayerId) -> bool {
        self.life(player) > 0
    }

    #[must_use]
    pub fn alive_players(&self) -> Vec<PlayerId> {
        PlayerId::all(self.player_count())
            .filter(|&p| self.is_alive(p))
            .collect()
    }

    /// Cards in `player`'s hand, bottom to top.
    #[must_use]
    pub fn hand(&self, player: PlayerId) -> &[EntityId] {
        self.zones
            .get(player)
            .map_or(&[], |z| self.board.elements_in(z.hand))
    }

    #[must_use]
    pub fn deck_size(&self, player: PlayerId) -> usize {
        self.zones.get(player).map_or(0, |z| self.board.zone_size(z.deck))
    }

    #[must_use]
    pub fn discard_size(&self, player: PlayerId) -> usize {
        self.zones.get(player).map_or(0, |z| self.board.zone_size(z.discard))
    }

    #[must_use]
    pub fn power(&self, card: EntityId) -> i64 {
        self.board.attr(card, POWER, 0)
    }

    /// Move the top card of `player`'s deck to their hand.
    pub fn draw(&mut self, player: PlayerId) -> Option<EntityId> {
        let z = *self.zones.get(player)?;
        let card = self.board.top(z.deck)?;
        self.board.move_to(card, z.hand, ZonePosition::Top);
        Some(card)
    }

    /// Move a card from `player`'s hand to their discard pile.
    pub fn discard(&mut self, player: PlayerId, card: EntityId) -> Result<(), String> {
        let z = self.zones.get(player).copied().ok_or("no such player")?;
        if self.board.zone_of(card) != Some(z.hand) {
            return Err(format!("{card} is not in {player}'s hand"));
        }
        self.board.move_to(card, z.discard, ZonePosition::Top);
        Ok(())
    }

    /// Put a card from `player`'s hand into the shared trash.
    pub fn trash_card(&mut self, player: PlayerId, card: EntityId) {
        if self.hand(player).contains(&card) {
            self.board.move_to(card, self.trash, ZonePosition::Top);
        }
    }

    /// Put a card from `player`'s hand at the bottom of their deck.
    pub fn tuck(&mut self, player: PlayerId, card: EntityId) {
        if let Some(z) = self.zones.get(player).copied() {
            if self.board.zone_of(card) == Some(z.hand) {
                self.board.move_to(card, z.deck, ZonePosition::Bottom);
            }
        }
    }

    /// Give `card` from `from`'s hand to `to`, taking `to`'s top hand card
    /// in return if they have one.
    pub fn trade(&mut self, from: PlayerId, to: PlayerId, card: EntityId) -> Result<(), String> {
        let (Some(mine), Some(theirs)) = (self.zones.get(from).copied(), self.zones.get(to).copied()) else {
            return Err("no such player".to_string());
        };
        if self.board.zone_of(card) != Some(mine.hand) {
            return Err(format!("{card} is not in {from}'s hand"));
        }
        let received = self.board.top(theirs.hand);
        self.board.move_to(card, theirs.hand, ZonePosition::Bottom);
        if let Some(received) = received {
            self.board.move_to(received, mine.hand, ZonePosition::Top);
        }
        Ok(())
    }

    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn next_round(&mut self) {
        self.round += 1;
    }

    #[must_use]
    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn record(&mut self, message: impl Into<String>) {
        self.log.push(message.into());
    }

    /// Game over once one player (or none) is left standing, or the rounds
    /// ran out.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.alive_players().len() <= 1 || self.round >= self.max_rounds
    }

    /// Surviving players with the highest life.
    #[must_use]
    pub fn leaders(&self) -> Vec<PlayerId> {
        let alive = self.alive_players();
        let best = alive.iter().map(|&p| self.life(p)).max();
        alive.into_iter().filter(|&p| Some(self.life(p)) == best).collect()
    }
}

impl ElementTree for SimpleGame {
    fn element_path(&self, id: EntityId) -> Option<ElementPath> {
        self.board.element_path(id)
    }

    fn element_at(&self, path: &ElementPath) -> Option<EntityId> {
        self.board.element_at(path)
    }

    fn contains_element(&self, id: EntityId) -> bool {
        self.board.contains(id)
    }

    fn element_label(&self, id: EntityId) -> String {
        self.board.element_label(id)
    }
}

impl GameRules for SimpleGame {
    fn player_count(&self) -> usize {
        self.life.player_count()
    }

    fn turn_order(&self) -> Vec<PlayerId> {
        self.alive_players()
    }

    fn current_player(&self) -> Option<PlayerId> {
        Some(self.current)
    }

    fn set_current_player(&mut self, player: PlayerId) {
        self.current = player;
    }
}
