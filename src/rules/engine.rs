//! The game contract.
//!
//! Games implement `GameRules` on their state type. The engine only needs a
//! handful of things from it: how many seats there are, the order they act
//! in, where the current-player marker sits, and (through the
//! [`ElementTree`] supertrait) how to name elements stably.

use crate::board::ElementTree;
use crate::core::PlayerId;

/// Game state as seen by the engine.
///
/// ## Implementation Notes
///
/// - `turn_order`: order used by each-player iteration; defaults to seat order
/// - `set_current_player`: called whenever each-player iteration moves on;
///   games that track a current player record it here
pub trait GameRules: ElementTree {
    /// Number of seats at the table.
    fn player_count(&self) -> usize;

    /// Seats in the order they take turns.
    fn turn_order(&self) -> Vec<PlayerId> {
        PlayerId::all(self.player_count()).collect()
    }

    /// The player the game currently considers active, if it tracks one.
    fn current_player(&self) -> Option<PlayerId> {
        None
    }

    /// Record the active player.
    fn set_current_player(&mut self, _player: PlayerId) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::ElementPath;
    use crate::core::EntityId;

    struct Table(usize);

    impl ElementTree for Table {
        fn element_path(&self, _id: EntityId) -> Option<ElementPath> {
            None
        }

        fn element_at(&self, _path: &ElementPath) -> Option<EntityId> {
            None
        }
    }

    impl GameRules for Table {
        fn player_count(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn test_default_turn_order() {
        let table = Table(3);
        assert_eq!(
            table.turn_order(),
            vec![PlayerId::new(0), PlayerId::new(1), PlayerId::new(2)]
        );
        assert_eq!(table.current_player(), None);
    }
}
