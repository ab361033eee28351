//! Element identification.
//!
//! Every object living in the element tree (card, token, space, die) has an
//! `EntityId`. Ids are transient: they are handed out by the tree in creation
//! order and are only meaningful within one running game. Anything that must
//! survive a rebuild from scratch (history, saved arguments) refers to elements
//! by [`ElementPath`](crate::board::ElementPath) instead.
//!
//! ```
//! use rust_tabletop::core::EntityId;
//!
//! let card = EntityId(7);
//! assert_eq!(card.raw(), 7);
//! assert_eq!(format!("{}", card), "#7");
//! ```

use serde::{Deserialize, Serialize};

/// Transient identifier for an element of the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Create an entity ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Interpret a client-supplied integer as an entity ID.
    ///
    /// Returns `None` for negative or out-of-range values.
    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        u32::try_from(value).ok().map(Self)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
