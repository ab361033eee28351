//! Reference element tree: zones of ordered elements.
//!
//! `Board` is a small, complete implementation of the mutation primitives a
//! game needs (create, move, remove, shuffle, set attribute, set owner). It is
//! what the bundled game and the tests run against; hosts with their own
//! object model implement [`ElementTree`] instead.
//!
//! ## Layout
//!
//! Zones sit directly under the root. Within a zone, index 0 is the bottom
//! and the last index is the top. An element's path is `[zone, index]`.
//!
//! ```
//! use rust_tabletop::board::{Board, ElementPath, ElementTree, ZonePosition};
//!
//! let mut board = Board::new(42);
//! let deck = board.add_zone("deck", None);
//! let hand = board.add_zone("hand", None);
//!
//! let card = board.create(deck, "Ace");
//! board.move_to(card, hand, ZonePosition::Top);
//!
//! assert_eq!(board.zone_of(card), Some(hand));
//! assert_eq!(board.element_path(card), Some(ElementPath::new([1, 0])));
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{EntityId, GameRng, PlayerId};

use super::tree::{ElementPath, ElementTree};

/// Zone identifier: the zone's index under the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u16);

impl ZoneId {
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Zone({})", self.0)
    }
}

/// Position for inserting an element into a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePosition {
    /// Add to top of zone.
    Top,
    /// Add to bottom of zone.
    Bottom,
    /// Insert at specific index (0 = bottom).
    Index(usize),
}

#[derive(Clone, Debug)]
struct Zone {
    name: String,
    owner: Option<PlayerId>,
    elements: Vec<EntityId>,
}

#[derive(Clone, Debug)]
struct Element {
    name: String,
    zone: ZoneId,
    owner: Option<PlayerId>,
    attributes: FxHashMap<String, i64>,
}

/// Zones of ordered elements with deterministic shuffling.
#[derive(Clone, Debug)]
pub struct Board {
    zones: Vec<Zone>,
    elements: FxHashMap<EntityId, Element>,
    next_id: u32,
    rng: GameRng,
}

impl Board {
    /// Create an empty board whose shuffles derive from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            zones: Vec::new(),
            elements: FxHashMap::default(),
            next_id: 1,
            rng: GameRng::new(seed),
        }
    }

    /// Add a zone under the root.
    pub fn add_zone(&mut self, name: impl Into<String>, owner: Option<PlayerId>) -> ZoneId {
        let id = ZoneId(self.zones.len() as u16);
        self.zones.push(Zone {
            name: name.into(),
            owner,
            elements: Vec::new(),
        });
        id
    }

    /// Find a zone by name.
    #[must_use]
    pub fn zone_named(&self, name: &str) -> Option<ZoneId> {
        self.zones
            .iter()
            .position(|z| z.name == name)
            .map(|i| ZoneId(i as u16))
    }

    #[must_use]
    pub fn zone_name(&self, zone: ZoneId) -> Option<&str> {
        self.zones.get(zone.index()).map(|z| z.name.as_str())
    }

    #[must_use]
    pub fn zone_owner(&self, zone: ZoneId) -> Option<PlayerId> {
        self.zones.get(zone.index()).and_then(|z| z.owner)
    }

    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Create an element on top of `zone`.
    ///
    /// Panics if the zone does not exist.
    pub fn create(&mut self, zone: ZoneId, name: impl Into<String>) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        let owner = self.zones[zone.index()].owner;
        self.zones[zone.index()].elements.push(id);
        self.elements.insert(
            id,
            Element {
                name: name.into(),
                zone,
                owner,
                attributes: FxHashMap::default(),
            },
        );
        id
    }

    /// Move an element to another zone.
    ///
    /// Returns the old zone, or `None` if the element or zone wasn't found.
    pub fn move_to(
        &mut self,
        entity: EntityId,
        new_zone: ZoneId,
        position: ZonePosition,
    ) -> Option<ZoneId> {
        if new_zone.index() >= self.zones.len() {
            return None;
        }
        let element = self.elements.get_mut(&entity)?;
        let old_zone = element.zone;
        element.zone = new_zone;

        self.zones[old_zone.index()].elements.retain(|&e| e != entity);

        let order = &mut self.zones[new_zone.index()].elements;
        match position {
            ZonePosition::Top => order.push(entity),
            ZonePosition::Bottom => order.insert(0, entity),
            ZonePosition::Index(i) => order.insert(i.min(order.len()), entity),
        }

        Some(old_zone)
    }

    /// Remove an element from the board entirely.
    pub fn remove(&mut self, entity: EntityId) -> Option<ZoneId> {
        let element = self.elements.remove(&entity)?;
        self.zones[element.zone.index()]
            .elements
            .retain(|&e| e != entity);
        Some(element.zone)
    }

    /// Shuffle a zone.
    pub fn shuffle(&mut self, zone: ZoneId) {
        if let Some(z) = self.zones.get_mut(zone.index()) {
            self.rng.shuffle(&mut z.elements);
        }
    }

    /// Set an integer attribute on an element.
    pub fn set_attr(&mut self, entity: EntityId, key: impl Into<String>, value: i64) {
        if let Some(element) = self.elements.get_mut(&entity) {
            element.attributes.insert(key.into(), value);
        }
    }

    /// Read an integer attribute with a default.
    #[must_use]
    pub fn attr(&self, entity: EntityId, key: &str, default: i64) -> i64 {
        self.elements
            .get(&entity)
            .and_then(|e| e.attributes.get(key).copied())
            .unwrap_or(default)
    }

    pub fn set_owner(&mut self, entity: EntityId, owner: Option<PlayerId>) {
        if let Some(element) = self.elements.get_mut(&entity) {
            element.owner = owner;
        }
    }

    #[must_use]
    pub fn owner(&self, entity: EntityId) -> Option<PlayerId> {
        self.elements.get(&entity).and_then(|e| e.owner)
    }

    #[must_use]
    pub fn name(&self, entity: EntityId) -> Option<&str> {
        self.elements.get(&entity).map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn zone_of(&self, entity: EntityId) -> Option<ZoneId> {
        self.elements.get(&entity).map(|e| e.zone)
    }

    /// Elements in a zone, bottom to top.
    #[must_use]
    pub fn elements_in(&self, zone: ZoneId) -> &[EntityId] {
        self.zones
            .get(zone.index())
            .map_or(&[], |z| z.elements.as_slice())
    }

    #[must_use]
    pub fn zone_size(&self, zone: ZoneId) -> usize {
        self.elements_in(zone).len()
    }

    /// Top element of a zone.
    #[must_use]
    pub fn top(&self, zone: ZoneId) -> Option<EntityId> {
        self.elements_in(zone).last().copied()
    }

    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.elements.contains_key(&entity)
    }

    #[must_use]
    pub fn total_elements(&self) -> usize {
        self.elements.len()
    }
}

impl ElementTree for Board {
    fn element_path(&self, id: EntityId) -> Option<ElementPath> {
        let zone = self.elements.get(&id)?.zone;
        let index = self.zones[zone.index()]
            .elements
            .iter()
            .position(|&e| e == id)?;
        Some(ElementPath(vec![zone.0 as u32, index as u32]))
    }

    fn element_at(&self, path: &ElementPath) -> Option<EntityId> {
        match path.indices() {
            [zone, index] => self
                .zones
                .get(*zone as usize)?
                .elements
                .get(*index as usize)
                .copied(),
            _ => None,
        }
    }

    fn contains_element(&self, id: EntityId) -> bool {
        self.contains(id)
    }

    fn element_label(&self, id: EntityId) -> String {
        self.name(id).map_or_else(|| id.to_string(), str::to_string)
    }
}
