//! Argument values.
//!
//! Two representations exist for the same information:
//!
//! - [`Value`]: the live form handed to filters, conditions and execute
//!   callbacks. Elements are referenced by their transient [`EntityId`].
//! - [`ArgValue`]: the wire form supplied by clients and stored in history.
//!   Elements may be referenced by id, by stable [`ElementPath`], or loosely
//!   (a bare integer or a label) and are resolved against the choices the
//!   engine actually offers.
//!
//! [`Args`] maps selection names to live values. It is ordered so that the
//! same arguments always hash and serialize identically.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::player::PlayerId;
use crate::board::ElementPath;

/// Live argument value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
    Player(PlayerId),
    Element(EntityId),
    List(Vec<Value>),
}

impl Value {
    /// Build a text value.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_player(&self) -> Option<PlayerId> {
        match self {
            Self::Player(p) => Some(*p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_element(&self) -> Option<EntityId> {
        match self {
            Self::Element(e) => Some(*e),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// All element ids held by this value (one for `Element`, any number for a list).
    #[must_use]
    pub fn elements(&self) -> Vec<EntityId> {
        match self {
            Self::Element(e) => vec![*e],
            Self::List(items) => items.iter().flat_map(Value::elements).collect(),
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Player(p) => write!(f, "{p}"),
            Self::Element(e) => write!(f, "{e}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<PlayerId> for Value {
    fn from(p: PlayerId) -> Self {
        Self::Player(p)
    }
}

impl From<EntityId> for Value {
    fn from(e: EntityId) -> Self {
        Self::Element(e)
    }
}

/// Wire form of an argument value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Player(PlayerId),
    Element(EntityId),
    Path(ElementPath),
    List(Vec<ArgValue>),
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Player(p) => write!(f, "{p}"),
            Self::Element(e) => write!(f, "{e}"),
            Self::Path(path) => write!(f, "@{path}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&Value> for ArgValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::Int(n) => Self::Int(*n),
            Value::Text(s) => Self::Text(s.clone()),
            Value::Player(p) => Self::Player(*p),
            Value::Element(e) => Self::Element(*e),
            Value::List(items) => Self::List(items.iter().map(Self::from).collect()),
        }
    }
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

impl From<i64> for ArgValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Raw arguments as supplied by a client, keyed by selection name.
pub type RawArgs = BTreeMap<String, ArgValue>;

/// Resolved arguments keyed by selection name.
///
/// ```
/// use rust_tabletop::core::{Args, EntityId, Value};
///
/// let args = Args::new().with("card", EntityId(4)).with("amount", 2i64);
/// assert_eq!(args.element("card"), Some(EntityId(4)));
/// assert_eq!(args.int("amount"), Some(2));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Args(BTreeMap<String, Value>);

impl Args {
    /// Create empty arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value (builder pattern).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn element(&self, name: &str) -> Option<EntityId> {
        self.get(name).and_then(Value::as_element)
    }

    /// Element ids of a multi-element (or single element) selection.
    #[must_use]
    pub fn elements(&self, name: &str) -> Vec<EntityId> {
        self.get(name).map(Value::elements).unwrap_or_default()
    }

    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    #[must_use]
    pub fn player(&self, name: &str) -> Option<PlayerId> {
        self.get(name).and_then(Value::as_player)
    }

    /// Stable hash of the contents, used to memoize lookahead by prefix.
    #[must_use]
    pub fn signature(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.0.hash(&mut hasher);
        hasher.finish()
    }
}

impl FromIterator<(String, Value)> for Args {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_elements() {
        let list = Value::List(vec![Value::Element(EntityId(1)), Value::Element(EntityId(2))]);
        assert_eq!(list.elements(), vec![EntityId(1), EntityId(2)]);
        assert!(Value::Int(3).elements().is_empty());
    }

    #[test]
    fn test_value_display() {
        let list = Value::List(vec![Value::Int(1), Value::text("a")]);
        assert_eq!(list.to_string(), "[1, a]");
        assert_eq!(Value::Player(PlayerId::new(1)).to_string(), "Player 1");
    }

    #[test]
    fn test_signature_is_order_independent() {
        let a = Args::new().with("x", 1i64).with("y", "b");
        let b = Args::new().with("y", "b").with("x", 1i64);
        assert_eq!(a.signature(), b.signature());

        let c = Args::new().with("x", 2i64).with("y", "b");
        assert_ne!(a.signature(), c.signature());
    }

    #[test]
    fn test_arg_value_from_value() {
        let value = Value::List(vec![Value::Element(EntityId(3))]);
        assert_eq!(
            ArgValue::from(&value),
            ArgValue::List(vec![ArgValue::Element(EntityId(3))])
        );
    }

    #[test]
    fn test_args_serialization() {
        let args = Args::new().with("card", EntityId(9)).with("note", "hi");
        let json = serde_json::to_string(&args).unwrap();
        let back: Args = serde_json::from_str(&json).unwrap();
        assert_eq!(args, back);
    }
}
