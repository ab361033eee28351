//! Registry of action definitions.
//!
//! The `ActionRegistry` stores every action a game declares, keeps them in
//! registration order (which is the order actions are listed to players) and
//! provides lookup by name.

use rustc_hash::FxHashMap;

use super::definition::ActionDefinition;
use crate::core::DefinitionError;

/// Registry of action definitions.
///
/// ## Example
///
/// ```
/// use rust_tabletop::actions::{ActionDefinition, ActionRegistry};
/// use rust_tabletop::games::simple::SimpleGame;
///
/// let mut registry = ActionRegistry::<SimpleGame>::new();
/// let pass = ActionDefinition::builder("pass")
///     .execute(|_, _, _| Ok(()))
///     .build()
///     .unwrap();
///
/// registry.register(pass).unwrap();
/// assert!(registry.contains("pass"));
/// ```
pub struct ActionRegistry<G> {
    actions: Vec<ActionDefinition<G>>,
    by_name: FxHashMap<String, usize>,
}

impl<G> Default for ActionRegistry<G> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }
}

impl<G> std::fmt::Debug for ActionRegistry<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl<G> ActionRegistry<G> {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action definition.
    ///
    /// Fails if an action with the same name already exists.
    pub fn register(&mut self, action: ActionDefinition<G>) -> Result<(), DefinitionError> {
        if self.by_name.contains_key(&action.name) {
            return Err(DefinitionError::DuplicateAction(action.name));
        }
        self.by_name.insert(action.name.clone(), self.actions.len());
        self.actions.push(action);
        Ok(())
    }

    /// Register every definition, stopping at the first duplicate.
    pub fn register_all(
        &mut self,
        actions: impl IntoIterator<Item = ActionDefinition<G>>,
    ) -> Result<(), DefinitionError> {
        actions.into_iter().try_for_each(|action| self.register(action))
    }

    /// Get an action definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionDefinition<G>> {
        self.by_name.get(name).map(|&index| &self.actions[index])
    }

    /// Check if an action is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Action names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.name.as_str())
    }

    /// Get the number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate over definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition<G>> {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Table;

    fn action(name: &str) -> ActionDefinition<Table> {
        ActionDefinition::builder(name)
            .execute(|_, _, _| Ok(()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = ActionRegistry::new();
        registry
            .register_all([action("draw"), action("play"), action("pass")])
            .unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["draw", "play", "pass"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("play").map(|a| a.name.as_str()), Some("play"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ActionRegistry::new();
        registry.register(action("draw")).unwrap();
        assert_eq!(
            registry.register(action("draw")),
            Err(DefinitionError::DuplicateAction("draw".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }
}
