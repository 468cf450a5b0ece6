//! Connection id → locally simulated remote body
//!
//! The single source of truth for which remote peers currently have a body
//! in the world. The local player's own connection is never registered.

use std::collections::BTreeMap;

use super::presence::ConnectionId;
use crate::sim::BodyId;
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct BodyRegistry {
    bodies: BTreeMap<ConnectionId, BodyId>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body for a connection. Fails if the connection already has one.
    pub fn add(&mut self, id: ConnectionId, body: BodyId) -> Result<()> {
        if self.bodies.contains_key(&id) {
            return Err(Error::DuplicatePeer(id));
        }
        self.bodies.insert(id, body);
        Ok(())
    }

    /// Unregister a connection, handing its body back for detachment
    pub fn remove(&mut self, id: ConnectionId) -> Option<BodyId> {
        self.bodies.remove(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<BodyId> {
        self.bodies.get(&id).copied()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.bodies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.bodies.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, BodyId)> + '_ {
        self.bodies.iter().map(|(id, body)| (*id, *body))
    }

    /// Empty the registry, returning every body that was owned
    pub fn clear(&mut self) -> Vec<BodyId> {
        std::mem::take(&mut self.bodies).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut registry = BodyRegistry::new();
        registry.add(ConnectionId(1), BodyId(10)).expect("first add");
        assert_eq!(registry.get(ConnectionId(1)), Some(BodyId(10)));
        assert_eq!(registry.get(ConnectionId(2)), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mut registry = BodyRegistry::new();
        registry.add(ConnectionId(1), BodyId(10)).expect("first add");
        let err = registry.add(ConnectionId(1), BodyId(11));
        assert!(matches!(err, Err(Error::DuplicatePeer(ConnectionId(1)))));
        assert_eq!(
            registry.get(ConnectionId(1)),
            Some(BodyId(10)),
            "First body kept"
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = BodyRegistry::new();
        registry.add(ConnectionId(5), BodyId(1)).expect("add");
        assert_eq!(registry.remove(ConnectionId(5)), Some(BodyId(1)));
        assert_eq!(registry.remove(ConnectionId(5)), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_iteration_is_ordered_by_connection() {
        let mut registry = BodyRegistry::new();
        registry.add(ConnectionId(3), BodyId(1)).expect("add");
        registry.add(ConnectionId(1), BodyId(2)).expect("add");
        registry.add(ConnectionId(2), BodyId(3)).expect("add");
        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(ids, vec![ConnectionId(1), ConnectionId(2), ConnectionId(3)]);
    }

    #[test]
    fn test_clear_returns_bodies() {
        let mut registry = BodyRegistry::new();
        registry.add(ConnectionId(1), BodyId(7)).expect("add");
        registry.add(ConnectionId(2), BodyId(8)).expect("add");
        let mut bodies = registry.clear();
        bodies.sort();
        assert_eq!(bodies, vec![BodyId(7), BodyId(8)]);
        assert!(registry.is_empty());
    }
}
