// presence-server/src/presence/registry.rs
use common::{ConnectionId, UserId};
use std::collections::{BTreeSet, HashMap, HashSet};

/// What a registry mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Connected,
    Disconnected,
}

/// Emitted by every effective registry mutation. Consumers (the presence
/// publisher) react to it; the registry itself never talks to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub kind: ChangeKind,
    /// The user went online (first connection) or offline (last connection).
    pub status_changed: bool,
    /// Set when a register moved the connection away from another user:
    /// that user's side of the move.
    pub displaced: Option<Box<PresenceChange>>,
}

struct Slot<S> {
    owner: UserId,
    sink: S,
}

/// Maps users to their live connections.
///
/// A user is a key of `users` iff it owns at least one connection, and a
/// connection is owned by exactly one user. `S` is whatever the transport
/// uses to push events into the connection.
pub struct ConnectionRegistry<S> {
    users: HashMap<UserId, HashSet<ConnectionId>>,
    connections: HashMap<ConnectionId, Slot<S>>,
}

impl<S> Default for ConnectionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ConnectionRegistry<S> {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            connections: HashMap::new(),
        }
    }

    /// Add `connection_id` under `user_id`.
    ///
    /// Returns `None` if the connection is already registered to that user.
    /// A connection registered to a different user is moved.
    pub fn register(
        &mut self,
        user_id: UserId,
        connection_id: ConnectionId,
        sink: S,
    ) -> Option<PresenceChange> {
        let displaced = match self.connections.get(&connection_id) {
            Some(slot) if slot.owner == user_id => return None,
            Some(slot) => {
                tracing::warn!(
                    "Connection {} moved from user {} to user {}",
                    connection_id,
                    slot.owner,
                    user_id
                );
                self.unregister(connection_id).map(Box::new)
            }
            None => None,
        };

        let owned = self.users.entry(user_id.clone()).or_default();
        let status_changed = owned.is_empty();
        owned.insert(connection_id);
        self.connections.insert(
            connection_id,
            Slot {
                owner: user_id.clone(),
                sink,
            },
        );

        Some(PresenceChange {
            user_id,
            connection_id,
            kind: ChangeKind::Connected,
            status_changed,
            displaced,
        })
    }

    /// Remove `connection_id` from whichever user owns it.
    ///
    /// Unknown connections (never registered, or already removed) yield `None`.
    pub fn unregister(&mut self, connection_id: ConnectionId) -> Option<PresenceChange> {
        let slot = self.connections.remove(&connection_id)?;

        let mut status_changed = false;
        if let Some(owned) = self.users.get_mut(&slot.owner) {
            owned.remove(&connection_id);
            if owned.is_empty() {
                self.users.remove(&slot.owner);
                status_changed = true;
            }
        }

        Some(PresenceChange {
            user_id: slot.owner,
            connection_id,
            kind: ChangeKind::Disconnected,
            status_changed,
            displaced: None,
        })
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.users.contains_key(user_id)
    }

    /// Sorted snapshot of every user with at least one live connection.
    pub fn online_user_ids(&self) -> Vec<UserId> {
        let sorted: BTreeSet<&UserId> = self.users.keys().collect();
        sorted.into_iter().cloned().collect()
    }

    /// Live connections of `user_id`; empty when the user is offline.
    pub fn handles_for(&self, user_id: &UserId) -> Vec<ConnectionId> {
        let mut handles: Vec<ConnectionId> = self
            .users
            .get(user_id)
            .map(|owned| owned.iter().copied().collect())
            .unwrap_or_default();
        handles.sort();
        handles
    }

    pub fn owner_of(&self, connection_id: ConnectionId) -> Option<&UserId> {
        self.connections.get(&connection_id).map(|slot| &slot.owner)
    }

    pub fn sinks_for<'a>(
        &'a self,
        user_id: &UserId,
    ) -> impl Iterator<Item = (ConnectionId, &'a S)> + 'a {
        let owned = self.users.get(user_id).into_iter().flatten();
        owned.filter_map(move |id| self.connections.get(id).map(|slot| (*id, &slot.sink)))
    }

    pub fn all_sinks(&self) -> impl Iterator<Item = (ConnectionId, &S)> + '_ {
        self.connections.iter().map(|(id, slot)| (*id, &slot.sink))
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    /// Check both structural invariants against the internal maps.
    fn assert_consistent<S>(registry: &ConnectionRegistry<S>) {
        for (user_id, owned) in &registry.users {
            assert!(!owned.is_empty(), "user {} kept with no connections", user_id);
            for id in owned {
                assert_eq!(registry.owner_of(*id), Some(user_id));
            }
        }
        let listed: usize = registry.users.values().map(HashSet::len).sum();
        assert_eq!(listed, registry.connection_count());
    }

    #[test]
    fn test_second_tab_keeps_single_online_entry() {
        let mut registry = ConnectionRegistry::new();
        let (h1, h2) = (ConnectionId::new(), ConnectionId::new());

        let first = registry.register(user("a"), h1, ()).unwrap();
        assert!(first.status_changed);
        assert_eq!(registry.online_user_ids(), vec![user("a")]);

        let second = registry.register(user("a"), h2, ()).unwrap();
        assert!(!second.status_changed);
        assert_eq!(registry.online_user_ids(), vec![user("a")]);

        let mut expected = vec![h1, h2];
        expected.sort();
        assert_eq!(registry.handles_for(&user("a")), expected);
        assert_consistent(&registry);
    }

    #[test]
    fn test_closing_one_tab_keeps_user_online() {
        let mut registry = ConnectionRegistry::new();
        let (h1, h2) = (ConnectionId::new(), ConnectionId::new());
        registry.register(user("a"), h1, ());
        registry.register(user("a"), h2, ());

        let change = registry.unregister(h1).unwrap();
        assert_eq!(change.kind, ChangeKind::Disconnected);
        assert!(!change.status_changed);
        assert!(registry.is_online(&user("a")));
        assert_eq!(registry.handles_for(&user("a")), vec![h2]);
    }

    #[test]
    fn test_last_tab_takes_user_offline() {
        let mut registry = ConnectionRegistry::new();
        let h1 = ConnectionId::new();
        registry.register(user("a"), h1, ());
        registry.register(user("b"), ConnectionId::new(), ());

        let change = registry.unregister(h1).unwrap();
        assert!(change.status_changed);
        assert_eq!(change.user_id, user("a"));
        assert!(!registry.is_online(&user("a")));
        assert_eq!(registry.online_user_ids(), vec![user("b")]);
        assert!(registry.handles_for(&user("a")).is_empty());
        assert_consistent(&registry);
    }

    #[test]
    fn test_double_unregister_is_noop() {
        let mut registry = ConnectionRegistry::new();
        let h1 = ConnectionId::new();
        registry.register(user("a"), h1, ());

        assert!(registry.unregister(h1).is_some());
        assert!(registry.unregister(h1).is_none());
        assert!(registry.unregister(ConnectionId::new()).is_none());
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.user_count(), 0);
    }

    #[test]
    fn test_duplicate_register_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let h1 = ConnectionId::new();

        assert!(registry.register(user("a"), h1, ()).is_some());
        assert!(registry.register(user("a"), h1, ()).is_none());
        assert_eq!(registry.handles_for(&user("a")), vec![h1]);
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_reregister_under_other_user_moves_handle() {
        let mut registry = ConnectionRegistry::new();
        let h1 = ConnectionId::new();
        registry.register(user("a"), h1, ());
        let change = registry.register(user("b"), h1, ()).unwrap();

        assert!(change.status_changed);
        let displaced = change.displaced.expect("old owner reported");
        assert_eq!(displaced.user_id, user("a"));
        assert_eq!(displaced.kind, ChangeKind::Disconnected);
        assert!(displaced.status_changed);

        assert_eq!(registry.owner_of(h1), Some(&user("b")));
        assert!(!registry.is_online(&user("a")));
        assert_eq!(registry.online_user_ids(), vec![user("b")]);
        assert_consistent(&registry);
    }

    #[test]
    fn test_sinks_for_offline_user_is_empty() {
        let registry: ConnectionRegistry<()> = ConnectionRegistry::new();
        assert_eq!(registry.sinks_for(&user("ghost")).count(), 0);
    }

    #[test]
    fn test_random_interleavings_match_open_connections() {
        let users: Vec<UserId> = (0..5).map(|i| user(&format!("u{}", i))).collect();

        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut registry = ConnectionRegistry::new();
            // Every handle ever opened, and who opened it; closed ones stay listed.
            let mut opened: Vec<(ConnectionId, UserId)> = Vec::new();
            let mut open: HashMap<ConnectionId, UserId> = HashMap::new();

            for _ in 0..400 {
                match rng.gen_range(0..4) {
                    0 | 1 => {
                        let owner = users[rng.gen_range(0..users.len())].clone();
                        let id = ConnectionId::new();
                        registry.register(owner.clone(), id, ());
                        opened.push((id, owner.clone()));
                        open.insert(id, owner);
                    }
                    2 if !opened.is_empty() => {
                        // Closing may hit an already-closed handle: a duplicate disconnect.
                        let (id, _) = opened[rng.gen_range(0..opened.len())].clone();
                        let was_open = open.remove(&id).is_some();
                        assert_eq!(registry.unregister(id).is_some(), was_open);
                    }
                    _ if !opened.is_empty() => {
                        // Reconnect race: the client re-sends its register for a live handle.
                        let (id, owner) = opened[rng.gen_range(0..opened.len())].clone();
                        if open.contains_key(&id) {
                            assert!(registry.register(owner, id, ()).is_none());
                        }
                    }
                    _ => {}
                }

                let mut expected: Vec<UserId> = open.values().cloned().collect();
                expected.sort();
                expected.dedup();
                assert_eq!(registry.online_user_ids(), expected);
                assert_consistent(&registry);
            }
        }
    }
}
