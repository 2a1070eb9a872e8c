// presence-server/src/presence/service.rs
use common::{ConnectionId, ServerEvent, UserId};

use super::{gateway, publisher, ConnectionRegistry, EventSink, PresenceChange};

/// Registry plus the reactions to its mutations.
///
/// Every effective mutation is followed by an online-users broadcast before
/// the method returns, so callers that serialise access (the hub actor)
/// get mutate, snapshot and broadcast as one step.
pub struct PresenceService<S> {
    registry: ConnectionRegistry<S>,
}

impl<S> Default for PresenceService<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> PresenceService<S> {
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
        }
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.registry.is_online(user_id)
    }

    pub fn online_user_ids(&self) -> Vec<UserId> {
        self.registry.online_user_ids()
    }

    pub fn handles_for(&self, user_id: &UserId) -> Vec<ConnectionId> {
        self.registry.handles_for(user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    pub fn user_count(&self) -> usize {
        self.registry.user_count()
    }
}

impl<S: EventSink> PresenceService<S> {
    pub fn connect(
        &mut self,
        user_id: UserId,
        connection_id: ConnectionId,
        sink: S,
    ) -> Option<PresenceChange> {
        let change = self.registry.register(user_id, connection_id, sink)?;
        if let Some(previous) = change.displaced.as_deref() {
            if previous.status_changed {
                tracing::info!("User {} is offline", previous.user_id);
            }
        }
        if change.status_changed {
            tracing::info!("User {} is online", change.user_id);
        }
        tracing::info!(
            "Connection {} registered for user {} ({} live)",
            connection_id,
            change.user_id,
            self.registry.handles_for(&change.user_id).len()
        );

        self.publish();
        Some(change)
    }

    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<PresenceChange> {
        let Some(change) = self.registry.unregister(connection_id) else {
            tracing::debug!("Ignoring disconnect of unknown connection {}", connection_id);
            return None;
        };

        tracing::info!("Connection {} unregistered for user {}", connection_id, change.user_id);
        if change.status_changed {
            tracing::info!("User {} is offline", change.user_id);
        }

        self.publish();
        Some(change)
    }

    /// Returns how many connections accepted the event.
    pub fn deliver_to_user(&mut self, user_id: &UserId, event: &ServerEvent) -> usize {
        let result = gateway::deliver_to_user(&self.registry, user_id, event);
        self.prune(result.closed);
        result.delivered
    }

    fn publish(&mut self) {
        let result = publisher::broadcast_online_users(&self.registry);
        self.prune(result.closed);
    }

    /// Unregister connections found dead during a fan-out. Each removal is
    /// itself a mutation, so the roster is re-broadcast after it.
    fn prune(&mut self, mut closed: Vec<ConnectionId>) {
        while let Some(connection_id) = closed.pop() {
            if let Some(change) = self.registry.unregister(connection_id) {
                tracing::info!(
                    "Pruned dead connection {} of user {}",
                    connection_id,
                    change.user_id
                );
                closed.extend(publisher::broadcast_online_users(&self.registry).closed);
            }
        }
    }
}
