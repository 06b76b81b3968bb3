//! Presence Registry
//!
//! Tracks which users have live connections. Each user maps to the set of
//! their connections keyed by connection id; a user with no connections has
//! no entry at all.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use super::connection::Connection;

/// Live connections of one user.
#[derive(Default)]
struct PresenceEntry {
    connections: HashMap<String, Arc<dyn Connection>>,
}

/// What an unregistration did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The connection was not registered.
    Missing,
    /// The connection was removed; the user still has others.
    Removed,
    /// The user's last connection was removed and the entry is gone.
    WentOffline,
}

impl Removal {
    pub fn went_offline(self) -> bool {
        self == Self::WentOffline
    }
}

/// Concurrent map from user id to that user's live connections.
///
/// Entries live in a sharded map, so connects and disconnects of unrelated
/// users contend only when they hash to the same shard. Readers receive
/// snapshots and can iterate freely while the registry keeps changing.
#[derive(Default)]
pub struct PresenceRegistry {
    users: DashMap<String, PresenceEntry>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection under its user, creating the user's entry if absent.
    ///
    /// Returns `true` when this connection brought the user online.
    pub fn register(&self, connection: Arc<dyn Connection>) -> bool {
        let user_id = connection.user_id().to_string();
        let connection_id = connection.id().to_string();

        let mut entry = self.users.entry(user_id).or_default();
        let came_online = entry.connections.is_empty();
        entry.connections.insert(connection_id, connection);
        came_online
    }

    /// Remove a connection.
    ///
    /// Only the shard holding `user_id` is locked. When the last connection
    /// goes, the entry is removed before that lock is released.
    pub fn unregister(&self, user_id: &str, connection_id: &str) -> Removal {
        let mut removed = false;
        let emptied = self
            .users
            .remove_if_mut(user_id, |_, entry| {
                removed = entry.connections.remove(connection_id).is_some();
                entry.connections.is_empty()
            })
            .is_some();

        match (removed, emptied) {
            (_, true) => Removal::WentOffline,
            (true, false) => Removal::Removed,
            (false, false) => Removal::Missing,
        }
    }

    /// Snapshot of one user's connections.
    pub fn connections_for(&self, user_id: &str) -> Vec<Arc<dyn Connection>> {
        self.users
            .get(user_id)
            .map(|entry| entry.connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every registered connection.
    pub fn all_connections(&self) -> Vec<Arc<dyn Connection>> {
        self.users
            .iter()
            .flat_map(|entry| entry.connections.values().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Snapshot of the users currently online.
    pub fn all_users(&self) -> Vec<String> {
        self.users.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn connection_count(&self) -> usize {
        self.users
            .iter()
            .map(|entry| entry.connections.len())
            .sum()
    }

    #[cfg(test)]
    fn has_empty_entry(&self) -> bool {
        self.users.iter().any(|entry| entry.connections.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::websocket::connection::ChannelConnection;
    use pretty_assertions::assert_eq;

    fn connection(user_id: &str) -> Arc<dyn Connection> {
        let (conn, _rx) = ChannelConnection::new(user_id);
        Arc::new(conn)
    }

    #[test]
    fn test_register_creates_entry() {
        let registry = PresenceRegistry::new();
        let conn = connection("u1");
        registry.register(conn.clone());

        assert!(registry.is_online("u1"));
        assert_eq!(registry.connections_for("u1").len(), 1);
        assert_eq!(registry.connections_for("u1")[0].id(), conn.id());
        assert!(registry.connections_for("u2").is_empty());
    }

    #[test]
    fn test_last_connection_takes_user_offline() {
        let registry = PresenceRegistry::new();
        let first = connection("u1");
        let second = connection("u1");
        assert!(registry.register(first.clone()));
        assert!(!registry.register(second.clone()));

        assert_eq!(registry.unregister("u1", first.id()), Removal::Removed);
        assert_eq!(registry.all_users(), vec!["u1".to_string()]);

        assert_eq!(registry.unregister("u1", second.id()), Removal::WentOffline);
        assert!(registry.all_users().is_empty());
        assert!(!registry.has_empty_entry());
    }

    #[test]
    fn test_unregister_unknown_user_is_not_an_offline_transition() {
        let registry = PresenceRegistry::new();
        assert_eq!(registry.unregister("ghost", "nope"), Removal::Missing);
        assert_eq!(registry.user_count(), 0);
    }

    #[test]
    fn test_unregister_unknown_connection_of_online_user() {
        let registry = PresenceRegistry::new();
        let conn = connection("u1");
        registry.register(conn.clone());

        assert_eq!(registry.unregister("u1", "nope"), Removal::Missing);
        assert_eq!(registry.unregister("u1", conn.id()), Removal::WentOffline);
        assert_eq!(registry.unregister("u1", conn.id()), Removal::Missing);
    }

    #[test]
    fn test_snapshot_is_independent_of_later_mutation() {
        let registry = PresenceRegistry::new();
        let conn = connection("u1");
        registry.register(conn.clone());

        let snapshot = registry.all_connections();
        registry.unregister("u1", conn.id());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_counts() {
        let registry = PresenceRegistry::new();
        registry.register(connection("u1"));
        registry.register(connection("u1"));
        registry.register(connection("u2"));

        assert_eq!(registry.user_count(), 2);
        assert_eq!(registry.connection_count(), 3);
        assert_eq!(registry.all_connections().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_churn_leaves_no_empty_entries() {
        let registry = Arc::new(PresenceRegistry::new());
        let mut tasks = Vec::new();

        for task in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let user = format!("u{}", task % 4);
                for _ in 0..50 {
                    let conn = connection(&user);
                    registry.register(conn.clone());
                    tokio::task::yield_now().await;
                    registry.unregister(&user, conn.id());
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        assert!(!registry.has_empty_entry());
        assert_eq!(registry.user_count(), 0);
        assert_eq!(registry.connection_count(), 0);
    }
}
