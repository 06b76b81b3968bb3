//! WebSocket Gateway
//!
//! Shared real-time state: the presence registry, the broadcast dispatcher and
//! the chat store the delivery pipeline writes through. One instance per
//! process, injected wherever it is needed.

use std::sync::Arc;

use serde::Serialize;

use super::connection::Connection;
use super::delivery::ChatLocks;
use super::dispatcher::{BroadcastJob, Dispatcher};
use super::messages::OutboundFrame;
use super::presence::{PresenceRegistry, Removal};
use crate::domain::{ChatStore, Message};
use crate::infrastructure::metrics;
use crate::shared::error::GatewayError;

/// Result of enqueueing one payload to a set of connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub enqueued: usize,
    pub dropped: usize,
}

/// A message that went through the delivery pipeline.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message: Message,
    pub fan_out: FanOut,
}

/// Point-in-time counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStats {
    pub online_users: usize,
    pub connections: usize,
    pub dropped_jobs: u64,
    pub queue_capacity: usize,
}

pub struct Gateway {
    registry: PresenceRegistry,
    dispatcher: Dispatcher,
    store: Arc<dyn ChatStore>,
    pub(super) chat_locks: ChatLocks,
}

impl Gateway {
    /// Create a gateway with an empty registry and an idle dispatcher.
    pub fn new(store: Arc<dyn ChatStore>, queue_capacity: usize) -> Self {
        Self {
            registry: PresenceRegistry::new(),
            dispatcher: Dispatcher::new(queue_capacity),
            store,
            chat_locks: ChatLocks::new(),
        }
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    /// Add a live connection to the registry.
    pub fn register(&self, connection: Arc<dyn Connection>) {
        tracing::info!(
            user_id = %connection.user_id(),
            connection_id = %connection.id(),
            "Connection registered"
        );
        let came_online = self.registry.register(connection);
        metrics::connection_opened(came_online);
    }

    /// Remove a connection. Returns `true` if the user went fully offline.
    pub fn unregister(&self, user_id: &str, connection_id: &str) -> bool {
        let removal = self.registry.unregister(user_id, connection_id);
        if removal == Removal::Missing {
            tracing::debug!(user_id = %user_id, connection_id = %connection_id, "Connection already gone");
            return false;
        }

        let offline = removal.went_offline();
        metrics::connection_closed(offline);
        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            offline,
            "Connection unregistered"
        );
        offline
    }

    /// Queue one payload for one connection.
    pub fn enqueue(
        &self,
        payload: Arc<OutboundFrame>,
        connection: Arc<dyn Connection>,
    ) -> Result<(), GatewayError> {
        self.dispatcher
            .enqueue(BroadcastJob::new(payload, connection))
    }

    /// Queue one payload for each of `targets`.
    ///
    /// Drops are counted rather than propagated; a closed dispatcher counts
    /// as a drop too.
    pub fn fan_out(&self, payload: OutboundFrame, targets: Vec<Arc<dyn Connection>>) -> FanOut {
        let payload = Arc::new(payload);
        let mut result = FanOut::default();

        for connection in targets {
            match self.enqueue(payload.clone(), connection) {
                Ok(()) => result.enqueued += 1,
                Err(_) => result.dropped += 1,
            }
        }

        result
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            online_users: self.registry.user_count(),
            connections: self.registry.connection_count(),
            dropped_jobs: self.dispatcher.dropped_jobs(),
            queue_capacity: self.dispatcher.capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserDisplay;
    use crate::infrastructure::repositories::MemoryChatStore;
    use crate::presentation::websocket::connection::ChannelConnection;
    use crate::presentation::websocket::messages::{ConnectionStatusMessage, PresenceChange};

    fn gateway(capacity: usize) -> Gateway {
        Gateway::new(Arc::new(MemoryChatStore::new()), capacity)
    }

    fn status() -> OutboundFrame {
        OutboundFrame::ConnectionStatus(ConnectionStatusMessage {
            change: PresenceChange::Connect,
            online_users: vec![UserDisplay::new("u1", "alice")],
        })
    }

    #[test]
    fn test_register_and_unregister_report_offline_transition() {
        let gateway = gateway(10);
        let (conn, _rx) = ChannelConnection::new("u1");
        let conn: Arc<dyn Connection> = Arc::new(conn);

        gateway.register(conn.clone());
        assert_eq!(gateway.stats().connections, 1);

        assert!(gateway.unregister("u1", conn.id()));
        assert_eq!(gateway.stats().online_users, 0);
        assert!(!gateway.unregister("u1", conn.id()));
    }

    #[tokio::test]
    async fn test_fan_out_counts_drops() {
        let gateway = gateway(2);
        let mut targets: Vec<Arc<dyn Connection>> = Vec::new();
        for _ in 0..3 {
            let (conn, _rx) = ChannelConnection::new("u2");
            targets.push(Arc::new(conn));
        }

        let result = gateway.fan_out(status(), targets);

        assert_eq!(
            result,
            FanOut {
                enqueued: 2,
                dropped: 1
            }
        );
        assert_eq!(gateway.stats().dropped_jobs, 1);
    }
}
