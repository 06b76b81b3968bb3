//! Presence Announcer
//!
//! Broadcasts the current online-user list to every registered connection
//! whenever someone connects or goes fully offline.

use super::gateway::{FanOut, Gateway};
use super::messages::{ConnectionStatusMessage, OutboundFrame, PresenceChange};
use crate::infrastructure::metrics;
use crate::shared::error::GatewayError;

impl Gateway {
    /// Announce a presence change to all online users.
    ///
    /// If the online users cannot be resolved the announcement is skipped, so
    /// clients never see a partial list.
    pub async fn announce(&self, change: PresenceChange) -> Result<FanOut, GatewayError> {
        let online = self.registry().all_users();
        if online.is_empty() {
            return Ok(FanOut::default());
        }

        let online_users = match self.store().resolve_users(&online).await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(
                    change = change.as_str(),
                    error = %e,
                    "Could not resolve online users, skipping announcement"
                );
                return Err(GatewayError::Persistence(e));
            }
        };

        if online_users.len() != online.len() {
            let missing: Vec<String> = online
                .iter()
                .filter(|id| !online_users.iter().any(|u| &u.id == *id))
                .cloned()
                .collect();
            tracing::warn!(
                change = change.as_str(),
                missing = ?missing,
                "Online users without a display record, skipping announcement"
            );
            return Err(GatewayError::UnresolvedUsers(missing));
        }

        let frame = OutboundFrame::ConnectionStatus(ConnectionStatusMessage {
            change,
            online_users,
        });
        let fan_out = self.fan_out(frame, self.registry().all_connections());

        metrics::record_announcement(change.as_str());
        tracing::debug!(
            change = change.as_str(),
            online = online.len(),
            enqueued = fan_out.enqueued,
            dropped = fan_out.dropped,
            "Presence announced"
        );

        Ok(fan_out)
    }
}
