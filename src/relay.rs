//! Messaging relay routing payloads between room members
//!
//! Payloads are opaque to the relay; SDP/ICE signaling and chat text travel
//! the same path. An unknown or already-removed room drops the message
//! silently because the peer may legitimately have disconnected first.

use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::room::RoomRegistry;
use crate::session::SessionTracker;
use crate::types::{ConnectionId, RoomId, ServerEvent};
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes chat and signaling payloads to the members of a room
pub struct MessagingRelay {
    rooms: Arc<RoomRegistry>,
    sessions: Arc<SessionTracker>,
    metrics: Arc<MetricsCollector>,
}

impl MessagingRelay {
    pub fn new(
        rooms: Arc<RoomRegistry>,
        sessions: Arc<SessionTracker>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            rooms,
            sessions,
            metrics,
        }
    }

    /// Deliver a chat message to the whole room, sender included.
    pub fn broadcast_chat(&self, room_id: &RoomId, message: String) -> Result<()> {
        let Some(room) = self.rooms.get(room_id)? else {
            debug!(%room_id, "chat message for unknown room dropped");
            return Ok(());
        };

        let event = ServerEvent::ChatMessage { message };
        for member in [&room.current_user, &room.available_user] {
            if let Err(e) = self.sessions.send_to(&member.connection_id, event.clone()) {
                warn!(
                    connection_id = %member.connection_id,
                    %room_id,
                    "chat delivery failed: {}", e
                );
            }
        }

        self.metrics.record_relayed("chat");
        Ok(())
    }

    /// Deliver a payload to the room member that is not the sender.
    pub fn relay_direct(
        &self,
        room_id: &RoomId,
        message: String,
        sender_connection_id: &ConnectionId,
    ) -> Result<()> {
        let Some(room) = self.rooms.get(room_id)? else {
            debug!(%room_id, "direct message for unknown room dropped");
            return Ok(());
        };

        let Some(recipient) = room.other_member(sender_connection_id) else {
            debug!(
                %room_id,
                connection_id = %sender_connection_id,
                "direct message from non-member dropped"
            );
            return Ok(());
        };

        let event = ServerEvent::ReceiveMessage {
            message,
            from: sender_connection_id.clone(),
        };
        if let Err(e) = self.sessions.send_to(&recipient.connection_id, event) {
            warn!(
                connection_id = %recipient.connection_id,
                %room_id,
                "direct delivery failed: {}", e
            );
            return Ok(());
        }

        self.metrics.record_relayed("direct");
        Ok(())
    }
}
