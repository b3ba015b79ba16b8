//! Common types used throughout the signaling service

use serde::{Deserialize, Serialize};

/// Unique identifier for users awaiting or holding a match
pub type UserId = String;

/// Unique identifier for a transport-level connection
pub type ConnectionId = String;

/// Unique identifier for rooms
pub type RoomId = String;

/// A connected user seeking (or holding) a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub connection_id: ConnectionId,
    /// External signaling address (opaque; forwarded as-is)
    pub peer_id: Option<String>,
}

/// A paired session between exactly two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: RoomId,
    /// The user whose match request created the room
    pub current_user: User,
    /// The user taken from the waiting pool
    pub available_user: User,
    pub join_url: Option<String>,
}

impl Room {
    /// The member that is not `connection_id`, if `connection_id` is a member at all.
    pub fn other_member(&self, connection_id: &str) -> Option<&User> {
        if self.current_user.connection_id == connection_id {
            Some(&self.available_user)
        } else if self.available_user.connection_id == connection_id {
            Some(&self.current_user)
        } else {
            None
        }
    }

    /// Whether `connection_id` belongs to either member.
    pub fn has_member(&self, connection_id: &str) -> bool {
        self.current_user.connection_id == connection_id
            || self.available_user.connection_id == connection_id
    }
}

/// Outcome of a match request, returned to the requester and pushed to the callee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub matched: bool,
    pub message: String,
    pub room: Option<Room>,
    /// Signaling address of the matched peer, when matched
    pub peer_id: Option<String>,
}

impl MatchResult {
    /// Result for a requester that was enqueued instead of matched.
    pub fn queued() -> Self {
        Self {
            matched: false,
            message: "queued".to_string(),
            room: None,
            peer_id: None,
        }
    }

    /// Result for a successful pairing, addressed to one side.
    /// `peer_id` is the *other* member's signaling address.
    pub fn matched(room: Room, peer_id: Option<String>) -> Self {
        Self {
            matched: true,
            message: "matched".to_string(),
            room: Some(room),
            peer_id,
        }
    }

    /// Generic failure response for a requester when the waiting pool is unavailable.
    pub fn unavailable() -> Self {
        Self {
            matched: false,
            message: "matchmaking temporarily unavailable".to_string(),
            room: None,
            peer_id: None,
        }
    }
}

/// Inbound events received on a client connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    MatchRequest {
        #[serde(rename = "peerId")]
        peer_id: Option<String>,
    },
    ChatMessage {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        message: String,
    },
    SendMessage {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        message: String,
    },
}

/// Outbound events delivered to client connections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Synchronous answer to a match request
    MatchResult(MatchResult),
    /// Pushed to the waiting user that was just paired
    MatchedAsCallee(MatchResult),
    /// Room-wide chat broadcast
    ChatMessage { message: String },
    /// Direct relay to the non-sender, carrying the sender's connection id
    ReceiveMessage { message: String, from: ConnectionId },
    /// The other room member went away
    DisconnectNotice { message: String },
}
