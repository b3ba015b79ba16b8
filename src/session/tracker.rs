//! Session tracker mapping connections to users and outbound channels
//!
//! Each live connection registers an outbound channel handle on accept and is
//! bound to a user record once it identifies itself with a match request.
//! Delivery goes through the tracker exclusively; nothing in the service
//! enumerates live sockets.

use crate::error::{Result, SignalingError};
use crate::types::{ConnectionId, ServerEvent, User};
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

struct Session {
    user: Option<User>,
    sender: UnboundedSender<ServerEvent>,
}

/// Live mapping from transport connection to user identity and channel handle
#[derive(Default)]
pub struct SessionTracker {
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh connection's outbound channel. Called on socket accept,
    /// before the connection has identified itself.
    pub fn register(&self, connection_id: ConnectionId, sender: UnboundedSender<ServerEvent>) {
        if let Ok(mut sessions) = self.sessions.write() {
            debug!(%connection_id, "session registered");
            sessions.insert(connection_id, Session { user: None, sender });
        }
    }

    /// Bind the user record a connection represents. No-op for unknown
    /// connections (the socket already went away).
    pub fn bind(&self, connection_id: &ConnectionId, user: User) {
        if let Ok(mut sessions) = self.sessions.write() {
            if let Some(session) = sessions.get_mut(connection_id) {
                session.user = Some(user);
            }
        }
    }

    /// The user record bound to a connection, if it has identified itself.
    pub fn lookup(&self, connection_id: &ConnectionId) -> Option<User> {
        self.sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.get(connection_id).and_then(|s| s.user.clone()))
    }

    /// Drop a connection's session entry entirely.
    pub fn unbind(&self, connection_id: &ConnectionId) {
        if let Ok(mut sessions) = self.sessions.write() {
            if sessions.remove(connection_id).is_some() {
                debug!(%connection_id, "session unbound");
            }
        }
    }

    /// Deliver an event to one connection. Fails with `PeerUnreachable` when
    /// the connection is gone or its channel is closed; callers treat that as
    /// best-effort and log.
    pub fn send_to(&self, connection_id: &ConnectionId, event: ServerEvent) -> Result<()> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| SignalingError::InternalError {
                message: "Failed to acquire sessions lock".to_string(),
            })?;

        let session =
            sessions
                .get(connection_id)
                .ok_or_else(|| SignalingError::PeerUnreachable {
                    connection_id: connection_id.clone(),
                })?;

        session
            .sender
            .send(event)
            .map_err(|_| SignalingError::PeerUnreachable {
                connection_id: connection_id.clone(),
            })?;

        Ok(())
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .map(|sessions| sessions.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all sessions (shutdown teardown).
    pub fn clear(&self) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.clear();
        }
    }
}
