//! In-memory registry of active rooms
//!
//! Rooms are created on a successful match and live until either member
//! disconnects. Lookups happen by room id (message routing) and by member
//! connection id (disconnect cleanup); the latter is a scan over active
//! rooms, which stays cheap because rooms are two-member and short-lived.

use crate::error::{Result, SignalingError};
use crate::types::{ConnectionId, Room, RoomId};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Exclusive owner of all active room state
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created room.
    pub fn create(&self, room: Room) -> Result<()> {
        let mut rooms = self
            .rooms
            .write()
            .map_err(|_| SignalingError::InternalError {
                message: "Failed to acquire rooms lock".to_string(),
            })?;

        debug!(room_id = %room.room_id, "room registered");
        rooms.insert(room.room_id.clone(), room);
        Ok(())
    }

    /// Look up a room by its id.
    pub fn get(&self, room_id: &RoomId) -> Result<Option<Room>> {
        let rooms = self
            .rooms
            .read()
            .map_err(|_| SignalingError::InternalError {
                message: "Failed to acquire rooms lock".to_string(),
            })?;

        Ok(rooms.get(room_id).cloned())
    }

    /// Find the room (if any) that `connection_id` is a member of.
    pub fn get_by_member(&self, connection_id: &ConnectionId) -> Result<Option<Room>> {
        let rooms = self
            .rooms
            .read()
            .map_err(|_| SignalingError::InternalError {
                message: "Failed to acquire rooms lock".to_string(),
            })?;

        Ok(rooms
            .values()
            .find(|room| room.has_member(connection_id))
            .cloned())
    }

    /// Tear down a room, returning it if it was still registered.
    pub fn remove(&self, room_id: &RoomId) -> Result<Option<Room>> {
        let mut rooms = self
            .rooms
            .write()
            .map_err(|_| SignalingError::InternalError {
                message: "Failed to acquire rooms lock".to_string(),
            })?;

        let removed = rooms.remove(room_id);
        if removed.is_some() {
            debug!(%room_id, "room removed");
        }
        Ok(removed)
    }

    /// Number of active rooms.
    pub fn len(&self) -> usize {
        self.rooms.read().map(|rooms| rooms.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all rooms (shutdown teardown).
    pub fn clear(&self) {
        if let Ok(mut rooms) = self.rooms.write() {
            rooms.clear();
        }
    }
}
