//! Utility functions for the signaling service

use uuid::Uuid;

/// Length of the short identifiers handed out to users and rooms.
/// Collision probability is negligible at the scale of a single process.
const SHORT_ID_LEN: usize = 5;

/// Generate a new short user ID
pub fn generate_user_id() -> String {
    short_id()
}

/// Generate a new short room ID
pub fn generate_room_id() -> String {
    short_id()
}

/// Generate a full-length connection ID
pub fn generate_connection_id() -> String {
    Uuid::new_v4().to_string()
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..SHORT_ID_LEN].to_string()
}
