//! Error types for the signaling service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific signaling scenarios
#[derive(Debug, thiserror::Error)]
pub enum SignalingError {
    #[error("User already queued: {user_id}")]
    DuplicateEntry { user_id: String },

    #[error("Peer connection not reachable: {connection_id}")]
    PeerUnreachable { connection_id: String },

    #[error("Waiting pool unavailable: {message}")]
    QueueUnavailable { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
