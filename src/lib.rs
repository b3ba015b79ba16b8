//! Duet Room - anonymous peer pairing service
//!
//! This crate provides WebSocket-based matchmaking that pairs anonymous
//! peers into two-party rooms, relays chat and signaling payloads between
//! room members, and tears rooms down on disconnect.

pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod pool;
pub mod relay;
pub mod room;
pub mod server;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{Result, SignalingError};
pub use types::*;

// Re-export key components
pub use matchmaking::Matchmaker;
pub use pool::{InMemoryWaitingPool, WaitingPool};
pub use relay::MessagingRelay;
pub use room::RoomRegistry;
pub use session::SessionTracker;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
