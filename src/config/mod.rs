//! Configuration for the duet-room signaling service

pub mod app;

pub use app::{validate_config, AppConfig, MatchmakingSettings, ServerSettings, ServiceSettings};
