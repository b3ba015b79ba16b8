//! Main application configuration
//!
//! This module defines the primary configuration structures for the duet-room
//! signaling service, including environment variable loading and validation.

use crate::error::SignalingError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub server: ServerSettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// HTTP/WebSocket server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
    /// Port for the HTTP and WebSocket endpoints
    pub http_port: u16,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakingSettings {
    /// Path prefix used to build the join URL handed to matched pairs
    pub room_url_prefix: String,
    /// Notice text delivered to the surviving member of a torn-down room
    pub disconnect_notice: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "duet-room".to_string(),
            log_level: "info".to_string(),
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 5555,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            room_url_prefix: "/room".to_string(),
            disconnect_notice: "Your peer has disconnected.".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Server settings
        if let Ok(host) = env::var("HTTP_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            config.server.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }

        // Matchmaking settings
        if let Ok(prefix) = env::var("ROOM_URL_PREFIX") {
            config.matchmaking.room_url_prefix = prefix;
        }
        if let Ok(notice) = env::var("DISCONNECT_NOTICE") {
            config.matchmaking.disconnect_notice = notice;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        let config: Self = toml::from_str(&contents).with_context(|| {
            format!("Failed to parse config file: {}", path.as_ref().display())
        })?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Socket address string for the HTTP server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => {
            return Err(config_error(format!(
                "Invalid log level: {}",
                config.service.log_level
            )))
        }
    }

    // Validate ports
    if config.server.http_port == 0 {
        return Err(config_error("HTTP port cannot be 0".to_string()));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(config_error(
            "Shutdown timeout must be greater than 0".to_string(),
        ));
    }

    // Validate matchmaking settings
    if config.matchmaking.room_url_prefix.is_empty() {
        return Err(config_error("Room URL prefix cannot be empty".to_string()));
    }
    if !config.matchmaking.room_url_prefix.starts_with('/') {
        return Err(config_error(format!(
            "Room URL prefix must be an absolute path: {}",
            config.matchmaking.room_url_prefix
        )));
    }

    Ok(())
}

fn config_error(message: String) -> anyhow::Error {
    SignalingError::ConfigurationError { message }.into()
}
