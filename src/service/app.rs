//! Main application state and service coordination
//!
//! This module contains the production AppState that owns the component
//! graph (waiting pool, room registry, session tracker, matchmaker, relay,
//! metrics), constructed once at startup and passed explicitly to every
//! consumer. There are no global singletons.

use crate::config::AppConfig;
use crate::matchmaking::Matchmaker;
use crate::metrics::MetricsCollector;
use crate::pool::InMemoryWaitingPool;
use crate::relay::MessagingRelay;
use crate::room::RoomRegistry;
use crate::server::{create_router, ServerState};
use crate::session::SessionTracker;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Server error: {message}")]
    Server { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Core matchmaking components
    pool: Arc<InMemoryWaitingPool>,
    rooms: Arc<RoomRegistry>,
    sessions: Arc<SessionTracker>,
    matchmaker: Arc<Matchmaker>,
    relay: Arc<MessagingRelay>,

    /// Metrics collector backing the /metrics endpoint
    metrics: Arc<MetricsCollector>,

    /// Server task handle and its shutdown signal
    server_task: Option<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
    started_at: Instant,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing duet-room signaling service");
        info!(
            "Configuration: service={}, bind={}",
            config.service.name,
            config.bind_address()
        );

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let pool = Arc::new(InMemoryWaitingPool::new());
        let rooms = Arc::new(RoomRegistry::new());
        let sessions = Arc::new(SessionTracker::new());

        let matchmaker = Arc::new(Matchmaker::new(
            pool.clone(),
            rooms.clone(),
            sessions.clone(),
            config.matchmaking.clone(),
            metrics.clone(),
        ));
        let relay = Arc::new(MessagingRelay::new(
            rooms.clone(),
            sessions.clone(),
            metrics.clone(),
        ));

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            pool,
            rooms,
            sessions,
            matchmaker,
            relay,
            metrics,
            server_task: None,
            shutdown_tx,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Bind the listener and start serving connections
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting duet-room signaling service");

        let addr: SocketAddr =
            self.config
                .bind_address()
                .parse()
                .map_err(|e| ServiceError::Configuration {
                    message: format!("Invalid bind address: {}", e),
                })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServiceError::Server {
                message: format!("Failed to bind {}: {}", addr, e),
            })?;

        let router = create_router(ServerState {
            matchmaker: self.matchmaker.clone(),
            relay: self.relay.clone(),
            sessions: self.sessions.clone(),
            metrics: self.metrics.clone(),
            service_name: self.config.service.name.clone(),
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let server_task = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Server shutdown signal received");
            });

            if let Err(e) = serve.await {
                error!("Server error: {}", e);
            }
        });
        self.server_task = Some(server_task);

        *self.is_running.write().await = true;
        info!("✅ duet-room signaling service listening on {}", addr);
        Ok(())
    }

    /// Perform graceful shutdown: stop the server, then tear down all state.
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of duet-room service");

        *self.is_running.write().await = false;

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to server: {}", e);
        }

        if let Some(task) = self.server_task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Server task ended abnormally: {}", e);
                }
            }
        }

        // Documented teardown: drop all live state so nothing survives the
        // process in a half-open shape.
        let final_stats = self.matchmaker.stats().map_err(|e| ServiceError::Server {
            message: format!("Failed to get final stats: {}", e),
        })?;
        self.pool.clear().await;
        self.rooms.clear();
        self.sessions.clear();

        info!("Final service statistics: {:?}", final_stats);
        info!("✅ duet-room service shutdown completed");
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the matchmaker for stats and health checks
    pub fn matchmaker(&self) -> Arc<Matchmaker> {
        self.matchmaker.clone()
    }

    /// Get the session tracker
    pub fn sessions(&self) -> Arc<SessionTracker> {
        self.sessions.clone()
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Seconds since the state was constructed
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        // Port 0 lets the OS pick a free port; binding still succeeds.
        config.server.http_port = 0;
        config
    }

    #[tokio::test]
    async fn test_new_builds_component_graph() {
        let state = AppState::new(AppConfig::default()).unwrap();
        assert!(!state.is_running().await);
        assert_eq!(state.matchmaker().active_rooms(), 0);
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut state = AppState::new(test_config()).unwrap();
        state.start().await.unwrap();
        assert!(state.is_running().await);

        state.shutdown().await.unwrap();
        assert!(!state.is_running().await);
        assert!(state.sessions().is_empty());
    }
}
