//! Test fixtures shared by the integration tests

use duet_room::config::MatchmakingSettings;
use duet_room::matchmaking::Matchmaker;
use duet_room::metrics::MetricsCollector;
use duet_room::pool::InMemoryWaitingPool;
use duet_room::relay::MessagingRelay;
use duet_room::room::RoomRegistry;
use duet_room::session::SessionTracker;
use duet_room::types::ServerEvent;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// A fully wired component graph, the same shape the service builds at startup.
pub struct TestSystem {
    pub matchmaker: Arc<Matchmaker>,
    pub relay: Arc<MessagingRelay>,
    pub sessions: Arc<SessionTracker>,
    pub rooms: Arc<RoomRegistry>,
}

impl TestSystem {
    pub fn new() -> Self {
        let pool = Arc::new(InMemoryWaitingPool::new());
        let rooms = Arc::new(RoomRegistry::new());
        let sessions = Arc::new(SessionTracker::new());
        let metrics = Arc::new(MetricsCollector::new().expect("metrics registry"));

        let matchmaker = Arc::new(Matchmaker::new(
            pool,
            rooms.clone(),
            sessions.clone(),
            MatchmakingSettings::default(),
            metrics.clone(),
        ));
        let relay = Arc::new(MessagingRelay::new(
            rooms.clone(),
            sessions.clone(),
            metrics,
        ));

        Self {
            matchmaker,
            relay,
            sessions,
            rooms,
        }
    }

    /// Simulate a socket accept: register an outbound channel for the
    /// connection and hand the receiving end to the test.
    pub fn connect(&self, connection_id: &str) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.register(connection_id.to_string(), tx);
        rx
    }
}

/// Drain a receiver and return every event queued so far.
pub fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
