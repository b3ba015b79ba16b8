//! Prometheus metrics for the signaling service
//!
//! This module provides the metrics collector shared by the matchmaker,
//! relay, and connection layer, exposed over the `/metrics` endpoint.

use crate::error::Result;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Collector owning the service's Prometheus registry and metric handles
pub struct MetricsCollector {
    registry: Registry,

    /// Total WebSocket connections accepted
    pub connections_total: IntCounter,
    /// Total match requests processed
    pub match_requests_total: IntCounter,
    /// Total rooms created by successful pairings
    pub rooms_created_total: IntCounter,
    /// Total rooms torn down by disconnects
    pub rooms_closed_total: IntCounter,
    /// Total payloads relayed, labeled by delivery kind
    pub messages_relayed_total: IntCounterVec,

    /// Currently live connections
    pub active_sessions: IntGauge,
    /// Currently active rooms
    pub active_rooms: IntGauge,
    /// Users currently in the waiting pool
    pub users_waiting: IntGauge,
}

impl MetricsCollector {
    /// Create a collector with all metrics registered
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let connections_total = IntCounter::with_opts(Opts::new(
            "duet_room_connections_total",
            "Total WebSocket connections accepted",
        ))?;
        let match_requests_total = IntCounter::with_opts(Opts::new(
            "duet_room_match_requests_total",
            "Total match requests processed",
        ))?;
        let rooms_created_total = IntCounter::with_opts(Opts::new(
            "duet_room_rooms_created_total",
            "Total rooms created by successful pairings",
        ))?;
        let rooms_closed_total = IntCounter::with_opts(Opts::new(
            "duet_room_rooms_closed_total",
            "Total rooms torn down by disconnects",
        ))?;
        let messages_relayed_total = IntCounterVec::new(
            Opts::new(
                "duet_room_messages_relayed_total",
                "Total payloads relayed to room members",
            ),
            &["kind"],
        )?;

        let active_sessions = IntGauge::with_opts(Opts::new(
            "duet_room_active_sessions",
            "Currently live connections",
        ))?;
        let active_rooms = IntGauge::with_opts(Opts::new(
            "duet_room_active_rooms",
            "Currently active rooms",
        ))?;
        let users_waiting = IntGauge::with_opts(Opts::new(
            "duet_room_users_waiting",
            "Users currently in the waiting pool",
        ))?;

        registry.register(Box::new(connections_total.clone()))?;
        registry.register(Box::new(match_requests_total.clone()))?;
        registry.register(Box::new(rooms_created_total.clone()))?;
        registry.register(Box::new(rooms_closed_total.clone()))?;
        registry.register(Box::new(messages_relayed_total.clone()))?;
        registry.register(Box::new(active_sessions.clone()))?;
        registry.register(Box::new(active_rooms.clone()))?;
        registry.register(Box::new(users_waiting.clone()))?;

        Ok(Self {
            registry,
            connections_total,
            match_requests_total,
            rooms_created_total,
            rooms_closed_total,
            messages_relayed_total,
            active_sessions,
            active_rooms,
            users_waiting,
        })
    }

    /// Access the underlying registry for encoding
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_relayed(&self, kind: &str) {
        self.messages_relayed_total.with_label_values(&[kind]).inc();
    }
}
