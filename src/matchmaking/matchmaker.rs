//! Matchmaker implementation
//!
//! This module provides the core Matchmaker that pairs each incoming match
//! request with the waiting pool's head or enqueues the requester, creates
//! and tears down rooms, and drives disconnect cleanup.

use crate::config::MatchmakingSettings;
use crate::error::{Result, SignalingError};
use crate::metrics::MetricsCollector;
use crate::pool::WaitingPool;
use crate::room::RoomRegistry;
use crate::session::SessionTracker;
use crate::types::{ConnectionId, MatchResult, Room, ServerEvent, User};
use crate::utils::{generate_room_id, generate_user_id};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Statistics about matchmaker operations
#[derive(Debug, Clone, Default)]
pub struct MatchmakerStats {
    /// Total match requests handled
    pub match_requests: u64,
    /// Total users placed in the waiting pool
    pub users_queued: u64,
    /// Total rooms created
    pub rooms_created: u64,
    /// Total rooms torn down by disconnects
    pub rooms_closed: u64,
}

/// The matchmaking core
pub struct Matchmaker {
    pool: Arc<dyn WaitingPool>,
    rooms: Arc<RoomRegistry>,
    sessions: Arc<SessionTracker>,
    settings: MatchmakingSettings,
    stats: RwLock<MatchmakerStats>,
    metrics: Arc<MetricsCollector>,
}

impl Matchmaker {
    pub fn new(
        pool: Arc<dyn WaitingPool>,
        rooms: Arc<RoomRegistry>,
        sessions: Arc<SessionTracker>,
        settings: MatchmakingSettings,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            pool,
            rooms,
            sessions,
            settings,
            stats: RwLock::new(MatchmakerStats::default()),
            metrics,
        }
    }

    /// Handle a match request from a connection.
    ///
    /// Pairs the requester with the waiting pool's head, or enqueues the
    /// requester when the pool is empty (or was drained by a concurrent
    /// taker between `count` and `take_next`). On a successful pairing the
    /// taken user is notified on its own connection, best-effort.
    pub async fn handle_match_request(
        &self,
        connection_id: ConnectionId,
        peer_id: Option<String>,
    ) -> Result<MatchResult> {
        self.metrics.match_requests_total.inc();
        {
            let mut stats = self.stats_mut()?;
            stats.match_requests += 1;
        }

        let user = User {
            id: generate_user_id(),
            connection_id: connection_id.clone(),
            peer_id,
        };

        info!(
            user_id = %user.id,
            connection_id = %user.connection_id,
            "processing match request"
        );

        // The connection identifies itself here; bind before any suspension
        // point so disconnect cleanup sees it.
        self.sessions.bind(&connection_id, user.clone());

        if self.pool.count().await? == 0 {
            return self.enqueue_requester(user).await;
        }

        let Some(available) = self.pool.take_next().await? else {
            // Lost the race with a concurrent taker; fall back to queueing.
            debug!(user_id = %user.id, "pool drained concurrently, queueing requester");
            return self.enqueue_requester(user).await;
        };

        if available.connection_id == connection_id {
            // The same connection requested again while queued. Drop the
            // stale entry instead of pairing a user with itself.
            debug!(
                connection_id = %connection_id,
                stale_user_id = %available.id,
                "re-request from queued connection, replacing stale entry"
            );
            return self.enqueue_requester(user).await;
        }

        let room = self.create_room(user, available.clone())?;
        self.metrics
            .users_waiting
            .set(self.pool.count().await? as i64);

        // Notify the taken user on its own connection. A vanished callee does
        // not fail the requester; its disconnect cleanup will tear the room down.
        let callee_result =
            MatchResult::matched(room.clone(), room.current_user.peer_id.clone());
        if let Err(e) = self
            .sessions
            .send_to(&available.connection_id, ServerEvent::MatchedAsCallee(callee_result))
        {
            warn!(
                connection_id = %available.connection_id,
                room_id = %room.room_id,
                "matched peer unreachable: {}", e
            );
        }

        Ok(MatchResult::matched(room, available.peer_id))
    }

    /// Handle a connection loss: remove the user from the waiting pool and
    /// from any room it belongs to, notifying the surviving peer. Idempotent;
    /// unbind happens last so lookups stay valid throughout.
    pub async fn handle_disconnect(&self, connection_id: &ConnectionId) -> Result<()> {
        let Some(user) = self.sessions.lookup(connection_id) else {
            // Connection never identified itself; just drop the raw session.
            self.sessions.unbind(connection_id);
            return Ok(());
        };

        info!(user_id = %user.id, %connection_id, "processing disconnect");

        self.pool.remove(&user.id).await?;
        self.metrics
            .users_waiting
            .set(self.pool.count().await? as i64);

        if let Some(room) = self.rooms.get_by_member(connection_id)? {
            if self.rooms.remove(&room.room_id)?.is_some() {
                {
                    let mut stats = self.stats_mut()?;
                    stats.rooms_closed += 1;
                }
                self.metrics.rooms_closed_total.inc();
                self.metrics.active_rooms.set(self.rooms.len() as i64);

                info!(room_id = %room.room_id, "room torn down by disconnect");
            }

            if let Some(peer) = room.other_member(connection_id) {
                let notice = ServerEvent::DisconnectNotice {
                    message: self.settings.disconnect_notice.clone(),
                };
                if let Err(e) = self.sessions.send_to(&peer.connection_id, notice) {
                    warn!(
                        connection_id = %peer.connection_id,
                        room_id = %room.room_id,
                        "disconnect notice undeliverable: {}", e
                    );
                }
            }
        }

        self.sessions.unbind(connection_id);
        Ok(())
    }

    /// Get current matchmaker statistics
    pub fn stats(&self) -> Result<MatchmakerStats> {
        let stats = self.stats.read().map_err(|_| SignalingError::InternalError {
            message: "Failed to acquire stats lock".to_string(),
        })?;
        Ok(stats.clone())
    }

    /// Number of users currently waiting
    pub async fn waiting_count(&self) -> Result<usize> {
        self.pool.count().await
    }

    /// Number of currently active rooms
    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    async fn enqueue_requester(&self, user: User) -> Result<MatchResult> {
        let user_id = user.id.clone();

        match self.pool.enqueue(user).await {
            Ok(()) => {
                let mut stats = self.stats_mut()?;
                stats.users_queued += 1;
            }
            Err(e) => match e.downcast_ref::<SignalingError>() {
                // Already queued: idempotent no-op, never surfaced.
                Some(SignalingError::DuplicateEntry { .. }) => {
                    debug!(%user_id, "duplicate enqueue ignored");
                }
                _ => return Err(e),
            },
        }

        self.metrics
            .users_waiting
            .set(self.pool.count().await? as i64);

        info!(%user_id, "no peer available, user queued");
        Ok(MatchResult::queued())
    }

    fn create_room(&self, requester: User, available: User) -> Result<Room> {
        let room_id = generate_room_id();
        let join_url = format!(
            "{}?roomId={}",
            self.settings.room_url_prefix, room_id
        );

        let room = Room {
            room_id: room_id.clone(),
            current_user: requester,
            available_user: available,
            join_url: Some(join_url),
        };
        self.rooms.create(room.clone())?;

        {
            let mut stats = self.stats_mut()?;
            stats.rooms_created += 1;
        }
        self.metrics.rooms_created_total.inc();
        self.metrics.active_rooms.set(self.rooms.len() as i64);

        info!(
            %room_id,
            caller = %room.current_user.id,
            callee = %room.available_user.id,
            "room created"
        );
        Ok(room)
    }

    fn stats_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, MatchmakerStats>> {
        self.stats.write().map_err(|_| {
            SignalingError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::InMemoryWaitingPool;
    use crate::types::UserId;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio_test::assert_ok;

    struct TestHarness {
        matchmaker: Arc<Matchmaker>,
        sessions: Arc<SessionTracker>,
        rooms: Arc<RoomRegistry>,
    }

    fn harness() -> TestHarness {
        let pool = Arc::new(InMemoryWaitingPool::new());
        let rooms = Arc::new(RoomRegistry::new());
        let sessions = Arc::new(SessionTracker::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let matchmaker = Arc::new(Matchmaker::new(
            pool,
            rooms.clone(),
            sessions.clone(),
            MatchmakingSettings::default(),
            metrics,
        ));

        TestHarness {
            matchmaker,
            sessions,
            rooms,
        }
    }

    impl TestHarness {
        fn connect(&self, connection_id: &str) -> UnboundedReceiver<ServerEvent> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.sessions.register(connection_id.to_string(), tx);
            rx
        }
    }

    #[tokio::test]
    async fn test_first_requester_is_queued() {
        let h = harness();
        let _rx = h.connect("conn-x");

        let result = h
            .matchmaker
            .handle_match_request("conn-x".to_string(), None)
            .await
            .unwrap();

        assert!(!result.matched);
        assert_eq!(result.message, "queued");
        assert!(result.room.is_none());
        assert_eq!(h.matchmaker.waiting_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_requester_is_matched_and_callee_notified() {
        let h = harness();
        let mut rx_x = h.connect("conn-x");
        let _rx_y = h.connect("conn-y");

        h.matchmaker
            .handle_match_request("conn-x".to_string(), Some("peer-x".to_string()))
            .await
            .unwrap();
        let result = h
            .matchmaker
            .handle_match_request("conn-y".to_string(), Some("peer-y".to_string()))
            .await
            .unwrap();

        assert!(result.matched);
        assert_eq!(result.message, "matched");
        assert_eq!(result.peer_id.as_deref(), Some("peer-x"));

        let room = result.room.unwrap();
        assert_eq!(room.current_user.connection_id, "conn-y");
        assert_eq!(room.available_user.connection_id, "conn-x");
        assert!(room
            .join_url
            .as_deref()
            .unwrap()
            .starts_with("/room?roomId="));

        // The waiting user receives the async callee-side notification
        match rx_x.recv().await.unwrap() {
            ServerEvent::MatchedAsCallee(callee) => {
                assert!(callee.matched);
                assert_eq!(callee.room.unwrap().room_id, room.room_id);
                assert_eq!(callee.peer_id.as_deref(), Some("peer-y"));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        assert_eq!(h.matchmaker.waiting_count().await.unwrap(), 0);
        assert_eq!(h.matchmaker.active_rooms(), 1);
    }

    #[tokio::test]
    async fn test_pairing_survives_unreachable_callee() {
        let h = harness();
        let rx_x = h.connect("conn-x");
        let _rx_y = h.connect("conn-y");

        h.matchmaker
            .handle_match_request("conn-x".to_string(), None)
            .await
            .unwrap();

        // Callee's channel is gone but its session row is still there
        drop(rx_x);

        let result = h
            .matchmaker
            .handle_match_request("conn-y".to_string(), None)
            .await
            .unwrap();
        assert!(result.matched);
        assert_eq!(h.matchmaker.active_rooms(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_tears_down_room_and_notifies_peer() {
        let h = harness();
        let _rx_x = h.connect("conn-x");
        let mut rx_y = h.connect("conn-y");

        h.matchmaker
            .handle_match_request("conn-x".to_string(), None)
            .await
            .unwrap();
        h.matchmaker
            .handle_match_request("conn-y".to_string(), None)
            .await
            .unwrap();
        assert_eq!(h.matchmaker.active_rooms(), 1);

        h.matchmaker
            .handle_disconnect(&"conn-x".to_string())
            .await
            .unwrap();

        assert_eq!(h.matchmaker.active_rooms(), 0);
        assert!(h.rooms.is_empty());
        assert!(h.sessions.lookup(&"conn-x".to_string()).is_none());

        // Survivor is told
        let mut saw_notice = false;
        while let Ok(event) = rx_y.try_recv() {
            if let ServerEvent::DisconnectNotice { message } = event {
                assert!(!message.is_empty());
                saw_notice = true;
            }
        }
        assert!(saw_notice);
    }

    #[tokio::test]
    async fn test_disconnect_removes_queued_user() {
        let h = harness();
        let _rx_x = h.connect("conn-x");

        h.matchmaker
            .handle_match_request("conn-x".to_string(), None)
            .await
            .unwrap();
        assert_eq!(h.matchmaker.waiting_count().await.unwrap(), 1);

        h.matchmaker
            .handle_disconnect(&"conn-x".to_string())
            .await
            .unwrap();
        assert_eq!(h.matchmaker.waiting_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let h = harness();
        let _rx_x = h.connect("conn-x");
        let _rx_y = h.connect("conn-y");

        h.matchmaker
            .handle_match_request("conn-x".to_string(), None)
            .await
            .unwrap();
        h.matchmaker
            .handle_match_request("conn-y".to_string(), None)
            .await
            .unwrap();

        assert_ok!(h.matchmaker.handle_disconnect(&"conn-x".to_string()).await);
        assert_ok!(h.matchmaker.handle_disconnect(&"conn-x".to_string()).await);

        assert_eq!(h.matchmaker.active_rooms(), 0);
        let stats = h.matchmaker.stats().unwrap();
        assert_eq!(stats.rooms_closed, 1);
    }

    #[tokio::test]
    async fn test_rerequest_from_queued_connection_does_not_self_pair() {
        let h = harness();
        let _rx_x = h.connect("conn-x");

        h.matchmaker
            .handle_match_request("conn-x".to_string(), None)
            .await
            .unwrap();
        let result = h
            .matchmaker
            .handle_match_request("conn-x".to_string(), None)
            .await
            .unwrap();

        assert!(!result.matched);
        assert_eq!(h.matchmaker.active_rooms(), 0);
        assert_eq!(h.matchmaker.waiting_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_n_requests_create_floor_n_over_2_rooms() {
        let h = harness();

        for i in 0..7 {
            let conn = format!("conn-{}", i);
            let _rx = h.connect(&conn);
            h.matchmaker.handle_match_request(conn, None).await.unwrap();
        }

        let stats = h.matchmaker.stats().unwrap();
        assert_eq!(stats.rooms_created, 3); // floor(7/2)
        assert_eq!(h.matchmaker.active_rooms(), 3);
        assert_eq!(h.matchmaker.waiting_count().await.unwrap(), 1);
    }

    struct FailingPool;

    #[async_trait::async_trait]
    impl WaitingPool for FailingPool {
        async fn enqueue(&self, _user: User) -> Result<()> {
            Err(SignalingError::QueueUnavailable {
                message: "backend offline".to_string(),
            }
            .into())
        }

        async fn count(&self) -> Result<usize> {
            Err(SignalingError::QueueUnavailable {
                message: "backend offline".to_string(),
            }
            .into())
        }

        async fn take_next(&self) -> Result<Option<User>> {
            Err(SignalingError::QueueUnavailable {
                message: "backend offline".to_string(),
            }
            .into())
        }

        async fn remove(&self, _user_id: &UserId) -> Result<()> {
            Err(SignalingError::QueueUnavailable {
                message: "backend offline".to_string(),
            }
            .into())
        }
    }

    #[tokio::test]
    async fn test_pool_backend_failure_propagates() {
        let sessions = Arc::new(SessionTracker::new());
        let matchmaker = Matchmaker::new(
            Arc::new(FailingPool),
            Arc::new(RoomRegistry::new()),
            sessions.clone(),
            MatchmakingSettings::default(),
            Arc::new(MetricsCollector::new().unwrap()),
        );

        let (tx, _rx) = mpsc::unbounded_channel();
        sessions.register("conn-x".to_string(), tx);

        let err = matchmaker
            .handle_match_request("conn-x".to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SignalingError>(),
            Some(SignalingError::QueueUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_fifo_matching_order() {
        let h = harness();
        for conn in ["conn-a", "conn-b", "conn-c"] {
            let _rx = h.connect(conn);
            h.matchmaker
                .handle_match_request(conn.to_string(), None)
                .await
                .unwrap();
        }

        // a and b paired first; c still waits
        let room = h.rooms.get_by_member(&"conn-a".to_string()).unwrap().unwrap();
        assert!(room.has_member("conn-b"));
        assert!(h
            .rooms
            .get_by_member(&"conn-c".to_string())
            .unwrap()
            .is_none());
    }
}
