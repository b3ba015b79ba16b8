//! WebSocket connection handling
//!
//! Each accepted socket gets a fresh connection id, a session entry with an
//! outbound channel, and two halves: a writer task draining that channel into
//! the socket sink, and a read loop dispatching inbound frames. When the read
//! loop ends, for any reason, the disconnect flow runs exactly once.

use crate::server::http::ServerState;
use crate::types::{ClientEvent, MatchResult, ServerEvent};
use crate::utils::generate_connection_id;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

/// Upgrade handler for the `/ws` route
pub async fn ws_handler(State(state): State<ServerState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one client connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: ServerState) {
    let connection_id = generate_connection_id();
    info!(%connection_id, "websocket connection accepted");

    state.metrics.connections_total.inc();

    let (event_tx, event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    state.sessions.register(connection_id.clone(), event_tx);
    state.metrics.active_sessions.set(state.sessions.len() as i64);

    let (mut sink, mut stream) = socket.split();

    // Writer half: everything addressed to this connection goes through the
    // session channel, serialized here in order.
    let writer = tokio::spawn(async move {
        let mut events = UnboundedReceiverStream::new(event_rx);
        while let Some(event) = events.next().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("failed to encode server event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read loop: ends on close frame, transport error, or stream end.
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => handle_frame(&state, &connection_id, text.as_str()).await,
            Message::Close(_) => {
                debug!(%connection_id, "close frame received");
                break;
            }
            Message::Binary(_) => {
                warn!(%connection_id, "binary frame dropped");
            }
            // Pings are answered by the protocol layer
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    if let Err(e) = state.matchmaker.handle_disconnect(&connection_id).await {
        error!(%connection_id, "disconnect cleanup failed: {}", e);
    }
    state.metrics.active_sessions.set(state.sessions.len() as i64);

    writer.abort();
    info!(%connection_id, "websocket connection closed");
}

/// Dispatch a single inbound text frame.
async fn handle_frame(state: &ServerState, connection_id: &str, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%connection_id, "unparseable client frame ignored: {}", e);
            return;
        }
    };

    match event {
        ClientEvent::MatchRequest { peer_id } => {
            let result = match state
                .matchmaker
                .handle_match_request(connection_id.to_string(), peer_id)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    // Pool failure surfaces as a generic unmatched response;
                    // retries belong to the queue backend, not this layer.
                    error!(%connection_id, "match request failed: {}", e);
                    MatchResult::unavailable()
                }
            };

            if let Err(e) = state
                .sessions
                .send_to(&connection_id.to_string(), ServerEvent::MatchResult(result))
            {
                warn!(%connection_id, "match result undeliverable: {}", e);
            }
        }
        ClientEvent::ChatMessage { room_id, message } => {
            if let Err(e) = state.relay.broadcast_chat(&room_id, message) {
                error!(%connection_id, %room_id, "chat relay failed: {}", e);
            }
        }
        ClientEvent::SendMessage { room_id, message } => {
            if let Err(e) = state
                .relay
                .relay_direct(&room_id, message, &connection_id.to_string())
            {
                error!(%connection_id, %room_id, "direct relay failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchmakingSettings;
    use crate::error::{Result, SignalingError};
    use crate::matchmaking::Matchmaker;
    use crate::metrics::MetricsCollector;
    use crate::pool::WaitingPool;
    use crate::relay::MessagingRelay;
    use crate::room::RoomRegistry;
    use crate::session::SessionTracker;
    use crate::types::{User, UserId};
    use std::sync::Arc;

    struct FailingPool;

    fn pool_error() -> anyhow::Error {
        SignalingError::QueueUnavailable {
            message: "backend offline".to_string(),
        }
        .into()
    }

    #[async_trait::async_trait]
    impl WaitingPool for FailingPool {
        async fn enqueue(&self, _user: User) -> Result<()> {
            Err(pool_error())
        }

        async fn count(&self) -> Result<usize> {
            Err(pool_error())
        }

        async fn take_next(&self) -> Result<Option<User>> {
            Err(pool_error())
        }

        async fn remove(&self, _user_id: &UserId) -> Result<()> {
            Err(pool_error())
        }
    }

    fn failing_pool_state() -> ServerState {
        let rooms = Arc::new(RoomRegistry::new());
        let sessions = Arc::new(SessionTracker::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let matchmaker = Arc::new(Matchmaker::new(
            Arc::new(FailingPool),
            rooms.clone(),
            sessions.clone(),
            MatchmakingSettings::default(),
            metrics.clone(),
        ));
        let relay = Arc::new(MessagingRelay::new(rooms, sessions.clone(), metrics.clone()));

        ServerState {
            matchmaker,
            relay,
            sessions,
            metrics,
            service_name: "duet-room".to_string(),
        }
    }

    #[tokio::test]
    async fn test_pool_failure_maps_to_unavailable_result() {
        let state = failing_pool_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.sessions.register("conn-1".to_string(), tx);

        handle_frame(
            &state,
            "conn-1",
            r#"{"event":"match-request","data":{"peerId":null}}"#,
        )
        .await;

        match rx.try_recv().unwrap() {
            ServerEvent::MatchResult(result) => {
                assert!(!result.matched);
                assert_eq!(result.message, "matchmaking temporarily unavailable");
                assert!(result.room.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let state = failing_pool_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.sessions.register("conn-1".to_string(), tx);

        handle_frame(&state, "conn-1", "not json").await;
        handle_frame(&state, "conn-1", r#"{"event":"no-such-event","data":{}}"#).await;

        assert!(rx.try_recv().is_err());
    }
}
