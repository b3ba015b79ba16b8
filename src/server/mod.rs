//! HTTP and WebSocket connection layer

pub mod http;
pub mod ws;

pub use http::{create_router, ServerState};
