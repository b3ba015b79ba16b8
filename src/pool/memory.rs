//! In-memory waiting pool implementation
//!
//! A single tokio mutex over a deque is the serialization boundary for all
//! pool mutation; `take_next` pops under the lock, so at-most-once delivery
//! holds under concurrent match requests.

use crate::error::{Result, SignalingError};
use crate::pool::WaitingPool;
use crate::types::{User, UserId};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

/// In-process FIFO waiting pool
#[derive(Debug, Default)]
pub struct InMemoryWaitingPool {
    entries: Mutex<VecDeque<User>>,
}

impl InMemoryWaitingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all queued users (shutdown teardown).
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[async_trait]
impl WaitingPool for InMemoryWaitingPool {
    async fn enqueue(&self, user: User) -> Result<()> {
        let mut entries = self.entries.lock().await;

        if entries.iter().any(|queued| queued.id == user.id) {
            return Err(SignalingError::DuplicateEntry { user_id: user.id }.into());
        }

        debug!(user_id = %user.id, depth = entries.len() + 1, "user enqueued");
        entries.push_back(user);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.lock().await.len())
    }

    async fn take_next(&self) -> Result<Option<User>> {
        let taken = self.entries.lock().await.pop_front();
        if let Some(user) = &taken {
            debug!(user_id = %user.id, "user taken from pool");
        }
        Ok(taken)
    }

    async fn remove(&self, user_id: &UserId) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|queued| &queued.id != user_id);

        if entries.len() < before {
            debug!(%user_id, "user removed from pool");
        }
        Ok(())
    }
}
