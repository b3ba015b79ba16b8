//! Waiting pool abstraction for users awaiting a match
//!
//! The pool is the durable FIFO work queue the matchmaker draws from. The
//! trait mirrors the backing store's job-queue surface (add with a dedupe
//! key, count, take-next-with-removal, remove-by-key) so an external queue
//! backend can be substituted for the in-memory implementation.

pub mod memory;

pub use memory::InMemoryWaitingPool;

use crate::error::Result;
use crate::types::{User, UserId};
use async_trait::async_trait;

/// FIFO pool of users seeking a match.
///
/// Every operation is an I/O boundary from the caller's perspective: callers
/// must tolerate the pool changing between calls (a `count` followed by a
/// `take_next` may find the pool drained). A backend that cannot reach its
/// store fails with `SignalingError::QueueUnavailable`.
#[async_trait]
pub trait WaitingPool: Send + Sync {
    /// Insert a user at the tail. Fails with `SignalingError::DuplicateEntry`
    /// if a user with the same id is already queued; re-enqueue after removal
    /// is permitted.
    async fn enqueue(&self, user: User) -> Result<()>;

    /// Number of users currently waiting.
    async fn count(&self) -> Result<usize>;

    /// Atomically remove and return the head, or `None` when empty.
    /// Linearizable: two concurrent callers never receive the same user.
    async fn take_next(&self) -> Result<Option<User>>;

    /// Remove a specific entry regardless of position; no-op if absent.
    async fn remove(&self, user_id: &UserId) -> Result<()>;
}
