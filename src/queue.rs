//! The external queue that accepted votes are handed to.
//!
//! Route handlers only ever see [`Queue`], a boxed [`VoteQueue`] kept in
//! managed state, so the backend can be swapped without touching them.

use std::future::Future;
use std::ops::Deref;
use std::time::Duration;

use redis::RedisError;
use rocket::tokio::time::timeout;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
mod redis_list;

#[cfg(test)]
pub use memory::{MemoryQueue, Mode};
pub use redis_list::RedisQueue;

/// Name of the queue the tally worker consumes.
pub const VOTES: &str = "votes";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Redis(#[from] RedisError),
    #[error("Queue did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

/// An append-only queue service.
#[rocket::async_trait]
pub trait VoteQueue: Send + Sync {
    /// Append `payload` to the tail of `queue`.
    async fn append(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError>;
}

/// The queue client shared by every request this instance serves.
pub struct Queue(Box<dyn VoteQueue>);

impl Queue {
    pub fn new<Q>(queue: Q) -> Self
    where
        Q: VoteQueue + 'static,
    {
        Self(Box::new(queue))
    }
}

impl Deref for Queue {
    type Target = dyn VoteQueue;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Run a queue operation, giving up with [`QueueError::Timeout`] once `limit` elapses.
pub(crate) async fn within<F, T, E>(limit: Duration, operation: F) -> Result<T, QueueError>
where
    F: Future<Output = Result<T, E>>,
    QueueError: From<E>,
{
    timeout(limit, operation)
        .await
        .map_err(|_| QueueError::Timeout(limit))?
        .map_err(QueueError::from)
}
