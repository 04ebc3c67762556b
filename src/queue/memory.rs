use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rocket::serde::json::serde_json;

use crate::model::vote::VoteRecord;

use super::{within, QueueError, VoteQueue, VOTES};

/// How long a stalled queue keeps a request waiting.
pub const STALL_LIMIT: Duration = Duration::from_millis(50);

/// How a [`MemoryQueue`] answers appends.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Mode {
    /// Record every append.
    Online,
    /// Refuse every append straight away.
    Offline,
    /// Never answer, so every append times out.
    Stalled,
}

/// An in-process queue that remembers what was appended to it.
/// Clones share the same storage, so a test can keep one handle while Rocket owns another.
#[derive(Debug, Clone)]
pub struct MemoryQueue {
    mode: Mode,
    appended: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemoryQueue {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            appended: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every successful append so far, in order.
    pub fn appended(&self) -> Vec<(String, Vec<u8>)> {
        self.appended.lock().unwrap().clone()
    }

    /// Decode everything appended to the vote queue.
    pub fn records(&self) -> Vec<VoteRecord> {
        self.appended()
            .into_iter()
            .filter(|(queue, _)| queue == VOTES)
            .map(|(_, payload)| serde_json::from_slice(&payload).unwrap())
            .collect()
    }
}

#[rocket::async_trait]
impl VoteQueue for MemoryQueue {
    async fn append(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        match self.mode {
            Mode::Online => {
                self.appended
                    .lock()
                    .unwrap()
                    .push((queue.to_string(), payload));
                Ok(())
            }
            Mode::Offline => Err(QueueError::Unavailable("connection refused".to_string())),
            Mode::Stalled => within(STALL_LIMIT, pending::<Result<(), QueueError>>()).await,
        }
    }
}
