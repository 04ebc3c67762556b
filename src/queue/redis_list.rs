use std::time::Duration;

use log::{debug, info};
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client, RedisError,
};
use rocket::tokio::sync::OnceCell;

use crate::config::QueueConfig;

use super::{within, QueueError, VoteQueue};

/// Reconnection attempts before a connect is reported as failed.
const CONNECT_RETRIES: usize = 1;

/// A queue backed by a Redis list, appended to with `RPUSH`.
///
/// No connection is made until the first append. The connection manager is
/// then cached for the lifetime of the instance and shared by all requests.
pub struct RedisQueue {
    client: Client,
    address: String,
    ssl: bool,
    timeout: Duration,
    connection: OnceCell<ConnectionManager>,
}

impl RedisQueue {
    /// Describe the connection without opening it.
    pub fn new(config: &QueueConfig) -> Result<Self, RedisError> {
        let client = Client::open(config.connection_info())?;
        Ok(Self {
            client,
            address: config.address(),
            ssl: config.ssl(),
            timeout: config.timeout(),
            connection: OnceCell::new(),
        })
    }

    /// Get the cached connection, connecting if this is the first use.
    /// A failed attempt leaves the cell empty so a later request can try again.
    async fn connection(&self) -> Result<ConnectionManager, QueueError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let settings = ConnectionManagerConfig::new().set_number_of_retries(CONNECT_RETRIES);
                let manager = within(
                    self.timeout,
                    self.client.get_connection_manager_with_config(settings),
                )
                .await?;
                info!(
                    "Initialised queue connection to {} (ssl={})",
                    self.address, self.ssl
                );
                Ok::<_, QueueError>(manager)
            })
            .await?;
        Ok(connection.clone())
    }
}

#[rocket::async_trait]
impl VoteQueue for RedisQueue {
    async fn append(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        let mut connection = self.connection().await?;
        let length: usize = within(self.timeout, connection.rpush(queue, payload)).await?;
        debug!("Queue {queue} now holds {length} entries");
        Ok(())
    }
}
