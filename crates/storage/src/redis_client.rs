use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use redis::RedisError;
use redis::{self, aio, AsyncCommands};
use thiserror::Error;

use crate::KeyValueStore;

#[derive(Debug, Clone)]
pub struct RedisClient {
    connection: aio::MultiplexedConnection,
}

impl RedisClient {
    pub async fn build(redis_url: &String) -> Result<Self, RedisClientError> {
        let client = redis::Client::open(redis_url.clone())?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(RedisClient { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisClient {
    type Error = RedisClientError;

    async fn get(&self, k: &String) -> Result<Option<String>, Self::Error> {
        debug!("Getting key: {}", k);
        self.connection.clone().get(k).await.map_err(RedisClientError::RedisLibraryError)
    }

    async fn set(&self, k: &String, v: &String, duration: Duration) -> Result<(), Self::Error> {
        debug!("Setting key: {} with value: {} and expiry: {}s", k, v, duration.as_secs());
        self.connection
            .clone()
            .set_ex(k, v, duration.as_secs().max(1))
            .await
            .map_err(RedisClientError::RedisLibraryError)
    }

    async fn delete(&self, k: &String) -> Result<(), Self::Error> {
        debug!("Deleting key: {}", k);
        self.connection.clone().del(k).await.map_err(RedisClientError::RedisLibraryError)
    }
}

#[derive(Debug, Error)]
pub enum RedisClientError {
    #[error("Error thrown from Redis Library: {0}")]
    RedisLibraryError(#[from] RedisError),
}
