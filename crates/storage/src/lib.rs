use std::error::Error;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

pub use memory_store::MemoryStore;
pub use redis_client::{RedisClient, RedisClientError};

mod memory_store;
pub mod redis_client;

/// Expiring string cache used for derived values such as token prices.
#[async_trait]
pub trait KeyValueStore: Debug + Send + Sync {
    type Error: Error + Debug + Send + Sync + 'static;

    async fn get(&self, k: &String) -> Result<Option<String>, Self::Error>;

    async fn set(&self, k: &String, v: &String, expiry: Duration) -> Result<(), Self::Error>;

    async fn delete(&self, k: &String) -> Result<(), Self::Error>;
}
