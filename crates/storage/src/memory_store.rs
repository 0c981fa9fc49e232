use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::KeyValueStore;

/// Process local store, entries are dropped lazily on read once expired.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    async fn get(&self, k: &String) -> Result<Option<String>, Self::Error> {
        let mut map = self.map.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match map.get(k) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                map.remove(k);
                Ok(None)
            }
            Some((v, _)) => Ok(Some(v.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, k: &String, v: &String, expiry: Duration) -> Result<(), Self::Error> {
        let mut map = self.map.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.insert(k.clone(), (v.clone(), Instant::now() + expiry));
        Ok(())
    }

    async fn delete(&self, k: &String) -> Result<(), Self::Error> {
        let mut map = self.map.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.remove(k);
        Ok(())
    }
}
