//! Two-tier TTL cache: an in-process map in front of a persistent
//! key-value store.
//!
//! Both tiers hold the same envelope, `{"val": <payload>, "exp": <epoch ms>}`.
//! An entry is valid while `now < exp`. Expired, malformed or undecodable
//! entries read as absent and are never surfaced as errors. There is no
//! eviction beyond expiry and no size bound.

use crate::clock::Clock;
use crate::store::KeyValueStore;
use common::errors::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    val: serde_json::Value,
    exp: i64,
}

impl CacheEntry {
    fn is_live(&self, now: i64) -> bool {
        now < self.exp
    }
}

pub struct TtlCache {
    memory: RwLock<HashMap<String, CacheEntry>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            store,
            clock,
        }
    }

    /// Memory first, then the persistent store. A live store hit is promoted
    /// into memory so the next lookup never touches the store.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now_millis();

        {
            let memory = self.memory.read().await;
            if let Some(entry) = memory.get(key)
                && entry.is_live(now)
            {
                debug!(key, tier = "memory", "Cache hit");
                return decode(key, &entry.val);
            }
        }

        let raw = self.store.get_item(key)?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "Malformed cache envelope, treating as miss");
                return None;
            }
        };

        if !entry.is_live(now) {
            debug!(key, "Cache entry expired");
            return None;
        }

        let value = decode(key, &entry.val)?;
        debug!(key, tier = "store", "Cache hit, promoting to memory");
        self.memory.write().await.insert(key.to_string(), entry);
        Some(value)
    }

    /// Unconditionally overwrite `key` in both tiers with `exp = now + ttl`.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), AppError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = CacheEntry {
            val: serde_json::to_value(value)?,
            exp: self.clock.now_millis().saturating_add(ttl_ms),
        };
        let envelope = serde_json::to_string(&entry)?;

        self.memory.write().await.insert(key.to_string(), entry);

        if let Err(e) = self.store.set_item(key, &envelope) {
            warn!(key, error = %e, "Failed to persist cache entry; kept in memory only");
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(key: &str, val: &serde_json::Value) -> Option<T> {
    match T::deserialize(val) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(key, error = %e, "Cached payload has unexpected shape, treating as miss");
            None
        }
    }
}
