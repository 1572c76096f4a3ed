//! Two-Tier Cache — bounded in-process LRU (L1) over an optional persistent store (L2).
//!
//! Keys starting with a reserved prefix (`ind:`, `role:`, `score:`) are used verbatim
//! in both tiers. Any other key is MD5-hashed: L1 stores the bare hex digest, L2
//! stores it under `emb:<hex>`.
//!
//! One mutex guards L1 and the counters. It is never held across L2 I/O; an L2 hit
//! re-acquires it briefly to promote the value into L1. L2 failures are logged and
//! treated as misses / no-ops.

pub mod lru;
pub mod store;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::embedding::{Embedding, EMBEDDING_DIM};

use self::lru::LruMap;
pub use self::store::{PersistentStore, RedisStore, StoreError};

/// Prefixes of caller-namespaced keys that bypass hashing.
pub const RESERVED_PREFIXES: [&str; 3] = ["ind:", "role:", "score:"];

/// L2 namespace used for hashed keys.
const EMBEDDING_NAMESPACE: &str = "emb:";

/// Patterns removed from L2 by `clear()`.
const CLEAR_PATTERNS: [&str; 4] = ["emb:*", "ind:*", "role:*", "score:*"];

/// A cached value. Embeddings are shared read-only slices; everything else is
/// opaque JSON written by higher layers.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Embedding(Embedding),
    Json(Arc<Value>),
}

impl CacheValue {
    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        let bytes = match self {
            CacheValue::Embedding(vector) => serde_json::to_vec(&vector[..])?,
            CacheValue::Json(value) => serde_json::to_vec(value.as_ref())?,
        };
        Ok(bytes)
    }

    /// Decodes an L2 payload. Hashed keys only ever hold full-width embeddings;
    /// reserved keys hold opaque JSON.
    fn decode(bytes: &[u8], reserved: bool) -> Result<Self, StoreError> {
        if reserved {
            let value: Value = serde_json::from_slice(bytes)?;
            return Ok(CacheValue::Json(Arc::new(value)));
        }
        let vector: Vec<f32> = serde_json::from_slice(bytes)?;
        if vector.len() != EMBEDDING_DIM {
            return Err(StoreError::NotAnEmbedding {
                expected: EMBEDDING_DIM,
                actual: vector.len(),
            });
        }
        Ok(CacheValue::Embedding(Embedding::from(vector)))
    }
}

/// Resolved L1 / L2 keys for a caller-supplied key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub l1: String,
    pub l2: String,
    pub reserved: bool,
}

impl CacheKey {
    pub fn new(key: &str) -> Self {
        if RESERVED_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
            return Self {
                l1: key.to_string(),
                l2: key.to_string(),
                reserved: true,
            };
        }
        let digest = format!("{:x}", md5::compute(key.as_bytes()));
        Self {
            l2: format!("{EMBEDDING_NAMESPACE}{digest}"),
            l1: digest,
            reserved: false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    l1_hits: u64,
    l2_hits: u64,
    misses: u64,
    total_requests: u64,
    zero_vector_fallbacks: u64,
}

struct CacheInner {
    l1: LruMap<CacheValue>,
    counters: Counters,
}

/// Snapshot of cache counters. Rates are percentages rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub zero_vector_fallbacks: u64,
    pub hit_rate: f64,
    pub l1_hit_rate: f64,
    pub l2_hit_rate: f64,
    pub l1_size: usize,
    pub l1_max_size: usize,
}

pub struct EmbeddingCache {
    inner: Mutex<CacheInner>,
    store: Option<Arc<dyn PersistentStore>>,
    ttl: Duration,
}

impl EmbeddingCache {
    pub fn new(l1_size: usize, ttl: Duration, store: Option<Arc<dyn PersistentStore>>) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                l1: LruMap::new(l1_size),
                counters: Counters::default(),
            }),
            store,
            ttl,
        }
    }

    pub fn from_config(config: &CoreConfig, store: Option<Arc<dyn PersistentStore>>) -> Self {
        Self::new(config.l1_cache_size, config.embedding_cache_ttl, store)
    }

    pub fn has_persistent_tier(&self) -> bool {
        self.store.is_some()
    }

    /// L1 → L2 → miss. Every call counts towards `total_requests`.
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        let key = CacheKey::new(key);

        {
            let mut inner = self.lock();
            inner.counters.total_requests += 1;
            if let Some(value) = inner.l1.get(&key.l1).cloned() {
                inner.counters.l1_hits += 1;
                return Some(value);
            }
        }

        if let Some(value) = self.get_from_store(&key).await {
            let mut inner = self.lock();
            inner.counters.l2_hits += 1;
            if let Some(evicted) = inner.l1.insert(key.l1, value.clone()) {
                debug!("L1 cache evicted key: {}...", short_key(&evicted));
            }
            return Some(value);
        }

        self.lock().counters.misses += 1;
        None
    }

    /// Writes through both tiers. `ttl` overrides the configured L2 TTL.
    pub async fn set(&self, key: &str, value: CacheValue, ttl: Option<Duration>) {
        let key = CacheKey::new(key);

        let encoded = match &self.store {
            Some(_) => match value.encode() {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("Cache value could not be encoded for L2: {e}");
                    None
                }
            },
            None => None,
        };

        {
            let mut inner = self.lock();
            if let Some(evicted) = inner.l1.insert(key.l1.clone(), value) {
                debug!("L1 cache evicted key: {}...", short_key(&evicted));
            }
        }

        if let (Some(store), Some(bytes)) = (&self.store, encoded) {
            let ttl = ttl.unwrap_or(self.ttl);
            if let Err(e) = store.setex(&key.l2, ttl, bytes).await {
                warn!("Redis set error for {}: {e}", key.l2);
            }
        }
    }

    /// Typed read for embeddings. Non-embedding values under the key read as a miss.
    pub async fn get_embedding(&self, text: &str) -> Option<Embedding> {
        match self.get(text).await? {
            CacheValue::Embedding(vector) if vector.len() == EMBEDDING_DIM => Some(vector),
            _ => None,
        }
    }

    pub async fn set_embedding(&self, text: &str, vector: Embedding) {
        self.set(text, CacheValue::Embedding(vector), None).await;
    }

    /// Typed read for opaque namespaced values (`ind:`, `role:`, `score:`).
    pub async fn get_json(&self, key: &str) -> Option<Arc<Value>> {
        match self.get(key).await? {
            CacheValue::Json(value) => Some(value),
            CacheValue::Embedding(_) => None,
        }
    }

    pub async fn set_json(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.set(key, CacheValue::Json(Arc::new(value)), ttl).await;
    }

    pub fn record_zero_vector_fallback(&self) {
        self.lock().counters.zero_vector_fallbacks += 1;
    }

    /// Drops every L1 entry, resets counters and deletes all cache namespaces from L2.
    pub async fn clear(&self) {
        {
            let mut inner = self.lock();
            inner.l1.clear();
            inner.counters = Counters::default();
        }

        if let Some(store) = &self.store {
            for pattern in CLEAR_PATTERNS {
                let result = match store.scan(pattern).await {
                    Ok(keys) => store.delete(&keys).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    warn!("Redis clear error for {pattern}: {e}");
                }
            }
        }

        info!("Cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let c = inner.counters;
        let rate = |hits: u64| {
            if c.total_requests == 0 {
                0.0
            } else {
                round2(hits as f64 / c.total_requests as f64 * 100.0)
            }
        };

        CacheStats {
            l1_hits: c.l1_hits,
            l2_hits: c.l2_hits,
            misses: c.misses,
            total_requests: c.total_requests,
            zero_vector_fallbacks: c.zero_vector_fallbacks,
            hit_rate: rate(c.l1_hits + c.l2_hits),
            l1_hit_rate: rate(c.l1_hits),
            l2_hit_rate: rate(c.l2_hits),
            l1_size: inner.l1.len(),
            l1_max_size: inner.l1.capacity(),
        }
    }

    async fn get_from_store(&self, key: &CacheKey) -> Option<CacheValue> {
        let store = self.store.as_ref()?;
        match store.get(&key.l2).await {
            Ok(Some(bytes)) => match CacheValue::decode(&bytes, key.reserved) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Redis value for {} could not be decoded: {e}", key.l2);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Redis get error for {}: {e}", key.l2);
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn short_key(key: &str) -> &str {
    key.get(..8).unwrap_or(key)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
