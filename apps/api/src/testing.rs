//! Test doubles shared by the unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{EmbeddingCache, PersistentStore, StoreError};
use crate::config::CoreConfig;
use crate::context::CoreContext;
use crate::embedding::{
    BatchEmbedder, EmbedError, EmbeddingProvider, FallbackEmbedder, EMBEDDING_DIM,
};
use crate::resilience::{BreakerRegistry, BreakerSettings};

// ────────────────────────────────────────────────────────────────────────────
// Embedding provider
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic provider. Unscripted texts get a stable hash-seeded vector;
/// `with_vector` pins exact vectors so tests can choose cosine similarities.
pub struct ScriptedProvider {
    name: String,
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    failing: AtomicBool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dimension: EMBEDDING_DIM,
            vectors: HashMap::new(),
            delays: HashMap::new(),
            default_delay: None,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_delay(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Invocations of `embed`, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.vectors.get(text) {
            return vector.clone();
        }
        hashed_vector(text, self.dimension)
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(text).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbedError::Api {
                status: 503,
                message: format!("{} unavailable", self.name),
            });
        }
        Ok(self.vector_for(text))
    }
}

/// Pseudo-random unit-scale vector seeded from an FNV-1a hash of `text`.
fn hashed_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut state = text
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3));
    (0..dimension)
        .map(|_| {
            // splitmix64
            state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^= z >> 31;
            (z >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0
        })
        .collect()
}

/// Unit vector along axis `i`.
pub fn basis(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; EMBEDDING_DIM];
    v[i] = 1.0;
    v
}

/// Unit vector whose cosine with `basis(0)` is `cos`.
pub fn blend(cos: f32) -> Vec<f32> {
    let mut v = vec![0.0; EMBEDDING_DIM];
    v[0] = cos;
    v[1] = (1.0 - cos * cos).sqrt();
    v
}

pub fn batch_embedder(
    primary: Arc<ScriptedProvider>,
    secondary: Arc<ScriptedProvider>,
) -> (BatchEmbedder, Arc<EmbeddingCache>) {
    let config = CoreConfig::default();
    let cache = Arc::new(EmbeddingCache::from_config(&config, None));
    let breakers = Arc::new(BreakerRegistry::new(BreakerSettings::from(&config)));
    let embedder = Arc::new(FallbackEmbedder::new(
        primary,
        secondary,
        breakers,
        cache.clone(),
    ));
    (BatchEmbedder::new(embedder, cache.clone(), &config), cache)
}

pub fn test_context(
    primary: Arc<ScriptedProvider>,
    secondary: Arc<ScriptedProvider>,
) -> CoreContext {
    CoreContext::new(CoreConfig::default(), primary, secondary, None)
}

// ────────────────────────────────────────────────────────────────────────────
// Persistent stores
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, (Vec<u8>, Option<Duration>)>>,
    get_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.lock().get(key).and_then(|(_, ttl)| *ttl)
    }

    pub fn insert_raw(&self, key: &str, value: Vec<u8>) {
        self.lock().insert(key.to_string(), (value, None));
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, (Vec<u8>, Option<Duration>)>> {
        self.entries.lock().unwrap()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().get(key).map(|(value, _)| value.clone()))
    }

    async fn setex(&self, key: &str, ttl: Duration, value: Vec<u8>) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), (value, Some(ttl)));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = self.lock();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    /// Supports the trailing-`*` patterns the cache issues.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Store whose every operation fails, as an unreachable Redis would.
pub struct FailingStore;

fn unreachable_store() -> StoreError {
    StoreError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

#[async_trait]
impl PersistentStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(unreachable_store())
    }

    async fn setex(&self, _key: &str, _ttl: Duration, _value: Vec<u8>) -> Result<(), StoreError> {
        Err(unreachable_store())
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), StoreError> {
        Err(unreachable_store())
    }

    async fn scan(&self, _pattern: &str) -> Result<Vec<String>, StoreError> {
        Err(unreachable_store())
    }
}
