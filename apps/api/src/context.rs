//! `CoreContext` — cache, breakers, provider chain and config, built once at
//! startup and passed to every scoring call.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{CacheStats, EmbeddingCache, PersistentStore, RedisStore};
use crate::config::CoreConfig;
use crate::embedding::{BatchEmbedder, EmbeddingProvider, FallbackEmbedder};
use crate::matching::{compute_compatibility, CompatibilityReport};
use crate::models::{ParsedCv, ParsedJd};
use crate::resilience::{BreakerRegistry, BreakerSettings, BreakerStats};

pub struct CoreContext {
    config: CoreConfig,
    cache: Arc<EmbeddingCache>,
    breakers: Arc<BreakerRegistry>,
    batch: BatchEmbedder,
}

impl CoreContext {
    pub fn new(
        config: CoreConfig,
        primary: Arc<dyn EmbeddingProvider>,
        secondary: Arc<dyn EmbeddingProvider>,
        store: Option<Arc<dyn PersistentStore>>,
    ) -> Self {
        let cache = Arc::new(EmbeddingCache::from_config(&config, store));
        let breakers = Arc::new(BreakerRegistry::new(BreakerSettings::from(&config)));
        let embedder = Arc::new(FallbackEmbedder::new(
            primary,
            secondary,
            breakers.clone(),
            cache.clone(),
        ));
        let batch = BatchEmbedder::new(embedder, cache.clone(), &config);

        Self {
            config,
            cache,
            breakers,
            batch,
        }
    }

    /// Like `new`, connecting L2 from `config.redis_url`. An unreachable Redis
    /// leaves the cache L1-only instead of failing startup.
    pub async fn connect(
        config: CoreConfig,
        primary: Arc<dyn EmbeddingProvider>,
        secondary: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let store: Option<Arc<dyn PersistentStore>> = match config.redis_url.as_deref() {
            Some(url) => match RedisStore::connect(url).await {
                Ok(store) => Some(Arc::new(store)),
                Err(e) => {
                    warn!("Redis connection failed: {e}. Using L1 cache only");
                    None
                }
            },
            None => {
                info!("REDIS_URL not set; using L1 cache only");
                None
            }
        };
        Self::new(config, primary, secondary, store)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    pub fn batch(&self) -> &BatchEmbedder {
        &self.batch
    }

    pub async fn compute_compatibility(&self, cv: &ParsedCv, jd: &ParsedJd) -> CompatibilityReport {
        compute_compatibility(self, cv, jd).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub fn breaker_stats(&self) -> Vec<BreakerStats> {
        self.breakers.all_stats()
    }
}
