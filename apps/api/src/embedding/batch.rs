//! Batch Embedder — bounded-concurrency embedding with an overall deadline.
//!
//! Up to `min(len, max_workers)` single-text embeds run at once. Results are
//! slotted back by input index, so output order always matches input order.
//! Slots still unfinished when the deadline fires are zero-filled.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use super::{zero_embedding, Embedding, FallbackEmbedder, ProviderLabel};
use crate::cache::EmbeddingCache;
use crate::config::CoreConfig;

pub struct BatchEmbedder {
    embedder: Arc<FallbackEmbedder>,
    cache: Arc<EmbeddingCache>,
    max_workers: usize,
    default_deadline: Duration,
}

impl BatchEmbedder {
    pub fn new(
        embedder: Arc<FallbackEmbedder>,
        cache: Arc<EmbeddingCache>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            embedder,
            cache,
            max_workers: config.max_workers.max(1),
            default_deadline: config.embedding_timeout,
        }
    }

    /// Cache → provider chain → write-back. Zero fallbacks are never cached.
    pub async fn embed_one(&self, text: &str, use_cache: bool) -> Embedding {
        if text.trim().is_empty() {
            return zero_embedding();
        }

        if use_cache {
            if let Some(vector) = self.cache.get_embedding(text).await {
                return vector;
            }
        }

        let (vector, label) = self.embedder.embed(text).await;
        if use_cache && label != ProviderLabel::ZeroFallback {
            self.cache.set_embedding(text, vector.clone()).await;
        }
        vector
    }

    /// Embeds `texts` concurrently. `deadline` overrides the configured batch timeout.
    pub async fn embed_batch(
        &self,
        texts: &[String],
        use_cache: bool,
        deadline: Option<Duration>,
    ) -> Vec<Embedding> {
        if texts.is_empty() {
            return Vec::new();
        }

        let deadline_at = Instant::now() + deadline.unwrap_or(self.default_deadline);
        let workers = self.max_workers.min(texts.len());
        let mut slots: Vec<Option<Embedding>> = vec![None; texts.len()];

        let mut pending = stream::iter(texts.iter().cloned().enumerate())
            .map(|(index, text)| async move { (index, self.embed_one(&text, use_cache).await) })
            .buffer_unordered(workers);

        loop {
            match timeout_at(deadline_at, pending.next()).await {
                Ok(Some((index, vector))) => slots[index] = Some(vector),
                Ok(None) => break,
                Err(_) => {
                    let unfinished = slots.iter().filter(|slot| slot.is_none()).count();
                    warn!(
                        "Batch embedding deadline exceeded; zero-filling {unfinished} of {} slots",
                        texts.len()
                    );
                    break;
                }
            }
        }
        drop(pending);

        debug!("Embedded batch of {} texts with {workers} workers", texts.len());

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    self.cache.record_zero_vector_fallback();
                    zero_embedding()
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{is_zero_embedding, EMBEDDING_DIM};
    use crate::resilience::{BreakerRegistry, BreakerSettings};
    use crate::testing::ScriptedProvider;

    fn batch_with(
        primary: Arc<ScriptedProvider>,
        secondary: Arc<ScriptedProvider>,
        config: &CoreConfig,
    ) -> (BatchEmbedder, Arc<EmbeddingCache>) {
        let cache = Arc::new(EmbeddingCache::from_config(config, None));
        let breakers = Arc::new(BreakerRegistry::new(BreakerSettings::from(config)));
        let embedder = Arc::new(FallbackEmbedder::new(
            primary,
            secondary,
            breakers,
            cache.clone(),
        ));
        (BatchEmbedder::new(embedder, cache.clone(), config), cache)
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_input_does_no_work() {
        let primary = Arc::new(ScriptedProvider::new("gemini"));
        let (batch, cache) = batch_with(
            primary.clone(),
            Arc::new(ScriptedProvider::new("openai")),
            &CoreConfig::default(),
        );
        assert!(batch.embed_batch(&[], true, None).await.is_empty());
        assert_eq!(primary.calls(), 0);
        assert_eq!(cache.stats().total_requests, 0);
    }

    #[tokio::test]
    async fn test_output_order_matches_input_order() {
        let primary = Arc::new(
            ScriptedProvider::new("gemini")
                .with_delay("first", Duration::from_millis(30))
                .with_delay("second", Duration::from_millis(10)),
        );
        let (batch, _) = batch_with(
            primary.clone(),
            Arc::new(ScriptedProvider::new("openai")),
            &CoreConfig::default(),
        );

        let input = texts(&["first", "second", "third"]);
        let vectors = batch.embed_batch(&input, false, None).await;

        assert_eq!(vectors.len(), 3);
        for (text, vector) in input.iter().zip(&vectors) {
            assert_eq!(&vector[..], primary.vector_for(text).as_slice());
        }
    }

    #[tokio::test]
    async fn test_blank_entries_shortcut_to_zero() {
        let primary = Arc::new(ScriptedProvider::new("gemini"));
        let (batch, cache) = batch_with(
            primary.clone(),
            Arc::new(ScriptedProvider::new("openai")),
            &CoreConfig::default(),
        );

        let vectors = batch.embed_batch(&texts(&["", "Rust", "  "]), true, None).await;
        assert!(is_zero_embedding(&vectors[0]));
        assert!(!is_zero_embedding(&vectors[1]));
        assert!(is_zero_embedding(&vectors[2]));
        assert_eq!(primary.calls(), 1);
        assert_eq!(cache.stats().zero_vector_fallbacks, 0);
    }

    #[tokio::test]
    async fn test_second_batch_is_served_from_cache() {
        let primary = Arc::new(ScriptedProvider::new("gemini"));
        let (batch, cache) = batch_with(
            primary.clone(),
            Arc::new(ScriptedProvider::new("openai")),
            &CoreConfig::default(),
        );
        let input = texts(&["Python", "AWS"]);

        let first = batch.embed_batch(&input, true, None).await;
        let second = batch.embed_batch(&input, true, None).await;

        assert_eq!(first, second);
        assert_eq!(primary.calls(), 2);
        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.l1_hits, 2);
    }

    #[tokio::test]
    async fn test_use_cache_false_bypasses_cache() {
        let primary = Arc::new(ScriptedProvider::new("gemini"));
        let (batch, cache) = batch_with(
            primary.clone(),
            Arc::new(ScriptedProvider::new("openai")),
            &CoreConfig::default(),
        );
        let input = texts(&["Python"]);
        batch.embed_batch(&input, false, None).await;
        batch.embed_batch(&input, false, None).await;

        assert_eq!(primary.calls(), 2);
        assert_eq!(cache.stats().total_requests, 0);
    }

    #[tokio::test]
    async fn test_zero_fallback_is_not_cached() {
        let primary = Arc::new(ScriptedProvider::new("gemini"));
        primary.set_failing(true);
        let secondary = Arc::new(ScriptedProvider::new("openai"));
        secondary.set_failing(true);
        let (batch, cache) = batch_with(primary.clone(), secondary.clone(), &CoreConfig::default());

        let input = texts(&["Terraform"]);
        let vectors = batch.embed_batch(&input, true, None).await;
        assert!(is_zero_embedding(&vectors[0]));

        primary.set_failing(false);
        let vectors = batch.embed_batch(&input, true, None).await;
        assert!(!is_zero_embedding(&vectors[0]));
        assert_eq!(cache.stats().zero_vector_fallbacks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_zero_fills_unfinished_slots() {
        let primary = Arc::new(
            ScriptedProvider::new("gemini").with_delay("slow", Duration::from_secs(120)),
        );
        let (batch, cache) = batch_with(
            primary.clone(),
            Arc::new(ScriptedProvider::new("openai")),
            &CoreConfig::default(),
        );

        let input = texts(&["fast", "slow", "also fast"]);
        let vectors = batch
            .embed_batch(&input, true, Some(Duration::from_secs(5)))
            .await;

        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0].len(), EMBEDDING_DIM);
        assert!(!is_zero_embedding(&vectors[0]));
        assert!(is_zero_embedding(&vectors[1]));
        assert!(!is_zero_embedding(&vectors[2]));
        assert_eq!(cache.stats().zero_vector_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_worker_count_is_bounded() {
        let config = CoreConfig {
            max_workers: 2,
            ..CoreConfig::default()
        };
        let primary = Arc::new(
            ScriptedProvider::new("gemini").with_default_delay(Duration::from_millis(5)),
        );
        let (batch, _) = batch_with(
            primary.clone(),
            Arc::new(ScriptedProvider::new("openai")),
            &config,
        );

        let input: Vec<String> = (0..6).map(|i| format!("skill {i}")).collect();
        batch.embed_batch(&input, false, None).await;

        assert_eq!(primary.calls(), 6);
        assert!(primary.max_in_flight() <= 2);
    }
}
