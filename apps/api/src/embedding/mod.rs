//! Embedding Provider — primary → secondary → zero-vector fallback chain.
//!
//! Every provider call goes through the provider's circuit breaker. A result of
//! the wrong width is rejected and counted as a provider failure. When both
//! providers fail the caller gets the all-zero sentinel and the cache's
//! `zero_vector_fallbacks` counter is incremented; nothing is raised.

pub mod batch;
pub mod gemini;
mod http;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::EmbeddingCache;
use crate::resilience::{BreakerRegistry, CircuitError};

pub use batch::BatchEmbedder;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Width of every embedding handled by the core.
pub const EMBEDDING_DIM: usize = 768;

/// A read-only embedding vector, shared between the cache and callers.
pub type Embedding = Arc<[f32]>;

pub fn zero_embedding() -> Embedding {
    Embedding::from(vec![0.0_f32; EMBEDDING_DIM])
}

pub fn is_zero_embedding(vector: &[f32]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider returned no embedding")]
    EmptyContent,

    #[error("Expected a {expected}-dim embedding, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Circuit breaker '{0}' is open")]
    CircuitOpen(String),
}

impl From<CircuitError<EmbedError>> for EmbedError {
    fn from(err: CircuitError<EmbedError>) -> Self {
        match err {
            CircuitError::Open { name, .. } => EmbedError::CircuitOpen(name),
            CircuitError::Inner(e) => e,
        }
    }
}

/// A remote text-embedding backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable name; also keys the provider's circuit breaker.
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Which link of the chain produced an embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderLabel {
    Primary,
    Secondary,
    ZeroFallback,
}

/// The fallback chain over two providers. Total: always yields a vector.
pub struct FallbackEmbedder {
    primary: Arc<dyn EmbeddingProvider>,
    secondary: Arc<dyn EmbeddingProvider>,
    breakers: Arc<BreakerRegistry>,
    cache: Arc<EmbeddingCache>,
}

impl FallbackEmbedder {
    pub fn new(
        primary: Arc<dyn EmbeddingProvider>,
        secondary: Arc<dyn EmbeddingProvider>,
        breakers: Arc<BreakerRegistry>,
        cache: Arc<EmbeddingCache>,
    ) -> Self {
        Self {
            primary,
            secondary,
            breakers,
            cache,
        }
    }

    pub async fn embed(&self, text: &str) -> (Embedding, ProviderLabel) {
        if text.trim().is_empty() {
            return (zero_embedding(), ProviderLabel::ZeroFallback);
        }

        let primary_error = match self.attempt(self.primary.as_ref(), text).await {
            Ok(vector) => return (vector, ProviderLabel::Primary),
            Err(e) => e,
        };
        warn!(
            "{} embeddings failed: {primary_error}. Falling back to {}",
            self.primary.name(),
            self.secondary.name()
        );

        match self.attempt(self.secondary.as_ref(), text).await {
            Ok(vector) => {
                debug!("Embedding generated using {}", self.secondary.name());
                (vector, ProviderLabel::Secondary)
            }
            Err(e) => {
                warn!(
                    "Both embedding providers failed ({e}); using zero vector for: {}...",
                    preview(text)
                );
                self.cache.record_zero_vector_fallback();
                (zero_embedding(), ProviderLabel::ZeroFallback)
            }
        }
    }

    async fn attempt(
        &self,
        provider: &dyn EmbeddingProvider,
        text: &str,
    ) -> Result<Embedding, EmbedError> {
        let breaker = self.breakers.get(provider.name());
        let vector = breaker
            .call(move || async move {
                let raw = provider.embed(text).await?;
                validate_dimension(raw)
            })
            .await?;
        Ok(vector)
    }
}

fn validate_dimension(raw: Vec<f32>) -> Result<Embedding, EmbedError> {
    if raw.len() != EMBEDDING_DIM {
        return Err(EmbedError::DimensionMismatch {
            expected: EMBEDDING_DIM,
            actual: raw.len(),
        });
    }
    Ok(Embedding::from(raw))
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
