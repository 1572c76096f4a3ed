use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::matching::weights::ScoringWeights;

/// Settings record consumed by the scoring core.
/// The core never reads the environment itself; the binary builds this via `Config::from_env`.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// L2 TTL for embeddings written without an explicit TTL.
    pub embedding_cache_ttl: Duration,
    /// Max L1 entries before LRU eviction.
    pub l1_cache_size: usize,
    /// Deadline for a whole `embed_batch` call.
    pub embedding_timeout: Duration,
    /// Upper bound on concurrent single-text embeds within one batch.
    pub max_workers: usize,
    /// L2 connection string. `None` runs the cache L1-only.
    pub redis_url: Option<String>,
    pub cb_failure_threshold: u32,
    pub cb_recovery_timeout: Duration,
    pub cb_half_open_requests: u32,
    /// When false, provider calls bypass breaker bookkeeping entirely.
    pub enable_circuit_breaker: bool,
    /// Per-call HTTP timeout applied by the embedding providers.
    pub provider_timeout: Duration,
    /// Retries on 429 / 5xx before a provider call is counted as failed.
    pub provider_max_retries: u32,
    pub scoring: ScoringWeights,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            embedding_cache_ttl: Duration::from_secs(86_400),
            l1_cache_size: 1024,
            embedding_timeout: Duration::from_secs(30),
            max_workers: 8,
            redis_url: None,
            cb_failure_threshold: 5,
            cb_recovery_timeout: Duration::from_secs(60),
            cb_half_open_requests: 2,
            enable_circuit_breaker: true,
            provider_timeout: Duration::from_secs(10),
            provider_max_retries: 2,
            scoring: ScoringWeights::default(),
        }
    }
}

/// Process configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,
    pub gemini_api_key: String,
    pub openai_api_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = CoreConfig::default();
        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let core = CoreConfig {
            embedding_cache_ttl: Duration::from_secs(env_or(
                "EMBEDDING_CACHE_TTL",
                defaults.embedding_cache_ttl.as_secs(),
            )?),
            l1_cache_size: env_or("L1_CACHE_SIZE", defaults.l1_cache_size)?,
            embedding_timeout: Duration::from_secs(env_or(
                "EMBEDDING_TIMEOUT",
                defaults.embedding_timeout.as_secs(),
            )?),
            max_workers: env_or("MAX_WORKERS", defaults.max_workers)?,
            redis_url,
            cb_failure_threshold: env_or("CB_FAILURE_THRESHOLD", defaults.cb_failure_threshold)?,
            cb_recovery_timeout: Duration::from_secs(env_or(
                "CB_RECOVERY_TIMEOUT",
                defaults.cb_recovery_timeout.as_secs(),
            )?),
            cb_half_open_requests: env_or("CB_HALF_OPEN_REQUESTS", defaults.cb_half_open_requests)?,
            enable_circuit_breaker: env_or(
                "ENABLE_CIRCUIT_BREAKER",
                defaults.enable_circuit_breaker,
            )?,
            ..defaults
        };

        Ok(Config {
            core,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            openai_api_key: require_env("OPENAI_API_KEY")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads and parses an optional variable, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
