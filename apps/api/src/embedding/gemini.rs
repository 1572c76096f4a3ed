//! Gemini `text-embedding-004` provider (768 dims, primary).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::JsonClient;
use super::{EmbedError, EmbeddingProvider};
use crate::config::CoreConfig;

const GEMINI_EMBED_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent";
pub const GEMINI_MODEL: &str = "models/text-embedding-004";

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

pub struct GeminiProvider {
    client: JsonClient,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, config: &CoreConfig) -> Result<Self, EmbedError> {
        Ok(Self {
            client: JsonClient::new(config.provider_timeout, config.provider_max_retries)?,
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let request = EmbedContentRequest {
            model: GEMINI_MODEL,
            content: Content {
                parts: vec![Part { text }],
            },
        };
        let response: EmbedContentResponse = self
            .client
            .post(
                GEMINI_EMBED_URL,
                &[("x-goog-api-key", self.api_key.as_str())],
                &request,
            )
            .await?;
        extract_values(response)
    }
}

fn extract_values(response: EmbedContentResponse) -> Result<Vec<f32>, EmbedError> {
    response
        .embedding
        .map(|e| e.values)
        .filter(|values| !values.is_empty())
        .ok_or(EmbedError::EmptyContent)
}
