//! OpenAI `text-embedding-3-small` provider (secondary).
//! The request pins `dimensions` to the core width so results are interchangeable with Gemini's.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::JsonClient;
use super::{EmbedError, EmbeddingProvider, EMBEDDING_DIM};
use crate::config::CoreConfig;

const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";
pub const OPENAI_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAiProvider {
    client: JsonClient,
    bearer: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, config: &CoreConfig) -> Result<Self, EmbedError> {
        Ok(Self {
            client: JsonClient::new(config.provider_timeout, config.provider_max_retries)?,
            bearer: format!("Bearer {api_key}"),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let request = EmbeddingsRequest {
            model: OPENAI_MODEL,
            input: text,
            dimensions: EMBEDDING_DIM,
        };
        let response: EmbeddingsResponse = self
            .client
            .post(
                OPENAI_EMBED_URL,
                &[("authorization", self.bearer.as_str())],
                &request,
            )
            .await?;
        first_embedding(response)
    }
}

fn first_embedding(response: EmbeddingsResponse) -> Result<Vec<f32>, EmbedError> {
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or(EmbedError::EmptyContent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_pins_dimensions() {
        let request = EmbeddingsRequest {
            model: OPENAI_MODEL,
            input: "Kubernetes",
            dimensions: EMBEDDING_DIM,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["dimensions"], 768);
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["input"], "Kubernetes");
    }

    #[test]
    fn test_first_embedding_from_response() {
        let body = r#"{"object": "list", "data": [{"index": 0, "embedding": [0.5, 0.25]}]}"#;
        let response: EmbeddingsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(first_embedding(response).unwrap(), vec![0.5, 0.25]);
    }

    #[test]
    fn test_empty_data_is_empty_content() {
        let response: EmbeddingsResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(matches!(
            first_embedding(response),
            Err(EmbedError::EmptyContent)
        ));
    }
}
