use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::EmbedError;

const BASE_BACKOFF_MS: u64 = 250;

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// JSON-over-HTTP client shared by the embedding providers.
/// Retries 429 and 5xx responses with exponential backoff; other failures return immediately.
#[derive(Clone)]
pub(crate) struct JsonClient {
    client: Client,
    max_retries: u32,
}

impl JsonClient {
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self, EmbedError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_retries,
        })
    }

    pub async fn post<B, T>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<T, EmbedError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut attempt: u32 = 0;

        loop {
            let mut request = self.client.post(url).json(body);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let error = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let text = response.text().await?;
                        let parsed = decode_body(&text)?;
                        debug!("Embedding call to {url} succeeded");
                        return Ok(parsed);
                    }

                    let text = response.text().await.unwrap_or_default();
                    let error = EmbedError::Api {
                        status: status.as_u16(),
                        message: error_message(text),
                    };
                    if !is_retryable(status) {
                        return Err(error);
                    }
                    warn!("Embedding API returned {status}: {error}");
                    error
                }
                Err(e) => EmbedError::Http(e),
            };

            if attempt >= self.max_retries {
                return Err(error);
            }
            attempt += 1;

            let delay = backoff_delay(attempt);
            warn!(
                "Embedding call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// 250ms, 500ms, 1s, ... for retry `attempt` (1-based).
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS << attempt.saturating_sub(1).min(16))
}

fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, EmbedError> {
    Ok(serde_json::from_str(text)?)
}

/// Pulls `error.message` out of a provider error body, or returns the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}
