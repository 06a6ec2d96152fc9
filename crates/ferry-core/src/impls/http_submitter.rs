//! HttpSubmitter - REST バックエンドへの送信
//!
//! | kind        | endpoint                  |
//! |-------------|---------------------------|
//! | quiz-result | `POST {base}/quiz_results` |
//! | game-result | `POST {base}/game_results` |
//! | generic     | `POST {base}/sync`         |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::domain::SubmitError;
use crate::ports::RemoteSubmitter;

pub struct HttpSubmitter {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpSubmitter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmitError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            client,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<HeaderMap, SubmitError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| SubmitError::Other(format!("invalid token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<(), SubmitError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "submitting");

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(payload)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(%url, error = %e, "failed to read error body");
                String::new()
            }
        };
        Err(SubmitError::Rejected {
            status: status.as_u16(),
            message: rejection_message(&body, status),
        })
    }
}

fn classify(err: reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        SubmitError::Timeout
    } else {
        SubmitError::Network(err.to_string())
    }
}

/// Prefer the backend's `{"message": ...}`; fall back to the status reason.
fn rejection_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("An error occurred")
                .to_string()
        })
}

#[async_trait]
impl RemoteSubmitter for HttpSubmitter {
    async fn submit_quiz_result(&self, payload: &Value) -> Result<(), SubmitError> {
        self.post("/quiz_results", payload).await
    }

    async fn submit_game_result(&self, payload: &Value) -> Result<(), SubmitError> {
        self.post("/game_results", payload).await
    }

    async fn submit_generic(&self, payload: &Value) -> Result<(), SubmitError> {
        self.post("/sync", payload).await
    }
}
