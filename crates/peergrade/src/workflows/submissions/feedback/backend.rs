use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::AiConfig;
use crate::workflows::submissions::repository::{
    CompletionBackend, DependencyError, GenerationParams,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat-completions client for any OpenAI-compatible endpoint.
///
/// One request per feedback generation, no retries: a failed call surfaces as
/// a `DependencyError` and the caller falls back to rule-based feedback.
pub struct HttpCompletionBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl HttpCompletionBackend {
    /// Builds a backend when an API key is configured; `None` means feedback
    /// generation runs entirely on the fallback path.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>, DependencyError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|source| DependencyError::Transport(source.to_string()))?;

        Ok(Some(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }))
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, DependencyError> {
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_completion_tokens": params.max_tokens,
            "temperature": params.temperature,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    DependencyError::Timeout
                } else {
                    DependencyError::Transport(source.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DependencyError::Backend(format!(
                "status {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|source| DependencyError::Transport(source.to_string()))?;

        let text = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or(DependencyError::EmptyCompletion)?;

        Ok(text.to_string())
    }
}

/// Backend used when no API key is configured; always reports `NotConfigured`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl CompletionBackend for DisabledBackend {
    async fn complete(
        &self,
        _prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, DependencyError> {
        Err(DependencyError::NotConfigured)
    }
}
