//! Vision-capable reasoning service integration
//!
//! The cascade hands each chart image plus a prompt to an external
//! vision-capable model and gets free-form text back. `VisionProvider` is
//! the seam the orchestrator depends on; `VisionClient` is the shipped
//! OpenAI-compatible implementation. Retry policy lives here, not in the
//! orchestrator: a cascade sees each call succeed or fail exactly once.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::{info, warn};

/// Errors from the reasoning service transport
#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Vision API error: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Vision request timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    #[error("Vision API returned no message content")]
    EmptyResponse,
}

impl VisionError {
    /// Whether a retry inside the client could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            VisionError::Network(_) => true,
            VisionError::Timeout { .. } => true,
            VisionError::Api { status_code, .. } => *status_code >= 500 || *status_code == 429,
            VisionError::EmptyResponse => false,
        }
    }
}

/// Per-call options forwarded to the model
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
}

/// Anything that can turn a chart image + prompt into analysis text.
/// Implementations must be stateless per call; the cascade assumes no
/// session affinity between steps.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    async fn analyze_chart(
        &self,
        chart_ref: &str,
        prompt: &str,
        options: &AnalyzeOptions,
    ) -> Result<String, VisionError>;
}

/// Vision client configuration
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub temperature: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            timeout_seconds: 60,
            max_retries: 2,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client with image input
#[derive(Debug, Clone)]
pub struct VisionClient {
    client: reqwest::Client,
    config: VisionConfig,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("chartcascade/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self, VisionError> {
        Self::new(VisionConfig {
            base_url: config.vision.api_url.clone(),
            api_key: config.vision.api_key.clone(),
            model: config.vision.model.clone(),
            timeout_seconds: config.vision.timeout_seconds,
            max_retries: config.vision.max_retries,
            temperature: config.vision.temperature,
        })
    }

    async fn request_once(
        &self,
        chart_ref: &str,
        prompt: &str,
        options: &AnalyzeOptions,
    ) -> Result<String, VisionError> {
        let body = build_request_body(&self.config, chart_ref, prompt, options);

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = timeout(
            Duration::from_secs(self.config.timeout_seconds),
            request.send(),
        )
        .await
        .map_err(|_| VisionError::Timeout {
            timeout_seconds: self.config.timeout_seconds,
        })??;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VisionError::Api {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(VisionError::Network)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(VisionError::EmptyResponse)
    }
}

#[async_trait]
impl VisionProvider for VisionClient {
    async fn analyze_chart(
        &self,
        chart_ref: &str,
        prompt: &str,
        options: &AnalyzeOptions,
    ) -> Result<String, VisionError> {
        info!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "requesting chart analysis"
        );

        let retry_strategy = ExponentialBackoff::from_millis(200)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        let text = RetryIf::spawn(
            retry_strategy,
            || self.request_once(chart_ref, prompt, options),
            |e: &VisionError| {
                let retryable = e.is_retryable();
                if retryable {
                    warn!(error = %e, "retryable vision error, backing off");
                }
                retryable
            },
        )
        .await?;

        info!(response_chars = text.len(), "chart analysis received");
        Ok(text)
    }
}

fn build_request_body(
    config: &VisionConfig,
    chart_ref: &str,
    prompt: &str,
    options: &AnalyzeOptions,
) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = &options.system_prompt {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.push(json!({
        "role": "user",
        "content": [
            {"type": "text", "text": prompt},
            {"type": "image_url", "image_url": {"url": chart_ref}}
        ]
    }));

    json!({
        "model": config.model,
        "temperature": options.temperature.unwrap_or(config.temperature),
        "messages": messages,
    })
}
