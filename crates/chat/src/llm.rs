use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use parley_core::config::LlmConfig;
use parley_core::Message;

/// One fully resolved request to the generation provider: the transcript to
/// replay plus the profile's sampling parameters.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub model: String,
}

/// Boundary to the upstream language-generation provider. A failure here is
/// terminal for the current request: the orchestrator reports it and never
/// retries or substitutes empty text.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn complete(&self, request: GenerationRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// HTTP client for providers speaking the OpenAI-compatible
/// `/chat/completions` convention (GLM-4-Flash in production).
#[derive(Clone)]
pub struct HttpGenerationClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpGenerationClient {
    pub fn new(base_url: String, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("failed to build generation HTTP client")?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), api_key, client })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            config.timeout_secs,
        )
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn complete(&self, request: GenerationRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let payload = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut http_request = self.client.post(&url).json(&payload);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response =
            http_request.send().await.context("failed to send generation request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            anyhow::bail!("generation provider returned {status}: {body}");
        }

        let completion: ChatCompletionResponse =
            response.json().await.context("failed to parse generation response")?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("generation response contained no choices"))?;

        if content.is_empty() {
            anyhow::bail!("generation response was empty");
        }

        Ok(content)
    }
}
