//! OpenAI-compatible chat completions generator.
//!
//! Sends the verdict and reply prompts to `{api_base}/chat/completions` and
//! parses the first choice. Works with any endpoint that speaks the same
//! request and response shapes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::{EchoError, Result};
use crate::log_component;

use super::{
    parse_generated_response, parse_verdict, GeneratedResponse, ResponseContext,
    ResponseGenerator, Verdict,
};

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ============================================================================
// Generator
// ============================================================================

/// [`ResponseGenerator`] backed by a chat completions API.
pub struct ChatCompletionGenerator {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl std::fmt::Debug for ChatCompletionGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionGenerator")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl ChatCompletionGenerator {
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| EchoError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(ctx: &ResponseContext<'_>) -> String {
        format!(
            "You are {}, chatting as @{} in a multi-agent room.",
            ctx.persona.name, ctx.agent.username
        )
    }

    async fn complete(&self, system: String, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        log_component!(
            debug,
            "generator",
            "Chat completion request",
            model = self.model.as_str(),
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| EchoError::Generation(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EchoError::Generation(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EchoError::Generation(format!(
                "API error ({}): {}",
                status, detail
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| EchoError::Generation(format!("Failed to parse response: {}", e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl ResponseGenerator for ChatCompletionGenerator {
    async fn should_respond(&self, ctx: &ResponseContext<'_>) -> Result<Verdict> {
        let output = self
            .complete(Self::system_prompt(ctx), ctx.should_respond_prompt())
            .await?;
        let verdict = parse_verdict(&output);
        debug!(%verdict, "Parsed verdict");
        Ok(verdict)
    }

    async fn generate_response(
        &self,
        ctx: &ResponseContext<'_>,
    ) -> Result<Option<GeneratedResponse>> {
        let output = self
            .complete(Self::system_prompt(ctx), ctx.message_prompt())
            .await?;
        Ok(parse_generated_response(&output))
    }
}
