// crates/draftline-providers/src/llm.rs
// ============================================================================
// Module: Language Model Client
// Description: OpenRouter-style blocking chat client in JSON mode.
// Purpose: Implement the LanguageModel seam with strict limits.
// Dependencies: draftline-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The client posts a single user message to `/chat/completions` with JSON
//! response format and parses the first choice's content as JSON. Markdown
//! code fences around the payload are tolerated. Every failure maps to a
//! typed [`LlmError`]; callers hold the retry and fallback discipline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use draftline_core::LanguageModel;
use draftline_core::LlmError;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the OpenRouter-style chat client.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// Chat completions base URL.
    pub base_url: String,
    /// API key sent as a bearer credential.
    pub api_key: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking chat client implementing [`LanguageModel`].
pub struct OpenRouterClient {
    /// Client configuration.
    config: OpenRouterConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

/// Response envelope for a chat completion.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// Completion choices; the first is used.
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// One completion choice.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    /// The assistant message.
    message: ChatMessage,
}

/// The assistant message payload.
#[derive(Debug, Deserialize)]
struct ChatMessage {
    /// Raw content, expected to be a JSON document.
    #[serde(default)]
    content: String,
}

impl OpenRouterClient {
    /// Creates a chat client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: OpenRouterConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .user_agent("draftline/0.1")
            .build()
            .map_err(|_| LlmError::Transport("http client build failed".to_string()))?;
        Ok(Self { config, client })
    }
}

impl LanguageModel for OpenRouterClient {
    fn chat_json(&self, prompt: &str) -> Result<Value, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "response_format": {"type": "json_object"},
        });
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|err| LlmError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(LlmError::Transport(format!(
                "chat completion status {}",
                response.status().as_u16()
            )));
        }
        let envelope: ChatResponse =
            response.json().map_err(|err| LlmError::Parse(err.to_string()))?;
        let content = envelope
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| LlmError::Parse("response has no choices".to_string()))?;
        parse_json_content(content)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses message content as JSON, stripping optional markdown fences.
fn parse_json_content(content: &str) -> Result<Value, LlmError> {
    let mut trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        trimmed = rest;
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        trimmed = rest;
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest;
    }
    serde_json::from_str(trimmed.trim()).map_err(|err| LlmError::Parse(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use serde_json::json;

    use super::parse_json_content;

    /// Tests plain and fenced payloads both parse.
    #[test]
    fn test_parse_json_content() {
        let expected = json!({"candidates": []});
        assert_eq!(parse_json_content("{\"candidates\": []}").unwrap(), expected);
        assert_eq!(
            parse_json_content("```json\n{\"candidates\": []}\n```").unwrap(),
            expected
        );
        assert!(parse_json_content("not json").is_err());
    }
}
