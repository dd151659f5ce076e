// crates/draftline-providers/src/social.rs
// ============================================================================
// Module: Social Publish Client
// Description: Downstream client for creating posts and reply chains.
// Purpose: Implement the SocialClient seam over the X v2 post endpoint.
// Dependencies: draftline-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! One call, one contract: `POST /2/tweets` with a body text and an optional
//! reply anchor, returning the created post id. Idempotency and retries
//! belong to the publish coordinator; dry-run synthesis never reaches this
//! client.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use draftline_core::PostReceipt;
use draftline_core::SocialClient;
use draftline_core::SocialError;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::json;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the social publish client.
#[derive(Debug, Clone)]
pub struct XApiConfig {
    /// API base URL.
    pub base_url: String,
    /// Bearer token for the posting account.
    pub bearer_token: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking publish client implementing [`SocialClient`].
pub struct XApiClient {
    /// Client configuration.
    config: XApiConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

/// Response envelope for a created post.
#[derive(Debug, Deserialize)]
struct CreateResponse {
    /// Created post payload.
    data: Option<CreateData>,
}

/// Created post payload.
#[derive(Debug, Deserialize)]
struct CreateData {
    /// Post identifier.
    id: Option<String>,
}

impl XApiClient {
    /// Creates a publish client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(config: XApiConfig) -> Result<Self, SocialError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .user_agent("draftline/0.1")
            .build()
            .map_err(|_| SocialError::Transport("http client build failed".to_string()))?;
        Ok(Self { config, client })
    }
}

impl SocialClient for XApiClient {
    fn create_post(
        &self,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<PostReceipt, SocialError> {
        let url = format!("{}/2/tweets", self.config.base_url.trim_end_matches('/'));
        let body = in_reply_to.map_or_else(
            || json!({"text": text}),
            |anchor| json!({"text": text, "reply": {"in_reply_to_tweet_id": anchor}}),
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.bearer_token)
            .json(&body)
            .send()
            .map_err(|err| SocialError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SocialError::Transport(format!(
                "create post status {}",
                status.as_u16()
            )));
        }
        let envelope: CreateResponse =
            response.json().map_err(|err| SocialError::Transport(err.to_string()))?;
        envelope
            .data
            .and_then(|data| data.id)
            .filter(|id| !id.is_empty())
            .map(|id| PostReceipt { id })
            .ok_or_else(|| SocialError::MissingId("no data.id in response".to_string()))
    }
}
