// crates/draftline-providers/src/notify.rs
// ============================================================================
// Module: Reviewer Notifier
// Description: Best-effort email and webhook delivery of review packets.
// Purpose: Hand the reviewer their action links out of band.
// Dependencies: draftline-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! Notification is best-effort by contract: every channel failure lands in
//! the result's error list and the run continues. The email channel posts a
//! SendGrid-style JSON message; the webhook channel posts a compact summary.
//! Action links embed the raw bearer tokens, which exist nowhere else.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use draftline_core::NotificationResult;
use draftline_core::Notifier;
use draftline_core::ReviewPacket;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde_json::json;
use tracing::warn;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the composite notifier.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    /// Public base URL used to build action links.
    pub base_public_url: String,
    /// Enables the email channel.
    pub email_enabled: bool,
    /// Mail API endpoint (SendGrid-style JSON).
    pub email_api_url: String,
    /// Mail API key.
    pub email_api_key: String,
    /// Sender address.
    pub email_from: String,
    /// Recipient address.
    pub email_to: String,
    /// Enables the webhook channel.
    pub webhook_enabled: bool,
    /// Webhook endpoint.
    pub webhook_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

// ============================================================================
// SECTION: Notifier
// ============================================================================

/// Email-plus-webhook notifier implementing [`Notifier`].
pub struct CompositeNotifier {
    /// Notifier configuration.
    config: NotifyConfig,
    /// HTTP client used for outbound requests.
    client: Option<Client>,
}

impl CompositeNotifier {
    /// Creates a notifier from configuration. A client build failure leaves
    /// both channels disabled; notification is best-effort by contract.
    #[must_use]
    pub fn new(config: NotifyConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1_000)))
            .redirect(Policy::none())
            .user_agent("draftline/0.1")
            .build()
            .ok();
        if client.is_none() {
            warn!("notifier http client build failed, channels disabled");
        }
        Self { config, client }
    }

    /// Renders the draft body shown to the reviewer.
    fn render_text(packet: &ReviewPacket) -> String {
        match (&packet.tweets, &packet.text) {
            (Some(tweets), _) if !tweets.is_empty() => tweets.join("\n\n"),
            (_, Some(text)) => text.clone(),
            _ => String::new(),
        }
    }

    /// Builds the action link block.
    fn links(&self, packet: &ReviewPacket) -> (String, String, String) {
        let base = self.config.base_public_url.trim_end_matches('/');
        (
            format!("{base}/approve/{}", packet.tokens.approve),
            format!("{base}/edit/{}", packet.tokens.edit),
            format!("{base}/skip/{}", packet.tokens.skip),
        )
    }

    /// Sends the email channel message.
    fn send_email(&self, packet: &ReviewPacket, errors: &mut Vec<String>) -> bool {
        let Some(client) = &self.client else {
            errors.push("email_failed: no http client".to_string());
            return false;
        };
        let preview: String = Self::render_text(packet).chars().take(30).collect();
        let subject =
            format!("Daily Draft: {} - {preview}...", packet.policy_report.action.as_str());
        let (approve, edit, skip) = self.links(packet);
        let checks: String = packet
            .policy_report
            .checks
            .iter()
            .map(|check| {
                format!(
                    "<li>{}: {} - {}</li>",
                    check.check_name,
                    if check.passed { "pass" } else { "fail" },
                    check.details
                )
            })
            .collect();
        let html = format!(
            "<h2>Daily Draft ({risk})</h2>\
             <p><strong>Policy Action:</strong> {action}</p>\
             <pre>{body}</pre>\
             <h3>Policy Check:</h3><ul>{checks}</ul>\
             <p><a href=\"{approve}\">Approve &amp; Post</a> | \
             <a href=\"{edit}\">Edit</a> | <a href=\"{skip}\">Skip</a></p>",
            risk = packet.policy_report.risk_level.as_str(),
            action = packet.policy_report.action.as_str(),
            body = Self::render_text(packet),
        );
        let message = json!({
            "personalizations": [{"to": [{"email": self.config.email_to}]}],
            "from": {"email": self.config.email_from},
            "subject": subject,
            "content": [{"type": "text/html", "value": html}],
        });
        let sent = client
            .post(&self.config.email_api_url)
            .bearer_auth(&self.config.email_api_key)
            .json(&message)
            .send()
            .map_err(|err| format!("email_failed: {err}"))
            .and_then(|response| {
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(format!("email_failed: status {}", response.status().as_u16()))
                }
            });
        match sent {
            Ok(()) => true,
            Err(message) => {
                errors.push(message);
                false
            }
        }
    }

    /// Sends the webhook channel message.
    fn send_webhook(&self, packet: &ReviewPacket, errors: &mut Vec<String>) -> bool {
        let Some(client) = &self.client else {
            errors.push("webhook_failed: no http client".to_string());
            return false;
        };
        let (approve, edit, skip) = self.links(packet);
        let body = json!({
            "draft_id": packet.draft_id.as_str(),
            "mode": packet.mode,
            "action": packet.policy_report.action.as_str(),
            "risk_level": packet.policy_report.risk_level.as_str(),
            "text": Self::render_text(packet),
            "approve": approve,
            "edit": edit,
            "skip": skip,
        });
        let sent = client
            .post(&self.config.webhook_url)
            .json(&body)
            .send()
            .map_err(|err| format!("webhook_failed: {err}"))
            .and_then(|response| {
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(format!("webhook_failed: status {}", response.status().as_u16()))
                }
            });
        match sent {
            Ok(()) => true,
            Err(message) => {
                errors.push(message);
                false
            }
        }
    }
}

impl Notifier for CompositeNotifier {
    fn notify(&self, packet: &ReviewPacket) -> NotificationResult {
        let mut errors = Vec::new();
        let email_sent =
            self.config.email_enabled && self.send_email(packet, &mut errors);
        let webhook_sent =
            self.config.webhook_enabled && self.send_webhook(packet, &mut errors);
        NotificationResult { email_sent, webhook_sent, errors }
    }
}
