//! Remote dispatch client
//!
//! Sends recruiter text to the workflow webhook and interprets the reply.
//! The only recognized reply is a JSON object carrying a string `text`
//! field; everything else is reported as
//! [`DispatchError::UnexpectedFormat`].

use crate::config::WebhookConfig;
use crate::error::{DispatchError, RecruitChatError, Result};
use crate::retry::RetryPolicy;
use crate::session::SessionId;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Assistant text shown when the webhook replies in an unrecognized shape
pub const FORMAT_ERROR_REPLY: &str =
    "Sorry, I received a response in an unexpected format. Please try again.";

/// Assistant text shown when the webhook cannot be reached or fails
pub const DISPATCH_ERROR_REPLY: &str =
    "Sorry, something went wrong while processing your message. Please try again.";

/// Text the assistant shows in place of a failed dispatch
pub fn error_reply(error: &DispatchError) -> &'static str {
    match error {
        DispatchError::UnexpectedFormat(_) => FORMAT_ERROR_REPLY,
        _ => DISPATCH_ERROR_REPLY,
    }
}

/// Successful webhook reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
}

/// Sends a message for a session and waits for the assistant's reply
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(
        &self,
        text: &str,
        session: &SessionId,
    ) -> std::result::Result<AssistantReply, DispatchError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    text: String,
}

/// Interpret a webhook body
///
/// # Examples
///
/// ```
/// use recruitchat::dispatch::parse_reply;
///
/// assert_eq!(parse_reply(r#"{"text":"Hello"}"#).unwrap().text, "Hello");
/// assert!(parse_reply(r#"{"foo":"bar"}"#).is_err());
/// ```
pub fn parse_reply(body: &str) -> std::result::Result<AssistantReply, DispatchError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| DispatchError::UnexpectedFormat(format!("body is not JSON: {}", e)))?;
    if !value.is_object() {
        return Err(DispatchError::UnexpectedFormat(
            "body is not a JSON object".to_string(),
        ));
    }
    let response: WebhookResponse = serde_json::from_value(value).map_err(|e| {
        DispatchError::UnexpectedFormat(format!("missing string `text` field: {}", e))
    })?;
    Ok(AssistantReply {
        text: response.text,
    })
}

/// HTTP webhook dispatcher
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
    timeout_seconds: u64,
    retry: RetryPolicy,
}

impl WebhookClient {
    /// Create a dispatcher from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("recruitchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                RecruitChatError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!("Initialized webhook dispatcher: url={}", config.url);

        Ok(Self {
            client,
            url: config.url.clone(),
            timeout_seconds: config.timeout_seconds,
            retry: config.retry,
        })
    }

    async fn send_once(
        &self,
        text: &str,
        session: &SessionId,
    ) -> std::result::Result<AssistantReply, DispatchError> {
        let request = WebhookRequest {
            message: text,
            session_id: session.as_str(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Webhook request failed: {}", e);
                if e.is_timeout() {
                    DispatchError::Timeout(self.timeout_seconds)
                } else {
                    DispatchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Webhook returned error {}: {}", status, error_text);
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout(self.timeout_seconds)
            } else {
                DispatchError::Network(e.to_string())
            }
        })?;

        parse_reply(&body).map_err(|e| {
            tracing::warn!("Webhook reply in unexpected format: {}", body);
            e
        })
    }
}

#[async_trait]
impl Dispatcher for WebhookClient {
    async fn send(
        &self,
        text: &str,
        session: &SessionId,
    ) -> std::result::Result<AssistantReply, DispatchError> {
        tracing::debug!(session_id = %session, chars = text.len(), "Dispatching message");
        self.retry
            .run(
                "webhook dispatch",
                || self.send_once(text, session),
                DispatchError::is_transient,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_text() {
        let reply = parse_reply(r#"{"text":"Hello"}"#).unwrap();
        assert_eq!(reply.text, "Hello");
    }

    #[test]
    fn test_parse_reply_ignores_extra_fields() {
        let reply = parse_reply(r#"{"text":"Hi","sessionId":"s"}"#).unwrap();
        assert_eq!(reply.text, "Hi");
    }

    #[test]
    fn test_parse_reply_rejects_missing_text() {
        let error = parse_reply(r#"{"foo":"bar"}"#).unwrap_err();
        assert!(matches!(error, DispatchError::UnexpectedFormat(_)));
        assert_eq!(error_reply(&error), FORMAT_ERROR_REPLY);
    }

    #[test]
    fn test_parse_reply_rejects_non_string_text() {
        assert!(parse_reply(r#"{"text":42}"#).is_err());
    }

    #[test]
    fn test_parse_reply_rejects_array_and_plain_text() {
        assert!(parse_reply(r#"[{"text":"Hello"}]"#).is_err());
        assert!(parse_reply("Hello").is_err());
        assert!(parse_reply("").is_err());
    }

    #[test]
    fn test_error_reply_for_transport_failures() {
        assert_eq!(error_reply(&DispatchError::Timeout(5)), DISPATCH_ERROR_REPLY);
        assert_eq!(
            error_reply(&DispatchError::Network("refused".into())),
            DISPATCH_ERROR_REPLY
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(WebhookRequest {
            message: "find devs",
            session_id: "session_1",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"message": "find devs", "sessionId": "session_1"})
        );
    }
}
