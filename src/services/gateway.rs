//! OpenClaw gateway client (OpenResponses-shaped `/v1/responses`)
//!
//! The gateway owns conversation history. The bridge sends one user message
//! per request and threads turns together with the session key header.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ConversationBackend;
use crate::error::BackendError;
use crate::session::Session;
use crate::utils::truncate_for_log;

const SERVICE: &str = "gateway";

/// Header carrying the session correlation key.
pub const SESSION_HEADER: &str = "x-openclaw-session-key";

/// Request body for the responses endpoint
#[derive(Debug, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Vec<InputMessage>,
}

#[derive(Debug, Serialize)]
pub struct InputMessage {
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub role: &'static str,
    pub content: String,
}

impl ResponsesRequest {
    pub fn user_message(model: String, text: &str) -> Self {
        Self {
            model,
            input: vec![InputMessage {
                item_type: "message",
                role: "user",
                content: text.to_string(),
            }],
        }
    }
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl GatewayClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/responses", self.base_url)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ConversationBackend for GatewayClient {
    async fn ask(&self, session: &Session, text: &str) -> Result<String, BackendError> {
        let body = ResponsesRequest::user_message(session.model(), text);
        debug!("Asking gateway as {} ({})", session.model(), session.correlation_key());

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .header(SESSION_HEADER, session.correlation_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(SERVICE, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gateway error {}: {}", status, truncate_for_log(&body, 200));
            return Err(BackendError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| BackendError::from_reqwest(SERVICE, self.timeout, e))?;

        extract_reply_text(&value).ok_or(BackendError::EmptyReply { service: SERVICE })
    }
}

/// Pull the assistant's text out of a responses payload.
///
/// Walks `output` from the end and takes the last assistant message with
/// something to say. Its `content` is either a plain string or a list of
/// parts, of which the first non-blank `output_text` or `text` part is used.
pub fn extract_reply_text(response: &Value) -> Option<String> {
    let output = response.get("output")?.as_array()?;

    output.iter().rev().find_map(|item| {
        if item.get("type")?.as_str()? != "message" || item.get("role")?.as_str()? != "assistant" {
            return None;
        }
        match item.get("content")? {
            Value::String(text) => spoken(text),
            Value::Array(parts) => parts.iter().find_map(|part| {
                match part.get("type")?.as_str()? {
                    "output_text" | "text" => spoken(part.get("text")?.as_str()?),
                    _ => None,
                }
            }),
            _ => None,
        }
    })
}

fn spoken(text: &str) -> Option<String> {
    (!text.trim().is_empty()).then(|| text.to_string())
}
