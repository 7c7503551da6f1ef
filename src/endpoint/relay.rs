//! Delivers composed messages to the chat service.
//!
//! One blocking request per question: the composed text and files go out,
//! the full answer comes back. Conversation continuity is carried by the
//! `conversation_id` the service returns with each answer.

use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::config::EndpointConfig;
use crate::core::controller::{ComposedMessage, OutboundFile};

#[derive(Debug)]
pub enum RelayError {
    Network(String),
    Api { status: u16, message: String },
    Parse(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Network(msg) => write!(f, "network error: {msg}"),
            RelayError::Api { status, message } => {
                write!(f, "chat service error (HTTP {status}): {message}")
            }
            RelayError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for RelayError {}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    inputs: serde_json::Map<String, serde_json::Value>,
    query: &'a str,
    files: &'a [OutboundFile],
    response_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
    user: &'a str,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChatAnswer {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub answer: String,
}

pub struct ChatRelay {
    base_url: String,
    api_key: Option<String>,
    user: String,
    client: reqwest::Client,
}

impl ChatRelay {
    pub fn new(endpoint: &EndpointConfig) -> Self {
        Self {
            base_url: endpoint.base_url.clone(),
            api_key: endpoint.api_key.clone(),
            user: endpoint.user.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn deliver(
        &self,
        message: &ComposedMessage,
        conversation_id: Option<&str>,
    ) -> Result<ChatAnswer, RelayError> {
        let body = ChatRequest {
            inputs: serde_json::Map::new(),
            query: &message.query,
            files: &message.files,
            response_mode: "blocking",
            conversation_id,
            user: &self.user,
        };
        info!(
            "Delivering question ({} chars, {} files, conversation={:?})",
            message.query.len(),
            message.files.len(),
            conversation_id
        );

        let mut request = self
            .client
            .post(format!("{}/chat-messages", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        let response = request
            .send()
            .await
            .map_err(|e| RelayError::Network(e.to_string()))?;

        debug!("Chat service response status: {}", response.status());
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Chat service error: {} - {}", status, message);
            return Err(RelayError::Api { status, message });
        }

        response
            .json::<ChatAnswer>()
            .await
            .map_err(|e| RelayError::Parse(e.to_string()))
    }
}
