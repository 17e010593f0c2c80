//! # HTTP Push-Queue Transport
//!
//! Publishes envelopes to a hosted message queue over its REST API, and
//! decodes the bodies such a queue pushes back to a subscriber endpoint.
//!
//! ## Wire Format
//!
//! ```text
//! POST {base_url}/queues/{topic}/messages
//! Authorization: OAuth {token}
//!
//! {"messages": [{"body": "<base64 envelope bytes>"}]}
//! ```
//!
//! Push deliveries arrive either as that base64 string or, from older
//! producers, as a JSON array of signed byte values.

use crate::publisher::{PublishError, Publisher};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Default per-request timeout for the push-queue API.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors decoding a pushed message body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushBodyError {
    /// The body was not JSON.
    #[error("Push body is not JSON: {0}")]
    NotJson(String),

    /// The body was JSON of an unsupported shape.
    #[error("Unsupported push body shape")]
    UnsupportedShape,

    /// A byte array element was outside -128..=255.
    #[error("Byte value {0} out of range")]
    ByteOutOfRange(i64),

    /// A base64 body failed to decode.
    #[error("Invalid base64 body: {0}")]
    Base64(String),
}

/// `Publisher` that posts to a hosted push queue over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPushPublisher {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpPushPublisher {
    /// Create a publisher for the queue service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PublishError::Transport {
                topic: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(client, base_url, token))
    }

    /// Create a publisher around an existing client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token: token.into(),
        }
    }

    fn messages_url(&self, topic: &str) -> String {
        format!("{}/queues/{}/messages", self.base_url, topic)
    }
}

#[async_trait]
impl Publisher for HttpPushPublisher {
    async fn publish(&self, topic: &str, data: &[u8]) -> Result<(), PublishError> {
        let started = Instant::now();
        let body = json!({ "messages": [{ "body": STANDARD.encode(data) }] });

        let response = self
            .client
            .post(self.messages_url(topic))
            .header("Authorization", format!("OAuth {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Transport {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                topic: topic.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(
            topic,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Published to push queue"
        );
        Ok(())
    }
}

/// Recover envelope bytes from a pushed HTTP body.
///
/// Accepts a JSON array of byte values (signed or unsigned), a JSON string
/// holding base64, or an object with a base64 `body` field.
///
/// # Errors
///
/// Returns `PushBodyError` when the body matches none of those shapes.
pub fn decode_push_body(raw: &[u8]) -> Result<Vec<u8>, PushBodyError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| PushBodyError::NotJson(e.to_string()))?;

    match value {
        Value::Array(items) => items.iter().map(byte_from_json).collect(),
        Value::String(encoded) => decode_base64(&encoded),
        Value::Object(map) => match map.get("body") {
            Some(Value::String(encoded)) => decode_base64(encoded),
            _ => Err(PushBodyError::UnsupportedShape),
        },
        _ => Err(PushBodyError::UnsupportedShape),
    }
}

fn byte_from_json(item: &Value) -> Result<u8, PushBodyError> {
    let n = item.as_i64().ok_or(PushBodyError::UnsupportedShape)?;
    match n {
        -128..=-1 => Ok((n as i8) as u8),
        0..=255 => Ok(n as u8),
        _ => Err(PushBodyError::ByteOutOfRange(n)),
    }
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, PushBodyError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| PushBodyError::Base64(e.to_string()))
}
