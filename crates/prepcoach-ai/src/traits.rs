use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised before a response status is available
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to reach generation endpoint: {0}")]
    Connection(String),

    #[error("Generation request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Transport configuration error: {0}")]
    ConfigError(String),
}

/// A single call to the generation endpoint: the prompt plus the declared
/// output schema the generated text must follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub response_schema: serde_json::Value,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, response_schema: serde_json::Value) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema,
        }
    }
}

/// Raw response from the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Client-class failures mean the request itself is malformed
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// The seam between the executor and whatever carries requests over the wire
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable name used in diagnostics
    fn name(&self) -> &str;

    /// Perform one attempt. Non-success statuses are returned as responses,
    /// not errors; only failures without a status are `TransportError`s.
    async fn send(&self, request: &GenerationRequest) -> Result<TransportResponse, TransportError>;
}
