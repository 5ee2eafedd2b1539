use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::{GenerationRequest, Transport, TransportError, TransportResponse};

/// Connection settings for the HTTP generation endpoint
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub endpoint: String,
    /// Model name appended as `models/{model}:generateContent`
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Gemini-style `generateContent` transport
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        if config.api_key.trim().is_empty() {
            return Err(TransportError::ConfigError("API key is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn body(request: &GenerationRequest) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [{ "text": request.prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
            }
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, request: &GenerationRequest) -> Result<TransportResponse, TransportError> {
        let url = self.url();
        debug!(url = %url, model = %self.config.model, "POST generateContent");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.config.timeout)
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connection(format!("Failed to read body: {}", e)))?;

        Ok(TransportResponse { status, body })
    }
}

/// Pull the generated text payload out of a `generateContent` response
pub fn extract_text(response: &serde_json::Value) -> Option<String> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HttpTransportConfig {
        HttpTransportConfig {
            endpoint: "https://example.test/v1beta/".into(),
            model: "gemini-2.5-flash".into(),
            api_key: "k".into(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_url_joins_model() {
        let transport = HttpTransport::new(config()).unwrap();
        assert_eq!(
            transport.url(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut cfg = config();
        cfg.api_key = "  ".into();
        assert!(matches!(
            HttpTransport::new(cfg),
            Err(TransportError::ConfigError(_))
        ));
    }

    #[test]
    fn test_body_carries_schema() {
        let request = GenerationRequest::new("p", json!({"type": "ARRAY"}));
        let body = HttpTransport::body(&request);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "p");
        assert_eq!(
            body["generationConfig"]["responseSchema"]["type"],
            "ARRAY"
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_extract_text() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":1}" }] } }]
        });
        assert_eq!(extract_text(&response).as_deref(), Some("{\"a\":1}"));
        assert_eq!(extract_text(&json!({"candidates": []})), None);
    }
}
