use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{GenerationRequest, Transport, TransportError};

/// Errors surfaced by [`Executor::execute`]
#[derive(Error, Debug)]
pub enum RequestError {
    /// Client-class status: the request itself is wrong, retrying cannot help
    #[error("Request rejected with status {status}: {body}")]
    Terminal { status: u16, body: String },

    #[error("Endpoint failed with status {status}: {body}")]
    Server { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Response body is not valid JSON: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("Giving up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        last: Box<RequestError>,
    },
}

impl RequestError {
    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, RequestError::Server { .. } | RequestError::Transport(_))
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further failure
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Delay to wait after the attempt with the given 0-based index fails
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt_index).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }

    fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Runs generation requests through a [`Transport`] with retry on transient failure
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Perform the request and return the parsed response body.
    ///
    /// Success returns immediately. A 4xx status fails after one attempt.
    /// Anything else is retried, sleeping `initial_delay * 2^attempt_index`
    /// between attempts, until `max_attempts` have been made.
    pub async fn execute(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, RequestError> {
        let max_attempts = self.policy.effective_attempts();
        let mut attempts = 0u32;

        loop {
            debug!(
                transport = self.transport.name(),
                attempt = attempts + 1,
                max_attempts,
                prompt_len = request.prompt.len(),
                "Sending generation request"
            );

            let error = match self.transport.send(request).await {
                Ok(response) if response.is_success() => {
                    return serde_json::from_str(&response.body)
                        .map_err(RequestError::MalformedBody);
                }
                Ok(response) if response.is_client_error() => {
                    warn!(
                        status = response.status,
                        attempt = attempts + 1,
                        "Generation request rejected, not retrying"
                    );
                    return Err(RequestError::Terminal {
                        status: response.status,
                        body: response.body,
                    });
                }
                Ok(response) => RequestError::Server {
                    status: response.status,
                    body: response.body,
                },
                Err(e) => RequestError::Transport(e),
            };

            let attempt_index = attempts;
            attempts += 1;

            if attempts >= max_attempts {
                warn!(
                    error = %error,
                    attempts,
                    "Generation request failed on final attempt"
                );
                return Err(RequestError::Exhausted {
                    attempts,
                    last: Box::new(error),
                });
            }

            let delay = self.policy.delay_for(attempt_index);
            warn!(
                error = %error,
                attempt = attempts,
                max_attempts,
                retry_in_ms = delay.as_millis() as u64,
                "Generation request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
