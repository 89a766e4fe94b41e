//! Retry policy for upstream sends
//!
//! Each attempt is bounded by the policy timeout. Server errors, throttling, timeouts and
//! network failures are retried with exponential backoff; explicit rejections are not.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use teledrop_core::{AppError, Config};

/// Marker the upstream embeds in its description when it cannot decode an image
pub const IMAGE_PROCESS_FAILED: &str = "IMAGE_PROCESS_FAILED";

#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream returned HTTP {status}: {message}")]
    Transient { status: u16, message: String },

    #[error("upstream request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("{description}")]
    Rejected {
        description: String,
        error_code: Option<i64>,
    },

    #[error("unexpected upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpstreamError::Transient { .. } | UpstreamError::Timeout | UpstreamError::Network(_)
        )
    }

    pub fn is_image_process_failed(&self) -> bool {
        match self {
            UpstreamError::Rejected { description, .. } => {
                description.contains(IMAGE_PROCESS_FAILED)
            }
            UpstreamError::Transient { message, .. } => message.contains(IMAGE_PROCESS_FAILED),
            _ => false,
        }
    }

    /// Map a transport error. The URL is stripped since it carries the bot token.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Rejected { description, .. } => AppError::UpstreamRejected(description),
            UpstreamError::Decode(msg) => {
                AppError::UpstreamRejected(format!("Unexpected upstream response: {}", msg))
            }
            other => AppError::UpstreamTransient(other.to_string()),
        }
    }
}

#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Bound on a single attempt
    pub timeout: Duration,
    pub retryable: fn(&UpstreamError) -> bool,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(600),
            timeout: Duration::from_secs(60),
            retryable: UpstreamError::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.upstream_max_retries(),
            base_delay: Duration::from_millis(config.upstream_retry_base_ms()),
            timeout: Duration::from_secs(config.upstream_timeout_secs()),
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based): base, 2x base, 4x base...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor)
    }

    pub fn should_retry(&self, err: &UpstreamError, attempt: u32) -> bool {
        attempt < self.max_retries && (self.retryable)(err)
    }
}

/// Run `op` under the policy. `op` is invoked once per attempt so request bodies can be
/// rebuilt each time.
pub async fn send_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout),
        };

        match result {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(operation, attempt, "Upstream call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if policy.should_retry(&e, attempt) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Upstream call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!(operation, attempt, error = %e, "Upstream call failed");
                return Err(e);
            }
        }
    }
}
