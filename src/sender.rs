use crate::stream::PushRequest;
use crate::transport::Transport;
use std::time::Duration;
use tokio::time::sleep;

/// Outcome of delivering one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The backend answered 2xx after `attempts` tries.
    Delivered { attempts: u32 },
    /// Every attempt failed; the batch was dropped.
    Failed { attempts: u32 },
    /// The payload could not be encoded; nothing was sent.
    Unencodable,
}

impl FlushOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FlushOutcome::Delivered { .. })
    }
}

/// Retry policy applied to each batch.
///
/// Up to `retry_count + 1` attempts are made. Retry `n` (starting at 1) is
/// preceded by a sleep of `retry_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.retry_delay.saturating_mul(retry)
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Encode `request` once and push it with linear backoff until the first
/// 2xx or until the attempts are exhausted.
pub async fn send_with_retry(
    transport: &dyn Transport,
    request: &PushRequest,
    policy: RetryPolicy,
) -> FlushOutcome {
    let body = match request.to_json() {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode loki push payload");
            return FlushOutcome::Unencodable;
        }
    };

    let max_attempts = policy.max_attempts();
    for attempt in 0..max_attempts {
        if attempt > 0 {
            sleep(policy.backoff(attempt)).await;
        }

        match transport.push(body.clone()).await {
            Ok(status) if is_success(status) => {
                return FlushOutcome::Delivered {
                    attempts: attempt + 1,
                };
            }
            Ok(status) => {
                tracing::debug!(status, attempt = attempt + 1, "loki returned error status");
            }
            Err(e) => {
                tracing::debug!(error = %e, attempt = attempt + 1, "error sending to loki");
            }
        }
    }

    tracing::warn!(
        attempts = max_attempts,
        entries = request.entry_count(),
        "failed to send logs to loki, dropping batch"
    );
    FlushOutcome::Failed {
        attempts: max_attempts,
    }
}
