use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::error::ClientError;

/// One failed attempt, carrying enough context to decide whether to retry
/// and, if not, how to report the failure.
pub struct AttemptFailure {
    pub status: Option<u16>,
    pub page_token: Option<String>,
    pub message: String,
    pub retryable: bool,
}

impl AttemptFailure {
    fn into_error(self) -> ClientError {
        if self.retryable {
            ClientError::Fatal { status: self.status, page_token: self.page_token, message: self.message }
        } else {
            ClientError::UnretryableStatus {
                status: self.status.unwrap_or(0),
                page_token: self.page_token,
                body: self.message,
            }
        }
    }
}

fn backoff_delay(base_ms: u64, cap_ms: u64, attempt: u32) -> Duration {
    let scaled = base_ms.saturating_mul(1u64 << attempt.min(31));
    Duration::from_millis(scaled.min(cap_ms))
}

/// A plain retry combinator around an async attempt function — not a
/// decorator object, just a loop. `attempt` is called with the zero-based
/// retry count so it can be used in log lines; it returns `Ok` on success or
/// an `AttemptFailure` describing whether the failure is retryable.
///
/// Returns the successful value together with how many retries it took, so
/// the caller can fold that into run metrics.
pub async fn with_retry<F, Fut, T>(
    max_attempts: u32,
    backoff_base_ms: u64,
    backoff_cap_ms: u64,
    mut attempt: F,
) -> Result<(T, u32), ClientError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptFailure>>,
{
    let mut retries = 0;
    loop {
        match attempt(retries).await {
            Ok(value) => return Ok((value, retries)),
            Err(failure) => {
                let attempts_used = retries + 1;
                if !failure.retryable || attempts_used >= max_attempts {
                    return Err(failure.into_error());
                }
                let delay = backoff_delay(backoff_base_ms, backoff_cap_ms, retries);
                warn!("retrying after failure (attempt {attempts_used}/{max_attempts}): {}", failure.message);
                tokio::time::sleep(delay).await;
                retries += 1;
            }
        }
    }
}
