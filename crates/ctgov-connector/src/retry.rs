//! Small retry wrapper for the handful of read-only queries that run
//! outside the main transaction (e.g. the high-water-mark lookup), so a
//! transient connection blip doesn't abort an otherwise-healthy run.

use std::future::Future;
use std::time::Duration;

use crate::error::ConnectorError;

const MAX_ATTEMPTS: u32 = 3;
const STEP_MS: u64 = 15;

pub async fn with_retry<F, Fut, T>(mut attempt: F) -> Result<T, ConnectorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ConnectorError>>,
{
    let mut attempts = 0;
    loop {
        match attempt().await {
            Err(e) if e.is_retryable() && attempts < MAX_ATTEMPTS - 1 => {
                attempts += 1;
                let delay = Duration::from_millis(STEP_MS * attempts as u64);
                log::warn!("retryable connector error (attempt {attempts}): {e} -> sleeping {delay:?}");
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}
