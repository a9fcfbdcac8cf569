use thiserror::Error;

/// Errors raised by the API client. `Fatal` aborts the run; everything else
/// is handled internally by the retry combinator before ever reaching the
/// caller.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {page_token:?} failed after exhausting retries: {message}")]
    Fatal { status: Option<u16>, page_token: Option<String>, message: String },

    #[error("unretryable HTTP status {status} for {page_token:?}: {body}")]
    UnretryableStatus { status: u16, page_token: Option<String>, body: String },

    #[error("failed to decode API response: {0}")]
    Decode(String),
}

/// Classifies an HTTP status (or the absence of one, for network-level
/// failures) as retryable per the spec: timeouts, 429, and any 5xx retry;
/// every other 4xx is fatal immediately.
pub(crate) fn is_retryable_status(status: Option<u16>) -> bool {
    match status {
        None => true, // network timeout / connection failure
        Some(429) => true,
        Some(s) if (500..600).contains(&s) => true,
        Some(_) => false,
    }
}
