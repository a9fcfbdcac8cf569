//! ctgov-client
//!
//! Paginated, retrying extraction against the ClinicalTrials.gov V2 API.
//! Exposes one operation: a lazy, finite stream of raw study JSON objects,
//! produced by a background task and delivered one record at a time over a
//! bounded channel so extraction can overlap with downstream processing.

pub mod config;
pub mod error;
mod retry;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

pub use config::ClientConfig;
pub use error::ClientError;
use retry::AttemptFailure;

#[derive(Debug, Deserialize)]
struct PageResponse {
    studies: Vec<Value>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// HTTP client for the ClinicalTrials.gov V2 API. Owns one connection pool
/// for the lifetime of a run.
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Decode(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Builds the `filter.advanced` query value for a delta load's
    /// high-water mark, per §4.1: `AREA[LastUpdatePostDate]RANGE[date,MAX]`.
    fn advanced_filter(updated_since: NaiveDate) -> String {
        format!("AREA[LastUpdatePostDate]RANGE[{},MAX]", updated_since.format("%Y-%m-%d"))
    }

    async fn fetch_page(&self, page_token: Option<&str>, filter: Option<&str>) -> Result<PageResponse, AttemptFailure> {
        let mut req = self
            .http
            .get(&self.config.base_url)
            .query(&[("pageSize", self.config.page_size.to_string())]);
        if let Some(token) = page_token {
            req = req.query(&[("pageToken", token)]);
        }
        if let Some(f) = filter {
            req = req.query(&[("filter.advanced", f)]);
        }

        let resp = req.send().await.map_err(|e| AttemptFailure {
            status: e.status().map(|s| s.as_u16()),
            page_token: page_token.map(str::to_string),
            message: e.to_string(),
            retryable: e.is_timeout() || e.is_connect() || error::is_retryable_status(e.status().map(|s| s.as_u16())),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AttemptFailure {
                status: Some(status.as_u16()),
                page_token: page_token.map(str::to_string),
                message: body,
                retryable: error::is_retryable_status(Some(status.as_u16())),
            });
        }

        resp.json::<PageResponse>().await.map_err(|e| AttemptFailure {
            status: Some(status.as_u16()),
            page_token: page_token.map(str::to_string),
            message: format!("invalid JSON body: {e}"),
            retryable: false,
        })
    }

    /// Starts streaming raw studies, optionally filtered by `updated_since`.
    /// Returns a receiver yielding one raw study JSON object at a time (or a
    /// fatal `ClientError` as the last item before the channel closes), and
    /// a shared counter of retries consumed across all pages so the caller
    /// can fold it into run metrics once the stream is drained.
    pub fn stream(&self, updated_since: Option<NaiveDate>) -> (mpsc::Receiver<Result<Value, ClientError>>, Arc<AtomicU64>) {
        let (tx, rx) = mpsc::channel(self.config.page_size as usize);
        let retry_count = Arc::new(AtomicU64::new(0));
        let retry_count_producer = retry_count.clone();

        let http = self.http.clone();
        let config = self.config.clone();
        let filter = updated_since.map(Self::advanced_filter);

        tokio::spawn(async move {
            let client = ApiClient { http, config: config.clone() };
            let mut page_token: Option<String> = None;
            loop {
                let token_for_attempt = page_token.clone();
                let filter_ref = filter.as_deref();
                let result = retry::with_retry(config.max_retries, config.backoff_base_ms, config.backoff_cap_ms, |attempt| {
                    let token = token_for_attempt.clone();
                    let client = &client;
                    async move {
                        debug!("fetching page token={token:?} attempt={attempt}");
                        client.fetch_page(token.as_deref(), filter_ref).await
                    }
                })
                .await;

                match result {
                    Ok((page, retries_used)) => {
                        retry_count_producer.fetch_add(retries_used as u64, Ordering::Relaxed);
                        info!("fetched page of {} studies (next_token={:?})", page.studies.len(), page.next_page_token);
                        for study in page.studies {
                            if tx.send(Ok(study)).await.is_err() {
                                return; // consumer dropped
                            }
                        }
                        match page.next_page_token {
                            Some(next) => page_token = Some(next),
                            None => return, // terminal page
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
        });

        (rx, retry_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advanced_filter_formats_utc_date() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(ApiClient::advanced_filter(date), "AREA[LastUpdatePostDate]RANGE[2024-06-01,MAX]");
    }

    #[tokio::test]
    async fn streams_studies_across_two_pages_from_a_mock_server() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .and(query_param("pageToken", "T2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "studies": [{"nct_id": "NCT002"}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "studies": [{"nct_id": "NCT001"}],
                "nextPageToken": "T2",
            })))
            .mount(&server)
            .await;

        let config = ClientConfig { base_url: format!("{}/studies", server.uri()), ..Default::default() };
        let client = ApiClient::new(config).unwrap();
        let (mut rx, retry_count) = client.stream(None);

        let mut seen = Vec::new();
        while let Some(item) = rx.recv().await {
            seen.push(item.unwrap()["nct_id"].as_str().unwrap().to_string());
        }
        assert_eq!(seen, vec!["NCT001".to_string(), "NCT002".to_string()]);
        assert_eq!(retry_count.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn retries_on_503_then_succeeds() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/studies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"studies": []})))
            .mount(&server)
            .await;

        let config = ClientConfig {
            base_url: format!("{}/studies", server.uri()),
            backoff_base_ms: 1,
            backoff_cap_ms: 2,
            ..Default::default()
        };
        let client = ApiClient::new(config).unwrap();
        let (mut rx, retry_count) = client.stream(None);
        assert!(rx.recv().await.is_none());
        assert!(retry_count.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn fatal_on_unretryable_404() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/studies")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

        let config = ClientConfig { base_url: format!("{}/studies", server.uri()), ..Default::default() };
        let client = ApiClient::new(config).unwrap();
        let (mut rx, _retries) = client.stream(None);
        let first = rx.recv().await.expect("one item").unwrap_err();
        assert!(matches!(first, ClientError::UnretryableStatus { status: 404, .. }));
    }
}
