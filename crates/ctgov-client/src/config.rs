/// Configuration for the API client, constructed once by the caller and
/// passed in explicitly — no ambient singleton.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub page_size: u32,
    pub max_retries: u32,
    pub timeout_seconds: u64,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://clinicaltrials.gov/api/v2/studies".to_string(),
            page_size: 100,
            max_retries: 5,
            timeout_seconds: 30,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 10_000,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            base_url: std::env::var("CTGOV_API_BASE_URL").unwrap_or(default.base_url),
            page_size: std::env::var("CTGOV_PAGE_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.page_size),
            max_retries: std::env::var("CTGOV_MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            timeout_seconds: std::env::var("CTGOV_TIMEOUT_SECONDS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.timeout_seconds),
            ..default
        }
    }
}
