/// Which load was requested, and therefore which high-water mark filter (if
/// any) the API Client stream is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    Full,
    Delta,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Rows buffered per table before a batch is flushed (loaded + merged)
    /// mid-run, so staging tables stay reusable across the whole run.
    pub batch_size_rows: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { batch_size_rows: 5000 }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let batch_size_rows = std::env::var("CTGOV_BATCH_SIZE_ROWS").ok().and_then(|v| v.parse().ok()).unwrap_or(5000);
        Self { batch_size_rows }
    }
}
