//! Top-level error type composing every subsystem boundary, matching the
//! teacher's layered `CoreError`/`DomainError`/`PersistenceError` split with
//! one enum per crate and a single composed type at the orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("extraction failed: {0}")]
    Client(#[from] ctgov_client::ClientError),
    #[error("transform failed: {0}")]
    Transform(#[from] ctgov_domain::TransformError),
    #[error("connector failed: {0}")]
    Connector(#[from] ctgov_connector::ConnectorError),
    #[error("run cancelled")]
    Cancelled,
}

impl OrchestratorError {
    /// Maps to the CLI's exit-code taxonomy: transient failures (worth a
    /// retry) vs. fatal/configuration failures.
    pub fn is_transient(&self) -> bool {
        match self {
            OrchestratorError::Client(ctgov_client::ClientError::Fatal { .. }) => true,
            OrchestratorError::Connector(e) => e.is_retryable(),
            _ => false,
        }
    }
}
