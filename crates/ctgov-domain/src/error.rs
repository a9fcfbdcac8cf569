use thiserror::Error;

/// A structural or type defect found while parsing one raw study record.
///
/// Carries enough context for the dead-letter queue: which field failed and
/// why, plus the `nct_id` when one could be recovered before the failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field_path}: {message}")]
pub struct ValidationError {
    pub nct_id: Option<String>,
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(nct_id: Option<String>, field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { nct_id, field_path: field_path.into(), message: message.into() }
    }
}

/// Errors raised by the transform stage proper (as opposed to validation):
/// these indicate a study that passed validation but could not be flattened
/// into row batches, which the spec treats as a schema-drift defect.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unexpected shape for {field_path} while transforming {nct_id}: {message}")]
    UnexpectedShape { nct_id: String, field_path: String, message: String },
}
