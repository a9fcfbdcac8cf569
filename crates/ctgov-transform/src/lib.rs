//! ctgov-transform
//!
//! Structural validation of raw study JSON into typed `Study` records
//! (`validator`), and flattening of validated studies into per-table row
//! batches (`transformer`).

pub mod transformer;
pub mod validator;

pub use transformer::{transform, Batches};
pub use validator::{extract_nct_id, validate};
