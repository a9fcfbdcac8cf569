use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::partial_date::PartialDate;

/// The raw study payload as fetched from the API: kept verbatim so a run can
/// be replayed from `raw_studies` without re-fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStudy {
    pub nct_id: String,
    pub last_updated_api: DateTime<Utc>,
    pub last_updated_api_str: String,
    pub payload: serde_json::Value,
}

/// One typed, validated study record — the primary row of the warehouse.
#[derive(Debug, Clone)]
pub struct Study {
    pub nct_id: String,
    pub brief_title: Option<String>,
    pub official_title: Option<String>,
    pub overall_status: Option<String>,
    pub start_date: PartialDate,
    pub primary_completion_date: PartialDate,
    pub study_type: Option<String>,
    pub brief_summary: Option<String>,
}

/// Allowed values for `overallStatus`, per the V2 API schema. A value outside
/// this set is a validation failure, not silently accepted.
pub const ALLOWED_OVERALL_STATUS: &[&str] = &[
    "ACTIVE_NOT_RECRUITING",
    "COMPLETED",
    "ENROLLING_BY_INVITATION",
    "NOT_YET_RECRUITING",
    "RECRUITING",
    "SUSPENDED",
    "TERMINATED",
    "WITHDRAWN",
    "AVAILABLE",
    "NO_LONGER_AVAILABLE",
    "TEMPORARILY_NOT_AVAILABLE",
    "APPROVED_FOR_MARKETING",
    "WITHHELD",
    "UNKNOWN",
];

/// Allowed values for `studyType`.
pub const ALLOWED_STUDY_TYPE: &[&str] = &["INTERVENTIONAL", "OBSERVATIONAL", "EXPANDED_ACCESS"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sponsor {
    pub nct_id: String,
    pub name: String,
    pub agency_class: String,
    pub is_lead: bool,
}

impl Sponsor {
    pub fn natural_key(&self) -> (String, String, String) {
        (self.nct_id.clone(), self.name.clone(), self.agency_class.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Condition {
    pub nct_id: String,
    pub name: String,
}

impl Condition {
    pub fn natural_key(&self) -> (String, String) {
        (self.nct_id.clone(), self.name.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intervention {
    pub nct_id: String,
    pub intervention_type: String,
    pub name: String,
    pub description: Option<String>,
}

impl Intervention {
    pub fn natural_key(&self) -> (String, String, String) {
        (self.nct_id.clone(), self.intervention_type.clone(), self.name.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterventionArmGroup {
    pub nct_id: String,
    pub intervention_name: String,
    pub arm_group_label: String,
}

impl InterventionArmGroup {
    pub fn natural_key(&self) -> (String, String, String) {
        (self.nct_id.clone(), self.intervention_name.clone(), self.arm_group_label.clone())
    }
}

/// Outcome type, restricted to PRIMARY/SECONDARY by the transform stage;
/// others are dropped before a row is ever constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutcomeType {
    Primary,
    Secondary,
}

impl OutcomeType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            OutcomeType::Primary => "PRIMARY",
            OutcomeType::Secondary => "SECONDARY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DesignOutcome {
    pub nct_id: String,
    pub outcome_type: OutcomeType,
    pub measure: String,
    pub time_frame: Option<String>,
    pub description: Option<String>,
}

impl DesignOutcome {
    pub fn natural_key(&self) -> (String, &'static str, String) {
        (self.nct_id.clone(), self.outcome_type.as_db_str(), self.measure.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoadStatus {
    Success,
    Failure,
}

impl LoadStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            LoadStatus::Success => "SUCCESS",
            LoadStatus::Failure => "FAILURE",
        }
    }
}

/// Metrics collected over one run, persisted verbatim as the `load_history`
/// metrics JSONB blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub studies_fetched: u64,
    pub studies_valid: u64,
    pub studies_invalid: u64,
    pub rows_merged: std::collections::BTreeMap<String, u64>,
    pub wall_clock_ms: u64,
    pub retry_count: u64,
    pub error: Option<String>,
}
