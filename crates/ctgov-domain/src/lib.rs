//! ctgov-domain
//!
//! Shared typed records for the ClinicalTrials.gov ETL engine: the raw
//! payload, the normalized `Study` and its child tables, dead-letter and
//! load-history entries, and the validation error type routed to the DLQ.

pub mod error;
pub mod partial_date;
pub mod study;
pub mod table;

pub use error::{TransformError, ValidationError};
pub use partial_date::PartialDate;
pub use study::{
    Condition, DesignOutcome, Intervention, InterventionArmGroup, LoadStatus, OutcomeType, RawStudy, RunMetrics,
    Sponsor, Study, ALLOWED_OVERALL_STATUS, ALLOWED_STUDY_TYPE,
};
pub use table::{Table, TableBatch};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_date_full_parses() {
        let d = PartialDate::parse("2024-03-15");
        assert!(d.parsed.is_some());
        assert_eq!(d.raw, "2024-03-15");
    }

    #[test]
    fn partial_date_year_only_keeps_raw_without_parsed() {
        let d = PartialDate::parse("2024");
        assert!(d.parsed.is_none());
        assert_eq!(d.raw, "2024");
    }

    #[test]
    fn sponsor_natural_key_is_nct_name_agency() {
        let s = Sponsor { nct_id: "NCT001".into(), name: "Acme".into(), agency_class: "INDUSTRY".into(), is_lead: true };
        assert_eq!(s.natural_key(), ("NCT001".to_string(), "Acme".to_string(), "INDUSTRY".to_string()));
    }
}
