//! CSV encoding for `COPY ... FROM STDIN WITH (FORMAT csv)`.
//!
//! Every text field is quoted unconditionally so a genuine empty string
//! (`""`) stays distinguishable from SQL NULL (a bare, unquoted empty
//! field) — Postgres's CSV COPY format treats them differently only when
//! quoting is explicit.

use chrono::{DateTime, NaiveDate, Utc};
use ctgov_domain::{Condition, DesignOutcome, Intervention, InterventionArmGroup, RawStudy, Sponsor, Study};

pub trait CsvRow {
    fn columns() -> &'static [&'static str];
    fn to_csv_line(&self) -> String;
}

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn opt_quoted(s: &Option<String>) -> String {
    match s {
        Some(s) => quoted(s),
        None => String::new(),
    }
}

fn opt_date(d: &Option<NaiveDate>) -> String {
    match d {
        Some(d) => quoted(&d.format("%Y-%m-%d").to_string()),
        None => String::new(),
    }
}

fn timestamp(t: &DateTime<Utc>) -> String {
    quoted(&t.to_rfc3339())
}

impl CsvRow for RawStudy {
    fn columns() -> &'static [&'static str] {
        &["nct_id", "last_updated_api", "last_updated_api_str", "payload"]
    }

    fn to_csv_line(&self) -> String {
        let payload = serde_json::to_string(&self.payload).expect("serialize json payload");
        [quoted(&self.nct_id), timestamp(&self.last_updated_api), quoted(&self.last_updated_api_str), quoted(&payload)].join(",")
    }
}

impl CsvRow for Study {
    fn columns() -> &'static [&'static str] {
        &[
            "nct_id",
            "brief_title",
            "official_title",
            "overall_status",
            "start_date_raw",
            "start_date",
            "primary_completion_date_raw",
            "primary_completion_date",
            "study_type",
            "brief_summary",
        ]
    }

    fn to_csv_line(&self) -> String {
        [
            quoted(&self.nct_id),
            opt_quoted(&self.brief_title),
            opt_quoted(&self.official_title),
            opt_quoted(&self.overall_status),
            quoted(&self.start_date.raw),
            opt_date(&self.start_date.parsed),
            quoted(&self.primary_completion_date.raw),
            opt_date(&self.primary_completion_date.parsed),
            opt_quoted(&self.study_type),
            opt_quoted(&self.brief_summary),
        ]
        .join(",")
    }
}

impl CsvRow for Sponsor {
    fn columns() -> &'static [&'static str] {
        &["nct_id", "name", "agency_class", "is_lead"]
    }

    fn to_csv_line(&self) -> String {
        [quoted(&self.nct_id), quoted(&self.name), quoted(&self.agency_class), self.is_lead.to_string()].join(",")
    }
}

impl CsvRow for Condition {
    fn columns() -> &'static [&'static str] {
        &["nct_id", "name"]
    }

    fn to_csv_line(&self) -> String {
        [quoted(&self.nct_id), quoted(&self.name)].join(",")
    }
}

impl CsvRow for Intervention {
    fn columns() -> &'static [&'static str] {
        &["nct_id", "intervention_type", "name", "description"]
    }

    fn to_csv_line(&self) -> String {
        [quoted(&self.nct_id), quoted(&self.intervention_type), quoted(&self.name), opt_quoted(&self.description)].join(",")
    }
}

impl CsvRow for InterventionArmGroup {
    fn columns() -> &'static [&'static str] {
        &["nct_id", "intervention_name", "arm_group_label"]
    }

    fn to_csv_line(&self) -> String {
        [quoted(&self.nct_id), quoted(&self.intervention_name), quoted(&self.arm_group_label)].join(",")
    }
}

impl CsvRow for DesignOutcome {
    fn columns() -> &'static [&'static str] {
        &["nct_id", "outcome_type", "measure", "time_frame", "description"]
    }

    fn to_csv_line(&self) -> String {
        [
            quoted(&self.nct_id),
            quoted(self.outcome_type.as_db_str()),
            quoted(&self.measure),
            opt_quoted(&self.time_frame),
            opt_quoted(&self.description),
        ]
        .join(",")
    }
}

pub fn encode_rows<T: CsvRow>(rows: &[T]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.to_csv_line());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_and_missing_value_are_distinguishable() {
        let with_empty = Condition { nct_id: "NCT001".into(), name: String::new() };
        assert_eq!(with_empty.to_csv_line(), "\"NCT001\",\"\"");

        let missing = Sponsor { nct_id: "NCT001".into(), name: "Acme".into(), agency_class: "INDUSTRY".into(), is_lead: true };
        assert!(!missing.to_csv_line().is_empty());
    }

    #[test]
    fn quotes_inside_values_are_doubled() {
        let c = Condition { nct_id: "NCT001".into(), name: "Type 2 \"Diabetes\"".into() };
        assert_eq!(c.to_csv_line(), "\"NCT001\",\"Type 2 \"\"Diabetes\"\"\"");
    }
}
