use chrono::{DateTime, NaiveDate, Utc};
use ctgov_domain::{PartialDate, RawStudy, Study, ValidationError, ALLOWED_OVERALL_STATUS, ALLOWED_STUDY_TYPE};
use serde_json::Value;

/// Best-effort extraction of `nct_id`, used even when full validation later
/// fails so the orchestrator can attach an id to its diagnostics.
pub fn extract_nct_id(raw: &Value) -> Option<String> {
    raw.pointer("/protocolSection/identificationModule/nctId").and_then(Value::as_str).map(str::to_string)
}

fn required_str<'a>(raw: &'a Value, pointer: &str, nct_id: Option<&str>) -> Result<&'a str, ValidationError> {
    match raw.pointer(pointer) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ValidationError::new(
            nct_id.map(str::to_string),
            pointer.to_string(),
            format!("expected string, found {other}"),
        )),
        None => Err(ValidationError::new(nct_id.map(str::to_string), pointer.to_string(), "missing required field".to_string())),
    }
}

fn optional_str(raw: &Value, pointer: &str, nct_id: Option<&str>, field_path: &str) -> Result<Option<String>, ValidationError> {
    match raw.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => {
            Err(ValidationError::new(nct_id.map(str::to_string), field_path.to_string(), format!("expected string, found {other}")))
        }
    }
}

fn optional_enum(
    raw: &Value,
    pointer: &str,
    allowed: &[&str],
    nct_id: Option<&str>,
    field_path: &str,
) -> Result<Option<String>, ValidationError> {
    match optional_str(raw, pointer, nct_id, field_path)? {
        None => Ok(None),
        Some(value) if allowed.contains(&value.as_str()) => Ok(Some(value)),
        Some(value) => Err(ValidationError::new(
            nct_id.map(str::to_string),
            field_path.to_string(),
            format!("'{value}' is not one of the allowed values"),
        )),
    }
}

fn optional_date(raw: &Value, pointer: &str, nct_id: Option<&str>, field_path: &str) -> Result<PartialDate, ValidationError> {
    match optional_str(raw, pointer, nct_id, field_path)? {
        None => Ok(PartialDate::default()),
        Some(s) => Ok(PartialDate::parse(&s)),
    }
}

/// Validates one raw study payload and, on success, the `RawStudy` envelope
/// used to populate `raw_studies`.
pub fn validate(raw: &Value) -> Result<(Study, RawStudy), ValidationError> {
    let nct_id_opt = extract_nct_id(raw);
    let nct_id = match nct_id_opt.as_deref() {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => {
            return Err(ValidationError::new(
                None,
                "/protocolSection/identificationModule/nctId".to_string(),
                "nct_id is missing or empty".to_string(),
            ))
        }
    };
    let id = nct_id.as_str();

    let brief_title = optional_str(raw, "/protocolSection/identificationModule/briefTitle", Some(id), "briefTitle")?;
    let official_title = optional_str(raw, "/protocolSection/identificationModule/officialTitle", Some(id), "officialTitle")?;
    let overall_status = optional_enum(
        raw,
        "/protocolSection/statusModule/overallStatus",
        ALLOWED_OVERALL_STATUS,
        Some(id),
        "overallStatus",
    )?;
    let study_type = optional_enum(raw, "/protocolSection/designModule/studyType", ALLOWED_STUDY_TYPE, Some(id), "studyType")?;
    let brief_summary = optional_str(raw, "/protocolSection/descriptionModule/briefSummary", Some(id), "briefSummary")?;
    let start_date = optional_date(raw, "/protocolSection/statusModule/startDateStruct/date", Some(id), "startDateStruct.date")?;
    let primary_completion_date = optional_date(
        raw,
        "/protocolSection/statusModule/primaryCompletionDateStruct/date",
        Some(id),
        "primaryCompletionDateStruct.date",
    )?;

    let last_updated_str = required_str(raw, "/protocolSection/statusModule/lastUpdatePostDateStruct/date", Some(id))?;
    let last_updated_api = parse_last_updated(last_updated_str)
        .ok_or_else(|| ValidationError::new(Some(nct_id.clone()), "lastUpdatePostDateStruct.date".to_string(), format!("unparseable date: {last_updated_str}")))?;

    let study = Study {
        nct_id: nct_id.clone(),
        brief_title,
        official_title,
        overall_status,
        start_date,
        primary_completion_date,
        study_type,
        brief_summary,
    };

    let raw_study = RawStudy {
        nct_id,
        last_updated_api,
        last_updated_api_str: last_updated_str.to_string(),
        payload: raw.clone(),
    };

    Ok((study, raw_study))
}

fn parse_last_updated(s: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(DateTime::from_naive_utc_and_offset(date.and_hms_opt(0, 0, 0)?, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_valid(nct_id: &str) -> Value {
        json!({
            "protocolSection": {
                "identificationModule": {"nctId": nct_id, "briefTitle": "A trial"},
                "statusModule": {
                    "overallStatus": "RECRUITING",
                    "lastUpdatePostDateStruct": {"date": "2024-05-01"}
                }
            }
        })
    }

    #[test]
    fn missing_nct_id_is_invalid() {
        let raw = json!({"protocolSection": {}});
        let err = validate(&raw).unwrap_err();
        assert!(err.nct_id.is_none());
    }

    #[test]
    fn wrong_kind_scalar_is_invalid() {
        let mut raw = minimal_valid("NCT001");
        raw["protocolSection"]["identificationModule"]["briefTitle"] = json!(["not", "a", "string"]);
        let err = validate(&raw).unwrap_err();
        assert_eq!(err.nct_id.as_deref(), Some("NCT001"));
    }

    #[test]
    fn disallowed_enum_value_is_invalid() {
        let mut raw = minimal_valid("NCT001");
        raw["protocolSection"]["statusModule"]["overallStatus"] = json!("NOT_A_REAL_STATUS");
        assert!(validate(&raw).is_err());
    }

    #[test]
    fn partial_year_only_date_keeps_raw_without_parsed() {
        let mut raw = minimal_valid("NCT001");
        raw["protocolSection"]["statusModule"]["startDateStruct"] = json!({"date": "2024"});
        let (study, _) = validate(&raw).unwrap();
        assert_eq!(study.start_date.raw, "2024");
        assert!(study.start_date.parsed.is_none());
    }

    #[test]
    fn valid_minimal_record_passes() {
        let raw = minimal_valid("NCT001");
        let (study, raw_study) = validate(&raw).unwrap();
        assert_eq!(study.nct_id, "NCT001");
        assert_eq!(raw_study.last_updated_api_str, "2024-05-01");
    }
}
