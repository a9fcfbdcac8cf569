use std::collections::HashSet;

use ctgov_domain::{
    Condition, DesignOutcome, Intervention, InterventionArmGroup, OutcomeType, RawStudy, Sponsor, Study, TableBatch,
    TransformError,
};
use serde_json::Value;

/// In-memory per-table row buffers. Owned exclusively by the orchestrator;
/// the transformer only ever appends to them.
#[derive(Debug, Default)]
pub struct Batches {
    pub raw_studies: Vec<RawStudy>,
    pub studies: Vec<Study>,
    pub sponsors: Vec<Sponsor>,
    pub conditions: Vec<Condition>,
    pub interventions: Vec<Intervention>,
    pub intervention_arm_groups: Vec<InterventionArmGroup>,
    pub design_outcomes: Vec<DesignOutcome>,
}

impl Batches {
    pub fn is_empty(&self) -> bool {
        self.raw_studies.is_empty()
            && self.studies.is_empty()
            && self.sponsors.is_empty()
            && self.conditions.is_empty()
            && self.interventions.is_empty()
            && self.intervention_arm_groups.is_empty()
            && self.design_outcomes.is_empty()
    }

    /// Takes ownership of the current contents of one table's buffer,
    /// leaving it empty. Used to flush a batch to the connector without
    /// cloning.
    pub fn take(&mut self, table: ctgov_domain::Table) -> TableBatch {
        use ctgov_domain::Table::*;
        match table {
            RawStudies => TableBatch::RawStudies(std::mem::take(&mut self.raw_studies)),
            Studies => TableBatch::Studies(std::mem::take(&mut self.studies)),
            Sponsors => TableBatch::Sponsors(std::mem::take(&mut self.sponsors)),
            Conditions => TableBatch::Conditions(std::mem::take(&mut self.conditions)),
            Interventions => TableBatch::Interventions(std::mem::take(&mut self.interventions)),
            InterventionArmGroups => TableBatch::InterventionArmGroups(std::mem::take(&mut self.intervention_arm_groups)),
            DesignOutcomes => TableBatch::DesignOutcomes(std::mem::take(&mut self.design_outcomes)),
        }
    }

    pub fn len(&self, table: ctgov_domain::Table) -> usize {
        use ctgov_domain::Table::*;
        match table {
            RawStudies => self.raw_studies.len(),
            Studies => self.studies.len(),
            Sponsors => self.sponsors.len(),
            Conditions => self.conditions.len(),
            Interventions => self.interventions.len(),
            InterventionArmGroups => self.intervention_arm_groups.len(),
            DesignOutcomes => self.design_outcomes.len(),
        }
    }
}

/// Flattens one validated study into the seven table buffers. Stateless
/// between calls — all dedup state is local to this one study.
pub fn transform(study: Study, raw_study: RawStudy, raw: &Value, batches: &mut Batches) -> Result<(), TransformError> {
    let nct_id = study.nct_id.clone();
    batches.raw_studies.push(raw_study);
    push_sponsors(&nct_id, raw, batches);
    push_conditions(&nct_id, raw, batches);
    push_interventions_and_arm_groups(&nct_id, raw, batches)?;
    push_design_outcomes(&nct_id, raw, batches);
    batches.studies.push(study);
    Ok(())
}

fn push_sponsors(nct_id: &str, raw: &Value, batches: &mut Batches) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut push = |name: Option<&str>, class: Option<&str>, is_lead: bool, batches: &mut Batches| {
        let (Some(name), Some(class)) = (name, class) else { return };
        let key = (name.to_string(), class.to_string());
        if seen.insert(key) {
            batches.sponsors.push(Sponsor { nct_id: nct_id.to_string(), name: name.to_string(), agency_class: class.to_string(), is_lead });
        }
    };

    if let Some(lead) = raw.pointer("/protocolSection/sponsorCollaboratorsModule/leadSponsor") {
        push(lead.get("name").and_then(Value::as_str), lead.get("class").and_then(Value::as_str), true, batches);
    }
    if let Some(collaborators) = raw.pointer("/protocolSection/sponsorCollaboratorsModule/collaborators").and_then(Value::as_array) {
        for c in collaborators {
            push(c.get("name").and_then(Value::as_str), c.get("class").and_then(Value::as_str), false, batches);
        }
    }
}

fn push_conditions(nct_id: &str, raw: &Value, batches: &mut Batches) {
    let mut seen: HashSet<String> = HashSet::new();
    if let Some(conditions) = raw.pointer("/protocolSection/conditionsModule/conditions").and_then(Value::as_array) {
        for c in conditions {
            if let Some(name) = c.as_str() {
                if seen.insert(name.to_string()) {
                    batches.conditions.push(Condition { nct_id: nct_id.to_string(), name: name.to_string() });
                }
            }
        }
    }
}

fn push_interventions_and_arm_groups(nct_id: &str, raw: &Value, batches: &mut Batches) -> Result<(), TransformError> {
    let Some(interventions) = raw.pointer("/protocolSection/armsInterventionsModule/interventions") else { return Ok(()) };
    let interventions = interventions.as_array().ok_or_else(|| TransformError::UnexpectedShape {
        nct_id: nct_id.to_string(),
        field_path: "armsInterventionsModule.interventions".to_string(),
        message: "expected an array".to_string(),
    })?;

    let mut seen_interventions: HashSet<(String, String)> = HashSet::new();
    let mut seen_arm_groups: HashSet<(String, String)> = HashSet::new();
    for i in interventions {
        let (Some(itype), Some(name)) = (i.get("type").and_then(Value::as_str), i.get("name").and_then(Value::as_str)) else {
            continue;
        };
        if seen_interventions.insert((itype.to_string(), name.to_string())) {
            batches.interventions.push(Intervention {
                nct_id: nct_id.to_string(),
                intervention_type: itype.to_string(),
                name: name.to_string(),
                description: i.get("description").and_then(Value::as_str).map(str::to_string),
            });
        }
        if let Some(labels) = i.get("armGroupLabels").and_then(Value::as_array) {
            for label in labels {
                if let Some(label) = label.as_str() {
                    if seen_arm_groups.insert((name.to_string(), label.to_string())) {
                        batches.intervention_arm_groups.push(InterventionArmGroup {
                            nct_id: nct_id.to_string(),
                            intervention_name: name.to_string(),
                            arm_group_label: label.to_string(),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

fn push_design_outcomes(nct_id: &str, raw: &Value, batches: &mut Batches) {
    let mut seen: HashSet<(&'static str, String)> = HashSet::new();
    let mut push_all = |pointer: &str, outcome_type: OutcomeType, batches: &mut Batches| {
        let Some(outcomes) = raw.pointer(pointer).and_then(Value::as_array) else { return };
        for o in outcomes {
            let Some(measure) = o.get("measure").and_then(Value::as_str) else { continue };
            let key = (outcome_type.as_db_str(), measure.to_string());
            if seen.insert(key) {
                batches.design_outcomes.push(DesignOutcome {
                    nct_id: nct_id.to_string(),
                    outcome_type: match outcome_type {
                        OutcomeType::Primary => OutcomeType::Primary,
                        OutcomeType::Secondary => OutcomeType::Secondary,
                    },
                    measure: measure.to_string(),
                    time_frame: o.get("timeFrame").and_then(Value::as_str).map(str::to_string),
                    description: o.get("description").and_then(Value::as_str).map(str::to_string),
                });
            }
        }
    };
    push_all("/protocolSection/outcomesModule/primaryOutcomes", OutcomeType::Primary, batches);
    push_all("/protocolSection/outcomesModule/secondaryOutcomes", OutcomeType::Secondary, batches);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn raw_study(nct_id: &str) -> RawStudy {
        RawStudy { nct_id: nct_id.to_string(), last_updated_api: Utc::now(), last_updated_api_str: "2024-05-01".to_string(), payload: Value::Null }
    }

    fn study(nct_id: &str) -> Study {
        Study {
            nct_id: nct_id.to_string(),
            brief_title: None,
            official_title: None,
            overall_status: None,
            start_date: Default::default(),
            primary_completion_date: Default::default(),
            study_type: None,
            brief_summary: None,
        }
    }

    #[test]
    fn duplicate_conditions_collapse_to_one_row() {
        let raw = json!({"protocolSection": {"conditionsModule": {"conditions": ["Asthma", "Asthma", "COPD"]}}});
        let mut batches = Batches::default();
        transform(study("NCT001"), raw_study("NCT001"), &raw, &mut batches).unwrap();
        assert_eq!(batches.conditions.len(), 2);
    }

    #[test]
    fn lead_sponsor_is_marked_lead_collaborators_are_not() {
        let raw = json!({
            "protocolSection": {
                "sponsorCollaboratorsModule": {
                    "leadSponsor": {"name": "Acme", "class": "INDUSTRY"},
                    "collaborators": [{"name": "NIH", "class": "NIH"}]
                }
            }
        });
        let mut batches = Batches::default();
        transform(study("NCT001"), raw_study("NCT001"), &raw, &mut batches).unwrap();
        assert_eq!(batches.sponsors.len(), 2);
        assert!(batches.sponsors.iter().find(|s| s.name == "Acme").unwrap().is_lead);
        assert!(!batches.sponsors.iter().find(|s| s.name == "NIH").unwrap().is_lead);
    }

    #[test]
    fn intervention_arm_group_labels_produce_one_row_each() {
        let raw = json!({
            "protocolSection": {
                "armsInterventionsModule": {
                    "interventions": [{
                        "type": "DRUG", "name": "Aspirin", "armGroupLabels": ["Arm A", "Arm B"]
                    }]
                }
            }
        });
        let mut batches = Batches::default();
        transform(study("NCT001"), raw_study("NCT001"), &raw, &mut batches).unwrap();
        assert_eq!(batches.interventions.len(), 1);
        assert_eq!(batches.intervention_arm_groups.len(), 2);
    }

    #[test]
    fn non_primary_secondary_outcome_types_are_skipped() {
        let raw = json!({
            "protocolSection": {
                "outcomesModule": {
                    "primaryOutcomes": [{"measure": "Survival"}],
                    "secondaryOutcomes": [{"measure": "QoL"}]
                }
            }
        });
        let mut batches = Batches::default();
        transform(study("NCT001"), raw_study("NCT001"), &raw, &mut batches).unwrap();
        assert_eq!(batches.design_outcomes.len(), 2);
    }

    #[test]
    fn malformed_interventions_shape_is_a_transform_error() {
        let raw = json!({"protocolSection": {"armsInterventionsModule": {"interventions": "not-an-array"}}});
        let mut batches = Batches::default();
        let err = transform(study("NCT001"), raw_study("NCT001"), &raw, &mut batches).unwrap_err();
        assert!(matches!(err, TransformError::UnexpectedShape { .. }));
    }
}
