use crate::study::{Condition, DesignOutcome, Intervention, InterventionArmGroup, RawStudy, Sponsor, Study};

/// The seven target tables the warehouse is built from, in the dependency
/// order `raw_studies` → `studies` must be merged in (children have no
/// ordering constraint among themselves).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    RawStudies,
    Studies,
    Sponsors,
    Conditions,
    Interventions,
    InterventionArmGroups,
    DesignOutcomes,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::RawStudies,
        Table::Studies,
        Table::Sponsors,
        Table::Conditions,
        Table::Interventions,
        Table::InterventionArmGroups,
        Table::DesignOutcomes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::RawStudies => "raw_studies",
            Table::Studies => "studies",
            Table::Sponsors => "sponsors",
            Table::Conditions => "conditions",
            Table::Interventions => "interventions",
            Table::InterventionArmGroups => "intervention_arm_groups",
            Table::DesignOutcomes => "design_outcomes",
        }
    }

    pub fn staging_name(&self) -> String {
        format!("staging_{}", self.name())
    }

    /// The natural (or in `raw_studies`'s case, primary) key columns used as
    /// the `ON CONFLICT` target during merge.
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Table::RawStudies => &["nct_id"],
            Table::Studies => &["nct_id"],
            Table::Sponsors => &["nct_id", "name", "agency_class"],
            Table::Conditions => &["nct_id", "name"],
            Table::Interventions => &["nct_id", "intervention_type", "name"],
            Table::InterventionArmGroups => &["nct_id", "intervention_name", "arm_group_label"],
            Table::DesignOutcomes => &["nct_id", "outcome_type", "measure"],
        }
    }
}

/// A typed batch of rows for exactly one table — the "typed row struct plus
/// growable sequence" that stands in for the source's dynamic tabular
/// frame. The Connector matches on the variant to drive its bulk-load
/// protocol; nothing here is serialized through an intermediate generic
/// object.
#[derive(Debug, Default)]
pub enum TableBatch {
    #[default]
    Empty,
    RawStudies(Vec<RawStudy>),
    Studies(Vec<Study>),
    Sponsors(Vec<Sponsor>),
    Conditions(Vec<Condition>),
    Interventions(Vec<Intervention>),
    InterventionArmGroups(Vec<InterventionArmGroup>),
    DesignOutcomes(Vec<DesignOutcome>),
}

impl TableBatch {
    pub fn len(&self) -> usize {
        match self {
            TableBatch::Empty => 0,
            TableBatch::RawStudies(v) => v.len(),
            TableBatch::Studies(v) => v.len(),
            TableBatch::Sponsors(v) => v.len(),
            TableBatch::Conditions(v) => v.len(),
            TableBatch::Interventions(v) => v.len(),
            TableBatch::InterventionArmGroups(v) => v.len(),
            TableBatch::DesignOutcomes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn table(&self) -> Option<Table> {
        match self {
            TableBatch::Empty => None,
            TableBatch::RawStudies(_) => Some(Table::RawStudies),
            TableBatch::Studies(_) => Some(Table::Studies),
            TableBatch::Sponsors(_) => Some(Table::Sponsors),
            TableBatch::Conditions(_) => Some(Table::Conditions),
            TableBatch::Interventions(_) => Some(Table::Interventions),
            TableBatch::InterventionArmGroups(_) => Some(Table::InterventionArmGroups),
            TableBatch::DesignOutcomes(_) => Some(Table::DesignOutcomes),
        }
    }
}
