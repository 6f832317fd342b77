// eval-types-rs/src/proposal.rs
// Read-only input record for one evaluation run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One participant skill record attached to a proposal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechCapability {
    pub category: String,
    pub field: String,
    pub skill: String,
    pub level: String,
}

/// An AI-project proposal as handed over by the persistence layer.
///
/// All free-text fields are optional; prompt rendering substitutes "N/A"
/// for anything the submitter left blank. The record is immutable for the
/// duration of one evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Proposal {
    /// Caller-side identifier, echoed back in batch error reports.
    pub id: i64,
    pub subject: Option<String>,
    pub division: Option<String>,
    pub department: Option<String>,
    pub current_work: Option<String>,
    pub pain_point: Option<String>,
    pub improvement_idea: Option<String>,
    pub expected_effect: Option<String>,
    pub hope: Option<String>,
    pub participant_count: Option<u32>,
    pub representative_name: Option<String>,
    /// Pre-survey answers, key -> free-form JSON value.
    #[serde(default)]
    pub pre_survey: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tech_capabilities: Vec<TechCapability>,
}

impl Proposal {
    /// "division > department" line used in every prompt header.
    pub fn department_info(&self) -> String {
        format!(
            "{} > {}",
            self.division.as_deref().unwrap_or("N/A"),
            self.department.as_deref().unwrap_or("N/A")
        )
    }
}
