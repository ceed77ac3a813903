use serde::{Deserialize, Serialize};

use crate::types::{Region, RiskLevel, SituationType};

/// One line of the training file. Field names are part of the contract with
/// the fine-tuning framework: exactly `instruction`, `input`, `output`, plus
/// an optional `metadata` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub instruction: String,
    #[serde(default)]
    pub input: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExampleMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExampleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub situation_type: Option<SituationType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cultural_markers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources_mentioned: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

/// Composer input: a system instruction body with a fixed `Observation:`
/// slot at its tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionTemplate {
    pub id: String,
    pub template: String,
}

/// Composer input: one observation, joined to its instruction template and
/// expected output by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub id: String,
    pub text: String,
    pub instruction_template: String,
    pub output_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

/// Composer input: an expected response body with its declared risk level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: String,
    pub text: String,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub situation_type: Option<SituationType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}
