use serde::{Deserialize, Serialize};

use crate::triage::pre_scan::HistoryTurn;
use crate::types::{Region, RiskLevel};

/// One user turn entering the pipeline. Identifiers are opaque; the caller
/// serializes turns per `(user_id, conversation_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub user_text: String,
    #[serde(default = "default_region")]
    pub region: Region,
    pub user_id: String,
    pub conversation_id: String,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

fn default_region() -> Region {
    Region::Global
}

/// What the caller gets back. Never an error: every failure inside the
/// pipeline maps to a safe, registered response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub final_text: String,
    pub risk: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default)]
    pub ai_failure_detected: bool,
    #[serde(default)]
    pub model_degradation_detected: bool,
    #[serde(default)]
    pub conversation_stopped: bool,
}
