use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerStatus {
    Pending,
    Reviewed,
    Dismissed,
}

/// Append-only audit record for an elevated-risk turn. Created by the
/// orchestrator; only the human review workflow touches it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisEvent {
    pub event_id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub message_id: String,
    pub risk: RiskLevel,
    pub severity: u8,
    pub incident_type: String,
    pub triggered_patterns: Vec<String>,
    pub ai_failure_detected: bool,
    pub model_degradation_detected: bool,
    pub conversation_stopped: bool,
    /// Registry ids, never literals.
    pub resources_substituted: Vec<String>,
    pub detected_at: DateTime<Utc>,
    pub reviewer_status: ReviewerStatus,
}

/// Everything the orchestrator knows before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrisisEventDraft {
    pub user_id: String,
    pub conversation_id: String,
    pub message_id: String,
    pub risk: RiskLevel,
    pub incident_type: String,
    pub triggered_patterns: Vec<String>,
    pub ai_failure_detected: bool,
    pub model_degradation_detected: bool,
    pub conversation_stopped: bool,
    pub resources_substituted: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

impl CrisisEventDraft {
    pub fn into_event(self, event_id: String) -> CrisisEvent {
        CrisisEvent {
            event_id,
            user_id: self.user_id,
            conversation_id: self.conversation_id,
            message_id: self.message_id,
            risk: self.risk,
            severity: self.risk.severity_rank(),
            incident_type: self.incident_type,
            triggered_patterns: self.triggered_patterns,
            ai_failure_detected: self.ai_failure_detected,
            model_degradation_detected: self.model_degradation_detected,
            conversation_stopped: self.conversation_stopped,
            resources_substituted: self.resources_substituted,
            detected_at: self.detected_at,
            reviewer_status: ReviewerStatus::Pending,
        }
    }
}
