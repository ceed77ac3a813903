use serde::{Deserialize, Serialize};

use crate::types::{ChannelKind, Region, SituationType};

pub const TOOL_GET_CRISIS_RESOURCES: &str = "get_crisis_resources";
pub const TOOL_CHECK_HALLUCINATION: &str = "check_hallucination";
pub const TOOL_LOG_INCIDENT: &str = "log_incident";

pub const TOOL_NAMES: [&str; 3] = [
    TOOL_GET_CRISIS_RESOURCES,
    TOOL_CHECK_HALLUCINATION,
    TOOL_LOG_INCIDENT,
];

/// The closed tool set. Dispatch is a sum type with a schema per variant,
/// never a runtime name lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolDirective {
    GetCrisisResources {
        /// Absent region means "the turn's region".
        region: Option<Region>,
        situation_type: SituationType,
    },
    CheckHallucination {
        resource: String,
        kind: ChannelKind,
    },
    LogIncident {
        incident_data: serde_json::Value,
    },
}

impl ToolDirective {
    pub fn name(&self) -> &'static str {
        match self {
            ToolDirective::GetCrisisResources { .. } => TOOL_GET_CRISIS_RESOURCES,
            ToolDirective::CheckHallucination { .. } => TOOL_CHECK_HALLUCINATION,
            ToolDirective::LogIncident { .. } => TOOL_LOG_INCIDENT,
        }
    }

    /// Canonical textual form, re-parseable by the lexer. Re-parsing a text
    /// with directives re-inserted in this form yields the same list.
    pub fn canonical_text(&self) -> String {
        match self {
            ToolDirective::GetCrisisResources {
                region,
                situation_type,
            } => match region {
                Some(region) => format!(
                    "[TOOL_CALL: get_crisis_resources(region='{}', situation_type='{}')]",
                    region, situation_type
                ),
                None => format!(
                    "[TOOL_CALL: get_crisis_resources(situation_type='{}')]",
                    situation_type
                ),
            },
            ToolDirective::CheckHallucination { resource, kind } => format!(
                "[TOOL_CALL: check_hallucination(resource='{}', type='{}')]",
                resource, kind
            ),
            ToolDirective::LogIncident { incident_data } => format!(
                "[TOOL_CALL: log_incident(incident_data={})]",
                incident_data
            ),
        }
    }
}

/// A directive as it appeared in model text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDirective {
    pub directive: ToolDirective,
    pub raw: String,
}

/// The model output split around its directives.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Directive(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOutput {
    pub segments: Vec<Segment>,
    pub directives: Vec<ParsedDirective>,
}

impl ParsedOutput {
    pub fn has_directives(&self) -> bool {
        !self.directives.is_empty()
    }

    pub fn directive_names(&self) -> Vec<&'static str> {
        self.directives.iter().map(|d| d.directive.name()).collect()
    }

    /// Re-insert canonical directive text in place of each directive slot.
    pub fn reassemble(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Directive(index) => {
                    if let Some(parsed) = self.directives.get(*index) {
                        out.push_str(&parsed.directive.canonical_text());
                    }
                }
            }
        }
        out
    }
}
