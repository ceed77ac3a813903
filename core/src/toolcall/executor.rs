use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::audit::{AuditStore, CrisisEventDraft};
use crate::registry::seed::{GLOBAL_EMERGENCY_GUIDANCE, emergency_number};
use crate::registry::store::{RegistrySnapshot, ResourceRegistry};
use crate::registry::types::Resource;
use crate::toolcall::error::ToolCallError;
use crate::toolcall::types::{ParsedOutput, Segment, ToolDirective};
use crate::types::{ChannelKind, Region, RiskLevel, SituationType, TopicTag};

/// At most this many resources are rendered per directive.
const RENDER_LIMIT: usize = 3;

/// Per-turn context the executor resolves against.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub region: Region,
    pub user_id: String,
    pub conversation_id: String,
    pub message_id: String,
    pub risk: RiskLevel,
    pub topic: Option<TopicTag>,
    pub triggered_patterns: Vec<String>,
    pub ai_failure_detected: bool,
    pub model_degradation_detected: bool,
    pub conversation_stopped: bool,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct Substitution {
    pub rendered: String,
    pub resource_ids: Vec<String>,
    pub degraded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ResolutionOutcome {
    pub substitutions: Vec<Substitution>,
    pub resource_ids: Vec<String>,
    pub degraded: bool,
    pub logged_event_ids: Vec<String>,
    /// Stable digest over the resolved payloads, for audit correlation.
    pub resolution_id: String,
}

/// Converts a model's textual output into a vetted final response. Literal
/// values only ever come from the registry snapshot taken at resolve time or
/// the per-region hard-coded emergency number.
pub struct ToolExecutor {
    registry: Arc<ResourceRegistry>,
    audit: Arc<AuditStore>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ResourceRegistry>, audit: Arc<AuditStore>) -> Self {
        Self { registry, audit }
    }

    /// Execute every directive against one registry snapshot. For a fixed
    /// `(directives, snapshot)` pair the rendered substitutions are
    /// deterministic; only audit event ids differ between runs.
    ///
    /// Lookups resolve before incident logging so that a `log_incident` in
    /// the same output records the resource ids actually substituted.
    pub fn resolve(
        &self,
        parsed: &ParsedOutput,
        ctx: &ResolveContext,
    ) -> Result<ResolutionOutcome, ToolCallError> {
        let snapshot = self.registry.snapshot();
        let mut outcome = ResolutionOutcome::default();
        let mut slots: Vec<Option<Substitution>> = vec![None; parsed.directives.len()];

        for (index, directive) in parsed.directives.iter().enumerate() {
            let substitution = match &directive.directive {
                ToolDirective::GetCrisisResources {
                    region,
                    situation_type,
                } => {
                    let region = region.unwrap_or(ctx.region);
                    self.resolve_resources(&snapshot, region, *situation_type, ctx.topic)
                }
                ToolDirective::CheckHallucination { resource, kind } => {
                    resolve_check(&snapshot, ctx.region, resource, *kind)
                }
                ToolDirective::LogIncident { .. } => continue,
            };
            outcome
                .resource_ids
                .extend(substitution.resource_ids.iter().cloned());
            outcome.degraded |= substitution.degraded;
            slots[index] = Some(substitution);
        }

        for (index, directive) in parsed.directives.iter().enumerate() {
            if let ToolDirective::LogIncident { incident_data } = &directive.directive {
                let event_id =
                    self.resolve_log_incident(incident_data, ctx, outcome.resource_ids.clone())?;
                outcome.logged_event_ids.push(event_id);
                slots[index] = Some(Substitution::default());
            }
        }

        outcome.substitutions = slots
            .into_iter()
            .map(|slot| slot.unwrap_or_default())
            .collect();
        outcome.resolution_id = derive_resolution_id(snapshot.generation, &outcome);
        Ok(outcome)
    }

    /// Replace each directive with its substitution block. The output never
    /// contains an unresolved `[TOOL_CALL:` substring, whatever the model
    /// managed to emit.
    pub fn render(&self, parsed: &ParsedOutput, outcome: &ResolutionOutcome) -> String {
        let mut out = String::new();
        for segment in &parsed.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Directive(index) => {
                    if let Some(substitution) = outcome.substitutions.get(*index) {
                        out.push_str(&substitution.rendered);
                    }
                }
            }
        }
        sanitize_residual_directives(&collapse_blank_lines(out.trim()))
    }

    fn resolve_resources(
        &self,
        snapshot: &RegistrySnapshot,
        region: Region,
        situation: SituationType,
        topic: Option<TopicTag>,
    ) -> Substitution {
        let resources = snapshot.lookup(region, situation, topic);
        if resources.is_empty() {
            // RegistryEmpty recovery: hard-coded emergency fallback, turn
            // marked degraded.
            tracing::warn!(
                target: "toolcall",
                region = %region,
                situation = %situation,
                "registry_empty_fallback"
            );
            return Substitution {
                rendered: emergency_fallback_text(region),
                resource_ids: Vec::new(),
                degraded: true,
            };
        }

        let rendered = format_resource_block(&resources);
        Substitution {
            resource_ids: resources
                .iter()
                .take(RENDER_LIMIT)
                .map(|r| r.resource_id.clone())
                .collect(),
            rendered,
            degraded: false,
        }
    }

    fn resolve_log_incident(
        &self,
        incident_data: &serde_json::Value,
        ctx: &ResolveContext,
        resources_substituted: Vec<String>,
    ) -> Result<String, ToolCallError> {
        let incident_type = incident_data
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("crisis_detected")
            .to_string();

        let event = self
            .audit
            .append(CrisisEventDraft {
                user_id: ctx.user_id.clone(),
                conversation_id: ctx.conversation_id.clone(),
                message_id: ctx.message_id.clone(),
                risk: ctx.risk,
                incident_type,
                triggered_patterns: ctx.triggered_patterns.clone(),
                ai_failure_detected: ctx.ai_failure_detected,
                model_degradation_detected: ctx.model_degradation_detected,
                conversation_stopped: ctx.conversation_stopped,
                resources_substituted,
                detected_at: ctx.now,
            })
            .map_err(|err| {
                crate::toolcall::error::malformed_directive(format!(
                    "incident log append failed: {err}"
                ))
            })?;
        Ok(event.event_id)
    }
}

fn resolve_check(
    snapshot: &RegistrySnapshot,
    region: Region,
    resource: &str,
    kind: ChannelKind,
) -> Substitution {
    let check = snapshot.is_fabrication(resource, kind, Some(region));
    if check.is_fabrication {
        let mut rendered = format!(
            "Please do not use {} - it is not a working service ({}).",
            resource, check.details
        );
        let mut resource_ids = Vec::new();
        if let Some(alternative) = &check.suggested_alternative {
            rendered.push_str(&format!("\n{}", format_resource_line(alternative)));
            resource_ids.push(alternative.resource_id.clone());
        }
        return Substitution {
            rendered,
            resource_ids,
            degraded: false,
        };
    }

    match snapshot.locate_value(resource, kind, Some(region)) {
        Some(found) if found.region == region => Substitution {
            rendered: format_resource_line(found),
            resource_ids: vec![found.resource_id.clone()],
            degraded: false,
        },
        _ => Substitution {
            // Unknown or wrong-region literal: suppress it entirely.
            rendered: String::new(),
            resource_ids: Vec::new(),
            degraded: false,
        },
    }
}

fn emergency_fallback_text(region: Region) -> String {
    match emergency_number(region) {
        Some(number) => format!(
            "If you are in immediate danger, call {} now.",
            number
        ),
        None => GLOBAL_EMERGENCY_GUIDANCE.to_string(),
    }
}

fn format_resource_block(resources: &[Resource]) -> String {
    resources
        .iter()
        .take(RENDER_LIMIT)
        .map(format_resource_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_resource_line(resource: &Resource) -> String {
    let contact = match resource.primary_channel() {
        Some(channel) => match channel.kind {
            ChannelKind::Phone => format!("call {}", channel.value),
            ChannelKind::Text => format!("text {}", channel.value),
            ChannelKind::Website => channel.value.clone(),
            ChannelKind::Email => format!("email {}", channel.value),
        },
        None => String::new(),
    };
    let mut line = format!("• {} - {}", contact, resource.service_name);
    if resource.hours.contains("24/7") {
        line.push_str(" (free, 24/7)");
    } else if !resource.hours.is_empty() {
        line.push_str(&format!(" ({})", resource.hours));
    }
    line
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_end());
    }
    out
}

/// Last line of defense: if a marker survived (nested or mangled beyond what
/// the lexer consumed), cut it out rather than forward it.
fn sanitize_residual_directives(text: &str) -> String {
    const MARKER: &str = "[TOOL_CALL:";
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    while let Some(offset) = text[cursor..].find(MARKER) {
        let start = cursor + offset;
        out.push_str(&text[cursor..start]);
        cursor = match text[start..].find(']') {
            Some(end) => start + end + 1,
            None => text.len(),
        };
    }
    out.push_str(&text[cursor..]);
    out
}

fn derive_resolution_id(generation: u64, outcome: &ResolutionOutcome) -> String {
    let mut hasher = Sha256::new();
    hasher.update(generation.to_be_bytes());
    for substitution in &outcome.substitutions {
        hasher.update(substitution.rendered.as_bytes());
        for id in &substitution.resource_ids {
            hasher.update(id.as_bytes());
        }
    }
    let digest = hasher.finalize();
    let hex = format!("{:x}", digest);
    format!("res:{}", &hex[..24])
}
