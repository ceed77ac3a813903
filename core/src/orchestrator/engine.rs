use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::audit::{AuditStore, CrisisEventDraft};
use crate::model::{ModelPort, ModelRequest};
use crate::observability::metrics as obs;
use crate::orchestrator::prompts::safety_system_prompt;
use crate::orchestrator::types::{TurnRequest, TurnResponse};
use crate::registry::seed::{GLOBAL_EMERGENCY_GUIDANCE, emergency_number};
use crate::registry::store::ResourceRegistry;
use crate::toolcall::{
    ParsedDirective, ParsedOutput, ResolveContext, Segment, ToolDirective, ToolExecutor, parse,
};
use crate::triage::patterns::PatternBank;
use crate::triage::post_scan::{PostScanFindingKind, PostScanReport, post_scan};
use crate::triage::pre_scan::{PreScanReport, pre_scan};
use crate::types::{Region, RiskLevel, SituationType};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub model_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model_timeout: Duration::from_secs(5),
        }
    }
}

/// Per-turn pipeline: pre-scan, optional model call, parse, post-scan,
/// resolve, render, audit. One instance per logical request stream; many
/// instances share the registry and audit store.
pub struct Orchestrator {
    registry: Arc<ResourceRegistry>,
    audit: Arc<AuditStore>,
    executor: ToolExecutor,
    model: Arc<dyn ModelPort>,
    banks: BTreeMap<Region, PatternBank>,
    config: OrchestratorConfig,
}

enum ModelWait {
    Cancelled,
    TimedOut,
    Failed(String),
    Replied(String),
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ResourceRegistry>,
        audit: Arc<AuditStore>,
        model: Arc<dyn ModelPort>,
        config: OrchestratorConfig,
    ) -> Self {
        let banks = Region::ALL
            .iter()
            .map(|region| (*region, PatternBank::for_region(*region)))
            .collect();
        let executor = ToolExecutor::new(registry.clone(), audit.clone());
        Self {
            registry,
            audit,
            executor,
            model,
            banks,
            config,
        }
    }

    /// Never returns an error to the caller: every failure maps to a safe,
    /// registered response plus an audit entry.
    pub async fn handle_turn(
        &self,
        request: TurnRequest,
        cancel: &CancellationToken,
    ) -> TurnResponse {
        let message_id = request
            .message_id
            .clone()
            .unwrap_or_else(|| format!("msg:{}", Uuid::now_v7()));
        let bank = self
            .banks
            .get(&request.region)
            .unwrap_or_else(|| &self.banks[&Region::Global]);
        let report = pre_scan(bank, &request.user_text, &request.history);

        obs::record_turn(report.risk);
        obs::record_registry_generation(self.registry.snapshot().generation);
        tracing::info!(
            target: "orchestrator",
            region = %request.region,
            risk = %report.risk,
            patterns = ?report.pattern_ids,
            degradation = report.degradation_detected,
            "turn_prescanned"
        );

        // CRITICAL short-circuits: the model is never consulted on an
        // imminent-danger turn.
        if report.risk == RiskLevel::Critical {
            obs::record_critical_short_circuit();
            return self.rule_tier_response(&request, &report, &message_id, true, false);
        }

        let model_request = ModelRequest {
            system_prompt: safety_system_prompt(request.region),
            user_text: request.user_text.clone(),
            history: request.history.clone(),
        };
        let wait = {
            let timed = tokio::time::timeout(
                self.config.model_timeout,
                self.model.complete(model_request),
            );
            tokio::select! {
                _ = cancel.cancelled() => ModelWait::Cancelled,
                outcome = timed => match outcome {
                    Err(_) => ModelWait::TimedOut,
                    Ok(Err(err)) => ModelWait::Failed(err.to_string()),
                    Ok(Ok(reply)) => ModelWait::Replied(reply.text),
                },
            }
        };
        // Cancellation is only honored while awaiting the model; from here
        // on the safety path runs to completion.

        let model_text = match wait {
            ModelWait::Replied(text) => text,
            ModelWait::Cancelled => {
                tracing::info!(target: "orchestrator", "turn_cancelled_during_model_call");
                return self.rule_tier_response(&request, &report, &message_id, false, false);
            }
            ModelWait::TimedOut => {
                tracing::warn!(target: "orchestrator", "model_timeout");
                obs::record_model_fallback();
                return self.rule_tier_response(&request, &report, &message_id, false, false);
            }
            ModelWait::Failed(reason) => {
                tracing::warn!(target: "orchestrator", reason = %reason, "model_unreachable");
                obs::record_model_fallback();
                return self.rule_tier_response(&request, &report, &message_id, false, false);
            }
        };

        let mut parsed = match parse(&model_text) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(target: "orchestrator", error = %err, "model_output_unparseable");
                obs::record_model_fallback();
                return self.rule_tier_response(&request, &report, &message_id, false, true);
            }
        };

        let mut report = report;
        let scan = post_scan(&self.registry.snapshot(), request.region, &model_text);
        let ai_failure = scan.ai_failure();
        if ai_failure {
            obs::record_fabrications_blocked(scan.findings.len());
            tracing::warn!(
                target: "orchestrator",
                findings = ?scan.findings.iter().map(|f| f.pattern_id.as_str()).collect::<Vec<_>>(),
                "post_scan_flagged_model_output"
            );
            for finding in &scan.findings {
                if !report.pattern_ids.contains(&finding.pattern_id) {
                    report.pattern_ids.push(finding.pattern_id.clone());
                }
            }
            suppress_findings(&mut parsed, &scan);
            force_resource_directive(&mut parsed, &report, request.region);
        }

        let ctx = self.resolve_context(&request, &report, &message_id, ai_failure, false);
        let outcome = match self.executor.resolve(&parsed, &ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(target: "orchestrator", error = %err, "resolution_failed");
                return self.refusal_response(&request, &report, &message_id);
            }
        };
        let final_text = self.executor.render(&parsed, &outcome);

        let event_id = self.finish_audit(
            &request,
            &report,
            &message_id,
            ai_failure,
            false,
            outcome.logged_event_ids.last().cloned(),
            outcome.resource_ids.clone(),
        );

        TurnResponse {
            final_text,
            risk: report.risk,
            event_id,
            ai_failure_detected: ai_failure,
            model_degradation_detected: report.degradation_detected,
            conversation_stopped: false,
        }
    }

    /// Assemble a response straight from the registry, no model involved.
    /// Used for the CRITICAL short-circuit and every model-failure fallback.
    fn rule_tier_response(
        &self,
        request: &TurnRequest,
        report: &PreScanReport,
        message_id: &str,
        conversation_stopped: bool,
        ai_failure: bool,
    ) -> TurnResponse {
        let body = rule_tier_body(report, request.region);
        let parsed = match parse(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                // The body is assembled from canonical directive text; a
                // parse failure here is a programming error, not model
                // behavior. Refuse safely.
                tracing::error!(target: "orchestrator", error = %err, "rule_tier_body_unparseable");
                return self.refusal_response(request, report, message_id);
            }
        };

        let ctx = self.resolve_context(request, report, message_id, ai_failure, conversation_stopped);
        let outcome = match self.executor.resolve(&parsed, &ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(target: "orchestrator", error = %err, "rule_tier_resolution_failed");
                return self.refusal_response(request, report, message_id);
            }
        };
        let final_text = self.executor.render(&parsed, &outcome);

        let event_id = self.finish_audit(
            request,
            report,
            message_id,
            ai_failure,
            conversation_stopped,
            outcome.logged_event_ids.last().cloned(),
            outcome.resource_ids.clone(),
        );

        TurnResponse {
            final_text,
            risk: report.risk,
            event_id,
            ai_failure_detected: ai_failure,
            model_degradation_detected: report.degradation_detected,
            conversation_stopped,
        }
    }

    /// Registry failure path: refuse to guess, emit only the hard-coded
    /// emergency number and record a degraded event.
    fn refusal_response(
        &self,
        request: &TurnRequest,
        report: &PreScanReport,
        message_id: &str,
    ) -> TurnResponse {
        let final_text = match emergency_number(request.region) {
            Some(number) => format!("If you are in immediate danger, call {} now.", number),
            None => GLOBAL_EMERGENCY_GUIDANCE.to_string(),
        };

        let event_id = match self.audit.append(CrisisEventDraft {
            user_id: request.user_id.clone(),
            conversation_id: request.conversation_id.clone(),
            message_id: message_id.to_string(),
            risk: report.risk,
            incident_type: "registry_degraded".to_string(),
            triggered_patterns: report.pattern_ids.clone(),
            ai_failure_detected: true,
            model_degradation_detected: report.degradation_detected,
            conversation_stopped: false,
            resources_substituted: Vec::new(),
            detected_at: Utc::now(),
        }) {
            Ok(event) => Some(event.event_id),
            Err(err) => {
                tracing::error!(target: "orchestrator", error = %err, "audit_append_failed");
                None
            }
        };

        TurnResponse {
            final_text,
            risk: report.risk,
            event_id,
            ai_failure_detected: true,
            model_degradation_detected: report.degradation_detected,
            conversation_stopped: false,
        }
    }

    fn resolve_context(
        &self,
        request: &TurnRequest,
        report: &PreScanReport,
        message_id: &str,
        ai_failure: bool,
        conversation_stopped: bool,
    ) -> ResolveContext {
        ResolveContext {
            region: request.region,
            user_id: request.user_id.clone(),
            conversation_id: request.conversation_id.clone(),
            message_id: message_id.to_string(),
            risk: report.risk,
            topic: report.topic,
            triggered_patterns: report.pattern_ids.clone(),
            ai_failure_detected: ai_failure,
            model_degradation_detected: report.degradation_detected,
            conversation_stopped,
            now: Utc::now(),
        }
    }

    /// A crisis event is appended whenever risk is MEDIUM or above, or any
    /// failure flag was set. A `log_incident` directive that already
    /// produced an event for this turn satisfies the requirement.
    #[allow(clippy::too_many_arguments)]
    fn finish_audit(
        &self,
        request: &TurnRequest,
        report: &PreScanReport,
        message_id: &str,
        ai_failure: bool,
        conversation_stopped: bool,
        directive_event_id: Option<String>,
        resources_substituted: Vec<String>,
    ) -> Option<String> {
        if let Some(event_id) = directive_event_id {
            return Some(event_id);
        }
        let elevated = report.risk >= RiskLevel::Medium;
        if !elevated && !ai_failure && !report.degradation_detected {
            return None;
        }

        match self.audit.append(CrisisEventDraft {
            user_id: request.user_id.clone(),
            conversation_id: request.conversation_id.clone(),
            message_id: message_id.to_string(),
            risk: report.risk,
            incident_type: incident_type_from(report).to_string(),
            triggered_patterns: report.pattern_ids.clone(),
            ai_failure_detected: ai_failure,
            model_degradation_detected: report.degradation_detected,
            conversation_stopped,
            resources_substituted,
            detected_at: Utc::now(),
        }) {
            Ok(event) => Some(event.event_id),
            Err(err) => {
                tracing::error!(target: "orchestrator", error = %err, "audit_append_failed");
                None
            }
        }
    }
}

/// Header, tool calls, footer: the whole rule-tier reply is assembled as
/// directive text and pushed through the same resolve/render path as model
/// output, so the no-unvetted-literal invariant holds by construction.
fn rule_tier_body(report: &PreScanReport, region: Region) -> String {
    let Some(situation) = report.risk.situation() else {
        return "Sorry, I could not process that just now. Please try again.".to_string();
    };

    let get = ToolDirective::GetCrisisResources {
        region: Some(region),
        situation_type: situation,
    }
    .canonical_text();
    let log = ToolDirective::LogIncident {
        incident_data: serde_json::json!({
            "type": incident_type_from(report),
            "severity": report.risk.as_str(),
        }),
    }
    .canonical_text();

    let mut body = format!("{}\n{}\n{}", intervention_header(report), get, log);
    if report.indicators.minor {
        body.push_str("\nA youth counselling line is included above; they talk with people your age every day.");
    }
    if report.risk == RiskLevel::Critical {
        body.push_str("\n\nYou don't have to face this alone. Please reach out.");
    }
    body
}

fn intervention_header(report: &PreScanReport) -> &'static str {
    match report.risk {
        RiskLevel::Critical => {
            if report.degradation_detected {
                "Those numbers should have worked, and I am sorry they did not. These services are verified and current:"
            } else if report.indicators.imminent_timeline || report.indicators.has_means {
                "IMMEDIATE DANGER DETECTED\n\nPlease reach out right now:"
            } else if report.indicators.possible_overdose {
                "MEDICAL EMERGENCY\n\nCall an ambulance immediately:"
            } else if report.indicators.psychosis {
                "MEDICAL EMERGENCY\n\nThis needs immediate medical attention:"
            } else {
                "CRISIS INTERVENTION NEEDED\n\nVerified crisis resources:"
            }
        }
        RiskLevel::High => "Support is available 24/7:",
        RiskLevel::Medium => "Resources that may help:",
        RiskLevel::Low => "",
    }
}

fn incident_type_from(report: &PreScanReport) -> &'static str {
    if report.degradation_detected {
        return "resource_failure";
    }
    for id in &report.pattern_ids {
        if id == "suicide/plan_means" {
            return "suicide_plan_with_means";
        }
        if id.starts_with("suicide/") {
            return "suicide_ideation";
        }
        if id.starts_with("self_harm/") {
            return "self_harm";
        }
        if id.starts_with("dv/") {
            return "domestic_violence";
        }
        if id.starts_with("psychosis/") {
            return "psychosis";
        }
        if id.starts_with("substance/") {
            return "substance_crisis";
        }
    }
    "mental_health_crisis"
}

/// Cut flagged content out of the text segments: a fabricated or off-region
/// literal loses just the literal, victim-blaming language drops the whole
/// segment it sits in.
fn suppress_findings(parsed: &mut ParsedOutput, scan: &PostScanReport) {
    for segment in parsed.segments.iter_mut() {
        let Segment::Text(text) = segment else {
            continue;
        };
        let mut updated = text.clone();
        let mut drop_segment = false;
        for finding in &scan.findings {
            match finding.kind {
                PostScanFindingKind::VictimBlame => {
                    if let Some(phrase) = &finding.value {
                        if updated.to_lowercase().contains(phrase.as_str()) {
                            drop_segment = true;
                        }
                    }
                }
                PostScanFindingKind::FabricatedLiteral
                | PostScanFindingKind::UnregisteredLiteral
                | PostScanFindingKind::RegionDrift => {
                    if let Some(value) = &finding.value {
                        updated = updated.replace(value.as_str(), "");
                    }
                }
            }
        }
        *text = if drop_segment { String::new() } else { updated };
    }
}

/// After suppression the reply must still route the person somewhere real.
fn force_resource_directive(parsed: &mut ParsedOutput, report: &PreScanReport, region: Region) {
    let already_requested = parsed
        .directives
        .iter()
        .any(|d| matches!(d.directive, ToolDirective::GetCrisisResources { .. }));
    if already_requested {
        return;
    }

    let directive = ToolDirective::GetCrisisResources {
        region: Some(region),
        situation_type: report.risk.situation().unwrap_or(SituationType::Support),
    };
    let raw = directive.canonical_text();
    parsed.segments.push(Segment::Text("\n".to_string()));
    parsed.segments.push(Segment::Directive(parsed.directives.len()));
    parsed.directives.push(ParsedDirective { directive, raw });
}
