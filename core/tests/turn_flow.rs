use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use sentinel::audit::AuditStore;
use sentinel::model::{ModelPort, ScriptedModel};
use sentinel::orchestrator::{Orchestrator, OrchestratorConfig, TurnRequest};
use sentinel::registry::{ResourceRegistry, seed_state};
use sentinel::triage::{HistoryTurn, TurnRole};
use sentinel::types::{Region, RiskLevel};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 1).expect("date must be valid")
}

struct Harness {
    orchestrator: Orchestrator,
    audit: Arc<AuditStore>,
    model: Arc<ScriptedModel>,
}

fn harness() -> Harness {
    harness_with_timeout(Duration::from_secs(5))
}

fn harness_with_timeout(model_timeout: Duration) -> Harness {
    let registry =
        Arc::new(ResourceRegistry::new(seed_state(today()), today()).expect("registry must build"));
    let audit = Arc::new(AuditStore::in_memory());
    let model = Arc::new(ScriptedModel::new());
    let orchestrator = Orchestrator::new(
        registry,
        audit.clone(),
        model.clone() as Arc<dyn ModelPort>,
        OrchestratorConfig { model_timeout },
    );
    Harness {
        orchestrator,
        audit,
        model,
    }
}

fn request(text: &str, region: Region, history: Vec<HistoryTurn>) -> TurnRequest {
    TurnRequest {
        user_text: text.to_string(),
        region,
        user_id: "user-1".to_string(),
        conversation_id: "conv-1".to_string(),
        message_id: None,
        history,
    }
}

#[tokio::test]
async fn given_direct_ideation_then_critical_short_circuit_skips_the_model() {
    let harness = harness();
    harness.model.push_reply("should never be consumed");

    let response = harness
        .orchestrator
        .handle_turn(
            request("I might kill myself", Region::Nz, Vec::new()),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(response.risk, RiskLevel::Critical);
    assert!(response.conversation_stopped);
    assert!(response.final_text.contains("111"));
    assert!(response.final_text.contains("1737"));
    assert!(!response.final_text.contains("[TOOL_CALL:"));
    assert_eq!(harness.model.remaining(), 1, "the model must not be invoked");

    let event = harness.audit.last().expect("crisis event must be recorded");
    assert_eq!(event.severity, 3);
    assert!(event.conversation_stopped);
    assert_eq!(Some(event.event_id), response.event_id);
}

#[tokio::test]
async fn given_failed_numbers_report_then_degradation_elevates_to_critical() {
    let harness = harness();
    let history = vec![HistoryTurn {
        role: TurnRole::Assistant,
        text: "You can call 1737 or 0800 543 354 any time.".to_string(),
    }];

    let response = harness
        .orchestrator
        .handle_turn(
            request("Those numbers you gave me don't work", Region::Nz, history),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(response.risk, RiskLevel::Critical);
    assert!(response.model_degradation_detected);
    assert!(response.final_text.contains("111"));
    assert!(response.final_text.contains("1737"));

    let event = harness.audit.last().expect("crisis event must be recorded");
    assert!(event.model_degradation_detected);
    assert_eq!(event.incident_type, "resource_failure");
}

#[tokio::test]
async fn given_hyperbole_with_humor_then_model_reply_passes_through_without_event() {
    let harness = harness();
    harness
        .model
        .push_reply("RISK LEVEL: LOW\nSounds like a rough commute. Hope the rest of the day is calmer.");

    let response = harness
        .orchestrator
        .handle_turn(
            request("This traffic is killing me lol", Region::Nz, Vec::new()),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(response.risk, RiskLevel::Low);
    assert!(response.final_text.contains("rough commute"));
    assert!(!response.final_text.contains("[TOOL_CALL:"));
    assert!(response.event_id.is_none());
    assert_eq!(harness.audit.len(), 0, "LOW turns record no crisis event");
}

#[tokio::test]
async fn given_model_output_with_fabricated_number_then_substring_is_replaced_by_registry_entry() {
    let harness = harness();
    harness
        .model
        .push_reply("RISK LEVEL: MEDIUM\nYou could call 0800 543 800 for help.");

    let response = harness
        .orchestrator
        .handle_turn(
            request("I have felt hopeless for weeks", Region::Nz, Vec::new()),
            &CancellationToken::new(),
        )
        .await;

    assert!(response.ai_failure_detected);
    assert!(!response.final_text.contains("0800 543 800"));
    assert!(
        response.final_text.contains("1737"),
        "a verified NZ mental-health entry must be substituted: {}",
        response.final_text
    );

    let event = harness.audit.last().expect("crisis event must be recorded");
    assert!(event.ai_failure_detected);
    assert!(
        event
            .triggered_patterns
            .iter()
            .any(|id| id == "fabrication/known_value")
    );
}

#[tokio::test]
async fn given_victim_blaming_output_then_segment_is_suppressed_and_flagged() {
    let harness = harness();
    harness.model.push_reply(
        "RISK LEVEL: MEDIUM\nYour willingness to accept their behavior contributes to the situation.",
    );

    let response = harness
        .orchestrator
        .handle_turn(
            request(
                "My partner won't let me leave the house",
                Region::Nz,
                Vec::new(),
            ),
            &CancellationToken::new(),
        )
        .await;

    assert!(response.ai_failure_detected);
    assert!(!response.final_text.to_lowercase().contains("willingness to accept"));
    assert!(!response.final_text.is_empty());

    let event = harness.audit.last().expect("crisis event must be recorded");
    assert!(
        event
            .triggered_patterns
            .iter()
            .any(|id| id == "victim_blame/willingness_accept"),
        "event patterns were: {:?}",
        event.triggered_patterns
    );
}

#[tokio::test]
async fn given_cross_region_number_in_output_then_drift_is_suppressed() {
    let harness = harness();
    harness
        .model
        .push_reply("RISK LEVEL: MEDIUM\nYou can call 988 any time you need.");

    let response = harness
        .orchestrator
        .handle_turn(
            request("I've been so hopeless lately", Region::Nz, Vec::new()),
            &CancellationToken::new(),
        )
        .await;

    assert!(response.ai_failure_detected);
    assert!(!response.final_text.contains("988"));
    assert!(response.final_text.contains("1737"));
}

#[tokio::test]
async fn given_unknown_tool_in_output_then_rule_tier_fallback_flags_the_turn() {
    let harness = harness();
    harness
        .model
        .push_reply("RISK LEVEL: HIGH\n[TOOL_CALL: dial_emergency(region='NZ')]");

    let response = harness
        .orchestrator
        .handle_turn(
            request(
                "I'm a burden to everyone and I don't want to be here",
                Region::Nz,
                Vec::new(),
            ),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(response.risk, RiskLevel::High);
    assert!(response.ai_failure_detected);
    assert!(!response.final_text.contains("[TOOL_CALL:"));
    assert!(!response.final_text.contains("dial_emergency"));
    assert!(response.final_text.contains("1737"), "{}", response.final_text);
}

#[tokio::test(start_paused = true)]
async fn given_model_stall_then_timeout_falls_back_to_rule_tier() {
    let harness = harness_with_timeout(Duration::from_millis(200));
    harness.model.push_stall(Duration::from_secs(60));

    let response = harness
        .orchestrator
        .handle_turn(
            request("I feel completely hopeless", Region::Nz, Vec::new()),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(response.risk, RiskLevel::Medium);
    assert!(response.final_text.contains("1737"), "{}", response.final_text);
    assert!(response.event_id.is_some());
}

#[tokio::test]
async fn given_model_unreachable_then_medium_turn_still_gets_verified_resources() {
    let harness = harness();
    // No scripted steps: the model reports unreachable.

    let response = harness
        .orchestrator
        .handle_turn(
            request("I feel completely hopeless", Region::Nz, Vec::new()),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(response.risk, RiskLevel::Medium);
    assert!(response.final_text.contains("Resources that may help"));
    assert!(response.final_text.contains("1737"));
    assert!(response.event_id.is_some());
}

#[tokio::test]
async fn given_low_risk_model_failure_then_user_sees_a_neutral_retry_message() {
    let harness = harness();

    let response = harness
        .orchestrator
        .handle_turn(
            request("what's a good pasta recipe", Region::Nz, Vec::new()),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(response.risk, RiskLevel::Low);
    assert!(response.final_text.contains("try again"));
    assert!(response.event_id.is_none());
}

#[tokio::test]
async fn given_global_session_then_no_region_specific_literal_renders() {
    let harness = harness();

    let response = harness
        .orchestrator
        .handle_turn(
            request(
                "I'm a burden to everyone and I don't want to be here",
                Region::Global,
                Vec::new(),
            ),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(response.risk, RiskLevel::High);
    for literal in ["111", "988", "1737", "116 123", "13 11 14"] {
        assert!(
            !response.final_text.contains(literal),
            "GLOBAL response leaked {literal}: {}",
            response.final_text
        );
    }
    assert!(response.final_text.contains("findahelpline.com"));
}

#[tokio::test]
async fn given_cancellation_before_model_reply_then_safe_fallback_returns() {
    let harness = harness_with_timeout(Duration::from_secs(30));
    harness.model.push_stall(Duration::from_secs(20));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let response = harness
        .orchestrator
        .handle_turn(
            request("I feel completely hopeless", Region::Nz, Vec::new()),
            &cancel,
        )
        .await;

    assert_eq!(response.risk, RiskLevel::Medium);
    assert!(response.final_text.contains("1737"), "{}", response.final_text);
}
