use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};

use sentinel::audit::AuditStore;
use sentinel::registry::{RegistryState, ResourceRegistry, seed_state};
use sentinel::toolcall::{ResolveContext, ToolExecutor, parse};
use sentinel::types::{Region, RiskLevel, TopicTag};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 1).expect("date must be valid")
}

fn executor_with(state: RegistryState) -> (ToolExecutor, Arc<AuditStore>) {
    let registry = Arc::new(ResourceRegistry::new(state, today()).expect("registry must build"));
    let audit = Arc::new(AuditStore::in_memory());
    (ToolExecutor::new(registry, audit.clone()), audit)
}

fn ctx(region: Region, risk: RiskLevel, topic: Option<TopicTag>) -> ResolveContext {
    ResolveContext {
        region,
        user_id: "user-1".to_string(),
        conversation_id: "conv-1".to_string(),
        message_id: "msg-1".to_string(),
        risk,
        topic,
        triggered_patterns: vec!["suicide/direct".to_string()],
        ai_failure_detected: false,
        model_degradation_detected: false,
        conversation_stopped: false,
        now: Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap(),
    }
}

#[test]
fn given_resource_directive_then_literals_come_from_the_registry() {
    let (executor, _) = executor_with(seed_state(today()));
    let parsed = parse(
        "I'm here with you.\n[TOOL_CALL: get_crisis_resources(region='NZ', situation_type='emergency')]",
    )
    .expect("parse must succeed");

    let outcome = executor
        .resolve(&parsed, &ctx(Region::Nz, RiskLevel::Critical, Some(TopicTag::SelfHarm)))
        .expect("resolve must succeed");
    let rendered = executor.render(&parsed, &outcome);

    assert!(rendered.contains("111"));
    assert!(rendered.contains("1737"));
    assert!(!rendered.contains("[TOOL_CALL:"));
    assert!(outcome.resource_ids.contains(&"nz/emergency".to_string()));
}

#[test]
fn given_empty_region_bank_then_emergency_fallback_marks_degraded() {
    let mut state = seed_state(today());
    state.resources.retain(|r| r.region != Region::Au);
    let (executor, _) = executor_with(state);

    let parsed = parse("[TOOL_CALL: get_crisis_resources(region='AU', situation_type='crisis')]")
        .expect("parse must succeed");
    let outcome = executor
        .resolve(&parsed, &ctx(Region::Au, RiskLevel::High, None))
        .expect("resolve must succeed");
    let rendered = executor.render(&parsed, &outcome);

    assert!(outcome.degraded);
    assert!(rendered.contains("000"), "fallback must carry the AU emergency number");
    assert!(outcome.resource_ids.is_empty());
}

#[test]
fn given_directive_without_region_then_turn_region_applies() {
    let (executor, _) = executor_with(seed_state(today()));
    let parsed = parse("[TOOL_CALL: get_crisis_resources(situation_type='support')]")
        .expect("parse must succeed");
    let outcome = executor
        .resolve(&parsed, &ctx(Region::Uk, RiskLevel::Medium, Some(TopicTag::MentalHealth)))
        .expect("resolve must succeed");
    let rendered = executor.render(&parsed, &outcome);

    assert!(rendered.contains("116 123"), "UK support must resolve Samaritans");
    assert!(!rendered.contains("1737"), "no NZ literal may leak into a UK turn");
}

#[test]
fn given_check_hallucination_on_blocklisted_number_then_alternative_is_rendered() {
    let (executor, _) = executor_with(seed_state(today()));
    let parsed = parse("[TOOL_CALL: check_hallucination(resource='0800 543 800', type='phone')]")
        .expect("parse must succeed");
    let outcome = executor
        .resolve(&parsed, &ctx(Region::Nz, RiskLevel::Medium, None))
        .expect("resolve must succeed");
    let rendered = executor.render(&parsed, &outcome);

    assert!(rendered.contains("not a working service"));
    assert!(!outcome.resource_ids.is_empty(), "a verified alternative must be offered");
}

#[test]
fn given_log_incident_then_event_carries_resources_substituted_in_the_same_turn() {
    let (executor, audit) = executor_with(seed_state(today()));
    let parsed = parse(concat!(
        "[TOOL_CALL: get_crisis_resources(region='NZ', situation_type='emergency')]\n",
        "[TOOL_CALL: log_incident(incident_data={'type': 'suicide_ideation', 'severity': 'CRITICAL'})]",
    ))
    .expect("parse must succeed");

    let outcome = executor
        .resolve(&parsed, &ctx(Region::Nz, RiskLevel::Critical, Some(TopicTag::SelfHarm)))
        .expect("resolve must succeed");

    assert_eq!(outcome.logged_event_ids.len(), 1);
    let event = audit.last().expect("event must be recorded");
    assert_eq!(event.event_id, outcome.logged_event_ids[0]);
    assert_eq!(event.severity, 3);
    assert_eq!(event.incident_type, "suicide_ideation");
    assert!(!event.resources_substituted.is_empty());
}

#[test]
fn given_same_snapshot_then_resolution_is_deterministic() {
    let (executor, _) = executor_with(seed_state(today()));
    let parsed = parse("[TOOL_CALL: get_crisis_resources(region='NZ', situation_type='crisis')]")
        .expect("parse must succeed");
    let context = ctx(Region::Nz, RiskLevel::High, Some(TopicTag::MentalHealth));

    let lhs = executor.resolve(&parsed, &context).expect("resolve must succeed");
    let rhs = executor.resolve(&parsed, &context).expect("resolve must succeed");

    assert_eq!(executor.render(&parsed, &lhs), executor.render(&parsed, &rhs));
    assert_eq!(lhs.resolution_id, rhs.resolution_id);
}

#[test]
fn given_global_region_then_only_region_agnostic_values_render() {
    let (executor, _) = executor_with(seed_state(today()));
    let parsed = parse("[TOOL_CALL: get_crisis_resources(region='GLOBAL', situation_type='crisis')]")
        .expect("parse must succeed");
    let outcome = executor
        .resolve(&parsed, &ctx(Region::Global, RiskLevel::High, None))
        .expect("resolve must succeed");
    let rendered = executor.render(&parsed, &outcome);

    assert!(rendered.contains("findahelpline.com"));
    for literal in ["111", "988", "1737", "116 123", "13 11 14"] {
        assert!(
            !rendered.contains(literal),
            "GLOBAL response leaked region literal {literal}: {rendered}"
        );
    }
}
