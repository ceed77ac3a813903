use chrono::NaiveDate;

use sentinel::corpus::{
    CorpusErrorKind, InstructionTemplate, OutputRecord, PromptRecord, TrainingExample, compose,
    normalize_corpus, read_jsonl, validate_corpus, write_jsonl,
};
use sentinel::registry::{ResourceRegistry, seed_state};
use sentinel::types::{Region, RiskLevel, SituationType};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 1).expect("date must be valid")
}

fn registry() -> ResourceRegistry {
    ResourceRegistry::new(seed_state(today()), today()).expect("seed registry must build")
}

fn template() -> InstructionTemplate {
    InstructionTemplate {
        id: "inst-1".to_string(),
        template: "You watch for crisis indicators.\n\nObservation:".to_string(),
    }
}

fn output(id: &str, risk: RiskLevel, text: &str) -> OutputRecord {
    OutputRecord {
        id: id.to_string(),
        text: text.to_string(),
        risk_level: risk,
        situation_type: risk.situation(),
        patterns: Vec::new(),
    }
}

fn prompt(id: &str, output_id: &str, text: &str) -> PromptRecord {
    PromptRecord {
        id: id.to_string(),
        text: format!("User: '{text}'"),
        instruction_template: "inst-1".to_string(),
        output_id: output_id.to_string(),
        region: Some(Region::Nz),
    }
}

fn build_corpus() -> Vec<TrainingExample> {
    let instructions = vec![template()];
    let outputs = vec![
        output(
            "o-critical",
            RiskLevel::Critical,
            "RISK LEVEL: CRITICAL\nPATTERNS DETECTED: suicide ideation with plan\nACTION: Immediate intervention",
        ),
        output(
            "o-high",
            RiskLevel::High,
            "RISK LEVEL: HIGH\nPATTERNS DETECTED: hopelessness, persistence\nACTION: Crisis support",
        ),
        output(
            "o-medium",
            RiskLevel::Medium,
            "RISK LEVEL: MEDIUM\nSustained low mood. Worth offering support options.",
        ),
        output(
            "o-low",
            RiskLevel::Low,
            "RISK LEVEL: LOW\nFigure of speech, no crisis indicators.",
        ),
    ];
    let prompts = vec![
        prompt("p1", "o-critical", "I have the pills and a plan"),
        prompt("p2", "o-high", "I feel like a burden to everyone, every day"),
        prompt("p3", "o-medium", "I have felt hopeless for a while"),
        prompt("p4", "o-low", "this traffic is killing me lol"),
    ];

    compose(&instructions, &prompts, &outputs)
        .expect("compose must succeed")
        .examples
}

#[test]
fn given_composed_corpus_when_normalized_and_validated_then_build_passes() {
    let mut examples = build_corpus();
    let stats = normalize_corpus(&mut examples, Region::Nz).expect("normalize must succeed");
    assert_eq!(stats.total, 4);
    assert!(stats.tools_added >= 3, "elevated outputs must gain directives");

    let report = validate_corpus(&examples, &registry().snapshot(), Region::Nz)
        .expect("validation must pass");
    assert_eq!(report.total, 4);
    assert!((report.literal_compliance_fraction - 1.0).abs() < f64::EPSILON);
}

#[test]
fn given_high_output_without_directive_then_normalizer_inserts_mapped_tool_call() {
    let instructions = vec![template()];
    let outputs = vec![output(
        "o-high",
        RiskLevel::High,
        "RISK LEVEL: HIGH\nPATTERNS DETECTED: hopelessness\nACTION: Crisis support",
    )];
    let prompts = vec![prompt("p1", "o-high", "nothing is ever going to get better")];

    let mut examples = compose(&instructions, &prompts, &outputs)
        .expect("compose must succeed")
        .examples;
    normalize_corpus(&mut examples, Region::Nz).expect("normalize must succeed");

    assert!(examples[0].output.contains(
        "[TOOL_CALL: get_crisis_resources(region='NZ', situation_type='crisis')]"
    ));
    validate_corpus(&examples, &registry().snapshot(), Region::Nz)
        .expect("validator must then pass");
}

#[test]
fn given_normalized_corpus_then_second_pass_changes_nothing() {
    let mut examples = build_corpus();
    normalize_corpus(&mut examples, Region::Nz).expect("first pass must succeed");
    let snapshot = examples.clone();
    let stats = normalize_corpus(&mut examples, Region::Nz).expect("second pass must succeed");

    assert_eq!(examples, snapshot);
    assert_eq!(stats.tools_added, 0);
    assert_eq!(stats.tools_removed, 0);
    assert_eq!(stats.tools_remapped, 0);
    assert_eq!(stats.instructions_canonicalized, 0);
}

#[test]
fn given_fabricated_literal_in_output_then_validation_hard_fails() {
    let mut examples = build_corpus();
    normalize_corpus(&mut examples, Region::Nz).expect("normalize must succeed");
    examples[1].output.push_str("\nYou can also call 0800 543 800.");

    let err = validate_corpus(&examples, &registry().snapshot(), Region::Nz)
        .expect_err("fabricated literal must abort the build");
    assert_eq!(err.kind, CorpusErrorKind::FabricationLiteral);
}

#[test]
fn given_unregistered_literal_then_validation_rejects_the_corpus() {
    let mut examples = build_corpus();
    normalize_corpus(&mut examples, Region::Nz).expect("normalize must succeed");
    examples[1]
        .output
        .push_str("\nCall 0800 123 456 whenever you need.");

    let err = validate_corpus(&examples, &registry().snapshot(), Region::Nz)
        .expect_err("unregistered literal must abort the build");
    assert_eq!(err.kind, CorpusErrorKind::UnregisteredLiteral);
}

#[test]
fn given_empty_risk_bucket_then_validation_fails() {
    let mut examples = build_corpus();
    normalize_corpus(&mut examples, Region::Nz).expect("normalize must succeed");
    examples.retain(|e| {
        e.metadata
            .as_ref()
            .and_then(|m| m.risk_level)
            .map(|r| r != RiskLevel::Low)
            .unwrap_or(true)
    });

    let err = validate_corpus(&examples, &registry().snapshot(), Region::Nz)
        .expect_err("empty LOW bucket must abort the build");
    assert_eq!(err.kind, CorpusErrorKind::EmptyRiskBucket);
}

#[test]
fn given_low_example_with_directive_then_validation_fails() {
    let mut examples = build_corpus();
    normalize_corpus(&mut examples, Region::Nz).expect("normalize must succeed");
    let low = examples
        .iter_mut()
        .find(|e| e.metadata.as_ref().and_then(|m| m.risk_level) == Some(RiskLevel::Low))
        .expect("corpus must hold a LOW example");
    low.output
        .push_str("\n[TOOL_CALL: get_crisis_resources(region='NZ', situation_type='support')]");

    let err = validate_corpus(&examples, &registry().snapshot(), Region::Nz)
        .expect_err("LOW with directives must abort the build");
    assert_eq!(err.kind, CorpusErrorKind::Invariant);
}

#[test]
fn given_training_file_round_trip_then_records_survive_verbatim() {
    let mut examples = build_corpus();
    normalize_corpus(&mut examples, Region::Nz).expect("normalize must succeed");

    let dir = std::env::temp_dir().join(format!("sentinel-corpus-test-{}", uuid::Uuid::now_v7()));
    let path = dir.join("corpus.jsonl");
    write_jsonl(&path, &examples).expect("write must succeed");
    let reloaded: Vec<TrainingExample> = read_jsonl(&path).expect("read must succeed");
    assert_eq!(examples, reloaded);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_dir(&dir);
}

#[test]
fn given_medium_metadata_then_situation_maps_to_support() {
    let mut examples = build_corpus();
    normalize_corpus(&mut examples, Region::Nz).expect("normalize must succeed");
    let medium = examples
        .iter()
        .find(|e| e.metadata.as_ref().and_then(|m| m.risk_level) == Some(RiskLevel::Medium))
        .expect("corpus must hold a MEDIUM example");
    assert_eq!(
        medium.metadata.as_ref().and_then(|m| m.situation_type),
        Some(SituationType::Support)
    );
    assert!(medium.output.contains("situation_type='support'"));
}
