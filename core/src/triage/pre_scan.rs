use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::triage::patterns::{FilterKind, PatternBank, SignalClass};
use crate::types::{RiskLevel, TopicTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A prior turn in the conversation, consumed read-only for trend detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: TurnRole,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicators {
    pub age: Option<u8>,
    pub minor: bool,
    pub youth: bool,
    pub imminent_timeline: bool,
    pub has_means: bool,
    pub possible_overdose: bool,
    pub psychosis: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreScanReport {
    pub risk: RiskLevel,
    pub pattern_ids: Vec<String>,
    pub topic: Option<TopicTag>,
    pub indicators: Indicators,
    pub degradation_detected: bool,
    pub demoted_by: Option<String>,
}

const DEGRADATION_PHRASES: [&str; 6] = [
    "don't work",
    "doesn't work",
    "didn't work",
    "no one answered",
    "nobody answered",
    "number is disconnected",
];

/// Deterministic scan of a user message before any model call.
///
/// Scoring: any ImmediateDanger pattern elevates to CRITICAL. HIGH needs two
/// hopelessness signals, or one plus a persistence marker. Sustained
/// negative affect alone is MEDIUM. A matched false-positive filter demotes
/// the result one level, never below MEDIUM once an ImmediateDanger pattern
/// fired; a humor marker demotes only when no such pattern fired.
pub fn pre_scan(bank: &PatternBank, message: &str, history: &[HistoryTurn]) -> PreScanReport {
    let lowered = message.to_lowercase();

    let mut pattern_ids: Vec<String> = Vec::new();
    let mut immediate = false;
    let mut hopelessness = 0usize;
    let mut persistence = false;
    let mut negative_affect = false;
    let mut topic_votes: Vec<TopicTag> = Vec::new();
    let mut indicators = Indicators::default();

    for def in &bank.patterns {
        let matched = def.phrases.iter().any(|phrase| lowered.contains(phrase));
        if !matched {
            continue;
        }
        pattern_ids.push(def.id.to_string());
        topic_votes.push(def.topic);
        match def.class {
            SignalClass::ImmediateDanger => immediate = true,
            SignalClass::Hopelessness => hopelessness += 1,
            SignalClass::Persistence => persistence = true,
            SignalClass::NegativeAffect => negative_affect = true,
        }
        match def.id {
            "suicide/plan_means" => indicators.has_means = true,
            "suicide/timeline" => indicators.imminent_timeline = true,
            "substance/overdose" => indicators.possible_overdose = true,
            "psychosis/violence" => indicators.psychosis = true,
            _ => {}
        }
    }

    if let Some(age) = extract_age(&lowered) {
        indicators.age = Some(age);
        indicators.youth = age < 25;
        indicators.minor = age < 18;
    }
    if pattern_ids.iter().any(|id| id.starts_with("youth/")) {
        indicators.youth = true;
    }

    let degradation_detected = detect_degradation(&lowered, history);
    if degradation_detected {
        pattern_ids.push("degradation/resource_failure".to_string());
    }

    let imminent = immediate || degradation_detected;
    let base = if imminent {
        RiskLevel::Critical
    } else if hopelessness >= 2 || (hopelessness >= 1 && persistence) {
        RiskLevel::High
    } else if hopelessness >= 1 || negative_affect {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let filter_hit = bank
        .filters
        .iter()
        .find(|f| f.phrases.iter().any(|phrase| lowered.contains(phrase)));

    let mut demoted_by = None;
    let risk = match filter_hit {
        // The humor tie-break: "lol" next to an imminent-danger signal
        // changes nothing.
        Some(filter) if filter.kind == FilterKind::Humor && imminent => base,
        Some(filter) if base > RiskLevel::Low => {
            demoted_by = Some(filter.id.to_string());
            let demoted = base.demoted();
            if imminent && demoted < RiskLevel::Medium {
                RiskLevel::Medium
            } else {
                demoted
            }
        }
        _ => base,
    };

    let topic = pick_topic(&topic_votes, immediate, &pattern_ids);

    PreScanReport {
        risk,
        pattern_ids,
        topic,
        indicators,
        degradation_detected,
        demoted_by,
    }
}

/// A user telling us that previously supplied numbers failed is treated as a
/// model-degradation signal and escalated: the turn before it handed out
/// resource literals that did not connect.
fn detect_degradation(lowered: &str, history: &[HistoryTurn]) -> bool {
    let mentions_failure = DEGRADATION_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase));
    if !mentions_failure {
        return false;
    }
    let references_numbers = lowered.contains("number") || lowered.contains("line");
    if !references_numbers {
        return false;
    }
    history.iter().any(|turn| {
        turn.role == TurnRole::Assistant && turn.text.chars().filter(char::is_ascii_digit).count() >= 3
    })
}

fn pick_topic(votes: &[TopicTag], immediate: bool, pattern_ids: &[String]) -> Option<TopicTag> {
    if votes.is_empty() {
        return None;
    }
    if immediate {
        // The first imminent-danger category drives routing.
        for (id, topic) in pattern_ids.iter().zip(votes.iter()) {
            if id.starts_with("dv/") {
                return Some(TopicTag::DomesticViolence);
            }
            if id.starts_with("substance/") {
                return Some(TopicTag::Substance);
            }
            if id.starts_with("suicide/") || id.starts_with("self_harm/") {
                return Some(*topic);
            }
        }
    }
    let mut best = votes[0];
    let mut best_count = 0usize;
    for candidate in votes {
        let count = votes.iter().filter(|v| *v == candidate).count();
        if count > best_count {
            best = *candidate;
            best_count = count;
        }
    }
    Some(best)
}

fn extract_age(lowered: &str) -> Option<u8> {
    static AGE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = AGE_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"\bi'?m (\d{1,2})( years old)?\b").expect("age pattern must compile"),
            Regex::new(r"\bi am (\d{1,2})( years old)?\b").expect("age pattern must compile"),
            Regex::new(r"\b(\d{1,2}) ?(years old|yo|y/o)\b").expect("age pattern must compile"),
        ]
    });

    for pattern in patterns {
        if let Some(captures) = pattern.captures(lowered) {
            if let Some(age) = captures.get(1).and_then(|m| m.as_str().parse::<u8>().ok()) {
                if (5..=100).contains(&age) {
                    return Some(age);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::triage::patterns::PatternBank;
    use crate::types::{Region, RiskLevel};

    use super::{HistoryTurn, TurnRole, pre_scan};

    fn bank() -> PatternBank {
        PatternBank::for_region(Region::Nz)
    }

    #[test]
    fn direct_ideation_is_critical() {
        let report = pre_scan(&bank(), "I might kill myself", &[]);
        assert_eq!(report.risk, RiskLevel::Critical);
        assert!(report.pattern_ids.iter().any(|id| id == "suicide/direct"));
    }

    #[test]
    fn humor_marker_does_not_demote_immediate_danger() {
        let report = pre_scan(&bank(), "gonna kill myself lol", &[]);
        assert_eq!(report.risk, RiskLevel::Critical);
        assert!(report.demoted_by.is_none());
    }

    #[test]
    fn hyperbole_with_humor_is_low() {
        let report = pre_scan(&bank(), "This traffic is killing me lol", &[]);
        assert_eq!(report.risk, RiskLevel::Low);
    }

    #[test]
    fn hyperbole_filter_demotes_immediate_danger_one_level() {
        let report = pre_scan(
            &bank(),
            "this deadline is killing me and honestly i want to die",
            &[],
        );
        assert_eq!(report.risk, RiskLevel::High);
        assert_eq!(report.demoted_by.as_deref(), Some("filter/hyperbole"));
    }

    #[test]
    fn media_reference_demotes_immediate_danger_one_level() {
        let report = pre_scan(
            &bank(),
            "in the movie the hero says I want to die before the last battle",
            &[],
        );
        assert_eq!(report.risk, RiskLevel::High);
        assert_eq!(report.demoted_by.as_deref(), Some("filter/media"));
    }

    #[test]
    fn two_hopelessness_signals_make_high() {
        let report = pre_scan(
            &bank(),
            "I'm a burden to everyone and I don't want to be here",
            &[],
        );
        assert_eq!(report.risk, RiskLevel::High);
    }

    #[test]
    fn hopelessness_with_persistence_makes_high() {
        let report = pre_scan(&bank(), "I've been cutting myself every day", &[]);
        assert_eq!(report.risk, RiskLevel::High);
    }

    #[test]
    fn negative_affect_alone_is_medium() {
        let report = pre_scan(&bank(), "I feel completely hopeless", &[]);
        assert_eq!(report.risk, RiskLevel::Medium);
    }

    #[test]
    fn failed_numbers_after_assistant_turn_escalate() {
        let history = vec![HistoryTurn {
            role: TurnRole::Assistant,
            text: "You can call 1737 any time.".to_string(),
        }];
        let report = pre_scan(&bank(), "Those numbers you gave me don't work", &history);
        assert_eq!(report.risk, RiskLevel::Critical);
        assert!(report.degradation_detected);
    }

    #[test]
    fn age_extraction_sets_minor_indicator() {
        let report = pre_scan(&bank(), "i'm 15 and everyone at school hates me", &[]);
        assert_eq!(report.indicators.age, Some(15));
        assert!(report.indicators.minor);
        assert!(report.indicators.youth);
    }
}
