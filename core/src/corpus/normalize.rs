use std::sync::OnceLock;

use regex::Regex;

use crate::corpus::error::{CorpusError, parse_error};
use crate::corpus::types::{ExampleMetadata, TrainingExample};
use crate::toolcall::{self, Segment, ToolDirective};
use crate::types::{Region, RiskLevel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeChanges {
    pub tools_added: bool,
    pub tools_removed: bool,
    pub tools_remapped: bool,
    pub instruction_canonicalized: bool,
    pub structure_fixed: bool,
}

impl NormalizeChanges {
    pub fn any(&self) -> bool {
        self.tools_added
            || self.tools_removed
            || self.tools_remapped
            || self.instruction_canonicalized
            || self.structure_fixed
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeStats {
    pub total: usize,
    pub tools_added: usize,
    pub tools_removed: usize,
    pub tools_remapped: usize,
    pub instructions_canonicalized: usize,
    pub structures_fixed: usize,
}

/// Consistent tool-usage policy over the whole corpus:
/// CRITICAL, HIGH and MEDIUM outputs carry `get_crisis_resources` with the
/// mapped situation plus a `log_incident` at the matching severity; LOW
/// outputs carry no directives at all. Running the normalizer twice changes
/// nothing the second time.
pub fn normalize_corpus(
    examples: &mut [TrainingExample],
    default_region: Region,
) -> Result<NormalizeStats, CorpusError> {
    let mut stats = NormalizeStats {
        total: examples.len(),
        ..NormalizeStats::default()
    };
    for example in examples.iter_mut() {
        let changes = normalize_example(example, default_region)?;
        stats.tools_added += usize::from(changes.tools_added);
        stats.tools_removed += usize::from(changes.tools_removed);
        stats.tools_remapped += usize::from(changes.tools_remapped);
        stats.instructions_canonicalized += usize::from(changes.instruction_canonicalized);
        stats.structures_fixed += usize::from(changes.structure_fixed);
    }
    Ok(stats)
}

pub fn normalize_example(
    example: &mut TrainingExample,
    default_region: Region,
) -> Result<NormalizeChanges, CorpusError> {
    let mut changes = NormalizeChanges::default();

    let risk = example
        .metadata
        .as_ref()
        .and_then(|m| m.risk_level)
        .unwrap_or_else(|| extract_risk_level(&example.output));
    let region = example
        .metadata
        .as_ref()
        .and_then(|m| m.region)
        .unwrap_or(default_region);

    // Legacy instructions embedded resource lists before the observation;
    // those taught literal memorization and are rebuilt into the concise
    // form unconditionally.
    let user_message = extract_user_message(&example.instruction);
    let canonical = canonical_instruction(&user_message);
    if example.instruction != canonical {
        example.instruction = canonical;
        changes.instruction_canonicalized = true;
    }

    let structured = ensure_risk_header(&example.output, risk);
    if structured != example.output {
        example.output = structured;
        changes.structure_fixed = true;
    }

    let parsed = toolcall::parse(&example.output)
        .map_err(|err| parse_error(format!("output failed to parse: {err}")))?;

    match risk.situation() {
        Some(situation) => {
            let mut directives: Vec<ToolDirective> = parsed
                .directives
                .iter()
                .map(|d| d.directive.clone())
                .collect();

            let mut remapped = false;
            for directive in directives.iter_mut() {
                if let ToolDirective::GetCrisisResources {
                    region: directive_region,
                    situation_type,
                } = directive
                {
                    if *situation_type != situation {
                        *situation_type = situation;
                        remapped = true;
                    }
                    if directive_region.is_none() {
                        *directive_region = Some(region);
                        remapped = true;
                    }
                }
            }

            if remapped {
                example.output = reassemble_with(&parsed, &directives);
                changes.tools_remapped = true;
            }

            let has_get = directives
                .iter()
                .any(|d| matches!(d, ToolDirective::GetCrisisResources { .. }));
            let has_log = directives
                .iter()
                .any(|d| matches!(d, ToolDirective::LogIncident { .. }));

            let mut inserts = Vec::new();
            if !has_get {
                inserts.push(
                    ToolDirective::GetCrisisResources {
                        region: Some(region),
                        situation_type: situation,
                    }
                    .canonical_text(),
                );
            }
            if !has_log {
                let incident_type = detect_incident_type(&user_message, &example.output);
                inserts.push(
                    ToolDirective::LogIncident {
                        incident_data: serde_json::json!({
                            "type": incident_type,
                            "severity": risk.as_str(),
                        }),
                    }
                    .canonical_text(),
                );
            }
            if !inserts.is_empty() {
                example.output = insert_tool_block(&example.output, &inserts);
                changes.tools_added = true;
            }
        }
        None => {
            // LOW: false positives and everyday situations never call tools.
            if parsed.has_directives() {
                example.output = strip_directives(&parsed);
                changes.tools_removed = true;
            }
        }
    }

    let metadata = example.metadata.get_or_insert_with(ExampleMetadata::default);
    metadata.risk_level = Some(risk);
    metadata.situation_type = risk.situation();
    if metadata.region.is_none() {
        metadata.region = Some(region);
    }

    Ok(changes)
}

pub fn extract_risk_level(output: &str) -> RiskLevel {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    let header = HEADER.get_or_init(|| {
        Regex::new(r"(?i)RISK LEVEL:\s*(\w+)").expect("risk header pattern must compile")
    });

    if let Some(captures) = header.captures(output) {
        if let Ok(level) = captures[1].parse::<RiskLevel>() {
            return level;
        }
    }
    let upper = output.to_uppercase();
    for level in RiskLevel::ALL {
        if upper.contains(level.as_str()) {
            return level;
        }
    }
    RiskLevel::Medium
}

pub fn extract_user_message(instruction: &str) -> String {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    static OBSERVATION: OnceLock<Regex> = OnceLock::new();
    let quoted = QUOTED.get_or_init(|| {
        Regex::new(r#"(?s)User:\s*['"](.+?)['"]\s*$"#).expect("user pattern must compile")
    });
    let observation = OBSERVATION.get_or_init(|| {
        Regex::new(r"(?s)Observation:\s*(.+?)\s*$").expect("observation pattern must compile")
    });

    if let Some(captures) = quoted.captures(instruction) {
        return captures[1].trim().to_string();
    }
    if let Some(captures) = observation.captures(instruction) {
        return captures[1].trim().to_string();
    }
    instruction.trim().to_string()
}

pub fn canonical_instruction(user_message: &str) -> String {
    format!(
        concat!(
            "You are a crisis-detection assistant embedded in a conversational system.\n",
            "\n",
            "Your role:\n",
            "- Analyze messages for crisis indicators across mental health, family violence, self-harm, and substance use\n",
            "- Classify risk level: CRITICAL, HIGH, MEDIUM, or LOW\n",
            "- For CRITICAL, HIGH, or MEDIUM risk, request verified services with the get_crisis_resources tool\n",
            "- Never produce a phone number, URL, or email from memory\n",
            "- Respond with empathy and accuracy\n",
            "\n",
            "Analyze this message:\n",
            "User: '{}'"
        ),
        user_message
    )
}

fn ensure_risk_header(output: &str, risk: RiskLevel) -> String {
    let trimmed = output.trim_start();
    if trimmed.starts_with("RISK LEVEL:") {
        return output.to_string();
    }

    static HEADER_LINE: OnceLock<Regex> = OnceLock::new();
    let header_line = HEADER_LINE.get_or_init(|| {
        Regex::new(r"(?m)^RISK LEVEL:[^\n]*\n?").expect("header line pattern must compile")
    });

    if let Some(found) = header_line.find(output) {
        let line = output[found.start()..found.end()].trim_end().to_string();
        let remainder = format!("{}{}", &output[..found.start()], &output[found.end()..]);
        return format!("{}\n{}", line, remainder.trim_start());
    }
    format!("RISK LEVEL: {}\n{}", risk, trimmed)
}

/// Tool calls slot in after the `ACTION:` line when there is one, otherwise
/// after `PATTERNS DETECTED:`, otherwise right after the first line.
fn insert_tool_block(output: &str, inserts: &[String]) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let mut insert_at = None;
    for (index, line) in lines.iter().enumerate() {
        if line.starts_with("ACTION:") {
            insert_at = Some(index + 1);
            break;
        }
    }
    if insert_at.is_none() {
        for (index, line) in lines.iter().enumerate() {
            if line.starts_with("PATTERNS DETECTED:") {
                insert_at = Some(index + 1);
                break;
            }
        }
    }
    let insert_at = insert_at.unwrap_or(1.min(lines.len()));

    let mut rebuilt: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    for (offset, directive) in inserts.iter().enumerate() {
        rebuilt.insert(insert_at + offset, directive.clone());
    }
    rebuilt.join("\n")
}

fn strip_directives(parsed: &toolcall::ParsedOutput) -> String {
    let mut out = String::new();
    for segment in &parsed.segments {
        if let Segment::Text(text) = segment {
            out.push_str(text);
        }
    }
    collapse_blank_lines(out.trim())
}

fn reassemble_with(parsed: &toolcall::ParsedOutput, directives: &[ToolDirective]) -> String {
    let mut out = String::new();
    for segment in &parsed.segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Directive(index) => {
                if let Some(directive) = directives.get(*index) {
                    out.push_str(&directive.canonical_text());
                }
            }
        }
    }
    out
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

fn detect_incident_type(user_message: &str, output: &str) -> &'static str {
    let combined = format!("{} {}", user_message, output).to_lowercase();
    let has = |needle: &str| combined.contains(needle);

    if has("suicid") || has("kill myself") || has("end my life") {
        if has("plan") || has("pills") || has("rope") || has("gun") || has("means") {
            return "suicide_plan_with_means";
        }
        return "suicide_ideation";
    }
    if has("self-harm") || has("self harm") || has("cutting") {
        return "self_harm";
    }
    if has("domestic") || has("hit me") || has("abusive") || has("refuge") {
        return "domestic_violence";
    }
    if has("voices") || has("psychosis") || has("hallucinat") {
        return "psychosis";
    }
    if has("drug") || has("alcohol") || has("relapse") || has("overdose") {
        return "substance_crisis";
    }
    if has("hopeless") || has("trapped") || has("spiral") {
        return "mental_health_crisis";
    }
    "crisis_detected"
}

#[cfg(test)]
mod tests {
    use crate::corpus::types::{ExampleMetadata, TrainingExample};
    use crate::types::{Region, RiskLevel};

    use super::{normalize_example, extract_user_message};

    fn example(output: &str, risk: Option<RiskLevel>) -> TrainingExample {
        TrainingExample {
            instruction: "Watch for risk.\n\nObservation: User: 'I want to end my life'"
                .to_string(),
            input: String::new(),
            output: output.to_string(),
            metadata: risk.map(|risk_level| ExampleMetadata {
                risk_level: Some(risk_level),
                ..ExampleMetadata::default()
            }),
        }
    }

    #[test]
    fn high_risk_without_tools_gets_mapped_directives() {
        let mut ex = example("RISK LEVEL: HIGH\nPATTERNS DETECTED: ideation\nStay safe.", None);
        let changes = normalize_example(&mut ex, Region::Nz).expect("normalize should succeed");
        assert!(changes.tools_added);
        assert!(ex.output.contains(
            "[TOOL_CALL: get_crisis_resources(region='NZ', situation_type='crisis')]"
        ));
        assert!(ex.output.contains("log_incident"));
    }

    #[test]
    fn low_risk_loses_all_directives() {
        let mut ex = example(
            "RISK LEVEL: LOW\n[TOOL_CALL: get_crisis_resources(region='NZ', situation_type='support')]\nAll fine.",
            Some(RiskLevel::Low),
        );
        let changes = normalize_example(&mut ex, Region::Nz).expect("normalize should succeed");
        assert!(changes.tools_removed);
        assert!(!ex.output.contains("[TOOL_CALL:"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut ex = example("RISK LEVEL: MEDIUM\nHard week by the sound of it.", None);
        normalize_example(&mut ex, Region::Nz).expect("first pass should succeed");
        let first = ex.clone();
        let changes = normalize_example(&mut ex, Region::Nz).expect("second pass should succeed");
        assert!(!changes.any(), "second pass changed: {changes:?}");
        assert_eq!(first, ex);
    }

    #[test]
    fn legacy_instruction_is_rebuilt_without_resource_preamble() {
        let mut ex = TrainingExample {
            instruction: "VERIFIED NZ CRISIS RESOURCES:\n- 1737\n\nObservation: User: 'feeling hopeless'"
                .to_string(),
            input: String::new(),
            output: "RISK LEVEL: MEDIUM\nRough patch.".to_string(),
            metadata: None,
        };
        normalize_example(&mut ex, Region::Nz).expect("normalize should succeed");
        assert!(!ex.instruction.contains("VERIFIED"));
        assert!(ex.instruction.contains("User: 'feeling hopeless'"));
    }

    #[test]
    fn user_message_extraction_handles_quoted_tail() {
        let message = extract_user_message("intro\n\nObservation: User: 'it all feels heavy'");
        assert_eq!(message, "it all feels heavy");
    }

    #[test]
    fn missing_risk_header_is_prepended() {
        let mut ex = example("Just text with no header.", Some(RiskLevel::Medium));
        normalize_example(&mut ex, Region::Nz).expect("normalize should succeed");
        assert!(ex.output.starts_with("RISK LEVEL: MEDIUM"));
    }
}
