use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::registry::store::RegistrySnapshot;
use crate::types::{ChannelKind, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostScanFindingKind {
    FabricatedLiteral,
    UnregisteredLiteral,
    RegionDrift,
    VictimBlame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostScanFinding {
    pub kind: PostScanFindingKind,
    pub pattern_id: String,
    pub excerpt: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub actual_region: Option<Region>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostScanReport {
    pub findings: Vec<PostScanFinding>,
}

impl PostScanReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Any finding at all is an AI failure: the model emitted a literal it
    /// had no right to, or language the contract forbids.
    pub fn ai_failure(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn flagged_values(&self) -> Vec<&str> {
        self.findings
            .iter()
            .filter_map(|f| f.value.as_deref())
            .collect()
    }
}

/// Closed list. Expansion is domain review, not extrapolation.
const VICTIM_BLAME_PHRASES: [(&str, &str); 4] = [
    ("victim_blame/willingness_accept", "your willingness to accept"),
    ("victim_blame/you_allowed", "you allowed"),
    ("victim_blame/enabling", "enabling"),
    ("victim_blame/your_fault", "your fault"),
];

/// Scan model output before rendering: fabricated or unregistered contact
/// literals, cross-region numbers, and victim-blaming language. Any hit must
/// suppress the offending segment upstream.
pub fn post_scan(snapshot: &RegistrySnapshot, region: Region, text: &str) -> PostScanReport {
    let mut findings = Vec::new();
    let lowered = text.to_lowercase();

    for (pattern_id, phrase) in VICTIM_BLAME_PHRASES {
        if let Some(position) = lowered.find(phrase) {
            findings.push(PostScanFinding {
                kind: PostScanFindingKind::VictimBlame,
                pattern_id: pattern_id.to_string(),
                excerpt: excerpt_around(text, position, phrase.len()),
                value: Some(phrase.to_string()),
                actual_region: None,
            });
        }
    }

    for literal in extract_literals(text) {
        let check = snapshot.is_fabrication(&literal.value, literal.kind, Some(region));
        if check.is_fabrication {
            findings.push(PostScanFinding {
                kind: PostScanFindingKind::FabricatedLiteral,
                pattern_id: "fabrication/known_value".to_string(),
                excerpt: literal.value.clone(),
                value: Some(literal.value),
                actual_region: None,
            });
            continue;
        }

        match snapshot.locate_value(&literal.value, literal.kind, Some(region)) {
            Some(resource) if resource.region == region => {}
            Some(_) if !literal.confident => {}
            Some(resource) => {
                findings.push(PostScanFinding {
                    kind: PostScanFindingKind::RegionDrift,
                    pattern_id: format!("region_drift/{}", resource.region.as_str().to_lowercase()),
                    excerpt: literal.value.clone(),
                    value: Some(literal.value),
                    actual_region: Some(resource.region),
                });
            }
            None if literal.confident => {
                findings.push(PostScanFinding {
                    kind: PostScanFindingKind::UnregisteredLiteral,
                    pattern_id: "fabrication/unregistered".to_string(),
                    excerpt: literal.value.clone(),
                    value: Some(literal.value),
                    actual_region: None,
                });
            }
            None => {}
        }
    }

    PostScanReport { findings }
}

struct ExtractedLiteral {
    value: String,
    kind: ChannelKind,
    /// Short bare digit runs are only treated as contact literals when the
    /// surrounding text reads like a contact instruction; everything else
    /// (formatted numbers, URLs, emails) is always confident.
    confident: bool,
}

fn extract_literals(text: &str) -> Vec<ExtractedLiteral> {
    static FORMATTED_PHONE: OnceLock<Regex> = OnceLock::new();
    static SHORT_CODE: OnceLock<Regex> = OnceLock::new();
    static URL: OnceLock<Regex> = OnceLock::new();
    static EMAIL: OnceLock<Regex> = OnceLock::new();

    let formatted_phone = FORMATTED_PHONE.get_or_init(|| {
        Regex::new(
            r"(?x)
            \b(?:
                0800[\ \-]?\d{3}[\ \-]?\d{3,4}
              | 0508[\ \-]?\d{3}[\ \-]?\d{3,4}
              | 1[38]00[\ \-]?\d{2,3}[\ \-]?\d{3,4}
              | 1-8\d{2}-\d{3}-\d{4}
              | 1[\ \-]8\d{2}[\ \-]\d{3}[\ \-]\d{4}
              | 0\d{3}[\ \-]\d{3}[\ \-]\d{4}
              | 116[\ ]?123
              | 13[\ ]?11[\ ]?14
            )\b",
        )
        .expect("phone pattern must compile")
    });
    let short_code = SHORT_CODE
        .get_or_init(|| Regex::new(r"\b\d{3,6}\b").expect("short code pattern must compile"));
    let url = URL.get_or_init(|| {
        Regex::new(r"(?i)\b(?:https?://|www\.)[a-z0-9.\-]+\.[a-z]{2,}[^\s)\]]*")
            .expect("url pattern must compile")
    });
    let email = EMAIL.get_or_init(|| {
        Regex::new(r"(?i)\b[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}\b")
            .expect("email pattern must compile")
    });

    let mut literals = Vec::new();
    let mut covered: Vec<(usize, usize)> = Vec::new();

    for m in formatted_phone.find_iter(text) {
        covered.push((m.start(), m.end()));
        literals.push(ExtractedLiteral {
            value: m.as_str().to_string(),
            kind: ChannelKind::Phone,
            confident: true,
        });
    }
    for m in short_code.find_iter(text) {
        if covered.iter().any(|(s, e)| m.start() >= *s && m.end() <= *e) {
            continue;
        }
        literals.push(ExtractedLiteral {
            value: m.as_str().to_string(),
            kind: ChannelKind::Phone,
            confident: contact_context(text, m.start()),
        });
    }
    for m in url.find_iter(text) {
        literals.push(ExtractedLiteral {
            value: m.as_str().to_string(),
            kind: ChannelKind::Website,
            confident: true,
        });
    }
    for m in email.find_iter(text) {
        literals.push(ExtractedLiteral {
            value: m.as_str().to_string(),
            kind: ChannelKind::Email,
            confident: true,
        });
    }

    literals
}

const CONTACT_VERBS: [&str; 8] = [
    "call", "text", "dial", "ring", "phone", "contact", "reach", "free on",
];

fn contact_context(text: &str, position: usize) -> bool {
    let window_start = position.saturating_sub(32);
    let mut start = window_start;
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let window = text[start..position].to_lowercase();
    CONTACT_VERBS.iter().any(|verb| window.contains(verb))
}

fn excerpt_around(text: &str, position: usize, len: usize) -> String {
    let mut start = position.saturating_sub(20);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (position + len + 20).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].trim().to_string()
}
