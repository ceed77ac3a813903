use serde::{Deserialize, Serialize};

use crate::corpus::error::CorpusError;
use crate::corpus::normalize::{canonical_instruction, normalize_example};
use crate::corpus::types::{ExampleMetadata, TrainingExample};
use crate::registry::store::RegistrySnapshot;
use crate::triage::post_scan::post_scan;
use crate::types::{Region, RiskLevel};

/// One record of an external crisis dataset, before mapping. Field aliases
/// cover the common export shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalRecord {
    #[serde(alias = "message", alias = "prompt")]
    pub text: String,
    #[serde(alias = "completion", alias = "answer")]
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

/// External datasets come in region-blind and leave region-blind: each
/// record maps to a `GLOBAL` example, any region-specific literal is
/// scrubbed, and the result goes through the same normalizer as in-house
/// data. The caller still runs the validator over the merged corpus.
pub fn ingest_external(
    records: &[ExternalRecord],
    snapshot: &RegistrySnapshot,
) -> Result<Vec<TrainingExample>, CorpusError> {
    let mut examples = Vec::with_capacity(records.len());

    for record in records {
        let mut output = record.response.clone();
        for finding in post_scan(snapshot, Region::Global, &output).findings {
            if let Some(value) = finding.value {
                output = output.replace(&value, "");
            }
        }

        let mut example = TrainingExample {
            instruction: canonical_instruction(record.text.trim()),
            input: String::new(),
            output,
            metadata: Some(ExampleMetadata {
                risk_level: record.risk_level,
                region: Some(Region::Global),
                ..ExampleMetadata::default()
            }),
        };
        normalize_example(&mut example, Region::Global)?;
        examples.push(example);
    }

    Ok(examples)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::registry::seed::seed_state;
    use crate::registry::store::ResourceRegistry;
    use crate::types::{Region, RiskLevel};

    use super::{ExternalRecord, ingest_external};

    #[test]
    fn external_records_map_to_global_and_lose_regional_literals() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 1).expect("date must be valid");
        let registry =
            ResourceRegistry::new(seed_state(today), today).expect("seed registry must build");

        let records = vec![ExternalRecord {
            text: "I can't do this anymore".to_string(),
            response: "RISK LEVEL: HIGH\nYou can call 988 right now.".to_string(),
            risk_level: Some(RiskLevel::High),
        }];

        let examples =
            ingest_external(&records, &registry.snapshot()).expect("ingest should succeed");
        assert_eq!(examples.len(), 1);
        let example = &examples[0];
        assert_eq!(
            example.metadata.as_ref().and_then(|m| m.region),
            Some(Region::Global)
        );
        assert!(!example.output.contains("988"));
        assert!(example.output.contains("get_crisis_resources"));
    }
}
