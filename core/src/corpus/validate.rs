use std::collections::BTreeMap;

use crate::corpus::error::{
    CorpusError, empty_risk_bucket, fabrication_literal, invariant, parse_error,
    unregistered_literal,
};
use crate::corpus::normalize::extract_risk_level;
use crate::corpus::types::TrainingExample;
use crate::registry::store::RegistrySnapshot;
use crate::triage::post_scan::{PostScanFindingKind, post_scan};
use crate::toolcall::{self, ToolDirective};
use crate::types::{Region, RiskLevel};

/// Any risk bucket below this share of the corpus draws a warning.
const BUCKET_WARNING_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    pub total: usize,
    pub risk_distribution: BTreeMap<&'static str, usize>,
    pub cultural_marker_count: usize,
    /// Fraction of CRITICAL/HIGH examples that mention at least one
    /// registered resource name from their region.
    pub resource_mention_fraction: f64,
    /// Fraction of outputs whose literals all exist in the registry. The
    /// validator fails unless this is 1.0.
    pub literal_compliance_fraction: f64,
    pub warnings: Vec<String>,
}

/// Gate before a corpus is allowed to exist on disk. The training pipeline
/// propagates eagerly: any fabricated literal, missing tool call, or empty
/// risk bucket aborts the build.
pub fn validate_corpus(
    examples: &[TrainingExample],
    snapshot: &RegistrySnapshot,
    default_region: Region,
) -> Result<CoverageReport, CorpusError> {
    let mut report = CoverageReport {
        total: examples.len(),
        ..CoverageReport::default()
    };
    for level in RiskLevel::ALL {
        report.risk_distribution.insert(level.as_str(), 0);
    }

    let mut elevated_total = 0usize;
    let mut elevated_with_mention = 0usize;
    let mut compliant_outputs = 0usize;

    for (index, example) in examples.iter().enumerate() {
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

        *report.risk_distribution.entry(risk.as_str()).or_insert(0) += 1;
        if let Some(metadata) = &example.metadata {
            report.cultural_marker_count += metadata.cultural_markers.len();
        }

        let parsed = toolcall::parse(&example.output)
            .map_err(|err| parse_error(format!("example {}: {err}", index)))?;

        match risk.situation() {
            Some(situation) => {
                let mapped = parsed.directives.iter().any(|d| {
                    matches!(
                        d.directive,
                        ToolDirective::GetCrisisResources { situation_type, .. }
                            if situation_type == situation
                    )
                });
                if !mapped {
                    return Err(invariant(format!(
                        "example {}: {} output lacks get_crisis_resources(situation_type='{}')",
                        index, risk, situation
                    )));
                }
            }
            None => {
                if parsed.has_directives() {
                    return Err(invariant(format!(
                        "example {}: LOW output must carry zero tool calls",
                        index
                    )));
                }
            }
        }

        let scan = post_scan(snapshot, region, &example.output);
        let mut compliant = true;
        for finding in &scan.findings {
            match finding.kind {
                PostScanFindingKind::FabricatedLiteral => {
                    return Err(fabrication_literal(format!(
                        "example {}: output contains blocklisted literal '{}'",
                        index,
                        finding.value.as_deref().unwrap_or_default()
                    )));
                }
                PostScanFindingKind::UnregisteredLiteral
                | PostScanFindingKind::RegionDrift => {
                    compliant = false;
                }
                PostScanFindingKind::VictimBlame => {
                    return Err(invariant(format!(
                        "example {}: output contains victim-blaming language ({})",
                        index, finding.pattern_id
                    )));
                }
            }
        }
        if compliant {
            compliant_outputs += 1;
        }

        if matches!(risk, RiskLevel::Critical | RiskLevel::High) {
            elevated_total += 1;
            if mentions_registered_resource(snapshot, region, &example.output) {
                elevated_with_mention += 1;
            }
        }
    }

    let distribution: Vec<(&'static str, usize)> = report
        .risk_distribution
        .iter()
        .map(|(level, count)| (*level, *count))
        .collect();
    for (level, count) in distribution {
        if count == 0 {
            return Err(empty_risk_bucket(format!(
                "risk bucket {} is empty",
                level
            )));
        }
        let fraction = count as f64 / report.total.max(1) as f64;
        if fraction < BUCKET_WARNING_FRACTION {
            report.warnings.push(format!(
                "risk bucket {} holds {:.1}% of the corpus",
                level,
                fraction * 100.0
            ));
        }
    }

    report.resource_mention_fraction = if elevated_total == 0 {
        1.0
    } else {
        elevated_with_mention as f64 / elevated_total as f64
    };
    report.literal_compliance_fraction = if report.total == 0 {
        1.0
    } else {
        compliant_outputs as f64 / report.total as f64
    };

    if report.literal_compliance_fraction < 1.0 {
        return Err(unregistered_literal(format!(
            "{:.1}% of outputs carry literals outside the registry",
            (1.0 - report.literal_compliance_fraction) * 100.0
        )));
    }

    tracing::info!(
        target: "corpus.validate",
        total = report.total,
        distribution = ?report.risk_distribution,
        cultural_markers = report.cultural_marker_count,
        resource_mention_fraction = report.resource_mention_fraction,
        "corpus_validated"
    );
    Ok(report)
}

fn mentions_registered_resource(
    snapshot: &RegistrySnapshot,
    region: Region,
    output: &str,
) -> bool {
    let lowered = output.to_lowercase();
    snapshot
        .state
        .resources
        .iter()
        .filter(|r| r.region == region)
        .any(|r| lowered.contains(&r.service_name.to_lowercase()))
}
