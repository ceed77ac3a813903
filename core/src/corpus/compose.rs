use std::collections::{BTreeMap, BTreeSet};

use crate::corpus::error::{CorpusError, invalid_template, missing_reference};
use crate::corpus::types::{
    ExampleMetadata, InstructionTemplate, OutputRecord, PromptRecord, TrainingExample,
};

#[derive(Debug, Clone, Default)]
pub struct ComposeReport {
    pub examples: Vec<TrainingExample>,
    pub warnings: Vec<String>,
}

/// Three-way join of the composer inputs: each prompt pulls its instruction
/// template and its expected output by id, and the observation text lands in
/// the template's `Observation:` slot. A dangling reference fails the build;
/// an output no prompt uses is only worth a warning.
pub fn compose(
    instructions: &[InstructionTemplate],
    prompts: &[PromptRecord],
    outputs: &[OutputRecord],
) -> Result<ComposeReport, CorpusError> {
    let instruction_index: BTreeMap<&str, &InstructionTemplate> = instructions
        .iter()
        .map(|template| (template.id.as_str(), template))
        .collect();
    let output_index: BTreeMap<&str, &OutputRecord> = outputs
        .iter()
        .map(|output| (output.id.as_str(), output))
        .collect();

    let mut report = ComposeReport::default();
    let mut used_outputs: BTreeSet<&str> = BTreeSet::new();

    for prompt in prompts {
        let template = instruction_index
            .get(prompt.instruction_template.as_str())
            .ok_or_else(|| {
                missing_reference(format!(
                    "prompt '{}' references missing instruction template '{}'",
                    prompt.id, prompt.instruction_template
                ))
            })?;
        let output = output_index.get(prompt.output_id.as_str()).ok_or_else(|| {
            missing_reference(format!(
                "prompt '{}' references missing output '{}'",
                prompt.id, prompt.output_id
            ))
        })?;
        used_outputs.insert(output.id.as_str());

        report.examples.push(TrainingExample {
            instruction: fill_observation_slot(&template.template, &prompt.text)?,
            input: String::new(),
            output: output.text.clone(),
            metadata: Some(ExampleMetadata {
                risk_level: Some(output.risk_level),
                situation_type: output.situation_type,
                cultural_markers: Vec::new(),
                resources_mentioned: Vec::new(),
                region: prompt.region,
            }),
        });
    }

    for output in outputs {
        if !used_outputs.contains(output.id.as_str()) {
            report
                .warnings
                .push(format!("output '{}' is referenced by zero prompts", output.id));
        }
    }

    Ok(report)
}

fn fill_observation_slot(template: &str, observation: &str) -> Result<String, CorpusError> {
    if !template.contains("Observation:") {
        return Err(invalid_template(
            "instruction template has no 'Observation:' slot",
        ));
    }
    Ok(format!("{} {}", template.trim_end(), observation.trim()))
}
