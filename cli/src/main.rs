use std::{env, path::PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;

use sentinel::{
    corpus::{
        ExternalRecord, InstructionTemplate, OutputRecord, PromptRecord, compose, ingest_external,
        normalize_corpus, read_jsonl, validate_corpus, write_jsonl,
    },
    registry::{RegistryPersistence, ResourceRegistry, seed_state},
    types::Region,
};

#[derive(Debug, Clone)]
struct CliOptions {
    instructions: PathBuf,
    prompts: PathBuf,
    outputs: PathBuf,
    out: PathBuf,
    registry_state: Option<PathBuf>,
    external: Option<PathBuf>,
    region: Region,
    dry_run: bool,
}

const USAGE: &str = "usage: sentinel-cli --instructions <path> --prompts <path> --outputs <path> \
--out <path> [--registry-state <path>] [--external <path>] [--region <code>] [--dry-run]";

fn parse_cli_options<I>(mut args: I) -> Result<CliOptions>
where
    I: Iterator<Item = String>,
{
    let mut instructions = None;
    let mut prompts = None;
    let mut outputs = None;
    let mut out = None;
    let mut registry_state = None;
    let mut external = None;
    let mut region = Region::Nz;
    let mut dry_run = false;

    while let Some(arg) = args.next() {
        let mut path_value = |name: &str, args: &mut I| -> Result<PathBuf> {
            args.next()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("missing value for {name}"))
        };
        match arg.as_str() {
            "--instructions" => instructions = Some(path_value("--instructions", &mut args)?),
            "--prompts" => prompts = Some(path_value("--prompts", &mut args)?),
            "--outputs" => outputs = Some(path_value("--outputs", &mut args)?),
            "--out" => out = Some(path_value("--out", &mut args)?),
            "--registry-state" => registry_state = Some(path_value("--registry-state", &mut args)?),
            "--external" => external = Some(path_value("--external", &mut args)?),
            "--region" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --region"))?;
                region = value
                    .parse()
                    .map_err(|_| anyhow!("unknown region code '{value}'"))?;
            }
            "--dry-run" => dry_run = true,
            other => bail!("unknown argument: {other}. {USAGE}"),
        }
    }

    Ok(CliOptions {
        instructions: instructions.ok_or_else(|| anyhow!("missing --instructions. {USAGE}"))?,
        prompts: prompts.ok_or_else(|| anyhow!("missing --prompts. {USAGE}"))?,
        outputs: outputs.ok_or_else(|| anyhow!("missing --outputs. {USAGE}"))?,
        out: out.ok_or_else(|| anyhow!("missing --out. {USAGE}"))?,
        registry_state,
        external,
        region,
        dry_run,
    })
}

fn main() -> Result<()> {
    let options = parse_cli_options(env::args().skip(1))?;

    let instructions: Vec<InstructionTemplate> = read_jsonl(&options.instructions)
        .with_context(|| format!("reading {}", options.instructions.display()))?;
    let prompts: Vec<PromptRecord> = read_jsonl(&options.prompts)
        .with_context(|| format!("reading {}", options.prompts.display()))?;
    let outputs: Vec<OutputRecord> = read_jsonl(&options.outputs)
        .with_context(|| format!("reading {}", options.outputs.display()))?;
    eprintln!(
        "loaded {} instruction template(s), {} prompt(s), {} output(s)",
        instructions.len(),
        prompts.len(),
        outputs.len()
    );

    let today = Utc::now().date_naive();
    let state = match &options.registry_state {
        Some(path) => RegistryPersistence::new(path.clone())
            .load()
            .with_context(|| format!("reading registry state {}", path.display()))?
            .ok_or_else(|| anyhow!("registry state {} does not exist", path.display()))?,
        None => seed_state(today),
    };
    let registry =
        ResourceRegistry::new(state, today).context("registry state failed validation")?;
    let snapshot = registry.snapshot();

    let report = compose(&instructions, &prompts, &outputs).context("compose failed")?;
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    let mut examples = report.examples;

    if let Some(path) = &options.external {
        let records: Vec<ExternalRecord> =
            read_jsonl(path).with_context(|| format!("reading {}", path.display()))?;
        let ingested =
            ingest_external(&records, &snapshot).context("external ingest failed")?;
        eprintln!("ingested {} external record(s) as GLOBAL", ingested.len());
        examples.extend(ingested);
    }

    let stats =
        normalize_corpus(&mut examples, options.region).context("normalization failed")?;
    eprintln!(
        "normalized {} example(s): {} tool insertions, {} removals, {} remapped, {} instructions rebuilt",
        stats.total,
        stats.tools_added,
        stats.tools_removed,
        stats.tools_remapped,
        stats.instructions_canonicalized
    );

    let coverage =
        validate_corpus(&examples, &snapshot, options.region).context("validation failed")?;
    println!("corpus: {} example(s)", coverage.total);
    for (level, count) in &coverage.risk_distribution {
        let share = *count as f64 / coverage.total.max(1) as f64 * 100.0;
        println!("  {level:<10} {count:>6}  {share:>5.1}%");
    }
    println!(
        "  resource mentions (CRITICAL/HIGH): {:.1}%",
        coverage.resource_mention_fraction * 100.0
    );
    for warning in &coverage.warnings {
        eprintln!("warning: {warning}");
    }

    if options.dry_run {
        println!("dry run: nothing written");
        return Ok(());
    }

    write_jsonl(&options.out, &examples)
        .with_context(|| format!("writing {}", options.out.display()))?;
    println!("wrote {}", options.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_cli_options;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_required_paths() {
        let options = parse_cli_options(args(&[
            "--instructions",
            "i.jsonl",
            "--prompts",
            "p.jsonl",
            "--outputs",
            "o.jsonl",
            "--out",
            "corpus.jsonl",
        ]))
        .expect("options should parse");
        assert_eq!(options.out, std::path::PathBuf::from("corpus.jsonl"));
        assert!(!options.dry_run);
    }

    #[test]
    fn rejects_missing_out() {
        let err = parse_cli_options(args(&[
            "--instructions",
            "i.jsonl",
            "--prompts",
            "p.jsonl",
            "--outputs",
            "o.jsonl",
        ]))
        .expect_err("missing --out must fail");
        assert!(err.to_string().contains("--out"));
    }

    #[test]
    fn rejects_unknown_region() {
        let err = parse_cli_options(args(&[
            "--instructions",
            "i.jsonl",
            "--prompts",
            "p.jsonl",
            "--outputs",
            "o.jsonl",
            "--out",
            "c.jsonl",
            "--region",
            "MARS",
        ]))
        .expect_err("unknown region must fail");
        assert!(err.to_string().contains("MARS"));
    }
}
