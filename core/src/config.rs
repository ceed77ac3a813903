use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Region;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub registry: RegistryRuntimeConfig,
    #[serde(default)]
    pub audit: AuditRuntimeConfig,
    #[serde(default)]
    pub triage: TriageRuntimeConfig,
    #[serde(default)]
    pub model: ModelRuntimeConfig,
    #[serde(default)]
    pub metrics: MetricsRuntimeConfig,
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/sentinel")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_enabled_true() -> bool {
    true
}

fn default_registry_state_path() -> PathBuf {
    PathBuf::from("./state/registry.json")
}

fn default_registry_reload_interval_secs() -> u64 {
    300
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./state/crisis_events.jsonl")
}

fn default_region() -> Region {
    Region::Nz
}

fn default_model_endpoint() -> String {
    "http://127.0.0.1:8000/v1".to_string()
}

fn default_model_id() -> String {
    "crisis-guard-3b".to_string()
}

fn default_model_timeout_ms() -> u64 {
    4_000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRuntimeConfig {
    #[serde(default = "default_registry_state_path")]
    pub state_path: PathBuf,
    /// The registry is held in memory; this is how often it is re-read from
    /// persistent storage.
    #[serde(default = "default_registry_reload_interval_secs")]
    pub reload_interval_secs: u64,
}

impl Default for RegistryRuntimeConfig {
    fn default() -> Self {
        Self {
            state_path: default_registry_state_path(),
            reload_interval_secs: default_registry_reload_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRuntimeConfig {
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,
}

impl Default for AuditRuntimeConfig {
    fn default() -> Self {
        Self {
            log_path: default_audit_log_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageRuntimeConfig {
    #[serde(default = "default_region")]
    pub default_region: Region,
}

impl Default for TriageRuntimeConfig {
    fn default() -> Self {
        Self {
            default_region: default_region(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRuntimeConfig {
    #[serde(default = "default_enabled_true")]
    pub enabled: bool,
    #[serde(default = "default_model_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Name of the environment variable holding the bearer token, if any.
    /// The token itself never lives in the config file.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_model_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ModelRuntimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_model_endpoint(),
            model_id: default_model_id(),
            api_key_env: None,
            timeout_ms: default_model_timeout_ms(),
        }
    }
}

impl ModelRuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsRuntimeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub listen_addr: Option<String>,
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config = serde_json::from_value(config_value)
            .context("failed to deserialize sentinel config")?;

        if !config.registry.state_path.is_absolute() {
            config.registry.state_path = config_base.join(&config.registry.state_path);
        }
        if !config.audit.log_path.is_absolute() {
            config.audit.log_path = config_base.join(&config.audit.log_path);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let root_default = config_base.join("core/sentinel.schema.json");
    if root_default.exists() {
        return Ok(root_default);
    }

    let local_default = config_base.join("sentinel.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config, core/sentinel.schema.json, or sentinel.schema.json"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use uuid::Uuid;

    use super::{Config, LoggingConfig, LoggingRotation};

    #[test]
    fn logging_config_defaults_match_contract() {
        let config = LoggingConfig::default();
        assert_eq!(config.dir, std::path::PathBuf::from("./logs/sentinel"));
        assert_eq!(config.filter, "info");
        assert_eq!(config.rotation, LoggingRotation::Daily);
        assert_eq!(config.retention_days, 14);
        assert!(config.stderr_warn_enabled);
    }

    #[test]
    fn model_timeout_defaults_to_bounded_interval() {
        let config = Config::default();
        assert!(config.model.timeout() <= std::time::Duration::from_secs(5));
    }

    #[test]
    fn config_load_rejects_unknown_top_level_keys() {
        let work_dir = std::env::temp_dir().join(format!("sentinel-config-test-{}", Uuid::now_v7()));
        fs::create_dir_all(&work_dir).expect("temp work dir should be created");

        let config_path = work_dir.join("sentinel.jsonc");
        let schema_path =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("sentinel.schema.json");
        let config_text = format!(
            r#"{{
  "$schema": "{}",
  "tuning": {{ "lora_rank": 8 }}
}}"#,
            schema_path.display(),
        );
        fs::write(&config_path, config_text).expect("config should be written");

        let err = Config::load(&config_path).expect_err("unknown section should fail schema");
        assert!(
            err.to_string().contains("Additional properties"),
            "unexpected error: {err}",
        );

        let _ = fs::remove_file(&config_path);
        let _ = fs::remove_dir(&work_dir);
    }

    #[test]
    fn config_load_rejects_zero_retention_days() {
        let work_dir = std::env::temp_dir().join(format!("sentinel-config-test-{}", Uuid::now_v7()));
        fs::create_dir_all(&work_dir).expect("temp work dir should be created");

        let config_path = work_dir.join("sentinel.jsonc");
        let schema_path =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("sentinel.schema.json");
        let config_text = format!(
            r#"{{
  "$schema": "{}",
  "logging": {{ "retention_days": 0 }}
}}"#,
            schema_path.display(),
        );
        fs::write(&config_path, config_text).expect("config should be written");

        let err = Config::load(&config_path).expect_err("retention_days=0 should fail schema");
        assert!(err.to_string().contains("minimum"), "unexpected error: {err}");

        let _ = fs::remove_file(&config_path);
        let _ = fs::remove_dir(&work_dir);
    }
}
