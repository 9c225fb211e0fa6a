//! Harness configuration.
//!
//! Config is optional JSON (`<root>/harness.json`, an explicit `--config`, or
//! the user config dir). Missing fields take defaults; environment variables
//! override the model backend and the query tool binary.
use crate::bench::PassCriterion;
use crate::paths::HarnessPaths;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Forces the command backend with the given command line.
pub const LM_COMMAND_ENV: &str = "INTENT_EVAL_LM_COMMAND";
/// Overrides the query tool binary.
pub const TOOL_BIN_ENV: &str = "TELOS_BIN";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";
pub const DEFAULT_JUDGE_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub schema_version: u32,
    /// Model under evaluation.
    pub model: String,
    /// Model used by the judge scorer.
    pub judge_model: String,
    /// Invocations per scenario/condition.
    pub runs: u32,
    pub max_tokens: u32,
    pub judge_max_tokens: u32,
    pub temperature: f64,
    pub backend: BackendConfig,
    /// Global HTTP request timeout for API backends.
    pub request_timeout_secs: u64,
    /// Timeout for command backends.
    pub lm_timeout_secs: u64,
    /// External query tool binary.
    pub tool_bin: String,
    /// Timeout for query tool and git invocations.
    pub tool_timeout_secs: u64,
    pub bench: BenchConfig,
}

/// Where model requests go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Anthropic Messages API over HTTP.
    Anthropic {
        base_url: String,
        /// Environment variable holding the API key.
        api_key_env: String,
    },
    /// Local command reading the prompt on stdin.
    Command { command: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub scale_points: Vec<u32>,
    pub num_runs: u32,
    pub query_areas: Vec<String>,
    pub pass_criteria: Vec<PassCriterion>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            model: DEFAULT_MODEL.to_string(),
            judge_model: DEFAULT_JUDGE_MODEL.to_string(),
            runs: 3,
            max_tokens: 4096,
            judge_max_tokens: 256,
            temperature: 0.0,
            backend: BackendConfig::default(),
            request_timeout_secs: 300,
            lm_timeout_secs: 120,
            tool_bin: "telos".to_string(),
            tool_timeout_secs: 60,
            bench: BenchConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Anthropic {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            scale_points: vec![100, 500, 1000, 2000, 5000],
            num_runs: 10,
            query_areas: ["auth", "security", "payments", "tasks", "billing"]
                .into_iter()
                .map(String::from)
                .collect(),
            pass_criteria: vec![
                PassCriterion {
                    intent_count: 1000,
                    threshold_ms: 500.0,
                },
                PassCriterion {
                    intent_count: 5000,
                    threshold_ms: 2000.0,
                },
            ],
        }
    }
}

impl HarnessConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn lm_timeout(&self) -> Duration {
        Duration::from_secs(self.lm_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

/// Resolve, load, override, and validate the effective config.
///
/// Priority: explicit path (must exist), `<root>/harness.json`, the user
/// config dir, then built-in defaults.
pub fn resolve_config(explicit: Option<&Path>, paths: &HarnessPaths) -> Result<HarnessConfig> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let candidates = [Some(paths.config_path()), user_config_path()];
            let mut found = None;
            for path in candidates.into_iter().flatten() {
                if let Some(config) = load_config_optional(&path)? {
                    tracing::debug!(path = %path.display(), "loaded harness config");
                    found = Some(config);
                    break;
                }
            }
            found.unwrap_or_default()
        }
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;
    Ok(config)
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("intent-eval").join("config.json"))
}

pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: HarnessConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse harness config {}", path.display()))?;
    Ok(config)
}

pub fn load_config_optional(path: &Path) -> Result<Option<HarnessConfig>> {
    if !path.is_file() {
        return Ok(None);
    }
    load_config(path).map(Some)
}

/// Apply environment overrides through `lookup` so tests need not touch the
/// process environment.
pub fn apply_env_overrides(config: &mut HarnessConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(command) = lookup(LM_COMMAND_ENV).filter(|c| !c.trim().is_empty()) {
        config.backend = BackendConfig::Command { command };
    }
    if let Some(bin) = lookup(TOOL_BIN_ENV).filter(|b| !b.trim().is_empty()) {
        config.tool_bin = bin;
    }
}

pub fn validate_config(config: &HarnessConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported harness config schema_version {}",
            config.schema_version
        ));
    }
    if config.model.trim().is_empty() {
        return Err(anyhow!("model must be non-empty"));
    }
    if config.judge_model.trim().is_empty() {
        return Err(anyhow!("judge_model must be non-empty"));
    }
    if config.runs == 0 {
        return Err(anyhow!("runs must be at least 1"));
    }
    if config.max_tokens == 0 || config.judge_max_tokens == 0 {
        return Err(anyhow!("max_tokens and judge_max_tokens must be positive"));
    }
    if !(0.0..=1.0).contains(&config.temperature) {
        return Err(anyhow!(
            "temperature must be within 0.0..=1.0 (got {})",
            config.temperature
        ));
    }
    for (label, secs) in [
        ("request_timeout_secs", config.request_timeout_secs),
        ("lm_timeout_secs", config.lm_timeout_secs),
        ("tool_timeout_secs", config.tool_timeout_secs),
    ] {
        if secs == 0 {
            return Err(anyhow!("{label} must be positive"));
        }
    }
    match &config.backend {
        BackendConfig::Anthropic {
            base_url,
            api_key_env,
        } => {
            if base_url.trim().is_empty() || api_key_env.trim().is_empty() {
                return Err(anyhow!("anthropic backend needs base_url and api_key_env"));
            }
        }
        BackendConfig::Command { command } => {
            if command.trim().is_empty() {
                return Err(anyhow!("command backend needs a non-empty command"));
            }
        }
    }
    if config.tool_bin.trim().is_empty() {
        return Err(anyhow!("tool_bin must be non-empty"));
    }
    validate_bench(&config.bench)
}

fn validate_bench(bench: &BenchConfig) -> Result<()> {
    if bench.num_runs == 0 {
        return Err(anyhow!("bench.num_runs must be at least 1"));
    }
    if bench.query_areas.iter().any(|area| area.trim().is_empty()) {
        return Err(anyhow!("bench.query_areas entries must be non-empty"));
    }
    let mut seen = BTreeSet::new();
    for criterion in &bench.pass_criteria {
        if !seen.insert(criterion.intent_count) {
            return Err(anyhow!(
                "duplicate pass criterion for {} intents",
                criterion.intent_count
            ));
        }
        if criterion.threshold_ms.is_nan() || criterion.threshold_ms <= 0.0 {
            return Err(anyhow!(
                "pass criterion threshold for {} intents must be positive",
                criterion.intent_count
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
