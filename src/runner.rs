//! Experiment runs: load each condition's fixture, invoke the model N times,
//! and persist a timestamped result document.
use crate::fixture::{Condition, FixtureError, FixtureStore};
use crate::model::{self, ModelBackend, ModelRequest, RunResult};
use crate::paths::{fixture_file_name, HarnessPaths};
use crate::prompt;
use crate::scenarios::Scenario;
use crate::stats::Summary;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Model settings shared by every run of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings<'a> {
    pub model: &'a str,
    pub runs: u32,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Statistics over the successful runs of one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeStats {
    pub successful_runs: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_length: Option<Summary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeResults {
    pub context_file: String,
    pub prompt_length: usize,
    pub runs: Vec<RunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ModeStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResults {
    pub experiment: String,
    pub name: String,
    pub model: String,
    pub num_runs: u32,
    /// RFC 3339 UTC start time.
    pub timestamp: String,
    pub modes: BTreeMap<Condition, ModeResults>,
}

/// A results file as written by `run`: one experiment or a combined map.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsDocument {
    Single(ExperimentResults),
    Combined(Vec<ExperimentResults>),
}

impl ResultsDocument {
    pub fn experiments(&self) -> &[ExperimentResults] {
        match self {
            ResultsDocument::Single(one) => std::slice::from_ref(one),
            ResultsDocument::Combined(all) => all,
        }
    }
}

/// Local wall-clock stamp used in result file names.
pub fn file_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Run every condition of `scenario` `settings.runs` times.
///
/// A condition without a fixture is skipped; an unreadable or invalid fixture
/// is an error.
pub fn run_experiment(
    scenario: &dyn Scenario,
    store: &FixtureStore,
    backend: &dyn ModelBackend,
    settings: RunSettings<'_>,
) -> Result<ExperimentResults> {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let mut modes = BTreeMap::new();
    for &condition in scenario.conditions() {
        let record = match store.load(scenario.id(), condition) {
            Ok(record) => record,
            Err(FixtureError::NotFound { path }) => {
                tracing::warn!(
                    experiment = scenario.id(),
                    condition = condition.as_str(),
                    path = %path.display(),
                    "fixture missing; skipping condition"
                );
                continue;
            }
            Err(err) => return Err(err).context("load fixture"),
        };
        let prompt = prompt::build(&record);
        eprintln!(
            "experiment {} [{}]: {} run(s), prompt {} chars",
            scenario.id(),
            condition,
            settings.runs,
            prompt.chars().count()
        );
        let request = ModelRequest {
            model: settings.model,
            prompt: &prompt,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        };
        let runs: Vec<RunResult> = (1..=settings.runs)
            .map(|run| model::invoke(backend, &request, run))
            .collect();
        let stats = mode_stats(&runs);
        modes.insert(
            condition,
            ModeResults {
                context_file: fixture_file_name(scenario.id(), condition),
                prompt_length: prompt.chars().count(),
                runs,
                stats,
            },
        );
    }
    Ok(ExperimentResults {
        experiment: scenario.id().to_string(),
        name: scenario.name().to_string(),
        model: settings.model.to_string(),
        num_runs: settings.runs,
        timestamp,
        modes,
    })
}

/// Statistics over successful runs; `None` when every run failed.
pub fn mode_stats(runs: &[RunResult]) -> Option<ModeStats> {
    let completed: Vec<_> = runs.iter().filter_map(RunResult::completed).collect();
    if completed.is_empty() {
        return None;
    }
    let latencies: Vec<f64> = completed.iter().map(|run| run.latency_ms).collect();
    let lengths: Vec<f64> = completed
        .iter()
        .map(|run| run.response.chars().count() as f64)
        .collect();
    Some(ModeStats {
        successful_runs: completed.len(),
        latency_ms: Summary::from_samples(&latencies).map(|s| s.rounded(1)),
        response_length: Summary::from_samples(&lengths).map(|s| s.rounded(1)),
    })
}

/// Write one experiment's results under `llm_responses/`.
pub fn write_results(
    paths: &HarnessPaths,
    results: &ExperimentResults,
    stamp: &str,
) -> Result<PathBuf> {
    let path = paths.experiment_results_path(&results.experiment, &results.model, stamp);
    write_json(&path, results)?;
    Ok(path)
}

/// Write every experiment of one invocation as a single map keyed by id.
pub fn write_combined(
    paths: &HarnessPaths,
    model: &str,
    results: &[ExperimentResults],
    stamp: &str,
) -> Result<PathBuf> {
    let mut combined = serde_json::Map::new();
    for experiment in results {
        let value = serde_json::to_value(experiment).context("serialize results")?;
        combined.insert(experiment.experiment.clone(), value);
    }
    let path = paths.combined_results_path(model, stamp);
    write_json(&path, &combined)?;
    Ok(path)
}

/// Load a single-experiment or combined results document.
pub fn load_results(path: &Path) -> Result<ResultsDocument> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))?;
    let serde_json::Value::Object(map) = value else {
        return Err(anyhow!("{}: results must be a JSON object", path.display()));
    };
    if map.contains_key("experiment") {
        let single = serde_json::from_value(serde_json::Value::Object(map))
            .with_context(|| format!("parse experiment results {}", path.display()))?;
        return Ok(ResultsDocument::Single(single));
    }
    let mut all = Vec::with_capacity(map.len());
    for (id, entry) in map {
        let experiment: ExperimentResults = serde_json::from_value(entry)
            .with_context(|| format!("parse experiment {id} in {}", path.display()))?;
        all.push(experiment);
    }
    Ok(ResultsDocument::Combined(all))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(value).context("serialize results")?;
    fs::write(path, format!("{text}\n")).with_context(|| format!("write {}", path.display()))
}
