//! Query-tool latency benchmark over pre-generated intent populations.
//!
//! Each scale point is a directory `scale/bench_<n>` holding a repository with
//! `n` recorded intents. Every query runs with that directory as cwd; only
//! successful invocations contribute timings.
use crate::config::BenchConfig;
use crate::paths::HarnessPaths;
use crate::process::run_bounded;
use crate::stats::{round_to, Summary};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum acceptable aggregate p95 for one population size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassCriterion {
    pub intent_count: u32,
    pub threshold_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassVerdict {
    pub threshold_ms: f64,
    /// Absent when the point produced no samples.
    pub p95_ms: Option<f64>,
    pub pass: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub command: String,
    pub runs: u32,
    pub successful_runs: usize,
    pub timings_ms: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Summary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalePointResult {
    pub intent_count: u32,
    pub queries: BTreeMap<String, QueryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_stats: Option<Summary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_criteria: Option<PassVerdict>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchReport {
    pub tool_bin: String,
    pub num_runs: u32,
    pub query_areas: Vec<String>,
    pub pass_criteria: Vec<PassCriterion>,
    pub scale_points: BTreeMap<u32, ScalePointResult>,
}

impl BenchReport {
    /// True when any evaluated criterion failed.
    pub fn any_failed(&self) -> bool {
        self.scale_points
            .values()
            .filter_map(|point| point.pass_criteria.as_ref())
            .any(|verdict| !verdict.pass)
    }
}

/// Resolve the tool through `PATH`; unresolvable names are kept verbatim so
/// every invocation fails visibly instead of aborting the benchmark.
pub fn resolve_tool(tool_bin: &str) -> String {
    match which::which(tool_bin) {
        Ok(path) => path.display().to_string(),
        Err(err) => {
            tracing::warn!(tool_bin, error = %err, "query tool not found on PATH");
            tool_bin.to_string()
        }
    }
}

/// `pass` iff p95 is strictly below the threshold; no samples never pass.
pub fn evaluate(criterion: &PassCriterion, aggregate: Option<&Summary>) -> PassVerdict {
    let p95_ms = aggregate.map(|stats| stats.p95);
    PassVerdict {
        threshold_ms: criterion.threshold_ms,
        p95_ms,
        pass: p95_ms.is_some_and(|p95| p95 < criterion.threshold_ms),
    }
}

/// Benchmark every configured scale point whose directory exists.
pub fn run_bench(
    paths: &HarnessPaths,
    bench: &BenchConfig,
    tool_bin: &str,
    timeout: Duration,
) -> BenchReport {
    let mut scale_points = BTreeMap::new();
    for &intent_count in &bench.scale_points {
        let dir = paths.bench_point_dir(intent_count);
        if !dir.is_dir() {
            tracing::warn!(
                intent_count,
                dir = %dir.display(),
                "scale point directory missing; skipping"
            );
            continue;
        }
        eprintln!("scale point {intent_count}: {}", dir.display());
        let point = bench_point(intent_count, &dir, bench, tool_bin, timeout);
        if let Some(stats) = &point.aggregate_stats {
            eprintln!(
                "  aggregate: mean={:.1}ms p50={:.1}ms p95={:.1}ms",
                stats.mean, stats.p50, stats.p95
            );
        }
        scale_points.insert(intent_count, point);
    }
    BenchReport {
        tool_bin: tool_bin.to_string(),
        num_runs: bench.num_runs,
        query_areas: bench.query_areas.clone(),
        pass_criteria: bench.pass_criteria.clone(),
        scale_points,
    }
}

fn bench_point(
    intent_count: u32,
    dir: &Path,
    bench: &BenchConfig,
    tool_bin: &str,
    timeout: Duration,
) -> ScalePointResult {
    let mut queries = BTreeMap::new();
    for area in &bench.query_areas {
        let lookups: [(String, Vec<String>); 2] = [
            (
                format!("query_intents_{area}"),
                vec![
                    "query".to_string(),
                    "intents".to_string(),
                    "--impact".to_string(),
                    area.clone(),
                    "--json".to_string(),
                ],
            ),
            (
                format!("context_{area}"),
                vec![
                    "context".to_string(),
                    "--impact".to_string(),
                    area.clone(),
                    "--json".to_string(),
                ],
            ),
        ];
        for (key, args) in lookups {
            let result = time_query(tool_bin, &args, dir, bench.num_runs, timeout);
            queries.insert(key, result);
        }
    }
    let all: Vec<f64> = queries
        .values()
        .flat_map(|query| query.timings_ms.iter().copied())
        .collect();
    let aggregate_stats = Summary::from_samples(&all).map(|s| s.rounded(2));
    let pass_criteria = bench
        .pass_criteria
        .iter()
        .find(|criterion| criterion.intent_count == intent_count)
        .map(|criterion| evaluate(criterion, aggregate_stats.as_ref()));
    ScalePointResult {
        intent_count,
        queries,
        aggregate_stats,
        pass_criteria,
    }
}

fn time_query(
    tool_bin: &str,
    args: &[String],
    dir: &Path,
    runs: u32,
    timeout: Duration,
) -> QueryResult {
    let command = format!("{tool_bin} {}", args.join(" "));
    let mut timings_ms = Vec::new();
    for run in 1..=runs {
        match run_bounded(tool_bin, args, Some(dir), &[], None, timeout) {
            Ok(output) if output.success() => {
                timings_ms.push(round_to(output.elapsed.as_secs_f64() * 1000.0, 2));
            }
            Ok(output) => {
                tracing::debug!(
                    run,
                    command = %command,
                    failure = %output.failure_summary(),
                    "query dropped"
                );
            }
            Err(err) => {
                tracing::debug!(
                    run,
                    command = %command,
                    error = %format!("{err:#}"),
                    "query dropped"
                );
            }
        }
    }
    let stats = Summary::from_samples(&timings_ms).map(|s| s.rounded(2));
    QueryResult {
        command,
        runs,
        successful_runs: timings_ms.len(),
        timings_ms,
        stats,
    }
}

/// Write `scale/bench_results.json`.
pub fn write_report(paths: &HarnessPaths, report: &BenchReport) -> Result<PathBuf> {
    let path = paths.bench_results_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(report).context("serialize bench report")?;
    fs::write(&path, format!("{text}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}


#[cfg(all(test, unix))]
mod tool_tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_tool(dir: &Path, script: &str) -> String {
        let path = dir.join("fake-telos");
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path.display().to_string()
    }

    fn config(points: Vec<u32>, threshold_ms: f64) -> BenchConfig {
        BenchConfig {
            scale_points: points,
            num_runs: 2,
            query_areas: vec!["auth".to_string()],
            pass_criteria: vec![PassCriterion {
                intent_count: 100,
                threshold_ms,
            }],
        }
    }

    #[test]
    fn failed_invocations_are_dropped_from_timings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = HarnessPaths::new(dir.path().join("root"));
        fs::create_dir_all(paths.bench_point_dir(100)).expect("mkdir");
        let tool = fake_tool(dir.path(), r#"[ "$1" = "context" ] && exit 3; exit 0"#);

        let report = run_bench(
            &paths,
            &config(vec![100, 500], 60_000.0),
            &tool,
            Duration::from_secs(10),
        );
        assert_eq!(report.scale_points.keys().copied().collect::<Vec<_>>(), [100]);
        let point = &report.scale_points[&100];
        let query = &point.queries["query_intents_auth"];
        assert_eq!(query.successful_runs, 2);
        assert_eq!(query.command, format!("{tool} query intents --impact auth --json"));
        let context = &point.queries["context_auth"];
        assert_eq!(context.successful_runs, 0);
        assert!(context.stats.is_none());
        assert_eq!(point.aggregate_stats.map(|s| s.count), Some(2));
        assert!(point.pass_criteria.as_ref().is_some_and(|v| v.pass));
        assert!(!report.any_failed());

        let written = write_report(&paths, &report).expect("write");
        let text = fs::read_to_string(written).expect("read");
        let reloaded: BenchReport = serde_json::from_str(&text).expect("parse");
        assert_eq!(reloaded, report);
    }

    #[test]
    fn point_without_samples_fails_its_criterion() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = HarnessPaths::new(dir.path().join("root"));
        fs::create_dir_all(paths.bench_point_dir(100)).expect("mkdir");
        let tool = fake_tool(dir.path(), "exit 1");

        let report = run_bench(
            &paths,
            &config(vec![100], 500.0),
            &tool,
            Duration::from_secs(10),
        );
        assert!(report.scale_points[&100].aggregate_stats.is_none());
        assert!(report.any_failed());
    }
}
