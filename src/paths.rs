//! Typed paths into the harness layout.
//!
//! Every artifact the harness reads or writes lives under one root so runs are
//! easy to archive and diff.
use crate::fixture::Condition;
use std::path::{Path, PathBuf};

/// Default harness root relative to the working directory.
pub const DEFAULT_ROOT: &str = "validation";

/// Convenience wrapper for locating harness artifacts.
#[derive(Debug, Clone)]
pub struct HarnessPaths {
    root: PathBuf,
}

impl HarnessPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `harness.json` config path.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("harness.json")
    }

    /// Return the `measurements/` directory holding fixtures and scores.
    pub fn measurements_dir(&self) -> PathBuf {
        self.root.join("measurements")
    }

    /// Return the fixture path for one scenario/condition pair.
    pub fn fixture_path(&self, scenario: &str, condition: Condition) -> PathBuf {
        self.measurements_dir()
            .join(fixture_file_name(scenario, condition))
    }

    /// Return the `measurements/llm_responses/` directory.
    pub fn responses_dir(&self) -> PathBuf {
        self.measurements_dir().join("llm_responses")
    }

    /// Return the per-experiment results path for a run timestamp.
    pub fn experiment_results_path(&self, scenario: &str, model: &str, stamp: &str) -> PathBuf {
        self.responses_dir().join(format!(
            "exp_{scenario}_{}_{stamp}.json",
            model_file_component(model)
        ))
    }

    /// Return the combined results path for a run timestamp.
    pub fn combined_results_path(&self, model: &str, stamp: &str) -> PathBuf {
        self.responses_dir()
            .join(format!("combined_{}_{stamp}.json", model_file_component(model)))
    }

    /// Return the default scoring output path.
    pub fn scores_path(&self) -> PathBuf {
        self.measurements_dir().join("scoring_v2_results.json")
    }

    /// Return the `scale/` directory holding benchmark populations.
    pub fn scale_dir(&self) -> PathBuf {
        self.root.join("scale")
    }

    /// Return the working directory for one benchmark population.
    pub fn bench_point_dir(&self, intent_count: u32) -> PathBuf {
        self.scale_dir().join(format!("bench_{intent_count}"))
    }

    /// Return the `scale/bench_results.json` path.
    pub fn bench_results_path(&self) -> PathBuf {
        self.scale_dir().join("bench_results.json")
    }
}

/// Fixture file name, e.g. `exp_c_telos_git.json`.
pub fn fixture_file_name(scenario: &str, condition: Condition) -> String {
    format!("exp_{scenario}_{}.json", condition.as_str())
}

fn model_file_component(model: &str) -> String {
    model.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_paths_flatten_model_namespaces() {
        let paths = HarnessPaths::new(PathBuf::from("/tmp/h"));
        let path = paths.experiment_results_path("c", "org/model-x", "20260101_120000");
        assert_eq!(
            path,
            PathBuf::from(
                "/tmp/h/measurements/llm_responses/exp_c_org_model-x_20260101_120000.json"
            )
        );
        assert_eq!(
            paths.fixture_path("a", Condition::TelosGit),
            PathBuf::from("/tmp/h/measurements/exp_a_telos_git.json")
        );
    }
}
