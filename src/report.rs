//! Scoring of recorded responses with both scorers, and the printed summaries.
use crate::fixture::Condition;
use crate::judge::{self, JudgeReport, JudgeSettings};
use crate::model::ModelBackend;
use crate::runner::ResultsDocument;
use crate::scenarios::{self, Scenario};
use crate::scoring::LexicalScore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Both scorers' verdicts for one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub experiment: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_judge: Option<JudgeReport>,
    pub keyword_baseline: LexicalScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperimentScores {
    pub modes: BTreeMap<Condition, Vec<ScoreResult>>,
}

/// Judge backend plus settings; absent when judging is disabled.
#[derive(Clone, Copy)]
pub struct Judge<'a> {
    pub backend: &'a dyn ModelBackend,
    pub settings: JudgeSettings<'a>,
}

/// Score one response against a scenario.
pub fn score_response(
    scenario: &dyn Scenario,
    response: &str,
    judge: Option<Judge<'_>>,
) -> Result<ScoreResult> {
    let lexical = scenarios::lexical_scorer(scenario)?;
    let llm_judge = judge.map(|judge| {
        judge::judge_response(
            judge.backend,
            judge.settings,
            scenario.criteria(),
            response,
        )
    });
    Ok(ScoreResult {
        experiment: scenario.id().to_string(),
        name: scenario.name().to_string(),
        llm_judge,
        keyword_baseline: lexical.score(response),
        run: None,
    })
}

/// Score every completed run of a results document. Failed runs and
/// experiments without a registered scenario are skipped.
pub fn score_results(
    document: &ResultsDocument,
    judge: Option<Judge<'_>>,
) -> Result<BTreeMap<String, ExperimentScores>> {
    let mut all = BTreeMap::new();
    for experiment in document.experiments() {
        let Some(scenario) = scenarios::find(&experiment.experiment) else {
            tracing::warn!(
                experiment = %experiment.experiment,
                "no scenario registered; skipping"
            );
            continue;
        };
        let mut scores = ExperimentScores::default();
        for (condition, mode) in &experiment.modes {
            let mut mode_scores = Vec::new();
            for completed in mode.runs.iter().filter_map(|run| run.completed()) {
                let mut score = score_response(scenario, &completed.response, judge)
                    .with_context(|| {
                        format!("score experiment {} run {}", scenario.id(), completed.run)
                    })?;
                score.run = Some(completed.run);
                mode_scores.push(score);
            }
            scores.modes.insert(*condition, mode_scores);
        }
        all.insert(experiment.experiment.clone(), scores);
    }
    Ok(all)
}

/// Write a score document as pretty JSON.
pub fn write_scores<T: Serialize>(path: &Path, scores: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(scores).context("serialize scores")?;
    fs::write(path, format!("{text}\n")).with_context(|| format!("write {}", path.display()))
}

/// Lines summarizing one scored response.
pub fn response_summary(score: &ScoreResult) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(report) = &score.llm_judge {
        lines.push(format!(
            "LLM judge score: {}/{} ({}%)",
            report.score, report.max_score, report.percentage
        ));
        for verdict in &report.criteria {
            let status = match verdict.met {
                Some(true) => "PASS",
                Some(false) => "FAIL",
                None => "UNKNOWN",
            };
            lines.push(format!(
                "  [{status}] {}: {}",
                verdict.criterion, verdict.reasoning
            ));
        }
    }
    let met = score.keyword_baseline.criteria.values().filter(|met| **met).count();
    lines.push(format!(
        "Keyword baseline: {met}/{} criteria",
        score.keyword_baseline.criteria.len()
    ));
    lines
}

/// Lines summarizing a scored results document, one per condition.
pub fn results_summary(scores: &BTreeMap<String, ExperimentScores>) -> Vec<String> {
    let mut lines = Vec::new();
    for (id, experiment) in scores {
        lines.push(format!("Experiment {}:", id.to_uppercase()));
        for (condition, runs) in &experiment.modes {
            if runs.is_empty() {
                continue;
            }
            let judged: Vec<u32> = runs
                .iter()
                .filter_map(|score| score.llm_judge.as_ref().map(|r| r.percentage))
                .collect();
            if judged.is_empty() {
                let met: usize = runs
                    .iter()
                    .map(|s| s.keyword_baseline.criteria.values().filter(|m| **m).count())
                    .sum();
                lines.push(format!(
                    "  {condition}: {met} keyword criteria met ({} runs)",
                    runs.len()
                ));
            } else {
                let total: f64 = judged.iter().map(|p| f64::from(*p)).sum();
                let avg = total / judged.len() as f64;
                lines.push(format!(
                    "  {condition}: avg {avg:.0}% ({} runs)",
                    runs.len()
                ));
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedBackend;
    use crate::model::{CompletedRun, FailedRun, RunResult};
    use crate::runner::{ExperimentResults, ModeResults};

    fn completed(run: u32, response: &str) -> RunResult {
        RunResult::Completed(CompletedRun {
            run,
            response: response.to_string(),
            model: "m".to_string(),
            input_tokens: None,
            output_tokens: None,
            latency_ms: 1.0,
            stop_reason: None,
        })
    }

    fn results(id: &str, runs: Vec<RunResult>) -> ExperimentResults {
        let mut modes = BTreeMap::new();
        modes.insert(
            Condition::TelosGit,
            ModeResults {
                context_file: format!("exp_{id}_telos_git.json"),
                prompt_length: 10,
                runs,
                stats: None,
            },
        );
        ExperimentResults {
            experiment: id.to_string(),
            name: "x".to_string(),
            model: "m".to_string(),
            num_runs: 2,
            timestamp: "2026-01-01T00:00:00+00:00".to_string(),
            modes,
        }
    }

    #[test]
    fn failed_runs_and_unknown_experiments_are_skipped() {
        let document = ResultsDocument::Combined(vec![
            results(
                "c",
                vec![
                    RunResult::Failed(FailedRun {
                        run: 1,
                        error: "boom".to_string(),
                    }),
                    completed(2, "Reject: exceeds the 1 hour constraint."),
                ],
            ),
            results("z", vec![completed(1, "anything")]),
        ]);
        let scores = score_results(&document, None).expect("score");
        assert_eq!(scores.keys().collect::<Vec<_>>(), ["c"]);
        let runs = &scores["c"].modes[&Condition::TelosGit];
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run, Some(2));
        assert!(runs[0].llm_judge.is_none());
        assert_eq!(runs[0].keyword_baseline.get("recommended_rejection"), Some(true));
    }

    #[test]
    fn judge_runs_once_per_criterion() {
        let scenario = scenarios::find("o").expect("registered");
        let backend = ScriptedBackend::new([
            Ok(r#"{"criterion": "correctly_approved", "met": true, "reasoning": "Approved."}"#),
            Ok("not json"),
        ]);
        let judge = Judge {
            backend: &backend,
            settings: JudgeSettings {
                model: "judge",
                max_tokens: 256,
            },
        };
        let score = score_response(scenario, "3500 is within bounds. Approve.", Some(judge))
            .expect("score");
        let report = score.llm_judge.as_ref().expect("judged");
        assert_eq!((report.score, report.max_score, report.percentage), (1, 2, 50));
        assert_eq!(report.criteria[1].met, None);

        let lines = response_summary(&score);
        assert_eq!(lines[0], "LLM judge score: 1/2 (50%)");
        assert!(lines[2].starts_with("  [UNKNOWN] noted_within_bounds"));
    }

    #[test]
    fn single_score_omits_run_and_judge_when_disabled() {
        let scenario = scenarios::find("n").expect("registered");
        let score = score_response(scenario, "LGTM", None).expect("score");
        let json = serde_json::to_value(&score).expect("json");
        assert!(json.get("run").is_none());
        assert!(json.get("llm_judge").is_none());
        assert_eq!(json["keyword_baseline"]["criteria"]["false_positive"], false);
    }
}
