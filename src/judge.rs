//! LLM-as-judge scoring.
//!
//! Each criterion is decided by a separate, zero-temperature model call that
//! must answer with `{"criterion", "met", "reasoning"}`. A verdict that cannot
//! be obtained or parsed is recorded as unknown (`met: null`) and never counts
//! as met.
use crate::model::{ModelBackend, ModelRequest};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const JUDGE_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/judge.md"
));

/// A natural-language criterion with its reference answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Criterion {
    pub id: &'static str,
    pub definition: &'static str,
    pub ground_truth: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub criterion: String,
    /// `None` when the judge call or its parse failed.
    pub met: Option<bool>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeReport {
    pub model: String,
    pub criteria: Vec<JudgeVerdict>,
    pub score: usize,
    pub max_score: usize,
    pub percentage: u32,
}

/// Judge model settings.
#[derive(Debug, Clone, Copy)]
pub struct JudgeSettings<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
}

pub fn build_judge_prompt(criterion: &Criterion, response: &str) -> String {
    JUDGE_TEMPLATE
        .trim_end()
        .replace("{definition}", criterion.definition)
        .replace("{ground_truth}", criterion.ground_truth)
        .replace("{criterion_id}", criterion.id)
        .replace("{response}", response)
}

/// Judge one criterion. Transport and parse failures become unknown verdicts.
pub fn judge_criterion(
    backend: &dyn ModelBackend,
    settings: JudgeSettings<'_>,
    criterion: &Criterion,
    response: &str,
) -> JudgeVerdict {
    let prompt = build_judge_prompt(criterion, response);
    let request = ModelRequest {
        model: settings.model,
        prompt: &prompt,
        max_tokens: settings.max_tokens,
        temperature: 0.0,
    };
    let outcome = backend
        .complete(&request)
        .and_then(|completion| parse_verdict(&completion.text));
    match outcome {
        // The judge's own criterion is kept for audit; blank falls back.
        Ok(verdict) if verdict.criterion.trim().is_empty() => JudgeVerdict {
            criterion: criterion.id.to_string(),
            ..verdict
        },
        Ok(verdict) => verdict,
        Err(err) => {
            tracing::warn!(
                criterion = criterion.id,
                error = %format!("{err:#}"),
                "judge verdict unavailable"
            );
            JudgeVerdict {
                criterion: criterion.id.to_string(),
                met: None,
                reasoning: format!("Judge error: {err:#}"),
            }
        }
    }
}

/// Judge every criterion of a scenario sequentially.
pub fn judge_response(
    backend: &dyn ModelBackend,
    settings: JudgeSettings<'_>,
    criteria: &[Criterion],
    response: &str,
) -> JudgeReport {
    let verdicts: Vec<JudgeVerdict> = criteria
        .iter()
        .map(|criterion| judge_criterion(backend, settings, criterion, response))
        .collect();
    summarize(settings.model, verdicts)
}

/// Count `met == true` verdicts; unknown verdicts count as neither.
pub fn summarize(model: &str, verdicts: Vec<JudgeVerdict>) -> JudgeReport {
    let score = verdicts.iter().filter(|v| v.met == Some(true)).count();
    let max_score = verdicts.len();
    let percentage = if max_score == 0 {
        0
    } else {
        (score as f64 / max_score as f64 * 100.0).round() as u32
    };
    JudgeReport {
        model: model.to_string(),
        criteria: verdicts,
        score,
        max_score,
        percentage,
    }
}

/// Parse a judge reply, tolerating one surrounding code fence.
pub fn parse_verdict(raw: &str) -> Result<JudgeVerdict> {
    let text = strip_fence(raw);
    let value: serde_json::Value =
        serde_json::from_str(text).with_context(|| format!("parse judge JSON: {text}"))?;
    let met = match value.get("met") {
        Some(serde_json::Value::Bool(met)) => Some(*met),
        Some(serde_json::Value::Null) => None,
        Some(other) => return Err(anyhow!("judge `met` must be boolean, got {other}")),
        None => return Err(anyhow!("judge reply is missing `met`")),
    };
    Ok(JudgeVerdict {
        criterion: value
            .get("criterion")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        met,
        reasoning: value
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

/// Drop the opening fence line and everything from the closing fence on.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let body = trimmed.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}
