//! Model invocation with per-run failure isolation.
//!
//! A [`ModelBackend`] turns one prompt into one completion. [`invoke`] wraps a
//! single call with wall-clock timing and converts any failure into a
//! [`RunResult::Failed`] so a bad run never aborts the batch. There is no
//! retry: each run number is attempted exactly once.
use crate::config::{BackendConfig, HarnessConfig};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;

mod anthropic;
mod command;

pub use anthropic::AnthropicBackend;
pub use command::CommandBackend;

/// One completion request.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Text and usage returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Model id reported by the backend (falls back to the requested id).
    pub model: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub stop_reason: Option<String>,
}

/// Anything that can answer a prompt.
pub trait ModelBackend {
    fn complete(&self, request: &ModelRequest<'_>) -> Result<Completion>;
}

/// Outcome of one numbered invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunResult {
    Completed(CompletedRun),
    Failed(FailedRun),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRun {
    pub run: u32,
    pub response: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    pub latency_ms: f64,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRun {
    pub run: u32,
    pub error: String,
}

impl RunResult {
    pub fn run(&self) -> u32 {
        match self {
            RunResult::Completed(done) => done.run,
            RunResult::Failed(failed) => failed.run,
        }
    }

    pub fn completed(&self) -> Option<&CompletedRun> {
        match self {
            RunResult::Completed(done) => Some(done),
            RunResult::Failed(_) => None,
        }
    }
}

/// Invoke the backend once. Never returns an error; failures become data.
pub fn invoke(backend: &dyn ModelBackend, request: &ModelRequest<'_>, run: u32) -> RunResult {
    let start = Instant::now();
    let outcome = backend.complete(request);
    let elapsed = start.elapsed();
    let latency_ms = (elapsed.as_secs_f64() * 10_000.0).round() / 10.0;

    match outcome {
        Ok(completion) => {
            tracing::info!(
                run,
                elapsed_ms = elapsed.as_millis() as u64,
                prompt_bytes = request.prompt.len(),
                response_bytes = completion.text.len(),
                "lm invoke complete"
            );
            RunResult::Completed(CompletedRun {
                run,
                response: completion.text,
                model: completion.model,
                input_tokens: completion.input_tokens,
                output_tokens: completion.output_tokens,
                latency_ms,
                stop_reason: completion.stop_reason,
            })
        }
        Err(err) => {
            tracing::warn!(run, error = %format!("{err:#}"), "lm invoke failed");
            RunResult::Failed(FailedRun {
                run,
                error: format!("{err:#}"),
            })
        }
    }
}

/// Build the backend named by the config.
pub fn backend_from_config(config: &HarnessConfig) -> Result<Box<dyn ModelBackend>> {
    match &config.backend {
        BackendConfig::Anthropic {
            base_url,
            api_key_env,
        } => {
            let api_key = std::env::var(api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    anyhow!(
                        "{api_key_env} is not set (or set {} to use a local command)",
                        crate::config::LM_COMMAND_ENV
                    )
                })?;
            Ok(Box::new(AnthropicBackend::new(
                base_url,
                &api_key,
                config.request_timeout(),
            )))
        }
        BackendConfig::Command { command } => Ok(Box::new(CommandBackend::new(
            command,
            config.lm_timeout(),
        )?)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Backend returning queued replies and recording prompts it saw.
    #[derive(Default)]
    pub struct ScriptedBackend {
        replies: RefCell<VecDeque<Result<String, String>>>,
        pub prompts: RefCell<Vec<String>>,
    }

    impl ScriptedBackend {
        pub fn new(replies: impl IntoIterator<Item = Result<&'static str, &'static str>>) -> Self {
            Self {
                replies: RefCell::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(String::from).map_err(String::from))
                        .collect(),
                ),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl ModelBackend for ScriptedBackend {
        fn complete(&self, request: &ModelRequest<'_>) -> Result<Completion> {
            self.prompts.borrow_mut().push(request.prompt.to_string());
            match self.replies.borrow_mut().pop_front() {
                Some(Ok(text)) => Ok(Completion {
                    text,
                    model: request.model.to_string(),
                    input_tokens: Some(request.prompt.len() as u64),
                    output_tokens: Some(7),
                    stop_reason: Some("end_turn".to_string()),
                }),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("no scripted reply left")),
            }
        }
    }
}
