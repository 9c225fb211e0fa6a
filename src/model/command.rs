//! Local command backend: the prompt goes to stdin, the response is stdout.
//!
//! Any tool that reads text and writes text works (`llm`, `ollama run`, a
//! wrapper script). Token usage is unknown for this backend.
use super::{Completion, ModelBackend, ModelRequest};
use crate::process::{run_bounded, split_command};
use anyhow::{anyhow, Context, Result};
use std::time::Duration;

/// Exported to the child so wrappers can route by model.
pub const MODEL_ENV: &str = "INTENT_EVAL_MODEL";

pub struct CommandBackend {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandBackend {
    pub fn new(command: &str, timeout: Duration) -> Result<Self> {
        let argv = split_command(command).context("parse LM command")?;
        Ok(Self { argv, timeout })
    }
}

impl ModelBackend for CommandBackend {
    fn complete(&self, request: &ModelRequest<'_>) -> Result<Completion> {
        let output = run_bounded(
            &self.argv[0],
            &self.argv[1..],
            None,
            &[(MODEL_ENV, request.model)],
            Some(request.prompt.as_bytes()),
            self.timeout,
        )
        .with_context(|| format!("spawn LM command: {}", self.argv[0]))?;

        if !output.success() {
            return Err(anyhow!(
                "LM command {} {}",
                self.argv[0],
                output.failure_summary()
            ));
        }
        let text = String::from_utf8(output.stdout).context("decode LM stdout as UTF-8")?;
        Ok(Completion {
            text,
            model: request.model.to_string(),
            input_tokens: None,
            output_tokens: None,
            stop_reason: Some("end_turn".to_string()),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn request(prompt: &str) -> ModelRequest<'_> {
        ModelRequest {
            model: "local-model",
            prompt,
            max_tokens: 16,
            temperature: 0.0,
        }
    }

    #[test]
    fn echoes_stdin_through_command() {
        let backend = CommandBackend::new(
            r#"sh -c 'printf "%s:" "$INTENT_EVAL_MODEL"; cat'"#,
            Duration::from_secs(10),
        )
        .expect("backend");
        let completion = backend.complete(&request("prompt text")).expect("complete");
        assert_eq!(completion.text, "local-model:prompt text");
        assert_eq!(completion.input_tokens, None);
    }

    #[test]
    fn failing_command_is_an_error() {
        let backend = CommandBackend::new("sh -c 'echo nope >&2; exit 1'", Duration::from_secs(10))
            .expect("backend");
        let err = backend.complete(&request("x")).unwrap_err();
        assert!(format!("{err:#}").contains("nope"), "{err:#}");
    }
}
