//! Anthropic Messages API backend.
use super::{Completion, ModelBackend, ModelRequest};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

impl AnthropicBackend {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }
}

impl ModelBackend for AnthropicBackend {
    fn complete(&self, request: &ModelRequest<'_>) -> Result<Completion> {
        let body = MessagesRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: [Message {
                role: "user",
                content: request.prompt,
            }],
        };
        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .send_json(&body)
            .with_context(|| format!("POST {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .body_mut()
                .read_to_string()
                .unwrap_or_default();
            return Err(anyhow!(
                "messages API returned {}: {}",
                status.as_u16(),
                describe_error(&text)
            ));
        }

        let parsed: MessagesResponse = response
            .body_mut()
            .read_json()
            .context("decode messages response")?;
        Ok(into_completion(parsed, request.model))
    }
}

fn into_completion(parsed: MessagesResponse, requested_model: &str) -> Completion {
    let text = parsed
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<String>();
    Completion {
        text,
        model: parsed
            .model
            .unwrap_or_else(|| requested_model.to_string()),
        input_tokens: parsed.usage.as_ref().and_then(|u| u.input_tokens),
        output_tokens: parsed.usage.as_ref().and_then(|u| u.output_tokens),
        stop_reason: parsed.stop_reason,
    }
}

fn describe_error(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("{}: {}", envelope.error.kind, envelope.error.message),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_text_blocks_only() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{
                "model": "claude-sonnet-4-6",
                "content": [
                    {"type": "text", "text": "Reject. "},
                    {"type": "tool_use", "id": "x", "name": "n", "input": {}},
                    {"type": "text", "text": "Expiry exceeds 1 hour."}
                ],
                "usage": {"input_tokens": 120, "output_tokens": 9},
                "stop_reason": "end_turn"
            }"#,
        )
        .expect("parse response");
        let completion = into_completion(parsed, "fallback");
        assert_eq!(completion.text, "Reject. Expiry exceeds 1 hour.");
        assert_eq!(completion.model, "claude-sonnet-4-6");
        assert_eq!(completion.input_tokens, Some(120));
        assert_eq!(completion.stop_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn error_bodies_are_summarized() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(describe_error(body), "overloaded_error: Overloaded");
        assert_eq!(describe_error(" bad gateway \n"), "bad gateway");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let backend = AnthropicBackend::new("http://localhost:9/", "k", Duration::from_secs(1));
        assert_eq!(backend.endpoint, "http://localhost:9/v1/messages");
    }
}
