//! Render a context record into the single text prompt a model receives.
//!
//! Layout: the instruction, a `---` rule, then one `## Label` section per
//! non-blank string evidence field in record order.
use crate::fixture::{ContextRecord, INSTRUCTION_KEYS, MODE_KEY};
use serde_json::Value;

/// Build the prompt for a record. Pure and deterministic.
pub fn build(record: &ContextRecord) -> String {
    let instruction = record.instruction().unwrap_or_default();
    let sections = record
        .fields()
        .iter()
        .filter(|(key, _)| !is_reserved(key))
        .filter_map(|(key, value)| match value {
            Value::String(text) if !text.trim().is_empty() => {
                Some(format!("## {}\n\n{}", section_label(key), text))
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{instruction}\n\n---\n\n{sections}")
}

fn is_reserved(key: &str) -> bool {
    key == MODE_KEY || INSTRUCTION_KEYS.contains(&key)
}

/// `telos_auth_intents` -> `Telos Auth Intents`.
///
/// Each alphabetic run starts uppercase and continues lowercase, so digits and
/// punctuation also start a new word.
pub fn section_label(key: &str) -> String {
    let mut label = String::with_capacity(key.len());
    let mut prev_alpha = false;
    for ch in key.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if prev_alpha {
                label.extend(ch.to_lowercase());
            } else {
                label.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            label.push(ch);
            prev_alpha = false;
        }
    }
    label
}
