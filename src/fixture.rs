//! Context records and the flat fixture store.
//!
//! A context record is the frozen evidence one condition of a scenario sees:
//! an instruction (`task` or `prompt`), a `mode` naming the condition, and any
//! number of evidence fields. Records keep insertion order so the rendered
//! prompt is stable across save/load cycles.
use crate::paths::HarnessPaths;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Field naming the condition a record was generated for.
pub const MODE_KEY: &str = "mode";
/// Instruction fields; exactly one is present per record.
pub const INSTRUCTION_KEYS: [&str; 2] = ["task", "prompt"];

/// Which evidence a model sees for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Version-control artifacts only.
    GitOnly,
    /// Version-control artifacts plus recorded intents.
    TelosGit,
}

impl Condition {
    pub const ALL: [Condition; 2] = [Condition::GitOnly, Condition::TelosGit];

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::GitOnly => "git_only",
            Condition::TelosGit => "telos_git",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered field map fed to the prompt builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextRecord {
    fields: Map<String, Value>,
}

impl ContextRecord {
    /// Start a record for `condition`; `mode` is always the first field.
    pub fn new(condition: Condition) -> Self {
        let mut fields = Map::new();
        fields.insert(
            MODE_KEY.to_string(),
            Value::String(condition.as_str().to_string()),
        );
        Self { fields }
    }

    /// Append (or replace) a field, keeping first-insertion order.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// The instruction text (`task` preferred over `prompt`).
    pub fn instruction(&self) -> Option<&str> {
        INSTRUCTION_KEYS.iter().find_map(|key| self.get_str(key))
    }

    /// Condition recorded in the `mode` field, if recognized.
    pub fn condition(&self) -> Option<Condition> {
        self.get_str(MODE_KEY).and_then(Condition::parse)
    }

    /// Check the record carries exactly one non-empty instruction.
    pub fn validate(&self) -> Result<()> {
        let present: Vec<&str> = INSTRUCTION_KEYS
            .iter()
            .copied()
            .filter(|key| self.fields.contains_key(*key))
            .collect();
        let key = match present.as_slice() {
            [key] => *key,
            [] => return Err(anyhow!("record has no task or prompt field")),
            _ => return Err(anyhow!("record has both task and prompt fields")),
        };
        match self.fields.get(key) {
            Some(Value::String(text)) if !text.trim().is_empty() => {}
            Some(Value::String(_)) => return Err(anyhow!("{key} must be non-empty")),
            _ => return Err(anyhow!("{key} must be a string")),
        }
        if let Some(mode) = self.fields.get(MODE_KEY) {
            let known = mode.as_str().and_then(Condition::parse).is_some();
            if !known {
                return Err(anyhow!("unknown mode {mode}"));
            }
        }
        Ok(())
    }
}

/// Failures loading a fixture; callers skip on `NotFound` and surface the rest.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("fixture not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("invalid fixture {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
    #[error("read fixture {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fixture files under `measurements/`, one per scenario/condition.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    paths: HarnessPaths,
}

impl FixtureStore {
    pub fn new(paths: HarnessPaths) -> Self {
        Self { paths }
    }

    pub fn path(&self, scenario: &str, condition: Condition) -> PathBuf {
        self.paths.fixture_path(scenario, condition)
    }

    pub fn exists(&self, scenario: &str, condition: Condition) -> bool {
        self.path(scenario, condition).is_file()
    }

    /// Persist a record, silently replacing any previous file.
    pub fn save(
        &self,
        scenario: &str,
        condition: Condition,
        record: &ContextRecord,
    ) -> Result<PathBuf> {
        record
            .validate()
            .with_context(|| format!("validate record for {scenario}/{condition}"))?;
        if record.condition() != Some(condition) {
            return Err(anyhow!(
                "record mode does not match condition {condition} for scenario {scenario}"
            ));
        }
        let path = self.path(scenario, condition);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(record).context("serialize context record")?;
        fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn load(
        &self,
        scenario: &str,
        condition: Condition,
    ) -> std::result::Result<ContextRecord, FixtureError> {
        let path = self.path(scenario, condition);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(FixtureError::NotFound { path });
            }
            Err(source) => return Err(FixtureError::Io { path, source }),
        };
        let record: ContextRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(err) => {
                return Err(FixtureError::Invalid {
                    path,
                    reason: err.to_string(),
                })
            }
        };
        if let Err(err) = record.validate() {
            return Err(FixtureError::Invalid {
                path,
                reason: format!("{err:#}"),
            });
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FixtureStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FixtureStore::new(HarnessPaths::new(dir.path().to_path_buf()));
        (dir, store)
    }

    fn review_record() -> ContextRecord {
        ContextRecord::new(Condition::GitOnly)
            .with("task", "Review this change.")
            .with("git_diff", "-a\n+b")
            .with("commit_message", "Tweak")
    }

    #[test]
    fn save_then_load_keeps_field_order() {
        let (_dir, store) = store();
        let record = review_record();
        store
            .save("c", Condition::GitOnly, &record)
            .expect("save record");
        let loaded = store.load("c", Condition::GitOnly).expect("load record");
        let keys: Vec<&str> = loaded.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, ["mode", "task", "git_diff", "commit_message"]);
        assert_eq!(loaded, record);
    }

    #[test]
    fn saving_twice_is_byte_identical() {
        let (_dir, store) = store();
        let path = store
            .save("c", Condition::GitOnly, &review_record())
            .expect("first save");
        let first = fs::read(&path).expect("read first");
        store
            .save("c", Condition::GitOnly, &review_record())
            .expect("second save");
        assert_eq!(first, fs::read(&path).expect("read second"));
        assert!(String::from_utf8(first).expect("utf8").contains("\n  \"task\""));
    }

    #[test]
    fn missing_fixture_is_not_found() {
        let (_dir, store) = store();
        let err = store.load("z", Condition::TelosGit).unwrap_err();
        assert!(matches!(err, FixtureError::NotFound { .. }), "{err}");
    }

    #[test]
    fn empty_instruction_is_rejected() {
        let record = ContextRecord::new(Condition::GitOnly).with("task", "  ");
        assert!(record.validate().is_err());

        let both = ContextRecord::new(Condition::GitOnly)
            .with("task", "a")
            .with("prompt", "b");
        assert!(both.validate().is_err());
    }

    #[test]
    fn invalid_document_on_disk_is_reported() {
        let (_dir, store) = store();
        let path = store.path("c", Condition::GitOnly);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, br#"{"mode":"git_only","git_diff":"x"}"#).expect("write");
        let err = store.load("c", Condition::GitOnly).unwrap_err();
        assert!(matches!(err, FixtureError::Invalid { .. }), "{err}");
    }

    #[test]
    fn save_rejects_mismatched_mode() {
        let (_dir, store) = store();
        assert!(store
            .save("c", Condition::TelosGit, &review_record())
            .is_err());
    }
}
