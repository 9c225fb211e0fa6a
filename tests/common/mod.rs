//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch harness root plus an isolated home so no user config leaks in.
pub struct Harness {
    pub dir: TempDir,
}

impl Harness {
    pub fn setup() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("home")).expect("create home");
        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    pub fn measurements(&self) -> PathBuf {
        self.root().join("measurements")
    }

    /// Base command with `--root` set and model/tool overrides cleared.
    pub fn command(&self) -> Command {
        let home = self.dir.path().join("home");
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_intent-eval"));
        cmd.arg("--root")
            .arg(self.root())
            .env("HOME", &home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .env("RUST_LOG", "intent_eval=warn")
            .env_remove("INTENT_EVAL_LM_COMMAND")
            .env_remove("TELOS_BIN")
            .env_remove("ANTHROPIC_API_KEY");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command().args(args).output().expect("spawn intent-eval")
    }

    /// Run with the command backend answering every prompt with `reply`.
    pub fn run_with_model(&self, reply: &str, args: &[&str]) -> Output {
        let script = self.dir.path().join("model.sh");
        write_file(&script, &format!("#!/bin/sh\ncat >/dev/null\nprintf '%s' '{reply}'\n"));
        self.command()
            .env("INTENT_EVAL_LM_COMMAND", format!("sh {}", script.display()))
            .args(args)
            .output()
            .expect("spawn intent-eval")
    }
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, contents.as_bytes()).expect("write file");
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let text = fs::read_to_string(path).expect("read json");
    serde_json::from_str(&text).expect("parse json")
}

/// Files under `dir` whose name starts with `prefix`, sorted.
pub fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix))
        })
        .collect();
    found.sort();
    found
}
