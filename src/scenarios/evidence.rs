//! Evidence collection for fixture generation.
//!
//! Git-driven scenarios read their context from a project checkout: git
//! history and the external intent query tool. A failing lookup keeps
//! whatever stdout it produced (often nothing) so a partially broken checkout
//! still yields a fixture; the failure is logged.
use crate::process::run_bounded;
use std::path::PathBuf;
use std::time::Duration;

/// Source of command output for fixture generation.
pub trait EvidenceSource {
    /// Trimmed stdout of `program args...`; empty when it cannot run.
    fn capture(&self, program: &str, args: &[&str]) -> String;

    /// Query tool binary used for intent lookups.
    fn tool_bin(&self) -> &str;
}

/// `git <args>`.
pub fn git(source: &dyn EvidenceSource, args: &[&str]) -> String {
    source.capture("git", args)
}

/// `<tool> query intents --impact <area> --json`.
pub fn intents(source: &dyn EvidenceSource, area: &str) -> String {
    source.capture(
        source.tool_bin(),
        &["query", "intents", "--impact", area, "--json"],
    )
}

/// `<tool> context --impact <area> --json`.
pub fn context(source: &dyn EvidenceSource, area: &str) -> String {
    source.capture(source.tool_bin(), &["context", "--impact", area, "--json"])
}

/// Runs commands inside a project checkout with a bounded timeout.
#[derive(Debug, Clone)]
pub struct ProjectEvidence {
    project_dir: PathBuf,
    tool_bin: String,
    timeout: Duration,
}

impl ProjectEvidence {
    pub fn new(project_dir: PathBuf, tool_bin: String, timeout: Duration) -> Self {
        Self {
            project_dir,
            tool_bin,
            timeout,
        }
    }
}

impl EvidenceSource for ProjectEvidence {
    fn capture(&self, program: &str, args: &[&str]) -> String {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        match run_bounded(
            program,
            &args,
            Some(&self.project_dir),
            &[],
            None,
            self.timeout,
        ) {
            Ok(output) if output.success() => output.stdout_text().trim().to_string(),
            Ok(output) => {
                tracing::warn!(
                    program,
                    args = %args.join(" "),
                    failure = %output.failure_summary(),
                    "evidence command failed"
                );
                output.stdout_text().trim().to_string()
            }
            Err(err) => {
                tracing::warn!(
                    program,
                    error = %format!("{err:#}"),
                    "evidence command failed to start"
                );
                String::new()
            }
        }
    }

    fn tool_bin(&self) -> &str {
        &self.tool_bin
    }
}

/// Evidence source for scenarios built entirely from embedded data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvidence;

impl EvidenceSource for NoEvidence {
    fn capture(&self, program: &str, _args: &[&str]) -> String {
        tracing::debug!(program, "no evidence source configured");
        String::new()
    }

    fn tool_bin(&self) -> &str {
        "telos"
    }
}
