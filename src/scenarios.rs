//! Scenario registry.
//!
//! A scenario bundles everything the harness needs for one experiment: how to
//! build the context record for each condition, the lexical rule table, and
//! the judge criteria. Scenarios are immutable and registered at compile time.
use crate::fixture::{Condition, ContextRecord, FixtureStore};
use crate::judge::Criterion;
use crate::scoring::rules::RuleTable;
use crate::scoring::LexicalScorer;
use anyhow::{anyhow, Context, Result};
use evidence::EvidenceSource;
use std::path::PathBuf;

/// Embedded data file under `scenario_data/<id>/`.
macro_rules! scenario_file {
    ($id:literal, $file:literal) => {
        include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/scenario_data/",
            $id,
            "/",
            $file
        ))
    };
}

mod conflict;
mod debugging;
mod decay;
pub mod evidence;
mod false_positive;
mod memory;
mod refactor;
mod review;

/// One comparative experiment.
pub trait Scenario: Sync {
    /// Single lowercase letter, e.g. `c`.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn conditions(&self) -> &'static [Condition] {
        &Condition::ALL
    }

    /// Whether fixture generation reads a project checkout.
    fn uses_project(&self) -> bool {
        true
    }

    /// Natural-language criteria for the judge scorer.
    fn criteria(&self) -> &'static [Criterion];

    /// Declarative lexical criteria.
    fn lexical_rules(&self) -> RuleTable;

    /// Build the context record a condition sees.
    fn context_record(&self, condition: Condition, evidence: &dyn EvidenceSource)
        -> ContextRecord;
}

static SCENARIOS: [&dyn Scenario; 12] = [
    &memory::CROSS_SESSION_MEMORY,
    &debugging::DEBUGGING_WITH_INTENT,
    &review::CONSTRAINT_GUARDIAN,
    &refactor::IMPACT_GUIDED_REFACTOR,
    &review::STATUS_TRANSITION,
    &review::ERROR_INFORMATION_LEAK,
    &review::PERMISSION_ESCALATION,
    &decay::STALE_INTENT,
    &false_positive::BENIGN_REFACTOR,
    &false_positive::NEAR_MISS,
    &conflict::CONFLICT_DETECTION,
    &conflict::CONFLICT_RESOLUTION,
];

/// Every registered scenario in id order.
pub fn all() -> &'static [&'static dyn Scenario] {
    &SCENARIOS
}

pub fn find(id: &str) -> Option<&'static dyn Scenario> {
    SCENARIOS.iter().copied().find(|s| s.id() == id)
}

/// Resolve `all`, a single id, or a comma-separated list. Unknown ids fail.
pub fn select(selector: &str) -> Result<Vec<&'static dyn Scenario>> {
    let selector = selector.trim();
    if selector.eq_ignore_ascii_case("all") {
        return Ok(all().to_vec());
    }
    let mut selected: Vec<&'static dyn Scenario> = Vec::new();
    for id in selector.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        let id = id.to_ascii_lowercase();
        let scenario = find(&id).ok_or_else(|| {
            let known: Vec<&str> = SCENARIOS.iter().map(|s| s.id()).collect();
            anyhow!("unknown experiment {id:?} (known: {})", known.join(", "))
        })?;
        if !selected.iter().any(|s| s.id() == scenario.id()) {
            selected.push(scenario);
        }
    }
    if selected.is_empty() {
        return Err(anyhow!("no experiment selected"));
    }
    Ok(selected)
}

/// Compile a scenario's lexical table.
pub fn lexical_scorer(scenario: &dyn Scenario) -> Result<LexicalScorer> {
    LexicalScorer::new(scenario.lexical_rules())
        .with_context(|| format!("compile lexical rules for experiment {}", scenario.id()))
}

/// Write both condition fixtures for a scenario, replacing existing files.
pub fn generate_fixtures(
    scenario: &dyn Scenario,
    evidence: &dyn EvidenceSource,
    store: &FixtureStore,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for &condition in scenario.conditions() {
        let record = scenario.context_record(condition, evidence);
        let path = store
            .save(scenario.id(), condition, &record)
            .with_context(|| format!("save fixture for experiment {}", scenario.id()))?;
        tracing::info!(
            experiment = scenario.id(),
            condition = condition.as_str(),
            path = %path.display(),
            "fixture written"
        );
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
#[path = "scenarios_tests.rs"]
mod tests;
