//! Experiments p and q: security and UX stakeholders recorded contradictory
//! intents for error messages. Both read the same commit; p asks whether the
//! conflict is spotted, q whether a reconciling design is proposed.
use super::evidence::EvidenceSource;
use super::Scenario;
use crate::fixture::{Condition, ContextRecord};
use crate::judge::Criterion;
use crate::scoring::rules::{Pattern, Phrase, Rule, RuleTable};

const GIT_DIFF: &str = scenario_file!("p", "git_diff.txt");
const COMMIT_MESSAGE: &str = scenario_file!("p", "commit_message.txt");
const ERROR_INTENTS: &str = scenario_file!("p", "telos_error_intents.json");

const BASELINE_TASK: &str = "Review this error handling implementation. Identify any issues, \
security concerns, or design problems. Recommend improvements.";

const AUGMENTED_TASK: &str = "Review this error handling implementation. Check it against ALL \
recorded constraints and intents from all stakeholders. Identify any constraint violations or \
conflicts between intents. Recommend how to proceed.";

pub struct ConflictScenario {
    id: &'static str,
    name: &'static str,
    criteria: &'static [Criterion],
    rules: fn() -> RuleTable,
}

pub const CONFLICT_DETECTION: ConflictScenario = ConflictScenario {
    id: "p",
    name: "Conflict Detection",
    criteria: &[
        Criterion {
            id: "detected_conflict",
            definition: "The response identifies that the recorded intents contradict \
                         each other.",
            ground_truth: "The security team requires generic, non-descriptive error \
                           messages while the UX team requires descriptive, actionable ones. \
                           Both cannot be satisfied as written.",
        },
        Criterion {
            id: "identified_both_stakeholders",
            definition: "The response names both sides: the security requirement and the \
                         user experience requirement.",
            ground_truth: "Security wants no internal details or field names in responses; \
                           UX wants field-level messages that let users fix their input.",
        },
        Criterion {
            id: "acknowledged_tradeoff",
            definition: "The response treats the situation as a tradeoff to balance rather \
                         than picking one side silently.",
            ground_truth: "Neither intent can be fully met; the right move is to surface \
                           the tradeoff and reconcile the two.",
        },
    ],
    rules: detection_rules,
};

pub const CONFLICT_RESOLUTION: ConflictScenario = ConflictScenario {
    id: "q",
    name: "Conflict Resolution",
    criteria: &[
        Criterion {
            id: "proposed_synthesis",
            definition: "The response proposes a design that satisfies both intents, such as \
                         generic client messages with detailed server-side logs, or detail \
                         only outside production.",
            ground_truth: "A workable synthesis: return generic messages to clients, log \
                           full detail server-side, or vary verbosity by environment or by \
                           error category.",
        },
        Criterion {
            id: "actionable_recommendation",
            definition: "The response gives a concrete recommendation for implementing \
                         the synthesis.",
            ground_truth: "For example: map errors to generic client responses while writing \
                           structured logs with the detailed context.",
        },
    ],
    rules: resolution_rules,
};

fn detection_rules() -> RuleTable {
    RuleTable::new()
        .criterion(
            "detected_conflict",
            Rule::Any(&[
                Phrase("conflict"),
                Phrase("contradict"),
                Phrase("incompatible"),
                Phrase("opposing"),
                Phrase("tension"),
                Phrase("tradeoff"),
                Phrase("trade-off"),
                Phrase("mutually exclusive"),
                Phrase("at odds"),
                Phrase("clashing"),
                Phrase("competing"),
                Phrase("diverge"),
            ]),
        )
        .criterion(
            "identified_both_stakeholders",
            Rule::All(vec![
                Rule::Any(&[
                    Phrase("security"),
                    Phrase("information disclosure"),
                    Phrase("generic"),
                ]),
                Rule::Any(&[
                    Phrase("ux"),
                    Phrase("user experience"),
                    Phrase("descriptive"),
                    Phrase("actionable"),
                    Phrase("self-service"),
                ]),
            ]),
        )
        .criterion(
            "cited_specific_contradictions",
            Rule::Either(vec![
                Rule::Any(&[
                    Pattern("generic.*descriptive"),
                    Pattern("descriptive.*generic"),
                    Pattern("field.*name.*no.*field"),
                    Pattern("no.*detail.*detail"),
                    Pattern("password.*identical"),
                ]),
                Rule::All(vec![
                    Rule::Any(&[Phrase("generic")]),
                    Rule::Any(&[Phrase("descriptive")]),
                ]),
            ]),
        )
        .criterion(
            "acknowledged_tradeoff",
            Rule::Any(&[
                Phrase("tradeoff"),
                Phrase("trade-off"),
                Phrase("balance"),
                Phrase("both"),
                Phrase("satisfy"),
                Phrase("reconcile"),
                Pattern("neither.*fully"),
                Phrase("compromise"),
            ]),
        )
}

fn resolution_rules() -> RuleTable {
    RuleTable::new()
        .criterion(
            "environment_based",
            Rule::Any(&[
                Pattern("production.*development"),
                Pattern("prod.*dev"),
                Phrase("environment"),
                Phrase("staging"),
                Pattern("generic.*prod"),
                Pattern("detailed.*dev"),
                Phrase("debug mode"),
                Phrase("feature flag"),
            ]),
        )
        .criterion(
            "channel_based",
            Rule::Any(&[
                Pattern("server.*log"),
                Pattern("client.*generic"),
                Phrase("structured log"),
                Pattern("log.*detail"),
                Pattern("response.*generic.*log.*detail"),
                Phrase("server-side"),
                Phrase("client-side"),
            ]),
        )
        .criterion(
            "category_based",
            Rule::Any(&[
                Pattern("security.*generic.*validation.*detail"),
                Pattern("auth.*generic.*other.*detail"),
                Pattern("sensitive.*generic"),
                Pattern("non-sensitive.*detail"),
                Phrase("category"),
                Phrase("per-error"),
            ]),
        )
        .criterion(
            "proposed_synthesis",
            Rule::Either(vec![
                Rule::Ref("environment_based"),
                Rule::Ref("channel_based"),
                Rule::Ref("category_based"),
            ]),
        )
        .criterion(
            "actionable_recommendation",
            Rule::All(vec![
                Rule::Ref("proposed_synthesis"),
                Rule::Any(&[
                    Phrase("recommend"),
                    Phrase("should"),
                    Phrase("suggest"),
                    Phrase("implement"),
                    Phrase("create"),
                    Phrase("add"),
                    Phrase("approach"),
                    Phrase("solution"),
                    Phrase("strategy"),
                ]),
            ]),
        )
}

impl Scenario for ConflictScenario {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn uses_project(&self) -> bool {
        false
    }

    fn criteria(&self) -> &'static [Criterion] {
        self.criteria
    }

    fn lexical_rules(&self) -> RuleTable {
        (self.rules)()
    }

    fn context_record(
        &self,
        condition: Condition,
        _source: &dyn EvidenceSource,
    ) -> ContextRecord {
        let task = match condition {
            Condition::GitOnly => BASELINE_TASK,
            Condition::TelosGit => AUGMENTED_TASK,
        };
        let record = ContextRecord::new(condition)
            .with("task", task)
            .with("git_diff", GIT_DIFF.trim_end())
            .with("commit_message", COMMIT_MESSAGE.trim_end());
        match condition {
            Condition::GitOnly => record,
            Condition::TelosGit => record.with("telos_error_intents", ERROR_INTENTS.trim_end()),
        }
    }
}
