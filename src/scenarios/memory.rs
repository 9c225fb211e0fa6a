//! Experiment a: resuming work on the auth module from history alone versus
//! history plus recorded intent context.
use super::evidence::{self, EvidenceSource};
use super::Scenario;
use crate::fixture::{Condition, ContextRecord};
use crate::judge::Criterion;
use crate::scoring::rules::{Indicator, Metric, Phrase, Rule, RuleTable};

pub struct CrossSessionMemory;

pub const CROSS_SESSION_MEMORY: CrossSessionMemory = CrossSessionMemory;

const BASELINE_PROMPT: &str = "You are resuming work on the auth module of a TaskBoard API. \
Based on the git history below, summarize: (1) What has been completed, \
(2) What constraints/decisions were made, (3) What still needs to be done.";

const AUGMENTED_PROMPT: &str = "You are resuming work on the auth module of a TaskBoard API. \
Based on the telos context and git history below, summarize: (1) What has been completed, \
(2) What constraints/decisions were made, (3) What still needs to be done.";

const COMPLETED_WORK: &[Indicator] = &[
    Phrase("jwt"),
    Phrase("authentication"),
    Phrase("error handling"),
    Phrase("rbac"),
    Phrase("role"),
];

const CONSTRAINTS: &[Indicator] = &[
    Phrase("1 hour"),
    Phrase("3600"),
    Phrase("token expir"),
    Phrase("role"),
    Phrase("rbac"),
    Phrase("secret"),
    Phrase("hardcoded"),
    Phrase("production"),
];

const DECISIONS: &[Indicator] = &[
    Phrase("jwt"),
    Phrase("hs256"),
    Phrase("session cookie"),
    Phrase("3600"),
    Phrase("1 hour"),
    Phrase("expir"),
];

const CRITERIA: &[Criterion] = &[
    Criterion {
        id: "completeness",
        definition: "The response identifies all three completed components: \
                     JWT authentication, error handling, and RBAC roles.",
        ground_truth: "Three intents were completed: JWT-based auth, \
                       comprehensive auth error handling, and RBAC role definition.",
    },
    Criterion {
        id: "constraint_recall",
        definition: "The response mentions key constraints: token expiry <= 1 hour, \
                     tokens include role, secret not hardcoded in production.",
        ground_truth: "Constraints: TOKEN_EXPIRY_SECS <= 3600, role claim in JWT, \
                       no hardcoded secret in prod.",
    },
    Criterion {
        id: "decision_recall",
        definition: "The response mentions key decisions: JWT (not session cookies), \
                     HS256 algorithm, 1-hour expiry.",
        ground_truth: "Decisions: Use JWT over session cookies, HS256 signing, \
                       3600-second (1 hour) token expiry.",
    },
];

impl Scenario for CrossSessionMemory {
    fn id(&self) -> &'static str {
        "a"
    }

    fn name(&self) -> &'static str {
        "Cross-Session Memory"
    }

    fn criteria(&self) -> &'static [Criterion] {
        CRITERIA
    }

    fn lexical_rules(&self) -> RuleTable {
        RuleTable::new()
            .criterion("completeness", Rule::Any(COMPLETED_WORK))
            .criterion("constraint_recall", Rule::Any(CONSTRAINTS))
            .criterion("decision_recall", Rule::Any(DECISIONS))
            .metric("completeness_score", Metric::Coverage(COMPLETED_WORK))
            .metric("constraint_recall_score", Metric::Coverage(CONSTRAINTS))
            .metric("decision_recall_score", Metric::Coverage(DECISIONS))
            .metric(
                "overall_score",
                Metric::Mean(&[
                    "completeness_score",
                    "constraint_recall_score",
                    "decision_recall_score",
                ]),
            )
    }

    fn context_record(
        &self,
        condition: Condition,
        source: &dyn EvidenceSource,
    ) -> ContextRecord {
        let git_log = evidence::git(source, &["log", "--oneline"]);
        match condition {
            Condition::GitOnly => ContextRecord::new(condition)
                .with("git_log", git_log)
                .with(
                    "git_diff_recent",
                    evidence::git(source, &["diff", "HEAD~2..HEAD"]),
                )
                .with(
                    "git_commit_messages",
                    evidence::git(source, &["log", "--format=%H%n%B%n---", "-5"]),
                )
                .with("prompt", BASELINE_PROMPT),
            Condition::TelosGit => ContextRecord::new(condition)
                .with("git_log", git_log)
                .with("telos_context", evidence::context(source, "auth"))
                .with("prompt", AUGMENTED_PROMPT),
        }
    }
}
