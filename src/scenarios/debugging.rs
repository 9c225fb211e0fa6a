//! Experiment b: root-causing a missing board check with and without the
//! task intents.
use super::evidence::{self, EvidenceSource};
use super::Scenario;
use crate::fixture::{Condition, ContextRecord};
use crate::judge::Criterion;
use crate::scoring::rules::{Pattern, Phrase, Rule, RuleTable};

pub struct DebuggingWithIntent;

pub const DEBUGGING_WITH_INTENT: DebuggingWithIntent = DebuggingWithIntent;

const BUG_REPORT: &str = "Users report they can create tasks pointing to non-existent boards. \
The task is created successfully even when the board_id doesn't exist.";

const BASELINE_PROMPT: &str = "A bug has been reported: users can create tasks that reference \
non-existent boards. Find the root cause and suggest a fix. You have access to git history \
shown below.";

const AUGMENTED_PROMPT: &str = "A bug has been reported: users can create tasks that reference \
non-existent boards. Using the telos intent context below, find the root cause and suggest a fix.";

const CRITERIA: &[Criterion] = &[
    Criterion {
        id: "found_root_cause",
        definition: "The response identifies that task creation does not check whether \
                     the referenced board exists.",
        ground_truth: "TaskStore::create accepts any board_id without looking it up, \
                       so tasks can point at boards that were never created.",
    },
    Criterion {
        id: "suggested_correct_fix",
        definition: "The response proposes validating the board against the board store \
                     before the task is created.",
        ground_truth: "The fix is to check BoardStore for the board_id inside task creation \
                       and reject the request when it is missing.",
    },
    Criterion {
        id: "referenced_constraint",
        definition: "The response references the rule that every task must belong to a \
                     valid board.",
        ground_truth: "Recorded constraint: 'Tasks must reference a valid board_id'.",
    },
    Criterion {
        id: "referenced_behavior_spec",
        definition: "The response states the expected behavior for a non-existent board, \
                     such as a 400 Bad Request.",
        ground_truth: "Recorded behavior: given a non-existent board, creating a task \
                       returns 400 Bad Request.",
    },
];

impl Scenario for DebuggingWithIntent {
    fn id(&self) -> &'static str {
        "b"
    }

    fn name(&self) -> &'static str {
        "Debugging with Intent"
    }

    fn criteria(&self) -> &'static [Criterion] {
        CRITERIA
    }

    fn lexical_rules(&self) -> RuleTable {
        RuleTable::new()
            .criterion(
                "found_root_cause",
                Rule::Any(&[
                    Phrase("doesn't validate"),
                    Phrase("no validation"),
                    Phrase("missing validation"),
                    Phrase("board_id is not checked"),
                    Phrase("not verified"),
                    Phrase("not validated"),
                    Phrase("create doesn't check"),
                    Phrase("board exists"),
                ]),
            )
            .criterion(
                "suggested_correct_fix",
                Rule::Any(&[
                    Phrase("check board"),
                    Phrase("validate board"),
                    Phrase("verify board"),
                    Phrase("boardstore"),
                    Phrase("board_store"),
                    Phrase("exists(board_id"),
                    Phrase("before creating"),
                ]),
            )
            .criterion(
                "referenced_constraint",
                Rule::Any(&[
                    Phrase("must reference a valid board"),
                    Phrase("valid board_id"),
                    Phrase("constraint"),
                ]),
            )
            .criterion(
                "referenced_behavior_spec",
                Rule::Any(&[
                    Phrase("400"),
                    Phrase("bad request"),
                    Pattern("given.*non-existent.*board"),
                    Phrase("behavior"),
                ]),
            )
    }

    fn context_record(
        &self,
        condition: Condition,
        source: &dyn EvidenceSource,
    ) -> ContextRecord {
        let record = ContextRecord::new(condition).with("bug_report", BUG_REPORT);
        match condition {
            Condition::GitOnly => record
                .with(
                    "git_log_tasks",
                    evidence::git(source, &["log", "--oneline", "--grep=task"]),
                )
                .with(
                    "git_history_tasks_file",
                    evidence::git(
                        source,
                        &["log", "--all", "--oneline", "--", "src/tasks/mod.rs"],
                    ),
                )
                .with("prompt", BASELINE_PROMPT),
            Condition::TelosGit => record
                .with("telos_task_intents", evidence::intents(source, "tasks"))
                .with("prompt", AUGMENTED_PROMPT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::evidence::testing::EchoEvidence;
    use crate::scenarios::lexical_scorer;

    #[test]
    fn augmented_record_queries_task_intents_only() {
        let source = EchoEvidence::default();
        let record = DEBUGGING_WITH_INTENT.context_record(Condition::TelosGit, &source);
        assert_eq!(
            source.calls.borrow().as_slice(),
            ["telos query intents --impact tasks --json"]
        );
        assert_eq!(record.get_str("bug_report"), Some(BUG_REPORT));
        assert_eq!(record.instruction(), Some(AUGMENTED_PROMPT));
    }

    #[test]
    fn behavior_pattern_spans_words() {
        let scorer = lexical_scorer(&DEBUGGING_WITH_INTENT).expect("rules compile");
        let score =
            scorer.score("Given a request for a non-existent\nboard the API must refuse it.");
        assert_eq!(score.get("referenced_behavior_spec"), Some(true));
        assert_eq!(score.get("suggested_correct_fix"), Some(false));
    }
}
