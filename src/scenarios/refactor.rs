//! Experiment d: renaming the tasks module with grep output versus the
//! recorded cross-module intents.
use super::evidence::{self, EvidenceSource};
use super::Scenario;
use crate::fixture::{Condition, ContextRecord};
use crate::judge::Criterion;
use crate::scoring::rules::{Metric, Pattern, Phrase, Rule, RuleTable};

pub struct ImpactGuidedRefactor;

pub const IMPACT_GUIDED_REFACTOR: ImpactGuidedRefactor = ImpactGuidedRefactor;

const GREP_LINE_LIMIT: usize = 50;

const BASELINE_TASK: &str = "Rename the 'tasks' module to 'items'. Update all references \
throughout the codebase. Ensure nothing breaks.";

const AUGMENTED_TASK: &str = "Rename the 'tasks' module to 'items'. Use the telos context to \
understand all impact areas and cross-module dependencies before making changes.";

const CRITERIA_NAMES: &[&str] = &[
    "renamed_directory",
    "updated_main_mod",
    "updated_boards_references",
    "updated_struct_names",
    "identified_cross_module",
    "mentioned_auth_rbac_link",
];

const CRITERIA: &[Criterion] = &[
    Criterion {
        id: "renamed_directory",
        definition: "The response moves src/tasks to src/items.",
        ground_truth: "The module lives in src/tasks/mod.rs and must become src/items/mod.rs.",
    },
    Criterion {
        id: "updated_main_mod",
        definition: "The response updates the module declaration in main.rs.",
        ground_truth: "main.rs declares `mod tasks;`, which must become `mod items;`.",
    },
    Criterion {
        id: "identified_cross_module",
        definition: "The response identifies that the boards module depends on tasks \
                     and must be updated too.",
        ground_truth: "Boards reference tasks through board_id and deleting a board \
                       cascades to its tasks, so the boards module is in the impact area.",
    },
    Criterion {
        id: "mentioned_auth_rbac_link",
        definition: "The response notes that role-based permissions on tasks are affected.",
        ground_truth: "RBAC rules decide which roles may create or edit tasks; viewers \
                       are read-only. Those checks must follow the rename.",
    },
];

/// First `limit` lines of `text`.
fn head(text: &str, limit: usize) -> String {
    text.lines().take(limit).collect::<Vec<_>>().join("\n")
}

/// Lines of `text` in byte order.
fn sorted_lines(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    lines.sort_unstable();
    lines.join("\n")
}

impl Scenario for ImpactGuidedRefactor {
    fn id(&self) -> &'static str {
        "d"
    }

    fn name(&self) -> &'static str {
        "Impact-Guided Refactor"
    }

    fn criteria(&self) -> &'static [Criterion] {
        CRITERIA
    }

    fn lexical_rules(&self) -> RuleTable {
        RuleTable::new()
            .criterion(
                "renamed_directory",
                Rule::Any(&[
                    Phrase("rename src/tasks"),
                    Phrase("mv src/tasks"),
                    Phrase("items/mod.rs"),
                    Pattern("rename.*directory"),
                    Pattern("move.*tasks.*items"),
                ]),
            )
            .criterion(
                "updated_main_mod",
                Rule::Any(&[
                    Phrase("mod items"),
                    Phrase("main.rs"),
                    Pattern("mod tasks.*mod items"),
                ]),
            )
            .criterion(
                "updated_boards_references",
                Rule::Any(&[
                    Phrase("boards"),
                    Pattern("board.*task"),
                    Phrase("cross-module"),
                    Phrase("board_id"),
                    Phrase("cascade"),
                ]),
            )
            .criterion(
                "updated_struct_names",
                Rule::Any(&[
                    Pattern("taskstore.*itemstore"),
                    Pattern("task.*item"),
                    Pattern("createtask.*createitem"),
                    Pattern("rename.*struct"),
                ]),
            )
            .criterion(
                "identified_cross_module",
                Rule::All(vec![
                    Rule::Any(&[Phrase("board")]),
                    Rule::Any(&[Phrase("task"), Phrase("item")]),
                    Rule::Any(&[
                        Phrase("cross"),
                        Phrase("depend"),
                        Phrase("reference"),
                        Phrase("impact"),
                    ]),
                ]),
            )
            .criterion(
                "mentioned_auth_rbac_link",
                Rule::Any(&[
                    Phrase("rbac"),
                    Phrase("role"),
                    Phrase("permission"),
                    Pattern("auth.*task"),
                    Pattern("member.*task"),
                    Phrase("viewer"),
                ]),
            )
            .metric("completeness_score", Metric::Percent(CRITERIA_NAMES))
    }

    fn context_record(
        &self,
        condition: Condition,
        source: &dyn EvidenceSource,
    ) -> ContextRecord {
        match condition {
            Condition::GitOnly => {
                let grep = source.capture("grep", &["-rn", "task", "src/", "--include=*.rs"]);
                let files = source.capture("find", &["src", "-name", "*.rs"]);
                ContextRecord::new(condition)
                    .with("task", BASELINE_TASK)
                    .with("grep_results", head(&grep, GREP_LINE_LIMIT))
                    .with("file_list", sorted_lines(&files))
            }
            Condition::TelosGit => ContextRecord::new(condition)
                .with("task", AUGMENTED_TASK)
                .with("telos_task_intents", evidence::intents(source, "tasks"))
                .with("telos_board_intents", evidence::intents(source, "boards"))
                .with("telos_full_context", evidence::context(source, "tasks")),
        }
    }
}
