//! Code-review experiments (c, e, f, g): the model reviews one commit of the
//! project and should reject it because it breaks a recorded constraint.
use super::evidence::{self, EvidenceSource};
use super::Scenario;
use crate::fixture::{Condition, ContextRecord};
use crate::judge::Criterion;
use crate::scoring::rules::{Pattern, Phrase, Rule, RuleTable, REJECTION};

/// Extra context looked up for one condition.
#[derive(Debug, Clone, Copy)]
enum Lookup {
    Git(&'static [&'static str]),
    Intents(&'static str),
}

/// A review of one commit range, parameterized per experiment.
pub struct ReviewScenario {
    id: &'static str,
    name: &'static str,
    diff_range: &'static str,
    /// Revision whose message is shown; `None` is HEAD.
    message_rev: Option<&'static str>,
    baseline_task: &'static str,
    augmented_task: &'static str,
    baseline_extra: &'static [(&'static str, Lookup)],
    augmented_extra: &'static [(&'static str, Lookup)],
    criteria: &'static [Criterion],
    rules: fn() -> RuleTable,
}

pub(super) const GENERIC_BASELINE: &str = "Review this code change. Identify any issues, \
regressions, or concerns. Approve or reject with reasoning.";

pub(super) const GENERIC_AUGMENTED: &str = "Review this code change. Check it against the recorded \
constraints and intents. Identify any constraint violations. Approve or reject with reasoning.";

const AUTH_BASELINE: &str = "Review this code change to the authentication module. Identify \
any security concerns or issues. Approve or reject with reasoning.";

pub const CONSTRAINT_GUARDIAN: ReviewScenario = ReviewScenario {
    id: "c",
    name: "Constraint Guardian Review",
    diff_range: "HEAD~1..HEAD",
    message_rev: None,
    baseline_task: GENERIC_BASELINE,
    augmented_task: GENERIC_AUGMENTED,
    baseline_extra: &[],
    augmented_extra: &[
        ("telos_auth_intents", Lookup::Intents("auth")),
        ("telos_security_intents", Lookup::Intents("security")),
    ],
    criteria: &[
        Criterion {
            id: "caught_violation",
            definition: "The response identifies that changing token expiry from 3600 \
                         to 86400 is problematic.",
            ground_truth: "TOKEN_EXPIRY_SECS was changed from 3600 (1 hour) to 86400 \
                           (24 hours). The constraint says 'Token expiry must be <= 1 hour'.",
        },
        Criterion {
            id: "cited_specific_constraint",
            definition: "The response explicitly references the 1-hour constraint.",
            ground_truth: "The recorded constraint is: 'Token expiry must be <= 1 hour \
                           for security'.",
        },
        Criterion {
            id: "recommended_rejection",
            definition: "The response recommends rejecting or blocking the change.",
            ground_truth: "The correct action is to reject this PR because it violates \
                           the token expiry constraint.",
        },
        Criterion {
            id: "identified_security_risk",
            definition: "The response identifies this as a security risk.",
            ground_truth: "Increasing token expiry from 1 hour to 24 hours increases \
                           the window for stolen token abuse.",
        },
    ],
    rules: token_expiry_rules,
};

pub const STATUS_TRANSITION: ReviewScenario = ReviewScenario {
    id: "e",
    name: "Status Transition Integrity",
    diff_range: "HEAD~1..HEAD",
    message_rev: None,
    baseline_task: GENERIC_BASELINE,
    augmented_task: GENERIC_AUGMENTED,
    baseline_extra: &[("recent_history", Lookup::Git(&["log", "--oneline", "-5"]))],
    augmented_extra: &[("telos_task_intents", Lookup::Intents("tasks"))],
    criteria: &[
        Criterion {
            id: "caught_validation_removal",
            definition: "The response identifies that forward-only status transition \
                         validation was removed.",
            ground_truth: "The commit removes the validation logic that enforced \
                           Todo -> InProgress -> Done ordering and blocked backward transitions.",
        },
        Criterion {
            id: "cited_transition_constraint",
            definition: "The response references the forward-only transition rule.",
            ground_truth: "Constraint: 'Status transitions must follow: Todo -> InProgress -> \
                           Done' and 'Cannot transition backwards without explicit reset'.",
        },
        Criterion {
            id: "recommended_rejection",
            definition: "The response recommends rejecting the change.",
            ground_truth: "The correct action is to reject because removing validation \
                           violates the recorded constraint.",
        },
    ],
    rules: transition_rules,
};

pub const ERROR_INFORMATION_LEAK: ReviewScenario = ReviewScenario {
    id: "f",
    name: "Error Information Leak",
    diff_range: "HEAD~3..HEAD~2",
    message_rev: Some("HEAD~2"),
    baseline_task: AUTH_BASELINE,
    augmented_task: "Review this code change to the authentication module. Check it against \
the recorded security constraints and intents. Identify any constraint violations or security \
concerns. Approve or reject with reasoning.",
    baseline_extra: &[],
    augmented_extra: &[
        ("telos_security_intents", Lookup::Intents("security")),
        ("telos_auth_intents", Lookup::Intents("auth")),
    ],
    criteria: &[
        Criterion {
            id: "caught_info_leak",
            definition: "The response identifies that error messages now expose \
                         internal implementation details.",
            ground_truth: "AuthError variants now include: key_length, token prefix, \
                           user_id, expired_at, server_time, sig_bytes.",
        },
        Criterion {
            id: "cited_security_constraint",
            definition: "The response references the security constraint about \
                         not leaking internal details.",
            ground_truth: "Constraint: 'Error messages must not leak internal details \
                           (key lengths, user IDs, internal paths)'.",
        },
        Criterion {
            id: "identified_leaked_fields",
            definition: "The response identifies at least two specific leaked fields.",
            ground_truth: "Leaked fields: key_length, token prefix, user_id, \
                           expired_at, server_time, sig_bytes.",
        },
    ],
    rules: leak_rules,
};

pub const PERMISSION_ESCALATION: ReviewScenario = ReviewScenario {
    id: "g",
    name: "Permission Escalation",
    diff_range: "HEAD~2..HEAD~1",
    message_rev: Some("HEAD~1"),
    baseline_task: AUTH_BASELINE,
    augmented_task: "Review this code change to the authentication module. Check it against \
the recorded security and auth constraints. Identify any constraint violations or security \
concerns. Approve or reject with reasoning.",
    baseline_extra: &[],
    augmented_extra: &[
        ("telos_auth_intents", Lookup::Intents("auth")),
        ("telos_security_intents", Lookup::Intents("security")),
    ],
    criteria: &[
        Criterion {
            id: "caught_escalation",
            definition: "The response identifies that validate_token now returns \
                         Admin role instead of Member.",
            ground_truth: "The change hardcodes UserRole::Admin where it was UserRole::Member, \
                           granting every authenticated user admin privileges.",
        },
        Criterion {
            id: "cited_rbac_constraint",
            definition: "The response references the RBAC constraint about default roles.",
            ground_truth: "Constraint: 'Default role for new tokens must be Member, never Admin'.",
        },
        Criterion {
            id: "identified_as_critical",
            definition: "The response treats this as a critical/severe security issue.",
            ground_truth: "This is a privilege escalation vulnerability that grants every \
                           user full admin access.",
        },
    ],
    rules: escalation_rules,
};

fn token_expiry_rules() -> RuleTable {
    RuleTable::new()
        .criterion(
            "caught_violation",
            Rule::Any(&[
                Phrase("violat"),
                Phrase("constraint"),
                Phrase("must be <= 1 hour"),
                Phrase("exceeds"),
                Phrase("1 hour limit"),
                Phrase("3600"),
                Phrase("24 hour"),
                Phrase("86400"),
                Phrase("too long"),
            ]),
        )
        .criterion(
            "cited_specific_constraint",
            Rule::All(vec![
                Rule::Any(&[Phrase("1 hour")]),
                Rule::Any(&[Phrase("constraint"), Phrase("must be")]),
            ]),
        )
        .criterion("recommended_rejection", Rule::Any(REJECTION))
        .criterion(
            "identified_security_risk",
            Rule::Any(&[
                Phrase("security"),
                Phrase("risk"),
                Phrase("vulnerability"),
                Phrase("token lifetime"),
                Pattern("longer.*token.*risk"),
            ]),
        )
}

fn transition_rules() -> RuleTable {
    RuleTable::new()
        .criterion(
            "caught_validation_removal",
            Rule::Any(&[
                Phrase("remov"),
                Phrase("strip"),
                Phrase("delet"),
                Phrase("validation"),
                Phrase("forward-only"),
                Phrase("forward only"),
                Phrase("transition check"),
                Phrase("transition validation"),
                Phrase("guard"),
                Phrase("enforcement"),
            ]),
        )
        .criterion(
            "cited_transition_constraint",
            Rule::Any(&[
                Pattern("todo.*inprogress.*done"),
                Phrase("forward-only"),
                Phrase("forward only"),
                Phrase("backward"),
                Phrase("cannot transition"),
                Pattern("transition.*rule"),
                Pattern("transition.*constraint"),
                Phrase("must follow"),
            ]),
        )
        .criterion("recommended_rejection", Rule::Any(REJECTION))
        .criterion(
            "identified_regression",
            Rule::Any(&[
                Phrase("regression"),
                Phrase("violat"),
                Phrase("breaks"),
                Phrase("was added"),
                Phrase("previously"),
                Pattern("removed.*check"),
                Phrase("safety"),
                Pattern("guard.*removed"),
            ]),
        )
}

fn leak_rules() -> RuleTable {
    RuleTable::new()
        .criterion(
            "caught_info_leak",
            Rule::Any(&[
                Phrase("leak"),
                Phrase("expos"),
                Phrase("disclos"),
                Phrase("reveal"),
                Phrase("internal detail"),
                Phrase("sensitive"),
                Phrase("information disclosure"),
                Pattern("debug.*production"),
                Pattern("verbose.*error"),
            ]),
        )
        .criterion(
            "cited_security_constraint",
            Rule::Any(&[
                Phrase("must not leak"),
                Phrase("no internal details"),
                Phrase("generic message"),
                Phrase("security constraint"),
                Pattern("error.*must.*not"),
                Phrase("constraint"),
            ]),
        )
        .criterion(
            "identified_leaked_fields",
            Rule::AtLeast {
                min: 2,
                indicators: &[
                    Phrase("key_length"),
                    Phrase("key length"),
                    Phrase("user_id"),
                    Phrase("user id"),
                    Phrase("prefix"),
                    Phrase("token prefix"),
                    Phrase("sig_bytes"),
                    Phrase("signature bytes"),
                    Phrase("server_time"),
                    Phrase("expired_at"),
                ],
            },
        )
        .criterion("recommended_rejection", Rule::Any(REJECTION))
}

fn escalation_rules() -> RuleTable {
    RuleTable::new()
        .criterion(
            "caught_escalation",
            Rule::Any(&[
                Phrase("escalat"),
                Phrase("privilege"),
                Phrase("elevated"),
                Pattern("admin.*instead.*member"),
                Pattern("member.*admin"),
                Pattern("everyone.*admin"),
                Pattern("all.*admin"),
                Phrase("always admin"),
                Pattern("role.*changed"),
                Pattern("role.*hardcoded"),
            ]),
        )
        .criterion(
            "cited_role_constraint",
            Rule::Any(&[
                Phrase("role hierarchy"),
                Pattern("admin.*member.*viewer"),
                Phrase("must be enforced"),
                Phrase("never admin"),
                Pattern("default.*member"),
                Phrase("constraint"),
                Phrase("rbac"),
            ]),
        )
        .criterion(
            "identified_admin_hardcode",
            Rule::Any(&[
                Phrase("userrole::admin"),
                Phrase("admin role"),
                Phrase("hardcod"),
                Pattern("always return.*admin"),
                Pattern("return.*admin"),
                Pattern("changed.*to.*admin"),
                Pattern("member.*to.*admin"),
            ]),
        )
        .criterion(
            "recommended_rejection",
            Rule::Either(vec![
                Rule::Any(REJECTION),
                Rule::Any(&[Phrase("critical"), Phrase("severe")]),
            ]),
        )
}

impl ReviewScenario {
    fn commit_message(&self, source: &dyn EvidenceSource) -> String {
        match self.message_rev {
            Some(rev) => evidence::git(source, &["log", "-1", "--format=%B", rev]),
            None => evidence::git(source, &["log", "-1", "--format=%B"]),
        }
    }
}

impl Scenario for ReviewScenario {
    fn id(&self) -> &'static str {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
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
        source: &dyn EvidenceSource,
    ) -> ContextRecord {
        let (task, extra) = match condition {
            Condition::GitOnly => (self.baseline_task, self.baseline_extra),
            Condition::TelosGit => (self.augmented_task, self.augmented_extra),
        };
        let mut record = ContextRecord::new(condition)
            .with("task", task)
            .with("git_diff", evidence::git(source, &["diff", self.diff_range]))
            .with("commit_message", self.commit_message(source));
        for (key, lookup) in extra {
            let value = match *lookup {
                Lookup::Git(args) => evidence::git(source, args),
                Lookup::Intents(area) => evidence::intents(source, area),
            };
            record = record.with(key, value);
        }
        record
    }
}
