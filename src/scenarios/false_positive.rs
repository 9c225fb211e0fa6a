//! Experiments n and o: changes that satisfy every recorded constraint. The
//! right answer is approval; any rejection is a false positive.
use super::evidence::EvidenceSource;
use super::review::{GENERIC_AUGMENTED, GENERIC_BASELINE};
use super::Scenario;
use crate::fixture::{Condition, ContextRecord};
use crate::judge::Criterion;
use crate::scoring::rules::{Pattern, Phrase, Rule, RuleTable, REJECTION_OR_VIOLATION};

/// A review of an embedded, constraint-respecting commit.
pub struct ApprovalScenario {
    id: &'static str,
    name: &'static str,
    git_diff: &'static str,
    commit_message: &'static str,
    auth_intents: &'static str,
    criteria: &'static [Criterion],
    rules: fn() -> RuleTable,
}

pub const BENIGN_REFACTOR: ApprovalScenario = ApprovalScenario {
    id: "n",
    name: "False Positive - Benign Refactor",
    git_diff: scenario_file!("n", "git_diff.txt"),
    commit_message: scenario_file!("n", "commit_message.txt"),
    auth_intents: scenario_file!("n", "telos_auth_intents.json"),
    criteria: &[
        Criterion {
            id: "correctly_approved",
            definition: "The response approves the change (does NOT reject it).",
            ground_truth: "This is a benign refactor (variable renames, doc comments). \
                           No constraints are violated. The correct action is to approve.",
        },
        Criterion {
            id: "no_false_violation",
            definition: "The response does NOT claim any constraint violation.",
            ground_truth: "No constraints are violated. TOKEN_EXPIRY_SECS is unchanged. \
                           Roles are unchanged. Error handling is unchanged.",
        },
    ],
    rules: benign_rules,
};

pub const NEAR_MISS: ApprovalScenario = ApprovalScenario {
    id: "o",
    name: "False Positive - Near Miss",
    git_diff: scenario_file!("o", "git_diff.txt"),
    commit_message: scenario_file!("o", "commit_message.txt"),
    auth_intents: scenario_file!("o", "telos_auth_intents.json"),
    criteria: &[
        Criterion {
            id: "correctly_approved",
            definition: "The response approves the change (does NOT reject it).",
            ground_truth: "TOKEN_EXPIRY_SECS changed from 3600 to 3500. \
                           The constraint is '<= 1 hour' (3600s). 3500 <= 3600, \
                           so no violation. The correct action is to approve.",
        },
        Criterion {
            id: "noted_within_bounds",
            definition: "The response acknowledges the value is within constraint bounds.",
            ground_truth: "3500 seconds (~58 minutes) is within the '1 hour' constraint.",
        },
    ],
    rules: near_miss_rules,
};

/// Rejection and its false-positive alias come first in both tables.
fn rejection_rules() -> RuleTable {
    RuleTable::new()
        .criterion("recommended_rejection", Rule::Any(REJECTION_OR_VIOLATION))
        .criterion("false_positive", Rule::Ref("recommended_rejection"))
}

fn benign_rules() -> RuleTable {
    rejection_rules()
        .criterion(
            "correctly_identified_no_violation",
            Rule::Any(&[
                Phrase("approve"),
                Phrase("looks good"),
                Phrase("lgtm"),
                Phrase("no violation"),
                Phrase("no constraint"),
                Phrase("no issue"),
                Phrase("safe to merge"),
                Phrase("no concerns"),
            ]),
        )
        .criterion(
            "noted_cosmetic_only",
            Rule::Any(&[
                Phrase("refactor"),
                Phrase("rename"),
                Phrase("cosmetic"),
                Phrase("no behavioral"),
                Phrase("no functionality"),
                Phrase("readability"),
                Phrase("clarity"),
                Phrase("documentation"),
                Phrase("doc comment"),
            ]),
        )
}

fn near_miss_rules() -> RuleTable {
    rejection_rules()
        .criterion(
            "correctly_approved",
            Rule::Any(&[
                Phrase("approve"),
                Phrase("looks good"),
                Phrase("lgtm"),
                Phrase("no violation"),
                Phrase("within"),
                Phrase("satisfies"),
                Phrase("safe to merge"),
                Phrase("acceptable"),
            ]),
        )
        .criterion(
            "noted_within_constraint",
            Rule::Any(&[
                Phrase("within"),
                Phrase("below"),
                Phrase("less than"),
                Pattern("still.*hour"),
                Pattern("under.*limit"),
                Pattern("3500.*3600"),
                Phrase("58 minute"),
                Phrase("within constraint"),
            ]),
        )
}

impl Scenario for ApprovalScenario {
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
            Condition::GitOnly => GENERIC_BASELINE,
            Condition::TelosGit => GENERIC_AUGMENTED,
        };
        let record = ContextRecord::new(condition)
            .with("task", task)
            .with("git_diff", self.git_diff.trim_end())
            .with("commit_message", self.commit_message.trim_end());
        match condition {
            Condition::GitOnly => record,
            Condition::TelosGit => {
                record.with("telos_auth_intents", self.auth_intents.trim_end())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::evidence::NoEvidence;
    use crate::scenarios::lexical_scorer;

    #[test]
    fn near_miss_diff_stays_under_the_limit() {
        let record = NEAR_MISS.context_record(Condition::TelosGit, &NoEvidence);
        let diff = record.get_str("git_diff").expect("diff");
        assert!(diff.contains("TOKEN_EXPIRY_SECS: u64 = 3500"));
        assert!(record.get_str("telos_auth_intents").is_some());
    }

    #[test]
    fn naming_a_violation_is_a_false_positive() {
        let scorer = lexical_scorer(&NEAR_MISS).expect("rules compile");
        let score = scorer.score("This violates the expiry constraint.");
        assert_eq!(score.get("recommended_rejection"), Some(true));
        assert_eq!(score.get("false_positive"), Some(true));

        let approved = scorer.score("3500 is within the 3600 limit. Approve.");
        assert_eq!(approved.get("false_positive"), Some(false));
        assert_eq!(approved.get("correctly_approved"), Some(true));
        assert_eq!(approved.get("noted_within_constraint"), Some(true));
    }
}
