//! Experiment k: the recorded intents predate a large rename. A useful answer
//! notices that the names in the task and intents no longer exist.
use super::evidence::EvidenceSource;
use super::Scenario;
use crate::fixture::{Condition, ContextRecord};
use crate::judge::Criterion;
use crate::scoring::rules::{Indicator, Metric, Pattern, Phrase, Rule, RuleTable};

pub struct StaleIntent;

pub const STALE_INTENT: StaleIntent = StaleIntent;

const TASK: &str = "A new developer needs to add rate limiting to the authentication flow. \
They should modify validate_token() in the auth module to check request frequency before \
validating the JWT token. The rate limit should be 100 requests per minute per user, tracked \
by the Claims.sub field.";

const CURRENT_CODE_STATE: &str = scenario_file!("k", "current_code_state.txt");
const GIT_LOG: &str = scenario_file!("k", "git_log.txt");
const STALE_AUTH_INTENTS: &str = scenario_file!("k", "telos_auth_intents.json");

const CURRENT_NAMES: &[Indicator] = &[
    Phrase("identity"),
    Phrase("authenticate"),
    Phrase("authpayload"),
    Phrase("auth_payload"),
    Phrase("work_item"),
    Phrase("workspace"),
    Phrase("permission_set"),
    Phrase("session_duration"),
];

const CRITERIA: &[Criterion] = &[
    Criterion {
        id: "recognized_staleness",
        definition: "The response notices that the names in the task or recorded intents \
                     no longer match the current codebase.",
        ground_truth: "validate_token() was renamed to authenticate(), Claims is now \
                       AuthPayload and src/auth/ is now src/identity/. The task and intents \
                       still use the old names.",
    },
    Criterion {
        id: "used_correct_names",
        definition: "The response plans the change using the current names rather than \
                     the removed ones.",
        ground_truth: "Rate limiting belongs in authenticate() in src/identity/, keyed on the \
                       AuthPayload subject.",
    },
    Criterion {
        id: "noted_intent_update",
        definition: "The response recommends updating or refreshing the outdated intents.",
        ground_truth: "The recorded auth intents describe the pre-rename design and should \
                       be updated to the current names.",
    },
];

impl Scenario for StaleIntent {
    fn id(&self) -> &'static str {
        "k"
    }

    fn name(&self) -> &'static str {
        "Stale Intent Detection"
    }

    fn uses_project(&self) -> bool {
        false
    }

    fn criteria(&self) -> &'static [Criterion] {
        CRITERIA
    }

    fn lexical_rules(&self) -> RuleTable {
        RuleTable::new()
            .criterion(
                "recognized_staleness",
                Rule::Any(&[
                    Phrase("stale"),
                    Phrase("outdated"),
                    Phrase("out of date"),
                    Phrase("no longer"),
                    Phrase("renamed"),
                    Phrase("doesn't exist"),
                    Phrase("does not exist"),
                    Phrase("old name"),
                    Phrase("previous name"),
                    Phrase("been renamed"),
                    Phrase("mismatch"),
                    Phrase("inconsistent"),
                ]),
            )
            .criterion("used_correct_names", Rule::Any(CURRENT_NAMES))
            .criterion(
                "noted_intent_update",
                Rule::Any(&[
                    Pattern("update.*intent"),
                    Pattern("refresh.*intent"),
                    Pattern("intent.*stale"),
                    Pattern("intent.*outdated"),
                    Pattern("update.*telos"),
                    Pattern("sync.*intent"),
                    Pattern("intent.*updated"),
                    Pattern("record.*new"),
                ]),
            )
            .metric(
                "misleading_recommendation",
                Metric::TriState {
                    negative: Rule::All(vec![
                        Rule::Any(&[
                            Phrase("modify validate_token"),
                            Phrase("edit validate_token"),
                            Phrase("in the auth module"),
                            Phrase("in src/auth/"),
                            Phrase("claims.sub"),
                            Phrase("userole"),
                        ]),
                        Rule::not(Rule::Any(&[
                            Phrase("however"),
                            Phrase("but note"),
                            Phrase("actually"),
                            Phrase("has been renamed"),
                            Phrase("now called"),
                            Phrase("instead"),
                            Phrase("rather"),
                        ])),
                    ]),
                    positive: Rule::Ref("used_correct_names"),
                },
            )
    }

    fn context_record(
        &self,
        condition: Condition,
        _source: &dyn EvidenceSource,
    ) -> ContextRecord {
        let record = ContextRecord::new(condition)
            .with("task", TASK)
            .with("current_code_state", CURRENT_CODE_STATE.trim_end())
            .with("git_log", GIT_LOG.trim_end());
        match condition {
            Condition::GitOnly => record,
            Condition::TelosGit => {
                record.with("telos_auth_intents", STALE_AUTH_INTENTS.trim_end())
            }
        }
    }
}
