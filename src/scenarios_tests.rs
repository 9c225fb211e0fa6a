use super::*;
use crate::paths::HarnessPaths;
use crate::scoring::rules::Rule;
use evidence::testing::EchoEvidence;
use evidence::NoEvidence;
use proptest::prelude::*;
use std::collections::BTreeSet;

#[test]
fn registry_ids_are_unique_and_ordered() {
    let ids: Vec<&str> = all().iter().map(|s| s.id()).collect();
    assert_eq!(
        ids,
        ["a", "b", "c", "d", "e", "f", "g", "k", "n", "o", "p", "q"]
    );
}

#[test]
fn every_rule_table_compiles_with_declared_keys() {
    for scenario in all() {
        let scorer = lexical_scorer(*scenario).expect("rules compile");
        let score = scorer.score("");
        let keys: Vec<&str> = score.criteria.keys().map(String::as_str).collect();
        let mut declared = scorer.criterion_names();
        declared.sort_unstable();
        assert_eq!(keys, declared, "experiment {}", scenario.id());
        assert!(
            score.criteria.values().all(|met| !met),
            "empty response satisfied a criterion in {}",
            scenario.id()
        );
    }
}

#[test]
fn judge_criteria_ids_are_unique() {
    for scenario in all() {
        let ids: BTreeSet<&str> = scenario.criteria().iter().map(|c| c.id).collect();
        assert!(!ids.is_empty(), "experiment {}", scenario.id());
        assert_eq!(ids.len(), scenario.criteria().len(), "experiment {}", scenario.id());
    }
}

#[test]
fn every_record_validates_with_canned_evidence() {
    let source = EchoEvidence::default();
    for scenario in all() {
        for &condition in scenario.conditions() {
            let record = scenario.context_record(condition, &source);
            record.validate().expect("valid record");
            assert_eq!(record.condition(), Some(condition));
        }
    }
}

#[test]
fn embedded_scenarios_never_touch_evidence() {
    for scenario in all().iter().filter(|s| !s.uses_project()) {
        let source = EchoEvidence::default();
        for &condition in scenario.conditions() {
            scenario.context_record(condition, &source);
        }
        assert!(source.calls.borrow().is_empty(), "experiment {}", scenario.id());
    }
}

#[test]
fn select_resolves_lists_and_rejects_unknown_ids() {
    let ids = |sel: &str| -> Vec<&str> {
        select(sel)
            .expect("selection")
            .iter()
            .map(|s| s.id())
            .collect()
    };
    assert_eq!(ids("c"), ["c"]);
    assert_eq!(ids("a, C ,a"), ["a", "c"]);
    assert_eq!(ids("ALL").len(), 12);

    let Err(err) = select("c,z") else {
        panic!("unknown id accepted");
    };
    let message = format!("{err:#}");
    assert!(message.contains("\"z\""), "{message}");
    assert!(message.contains("a, b, c"), "{message}");
    assert!(select(" , ").is_err());
}

#[test]
fn token_expiry_reply_cites_the_constraint() {
    let scorer = lexical_scorer(&review::CONSTRAINT_GUARDIAN).expect("rules compile");
    let score = scorer.score(
        "TOKEN_EXPIRY_SECS goes from 3600 to 86400. The constraint says expiry must stay \
         within 1 hour. Reject.",
    );
    assert_eq!(score.get("caught_violation"), Some(true));
    assert_eq!(score.get("cited_specific_constraint"), Some(true));
    assert_eq!(score.get("recommended_rejection"), Some(true));
}

#[test]
fn benign_refactor_approval_is_not_a_false_positive() {
    let scorer = lexical_scorer(&false_positive::BENIGN_REFACTOR).expect("rules compile");
    let score = scorer.score("Pure rename and doc comment changes. Approve.");
    assert_eq!(score.get("false_positive"), Some(false));
    assert_eq!(score.get("correctly_identified_no_violation"), Some(true));
    assert_eq!(score.get("noted_cosmetic_only"), Some(true));
}

#[test]
fn fixtures_regenerate_byte_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FixtureStore::new(HarnessPaths::new(dir.path().to_path_buf()));
    let scenario = find("c").expect("registered");
    let source = EchoEvidence::default();

    let first = generate_fixtures(scenario, &source, &store).expect("first run");
    assert_eq!(first.len(), 2);
    let before: Vec<Vec<u8>> = first
        .iter()
        .map(|p| std::fs::read(p).expect("read"))
        .collect();

    let second = generate_fixtures(scenario, &source, &store).expect("second run");
    let after: Vec<Vec<u8>> = second
        .iter()
        .map(|p| std::fs::read(p).expect("read"))
        .collect();
    assert_eq!(first, second);
    assert_eq!(before, after);

    let loaded = store.load("c", Condition::TelosGit).expect("load");
    assert_eq!(
        loaded.get_str("telos_security_intents"),
        Some("<telos query intents --impact security --json>")
    );
}

#[test]
fn embedded_fixtures_need_no_project() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FixtureStore::new(HarnessPaths::new(dir.path().to_path_buf()));
    let scenario = find("p").expect("registered");
    generate_fixtures(scenario, &NoEvidence, &store).expect("generate");
    let record = store.load("p", Condition::GitOnly).expect("load");
    assert!(record
        .get_str("git_diff")
        .is_some_and(|diff| diff.starts_with("diff --git")));
}

fn any_criteria(scenario: &dyn Scenario) -> Vec<&'static str> {
    scenario
        .lexical_rules()
        .criteria
        .into_iter()
        .filter(|(_, rule)| matches!(rule, Rule::Any(_)))
        .map(|(name, _)| name)
        .collect()
}

proptest! {
    #[test]
    fn any_criteria_stay_met_when_text_is_added(
        index in 0usize..12,
        base in "[a-z0-9 .:_-]{0,80}",
        extra in "[a-zA-Z0-9 .:_-]{0,80}",
    ) {
        let scenario = all()[index];
        let scorer = lexical_scorer(scenario).expect("rules compile");
        let before = scorer.score(&base);
        let appended = scorer.score(&format!("{base}\n{extra}"));
        let prepended = scorer.score(&format!("{extra}\n{base}"));
        for name in any_criteria(scenario) {
            if before.get(name) == Some(true) {
                prop_assert_eq!(appended.get(name), Some(true));
                prop_assert_eq!(prepended.get(name), Some(true));
            }
        }
    }

    #[test]
    fn benign_replies_without_rejection_wording_are_not_false_positives(
        words in proptest::collection::vec(
            proptest::sample::select(BENIGN_WORDS.to_vec()),
            0..24,
        ),
        noise in "[a-z .,]{0,40}",
    ) {
        let reply = format!("{} {noise}", words.join(" "));
        let lowered = format!("{reply} approve").to_lowercase();
        prop_assume!(!REJECTION_WORDING.iter().any(|w| lowered.contains(w)));
        let scorer = lexical_scorer(&false_positive::BENIGN_REFACTOR).expect("rules compile");
        prop_assert_eq!(scorer.score(&reply).get("false_positive"), Some(false));
        let approving = scorer.score(&format!("{reply} approve"));
        prop_assert_eq!(approving.get("false_positive"), Some(false));
        prop_assert_eq!(approving.get("correctly_identified_no_violation"), Some(true));
    }
}

const REJECTION_WORDING: [&str; 7] = [
    "reject",
    "violat",
    "block",
    "revert",
    "should not",
    "cannot approve",
    "do not merge",
];

const BENIGN_WORDS: [&str; 20] = [
    "Rename", "variable", "doc", "comments", "LGTM", "looks", "fine", "token",
    "expiry", "unchanged", "constraint", "roles", "merge", "safe", "should",
    "not", "cannot", "violin", "3600", "refactor",
];
