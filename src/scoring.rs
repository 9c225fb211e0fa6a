//! Lexical scoring: fixed boolean criteria decided by phrase and pattern
//! membership in the lowercased response.
//!
//! The scorer is a pure function of (table, response). Any-of criteria are
//! monotone: adding text to a response never turns a satisfied criterion off.
pub mod rules;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use rules::{Indicator, Metric, Rule, RuleTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Criterion verdicts plus integer roll-ups for one response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LexicalScore {
    pub criteria: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, i64>,
}

impl LexicalScore {
    pub fn get(&self, criterion: &str) -> Option<bool> {
        self.criteria.get(criterion).copied()
    }

    pub fn metric(&self, name: &str) -> Option<i64> {
        self.metrics.get(name).copied()
    }
}

/// A rule table with its patterns compiled and references checked.
#[derive(Debug)]
pub struct LexicalScorer {
    table: RuleTable,
    patterns: HashMap<&'static str, Regex>,
}

impl LexicalScorer {
    pub fn new(table: RuleTable) -> Result<Self> {
        let mut patterns = HashMap::new();
        let mut indicators = Vec::new();
        for (_, rule) in &table.criteria {
            collect_rule_indicators(rule, &mut indicators);
        }
        for (_, metric) in &table.metrics {
            match metric {
                Metric::Coverage(list) => indicators.extend_from_slice(list),
                Metric::TriState { negative, positive } => {
                    collect_rule_indicators(negative, &mut indicators);
                    collect_rule_indicators(positive, &mut indicators);
                }
                Metric::Percent(_) | Metric::Mean(_) => {}
            }
        }
        for indicator in indicators {
            if let Indicator::Pattern(pattern) = indicator {
                if patterns.contains_key(pattern) {
                    continue;
                }
                let regex = Regex::new(&format!("(?s){pattern}"))
                    .with_context(|| format!("compile pattern {pattern:?}"))?;
                patterns.insert(pattern, regex);
            }
        }
        check_references(&table)?;
        Ok(Self { table, patterns })
    }

    pub fn criterion_names(&self) -> Vec<&'static str> {
        self.table.criterion_names()
    }

    pub fn score(&self, response: &str) -> LexicalScore {
        let text = response.to_lowercase();
        let mut criteria: BTreeMap<&str, bool> = BTreeMap::new();
        for (name, rule) in &self.table.criteria {
            let value = self.eval(rule, &text, &criteria);
            criteria.insert(*name, value);
        }

        let mut metrics: BTreeMap<&str, i64> = BTreeMap::new();
        for (name, metric) in &self.table.metrics {
            let value = match metric {
                Metric::Percent(names) => {
                    let held = names
                        .iter()
                        .filter(|n| criteria.get(*n).copied().unwrap_or(false))
                        .count();
                    floor_percent(held, names.len())
                }
                Metric::Coverage(list) => {
                    floor_percent(self.count_matches(list, &text), list.len())
                }
                Metric::Mean(names) => {
                    let values: Vec<i64> = names
                        .iter()
                        .filter_map(|n| metrics.get(*n).copied())
                        .collect();
                    if values.is_empty() {
                        0
                    } else {
                        values.iter().sum::<i64>().div_euclid(values.len() as i64)
                    }
                }
                Metric::TriState { negative, positive } => {
                    if self.eval(negative, &text, &criteria) {
                        -1
                    } else if self.eval(positive, &text, &criteria) {
                        1
                    } else {
                        0
                    }
                }
            };
            metrics.insert(*name, value);
        }

        LexicalScore {
            criteria: criteria
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            metrics: metrics
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    fn eval(&self, rule: &Rule, text: &str, done: &BTreeMap<&str, bool>) -> bool {
        match rule {
            Rule::Any(list) => list.iter().any(|ind| self.matches(ind, text)),
            Rule::AtLeast { min, indicators } => self.count_matches(indicators, text) >= *min,
            Rule::All(rules) => rules.iter().all(|r| self.eval(r, text, done)),
            Rule::Either(rules) => rules.iter().any(|r| self.eval(r, text, done)),
            Rule::Ref(name) => done.get(name).copied().unwrap_or(false),
            Rule::Not(inner) => !self.eval(inner, text, done),
        }
    }

    fn count_matches(&self, list: &[Indicator], text: &str) -> usize {
        let distinct: BTreeSet<&Indicator> = list.iter().collect();
        distinct
            .into_iter()
            .filter(|ind| self.matches(ind, text))
            .count()
    }

    fn matches(&self, indicator: &Indicator, text: &str) -> bool {
        match indicator {
            Indicator::Phrase(phrase) => text.contains(phrase),
            Indicator::Pattern(pattern) => self
                .patterns
                .get(pattern)
                .is_some_and(|regex| regex.is_match(text)),
        }
    }
}

fn floor_percent(part: usize, whole: usize) -> i64 {
    if whole == 0 {
        return 0;
    }
    ((part * 100 / whole) as i64).min(100)
}

fn collect_rule_indicators(rule: &Rule, out: &mut Vec<Indicator>) {
    match rule {
        Rule::Any(list) => out.extend_from_slice(list),
        Rule::AtLeast { indicators, .. } => out.extend_from_slice(indicators),
        Rule::All(rules) | Rule::Either(rules) => {
            for rule in rules {
                collect_rule_indicators(rule, out);
            }
        }
        Rule::Not(inner) => collect_rule_indicators(inner, out),
        Rule::Ref(_) => {}
    }
}

fn check_references(table: &RuleTable) -> Result<()> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for (name, rule) in &table.criteria {
        check_rule_refs(rule, &seen).with_context(|| format!("criterion {name}"))?;
        if !seen.insert(*name) {
            return Err(anyhow!("duplicate criterion {name}"));
        }
    }
    let mut seen_metrics: BTreeSet<&str> = BTreeSet::new();
    for (name, metric) in &table.metrics {
        match metric {
            Metric::Percent(names) => {
                if let Some(missing) = names.iter().find(|n| !seen.contains(*n)) {
                    return Err(anyhow!("metric {name} refers to unknown criterion {missing}"));
                }
            }
            Metric::Mean(names) => {
                if let Some(missing) = names.iter().find(|n| !seen_metrics.contains(*n)) {
                    return Err(anyhow!("metric {name} refers to unknown metric {missing}"));
                }
            }
            Metric::TriState { negative, positive } => {
                check_rule_refs(negative, &seen).with_context(|| format!("metric {name}"))?;
                check_rule_refs(positive, &seen).with_context(|| format!("metric {name}"))?;
            }
            Metric::Coverage(_) => {}
        }
        if !seen_metrics.insert(*name) {
            return Err(anyhow!("duplicate metric {name}"));
        }
    }
    Ok(())
}

fn check_rule_refs(rule: &Rule, seen: &BTreeSet<&str>) -> Result<()> {
    match rule {
        Rule::Ref(name) if !seen.contains(name) => {
            Err(anyhow!("reference to undeclared criterion {name}"))
        }
        Rule::All(rules) | Rule::Either(rules) => {
            rules.iter().try_for_each(|r| check_rule_refs(r, seen))
        }
        Rule::Not(inner) => check_rule_refs(inner, seen),
        _ => Ok(()),
    }
}
