//! Declarative vocabulary for lexical scoring tables.
//!
//! Scenarios describe their criteria as data; one interpreter in
//! [`super::LexicalScorer`] evaluates every table the same way.

/// One thing to look for in the lowercased response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Indicator {
    /// Literal substring.
    Phrase(&'static str),
    /// Regular expression; `.` also matches newlines.
    Pattern(&'static str),
}

pub use Indicator::{Pattern, Phrase};

/// Boolean criterion definition.
#[derive(Debug, Clone)]
pub enum Rule {
    /// True if any indicator matches.
    Any(&'static [Indicator]),
    /// True if at least `min` distinct indicators match.
    AtLeast {
        min: usize,
        indicators: &'static [Indicator],
    },
    /// True if every sub-rule holds.
    All(Vec<Rule>),
    /// True if some sub-rule holds.
    Either(Vec<Rule>),
    /// Value of a criterion declared earlier in the same table.
    Ref(&'static str),
    /// Negation of a sub-rule.
    Not(Box<Rule>),
}

impl Rule {
    pub fn not(rule: Rule) -> Rule {
        Rule::Not(Box::new(rule))
    }
}

/// Integer roll-up reported next to the boolean criteria.
#[derive(Debug, Clone)]
pub enum Metric {
    /// Floor percentage of the named criteria that hold.
    Percent(&'static [&'static str]),
    /// Floor percentage of distinct indicators matched, capped at 100.
    Coverage(&'static [Indicator]),
    /// Floor mean of metrics declared earlier in the table.
    Mean(&'static [&'static str]),
    /// -1 when `negative` holds, else 1 when `positive` holds, else 0.
    TriState { negative: Rule, positive: Rule },
}

/// Ordered criteria and metrics for one scenario.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    pub criteria: Vec<(&'static str, Rule)>,
    pub metrics: Vec<(&'static str, Metric)>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criterion(mut self, name: &'static str, rule: Rule) -> Self {
        self.criteria.push((name, rule));
        self
    }

    pub fn metric(mut self, name: &'static str, metric: Metric) -> Self {
        self.metrics.push((name, metric));
        self
    }

    pub fn criterion_names(&self) -> Vec<&'static str> {
        self.criteria.iter().map(|(name, _)| *name).collect()
    }
}

/// Rejection wording shared by the review scenarios.
pub const REJECTION: &[Indicator] = &[
    Phrase("reject"),
    Phrase("should not"),
    Phrase("cannot approve"),
    Phrase("do not merge"),
    Phrase("block"),
    Phrase("revert"),
];

/// Rejection wording for changes that should be approved; naming a
/// violation counts as rejecting.
pub const REJECTION_OR_VIOLATION: &[Indicator] = &[
    Phrase("reject"),
    Phrase("should not"),
    Phrase("cannot approve"),
    Phrase("do not merge"),
    Phrase("block"),
    Phrase("revert"),
    Phrase("violation"),
    Phrase("violates"),
];
