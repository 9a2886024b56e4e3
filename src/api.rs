use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::warn;

use crate::engine::{PatternTree, RunMetrics};
use crate::error::GraphmasterResult;
use crate::{Dimension, DimensionSet, Token, render_path};

/// Step budget used when none is configured.
pub const DEFAULT_STEP_BUDGET: usize = 100_000;

/// Environment variable read by [`Options::from_env`].
pub const STEP_BUDGET_ENV: &str = "GRAPHMASTER_STEP_BUDGET";

/// Options that affect matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Maximum node visits plus backtracks for a single match.
    pub step_budget: usize,
    /// Count successful matches on each category.
    pub record_activations: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { step_budget: DEFAULT_STEP_BUDGET, record_activations: true }
    }
}

impl Options {
    /// Defaults, with the step budget taken from `GRAPHMASTER_STEP_BUDGET`
    /// when it holds a valid number.
    pub fn from_env() -> Self {
        let mut options = Options::default();
        if let Ok(raw) = std::env::var(STEP_BUDGET_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(budget) => options.step_budget = budget,
                Err(err) => warn!(value = %raw, %err, "ignoring invalid {STEP_BUDGET_ENV}"),
            }
        }
        options
    }

    pub fn with_step_budget(mut self, step_budget: usize) -> Self {
        self.step_budget = step_budget;
        self
    }

    pub fn with_record_activations(mut self, record_activations: bool) -> Self {
        self.record_activations = record_activations;
        self
    }
}

/// A learned rule: its template handle plus bookkeeping for diagnostics.
///
/// The template is opaque to this crate; it is stored and handed back as is.
#[derive(Debug)]
pub struct Category<T> {
    pub template: T,
    pattern: String,
    that: String,
    topic: String,
    wildcards: DimensionSet,
    activations: AtomicU64,
}

impl<T> Category<T> {
    /// Build a category from its full token path (separators included).
    pub(crate) fn new(template: T, path: &[Token]) -> Self {
        let mut segments: [Vec<Token>; 3] = Default::default();
        let mut wildcards = DimensionSet::empty();
        let mut dimension = Dimension::Pattern;

        for token in path {
            match token {
                Token::ThatSep => dimension = Dimension::That,
                Token::TopicSep => dimension = Dimension::Topic,
                _ => {
                    if token.is_wildcard() {
                        wildcards |= dimension.as_flag();
                    }
                    segments[dimension.index()].push(token.clone());
                }
            }
        }

        let [pattern, that, topic] = segments.map(|s| render_path(&s));
        Category { template, pattern, that, topic, wildcards, activations: AtomicU64::new(0) }
    }

    /// Normalized pattern, e.g. `MY NAME IS _`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn that(&self) -> &str {
        &self.that
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Dimensions whose key contains `_` or `*`.
    pub fn wildcards(&self) -> DimensionSet {
        self.wildcards
    }

    /// How many matches have selected this category.
    pub fn activations(&self) -> u64 {
        self.activations.load(Ordering::Relaxed)
    }

    /// Counted through a shared reference so concurrent matches can update it.
    pub(crate) fn record_activation(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }
}

/// Text captured by wildcards, grouped by dimension in left-to-right order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stars {
    captured: [Vec<String>; 3],
}

impl Stars {
    pub fn get(&self, dimension: Dimension) -> &[String] {
        &self.captured[dimension.index()]
    }

    pub fn inputs(&self) -> &[String] {
        self.get(Dimension::Pattern)
    }

    pub fn thats(&self) -> &[String] {
        self.get(Dimension::That)
    }

    pub fn topics(&self) -> &[String] {
        self.get(Dimension::Topic)
    }

    /// The `index`-th input star, counting from 1. Out of range yields `""`.
    pub fn input(&self, index: usize) -> &str {
        self.nth(Dimension::Pattern, index)
    }

    /// The `index`-th that star, counting from 1. Out of range yields `""`.
    pub fn that(&self, index: usize) -> &str {
        self.nth(Dimension::That, index)
    }

    /// The `index`-th topic star, counting from 1. Out of range yields `""`.
    pub fn topic(&self, index: usize) -> &str {
        self.nth(Dimension::Topic, index)
    }

    pub fn is_empty(&self) -> bool {
        self.captured.iter().all(Vec::is_empty)
    }

    fn nth(&self, dimension: Dimension, index: usize) -> &str {
        index.checked_sub(1).and_then(|i| self.get(dimension).get(i)).map(String::as_str).unwrap_or("")
    }

    pub(crate) fn push(&mut self, dimension: Dimension, text: String) {
        self.captured[dimension.index()].push(text);
    }
}

/// A successful match.
#[derive(Debug, Clone)]
pub struct MatchResult<T> {
    pub template: T,
    pub stars: Stars,
    /// The learned path that matched, e.g. `HELLO _ <THAT> * <TOPIC> *`.
    pub path: String,
    pub metrics: RunMetrics,
}

/// Shape of the tree, for corpus inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeStats {
    pub nodes: usize,
    pub categories: usize,
    /// Fewest edges from the root to a node without children.
    pub height: u32,
    pub average_size: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationEntry {
    pub pattern: String,
    pub that: String,
    pub topic: String,
    pub activations: u64,
}

/// Snapshot of per-category activation counts.
#[derive(Debug, Clone)]
pub struct ActivationReport {
    pub generated_at: DateTime<Local>,
    /// Most activated first.
    pub entries: Vec<ActivationEntry>,
}

impl ActivationReport {
    pub fn total_activations(&self) -> u64 {
        self.entries.iter().map(|e| e.activations).sum()
    }

    /// Categories that have never been selected.
    pub fn unused(&self) -> impl Iterator<Item = &ActivationEntry> {
        self.entries.iter().filter(|e| e.activations == 0)
    }
}

/// A pattern tree shared between many concurrent conversations.
///
/// Matches take a shared lock for their whole traversal; `learn` and `forget`
/// take the exclusive lock for the complete mutation, statistics included. A
/// match therefore sees the tree either entirely before or entirely after any
/// given mutation.
///
/// ```
/// use graphmaster::Graphmaster;
///
/// let brain = Graphmaster::new();
/// brain.learn("*", "", "", 0).unwrap();
/// brain.learn("HELLO", "", "", 1).unwrap();
///
/// assert_eq!(brain.match_text("hello", "", "").unwrap().unwrap().template, 1);
/// assert_eq!(brain.match_text("goodbye", "", "").unwrap().unwrap().template, 0);
/// ```
#[derive(Debug)]
pub struct Graphmaster<T> {
    tree: RwLock<PatternTree<T>>,
    options: Options,
}

impl<T> Default for Graphmaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Graphmaster<T> {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Graphmaster { tree: RwLock::new(PatternTree::new()), options }
    }

    /// Wrap an already built tree.
    pub fn from_tree(tree: PatternTree<T>, options: Options) -> Self {
        Graphmaster { tree: RwLock::new(tree), options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// See [`PatternTree::learn`]. A returned template means an existing
    /// category was overwritten.
    #[tracing::instrument(level = "debug", skip_all, fields(pattern = %pattern))]
    pub fn learn(&self, pattern: &str, that: &str, topic: &str, template: T) -> GraphmasterResult<Option<T>> {
        self.tree.write().learn(pattern, that, topic, template)
    }

    /// See [`PatternTree::forget`].
    #[tracing::instrument(level = "debug", skip_all, fields(pattern = %pattern))]
    pub fn forget(&self, pattern: &str, that: &str, topic: &str) -> GraphmasterResult<T> {
        self.tree.write().forget(pattern, that, topic)
    }

    /// Match word sequences using the configured step budget.
    pub fn match_input<S: AsRef<str>>(
        &self,
        input: &[S],
        that: &[S],
        topic: &[S],
    ) -> GraphmasterResult<Option<MatchResult<T>>>
    where
        T: Clone,
    {
        self.tree.read().match_input(input, that, topic, &self.options)
    }

    /// Match word sequences with an explicit step budget for this call.
    pub fn match_with_budget<S: AsRef<str>>(
        &self,
        input: &[S],
        that: &[S],
        topic: &[S],
        step_budget: usize,
    ) -> GraphmasterResult<Option<MatchResult<T>>>
    where
        T: Clone,
    {
        let options = self.options.clone().with_step_budget(step_budget);
        self.tree.read().match_input(input, that, topic, &options)
    }

    /// Match whole sentences using the configured step budget.
    pub fn match_text(&self, input: &str, that: &str, topic: &str) -> GraphmasterResult<Option<MatchResult<T>>>
    where
        T: Clone,
    {
        self.tree.read().match_text(input, that, topic, &self.options)
    }

    pub fn len(&self) -> usize {
        self.tree.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.read().is_empty()
    }

    pub fn contains(&self, pattern: &str, that: &str, topic: &str) -> bool {
        self.tree.read().contains(pattern, that, topic)
    }

    pub fn stats(&self) -> TreeStats {
        self.tree.read().stats()
    }

    pub fn activation_report(&self) -> ActivationReport {
        let entries = self.tree.read().activations();
        ActivationReport { generated_at: Local::now(), entries }
    }

    /// Shared access to the tree for inspection. Writers wait until the guard
    /// is dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, PatternTree<T>> {
        self.tree.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn category_records_key_and_wildcards() {
        let mut tree = PatternTree::new();
        tree.learn("my name is _", "", "pets", "name").unwrap();
        let category = tree.get("MY NAME IS _", "*", "PETS").unwrap();

        assert_eq!((category.pattern(), category.that(), category.topic()), ("MY NAME IS _", "*", "PETS"));
        assert_eq!(category.wildcards(), DimensionSet::PATTERN | DimensionSet::THAT);
        assert_eq!(category.activations(), 0);
    }

    #[test]
    fn stars_are_one_based_and_default_to_empty() {
        let mut stars = Stars::default();
        assert!(stars.is_empty());
        stars.push(Dimension::Pattern, "Ada".into());
        stars.push(Dimension::Pattern, "Lovelace".into());
        stars.push(Dimension::Topic, "maths".into());

        assert_eq!(stars.input(1), "Ada");
        assert_eq!(stars.input(2), "Lovelace");
        assert_eq!(stars.input(0), "");
        assert_eq!(stars.input(3), "");
        assert_eq!(stars.that(1), "");
        assert_eq!(stars.topic(1), "maths");
        assert!(!stars.is_empty());
    }

    #[test]
    fn options_builders() {
        let options = Options::default().with_step_budget(10).with_record_activations(false);
        assert_eq!(options, Options { step_budget: 10, record_activations: false });
        assert_eq!(Options::default().step_budget, DEFAULT_STEP_BUDGET);
    }

    #[test]
    fn graphmaster_counts_activations() {
        let brain = Graphmaster::new();
        brain.learn("HELLO", "", "", "hi").unwrap();
        brain.learn("BYE", "", "", "bye").unwrap();
        for _ in 0..3 {
            brain.match_text("hello", "", "").unwrap().unwrap();
        }

        let report = brain.activation_report();
        assert_eq!(report.total_activations(), 3);
        assert_eq!(report.entries[0].pattern, "HELLO");
        assert_eq!(report.unused().map(|e| e.pattern.as_str()).collect::<Vec<_>>(), ["BYE"]);
    }

    #[test]
    fn activations_can_be_disabled() {
        let brain = Graphmaster::with_options(Options::default().with_record_activations(false));
        brain.learn("HELLO", "", "", ()).unwrap();
        brain.match_text("hello", "", "").unwrap().unwrap();
        assert_eq!(brain.activation_report().total_activations(), 0);
    }

    #[test]
    fn wraps_a_prebuilt_tree() {
        let tree = crate::tree! { "HELLO _" => "hello", "*" => "fallback" };
        let options = Options::default().with_step_budget(64);
        let brain = Graphmaster::from_tree(tree, options.clone());

        assert_eq!(brain.options(), &options);
        assert_eq!(brain.len(), 2);
        assert!(brain.contains("hello _", "", ""));
        assert!(brain.contains("*", "*", "*"));
        assert!(!brain.contains("HELLO", "", ""));
        assert_eq!(brain.match_text("hello world", "", "").unwrap().map(|m| m.template), Some("hello"));

        brain.forget("HELLO _", "", "").unwrap();
        assert!(!brain.contains("HELLO _", "", ""));
    }

    #[test]
    fn match_with_budget_overrides_configured_budget() {
        let brain = Graphmaster::new();
        brain.learn("HELLO", "", "", ()).unwrap();
        assert!(brain.match_with_budget(&["hello"], &[], &[], 1).is_err());
        assert!(brain.match_with_budget(&["hello"], &[], &[], 100).unwrap().is_some());
        assert!(brain.match_input(&["hello"], &[], &[]).unwrap().is_some());
    }
}
