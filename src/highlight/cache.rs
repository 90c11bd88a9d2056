//! Compiled-pattern cache.
//!
//! Highlighting rules are compiled lazily, once per rule key, and kept for
//! the lifetime of the owning [`super::Highlighter`]. Entries are never
//! evicted; the rule tables are fixed, so the cache is bounded by their size.

use std::collections::HashMap;

use regex::Regex;

use super::languages::{Rule, RuleSource};

#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: HashMap<&'static str, Option<Regex>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled regex for a rule; `None` if its pattern failed to compile.
    pub(crate) fn get(&mut self, rule: &Rule) -> Option<&Regex> {
        self.compiled
            .entry(rule.key)
            .or_insert_with(|| compile_rule(rule))
            .as_ref()
    }

    /// Number of rule keys compiled so far (including failures).
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

fn compile_rule(rule: &Rule) -> Option<Regex> {
    let pattern = pattern_source(&rule.source);
    match Regex::new(&pattern) {
        Ok(re) => {
            tracing::trace!(key = rule.key, "compiled highlight pattern");
            Some(re)
        }
        Err(err) => {
            tracing::warn!(key = rule.key, %err, "highlight pattern failed to compile");
            None
        }
    }
}

fn pattern_source(source: &RuleSource) -> String {
    match source {
        RuleSource::Pattern(pattern) => (*pattern).to_string(),
        RuleSource::Keywords {
            words,
            case_insensitive,
        } => keyword_pattern(words.iter().copied(), *case_insensitive),
        RuleSource::KeywordUnion(lists) => {
            let mut words: Vec<&str> = lists.iter().flat_map(|list| list.iter().copied()).collect();
            words.sort_unstable();
            words.dedup();
            keyword_pattern(words.into_iter(), false)
        }
    }
}

/// Whole-word alternation, longest words first so prefixes never shadow them.
fn keyword_pattern<'a>(words: impl Iterator<Item = &'a str>, case_insensitive: bool) -> String {
    let mut words: Vec<&str> = words.collect();
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    let flags = if case_insensitive { "(?i)" } else { "" };
    format!(r"{flags}\b(?:{alternation})\b")
}
