//! Classifier seams for intent detection and model-backed slots.
//!
//! Both traits consume the annotated token sequence and return a label, or
//! `None` when nothing scores high enough. Real deployments plug in trained
//! models over the stacked embedding; [`KeywordClassifier`] is the
//! dependency-free default used by the demo binary and the test suite.

use crate::nlu::{unify_letters, Token};

/// Detects which route the user wants to follow.
pub trait IntentClassifier: Send + Sync {
    /// Returns the intent label, or `None` when no intent is recognized.
    fn classify(&self, tokens: &[Token]) -> Option<String>;
}

/// Extracts one canonical slot value from the token sequence.
pub trait SlotClassifier: Send + Sync {
    /// Returns the canonical value, or `None` when the slot is not mentioned.
    fn classify(&self, tokens: &[Token]) -> Option<String>;
}

/// Scores labels by keyword overlap with surface forms and normal forms.
/// Labels are checked in registration order, so ties resolve
/// deterministically to the earliest label.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    labels: Vec<(String, Vec<String>)>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a label with its keywords. Keywords are lowercased and
    /// letter-unified so they match pipeline output.
    pub fn with_label(mut self, label: impl Into<String>, keywords: &[&str]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| unify_letters(&k.to_lowercase()))
            .collect();
        self.labels.push((label.into(), keywords));
        self
    }

    /// Labels this classifier can emit, in registration order. Startup code
    /// checks them against the route table so an unreachable route or an
    /// unroutable intent fails loudly instead of at runtime.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|(label, _)| label.as_str())
    }

    fn score(&self, keywords: &[String], tokens: &[Token]) -> usize {
        tokens
            .iter()
            .filter(|t| {
                keywords
                    .iter()
                    .any(|k| *k == t.text || *k == t.normal_form)
            })
            .count()
    }

    fn best(&self, tokens: &[Token]) -> Option<String> {
        let mut best: Option<(&str, usize)> = None;
        for (label, keywords) in &self.labels {
            let score = self.score(keywords, tokens);
            if score == 0 {
                continue;
            }
            match best {
                Some((_, top)) if top >= score => {}
                _ => best = Some((label, score)),
            }
        }
        best.map(|(label, _)| label.to_string())
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, tokens: &[Token]) -> Option<String> {
        self.best(tokens)
    }
}

impl SlotClassifier for KeywordClassifier {
    fn classify(&self, tokens: &[Token]) -> Option<String> {
        self.best(tokens)
    }
}
