//! Morphological analysis seam.
//!
//! A [`MorphTagger`] maps a single word to its top-ranked parse: dictionary
//! normal form plus grammatical tags. Real deployments plug in a bindings
//! wrapper around a morphological analyzer; [`CaseFoldTagger`] is the
//! dependency-free default that folds case and unifies letters without
//! producing tags.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Replace every `ё` with `е` so lookups are stable across spelling variants.
pub fn unify_letters(word: &str) -> String {
    word.replace('ё', "е").replace('Ё', "Е")
}

/// Top-ranked parse of one word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphParse {
    /// Dictionary normal form (lemma).
    pub normal_form: String,
    /// Grammatical tags, e.g. case or number markers.
    pub tags: BTreeSet<String>,
}

/// Per-word morphological analyzer.
pub trait MorphTagger: Send + Sync {
    /// Parse one word. Out-of-vocabulary words still get a parse; analyzers
    /// fall back to the surface form as its own normal form.
    fn parse_word(&self, word: &str) -> MorphParse;
}

/// Fallback tagger: lowercases the surface form as the normal form and emits
/// no tags. Letter unification is applied downstream by the pipeline stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseFoldTagger;

impl CaseFoldTagger {
    pub fn new() -> Self {
        Self
    }
}

impl MorphTagger for CaseFoldTagger {
    fn parse_word(&self, word: &str) -> MorphParse {
        MorphParse {
            normal_form: word.to_lowercase(),
            tags: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unify_letters() {
        assert_eq!(unify_letters("счёт"), "счет");
        assert_eq!(unify_letters("Ёлка"), "Елка");
        assert_eq!(unify_letters("евро"), "евро");
    }

    #[test]
    fn test_case_fold_tagger() {
        let tagger = CaseFoldTagger::new();
        let parse = tagger.parse_word("Евро");
        assert_eq!(parse.normal_form, "евро");
        assert!(parse.tags.is_empty());
    }
}
