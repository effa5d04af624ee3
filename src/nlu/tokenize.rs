//! Sentence and word segmentation.
//!
//! The default implementation is regex-based and Unicode-aware: sentences are
//! split on terminal punctuation, words on letter/digit runs, with each
//! punctuation mark kept as its own token so downstream stages see the full
//! surface sequence.

use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]*").expect("invalid sentence regex"));

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+|[^\w\s]").expect("invalid word regex"));

/// Splits raw text into sentences and sentences into word tokens.
pub trait Tokenizer: Send + Sync {
    /// Split `text` into sentence strings, in order.
    fn sentences(&self, text: &str) -> Vec<String>;

    /// Split one sentence into word tokens, punctuation included.
    fn words(&self, sentence: &str) -> Vec<String>;
}

/// Default regex tokenizer, adequate for chat-length utterances.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexTokenizer;

impl RegexTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for RegexTokenizer {
    fn sentences(&self, text: &str) -> Vec<String> {
        SENTENCE_RE
            .find_iter(text)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn words(&self, sentence: &str) -> Vec<String> {
        WORD_RE
            .find_iter(sentence)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
