//! Token and feature types produced by the linguistic pipeline.
//!
//! A [`Token`] starts as a bare surface form and is enriched in place by the
//! pipeline's feature stages: normal form and grammatical tags from the
//! morphological tagger, a lowercased surface form, and a per-word embedding
//! vector. [`TurnFeatures`] bundles the finished token sequence with the
//! request-level [`Embedding`] aggregate and is shared read-only behind an
//! `Arc` through the memo cache.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::NluError;

/// One word (or punctuation mark) of the utterance with its features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Surface form. Lowercased once the case-normalization stage has run.
    pub text: String,
    /// Dictionary normal form (lemma), letter-unified. Empty until the
    /// morphological stage has run.
    #[serde(default)]
    pub normal_form: String,
    /// Grammatical tags from the tagger's top-ranked parse.
    #[serde(default)]
    pub morph_tags: BTreeSet<String>,
    /// Per-word embedding vector. May be empty for out-of-vocabulary words;
    /// empty vectors are skipped during aggregation.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Token {
    /// Create a bare token from a surface form; features are added by stages.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            normal_form: String::new(),
            morph_tags: BTreeSet::new(),
            embedding: Vec::new(),
        }
    }

    /// Whether the tagger has annotated this token.
    pub fn is_tagged(&self) -> bool {
        !self.normal_form.is_empty()
    }
}

/// Request-level embedding: per-token vectors stacked row-wise into one
/// row-major matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Number of stacked token vectors.
    pub rows: usize,
    /// Width of each row.
    pub dim: usize,
    /// Row-major matrix data, `rows * dim` values.
    pub data: Vec<f32>,
}

impl Embedding {
    /// An embedding with no rows (e.g. every token was out of vocabulary).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Stack the non-empty per-token vectors of `tokens` into one matrix.
    ///
    /// Tokens whose embedding is empty are skipped; if all are empty the
    /// result is [`Embedding::empty`], which is a valid value, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`NluError::DimensionMismatch`] when two tokens carry vectors
    /// of different widths.
    pub fn stack(tokens: &[Token]) -> Result<Self, NluError> {
        let mut rows = 0usize;
        let mut dim = 0usize;
        let mut data = Vec::new();

        for token in tokens {
            if token.embedding.is_empty() {
                continue;
            }
            if rows == 0 {
                dim = token.embedding.len();
            } else if token.embedding.len() != dim {
                return Err(NluError::DimensionMismatch {
                    expected: dim,
                    got: token.embedding.len(),
                });
            }
            data.extend_from_slice(&token.embedding);
            rows += 1;
        }

        Ok(Self { rows, dim, data })
    }

    /// Whether the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow row `i`, if present.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i < self.rows {
            Some(&self.data[i * self.dim..(i + 1) * self.dim])
        } else {
            None
        }
    }
}

/// Everything the pipeline extracted from one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnFeatures {
    /// Stacked request-level embedding.
    pub embedding: Embedding,
    /// Token sequence in utterance order, all sentences merged.
    pub tokens: Vec<Token>,
}

impl TurnFeatures {
    /// Surface forms in order, mainly for logging and tests.
    pub fn surface_forms(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}
