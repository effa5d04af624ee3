//! Linguistic feature extraction.
//!
//! Turns raw utterance text into a token sequence with normal forms,
//! grammatical tags, and embedding vectors, plus a stacked request-level
//! embedding. Tokenizer, tagger, and embedder are trait seams so deployments
//! can swap in real language backends.

pub mod cache;
pub mod embedder;
pub mod pipeline;
pub mod stage;
pub mod tagger;
pub mod token;
pub mod tokenize;

pub use cache::FeatureCache;
pub use embedder::{HashingEmbedder, WordEmbedder};
pub use pipeline::FeaturePipeline;
pub use stage::{EmbeddingStage, FeatureStage, LowercaseStage, MorphStage};
pub use tagger::{unify_letters, CaseFoldTagger, MorphParse, MorphTagger};
pub use token::{Embedding, Token, TurnFeatures};
pub use tokenize::{RegexTokenizer, Tokenizer};

use thiserror::Error;

/// Errors from feature extraction. Any of these aborts the current turn;
/// the dialog layer answers with a service phrase instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NluError {
    /// A feature stage failed, e.g. a language backend went away.
    #[error("feature stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// Token vectors of different widths cannot be stacked.
    #[error("embedding width mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
