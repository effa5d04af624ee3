//! Feature stages: ordered in-place annotators over the token sequence.
//!
//! The pipeline runs its stages in declaration order, each one enriching the
//! same mutable token slice. The built-in ordering is morphology first (so
//! normal forms are derived from the original surface), then case
//! normalization, then embeddings (so vectors are looked up on the
//! lowercased form).

use std::sync::Arc;

use super::embedder::WordEmbedder;
use super::tagger::{unify_letters, MorphTagger};
use super::token::Token;
use super::NluError;

/// One annotation pass over the token sequence.
pub trait FeatureStage: Send + Sync {
    /// Stage name, used in logs and error reports.
    fn name(&self) -> &str;

    /// Annotate `tokens` in place.
    ///
    /// # Errors
    ///
    /// Any error aborts the turn; partially annotated features are never
    /// cached or returned.
    fn annotate(&self, tokens: &mut [Token]) -> Result<(), NluError>;
}

/// Writes normal form and grammatical tags from the morphological tagger.
/// Normal forms are letter-unified so `ё` spellings collapse onto `е`.
pub struct MorphStage {
    tagger: Arc<dyn MorphTagger>,
}

impl MorphStage {
    pub fn new(tagger: Arc<dyn MorphTagger>) -> Self {
        Self { tagger }
    }
}

impl FeatureStage for MorphStage {
    fn name(&self) -> &str {
        "morph"
    }

    fn annotate(&self, tokens: &mut [Token]) -> Result<(), NluError> {
        for token in tokens.iter_mut() {
            let parse = self.tagger.parse_word(&token.text);
            token.normal_form = unify_letters(&parse.normal_form);
            token.morph_tags = parse.tags;
        }
        Ok(())
    }
}

/// Lowercases every surface form.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowercaseStage;

impl LowercaseStage {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureStage for LowercaseStage {
    fn name(&self) -> &str {
        "lowercase"
    }

    fn annotate(&self, tokens: &mut [Token]) -> Result<(), NluError> {
        for token in tokens.iter_mut() {
            token.text = token.text.to_lowercase();
        }
        Ok(())
    }
}

/// Attaches a per-word embedding vector to every token.
pub struct EmbeddingStage {
    embedder: Arc<dyn WordEmbedder>,
}

impl EmbeddingStage {
    pub fn new(embedder: Arc<dyn WordEmbedder>) -> Self {
        Self { embedder }
    }
}

impl FeatureStage for EmbeddingStage {
    fn name(&self) -> &str {
        "embedding"
    }

    fn annotate(&self, tokens: &mut [Token]) -> Result<(), NluError> {
        for token in tokens.iter_mut() {
            token.embedding = self.embedder.embed(&token.text);
        }
        Ok(())
    }
}
