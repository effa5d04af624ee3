//! The feature pipeline: raw text in, memoized [`TurnFeatures`] out.

use std::sync::Arc;

use crate::nlu::cache::FeatureCache;
use crate::nlu::embedder::WordEmbedder;
use crate::nlu::stage::{EmbeddingStage, FeatureStage, LowercaseStage, MorphStage};
use crate::nlu::tagger::MorphTagger;
use crate::nlu::token::{Embedding, Token, TurnFeatures};
use crate::nlu::tokenize::Tokenizer;
use crate::nlu::NluError;

/// Tokenizes an utterance, runs the configured feature stages in order, and
/// stacks per-token vectors into the request-level embedding. Results are
/// memoized per exact input string; repeated calls for the same text return
/// the same shared value without recomputation.
pub struct FeaturePipeline {
    tokenizer: Arc<dyn Tokenizer>,
    stages: Vec<Box<dyn FeatureStage>>,
    cache: FeatureCache,
}

impl FeaturePipeline {
    /// Build a pipeline with an explicit stage list. Stages run in the order
    /// given.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, stages: Vec<Box<dyn FeatureStage>>) -> Self {
        Self {
            tokenizer,
            stages,
            cache: FeatureCache::new(),
        }
    }

    /// Standard stage order: morphology, case normalization, embeddings.
    pub fn with_default_stages(
        tokenizer: Arc<dyn Tokenizer>,
        tagger: Arc<dyn MorphTagger>,
        embedder: Arc<dyn WordEmbedder>,
    ) -> Self {
        Self::new(
            tokenizer,
            vec![
                Box::new(MorphStage::new(tagger)),
                Box::new(LowercaseStage::new()),
                Box::new(EmbeddingStage::new(embedder)),
            ],
        )
    }

    /// Extract features for one utterance.
    ///
    /// Sentences are segmented and word-tokenized, then every stage annotates
    /// the merged token sequence in place. An empty or whitespace-only input
    /// yields an empty token list and an empty embedding, which downstream
    /// consumers treat as "nothing recognized".
    ///
    /// # Errors
    ///
    /// Any stage failure or embedding-width mismatch aborts the turn; nothing
    /// is cached for the failed input.
    pub fn feed(&self, text: &str) -> Result<Arc<TurnFeatures>, NluError> {
        if let Some(hit) = self.cache.read(text) {
            log::debug!("feature cache hit for {:?}", text);
            return Ok(hit);
        }

        let mut tokens: Vec<Token> = Vec::new();
        for sentence in self.tokenizer.sentences(text) {
            for word in self.tokenizer.words(&sentence) {
                tokens.push(Token::new(word));
            }
        }

        for stage in &self.stages {
            stage.annotate(&mut tokens).map_err(|e| {
                log::error!("feature stage '{}' failed: {}", stage.name(), e);
                e
            })?;
        }

        let embedding = Embedding::stack(&tokens)?;
        let features = Arc::new(TurnFeatures { embedding, tokens });
        self.cache.add(text, features.clone());
        Ok(features)
    }

    /// The underlying memo cache, e.g. to clear it after a vocabulary reload.
    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlu::embedder::HashingEmbedder;
    use crate::nlu::tagger::CaseFoldTagger;
    use crate::nlu::tokenize::RegexTokenizer;

    fn pipeline() -> FeaturePipeline {
        FeaturePipeline::with_default_stages(
            Arc::new(RegexTokenizer::new()),
            Arc::new(CaseFoldTagger::new()),
            Arc::new(HashingEmbedder::new(8)),
        )
    }

    #[test]
    fn test_feed_annotates_tokens() {
        let p = pipeline();
        let features = p.feed("Добрый день! Хочу открыть счёт").unwrap();
        let words = features.surface_forms();
        assert_eq!(
            words,
            vec!["добрый", "день", "!", "хочу", "открыть", "счёт"]
        );
        // The tagger runs before lowercasing, letter unification applies to
        // normal forms only.
        assert_eq!(features.tokens[5].normal_form, "счет");
        assert_eq!(features.embedding.rows, 6);
        assert_eq!(features.embedding.dim, 8);
    }

    #[test]
    fn test_feed_is_memoized() {
        let p = pipeline();
        let first = p.feed("хочу евро").unwrap();
        let second = p.feed("хочу евро").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(p.cache().len(), 1);
    }

    #[test]
    fn test_feed_repeat_equals_fresh() {
        let p = pipeline();
        let cached = p.feed("сколько стоит доллар?").unwrap();
        let fresh = pipeline().feed("сколько стоит доллар?").unwrap();
        assert_eq!(*cached, *fresh);
    }

    #[test]
    fn test_empty_input_yields_empty_features() {
        let p = pipeline();
        let features = p.feed("   ").unwrap();
        assert!(features.tokens.is_empty());
        assert!(features.embedding.is_empty());
    }

    struct FailingStage;

    impl FeatureStage for FailingStage {
        fn name(&self) -> &str {
            "failing"
        }

        fn annotate(&self, _tokens: &mut [Token]) -> Result<(), NluError> {
            Err(NluError::Stage {
                stage: "failing".into(),
                message: "backend unavailable".into(),
            })
        }
    }

    #[test]
    fn test_stage_error_propagates_and_skips_cache() {
        let p = FeaturePipeline::new(
            Arc::new(RegexTokenizer::new()),
            vec![Box::new(FailingStage)],
        );
        let err = p.feed("что угодно").unwrap_err();
        assert!(matches!(err, NluError::Stage { ref stage, .. } if stage == "failing"));
        assert!(p.cache().is_empty());
    }
}
