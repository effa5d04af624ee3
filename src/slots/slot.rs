//! Slot definitions and value inference.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::nlu::Token;
use crate::slots::classifier::SlotClassifier;

/// How a slot extracts its value from the token sequence.
pub enum SlotStrategy {
    /// Synonym lookup: surface variant (lowercased, letter-unified) to
    /// canonical value.
    Dictionary(HashMap<String, String>),
    /// Model-backed extraction over the annotated tokens.
    Classifier(Arc<dyn SlotClassifier>),
}

impl fmt::Debug for SlotStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dictionary(map) => write!(f, "Dictionary({} variants)", map.len()),
            Self::Classifier(_) => write!(f, "Classifier"),
        }
    }
}

/// One unit of information the dialog needs to collect, with the question
/// used to ask for it.
#[derive(Debug)]
pub struct Slot {
    /// Stable identifier referenced by route graphs.
    pub id: String,
    /// Question posed when the policy decides this slot must be asked.
    pub prompt: String,
    strategy: SlotStrategy,
}

impl Slot {
    /// A dictionary slot over a prebuilt synonym map.
    pub fn dictionary(
        id: impl Into<String>,
        prompt: impl Into<String>,
        synonyms: HashMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            strategy: SlotStrategy::Dictionary(synonyms),
        }
    }

    /// A classifier slot backed by `model`.
    pub fn classifier(
        id: impl Into<String>,
        prompt: impl Into<String>,
        model: Arc<dyn SlotClassifier>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            strategy: SlotStrategy::Classifier(model),
        }
    }

    /// Try to extract this slot's canonical value from the tokens.
    ///
    /// Dictionary slots check each token's surface form, then its normal
    /// form; the first token that hits wins. Classifier slots defer to the
    /// model. Returns `None` when the utterance does not mention the slot.
    pub fn infer(&self, tokens: &[Token]) -> Option<String> {
        match &self.strategy {
            SlotStrategy::Dictionary(map) => tokens
                .iter()
                .find_map(|t| map.get(&t.text).or_else(|| map.get(&t.normal_form)))
                .cloned(),
            SlotStrategy::Classifier(model) => model.classify(tokens),
        }
    }
}
