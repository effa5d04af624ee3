//! Slot-class registry: explicit mapping from class names in the slot table
//! to slot constructors.
//!
//! A table header names its class (`currency.DictionarySlot`); the registry
//! resolves that name to a builder closure. Referencing a class that was
//! never registered is a startup-fatal error, so a typo in the table surfaces
//! immediately instead of producing a half-configured engine.

use std::collections::HashMap;
use std::sync::Arc;

use crate::slots::classifier::KeywordClassifier;
use crate::slots::slot::Slot;
use crate::slots::table::{SlotDefinition, SlotLoadError};

/// Builds a [`Slot`] from its parsed definition.
pub type SlotBuilder = Box<dyn Fn(&SlotDefinition) -> Result<Slot, SlotLoadError> + Send + Sync>;

/// Name-to-builder table for slot classes.
#[derive(Default)]
pub struct SlotClassRegistry {
    builders: HashMap<String, SlotBuilder>,
}

impl SlotClassRegistry {
    /// An empty registry. Most callers want [`SlotClassRegistry::with_defaults`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in classes:
    ///
    /// * `DictionarySlot`: synonym lookup over the block's value rows.
    /// * `ClassifierSlot`: keyword scoring over the same rows. Deployments
    ///   with trained models re-register this name with their own builder.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("DictionarySlot", |def| {
            Ok(Slot::dictionary(&def.id, &def.prompt, def.synonym_map()))
        });
        registry.register("ClassifierSlot", |def| {
            let mut model = KeywordClassifier::new();
            for row in &def.values {
                let keywords: Vec<&str> = std::iter::once(row.canonical.as_str())
                    .chain(row.synonyms.iter().map(String::as_str))
                    .collect();
                model = model.with_label(&row.canonical, &keywords);
            }
            Ok(Slot::classifier(&def.id, &def.prompt, Arc::new(model)))
        });
        registry
    }

    /// Register (or replace) a class builder.
    pub fn register<F>(&mut self, class: impl Into<String>, builder: F)
    where
        F: Fn(&SlotDefinition) -> Result<Slot, SlotLoadError> + Send + Sync + 'static,
    {
        self.builders.insert(class.into(), Box::new(builder));
    }

    pub fn contains(&self, class: &str) -> bool {
        self.builders.contains_key(class)
    }

    /// Build one slot.
    ///
    /// # Errors
    ///
    /// [`SlotLoadError::UnknownSlotClass`] when the definition names a class
    /// nobody registered.
    pub fn build(&self, def: &SlotDefinition) -> Result<Slot, SlotLoadError> {
        let builder = self
            .builders
            .get(&def.class)
            .ok_or_else(|| SlotLoadError::UnknownSlotClass {
                id: def.id.clone(),
                class: def.class.clone(),
            })?;
        builder(def)
    }

    /// Build every definition, preserving table order.
    pub fn build_all(&self, defs: &[SlotDefinition]) -> Result<Vec<Arc<Slot>>, SlotLoadError> {
        defs.iter()
            .map(|def| self.build(def).map(Arc::new))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::nlu::Token;
    use crate::slots::table::parse_slot_table;

    fn definitions() -> Vec<SlotDefinition> {
        parse_slot_table(
            "currency.DictionarySlot\tКакая валюта?\nEUR\tевро\nUSD\tдоллар\n\n\
             branch.ClassifierSlot\tКакое отделение?\ncenter\tцентр, центральное\n",
        )
        .unwrap()
    }

    fn token(text: &str) -> Token {
        let mut t = Token::new(text);
        t.normal_form = text.to_string();
        t
    }

    #[test]
    fn test_build_dictionary_slot() {
        let registry = SlotClassRegistry::with_defaults();
        let slots = registry.build_all(&definitions()).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].id, "currency");
        assert_eq!(slots[0].infer(&[token("евро")]).as_deref(), Some("EUR"));
    }

    #[test]
    fn test_default_classifier_slot_uses_keywords() {
        let registry = SlotClassRegistry::with_defaults();
        let slots = registry.build_all(&definitions()).unwrap();
        assert_eq!(
            slots[1].infer(&[token("центр")]).as_deref(),
            Some("center")
        );
        assert_eq!(slots[1].infer(&[token("окраина")]), None);
    }

    #[test]
    fn test_unknown_class_is_fatal() {
        let registry = SlotClassRegistry::with_defaults();
        let defs =
            parse_slot_table("location.GeoSlot\tГде вы находитесь?\nmoscow\tмосква\n").unwrap();
        let err = registry.build_all(&defs).unwrap_err();
        assert!(matches!(
            err,
            SlotLoadError::UnknownSlotClass { ref id, ref class }
                if id == "location" && class == "GeoSlot"
        ));
    }

    #[test]
    fn test_custom_class_registration() {
        let mut registry = SlotClassRegistry::new();
        registry.register("EchoSlot", |def| {
            Ok(Slot::dictionary(
                &def.id,
                &def.prompt,
                HashMap::from([("да".to_string(), "yes".to_string())]),
            ))
        });
        let defs = parse_slot_table("confirm.EchoSlot\tПодтверждаете?\nyes\tда\n").unwrap();
        let slot = registry.build(&defs[0]).unwrap();
        assert_eq!(slot.infer(&[token("да")]).as_deref(), Some("yes"));
    }
}
