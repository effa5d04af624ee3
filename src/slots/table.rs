//! Tab-separated slot table: the declarative source of slot definitions.
//!
//! The format is block-oriented. Each block starts with a header line
//! `slot_id.SlotClass<TAB>prompt`, followed by one value row per canonical
//! value, and blocks are separated by blank lines:
//!
//! ```text
//! currency.DictionarySlot	Какая валюта вас интересует?
//! EUR	евро, eur
//! USD	доллар, долларов, usd
//!
//! account_type.DictionarySlot	Какой счет вы хотите открыть?
//! checking	текущий, расчетный
//! ```
//!
//! A value row is either the canonical value alone or the canonical value
//! plus one tab-separated field holding comma-separated surface variants.
//! Anything else is a startup-fatal parse error: a broken vocabulary must
//! never be silently skipped.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nlu::unify_letters;

/// Errors raised while loading slot definitions. All are fatal at startup.
#[derive(Debug, Error)]
pub enum SlotLoadError {
    #[error("failed to read slot table: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed header at line {line}: {content:?} (expected 'id.Class<TAB>prompt')")]
    MalformedHeader { line: usize, content: String },

    #[error("malformed value row at line {line}: {content:?} (at most one synonym field allowed)")]
    MalformedRow { line: usize, content: String },

    #[error("duplicate slot id '{id}' at line {line}")]
    DuplicateSlot { id: String, line: usize },

    #[error("unknown slot class '{class}' for slot '{id}'")]
    UnknownSlotClass { id: String, class: String },
}

/// One canonical value with its surface variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotValueRow {
    pub canonical: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// Parsed slot block, not yet bound to an extraction strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDefinition {
    /// Identifier referenced by route graphs.
    pub id: String,
    /// Slot-class name, resolved through the class registry.
    pub class: String,
    /// Question used when the slot must be asked.
    pub prompt: String,
    /// Canonical values with their variants.
    pub values: Vec<SlotValueRow>,
}

impl SlotDefinition {
    /// Build the lookup dictionary: every canonical value and every variant,
    /// lowercased and letter-unified, maps to the canonical value as written.
    pub fn synonym_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for row in &self.values {
            map.insert(normalize_key(&row.canonical), row.canonical.clone());
            for syn in &row.synonyms {
                map.insert(normalize_key(syn), row.canonical.clone());
            }
        }
        map
    }
}

fn normalize_key(s: &str) -> String {
    unify_letters(&s.to_lowercase())
}

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// Parse slot definitions from TSV text.
///
/// # Errors
///
/// Returns the first structural problem found, with its 1-based line number.
pub fn parse_slot_table(input: &str) -> Result<Vec<SlotDefinition>, SlotLoadError> {
    let mut definitions: Vec<SlotDefinition> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current: Option<SlotDefinition> = None;

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();

        if line.trim().is_empty() {
            if let Some(def) = current.take() {
                definitions.push(def);
            }
            continue;
        }
        if line.trim_start().starts_with('#') {
            continue;
        }

        match current.as_mut() {
            None => {
                let def = parse_header(line, line_no)?;
                if !seen.insert(def.id.clone()) {
                    return Err(SlotLoadError::DuplicateSlot {
                        id: def.id,
                        line: line_no,
                    });
                }
                current = Some(def);
            }
            Some(def) => {
                def.values.push(parse_value_row(line, line_no)?);
            }
        }
    }
    if let Some(def) = current.take() {
        definitions.push(def);
    }

    log::info!("loaded {} slot definitions", definitions.len());
    Ok(definitions)
}

/// Load slot definitions from a file.
pub fn read_slot_table(path: impl AsRef<Path>) -> Result<Vec<SlotDefinition>, SlotLoadError> {
    let text = fs::read_to_string(path)?;
    parse_slot_table(&text)
}

fn parse_header(line: &str, line_no: usize) -> Result<SlotDefinition, SlotLoadError> {
    let malformed = || SlotLoadError::MalformedHeader {
        line: line_no,
        content: line.to_string(),
    };

    let (name, prompt) = line.split_once('\t').ok_or_else(malformed)?;
    let (id, class) = name.trim().rsplit_once('.').ok_or_else(malformed)?;
    if id.is_empty() || class.is_empty() || prompt.trim().is_empty() {
        return Err(malformed());
    }

    Ok(SlotDefinition {
        id: id.to_string(),
        class: class.to_string(),
        prompt: prompt.trim().to_string(),
        values: Vec::new(),
    })
}

fn parse_value_row(line: &str, line_no: usize) -> Result<SlotValueRow, SlotLoadError> {
    let fields: Vec<&str> = line.split('\t').collect();
    match fields.as_slice() {
        [canonical] => Ok(SlotValueRow {
            canonical: canonical.trim().to_string(),
            synonyms: Vec::new(),
        }),
        [canonical, synonyms] => Ok(SlotValueRow {
            canonical: canonical.trim().to_string(),
            synonyms: synonyms
                .split(',')
                .map(strip_quotes)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }),
        _ => Err(SlotLoadError::MalformedRow {
            line: line_no,
            content: line.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
currency.DictionarySlot\tКакая валюта вас интересует?
EUR\tевро, eur
USD\tдоллар, долларов, usd

account_type.DictionarySlot\tКакой счет вы хотите открыть?
checking\tтекущий, расчетный
savings
";

    #[test]
    fn test_parse_blocks() {
        let defs = parse_slot_table(TABLE).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].id, "currency");
        assert_eq!(defs[0].class, "DictionarySlot");
        assert_eq!(defs[0].prompt, "Какая валюта вас интересует?");
        assert_eq!(defs[0].values.len(), 2);
        assert_eq!(defs[1].values[1].canonical, "savings");
        assert!(defs[1].values[1].synonyms.is_empty());
    }

    #[test]
    fn test_synonym_map_normalizes_keys() {
        let defs = parse_slot_table("currency.DictionarySlot\tВалюта?\nEUR\tЕвро, Ё-вро\n").unwrap();
        let map = defs[0].synonym_map();
        // Keys are lowercased and letter-unified, the canonical value keeps
        // its original spelling.
        assert_eq!(map.get("евро").map(String::as_str), Some("EUR"));
        assert_eq!(map.get("е-вро").map(String::as_str), Some("EUR"));
        assert_eq!(map.get("eur").map(String::as_str), Some("EUR"));
    }

    #[test]
    fn test_quoted_synonyms_are_stripped() {
        let defs =
            parse_slot_table("branch.DictionarySlot\tГде?\ncenter\t\"у метро\", 'центр'\n").unwrap();
        let syns = &defs[0].values[0].synonyms;
        assert_eq!(syns, &vec!["у метро".to_string(), "центр".to_string()]);
    }

    #[test]
    fn test_header_without_tab_is_fatal() {
        let err = parse_slot_table("currency.DictionarySlot Валюта?\n").unwrap_err();
        assert!(matches!(err, SlotLoadError::MalformedHeader { line: 1, .. }));
    }

    #[test]
    fn test_header_without_class_is_fatal() {
        let err = parse_slot_table("currency\tВалюта?\n").unwrap_err();
        assert!(matches!(err, SlotLoadError::MalformedHeader { line: 1, .. }));
    }

    #[test]
    fn test_extra_field_in_value_row_is_fatal() {
        let table = "currency.DictionarySlot\tВалюта?\nEUR\tевро\tлишнее\n";
        let err = parse_slot_table(table).unwrap_err();
        assert!(matches!(err, SlotLoadError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_duplicate_slot_id_is_fatal() {
        let table = "a.DictionarySlot\tПервый?\nx\n\na.DictionarySlot\tВторой?\ny\n";
        let err = parse_slot_table(table).unwrap_err();
        assert!(matches!(err, SlotLoadError::DuplicateSlot { ref id, .. } if id == "a"));
    }

    #[test]
    fn test_comments_and_extra_blank_lines() {
        let table = "# vocabulary\n\ncurrency.DictionarySlot\tВалюта?\nEUR\tевро\n\n\n";
        let defs = parse_slot_table(table).unwrap();
        assert_eq!(defs.len(), 1);
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slots.tsv");
        std::fs::write(&path, TABLE).unwrap();
        let defs = read_slot_table(&path).unwrap();
        assert_eq!(defs.len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_slot_table("/nonexistent/slots.tsv").unwrap_err();
        assert!(matches!(err, SlotLoadError::Io(_)));
    }
}
