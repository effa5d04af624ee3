//! Service phrases: greetings, apologies, and control replies.
//!
//! Templates live in a flat JSON map. A compiled-in default ships with the
//! crate; deployments may load their own file to rebrand the voice of the
//! bot without touching code. Lookup never panics: a missing key is logged
//! and the key itself is returned so the user still gets a reply.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const EMBEDDED_PHRASES: &str = include_str!("phrases.json");

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("invalid placeholder regex"));

/// Errors raised while loading a phrase file. Fatal at startup.
#[derive(Debug, Error)]
pub enum PhrasebookError {
    #[error("failed to read phrase file: {0}")]
    Io(#[from] std::io::Error),

    #[error("phrase file is not a JSON object of string templates: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-to-template map of everything the bot says on its own behalf.
#[derive(Debug, Clone)]
pub struct Phrasebook {
    phrases: HashMap<String, String>,
}

impl Phrasebook {
    /// The compiled-in default phrases.
    pub fn embedded() -> Self {
        // The embedded asset is covered by tests, so this cannot fail at
        // runtime.
        let phrases =
            serde_json::from_str(EMBEDDED_PHRASES).expect("embedded phrases.json is valid");
        Self { phrases }
    }

    /// Load phrases from a JSON file.
    ///
    /// # Errors
    ///
    /// I/O and parse problems are returned as [`PhrasebookError`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PhrasebookError> {
        let text = fs::read_to_string(path)?;
        let phrases: HashMap<String, String> = serde_json::from_str(&text)?;
        Ok(Self { phrases })
    }

    /// Look up a template. A missing key is logged and echoed back verbatim
    /// so the bot always has something to say.
    pub fn get(&self, key: &str) -> String {
        match self.phrases.get(key) {
            Some(template) => template.clone(),
            None => {
                log::error!("no phrase registered for key '{key}'");
                key.to_string()
            }
        }
    }

    /// Look up a template and substitute `{placeholder}` occurrences from
    /// `vars`. Placeholders with no matching variable are left as-is.
    pub fn say(&self, key: &str, vars: &HashMap<String, String>) -> String {
        let template = self.get(key);
        PLACEHOLDER_RE
            .replace_all(&template, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                match vars.get(name) {
                    Some(value) => value.clone(),
                    None => {
                        log::warn!("phrase '{key}' references unbound variable '{name}'");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl Default for Phrasebook {
    fn default() -> Self {
        Self::embedded()
    }
}
