//! Route compiler: declarative JSON route descriptions to executable graphs.
//!
//! The source format maps intent names to step lists. A step is one of:
//!
//! * `"slot_id"`: ask the slot unconditionally;
//! * `{"value": "slot_id"}` (single key, no `action`): ask the slot while it
//!   does not hold exactly `value`;
//! * `{"action": "id", "relevant_slots": [..]}`: run an action over the
//!   listed slot values;
//! * `[ ... ]`: a nested step list.
//!
//! Every shorthand is normalized at compile time so the policy walk never
//! touches raw JSON. Malformed steps and references to undefined slots are
//! startup-fatal.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::routing::step::{AskCondition, RouteGraph, RouteStep};

/// Errors raised while compiling route descriptions. All are fatal at
/// startup.
#[derive(Debug, Error)]
pub enum RouteCompileError {
    #[error("failed to read route file: {0}")]
    Io(#[from] std::io::Error),

    #[error("route file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("route description must be a JSON object mapping intents to step lists")]
    NotAnObject,

    #[error("intent '{intent}' must map to an array of steps")]
    NotAnArray { intent: String },

    #[error("invalid step in intent '{intent}': {detail}")]
    InvalidStep { intent: String, detail: String },

    #[error("intent '{intent}' references undefined slot '{slot}'")]
    UnknownSlot { intent: String, slot: String },
}

/// Compile a parsed route description into per-intent graphs.
///
/// # Errors
///
/// Returns the first structural problem found; nothing is skipped silently.
pub fn compile_routes(raw: &Value) -> Result<HashMap<String, RouteGraph>, RouteCompileError> {
    let table = raw.as_object().ok_or(RouteCompileError::NotAnObject)?;

    let mut graphs = HashMap::new();
    for (intent, steps) in table {
        let items = steps
            .as_array()
            .ok_or_else(|| RouteCompileError::NotAnArray {
                intent: intent.clone(),
            })?;
        let steps = normalize_steps(intent, items)?;
        graphs.insert(intent.clone(), RouteGraph::new(intent.clone(), steps));
    }

    log::info!("compiled {} route graphs", graphs.len());
    Ok(graphs)
}

/// Load and compile a route file.
pub fn read_routes(path: impl AsRef<Path>) -> Result<HashMap<String, RouteGraph>, RouteCompileError> {
    let text = fs::read_to_string(path)?;
    let raw: Value = serde_json::from_str(&text)?;
    compile_routes(&raw)
}

/// Check that every slot referenced by any graph is defined.
///
/// # Errors
///
/// [`RouteCompileError::UnknownSlot`] naming the first dangling reference.
pub fn validate_slots(
    graphs: &HashMap<String, RouteGraph>,
    known: &HashSet<String>,
) -> Result<(), RouteCompileError> {
    for graph in graphs.values() {
        for slot in graph.referenced_slots() {
            if !known.contains(slot) {
                return Err(RouteCompileError::UnknownSlot {
                    intent: graph.intent.clone(),
                    slot: slot.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn normalize_steps(intent: &str, items: &[Value]) -> Result<Vec<RouteStep>, RouteCompileError> {
    items
        .iter()
        .map(|item| normalize_step(intent, item))
        .collect()
}

fn normalize_step(intent: &str, item: &Value) -> Result<RouteStep, RouteCompileError> {
    let invalid = |detail: String| RouteCompileError::InvalidStep {
        intent: intent.to_string(),
        detail,
    };

    match item {
        Value::String(slot_id) => Ok(RouteStep::ask(slot_id)),

        Value::Array(inner) => Ok(RouteStep::SubRoute(normalize_steps(intent, inner)?)),

        Value::Object(fields) => {
            if let Some(action) = fields.get("action") {
                let action_id = action
                    .as_str()
                    .ok_or_else(|| invalid(format!("'action' must be a string, got {action}")))?;
                let relevant_slots = match fields.get("relevant_slots") {
                    None => Vec::new(),
                    Some(Value::Array(items)) => dedup_slots(intent, items)?,
                    Some(other) => {
                        return Err(invalid(format!(
                            "'relevant_slots' must be an array, got {other}"
                        )))
                    }
                };
                return Ok(RouteStep::RunAction {
                    action_id: action_id.to_string(),
                    relevant_slots,
                });
            }

            if fields.len() == 1 {
                // {"condition_value": "slot_id"}
                let (value, slot) = fields
                    .iter()
                    .next()
                    .ok_or_else(|| invalid("empty object".to_string()))?;
                let slot_id = slot
                    .as_str()
                    .ok_or_else(|| invalid(format!("conditional step must name a slot, got {slot}")))?;
                return Ok(RouteStep::AskSlot {
                    slot_id: slot_id.to_string(),
                    condition: AskCondition::Equals(value.clone()),
                });
            }

            Err(invalid(format!(
                "object step needs an 'action' key or exactly one condition key, got {} keys",
                fields.len()
            )))
        }

        other => Err(invalid(format!("unsupported step value {other}"))),
    }
}

fn dedup_slots(intent: &str, items: &[Value]) -> Result<Vec<String>, RouteCompileError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let slot = item
            .as_str()
            .ok_or_else(|| RouteCompileError::InvalidStep {
                intent: intent.to_string(),
                detail: format!("'relevant_slots' entries must be strings, got {item}"),
            })?;
        if seen.insert(slot.to_string()) {
            out.push(slot.to_string());
        }
    }
    Ok(out)
}
