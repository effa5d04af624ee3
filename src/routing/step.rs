//! Executable route-graph types produced by the compiler.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Gate attached to an ask step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AskCondition {
    /// The step is satisfied as soon as the slot holds any value.
    Any,
    /// The step is satisfied only while the slot holds exactly this
    /// canonical value; any other value re-triggers the question.
    Equals(String),
}

/// One node of a compiled route graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RouteStep {
    /// Require a slot value, asking for it when the condition is unmet.
    AskSlot {
        slot_id: String,
        condition: AskCondition,
    },
    /// Invoke a domain action once every relevant slot is filled.
    RunAction {
        action_id: String,
        /// Slots whose values the action consumes, in declaration order,
        /// deduplicated.
        relevant_slots: Vec<String>,
    },
    /// A nested step sequence, walked in order like the parent.
    SubRoute(Vec<RouteStep>),
}

impl RouteStep {
    /// Unconditional ask step.
    pub fn ask(slot_id: impl Into<String>) -> Self {
        Self::AskSlot {
            slot_id: slot_id.into(),
            condition: AskCondition::Any,
        }
    }

    /// Ask step gated on an exact canonical value.
    pub fn ask_if(value: impl Into<String>, slot_id: impl Into<String>) -> Self {
        Self::AskSlot {
            slot_id: slot_id.into(),
            condition: AskCondition::Equals(value.into()),
        }
    }

    /// Action step.
    pub fn action(action_id: impl Into<String>, relevant_slots: &[&str]) -> Self {
        Self::RunAction {
            action_id: action_id.into(),
            relevant_slots: relevant_slots.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Compiled decision graph for one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteGraph {
    /// Intent label this graph answers.
    pub intent: String,
    /// Ordered step sequence.
    pub steps: Vec<RouteStep>,
}

impl RouteGraph {
    pub fn new(intent: impl Into<String>, steps: Vec<RouteStep>) -> Self {
        Self {
            intent: intent.into(),
            steps,
        }
    }

    /// Every slot id this graph references, asks and actions alike.
    pub fn referenced_slots(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        collect_slots(&self.steps, &mut out);
        out
    }
}

fn collect_slots<'a>(steps: &'a [RouteStep], out: &mut BTreeSet<&'a str>) {
    for step in steps {
        match step {
            RouteStep::AskSlot { slot_id, .. } => {
                out.insert(slot_id.as_str());
            }
            RouteStep::RunAction { relevant_slots, .. } => {
                for slot in relevant_slots {
                    out.insert(slot.as_str());
                }
            }
            RouteStep::SubRoute(inner) => collect_slots(inner, out),
        }
    }
}
