//! Graph-walking dialog policy.
//!
//! Every turn, the policy walks the compiled route graph for the active
//! intent against the session's collected slot values and decides what the
//! bot does next: ask for the first unmet slot, deliver the replies of the
//! actions it passed on the way, or report that the route has nothing left
//! to do. The walk is restartable by construction; it never stores a cursor,
//! so filling slots in any order (or several at once) just moves the first
//! unmet step further down the graph.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dialog::session::DialogSession;
use crate::routing::{AskCondition, RouteGraph, RouteStep};
use crate::say::Phrasebook;
use crate::slots::Slot;

/// Errors surfaced by domain actions.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("action failed: {0}")]
    Failed(String),
}

/// Domain side effects invoked from action steps.
///
/// An action receives the values of its relevant slots in graph order and
/// returns the replies it wants delivered to the user. Failures do not abort
/// the walk; the policy substitutes an apology and keeps going.
///
/// Because the walk restarts from the top of the graph every turn, an action
/// whose step precedes a still-open ask runs again, with the same slot
/// snapshot, on each turn it takes to settle that ask. Implementations must
/// be idempotent: key side effects on the snapshot or an external id, and
/// keep repeat replies short (or empty) so the user is not told the same
/// thing twice.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn run(
        &self,
        action_id: &str,
        slots: &[(String, String)],
    ) -> Result<Vec<String>, ActionError>;
}

/// What the dialog should do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NextStep {
    /// Ask the user for a slot value. `lead_in` holds replies produced by
    /// action steps that completed before the walk stopped; they are
    /// delivered ahead of the prompt.
    Ask {
        slot_id: String,
        prompt: String,
        lead_in: Vec<String>,
    },
    /// The walk ran through; deliver the collected action replies.
    Actions { replies: Vec<String> },
    /// The walk ran through and no step produced output: the route is done.
    Exhausted,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("no route graph for intent '{0}'")]
    NoRoute(String),
}

/// The decision core: route graphs plus slot definitions plus the action
/// handler they call into.
pub struct PolicyEngine {
    graphs: HashMap<String, RouteGraph>,
    slots: HashMap<String, Arc<Slot>>,
    actions: Arc<dyn ActionHandler>,
    phrases: Arc<Phrasebook>,
}

impl PolicyEngine {
    pub fn new(
        graphs: HashMap<String, RouteGraph>,
        slots: Vec<Arc<Slot>>,
        actions: Arc<dyn ActionHandler>,
        phrases: Arc<Phrasebook>,
    ) -> Self {
        let slots = slots.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            graphs,
            slots,
            actions,
            phrases,
        }
    }

    /// Whether an intent has a route graph.
    pub fn has_route(&self, intent: &str) -> bool {
        self.graphs.contains_key(intent)
    }

    /// Walk the graph for `intent` against the session state.
    ///
    /// # Errors
    ///
    /// [`PolicyError::NoRoute`] when the intent has no compiled graph.
    pub async fn next_step(
        &self,
        intent: &str,
        session: &DialogSession,
    ) -> Result<NextStep, PolicyError> {
        let graph = self
            .graphs
            .get(intent)
            .ok_or_else(|| PolicyError::NoRoute(intent.to_string()))?;

        let (replies, ask) = self.walk(&graph.steps, session).await;
        match ask {
            Some(slot_id) => {
                let prompt = self.prompt_for(&slot_id);
                Ok(NextStep::Ask {
                    slot_id,
                    prompt,
                    lead_in: replies,
                })
            }
            None if replies.is_empty() => Ok(NextStep::Exhausted),
            None => Ok(NextStep::Actions { replies }),
        }
    }

    fn prompt_for(&self, slot_id: &str) -> String {
        match self.slots.get(slot_id) {
            Some(slot) => slot.prompt.clone(),
            None => {
                // Startup validation makes this unreachable for compiled
                // routes; keep a usable fallback anyway.
                log::warn!("no definition for slot '{slot_id}', using its id as prompt");
                slot_id.to_string()
            }
        }
    }

    fn step_satisfied(slot_id: &str, condition: &AskCondition, session: &DialogSession) -> bool {
        match condition {
            AskCondition::Any => session.is_filled(slot_id),
            AskCondition::Equals(expected) => session.value(slot_id) == Some(expected.as_str()),
        }
    }

    /// Walk a step list in order. Returns the replies collected from action
    /// steps and, if the walk stopped, the slot that must be asked.
    fn walk<'a>(
        &'a self,
        steps: &'a [RouteStep],
        session: &'a DialogSession,
    ) -> BoxFuture<'a, (Vec<String>, Option<String>)> {
        async move {
            let mut replies = Vec::new();
            for step in steps {
                match step {
                    RouteStep::AskSlot { slot_id, condition } => {
                        if !Self::step_satisfied(slot_id, condition, session) {
                            return (replies, Some(slot_id.clone()));
                        }
                    }

                    RouteStep::RunAction {
                        action_id,
                        relevant_slots,
                    } => {
                        if let Some(missing) = relevant_slots
                            .iter()
                            .find(|slot| !session.is_filled(slot))
                        {
                            return (replies, Some(missing.clone()));
                        }
                        let snapshot: Vec<(String, String)> = relevant_slots
                            .iter()
                            .filter_map(|slot| {
                                session.value(slot).map(|v| (slot.clone(), v.to_string()))
                            })
                            .collect();
                        match self.actions.run(action_id, &snapshot).await {
                            Ok(mut out) => replies.append(&mut out),
                            Err(e) => {
                                log::error!(
                                    "action '{}' failed for user {}: {}",
                                    action_id,
                                    session.user_id,
                                    e
                                );
                                replies.push(self.phrases.get("action_failure"));
                            }
                        }
                    }

                    RouteStep::SubRoute(inner) => {
                        let (mut inner_replies, ask) = self.walk(inner, session).await;
                        replies.append(&mut inner_replies);
                        if ask.is_some() {
                            return (replies, ask);
                        }
                    }
                }
            }
            (replies, None)
        }
        .boxed()
    }
}
