//! Turn orchestration: features in, state change plus replies out.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::dialog::session::DialogSession;
use crate::nlu::FeaturePipeline;
use crate::policy::{ActionHandler, NextStep, PolicyEngine};
use crate::routing::RouteGraph;
use crate::say::Phrasebook;
use crate::slots::{IntentClassifier, Slot};

/// Drives one user turn end to end: feature extraction, slot filling,
/// policy walk, patience bookkeeping, and reply selection.
///
/// The engine is stateless across turns; everything conversational lives in
/// the [`DialogSession`] passed to [`DialogEngine::respond`]. That keeps the
/// engine freely shareable between per-user workers.
pub struct DialogEngine {
    pipeline: Arc<FeaturePipeline>,
    slots: Vec<Arc<Slot>>,
    intents: Arc<dyn IntentClassifier>,
    policy: PolicyEngine,
    phrases: Arc<Phrasebook>,
    debug: bool,
}

impl DialogEngine {
    pub fn new(
        pipeline: Arc<FeaturePipeline>,
        slots: Vec<Arc<Slot>>,
        intents: Arc<dyn IntentClassifier>,
        graphs: HashMap<String, RouteGraph>,
        actions: Arc<dyn ActionHandler>,
        phrases: Arc<Phrasebook>,
    ) -> Self {
        let policy = PolicyEngine::new(graphs, slots.clone(), actions, phrases.clone());
        Self {
            pipeline,
            slots,
            intents,
            policy,
            phrases,
            debug: false,
        }
    }

    /// Append a state line to every reply batch. Meant for development
    /// sessions, not production traffic.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// First-contact greeting.
    pub fn greet(&self, session: &DialogSession) -> String {
        log::info!("greeting user {}", session.user_id);
        self.phrases.get("greeting")
    }

    /// Process one utterance and return the ordered replies.
    ///
    /// Never fails: extraction and policy problems are turned into service
    /// phrases so the user always hears something.
    pub async fn respond(&self, session: &mut DialogSession, text: &str) -> Vec<String> {
        let turn_id = Uuid::new_v4();
        session.touch();
        log::debug!("turn {} for user {}: {:?}", turn_id, session.user_id, text);

        let features = match self.pipeline.feed(text) {
            Ok(f) => f,
            Err(e) => {
                log::error!("turn {turn_id} feature extraction failed: {e}");
                return self.supplement(session, vec![self.phrases.get("nlu_failure")]);
            }
        };
        let tokens = &features.tokens;

        // The question that was on the table when this turn began. The
        // policy's ask is compared against it, not against the live
        // pending_slot, which the shortcut below may already have cleared.
        let asked_before = session.pending_slot.clone();

        // Single-slot shortcut: an outstanding question tries its own slot
        // first, so a bare answer like "евро" lands without running the
        // intent classifier against it.
        let mut resolved_pending = false;
        if let Some(pending) = session.pending_slot.clone() {
            if let Some(slot) = self.slot(&pending) {
                if let Some(value) = slot.infer(tokens) {
                    log::debug!("turn {turn_id} fills pending slot '{pending}' = '{value}'");
                    session.fill(&pending, value);
                    session.resolve_pending();
                    resolved_pending = true;
                }
            }
        }

        if !resolved_pending {
            // Compositional path: re-detect the intent and scan every slot,
            // so one utterance may fill several slots at once.
            if let Some(intent) = self.intents.classify(tokens) {
                if session.intent.as_deref() != Some(intent.as_str()) {
                    log::info!("user {} switches to intent '{}'", session.user_id, intent);
                }
                session.intent = Some(intent);
            }
            for slot in &self.slots {
                if let Some(value) = slot.infer(tokens) {
                    session.fill(slot.id.clone(), value);
                }
            }
            // The scan may have answered the outstanding question in passing.
            if let Some(pending) = session.pending_slot.clone() {
                if session.is_filled(&pending) {
                    session.resolve_pending();
                }
            }
        }

        let Some(intent) = session.intent.clone() else {
            log::debug!("turn {turn_id} has no active intent");
            return self.supplement(session, vec![self.phrases.get("unknown_intent")]);
        };

        let replies = match self.policy.next_step(&intent, session).await {
            Ok(NextStep::Ask {
                slot_id,
                prompt,
                mut lead_in,
            }) => {
                if asked_before.as_deref() == Some(slot_id.as_str()) {
                    // Same question again: ignored, or answered with a
                    // value the route will not take.
                    if session.consume_patience() {
                        log::info!(
                            "user {} ran out of patience on slot '{}', resetting",
                            session.user_id,
                            slot_id
                        );
                        session.reset();
                        vec![self.phrases.get("start_over")]
                    } else {
                        session.re_ask(&slot_id);
                        lead_in.push(prompt);
                        lead_in
                    }
                } else {
                    session.set_pending(&slot_id);
                    lead_in.push(prompt);
                    lead_in
                }
            }
            Ok(NextStep::Actions { replies }) => {
                session.complete_route();
                replies
            }
            Ok(NextStep::Exhausted) => {
                session.complete_route();
                vec![self.phrases.get("intent_complete")]
            }
            Err(e) => {
                // The classifier produced a label no graph answers. Drop the
                // whole route state, pending question included, so later
                // turns are not answering a question nobody is asking.
                log::warn!("turn {turn_id} policy error: {e}");
                session.complete_route();
                vec![self.phrases.get("unknown_intent")]
            }
        };

        self.supplement(session, replies)
    }

    fn slot(&self, id: &str) -> Option<&Arc<Slot>> {
        self.slots.iter().find(|s| s.id == id)
    }

    fn supplement(&self, session: &DialogSession, mut replies: Vec<String>) -> Vec<String> {
        if self.debug {
            let filled: BTreeMap<&String, &String> = session.filled_slots.iter().collect();
            replies.push(format!(
                "debug: intent={} pending={} filled={:?} patience={}",
                session.intent.as_deref().unwrap_or("-"),
                session.pending_slot.as_deref().unwrap_or("-"),
                filled,
                session.patience
            ));
        }
        replies
    }
}
