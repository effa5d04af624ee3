//! Per-user conversation state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the dialog is waiting for, derived from the session fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No question is outstanding; the next utterance picks the route.
    AwaitingIntent,
    /// A specific slot has been asked and its answer is expected.
    AwaitingSlotValue(String),
}

/// Conversation state for one user.
///
/// A session is owned by exactly one turn worker at a time, so the struct
/// itself carries no locking. All mutation happens through the methods below
/// to keep the patience bookkeeping in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogSession {
    /// Stable user identifier, also the serialization key for the turn lane.
    pub user_id: String,
    /// Active intent, if one has been recognized.
    pub intent: Option<String>,
    /// Collected slot values, canonical form.
    pub filled_slots: HashMap<String, String>,
    /// Slot the user was just asked about, if any.
    pub pending_slot: Option<String>,
    /// Remaining re-asks before the engine gives up on the pending slot.
    pub patience: u32,
    initial_patience: u32,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl DialogSession {
    pub fn new(user_id: impl Into<String>, patience: u32) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            intent: None,
            filled_slots: HashMap::new(),
            pending_slot: None,
            patience,
            initial_patience: patience,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Current wait state.
    pub fn state(&self) -> SessionState {
        match &self.pending_slot {
            Some(slot) => SessionState::AwaitingSlotValue(slot.clone()),
            None => SessionState::AwaitingIntent,
        }
    }

    /// Record an extracted value. Later turns overwrite earlier ones.
    pub fn fill(&mut self, slot_id: impl Into<String>, value: impl Into<String>) {
        self.filled_slots.insert(slot_id.into(), value.into());
    }

    /// Canonical value of a slot, if collected.
    pub fn value(&self, slot_id: &str) -> Option<&str> {
        self.filled_slots.get(slot_id).map(String::as_str)
    }

    pub fn is_filled(&self, slot_id: &str) -> bool {
        self.filled_slots.contains_key(slot_id)
    }

    /// Mark a slot as asked. Moving to a different slot restores patience;
    /// re-asking the same slot keeps the current countdown.
    pub fn set_pending(&mut self, slot_id: impl Into<String>) {
        let slot_id = slot_id.into();
        if self.pending_slot.as_deref() != Some(slot_id.as_str()) {
            self.patience = self.initial_patience;
        }
        self.pending_slot = Some(slot_id);
    }

    /// Clear the outstanding question. Patience is not restored here: a
    /// captured value may still fail the route's condition, and the re-ask
    /// that follows must keep the current countdown. Patience comes back
    /// once the dialog moves on ([`Self::set_pending`] with a different
    /// slot, [`Self::complete_route`], or [`Self::reset`]).
    pub fn resolve_pending(&mut self) {
        self.pending_slot = None;
    }

    /// Re-arm the question for a slot that is still unsettled this turn,
    /// keeping the patience countdown.
    pub fn re_ask(&mut self, slot_id: impl Into<String>) {
        self.pending_slot = Some(slot_id.into());
    }

    /// Burn one unit of patience for an unanswered re-ask. Returns `true`
    /// when patience is exhausted and the dialog should reset. Never
    /// underflows.
    pub fn consume_patience(&mut self) -> bool {
        self.patience = self.patience.saturating_sub(1);
        self.patience == 0
    }

    /// Forget everything about the active route: intent, collected values,
    /// pending question. Patience is restored. The session itself survives.
    pub fn reset(&mut self) {
        self.intent = None;
        self.filled_slots.clear();
        self.pending_slot = None;
        self.patience = self.initial_patience;
    }

    /// Close out a finished route, keeping collected values for the next
    /// one. Values like a confirmed city often carry over usefully.
    pub fn complete_route(&mut self) {
        self.intent = None;
        self.pending_slot = None;
        self.patience = self.initial_patience;
    }

    /// Bump the activity timestamp.
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_awaits_intent() {
        let session = DialogSession::new("u1", 2);
        assert_eq!(session.state(), SessionState::AwaitingIntent);
        assert_eq!(session.patience, 2);
        assert!(session.filled_slots.is_empty());
    }

    #[test]
    fn test_fill_and_overwrite() {
        let mut session = DialogSession::new("u1", 2);
        session.fill("currency", "EUR");
        session.fill("currency", "USD");
        assert_eq!(session.value("currency"), Some("USD"));
        assert!(session.is_filled("currency"));
        assert!(!session.is_filled("city"));
    }

    #[test]
    fn test_set_pending_switch_restores_patience() {
        let mut session = DialogSession::new("u1", 2);
        session.set_pending("city");
        session.consume_patience();
        assert_eq!(session.patience, 1);
        // Re-asking the same slot keeps the countdown.
        session.set_pending("city");
        assert_eq!(session.patience, 1);
        // Asking a different slot restores it.
        session.set_pending("market");
        assert_eq!(session.patience, 2);
        assert_eq!(
            session.state(),
            SessionState::AwaitingSlotValue("market".to_string())
        );
    }

    #[test]
    fn test_patience_never_underflows() {
        let mut session = DialogSession::new("u1", 1);
        assert!(session.consume_patience());
        assert!(session.consume_patience());
        assert_eq!(session.patience, 0);
    }

    #[test]
    fn test_resolve_pending_keeps_countdown() {
        let mut session = DialogSession::new("u1", 3);
        session.set_pending("city");
        session.consume_patience();
        session.resolve_pending();
        assert_eq!(session.pending_slot, None);
        // The countdown survives until the dialog moves on.
        assert_eq!(session.patience, 2);
        session.set_pending("market");
        assert_eq!(session.patience, 3);
    }

    #[test]
    fn test_re_ask_keeps_countdown() {
        let mut session = DialogSession::new("u1", 2);
        session.set_pending("city");
        session.consume_patience();
        session.resolve_pending();
        session.re_ask("city");
        assert_eq!(session.pending_slot.as_deref(), Some("city"));
        assert_eq!(session.patience, 1);
    }

    #[test]
    fn test_reset_clears_route_state() {
        let mut session = DialogSession::new("u1", 2);
        session.intent = Some("mortgage".to_string());
        session.fill("city", "Москва");
        session.set_pending("market");
        session.consume_patience();
        session.reset();
        assert_eq!(session.intent, None);
        assert!(session.filled_slots.is_empty());
        assert_eq!(session.pending_slot, None);
        assert_eq!(session.patience, 2);
    }

    #[test]
    fn test_complete_route_keeps_values() {
        let mut session = DialogSession::new("u1", 2);
        session.intent = Some("mortgage".to_string());
        session.fill("city", "Москва");
        session.set_pending("market");
        session.complete_route();
        assert_eq!(session.intent, None);
        assert_eq!(session.pending_slot, None);
        assert_eq!(session.value("city"), Some("Москва"));
    }
}
