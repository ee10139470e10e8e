use serde::Serialize;
use uuid::Uuid;

use crate::classifier::Classification;
use crate::error::SessionInputError;
use crate::models::Bill;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Empty,
    ItemSet,
    WeightSet,
    BothSet,
    Finalized,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Capture,
    Weigh,
    Reset,
}

/// Which user actions make sense in a given status. Pure, so any
/// rendering layer can key its controls off the state machine without
/// the state machine knowing about rendering.
pub fn visible_actions(status: SessionStatus) -> Vec<Action> {
    match status {
        SessionStatus::Finalized => vec![Action::Reset],
        _ => vec![Action::Capture, Action::Weigh, Action::Reset],
    }
}

/// A bill awaiting durable recording, with per-effect completion flags
/// so a retry only re-attempts what actually failed.
#[derive(Debug, Clone)]
pub struct PendingBill {
    pub bill: Bill,
    pub ledger_done: bool,
    pub receipt_done: bool,
}

impl PendingBill {
    pub fn new(bill: Bill) -> Self {
        Self {
            bill,
            ledger_done: false,
            receipt_done: false,
        }
    }

    pub fn complete(&self) -> bool {
        self.ledger_done && self.receipt_done
    }

    /// True once any effect has landed on disk.
    pub fn started(&self) -> bool {
        self.ledger_done || self.receipt_done
    }
}

/// The sole mutable transaction state. All mutation is funneled through
/// the controller's lock; this type never leaves it.
#[derive(Debug)]
pub struct SessionState {
    id: String,
    item: Option<Classification>,
    weight_kg: Option<f64>,
    finalized: bool,
    pending: Option<PendingBill>,
    generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::fresh(0)
    }

    fn fresh(generation: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            item: None,
            weight_kg: None,
            finalized: false,
            pending: None,
            generation,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Bumped on every reset; a capture/weigh result from an earlier
    /// generation is discarded on arrival instead of being applied.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Status is a pure function of which inputs are present, except
    /// `Finalized`, which is entered only after a successful bill write.
    pub fn status(&self) -> SessionStatus {
        if self.finalized {
            return SessionStatus::Finalized;
        }
        match (&self.item, self.weight_kg) {
            (None, None) => SessionStatus::Empty,
            (Some(_), None) => SessionStatus::ItemSet,
            (None, Some(_)) => SessionStatus::WeightSet,
            (Some(_), Some(_)) => SessionStatus::BothSet,
        }
    }

    pub fn item(&self) -> Option<&Classification> {
        self.item.as_ref()
    }

    pub fn weight_kg(&self) -> Option<f64> {
        self.weight_kg
    }

    pub fn set_item(&mut self, item: Classification) -> Result<(), SessionInputError> {
        self.accept_input()?;
        self.item = Some(item);
        Ok(())
    }

    pub fn set_weight(&mut self, kg: f64) -> Result<(), SessionInputError> {
        self.accept_input()?;
        self.weight_kg = Some(kg);
        Ok(())
    }

    /// Gate for new readings. A pending bill whose effects all failed is
    /// discarded so the next finalize rebuilds it from current inputs;
    /// one that is already half on disk locks the inputs instead, since
    /// changing them now would contradict the recorded row.
    fn accept_input(&mut self) -> Result<(), SessionInputError> {
        if self.finalized {
            return Err(SessionInputError::Finalized);
        }
        match &self.pending {
            Some(pending) if pending.started() => Err(SessionInputError::RecordingOutstanding),
            Some(_) => {
                self.pending = None;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn pending(&self) -> Option<&PendingBill> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut PendingBill> {
        self.pending.as_mut()
    }

    pub fn set_pending(&mut self, pending: PendingBill) {
        self.pending = Some(pending);
    }

    pub fn mark_finalized(&mut self) {
        self.pending = None;
        self.finalized = true;
    }

    /// Always succeeds, from any state. Discards unfinalized partial
    /// input and starts a fresh session under a new generation.
    pub fn reset(&mut self) {
        *self = Self::fresh(self.generation + 1);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let status = self.status();
        SessionSnapshot {
            id: self.id.clone(),
            status,
            item: self.item.clone(),
            weight_kg: self.weight_kg,
            actions: visible_actions(status),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub status: SessionStatus,
    pub item: Option<Classification>,
    pub weight_kg: Option<f64>,
    pub actions: Vec<Action>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn apple() -> Classification {
        Classification {
            label: "apple".into(),
            confidence: 0.93,
        }
    }

    #[test]
    fn item_first_and_weight_first_reach_the_same_state() {
        let mut item_first = SessionState::new();
        item_first.set_item(apple()).unwrap();
        assert_eq!(item_first.status(), SessionStatus::ItemSet);
        item_first.set_weight(0.452).unwrap();
        assert_eq!(item_first.status(), SessionStatus::BothSet);

        let mut weight_first = SessionState::new();
        weight_first.set_weight(0.452).unwrap();
        assert_eq!(weight_first.status(), SessionStatus::WeightSet);
        weight_first.set_item(apple()).unwrap();
        assert_eq!(weight_first.status(), SessionStatus::BothSet);

        assert_eq!(item_first.item().unwrap().label, weight_first.item().unwrap().label);
        assert_eq!(item_first.weight_kg(), weight_first.weight_kg());
    }

    #[test]
    fn finalized_session_rejects_all_input_until_reset() {
        let mut session = SessionState::new();
        session.set_item(apple()).unwrap();
        session.set_weight(0.452).unwrap();
        session.mark_finalized();
        assert_eq!(session.status(), SessionStatus::Finalized);

        assert!(session.set_item(apple()).is_err());
        assert!(session.set_weight(0.3).is_err());

        session.reset();
        assert_eq!(session.status(), SessionStatus::Empty);
        assert!(session.set_item(apple()).is_ok());
    }

    #[test]
    fn reset_clears_everything_and_bumps_the_generation() {
        let mut session = SessionState::new();
        let old_id = session.id().to_string();
        session.set_item(apple()).unwrap();
        session.set_weight(0.452).unwrap();
        session.set_pending(PendingBill::new(Bill::new(
            Utc::now(),
            "apple".into(),
            0.452,
            120.0,
        )));

        session.reset();
        assert_eq!(session.status(), SessionStatus::Empty);
        assert!(session.item().is_none());
        assert!(session.weight_kg().is_none());
        assert!(session.pending().is_none());
        assert_eq!(session.generation(), 1);
        assert_ne!(session.id(), old_id);
    }

    #[test]
    fn new_input_discards_an_unrecorded_pending_bill() {
        let mut session = SessionState::new();
        session.set_item(apple()).unwrap();
        session.set_weight(0.452).unwrap();
        session.set_pending(PendingBill::new(Bill::new(
            Utc::now(),
            "apple".into(),
            0.452,
            120.0,
        )));

        session.set_weight(0.600).unwrap();
        assert!(session.pending().is_none());
        assert_eq!(session.weight_kg(), Some(0.600));
    }

    #[test]
    fn new_input_is_rejected_while_a_bill_is_half_recorded() {
        let mut session = SessionState::new();
        session.set_item(apple()).unwrap();
        session.set_weight(0.452).unwrap();
        let mut pending = PendingBill::new(Bill::new(Utc::now(), "apple".into(), 0.452, 120.0));
        pending.ledger_done = true;
        session.set_pending(pending);

        assert!(matches!(
            session.set_weight(0.600),
            Err(SessionInputError::RecordingOutstanding)
        ));
        // The session still matches what the ledger recorded.
        assert_eq!(session.weight_kg(), Some(0.452));
        assert!(session.pending().is_some());

        session.reset();
        assert!(session.set_weight(0.600).is_ok());
    }

    #[test]
    fn only_reset_is_visible_after_finalize() {
        assert_eq!(visible_actions(SessionStatus::Finalized), vec![Action::Reset]);
        for status in [
            SessionStatus::Empty,
            SessionStatus::ItemSet,
            SessionStatus::WeightSet,
            SessionStatus::BothSet,
        ] {
            assert_eq!(
                visible_actions(status),
                vec![Action::Capture, Action::Weigh, Action::Reset]
            );
        }
    }
}
