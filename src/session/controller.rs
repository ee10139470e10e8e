use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::catalog::PriceCatalog;
use crate::classifier::Classifier;
use crate::error::{ClassificationError, RecordError, SessionFinalizedError};
use crate::feed::FeedHandle;
use crate::models::Bill;
use crate::recorder::BillSink;
use crate::sensor::WeightSampler;

use super::state::{PendingBill, SessionSnapshot, SessionState, SessionStatus};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything the outside world may want to react to. The headless
/// analog of a UI event bus: the binary prints these, tests assert on
/// them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum KioskEvent {
    SessionChanged { snapshot: SessionSnapshot },
    /// The item is not in the price list; the sale is recorded at zero
    /// charge so the operator can follow up.
    PriceNotFound { item_id: String },
    BillFinalized { bill: Bill },
    RecordFailed { message: String },
}

/// Result of one capture or weigh action.
#[derive(Debug)]
pub enum StepOutcome {
    Applied(SessionSnapshot),
    /// The session was reset while the reading was in flight; the
    /// result arrived against a stale generation and was dropped.
    Discarded,
}

#[derive(Debug)]
pub enum FinalizeOutcome {
    /// Item or weight still missing.
    NotReady,
    /// The current session already produced its bill.
    AlreadyFinalized,
    Finalized(Bill),
    /// One or more durable effects failed; the session stays in
    /// `BothSet` and the same finalize may be retried.
    Failed { errors: Vec<RecordError> },
}

/// Sequences classification and weighing into a priced, persisted bill.
/// Every session mutation goes through the one mutex held here, which
/// is what keeps `set_item`/`set_weight`/finalize/reset serialized.
#[derive(Clone)]
pub struct KioskController {
    session: Arc<Mutex<SessionState>>,
    catalog: Arc<PriceCatalog>,
    classifier: Arc<dyn Classifier>,
    sampler: Arc<WeightSampler>,
    sink: Arc<dyn BillSink>,
    feed: FeedHandle,
    events: broadcast::Sender<KioskEvent>,
}

impl KioskController {
    pub fn new(
        catalog: Arc<PriceCatalog>,
        classifier: Arc<dyn Classifier>,
        sampler: Arc<WeightSampler>,
        sink: Arc<dyn BillSink>,
        feed: FeedHandle,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session: Arc::new(Mutex::new(SessionState::new())),
            catalog,
            classifier,
            sampler,
            sink,
            feed,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Pull the current preview frame, classify it and feed the result
    /// into the session. A classifier failure aborts only this attempt.
    pub async fn capture(&self) -> Result<StepOutcome> {
        let frame = self.feed.latest().ok_or(ClassificationError::NoFrame)?;

        let generation = {
            let session = self.session.lock().await;
            if session.status() == SessionStatus::Finalized {
                return Err(SessionFinalizedError.into());
            }
            session.generation()
        };

        // Inference may take a while; run it off the scheduler and
        // without holding the session lock.
        let classifier = Arc::clone(&self.classifier);
        let result = tokio::task::spawn_blocking(move || classifier.classify(&frame))
            .await
            .context("classifier worker join failed")??;
        info!("classified item '{}' (confidence {:.2})", result.label, result.confidence);

        let mut session = self.session.lock().await;
        if session.generation() != generation {
            info!("session was reset mid-capture; discarding '{}'", result.label);
            return Ok(StepOutcome::Discarded);
        }

        session.set_item(result)?;
        let outcome = self.run_finalize(&mut session);
        self.emit_session_changed(&session);
        self.emit_finalize_events(&outcome);
        Ok(StepOutcome::Applied(session.snapshot()))
    }

    /// Drive the weight sampler and feed the averaged reading into the
    /// session. A sensor failure aborts only this attempt.
    pub async fn weigh(&self) -> Result<StepOutcome> {
        let generation = {
            let session = self.session.lock().await;
            if session.status() == SessionStatus::Finalized {
                return Err(SessionFinalizedError.into());
            }
            session.generation()
        };

        let sampler = Arc::clone(&self.sampler);
        let sample = tokio::task::spawn_blocking(move || sampler.sample())
            .await
            .context("sensor worker join failed")??;

        let mut session = self.session.lock().await;
        if session.generation() != generation {
            info!(
                "session was reset mid-weigh; discarding {:.3} kg",
                sample.averaged_kg
            );
            return Ok(StepOutcome::Discarded);
        }

        session.set_weight(sample.averaged_kg)?;
        let outcome = self.run_finalize(&mut session);
        self.emit_session_changed(&session);
        self.emit_finalize_events(&outcome);
        Ok(StepOutcome::Applied(session.snapshot()))
    }

    /// Re-trigger recording after a transient failure. Safe to call in
    /// any state; effects that already succeeded are not repeated.
    pub async fn finalize(&self) -> FinalizeOutcome {
        let mut session = self.session.lock().await;
        let outcome = self.run_finalize(&mut session);
        self.emit_session_changed(&session);
        self.emit_finalize_events(&outcome);
        outcome
    }

    /// Clears the session unconditionally. Any in-flight capture or
    /// weigh result will arrive against a stale generation and be
    /// discarded on completion.
    pub async fn reset(&self) -> SessionSnapshot {
        let mut session = self.session.lock().await;
        session.reset();
        info!("session reset; new session {}", session.id());
        self.emit_session_changed(&session);
        session.snapshot()
    }

    fn run_finalize(&self, session: &mut SessionState) -> FinalizeOutcome {
        match session.status() {
            SessionStatus::BothSet => {}
            SessionStatus::Finalized => return FinalizeOutcome::AlreadyFinalized,
            _ => return FinalizeOutcome::NotReady,
        }

        // The bill is built once; retries reuse it so the timestamp,
        // ledger row and receipt name stay stable across attempts.
        if session.pending().is_none() {
            let (Some(item), Some(weight_kg)) = (session.item().cloned(), session.weight_kg())
            else {
                return FinalizeOutcome::NotReady;
            };

            let unit_price = match self.catalog.lookup(&item.label) {
                Some(price) => price,
                None => {
                    warn!("no price listed for '{}'; billing at zero", item.label);
                    let _ = self.events.send(KioskEvent::PriceNotFound {
                        item_id: item.label.clone(),
                    });
                    0.0
                }
            };

            session.set_pending(PendingBill::new(Bill::new(
                Utc::now(),
                item.label,
                weight_kg,
                unit_price,
            )));
        }

        // Both effects get attempted on every pass; one failing never
        // suppresses the other.
        let mut errors = Vec::new();
        let (complete, bill) = {
            let Some(pending) = session.pending_mut() else {
                return FinalizeOutcome::NotReady;
            };

            if !pending.ledger_done {
                match self.sink.append_ledger(&pending.bill) {
                    Ok(()) => pending.ledger_done = true,
                    Err(err) => errors.push(err),
                }
            }
            if !pending.receipt_done {
                match self.sink.write_receipt(&pending.bill) {
                    Ok(_) => pending.receipt_done = true,
                    Err(err) => errors.push(err),
                }
            }

            (pending.complete(), pending.bill.clone())
        };

        if complete {
            session.mark_finalized();
            info!(
                "bill finalized: {} x {:.3} kg = {:.2}",
                bill.item_id,
                bill.weight_kg,
                bill.total()
            );
            FinalizeOutcome::Finalized(bill)
        } else {
            FinalizeOutcome::Failed { errors }
        }
    }

    fn emit_session_changed(&self, session: &SessionState) {
        let _ = self.events.send(KioskEvent::SessionChanged {
            snapshot: session.snapshot(),
        });
    }

    fn emit_finalize_events(&self, outcome: &FinalizeOutcome) {
        match outcome {
            FinalizeOutcome::Finalized(bill) => {
                let _ = self.events.send(KioskEvent::BillFinalized { bill: bill.clone() });
            }
            FinalizeOutcome::Failed { errors } => {
                for err in errors {
                    let _ = self.events.send(KioskEvent::RecordFailed {
                        message: err.to_string(),
                    });
                }
            }
            FinalizeOutcome::NotReady | FinalizeOutcome::AlreadyFinalized => {}
        }
    }
}
