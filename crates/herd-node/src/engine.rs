//! The herd engine: one serialized mutation domain over the cycle state.
//!
//! [`HerdEngine`] owns the ledger, the receipt deduplicator, and the cycle
//! tracker behind a single `RwLock`. Every receipt is deduplicated,
//! classified, applied, and announced while the write lock is held, so:
//! - a receipt id is accepted at most once, even under concurrent submission
//! - the herd never exceeds its capacity and never holds an identity twice
//! - notifications leave in the same order the mutations happened
//!
//! Readers (snapshots, payout computation, status) take the read lock only
//! long enough to copy what they need.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use herd_core::constants::herd_split_percent;
use herd_core::cycle::CycleTracker;
use herd_core::dedup::ReceiptDeduplicator;
use herd_core::eligibility::EligibilityRules;
use herd_core::error::{HerdError, LedgerError};
use herd_core::ledger::Ledger;
use herd_core::metrics::{HerdMetrics, MetricsSnapshot};
use herd_core::payout::{compute_shares, PayoutSplit};
use herd_core::split::{split_targets, SplitTarget};
use herd_core::traits::{Clock, NotificationEmitter};
use herd_core::types::{
    AdmitOutcome, Classification, HerdEvent, Member, Receipt, ReceiptOutcome, RejectReason,
};

use crate::config::HerdConfig;

/// Read-only view of the herd for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HerdStatus {
    /// Members, highest contributor first.
    pub members: Vec<Member>,
    pub spots_remaining: usize,
    pub max_herd_size: usize,
    pub min_receipt_amount: u64,
    pub admission_reference: Option<String>,
    pub cycle_started_at: DateTime<Utc>,
    pub next_reset_at: DateTime<Utc>,
    /// Seconds until a headbutt is possible again, if one is blocked.
    pub cooldown_remaining_secs: Option<u64>,
}

/// Everything that resets together at a cycle boundary.
struct HerdState {
    ledger: Ledger,
    dedup: ReceiptDeduplicator,
    cycle: CycleTracker,
    admission_reference: Option<String>,
}

/// The membership and payout engine.
pub struct HerdEngine {
    state: RwLock<HerdState>,
    rules: EligibilityRules,
    config: HerdConfig,
    metrics: HerdMetrics,
    emitter: Arc<dyn NotificationEmitter>,
    clock: Arc<dyn Clock>,
}

impl HerdEngine {
    /// Create an engine with an empty herd. The cycle in progress at
    /// creation time is treated as already started.
    pub fn new(
        config: HerdConfig,
        emitter: Arc<dyn NotificationEmitter>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, HerdError> {
        config.validate()?;
        let schedule = config.cycle_schedule()?;
        let now = clock.now();

        let state = HerdState {
            ledger: Ledger::new(
                config.max_herd_size,
                config.min_receipt_amount,
                config.headbutt_cooldown(),
            ),
            dedup: ReceiptDeduplicator::new(),
            cycle: CycleTracker::new(schedule, now),
            admission_reference: config.admission_reference.clone(),
        };

        Ok(Self {
            state: RwLock::new(state),
            rules: EligibilityRules::new(config.min_receipt_amount),
            config,
            metrics: HerdMetrics::new(now),
            emitter,
            clock,
        })
    }

    /// Replace the current cycle's admission reference.
    pub fn with_admission_reference(self, reference: impl Into<String>) -> Self {
        self.state.write().admission_reference = Some(reference.into());
        self
    }

    pub fn config(&self) -> &HerdConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Receipts
    // ------------------------------------------------------------------

    /// Deduplicate, classify, and apply one receipt, then emit its outcome.
    ///
    /// Duplicates are dropped silently. Rejections, failed headbutts, and
    /// cooldown refusals leave the herd untouched but are still announced.
    pub fn process_receipt(&self, receipt: Receipt) -> Result<ReceiptOutcome, HerdError> {
        let now = self.clock.now();
        let mut state = self.state.write();

        if state.dedup.seen(&receipt.id) {
            debug!(receipt = %receipt.id, "duplicate receipt dropped");
            let outcome = ReceiptOutcome::Duplicate { receipt: receipt.id };
            self.metrics.record(&outcome);
            return Ok(outcome);
        }

        let is_member = state.ledger.contains(&receipt.sender);
        let classification = self.rules.classify(&receipt, is_member);
        let outcome = Self::apply(&mut state.ledger, &receipt, classification, now)?;

        match &outcome {
            ReceiptOutcome::Admitted { identity, amount } => {
                info!(identity = %identity, amount, "joined the herd");
            }
            ReceiptOutcome::Headbutted { identity, displaced, amount } => {
                info!(identity = %identity, displaced = %displaced, amount, "headbutt");
            }
            ReceiptOutcome::Incremented { identity, new_total } => {
                debug!(identity = %identity, new_total, "member total increased");
            }
            ReceiptOutcome::Rejected { identity, reason } => {
                debug!(identity = %identity, %reason, receipt = %receipt.id, "receipt rejected");
            }
            _ => {}
        }

        // Marked under the same write lock as the check above.
        state.dedup.mark_seen(receipt.id);
        self.metrics.record(&outcome);
        if let Some(event) = outcome.to_event() {
            self.emitter.emit(event);
        }
        Ok(outcome)
    }

    /// Process receipts largest amount first, so competing payments in one
    /// batch are resolved in favour of the biggest. Equal amounts keep their
    /// arrival order.
    pub fn process_batch(&self, mut receipts: Vec<Receipt>) -> Result<Vec<ReceiptOutcome>, HerdError> {
        receipts.sort_by(|a, b| b.amount.cmp(&a.amount));
        receipts
            .into_iter()
            .map(|r| self.process_receipt(r))
            .collect()
    }

    fn apply(
        ledger: &mut Ledger,
        receipt: &Receipt,
        classification: Classification,
        now: DateTime<Utc>,
    ) -> Result<ReceiptOutcome, LedgerError> {
        let outcome = match classification {
            Classification::Rejected(reason) => ReceiptOutcome::Rejected {
                identity: receipt.sender.clone(),
                reason,
            },
            Classification::Increment { identity, amount } => match ledger.increment(&identity, amount) {
                Ok(new_total) => ReceiptOutcome::Incremented { identity, new_total },
                Err(LedgerError::AmountOverflow) => ReceiptOutcome::Rejected {
                    identity,
                    reason: RejectReason::AmountOverflow,
                },
                Err(e) => return Err(e),
            },
            Classification::Admit(candidate) => match ledger.admit_or_displace(candidate, now)? {
                AdmitOutcome::Admitted { identity, amount } => {
                    ReceiptOutcome::Admitted { identity, amount }
                }
                AdmitOutcome::Headbutted { identity, displaced, amount } => ReceiptOutcome::Headbutted {
                    identity,
                    displaced: displaced.identity,
                    amount,
                },
                AdmitOutcome::HeadbuttFailed { identity, required_minimum } => {
                    ReceiptOutcome::HeadbuttFailed { identity, required_minimum }
                }
                AdmitOutcome::CoolingDown { identity, retry_after_secs } => {
                    ReceiptOutcome::HeadbuttCoolingDown { identity, retry_after_secs }
                }
            },
        };
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Payout
    // ------------------------------------------------------------------

    /// Split the herd's portion of `trigger_amount` across current members
    /// and announce it. The herd itself is not modified.
    pub fn trigger_payout(&self, trigger_amount: u64) -> PayoutSplit {
        let members = self.snapshot();
        let split = compute_shares(trigger_amount, &members, self.config.herd_fraction_bps);

        info!(
            trigger_amount,
            disbursable = split.disbursable,
            recipients = split.shares.len(),
            "payout computed"
        );
        self.metrics.record_payout();
        self.emitter.emit(HerdEvent::PayoutComputed {
            shares: split.shares.clone(),
            undistributed: split.undistributed,
        });
        split
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Detached copy of the members, highest contributor first.
    pub fn snapshot(&self) -> Vec<Member> {
        self.state.read().ledger.snapshot()
    }

    pub fn status(&self) -> HerdStatus {
        let now = self.clock.now();
        let state = self.state.read();
        HerdStatus {
            members: state.ledger.snapshot(),
            spots_remaining: state.ledger.spots_remaining(),
            max_herd_size: state.ledger.capacity(),
            min_receipt_amount: self.config.min_receipt_amount,
            admission_reference: state.admission_reference.clone(),
            cycle_started_at: state.cycle.started_at(),
            next_reset_at: state.cycle.next_boundary(),
            cooldown_remaining_secs: state.ledger.cooldown_remaining_secs(now),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whole-percent split-payment targets for the current herd.
    pub fn split_targets(&self) -> Vec<SplitTarget> {
        let members = self.snapshot();
        split_targets(
            &members,
            &self.config.treasury_alias,
            &self.config.treasury_destination,
            herd_split_percent(self.config.herd_fraction_bps),
        )
    }

    // ------------------------------------------------------------------
    // Cycle reset
    // ------------------------------------------------------------------

    /// Has a cycle boundary passed that has not been handled yet?
    pub fn reset_due(&self) -> bool {
        let now = self.clock.now();
        self.state.read().cycle.due_boundary(now).is_some()
    }

    /// Wipe the herd if a boundary has passed since the last reset.
    ///
    /// Returns whether a reset happened. Calling it again for the same
    /// boundary does nothing.
    pub fn reset_if_due(&self, admission_reference: Option<String>) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write();
        match state.cycle.due_boundary(now) {
            Some(boundary) => {
                self.reset_locked(&mut state, boundary, now, admission_reference);
                true
            }
            None => false,
        }
    }

    /// Wipe the herd now, regardless of the schedule.
    pub fn force_reset(&self, admission_reference: Option<String>) {
        let now = self.clock.now();
        let mut state = self.state.write();
        let boundary = state.cycle.schedule().boundary_at_or_before(now);
        self.reset_locked(&mut state, boundary, now, admission_reference);
    }

    fn reset_locked(
        &self,
        state: &mut HerdState,
        boundary: DateTime<Utc>,
        now: DateTime<Utc>,
        admission_reference: Option<String>,
    ) {
        let dropped = state.ledger.len();
        state.ledger.clear();
        state.dedup.clear();
        state.cycle.mark_reset(boundary, now);
        state.admission_reference = admission_reference.clone();
        self.metrics.reset(now);

        info!(
            %boundary,
            dropped_members = dropped,
            admission_reference = admission_reference.as_deref().unwrap_or("-"),
            "herd reset"
        );
        self.emitter.emit(HerdEvent::CycleReset { admission_reference });
    }
}
