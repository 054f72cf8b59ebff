//! Per-cycle outcome counters.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::types::ReceiptOutcome;

/// Point-in-time copy of [`HerdMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub receipts_total: u64,
    pub duplicates_dropped: u64,
    pub admitted: u64,
    pub incremented: u64,
    pub rejected: u64,
    pub headbutts: u64,
    pub headbutt_failures: u64,
    pub payouts_computed: u64,
    pub session_start: DateTime<Utc>,
}

/// Lock-free counters, wiped at every cycle boundary.
#[derive(Debug)]
pub struct HerdMetrics {
    receipts_total: AtomicU64,
    duplicates_dropped: AtomicU64,
    admitted: AtomicU64,
    incremented: AtomicU64,
    rejected: AtomicU64,
    headbutts: AtomicU64,
    headbutt_failures: AtomicU64,
    payouts_computed: AtomicU64,
    session_start: Mutex<DateTime<Utc>>,
}

impl HerdMetrics {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            receipts_total: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
            admitted: AtomicU64::new(0),
            incremented: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            headbutts: AtomicU64::new(0),
            headbutt_failures: AtomicU64::new(0),
            payouts_computed: AtomicU64::new(0),
            session_start: Mutex::new(now),
        }
    }

    /// Count one processed receipt.
    pub fn record(&self, outcome: &ReceiptOutcome) {
        self.receipts_total.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            ReceiptOutcome::Duplicate { .. } => &self.duplicates_dropped,
            ReceiptOutcome::Admitted { .. } => &self.admitted,
            ReceiptOutcome::Incremented { .. } => &self.incremented,
            ReceiptOutcome::Rejected { .. } => &self.rejected,
            ReceiptOutcome::Headbutted { .. } => &self.headbutts,
            ReceiptOutcome::HeadbuttFailed { .. } | ReceiptOutcome::HeadbuttCoolingDown { .. } => {
                &self.headbutt_failures
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_payout(&self) {
        self.payouts_computed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            receipts_total: self.receipts_total.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            incremented: self.incremented.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            headbutts: self.headbutts.load(Ordering::Relaxed),
            headbutt_failures: self.headbutt_failures.load(Ordering::Relaxed),
            payouts_computed: self.payouts_computed.load(Ordering::Relaxed),
            session_start: *self.session_start.lock(),
        }
    }

    /// Zero every counter and start a new session at `now`.
    pub fn reset(&self, now: DateTime<Utc>) {
        for counter in [
            &self.receipts_total,
            &self.duplicates_dropped,
            &self.admitted,
            &self.incremented,
            &self.rejected,
            &self.headbutts,
            &self.headbutt_failures,
            &self.payouts_computed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.session_start.lock() = now;
    }
}
