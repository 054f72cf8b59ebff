//! Shared test helpers for E2E and property tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use herd_core::traits::{ManualClock, RecordingEmitter};
use herd_core::types::{IdentityKey, Member, Receipt, ReceiptId};
use herd_node_lib::{HerdConfig, HerdEngine};

/// 2024-06-01 09:00:00 UTC, well inside a cycle.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// A qualifying receipt on the admission note.
pub fn admission_receipt(id: &str, sender: &str, amount: u64) -> Receipt {
    Receipt {
        id: ReceiptId::from(id),
        amount,
        sender: IdentityKey::from(sender),
        target: "note1admission".to_string(),
        is_admission_target: true,
        sender_has_identity_metadata: true,
        payout_destination: Some(format!("{sender}@ln.example")),
        target_author_eligible: true,
    }
}

/// A qualifying receipt on some other project note.
pub fn content_receipt(id: &str, sender: &str, amount: u64) -> Receipt {
    Receipt {
        target: "note1content".to_string(),
        is_admission_target: false,
        ..admission_receipt(id, sender, amount)
    }
}

/// Engine wired to a manual clock and a recording emitter.
pub struct TestHerd {
    pub engine: Arc<HerdEngine>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingEmitter>,
}

impl TestHerd {
    pub fn new(config: HerdConfig) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let events = Arc::new(RecordingEmitter::new());
        let engine = HerdEngine::new(config, events.clone(), clock.clone()).unwrap();
        Self { engine: Arc::new(engine), clock, events }
    }

    /// Default rules with the cooldown disabled.
    pub fn without_cooldown() -> Self {
        Self::new(HerdConfig {
            headbutt_cooldown_secs: 0,
            treasury_destination: "vault@ln.example".to_string(),
            ..HerdConfig::default()
        })
    }

    /// Current totals, highest first.
    pub fn totals(&self) -> Vec<u64> {
        self.engine.snapshot().iter().map(|m| m.cumulative).collect()
    }

    pub fn member(&self, key: &str) -> Option<Member> {
        self.engine
            .snapshot()
            .into_iter()
            .find(|m| m.identity.as_str() == key)
    }
}

/// Check the structural herd invariants on a snapshot.
pub fn assert_herd_invariants(members: &[Member], capacity: usize, min_amount: u64) {
    assert!(members.len() <= capacity, "herd size {} exceeds {capacity}", members.len());
    let mut keys: Vec<&str> = members.iter().map(|m| m.identity.as_str()).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), members.len(), "identity appears twice");
    for m in members {
        assert!(m.cumulative >= min_amount, "member {} below minimum", m.identity);
    }
    for pair in members.windows(2) {
        assert!(pair[0].cumulative >= pair[1].cumulative, "snapshot not ranked");
    }
}
