//! Per-cycle receipt deduplication.
//!
//! Upstream relays may redeliver the same receipt any number of times, so
//! every receipt identifier is admitted at most once per cycle. The check
//! and the mark are a single call ([`ReceiptDeduplicator::mark_seen`]) so a
//! caller holding `&mut self` can never let two deliveries through.
//!
//! Not thread-safe; the engine keeps this inside its ledger lock.

use std::collections::HashSet;

use crate::types::ReceiptId;

/// Set of receipt identifiers processed in the current cycle.
#[derive(Debug, Default, Clone)]
pub struct ReceiptDeduplicator {
    seen: HashSet<ReceiptId>,
}

impl ReceiptDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Has `id` already been processed this cycle?
    pub fn seen(&self, id: &ReceiptId) -> bool {
        self.seen.contains(id)
    }

    /// Mark `id` as processed.
    ///
    /// Returns `true` if this call marked it, `false` if it was already
    /// marked (the receipt is a duplicate and must be dropped).
    pub fn mark_seen(&mut self, id: ReceiptId) -> bool {
        self.seen.insert(id)
    }

    /// Number of identifiers seen this cycle.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Forget everything. Called on cycle reset.
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
