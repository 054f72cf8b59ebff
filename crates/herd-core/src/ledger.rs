//! The bounded membership ledger and its headbutt resolver.
//!
//! The ledger holds at most `capacity` members keyed by identity. It
//! provides:
//! - O(1) membership lookup and increment
//! - Admission into a free slot
//! - Headbutt displacement of the lowest member when full
//! - Ranked, detached snapshots for readers
//!
//! Displacement order is a strict total order over
//! `(cumulative, joined_at, admission_seq)`: the lowest contributor goes
//! first, and among equals the longest-standing member is displaced, so a
//! low contributor cannot squat a slot forever. A displaced member's total
//! is discarded, never carried over.
//!
//! Not thread-safe; callers should wrap in a `Mutex` or `RwLock` if
//! concurrent access is needed.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::constants::{HEADBUTT_COOLDOWN_SECS, MAX_HERD_SIZE, MIN_RECEIPT_AMOUNT};
use crate::error::LedgerError;
use crate::types::{AdmitCandidate, AdmitOutcome, IdentityKey, Member};

/// The current cycle's bounded, ranked set of members.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Primary storage: identity → member.
    members: HashMap<IdentityKey, Member>,
    /// Maximum number of members (N).
    capacity: usize,
    /// Floor for a headbutt's required minimum.
    min_amount: u64,
    /// Lock-out after a successful displacement.
    cooldown: Duration,
    /// When the last displacement happened this cycle.
    last_displacement_at: Option<DateTime<Utc>>,
    /// Next admission sequence number.
    next_seq: u64,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new(capacity: usize, min_amount: u64, cooldown: Duration) -> Self {
        Self {
            members: HashMap::with_capacity(capacity),
            capacity,
            min_amount,
            cooldown,
            last_displacement_at: None,
            next_seq: 0,
        }
    }

    /// Create an empty ledger with the default herd size, minimum, and cooldown.
    pub fn with_defaults() -> Self {
        Self::new(
            MAX_HERD_SIZE,
            MIN_RECEIPT_AMOUNT,
            Duration::seconds(HEADBUTT_COOLDOWN_SECS as i64),
        )
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    /// Free slots left.
    pub fn spots_remaining(&self) -> usize {
        self.capacity.saturating_sub(self.members.len())
    }

    pub fn contains(&self, identity: &IdentityKey) -> bool {
        self.members.contains_key(identity)
    }

    pub fn get(&self, identity: &IdentityKey) -> Option<&Member> {
        self.members.get(identity)
    }

    /// The member that a headbutt would displace.
    pub fn lowest(&self) -> Option<&Member> {
        self.members.values().min_by(|a, b| a.displacement_cmp(b))
    }

    /// Add `amount` to an existing member's total and return the new total.
    ///
    /// Fails with [`LedgerError::NotAMember`] if `identity` holds no slot;
    /// the caller must route such receipts through
    /// [`admit_or_displace`](Self::admit_or_displace) instead.
    pub fn increment(&mut self, identity: &IdentityKey, amount: u64) -> Result<u64, LedgerError> {
        let member = self
            .members
            .get_mut(identity)
            .ok_or_else(|| LedgerError::NotAMember(identity.to_string()))?;
        let new_total = member
            .cumulative
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow)?;
        member.cumulative = new_total;
        Ok(new_total)
    }

    /// Admit `candidate` into a free slot, or try to headbutt the lowest member.
    ///
    /// - Free slot: the candidate joins with `cumulative = amount`.
    /// - Full, cooling down: nothing changes, returns `CoolingDown`.
    /// - Full, `amount > lowest`: the lowest member is removed and its total
    ///   discarded; the candidate joins with `cumulative = amount`.
    /// - Full otherwise: nothing changes, returns `HeadbuttFailed` with
    ///   `required_minimum = max(min_amount, lowest + 1)`.
    ///
    /// Fails with [`LedgerError::AlreadyMember`] if the candidate already
    /// holds a slot (members may only increment).
    pub fn admit_or_displace(
        &mut self,
        candidate: AdmitCandidate,
        now: DateTime<Utc>,
    ) -> Result<AdmitOutcome, LedgerError> {
        if self.members.contains_key(&candidate.identity) {
            return Err(LedgerError::AlreadyMember(candidate.identity.to_string()));
        }

        if !self.is_full() {
            let identity = candidate.identity.clone();
            let amount = candidate.amount;
            self.insert(candidate, now);
            return Ok(AdmitOutcome::Admitted { identity, amount });
        }

        if let Some(retry_after_secs) = self.cooldown_remaining_secs(now) {
            debug!(identity = %candidate.identity, retry_after_secs, "headbutt refused: cooling down");
            return Ok(AdmitOutcome::CoolingDown {
                identity: candidate.identity,
                retry_after_secs,
            });
        }

        let Some(lowest) = self.lowest() else {
            // Zero-capacity ledger: nobody to displace.
            return Ok(AdmitOutcome::HeadbuttFailed {
                identity: candidate.identity,
                required_minimum: self.min_amount,
            });
        };

        let required_minimum = self.min_amount.max(lowest.cumulative.saturating_add(1));
        if candidate.amount < required_minimum {
            debug!(
                identity = %candidate.identity,
                amount = candidate.amount,
                required_minimum,
                "headbutt failed"
            );
            return Ok(AdmitOutcome::HeadbuttFailed {
                identity: candidate.identity,
                required_minimum,
            });
        }

        let victim_key = lowest.identity.clone();
        let displaced = self
            .members
            .remove(&victim_key)
            .ok_or_else(|| LedgerError::NotAMember(victim_key.to_string()))?;
        let identity = candidate.identity.clone();
        let amount = candidate.amount;
        self.insert(candidate, now);
        self.last_displacement_at = Some(now);

        debug!(
            identity = %identity,
            displaced = %displaced.identity,
            displaced_amount = displaced.cumulative,
            amount,
            "headbutt succeeded"
        );
        Ok(AdmitOutcome::Headbutted { identity, displaced, amount })
    }

    /// Seconds until displacement is allowed again, or `None` if it already is.
    ///
    /// Rounded up so a caller retrying after the returned delay never lands
    /// inside the window.
    pub fn cooldown_remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        let last = self.last_displacement_at?;
        let remaining = (last + self.cooldown) - now;
        if remaining <= Duration::zero() {
            return None;
        }
        let millis = remaining.num_milliseconds().max(1) as u64;
        Some(millis.div_ceil(1_000))
    }

    /// Ranked copy of all members, highest contributor first.
    pub fn snapshot(&self) -> Vec<Member> {
        let mut members: Vec<Member> = self.members.values().cloned().collect();
        members.sort_by(Member::rank_cmp);
        members
    }

    /// Remove every member and forget the cooldown. Totals are discarded.
    pub fn clear(&mut self) {
        self.members.clear();
        self.last_displacement_at = None;
        self.next_seq = 0;
    }

    /// Internal: insert a fresh member.
    fn insert(&mut self, candidate: AdmitCandidate, now: DateTime<Utc>) {
        let member = Member {
            identity: candidate.identity.clone(),
            payout_destination: candidate.payout_destination,
            cumulative: candidate.amount,
            joined_at: now,
            admission_seq: self.next_seq,
        };
        self.next_seq += 1;
        self.members.insert(candidate.identity, member);
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::with_defaults()
    }
}
