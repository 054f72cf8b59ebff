//! Core herd types: identities, receipts, members, outcomes, and events.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable handle for a participant (a nostr public key in production).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(pub String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier of a payment receipt, used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(pub String);

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReceiptId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One inbound payment event, as delivered by the ingestion collaborator.
///
/// Metadata checks (identity record present, payout destination resolvable,
/// target author tracked) are performed upstream and arrive as flags; the
/// herd never reinterprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Receipt identifier.
    pub id: ReceiptId,
    /// Amount paid, in sats.
    pub amount: u64,
    /// Who paid.
    pub sender: IdentityKey,
    /// Content the payment was attached to.
    pub target: String,
    /// Whether `target` is the current cycle's admission note.
    pub is_admission_target: bool,
    /// Whether the sender has a valid identity metadata record.
    pub sender_has_identity_metadata: bool,
    /// Sender's payout destination, if one is known.
    pub payout_destination: Option<String>,
    /// Whether the target content was authored by the tracked project.
    pub target_author_eligible: bool,
}

/// One occupant of a herd slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Participant identity.
    pub identity: IdentityKey,
    /// Opaque payout destination (e.g. a lightning address).
    pub payout_destination: String,
    /// Cumulative contribution in the current cycle.
    pub cumulative: u64,
    /// When the member joined the herd.
    pub joined_at: DateTime<Utc>,
    /// Per-cycle admission counter, breaks ties between equal timestamps.
    pub admission_seq: u64,
}

impl Member {
    /// Displacement order: lowest cumulative first, then the longest-standing
    /// member. The minimum under this order is the one that gets headbutted.
    pub fn displacement_cmp(&self, other: &Self) -> Ordering {
        self.cumulative
            .cmp(&other.cumulative)
            .then(self.joined_at.cmp(&other.joined_at))
            .then(self.admission_seq.cmp(&other.admission_seq))
    }

    /// Rank order: highest cumulative first, ties to the earliest joiner.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .cumulative
            .cmp(&self.cumulative)
            .then(self.joined_at.cmp(&other.joined_at))
            .then(self.admission_seq.cmp(&other.admission_seq))
    }
}

/// Why a receipt was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    AmountTooLow { amount: u64, minimum: u64 },
    MissingIdentityMetadata,
    MissingPayoutDestination,
    WrongTargetForNonMember,
    AuthorNotEligible,
    AmountOverflow,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmountTooLow { amount, minimum } => {
                write!(f, "amount {amount} below minimum {minimum}")
            }
            Self::MissingIdentityMetadata => f.write_str("missing identity metadata"),
            Self::MissingPayoutDestination => f.write_str("missing payout destination"),
            Self::WrongTargetForNonMember => f.write_str("non-member must pay on the admission note"),
            Self::AuthorNotEligible => f.write_str("target author not eligible"),
            Self::AmountOverflow => f.write_str("cumulative amount overflow"),
        }
    }
}

/// A receipt that may bring a new member into the herd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmitCandidate {
    pub identity: IdentityKey,
    pub payout_destination: String,
    pub amount: u64,
}

/// Result of running a receipt through the eligibility classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Admit(AdmitCandidate),
    Increment { identity: IdentityKey, amount: u64 },
    Rejected(RejectReason),
}

/// Terminal result of `admit_or_displace` on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// A free slot was taken.
    Admitted { identity: IdentityKey, amount: u64 },
    /// The lowest member was displaced; its total is discarded.
    Headbutted { identity: IdentityKey, displaced: Member, amount: u64 },
    /// The candidate did not beat the lowest member. Nothing changed.
    HeadbuttFailed { identity: IdentityKey, required_minimum: u64 },
    /// A displacement happened too recently. Nothing changed.
    CoolingDown { identity: IdentityKey, retry_after_secs: u64 },
}

/// Terminal result of processing one receipt end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReceiptOutcome {
    /// Already processed this cycle; dropped without side effects.
    Duplicate { receipt: ReceiptId },
    Admitted { identity: IdentityKey, amount: u64 },
    Incremented { identity: IdentityKey, new_total: u64 },
    Rejected { identity: IdentityKey, reason: RejectReason },
    Headbutted { identity: IdentityKey, displaced: IdentityKey, amount: u64 },
    HeadbuttFailed { identity: IdentityKey, required_minimum: u64 },
    HeadbuttCoolingDown { identity: IdentityKey, retry_after_secs: u64 },
}

impl ReceiptOutcome {
    /// Did this outcome change herd membership or totals?
    pub fn mutated(&self) -> bool {
        matches!(
            self,
            Self::Admitted { .. } | Self::Incremented { .. } | Self::Headbutted { .. }
        )
    }

    /// The notification for this outcome. Duplicates are silent.
    pub fn to_event(&self) -> Option<HerdEvent> {
        let event = match self {
            Self::Duplicate { .. } => return None,
            Self::Admitted { identity, amount } => HerdEvent::Admitted {
                identity: identity.clone(),
                amount: *amount,
            },
            Self::Incremented { identity, new_total } => HerdEvent::Incremented {
                identity: identity.clone(),
                new_total: *new_total,
            },
            Self::Rejected { identity, reason } => HerdEvent::Rejected {
                identity: identity.clone(),
                reason: reason.clone(),
            },
            Self::Headbutted { identity, displaced, amount } => HerdEvent::Headbutted {
                identity: identity.clone(),
                displaced: displaced.clone(),
                new_amount: *amount,
            },
            Self::HeadbuttFailed { identity, required_minimum } => HerdEvent::HeadbuttFailed {
                identity: identity.clone(),
                required_minimum: *required_minimum,
            },
            Self::HeadbuttCoolingDown { identity, retry_after_secs } => {
                HerdEvent::HeadbuttCoolingDown {
                    identity: identity.clone(),
                    retry_after_secs: *retry_after_secs,
                }
            }
        };
        Some(event)
    }
}

/// One member's portion of a payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub identity: IdentityKey,
    pub payout_destination: String,
    pub amount: u64,
}

/// Structured notification forwarded to the external emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HerdEvent {
    Admitted { identity: IdentityKey, amount: u64 },
    Incremented { identity: IdentityKey, new_total: u64 },
    Rejected { identity: IdentityKey, reason: RejectReason },
    Headbutted { identity: IdentityKey, displaced: IdentityKey, new_amount: u64 },
    HeadbuttFailed { identity: IdentityKey, required_minimum: u64 },
    HeadbuttCoolingDown { identity: IdentityKey, retry_after_secs: u64 },
    PayoutComputed { shares: Vec<Share>, undistributed: u64 },
    CycleReset { admission_reference: Option<String> },
}
