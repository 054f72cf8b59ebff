//! # herd-core
//! Foundation types and rules for the CyberHerd: a small, bounded,
//! continuously contested leaderboard of payers.
//!
//! All amount arithmetic is integer-only. Nothing in this crate performs
//! I/O or holds locks across calls; the service crate composes these parts
//! behind a single mutation lock.

pub mod constants;
pub mod cycle;
pub mod dedup;
pub mod eligibility;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod payout;
pub mod split;
pub mod traits;
pub mod types;

pub use dedup::ReceiptDeduplicator;
pub use eligibility::EligibilityRules;
pub use ledger::Ledger;
pub use payout::{compute_shares, PayoutSplit};
