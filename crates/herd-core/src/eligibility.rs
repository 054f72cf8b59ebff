//! Receipt eligibility classification.
//!
//! Decides which path a receipt takes through the herd:
//! - **Admit**: a non-member paying on the cycle's admission note, with
//!   identity metadata and a payout destination.
//! - **Increment**: an existing member paying on any eligible content
//!   (the admission note included).
//! - **Rejected**: everything else, with a [`RejectReason`].
//!
//! Checks run in a fixed order so every receipt maps to exactly one reason:
//! author eligibility, amount, membership, target, identity metadata, payout
//! destination. Classification is pure; the membership lookup is supplied by
//! the caller.

use crate::constants::MIN_RECEIPT_AMOUNT;
use crate::types::{AdmitCandidate, Classification, Receipt, RejectReason};

/// Classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityRules {
    /// Smallest qualifying amount, inclusive.
    pub min_amount: u64,
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self { min_amount: MIN_RECEIPT_AMOUNT }
    }
}

impl EligibilityRules {
    pub fn new(min_amount: u64) -> Self {
        Self { min_amount }
    }

    /// Classify `receipt`. `is_member` says whether the sender currently
    /// holds a herd slot.
    pub fn classify(&self, receipt: &Receipt, is_member: bool) -> Classification {
        if !receipt.target_author_eligible {
            return Classification::Rejected(RejectReason::AuthorNotEligible);
        }
        if receipt.amount < self.min_amount {
            return Classification::Rejected(RejectReason::AmountTooLow {
                amount: receipt.amount,
                minimum: self.min_amount,
            });
        }
        if is_member {
            return Classification::Increment {
                identity: receipt.sender.clone(),
                amount: receipt.amount,
            };
        }
        if !receipt.is_admission_target {
            return Classification::Rejected(RejectReason::WrongTargetForNonMember);
        }
        if !receipt.sender_has_identity_metadata {
            return Classification::Rejected(RejectReason::MissingIdentityMetadata);
        }
        let destination = match receipt.payout_destination.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => return Classification::Rejected(RejectReason::MissingPayoutDestination),
        };
        Classification::Admit(AdmitCandidate {
            identity: receipt.sender.clone(),
            payout_destination: destination,
            amount: receipt.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IdentityKey, ReceiptId};

    fn receipt(amount: u64, admission: bool) -> Receipt {
        Receipt {
            id: ReceiptId::from("zap-1"),
            amount,
            sender: IdentityKey::from("npub-alice"),
            target: "note-1".to_string(),
            is_admission_target: admission,
            sender_has_identity_metadata: true,
            payout_destination: Some("alice@ln.example".to_string()),
            target_author_eligible: true,
        }
    }

    fn rules() -> EligibilityRules {
        EligibilityRules::default()
    }

    // ------------------------------------------------------------------
    // Admission path
    // ------------------------------------------------------------------

    #[test]
    fn non_member_on_admission_note_is_admit_candidate() {
        match rules().classify(&receipt(21, true), false) {
            Classification::Admit(c) => {
                assert_eq!(c.identity, IdentityKey::from("npub-alice"));
                assert_eq!(c.amount, 21);
                assert_eq!(c.payout_destination, "alice@ln.example");
            }
            other => panic!("expected admit, got {other:?}"),
        }
    }

    #[test]
    fn minimum_amount_is_inclusive() {
        assert!(matches!(
            rules().classify(&receipt(MIN_RECEIPT_AMOUNT, true), false),
            Classification::Admit(_)
        ));
    }

    #[test]
    fn non_member_on_other_note_is_rejected() {
        assert_eq!(
            rules().classify(&receipt(100, false), false),
            Classification::Rejected(RejectReason::WrongTargetForNonMember)
        );
    }

    #[test]
    fn missing_metadata_is_rejected() {
        let mut r = receipt(100, true);
        r.sender_has_identity_metadata = false;
        assert_eq!(
            rules().classify(&r, false),
            Classification::Rejected(RejectReason::MissingIdentityMetadata)
        );
    }

    #[test]
    fn missing_or_blank_destination_is_rejected() {
        let mut r = receipt(100, true);
        r.payout_destination = None;
        assert_eq!(
            rules().classify(&r, false),
            Classification::Rejected(RejectReason::MissingPayoutDestination)
        );
        r.payout_destination = Some("   ".to_string());
        assert_eq!(
            rules().classify(&r, false),
            Classification::Rejected(RejectReason::MissingPayoutDestination)
        );
    }

    // ------------------------------------------------------------------
    // Increment path
    // ------------------------------------------------------------------

    #[test]
    fn member_on_any_note_is_increment() {
        assert_eq!(
            rules().classify(&receipt(200, false), true),
            Classification::Increment { identity: IdentityKey::from("npub-alice"), amount: 200 }
        );
    }

    #[test]
    fn member_on_admission_note_is_still_increment() {
        assert!(matches!(
            rules().classify(&receipt(200, true), true),
            Classification::Increment { .. }
        ));
    }

    #[test]
    fn member_increment_does_not_recheck_metadata() {
        let mut r = receipt(50, false);
        r.sender_has_identity_metadata = false;
        r.payout_destination = None;
        assert!(matches!(rules().classify(&r, true), Classification::Increment { .. }));
    }

    // ------------------------------------------------------------------
    // Shared rejections
    // ------------------------------------------------------------------

    #[test]
    fn low_amount_rejected_for_everyone() {
        let expected = Classification::Rejected(RejectReason::AmountTooLow { amount: 9, minimum: 10 });
        assert_eq!(rules().classify(&receipt(9, true), false), expected);
        assert_eq!(rules().classify(&receipt(9, false), true), expected);
    }

    #[test]
    fn ineligible_author_checked_first() {
        let mut r = receipt(1, false);
        r.target_author_eligible = false;
        assert_eq!(
            rules().classify(&r, false),
            Classification::Rejected(RejectReason::AuthorNotEligible)
        );
    }

    #[test]
    fn custom_minimum() {
        let rules = EligibilityRules::new(100);
        assert!(matches!(
            rules.classify(&receipt(99, true), false),
            Classification::Rejected(RejectReason::AmountTooLow { minimum: 100, .. })
        ));
    }
}
