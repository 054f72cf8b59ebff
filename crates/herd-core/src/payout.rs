//! Proportional payout computation.
//!
//! When the external trigger fires with `trigger_amount`, the herd receives
//! `floor(trigger_amount * fraction_bps / 10_000)` (10% by default). That
//! disbursable amount is divided across members proportionally to their
//! cumulative totals using integer floor division. The leftover from
//! flooring goes to the top-ranked member, so the shares always sum to
//! exactly the disbursable amount.
//!
//! All arithmetic uses u128 intermediates; no floating point is involved.

use serde::Serialize;

use crate::constants::BPS_PRECISION;
use crate::types::{Member, Share};

/// The result of splitting one trigger amount across the herd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutSplit {
    /// The amount that fired the trigger.
    pub trigger_amount: u64,
    /// The herd's portion of `trigger_amount`.
    pub disbursable: u64,
    /// Per-member amounts, highest contributor first.
    pub shares: Vec<Share>,
    /// Portion of `disbursable` assigned to nobody (only when the herd holds
    /// no contributions).
    pub undistributed: u64,
}

impl PayoutSplit {
    /// Sum of all member shares.
    pub fn distributed(&self) -> u64 {
        self.shares.iter().map(|s| s.amount).sum()
    }

    /// Share for a given identity, if it is in the split.
    pub fn share_of(&self, identity: &str) -> Option<u64> {
        self.shares
            .iter()
            .find(|s| s.identity.as_str() == identity)
            .map(|s| s.amount)
    }
}

/// The herd's portion of a trigger amount.
///
/// `fraction_bps` above 10_000 is treated as 100%.
///
/// # Examples
///
/// ```
/// use herd_core::payout::disbursable_amount;
/// assert_eq!(disbursable_amount(1_000, 1_000), 100);
/// assert_eq!(disbursable_amount(19, 1_000), 1);
/// ```
pub fn disbursable_amount(trigger_amount: u64, fraction_bps: u64) -> u64 {
    let bps = fraction_bps.min(BPS_PRECISION) as u128;
    (trigger_amount as u128 * bps / BPS_PRECISION as u128) as u64
}

/// Split the herd's portion of `trigger_amount` across `members`.
///
/// Shares are `floor(disbursable * cumulative / total)`; the remainder is
/// added to the top-ranked member (largest total, earliest joiner on ties).
/// If the members hold no contributions at all, nothing is split and the
/// whole disbursable amount is reported as undistributed.
pub fn compute_shares(trigger_amount: u64, members: &[Member], fraction_bps: u64) -> PayoutSplit {
    let disbursable = disbursable_amount(trigger_amount, fraction_bps);
    let total: u128 = members.iter().map(|m| m.cumulative as u128).sum();

    if total == 0 {
        return PayoutSplit {
            trigger_amount,
            disbursable,
            shares: Vec::new(),
            undistributed: disbursable,
        };
    }

    let mut ranked: Vec<&Member> = members.iter().collect();
    ranked.sort_by(|a, b| a.rank_cmp(b));

    let mut shares: Vec<Share> = ranked
        .iter()
        .map(|m| Share {
            identity: m.identity.clone(),
            payout_destination: m.payout_destination.clone(),
            // Each share is at most `disbursable`, so the cast cannot truncate.
            amount: (disbursable as u128 * m.cumulative as u128 / total) as u64,
        })
        .collect();

    let distributed: u64 = shares.iter().map(|s| s.amount).sum();
    let remainder = disbursable - distributed;
    if let Some(top) = shares.first_mut() {
        top.amount += remainder;
    }

    PayoutSplit {
        trigger_amount,
        disbursable,
        shares,
        undistributed: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HERD_FRACTION_BPS;
    use crate::types::IdentityKey;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn member(key: &str, cumulative: u64, joined_secs: i64) -> Member {
        Member {
            identity: IdentityKey::from(key),
            payout_destination: format!("{key}@ln.example"),
            cumulative,
            joined_at: Utc.timestamp_opt(1_700_000_000 + joined_secs, 0).unwrap(),
            admission_seq: joined_secs as u64,
        }
    }

    // ------------------------------------------------------------------
    // disbursable_amount
    // ------------------------------------------------------------------

    #[test]
    fn disbursable_is_ten_percent_floored() {
        assert_eq!(disbursable_amount(1_000, HERD_FRACTION_BPS), 100);
        assert_eq!(disbursable_amount(1_009, HERD_FRACTION_BPS), 100);
        assert_eq!(disbursable_amount(9, HERD_FRACTION_BPS), 0);
        assert_eq!(disbursable_amount(0, HERD_FRACTION_BPS), 0);
    }

    #[test]
    fn disbursable_no_overflow_at_max() {
        assert_eq!(disbursable_amount(u64::MAX, HERD_FRACTION_BPS), u64::MAX / 10);
    }

    #[test]
    fn disbursable_clamps_fraction() {
        assert_eq!(disbursable_amount(500, 50_000), 500);
    }

    // ------------------------------------------------------------------
    // compute_shares
    // ------------------------------------------------------------------

    #[test]
    fn proportional_example() {
        let members = vec![member("a", 500, 0), member("b", 300, 1), member("c", 200, 2)];
        let split = compute_shares(1_000, &members, HERD_FRACTION_BPS);
        assert_eq!(split.disbursable, 100);
        let amounts: Vec<u64> = split.shares.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![50, 30, 20]);
        assert_eq!(split.undistributed, 0);
    }

    #[test]
    fn remainder_goes_to_top_member() {
        // 100 split 1:1:1 → 33 each, remainder 1 to the top member.
        let members = vec![member("late", 10, 5), member("early", 10, 0), member("mid", 10, 2)];
        let split = compute_shares(1_000, &members, HERD_FRACTION_BPS);
        assert_eq!(split.share_of("early"), Some(34));
        assert_eq!(split.share_of("mid"), Some(33));
        assert_eq!(split.share_of("late"), Some(33));
        assert_eq!(split.distributed(), 100);
    }

    #[test]
    fn remainder_to_largest_even_if_listed_last() {
        let members = vec![member("small", 1, 0), member("big", 2, 1)];
        let split = compute_shares(100, &members, HERD_FRACTION_BPS);
        // 10 * 1/3 = 3, 10 * 2/3 = 6, remainder 1 → big.
        assert_eq!(split.share_of("big"), Some(7));
        assert_eq!(split.share_of("small"), Some(3));
        assert_eq!(split.shares[0].identity, IdentityKey::from("big"));
    }

    #[test]
    fn empty_herd_leaves_everything_undistributed() {
        let split = compute_shares(1_000, &[], HERD_FRACTION_BPS);
        assert!(split.shares.is_empty());
        assert_eq!(split.undistributed, 100);
    }

    #[test]
    fn all_zero_totals_leave_everything_undistributed() {
        let members = vec![member("a", 0, 0), member("b", 0, 1)];
        let split = compute_shares(1_000, &members, HERD_FRACTION_BPS);
        assert!(split.shares.is_empty());
        assert_eq!(split.undistributed, 100);
    }

    #[test]
    fn zero_trigger_gives_zero_shares() {
        let members = vec![member("a", 50, 0)];
        let split = compute_shares(0, &members, HERD_FRACTION_BPS);
        assert_eq!(split.distributed(), 0);
        assert_eq!(split.undistributed, 0);
    }

    #[test]
    fn huge_totals_do_not_overflow() {
        let members = vec![member("a", u64::MAX, 0), member("b", u64::MAX, 1)];
        let split = compute_shares(u64::MAX, &members, HERD_FRACTION_BPS);
        assert_eq!(split.distributed(), u64::MAX / 10);
    }

    #[test]
    fn shares_carry_payout_destination() {
        let split = compute_shares(1_000, &[member("a", 10, 0)], HERD_FRACTION_BPS);
        assert_eq!(split.shares[0].payout_destination, "a@ln.example");
    }

    // --- proptest ---

    proptest! {
        /// Shares sum to exactly the disbursable amount, come out in rank
        /// order, and never shrink for a larger contributor.
        #[test]
        fn shares_sum_exactly_in_rank_order(
            totals in prop::collection::vec(1u64..=u64::MAX / 16, 1..10),
            trigger in any::<u64>(),
            fraction_bps in 0u64..=10_000,
        ) {
            let members: Vec<Member> = totals
                .iter()
                .enumerate()
                .map(|(i, &c)| member(&format!("m{i}"), c, i as i64))
                .collect();
            let split = compute_shares(trigger, &members, fraction_bps);

            prop_assert_eq!(split.disbursable, disbursable_amount(trigger, fraction_bps));
            prop_assert_eq!(split.distributed(), split.disbursable);
            prop_assert_eq!(split.undistributed, 0);
            prop_assert_eq!(split.shares.len(), members.len());

            let by_key = |s: &Share| members.iter().find(|m| m.identity == s.identity).unwrap();
            for pair in split.shares.windows(2) {
                let (a, b) = (by_key(&pair[0]), by_key(&pair[1]));
                prop_assert!(a.rank_cmp(b).is_lt());
                prop_assert!(pair[0].amount >= pair[1].amount);
            }
        }
    }
}
