//! Percentage split targets for an external split-payment service.
//!
//! Split-payment wallets take whole-percent allocations. The treasury keeps
//! a fixed `100 - herd_percent` and the herd's percentage is divided among
//! members:
//! 1. Every member gets a floor of 1%; if there are more members than
//!    percentage points, only the top contributors are kept.
//! 2. The rest is shared by `floor(cumulative * rest / total)`.
//! 3. Points lost to flooring are handed out one at a time, round-robin
//!    from the top contributor.
//!
//! Allocations always sum to exactly 100.

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_SPLIT_PERCENT_PER_MEMBER, SPLIT_TOTAL_PERCENT};
use crate::types::Member;

/// One split-payment recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitTarget {
    /// Display label.
    pub alias: String,
    /// Payout destination (wallet or lightning address).
    pub destination: String,
    /// Whole-percent allocation.
    pub percent: u64,
}

/// Build split targets: the treasury first, then members by rank.
///
/// Members paying out to the treasury's own destination are skipped.
pub fn split_targets(
    members: &[Member],
    treasury_alias: &str,
    treasury_destination: &str,
    herd_percent: u64,
) -> Vec<SplitTarget> {
    let herd_percent = herd_percent.min(SPLIT_TOTAL_PERCENT);

    let mut ranked: Vec<&Member> = members
        .iter()
        .filter(|m| m.payout_destination != treasury_destination)
        .collect();
    ranked.sort_by(|a, b| a.rank_cmp(b));
    ranked.truncate((herd_percent / MIN_SPLIT_PERCENT_PER_MEMBER) as usize);

    let treasury = |percent| SplitTarget {
        alias: treasury_alias.to_string(),
        destination: treasury_destination.to_string(),
        percent,
    };

    if ranked.is_empty() {
        return vec![treasury(SPLIT_TOTAL_PERCENT)];
    }

    let mut percents = vec![MIN_SPLIT_PERCENT_PER_MEMBER; ranked.len()];
    let allocated = MIN_SPLIT_PERCENT_PER_MEMBER * ranked.len() as u64;
    let rest = herd_percent - allocated;

    let total: u128 = ranked.iter().map(|m| m.cumulative as u128).sum();
    if rest > 0 && total > 0 {
        for (percent, member) in percents.iter_mut().zip(&ranked) {
            *percent += (member.cumulative as u128 * rest as u128 / total) as u64;
        }
    }

    let assigned: u64 = percents.iter().sum();
    let leftover = herd_percent - assigned;
    for i in 0..leftover as usize {
        let slot = i % percents.len();
        percents[slot] += 1;
    }

    let mut targets = Vec::with_capacity(ranked.len() + 1);
    targets.push(treasury(SPLIT_TOTAL_PERCENT - herd_percent));
    targets.extend(ranked.iter().zip(percents).map(|(m, percent)| SplitTarget {
        alias: m.identity.to_string(),
        destination: m.payout_destination.clone(),
        percent,
    }));
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdentityKey;
    use chrono::{TimeZone, Utc};

    fn member(key: &str, cumulative: u64, joined_secs: i64) -> Member {
        Member {
            identity: IdentityKey::from(key),
            payout_destination: format!("{key}@ln.example"),
            cumulative,
            joined_at: Utc.timestamp_opt(1_700_000_000 + joined_secs, 0).unwrap(),
            admission_seq: joined_secs as u64,
        }
    }

    fn sum(targets: &[SplitTarget]) -> u64 {
        targets.iter().map(|t| t.percent).sum()
    }

    #[test]
    fn empty_herd_sends_everything_to_treasury() {
        let targets = split_targets(&[], "treasury", "vault@ln.example", 10);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].percent, 100);
    }

    #[test]
    fn treasury_keeps_ninety() {
        let members = vec![member("a", 500, 0), member("b", 300, 1), member("c", 200, 2)];
        let targets = split_targets(&members, "treasury", "vault@ln.example", 10);
        assert_eq!(targets[0].alias, "treasury");
        assert_eq!(targets[0].percent, 90);
        assert_eq!(sum(&targets), 100);
    }

    #[test]
    fn members_get_floor_plus_proportional() {
        // rest = 7: a gets 1 + floor(500*7/1000)=3 → 4, b 1+2=3, c 1+1=2; leftover 1 → a.
        let members = vec![member("a", 500, 0), member("b", 300, 1), member("c", 200, 2)];
        let targets = split_targets(&members, "treasury", "vault@ln.example", 10);
        let percents: Vec<u64> = targets[1..].iter().map(|t| t.percent).collect();
        assert_eq!(percents, vec![5, 3, 2]);
    }

    #[test]
    fn single_member_takes_full_herd_share() {
        let targets = split_targets(&[member("a", 21, 0)], "treasury", "vault@ln.example", 10);
        assert_eq!(targets[1].percent, 10);
        assert_eq!(sum(&targets), 100);
    }

    #[test]
    fn more_members_than_points_keeps_top_contributors() {
        let members: Vec<Member> = (0..5).map(|i| member(&format!("m{i}"), 10 + i as u64, i)).collect();
        let targets = split_targets(&members, "treasury", "vault@ln.example", 3);
        assert_eq!(targets.len(), 4);
        let kept: Vec<&str> = targets[1..].iter().map(|t| t.alias.as_str()).collect();
        assert_eq!(kept, vec!["m4", "m3", "m2"]);
        assert_eq!(sum(&targets), 100);
    }

    #[test]
    fn treasury_destination_member_is_skipped() {
        let mut m = member("a", 100, 0);
        m.payout_destination = "vault@ln.example".to_string();
        let targets = split_targets(&[m, member("b", 100, 1)], "treasury", "vault@ln.example", 10);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].alias, "b");
    }

    #[test]
    fn zero_herd_percent_is_all_treasury() {
        let targets = split_targets(&[member("a", 100, 0)], "treasury", "vault@ln.example", 0);
        assert_eq!(targets, vec![SplitTarget {
            alias: "treasury".into(),
            destination: "vault@ln.example".into(),
            percent: 100,
        }]);
    }

    #[test]
    fn zero_totals_split_evenly_by_round_robin() {
        let members = vec![member("a", 0, 0), member("b", 0, 1)];
        let targets = split_targets(&members, "treasury", "vault@ln.example", 10);
        assert_eq!(targets[1].percent, 5);
        assert_eq!(targets[2].percent, 5);
    }
}
