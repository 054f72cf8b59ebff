//! Herd constants. All amounts are in sats (the smallest payment unit).

/// Maximum number of members the herd holds at once.
pub const MAX_HERD_SIZE: usize = 3;

/// Minimum receipt amount that qualifies for admission or increment.
pub const MIN_RECEIPT_AMOUNT: u64 = 10;

/// Basis-point denominator (10_000 bps = 100%).
pub const BPS_PRECISION: u64 = 10_000;

/// Share of every trigger amount disbursed to the herd, in basis points (10%).
///
/// The remaining 90% is disbursed to the treasury outside the herd.
pub const HERD_FRACTION_BPS: u64 = 1_000;

/// Seconds after a successful headbutt during which no further displacement
/// is accepted.
pub const HEADBUTT_COOLDOWN_SECS: u64 = 5;

/// UTC hour at which the daily cycle boundary falls.
pub const RESET_HOUR_UTC: u32 = 0;

/// UTC minute at which the daily cycle boundary falls.
pub const RESET_MINUTE_UTC: u32 = 0;

/// Total percentage handed to split-payment targets.
pub const SPLIT_TOTAL_PERCENT: u64 = 100;

/// Minimum percentage any single herd split target receives.
pub const MIN_SPLIT_PERCENT_PER_MEMBER: u64 = 1;

/// Default JSON-RPC port for the herd daemon.
pub const DEFAULT_RPC_PORT: u16 = 18440;

/// Herd share expressed as a whole percentage for split targets.
///
/// # Examples
///
/// ```
/// use herd_core::constants::{herd_split_percent, HERD_FRACTION_BPS};
/// assert_eq!(herd_split_percent(HERD_FRACTION_BPS), 10);
/// ```
pub const fn herd_split_percent(fraction_bps: u64) -> u64 {
    fraction_bps * SPLIT_TOTAL_PERCENT / BPS_PRECISION
}
