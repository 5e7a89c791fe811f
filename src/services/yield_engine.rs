//! Vesting yield accrual engine
//!
//! Pure accrual math shared by the live display projection and the hourly
//! settlement batch. Accrual is linear in elapsed wall-clock time against a
//! fixed 30-day month and clamped at the monthly ceiling; it never compounds.

use chrono::{DateTime, Duration, DurationRound, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// Fixed monthly yield rate on vesting-eligible principal
pub const MONTHLY_YIELD_RATE: Decimal = dec!(0.03);

/// Fixed 30-day month used for the accrual denominator
pub const SECONDS_PER_MONTH: i64 = 2_592_000;

/// Claims below this amount are rejected as not worth processing
pub const CLAIM_DUST_THRESHOLD: Decimal = dec!(0.000001);

/// Direct referrals required before yield can be claimed
pub const MIN_CLAIM_REFERRALS: i32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("claim requires {required} direct referrals, user has {actual}")]
    InsufficientReferrals { required: i32, actual: i32 },
    #[error("identity verification is not approved")]
    KycNotApproved,
    #[error("accumulated yield is below the dust threshold")]
    NothingToClaim,
}

/// OHLC state of an already-persisted candle for the current hour bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketState {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
}

/// Candle row produced (or merged) by a settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleUpdate {
    pub timestamp_hour: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Outcome of the pure half of a settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub session_yield: Decimal,
    pub new_accumulated_yield: Decimal,
    pub new_last_yield_update: DateTime<Utc>,
    pub candle: CandleUpdate,
}

/// Yield accrued on `principal` over `seconds_elapsed`, clamped at the
/// monthly ceiling `principal * monthly_rate`.
///
/// Negative elapsed time (clock skew) accrues nothing. The clamp bounds the
/// accrual even after an arbitrarily long settlement gap.
pub fn compute_accrued(
    principal: Decimal,
    monthly_rate: Decimal,
    seconds_elapsed: i64,
    seconds_per_month: i64,
) -> Decimal {
    if principal <= Decimal::ZERO || seconds_per_month <= 0 {
        return Decimal::ZERO;
    }

    let elapsed = seconds_elapsed.max(0);
    let ceiling = principal * monthly_rate;
    let linear = ceiling * Decimal::from(elapsed) / Decimal::from(seconds_per_month);

    linear.min(ceiling)
}

/// Non-mutating projection of total yield as of `now`, for display ticking.
/// Never advances `last_yield_update`.
pub fn project_live_yield(
    principal: Decimal,
    accumulated_yield: Decimal,
    last_yield_update: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Decimal {
    let elapsed = (now - last_yield_update).num_seconds();
    let session = compute_accrued(principal, MONTHLY_YIELD_RATE, elapsed, SECONDS_PER_MONTH);

    cap_accumulated(principal, accumulated_yield, session)
}

/// Truncate a timestamp to its hour bucket
pub fn hour_bucket(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(Duration::hours(1)).unwrap_or(ts)
}

/// Compute the authoritative settlement of an account as of `now`.
///
/// `existing_bucket` carries the OHLC state of a candle already persisted for
/// the current hour, so re-running settlement within the same bucket merges
/// into that candle instead of appending a second one. The caller persists
/// the returned values; this function touches no storage.
pub fn settle_math(
    principal: Decimal,
    accumulated_yield: Decimal,
    last_yield_update: DateTime<Utc>,
    now: DateTime<Utc>,
    existing_bucket: Option<BucketState>,
) -> Settlement {
    let elapsed = (now - last_yield_update).num_seconds();
    let session_yield = compute_accrued(principal, MONTHLY_YIELD_RATE, elapsed, SECONDS_PER_MONTH);
    let new_accumulated = cap_accumulated(principal, accumulated_yield, session_yield);

    // First settlement in a bucket opens at the prior close, which is the
    // accumulated figure carried into this call. Later settlements in the
    // same bucket keep the recorded open and extend high/low.
    let open = existing_bucket.map(|b| b.open).unwrap_or(accumulated_yield);
    let high = existing_bucket
        .map(|b| b.high)
        .unwrap_or(open)
        .max(new_accumulated);
    let low = existing_bucket
        .map(|b| b.low)
        .unwrap_or(open)
        .min(new_accumulated);

    let candle = CandleUpdate {
        timestamp_hour: hour_bucket(now),
        open,
        high,
        low,
        close: new_accumulated,
        volume: new_accumulated - open,
    };

    Settlement {
        session_yield,
        new_accumulated_yield: new_accumulated,
        new_last_yield_update: now,
        candle,
    }
}

/// Eligibility gate for claiming accumulated yield. Pure; callers apply the
/// resulting debit/credit atomically.
pub fn evaluate_claim(
    accumulated_yield: Decimal,
    direct_referrals: i32,
    kyc_approved: bool,
) -> Result<Decimal, ClaimError> {
    if direct_referrals < MIN_CLAIM_REFERRALS {
        return Err(ClaimError::InsufficientReferrals {
            required: MIN_CLAIM_REFERRALS,
            actual: direct_referrals,
        });
    }

    if !kyc_approved {
        return Err(ClaimError::KycNotApproved);
    }

    if accumulated_yield < CLAIM_DUST_THRESHOLD {
        return Err(ClaimError::NothingToClaim);
    }

    Ok(accumulated_yield)
}

// Accumulated yield is monotonic until a claim and never grows past the
// monthly ceiling.
fn cap_accumulated(principal: Decimal, accumulated: Decimal, session: Decimal) -> Decimal {
    let ceiling = principal * MONTHLY_YIELD_RATE;
    (accumulated + session).min(ceiling).max(accumulated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn accrual_never_exceeds_monthly_ceiling() {
        let principal = dec!(1000);
        let ceiling = principal * MONTHLY_YIELD_RATE;

        for elapsed in [0, 1, 86_400, SECONDS_PER_MONTH, SECONDS_PER_MONTH * 10, i64::MAX / 2] {
            let accrued = compute_accrued(principal, MONTHLY_YIELD_RATE, elapsed, SECONDS_PER_MONTH);
            assert!(accrued <= ceiling, "elapsed={} accrued={}", elapsed, accrued);
        }
    }

    #[test]
    fn zero_elapsed_accrues_nothing() {
        let accrued = compute_accrued(dec!(1000), MONTHLY_YIELD_RATE, 0, SECONDS_PER_MONTH);
        assert_eq!(accrued, Decimal::ZERO);
    }

    #[test]
    fn negative_elapsed_treated_as_zero() {
        let accrued = compute_accrued(dec!(1000), MONTHLY_YIELD_RATE, -3600, SECONDS_PER_MONTH);
        assert_eq!(accrued, Decimal::ZERO);
    }

    #[test]
    fn zero_principal_accrues_nothing() {
        let accrued = compute_accrued(Decimal::ZERO, MONTHLY_YIELD_RATE, 86_400, SECONDS_PER_MONTH);
        assert_eq!(accrued, Decimal::ZERO);
    }

    #[test]
    fn accrual_is_monotonic_in_elapsed_time() {
        let principal = dec!(250.5);
        let mut prev = Decimal::ZERO;

        for elapsed in (0..SECONDS_PER_MONTH * 2).step_by(100_000) {
            let accrued = compute_accrued(principal, MONTHLY_YIELD_RATE, elapsed, SECONDS_PER_MONTH);
            assert!(accrued >= prev, "accrual decreased at elapsed={}", elapsed);
            prev = accrued;
        }
    }

    #[test]
    fn one_day_on_round_numbers_accrues_exactly_one() {
        // 1000 * 0.03 * 86400 / 2592000 == 1.0
        let accrued = compute_accrued(dec!(1000), dec!(0.03), 86_400, SECONDS_PER_MONTH);
        assert_eq!(accrued, dec!(1.0));
    }

    #[test]
    fn settle_twice_with_no_elapsed_time_is_a_no_op() {
        let principal = dec!(1000);
        let now = ts(86_400);

        let first = settle_math(principal, Decimal::ZERO, ts(0), now, None);
        assert_eq!(first.session_yield, dec!(1.0));

        let bucket = BucketState {
            open: first.candle.open,
            high: first.candle.high,
            low: first.candle.low,
        };
        let second = settle_math(
            principal,
            first.new_accumulated_yield,
            first.new_last_yield_update,
            now,
            Some(bucket),
        );

        assert_eq!(second.session_yield, Decimal::ZERO);
        assert_eq!(second.new_accumulated_yield, first.new_accumulated_yield);
        assert_eq!(second.candle, first.candle);
    }

    #[test]
    fn candle_chain_open_equals_previous_close() {
        let principal = dec!(500);
        let mut accumulated = Decimal::ZERO;
        let mut last_update = ts(0);
        let mut candles = Vec::new();

        // Three settlements an hour apart, each landing in its own bucket
        for hour in 1..=3 {
            let now = ts(hour * 3600);
            let settlement = settle_math(principal, accumulated, last_update, now, None);
            accumulated = settlement.new_accumulated_yield;
            last_update = settlement.new_last_yield_update;
            candles.push(settlement.candle);
        }

        assert_eq!(candles[1].open, candles[0].close);
        assert_eq!(candles[2].open, candles[1].close);
    }

    #[test]
    fn candle_high_low_bound_open_and_close() {
        let settlement = settle_math(dec!(1000), dec!(2.5), ts(0), ts(7200), None);
        let c = &settlement.candle;

        assert!(c.high >= c.open.max(c.close));
        assert!(c.low <= c.open.min(c.close));
        assert_eq!(c.volume, c.close - c.open);
    }

    #[test]
    fn resettling_in_same_bucket_keeps_open_and_extends_close() {
        let principal = dec!(1000);
        let first = settle_math(principal, Decimal::ZERO, ts(0), ts(600), None);
        let bucket = BucketState {
            open: first.candle.open,
            high: first.candle.high,
            low: first.candle.low,
        };

        let second = settle_math(
            principal,
            first.new_accumulated_yield,
            first.new_last_yield_update,
            ts(1800),
            Some(bucket),
        );

        assert_eq!(second.candle.open, first.candle.open);
        assert!(second.candle.close > first.candle.close);
        assert_eq!(second.candle.timestamp_hour, first.candle.timestamp_hour);
    }

    #[test]
    fn accumulated_yield_caps_at_monthly_ceiling() {
        let principal = dec!(100);
        let ceiling = principal * MONTHLY_YIELD_RATE;

        // Two months of elapsed time still settles at the ceiling
        let settlement = settle_math(
            principal,
            dec!(2.9),
            ts(0),
            ts(SECONDS_PER_MONTH * 2),
            None,
        );

        assert_eq!(settlement.new_accumulated_yield, ceiling);
    }

    #[test]
    fn projection_matches_settlement_math() {
        let principal = dec!(1000);
        let projected = project_live_yield(principal, dec!(0.5), ts(0), ts(86_400));
        assert_eq!(projected, dec!(1.5));
    }

    #[test]
    fn projection_with_skewed_clock_never_goes_below_accumulated() {
        let projected = project_live_yield(dec!(1000), dec!(0.5), ts(3600), ts(0));
        assert_eq!(projected, dec!(0.5));
    }

    #[test]
    fn claim_rejected_below_dust_threshold() {
        let result = evaluate_claim(dec!(0.0000005), MIN_CLAIM_REFERRALS, true);
        assert_eq!(result, Err(ClaimError::NothingToClaim));
    }

    #[test]
    fn claim_rejected_without_referrals_or_kyc() {
        assert_eq!(
            evaluate_claim(dec!(5), MIN_CLAIM_REFERRALS - 1, true),
            Err(ClaimError::InsufficientReferrals {
                required: MIN_CLAIM_REFERRALS,
                actual: MIN_CLAIM_REFERRALS - 1,
            })
        );
        assert_eq!(
            evaluate_claim(dec!(5), MIN_CLAIM_REFERRALS, false),
            Err(ClaimError::KycNotApproved)
        );
    }

    #[test]
    fn claim_returns_full_accumulated_amount() {
        assert_eq!(
            evaluate_claim(dec!(12.345), MIN_CLAIM_REFERRALS, true),
            Ok(dec!(12.345))
        );
    }

    #[test]
    fn hour_bucket_truncates_minutes_and_seconds() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 1, 14, 37, 52).unwrap();
        let bucket = hour_bucket(ts);
        assert_eq!(bucket, Utc.with_ymd_and_hms(2026, 8, 1, 14, 0, 0).unwrap());
    }
}
