use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::GameError;
use crate::model::Stake;
use crate::rng::RandomSource;

/// Passive accrual per day on an active stake (0.01%).
pub const DAILY_YIELD_RATE: f64 = 0.0001;

const STANDARD_MIN_PERCENT: f64 = 0.1;
const STANDARD_SPAN_PERCENT: f64 = 0.4;
const JACKPOT_MIN_PERCENT: f64 = 1.0;
const JACKPOT_SPAN_PERCENT: f64 = 2.0;

/// Uniform in `[0.1, 0.5)`.
pub fn standard_yield_percent(rng: &dyn RandomSource) -> f64 {
    STANDARD_MIN_PERCENT + rng.next_f64() * STANDARD_SPAN_PERCENT
}

/// Uniform in `[1.0, 3.0)`.
pub fn jackpot_yield_percent(rng: &dyn RandomSource) -> f64 {
    JACKPOT_MIN_PERCENT + rng.next_f64() * JACKPOT_SPAN_PERCENT
}

pub fn yield_amount(stake_amount: f64, yield_percent: f64, booster_multiplier: f64) -> f64 {
    stake_amount * (yield_percent / 100.0) * booster_multiplier
}

pub fn accrued(stake_amount: f64, days_since_stake: f64, daily_rate: f64) -> f64 {
    stake_amount * daily_rate * days_since_stake.floor()
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

pub fn whole_days(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_days().max(0)
}

pub fn yield_rate_label(daily_rate: f64) -> String {
    format!("{:.2}% per day", daily_rate * 100.0)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StakeAccrual {
    pub stake_id: String,
    pub staked_amount: f64,
    pub staked_at: DateTime<Utc>,
    pub days_since_stake: i64,
    /// Days not yet paid out by a claim.
    pub unclaimed_days: i64,
    pub accrued_yield: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YieldSummary {
    pub stakes: Vec<StakeAccrual>,
    pub total_accrued_yield: f64,
    pub available_to_claim: f64,
}

pub fn summarize(stakes: &[Stake], now: DateTime<Utc>) -> YieldSummary {
    let mut raw_total = 0.0;
    let accruals: Vec<StakeAccrual> = stakes
        .iter()
        .filter(|s| s.is_active())
        .map(|s| {
            let days = whole_days(s.staked_at, now);
            let unclaimed = (days - s.yield_days_claimed).max(0);
            let raw = accrued(s.amount, unclaimed as f64, DAILY_YIELD_RATE);
            raw_total += raw;
            StakeAccrual {
                stake_id: s.id.clone(),
                staked_amount: s.amount,
                staked_at: s.staked_at,
                days_since_stake: days,
                unclaimed_days: unclaimed,
                accrued_yield: round4(raw),
            }
        })
        .collect();
    YieldSummary {
        stakes: accruals,
        total_accrued_yield: round4(raw_total),
        available_to_claim: round4(raw_total),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimPlan {
    pub amount: f64,
    pub claimed_days: Vec<(String, i64)>,
}

pub fn plan_claim(stakes: &[Stake], now: DateTime<Utc>) -> Result<ClaimPlan, GameError> {
    let summary = summarize(stakes, now);
    if summary.available_to_claim <= 0.0 {
        return Err(GameError::NoYieldAvailable);
    }
    Ok(ClaimPlan {
        amount: summary.available_to_claim,
        claimed_days: summary
            .stakes
            .into_iter()
            .map(|a| (a.stake_id, a.days_since_stake))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StakeStatus;
    use crate::rng::{ScriptedRandom, SeededRandom};
    use chrono::{Duration, TimeZone};

    fn stake(id: &str, amount: f64, staked_at: DateTime<Utc>, status: StakeStatus) -> Stake {
        Stake {
            id: id.into(),
            user_id: "user-1".into(),
            amount,
            staked_at,
            status,
            penalty_amount: 0.0,
            unstake_requested_at: None,
            unstaked_at: None,
            yield_days_claimed: 0,
            transaction_hash: None,
        }
    }

    #[test]
    fn standard_range_is_half_open() {
        assert_eq!(standard_yield_percent(&ScriptedRandom::new([0.0])), 0.1);
        let near_top = standard_yield_percent(&ScriptedRandom::new([0.999_999_999]));
        assert!(near_top < 0.5);
        let rng = SeededRandom::new("yield", "range", 1);
        for _ in 0..10_000 {
            let p = standard_yield_percent(&rng);
            assert!((0.1..0.5).contains(&p), "{p}");
        }
    }

    #[test]
    fn jackpot_range_is_half_open() {
        assert_eq!(jackpot_yield_percent(&ScriptedRandom::new([0.0])), 1.0);
        let rng = SeededRandom::new("yield", "jackpot", 1);
        for _ in 0..10_000 {
            let p = jackpot_yield_percent(&rng);
            assert!((1.0..3.0).contains(&p), "{p}");
        }
    }

    #[test]
    fn yield_amount_applies_multiplier() {
        assert!((yield_amount(150.0, 0.3, 1.0) - 0.45).abs() < 1e-9);
        assert!((yield_amount(1000.0, 2.0, 1.5) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn accrual_floors_partial_days() {
        assert!((accrued(1000.0, 2.9, DAILY_YIELD_RATE) - 0.2).abs() < 1e-12);
        assert_eq!(accrued(1000.0, 0.5, DAILY_YIELD_RATE), 0.0);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round4(0.123_45), 0.1235);
        assert_eq!(round4(-0.123_45), -0.1235);
        assert_eq!(round4(0.123_44), 0.1234);
    }

    #[test]
    fn summary_sums_active_stakes_only() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let stakes = vec![
            stake("a", 1000.0, now - Duration::days(10), StakeStatus::Active),
            stake("b", 500.0, now - Duration::hours(60), StakeStatus::Active),
            stake("c", 9999.0, now - Duration::days(100), StakeStatus::Unstaked),
        ];
        let summary = summarize(&stakes, now);
        assert_eq!(summary.stakes.len(), 2);
        assert_eq!(summary.stakes[0].days_since_stake, 10);
        assert_eq!(summary.stakes[1].days_since_stake, 2);
        // 1000 * 0.0001 * 10 + 500 * 0.0001 * 2
        assert!((summary.available_to_claim - 1.1).abs() < 1e-9);
    }

    #[test]
    fn claim_skips_days_already_paid() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut s = stake("a", 1000.0, now - Duration::days(10), StakeStatus::Active);
        s.yield_days_claimed = 10;
        assert_eq!(plan_claim(&[s.clone()], now), Err(GameError::NoYieldAvailable));

        let plan = plan_claim(&[s], now + Duration::days(3)).unwrap();
        assert!((plan.amount - 0.3).abs() < 1e-9);
        assert_eq!(plan.claimed_days, vec![("a".to_string(), 13)]);
    }

    #[test]
    fn fresh_stake_has_nothing_to_claim() {
        let now = Utc::now();
        let s = stake("a", 1000.0, now - Duration::hours(5), StakeStatus::Active);
        assert_eq!(plan_claim(&[s], now), Err(GameError::NoYieldAvailable));
        assert_eq!(plan_claim(&[], now), Err(GameError::NoYieldAvailable));
    }

    #[test]
    fn rate_label() {
        assert_eq!(yield_rate_label(DAILY_YIELD_RATE), "0.01% per day");
    }
}
