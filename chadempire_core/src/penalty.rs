use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::GameError;
use crate::model::{Stake, StakeStatus};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub fn penalty_percent(staking_days: f64) -> u32 {
    if staking_days < 7.0 {
        25
    } else if staking_days < 30.0 {
        10
    } else if staking_days < 90.0 {
        5
    } else {
        0
    }
}

pub fn staking_days(staked_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - staked_at).num_milliseconds() as f64 / MILLIS_PER_DAY
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnstakeQuote {
    pub stake_id: String,
    pub amount: f64,
    pub penalty_percentage: u32,
    pub penalty_amount: f64,
    pub receive_amount: f64,
}

pub fn quote_unstake(stake: &Stake, amount: f64, now: DateTime<Utc>) -> Result<UnstakeQuote, GameError> {
    if stake.status != StakeStatus::Active {
        return Err(GameError::StakeNotActive);
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(GameError::InvalidAmount("Valid unstake amount is required".into()));
    }
    if amount > stake.amount {
        return Err(GameError::InvalidAmount(format!(
            "Cannot unstake {amount}; only {} is staked",
            stake.amount
        )));
    }

    let pct = penalty_percent(staking_days(stake.staked_at, now));
    let penalty_amount = amount * f64::from(pct) / 100.0;
    Ok(UnstakeQuote {
        stake_id: stake.id.clone(),
        amount,
        penalty_percentage: pct,
        penalty_amount,
        receive_amount: amount - penalty_amount,
    })
}

/// The stake after the quoted amount leaves it. Fully drained stakes become
/// Unstaked; anything left stays Active.
pub fn apply_unstake(stake: &Stake, quote: &UnstakeQuote, now: DateTime<Utc>) -> Stake {
    let mut next = stake.clone();
    next.amount = (stake.amount - quote.amount).max(0.0);
    next.penalty_amount += quote.penalty_amount;
    next.unstake_requested_at = Some(now);
    if next.amount == 0.0 {
        next.status = StakeStatus::Unstaked;
        next.unstaked_at = Some(now);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stake(amount: f64, staked_at: DateTime<Utc>) -> Stake {
        Stake {
            id: "stake-1".into(),
            user_id: "user-1".into(),
            amount,
            staked_at,
            status: StakeStatus::Active,
            penalty_amount: 0.0,
            unstake_requested_at: None,
            unstaked_at: None,
            yield_days_claimed: 0,
            transaction_hash: None,
        }
    }

    #[test]
    fn penalty_table() {
        assert_eq!(penalty_percent(0.0), 25);
        assert_eq!(penalty_percent(6.9), 25);
        assert_eq!(penalty_percent(7.0), 10);
        assert_eq!(penalty_percent(29.9), 10);
        assert_eq!(penalty_percent(30.0), 5);
        assert_eq!(penalty_percent(89.9), 5);
        assert_eq!(penalty_percent(90.0), 0);
        assert_eq!(penalty_percent(365.0), 0);
    }

    #[test]
    fn partial_unstake_after_five_days() {
        let now = Utc::now();
        let s = stake(1000.0, now - Duration::days(5));
        let quote = quote_unstake(&s, 400.0, now).unwrap();
        assert_eq!(quote.penalty_percentage, 25);
        assert_eq!(quote.penalty_amount, 100.0);
        assert_eq!(quote.receive_amount, 300.0);

        let after = apply_unstake(&s, &quote, now);
        assert_eq!(after.amount, 600.0);
        assert_eq!(after.status, StakeStatus::Active);
        assert_eq!(after.penalty_amount, 100.0);
        assert_eq!(after.unstake_requested_at, Some(now));
        assert_eq!(after.unstaked_at, None);
    }

    #[test]
    fn full_unstake_closes_the_stake() {
        let now = Utc::now();
        let s = stake(250.0, now - Duration::days(120));
        let quote = quote_unstake(&s, 250.0, now).unwrap();
        assert_eq!(quote.penalty_amount, 0.0);
        let after = apply_unstake(&s, &quote, now);
        assert_eq!(after.amount, 0.0);
        assert_eq!(after.status, StakeStatus::Unstaked);
        assert_eq!(after.unstaked_at, Some(now));
    }

    #[test]
    fn rejects_bad_amounts() {
        let now = Utc::now();
        let s = stake(100.0, now);
        assert!(matches!(quote_unstake(&s, 0.0, now), Err(GameError::InvalidAmount(_))));
        assert!(matches!(quote_unstake(&s, -5.0, now), Err(GameError::InvalidAmount(_))));
        assert!(matches!(quote_unstake(&s, 100.01, now), Err(GameError::InvalidAmount(_))));
        assert!(matches!(quote_unstake(&s, f64::NAN, now), Err(GameError::InvalidAmount(_))));
    }

    #[test]
    fn rejects_inactive_stake() {
        let now = Utc::now();
        let mut s = stake(100.0, now);
        s.status = StakeStatus::Unstaked;
        assert_eq!(quote_unstake(&s, 10.0, now), Err(GameError::StakeNotActive));
    }

    #[test]
    fn staking_days_is_fractional() {
        let now = Utc::now();
        let days = staking_days(now - Duration::hours(36), now);
        assert!((days - 1.5).abs() < 1e-9);
    }
}
