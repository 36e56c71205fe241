use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;

use crate::{
    booster::{self, BoosterEffect},
    error::GameError,
    ledger::{Mutation, StatsDelta, UserCredit},
    lottery::{draw_ticket_number, pick_index},
    model::{Booster, BoosterType, ConsolationType, FragmentType, Spin, SpinReward, SpinType, User},
    rng::RandomSource,
    selector::{roll_consolation, roll_jackpot, roll_win, win_probability},
    yields::{jackpot_yield_percent, standard_yield_percent, yield_amount},
};

/// Active stake needed before any spin is allowed.
pub const MIN_SPIN_STAKE: f64 = 100.0;
pub const CHAD_SCORE_MIN: i64 = 10;
pub const CHAD_SCORE_MAX: i64 = 60;

const FRAGMENT_TYPES: [FragmentType; 4] = [
    FragmentType::Yield,
    FragmentType::Luck,
    FragmentType::Jackpot,
    FragmentType::Bonus,
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpinRequest {
    pub spin_type: SpinType,
    pub booster_id: Option<String>,
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpinSnapshot {
    pub user: User,
    pub active_stake: f64,
    pub booster: Option<Booster>,
    pub last_daily_spin_at: Option<DateTime<Utc>>,
    pub next_draw_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpinOutcome {
    #[serde(flatten)]
    pub spin: Spin,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SpinResolution {
    pub outcome: SpinOutcome,
    pub effect: Option<BoosterEffect>,
    pub mutations: Vec<Mutation>,
    pub next_spin_time: Option<DateTime<Utc>>,
}

pub fn utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    utc_day_start(now) + Duration::days(1)
}

pub fn same_utc_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

/// Uniform integer in `[10, 60]`.
pub fn chad_score_bonus(rng: &dyn RandomSource) -> i64 {
    let span = (CHAD_SCORE_MAX - CHAD_SCORE_MIN + 1) as usize;
    CHAD_SCORE_MIN + pick_index(rng, span) as i64
}

pub fn roll_fragment_type(rng: &dyn RandomSource) -> FragmentType {
    FRAGMENT_TYPES[pick_index(rng, FRAGMENT_TYPES.len())]
}

pub fn validate(
    request: &SpinRequest,
    snapshot: &SpinSnapshot,
    now: DateTime<Utc>,
) -> Result<Option<BoosterEffect>, GameError> {
    let booster = match &request.booster_id {
        None => None,
        Some(id) => {
            let booster = snapshot
                .booster
                .as_ref()
                .filter(|b| &b.id == id && b.user_id == snapshot.user.id)
                .ok_or(GameError::BoosterNotFound)?;
            if booster.is_used() {
                return Err(GameError::BoosterAlreadyUsed);
            }
            Some(booster)
        }
    };

    if snapshot.active_stake < MIN_SPIN_STAKE {
        return Err(GameError::InsufficientStake {
            minimum: MIN_SPIN_STAKE,
            staked: snapshot.active_stake,
        });
    }

    let effect = booster.map(|b| booster::resolve(b.booster_type, b.power_level));
    let bonus_credit = effect.is_some_and(|e| e.grants_bonus_spin());

    match request.spin_type {
        SpinType::Bonus if !bonus_credit => return Err(GameError::BonusSpinRequired),
        SpinType::Premium
            if request
                .transaction_hash
                .as_deref()
                .map_or(true, |h| h.trim().is_empty()) =>
        {
            return Err(GameError::TransactionRequired)
        }
        SpinType::Daily if !bonus_credit => {
            if let Some(last) = snapshot.last_daily_spin_at {
                if same_utc_day(last, now) {
                    return Err(GameError::DailySpinAlreadyUsed {
                        next_spin_time: next_utc_midnight(now),
                    });
                }
            }
        }
        _ => {}
    }

    Ok(effect)
}

// draw order: win gate, then jackpot gate + yield percent, or consolation category + payload
pub fn resolve_spin(
    request: &SpinRequest,
    snapshot: &SpinSnapshot,
    spin_id: String,
    now: DateTime<Utc>,
    rng: &dyn RandomSource,
) -> Result<SpinResolution, GameError> {
    let effect = validate(request, snapshot, now)?;
    let luck = effect.map_or(1.0, |e| e.luck_multiplier());
    let multiplier = effect.map_or(1.0, |e| e.yield_multiplier());

    // A Daily request paid with a bonus credit is recorded as Bonus so it
    // never takes the day's Daily slot.
    let spin_type = if request.spin_type == SpinType::Daily && effect.is_some_and(|e| e.grants_bonus_spin()) {
        SpinType::Bonus
    } else {
        request.spin_type
    };

    let mut mutations = Vec::new();
    if let Some(id) = &request.booster_id {
        mutations.push(Mutation::MarkBoosterUsed { booster_id: id.clone() });
    }

    let mut credit = UserCredit {
        spins: 1,
        ..Default::default()
    };
    let mut stats = StatsDelta {
        total_spins: 1,
        ..Default::default()
    };

    let (reward, message) = if roll_win(win_probability(luck), rng) {
        let jackpot = roll_jackpot(rng);
        let base_percent = if jackpot {
            jackpot_yield_percent(rng)
        } else {
            standard_yield_percent(rng)
        };
        let amount = yield_amount(snapshot.active_stake, base_percent, multiplier);
        credit.yield_earned = amount;
        credit.wins = 1;
        stats.total_yield_paid = amount;
        let message = if jackpot {
            "JACKPOT! Massive yield earned!"
        } else {
            "Congratulations! You won yield!"
        };
        (
            SpinReward::Win {
                yield_percentage: base_percent * multiplier,
                yield_amount: amount,
                jackpot,
            },
            message.to_string(),
        )
    } else {
        let consolation_type = roll_consolation(rng)?;
        let (amount, message) = match consolation_type {
            ConsolationType::LotteryTicket => {
                mutations.push(Mutation::IssueLotteryTicket {
                    ticket_number: draw_ticket_number(rng),
                    lottery_draw_id: snapshot.next_draw_id.clone(),
                });
                (1.0, "You earned a lottery ticket for the weekly draw!".to_string())
            }
            ConsolationType::ChadScore => {
                let points = chad_score_bonus(rng);
                credit.chad_score = points as f64;
                (
                    points as f64,
                    format!("Your Chad Score increased by {points} points!"),
                )
            }
            ConsolationType::BoosterFragment => {
                mutations.push(Mutation::AddFragments {
                    fragment_type: roll_fragment_type(rng),
                    quantity: 1,
                });
                (
                    1.0,
                    "You collected a Booster Fragment! Collect 5 to mint a Booster NFT.".to_string(),
                )
            }
            ConsolationType::BonusSpin => {
                mutations.push(Mutation::MintBooster {
                    booster_type: BoosterType::BonusSpin,
                    power_level: 1,
                });
                (1.0, "RARE REWARD! You earned a Bonus Spin token!".to_string())
            }
        };
        (
            SpinReward::Consolation {
                consolation_type,
                consolation_amount: amount,
            },
            message,
        )
    };

    let spin = Spin {
        id: spin_id,
        user_id: snapshot.user.id.clone(),
        spin_type,
        reward,
        booster_used: request.booster_id.clone(),
        transaction_hash: request.transaction_hash.clone(),
        created_at: now,
    };

    mutations.push(Mutation::RecordSpin(spin.clone()));
    mutations.push(Mutation::CreditUser(credit));
    mutations.push(Mutation::BumpStats(stats));

    Ok(SpinResolution {
        next_spin_time: (spin_type == SpinType::Daily).then(|| next_utc_midnight(now)),
        outcome: SpinOutcome { spin, message },
        effect,
        mutations,
    })
}
