use crate::error::GameError;
use crate::model::ConsolationType;
use crate::rng::RandomSource;

pub const BASE_WIN_PROBABILITY: f64 = 0.60;
pub const MAX_WIN_PROBABILITY: f64 = 0.95;
pub const JACKPOT_PROBABILITY: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weighted<T> {
    pub weight: u32,
    pub label: T,
}

impl<T> Weighted<T> {
    pub const fn new(label: T, weight: u32) -> Self {
        Self { weight, label }
    }
}

pub const CONSOLATION_TABLE: [Weighted<ConsolationType>; 4] = [
    Weighted::new(ConsolationType::LotteryTicket, 50),
    Weighted::new(ConsolationType::ChadScore, 30),
    Weighted::new(ConsolationType::BoosterFragment, 15),
    Weighted::new(ConsolationType::BonusSpin, 5),
];

// Left-to-right scan: a remainder of exactly zero belongs to the category that crossed it.
pub fn select<T: Copy>(categories: &[Weighted<T>], rng: &dyn RandomSource) -> Result<T, GameError> {
    let total: u64 = categories.iter().map(|c| u64::from(c.weight)).sum();
    if total == 0 {
        return Err(GameError::InvalidConfiguration(
            "weight table is empty or has zero total weight".into(),
        ));
    }

    let mut remainder = rng.next_f64() * total as f64;
    let mut last = None;
    for category in categories.iter().filter(|c| c.weight > 0) {
        remainder -= f64::from(category.weight);
        if remainder <= 0.0 {
            return Ok(category.label);
        }
        last = Some(category.label);
    }
    // Only reachable through float rounding with rng() just below 1.
    last.ok_or_else(|| GameError::InvalidConfiguration("weight table has no positive weight".into()))
}

pub fn win_probability(luck_multiplier: f64) -> f64 {
    (BASE_WIN_PROBABILITY * luck_multiplier).clamp(BASE_WIN_PROBABILITY, MAX_WIN_PROBABILITY)
}

pub fn roll_win(probability: f64, rng: &dyn RandomSource) -> bool {
    rng.next_f64() < probability
}

pub fn roll_jackpot(rng: &dyn RandomSource) -> bool {
    rng.next_f64() < JACKPOT_PROBABILITY
}

pub fn roll_consolation(rng: &dyn RandomSource) -> Result<ConsolationType, GameError> {
    select(&CONSOLATION_TABLE, rng)
}
