use serde::Serialize;

use crate::model::BoosterType;

pub const MAX_PURCHASE_POWER_LEVEL: u32 = 4;

/// What a consumed booster does to the spin it is used on.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoosterEffect {
    YieldMultiplier { multiplier: f64 },
    LuckBoost { multiplier: f64 },
    /// Carried in the data model but not applied to the jackpot gate.
    JackpotAccess { multiplier: f64 },
    BonusSpin { spins: u32 },
}

pub fn resolve(booster_type: BoosterType, power_level: u32) -> BoosterEffect {
    let power = f64::from(power_level);
    match booster_type {
        BoosterType::YieldMultiplier => BoosterEffect::YieldMultiplier {
            multiplier: 1.0 + power * 0.5,
        },
        BoosterType::LuckBoost => BoosterEffect::LuckBoost {
            multiplier: 1.0 + power * 0.1,
        },
        BoosterType::JackpotAccess => BoosterEffect::JackpotAccess {
            multiplier: 1.0 + power,
        },
        BoosterType::BonusSpin => BoosterEffect::BonusSpin { spins: 1 },
    }
}

impl BoosterEffect {
    pub fn yield_multiplier(&self) -> f64 {
        match self {
            BoosterEffect::YieldMultiplier { multiplier } => *multiplier,
            _ => 1.0,
        }
    }

    pub fn luck_multiplier(&self) -> f64 {
        match self {
            BoosterEffect::LuckBoost { multiplier } => *multiplier,
            _ => 1.0,
        }
    }

    pub fn grants_bonus_spin(&self) -> bool {
        matches!(self, BoosterEffect::BonusSpin { .. })
    }
}

/// Power level bought for `price`: one level per started 100, capped at 4.
pub fn purchase_power_level(price: f64) -> u32 {
    ((price / 100.0).ceil() as u32).clamp(1, MAX_PURCHASE_POWER_LEVEL)
}
