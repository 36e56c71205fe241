use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GameError;

// Enums travel over the wire in snake_case and are stored in SCREAMING_CASE
// text columns (`as_db_str` / `FromStr`).

macro_rules! db_enum {
    ($name:ident { $($variant:ident => $db:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_db_str(self) -> &'static str {
                match self {
                    $($name::$variant => $db),+
                }
            }
        }

        impl FromStr for $name {
            type Err = GameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($db => Ok($name::$variant),)+
                    other => Err(GameError::Persistence(format!(
                        "unknown {} value {other:?}",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_db_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpinType {
    #[default]
    Daily,
    Bonus,
    Premium,
}

db_enum!(SpinType {
    Daily => "DAILY",
    Bonus => "BONUS",
    Premium => "PREMIUM",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsolationType {
    LotteryTicket,
    ChadScore,
    BoosterFragment,
    BonusSpin,
}

db_enum!(ConsolationType {
    LotteryTicket => "LOTTERY_TICKET",
    ChadScore => "CHAD_SCORE",
    BoosterFragment => "BOOSTER_FRAGMENT",
    BonusSpin => "BONUS_SPIN",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BoosterType {
    YieldMultiplier,
    LuckBoost,
    BonusSpin,
    JackpotAccess,
}

db_enum!(BoosterType {
    YieldMultiplier => "YIELD_MULTIPLIER",
    LuckBoost => "LUCK_BOOST",
    BonusSpin => "BONUS_SPIN",
    JackpotAccess => "JACKPOT_ACCESS",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FragmentType {
    Yield,
    Luck,
    Jackpot,
    Bonus,
}

db_enum!(FragmentType {
    Yield => "YIELD",
    Luck => "LUCK",
    Jackpot => "JACKPOT",
    Bonus => "BONUS",
});

impl FragmentType {
    /// The booster minted once enough fragments of this type are collected.
    pub fn minted_booster(self) -> BoosterType {
        match self {
            FragmentType::Yield => BoosterType::YieldMultiplier,
            FragmentType::Luck => BoosterType::LuckBoost,
            FragmentType::Jackpot => BoosterType::JackpotAccess,
            FragmentType::Bonus => BoosterType::BonusSpin,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StakeStatus {
    Active,
    Unstaking,
    Unstaked,
}

db_enum!(StakeStatus {
    Active => "ACTIVE",
    Unstaking => "UNSTAKING",
    Unstaked => "UNSTAKED",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DrawStatus {
    Pending,
    Completed,
    Cancelled,
}

db_enum!(DrawStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub wallet_address: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub chad_score: f64,
    pub total_spins: i64,
    pub total_wins: i64,
    pub total_yield_earned: f64,
    pub referral_code: Option<String>,
    pub referred_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn referral_code_for(wallet_address: &str) -> String {
        let prefix: String = wallet_address.chars().take(8).collect();
        format!("CHAD{prefix}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stake {
    pub id: String,
    pub user_id: String,
    pub amount: f64,
    pub staked_at: DateTime<Utc>,
    pub status: StakeStatus,
    pub penalty_amount: f64,
    pub unstake_requested_at: Option<DateTime<Utc>>,
    pub unstaked_at: Option<DateTime<Utc>>,
    /// Whole days of accrual already paid out by yield claims.
    pub yield_days_claimed: i64,
    pub transaction_hash: Option<String>,
}

impl Stake {
    pub fn is_active(&self) -> bool {
        self.status == StakeStatus::Active
    }
}

/// What a spin paid out. Exactly one payload exists per spin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SpinReward {
    Win {
        yield_percentage: f64,
        yield_amount: f64,
        jackpot: bool,
    },
    Consolation {
        consolation_type: ConsolationType,
        consolation_amount: f64,
    },
}

impl SpinReward {
    pub fn is_win(&self) -> bool {
        matches!(self, SpinReward::Win { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Spin {
    pub id: String,
    pub user_id: String,
    pub spin_type: SpinType,
    #[serde(flatten)]
    pub reward: SpinReward,
    pub booster_used: Option<String>,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booster {
    pub id: String,
    pub user_id: String,
    pub mint_address: String,
    pub booster_type: BoosterType,
    pub power_level: u32,
    pub used_at: Option<DateTime<Utc>>,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booster {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub id: String,
    pub user_id: String,
    pub fragment_type: FragmentType,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LotteryDraw {
    pub id: String,
    pub draw_number: i64,
    pub draw_time: DateTime<Utc>,
    pub jackpot: f64,
    pub winning_numbers: Option<String>,
    pub status: DrawStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LotteryTicket {
    pub id: String,
    pub user_id: String,
    pub lottery_draw_id: Option<String>,
    pub ticket_number: String,
    pub is_winner: bool,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_users: i64,
    pub total_staked: f64,
    pub total_spins: i64,
    pub total_yield_paid: f64,
    pub lottery_pool: f64,
}
