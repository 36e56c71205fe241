use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Authentication required")]
    Unauthenticated,
    #[error("User not found")]
    UserNotFound,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Minimum stake of {minimum} $CHAD required to spin")]
    InsufficientStake { minimum: f64, staked: f64 },
    #[error("You have already used your daily spin today")]
    DailySpinAlreadyUsed { next_spin_time: DateTime<Utc> },
    #[error("Booster not found")]
    BoosterNotFound,
    #[error("Booster has already been used")]
    BoosterAlreadyUsed,
    #[error("{0}")]
    InvalidAmount(String),
    #[error("Stake not found")]
    StakeNotFound,
    #[error("Stake is not active")]
    StakeNotActive,
    #[error("No yield available to claim")]
    NoYieldAvailable,
    #[error("A bonus spin requires an unused Bonus Spin booster")]
    BonusSpinRequired,
    #[error("A premium spin requires a transaction hash")]
    TransactionRequired,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl GameError {
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::Unauthenticated => "UNAUTHENTICATED",
            GameError::UserNotFound => "USER_NOT_FOUND",
            GameError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            GameError::InsufficientStake { .. } => "INSUFFICIENT_STAKE",
            GameError::DailySpinAlreadyUsed { .. } => "DAILY_SPIN_ALREADY_USED",
            GameError::BoosterNotFound => "BOOSTER_NOT_FOUND",
            GameError::BoosterAlreadyUsed => "BOOSTER_ALREADY_USED",
            GameError::InvalidAmount(_) => "INVALID_AMOUNT",
            GameError::StakeNotFound => "STAKE_NOT_FOUND",
            GameError::StakeNotActive => "STAKE_NOT_ACTIVE",
            GameError::NoYieldAvailable => "NO_YIELD_AVAILABLE",
            GameError::BonusSpinRequired => "BONUS_SPIN_REQUIRED",
            GameError::TransactionRequired => "TRANSACTION_REQUIRED",
            GameError::InvalidRequest(_) => "INVALID_REQUEST",
            GameError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, GameError::Persistence(_))
    }
}
