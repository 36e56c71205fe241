use chadempire_core::{
    engine::SpinOutcome, lottery::PrizeDistribution, penalty::UnstakeQuote, yields::YieldSummary, Booster,
    BoosterType, Fragment, LotteryDraw, LotteryTicket, Spin, SpinType, Stake, SystemStats, User,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 20;
pub const LEADERBOARD_DEFAULT_LIMIT: u32 = 10;
pub const LEADERBOARD_MAX_LIMIT: u32 = 100;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequestBody {
    #[serde(default)]
    pub spin_type: Option<SpinType>,
    #[serde(default)]
    pub booster_used: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SpinResponse {
    pub success: bool,
    pub spin: SpinOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_spin_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Clone)]
pub struct SpinHistoryResponse {
    pub spins: Vec<Spin>,
}

#[derive(Debug, Serialize, Clone)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.username {
            let len = name.chars().count();
            if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
                return Err(ApiError::Invalid(format!(
                    "Username must be between {USERNAME_MIN_CHARS} and {USERNAME_MAX_CHARS} characters"
                )));
            }
        }
        if let Some(url) = &self.avatar_url {
            if !is_http_url(url) {
                return Err(ApiError::Invalid("Invalid avatar URL".into()));
            }
        }
        Ok(())
    }
}

fn is_http_url(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct UpdateUserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize, Clone)]
pub struct StakesResponse {
    pub stakes: Vec<Stake>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateStakeRequest {
    pub amount: f64,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct CreateStakeResponse {
    pub success: bool,
    pub stake: Stake,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UnstakeRequest {
    pub stake_id: String,
    pub action: String,
    pub amount: f64,
}

impl UnstakeRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if self.action != "unstake" {
            return Err(ApiError::Invalid(format!("Unsupported action {:?}", self.action)));
        }
        if self.stake_id.trim().is_empty() {
            return Err(ApiError::Invalid("Stake ID is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UnstakeReceipt {
    #[serde(flatten)]
    pub quote: UnstakeQuote,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct UnstakeResponse {
    pub success: bool,
    pub unstake: UnstakeReceipt,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct YieldInfoResponse {
    #[serde(flatten)]
    pub summary: YieldSummary,
    pub yield_rate: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClaimYieldResponse {
    pub success: bool,
    pub claimed_amount: f64,
    pub message: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct BoostersResponse {
    pub boosters: Vec<Booster>,
    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseBoosterRequest {
    pub action: String,
    pub booster_type: BoosterType,
    pub price: f64,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl PurchaseBoosterRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if self.action != "purchase" {
            return Err(ApiError::Invalid(format!("Unsupported action {:?}", self.action)));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct PurchaseBoosterResponse {
    pub success: bool,
    pub booster: Booster,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LotteryResponse {
    pub current_draw: Option<LotteryDraw>,
    pub tickets: Vec<LotteryTicket>,
    pub ticket_price: f64,
    pub prize_distribution: PrizeDistribution,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BuyTicketsRequest {
    pub quantity: u32,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BuyTicketsResponse {
    pub success: bool,
    pub tickets: Vec<LotteryTicket>,
    pub total_cost: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralParty {
    pub wallet_address: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferredUser {
    pub wallet_address: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub chad_score: f64,
    pub total_spins: i64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReferralInfo {
    pub code: Option<String>,
    pub referrer: Option<ReferralParty>,
    pub referrals: Vec<ReferredUser>,
    pub total_referrals: usize,
    pub total_rewards: f64,
    pub reward_per_referral: f64,
}

#[derive(Debug, Serialize, Clone)]
pub struct ReferralResponse {
    pub referral: ReferralInfo,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReferralRequest {
    #[serde(default)]
    pub referral_code: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReferralResponse {
    pub success: bool,
    pub message: String,
    pub bonus_awarded: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardSort {
    #[default]
    ChadScore,
    Yield,
    Spins,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub sort_by: Option<LeaderboardSort>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl LeaderboardQuery {
    /// Sort key, page size in `1..=100` and 1-based page.
    pub fn normalized(&self) -> (LeaderboardSort, u32, u32) {
        let limit = self
            .limit
            .unwrap_or(LEADERBOARD_DEFAULT_LIMIT)
            .clamp(1, LEADERBOARD_MAX_LIMIT);
        (self.sort_by.unwrap_or_default(), limit, self.page.unwrap_or(1).max(1))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub wallet_address: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub chad_score: f64,
    pub total_yield_earned: f64,
    pub total_spins: i64,
    pub total_wins: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let per_page = i64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            total_pages: (total + per_page - 1) / per_page,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub pagination: Pagination,
    pub stats: SystemStats,
}

#[derive(Debug, Serialize, Clone)]
pub struct StatsResponse {
    pub stats: SystemStats,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateDrawRequest {
    pub draw_time: DateTime<Utc>,
    #[serde(default)]
    pub jackpot: f64,
}

#[derive(Debug, Serialize, Clone)]
pub struct CreateDrawResponse {
    pub draw: LotteryDraw,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
    /// Set when a Daily spin is refused because today's slot is used.
    #[serde(rename = "nextSpinTime", default, skip_serializing_if = "Option::is_none")]
    pub next_spin_time: Option<DateTime<Utc>>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    Invalid(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
