use chadempire_core::{GameError, StatsDelta, SystemStats, User, UserCredit};
use chadempire_shared::{
    ApplyReferralResponse, LeaderboardEntry, LeaderboardQuery, LeaderboardResponse, Pagination, ReferralInfo,
    ReferralParty, ReferredUser, UpdateUserRequest,
};
use chrono::Duration;
use tracing::info;

use crate::{applier::new_id, error::ServerResult, store, AppState};

pub const DEFAULT_USERNAME: &str = "ChadLegend";
/// Chad Score credited to the referrer when a code is applied.
pub const REFERRAL_BONUS: f64 = 50.0;
pub const REFERRAL_WINDOW_DAYS: i64 = 7;

fn default_avatar(wallet: &str) -> String {
    format!("https://api.dicebear.com/7.x/personas/svg?seed={wallet}")
}

pub async fn get_or_create_user(state: &AppState, wallet: &str) -> ServerResult<User> {
    let _guard = state.locks.lock(wallet).await;
    state.bounded(load_or_insert_user(state, wallet)).await
}

async fn load_or_insert_user(state: &AppState, wallet: &str) -> ServerResult<User> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;
    if let Some(user) = store::find_user_by_wallet(&mut tx, wallet).await? {
        return Ok(user);
    }
    let user = User {
        id: new_id(),
        wallet_address: wallet.to_string(),
        username: Some(DEFAULT_USERNAME.to_string()),
        avatar_url: Some(default_avatar(wallet)),
        chad_score: 0.0,
        total_spins: 0,
        total_wins: 0,
        total_yield_earned: 0.0,
        referral_code: Some(User::referral_code_for(wallet)),
        referred_by: None,
        created_at: now,
        updated_at: now,
    };
    store::insert_user(&mut tx, &user).await?;
    let delta = StatsDelta {
        total_users: 1,
        ..Default::default()
    };
    store::bump_stats(&mut tx, &delta, now).await?;
    tx.commit().await?;
    info!(wallet, user_id = %user.id, "user created");
    Ok(user)
}

pub async fn update_profile(state: &AppState, wallet: &str, req: &UpdateUserRequest) -> ServerResult<User> {
    req.validate()?;
    let _guard = state.locks.lock(wallet).await;
    state.bounded(write_profile(state, wallet, req)).await
}

async fn write_profile(state: &AppState, wallet: &str, req: &UpdateUserRequest) -> ServerResult<User> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;
    let user = store::find_user_by_wallet(&mut tx, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    store::update_profile(&mut tx, &user.id, req.username.as_deref(), req.avatar_url.as_deref(), now).await?;
    let updated = store::find_user_by_id(&mut tx, &user.id)
        .await?
        .ok_or(GameError::UserNotFound)?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn referral_info(state: &AppState, wallet: &str) -> ServerResult<ReferralInfo> {
    state.bounded(load_referral_info(state, wallet)).await
}

async fn load_referral_info(state: &AppState, wallet: &str) -> ServerResult<ReferralInfo> {
    let mut conn = state.store.conn().await?;
    let user = store::find_user_by_wallet(&mut conn, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    let referred = match &user.referral_code {
        Some(code) => store::list_referred_users(&mut conn, code).await?,
        None => Vec::new(),
    };
    let referrer = match &user.referred_by {
        Some(code) => store::find_user_by_referral_code(&mut conn, code)
            .await?
            .map(|r| ReferralParty {
                wallet_address: r.wallet_address,
                username: r.username,
                avatar_url: r.avatar_url,
            }),
        None => None,
    };
    let referrals: Vec<ReferredUser> = referred
        .into_iter()
        .map(|u| ReferredUser {
            wallet_address: u.wallet_address,
            username: u.username,
            avatar_url: u.avatar_url,
            chad_score: u.chad_score,
            total_spins: u.total_spins,
            joined_at: u.created_at,
        })
        .collect();
    Ok(ReferralInfo {
        code: user.referral_code,
        referrer,
        total_referrals: referrals.len(),
        total_rewards: referrals.len() as f64 * REFERRAL_BONUS,
        reward_per_referral: REFERRAL_BONUS,
        referrals,
    })
}

pub async fn apply_referral(state: &AppState, wallet: &str, code: &str) -> ServerResult<ApplyReferralResponse> {
    let code = code.trim();
    if code.is_empty() {
        return Err(GameError::InvalidRequest("Referral code is required".into()).into());
    }
    let _guard = state.locks.lock(wallet).await;
    state.bounded(link_referral(state, wallet, code)).await
}

async fn link_referral(state: &AppState, wallet: &str, code: &str) -> ServerResult<ApplyReferralResponse> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;
    let user = store::find_user_by_wallet(&mut tx, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    if user.referred_by.is_some() {
        return Err(GameError::InvalidRequest("You have already used a referral code".into()).into());
    }
    if user.referral_code.as_deref() == Some(code) {
        return Err(GameError::InvalidRequest("You cannot use your own referral code".into()).into());
    }
    let referrer = store::find_user_by_referral_code(&mut tx, code)
        .await?
        .ok_or_else(|| GameError::InvalidRequest("Invalid referral code".into()))?;
    if now - user.created_at > Duration::days(REFERRAL_WINDOW_DAYS) {
        return Err(GameError::InvalidRequest(format!(
            "Referral codes can only be used within {REFERRAL_WINDOW_DAYS} days of account creation"
        ))
        .into());
    }

    if !store::set_referred_by(&mut tx, &user.id, code, now).await? {
        return Err(GameError::InvalidRequest("You have already used a referral code".into()).into());
    }
    let bonus = UserCredit {
        chad_score: REFERRAL_BONUS,
        ..Default::default()
    };
    store::credit_user(&mut tx, &referrer.id, &bonus, now).await?;
    store::insert_referral(&mut tx, &new_id(), &referrer.id, &user.id, REFERRAL_BONUS, now).await?;
    tx.commit().await?;
    info!(wallet, referrer = %referrer.wallet_address, "referral applied");
    Ok(ApplyReferralResponse {
        success: true,
        message: "Referral code applied successfully".into(),
        bonus_awarded: REFERRAL_BONUS,
    })
}

pub async fn leaderboard(state: &AppState, query: &LeaderboardQuery) -> ServerResult<LeaderboardResponse> {
    state.bounded(load_leaderboard(state, query)).await
}

async fn load_leaderboard(state: &AppState, query: &LeaderboardQuery) -> ServerResult<LeaderboardResponse> {
    let (sort, limit, page) = query.normalized();
    let offset = u64::from(page - 1) * u64::from(limit);
    let mut conn = state.store.conn().await?;
    let users = store::leaderboard(&mut conn, sort, limit, offset).await?;
    let total = store::count_users(&mut conn).await?;
    let stats = store::load_stats(&mut conn).await?;
    let leaderboard = users
        .into_iter()
        .enumerate()
        .map(|(i, u)| LeaderboardEntry {
            rank: offset + i as u64 + 1,
            wallet_address: u.wallet_address,
            username: u.username,
            avatar_url: u.avatar_url,
            chad_score: u.chad_score,
            total_yield_earned: u.total_yield_earned,
            total_spins: u.total_spins,
            total_wins: u.total_wins,
        })
        .collect();
    Ok(LeaderboardResponse {
        leaderboard,
        pagination: Pagination::new(page, limit, total),
        stats,
    })
}

pub async fn system_stats(state: &AppState) -> ServerResult<SystemStats> {
    state.bounded(load_stats(state)).await
}

async fn load_stats(state: &AppState) -> ServerResult<SystemStats> {
    let mut conn = state.store.conn().await?;
    store::load_stats(&mut conn).await
}
