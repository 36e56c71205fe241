use chadempire_core::{
    penalty::{apply_unstake, quote_unstake},
    yields::{plan_claim, summarize, yield_rate_label, DAILY_YIELD_RATE},
    GameError, Stake, StakeStatus, StatsDelta, UserCredit,
};
use chadempire_shared::{
    ClaimYieldResponse, CreateStakeRequest, UnstakeReceipt, UnstakeRequest, YieldInfoResponse,
};
use tracing::info;

use crate::{applier::new_id, error::ServerResult, store, AppState};

pub async fn list_stakes(state: &AppState, wallet: &str) -> ServerResult<Vec<Stake>> {
    state.bounded(load_stakes(state, wallet)).await
}

async fn load_stakes(state: &AppState, wallet: &str) -> ServerResult<Vec<Stake>> {
    let mut conn = state.store.conn().await?;
    let user = store::find_user_by_wallet(&mut conn, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    store::list_stakes(&mut conn, &user.id).await
}

pub async fn create_stake(state: &AppState, wallet: &str, req: &CreateStakeRequest) -> ServerResult<Stake> {
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(GameError::InvalidAmount("Valid stake amount is required".into()).into());
    }
    let _guard = state.locks.lock(wallet).await;
    state.bounded(insert_stake(state, wallet, req)).await
}

async fn insert_stake(state: &AppState, wallet: &str, req: &CreateStakeRequest) -> ServerResult<Stake> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;
    let user = store::find_user_by_wallet(&mut tx, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    let stake = Stake {
        id: new_id(),
        user_id: user.id,
        amount: req.amount,
        staked_at: now,
        status: StakeStatus::Active,
        penalty_amount: 0.0,
        unstake_requested_at: None,
        unstaked_at: None,
        yield_days_claimed: 0,
        transaction_hash: req.transaction_hash.clone(),
    };
    store::insert_stake(&mut tx, &stake).await?;
    let delta = StatsDelta {
        total_staked: stake.amount,
        ..Default::default()
    };
    store::bump_stats(&mut tx, &delta, now).await?;
    tx.commit().await?;
    info!(wallet, stake_id = %stake.id, amount = stake.amount, "stake created");
    Ok(stake)
}

pub async fn unstake(state: &AppState, wallet: &str, req: &UnstakeRequest) -> ServerResult<UnstakeReceipt> {
    req.validate()?;
    let _guard = state.locks.lock(wallet).await;
    state.bounded(withdraw(state, wallet, req)).await
}

async fn withdraw(state: &AppState, wallet: &str, req: &UnstakeRequest) -> ServerResult<UnstakeReceipt> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;
    let user = store::find_user_by_wallet(&mut tx, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    let stake = store::find_stake(&mut tx, &req.stake_id)
        .await?
        .filter(|s| s.user_id == user.id)
        .ok_or(GameError::StakeNotFound)?;

    let quote = quote_unstake(&stake, req.amount, now)?;
    let after = apply_unstake(&stake, &quote, now);
    store::update_stake(&mut tx, &after).await?;
    let delta = StatsDelta {
        total_staked: -quote.amount,
        ..Default::default()
    };
    store::bump_stats(&mut tx, &delta, now).await?;
    tx.commit().await?;

    info!(
        wallet,
        stake_id = %stake.id,
        amount = quote.amount,
        penalty = quote.penalty_amount,
        status = %after.status,
        "unstake processed"
    );
    Ok(UnstakeReceipt {
        quote,
        processed_at: now,
    })
}

pub async fn yield_info(state: &AppState, wallet: &str) -> ServerResult<YieldInfoResponse> {
    let stakes = list_stakes(state, wallet).await?;
    Ok(YieldInfoResponse {
        summary: summarize(&stakes, state.clock.now()),
        yield_rate: yield_rate_label(DAILY_YIELD_RATE),
    })
}

pub async fn claim_yield(state: &AppState, wallet: &str) -> ServerResult<ClaimYieldResponse> {
    let _guard = state.locks.lock(wallet).await;
    state.bounded(pay_out_yield(state, wallet)).await
}

async fn pay_out_yield(state: &AppState, wallet: &str) -> ServerResult<ClaimYieldResponse> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;
    let user = store::find_user_by_wallet(&mut tx, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    let stakes = store::list_stakes(&mut tx, &user.id).await?;
    let plan = plan_claim(&stakes, now)?;

    let credit = UserCredit {
        chad_score: plan.amount,
        yield_earned: plan.amount,
        ..Default::default()
    };
    store::credit_user(&mut tx, &user.id, &credit, now).await?;
    for (stake_id, days) in &plan.claimed_days {
        store::set_yield_days_claimed(&mut tx, stake_id, *days).await?;
    }
    store::insert_yield_claim(&mut tx, &new_id(), &user.id, plan.amount, now).await?;
    let delta = StatsDelta {
        total_yield_paid: plan.amount,
        ..Default::default()
    };
    store::bump_stats(&mut tx, &delta, now).await?;
    tx.commit().await?;

    info!(wallet, amount = plan.amount, "yield claimed");
    Ok(ClaimYieldResponse {
        success: true,
        claimed_amount: plan.amount,
        message: format!("Successfully claimed {} $CHAD yield", plan.amount),
    })
}
