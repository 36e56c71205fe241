use chadempire_core::{
    engine::{self, SpinRequest, SpinResolution, SpinSnapshot},
    BoosterEffect, GameError, Spin,
};
use tracing::{info, warn};

use crate::{
    applier::{self, new_id},
    error::ServerResult,
    store, AppState,
};

// Persistence failures restart from validation, up to `spin_retries` times.
pub async fn spin(state: &AppState, wallet: &str, request: &SpinRequest) -> ServerResult<SpinResolution> {
    let _guard = state.locks.lock(wallet).await;
    let mut attempt = 0;
    loop {
        match state.bounded(attempt_spin(state, wallet, request)).await {
            Ok(resolution) => return Ok(resolution),
            Err(e) if e.is_retryable() && attempt < state.config.spin_retries => {
                attempt += 1;
                warn!(wallet, attempt, error = %e, "spin failed to persist, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

async fn attempt_spin(state: &AppState, wallet: &str, request: &SpinRequest) -> ServerResult<SpinResolution> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;

    let user = store::find_user_by_wallet(&mut tx, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    let active_stake = store::active_stake_total(&mut tx, &user.id).await?;
    let booster = match &request.booster_id {
        Some(id) => store::find_booster(&mut tx, id).await?,
        None => None,
    };
    let last_daily_spin_at = store::last_daily_spin_at(&mut tx, &user.id).await?;
    let next_draw_id = store::next_pending_draw(&mut tx, now).await?.map(|d| d.id);

    let snapshot = SpinSnapshot {
        user,
        active_stake,
        booster,
        last_daily_spin_at,
        next_draw_id,
    };
    let resolution = engine::resolve_spin(request, &snapshot, new_id(), now, state.rng.as_ref())?;

    if let Some(BoosterEffect::JackpotAccess { multiplier }) = resolution.effect {
        warn!(wallet, multiplier, "jackpot access booster consumed without effect on the jackpot gate");
    }

    let applied = applier::apply(&mut tx, &snapshot.user.id, now, &resolution.mutations).await?;
    tx.commit().await?;

    let spin = &resolution.outcome.spin;
    info!(
        wallet,
        spin_id = %spin.id,
        spin_type = %spin.spin_type,
        win = spin.reward.is_win(),
        writes = applied.len(),
        "spin committed"
    );
    Ok(resolution)
}

pub const HISTORY_LIMIT: u32 = 20;

pub async fn history(state: &AppState, wallet: &str) -> ServerResult<Vec<Spin>> {
    state.bounded(load_history(state, wallet)).await
}

async fn load_history(state: &AppState, wallet: &str) -> ServerResult<Vec<Spin>> {
    let mut conn = state.store.conn().await?;
    let user = store::find_user_by_wallet(&mut conn, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    store::recent_spins(&mut conn, &user.id, HISTORY_LIMIT).await
}
