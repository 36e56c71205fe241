use chadempire_core::{
    booster::purchase_power_level,
    lottery::{draw_ticket_number, ticket_cost, PRIZE_DISTRIBUTION, TICKET_PRICE},
    Booster, DrawStatus, GameError, LotteryDraw, LotteryTicket, StatsDelta,
};
use chadempire_shared::{
    BoostersResponse, BuyTicketsRequest, BuyTicketsResponse, CreateDrawRequest, LotteryResponse,
    PurchaseBoosterRequest,
};
use tracing::info;

use crate::{
    applier::{fresh_booster, new_id},
    error::ServerResult,
    store, AppState,
};

/// Upper bound on tickets bought in one request.
pub const MAX_TICKETS_PER_PURCHASE: u32 = 100;

pub async fn boosters(state: &AppState, wallet: &str) -> ServerResult<BoostersResponse> {
    state.bounded(load_boosters(state, wallet)).await
}

async fn load_boosters(state: &AppState, wallet: &str) -> ServerResult<BoostersResponse> {
    let mut conn = state.store.conn().await?;
    let user = store::find_user_by_wallet(&mut conn, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    Ok(BoostersResponse {
        boosters: store::list_boosters(&mut conn, &user.id).await?,
        fragments: store::list_fragments(&mut conn, &user.id).await?,
    })
}

pub async fn purchase_booster(state: &AppState, wallet: &str, req: &PurchaseBoosterRequest) -> ServerResult<Booster> {
    req.validate()?;
    if !req.price.is_finite() || req.price <= 0.0 {
        return Err(GameError::InvalidAmount("Valid booster price is required".into()).into());
    }
    let _guard = state.locks.lock(wallet).await;
    state.bounded(insert_purchased_booster(state, wallet, req)).await
}

async fn insert_purchased_booster(
    state: &AppState,
    wallet: &str,
    req: &PurchaseBoosterRequest,
) -> ServerResult<Booster> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;
    let user = store::find_user_by_wallet(&mut tx, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    let mut booster = fresh_booster(&user.id, req.booster_type, purchase_power_level(req.price), now);
    booster.transaction_hash = req.transaction_hash.clone();
    store::insert_booster(&mut tx, &booster).await?;
    tx.commit().await?;
    info!(
        wallet,
        booster_type = %booster.booster_type,
        power_level = booster.power_level,
        "booster purchased"
    );
    Ok(booster)
}

pub async fn lottery(state: &AppState, wallet: &str) -> ServerResult<LotteryResponse> {
    state.bounded(load_lottery(state, wallet)).await
}

async fn load_lottery(state: &AppState, wallet: &str) -> ServerResult<LotteryResponse> {
    let now = state.clock.now();
    let mut conn = state.store.conn().await?;
    let user = store::find_user_by_wallet(&mut conn, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    Ok(LotteryResponse {
        current_draw: store::next_pending_draw(&mut conn, now).await?,
        tickets: store::list_tickets(&mut conn, &user.id).await?,
        ticket_price: TICKET_PRICE,
        prize_distribution: PRIZE_DISTRIBUTION,
    })
}

pub async fn buy_tickets(state: &AppState, wallet: &str, req: &BuyTicketsRequest) -> ServerResult<BuyTicketsResponse> {
    if req.quantity == 0 || req.quantity > MAX_TICKETS_PER_PURCHASE {
        return Err(GameError::InvalidAmount(format!(
            "Ticket quantity must be between 1 and {MAX_TICKETS_PER_PURCHASE}"
        ))
        .into());
    }
    let _guard = state.locks.lock(wallet).await;
    state.bounded(issue_tickets(state, wallet, req)).await
}

async fn issue_tickets(state: &AppState, wallet: &str, req: &BuyTicketsRequest) -> ServerResult<BuyTicketsResponse> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;
    let user = store::find_user_by_wallet(&mut tx, wallet)
        .await?
        .ok_or(GameError::UserNotFound)?;
    let draw_id = store::next_pending_draw(&mut tx, now).await?.map(|d| d.id);

    let mut tickets = Vec::with_capacity(req.quantity as usize);
    for _ in 0..req.quantity {
        let ticket = LotteryTicket {
            id: new_id(),
            user_id: user.id.clone(),
            lottery_draw_id: draw_id.clone(),
            ticket_number: draw_ticket_number(state.rng.as_ref()),
            is_winner: false,
            transaction_hash: req.transaction_hash.clone(),
            created_at: now,
        };
        store::insert_ticket(&mut tx, &ticket).await?;
        tickets.push(ticket);
    }
    let total_cost = ticket_cost(req.quantity);
    let delta = StatsDelta {
        lottery_pool: total_cost,
        ..Default::default()
    };
    store::bump_stats(&mut tx, &delta, now).await?;
    tx.commit().await?;

    info!(wallet, quantity = req.quantity, total_cost, "lottery tickets bought");
    Ok(BuyTicketsResponse {
        success: true,
        tickets,
        total_cost,
    })
}

pub async fn create_draw(state: &AppState, req: &CreateDrawRequest) -> ServerResult<LotteryDraw> {
    if !req.jackpot.is_finite() || req.jackpot < 0.0 {
        return Err(GameError::InvalidAmount("Jackpot must be zero or more".into()).into());
    }
    state.bounded(insert_draw(state, req)).await
}

async fn insert_draw(state: &AppState, req: &CreateDrawRequest) -> ServerResult<LotteryDraw> {
    let now = state.clock.now();
    let mut tx = state.store.begin().await?;
    let draw = LotteryDraw {
        id: new_id(),
        draw_number: store::next_draw_number(&mut tx).await?,
        draw_time: req.draw_time,
        jackpot: req.jackpot,
        winning_numbers: None,
        status: DrawStatus::Pending,
    };
    store::insert_draw(&mut tx, &draw, now).await?;
    tx.commit().await?;
    info!(draw_number = draw.draw_number, draw_time = %draw.draw_time, "lottery draw scheduled");
    Ok(draw)
}
