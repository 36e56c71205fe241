use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use chadempire_core::engine::SpinRequest;
use chadempire_shared::{
    ApplyReferralRequest, ApplyReferralResponse, BoostersResponse, BuyTicketsRequest, BuyTicketsResponse,
    ClaimYieldResponse, CreateDrawRequest, CreateDrawResponse, CreateStakeRequest, CreateStakeResponse,
    HealthResponse, LeaderboardQuery, LeaderboardResponse, LotteryResponse, PurchaseBoosterRequest,
    PurchaseBoosterResponse, ReferralResponse, SpinHistoryResponse, SpinRequestBody, SpinResponse,
    StakesResponse, StatsResponse, UnstakeRequest, UnstakeResponse, UpdateUserRequest, UpdateUserResponse,
    UserResponse, YieldInfoResponse,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    account,
    auth::{Admin, Wallet},
    error::ServerResult,
    market, spin, staking, AppState,
};

type AppStateRef = State<Arc<AppState>>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(route_health))
        .route("/spin", get(route_spin_history).post(route_spin))
        .route("/user", get(route_user).put(route_update_user))
        .route("/stake", get(route_stakes).post(route_stake).put(route_unstake))
        .route("/yield", get(route_yield).post(route_claim_yield))
        .route("/boosters", get(route_boosters).post(route_purchase_booster))
        .route("/lottery", get(route_lottery).post(route_buy_tickets))
        .route("/referral", get(route_referral).post(route_apply_referral))
        .route("/leaderboard", get(route_leaderboard))
        .route("/stats", get(route_stats))
        .route("/admin/lottery-draws", post(route_admin_create_draw))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn route_health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

async fn route_spin(
    State(state): AppStateRef,
    Wallet(wallet): Wallet,
    body: Result<Json<SpinRequestBody>, JsonRejection>,
) -> ServerResult<Json<SpinResponse>> {
    let Json(body) = body?;
    let request = SpinRequest {
        spin_type: body.spin_type.unwrap_or_default(),
        booster_id: body.booster_used,
        transaction_hash: body.transaction_hash,
    };
    let resolution = spin::spin(&state, &wallet, &request).await?;
    Ok(Json(SpinResponse {
        success: true,
        spin: resolution.outcome,
        next_spin_time: resolution.next_spin_time,
    }))
}

async fn route_spin_history(State(state): AppStateRef, Wallet(wallet): Wallet) -> ServerResult<Json<SpinHistoryResponse>> {
    let spins = spin::history(&state, &wallet).await?;
    Ok(Json(SpinHistoryResponse { spins }))
}

async fn route_user(State(state): AppStateRef, Wallet(wallet): Wallet) -> ServerResult<Json<UserResponse>> {
    let user = account::get_or_create_user(&state, &wallet).await?;
    Ok(Json(UserResponse { user }))
}

async fn route_update_user(
    State(state): AppStateRef,
    Wallet(wallet): Wallet,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ServerResult<Json<UpdateUserResponse>> {
    let Json(req) = body?;
    let user = account::update_profile(&state, &wallet, &req).await?;
    Ok(Json(UpdateUserResponse { success: true, user }))
}

async fn route_stakes(State(state): AppStateRef, Wallet(wallet): Wallet) -> ServerResult<Json<StakesResponse>> {
    let stakes = staking::list_stakes(&state, &wallet).await?;
    Ok(Json(StakesResponse { stakes }))
}

async fn route_stake(
    State(state): AppStateRef,
    Wallet(wallet): Wallet,
    body: Result<Json<CreateStakeRequest>, JsonRejection>,
) -> ServerResult<Json<CreateStakeResponse>> {
    let Json(req) = body?;
    let stake = staking::create_stake(&state, &wallet, &req).await?;
    Ok(Json(CreateStakeResponse { success: true, stake }))
}

async fn route_unstake(
    State(state): AppStateRef,
    Wallet(wallet): Wallet,
    body: Result<Json<UnstakeRequest>, JsonRejection>,
) -> ServerResult<Json<UnstakeResponse>> {
    let Json(req) = body?;
    let unstake = staking::unstake(&state, &wallet, &req).await?;
    Ok(Json(UnstakeResponse { success: true, unstake }))
}

async fn route_yield(State(state): AppStateRef, Wallet(wallet): Wallet) -> ServerResult<Json<YieldInfoResponse>> {
    Ok(Json(staking::yield_info(&state, &wallet).await?))
}

async fn route_claim_yield(State(state): AppStateRef, Wallet(wallet): Wallet) -> ServerResult<Json<ClaimYieldResponse>> {
    Ok(Json(staking::claim_yield(&state, &wallet).await?))
}

async fn route_boosters(State(state): AppStateRef, Wallet(wallet): Wallet) -> ServerResult<Json<BoostersResponse>> {
    Ok(Json(market::boosters(&state, &wallet).await?))
}

async fn route_purchase_booster(
    State(state): AppStateRef,
    Wallet(wallet): Wallet,
    body: Result<Json<PurchaseBoosterRequest>, JsonRejection>,
) -> ServerResult<Json<PurchaseBoosterResponse>> {
    let Json(req) = body?;
    let booster = market::purchase_booster(&state, &wallet, &req).await?;
    Ok(Json(PurchaseBoosterResponse { success: true, booster }))
}

async fn route_lottery(State(state): AppStateRef, Wallet(wallet): Wallet) -> ServerResult<Json<LotteryResponse>> {
    Ok(Json(market::lottery(&state, &wallet).await?))
}

async fn route_buy_tickets(
    State(state): AppStateRef,
    Wallet(wallet): Wallet,
    body: Result<Json<BuyTicketsRequest>, JsonRejection>,
) -> ServerResult<Json<BuyTicketsResponse>> {
    let Json(req) = body?;
    Ok(Json(market::buy_tickets(&state, &wallet, &req).await?))
}

async fn route_referral(State(state): AppStateRef, Wallet(wallet): Wallet) -> ServerResult<Json<ReferralResponse>> {
    let referral = account::referral_info(&state, &wallet).await?;
    Ok(Json(ReferralResponse { referral }))
}

async fn route_apply_referral(
    State(state): AppStateRef,
    Wallet(wallet): Wallet,
    body: Result<Json<ApplyReferralRequest>, JsonRejection>,
) -> ServerResult<Json<ApplyReferralResponse>> {
    let Json(req) = body?;
    Ok(Json(account::apply_referral(&state, &wallet, &req.referral_code).await?))
}

async fn route_leaderboard(
    State(state): AppStateRef,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> ServerResult<Json<LeaderboardResponse>> {
    let Query(query) = query?;
    Ok(Json(account::leaderboard(&state, &query).await?))
}

async fn route_stats(State(state): AppStateRef) -> ServerResult<Json<StatsResponse>> {
    let stats = account::system_stats(&state).await?;
    Ok(Json(StatsResponse { stats }))
}

async fn route_admin_create_draw(
    State(state): AppStateRef,
    _admin: Admin,
    body: Result<Json<CreateDrawRequest>, JsonRejection>,
) -> ServerResult<Json<CreateDrawResponse>> {
    let Json(req) = body?;
    let draw = market::create_draw(&state, &req).await?;
    Ok(Json(CreateDrawResponse { draw }))
}
