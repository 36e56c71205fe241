mod common;

use chadempire_core::{BoosterType, GameError, StakeStatus};
use chadempire_server::{account, market, staking, store};
use chadempire_shared::{
    BuyTicketsRequest, CreateDrawRequest, CreateStakeRequest, LeaderboardQuery, LeaderboardSort,
    PurchaseBoosterRequest, UnstakeRequest, UpdateUserRequest,
};
use chrono::Duration;
use common::{harness, start_time, WALLET};

fn unstake_req(stake_id: &str, amount: f64) -> UnstakeRequest {
    UnstakeRequest {
        stake_id: stake_id.to_string(),
        action: "unstake".into(),
        amount,
    }
}

#[tokio::test]
async fn first_lookup_creates_the_user_once() {
    let h = harness([]).await;
    let a = account::get_or_create_user(&h.state, WALLET).await.unwrap();
    let b = account::get_or_create_user(&h.state, WALLET).await.unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.referral_code.as_deref(), Some("CHAD7xKXtg2C"));
    assert_eq!(a.username.as_deref(), Some(account::DEFAULT_USERNAME));
    assert_eq!(account::system_stats(&h.state).await.unwrap().total_users, 1);
}

#[tokio::test]
async fn partial_unstake_after_five_days() {
    let h = harness([]).await;
    h.staked_user(WALLET, 1000.0).await;
    let stake = staking::list_stakes(&h.state, WALLET).await.unwrap().remove(0);
    h.clock.advance(Duration::days(5));

    let receipt = staking::unstake(&h.state, WALLET, &unstake_req(&stake.id, 400.0))
        .await
        .unwrap();
    assert_eq!(receipt.quote.penalty_percentage, 25);
    assert_eq!(receipt.quote.penalty_amount, 100.0);
    assert_eq!(receipt.quote.receive_amount, 300.0);

    let after = staking::list_stakes(&h.state, WALLET).await.unwrap().remove(0);
    assert_eq!(after.amount, 600.0);
    assert_eq!(after.status, StakeStatus::Active);
    assert_eq!(after.penalty_amount, 100.0);
    assert_eq!(account::system_stats(&h.state).await.unwrap().total_staked, 600.0);
}

#[tokio::test]
async fn full_unstake_closes_the_stake() {
    let h = harness([]).await;
    h.staked_user(WALLET, 250.0).await;
    let stake = staking::list_stakes(&h.state, WALLET).await.unwrap().remove(0);
    h.clock.advance(Duration::days(95));

    let receipt = staking::unstake(&h.state, WALLET, &unstake_req(&stake.id, 250.0))
        .await
        .unwrap();
    assert_eq!(receipt.quote.penalty_percentage, 0);
    let after = staking::list_stakes(&h.state, WALLET).await.unwrap().remove(0);
    assert_eq!(after.status, StakeStatus::Unstaked);
    assert!(after.unstaked_at.is_some());

    let err = staking::unstake(&h.state, WALLET, &unstake_req(&stake.id, 1.0))
        .await
        .unwrap_err();
    assert_eq!(err.to_game(), GameError::StakeNotActive);
}

#[tokio::test]
async fn rejected_unstake_leaves_ledgers_untouched() {
    let h = harness([]).await;
    h.staked_user(WALLET, 1000.0).await;
    let stake = staking::list_stakes(&h.state, WALLET).await.unwrap().remove(0);

    let err = staking::unstake(&h.state, WALLET, &unstake_req(&stake.id, 1000.5))
        .await
        .unwrap_err();
    assert!(matches!(err.to_game(), GameError::InvalidAmount(_)));
    let err = staking::unstake(&h.state, WALLET, &unstake_req("missing", 10.0))
        .await
        .unwrap_err();
    assert_eq!(err.to_game(), GameError::StakeNotFound);

    let after = staking::list_stakes(&h.state, WALLET).await.unwrap().remove(0);
    assert_eq!(after, stake);
    assert_eq!(account::system_stats(&h.state).await.unwrap().total_staked, 1000.0);
}

#[tokio::test]
async fn someone_elses_stake_is_not_found() {
    let h = harness([]).await;
    h.staked_user(WALLET, 1000.0).await;
    h.staked_user("other-wallet", 500.0).await;
    let theirs = staking::list_stakes(&h.state, "other-wallet").await.unwrap().remove(0);
    let err = staking::unstake(&h.state, WALLET, &unstake_req(&theirs.id, 10.0))
        .await
        .unwrap_err();
    assert_eq!(err.to_game(), GameError::StakeNotFound);
}

#[tokio::test]
async fn stake_amount_must_be_positive() {
    let h = harness([]).await;
    account::get_or_create_user(&h.state, WALLET).await.unwrap();
    for amount in [0.0, -1.0, f64::INFINITY] {
        let err = staking::create_stake(
            &h.state,
            WALLET,
            &CreateStakeRequest {
                amount,
                transaction_hash: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err.to_game(), GameError::InvalidAmount(_)));
    }
}

#[tokio::test]
async fn yield_claims_pay_each_day_once() {
    let h = harness([]).await;
    h.staked_user(WALLET, 1000.0).await;

    let err = staking::claim_yield(&h.state, WALLET).await.unwrap_err();
    assert_eq!(err.to_game(), GameError::NoYieldAvailable);

    h.clock.advance(Duration::days(10) + Duration::hours(5));
    let info = staking::yield_info(&h.state, WALLET).await.unwrap();
    assert_eq!(info.yield_rate, "0.01% per day");
    assert!((info.summary.available_to_claim - 1.0).abs() < 1e-9);

    let claim = staking::claim_yield(&h.state, WALLET).await.unwrap();
    assert!((claim.claimed_amount - 1.0).abs() < 1e-9);
    let err = staking::claim_yield(&h.state, WALLET).await.unwrap_err();
    assert_eq!(err.to_game(), GameError::NoYieldAvailable);

    h.clock.advance(Duration::days(1));
    let claim = staking::claim_yield(&h.state, WALLET).await.unwrap();
    assert!((claim.claimed_amount - 0.1).abs() < 1e-9);

    let user = account::get_or_create_user(&h.state, WALLET).await.unwrap();
    assert!((user.total_yield_earned - 1.1).abs() < 1e-9);
    assert!((user.chad_score - 1.1).abs() < 1e-9);
    let stats = account::system_stats(&h.state).await.unwrap();
    assert!((stats.total_yield_paid - 1.1).abs() < 1e-9);
}

#[tokio::test]
async fn profile_updates_are_validated() {
    let h = harness([]).await;
    account::get_or_create_user(&h.state, WALLET).await.unwrap();

    let bad = UpdateUserRequest {
        username: Some("ab".into()),
        avatar_url: None,
    };
    let err = account::update_profile(&h.state, WALLET, &bad).await.unwrap_err();
    assert!(matches!(err.to_game(), GameError::InvalidRequest(_)));

    let good = UpdateUserRequest {
        username: Some("GigaChad".into()),
        avatar_url: None,
    };
    let user = account::update_profile(&h.state, WALLET, &good).await.unwrap();
    assert_eq!(user.username.as_deref(), Some("GigaChad"));
    assert!(user.avatar_url.is_some());
}

#[tokio::test]
async fn referral_credits_the_referrer_once() {
    let h = harness([]).await;
    let referrer = account::get_or_create_user(&h.state, "referrer-wallet").await.unwrap();
    let newcomer = account::get_or_create_user(&h.state, WALLET).await.unwrap();
    let code = referrer.referral_code.clone().unwrap();

    let own = newcomer.referral_code.clone().unwrap();
    let err = account::apply_referral(&h.state, WALLET, &own).await.unwrap_err();
    assert!(matches!(err.to_game(), GameError::InvalidRequest(_)));
    let err = account::apply_referral(&h.state, WALLET, "CHADnothing").await.unwrap_err();
    assert!(matches!(err.to_game(), GameError::InvalidRequest(_)));

    let res = account::apply_referral(&h.state, WALLET, &code).await.unwrap();
    assert_eq!(res.bonus_awarded, account::REFERRAL_BONUS);
    let err = account::apply_referral(&h.state, WALLET, &code).await.unwrap_err();
    assert!(matches!(err.to_game(), GameError::InvalidRequest(_)));

    let info = account::referral_info(&h.state, "referrer-wallet").await.unwrap();
    assert_eq!(info.total_referrals, 1);
    assert_eq!(info.referrals[0].wallet_address, WALLET);
    assert_eq!(info.total_rewards, 50.0);
    let referrer = account::get_or_create_user(&h.state, "referrer-wallet").await.unwrap();
    assert_eq!(referrer.chad_score, 50.0);

    let mine = account::referral_info(&h.state, WALLET).await.unwrap();
    assert_eq!(mine.referrer.unwrap().wallet_address, "referrer-wallet");
}

#[tokio::test]
async fn referral_window_closes_after_seven_days() {
    let h = harness([]).await;
    let referrer = account::get_or_create_user(&h.state, "referrer-wallet").await.unwrap();
    account::get_or_create_user(&h.state, WALLET).await.unwrap();
    h.clock.advance(Duration::days(8));
    let err = account::apply_referral(&h.state, WALLET, referrer.referral_code.as_deref().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err.to_game(), GameError::InvalidRequest(_)));
}

#[tokio::test]
async fn purchased_booster_power_follows_price() {
    let h = harness([]).await;
    account::get_or_create_user(&h.state, WALLET).await.unwrap();
    let buy = |price: f64| PurchaseBoosterRequest {
        action: "purchase".into(),
        booster_type: BoosterType::YieldMultiplier,
        price,
        transaction_hash: Some("0xbuy".into()),
    };

    let b = market::purchase_booster(&h.state, WALLET, &buy(250.0)).await.unwrap();
    assert_eq!(b.power_level, 3);
    let b = market::purchase_booster(&h.state, WALLET, &buy(10_000.0)).await.unwrap();
    assert_eq!(b.power_level, 4);
    let err = market::purchase_booster(&h.state, WALLET, &buy(0.0)).await.unwrap_err();
    assert!(matches!(err.to_game(), GameError::InvalidAmount(_)));

    let listed = market::boosters(&h.state, WALLET).await.unwrap();
    assert_eq!(listed.boosters.len(), 2);
    assert_eq!(listed.boosters[0].transaction_hash.as_deref(), Some("0xbuy"));
}

#[tokio::test]
async fn ticket_purchase_feeds_the_lottery_pool() {
    let h = harness([]).await;
    account::get_or_create_user(&h.state, WALLET).await.unwrap();
    let draw = market::create_draw(
        &h.state,
        &CreateDrawRequest {
            draw_time: start_time() + Duration::days(7),
            jackpot: 500.0,
        },
    )
    .await
    .unwrap();
    assert_eq!(draw.draw_number, 1);

    let res = market::buy_tickets(
        &h.state,
        WALLET,
        &BuyTicketsRequest {
            quantity: 3,
            transaction_hash: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(res.tickets.len(), 3);
    assert_eq!(res.total_cost, 30.0);
    assert!(res
        .tickets
        .iter()
        .all(|t| t.lottery_draw_id.as_deref() == Some(draw.id.as_str())));

    let info = market::lottery(&h.state, WALLET).await.unwrap();
    assert_eq!(info.tickets.len(), 3);
    assert_eq!(info.current_draw.map(|d| d.id), Some(draw.id));
    assert_eq!(account::system_stats(&h.state).await.unwrap().lottery_pool, 30.0);

    let err = market::buy_tickets(
        &h.state,
        WALLET,
        &BuyTicketsRequest {
            quantity: 0,
            transaction_hash: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err.to_game(), GameError::InvalidAmount(_)));
}

#[tokio::test]
async fn leaderboard_ranks_and_paginates() {
    let h = harness([]).await;
    for (wallet, score) in [("w-a", 10.0), ("w-b", 30.0), ("w-c", 20.0)] {
        let user = account::get_or_create_user(&h.state, wallet).await.unwrap();
        let mut conn = h.state.store.conn().await.unwrap();
        store::credit_user(
            &mut conn,
            &user.id,
            &chadempire_core::UserCredit {
                chad_score: score,
                ..Default::default()
            },
            start_time(),
        )
        .await
        .unwrap();
    }

    let page1 = account::leaderboard(
        &h.state,
        &LeaderboardQuery {
            sort_by: Some(LeaderboardSort::ChadScore),
            limit: Some(2),
            page: Some(1),
        },
    )
    .await
    .unwrap();
    let wallets: Vec<_> = page1.leaderboard.iter().map(|e| e.wallet_address.as_str()).collect();
    assert_eq!(wallets, ["w-b", "w-c"]);
    assert_eq!(page1.pagination.total, 3);
    assert_eq!(page1.pagination.total_pages, 2);

    let page2 = account::leaderboard(
        &h.state,
        &LeaderboardQuery {
            sort_by: None,
            limit: Some(2),
            page: Some(2),
        },
    )
    .await
    .unwrap();
    assert_eq!(page2.leaderboard.len(), 1);
    assert_eq!(page2.leaderboard[0].rank, 3);
    assert_eq!(page2.leaderboard[0].wallet_address, "w-a");
}
