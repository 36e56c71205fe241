use chadempire_core::{
    reconcile_fragments, Booster, BoosterType, FragmentType, GameError, LotteryTicket, Mutation,
};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{error::ServerResult, store};

#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    BoosterUsed { booster_id: String },
    SpinRecorded { spin_id: String },
    UserCredited,
    FragmentsAdded {
        fragment_type: FragmentType,
        quantity: i64,
        remaining: i64,
    },
    BoosterMinted(Booster),
    TicketIssued(LotteryTicket),
    StatsBumped,
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn new_mint_address() -> String {
    format!("mint_{}", Uuid::new_v4().simple())
}

pub fn fresh_booster(user_id: &str, booster_type: BoosterType, power_level: u32, now: DateTime<Utc>) -> Booster {
    Booster {
        id: new_id(),
        user_id: user_id.to_string(),
        mint_address: new_mint_address(),
        booster_type,
        power_level,
        used_at: None,
        transaction_hash: None,
        created_at: now,
    }
}

// `conn` must be inside the caller's transaction; on error the caller drops it.
pub async fn apply(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: DateTime<Utc>,
    mutations: &[Mutation],
) -> ServerResult<Vec<Applied>> {
    let mut applied = Vec::with_capacity(mutations.len());
    for mutation in mutations {
        match mutation {
            Mutation::MarkBoosterUsed { booster_id } => {
                if !store::mark_booster_used(&mut *conn, booster_id, user_id, now).await? {
                    return Err(GameError::BoosterAlreadyUsed.into());
                }
                debug!(booster_id = %booster_id, "booster consumed");
                applied.push(Applied::BoosterUsed {
                    booster_id: booster_id.clone(),
                });
            }
            Mutation::RecordSpin(spin) => {
                store::insert_spin(&mut *conn, spin).await?;
                applied.push(Applied::SpinRecorded { spin_id: spin.id.clone() });
            }
            Mutation::CreditUser(credit) => {
                store::credit_user(&mut *conn, user_id, credit, now).await?;
                applied.push(Applied::UserCredited);
            }
            Mutation::AddFragments {
                fragment_type,
                quantity,
            } => {
                let current = store::fragment_quantity(&mut *conn, user_id, *fragment_type).await?;
                let (remaining, mints) = reconcile_fragments(current + quantity);
                store::set_fragment_quantity(&mut *conn, &new_id(), user_id, *fragment_type, remaining, now).await?;
                applied.push(Applied::FragmentsAdded {
                    fragment_type: *fragment_type,
                    quantity: *quantity,
                    remaining,
                });
                for _ in 0..mints {
                    let booster = fresh_booster(user_id, fragment_type.minted_booster(), 1, now);
                    store::insert_booster(&mut *conn, &booster).await?;
                    info!(user_id, booster_type = %booster.booster_type, "fragments minted a booster");
                    applied.push(Applied::BoosterMinted(booster));
                }
            }
            Mutation::MintBooster {
                booster_type,
                power_level,
            } => {
                let booster = fresh_booster(user_id, *booster_type, *power_level, now);
                store::insert_booster(&mut *conn, &booster).await?;
                applied.push(Applied::BoosterMinted(booster));
            }
            Mutation::IssueLotteryTicket {
                ticket_number,
                lottery_draw_id,
            } => {
                let ticket = LotteryTicket {
                    id: new_id(),
                    user_id: user_id.to_string(),
                    lottery_draw_id: lottery_draw_id.clone(),
                    ticket_number: ticket_number.clone(),
                    is_winner: false,
                    transaction_hash: None,
                    created_at: now,
                };
                store::insert_ticket(&mut *conn, &ticket).await?;
                applied.push(Applied::TicketIssued(ticket));
            }
            Mutation::BumpStats(delta) => {
                store::bump_stats(&mut *conn, delta, now).await?;
                applied.push(Applied::StatsBumped);
            }
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chadempire_core::{ConsolationType, Spin, SpinReward, SpinType, StatsDelta, User, UserCredit};
    use chrono::TimeZone;

    use crate::store::Store;

    async fn setup() -> (Store, User, DateTime<Utc>) {
        let store = Store::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let user = User {
            id: "user-1".into(),
            wallet_address: "wallet-1".into(),
            username: None,
            avatar_url: None,
            chad_score: 0.0,
            total_spins: 0,
            total_wins: 0,
            total_yield_earned: 0.0,
            referral_code: Some(User::referral_code_for("wallet-1")),
            referred_by: None,
            created_at: now,
            updated_at: now,
        };
        let mut conn = store.conn().await.unwrap();
        store::insert_user(&mut conn, &user).await.unwrap();
        drop(conn);
        (store, user, now)
    }

    #[tokio::test]
    async fn fragment_threshold_mints_and_resets() {
        let (store, user, now) = setup().await;
        let mut tx = store.begin().await.unwrap();
        store::set_fragment_quantity(&mut tx, "f1", &user.id, FragmentType::Luck, 4, now)
            .await
            .unwrap();
        let applied = apply(
            &mut tx,
            &user.id,
            now,
            &[Mutation::AddFragments {
                fragment_type: FragmentType::Luck,
                quantity: 1,
            }],
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(applied[0], Applied::FragmentsAdded { remaining: 0, .. }));
        let mut conn = store.conn().await.unwrap();
        assert_eq!(store::fragment_quantity(&mut conn, &user.id, FragmentType::Luck).await.unwrap(), 0);
        let boosters = store::list_boosters(&mut conn, &user.id).await.unwrap();
        assert_eq!(boosters.len(), 1);
        assert_eq!(boosters[0].booster_type, BoosterType::LuckBoost);
        assert_eq!(boosters[0].power_level, 1);
    }

    #[tokio::test]
    async fn booster_can_only_be_marked_once() {
        let (store, user, now) = setup().await;
        let booster = fresh_booster(&user.id, BoosterType::LuckBoost, 1, now);
        let mut conn = store.conn().await.unwrap();
        store::insert_booster(&mut conn, &booster).await.unwrap();
        let mark = [Mutation::MarkBoosterUsed {
            booster_id: booster.id.clone(),
        }];
        apply(&mut conn, &user.id, now, &mark).await.unwrap();
        let err = apply(&mut conn, &user.id, now, &mark).await.unwrap_err();
        assert_eq!(err.to_game(), GameError::BoosterAlreadyUsed);
    }

    #[tokio::test]
    async fn failed_batch_leaves_nothing_behind() {
        let (store, user, now) = setup().await;
        let booster = fresh_booster(&user.id, BoosterType::LuckBoost, 1, now);
        {
            let mut conn = store.conn().await.unwrap();
            let mut used = booster.clone();
            used.used_at = Some(now);
            store::insert_booster(&mut conn, &used).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        let batch = [
            Mutation::CreditUser(UserCredit {
                chad_score: 35.0,
                spins: 1,
                ..Default::default()
            }),
            Mutation::BumpStats(StatsDelta {
                total_spins: 1,
                ..Default::default()
            }),
            Mutation::MarkBoosterUsed {
                booster_id: booster.id.clone(),
            },
        ];
        let err = apply(&mut tx, &user.id, now, &batch).await.unwrap_err();
        assert_eq!(err.to_game(), GameError::BoosterAlreadyUsed);
        drop(tx);

        let mut conn = store.conn().await.unwrap();
        let after = store::find_user_by_id(&mut conn, &user.id).await.unwrap().unwrap();
        assert_eq!(after.chad_score, 0.0);
        assert_eq!(after.total_spins, 0);
        assert_eq!(store::load_stats(&mut conn).await.unwrap().total_spins, 0);
    }

    #[tokio::test]
    async fn booster_mark_rolls_back_with_a_later_failure() {
        let (store, user, now) = setup().await;
        let booster = fresh_booster(&user.id, BoosterType::LuckBoost, 1, now);
        {
            let mut conn = store.conn().await.unwrap();
            store::insert_booster(&mut conn, &booster).await.unwrap();
        }
        let spin = Spin {
            id: "spin-1".into(),
            user_id: user.id.clone(),
            spin_type: SpinType::Daily,
            reward: SpinReward::Consolation {
                consolation_type: ConsolationType::ChadScore,
                consolation_amount: 35.0,
            },
            booster_used: Some(booster.id.clone()),
            transaction_hash: None,
            created_at: now,
        };

        let mut tx = store.begin().await.unwrap();
        // The second insert reuses the spin id and fails on the primary key.
        let batch = [
            Mutation::MarkBoosterUsed {
                booster_id: booster.id.clone(),
            },
            Mutation::RecordSpin(spin.clone()),
            Mutation::RecordSpin(spin),
        ];
        let err = apply(&mut tx, &user.id, now, &batch).await.unwrap_err();
        assert_eq!(err.to_game().kind(), "PERSISTENCE_ERROR");
        drop(tx);

        let mut conn = store.conn().await.unwrap();
        let stored = store::find_booster(&mut conn, &booster.id).await.unwrap().unwrap();
        assert_eq!(stored.used_at, None);
        assert_eq!(store::count_spins(&mut conn, &user.id).await.unwrap(), 0);
    }
}
