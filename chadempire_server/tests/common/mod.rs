#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chadempire_core::{Clock, FixedClock, ScriptedRandom, User};
use chadempire_server::{
    account,
    auth::HmacSessions,
    config::Config,
    staking,
    store::Store,
    AppState,
};
use chadempire_shared::CreateStakeRequest;
use chrono::{DateTime, TimeZone, Utc};

pub const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

pub struct Harness {
    pub state: Arc<AppState>,
    pub clock: Arc<FixedClock>,
    pub sessions: HmacSessions,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub async fn harness(script: impl IntoIterator<Item = f64>) -> Harness {
    harness_with(script, Config::default()).await
}

pub async fn harness_with(script: impl IntoIterator<Item = f64>, config: Config) -> Harness {
    harness_on(Store::in_memory().await.unwrap(), script, config).await
}

pub async fn harness_on(store: Store, script: impl IntoIterator<Item = f64>, config: Config) -> Harness {
    store.migrate().await.unwrap();
    let clock = Arc::new(FixedClock::new(start_time()));
    let sessions = HmacSessions::new(&config.session_secret);
    let state = AppState::new(store, config)
        .with_clock(clock.clone())
        .with_rng(Arc::new(ScriptedRandom::with_fallback(script, 0.5)));
    Harness {
        state: Arc::new(state),
        clock,
        sessions,
    }
}

pub fn quick_timeout() -> Config {
    Config {
        db_timeout: Duration::from_millis(100),
        spin_retries: 1,
        ..Config::default()
    }
}

impl Harness {
    /// A user with one Active stake of `amount`.
    pub async fn staked_user(&self, wallet: &str, amount: f64) -> User {
        let user = account::get_or_create_user(&self.state, wallet).await.unwrap();
        staking::create_stake(
            &self.state,
            wallet,
            &CreateStakeRequest {
                amount,
                transaction_hash: None,
            },
        )
        .await
        .unwrap();
        user
    }

    pub fn token(&self, wallet: &str) -> String {
        self.sessions.issue(wallet, self.clock.now() + chrono::Duration::hours(1))
    }
}
