pub mod account;
pub mod applier;
pub mod auth;
pub mod config;
pub mod error;
pub mod locks;
pub mod market;
pub mod routes;
pub mod spin;
pub mod staking;
pub mod store;

use std::future::Future;
use std::sync::Arc;

use chadempire_core::{Clock, RandomSource, SystemClock, ThreadRandom};

use crate::{
    auth::{HmacSessions, SessionResolver},
    config::Config,
    error::{AppError, ServerResult},
    locks::UserLocks,
    store::Store,
};

pub use crate::routes::router;

pub struct AppState {
    pub store: Store,
    pub sessions: Arc<dyn SessionResolver>,
    pub clock: Arc<dyn Clock>,
    pub rng: Arc<dyn RandomSource>,
    pub locks: UserLocks,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Self {
        Self {
            store,
            sessions: Arc::new(HmacSessions::new(&config.session_secret)),
            clock: Arc::new(SystemClock),
            rng: Arc::new(ThreadRandom),
            locks: UserLocks::new(),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rng(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionResolver>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Run `fut` under the configured persistence timeout. On expiry the
    /// future is dropped, which rolls back any open transaction.
    pub async fn bounded<T, F>(&self, fut: F) -> ServerResult<T>
    where
        F: Future<Output = ServerResult<T>>,
    {
        tokio::time::timeout(self.config.db_timeout, fut)
            .await
            .map_err(|_| AppError::Timeout)?
    }
}
