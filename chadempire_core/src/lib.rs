pub mod booster;
pub mod clock;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod lottery;
pub mod model;
pub mod penalty;
pub mod rng;
pub mod selector;
pub mod yields;

pub use crate::booster::BoosterEffect;
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::engine::{resolve_spin, validate, SpinOutcome, SpinRequest, SpinResolution, SpinSnapshot};
pub use crate::error::GameError;
pub use crate::ledger::{reconcile_fragments, Mutation, StatsDelta, UserCredit, FRAGMENT_MINT_THRESHOLD};
pub use crate::model::{
    Booster, BoosterType, ConsolationType, DrawStatus, Fragment, FragmentType, LotteryDraw, LotteryTicket, Spin,
    SpinReward, SpinType, Stake, StakeStatus, SystemStats, User,
};
pub use crate::rng::{derive_hash_hex, RandomSource, ScriptedRandom, SeededRandom, ThreadRandom};
