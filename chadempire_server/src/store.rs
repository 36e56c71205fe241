use std::str::FromStr;
use std::time::Duration;

use chadempire_core::{
    Booster, BoosterType, ConsolationType, DrawStatus, Fragment, FragmentType, GameError, LotteryDraw,
    LotteryTicket, Spin, SpinReward, SpinType, Stake, StakeStatus, StatsDelta, SystemStats, User, UserCredit,
};
use chadempire_shared::LeaderboardSort;
use chrono::{DateTime, Utc};
use sqlx::{
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite, SqliteConnection, SqlitePool, Transaction,
};

use crate::error::ServerResult;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    // single connection that never expires, so the schema lives with the pool
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    // Every transaction here writes, so take the write lock up front. A
    // deferred transaction that reads first fails with SQLITE_BUSY when it
    // later tries to upgrade while another writer holds the lock.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin_with("BEGIN IMMEDIATE").await
    }

    pub async fn conn(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }
}

fn parse<T: FromStr<Err = GameError>>(raw: &str) -> Result<T, GameError> {
    raw.parse()
}

// ---- users ----

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    wallet_address: String,
    username: Option<String>,
    avatar_url: Option<String>,
    chad_score: f64,
    total_spins: i64,
    total_wins: i64,
    total_yield_earned: f64,
    referral_code: Option<String>,
    referred_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            wallet_address: r.wallet_address,
            username: r.username,
            avatar_url: r.avatar_url,
            chad_score: r.chad_score,
            total_spins: r.total_spins,
            total_wins: r.total_wins,
            total_yield_earned: r.total_yield_earned,
            referral_code: r.referral_code,
            referred_by: r.referred_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "id, wallet_address, username, avatar_url, chad_score, total_spins, total_wins, \
     total_yield_earned, referral_code, referred_by, created_at, updated_at";

pub async fn find_user_by_wallet(conn: &mut SqliteConnection, wallet: &str) -> ServerResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE wallet_address = ?"))
        .bind(wallet)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(User::from))
}

pub async fn find_user_by_id(conn: &mut SqliteConnection, id: &str) -> ServerResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(User::from))
}

pub async fn find_user_by_referral_code(conn: &mut SqliteConnection, code: &str) -> ServerResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE referral_code = ?"))
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(User::from))
}

pub async fn insert_user(conn: &mut SqliteConnection, user: &User) -> ServerResult<()> {
    sqlx::query(
        "INSERT INTO users (id, wallet_address, username, avatar_url, chad_score, total_spins, total_wins, \
         total_yield_earned, referral_code, referred_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.wallet_address)
    .bind(&user.username)
    .bind(&user.avatar_url)
    .bind(user.chad_score)
    .bind(user.total_spins)
    .bind(user.total_wins)
    .bind(user.total_yield_earned)
    .bind(&user.referral_code)
    .bind(&user.referred_by)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn update_profile(
    conn: &mut SqliteConnection,
    user_id: &str,
    username: Option<&str>,
    avatar_url: Option<&str>,
    now: DateTime<Utc>,
) -> ServerResult<()> {
    sqlx::query(
        "UPDATE users SET username = COALESCE(?, username), avatar_url = COALESCE(?, avatar_url), updated_at = ? \
         WHERE id = ?",
    )
    .bind(username)
    .bind(avatar_url)
    .bind(now)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Increment the user's counters. Never read-modify-write from Rust.
pub async fn credit_user(
    conn: &mut SqliteConnection,
    user_id: &str,
    credit: &UserCredit,
    now: DateTime<Utc>,
) -> ServerResult<()> {
    let res = sqlx::query(
        "UPDATE users SET chad_score = chad_score + ?, total_yield_earned = total_yield_earned + ?, \
         total_spins = total_spins + ?, total_wins = total_wins + ?, updated_at = ? WHERE id = ?",
    )
    .bind(credit.chad_score)
    .bind(credit.yield_earned)
    .bind(credit.spins)
    .bind(credit.wins)
    .bind(now)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() == 0 {
        return Err(GameError::UserNotFound.into());
    }
    Ok(())
}

pub async fn set_referred_by(
    conn: &mut SqliteConnection,
    user_id: &str,
    code: &str,
    now: DateTime<Utc>,
) -> ServerResult<bool> {
    let res = sqlx::query("UPDATE users SET referred_by = ?, updated_at = ? WHERE id = ? AND referred_by IS NULL")
        .bind(code)
        .bind(now)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn list_referred_users(conn: &mut SqliteConnection, code: &str) -> ServerResult<Vec<User>> {
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE referred_by = ? ORDER BY created_at ASC"
    ))
    .bind(code)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(User::from).collect())
}

pub async fn count_users(conn: &mut SqliteConnection) -> ServerResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await?)
}

pub async fn leaderboard(
    conn: &mut SqliteConnection,
    sort: LeaderboardSort,
    limit: u32,
    offset: u64,
) -> ServerResult<Vec<User>> {
    let order = match sort {
        LeaderboardSort::ChadScore => "chad_score DESC",
        LeaderboardSort::Yield => "total_yield_earned DESC",
        LeaderboardSort::Spins => "total_spins DESC",
    };
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY {order}, created_at ASC, id ASC LIMIT ? OFFSET ?"
    ))
    .bind(i64::from(limit))
    .bind(offset as i64)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(User::from).collect())
}

// ---- stakes ----

#[derive(Debug, sqlx::FromRow)]
struct StakeRow {
    id: String,
    user_id: String,
    amount: f64,
    staked_at: DateTime<Utc>,
    status: String,
    penalty_amount: f64,
    unstake_requested_at: Option<DateTime<Utc>>,
    unstaked_at: Option<DateTime<Utc>>,
    yield_days_claimed: i64,
    transaction_hash: Option<String>,
}

impl TryFrom<StakeRow> for Stake {
    type Error = GameError;

    fn try_from(r: StakeRow) -> Result<Self, Self::Error> {
        Ok(Stake {
            status: parse::<StakeStatus>(&r.status)?,
            id: r.id,
            user_id: r.user_id,
            amount: r.amount,
            staked_at: r.staked_at,
            penalty_amount: r.penalty_amount,
            unstake_requested_at: r.unstake_requested_at,
            unstaked_at: r.unstaked_at,
            yield_days_claimed: r.yield_days_claimed,
            transaction_hash: r.transaction_hash,
        })
    }
}

const STAKE_COLUMNS: &str = "id, user_id, amount, staked_at, status, penalty_amount, unstake_requested_at, \
     unstaked_at, yield_days_claimed, transaction_hash";

pub async fn list_stakes(conn: &mut SqliteConnection, user_id: &str) -> ServerResult<Vec<Stake>> {
    let rows = sqlx::query_as::<_, StakeRow>(&format!(
        "SELECT {STAKE_COLUMNS} FROM stakes WHERE user_id = ? ORDER BY staked_at DESC, id ASC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Stake::try_from).collect::<Result<_, _>>()?)
}

pub async fn find_stake(conn: &mut SqliteConnection, stake_id: &str) -> ServerResult<Option<Stake>> {
    let row = sqlx::query_as::<_, StakeRow>(&format!("SELECT {STAKE_COLUMNS} FROM stakes WHERE id = ?"))
        .bind(stake_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Stake::try_from).transpose()?)
}

pub async fn active_stake_total(conn: &mut SqliteConnection, user_id: &str) -> ServerResult<f64> {
    let total: Option<f64> = sqlx::query_scalar("SELECT SUM(amount) FROM stakes WHERE user_id = ? AND status = ?")
        .bind(user_id)
        .bind(StakeStatus::Active.as_db_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(total.unwrap_or(0.0))
}

pub async fn insert_stake(conn: &mut SqliteConnection, stake: &Stake) -> ServerResult<()> {
    sqlx::query(&format!(
        "INSERT INTO stakes ({STAKE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&stake.id)
    .bind(&stake.user_id)
    .bind(stake.amount)
    .bind(stake.staked_at)
    .bind(stake.status.as_db_str())
    .bind(stake.penalty_amount)
    .bind(stake.unstake_requested_at)
    .bind(stake.unstaked_at)
    .bind(stake.yield_days_claimed)
    .bind(&stake.transaction_hash)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn update_stake(conn: &mut SqliteConnection, stake: &Stake) -> ServerResult<()> {
    sqlx::query(
        "UPDATE stakes SET amount = ?, status = ?, penalty_amount = ?, unstake_requested_at = ?, \
         unstaked_at = ?, yield_days_claimed = ? WHERE id = ?",
    )
    .bind(stake.amount)
    .bind(stake.status.as_db_str())
    .bind(stake.penalty_amount)
    .bind(stake.unstake_requested_at)
    .bind(stake.unstaked_at)
    .bind(stake.yield_days_claimed)
    .bind(&stake.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn set_yield_days_claimed(conn: &mut SqliteConnection, stake_id: &str, days: i64) -> ServerResult<()> {
    sqlx::query("UPDATE stakes SET yield_days_claimed = ? WHERE id = ?")
        .bind(days)
        .bind(stake_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn insert_yield_claim(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
    amount: f64,
    now: DateTime<Utc>,
) -> ServerResult<()> {
    sqlx::query("INSERT INTO yield_claims (id, user_id, amount, claimed_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(user_id)
        .bind(amount)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// ---- spins ----

#[derive(Debug, sqlx::FromRow)]
struct SpinRow {
    id: String,
    user_id: String,
    spin_type: String,
    result: String,
    yield_percentage: Option<f64>,
    yield_amount: Option<f64>,
    jackpot: Option<bool>,
    consolation_type: Option<String>,
    consolation_amount: Option<f64>,
    booster_used: Option<String>,
    transaction_hash: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SpinRow> for Spin {
    type Error = GameError;

    fn try_from(r: SpinRow) -> Result<Self, Self::Error> {
        let reward = match (r.result.as_str(), r.yield_percentage, r.yield_amount, r.jackpot, r.consolation_type) {
            ("WIN", Some(yield_percentage), Some(yield_amount), Some(jackpot), None) => SpinReward::Win {
                yield_percentage,
                yield_amount,
                jackpot,
            },
            ("CONSOLATION", None, None, None, Some(kind)) => SpinReward::Consolation {
                consolation_type: parse::<ConsolationType>(&kind)?,
                consolation_amount: r.consolation_amount.unwrap_or_default(),
            },
            _ => {
                return Err(GameError::Persistence(format!(
                    "spin {} has a payload that does not match its result",
                    r.id
                )))
            }
        };
        Ok(Spin {
            spin_type: parse::<SpinType>(&r.spin_type)?,
            id: r.id,
            user_id: r.user_id,
            reward,
            booster_used: r.booster_used,
            transaction_hash: r.transaction_hash,
            created_at: r.created_at,
        })
    }
}

const SPIN_COLUMNS: &str = "id, user_id, spin_type, result, yield_percentage, yield_amount, jackpot, \
     consolation_type, consolation_amount, booster_used, transaction_hash, created_at";

pub async fn insert_spin(conn: &mut SqliteConnection, spin: &Spin) -> ServerResult<()> {
    let (result, yield_percentage, yield_amount, jackpot, consolation_type, consolation_amount) = match &spin.reward
    {
        SpinReward::Win {
            yield_percentage,
            yield_amount,
            jackpot,
        } => ("WIN", Some(*yield_percentage), Some(*yield_amount), Some(*jackpot), None, None),
        SpinReward::Consolation {
            consolation_type,
            consolation_amount,
        } => (
            "CONSOLATION",
            None,
            None,
            None,
            Some(consolation_type.as_db_str()),
            Some(*consolation_amount),
        ),
    };
    sqlx::query(&format!(
        "INSERT INTO spins ({SPIN_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&spin.id)
    .bind(&spin.user_id)
    .bind(spin.spin_type.as_db_str())
    .bind(result)
    .bind(yield_percentage)
    .bind(yield_amount)
    .bind(jackpot)
    .bind(consolation_type)
    .bind(consolation_amount)
    .bind(&spin.booster_used)
    .bind(&spin.transaction_hash)
    .bind(spin.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn last_daily_spin_at(conn: &mut SqliteConnection, user_id: &str) -> ServerResult<Option<DateTime<Utc>>> {
    Ok(sqlx::query_scalar(
        "SELECT created_at FROM spins WHERE user_id = ? AND spin_type = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .bind(SpinType::Daily.as_db_str())
    .fetch_optional(&mut *conn)
    .await?)
}

pub async fn recent_spins(conn: &mut SqliteConnection, user_id: &str, limit: u32) -> ServerResult<Vec<Spin>> {
    let rows = sqlx::query_as::<_, SpinRow>(&format!(
        "SELECT {SPIN_COLUMNS} FROM spins WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?"
    ))
    .bind(user_id)
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Spin::try_from).collect::<Result<_, _>>()?)
}

pub async fn latest_spins(conn: &mut SqliteConnection, limit: i64) -> ServerResult<Vec<Spin>> {
    let rows = sqlx::query_as::<_, SpinRow>(&format!(
        "SELECT {SPIN_COLUMNS} FROM spins ORDER BY created_at DESC, rowid DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Spin::try_from).collect::<Result<_, _>>()?)
}

pub async fn all_spins(conn: &mut SqliteConnection) -> ServerResult<Vec<Spin>> {
    let rows = sqlx::query_as::<_, SpinRow>(&format!("SELECT {SPIN_COLUMNS} FROM spins ORDER BY created_at ASC, rowid ASC"))
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(Spin::try_from).collect::<Result<_, _>>()?)
}

pub async fn count_spins(conn: &mut SqliteConnection, user_id: &str) -> ServerResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM spins WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?)
}

// ---- boosters ----

#[derive(Debug, sqlx::FromRow)]
struct BoosterRow {
    id: String,
    user_id: String,
    mint_address: String,
    booster_type: String,
    power_level: i64,
    used_at: Option<DateTime<Utc>>,
    transaction_hash: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BoosterRow> for Booster {
    type Error = GameError;

    fn try_from(r: BoosterRow) -> Result<Self, Self::Error> {
        let power_level = u32::try_from(r.power_level)
            .map_err(|_| GameError::Persistence(format!("booster {} has power level {}", r.id, r.power_level)))?;
        Ok(Booster {
            booster_type: parse::<BoosterType>(&r.booster_type)?,
            power_level,
            id: r.id,
            user_id: r.user_id,
            mint_address: r.mint_address,
            used_at: r.used_at,
            transaction_hash: r.transaction_hash,
            created_at: r.created_at,
        })
    }
}

const BOOSTER_COLUMNS: &str = "id, user_id, mint_address, booster_type, power_level, used_at, transaction_hash, created_at";

pub async fn find_booster(conn: &mut SqliteConnection, booster_id: &str) -> ServerResult<Option<Booster>> {
    let row = sqlx::query_as::<_, BoosterRow>(&format!("SELECT {BOOSTER_COLUMNS} FROM boosters WHERE id = ?"))
        .bind(booster_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Booster::try_from).transpose()?)
}

pub async fn list_boosters(conn: &mut SqliteConnection, user_id: &str) -> ServerResult<Vec<Booster>> {
    let rows = sqlx::query_as::<_, BoosterRow>(&format!(
        "SELECT {BOOSTER_COLUMNS} FROM boosters WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Booster::try_from).collect::<Result<_, _>>()?)
}

pub async fn insert_booster(conn: &mut SqliteConnection, booster: &Booster) -> ServerResult<()> {
    sqlx::query(&format!(
        "INSERT INTO boosters ({BOOSTER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&booster.id)
    .bind(&booster.user_id)
    .bind(&booster.mint_address)
    .bind(booster.booster_type.as_db_str())
    .bind(i64::from(booster.power_level))
    .bind(booster.used_at)
    .bind(&booster.transaction_hash)
    .bind(booster.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// CAS on used_at: false when missing, foreign or already used
pub async fn mark_booster_used(
    conn: &mut SqliteConnection,
    booster_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> ServerResult<bool> {
    let res = sqlx::query("UPDATE boosters SET used_at = ? WHERE id = ? AND user_id = ? AND used_at IS NULL")
        .bind(now)
        .bind(booster_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

// ---- fragments ----

#[derive(Debug, sqlx::FromRow)]
struct FragmentRow {
    id: String,
    user_id: String,
    fragment_type: String,
    quantity: i64,
}

impl TryFrom<FragmentRow> for Fragment {
    type Error = GameError;

    fn try_from(r: FragmentRow) -> Result<Self, Self::Error> {
        Ok(Fragment {
            fragment_type: parse::<FragmentType>(&r.fragment_type)?,
            id: r.id,
            user_id: r.user_id,
            quantity: r.quantity,
        })
    }
}

pub async fn list_fragments(conn: &mut SqliteConnection, user_id: &str) -> ServerResult<Vec<Fragment>> {
    let rows = sqlx::query_as::<_, FragmentRow>(
        "SELECT id, user_id, fragment_type, quantity FROM fragments WHERE user_id = ? ORDER BY fragment_type",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Fragment::try_from).collect::<Result<_, _>>()?)
}

pub async fn fragment_quantity(
    conn: &mut SqliteConnection,
    user_id: &str,
    fragment_type: FragmentType,
) -> ServerResult<i64> {
    let q: Option<i64> = sqlx::query_scalar("SELECT quantity FROM fragments WHERE user_id = ? AND fragment_type = ?")
        .bind(user_id)
        .bind(fragment_type.as_db_str())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(q.unwrap_or(0))
}

pub async fn set_fragment_quantity(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
    fragment_type: FragmentType,
    quantity: i64,
    now: DateTime<Utc>,
) -> ServerResult<()> {
    sqlx::query(
        "INSERT INTO fragments (id, user_id, fragment_type, quantity, updated_at) VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT (user_id, fragment_type) DO UPDATE SET quantity = excluded.quantity, \
         updated_at = excluded.updated_at",
    )
    .bind(id)
    .bind(user_id)
    .bind(fragment_type.as_db_str())
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ---- lottery ----

#[derive(Debug, sqlx::FromRow)]
struct DrawRow {
    id: String,
    draw_number: i64,
    draw_time: DateTime<Utc>,
    jackpot: f64,
    winning_numbers: Option<String>,
    status: String,
}

impl TryFrom<DrawRow> for LotteryDraw {
    type Error = GameError;

    fn try_from(r: DrawRow) -> Result<Self, Self::Error> {
        Ok(LotteryDraw {
            status: parse::<DrawStatus>(&r.status)?,
            id: r.id,
            draw_number: r.draw_number,
            draw_time: r.draw_time,
            jackpot: r.jackpot,
            winning_numbers: r.winning_numbers,
        })
    }
}

/// The Pending draw with the earliest draw time after `now`.
pub async fn next_pending_draw(conn: &mut SqliteConnection, now: DateTime<Utc>) -> ServerResult<Option<LotteryDraw>> {
    let row = sqlx::query_as::<_, DrawRow>(
        "SELECT id, draw_number, draw_time, jackpot, winning_numbers, status FROM lottery_draws \
         WHERE status = ? AND draw_time > ? ORDER BY draw_time ASC LIMIT 1",
    )
    .bind(DrawStatus::Pending.as_db_str())
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(LotteryDraw::try_from).transpose()?)
}

pub async fn next_draw_number(conn: &mut SqliteConnection) -> ServerResult<i64> {
    let max: Option<i64> = sqlx::query_scalar("SELECT MAX(draw_number) FROM lottery_draws")
        .fetch_one(&mut *conn)
        .await?;
    Ok(max.unwrap_or(0) + 1)
}

pub async fn insert_draw(conn: &mut SqliteConnection, draw: &LotteryDraw, now: DateTime<Utc>) -> ServerResult<()> {
    sqlx::query(
        "INSERT INTO lottery_draws (id, draw_number, draw_time, jackpot, winning_numbers, status, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&draw.id)
    .bind(draw.draw_number)
    .bind(draw.draw_time)
    .bind(draw.jackpot)
    .bind(&draw.winning_numbers)
    .bind(draw.status.as_db_str())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: String,
    user_id: String,
    lottery_draw_id: Option<String>,
    ticket_number: String,
    is_winner: bool,
    transaction_hash: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TicketRow> for LotteryTicket {
    fn from(r: TicketRow) -> Self {
        LotteryTicket {
            id: r.id,
            user_id: r.user_id,
            lottery_draw_id: r.lottery_draw_id,
            ticket_number: r.ticket_number,
            is_winner: r.is_winner,
            transaction_hash: r.transaction_hash,
            created_at: r.created_at,
        }
    }
}

pub async fn insert_ticket(conn: &mut SqliteConnection, ticket: &LotteryTicket) -> ServerResult<()> {
    sqlx::query(
        "INSERT INTO lottery_tickets (id, user_id, lottery_draw_id, ticket_number, is_winner, transaction_hash, \
         created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&ticket.id)
    .bind(&ticket.user_id)
    .bind(&ticket.lottery_draw_id)
    .bind(&ticket.ticket_number)
    .bind(ticket.is_winner)
    .bind(&ticket.transaction_hash)
    .bind(ticket.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn list_tickets(conn: &mut SqliteConnection, user_id: &str) -> ServerResult<Vec<LotteryTicket>> {
    let rows = sqlx::query_as::<_, TicketRow>(
        "SELECT id, user_id, lottery_draw_id, ticket_number, is_winner, transaction_hash, created_at \
         FROM lottery_tickets WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(LotteryTicket::from).collect())
}

// ---- referrals ----

pub async fn insert_referral(
    conn: &mut SqliteConnection,
    id: &str,
    referrer_id: &str,
    referred_id: &str,
    bonus: f64,
    now: DateTime<Utc>,
) -> ServerResult<()> {
    sqlx::query(
        "INSERT INTO referrals (id, referrer_id, referred_id, bonus_amount, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(referrer_id)
    .bind(referred_id)
    .bind(bonus)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ---- system stats ----

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total_users: i64,
    total_staked: f64,
    total_spins: i64,
    total_yield_paid: f64,
    lottery_pool: f64,
}

pub async fn load_stats(conn: &mut SqliteConnection) -> ServerResult<SystemStats> {
    let row = sqlx::query_as::<_, StatsRow>(
        "SELECT total_users, total_staked, total_spins, total_yield_paid, lottery_pool FROM system_stats WHERE id = 1",
    )
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row
        .map(|r| SystemStats {
            total_users: r.total_users,
            total_staked: r.total_staked,
            total_spins: r.total_spins,
            total_yield_paid: r.total_yield_paid,
            lottery_pool: r.lottery_pool,
        })
        .unwrap_or_default())
}

pub async fn bump_stats(conn: &mut SqliteConnection, delta: &StatsDelta, now: DateTime<Utc>) -> ServerResult<()> {
    if delta.is_empty() {
        return Ok(());
    }
    let res = sqlx::query(
        "UPDATE system_stats SET total_users = total_users + ?, total_staked = total_staked + ?, \
         total_spins = total_spins + ?, total_yield_paid = total_yield_paid + ?, \
         lottery_pool = lottery_pool + ?, updated_at = ? WHERE id = 1",
    )
    .bind(delta.total_users)
    .bind(delta.total_staked)
    .bind(delta.total_spins)
    .bind(delta.total_yield_paid)
    .bind(delta.lottery_pool)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() != 1 {
        return Err(GameError::Persistence("system stats row is missing".into()).into());
    }
    Ok(())
}
