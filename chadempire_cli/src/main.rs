use std::collections::HashMap;

use chadempire_core::{
    engine::{resolve_spin, SpinRequest, SpinSnapshot},
    SeededRandom, Spin, SpinReward, SpinType, User,
};
use chadempire_server::{auth::HmacSessions, config::Config, market, store, store::Store, AppState};
use chadempire_shared::CreateDrawRequest;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chadempire-cli", about = "Admin CLI for the Chad Empire server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://chadempire.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the last N spins
    ViewSpins {
        #[arg(default_value_t = 20)]
        n: i64,
    },
    /// Export every spin to a CSV file
    ExportCsv { path: String },
    /// Print the global counters
    Stats,
    /// Schedule a Pending lottery draw
    CreateDraw {
        /// RFC 3339 timestamp, e.g. 2025-01-01T20:00:00Z
        #[arg(long)]
        draw_time: DateTime<Utc>,
        #[arg(long, default_value_t = 0.0)]
        jackpot: f64,
    },
    /// Sign a bearer token for a wallet with SESSION_SECRET
    IssueSession {
        wallet: String,
        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,
    },
    /// Run seeded spins against a synthetic user and print the outcome mix
    Simulate {
        #[arg(long, default_value_t = 10_000)]
        spins: u64,
        #[arg(long, default_value = "simulation-server-seed")]
        seed: String,
        #[arg(long, default_value = "simulation-client-seed")]
        client_seed: String,
        #[arg(long, default_value_t = 1_000.0)]
        stake: f64,
    },
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    let store = Store::connect(&config.database_url, config.db_max_connections).await?;
    store.migrate().await?;
    Ok(store)
}

fn spin_line(spin: &Spin) -> String {
    let reward = match &spin.reward {
        SpinReward::Win {
            yield_percentage,
            yield_amount,
            jackpot,
        } => format!(
            "win{} {:.4}% -> {:.4}",
            if *jackpot { " JACKPOT" } else { "" },
            yield_percentage,
            yield_amount
        ),
        SpinReward::Consolation {
            consolation_type,
            consolation_amount,
        } => format!("{consolation_type} x{consolation_amount}"),
    };
    format!(
        "{} {} user={} type={} {}",
        spin.created_at.to_rfc3339(),
        spin.id,
        spin.user_id,
        spin.spin_type,
        reward
    )
}

fn simulate(spins: u64, seed: &str, client_seed: &str, stake: f64) {
    let now = Utc::now();
    let snapshot = SpinSnapshot {
        user: User {
            id: "simulated-user".into(),
            wallet_address: "simulated-wallet".into(),
            username: None,
            avatar_url: None,
            chad_score: 0.0,
            total_spins: 0,
            total_wins: 0,
            total_yield_earned: 0.0,
            referral_code: None,
            referred_by: None,
            created_at: now,
            updated_at: now,
        },
        active_stake: stake,
        booster: None,
        last_daily_spin_at: None,
        next_draw_id: None,
    };
    let request = SpinRequest {
        spin_type: SpinType::Premium,
        booster_id: None,
        transaction_hash: Some("simulation".into()),
    };

    let mut wins = 0u64;
    let mut jackpots = 0u64;
    let mut total_yield = 0.0;
    let mut consolations: HashMap<String, u64> = HashMap::new();
    let mut rejected = 0u64;
    for nonce in 0..spins {
        let rng = SeededRandom::new(seed, client_seed, nonce);
        match resolve_spin(&request, &snapshot, format!("sim-{nonce}"), now, &rng) {
            Ok(res) => match res.outcome.spin.reward {
                SpinReward::Win {
                    yield_amount, jackpot, ..
                } => {
                    wins += 1;
                    total_yield += yield_amount;
                    if jackpot {
                        jackpots += 1;
                    }
                }
                SpinReward::Consolation { consolation_type, .. } => {
                    *consolations.entry(consolation_type.to_string()).or_default() += 1;
                }
            },
            Err(e) => {
                rejected += 1;
                if rejected == 1 {
                    println!("spin rejected: {e}");
                }
            }
        }
    }

    let resolved = spins - rejected;
    println!("server_seed_hash={}", SeededRandom::new(seed, client_seed, 0).server_seed_hash_hex());
    let pct = |n: u64| if resolved == 0 { 0.0 } else { n as f64 * 100.0 / resolved as f64 };
    println!("spins={resolved} rejected={rejected}");
    println!("wins={wins} ({:.2}%) jackpots={jackpots} ({:.2}%)", pct(wins), pct(jackpots));
    println!("total_yield={total_yield:.4} on stake {stake}");
    let mut kinds: Vec<_> = consolations.into_iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(&a.1));
    for (kind, n) in kinds {
        println!("  {kind:<12} {n:>8} ({:.2}%)", pct(n));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    match cli.command {
        Commands::ViewSpins { n } => {
            let store = open_store(&config).await?;
            let mut conn = store.conn().await?;
            for spin in store::latest_spins(&mut conn, n).await? {
                println!("{}", spin_line(&spin));
            }
        }
        Commands::ExportCsv { path } => {
            let store = open_store(&config).await?;
            let mut conn = store.conn().await?;
            let spins = store::all_spins(&mut conn).await?;
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "id",
                "user_id",
                "spin_type",
                "result",
                "yield_percentage",
                "yield_amount",
                "jackpot",
                "consolation_type",
                "consolation_amount",
                "booster_used",
                "transaction_hash",
                "created_at",
            ])?;
            for s in &spins {
                let (result, pct, amount, jackpot, kind, qty) = match &s.reward {
                    SpinReward::Win {
                        yield_percentage,
                        yield_amount,
                        jackpot,
                    } => (
                        "win",
                        yield_percentage.to_string(),
                        yield_amount.to_string(),
                        jackpot.to_string(),
                        String::new(),
                        String::new(),
                    ),
                    SpinReward::Consolation {
                        consolation_type,
                        consolation_amount,
                    } => (
                        "consolation",
                        String::new(),
                        String::new(),
                        String::new(),
                        consolation_type.to_string(),
                        consolation_amount.to_string(),
                    ),
                };
                wtr.write_record([
                    s.id.clone(),
                    s.user_id.clone(),
                    s.spin_type.to_string(),
                    result.to_string(),
                    pct,
                    amount,
                    jackpot,
                    kind,
                    qty,
                    s.booster_used.clone().unwrap_or_default(),
                    s.transaction_hash.clone().unwrap_or_default(),
                    s.created_at.to_rfc3339(),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", spins.len(), path);
        }
        Commands::Stats => {
            let store = open_store(&config).await?;
            let mut conn = store.conn().await?;
            let stats = store::load_stats(&mut conn).await?;
            println!("users          {}", stats.total_users);
            println!("total staked   {:.4}", stats.total_staked);
            println!("spins          {}", stats.total_spins);
            println!("yield paid     {:.4}", stats.total_yield_paid);
            println!("lottery pool   {:.4}", stats.lottery_pool);
        }
        Commands::CreateDraw { draw_time, jackpot } => {
            let store = open_store(&config).await?;
            let state = AppState::new(store, config);
            let draw = market::create_draw(&state, &CreateDrawRequest { draw_time, jackpot }).await?;
            println!(
                "Scheduled draw #{} ({}) at {} with jackpot {}",
                draw.draw_number,
                draw.id,
                draw.draw_time.to_rfc3339(),
                draw.jackpot
            );
        }
        Commands::IssueSession { wallet, ttl_hours } => {
            let sessions = HmacSessions::new(&config.session_secret);
            let expires_at = Utc::now() + Duration::hours(ttl_hours);
            println!("{}", sessions.issue(&wallet, expires_at));
        }
        Commands::Simulate {
            spins,
            seed,
            client_seed,
            stake,
        } => simulate(spins, &seed, &client_seed, stake),
    }

    Ok(())
}
