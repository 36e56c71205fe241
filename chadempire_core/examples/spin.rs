use chadempire_core::{resolve_spin, SeededRandom, SpinRequest, SpinSnapshot, User};
use chrono::Utc;

fn main() {
    // Example end-to-end spin against an in-memory snapshot
    let rng = SeededRandom::new("example-server-seed", "example-client-seed", 1);
    let now = Utc::now();
    let snapshot = SpinSnapshot {
        user: User {
            id: "user-1".into(),
            wallet_address: "example-wallet".into(),
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
        active_stake: 1_000.0,
        booster: None,
        last_daily_spin_at: None,
        next_draw_id: None,
    };
    match resolve_spin(&SpinRequest::default(), &snapshot, "spin-1".into(), now, &rng) {
        Ok(res) => println!(
            "server_seed_hash={} message={:?} mutations={}",
            rng.server_seed_hash_hex(),
            res.outcome.message,
            res.mutations.len()
        ),
        Err(e) => println!("spin rejected: {e}"),
    }
}
