use serde::Serialize;

use crate::rng::RandomSource;

/// Ticket price in $CHAD.
pub const TICKET_PRICE: f64 = 10.0;
pub const TICKET_NUMBERS: usize = 6;
pub const TICKET_MAX_NUMBER: u32 = 60;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrizeDistribution {
    pub match6: &'static str,
    pub match5: &'static str,
    pub match4: &'static str,
    pub match3: &'static str,
}

pub const PRIZE_DISTRIBUTION: PrizeDistribution = PrizeDistribution {
    match6: "50% of pool",
    match5: "25% of pool",
    match4: "15% of pool",
    match3: "10% of pool",
};

pub(crate) fn pick_index(rng: &dyn RandomSource, len: usize) -> usize {
    ((rng.next_f64() * len as f64) as usize).min(len - 1)
}

/// Six distinct numbers in `1..=60`, ascending, joined with `-`.
pub fn draw_ticket_number(rng: &dyn RandomSource) -> String {
    let mut pool: Vec<u32> = (1..=TICKET_MAX_NUMBER).collect();
    let mut picked = Vec::with_capacity(TICKET_NUMBERS);
    for _ in 0..TICKET_NUMBERS {
        let idx = pick_index(rng, pool.len());
        picked.push(pool.remove(idx));
    }
    picked.sort_unstable();
    picked
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn ticket_cost(quantity: u32) -> f64 {
    f64::from(quantity) * TICKET_PRICE
}
