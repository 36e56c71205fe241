use crate::model::{BoosterType, FragmentType, Spin};

/// Fragments of one type needed to mint a booster.
pub const FRAGMENT_MINT_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    MarkBoosterUsed { booster_id: String },
    RecordSpin(Spin),
    CreditUser(UserCredit),
    /// Add fragments and mint boosters for every full threshold reached.
    AddFragments { fragment_type: FragmentType, quantity: i64 },
    MintBooster { booster_type: BoosterType, power_level: u32 },
    IssueLotteryTicket {
        ticket_number: String,
        lottery_draw_id: Option<String>,
    },
    BumpStats(StatsDelta),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UserCredit {
    pub chad_score: f64,
    pub yield_earned: f64,
    pub spins: i64,
    pub wins: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsDelta {
    pub total_users: i64,
    pub total_staked: f64,
    pub total_spins: i64,
    pub total_yield_paid: f64,
    pub lottery_pool: f64,
}

impl StatsDelta {
    pub fn is_empty(&self) -> bool {
        *self == StatsDelta::default()
    }
}

pub fn reconcile_fragments(quantity: i64) -> (i64, u32) {
    if quantity < FRAGMENT_MINT_THRESHOLD {
        return (quantity.max(0), 0);
    }
    let mints = quantity / FRAGMENT_MINT_THRESHOLD;
    (quantity - mints * FRAGMENT_MINT_THRESHOLD, mints as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_keeps_quantity() {
        assert_eq!(reconcile_fragments(0), (0, 0));
        assert_eq!(reconcile_fragments(4), (4, 0));
    }

    #[test]
    fn crossing_threshold_mints_once() {
        assert_eq!(reconcile_fragments(5), (0, 1));
        assert_eq!(reconcile_fragments(6), (1, 1));
    }

    #[test]
    fn backlog_mints_every_full_set() {
        assert_eq!(reconcile_fragments(11), (1, 2));
    }

    #[test]
    fn empty_stats_delta() {
        assert!(StatsDelta::default().is_empty());
        assert!(!StatsDelta { total_spins: 1, ..Default::default() }.is_empty());
    }
}
