use ahash::HashMap;
use lazy_static::lazy_static;
use crate::chain::Chain;
use crate::player::PlayerId;

/// Bonus splits are rounded down to this increment.
pub const BONUS_ROUNDING_INCREMENT: u32 = 100;

lazy_static! {
    static ref CHAIN_TIER_MAP: HashMap<Chain, u8> = {
        let mut m = HashMap::default();
        m.insert(Chain::Tower, 0);
        m.insert(Chain::Luxor, 0);
        m.insert(Chain::American, 1);
        m.insert(Chain::Worldwide, 1);
        m.insert(Chain::Festival, 1);
        m.insert(Chain::Continental, 2);
        m.insert(Chain::Imperial, 2);

        m
    };
}

pub fn chain_tier(chain: Chain) -> u8 {
    CHAIN_TIER_MAP[&chain]
}

/// Stock price for a chain of the given size.
pub fn stock_price(chain: Chain, size: u16) -> u32 {
    chain_size_value(size) + chain_tier(chain) as u32 * 100
}

pub fn majority_bonus(chain: Chain, size: u16) -> u32 {
    stock_price(chain, size) * 10
}

pub fn minority_bonus(chain: Chain, size: u16) -> u32 {
    stock_price(chain, size) * 5
}

fn chain_size_value(chain_size: u16) -> u32 {
    match chain_size {
        ..=1 => 0,
        2..=5 => chain_size as u32 * 100,
        6..=10 => 600,
        11..=20 => 700,
        21..=30 => 800,
        31..=40 => 900,
        41.. => 1000,
    }
}

fn round_down_to_increment(num: u32) -> u32 {
    (num / BONUS_ROUNDING_INCREMENT) * BONUS_ROUNDING_INCREMENT
}

/// Majority/minority bonus payouts for one chain, given every player's
/// holding of it. `size` is the chain size at valuation time; during a
/// merger that is the size captured before the chain was stripped from
/// the board.
///
/// A tie for the top holding splits the combined majority+minority sum
/// evenly among the tied holders; otherwise the top holder takes the
/// majority bonus and all holders at the next-highest count split the
/// minority bonus. Splits round down to [`BONUS_ROUNDING_INCREMENT`].
pub fn bonus_payouts(
    holdings: &[(PlayerId, u8)],
    chain: Chain,
    size: u16,
) -> HashMap<PlayerId, u32> {
    let mut holders: Vec<(PlayerId, u8)> = holdings
        .iter()
        .filter(|(_, count)| *count > 0)
        .copied()
        .collect();

    let mut payouts: HashMap<PlayerId, u32> = HashMap::default();
    if holders.is_empty() {
        return payouts;
    }

    holders.sort_by(|a, b| b.1.cmp(&a.1));

    let major = majority_bonus(chain, size);
    let minor = minority_bonus(chain, size);

    let top_count = holders[0].1;
    let top_holders: Vec<PlayerId> = holders
        .iter()
        .filter(|(_, count)| *count == top_count)
        .map(|(id, _)| *id)
        .collect();

    if top_holders.len() > 1 {
        let split = round_down_to_increment((major + minor) / top_holders.len() as u32);
        for id in top_holders {
            payouts.insert(id, split);
        }
        return payouts;
    }

    payouts.insert(top_holders[0], major);

    let second_count = holders
        .iter()
        .filter(|(_, count)| *count < top_count)
        .map(|(_, count)| *count)
        .max();

    if let Some(second_count) = second_count {
        let second_holders: Vec<PlayerId> = holders
            .iter()
            .filter(|(_, count)| *count == second_count)
            .map(|(id, _)| *id)
            .collect();

        let split = round_down_to_increment(minor / second_holders.len() as u32);
        for id in second_holders {
            payouts.insert(id, split);
        }
    }

    payouts
}
