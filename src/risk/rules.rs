use alloy::primitives::U256;
use bigdecimal::{BigDecimal, Zero};

use crate::tokens::format::{to_base_units, u256_to_bd};
use crate::tokens::registry::AssetMeta;

/// `borrows / supply * 100`, zero when nothing is supplied.
pub fn utilization(total_supply: &BigDecimal, total_borrows: &BigDecimal) -> BigDecimal {
    if *total_supply <= BigDecimal::zero() {
        return BigDecimal::zero();
    }
    total_borrows / total_supply * BigDecimal::from(100)
}

/// Share of the reserve's total supply moved by one event, in percent.
/// Zero unless both the supply and the amount are positive.
pub fn event_impact_percentage(amount: &BigDecimal, total_supply: &BigDecimal) -> BigDecimal {
    if *total_supply <= BigDecimal::zero() || *amount <= BigDecimal::zero() {
        return BigDecimal::zero();
    }
    amount / total_supply * BigDecimal::from(100)
}

/// Whether a raw amount reaches the asset's configured limit (whole tokens).
/// Assets without a limit never escalate, and neither does a zero amount.
pub fn exceeds_limit(amount: U256, meta: &AssetMeta) -> bool {
    let Some(limit) = &meta.limit else {
        return false;
    };
    if amount.is_zero() {
        return false;
    }
    let actual = to_base_units(&u256_to_bd(amount), meta.decimals);
    actual >= *limit
}
