use alloy::primitives::U256;
use bigdecimal::{BigDecimal, RoundingMode, Zero};
use std::str::FromStr;

use super::registry::AssetMeta;

/// Decimals assumed for assets missing from the registry.
pub const DEFAULT_DECIMALS: u8 = 18;

pub fn u256_to_bd(val: U256) -> BigDecimal {
    BigDecimal::from_str(&val.to_string()).unwrap_or_default()
}

/// Shift a raw on-chain integer amount into whole-token units. Exact.
pub fn to_base_units(raw: &BigDecimal, decimals: u8) -> BigDecimal {
    let (digits, scale) = raw.as_bigint_and_exponent();
    BigDecimal::new(digits, scale + decimals as i64)
}

fn round2(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfEven)
}

/// Two decimals always, including for zero which `BigDecimal` prints bare.
fn fixed2(value: &BigDecimal) -> String {
    let rounded = round2(value);
    if rounded.is_zero() {
        "0.00".to_string()
    } else {
        rounded.to_string()
    }
}

/// Render with a K/M/B suffix and two decimals.
pub fn format_large_number(number: &BigDecimal) -> String {
    let abs = number.abs();
    let billion = BigDecimal::from(1_000_000_000u64);
    let million = BigDecimal::from(1_000_000u64);
    let thousand = BigDecimal::from(1_000u64);

    if abs >= billion {
        format!("{}B", fixed2(&(number / &billion)))
    } else if abs >= million {
        format!("{}M", fixed2(&(number / &million)))
    } else if abs >= thousand {
        format!("{}K", fixed2(&(number / &thousand)))
    } else {
        fixed2(number)
    }
}

/// Human-readable token amount, e.g. `1.50M USDC`.
pub fn format_amount(raw: U256, meta: Option<&AssetMeta>) -> String {
    format_decimal_amount(&u256_to_bd(raw), meta)
}

pub fn format_decimal_amount(raw: &BigDecimal, meta: Option<&AssetMeta>) -> String {
    let decimals = meta.map(|m| m.decimals).unwrap_or(DEFAULT_DECIMALS);
    let result = format_large_number(&to_base_units(raw, decimals));
    match meta {
        Some(m) => format!("{} {}", result, m.symbol),
        None => result,
    }
}

pub fn format_amount_with_raw(raw: U256, meta: Option<&AssetMeta>) -> String {
    format!("{} ({} wei)", format_amount(raw, meta), raw)
}

/// Format a lending rate as a percentage.
///
/// Values above 1e20 are treated as RAY (27 decimals), anything else as WAD.
pub fn format_interest_rate(rate: U256) -> String {
    let raw = u256_to_bd(rate);
    let ray_cutoff = BigDecimal::from_str("1e20").unwrap_or_default();
    let decimals: u8 = if raw > ray_cutoff { 27 } else { 18 };
    let percent = to_base_units(&raw, decimals) * BigDecimal::from(100);

    let text = round2(&percent).to_string();
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    };
    format!("{}%", text)
}

/// Two-decimal fixed rendering used for every percentage shown to users.
pub fn format_percent(value: &BigDecimal) -> String {
    fixed2(value)
}
