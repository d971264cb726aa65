use alloy::primitives::{Address, U256};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Local};

use crate::indexer::types::{DecodedEvent, EventArgs, EventKind, ImpactDirection, PoolEvent};
use crate::risk::snapshot::SnapshotSet;
use crate::tokens::format::{
    format_amount, format_amount_with_raw, format_decimal_amount, format_interest_rate,
    format_percent,
};
use crate::tokens::registry::AssetRegistry;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn timestamp(now: &DateTime<Local>) -> String {
    now.format(TIME_FORMAT).to_string()
}

fn header(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Supply => "📥 Supply",
        EventKind::Withdraw => "📤 Withdraw",
        EventKind::Borrow => "💰 Borrow",
        EventKind::Repay => "💸 Repay",
        EventKind::LiquidationCall => "⚠️ Liquidation",
        EventKind::FlashLoan => "⚡ Flash loan",
    }
}

/// Human-readable description of a pool event.
///
/// Structured events list their parties, amounts and, where a snapshot was
/// read, the remaining liquidity of each asset. Minimal events only carry
/// their block and transaction.
pub fn describe_event(
    event: &DecodedEvent,
    registry: &AssetRegistry,
    snapshots: &SnapshotSet,
    now: &DateTime<Local>,
) -> String {
    let Some(pool_event) = event.pool_event() else {
        let mut lines = vec![format!("{} (basic info)", header(event.kind))];
        if let EventArgs::Minimal {
            address: Some(address),
        } = &event.args
        {
            lines.push(format!("Address: {}", registry.label(address)));
        }
        lines.push(format!("Block: {}", event.block_number));
        lines.push(format!("Tx: {}", event.transaction_hash));
        lines.push(format!("Time: {}", timestamp(now)));
        return lines.join("\n");
    };

    // Unregistered assets assume 18 decimals, so the raw value is shown too
    let amount = |value: U256, asset: &Address| match registry.get(asset) {
        Some(meta) => format_amount(value, Some(meta)),
        None => format_amount_with_raw(value, None),
    };
    let liquidity = |asset: &Address| liquidity_lines(asset, registry, snapshots);

    let mut lines = vec![header(event.kind).to_string()];
    match pool_event {
        PoolEvent::Supply {
            reserve,
            user,
            on_behalf_of,
            amount: value,
            ..
        } => {
            lines.push(format!("Asset: {}", registry.label(reserve)));
            lines.push(format!("User: {}", user));
            lines.push(format!("On behalf of: {}", on_behalf_of));
            lines.push(format!("Amount: {}", amount(*value, reserve)));
            lines.extend(liquidity(reserve));
        }
        PoolEvent::Withdraw {
            reserve,
            user,
            to,
            amount: value,
        } => {
            lines.push(format!("Asset: {}", registry.label(reserve)));
            lines.push(format!("User: {}", user));
            lines.push(format!("To: {}", to));
            lines.push(format!("Amount: {}", amount(*value, reserve)));
            lines.extend(liquidity(reserve));
        }
        PoolEvent::Borrow {
            reserve,
            user,
            on_behalf_of,
            amount: value,
            interest_rate_mode,
            borrow_rate,
            ..
        } => {
            lines.push(format!("Asset: {}", registry.label(reserve)));
            lines.push(format!("User: {}", user));
            lines.push(format!("On behalf of: {}", on_behalf_of));
            lines.push(format!("Amount: {}", amount(*value, reserve)));
            lines.extend(liquidity(reserve));
            lines.push(format!("Rate mode: {}", interest_rate_mode));
            lines.push(format!("Borrow rate: {}", format_interest_rate(*borrow_rate)));
        }
        PoolEvent::Repay {
            reserve,
            user,
            repayer,
            amount: value,
            use_a_tokens,
        } => {
            lines.push(format!("Asset: {}", registry.label(reserve)));
            lines.push(format!("User: {}", user));
            lines.push(format!("Repayer: {}", repayer));
            lines.push(format!("Amount: {}", amount(*value, reserve)));
            lines.extend(liquidity(reserve));
            lines.push(format!("Paid with aTokens: {}", use_a_tokens));
        }
        PoolEvent::LiquidationCall {
            collateral_asset,
            debt_asset,
            user,
            debt_to_cover,
            liquidated_collateral_amount,
            liquidator,
            ..
        } => {
            lines.push(format!("Collateral: {}", registry.label(collateral_asset)));
            lines.push(format!("Debt asset: {}", registry.label(debt_asset)));
            lines.push(format!("User: {}", user));
            lines.push(format!("Debt covered: {}", amount(*debt_to_cover, debt_asset)));
            lines.push(format!(
                "Collateral seized: {}",
                amount(*liquidated_collateral_amount, collateral_asset)
            ));
            lines.push(format!("Liquidator: {}", liquidator));
            lines.push("Collateral reserve:".to_string());
            lines.extend(liquidity(collateral_asset));
            lines.push("Debt reserve:".to_string());
            lines.extend(liquidity(debt_asset));
        }
        PoolEvent::FlashLoan {
            target,
            initiator,
            asset,
            amount: value,
            ..
        } => {
            lines.push(format!("Target: {}", target));
            lines.push(format!("Initiator: {}", initiator));
            lines.push(format!("Asset: {}", registry.label(asset)));
            lines.push(format!("Amount: {}", amount(*value, asset)));
            lines.extend(liquidity(asset));
        }
    }
    lines.push(format!("Block: {}", event.block_number));
    lines.push(format!("Time: {}", timestamp(now)));
    lines.join("\n")
}

fn liquidity_lines(asset: &Address, registry: &AssetRegistry, snapshots: &SnapshotSet) -> Vec<String> {
    match snapshots.get(asset) {
        Some(snapshot) => vec![
            format!(
                "Remaining liquidity: {}",
                format_decimal_amount(&snapshot.available_liquidity, registry.get(asset))
            ),
            format!("Utilization: {}%", format_percent(&snapshot.utilization_rate)),
        ],
        None => Vec::new(),
    }
}

/// Inputs shared by the two threshold alerts of one asset.
pub struct ImpactReport<'a> {
    pub symbol: &'a str,
    pub kind: EventKind,
    pub direction: ImpactDirection,
    pub impact: &'a BigDecimal,
    pub utilization: &'a BigDecimal,
    pub event_message: &'a str,
}

pub fn liquidity_change_alert(report: &ImpactReport<'_>, now: &DateTime<Local>) -> String {
    format!(
        "⚠️ {} liquidity {} beyond threshold\n\
         Utilization: {}%\n\
         Change: {}{}%\n\
         Event: {}\n\
         Time: {}\n\
         \n--- Triggering event ---\n{}",
        report.symbol,
        report.direction.verb(),
        format_percent(report.utilization),
        report.direction.sign(),
        format_percent(report.impact),
        report.kind,
        timestamp(now),
        report.event_message,
    )
}

pub fn utilization_alert(
    report: &ImpactReport<'_>,
    warning_threshold: &BigDecimal,
    now: &DateTime<Local>,
) -> String {
    let remaining = BigDecimal::from(100) - report.utilization;
    let mut message = format!(
        "⚠️ {} utilization above warning level\n\
         Utilization: {}%\n\
         Warning level: {}%\n\
         Remaining liquidity: {}%\n",
        report.symbol,
        format_percent(report.utilization),
        format_percent(warning_threshold),
        format_percent(&remaining),
    );
    if *report.impact > BigDecimal::from(0) {
        message.push_str(&format!(
            "Impact of this event: {}{}%\n",
            report.direction.sign(),
            format_percent(report.impact)
        ));
    }
    message.push_str(&format!(
        "Time: {}\n\n--- Triggering event ---\n{}",
        timestamp(now),
        report.event_message
    ));
    message
}

pub fn implementation_changed(previous: Address, current: Address, now: &DateTime<Local>) -> String {
    format!(
        "⚠️ Pool implementation changed\n\
         Previous: {}\n\
         Current: {}\n\
         Time: {}",
        previous,
        current,
        timestamp(now)
    )
}

pub fn state_check_failed(error: &str, now: &DateTime<Local>) -> String {
    format!(
        "State check failed\nError: {}\nTime: {}",
        error,
        timestamp(now)
    )
}

pub fn initialization_failed(chain: &str, error: &str, now: &DateTime<Local>) -> String {
    format!(
        "🚨 Monitor initialization failed\nChain: {}\nError: {}\nTime: {}",
        chain,
        error,
        timestamp(now)
    )
}

pub fn heartbeat(hour: u32, now: &DateTime<Local>) -> String {
    format!(
        "Monitor is running ({:02}:00 check-in)\nTime: {}",
        hour,
        timestamp(now)
    )
}
