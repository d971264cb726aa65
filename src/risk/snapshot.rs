use alloy::primitives::Address;
use bigdecimal::{BigDecimal, Zero};
use futures::future::join_all;
use std::collections::HashMap;

use crate::indexer::gateway::LedgerGateway;
use crate::tokens::format::u256_to_bd;

use super::types::ReserveSnapshot;

/// Snapshots of the assets touched by one event, keyed by asset address.
pub type SnapshotSet = HashMap<Address, ReserveSnapshot>;

/// Read a fresh liquidity snapshot for one reserve.
///
/// The aToken supply is required. Debt token reads that fail are logged and
/// counted as zero.
pub async fn fetch_snapshot<G: LedgerGateway>(
    gateway: &G,
    asset: Address,
) -> eyre::Result<ReserveSnapshot> {
    let tokens = gateway.reserve_tokens(asset).await?;
    let total_supply = u256_to_bd(gateway.total_supply(tokens.a_token).await?);

    let (variable, stable) = futures::join!(
        debt_supply(gateway, asset, tokens.variable_debt_token, "variable"),
        debt_supply(gateway, asset, tokens.stable_debt_token, "stable"),
    );

    Ok(ReserveSnapshot::new(
        asset,
        tokens.a_token,
        tokens.variable_debt_token,
        tokens.stable_debt_token,
        total_supply,
        variable + stable,
    ))
}

async fn debt_supply<G: LedgerGateway>(
    gateway: &G,
    asset: Address,
    token: Address,
    which: &str,
) -> BigDecimal {
    if token == Address::ZERO {
        return BigDecimal::zero();
    }
    match gateway.total_supply(token).await {
        Ok(supply) => u256_to_bd(supply),
        Err(e) => {
            tracing::warn!(
                asset = %asset,
                token = %token,
                debt = which,
                error = %e,
                "Failed to read debt token supply, counting as zero"
            );
            BigDecimal::zero()
        }
    }
}

/// Snapshot every asset concurrently, skipping the ones whose reads fail.
pub async fn fetch_snapshots<G: LedgerGateway>(gateway: &G, assets: &[Address]) -> SnapshotSet {
    let results = join_all(assets.iter().map(|asset| fetch_snapshot(gateway, *asset))).await;

    let mut snapshots = SnapshotSet::new();
    for (asset, result) in assets.iter().zip(results) {
        match result {
            Ok(snapshot) => {
                snapshots.insert(*asset, snapshot);
            }
            Err(e) => {
                tracing::error!(
                    asset = %asset,
                    error = %e,
                    "Failed to fetch reserve liquidity"
                );
            }
        }
    }
    snapshots
}
