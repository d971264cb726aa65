use alloy::primitives::Address;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::config::AssetConfig;

/// Static metadata for a tracked reserve asset.
#[derive(Debug, Clone)]
pub struct AssetMeta {
    pub symbol: String,
    pub decimals: u8,
    /// Escalation threshold in whole tokens.
    pub limit: Option<BigDecimal>,
}

/// Immutable lookup table of tracked assets, built once at startup.
///
/// Keys are parsed addresses, so lookups are insensitive to the hex casing
/// used in config or emitted by the node.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    assets: HashMap<Address, AssetMeta>,
}

impl AssetRegistry {
    pub fn from_config(assets: &[AssetConfig]) -> Self {
        let mut map = HashMap::new();
        for asset in assets {
            match Address::from_str(&asset.address) {
                Ok(address) => {
                    let limit = asset.limit.and_then(decimal_from_f64);
                    map.insert(
                        address,
                        AssetMeta {
                            symbol: asset.symbol.clone(),
                            decimals: asset.decimals,
                            limit,
                        },
                    );
                }
                Err(e) => {
                    tracing::error!(
                        symbol = %asset.symbol,
                        address = %asset.address,
                        error = %e,
                        "Invalid asset address in config, skipping"
                    );
                }
            }
        }
        Self { assets: map }
    }

    pub fn get(&self, address: &Address) -> Option<&AssetMeta> {
        self.assets.get(address)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.assets.values().map(|a| a.symbol.as_str()).collect()
    }

    /// Symbol for a known asset, otherwise a shortened address (`0x1234...abcd`).
    pub fn label(&self, address: &Address) -> String {
        match self.assets.get(address) {
            Some(meta) => meta.symbol.clone(),
            None => {
                let full = address.to_checksum(None);
                format!("{}...{}", &full[..6], &full[full.len() - 4..])
            }
        }
    }
}

/// Convert a config float to a decimal through its shortest textual form,
/// so `0.5` becomes exactly `0.5` rather than its binary expansion.
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usdc() -> AssetConfig {
        AssetConfig {
            symbol: "USDC".to_string(),
            address: "0x3894085ef7ff0f0aedf52e2a2704928d1ec074f1".to_string(),
            decimals: 6,
            limit: Some(50000.0),
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = AssetRegistry::from_config(&[usdc()]);
        let upper = Address::from_str("0x3894085EF7FF0F0AEDF52E2A2704928D1EC074F1").unwrap();
        let meta = registry.get(&upper).unwrap();
        assert_eq!(meta.symbol, "USDC");
        assert_eq!(meta.decimals, 6);
        assert_eq!(meta.limit, Some(BigDecimal::from(50000)));
    }

    #[test]
    fn test_invalid_address_skipped() {
        let mut bad = usdc();
        bad.address = "0xnope".to_string();
        let registry = AssetRegistry::from_config(&[bad]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_label_unknown_asset_is_shortened() {
        let registry = AssetRegistry::default();
        let address = Address::from_str("0x0555e30da8f98308edb960aa94c0db47230d2b9c").unwrap();
        let label = registry.label(&address);
        assert!(label.starts_with("0x0555"));
        assert!(label.to_lowercase().ends_with("...2b9c"));
        assert_eq!(label.len(), 13);
    }

    #[test]
    fn test_fractional_limit_is_exact() {
        assert_eq!(decimal_from_f64(0.5), Some(BigDecimal::from_str("0.5").unwrap()));
        assert_eq!(decimal_from_f64(f64::NAN), None);
    }
}
