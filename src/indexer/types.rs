use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::Log;

/// A log as returned by the ledger, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl From<&Log> for RawLog {
    fn from(log: &Log) -> Self {
        Self {
            address: log.inner.address,
            topics: log.inner.data.topics().to_vec(),
            data: log.inner.data.data.clone(),
            block_number: log.block_number.unwrap_or(0),
            transaction_hash: log.transaction_hash.unwrap_or_default(),
            log_index: log.log_index.unwrap_or(0),
        }
    }
}

/// The six pool event kinds the monitor tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Supply,
    Withdraw,
    Borrow,
    Repay,
    LiquidationCall,
    FlashLoan,
}

impl EventKind {
    /// Scan order within a block window.
    pub const ALL: [EventKind; 6] = [
        EventKind::Supply,
        EventKind::Withdraw,
        EventKind::Borrow,
        EventKind::Repay,
        EventKind::LiquidationCall,
        EventKind::FlashLoan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supply => "Supply",
            Self::Withdraw => "Withdraw",
            Self::Borrow => "Borrow",
            Self::Repay => "Repay",
            Self::LiquidationCall => "LiquidationCall",
            Self::FlashLoan => "FlashLoan",
        }
    }

    /// Events that move reserve funds and get a liquidity check.
    pub fn is_fund_event(&self) -> bool {
        !matches!(self, Self::FlashLoan)
    }

    /// Events that are always pushed to the user, regardless of config.
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Self::LiquidationCall | Self::FlashLoan)
    }

    pub fn direction(&self) -> ImpactDirection {
        match self {
            Self::Supply | Self::Repay => ImpactDirection::Increase,
            Self::Withdraw | Self::Borrow => ImpactDirection::Decrease,
            Self::LiquidationCall | Self::FlashLoan => ImpactDirection::Mixed,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an event moves the available liquidity of its reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactDirection {
    Increase,
    Decrease,
    Mixed,
}

impl ImpactDirection {
    pub fn sign(&self) -> &'static str {
        match self {
            Self::Increase => "+",
            Self::Decrease => "-",
            Self::Mixed => "±",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Increase => "increased",
            Self::Decrease => "decreased",
            Self::Mixed => "changed",
        }
    }
}

/// Fully decoded pool event, one variant per tracked kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    Supply {
        reserve: Address,
        user: Address,
        on_behalf_of: Address,
        amount: U256,
        referral_code: u16,
    },
    Withdraw {
        reserve: Address,
        user: Address,
        to: Address,
        amount: U256,
    },
    Borrow {
        reserve: Address,
        user: Address,
        on_behalf_of: Address,
        amount: U256,
        interest_rate_mode: u8,
        borrow_rate: U256,
        referral_code: u16,
    },
    Repay {
        reserve: Address,
        user: Address,
        repayer: Address,
        amount: U256,
        use_a_tokens: bool,
    },
    LiquidationCall {
        collateral_asset: Address,
        debt_asset: Address,
        user: Address,
        debt_to_cover: U256,
        liquidated_collateral_amount: U256,
        liquidator: Address,
        receive_a_token: bool,
    },
    FlashLoan {
        target: Address,
        initiator: Address,
        asset: Address,
        amount: U256,
        interest_rate_mode: u8,
        premium: U256,
        referral_code: u16,
    },
}

impl PoolEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Supply { .. } => EventKind::Supply,
            Self::Withdraw { .. } => EventKind::Withdraw,
            Self::Borrow { .. } => EventKind::Borrow,
            Self::Repay { .. } => EventKind::Repay,
            Self::LiquidationCall { .. } => EventKind::LiquidationCall,
            Self::FlashLoan { .. } => EventKind::FlashLoan,
        }
    }

    pub fn reserve(&self) -> Option<Address> {
        match self {
            Self::Supply { reserve, .. }
            | Self::Withdraw { reserve, .. }
            | Self::Borrow { reserve, .. }
            | Self::Repay { reserve, .. } => Some(*reserve),
            _ => None,
        }
    }

    pub fn asset(&self) -> Option<Address> {
        match self {
            Self::FlashLoan { asset, .. } => Some(*asset),
            _ => None,
        }
    }

    pub fn collateral_and_debt(&self) -> Option<(Address, Address)> {
        match self {
            Self::LiquidationCall {
                collateral_asset,
                debt_asset,
                ..
            } => Some((*collateral_asset, *debt_asset)),
            _ => None,
        }
    }

    pub fn amount(&self) -> Option<U256> {
        match self {
            Self::Supply { amount, .. }
            | Self::Withdraw { amount, .. }
            | Self::Borrow { amount, .. }
            | Self::Repay { amount, .. }
            | Self::FlashLoan { amount, .. } => Some(*amount),
            Self::LiquidationCall { .. } => None,
        }
    }

    pub fn debt_to_cover(&self) -> Option<U256> {
        match self {
            Self::LiquidationCall { debt_to_cover, .. } => Some(*debt_to_cover),
            _ => None,
        }
    }
}

/// Arguments recovered from a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventArgs {
    /// Every declared field, from a structured decode.
    Structured(PoolEvent),
    /// Signature-only match; at most the address found in the second topic.
    Minimal { address: Option<Address> },
}

/// A tracked pool event ready for risk evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub kind: EventKind,
    /// Emitting contract (the pool proxy).
    pub address: Address,
    pub args: EventArgs,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl DecodedEvent {
    pub fn is_structured(&self) -> bool {
        matches!(self.args, EventArgs::Structured(_))
    }

    pub fn pool_event(&self) -> Option<&PoolEvent> {
        match &self.args {
            EventArgs::Structured(event) => Some(event),
            EventArgs::Minimal { .. } => None,
        }
    }

    /// Reserve assets touched by the event.
    ///
    /// Precedence: `reserve`, else `asset`, else the liquidation
    /// `collateralAsset` + `debtAsset` pair. Empty for minimal events.
    pub fn asset_addresses(&self) -> Vec<Address> {
        let Some(event) = self.pool_event() else {
            return Vec::new();
        };
        event
            .reserve()
            .or_else(|| event.asset())
            .map(|a| vec![a])
            .or_else(|| {
                event.collateral_and_debt().map(|(collateral, debt)| {
                    if collateral == debt {
                        vec![collateral]
                    } else {
                        vec![collateral, debt]
                    }
                })
            })
            .unwrap_or_default()
    }

    /// Principal amount: `amount`, else `debtToCover`, else zero.
    pub fn principal_amount(&self) -> U256 {
        self.pool_event()
            .and_then(|event| event.amount().or_else(|| event.debt_to_cover()))
            .unwrap_or(U256::ZERO)
    }

    /// Asset whose limit decides voice escalation of the event notification:
    /// `reserve`, else `asset`, else `debtAsset`.
    pub fn escalation_asset(&self) -> Option<Address> {
        let event = self.pool_event()?;
        event
            .reserve()
            .or_else(|| event.asset())
            .or_else(|| event.collateral_and_debt().map(|(_, debt)| debt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn structured(event: PoolEvent) -> DecodedEvent {
        DecodedEvent {
            kind: event.kind(),
            address: addr(0xaa),
            args: EventArgs::Structured(event),
            block_number: 10,
            transaction_hash: B256::repeat_byte(0x01),
            log_index: 0,
        }
    }

    fn liquidation(collateral: Address, debt: Address) -> PoolEvent {
        PoolEvent::LiquidationCall {
            collateral_asset: collateral,
            debt_asset: debt,
            user: addr(3),
            debt_to_cover: U256::from(700u64),
            liquidated_collateral_amount: U256::from(900u64),
            liquidator: addr(4),
            receive_a_token: false,
        }
    }

    #[test]
    fn test_reserve_takes_precedence() {
        let event = structured(PoolEvent::Withdraw {
            reserve: addr(1),
            user: addr(2),
            to: addr(3),
            amount: U256::from(5u64),
        });
        assert_eq!(event.asset_addresses(), vec![addr(1)]);
        assert_eq!(event.principal_amount(), U256::from(5u64));
        assert_eq!(event.escalation_asset(), Some(addr(1)));
    }

    #[test]
    fn test_flash_loan_uses_asset() {
        let event = structured(PoolEvent::FlashLoan {
            target: addr(1),
            initiator: addr(2),
            asset: addr(9),
            amount: U256::from(42u64),
            interest_rate_mode: 0,
            premium: U256::from(1u64),
            referral_code: 0,
        });
        assert_eq!(event.asset_addresses(), vec![addr(9)]);
        assert_eq!(event.principal_amount(), U256::from(42u64));
    }

    #[test]
    fn test_liquidation_uses_pair_and_debt_to_cover() {
        let event = structured(liquidation(addr(5), addr(6)));
        assert_eq!(event.asset_addresses(), vec![addr(5), addr(6)]);
        assert_eq!(event.principal_amount(), U256::from(700u64));
        assert_eq!(event.escalation_asset(), Some(addr(6)));

        let same = structured(liquidation(addr(5), addr(5)));
        assert_eq!(same.asset_addresses(), vec![addr(5)]);
    }

    #[test]
    fn test_minimal_event_has_no_fields() {
        let event = DecodedEvent {
            kind: EventKind::Borrow,
            address: addr(0xaa),
            args: EventArgs::Minimal {
                address: Some(addr(1)),
            },
            block_number: 10,
            transaction_hash: B256::ZERO,
            log_index: 0,
        };
        assert!(!event.is_structured());
        assert!(event.asset_addresses().is_empty());
        assert_eq!(event.principal_amount(), U256::ZERO);
        assert_eq!(event.escalation_asset(), None);
    }

    #[test]
    fn test_kind_classification() {
        assert!(EventKind::Supply.is_fund_event());
        assert!(EventKind::LiquidationCall.is_fund_event());
        assert!(!EventKind::FlashLoan.is_fund_event());
        assert!(EventKind::FlashLoan.is_high_risk());
        assert!(!EventKind::Borrow.is_high_risk());
        assert_eq!(EventKind::Repay.direction(), ImpactDirection::Increase);
        assert_eq!(EventKind::Borrow.direction(), ImpactDirection::Decrease);
        assert_eq!(EventKind::LiquidationCall.direction(), ImpactDirection::Mixed);
    }
}
