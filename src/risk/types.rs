use alloy::primitives::Address;
use bigdecimal::BigDecimal;

use super::rules;

/// Point-in-time liquidity state of one reserve. Amounts are raw token units.
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveSnapshot {
    pub asset: Address,
    pub a_token: Address,
    pub variable_debt_token: Address,
    pub stable_debt_token: Address,
    /// aToken supply, i.e. total deposits.
    pub total_supply: BigDecimal,
    /// Variable plus stable debt token supply.
    pub total_borrows: BigDecimal,
    pub available_liquidity: BigDecimal,
    /// Percent, zero when nothing is supplied.
    pub utilization_rate: BigDecimal,
}

impl ReserveSnapshot {
    pub fn new(
        asset: Address,
        a_token: Address,
        variable_debt_token: Address,
        stable_debt_token: Address,
        total_supply: BigDecimal,
        total_borrows: BigDecimal,
    ) -> Self {
        let utilization_rate = rules::utilization(&total_supply, &total_borrows);
        let available_liquidity = &total_supply - &total_borrows;
        Self {
            asset,
            a_token,
            variable_debt_token,
            stable_debt_token,
            total_supply,
            total_borrows,
            available_liquidity,
            utilization_rate,
        }
    }
}

/// Urgency tier of a push notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Standard,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::High => "high",
        }
    }
}

/// An alert ready for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRequest {
    pub message: String,
    pub risk: RiskLevel,
    /// Ask the provider to place a voice call as well.
    pub voice: bool,
}

impl AlertRequest {
    pub fn standard(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            risk: RiskLevel::Standard,
            voice: false,
        }
    }

    pub fn high(message: impl Into<String>, voice: bool) -> Self {
        Self {
            message: message.into(),
            risk: RiskLevel::High,
            voice,
        }
    }

    /// High risk with a voice call when the amount crossed the asset limit,
    /// standard otherwise.
    pub fn escalated(message: impl Into<String>, important: bool) -> Self {
        if important {
            Self::high(message, true)
        } else {
            Self::standard(message)
        }
    }
}
