use alloy::primitives::{Address, U256};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Local};
use std::sync::Arc;

use crate::config::MonitorConfig;
use crate::indexer::types::DecodedEvent;
use crate::message::{self, ImpactReport};
use crate::tokens::format::{format_percent, u256_to_bd};
use crate::tokens::registry::{decimal_from_f64, AssetRegistry};

use super::rules;
use super::snapshot::SnapshotSet;
use super::types::AlertRequest;

/// Alerting knobs in decimal form.
#[derive(Debug, Clone)]
pub struct RiskThresholds {
    /// Percent of total supply.
    pub liquidity_change: BigDecimal,
    /// Percent utilization.
    pub utilization_warning: BigDecimal,
    pub notify_all_events: bool,
}

impl RiskThresholds {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            liquidity_change: decimal_from_f64(config.liquidity_change_threshold)
                .unwrap_or_default(),
            utilization_warning: decimal_from_f64(config.asset_utilization_warning_threshold)
                .unwrap_or_default(),
            notify_all_events: config.notify_all_events,
        }
    }
}

/// Turns a decoded event plus fresh reserve snapshots into alerts.
pub struct LiquidityRiskEvaluator {
    thresholds: RiskThresholds,
    registry: Arc<AssetRegistry>,
}

impl LiquidityRiskEvaluator {
    pub fn new(thresholds: RiskThresholds, registry: Arc<AssetRegistry>) -> Self {
        Self {
            thresholds,
            registry,
        }
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// All alerts for one event, in delivery order: threshold alerts per
    /// asset first, then the general event notification.
    pub fn evaluate(
        &self,
        event: &DecodedEvent,
        event_message: &str,
        snapshots: &SnapshotSet,
        now: &DateTime<Local>,
    ) -> Vec<AlertRequest> {
        let mut alerts = Vec::new();

        if event.kind.is_fund_event() && event.is_structured() && !snapshots.is_empty() {
            alerts.extend(self.liquidity_alerts(event, event_message, snapshots, now));
        }

        if let Some(alert) = self.notification(event, event_message) {
            alerts.push(alert);
        }
        alerts
    }

    /// Liquidity-change alert per asset whose impact reaches the change
    /// threshold, each followed by a utilization warning when the asset is
    /// also above the warning level. Utilization is never checked on its own.
    pub fn liquidity_alerts(
        &self,
        event: &DecodedEvent,
        event_message: &str,
        snapshots: &SnapshotSet,
        now: &DateTime<Local>,
    ) -> Vec<AlertRequest> {
        let assets = event.asset_addresses();
        if assets.is_empty() {
            tracing::warn!(kind = %event.kind, "No asset addresses on event");
            return Vec::new();
        }

        let amount = event.principal_amount();
        let raw_amount = u256_to_bd(amount);
        let direction = event.kind.direction();
        let mut alerts = Vec::new();

        for asset in assets {
            let symbol = self.registry.label(&asset);
            let Some(snapshot) = snapshots.get(&asset) else {
                tracing::warn!(asset = %symbol, "No liquidity data for asset");
                continue;
            };

            let impact = rules::event_impact_percentage(&raw_amount, &snapshot.total_supply);
            tracing::info!(
                kind = %event.kind,
                asset = %symbol,
                direction = direction.verb(),
                impact = %format_percent(&impact),
                "Event liquidity impact"
            );

            if impact < self.thresholds.liquidity_change {
                tracing::info!(
                    asset = %symbol,
                    impact = %format_percent(&impact),
                    threshold = %format_percent(&self.thresholds.liquidity_change),
                    "Liquidity change below threshold, skipping utilization check"
                );
                continue;
            }

            let important = self.is_important(amount, asset);
            let report = ImpactReport {
                symbol: &symbol,
                kind: event.kind,
                direction,
                impact: &impact,
                utilization: &snapshot.utilization_rate,
                event_message,
            };

            tracing::warn!(
                asset = %symbol,
                kind = %event.kind,
                impact = %format_percent(&impact),
                utilization = %format_percent(&snapshot.utilization_rate),
                important,
                "Liquidity change above threshold"
            );
            alerts.push(AlertRequest::escalated(
                message::liquidity_change_alert(&report, now),
                important,
            ));

            if snapshot.utilization_rate >= self.thresholds.utilization_warning {
                tracing::warn!(
                    asset = %symbol,
                    utilization = %format_percent(&snapshot.utilization_rate),
                    "Asset utilization above warning level"
                );
                alerts.push(AlertRequest::escalated(
                    message::utilization_alert(&report, &self.thresholds.utilization_warning, now),
                    important,
                ));
            }
        }
        alerts
    }

    /// The general event notification, sent for every kind when configured
    /// to, and always for high-risk kinds.
    pub fn notification(&self, event: &DecodedEvent, event_message: &str) -> Option<AlertRequest> {
        let high_risk = event.kind.is_high_risk();
        if !(self.thresholds.notify_all_events || high_risk) {
            return None;
        }

        let reason = if high_risk { "high-risk event" } else { "notify all events" };
        tracing::info!(kind = %event.kind, reason, "Sending event notification");

        let important = event
            .escalation_asset()
            .is_some_and(|asset| self.is_important(event.principal_amount(), asset));
        Some(AlertRequest::escalated(event_message, important))
    }

    fn is_important(&self, amount: U256, asset: Address) -> bool {
        let Some(meta) = self.registry.get(&asset) else {
            return false;
        };
        let important = rules::exceeds_limit(amount, meta);
        if meta.limit.is_some() && !amount.is_zero() {
            tracing::info!(
                asset = %meta.symbol,
                amount = %amount,
                important,
                "Checked amount against asset limit"
            );
        }
        important
    }
}
