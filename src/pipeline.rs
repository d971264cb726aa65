use chrono::Local;
use std::sync::Arc;

use crate::indexer::chain::EventHandler;
use crate::indexer::gateway::LedgerGateway;
use crate::indexer::types::DecodedEvent;
use crate::message;
use crate::notify::AlertSink;
use crate::risk::engine::LiquidityRiskEvaluator;
use crate::risk::snapshot::{self, SnapshotSet};

/// Result of running one event through the pipeline.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EventOutcome {
    pub snapshots: usize,
    pub alerts_delivered: usize,
    pub alerts_failed: usize,
    /// Alerts only written to the log because push delivery is disabled.
    pub alerts_logged: usize,
}

/// Per-event processing:
/// 1. Fresh reserve snapshots for the assets the event touches
/// 2. Human-readable description
/// 3. Risk evaluation
/// 4. Alert delivery, in evaluation order
pub struct EventPipeline<G, S> {
    gateway: Arc<G>,
    sink: Arc<S>,
    evaluator: LiquidityRiskEvaluator,
}

impl<G: LedgerGateway, S: AlertSink> EventPipeline<G, S> {
    pub fn new(gateway: Arc<G>, sink: Arc<S>, evaluator: LiquidityRiskEvaluator) -> Self {
        Self {
            gateway,
            sink,
            evaluator,
        }
    }

    pub async fn process(&self, event: &DecodedEvent) -> EventOutcome {
        let now = Local::now();

        tracing::info!(
            kind = %event.kind,
            block = event.block_number,
            tx = %event.transaction_hash,
            structured = event.is_structured(),
            "Processing pool event"
        );

        // Minimal events carry no asset fields to look up
        let snapshots = if event.is_structured() {
            let assets = event.asset_addresses();
            let snapshots = snapshot::fetch_snapshots(self.gateway.as_ref(), &assets).await;
            if snapshots.is_empty() && !assets.is_empty() {
                tracing::warn!(kind = %event.kind, "No liquidity data for any asset of event");
            }
            snapshots
        } else {
            SnapshotSet::new()
        };

        let description =
            message::describe_event(event, self.evaluator.registry(), &snapshots, &now);
        tracing::info!(kind = %event.kind, "Event details:\n{}", description);

        let alerts = self.evaluator.evaluate(event, &description, &snapshots, &now);

        let mut outcome = EventOutcome {
            snapshots: snapshots.len(),
            ..EventOutcome::default()
        };
        let push_enabled = self.sink.is_enabled();
        for alert in &alerts {
            if self.sink.deliver(alert).await {
                outcome.alerts_delivered += 1;
            } else if push_enabled {
                outcome.alerts_failed += 1;
            } else {
                outcome.alerts_logged += 1;
            }
        }
        outcome
    }
}

impl<G: LedgerGateway, S: AlertSink> EventHandler for EventPipeline<G, S> {
    async fn handle(&self, event: DecodedEvent) {
        let outcome = self.process(&event).await;
        if outcome.alerts_failed > 0 {
            tracing::warn!(
                kind = %event.kind,
                block = event.block_number,
                failed = outcome.alerts_failed,
                "Some alerts for event were not delivered"
            );
        } else if outcome.alerts_logged > 0 {
            tracing::debug!(
                kind = %event.kind,
                logged = outcome.alerts_logged,
                "Push disabled, alerts were only logged"
            );
        }
    }
}
