use alloy::primitives::Address;
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::indexer::gateway::LedgerGateway;
use crate::message;
use crate::notify::AlertSink;
use crate::risk::types::AlertRequest;

/// Last known implementation behind the pool proxy.
#[derive(Debug, Clone)]
pub struct ContractState {
    pub current_implementation: Option<Address>,
    pub last_upgrade_time: Option<DateTime<Local>>,
    /// Set until the first successful read has been compared.
    pub is_first_run: bool,
    pub last_check_time: Option<DateTime<Local>>,
}

impl Default for ContractState {
    fn default() -> Self {
        Self {
            current_implementation: None,
            last_upgrade_time: None,
            is_first_run: true,
            last_check_time: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImplementationChange {
    pub previous: Option<Address>,
    pub current: Address,
}

impl ContractState {
    /// Record an observed implementation. Returns the change when it differs
    /// from the stored one, including the very first observation.
    pub fn update_implementation(
        &mut self,
        observed: Address,
        now: DateTime<Local>,
    ) -> Option<ImplementationChange> {
        if self.current_implementation == Some(observed) {
            return None;
        }
        let previous = self.current_implementation.replace(observed);
        self.last_upgrade_time = Some(now);
        Some(ImplementationChange {
            previous,
            current: observed,
        })
    }

    /// Close a successful check. From here on changes are reportable.
    pub fn complete_check(&mut self, now: DateTime<Local>) {
        self.is_first_run = false;
        self.last_check_time = Some(now);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCheck {
    /// First successful read, recorded without an alert.
    Baseline(Address),
    Unchanged,
    Changed(ImplementationChange),
    Failed,
}

/// Polls the proxy's implementation slot and alerts on upgrades.
pub struct ContractStateTracker<G, S> {
    gateway: Arc<G>,
    sink: Arc<S>,
    state: ContractState,
    interval: Duration,
}

impl<G: LedgerGateway, S: AlertSink> ContractStateTracker<G, S> {
    pub fn new(gateway: Arc<G>, sink: Arc<S>, interval: Duration) -> Self {
        Self {
            gateway,
            sink,
            state: ContractState::default(),
            interval,
        }
    }

    pub fn state(&self) -> &ContractState {
        &self.state
    }

    pub async fn check_state(&mut self) -> StateCheck {
        let now = Local::now();

        let observed = match self.gateway.implementation_address().await {
            Ok(address) => address,
            Err(e) => {
                tracing::error!(error = %e, "Implementation state check failed");
                self.sink
                    .deliver(&AlertRequest::standard(message::state_check_failed(
                        &e.to_string(),
                        &now,
                    )))
                    .await;
                return StateCheck::Failed;
            }
        };

        let first_run = self.state.is_first_run;
        let change = self.state.update_implementation(observed, now);
        self.state.complete_check(now);

        match change {
            Some(change) if first_run => {
                tracing::info!(implementation = %change.current, "Recorded baseline implementation");
                StateCheck::Baseline(change.current)
            }
            Some(change) => {
                tracing::warn!(
                    previous = ?change.previous,
                    current = %change.current,
                    "Pool implementation changed"
                );
                if let Some(previous) = change.previous {
                    self.sink
                        .deliver(&AlertRequest::standard(message::implementation_changed(
                            previous,
                            change.current,
                            &now,
                        )))
                        .await;
                }
                StateCheck::Changed(change)
            }
            None => {
                tracing::debug!(implementation = %observed, "Implementation unchanged");
                StateCheck::Unchanged
            }
        }
    }

    /// Check immediately, then every interval until shutdown.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Contract state tracker started"
        );

        loop {
            self.check_state().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown received, stopping contract state tracker");
                    break;
                }
            }
        }
    }
}
