use alloy::primitives::Address;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::heartbeat::Heartbeat;
use crate::indexer::chain::{EventPoller, PollSchedule};
use crate::indexer::gateway::{retry_rpc, LedgerGateway};
use crate::message;
use crate::notify::AlertSink;
use crate::pipeline::EventPipeline;
use crate::risk::engine::{LiquidityRiskEvaluator, RiskThresholds};
use crate::risk::types::AlertRequest;
use crate::state::contract::ContractStateTracker;
use crate::tokens::registry::AssetRegistry;

/// Retries of the startup probe before giving up.
const STARTUP_RETRIES: u32 = 3;

/// Wires the gateway, evaluator and sink into the control loops.
pub struct Monitor<G, S> {
    config: Config,
    gateway: Arc<G>,
    sink: Arc<S>,
    registry: Arc<AssetRegistry>,
    pool_address: Address,
}

impl<G: LedgerGateway, S: AlertSink> Monitor<G, S> {
    pub fn new(config: Config, gateway: Arc<G>, sink: Arc<S>) -> eyre::Result<Self> {
        let pool_address = config.pool_address()?;
        let registry = Arc::new(AssetRegistry::from_config(&config.assets));
        tracing::info!(
            assets = registry.len(),
            symbols = ?registry.symbols(),
            "Asset registry loaded"
        );
        Ok(Self {
            config,
            gateway,
            sink,
            registry,
            pool_address,
        })
    }

    /// Probe the ledger and return the block to start scanning from.
    ///
    /// An unreachable ledger is the one fatal condition: it is reported with
    /// a single high-risk alert and returned as an error.
    pub async fn initialize(&self) -> eyre::Result<u64> {
        match retry_rpc(|| self.gateway.connection_info(), STARTUP_RETRIES).await {
            Ok(info) => {
                tracing::info!(
                    chain = %self.config.chain.name,
                    chain_id = info.chain_id,
                    head = info.head,
                    pool = %self.pool_address,
                    pool_revision = %info.pool_revision,
                    "Connected to ledger, monitoring from current head"
                );
                Ok(info.head)
            }
            Err(e) => {
                tracing::error!(chain = %self.config.chain.name, error = %e, "Initialization failed");
                let text =
                    message::initialization_failed(&self.config.chain.name, &e.to_string(), &Local::now());
                self.sink.deliver(&AlertRequest::high(text, true)).await;
                Err(e)
            }
        }
    }

    /// Run the event poller, the state tracker and the optional heartbeat
    /// until `shutdown` is cancelled.
    pub async fn run(self, start_block: u64, shutdown: CancellationToken) {
        let evaluator = LiquidityRiskEvaluator::new(
            RiskThresholds::from_config(&self.config.monitor),
            self.registry.clone(),
        );
        let pipeline = EventPipeline::new(self.gateway.clone(), self.sink.clone(), evaluator);
        let poller = EventPoller::new(
            self.gateway.clone(),
            pipeline,
            self.pool_address,
            PollSchedule::from_config(&self.config.monitor),
            start_block,
        );

        let tracker = ContractStateTracker::new(
            self.gateway.clone(),
            self.sink.clone(),
            Duration::from_secs(self.config.monitor.check_interval_secs),
        );

        let heartbeat = self
            .config
            .heartbeat
            .enabled
            .then(|| Heartbeat::new(&self.config.heartbeat, self.sink.clone()));
        let heartbeat_loop = {
            let shutdown = shutdown.clone();
            async move {
                if let Some(heartbeat) = heartbeat {
                    heartbeat.run(shutdown).await;
                }
            }
        };

        tokio::join!(
            poller.run(shutdown.clone()),
            tracker.run(shutdown.clone()),
            heartbeat_loop
        );
        tracing::info!("All monitor loops stopped");
    }
}
