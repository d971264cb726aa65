use alloy::primitives::Address;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::indexer::cursor::BlockCursor;
use crate::indexer::decoder;
use crate::indexer::gateway::{LedgerGateway, LogQuery};
use crate::indexer::types::{DecodedEvent, EventKind};

/// Downstream consumer of decoded events.
///
/// Handling is infallible from the poller's point of view: anything that
/// goes wrong while evaluating an event is absorbed by the handler.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: DecodedEvent) -> impl Future<Output = ()> + Send;
}

/// Timing and sizing of the block scan.
#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub max_block_range: u64,
}

impl PollSchedule {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
            max_block_range: config.max_block_range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No new blocks since the watermark.
    Idle { head: u64 },
    Scanned {
        from_block: u64,
        to_block: u64,
        events: usize,
    },
}

/// Drives bounded-window log scans and owns the block watermark.
pub struct EventPoller<G, H> {
    gateway: Arc<G>,
    handler: H,
    pool_address: Address,
    schedule: PollSchedule,
    cursor: BlockCursor,
}

impl<G: LedgerGateway, H: EventHandler> EventPoller<G, H> {
    pub fn new(
        gateway: Arc<G>,
        handler: H,
        pool_address: Address,
        schedule: PollSchedule,
        start_block: u64,
    ) -> Self {
        Self {
            gateway,
            handler,
            pool_address,
            schedule,
            cursor: BlockCursor::new(start_block),
        }
    }

    pub fn cursor(&self) -> &BlockCursor {
        &self.cursor
    }

    /// One scan cycle: read the head, fetch and handle every tracked kind
    /// in the next window, then advance the watermark.
    ///
    /// A kind whose fetch fails does not stop the other kinds. The cycle as
    /// a whole then fails and the window stays open for the retry.
    pub async fn poll_once(&mut self) -> eyre::Result<ScanOutcome> {
        let head = self.gateway.chain_head().await?;

        let Some((from_block, to_block)) =
            self.cursor.next_window(head, self.schedule.max_block_range)
        else {
            return Ok(ScanOutcome::Idle { head });
        };

        tracing::debug!(from = from_block, to = to_block, head, "Scanning block range");

        let mut events = 0usize;
        let mut failed: Vec<EventKind> = Vec::new();

        for kind in EventKind::ALL {
            if self.cursor.is_completed(kind) {
                continue;
            }

            let query = LogQuery {
                address: self.pool_address,
                from_block,
                to_block,
                signatures: decoder::signatures_for(kind),
            };

            let logs = match self.gateway.get_logs(&query).await {
                Ok(logs) => logs,
                Err(e) => {
                    tracing::error!(
                        kind = %kind,
                        from = from_block,
                        to = to_block,
                        error = %e,
                        "Failed to fetch event logs"
                    );
                    failed.push(kind);
                    continue;
                }
            };

            for raw in &logs {
                if let Some(event) = decoder::decode(raw) {
                    self.handler.handle(event).await;
                    events += 1;
                }
            }
            self.cursor.mark_completed(kind);
        }

        if !failed.is_empty() {
            return Err(eyre::eyre!(
                "Log fetch failed for {:?} in blocks {}-{}",
                failed,
                from_block,
                to_block
            ));
        }

        self.cursor.advance();

        tracing::info!(
            from = from_block,
            to = to_block,
            events,
            "Processed block range"
        );

        Ok(ScanOutcome::Scanned {
            from_block,
            to_block,
            events,
        })
    }

    /// Poll until shutdown. Errors keep the watermark in place and back off.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(
            start_block = self.cursor.last_checked_block(),
            poll_interval_secs = self.schedule.poll_interval.as_secs(),
            "Event poller started"
        );

        loop {
            let delay = match self.poll_once().await {
                Ok(_) => self.schedule.poll_interval,
                Err(e) => {
                    tracing::error!(
                        last_checked_block = self.cursor.last_checked_block(),
                        error = %e,
                        "Block scan failed, backing off"
                    );
                    self.schedule.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown received, stopping event poller");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::indexer::decoder::tests::raw_from;
    use crate::indexer::decoder::{Borrow, Supply};
    use crate::testutil::MockGateway;
    use alloy::primitives::U256;
    use alloy::sol_types::SolEvent;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingHandler {
        pub events: Mutex<Vec<DecodedEvent>>,
    }

    impl EventHandler for Arc<RecordingHandler> {
        async fn handle(&self, event: DecodedEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn schedule() -> PollSchedule {
        PollSchedule {
            poll_interval: Duration::from_secs(15),
            error_backoff: Duration::from_secs(30),
            max_block_range: 1000,
        }
    }

    fn supply_log(block: u64) -> crate::indexer::types::RawLog {
        raw_from(
            Supply {
                reserve: Address::repeat_byte(1),
                user: Address::repeat_byte(2),
                onBehalfOf: Address::repeat_byte(2),
                amount: U256::from(block),
                referralCode: 0,
            }
            .encode_log_data(),
            block,
        )
    }

    fn borrow_log(block: u64) -> crate::indexer::types::RawLog {
        raw_from(
            Borrow {
                reserve: Address::repeat_byte(1),
                user: Address::repeat_byte(2),
                onBehalfOf: Address::repeat_byte(2),
                amount: U256::from(block),
                interestRateMode: 2,
                borrowRate: U256::ZERO,
                referralCode: 0,
            }
            .encode_log_data(),
            block,
        )
    }

    fn poller(
        gateway: Arc<MockGateway>,
        start: u64,
    ) -> (EventPoller<MockGateway, Arc<RecordingHandler>>, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::default());
        let poller = EventPoller::new(
            gateway,
            handler.clone(),
            Address::repeat_byte(0xaa),
            schedule(),
            start,
        );
        (poller, handler)
    }

    #[tokio::test]
    async fn test_idle_when_no_new_blocks() {
        let gateway = Arc::new(MockGateway::new(100));
        let (mut poller, _) = poller(gateway.clone(), 100);
        assert_eq!(poller.poll_once().await.unwrap(), ScanOutcome::Idle { head: 100 });
        assert!(gateway.log_queries().is_empty());
    }

    #[tokio::test]
    async fn test_scan_advances_and_caps_window() {
        let gateway = Arc::new(MockGateway::new(5000));
        gateway.add_log(supply_log(150));
        gateway.add_log(supply_log(1500));
        let (mut poller, handler) = poller(gateway.clone(), 100);

        let outcome = poller.poll_once().await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Scanned {
                from_block: 101,
                to_block: 1100,
                events: 1
            }
        );
        assert_eq!(poller.cursor().last_checked_block(), 1100);
        assert_eq!(gateway.log_queries().len(), EventKind::ALL.len());
        assert!(gateway
            .log_queries()
            .iter()
            .all(|q| q.from_block == 101 && q.to_block == 1100));

        poller.poll_once().await.unwrap();
        assert_eq!(poller.cursor().last_checked_block(), 2100);
        let seen: Vec<u64> = handler
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.block_number)
            .collect();
        assert_eq!(seen, vec![150, 1500]);
    }

    #[tokio::test]
    async fn test_head_failure_does_not_advance() {
        let gateway = Arc::new(MockGateway::new(200));
        gateway.fail_head(true);
        let (mut poller, _) = poller(gateway, 100);
        assert!(poller.poll_once().await.is_err());
        assert_eq!(poller.cursor().last_checked_block(), 100);
    }

    #[tokio::test]
    async fn test_partial_failure_retries_only_failed_kind() {
        let gateway = Arc::new(MockGateway::new(200));
        gateway.add_log(supply_log(120));
        gateway.add_log(borrow_log(130));
        gateway.fail_logs_for(Borrow::SIGNATURE_HASH, 1);
        let (mut poller, handler) = poller(gateway.clone(), 100);

        // First cycle: Supply is delivered, Borrow fails, cursor holds
        assert!(poller.poll_once().await.is_err());
        assert_eq!(poller.cursor().last_checked_block(), 100);
        assert_eq!(handler.events.lock().unwrap().len(), 1);

        // Head moves, but the retry stays on the frozen window
        gateway.set_head(900);
        let outcome = poller.poll_once().await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Scanned {
                from_block: 101,
                to_block: 200,
                events: 1
            }
        );
        assert_eq!(poller.cursor().last_checked_block(), 200);

        let kinds: Vec<EventKind> = handler
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![EventKind::Supply, EventKind::Borrow]);

        // Six kinds in the first cycle, only Borrow in the retry
        assert_eq!(gateway.log_queries().len(), EventKind::ALL.len() + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_backs_off_then_recovers() {
        let gateway = Arc::new(MockGateway::new(200));
        gateway.add_log(supply_log(150));
        gateway.fail_logs_for(Supply::SIGNATURE_HASH, 1);
        let (poller, handler) = poller(gateway.clone(), 100);

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(poller.run(shutdown.clone()));

        // First attempt fails immediately; the retry waits for the 30s backoff
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(handler.events.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handler.events.lock().unwrap().len(), 1);

        shutdown.cancel();
        task.await.unwrap();
    }
}
