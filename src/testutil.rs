//! In-memory stand-ins for the ledger and the push provider.

use alloy::primitives::{keccak256, Address, B256, U256};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::indexer::gateway::{ConnectionInfo, LedgerGateway, LogQuery, ReserveTokens};
use crate::indexer::types::RawLog;
use crate::notify::AlertSink;
use crate::risk::types::AlertRequest;

#[derive(Default)]
struct Ledger {
    head: u64,
    fail_head: bool,
    connection_failures: u32,
    logs: Vec<RawLog>,
    log_failures: HashMap<B256, u32>,
    log_queries: Vec<LogQuery>,
    reserves: HashMap<Address, ReserveTokens>,
    supplies: HashMap<Address, U256>,
    failing_supplies: HashSet<Address>,
    implementation: Option<Address>,
    implementation_reads: u32,
}

pub(crate) struct MockGateway {
    ledger: Mutex<Ledger>,
}

fn derived(asset: Address, tag: &str) -> Address {
    let mut seed = asset.to_vec();
    seed.extend_from_slice(tag.as_bytes());
    Address::from_word(keccak256(seed))
}

impl MockGateway {
    pub(crate) fn new(head: u64) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                head,
                ..Ledger::default()
            }),
        }
    }

    pub(crate) fn set_head(&self, head: u64) {
        self.ledger.lock().unwrap().head = head;
    }

    pub(crate) fn fail_head(&self, fail: bool) {
        self.ledger.lock().unwrap().fail_head = fail;
    }

    pub(crate) fn fail_connection(&self, times: u32) {
        self.ledger.lock().unwrap().connection_failures = times;
    }

    pub(crate) fn add_log(&self, log: RawLog) {
        self.ledger.lock().unwrap().logs.push(log);
    }

    /// Fail the next `times` queries that include `signature`.
    pub(crate) fn fail_logs_for(&self, signature: B256, times: u32) {
        self.ledger
            .lock()
            .unwrap()
            .log_failures
            .insert(signature, times);
    }

    pub(crate) fn log_queries(&self) -> Vec<LogQuery> {
        self.ledger.lock().unwrap().log_queries.clone()
    }

    /// Register a reserve with token supplies in raw units.
    pub(crate) fn add_reserve(
        &self,
        asset: Address,
        supply: u64,
        variable_debt: u64,
        stable_debt: u64,
    ) -> ReserveTokens {
        let tokens = ReserveTokens {
            a_token: derived(asset, "a"),
            variable_debt_token: derived(asset, "variable"),
            stable_debt_token: derived(asset, "stable"),
        };
        let mut ledger = self.ledger.lock().unwrap();
        ledger.reserves.insert(asset, tokens);
        ledger.supplies.insert(tokens.a_token, U256::from(supply));
        ledger
            .supplies
            .insert(tokens.variable_debt_token, U256::from(variable_debt));
        ledger
            .supplies
            .insert(tokens.stable_debt_token, U256::from(stable_debt));
        tokens
    }

    pub(crate) fn fail_supply_of(&self, token: Address) {
        self.ledger.lock().unwrap().failing_supplies.insert(token);
    }

    /// `None` makes implementation reads fail.
    pub(crate) fn set_implementation(&self, implementation: Option<Address>) {
        self.ledger.lock().unwrap().implementation = implementation;
    }

    pub(crate) fn implementation_reads(&self) -> u32 {
        self.ledger.lock().unwrap().implementation_reads
    }
}

impl LedgerGateway for MockGateway {
    async fn connection_info(&self) -> eyre::Result<ConnectionInfo> {
        let mut ledger = self.ledger.lock().unwrap();
        if ledger.connection_failures > 0 {
            ledger.connection_failures -= 1;
            return Err(eyre::eyre!("connection refused"));
        }
        Ok(ConnectionInfo {
            chain_id: 1329,
            head: ledger.head,
            pool_revision: U256::from(3u64),
        })
    }

    async fn chain_head(&self) -> eyre::Result<u64> {
        let ledger = self.ledger.lock().unwrap();
        if ledger.fail_head {
            return Err(eyre::eyre!("eth_blockNumber timed out"));
        }
        Ok(ledger.head)
    }

    async fn get_logs(&self, query: &LogQuery) -> eyre::Result<Vec<RawLog>> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.log_queries.push(query.clone());

        for signature in &query.signatures {
            if let Some(remaining) = ledger.log_failures.get_mut(signature) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(eyre::eyre!("eth_getLogs rate limited"));
                }
            }
        }

        Ok(ledger
            .logs
            .iter()
            .filter(|log| {
                log.address == query.address
                    && (query.from_block..=query.to_block).contains(&log.block_number)
                    && log
                        .topics
                        .first()
                        .is_some_and(|topic| query.signatures.contains(topic))
            })
            .cloned()
            .collect())
    }

    async fn reserve_tokens(&self, asset: Address) -> eyre::Result<ReserveTokens> {
        self.ledger
            .lock()
            .unwrap()
            .reserves
            .get(&asset)
            .copied()
            .ok_or_else(|| eyre::eyre!("Asset {} is not a reserve of the pool", asset))
    }

    async fn total_supply(&self, token: Address) -> eyre::Result<U256> {
        let ledger = self.ledger.lock().unwrap();
        if ledger.failing_supplies.contains(&token) {
            return Err(eyre::eyre!("totalSupply() reverted"));
        }
        ledger
            .supplies
            .get(&token)
            .copied()
            .ok_or_else(|| eyre::eyre!("No contract at {}", token))
    }

    async fn implementation_address(&self) -> eyre::Result<Address> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.implementation_reads += 1;
        ledger
            .implementation
            .ok_or_else(|| eyre::eyre!("eth_getStorageAt failed"))
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    alerts: Mutex<Vec<AlertRequest>>,
    heartbeats: Mutex<Vec<String>>,
    disabled: bool,
}

impl RecordingSink {
    /// A sink with no push channel: it records but reports nothing delivered.
    pub(crate) fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub(crate) fn alerts(&self) -> Vec<AlertRequest> {
        self.alerts.lock().unwrap().clone()
    }

    pub(crate) fn heartbeats(&self) -> Vec<String> {
        self.heartbeats.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingSink {
    async fn deliver(&self, alert: &AlertRequest) -> bool {
        self.alerts.lock().unwrap().push(alert.clone());
        !self.disabled
    }

    async fn heartbeat(&self, message: &str) -> bool {
        self.heartbeats.lock().unwrap().push(message.to_string());
        !self.disabled
    }

    fn is_enabled(&self) -> bool {
        !self.disabled
    }
}
