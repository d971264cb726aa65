use alloy::primitives::{b256, Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, TransactionInput, TransactionRequest};
use alloy::sol;
use alloy::sol_types::SolCall;
use std::future::{Future, IntoFuture};
use std::time::Duration;

use crate::config::ChainConfig;

use super::types::RawLog;

sol! {
    #[sol(rpc)]
    interface IPool {
        function POOL_REVISION() external view returns (uint256);

        function getReserveData(address asset) external view returns (
            uint256 configuration,
            uint128 liquidityIndex,
            uint128 currentLiquidityRate,
            uint128 variableBorrowIndex,
            uint128 currentVariableBorrowRate,
            uint128 currentStableBorrowRate,
            uint40 lastUpdateTimestamp,
            uint16 id,
            address aTokenAddress,
            address stableDebtTokenAddress,
            address variableDebtTokenAddress,
            address interestRateStrategyAddress,
            uint128 accruedToTreasury,
            uint128 unbacked,
            uint128 isolationModeTotalDebt
        );
    }

    #[sol(rpc)]
    interface IERC20 {
        function totalSupply() external view returns (uint256);
    }
}

/// EIP-1967 implementation slot: `keccak256("eip1967.proxy.implementation") - 1`.
pub const IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// Bounded log query against the watched contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub from_block: u64,
    pub to_block: u64,
    /// Accepted topic0 values (any of).
    pub signatures: Vec<B256>,
}

/// Token contracts backing one reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveTokens {
    pub a_token: Address,
    pub stable_debt_token: Address,
    pub variable_debt_token: Address,
}

/// Result of the startup connectivity probe.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInfo {
    pub chain_id: u64,
    pub head: u64,
    pub pool_revision: U256,
}

/// Read access to the remote ledger.
///
/// Every call is a single network round trip that may fail or time out;
/// callers decide how to recover.
pub trait LedgerGateway: Send + Sync {
    fn connection_info(&self) -> impl Future<Output = eyre::Result<ConnectionInfo>> + Send;

    fn chain_head(&self) -> impl Future<Output = eyre::Result<u64>> + Send;

    fn get_logs(&self, query: &LogQuery) -> impl Future<Output = eyre::Result<Vec<RawLog>>> + Send;

    fn reserve_tokens(&self, asset: Address)
        -> impl Future<Output = eyre::Result<ReserveTokens>> + Send;

    fn total_supply(&self, token: Address) -> impl Future<Output = eyre::Result<U256>> + Send;

    /// Current logic contract behind the pool proxy.
    fn implementation_address(&self) -> impl Future<Output = eyre::Result<Address>> + Send;
}

/// JSON-RPC gateway over an alloy HTTP provider.
pub struct RpcGateway {
    provider: DynProvider,
    pool: IPool::IPoolInstance<DynProvider>,
    pool_address: Address,
    timeout: Duration,
}

impl RpcGateway {
    pub fn new(config: &ChainConfig, pool_address: Address) -> eyre::Result<Self> {
        let url: reqwest::Url = config
            .rpc_http
            .parse()
            .map_err(|e| eyre::eyre!("Invalid RPC URL: {}", e))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        let pool = IPool::new(pool_address, provider.clone());

        Ok(Self {
            provider,
            pool,
            pool_address,
            timeout: config.request_timeout(),
        })
    }

    async fn bounded<T, E, F>(&self, what: &str, fut: F) -> eyre::Result<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        with_timeout(self.timeout, what, fut).await
    }

    /// `totalSupply()` through a raw `eth_call`, decoding the first word by hand.
    async fn raw_total_supply(&self, token: Address) -> eyre::Result<U256> {
        let calldata = IERC20::totalSupplyCall {}.abi_encode();
        let tx = TransactionRequest::default()
            .to(token)
            .input(TransactionInput::new(Bytes::from(calldata)));
        let output: Bytes = self
            .bounded("eth_call totalSupply()", self.provider.call(tx))
            .await?;
        decode_uint_word(&output)
    }
}

impl LedgerGateway for RpcGateway {
    async fn connection_info(&self) -> eyre::Result<ConnectionInfo> {
        let chain_id = self
            .bounded("eth_chainId", self.provider.get_chain_id())
            .await?;
        let head = self
            .bounded("eth_blockNumber", self.provider.get_block_number())
            .await?;
        let pool_revision = self
            .bounded("POOL_REVISION()", self.pool.POOL_REVISION().call())
            .await?;
        Ok(ConnectionInfo {
            chain_id,
            head,
            pool_revision,
        })
    }

    async fn chain_head(&self) -> eyre::Result<u64> {
        self.bounded("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    async fn get_logs(&self, query: &LogQuery) -> eyre::Result<Vec<RawLog>> {
        let filter = Filter::new()
            .address(query.address)
            .event_signature(query.signatures.clone())
            .from_block(query.from_block)
            .to_block(query.to_block);

        let logs = self
            .bounded("eth_getLogs", self.provider.get_logs(&filter))
            .await?;
        Ok(logs.iter().map(RawLog::from).collect())
    }

    async fn reserve_tokens(&self, asset: Address) -> eyre::Result<ReserveTokens> {
        let data = self
            .bounded("getReserveData", self.pool.getReserveData(asset).call())
            .await?;

        if data.aTokenAddress == Address::ZERO {
            return Err(eyre::eyre!("Asset {} is not a reserve of the pool", asset));
        }

        Ok(ReserveTokens {
            a_token: data.aTokenAddress,
            stable_debt_token: data.stableDebtTokenAddress,
            variable_debt_token: data.variableDebtTokenAddress,
        })
    }

    async fn total_supply(&self, token: Address) -> eyre::Result<U256> {
        let erc20 = IERC20::new(token, self.provider.clone());
        match self.bounded("totalSupply()", erc20.totalSupply().call()).await {
            Ok(supply) => Ok(supply),
            Err(e) => {
                tracing::debug!(
                    token = %token,
                    error = %e,
                    "Structured totalSupply call failed, retrying as raw call"
                );
                self.raw_total_supply(token).await
            }
        }
    }

    async fn implementation_address(&self) -> eyre::Result<Address> {
        let slot = U256::from_be_bytes(IMPLEMENTATION_SLOT.0);
        let word = self
            .bounded(
                "eth_getStorageAt",
                self.provider.get_storage_at(self.pool_address, slot),
            )
            .await?;
        Ok(Address::from_word(B256::from(word.to_be_bytes::<32>())))
    }
}

/// Run one RPC call under `timeout`, folding both failure modes into eyre.
async fn with_timeout<T, E, F>(timeout: Duration, what: &str, fut: F) -> eyre::Result<T>
where
    F: IntoFuture<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(eyre::eyre!("{} failed: {}", what, e)),
        Err(_) => Err(eyre::eyre!(
            "{} timed out after {}s",
            what,
            timeout.as_secs()
        )),
    }
}

fn decode_uint_word(output: &[u8]) -> eyre::Result<U256> {
    if output.len() < 32 {
        return Err(eyre::eyre!(
            "Expected a 32-byte return value, got {} bytes",
            output.len()
        ));
    }
    Ok(U256::from_be_slice(&output[..32]))
}

/// Retry an async operation with exponential backoff.
/// Used where a failure would otherwise be fatal, such as the startup probe.
pub async fn retry_rpc<F, Fut, T>(mut f: F, max_retries: u32) -> eyre::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = eyre::Result<T>>,
{
    let mut delay = Duration::from_millis(500);

    for attempt in 0..max_retries {
        match f().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "RPC call failed, retrying..."
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(30));
            }
        }
    }

    // Final attempt, propagating its error
    f().await
        .map_err(|e| eyre::eyre!("RPC call failed after {} retries: {}", max_retries, e))
}
