use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub chain: ChainConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_http: String,
    /// Upgradeable pool proxy. Events are emitted from this address.
    pub pool_address: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    12
}

impl ChainConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================
// Monitor Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Interval between implementation address checks.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,
    /// Minimum single-event impact on total supply, in percent.
    #[serde(default = "default_liquidity_change_threshold")]
    pub liquidity_change_threshold: f64,
    /// Utilization (percent) above which a warning follows a liquidity alert.
    #[serde(default = "default_utilization_warning_threshold")]
    pub asset_utilization_warning_threshold: f64,
    #[serde(default)]
    pub notify_all_events: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            poll_interval_secs: default_poll_interval(),
            error_backoff_secs: default_error_backoff(),
            max_block_range: default_max_block_range(),
            liquidity_change_threshold: default_liquidity_change_threshold(),
            asset_utilization_warning_threshold: default_utilization_warning_threshold(),
            notify_all_events: false,
        }
    }
}

fn default_check_interval() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    15
}

fn default_error_backoff() -> u64 {
    30
}

fn default_max_block_range() -> u64 {
    1000
}

fn default_liquidity_change_threshold() -> f64 {
    5.0
}

fn default_utilization_warning_threshold() -> f64 {
    90.0
}

// ============================================================
// Notifier Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    #[serde(default = "default_notifier_server")]
    pub server: String,
    /// Device key. Without one, alerts are only written to the log.
    pub key: Option<String>,
    #[serde(default = "default_notifier_title")]
    pub title: String,
    #[serde(default = "default_notifier_group")]
    pub group: String,
    /// Budget shared by every delivery attempt of a single alert.
    #[serde(default = "default_notifier_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            server: default_notifier_server(),
            key: None,
            title: default_notifier_title(),
            group: default_notifier_group(),
            timeout_secs: default_notifier_timeout(),
        }
    }
}

fn default_notifier_server() -> String {
    "https://api.day.app".to_string()
}

fn default_notifier_title() -> String {
    "Pool Monitor".to_string()
}

fn default_notifier_group() -> String {
    "pool-monitor".to_string()
}

fn default_notifier_timeout() -> u64 {
    10
}

// ============================================================
// Heartbeat / Logging Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct HeartbeatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Local hours at which a heartbeat is sent, once per day each.
    #[serde(default = "default_heartbeat_hours")]
    pub hours: Vec<u32>,
    #[serde(default = "default_heartbeat_interval")]
    pub check_interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hours: default_heartbeat_hours(),
            check_interval_secs: default_heartbeat_interval(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_heartbeat_hours() -> Vec<u32> {
    vec![8, 12, 20]
}

fn default_heartbeat_interval() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

// ============================================================
// Asset metadata
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct AssetConfig {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
    /// Amount in whole tokens at or above which alerts escalate to voice.
    pub limit: Option<f64>,
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        Address::from_str(&self.chain.pool_address).map_err(|e| {
            eyre::eyre!(
                "Invalid pool address '{}' for chain '{}': {}",
                self.chain.pool_address,
                self.chain.name,
                e
            )
        })?;

        if self.monitor.max_block_range == 0 {
            return Err(eyre::eyre!("monitor.max_block_range must be greater than zero"));
        }
        let durations = [
            ("chain.request_timeout_secs", self.chain.request_timeout_secs),
            ("monitor.check_interval_secs", self.monitor.check_interval_secs),
            ("monitor.poll_interval_secs", self.monitor.poll_interval_secs),
            ("monitor.error_backoff_secs", self.monitor.error_backoff_secs),
            ("notifier.timeout_secs", self.notifier.timeout_secs),
            ("heartbeat.check_interval_secs", self.heartbeat.check_interval_secs),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, secs)| *secs == 0) {
            return Err(eyre::eyre!("{} must be greater than zero", name));
        }
        let thresholds = [
            self.monitor.liquidity_change_threshold,
            self.monitor.asset_utilization_warning_threshold,
        ];
        if thresholds.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(eyre::eyre!("Monitor thresholds must be finite and not negative"));
        }

        if let Some(hour) = self.heartbeat.hours.iter().find(|h| **h >= 24) {
            return Err(eyre::eyre!("Invalid heartbeat hour {}", hour));
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            let address = Address::from_str(&asset.address).map_err(|e| {
                eyre::eyre!(
                    "Invalid asset address '{}' for {}: {}",
                    asset.address,
                    asset.symbol,
                    e
                )
            })?;
            if !seen.insert(address) {
                return Err(eyre::eyre!(
                    "Asset '{}' ({}) is configured more than once",
                    asset.symbol,
                    asset.address
                ));
            }
            if matches!(asset.limit, Some(limit) if !limit.is_finite() || limit < 0.0) {
                return Err(eyre::eyre!("Asset '{}' has an invalid limit", asset.symbol));
            }
        }
        Ok(())
    }

    pub fn pool_address(&self) -> eyre::Result<Address> {
        Address::from_str(&self.chain.pool_address)
            .map_err(|e| eyre::eyre!("Invalid pool address '{}': {}", self.chain.pool_address, e))
    }
}
