//! Configuration for the settlement keeper.
//!
//! Configuration comes from three sources:
//! - `SNX_`-prefixed environment variables: protocol deployment
//! - Environment variables (via .env file or shell): connection details, keys
//! - CLI arguments: markets and accounts to keep

use std::time::Duration;

use clap::Parser;
use snx_sdk::{perps::MarketId, system::AccountId};
use url::Url;

/// Environment configuration (connection details, credentials).
#[derive(Debug, serde::Deserialize)]
pub struct EnvConfig {
    /// Private key for signing transactions
    pub private_key: String,

    /// RPC URL for the node
    pub node_rpc_url: String,

    /// Optional price service URL (default: public Hermes endpoint)
    pub hermes_url: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Price service URL, with a trailing slash to keep the path on join.
    pub fn hermes_url(&self) -> Result<Option<Url>, ConfigError> {
        self.hermes_url
            .as_deref()
            .map(|url| {
                let url = if url.ends_with('/') {
                    url.to_string()
                } else {
                    format!("{url}/")
                };
                Url::parse(&url).map_err(|_| ConfigError::InvalidHermesUrl(url))
            })
            .transpose()
    }
}

/// CLI arguments of the keeper.
#[derive(Debug, Parser)]
#[command(name = "settle-keeper")]
#[command(about = "Settles committed perps orders once their settlement window opens")]
pub struct CliConfig {
    /// Perps market to settle orders of
    #[arg(long)]
    pub market_id: u128,

    /// Settlement strategy the orders were committed with
    #[arg(long, default_value = "0")]
    pub settlement_strategy_id: u128,

    /// Perps accounts to watch (comma-separated, e.g., "1,2,3")
    /// If not specified, watches all perps accounts of the wallet
    #[arg(long, value_delimiter = ',')]
    pub account_ids: Vec<u128>,

    /// Seconds between order checks
    #[arg(long, default_value = "5")]
    pub poll_interval: u64,

    /// Pause before reads aggregated with price updates, in milliseconds
    #[arg(long, default_value = "0")]
    pub read_delay_ms: u64,
}

/// Validated keeper parameters.
#[derive(Clone, Debug)]
pub struct KeeperConfig {
    pub market_id: MarketId,
    pub settlement_strategy_id: u128,
    pub account_ids: Vec<AccountId>,
    pub poll_interval: Duration,
    pub read_delay: Option<Duration>,
}

impl CliConfig {
    pub fn to_keeper_config(&self) -> Result<KeeperConfig, ConfigError> {
        if self.poll_interval == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(KeeperConfig {
            market_id: self.market_id,
            settlement_strategy_id: self.settlement_strategy_id,
            account_ids: self.account_ids.clone(),
            poll_interval: Duration::from_secs(self.poll_interval),
            read_delay: (self.read_delay_ms > 0).then(|| Duration::from_millis(self.read_delay_ms)),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("poll_interval cannot be zero")]
    ZeroPollInterval,

    #[error("Invalid price service URL: {0}")]
    InvalidHermesUrl(String),
}
