//! Synthetix v3 client SDK.
//!
//! # Overview
//!
//! Encodes and decodes the protocol contract calls and keeps the oracle
//! prices they depend on fresh: before a price-dependent call the
//! [`price_update`] pipeline probes the on-chain price feeds, fetches signed
//! updates of the stale ones from the off-chain [`price::PriceService`] and
//! the [`multicall`] composer executes `[price update, call]` atomically
//! through the trusted multicall forwarder.
//!
//! [`Client`] bundles the deployment ([`Chain`]), a provider and a price
//! service and exposes typed reads of the core system, perps and spot
//! markets, plus the mutation workflows in [`actions`].
//!
//! See `./tests` for examples.
//!
//! # Limitations/follow-ups
//!
//! * Contract addresses are not bundled for any network, deployments have to
//!   be provided with [`Chain::custom`] or [`Chain::from_env`].
//!
//! * Only the Pyth ERC-7412 oracle wrapper is supported.
//!
//! # Testing
//!
//! [`testing`] module provides a recording price service and helpers to
//! drive the client with a mocked RPC transport.

pub mod abi;
pub mod actions;
mod client;
pub mod error;
pub mod multicall;
pub mod num;
pub mod perps;
pub mod price;
pub mod price_update;
pub mod spot;
pub mod system;
pub mod testing;
pub mod token;

use alloy::primitives::Address;
use serde::Deserialize;

pub use client::Client;
use price::PriceFeedId;

/// Environment variables prefix of [`Chain::from_env`].
pub const ENV_PREFIX: &str = "SNX_";

#[derive(Clone, Debug, Deserialize)]
/// Deployment of the protocol on a particular chain.
pub struct Chain {
    chain_id: u64,
    core_proxy: Address,
    account_proxy: Address,
    perps_market_proxy: Address,
    perps_account_proxy: Address,
    spot_market_proxy: Address,
    multicall: Address,
    pyth_wrapper: Address,
    system_token: Address,
    #[serde(default)]
    weth: Option<Address>,
    #[serde(default)]
    price_feeds: Vec<PriceFeedId>,
}

/// Addresses of the deployed protocol contracts.
#[derive(Clone, Copy, Debug, Default)]
pub struct Contracts {
    pub core_proxy: Address,
    pub account_proxy: Address,
    pub perps_market_proxy: Address,
    pub perps_account_proxy: Address,
    pub spot_market_proxy: Address,
    pub multicall: Address,
    pub pyth_wrapper: Address,
    pub system_token: Address,
    pub weth: Option<Address>,
}

impl Chain {
    pub fn custom(chain_id: u64, contracts: Contracts, price_feeds: Vec<PriceFeedId>) -> Self {
        Self {
            chain_id,
            core_proxy: contracts.core_proxy,
            account_proxy: contracts.account_proxy,
            perps_market_proxy: contracts.perps_market_proxy,
            perps_account_proxy: contracts.perps_account_proxy,
            spot_market_proxy: contracts.spot_market_proxy,
            multicall: contracts.multicall,
            pyth_wrapper: contracts.pyth_wrapper,
            system_token: contracts.system_token,
            weth: contracts.weth,
            price_feeds,
        }
    }

    /// Loads deployment from `SNX_`-prefixed environment variables,
    /// e.g. `SNX_CORE_PROXY`, `SNX_PRICE_FEEDS` as comma-separated list.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed(ENV_PREFIX).from_env()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn core_proxy(&self) -> Address {
        self.core_proxy
    }

    pub fn account_proxy(&self) -> Address {
        self.account_proxy
    }

    pub fn perps_market_proxy(&self) -> Address {
        self.perps_market_proxy
    }

    pub fn perps_account_proxy(&self) -> Address {
        self.perps_account_proxy
    }

    pub fn spot_market_proxy(&self) -> Address {
        self.spot_market_proxy
    }

    pub fn multicall(&self) -> Address {
        self.multicall
    }

    pub fn pyth_wrapper(&self) -> Address {
        self.pyth_wrapper
    }

    /// Stablecoin minted against the delegated collateral.
    pub fn system_token(&self) -> Address {
        self.system_token
    }

    pub fn weth(&self) -> Option<Address> {
        self.weth
    }

    /// All the price feeds the protocol markets depend on.
    pub fn price_feeds(&self) -> &[PriceFeedId] {
        &self.price_feeds
    }
}
