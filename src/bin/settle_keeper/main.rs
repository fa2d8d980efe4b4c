//! Perps order settlement keeper.
//!
//! This binary watches committed async orders of perps accounts and settles
//! them once their settlement window opens.

mod config;
mod error;
mod keeper;

use alloy::{network::EthereumWallet, signers::local::PrivateKeySigner};
use clap::Parser;
use snx_sdk::{Chain, price::Hermes};
use std::process::exit;
use tracing::error;
use url::Url;

use config::{CliConfig, EnvConfig};
use keeper::SettleKeeper;

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    // Parse environment configuration
    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    let chain = match Chain::from_env() {
        Ok(chain) => chain,
        Err(e) => {
            eprintln!("Failed to parse deployment configuration: {}", e);
            exit(1);
        }
    };

    // Parse CLI arguments
    let cli_config = CliConfig::parse();

    let keeper_config = match cli_config.to_keeper_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            exit(1);
        }
    };

    // Set up logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse private key
    let private_key: PrivateKeySigner = match env_config.private_key.parse() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Invalid private key: {}", e);
            exit(1);
        }
    };

    let wallet = EthereumWallet::new(private_key);

    // Parse RPC URL
    let node_url = match Url::parse(&env_config.node_rpc_url) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid RPC URL: {}", e);
            exit(1);
        }
    };

    let hermes = match env_config.hermes_url() {
        Ok(Some(url)) => Hermes::new(url),
        Ok(None) => Hermes::default(),
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            exit(1);
        }
    };

    let keeper = SettleKeeper::new(node_url, wallet, chain, hermes, keeper_config);

    if let Err(e) = keeper.run().await {
        error!(%e, "Settlement keeper encountered an error, shutting down");
        exit(1);
    }
}
