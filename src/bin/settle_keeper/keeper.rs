//! Settlement keeper loop.
//!
//! Polls the pending orders of the watched perps accounts and settles every
//! order whose settlement window is open, bundling the strict price update
//! the settlement is verified against.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::RpcClient,
};
use snx_sdk::{
    Chain, Client,
    abi::perps::PerpsMarketProxy::{AsyncOrder, SettlementStrategy},
    perps::{self, Countdown},
    price::Hermes,
    system::AccountId,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::KeeperConfig,
    error::{Error, Result},
};

/// Settlement state of an account order at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    NoOrder,
    Pending(Countdown),
    Settleable,
    Expired,
}

/// Where the `order` committed under `strategy` stands at unix time `now`.
pub fn order_status(order: &AsyncOrder, strategy: &SettlementStrategy, now: u64) -> OrderStatus {
    if !perps::is_open_order(order) {
        return OrderStatus::NoOrder;
    }
    let commitment_time: u64 = order.commitmentTime.saturating_to();
    let delay: u64 = strategy.settlementDelay.saturating_to();
    let window: u64 = strategy.settlementWindowDuration.saturating_to();

    let countdown = perps::settlement_countdown(commitment_time, delay, now);
    if !countdown.is_elapsed() {
        return OrderStatus::Pending(countdown);
    }
    if now > commitment_time.saturating_add(delay).saturating_add(window) {
        return OrderStatus::Expired;
    }
    OrderStatus::Settleable
}

/// Perps settlement keeper.
pub struct SettleKeeper {
    client: Client<DynProvider, Hermes>,
    wallet_address: Address,
    config: KeeperConfig,
}

impl SettleKeeper {
    pub fn new(
        node_url: Url,
        wallet: EthereumWallet,
        chain: Chain,
        hermes: Hermes,
        config: KeeperConfig,
    ) -> Self {
        let wallet_address = wallet.default_signer().address();
        info!(
            %wallet_address,
            market_id = config.market_id,
            settlement_strategy_id = config.settlement_strategy_id,
            hermes = %hermes.base_url(),
            "Initializing settlement keeper"
        );

        let rpc_client = RpcClient::new_http(node_url);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_client(rpc_client)
            .erased();

        let mut client = Client::new(chain, provider, hermes);
        if let Some(delay) = config.read_delay {
            client = client.with_read_delay(delay);
        }

        Self {
            client,
            wallet_address,
            config,
        }
    }

    /// Run the keeper main loop.
    pub async fn run(&self) -> Result<()> {
        let accounts = self.accounts().await?;
        let strategy = self
            .client
            .settlement_strategy(self.config.market_id, self.config.settlement_strategy_id)
            .await?;
        info!(?accounts, feed_id = %strategy.feedId, "Watching perps accounts");

        let mut interval = tokio::time::interval(self.config.poll_interval);
        loop {
            interval.tick().await;
            let now = unix_now();
            for account_id in &accounts {
                if let Err(e) = self.check_account(*account_id, &strategy, now).await {
                    warn!(%account_id, %e, "Failed to process account order, continuing...");
                }
            }
        }
    }

    async fn accounts(&self) -> Result<Vec<AccountId>> {
        if !self.config.account_ids.is_empty() {
            return Ok(self.config.account_ids.clone());
        }
        let accounts = self.client.perps_accounts(self.wallet_address).await?;
        if accounts.is_empty() {
            return Err(Error::NoAccountFound);
        }
        Ok(accounts)
    }

    async fn check_account(
        &self,
        account_id: AccountId,
        strategy: &SettlementStrategy,
        now: u64,
    ) -> Result<()> {
        let order = self.client.order(account_id).await?;
        match order_status(&order, strategy, now) {
            OrderStatus::NoOrder => {
                debug!(%account_id, "No pending order");
            }
            OrderStatus::Pending(countdown) => {
                debug!(
                    %account_id,
                    hours = countdown.hours,
                    minutes = countdown.minutes,
                    seconds = countdown.seconds,
                    "Order not settleable yet"
                );
            }
            OrderStatus::Expired => {
                warn!(%account_id, commitment_time = %order.commitmentTime, "Order settlement window expired");
            }
            OrderStatus::Settleable => {
                let outcome = self
                    .client
                    .perps_settle_order(
                        self.config.market_id,
                        account_id,
                        self.config.settlement_strategy_id,
                        self.wallet_address,
                    )
                    .await?;
                info!(
                    %account_id,
                    tx_hash = %outcome.tx_hash,
                    price_updated = outcome.price_updated,
                    "Order settled"
                );
            }
        }
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{B256, U256, b256};
    use snx_sdk::abi::perps::PerpsMarketProxy::OrderCommitmentRequest;

    use super::*;

    fn strategy() -> SettlementStrategy {
        SettlementStrategy {
            strategyType: 0,
            settlementDelay: U256::from(15),
            settlementWindowDuration: U256::from(60),
            priceVerificationContract: Address::ZERO,
            feedId: b256!("0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace"),
            settlementReward: U256::ZERO,
            disabled: false,
            commitmentPriceDelay: U256::from(2),
        }
    }

    fn order(commitment_time: u64, size_delta: i128) -> AsyncOrder {
        AsyncOrder {
            commitmentTime: U256::from(commitment_time),
            request: OrderCommitmentRequest {
                marketId: 100,
                accountId: 1,
                sizeDelta: size_delta,
                settlementStrategyId: 0,
                acceptablePrice: U256::ZERO,
                trackingCode: B256::ZERO,
                referrer: Address::ZERO,
            },
        }
    }

    #[test]
    fn test_order_status() {
        let strategy = strategy();
        assert_eq!(order_status(&order(0, 0), &strategy, 1_000), OrderStatus::NoOrder);
        assert_eq!(
            order_status(&order(1_000, 5), &strategy, 1_005),
            OrderStatus::Pending(Countdown {
                hours: 0,
                minutes: 0,
                seconds: 10
            })
        );
        assert_eq!(order_status(&order(1_000, 5), &strategy, 1_015), OrderStatus::Settleable);
        assert_eq!(order_status(&order(1_000, 5), &strategy, 1_075), OrderStatus::Settleable);
        assert_eq!(order_status(&order(1_000, 5), &strategy, 1_076), OrderStatus::Expired);
    }
}
