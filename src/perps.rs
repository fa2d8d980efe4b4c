//! Perps market reads and async order timing.

use alloy::{
    primitives::{Address, I256, U256},
    providers::Provider,
};

use crate::{
    Client,
    abi::perps::PerpsMarketProxy::{self, AsyncOrder, MarketSummary, SettlementStrategy},
    error::SdkError,
    multicall::PriceUpdateTxn,
    price::PriceService,
    system::AccountId,
};

/// Perps market identifier.
pub type MarketId = u128;

/// Margin requirements of the account open positions, `D18` USD.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequiredMargins {
    pub initial: U256,
    pub maintenance: U256,
    pub max_liquidation_reward: U256,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenPosition {
    pub total_pnl: I256,
    pub accrued_funding: I256,
    /// Signed position size, negative for short.
    pub size: i128,
    pub owed_interest: U256,
}

/// Time left until an event, split for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Countdown {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    pub fn from_secs(secs: u64) -> Self {
        Self {
            hours: secs / 3600,
            minutes: secs % 3600 / 60,
            seconds: secs % 60,
        }
    }

    pub fn is_elapsed(&self) -> bool {
        *self == Self::default()
    }
}

/// Time left at unix time `now` until an order committed at
/// `commitment_time` can be settled, zero once it can.
pub fn settlement_countdown(commitment_time: u64, settlement_delay: u64, now: u64) -> Countdown {
    Countdown::from_secs(
        commitment_time
            .saturating_add(settlement_delay)
            .saturating_sub(now),
    )
}

/// Whether the order returned by the market is a pending commitment.
/// No order is reported as a zeroed one.
pub fn is_open_order(order: &AsyncOrder) -> bool {
    !order.commitmentTime.is_zero() && order.request.sizeDelta != 0
}

/// Publish time of the price the order is settled at.
pub fn settlement_publish_time(order: &AsyncOrder, strategy: &SettlementStrategy) -> u64 {
    order
        .commitmentTime
        .saturating_add(strategy.commitmentPriceDelay)
        .saturating_to()
}

impl<P: Provider, S: PriceService> Client<P, S> {
    pub async fn market_summary(
        &self,
        market_id: MarketId,
        price_update: Option<&PriceUpdateTxn>,
    ) -> Result<MarketSummary, SdkError> {
        self.read(
            self.chain().perps_market_proxy(),
            &PerpsMarketProxy::getMarketSummaryCall {
                marketId: market_id,
            },
            price_update,
        )
        .await
    }

    pub async fn available_margin(
        &self,
        account_id: AccountId,
        price_update: Option<&PriceUpdateTxn>,
    ) -> Result<I256, SdkError> {
        self.read(
            self.chain().perps_market_proxy(),
            &PerpsMarketProxy::getAvailableMarginCall {
                accountId: account_id,
            },
            price_update,
        )
        .await
    }

    pub async fn required_margins(
        &self,
        account_id: AccountId,
        price_update: Option<&PriceUpdateTxn>,
    ) -> Result<RequiredMargins, SdkError> {
        let res = self
            .read(
                self.chain().perps_market_proxy(),
                &PerpsMarketProxy::getRequiredMarginsCall {
                    accountId: account_id,
                },
                price_update,
            )
            .await?;
        Ok(RequiredMargins {
            initial: res.requiredInitialMargin,
            maintenance: res.requiredMaintenanceMargin,
            max_liquidation_reward: res.maxLiquidationReward,
        })
    }

    pub async fn total_collateral_value(
        &self,
        account_id: AccountId,
        price_update: Option<&PriceUpdateTxn>,
    ) -> Result<U256, SdkError> {
        self.read(
            self.chain().perps_market_proxy(),
            &PerpsMarketProxy::totalCollateralValueCall {
                accountId: account_id,
            },
            price_update,
        )
        .await
    }

    pub async fn open_position(
        &self,
        account_id: AccountId,
        market_id: MarketId,
        price_update: Option<&PriceUpdateTxn>,
    ) -> Result<OpenPosition, SdkError> {
        let res = self
            .read(
                self.chain().perps_market_proxy(),
                &PerpsMarketProxy::getOpenPositionCall {
                    accountId: account_id,
                    marketId: market_id,
                },
                price_update,
            )
            .await?;
        Ok(OpenPosition {
            total_pnl: res.totalPnl,
            accrued_funding: res.accruedFunding,
            size: res.positionSize,
            owed_interest: res.owedInterest,
        })
    }

    pub async fn markets(&self) -> Result<Vec<MarketId>, SdkError> {
        let ids = self
            .read(
                self.chain().perps_market_proxy(),
                &PerpsMarketProxy::getMarketsCall {},
                None,
            )
            .await?;
        ids.into_iter()
            .map(|id| {
                MarketId::try_from(id)
                    .map_err(|_| SdkError::Fatal(format!("market id overflow: {id}")))
            })
            .collect()
    }

    pub async fn settlement_strategy(
        &self,
        market_id: MarketId,
        strategy_id: u128,
    ) -> Result<SettlementStrategy, SdkError> {
        self.read(
            self.chain().perps_market_proxy(),
            &PerpsMarketProxy::getSettlementStrategyCall {
                marketId: market_id,
                strategyId: U256::from(strategy_id),
            },
            None,
        )
        .await
    }

    /// Pending order of the account, zeroed if there is none.
    pub async fn order(&self, account_id: AccountId) -> Result<AsyncOrder, SdkError> {
        self.read(
            self.chain().perps_market_proxy(),
            &PerpsMarketProxy::getOrderCall {
                accountId: account_id,
            },
            None,
        )
        .await
    }

    pub async fn collateral_amount(
        &self,
        account_id: AccountId,
        synth_market_id: u128,
    ) -> Result<U256, SdkError> {
        self.read(
            self.chain().perps_market_proxy(),
            &PerpsMarketProxy::getCollateralAmountCall {
                accountId: account_id,
                synthMarketId: synth_market_id,
            },
            None,
        )
        .await
    }

    /// Perps accounts owned by `owner`.
    pub async fn perps_accounts(&self, owner: Address) -> Result<Vec<AccountId>, SdkError> {
        self.owned_accounts(self.chain().perps_account_proxy(), owner)
            .await
    }
}
