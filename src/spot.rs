//! Spot market reads.

use alloy::{primitives::U256, providers::Provider};

use crate::{
    Client,
    abi::spot::SpotMarketProxy::{self, SettlementStrategy},
    error::SdkError,
    price::{PriceFeedId, PriceService},
};

/// Spot synth market identifier.
pub type SynthMarketId = u128;

/// Price feeds of a synth market.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpotPriceData {
    pub buy_feed_id: PriceFeedId,
    pub sell_feed_id: PriceFeedId,
    /// Maximum age of the price for wraps and sells, in seconds.
    pub strict_staleness_tolerance: u64,
}

impl<P: Provider, S: PriceService> Client<P, S> {
    pub async fn spot_price_data(
        &self,
        synth_market_id: SynthMarketId,
    ) -> Result<SpotPriceData, SdkError> {
        let res = self
            .read(
                self.chain().spot_market_proxy(),
                &SpotMarketProxy::getPriceDataCall {
                    synthMarketId: synth_market_id,
                },
                None,
            )
            .await?;
        Ok(SpotPriceData {
            buy_feed_id: res.buyFeedId,
            sell_feed_id: res.sellFeedId,
            strict_staleness_tolerance: res.strictPriceStalenessTolerance.saturating_to(),
        })
    }

    pub async fn spot_settlement_strategy(
        &self,
        synth_market_id: SynthMarketId,
        strategy_id: u128,
    ) -> Result<SettlementStrategy, SdkError> {
        self.read(
            self.chain().spot_market_proxy(),
            &SpotMarketProxy::getSettlementStrategyCall {
                marketId: synth_market_id,
                strategyId: U256::from(strategy_id),
            },
            None,
        )
        .await
    }
}
