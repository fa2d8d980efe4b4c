use std::time::Duration;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, B256, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use tracing::debug;

use crate::{
    Chain,
    error::SdkError,
    multicall::{self, CallDescriptor, PriceUpdateTxn, TxOutcome},
    price::{PriceFeedId, PriceService},
    price_update,
};

/// Protocol client.
///
/// Reads and writes accept an optional price update (see
/// [`Client::price_update`]): with no update, or a no-op one, the call goes
/// straight to the target contract, otherwise it is aggregated with the
/// update through the multicall forwarder.
#[derive(Clone, Debug)]
pub struct Client<P, S> {
    chain: Chain,
    provider: P,
    price_service: S,
    read_delay: Option<Duration>,
    tracking_code: B256,
}

impl<P: Provider, S: PriceService> Client<P, S> {
    pub fn new(chain: Chain, provider: P, price_service: S) -> Self {
        Self {
            chain,
            provider,
            price_service,
            read_delay: None,
            tracking_code: B256::ZERO,
        }
    }

    /// Pause before every read aggregated with a price update,
    /// for RPC nodes load-balancing requests across lagging replicas.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Tracking code attached to committed perps orders.
    pub fn with_tracking_code(mut self, tracking_code: B256) -> Self {
        self.tracking_code = tracking_code;
        self
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn price_service(&self) -> &S {
        &self.price_service
    }

    pub fn tracking_code(&self) -> B256 {
        self.tracking_code
    }

    /// Price update of all the deployment price feeds.
    pub async fn price_update(
        &self,
        staleness_tolerance: Option<u64>,
    ) -> Result<PriceUpdateTxn, SdkError> {
        self.price_update_for(self.chain.price_feeds(), staleness_tolerance)
            .await
    }

    /// Price update of the given feeds.
    pub async fn price_update_for(
        &self,
        price_ids: &[PriceFeedId],
        staleness_tolerance: Option<u64>,
    ) -> Result<PriceUpdateTxn, SdkError> {
        price_update::build_price_update_txn(
            &self.provider,
            &self.price_service,
            &self.chain,
            price_ids,
            staleness_tolerance,
        )
        .await
    }

    /// Price update of a single feed at the given publish time.
    pub async fn strict_price_update(
        &self,
        feed_id: PriceFeedId,
        publish_time: u64,
    ) -> Result<PriceUpdateTxn, SdkError> {
        price_update::build_strict_price_update_txn(
            &self.price_service,
            &self.chain,
            feed_id,
            publish_time,
        )
        .await
    }

    /// Read-only call of `target`, aggregated with the price update
    /// when there is one.
    pub async fn read<C: SolCall>(
        &self,
        target: Address,
        call: &C,
        price_update: Option<&PriceUpdateTxn>,
    ) -> Result<C::Return, SdkError> {
        match price_update.filter(|u| u.requires_update()) {
            Some(update) => {
                if let Some(delay) = self.read_delay {
                    tokio::time::sleep(delay).await;
                }
                multicall::compose_and_call::<C, _>(
                    &self.provider,
                    &self.chain,
                    update.clone(),
                    CallDescriptor::new(target, call),
                )
                .await
            }
            None => {
                debug!(%target, "plain call");
                let request = TransactionRequest::default()
                    .with_to(target)
                    .with_input(call.abi_encode());
                let response = self.provider.call(request).await?;
                Ok(C::abi_decode_returns(&response)?)
            }
        }
    }

    /// Transaction calling `target` from `from`, aggregated with the price
    /// update when there is one.
    pub async fn write<C: SolCall>(
        &self,
        target: Address,
        call: &C,
        price_update: Option<&PriceUpdateTxn>,
        from: Address,
        value: U256,
    ) -> Result<TxOutcome, SdkError> {
        let action = CallDescriptor::new(target, call).with_value(value);
        match price_update.filter(|u| u.requires_update()) {
            Some(update) => {
                multicall::compose_and_send(&self.provider, &self.chain, update.clone(), action, from)
                    .await
            }
            None => {
                debug!(%target, %from, "plain transaction");
                let request = TransactionRequest::default()
                    .with_from(from)
                    .with_to(target)
                    .with_input(action.call_data)
                    .with_value(value);
                multicall::send_request(&self.provider, request).await
            }
        }
    }
}
