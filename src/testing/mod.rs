//! Test utilities.
//!
//! [`MockPriceService`] serves canned signed updates and records every request,
//! so that tests can assert which feeds were fetched and in which order.
//!
//! [`mocked_provider`] builds a provider over alloy's mocked transport: every
//! RPC request pops the next response pushed to the [`Asserter`], in order.
//! The `*_response` helpers encode the multicall forwarder responses and the
//! receipts of mined transactions.

use std::sync::{Arc, Mutex};

use alloy::{
    primitives::{Address, B256, Bloom, Bytes, TxHash, address},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::json_rpc::ErrorPayload,
    sol_types::SolValue,
    transports::mock::Asserter,
};
use dashmap::DashMap;
use serde_json::{Value, json};

use crate::{
    Chain, Contracts,
    abi::multicall::TrustedMulticallForwarder::Result as CallResult,
    price::{PriceFeedId, PriceService, PriceServiceError, PythPrice},
};

pub const CORE_PROXY: Address = address!("0x0000000000000000000000000000000000000c02");
pub const ACCOUNT_PROXY: Address = address!("0x0000000000000000000000000000000000000ac1");
pub const PERPS_MARKET_PROXY: Address = address!("0x0000000000000000000000000000000000000b01");
pub const PERPS_ACCOUNT_PROXY: Address = address!("0x0000000000000000000000000000000000000ac2");
pub const SPOT_MARKET_PROXY: Address = address!("0x0000000000000000000000000000000000000500");
pub const MULTICALL: Address = address!("0x0000000000000000000000000000000000000ca1");
pub const PYTH_WRAPPER: Address = address!("0x0000000000000000000000000000000000007412");
pub const SYSTEM_TOKEN: Address = address!("0x0000000000000000000000000000000000000d01");
pub const WETH: Address = address!("0x0000000000000000000000000000000000000e1e");

const CHAIN_ID: u64 = 1337;

/// Deployment with fixed fake addresses and the given price feeds.
pub fn test_chain(price_feeds: Vec<PriceFeedId>) -> Chain {
    Chain::custom(
        CHAIN_ID,
        Contracts {
            core_proxy: CORE_PROXY,
            account_proxy: ACCOUNT_PROXY,
            perps_market_proxy: PERPS_MARKET_PROXY,
            perps_account_proxy: PERPS_ACCOUNT_PROXY,
            spot_market_proxy: SPOT_MARKET_PROXY,
            multicall: MULTICALL,
            pyth_wrapper: PYTH_WRAPPER,
            system_token: SYSTEM_TOKEN,
            weth: Some(WETH),
        },
        price_feeds,
    )
}

/// Provider answering from the `asserter` queue.
pub fn mocked_provider(asserter: Asserter) -> DynProvider {
    ProviderBuilder::new()
        .disable_recommended_fillers()
        .connect_mocked_client(asserter)
        .erased()
}

/// `aggregate3Value` response of the staleness probe,
/// `false` for a stale feed.
pub fn probe_response(fresh: &[bool]) -> Bytes {
    fresh
        .iter()
        .map(|success| CallResult {
            success: *success,
            returnData: Bytes::new(),
        })
        .collect::<Vec<_>>()
        .abi_encode()
        .into()
}

/// `aggregate3Value` response of `[price update, action]` batch,
/// `action_return` being the ABI encoded action return data.
pub fn aggregate_response(action_return: Bytes) -> Bytes {
    vec![
        CallResult {
            success: true,
            returnData: Bytes::new(),
        },
        CallResult {
            success: true,
            returnData: action_return,
        },
    ]
    .abi_encode()
    .into()
}

/// `eth_call` revert with the given revert data.
pub fn revert_payload(data: &Bytes) -> ErrorPayload {
    ErrorPayload {
        code: 3,
        message: "execution reverted".into(),
        data: serde_json::value::RawValue::from_string(format!("\"{data}\"")).ok(),
    }
}

/// `eth_getTransactionReceipt` response of a transaction mined in block 1.
pub fn receipt_response(
    tx_hash: TxHash,
    from: Address,
    to: Address,
    success: bool,
    logs: Vec<Value>,
) -> Value {
    json!({
        "type": "0x2",
        "status": if success { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0x5208",
        "logs": logs,
        "logsBloom": Bloom::ZERO,
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "blockHash": B256::repeat_byte(0xbb),
        "blockNumber": "0x1",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x3b9aca00",
        "from": from,
        "to": to,
        "contractAddress": null,
    })
}

/// Receipt log emitted by `address` in `tx_hash`.
pub fn log_response(address: Address, topics: Vec<B256>, data: Bytes, tx_hash: TxHash) -> Value {
    json!({
        "address": address,
        "topics": topics,
        "data": data,
        "blockHash": B256::repeat_byte(0xbb),
        "blockNumber": "0x1",
        "blockTimestamp": null,
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "logIndex": "0x0",
        "removed": false,
    })
}

/// In-memory [`PriceService`] recording the requests.
#[derive(Clone, Debug, Default)]
pub struct MockPriceService {
    updates: Arc<DashMap<PriceFeedId, Bytes>>,
    historical: Arc<DashMap<(PriceFeedId, u64), Bytes>>,
    prices: Arc<DashMap<PriceFeedId, PythPrice>>,
    latest_requests: Arc<Mutex<Vec<Vec<PriceFeedId>>>>,
    historical_requests: Arc<Mutex<Vec<(PriceFeedId, u64)>>>,
}

impl MockPriceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `update` as the latest signed update of `id`.
    pub fn with_update(self, id: PriceFeedId, update: Bytes) -> Self {
        self.updates.insert(id, update);
        self
    }

    /// Serves `update` as the signed update of `id` published at `publish_time`.
    pub fn with_update_at(self, id: PriceFeedId, publish_time: u64, update: Bytes) -> Self {
        self.historical.insert((id, publish_time), update);
        self
    }

    pub fn with_price(self, price: PythPrice) -> Self {
        self.prices.insert(price.feed_id, price);
        self
    }

    /// Feed sets of the latest updates requests, in request order.
    pub fn latest_requests(&self) -> Vec<Vec<PriceFeedId>> {
        self.latest_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn historical_requests(&self) -> Vec<(PriceFeedId, u64)> {
        self.historical_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl PriceService for MockPriceService {
    async fn latest_update_data(
        &self,
        ids: &[PriceFeedId],
    ) -> Result<Vec<Bytes>, PriceServiceError> {
        if let Ok(mut requests) = self.latest_requests.lock() {
            requests.push(ids.to_vec());
        }
        ids.iter()
            .map(|id| {
                self.updates
                    .get(id)
                    .map(|u| u.value().clone())
                    .ok_or(PriceServiceError::UnknownFeed(*id))
            })
            .collect()
    }

    async fn update_data_at(
        &self,
        id: PriceFeedId,
        publish_time: u64,
    ) -> Result<Bytes, PriceServiceError> {
        if let Ok(mut requests) = self.historical_requests.lock() {
            requests.push((id, publish_time));
        }
        self.historical
            .get(&(id, publish_time))
            .map(|u| u.value().clone())
            .ok_or(PriceServiceError::UnknownFeed(id))
    }

    async fn latest_price(&self, id: PriceFeedId) -> Result<PythPrice, PriceServiceError> {
        self.prices
            .get(&id)
            .map(|p| *p.value())
            .ok_or(PriceServiceError::UnknownFeed(id))
    }
}
