//! Price update orchestration.
//!
//! Before a call that depends on oracle prices, the feeds it reads are probed
//! on-chain through the oracle wrapper, signed updates are fetched off-chain
//! for the stale ones only, and the result is packed into a
//! `fulfillOracleQuery` call to be executed right before the target call
//! (see [`crate::multicall`]).

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    sol_types::{SolCall, SolType, sol_data},
    transports::{RpcError, TransportErrorKind},
};
use tracing::debug;

use crate::{
    Chain,
    abi::{
        multicall::TrustedMulticallForwarder::{self, Call3Value},
        oracle::PythERC7412Wrapper,
    },
    error::SdkError,
    multicall::{CallDescriptor, PriceUpdateTxn},
    price::{PriceFeedId, PriceService, PriceServiceError},
};

/// Default maximum age of an on-chain price, in seconds.
pub const DEFAULT_STALENESS_TOLERANCE: u64 = 1800;

/// Oracle update fee per updated feed, in wei.
pub const UPDATE_FEE_PER_FEED: U256 = U256::from_limbs([1, 0, 0, 0]);

/// `fulfillOracleQuery` payload tag of the latest prices update.
const UPDATE_TYPE_LATEST: u8 = 1;

/// `fulfillOracleQuery` payload tag of the price update at specific time.
const UPDATE_TYPE_STRICT: u8 = 2;

/// `fulfillOracleQuery` signed data: `(uint8 updateType, uint64 tolerance or
/// publish time, bytes32[] priceIds, bytes[] updateData)`.
pub type OracleQueryPayload = (
    sol_data::Uint<8>,
    sol_data::Uint<64>,
    sol_data::Array<sol_data::FixedBytes<32>>,
    sol_data::Array<sol_data::Bytes>,
);

/// Builds a price update for the given feeds.
///
/// Returns a no-op descriptor if all the feeds are fresh within
/// `staleness_tolerance` seconds (`None` or `0` for
/// [`DEFAULT_STALENESS_TOLERANCE`]), otherwise a `fulfillOracleQuery`
/// carrying signed updates of the stale feeds, in the order they were given.
pub async fn build_price_update_txn<P: Provider, S: PriceService>(
    provider: &P,
    price_service: &S,
    chain: &Chain,
    price_ids: &[PriceFeedId],
    staleness_tolerance: Option<u64>,
) -> Result<PriceUpdateTxn, SdkError> {
    let oracle = chain.pyth_wrapper();
    if price_ids.is_empty() {
        return Ok(CallDescriptor::noop(oracle));
    }
    let tolerance = staleness_tolerance
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_STALENESS_TOLERANCE);

    let stale = stale_price_ids(provider, chain, price_ids, tolerance).await?;
    if stale.is_empty() {
        debug!(feeds = price_ids.len(), tolerance, "all prices are fresh");
        return Ok(CallDescriptor::noop(oracle));
    }
    debug!(?stale, tolerance, "fetching signed updates of stale prices");

    let updates = price_service.latest_update_data(&stale).await?;
    if updates.len() != stale.len() {
        return Err(PriceServiceError::Incomplete {
            expected: stale.len(),
            got: updates.len(),
        }
        .into());
    }
    Ok(latest_update_txn(oracle, tolerance, stale, updates))
}

/// Builds a price update of a single feed to its price published
/// at `publish_time`, as required by the settlement of async orders.
pub async fn build_strict_price_update_txn<S: PriceService>(
    price_service: &S,
    chain: &Chain,
    feed_id: PriceFeedId,
    publish_time: u64,
) -> Result<PriceUpdateTxn, SdkError> {
    debug!(%feed_id, publish_time, "fetching signed update at publish time");
    let update = price_service.update_data_at(feed_id, publish_time).await?;
    Ok(strict_update_txn(
        chain.pyth_wrapper(),
        feed_id,
        publish_time,
        update,
    ))
}

/// Probes the oracle wrapper for every feed in a single read-only batch.
/// Returns the feeds with no price within `tolerance`, in input order.
pub async fn stale_price_ids<P: Provider>(
    provider: &P,
    chain: &Chain,
    price_ids: &[PriceFeedId],
    tolerance: u64,
) -> Result<Vec<PriceFeedId>, SdkError> {
    let request = TransactionRequest::default()
        .with_to(chain.multicall())
        .with_input(probe_calldata(chain.pyth_wrapper(), price_ids, tolerance));
    let response = provider.call(request).await.map_err(probe_error)?;
    classify_stale(price_ids, &response)
}

fn probe_calldata(oracle: Address, price_ids: &[PriceFeedId], tolerance: u64) -> Bytes {
    let calls = price_ids
        .iter()
        .map(|id| {
            CallDescriptor::new(
                oracle,
                &PythERC7412Wrapper::getLatestPriceCall {
                    priceId: *id,
                    stalenessTolerance: U256::from(tolerance),
                },
            )
            .allow_failure()
        })
        .map(Call3Value::from)
        .collect();
    TrustedMulticallForwarder::aggregate3ValueCall { calls }
        .abi_encode()
        .into()
}

fn probe_error(err: RpcError<TransportErrorKind>) -> SdkError {
    match SdkError::from(err) {
        SdkError::Reverted(reason) => {
            SdkError::StalenessProbe(format!("probe reverted: {reason:?}"))
        }
        other => other,
    }
}

/// Picks the feeds whose probe failed.
pub fn classify_stale(
    price_ids: &[PriceFeedId],
    response: &[u8],
) -> Result<Vec<PriceFeedId>, SdkError> {
    let results = TrustedMulticallForwarder::aggregate3ValueCall::abi_decode_returns(response)
        .map_err(|e| SdkError::StalenessProbe(e.to_string()))?;
    if results.len() != price_ids.len() {
        return Err(SdkError::StalenessProbe(format!(
            "expected {} probe results, got {}",
            price_ids.len(),
            results.len()
        )));
    }
    Ok(price_ids
        .iter()
        .zip(results)
        .filter(|(_, result)| !result.success)
        .map(|(id, _)| *id)
        .collect())
}

/// `fulfillOracleQuery` of the latest signed prices, one fee unit per feed.
pub fn latest_update_txn(
    oracle: Address,
    tolerance: u64,
    price_ids: Vec<PriceFeedId>,
    updates: Vec<Bytes>,
) -> PriceUpdateTxn {
    let fee = UPDATE_FEE_PER_FEED * U256::from(price_ids.len());
    let payload = OracleQueryPayload::abi_encode_params(&(
        UPDATE_TYPE_LATEST,
        tolerance,
        price_ids,
        updates,
    ));
    fulfill_oracle_query(oracle, payload.into()).with_value(fee)
}

/// `fulfillOracleQuery` of a single feed price at `publish_time`.
pub fn strict_update_txn(
    oracle: Address,
    feed_id: PriceFeedId,
    publish_time: u64,
    update: Bytes,
) -> PriceUpdateTxn {
    let payload = OracleQueryPayload::abi_encode_params(&(
        UPDATE_TYPE_STRICT,
        publish_time,
        vec![feed_id],
        vec![update],
    ));
    fulfill_oracle_query(oracle, payload.into()).with_value(UPDATE_FEE_PER_FEED)
}

fn fulfill_oracle_query(oracle: Address, signed_offchain_data: Bytes) -> CallDescriptor {
    CallDescriptor::new(
        oracle,
        &PythERC7412Wrapper::fulfillOracleQueryCall {
            signedOffchainData: signed_offchain_data,
        },
    )
}
