//! Aggregation of a price update with a protocol call through the trusted
//! multicall forwarder.
//!
//! Every aggregated batch is exactly `[price_update, action]`: the forwarder
//! executes the oracle update first, so the action observes fresh prices and
//! a failure of either leg reverts the whole bundle.

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, B256, Bytes, TxHash, U256},
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
    sol_types::SolCall,
};
use tracing::debug;

use crate::{
    Chain,
    abi::multicall::TrustedMulticallForwarder::{self, Call3Value},
    error::{ProviderError, RevertReason, SdkError},
};

/// One leg of an aggregated batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallDescriptor {
    pub target: Address,
    pub call_data: Bytes,
    /// Native value forwarded with the call, in wei.
    pub value: U256,
    pub require_success: bool,
}

/// Oracle wrapper leg prepended to a protocol call.
///
/// Either a no-op (nothing to update) or a `fulfillOracleQuery` carrying
/// signed price data and the update fee.
pub type PriceUpdateTxn = CallDescriptor;

impl CallDescriptor {
    /// Required call without value.
    pub fn new<C: SolCall>(target: Address, call: &C) -> Self {
        Self {
            target,
            call_data: call.abi_encode().into(),
            value: U256::ZERO,
            require_success: true,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Marks the call as allowed to fail without reverting the batch.
    pub fn allow_failure(mut self) -> Self {
        self.require_success = false;
        self
    }

    /// Price update leg for the case when all the feeds are fresh.
    pub fn noop(oracle: Address) -> Self {
        Self {
            target: oracle,
            call_data: Bytes::copy_from_slice(B256::ZERO.as_slice()),
            value: U256::ZERO,
            require_success: false,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.value.is_zero() && !self.require_success
    }

    /// Whether the leg carries signed price data, i.e. the call it precedes
    /// has to be aggregated rather than sent directly.
    pub fn requires_update(&self) -> bool {
        !self.is_noop()
    }
}

impl From<CallDescriptor> for Call3Value {
    fn from(value: CallDescriptor) -> Self {
        Self {
            target: value.target,
            requireSuccess: value.require_success,
            value: value.value,
            callData: value.call_data,
        }
    }
}

/// Ordered `[price_update, action]` pair.
#[derive(Clone, Debug)]
pub struct AggregateBatch([CallDescriptor; 2]);

impl AggregateBatch {
    pub fn new(price_update: PriceUpdateTxn, action: CallDescriptor) -> Self {
        Self([price_update, action])
    }

    pub fn price_update(&self) -> &PriceUpdateTxn {
        &self.0[0]
    }

    pub fn action(&self) -> &CallDescriptor {
        &self.0[1]
    }

    /// Total value the forwarder has to receive with the batch.
    pub fn value(&self) -> U256 {
        self.price_update().value.saturating_add(self.action().value)
    }

    /// `aggregate3Value` call data of the batch.
    pub fn calldata(&self) -> Bytes {
        TrustedMulticallForwarder::aggregate3ValueCall {
            calls: self.0.iter().cloned().map(Call3Value::from).collect(),
        }
        .abi_encode()
        .into()
    }

    /// Request to the forwarder carrying the batch and its value.
    pub fn into_request(self, multicall: Address) -> TransactionRequest {
        TransactionRequest::default()
            .with_to(multicall)
            .with_input(self.calldata())
            .with_value(self.value())
    }
}

/// Mined transaction.
#[derive(Clone, Debug)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub receipt: TransactionReceipt,
}

/// Sends the batch as a transaction from `from` and waits for its receipt.
pub async fn compose_and_send<P: Provider>(
    provider: &P,
    chain: &Chain,
    price_update: PriceUpdateTxn,
    action: CallDescriptor,
    from: Address,
) -> Result<TxOutcome, SdkError> {
    send_request(
        provider,
        aggregate_transaction(chain, price_update, action, from),
    )
    .await
}

/// Transaction from `from` to the forwarder executing the batch.
fn aggregate_transaction(
    chain: &Chain,
    price_update: PriceUpdateTxn,
    action: CallDescriptor,
    from: Address,
) -> TransactionRequest {
    let batch = AggregateBatch::new(price_update, action);
    debug!(
        target = %batch.action().target,
        value = %batch.value(),
        "sending aggregated transaction"
    );
    batch.into_request(chain.multicall()).with_from(from)
}

/// Executes the batch as a read-only call at the latest block and decodes
/// the return data of the action leg.
pub async fn compose_and_call<C: SolCall, P: Provider>(
    provider: &P,
    chain: &Chain,
    price_update: PriceUpdateTxn,
    action: CallDescriptor,
) -> Result<C::Return, SdkError> {
    let batch = AggregateBatch::new(price_update, action);
    debug!(
        target = %batch.action().target,
        value = %batch.value(),
        "calling aggregated batch"
    );
    let response = provider
        .call(batch.into_request(chain.multicall()))
        .await?;
    decode_action_result::<C>(&response)
}

/// Decodes `aggregate3Value` response and the action leg result from it.
pub fn decode_action_result<C: SolCall>(response: &[u8]) -> Result<C::Return, SdkError> {
    if response.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    let results = TrustedMulticallForwarder::aggregate3ValueCall::abi_decode_returns(response)?;
    let Some(action) = results.into_iter().nth(1) else {
        return Err(ProviderError::UnexpectedResponseShape(
            "missing action result".to_string(),
        ));
    };
    if !action.success {
        return Err(ProviderError::Reverted(Box::new(RevertReason::from(
            action.returnData,
        ))));
    }
    if action.returnData.is_empty() {
        return Err(ProviderError::UnexpectedResponseShape(
            "empty action return data".to_string(),
        ));
    }
    Ok(C::abi_decode_returns(&action.returnData)?)
}

pub(crate) async fn send_request<P: Provider>(
    provider: &P,
    tx: TransactionRequest,
) -> Result<TxOutcome, SdkError> {
    let receipt = provider.send_transaction(tx).await?.get_receipt().await?;
    debug!(tx_hash = %receipt.transaction_hash, status = receipt.status(), "transaction mined");
    if !receipt.status() {
        return Err(ProviderError::Reverted(Box::new(RevertReason::Unknown)));
    }
    Ok(TxOutcome {
        tx_hash: receipt.transaction_hash,
        receipt,
    })
}
