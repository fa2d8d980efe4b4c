use std::fmt::Display;

use alloy::{
    primitives::Bytes,
    providers::PendingTransactionError,
    sol_types::{self, SolInterface},
    transports,
};

use crate::{abi::errors::Synthetix::SynthetixErrors, price::PriceServiceError};

pub type SdkError = ProviderError<SynthetixErrors>;

/// Call/transaction revert reason decoded by
/// the provided known ABI or in a generic raw form
/// if can not be decoded.
#[derive(Debug)]
pub enum RevertReason<R> {
    Known(R),
    Generic(String),
    Unknown,
}

/// Caller-supplied quantity failed a precondition.
///
/// Always raised before any probe, price fetch or transaction is issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("amount required")]
    AmountRequired,

    #[error("not enough balance")]
    NotEnoughBalance,

    #[error("not enough deposit")]
    NotEnoughDeposit,

    #[error("not enough available margin")]
    NotEnoughAvailableMargin,

    #[error("total collateral value is less than the size delta")]
    InsufficientCollateralValue,

    #[error("delegation would result in a negative position")]
    NegativeDelegation,

    #[error("no open order for account {0}")]
    NoOpenOrder(u128),

    #[error("no price feed configured for the settlement strategy")]
    MissingPriceFeed,
}

/// Error returned by the RPC provider as a result of call or
/// transaction execution, or by the price update pipeline around it.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError<R> {
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unexpected empty RPC response")]
    NullResp,

    #[error("transaction ran out of gas")]
    OutOfGas,

    #[error("transaction reverted: {0:?}")]
    Reverted(Box<RevertReason<R>>),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transaction timed out")]
    Timeout,

    #[error("price staleness probe failed: {0}")]
    StalenessProbe(String),

    #[error("price service error: {0}")]
    PriceService(#[from] PriceServiceError),

    #[error("empty multicall response")]
    EmptyResponse,

    #[error("unexpected multicall response: {0}")]
    UnexpectedResponseShape(String),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl<R: SolInterface> From<PendingTransactionError> for ProviderError<R> {
    fn from(value: PendingTransactionError) -> Self {
        match value {
            alloy::providers::PendingTransactionError::FailedToRegister => {
                Self::Fatal(value.to_string())
            }
            alloy::providers::PendingTransactionError::TransportError(rpc_err) => {
                Self::from(rpc_err)
            }
            alloy::providers::PendingTransactionError::Recv(_) => {
                Self::Transport(value.to_string())
            }
            alloy::providers::PendingTransactionError::TxWatcher(err) => match err {
                alloy::providers::WatchTxError::Timeout => Self::Timeout,
            },
        }
    }
}

impl<E: Display, R: SolInterface> From<transports::RpcError<E>> for ProviderError<R> {
    fn from(value: transports::RpcError<E>) -> Self {
        match value {
            transports::RpcError::ErrorResp(ref resp) => {
                // Heuristic to determine if eth_call failed due to OutOfGas or
                // if transaction was reverted during the gas estimation
                let msg = resp.message.to_ascii_lowercase();
                if (resp.code == -32603) && (msg.contains("gas") || msg.contains("oog")) {
                    Self::OutOfGas
                } else if ((resp.code == -32600 || resp.code == -32601 || resp.code == -32602)
                    && (msg.contains("invalid") || msg.contains("not found")))
                    || (resp.code == -32603
                        && (msg.contains("block by number") || msg.contains("getting block")))
                {
                    Self::InvalidRequest(msg)
                } else if resp.code == 3 && msg.contains("reverted") {
                    Self::Reverted(Box::new(RevertReason::from(value)))
                } else {
                    Self::Transport(value.to_string())
                }
            }
            transports::RpcError::NullResp => Self::NullResp,
            _ => Self::Transport(value.to_string()),
        }
    }
}

impl<R: SolInterface> From<sol_types::Error> for ProviderError<R> {
    fn from(value: sol_types::Error) -> Self {
        Self::Fatal(value.to_string())
    }
}

impl SdkError {
    /// Whether the error is an ERC-7412 revert requesting off-chain oracle data,
    /// i.e. the call has to be retried with a price update bundled ahead.
    pub fn is_oracle_data_required(&self) -> bool {
        match self {
            Self::Reverted(reason) => matches!(
                reason.as_ref(),
                RevertReason::Known(
                    SynthetixErrors::OracleDataRequired(_) | SynthetixErrors::FeeRequired(_)
                )
            ),
            _ => false,
        }
    }
}

impl<E: Display, R: SolInterface> From<transports::RpcError<E>> for RevertReason<R> {
    fn from(value: transports::RpcError<E>) -> Self {
        match value.as_error_resp() {
            Some(payload) => match payload.as_decoded_interface_error::<R>() {
                Some(known) => Self::Known(known),
                None => Self::Generic(value.to_string()),
            },
            None => Self::Generic(value.to_string()),
        }
    }
}

impl<R: SolInterface> From<Bytes> for RevertReason<R> {
    fn from(value: Bytes) -> Self {
        match R::abi_decode(&value) {
            Ok(known) => Self::Known(known),
            Err(_) => Self::Generic(value.to_string()),
        }
    }
}
