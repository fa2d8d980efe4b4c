//! Off-chain signed price data.
//!
//! [`PriceService`] is the seam between the price update pipeline and the
//! service signing price attestations. [`Hermes`] talks to the public Pyth
//! price service, [`crate::testing::MockPriceService`] records requests in tests.

mod hermes;

use std::future::Future;

use alloy::primitives::{B256, Bytes, I256};
use fastnum::D256;

use crate::num;

pub use hermes::{HERMES_ENDPOINT, Hermes};

/// Identifier of a price feed, shared by the off-chain price service
/// and the on-chain oracle wrapper.
pub type PriceFeedId = B256;

/// Error of the off-chain price service.
#[derive(Debug, thiserror::Error)]
pub enum PriceServiceError {
    #[error("price service request failed: {0}")]
    Request(String),

    #[error("price service responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed price service response: {0}")]
    Malformed(String),

    #[error("expected {expected} signed updates, got {got}")]
    Incomplete { expected: usize, got: usize },

    #[error("unknown price feed: {0}")]
    UnknownFeed(PriceFeedId),
}

/// Parsed Pyth price sample.
#[derive(Clone, Copy, derive_more::Debug, PartialEq, Eq)]
pub struct PythPrice {
    pub feed_id: PriceFeedId,
    /// Price mantissa, scaled by `10^expo`.
    pub price: i64,
    #[debug(skip)]
    pub conf: u64,
    pub expo: i32,
    pub publish_time: u64,
}

impl PythPrice {
    /// Price as a decimal number.
    pub fn to_decimal(&self) -> D256 {
        let mantissa = I256::try_from(self.price).unwrap_or_default();
        if self.expo <= 0 {
            num::Converter::new(self.expo.unsigned_abs() as u8).from_signed(mantissa)
        } else {
            let scale = 10i128
                .checked_pow(self.expo as u32)
                .and_then(|s| I256::try_from(s).ok())
                .unwrap_or_default();
            num::Converter::new(0).from_signed(mantissa.saturating_mul(scale))
        }
    }
}

/// Source of signed off-chain price attestations.
pub trait PriceService: Send + Sync {
    /// Latest signed update per requested feed, in request order,
    /// fetched in a single round trip.
    fn latest_update_data(
        &self,
        ids: &[PriceFeedId],
    ) -> impl Future<Output = Result<Vec<Bytes>, PriceServiceError>> + Send;

    /// Signed update of a single feed published at the given unix time.
    fn update_data_at(
        &self,
        id: PriceFeedId,
        publish_time: u64,
    ) -> impl Future<Output = Result<Bytes, PriceServiceError>> + Send;

    /// Latest parsed price of a single feed.
    fn latest_price(
        &self,
        id: PriceFeedId,
    ) -> impl Future<Output = Result<PythPrice, PriceServiceError>> + Send;
}
