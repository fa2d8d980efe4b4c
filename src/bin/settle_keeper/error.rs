//! Error types for the settlement keeper.

use snx_sdk::error::SdkError;

/// Main error type for the settlement keeper.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    #[error("No perps account found for wallet address")]
    NoAccountFound,
}

pub type Result<T> = std::result::Result<T, Error>;
