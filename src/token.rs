//! ERC-20 balances, allowances and approvals.

use alloy::{
    primitives::{Address, U256},
    providers::Provider,
};
use tracing::debug;

use crate::{
    Client,
    abi::token::ERC20,
    error::SdkError,
    multicall::TxOutcome,
    price::PriceService,
};

impl<P: Provider, S: PriceService> Client<P, S> {
    pub async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, SdkError> {
        self.read(token, &ERC20::balanceOfCall { account: owner }, None)
            .await
    }

    pub async fn token_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, SdkError> {
        self.read(token, &ERC20::allowanceCall { owner, spender }, None)
            .await
    }

    /// Native balance of `owner`.
    pub async fn eth_balance(&self, owner: Address) -> Result<U256, SdkError> {
        Ok(self.provider().get_balance(owner).await?)
    }

    /// Sets `spender` allowance of the `from` tokens to `amount`.
    pub async fn approve_token(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        from: Address,
    ) -> Result<TxOutcome, SdkError> {
        debug!(%token, %spender, %amount, "approving token");
        self.write(
            token,
            &ERC20::approveCall { spender, amount },
            None,
            from,
            U256::ZERO,
        )
        .await
    }

    /// Approves `spender` for `amount` unless the allowance already covers it.
    pub(crate) async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        from: Address,
    ) -> Result<Option<TxOutcome>, SdkError> {
        let allowance = self.token_allowance(token, from, spender).await?;
        if allowance >= amount {
            return Ok(None);
        }
        self.approve_token(token, spender, amount, from)
            .await
            .map(Some)
    }
}
