//! Core system reads: accounts, collateral, positions and debt.

use alloy::{
    primitives::{Address, I256, U256},
    providers::Provider,
};
use futures::future::try_join_all;

use crate::{
    Client,
    abi::system::{AccountProxy, CoreProxy},
    error::SdkError,
    multicall::PriceUpdateTxn,
    price::PriceService,
};

/// Protocol account identifier.
pub type AccountId = u128;

/// Staking pool identifier.
pub type PoolId = u128;

/// Account collateral of a single collateral type, `D18`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountCollateral {
    pub total_deposited: U256,
    pub total_assigned: U256,
    pub total_locked: U256,
}

impl AccountCollateral {
    /// Deposited collateral neither delegated nor locked.
    pub fn available(&self) -> U256 {
        self.total_deposited
            .saturating_sub(self.total_assigned)
            .saturating_sub(self.total_locked)
    }
}

impl<P: Provider, S: PriceService> Client<P, S> {
    pub async fn account_collateral(
        &self,
        account_id: AccountId,
        collateral_type: Address,
        price_update: Option<&PriceUpdateTxn>,
    ) -> Result<AccountCollateral, SdkError> {
        let res = self
            .read(
                self.chain().core_proxy(),
                &CoreProxy::getAccountCollateralCall {
                    accountId: account_id,
                    collateralType: collateral_type,
                },
                price_update,
            )
            .await?;
        Ok(AccountCollateral {
            total_deposited: res.totalDeposited,
            total_assigned: res.totalAssigned,
            total_locked: res.totalLocked,
        })
    }

    pub async fn account_available_collateral(
        &self,
        account_id: AccountId,
        collateral_type: Address,
    ) -> Result<U256, SdkError> {
        self.read(
            self.chain().core_proxy(),
            &CoreProxy::getAccountAvailableCollateralCall {
                accountId: account_id,
                collateralType: collateral_type,
            },
            None,
        )
        .await
    }

    pub async fn position_collateral(
        &self,
        account_id: AccountId,
        pool_id: PoolId,
        collateral_type: Address,
    ) -> Result<U256, SdkError> {
        self.read(
            self.chain().core_proxy(),
            &CoreProxy::getPositionCollateralCall {
                accountId: account_id,
                poolId: pool_id,
                collateralType: collateral_type,
            },
            None,
        )
        .await
    }

    /// Debt of the pool position, negative for credit.
    /// Depends on the collateral price.
    pub async fn position_debt(
        &self,
        account_id: AccountId,
        pool_id: PoolId,
        collateral_type: Address,
        price_update: Option<&PriceUpdateTxn>,
    ) -> Result<I256, SdkError> {
        self.read(
            self.chain().core_proxy(),
            &CoreProxy::getPositionDebtCall {
                accountId: account_id,
                poolId: pool_id,
                collateralType: collateral_type,
            },
            price_update,
        )
        .await
    }

    pub async fn collateral_price(
        &self,
        collateral_type: Address,
        price_update: Option<&PriceUpdateTxn>,
    ) -> Result<U256, SdkError> {
        self.read(
            self.chain().core_proxy(),
            &CoreProxy::getCollateralPriceCall {
                collateralType: collateral_type,
            },
            price_update,
        )
        .await
    }

    /// Unix time of the last account interaction, bounding withdrawals.
    pub async fn account_last_interaction(&self, account_id: AccountId) -> Result<U256, SdkError> {
        self.read(
            self.chain().core_proxy(),
            &CoreProxy::getAccountLastInteractionCall {
                accountId: account_id,
            },
            None,
        )
        .await
    }

    /// Core system accounts owned by `owner`.
    pub async fn accounts(&self, owner: Address) -> Result<Vec<AccountId>, SdkError> {
        self.owned_accounts(self.chain().account_proxy(), owner).await
    }

    pub(crate) async fn owned_accounts(
        &self,
        account_proxy: Address,
        owner: Address,
    ) -> Result<Vec<AccountId>, SdkError> {
        let balance = self
            .read(account_proxy, &AccountProxy::balanceOfCall { owner }, None)
            .await?;
        let count = u64::try_from(balance)
            .map_err(|_| SdkError::Fatal(format!("account balance overflow: {balance}")))?;

        let ids = try_join_all((0..count).map(|index| async move {
            let call = AccountProxy::tokenOfOwnerByIndexCall {
                owner,
                index: U256::from(index),
            };
            self.read(account_proxy, &call, None).await
        }))
        .await?;

        ids.into_iter()
            .map(|id| {
                AccountId::try_from(id)
                    .map_err(|_| SdkError::Fatal(format!("account id overflow: {id}")))
            })
            .collect()
    }
}
