//! Mutation workflows.
//!
//! Each workflow validates the caller-supplied quantities first, checks the
//! on-chain preconditions (balances, allowances, margins), builds the price
//! update the target call depends on and submits the call, aggregated with
//! the update only when some prices were stale.

use alloy::{
    primitives::{Address, I256, TxHash, U256},
    providers::Provider,
    rpc::types::TransactionReceipt,
    sol_types::SolCall,
};
use tracing::{debug, info};

use crate::{
    Client,
    abi::{
        perps::PerpsMarketProxy::{self, OrderCommitmentRequest},
        spot::SpotMarketProxy,
        system::CoreProxy,
        token::WETH,
    },
    error::{SdkError, ValidationError},
    multicall::{PriceUpdateTxn, TxOutcome},
    num,
    perps::{self, MarketId},
    price::PriceService,
    spot::SynthMarketId,
    system::{AccountId, PoolId},
};

/// Synth market id of the system stablecoin, used as perps margin.
pub const USD_MARKET_ID: u128 = 0;

/// Acceptable price slippage of committed perps orders, in basis points.
pub const ORDER_SLIPPAGE_BPS: u32 = 500;

/// Leverage of delegated collateral, `D18`.
const DELEGATION_LEVERAGE: U256 = num::WAD;

/// Submitted workflow transaction.
#[derive(Clone, Debug)]
pub struct ActionOutcome {
    /// Whether the call was aggregated with a price update.
    pub price_updated: bool,
    pub tx_hash: TxHash,
    pub receipt: TransactionReceipt,
}

fn require_amount(amount: U256) -> Result<(), ValidationError> {
    if amount.is_zero() {
        return Err(ValidationError::AmountRequired);
    }
    Ok(())
}

/// Collateral position after delegating `delta` on top of `current`.
pub fn delegated_amount(current: U256, delta: I256) -> Result<U256, ValidationError> {
    if delta.is_negative() {
        current
            .checked_sub(delta.unsigned_abs())
            .ok_or(ValidationError::NegativeDelegation)
    } else {
        Ok(current.saturating_add(delta.unsigned_abs()))
    }
}

impl<P: Provider, S: PriceService> Client<P, S> {
    async fn execute<C: SolCall>(
        &self,
        target: Address,
        call: &C,
        price_update: Option<&PriceUpdateTxn>,
        from: Address,
        value: U256,
    ) -> Result<ActionOutcome, SdkError> {
        let price_updated = price_update.is_some_and(PriceUpdateTxn::requires_update);
        let TxOutcome { tx_hash, receipt } =
            self.write(target, call, price_update, from, value).await?;
        info!(%tx_hash, price_updated, call = C::SIGNATURE, "transaction confirmed");
        Ok(ActionOutcome {
            price_updated,
            tx_hash,
            receipt,
        })
    }

    /// Creates a core system account owned by `from`.
    pub async fn create_account(
        &self,
        from: Address,
    ) -> Result<(AccountId, ActionOutcome), SdkError> {
        let outcome = self
            .execute(
                self.chain().core_proxy(),
                &CoreProxy::createAccountCall {},
                None,
                from,
                U256::ZERO,
            )
            .await?;
        let log = outcome
            .receipt
            .decoded_log::<CoreProxy::AccountCreated>()
            .ok_or_else(|| {
                SdkError::UnexpectedResponseShape("missing AccountCreated event".to_string())
            })?;
        Ok((log.accountId, outcome))
    }

    pub async fn deposit_collateral(
        &self,
        account_id: AccountId,
        collateral_type: Address,
        amount: U256,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        require_amount(amount)?;
        let core = self.chain().core_proxy();

        let balance = self.token_balance(collateral_type, from).await?;
        if balance < amount {
            return Err(ValidationError::NotEnoughBalance.into());
        }
        self.ensure_allowance(collateral_type, core, amount, from)
            .await?;

        self.execute(
            core,
            &CoreProxy::depositCall {
                accountId: account_id,
                collateralType: collateral_type,
                tokenAmount: amount,
            },
            None,
            from,
            U256::ZERO,
        )
        .await
    }

    pub async fn withdraw_collateral(
        &self,
        account_id: AccountId,
        collateral_type: Address,
        amount: U256,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        require_amount(amount)?;

        let available = self
            .account_available_collateral(account_id, collateral_type)
            .await?;
        if available < amount {
            return Err(ValidationError::NotEnoughDeposit.into());
        }

        let price_update = self.price_update(None).await?;
        self.execute(
            self.chain().core_proxy(),
            &CoreProxy::withdrawCall {
                accountId: account_id,
                collateralType: collateral_type,
                tokenAmount: amount,
            },
            Some(&price_update),
            from,
            U256::ZERO,
        )
        .await
    }

    /// Changes the collateral delegated to the pool by `delta`,
    /// negative to undelegate.
    pub async fn delegate_collateral(
        &self,
        account_id: AccountId,
        pool_id: PoolId,
        collateral_type: Address,
        delta: I256,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        if delta.is_zero() {
            return Err(ValidationError::AmountRequired.into());
        }

        let (available, current) = futures::try_join!(
            self.account_available_collateral(account_id, collateral_type),
            self.position_collateral(account_id, pool_id, collateral_type),
        )?;
        if delta.is_positive() && available < delta.unsigned_abs() {
            return Err(ValidationError::NotEnoughDeposit.into());
        }
        let amount = delegated_amount(current, delta)?;
        debug!(%current, %delta, %amount, "delegating collateral");

        let price_update = self.price_update(None).await?;
        self.execute(
            self.chain().core_proxy(),
            &CoreProxy::delegateCollateralCall {
                accountId: account_id,
                poolId: pool_id,
                collateralType: collateral_type,
                amount,
                leverage: DELEGATION_LEVERAGE,
            },
            Some(&price_update),
            from,
            U256::ZERO,
        )
        .await
    }

    pub async fn mint_usd(
        &self,
        account_id: AccountId,
        pool_id: PoolId,
        collateral_type: Address,
        amount: U256,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        require_amount(amount)?;

        let price_update = self.price_update(None).await?;
        self.execute(
            self.chain().core_proxy(),
            &CoreProxy::mintUsdCall {
                accountId: account_id,
                poolId: pool_id,
                collateralType: collateral_type,
                amount,
            },
            Some(&price_update),
            from,
            U256::ZERO,
        )
        .await
    }

    pub async fn burn_usd(
        &self,
        account_id: AccountId,
        pool_id: PoolId,
        collateral_type: Address,
        amount: U256,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        require_amount(amount)?;

        let balance = self
            .token_balance(self.chain().system_token(), from)
            .await?;
        if balance < amount {
            return Err(ValidationError::NotEnoughBalance.into());
        }

        let price_update = self.price_update(None).await?;
        self.execute(
            self.chain().core_proxy(),
            &CoreProxy::burnUsdCall {
                accountId: account_id,
                poolId: pool_id,
                collateralType: collateral_type,
                amount,
            },
            Some(&price_update),
            from,
            U256::ZERO,
        )
        .await
    }

    /// Price update of the synth market settlement feed, within the market
    /// strict staleness tolerance.
    async fn spot_price_update(
        &self,
        synth_market_id: SynthMarketId,
        settlement_strategy_id: u128,
    ) -> Result<PriceUpdateTxn, SdkError> {
        let (strategy, price_data) = futures::try_join!(
            self.spot_settlement_strategy(synth_market_id, settlement_strategy_id),
            self.spot_price_data(synth_market_id),
        )?;
        if strategy.feedId.is_zero() {
            return Err(ValidationError::MissingPriceFeed.into());
        }
        self.price_update_for(
            &[strategy.feedId],
            Some(price_data.strict_staleness_tolerance),
        )
        .await
    }

    /// Wraps `amount` of the market collateral `token` into the synth.
    pub async fn spot_wrap(
        &self,
        synth_market_id: SynthMarketId,
        settlement_strategy_id: u128,
        token: Address,
        amount: U256,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        require_amount(amount)?;
        let spot = self.chain().spot_market_proxy();

        let balance = self.token_balance(token, from).await?;
        if balance < amount {
            return Err(ValidationError::NotEnoughBalance.into());
        }
        self.ensure_allowance(token, spot, amount, from).await?;

        let price_update = self
            .spot_price_update(synth_market_id, settlement_strategy_id)
            .await?;
        self.execute(
            spot,
            &SpotMarketProxy::wrapCall {
                marketId: synth_market_id,
                wrapAmount: amount,
                minAmountReceived: amount,
            },
            Some(&price_update),
            from,
            U256::ZERO,
        )
        .await
    }

    /// Sells `amount` of `synth_token` for at least `min_usd_amount`
    /// of the system stablecoin.
    pub async fn spot_sell(
        &self,
        synth_market_id: SynthMarketId,
        settlement_strategy_id: u128,
        synth_token: Address,
        amount: U256,
        min_usd_amount: U256,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        require_amount(amount)?;
        let spot = self.chain().spot_market_proxy();

        let balance = self.token_balance(synth_token, from).await?;
        if balance < amount {
            return Err(ValidationError::NotEnoughBalance.into());
        }
        self.ensure_allowance(synth_token, spot, amount, from)
            .await?;

        let price_update = self
            .spot_price_update(synth_market_id, settlement_strategy_id)
            .await?;
        self.execute(
            spot,
            &SpotMarketProxy::sellCall {
                marketId: synth_market_id,
                synthAmount: amount,
                minUsdAmount: min_usd_amount,
                referrer: Address::ZERO,
            },
            Some(&price_update),
            from,
            U256::ZERO,
        )
        .await
    }

    /// Commits an async order increasing the position by `size_delta`, `D18`.
    ///
    /// The acceptable fill price is the latest off-chain price of the
    /// settlement feed moved by [`ORDER_SLIPPAGE_BPS`] against the order.
    pub async fn perps_commit_order(
        &self,
        market_id: MarketId,
        account_id: AccountId,
        settlement_strategy_id: u128,
        size_delta: i128,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        if size_delta <= 0 {
            return Err(ValidationError::AmountRequired.into());
        }
        let size = U256::from(size_delta.unsigned_abs());

        let (available_margin, collateral_value, strategy) = futures::try_join!(
            self.available_margin(account_id, None),
            self.total_collateral_value(account_id, None),
            self.settlement_strategy(market_id, settlement_strategy_id),
        )?;
        if available_margin.is_negative() || available_margin.unsigned_abs() < size {
            return Err(ValidationError::NotEnoughAvailableMargin.into());
        }
        if collateral_value < size {
            return Err(ValidationError::InsufficientCollateralValue.into());
        }
        if strategy.feedId.is_zero() {
            return Err(ValidationError::MissingPriceFeed.into());
        }

        let price = self.price_service().latest_price(strategy.feedId).await?;
        let acceptable_price = num::acceptable_price(&price, size_delta > 0, ORDER_SLIPPAGE_BPS);
        debug!(?price, %acceptable_price, "committing order");

        let price_update = self.price_update(None).await?;
        self.execute(
            self.chain().perps_market_proxy(),
            &PerpsMarketProxy::commitOrderCall {
                commitment: OrderCommitmentRequest {
                    marketId: market_id,
                    accountId: account_id,
                    sizeDelta: size_delta,
                    settlementStrategyId: settlement_strategy_id,
                    acceptablePrice: acceptable_price,
                    trackingCode: self.tracking_code(),
                    referrer: Address::ZERO,
                },
            },
            Some(&price_update),
            from,
            U256::ZERO,
        )
        .await
    }

    /// Settles the account pending order at the price published at the
    /// commitment time plus the strategy price delay.
    pub async fn perps_settle_order(
        &self,
        market_id: MarketId,
        account_id: AccountId,
        settlement_strategy_id: u128,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        let (order, strategy) = futures::try_join!(
            self.order(account_id),
            self.settlement_strategy(market_id, settlement_strategy_id),
        )?;
        if !perps::is_open_order(&order) {
            return Err(ValidationError::NoOpenOrder(account_id).into());
        }
        if strategy.feedId.is_zero() {
            return Err(ValidationError::MissingPriceFeed.into());
        }

        let price_update = self
            .strict_price_update(
                strategy.feedId,
                perps::settlement_publish_time(&order, &strategy),
            )
            .await?;
        self.execute(
            self.chain().perps_market_proxy(),
            &PerpsMarketProxy::settleOrderCall {
                accountId: account_id,
            },
            Some(&price_update),
            from,
            U256::ZERO,
        )
        .await
    }

    /// Adds `amount` of the system stablecoin to the perps account margin.
    pub async fn perps_modify_collateral(
        &self,
        account_id: AccountId,
        amount: U256,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        require_amount(amount)?;
        let perps = self.chain().perps_market_proxy();
        let token = self.chain().system_token();

        let balance = self.token_balance(token, from).await?;
        if balance < amount {
            return Err(ValidationError::NotEnoughBalance.into());
        }
        self.ensure_allowance(token, perps, amount, from).await?;

        let amount_delta = I256::try_from(amount)
            .map_err(|_| SdkError::InvalidRequest(format!("amount overflow: {amount}")))?;
        self.execute(
            perps,
            &PerpsMarketProxy::modifyCollateralCall {
                accountId: account_id,
                synthMarketId: USD_MARKET_ID,
                amountDelta: amount_delta,
            },
            None,
            from,
            U256::ZERO,
        )
        .await
    }

    /// Wraps `amount` of native currency into WETH.
    pub async fn weth_deposit(
        &self,
        amount: U256,
        from: Address,
    ) -> Result<ActionOutcome, SdkError> {
        require_amount(amount)?;
        let weth = self.chain().weth().ok_or_else(|| {
            SdkError::InvalidRequest("no WETH deployment configured".to_string())
        })?;
        self.execute(weth, &WETH::depositCall {}, None, from, amount)
            .await
    }
}
