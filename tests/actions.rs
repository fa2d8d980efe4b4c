use alloy::{
    primitives::{Address, B256, Bytes, I256, U256, address, b256},
    providers::DynProvider,
    sol_types::{SolEvent, SolValue},
    transports::mock::Asserter,
};
use snx_sdk::{
    Client,
    abi::{
        perps::PerpsMarketProxy::{AsyncOrder, OrderCommitmentRequest, SettlementStrategy},
        system::CoreProxy,
    },
    error::{RevertReason, SdkError, ValidationError},
    price::PriceFeedId,
    testing::{self, MockPriceService},
};
use tokio_test::{assert_err, assert_ok};

const ETH: PriceFeedId = b256!("0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace");
const OWNER: Address = address!("0x00000000000000000000000000000000000a11ce");
const COLLATERAL: Address = address!("0x0000000000000000000000000000000000000c01");
const SYNTH: Address = address!("0x0000000000000000000000000000000000000c02");
const TX_HASH: B256 = b256!("0x00000000000000000000000000000000000000000000000000000000000001d1");

fn setup() -> (Asserter, MockPriceService, Client<DynProvider, MockPriceService>) {
    let asserter = Asserter::new();
    let prices = MockPriceService::new();
    let client = Client::new(
        testing::test_chain(vec![ETH]),
        testing::mocked_provider(asserter.clone()),
        prices.clone(),
    );
    (asserter, prices, client)
}

/// Queues the `eth_sendTransaction` hash and the receipt, which is read
/// once when registering the pending transaction and once when fetching it.
fn push_mined(asserter: &Asserter, to: Address, success: bool, logs: Vec<serde_json::Value>) {
    asserter.push_success(&TX_HASH);
    let receipt = testing::receipt_response(TX_HASH, OWNER, to, success, logs);
    asserter.push_success(&receipt);
    asserter.push_success(&receipt);
}

fn assert_validation(err: SdkError, expected: ValidationError) {
    assert!(
        matches!(err, SdkError::Validation(ref e) if *e == expected),
        "{err:?}"
    );
}

/// Zero quantities are rejected before anything is read, fetched or sent:
/// the mocked transport has no responses queued.
#[tokio::test]
async fn test_zero_amounts_rejected_upfront() {
    let (_, prices, client) = setup();
    let zero = U256::ZERO;

    assert_validation(
        assert_err!(client.deposit_collateral(1, COLLATERAL, zero, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert_validation(
        assert_err!(client.withdraw_collateral(1, COLLATERAL, zero, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert_validation(
        assert_err!(client.delegate_collateral(1, 1, COLLATERAL, I256::ZERO, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert_validation(
        assert_err!(client.mint_usd(1, 1, COLLATERAL, zero, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert_validation(
        assert_err!(client.burn_usd(1, 1, COLLATERAL, zero, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert_validation(
        assert_err!(client.spot_wrap(1, 0, COLLATERAL, zero, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert_validation(
        assert_err!(client.spot_sell(1, 0, SYNTH, zero, zero, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert_validation(
        assert_err!(client.perps_modify_collateral(1, zero, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert_validation(
        assert_err!(client.weth_deposit(zero, OWNER).await),
        ValidationError::AmountRequired,
    );

    assert!(prices.latest_requests().is_empty());
    assert!(prices.historical_requests().is_empty());
}

#[tokio::test]
async fn test_non_positive_order_size_rejected() {
    let (_, prices, client) = setup();

    assert_validation(
        assert_err!(client.perps_commit_order(100, 1, 0, 0, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert_validation(
        assert_err!(client.perps_commit_order(100, 1, 0, -5, OWNER).await),
        ValidationError::AmountRequired,
    );
    assert!(prices.latest_requests().is_empty());
}

#[tokio::test]
async fn test_deposit_not_enough_balance() {
    let (asserter, prices, client) = setup();
    asserter.push_success(&Bytes::from(U256::from(5).abi_encode()));

    assert_validation(
        assert_err!(client.deposit_collateral(1, COLLATERAL, U256::from(10), OWNER).await),
        ValidationError::NotEnoughBalance,
    );
    assert!(prices.latest_requests().is_empty());
}

#[tokio::test]
async fn test_withdraw_not_enough_deposit() {
    let (asserter, prices, client) = setup();
    asserter.push_success(&Bytes::from(U256::from(9).abi_encode()));

    assert_validation(
        assert_err!(client.withdraw_collateral(1, COLLATERAL, U256::from(10), OWNER).await),
        ValidationError::NotEnoughDeposit,
    );
    assert!(prices.latest_requests().is_empty());
}

#[tokio::test]
async fn test_undelegate_below_zero() {
    let (asserter, prices, client) = setup();
    // available collateral and current position collateral
    asserter.push_success(&Bytes::from(U256::from(30).abi_encode()));
    asserter.push_success(&Bytes::from(U256::from(30).abi_encode()));

    assert_validation(
        assert_err!(
            client
                .delegate_collateral(1, 1, COLLATERAL, I256::try_from(-31).unwrap(), OWNER)
                .await
        ),
        ValidationError::NegativeDelegation,
    );
    assert!(prices.latest_requests().is_empty());
}

#[tokio::test]
async fn test_commit_order_not_enough_margin() {
    let (asserter, prices, client) = setup();
    let strategy = settlement_strategy(ETH);
    // available margin, total collateral value, settlement strategy
    asserter.push_success(&Bytes::from(I256::try_from(4).unwrap().abi_encode()));
    asserter.push_success(&Bytes::from(U256::from(100).abi_encode()));
    asserter.push_success(&Bytes::from(strategy.abi_encode()));

    assert_validation(
        assert_err!(client.perps_commit_order(100, 1, 0, 5, OWNER).await),
        ValidationError::NotEnoughAvailableMargin,
    );
    assert!(prices.latest_requests().is_empty());
}

#[tokio::test]
async fn test_settle_without_open_order() {
    let (asserter, prices, client) = setup();
    let order = AsyncOrder {
        commitmentTime: U256::ZERO,
        request: OrderCommitmentRequest {
            marketId: 0,
            accountId: 0,
            sizeDelta: 0,
            settlementStrategyId: 0,
            acceptablePrice: U256::ZERO,
            trackingCode: B256::ZERO,
            referrer: Address::ZERO,
        },
    };
    asserter.push_success(&Bytes::from(order.abi_encode()));
    asserter.push_success(&Bytes::from(
        settlement_strategy(ETH).abi_encode(),
    ));

    assert_validation(
        assert_err!(client.perps_settle_order(100, 7, 0, OWNER).await),
        ValidationError::NoOpenOrder(7),
    );
    assert!(prices.historical_requests().is_empty());
}

#[tokio::test]
async fn test_withdraw_with_stale_prices_is_aggregated() {
    let (asserter, prices, client) = setup();
    let prices = prices.with_update(ETH, Bytes::from_static(b"eth-vaa"));
    // available collateral, staleness check
    asserter.push_success(&Bytes::from(U256::from(100).abi_encode()));
    asserter.push_success(&testing::probe_response(&[false]));
    push_mined(&asserter, testing::MULTICALL, true, vec![]);

    let outcome = assert_ok!(client.withdraw_collateral(1, COLLATERAL, U256::from(10), OWNER).await);
    assert!(outcome.price_updated);
    assert_eq!(outcome.tx_hash, TX_HASH);
    assert_eq!(outcome.receipt.to, Some(testing::MULTICALL));
    assert_eq!(prices.latest_requests(), vec![vec![ETH]]);
}

#[tokio::test]
async fn test_withdraw_with_fresh_prices_is_plain() {
    let (asserter, prices, client) = setup();
    asserter.push_success(&Bytes::from(U256::from(100).abi_encode()));
    asserter.push_success(&testing::probe_response(&[true]));
    push_mined(&asserter, testing::CORE_PROXY, true, vec![]);

    let outcome = assert_ok!(client.withdraw_collateral(1, COLLATERAL, U256::from(10), OWNER).await);
    assert!(!outcome.price_updated);
    assert_eq!(outcome.tx_hash, TX_HASH);
    assert!(prices.latest_requests().is_empty());
}

#[tokio::test]
async fn test_failed_receipt_is_revert() {
    let (asserter, _, client) = setup();
    asserter.push_success(&Bytes::from(U256::from(100).abi_encode()));
    asserter.push_success(&testing::probe_response(&[true]));
    push_mined(&asserter, testing::CORE_PROXY, false, vec![]);

    let err = assert_err!(client.withdraw_collateral(1, COLLATERAL, U256::from(10), OWNER).await);
    assert!(
        matches!(err, SdkError::Reverted(ref r) if matches!(**r, RevertReason::Unknown)),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_create_account_reads_event() {
    let (asserter, _, client) = setup();
    let account_id = 170_141_183_460_469_231_731_687_303_715_884_105_727u128;
    let created = testing::log_response(
        testing::CORE_PROXY,
        vec![
            CoreProxy::AccountCreated::SIGNATURE_HASH,
            U256::from(account_id).into(),
            OWNER.into_word(),
        ],
        Bytes::new(),
        TX_HASH,
    );
    push_mined(&asserter, testing::CORE_PROXY, true, vec![created]);

    let (id, outcome) = assert_ok!(client.create_account(OWNER).await);
    assert_eq!(id, account_id);
    assert!(!outcome.price_updated);
}

#[tokio::test]
async fn test_create_account_without_event() {
    let (asserter, _, client) = setup();
    push_mined(&asserter, testing::CORE_PROXY, true, vec![]);

    assert!(matches!(
        assert_err!(client.create_account(OWNER).await),
        SdkError::UnexpectedResponseShape(_)
    ));
}

fn settlement_strategy(feed_id: B256) -> SettlementStrategy {
    SettlementStrategy {
        strategyType: 0,
        settlementDelay: U256::from(15),
        settlementWindowDuration: U256::from(60),
        priceVerificationContract: testing::PYTH_WRAPPER,
        feedId: feed_id,
        settlementReward: U256::ZERO,
        disabled: false,
        commitmentPriceDelay: U256::from(2),
    }
}
