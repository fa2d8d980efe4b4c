use alloy::{
    primitives::{Bytes, U256, b256},
    providers::DynProvider,
    sol_types::{SolCall, SolError, SolType},
    transports::mock::Asserter,
};
use snx_sdk::{
    Client,
    abi::{errors::Synthetix, oracle::PythERC7412Wrapper},
    error::SdkError,
    multicall::PriceUpdateTxn,
    price::{PriceFeedId, PriceServiceError},
    price_update::{DEFAULT_STALENESS_TOLERANCE, OracleQueryPayload},
    testing::{self, MockPriceService},
};
use tokio_test::{assert_err, assert_ok};

const ETH: PriceFeedId = b256!("0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace");
const BTC: PriceFeedId = b256!("0xe62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43");
const SNX: PriceFeedId = b256!("0x39d020f60982ed892abbcd4a06a276a9f9b7bfbce003204c110b6e488f502da3");

type LatestPayload = <OracleQueryPayload as SolType>::RustType;

fn vaa(tag: &'static [u8]) -> Bytes {
    Bytes::from_static(tag)
}

fn setup() -> (Asserter, MockPriceService, Client<DynProvider, MockPriceService>) {
    let asserter = Asserter::new();
    let prices = MockPriceService::new()
        .with_update(ETH, vaa(b"eth-vaa"))
        .with_update(BTC, vaa(b"btc-vaa"))
        .with_update(SNX, vaa(b"snx-vaa"))
        .with_update_at(BTC, 1_717_000_002, vaa(b"btc-vaa-at"));
    let client = Client::new(
        testing::test_chain(vec![ETH, BTC, SNX]),
        testing::mocked_provider(asserter.clone()),
        prices.clone(),
    );
    (asserter, prices, client)
}

fn decode_payload(txn: &PriceUpdateTxn) -> LatestPayload {
    let call = PythERC7412Wrapper::fulfillOracleQueryCall::abi_decode(&txn.call_data).unwrap();
    OracleQueryPayload::abi_decode_params(&call.signedOffchainData).unwrap()
}

/// All feeds fresh: no-op update, nothing fetched off-chain.
#[tokio::test]
async fn test_fresh_prices_noop() {
    let (asserter, prices, client) = setup();
    asserter.push_success(&testing::probe_response(&[true, true, true]));

    let txn = assert_ok!(client.price_update(None).await);
    assert_eq!(txn.target, testing::PYTH_WRAPPER);
    assert_eq!(txn.value, U256::ZERO);
    assert!(!txn.require_success);
    assert!(!txn.requires_update());
    assert!(prices.latest_requests().is_empty());
}

/// Repeated probes of fresh feeds produce the same descriptor.
#[tokio::test]
async fn test_fresh_prices_idempotent() {
    let (asserter, prices, client) = setup();
    asserter.push_success(&testing::probe_response(&[true, true, true]));
    asserter.push_success(&testing::probe_response(&[true, true, true]));

    let first = assert_ok!(client.price_update(None).await);
    let second = assert_ok!(client.price_update(None).await);
    assert_eq!(first, second);
    assert!(prices.latest_requests().is_empty());
}

/// Only stale feeds are fetched, in the configured order.
#[tokio::test]
async fn test_stale_subset_fetched_in_order() {
    let (asserter, prices, client) = setup();
    asserter.push_success(&testing::probe_response(&[false, true, false]));

    let txn = assert_ok!(client.price_update(None).await);
    assert_eq!(txn.target, testing::PYTH_WRAPPER);
    assert_eq!(txn.value, U256::from(2));
    assert!(txn.require_success);
    assert_eq!(prices.latest_requests(), vec![vec![ETH, SNX]]);

    let (update_type, tolerance, ids, updates) = decode_payload(&txn);
    assert_eq!(update_type, 1);
    assert_eq!(tolerance, DEFAULT_STALENESS_TOLERANCE);
    assert_eq!(ids, vec![ETH, SNX]);
    assert_eq!(updates, vec![vaa(b"eth-vaa"), vaa(b"snx-vaa")]);
}

#[tokio::test]
async fn test_single_stale_feed() {
    let (asserter, prices, client) = setup();
    asserter.push_success(&testing::probe_response(&[false]));

    let txn = assert_ok!(client.price_update_for(&[BTC], Some(60)).await);
    assert_eq!(txn.value, U256::from(1));
    assert_eq!(prices.latest_requests(), vec![vec![BTC]]);
    assert_eq!(decode_payload(&txn), (1, 60, vec![BTC], vec![vaa(b"btc-vaa")]));
}

/// Zero tolerance falls back to the default one.
#[tokio::test]
async fn test_zero_tolerance_uses_default() {
    let (asserter, _, client) = setup();
    asserter.push_success(&testing::probe_response(&[false]));

    let txn = assert_ok!(client.price_update_for(&[ETH], Some(0)).await);
    assert_eq!(decode_payload(&txn).1, 1800);
}

/// No feeds to update: no probe, no fetch.
#[tokio::test]
async fn test_empty_feed_set() {
    let (_, prices, client) = setup();

    let txn = assert_ok!(client.price_update_for(&[], None).await);
    assert!(txn.is_noop());
    assert!(prices.latest_requests().is_empty());
}

#[tokio::test]
async fn test_probe_revert() {
    let (asserter, prices, client) = setup();
    asserter.push_failure(testing::revert_payload(
        &Synthetix::Unauthorized {
            addr: testing::MULTICALL,
        }
        .abi_encode()
        .into(),
    ));

    let err = assert_err!(client.price_update(None).await);
    assert!(matches!(err, SdkError::StalenessProbe(_)), "{err:?}");
    assert!(prices.latest_requests().is_empty());
}

#[tokio::test]
async fn test_malformed_probe_response() {
    let (asserter, _, client) = setup();
    asserter.push_success(&testing::probe_response(&[false, true]));

    let err = assert_err!(client.price_update(None).await);
    assert!(matches!(err, SdkError::StalenessProbe(_)), "{err:?}");
}

#[tokio::test]
async fn test_price_service_failure() {
    let asserter = Asserter::new();
    let prices = MockPriceService::new().with_update(ETH, vaa(b"eth-vaa"));
    let client = Client::new(
        testing::test_chain(vec![ETH, BTC]),
        testing::mocked_provider(asserter.clone()),
        prices.clone(),
    );
    asserter.push_success(&testing::probe_response(&[false, false]));

    let err = assert_err!(client.price_update(None).await);
    assert!(
        matches!(err, SdkError::PriceService(PriceServiceError::UnknownFeed(id)) if id == BTC),
        "{err:?}"
    );
    assert_eq!(prices.latest_requests(), vec![vec![ETH, BTC]]);
}

#[tokio::test]
async fn test_strict_price_update() {
    let (_, prices, client) = setup();

    let txn = assert_ok!(client.strict_price_update(BTC, 1_717_000_002).await);
    assert_eq!(txn.value, U256::from(1));
    assert!(txn.require_success);
    assert_eq!(
        decode_payload(&txn),
        (2, 1_717_000_002, vec![BTC], vec![vaa(b"btc-vaa-at")])
    );
    assert_eq!(prices.historical_requests(), vec![(BTC, 1_717_000_002)]);
}

#[tokio::test]
async fn test_strict_price_update_unknown_publish_time() {
    let (_, _, client) = setup();

    let err = assert_err!(client.strict_price_update(BTC, 1_717_000_003).await);
    assert!(matches!(err, SdkError::PriceService(_)), "{err:?}");
}

#[test]
fn test_latest_payload_encoding() {
    // (uint8, uint64, bytes32[], bytes[]) head is four words
    let payload = OracleQueryPayload::abi_encode_params(&(1u8, 1800u64, vec![ETH], vec![vaa(b"x")]));
    assert_eq!(U256::from_be_slice(&payload[..32]), U256::from(1));
    assert_eq!(U256::from_be_slice(&payload[32..64]), U256::from(1800));
    assert_eq!(U256::from_be_slice(&payload[64..96]), U256::from(128));
}
