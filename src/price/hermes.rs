use alloy::{hex, primitives::Bytes};
use base64::prelude::*;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use super::{PriceFeedId, PriceService, PriceServiceError, PythPrice};

/// Public Pyth price service endpoint.
pub const HERMES_ENDPOINT: &str = "https://hermes.pyth.network";

/// Client of the Pyth Hermes price service.
///
/// Signed updates are returned as raw VAA bytes ready to be passed to
/// the on-chain oracle wrapper.
#[derive(Clone, Debug)]
pub struct Hermes {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct VaaResponse {
    vaa: String,
    #[serde(rename = "publishTime")]
    publish_time: u64,
}

#[derive(Debug, Deserialize)]
struct PriceFeedResponse {
    id: String,
    price: PriceResponse,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: String,
    conf: String,
    expo: i32,
    publish_time: u64,
}

impl Default for Hermes {
    fn default() -> Self {
        Self::new(Url::parse(HERMES_ENDPOINT).expect("valid Hermes endpoint"))
    }
}

impl Hermes {
    /// Creates a client of the service at `base_url`.
    /// Base URL with a path has to end with `/`.
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a client reusing existing HTTP client (timeouts, proxies, etc).
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PriceServiceError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PriceServiceError::Request(e.to_string()))?;
        debug!(%url, ?query, "price service request");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| PriceServiceError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PriceServiceError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| PriceServiceError::Malformed(e.to_string()))
    }
}

impl PriceService for Hermes {
    async fn latest_update_data(&self, ids: &[PriceFeedId]) -> Result<Vec<Bytes>, PriceServiceError> {
        let vaas: Vec<String> = self.get("api/latest_vaas", &ids_query(ids)).await?;
        if vaas.len() != ids.len() {
            return Err(PriceServiceError::Incomplete {
                expected: ids.len(),
                got: vaas.len(),
            });
        }
        vaas.iter().map(String::as_str).map(decode_vaa).collect()
    }

    async fn update_data_at(
        &self,
        id: PriceFeedId,
        publish_time: u64,
    ) -> Result<Bytes, PriceServiceError> {
        let resp: VaaResponse = self
            .get(
                "api/get_vaa",
                &[
                    ("id", feed_id_param(&id)),
                    ("publish_time", publish_time.to_string()),
                ],
            )
            .await?;
        debug!(%id, requested = publish_time, published = resp.publish_time, "fetched historical VAA");
        decode_vaa(&resp.vaa)
    }

    async fn latest_price(&self, id: PriceFeedId) -> Result<PythPrice, PriceServiceError> {
        let feeds: Vec<PriceFeedResponse> = self
            .get("api/latest_price_feeds", &ids_query(&[id]))
            .await?;
        feeds
            .into_iter()
            .find(|f| f.id.trim_start_matches("0x").eq_ignore_ascii_case(&feed_id_param(&id)))
            .ok_or(PriceServiceError::UnknownFeed(id))
            .and_then(|f| parse_price(id, f.price))
    }
}

fn feed_id_param(id: &PriceFeedId) -> String {
    hex::encode(id)
}

fn ids_query(ids: &[PriceFeedId]) -> Vec<(&'static str, String)> {
    ids.iter().map(|id| ("ids[]", feed_id_param(id))).collect()
}

fn decode_vaa(vaa: &str) -> Result<Bytes, PriceServiceError> {
    BASE64_STANDARD
        .decode(vaa)
        .map(Bytes::from)
        .map_err(|e| PriceServiceError::Malformed(format!("invalid VAA encoding: {e}")))
}

fn parse_price(feed_id: PriceFeedId, price: PriceResponse) -> Result<PythPrice, PriceServiceError> {
    Ok(PythPrice {
        feed_id,
        price: price
            .price
            .parse()
            .map_err(|_| PriceServiceError::Malformed(format!("invalid price: {}", price.price)))?,
        conf: price
            .conf
            .parse()
            .map_err(|_| PriceServiceError::Malformed(format!("invalid conf: {}", price.conf)))?,
        expo: price.expo,
        publish_time: price.publish_time,
    })
}

#[cfg(test)]
mod tests {
    use alloy::primitives::b256;

    use super::*;

    const ETH_USD: PriceFeedId =
        b256!("0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace");

    #[test]
    fn test_ids_query_keeps_order_without_prefix() {
        let btc = b256!("0xe62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43");
        assert_eq!(
            ids_query(&[ETH_USD, btc]),
            vec![
                (
                    "ids[]",
                    "ff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace".to_string()
                ),
                (
                    "ids[]",
                    "e62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_decode_vaa() {
        assert_eq!(
            decode_vaa("UE5BVQEAAAAD").unwrap(),
            Bytes::from_static(&[0x50, 0x4e, 0x41, 0x55, 0x01, 0x00, 0x00, 0x00, 0x03])
        );
        assert!(matches!(
            decode_vaa("not base64!"),
            Err(PriceServiceError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_price_feed_response() {
        let feeds: Vec<PriceFeedResponse> = serde_json::from_str(
            r#"[{
                "id": "ff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace",
                "price": {"price": "345012345678", "conf": "150000000", "expo": -8, "publish_time": 1717000000},
                "ema_price": {"price": "344900000000", "conf": "140000000", "expo": -8, "publish_time": 1717000000}
            }]"#,
        )
        .unwrap();
        let feed = feeds.into_iter().next().unwrap();
        assert_eq!(feed.id, feed_id_param(&ETH_USD));

        let price = parse_price(ETH_USD, feed.price).unwrap();
        assert_eq!(price.price, 345012345678);
        assert_eq!(price.conf, 150000000);
        assert_eq!(price.expo, -8);
        assert_eq!(price.publish_time, 1717000000);
    }

    #[test]
    fn test_parse_vaa_response() {
        let resp: VaaResponse =
            serde_json::from_str(r#"{"vaa": "UE5BVQEAAAAD", "publishTime": 1717000123}"#).unwrap();
        assert_eq!(resp.publish_time, 1717000123);
        assert_eq!(decode_vaa(&resp.vaa).unwrap().len(), 9);
    }

    #[test]
    fn test_default_endpoint() {
        let hermes = Hermes::default();
        assert_eq!(
            hermes.base_url().join("api/latest_vaas").unwrap().as_str(),
            "https://hermes.pyth.network/api/latest_vaas"
        );
    }

    #[tokio::test]
    #[ignore = "requires access to the public price service"]
    async fn test_fetch_latest_update_data() {
        let hermes = Hermes::default();
        let updates = hermes.latest_update_data(&[ETH_USD]).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].starts_with(b"PNAU"));

        let price = hermes.latest_price(ETH_USD).await.unwrap();
        assert!(price.price > 0);
    }
}
