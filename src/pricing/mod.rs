use anyhow::{anyhow, Context};
use async_trait::async_trait;
use log::warn;
use reqwest::Url;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Price and nutrition record for one product, as served by the remote
/// store. Every field defaults to zero when the record or field is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub price: Decimal,
    #[serde(default, rename = "Fats")]
    pub fats: Decimal,
    #[serde(default, rename = "Proteins")]
    pub proteins: Decimal,
    #[serde(default, rename = "Carbohydrates")]
    pub carbohydrates: Decimal,
}

/// Keyed lookup against the remote price/nutrition store.
///
/// Fail-open contract: a lookup never errors and never retries. Network or
/// decode failures yield an all-zero record so cart progress is never
/// blocked on the store.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn lookup(&self, name: &str) -> ProductInfo;
}

pub struct HttpPriceOracle {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPriceOracle {
    pub fn new(base_url: String, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        let base_url = Url::parse(&base_url).context("invalid price store base url")?;
        Ok(Self { client, base_url })
    }

    /// Product names are free-form labels; they go into the URL as one
    /// percent-encoded path segment.
    fn record_url(&self, name: &str) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("price store base url cannot hold path segments"))?
            .push(name);
        Ok(url)
    }

    async fn fetch(&self, name: &str) -> anyhow::Result<ProductInfo> {
        let url = self.record_url(name)?;
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn lookup(&self, name: &str) -> ProductInfo {
        match self.fetch(name).await {
            Ok(info) => info,
            Err(err) => {
                warn!("price lookup failed for {name}, pricing at zero: {err}");
                ProductInfo::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn record_decodes_store_field_names() {
        let info: ProductInfo = serde_json::from_str(
            r#"{"price": "1.50", "Fats": "0.2", "Proteins": "0.3", "Carbohydrates": "14"}"#,
        )
        .unwrap();
        assert_eq!(info.price, dec!(1.50));
        assert_eq!(info.fats, dec!(0.2));
        assert_eq!(info.proteins, dec!(0.3));
        assert_eq!(info.carbohydrates, dec!(14));
    }

    #[test]
    fn missing_fields_decode_to_zero() {
        let info: ProductInfo = serde_json::from_str(r#"{"price": "2.00"}"#).unwrap();
        assert_eq!(info.price, dec!(2.00));
        assert_eq!(info.fats, Decimal::ZERO);
        assert_eq!(info.proteins, Decimal::ZERO);
        assert_eq!(info.carbohydrates, Decimal::ZERO);
    }

    #[test]
    fn empty_record_is_all_zero() {
        let info: ProductInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(info, ProductInfo::default());
    }

    #[test]
    fn awkward_product_names_are_encoded_into_the_url() {
        let oracle = HttpPriceOracle::new(
            "http://localhost:8089/prices".into(),
            Duration::from_secs(1),
        )
        .unwrap();

        assert_eq!(
            oracle.record_url("red apple").unwrap().as_str(),
            "http://localhost:8089/prices/red%20apple"
        );
        assert_eq!(
            oracle.record_url("half/half").unwrap().as_str(),
            "http://localhost:8089/prices/half%2Fhalf"
        );
    }
}
