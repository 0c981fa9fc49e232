use std::fmt::Debug;
use std::num::ParseFloatError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use reqwest::{header, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use config::CoinGeckoConfig;
use storage::KeyValueStore;

use crate::token_price::TokenPriceProvider;

#[derive(Debug)]
pub struct CoingeckoClient<KVStore: KeyValueStore> {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<KVStore>,
    key_expiry: Duration,
}

impl<KVStore: KeyValueStore> CoingeckoClient<KVStore> {
    pub fn new(
        CoinGeckoConfig { base_url, api_key, expiry_sec }: &CoinGeckoConfig,
        cache: Arc<KVStore>,
    ) -> Result<Self, CoingeckoClientError<KVStore>> {
        let mut headers = header::HeaderMap::new();
        headers.insert("x-cg-pro-api-key", header::HeaderValue::from_str(api_key)?);

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(CoingeckoClient {
            base_url: base_url.clone(),
            client,
            cache,
            key_expiry: Duration::from_secs(*expiry_sec),
        })
    }

    async fn get_fresh_token_price(
        &self,
        token_symbol: &String,
    ) -> Result<f64, CoingeckoClientError<KVStore>> {
        info!("Fetching fresh token price for {}", token_symbol);

        let response =
            self.client.get(format!("{}/coins/{}", self.base_url, token_symbol)).send().await?;

        if response.status() != StatusCode::OK {
            error!("CoinGecko /coins/ Request failed with status: {}", response.status());
            return Err(CoingeckoClientError::RequestFailed(response.status()));
        }

        let raw_text = response.text().await?;

        let response: CoinsIdResponse = serde_json::from_str(&raw_text)
            .map_err(|err| CoingeckoClientError::DeserialisationError(raw_text, err))?;

        let result = response.market_data.current_price.usd;

        info!("Token price fetched from API for token {}: {}", token_symbol, result);

        Ok(result)
    }
}

#[async_trait]
impl<KVStore: KeyValueStore + 'static> TokenPriceProvider for CoingeckoClient<KVStore> {
    type Error = CoingeckoClientError<KVStore>;

    async fn get_token_price(&self, token_symbol: &String) -> Result<f64, Self::Error> {
        let key = format!("{}_price", token_symbol);
        let cached = self.cache.get(&key).await.map_err(CoingeckoClientError::CacheError)?;

        match cached {
            Some(result) => {
                info!("Token price for {} fetched from cache", token_symbol);

                let price: f64 = result.parse()?;
                if price.is_nan() {
                    return Err(CoingeckoClientError::InvalidPriceReturnedFromCacheResult(result));
                }
                Ok(price)
            }
            None => {
                info!("Token price for {} not found in cache", token_symbol);

                let price = self.get_fresh_token_price(token_symbol).await?;
                self.cache
                    .set(&key, &price.to_string(), self.key_expiry)
                    .await
                    .map_err(CoingeckoClientError::CacheError)?;
                Ok(price)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CoingeckoClientError<KVStore: KeyValueStore> {
    #[error("Token price cache error: {0}")]
    CacheError(KVStore::Error),

    #[error("Invalid price returned from cache: {0}")]
    InvalidPriceReturnedFromCacheResult(String),

    #[error("Invalid price returned from cache: {0}")]
    InvalidPriceReturnedFromCache(#[from] ParseFloatError),

    #[error("Invalid CoinGecko API key header: {0}")]
    InvalidApiKey(#[from] header::InvalidHeaderValue),

    #[error("Deserialization Error - Original String {0}, Error {1}")]
    DeserialisationError(String, serde_json::Error),

    #[error("CoinGecko request failed with status {0}")]
    RequestFailed(StatusCode),

    #[error("CoinGecko API call error: {0}")]
    ApiCallError(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct CoinsIdResponse {
    market_data: CoinsIdResponseMarketData,
}

#[derive(Debug, Deserialize)]
struct CoinsIdResponseMarketData {
    current_price: CoinsIdResponseMarketDataCurrentPrice,
}

#[derive(Debug, Deserialize)]
struct CoinsIdResponseMarketDataCurrentPrice {
    usd: f64,
}
