use async_trait::async_trait;
use log::{debug, error};
use reqwest::{header, StatusCode};
use thiserror::Error;

use config::GasApiConfig;

use crate::source::GasFeeSource;
use crate::types::{GasFeeResponse, TransactionRequest};

#[derive(Debug, Clone)]
pub struct GasFeeClient {
    client: reqwest::Client,
    base_url: String,
}

impl GasFeeClient {
    pub fn new(GasApiConfig { base_url, api_key, .. }: &GasApiConfig) -> Result<Self, GasFeeClientError> {
        let mut headers = header::HeaderMap::new();
        if let Some(api_key) = api_key {
            headers.insert("x-api-key", header::HeaderValue::from_str(api_key)?);
        }

        Ok(GasFeeClient {
            client: reqwest::Client::builder().default_headers(headers).build()?,
            base_url: base_url.clone(),
        })
    }
}

#[async_trait]
impl GasFeeSource for GasFeeClient {
    type Error = GasFeeClientError;

    async fn fetch_gas_fee(
        &self,
        transaction: &TransactionRequest,
    ) -> Result<GasFeeResponse, Self::Error> {
        debug!("Fetching gas fee for transaction {:?}", transaction);

        let response = self.client.post(&self.base_url).json(transaction).send().await?;

        if response.status() != StatusCode::OK {
            error!("Gas fee request failed with status: {}", response.status());
            return Err(GasFeeClientError::RequestFailed(response.status()));
        }

        let raw_text = response.text().await?;

        serde_json::from_str(&raw_text)
            .map_err(|err| GasFeeClientError::DeserializationError(raw_text, err))
    }
}

#[derive(Debug, Error)]
pub enum GasFeeClientError {
    #[error("Invalid gas API key header: {0}")]
    InvalidApiKey(#[from] header::InvalidHeaderValue),

    #[error("Error while making request: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Gas fee request failed with status {0}")]
    RequestFailed(StatusCode),

    #[error("Deserialization Error - Original String {0}, Error {1}")]
    DeserializationError(String, serde_json::Error),
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use alloy::primitives::{address, U256};
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use config::GasApiConfig;

    use crate::source::{GasFeeClient, GasFeeClientError, GasFeeSource};
    use crate::types::{FeeType, GasSpeed, TransactionRequest};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1/gas-fee", addr)
    }

    fn client(base_url: String, api_key: Option<&str>) -> GasFeeClient {
        GasFeeClient::new(&GasApiConfig {
            base_url,
            api_key: api_key.map(str::to_string),
            approval_wait_ms: 2_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_transaction_and_parses_schedule() {
        let received: Arc<Mutex<Option<(Value, Option<String>)>>> = Arc::new(Mutex::new(None));
        let sink = received.clone();

        let router = Router::new().route(
            "/v1/gas-fee",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    let api_key =
                        headers.get("x-api-key").map(|v| v.to_str().unwrap().to_string());
                    *sink.lock().unwrap() = Some((body, api_key));
                    Json(json!({
                        "type": "eip1559",
                        "maxFeePerGas": { "normal": "10", "fast": "20", "urgent": "30" },
                        "maxPriorityFeePerGas": { "normal": "1", "fast": "2", "urgent": "3" },
                        "gasLimit": "50000",
                        "gasFee": { "normal": "500000", "fast": "1000000", "urgent": "1500000" }
                    }))
                }
            }),
        );
        let client = client(serve(router).await, Some("secret"));

        let transaction = TransactionRequest {
            to: Some(address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")),
            data: Some(vec![0x09, 0x5e, 0xa7, 0xb3].into()),
            value: Some(U256::ZERO),
            chain_id: Some(1),
            ..Default::default()
        };
        let response = client.fetch_gas_fee(&transaction).await.unwrap();

        assert_eq!(response.fee_type(), FeeType::Eip1559);
        assert_eq!(response.gas_fee().get(GasSpeed::Fast), U256::from(1_000_000));

        let (body, api_key) = received.lock().unwrap().clone().unwrap();
        assert_eq!(api_key.as_deref(), Some("secret"));
        assert_eq!(body["chainId"], 1);
        assert_eq!(body["data"], "0x095ea7b3");
        assert_eq!(
            body["to"].as_str().unwrap().to_lowercase(),
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
        assert!(body.get("from").is_none());
    }

    #[tokio::test]
    async fn test_non_ok_status_is_an_error() {
        let router = Router::new().route(
            "/v1/gas-fee",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let client = client(serve(router).await, None);

        let err = client.fetch_gas_fee(&TransactionRequest::default()).await.unwrap_err();

        assert!(matches!(err, GasFeeClientError::RequestFailed(status) if status.as_u16() == 502));
    }

    #[tokio::test]
    async fn test_malformed_schedule_keeps_raw_body() {
        let router = Router::new()
            .route("/v1/gas-fee", post(|| async { Json(json!({ "type": "eip1559" })) }));
        let client = client(serve(router).await, None);

        let err = client.fetch_gas_fee(&TransactionRequest::default()).await.unwrap_err();

        match err {
            GasFeeClientError::DeserializationError(raw, _) => assert!(raw.contains("eip1559")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
