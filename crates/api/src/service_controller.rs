use std::sync::Arc;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::debug;
use serde::Deserialize;
use serde_json::json;

use gas_engine::{
    polling_interval, ApprovalTransactionBuilder, FiatGasPriceFormatter, GasBreakdownRequest,
    GasBreakdownService, GasFeeSource, GasSpeed, TokenPriceProvider, TransactionRequest,
};

#[derive(Debug, Deserialize)]
pub struct GasFeeQuery {
    #[serde(default)]
    pub speed: GasSpeed,
}

#[derive(Debug, Deserialize)]
pub struct PollingIntervalQuery {
    pub chain_id: Option<u64>,
}

pub struct ServiceController<Source, PriceProvider, Builder> {
    gas_service: Arc<GasBreakdownService<Source, PriceProvider, Builder>>,
}

impl<Source, PriceProvider, Builder> ServiceController<Source, PriceProvider, Builder>
where
    Source: GasFeeSource + 'static,
    PriceProvider: TokenPriceProvider + 'static,
    Builder: ApprovalTransactionBuilder + 'static,
{
    pub fn new(gas_service: Arc<GasBreakdownService<Source, PriceProvider, Builder>>) -> Self {
        Self { gas_service }
    }

    pub fn router(self) -> Router {
        let gas_service = self.gas_service;

        Router::new()
            .route("/", get(Self::status))
            .route("/api/health", get(Self::status))
            .route(
                "/api/gas_fee",
                post({
                    let gas_service = gas_service.clone();
                    move |Query(query): Query<GasFeeQuery>,
                          Json(transaction): Json<TransactionRequest>| async move {
                        Self::get_gas_fee(gas_service.clone(), query, transaction).await
                    }
                }),
            )
            .route(
                "/api/gas_breakdown",
                post({
                    let gas_service = gas_service.clone();
                    move |Json(payload): Json<GasBreakdownRequest>| async move {
                        Self::get_gas_breakdown(gas_service.clone(), payload).await
                    }
                }),
            )
            .route(
                "/api/polling_interval",
                get({
                    let gas_service = gas_service.clone();
                    move |Query(query): Query<PollingIntervalQuery>| async move {
                        Self::get_polling_interval(gas_service.clone(), query).await
                    }
                }),
            )
    }

    /// Health check endpoint
    pub async fn status() -> impl IntoResponse {
        let response = json!({
            "message": "Service is running...",
            "status": "ok"
        });
        (StatusCode::OK, Json(response))
    }

    /// Gas fee of a transaction at the requested speed, `null` while unknown
    pub async fn get_gas_fee(
        gas_service: Arc<GasBreakdownService<Source, PriceProvider, Builder>>,
        query: GasFeeQuery,
        transaction: TransactionRequest,
    ) -> impl IntoResponse {
        debug!("Gas fee requested at speed {}", query.speed);

        let result = gas_service.get_gas_fee(&transaction, query.speed).await;
        (StatusCode::OK, Json(json!({ "result": result })))
    }

    /// Approval and swap gas in USD, formatted for display
    pub async fn get_gas_breakdown(
        gas_service: Arc<GasBreakdownService<Source, PriceProvider, Builder>>,
        payload: GasBreakdownRequest,
    ) -> impl IntoResponse {
        let breakdown = gas_service.get_gas_breakdown(&payload).await;
        let formatted = breakdown.format(&FiatGasPriceFormatter);

        let response = json!({
            "total": formatted.total,
            "approvalEstimate": formatted.approval_estimate,
            "swapEstimate": formatted.swap_estimate,
            "approvalPending": breakdown.approval_pending,
        });
        (StatusCode::OK, Json(response))
    }

    pub async fn get_polling_interval(
        gas_service: Arc<GasBreakdownService<Source, PriceProvider, Builder>>,
        query: PollingIntervalQuery,
    ) -> impl IntoResponse {
        let interval = polling_interval(gas_service.config(), query.chain_id);
        (StatusCode::OK, Json(json!({ "intervalMs": interval.as_millis() as u64 })))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use config::get_sample_config;
    use gas_engine::{
        Erc20ApprovalBuilder, GasBreakdownService, GasFeeResponse, GasFeeSource,
        TokenPriceProvider, TransactionRequest,
    };

    use super::ServiceController;

    #[derive(Debug, Default)]
    struct StaticSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GasFeeSource for StaticSource {
        type Error = std::fmt::Error;

        async fn fetch_gas_fee(
            &self,
            _: &TransactionRequest,
        ) -> Result<GasFeeResponse, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::from_value(json!({
                "type": "legacy",
                "gasPrice": { "normal": "10000000000", "fast": "20000000000", "urgent": "25000000000" },
                "gasLimit": "50000",
                "gasFee": { "normal": "500000000000000", "fast": "1000000000000000", "urgent": "1250000000000000" }
            }))
            .unwrap())
        }
    }

    #[derive(Debug)]
    struct FixedPrice;

    #[async_trait]
    impl TokenPriceProvider for FixedPrice {
        type Error = std::fmt::Error;

        async fn get_token_price(&self, _: &String) -> Result<f64, Self::Error> {
            Ok(2000.0)
        }
    }

    async fn serve() -> (String, Arc<StaticSource>) {
        let source = Arc::new(StaticSource::default());
        let service = GasBreakdownService::new(
            Arc::new(get_sample_config()),
            source.clone(),
            Arc::new(FixedPrice),
            Erc20ApprovalBuilder,
        );
        let router = ServiceController::new(Arc::new(service)).router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{}", addr), source)
    }

    #[tokio::test]
    async fn test_health() {
        let (base_url, _) = serve().await;

        let response: Value =
            reqwest::get(format!("{}/api/health", base_url)).await.unwrap().json().await.unwrap();

        assert_eq!(response["status"], "ok");
    }

    #[tokio::test]
    async fn test_gas_fee_at_requested_speed() {
        let (base_url, _) = serve().await;

        let response: Value = reqwest::Client::new()
            .post(format!("{}/api/gas_fee?speed=fast", base_url))
            .json(&json!({ "to": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "chainId": 1 }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["result"]["type"], "legacy");
        assert_eq!(response["result"]["speed"], "fast");
        assert_eq!(response["result"]["gasFee"], "1000000000000000");
        assert_eq!(response["result"]["params"]["gasPrice"], "20000000000");
    }

    #[tokio::test]
    async fn test_gas_breakdown_with_approval() {
        let (base_url, source) = serve().await;

        let response: Value = reqwest::Client::new()
            .post(format!("{}/api/gas_breakdown", base_url))
            .json(&json!({
                "chainId": 1,
                "trade": {
                    "inputToken": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
                    "gasUseEstimateUSD": "3.75"
                },
                "allowance": { "state": "required", "needsPermit2Approval": true }
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["total"], "$6.25");
        assert_eq!(response["approvalEstimate"], "$2.50");
        assert_eq!(response["swapEstimate"], "$3.75");
        assert_eq!(response["approvalPending"], false);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gas_breakdown_without_approval() {
        let (base_url, source) = serve().await;

        let response: Value = reqwest::Client::new()
            .post(format!("{}/api/gas_breakdown", base_url))
            .json(&json!({
                "chainId": 1,
                "trade": { "gasUseEstimateUSD": "3.75" }
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["total"], "$3.75");
        assert_eq!(response["approvalEstimate"], Value::Null);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_polling_interval() {
        let (base_url, _) = serve().await;

        let l2: Value = reqwest::get(format!("{}/api/polling_interval?chain_id=42161", base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let l1: Value = reqwest::get(format!("{}/api/polling_interval?chain_id=1", base_url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(l2["intervalMs"], 3000);
        assert_eq!(l1["intervalMs"], 12000);
    }
}
