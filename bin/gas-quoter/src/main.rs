use std::sync::Arc;

use axum::http::Method;
use clap::Parser;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use api::ServiceController;
use config::Config;
use gas_engine::{
    polling_interval, CoingeckoClient, EstimateState, Erc20ApprovalBuilder, GasBreakdownService,
    GasFeeClient, GasFeePoller, GasSpeed, TransactionRequest,
};
use storage::RedisClient;

#[derive(Parser, Debug)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Poll the gas fee of the transaction in this JSON file instead of serving the API
    #[arg(short, long)]
    watch: Option<String>,

    /// Speed tier to report in watch mode
    #[arg(short, long, default_value = "urgent")]
    speed: GasSpeed,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    simple_logger::SimpleLogger::new().env().init().unwrap();

    let args = Args::parse();
    debug!("Args: {:?}", args);

    // Load configuration from yaml
    let config = Config::from_file(&args.config).expect("Failed to load config file");

    let result = match &args.watch {
        Some(transaction_file) => run_watch(config, transaction_file, args.speed).await,
        None => run_server(config).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: Config) -> Result<(), RunError> {
    info!("Starting Gas Quoter Server");

    let config = Arc::new(config);
    let (app_host, app_port) = (config.server.host.clone(), config.server.port);

    let redis_client = RedisClient::build(&config.infra.redis_url).await?;
    let token_price_provider = CoingeckoClient::new(&config.coingecko, Arc::new(redis_client))?;
    let gas_fee_client = GasFeeClient::new(&config.gas_api)?;

    let gas_service = GasBreakdownService::new(
        config.clone(),
        Arc::new(gas_fee_client),
        Arc::new(token_price_provider),
        Erc20ApprovalBuilder,
    );

    // API service controller
    let service_controller = ServiceController::new(Arc::new(gas_service));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods([Method::GET, Method::POST]);

    let app = service_controller.router().layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", app_host, app_port)).await?;
    info!("Listening on {}:{}", app_host, app_port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn run_watch(config: Config, transaction_file: &str, speed: GasSpeed) -> Result<(), RunError> {
    let transaction: TransactionRequest =
        serde_json::from_str(&std::fs::read_to_string(transaction_file)?)?;

    let interval = polling_interval(&config, transaction.chain_id);
    let gas_fee_client = GasFeeClient::new(&config.gas_api)?;

    let mut poller = GasFeePoller::spawn(Arc::new(gas_fee_client), Some(transaction), interval);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            state = poller.changed() => match state {
                Some(EstimateState::Resolved(_)) => {
                    if let Some(fee_info) = poller.fee_info(speed) {
                        info!(
                            "{} gas fee {} wei (limit {}, max {} wei/gas): {}",
                            speed,
                            fee_info.gas_fee,
                            fee_info.params.gas_limit(),
                            fee_info.params.max_price_per_gas(),
                            serde_json::to_string(&fee_info)?
                        );
                    }
                }
                Some(EstimateState::Unavailable) => warn!("Gas fee unavailable, retrying on next poll"),
                Some(_) => debug!("Loading gas fee"),
                None => break,
            },
            _ = &mut shutdown => break,
        }
    }

    poller.stop();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Unable to handle ctrl+c");
    };
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}

#[derive(Debug, Error)]
enum RunError {
    #[error("Failed to instantiate redis client: {0}")]
    Redis(#[from] storage::RedisClientError),

    #[error("Failed to instantiate CoinGecko client: {0}")]
    Coingecko(#[from] gas_engine::token_price::CoingeckoClientError<RedisClient>),

    #[error("Failed to instantiate gas fee client: {0}")]
    GasFeeClient(#[from] gas_engine::source::GasFeeClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid transaction file: {0}")]
    Json(#[from] serde_json::Error),
}
