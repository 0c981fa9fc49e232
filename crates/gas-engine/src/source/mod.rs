use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::types::{GasFeeResponse, TransactionRequest};

pub use gas_api::{GasFeeClient, GasFeeClientError};

mod gas_api;

/// Remote fee schedule provider, one request per transaction descriptor.
#[async_trait]
pub trait GasFeeSource: Debug + Send + Sync {
    type Error: Error + Debug + Send + Sync + 'static;

    async fn fetch_gas_fee(
        &self,
        transaction: &TransactionRequest,
    ) -> Result<GasFeeResponse, Self::Error>;
}
