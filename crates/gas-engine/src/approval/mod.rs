use std::error::Error;
use std::fmt::Debug;

use alloy::primitives::{address, Address, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use config::Config;

use crate::source::GasFeeSource;
use crate::state::EstimateState;
use crate::token_price::{utils, TokenPriceProvider};
use crate::types::{GasSpeed, TransactionGasFeeInfo, TransactionRequest};

mod abi;

/// Allowance-management contract swaps pull input tokens through.
pub const PERMIT2_ADDRESS: Address = address!("000000000022D473030F116dDEE9F6B43aC78BA3");

/// Approvals are always quoted at the fastest tier.
pub const APPROVAL_GAS_SPEED: GasSpeed = GasSpeed::Urgent;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AllowanceState {
    Loading,
    Required,
    Allowed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Allowance {
    pub state: AllowanceState,
    #[serde(default)]
    pub needs_permit2_approval: bool,
}

pub fn needs_approval_transaction(allowance: Option<&Allowance>) -> bool {
    matches!(
        allowance,
        Some(Allowance { state: AllowanceState::Required, needs_permit2_approval: true })
    )
}

#[async_trait]
pub trait ApprovalTransactionBuilder: Debug + Send + Sync {
    type Error: Error + Debug + Send + Sync + 'static;

    async fn build_approval(
        &self,
        token: Option<Address>,
        spender: Address,
        amount: U256,
    ) -> Result<TransactionRequest, Self::Error>;
}

/// Encodes `approve(spender, amount)` locally, no provider round trip needed.
#[derive(Debug, Default, Clone)]
pub struct Erc20ApprovalBuilder;

#[async_trait]
impl ApprovalTransactionBuilder for Erc20ApprovalBuilder {
    type Error = ApprovalTransactionError;

    async fn build_approval(
        &self,
        token: Option<Address>,
        spender: Address,
        amount: U256,
    ) -> Result<TransactionRequest, Self::Error> {
        let token = token.ok_or(ApprovalTransactionError::NativeCurrency)?;
        let calldata = abi::IERC20::approveCall { spender, amount }.abi_encode();

        Ok(TransactionRequest {
            to: Some(token),
            data: Some(calldata.into()),
            value: Some(U256::ZERO),
            ..Default::default()
        })
    }
}

#[derive(Debug, Error)]
pub enum ApprovalTransactionError {
    #[error("The native currency cannot be approved")]
    NativeCurrency,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalFee {
    pub fee_info: TransactionGasFeeInfo,
    pub fee_usd: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalFeeRequest {
    pub chain_id: u32,
    // None when the trade spends the native currency
    pub input_token: Option<Address>,
    pub allowance: Option<Allowance>,
}

#[derive(Debug)]
pub struct ApprovalFeeEstimator<'a, Source, PriceProvider, Builder> {
    config: &'a Config,
    source: &'a Source,
    price_provider: &'a PriceProvider,
    builder: &'a Builder,
}

impl<'a, Source, PriceProvider, Builder> ApprovalFeeEstimator<'a, Source, PriceProvider, Builder>
where
    Source: GasFeeSource,
    PriceProvider: TokenPriceProvider,
    Builder: ApprovalTransactionBuilder,
{
    pub fn new(
        config: &'a Config,
        source: &'a Source,
        price_provider: &'a PriceProvider,
        builder: &'a Builder,
    ) -> Self {
        ApprovalFeeEstimator { config, source, price_provider, builder }
    }

    /// Resolves the approval fee, or `Unavailable` when no approval is needed
    /// or any step fails. Nothing is fetched when no approval is needed.
    pub async fn estimate(&self, request: &ApprovalFeeRequest) -> EstimateState<ApprovalFee> {
        if !needs_approval_transaction(request.allowance.as_ref()) {
            debug!("No approval transaction needed on chain {}", request.chain_id);
            return EstimateState::Unavailable;
        }

        let transaction = match self
            .builder
            .build_approval(request.input_token, PERMIT2_ADDRESS, U256::MAX)
            .await
        {
            Ok(transaction) => transaction.with_chain_id(request.chain_id as u64),
            Err(err) => {
                error!("Failed to build approval transaction: {}", err);
                return EstimateState::Unavailable;
            }
        };

        let response = match self.source.fetch_gas_fee(&transaction).await {
            Ok(response) => response,
            Err(err) => {
                error!("Failed to fetch approval gas fee: {}", err);
                return EstimateState::Unavailable;
            }
        };

        let fee_info = response.select(APPROVAL_GAS_SPEED);
        let fee_usd = match utils::get_native_amount_in_usd(
            self.config,
            self.price_provider,
            request.chain_id,
            fee_info.gas_fee,
        )
        .await
        {
            Ok(fee_usd) => fee_usd,
            Err(err) => {
                error!("Failed to convert approval gas fee to USD: {}", err);
                return EstimateState::Unavailable;
            }
        };

        info!(
            "Approval gas fee on chain {}: {} wei ({} USD)",
            request.chain_id, fee_info.gas_fee, fee_usd
        );

        EstimateState::Resolved(ApprovalFee { fee_info, fee_usd })
    }
}
