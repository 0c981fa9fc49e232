use std::sync::Arc;

use log::{debug, error};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::timeout;

use config::Config;

use crate::approval::{
    needs_approval_transaction, Allowance, ApprovalFeeEstimator, ApprovalFeeRequest,
    ApprovalTransactionBuilder,
};
use crate::breakdown::{aggregate, GasBreakdown, TradeGasInput};
use crate::memo::Memo;
use crate::source::GasFeeSource;
use crate::state::EstimateState;
use crate::token_price::TokenPriceProvider;
use crate::types::{GasSpeed, TransactionGasFeeInfo, TransactionRequest};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GasBreakdownRequest {
    pub chain_id: u32,
    pub trade: TradeGasInput,
    #[serde(default)]
    pub allowance: Option<Allowance>,
}

type BreakdownKey = (EstimateState<f64>, bool, TradeGasInput);

// Approval fee that outlived the caller waiting for it, keyed by its request
type ApprovalSlot = Option<(ApprovalFeeRequest, EstimateState<f64>)>;

/// Gas fee quotes and swap gas breakdowns
#[derive(Debug)]
pub struct GasBreakdownService<Source, PriceProvider, Builder> {
    config: Arc<Config>,
    source: Arc<Source>,
    price_provider: Arc<PriceProvider>,
    approval_builder: Arc<Builder>,
    approval: Arc<Mutex<ApprovalSlot>>,
    breakdowns: Mutex<Memo<BreakdownKey, GasBreakdown>>,
}

impl<Source, PriceProvider, Builder> GasBreakdownService<Source, PriceProvider, Builder>
where
    Source: GasFeeSource + 'static,
    PriceProvider: TokenPriceProvider + 'static,
    Builder: ApprovalTransactionBuilder + 'static,
{
    pub fn new(
        config: Arc<Config>,
        source: Arc<Source>,
        price_provider: Arc<PriceProvider>,
        approval_builder: Builder,
    ) -> Self {
        GasBreakdownService {
            config,
            source,
            price_provider,
            approval_builder: Arc::new(approval_builder),
            approval: Arc::new(Mutex::new(None)),
            breakdowns: Mutex::new(Memo::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    /// One-shot quote, `None` when the pricing service has nothing for us.
    pub async fn get_gas_fee(
        &self,
        transaction: &TransactionRequest,
        speed: GasSpeed,
    ) -> Option<TransactionGasFeeInfo> {
        match self.source.fetch_gas_fee(transaction).await {
            Ok(response) => Some(response.select(speed)),
            Err(err) => {
                error!("Failed to fetch gas fee: {}", err);
                None
            }
        }
    }

    /// Breakdown of the swap's gas cost. An approval fee that does not settle
    /// within `gas_api.approval_wait_ms` is reported as pending and left out of
    /// the total; a later call for the same inputs picks it up.
    pub async fn get_gas_breakdown(&self, request: &GasBreakdownRequest) -> GasBreakdown {
        let needs_approval = needs_approval_transaction(request.allowance.as_ref());

        let approval_usd = if needs_approval {
            self.approval_estimate(ApprovalFeeRequest {
                chain_id: request.chain_id,
                input_token: request.trade.input_token,
                allowance: request.allowance,
            })
            .await
        } else {
            EstimateState::Unavailable
        };

        let key = (approval_usd, needs_approval, request.trade.clone());
        let mut breakdowns = self.breakdowns.lock().await;
        if breakdowns.is_cached(&key) {
            debug!("Reusing gas breakdown for unchanged inputs");
        }

        breakdowns.get_or_compute(key, |(approval_usd, needs_approval, trade)| {
            aggregate(approval_usd, *needs_approval, trade)
        })
    }

    async fn approval_estimate(&self, request: ApprovalFeeRequest) -> EstimateState<f64> {
        {
            let mut slot = self.approval.lock().await;
            let settled = match slot.as_ref() {
                Some((in_flight, state)) if *in_flight == request => Some(state.clone()),
                _ => None,
            };

            match settled {
                Some(state) if state.is_pending() => {
                    debug!("Approval fee on chain {} still in flight", request.chain_id);
                    return EstimateState::Loading;
                }
                Some(state) => {
                    *slot = None;
                    return state;
                }
                None => *slot = Some((request, EstimateState::Loading)),
            }
        }

        let mut handle = tokio::spawn({
            let config = self.config.clone();
            let source = self.source.clone();
            let price_provider = self.price_provider.clone();
            let builder = self.approval_builder.clone();
            let approval = self.approval.clone();

            async move {
                let state = ApprovalFeeEstimator::new(
                    &config,
                    source.as_ref(),
                    price_provider.as_ref(),
                    builder.as_ref(),
                )
                .estimate(&request)
                .await
                .map(|fee| fee.fee_usd);

                let mut slot = approval.lock().await;
                if matches!(slot.as_ref(), Some((in_flight, _)) if *in_flight == request) {
                    *slot = Some((request, state.clone()));
                }
                state
            }
        });

        let state = match timeout(self.config.gas_api.approval_wait(), &mut handle).await {
            Ok(Ok(state)) => state,
            Ok(Err(err)) => {
                error!("Approval fee task failed: {}", err);
                EstimateState::Unavailable
            }
            Err(_) => {
                debug!("Approval fee on chain {} not settled yet", request.chain_id);
                return EstimateState::Loading;
            }
        };

        let mut slot = self.approval.lock().await;
        if matches!(slot.as_ref(), Some((in_flight, _)) if *in_flight == request) {
            *slot = None;
        }
        state
    }
}
