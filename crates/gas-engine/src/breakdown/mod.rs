use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::state::EstimateState;

pub use format::{FeeFormatter, FiatGasPriceFormatter};

mod format;

/// The parts of a trade the gas breakdown depends on.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradeGasInput {
    // None when the trade spends the chain's native currency
    #[serde(default)]
    pub input_token: Option<Address>,
    // Swap gas cost in USD as computed by the router
    #[serde(default, rename = "gasUseEstimateUSD")]
    pub gas_use_estimate_usd: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GasBreakdown {
    pub total_usd: f64,
    pub approval_usd: Option<f64>,
    pub swap_estimate: Option<String>,
    // An approval is required but its fee has not resolved yet, `total_usd`
    // is then an undercount
    pub approval_pending: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FormattedGasBreakdown {
    pub total: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_estimate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_estimate: Option<String>,
}

/// Combines the approval fee with the swap's own estimate, both in USD.
///
/// An approval that is not required, still pending or unavailable contributes
/// nothing to the total. An unparseable swap estimate also counts as zero.
pub fn aggregate(
    approval_usd: &EstimateState<f64>,
    needs_approval: bool,
    trade: &TradeGasInput,
) -> GasBreakdown {
    let swap_usd = trade
        .gas_use_estimate_usd
        .as_deref()
        .and_then(|estimate| estimate.trim().parse::<f64>().ok())
        .filter(|estimate| estimate.is_finite())
        .unwrap_or(0.0);

    let approval = if needs_approval { approval_usd.resolved().copied() } else { None };

    GasBreakdown {
        total_usd: approval.unwrap_or(0.0) + swap_usd,
        approval_usd: approval.filter(|fee| *fee != 0.0),
        swap_estimate: trade.gas_use_estimate_usd.clone(),
        approval_pending: needs_approval && approval_usd.is_pending(),
    }
}

impl GasBreakdown {
    pub fn format(&self, formatter: &impl FeeFormatter) -> FormattedGasBreakdown {
        FormattedGasBreakdown {
            total: formatter.format_fiat(self.total_usd),
            approval_estimate: self.approval_usd.map(|fee| formatter.format_fiat(fee)),
            swap_estimate: self.swap_estimate.as_ref().map(|estimate| format!("${}", estimate)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(estimate: Option<&str>) -> TradeGasInput {
        TradeGasInput { input_token: None, gas_use_estimate_usd: estimate.map(str::to_string) }
    }

    #[test]
    fn test_combines_approval_and_swap_estimates() {
        let breakdown = aggregate(&EstimateState::Resolved(2.5), true, &trade(Some("3.75")));

        assert_eq!(breakdown.total_usd, 6.25);
        assert!(!breakdown.approval_pending);
        assert_eq!(
            breakdown.format(&FiatGasPriceFormatter),
            FormattedGasBreakdown {
                total: "$6.25".to_string(),
                approval_estimate: Some("$2.50".to_string()),
                swap_estimate: Some("$3.75".to_string()),
            }
        );
    }

    #[test]
    fn test_skipped_approval_is_absent() {
        let breakdown = aggregate(&EstimateState::Unavailable, false, &trade(Some("3.75")));

        assert_eq!(breakdown.total_usd, 3.75);
        assert_eq!(breakdown.approval_usd, None);
        assert!(!breakdown.approval_pending);
        assert_eq!(breakdown.format(&FiatGasPriceFormatter).approval_estimate, None);
    }

    #[test]
    fn test_resolved_fee_is_ignored_when_no_approval_is_needed() {
        let breakdown = aggregate(&EstimateState::Resolved(2.5), false, &trade(Some("3.75")));

        assert_eq!(breakdown.total_usd, 3.75);
        assert_eq!(breakdown.approval_usd, None);
    }

    #[test]
    fn test_unresolved_approval_contributes_nothing() {
        for state in [EstimateState::Idle, EstimateState::Loading, EstimateState::Unavailable] {
            let pending = state.is_pending();
            let breakdown = aggregate(&state, true, &trade(Some("3.75")));

            assert_eq!(breakdown.total_usd, 3.75);
            assert_eq!(breakdown.approval_usd, None);
            assert_eq!(breakdown.approval_pending, pending);

            let formatted = breakdown.format(&FiatGasPriceFormatter);
            assert_eq!(formatted.total, "$3.75");
            assert_eq!(formatted.swap_estimate.as_deref(), Some("$3.75"));
        }
    }

    #[test]
    fn test_missing_trade_estimate() {
        let breakdown = aggregate(&EstimateState::Resolved(1.2), true, &trade(None));

        assert_eq!(breakdown.total_usd, 1.2);
        assert_eq!(breakdown.swap_estimate, None);

        let formatted = breakdown.format(&FiatGasPriceFormatter);
        assert_eq!(formatted.total, "$1.20");
        assert_eq!(formatted.swap_estimate, None);
    }

    #[test]
    fn test_unparseable_trade_estimate_counts_as_zero() {
        let breakdown = aggregate(&EstimateState::Resolved(1.0), true, &trade(Some("n/a")));

        assert_eq!(breakdown.total_usd, 1.0);
        assert_eq!(breakdown.swap_estimate.as_deref(), Some("n/a"));
    }

    #[test]
    fn test_zero_approval_fee_is_not_itemized() {
        let breakdown = aggregate(&EstimateState::Resolved(0.0), true, &trade(Some("3.75")));

        assert_eq!(breakdown.total_usd, 3.75);
        assert_eq!(breakdown.approval_usd, None);
    }

    #[test]
    fn test_trade_input_deserialization() {
        let trade: TradeGasInput =
            serde_json::from_str(r#"{ "gasUseEstimateUSD": "3.75" }"#).unwrap();

        assert_eq!(trade.gas_use_estimate_usd.as_deref(), Some("3.75"));
        assert_eq!(trade.input_token, None);
    }
}
