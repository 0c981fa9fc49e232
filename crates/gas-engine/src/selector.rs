use alloy::primitives::U256;

use crate::types::{FeeType, GasFeeResponse, GasParams, GasSpeed, SpeedMap, TransactionGasFeeInfo};

impl GasFeeResponse {
    pub fn fee_type(&self) -> FeeType {
        match self {
            GasFeeResponse::Eip1559 { .. } => FeeType::Eip1559,
            GasFeeResponse::Legacy { .. } => FeeType::Legacy,
        }
    }

    pub fn gas_limit(&self) -> U256 {
        match self {
            GasFeeResponse::Eip1559 { gas_limit, .. } | GasFeeResponse::Legacy { gas_limit, .. } => {
                *gas_limit
            }
        }
    }

    /// Total fee per speed, in the chain's base unit.
    pub fn gas_fee(&self) -> &SpeedMap {
        match self {
            GasFeeResponse::Eip1559 { gas_fee, .. } | GasFeeResponse::Legacy { gas_fee, .. } => {
                gas_fee
            }
        }
    }

    /// Projects the schedule onto the fields needed to submit at `speed`.
    pub fn select(&self, speed: GasSpeed) -> TransactionGasFeeInfo {
        let params = match self {
            GasFeeResponse::Eip1559 {
                max_fee_per_gas, max_priority_fee_per_gas, gas_limit, ..
            } => GasParams::Eip1559 {
                max_priority_fee_per_gas: max_priority_fee_per_gas.get(speed),
                max_fee_per_gas: max_fee_per_gas.get(speed),
                gas_limit: *gas_limit,
            },
            GasFeeResponse::Legacy { gas_price, gas_limit, .. } => {
                GasParams::Legacy { gas_price: gas_price.get(speed), gas_limit: *gas_limit }
            }
        };

        TransactionGasFeeInfo {
            fee_type: self.fee_type(),
            speed,
            gas_fee: self.gas_fee().get(speed),
            params,
        }
    }
}

/// An absent schedule means the fee is still pending or was never requested.
pub fn select_gas_fee(
    response: Option<&GasFeeResponse>,
    speed: GasSpeed,
) -> Option<TransactionGasFeeInfo> {
    response.map(|response| response.select(speed))
}
