use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde_utils::u256;

/// A pending on-chain call, sent as is to the gas pricing service.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

impl TransactionRequest {
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GasSpeed {
    #[display("normal")]
    Normal,
    #[display("fast")]
    Fast,
    #[default]
    #[display("urgent")]
    Urgent,
}

impl FromStr for GasSpeed {
    type Err = UnknownGasSpeed;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(GasSpeed::Normal),
            "fast" => Ok(GasSpeed::Fast),
            "urgent" => Ok(GasSpeed::Urgent),
            _ => Err(UnknownGasSpeed(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown gas speed {0}, expected one of normal, fast, urgent")]
pub struct UnknownGasSpeed(String);

#[derive(Serialize, Deserialize, Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    #[display("eip1559")]
    Eip1559,
    #[display("legacy")]
    Legacy,
}

/// One value per speed tier.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedMap {
    #[serde(with = "u256")]
    pub normal: U256,
    #[serde(with = "u256")]
    pub fast: U256,
    #[serde(with = "u256")]
    pub urgent: U256,
}

impl SpeedMap {
    pub fn get(&self, speed: GasSpeed) -> U256 {
        match speed {
            GasSpeed::Normal => self.normal,
            GasSpeed::Fast => self.fast,
            GasSpeed::Urgent => self.urgent,
        }
    }
}

// POST /gas-fee
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum GasFeeResponse {
    Eip1559 {
        max_fee_per_gas: SpeedMap,
        max_priority_fee_per_gas: SpeedMap,
        #[serde(with = "u256")]
        gas_limit: U256,
        gas_fee: SpeedMap,
    },
    Legacy {
        gas_price: SpeedMap,
        #[serde(with = "u256")]
        gas_limit: U256,
        gas_fee: SpeedMap,
    },
}

/// Fields needed to submit a transaction at a given speed.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum GasParams {
    Eip1559 {
        #[serde(with = "u256")]
        max_priority_fee_per_gas: U256,
        #[serde(with = "u256")]
        max_fee_per_gas: U256,
        #[serde(with = "u256")]
        gas_limit: U256,
    },
    Legacy {
        #[serde(with = "u256")]
        gas_price: U256,
        #[serde(with = "u256")]
        gas_limit: U256,
    },
}

impl GasParams {
    pub fn gas_limit(&self) -> U256 {
        match self {
            GasParams::Eip1559 { gas_limit, .. } | GasParams::Legacy { gas_limit, .. } => *gas_limit,
        }
    }

    /// Upper bound of the per-gas price the transaction may pay.
    pub fn max_price_per_gas(&self) -> U256 {
        match self {
            GasParams::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
            GasParams::Legacy { gas_price, .. } => *gas_price,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionGasFeeInfo {
    #[serde(rename = "type")]
    pub fee_type: FeeType,
    pub speed: GasSpeed,
    #[serde(with = "u256")]
    pub gas_fee: U256,
    pub params: GasParams,
}
