pub use approval::{Allowance, AllowanceState, ApprovalTransactionBuilder, Erc20ApprovalBuilder};
pub use breakdown::{FeeFormatter, FiatGasPriceFormatter, FormattedGasBreakdown, GasBreakdown};
pub use poller::{polling_interval, GasFeePoller, GasFeeQuery};
pub use service::{GasBreakdownRequest, GasBreakdownService};
pub use source::{GasFeeClient, GasFeeSource};
pub use state::EstimateState;
pub use token_price::{CoingeckoClient, TokenPriceProvider};
pub use types::*;

pub mod approval;
pub mod breakdown;
pub mod memo;
pub mod poller;
pub mod selector;
pub mod service;
pub mod source;
pub mod state;
pub mod token_price;
pub mod types;

mod serde_utils;
