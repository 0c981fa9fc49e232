use std::fmt::Debug;

use alloy::primitives::U256;
use thiserror::Error;

use crate::token_price::TokenPriceProvider;

/// Converts an amount in the token's base unit to its value in USD.
pub async fn get_value_in_usd_from_token_amount<T: TokenPriceProvider>(
    config: &config::Config,
    token_price_provider: &T,
    token_symbol: &String,
    chain_id: u32,
    token_amount: U256,
) -> Result<f64, Errors<T::Error>> {
    let token_config = config
        .tokens
        .get(token_symbol)
        .ok_or_else(|| Errors::TokenConfigurationNotFound(token_symbol.clone()))?;

    let token_config_by_chain = token_config
        .by_chain
        .get(&chain_id)
        .ok_or_else(|| Errors::TokenConfigurationNotFoundForChain(token_symbol.clone(), chain_id))?;

    if token_amount.is_zero() {
        return Ok(0.0);
    }

    let token_price = get_token_price(config, token_price_provider, token_symbol).await?;

    let token_amount =
        u128::try_from(token_amount).map_err(|_| Errors::TokenAmountOverflow(token_amount))?;

    Ok(token_amount as f64 * token_price / 10_f64.powi(token_config_by_chain.decimals as i32))
}

/// Values a fee paid in the chain's native currency in USD.
pub async fn get_native_amount_in_usd<T: TokenPriceProvider>(
    config: &config::Config,
    token_price_provider: &T,
    chain_id: u32,
    amount_in_wei: U256,
) -> Result<f64, Errors<T::Error>> {
    let native_token =
        config.native_token(chain_id).ok_or(Errors::NativeTokenNotFoundForChain(chain_id))?;

    get_value_in_usd_from_token_amount(
        config,
        token_price_provider,
        &native_token.symbol,
        chain_id,
        amount_in_wei,
    )
    .await
}

pub async fn get_token_price<T: TokenPriceProvider>(
    config: &config::Config,
    token_price_provider: &T,
    token_symbol: &String,
) -> Result<f64, Errors<T::Error>> {
    let token_config = config
        .tokens
        .get(token_symbol)
        .ok_or_else(|| Errors::TokenConfigurationNotFound(token_symbol.clone()))?;

    token_price_provider
        .get_token_price(&token_config.coingecko_symbol)
        .await
        .map_err(Errors::<T::Error>::TokenPriceProviderError)
}

#[derive(Debug, Error)]
pub enum Errors<T: Debug> {
    #[error("Token price provider error: {:?}", _0)]
    TokenPriceProviderError(#[from] T),

    #[error("Could not find token configuration for {}", _0)]
    TokenConfigurationNotFound(String),

    #[error("Could not find token configuration for {} on chain {}", _0, _1)]
    TokenConfigurationNotFoundForChain(String, u32),

    #[error("No native token configured for chain {}", _0)]
    NativeTokenNotFoundForChain(u32),

    #[error("Token amount {} does not fit in 128 bits", _0)]
    TokenAmountOverflow(U256),
}
