use std::collections::HashMap;
use std::ops::Deref;
use std::time::Duration;

use derive_more::{Display, From, Into};
use serde::Deserialize;
use serde_valid::yaml::FromYamlStr;
use serde_valid::{UniqueItemsError, Validate, ValidateUniqueItems};

// Config Type
#[derive(Debug)]
pub struct Config {
    // List of all chains and their configurations.
    pub chains: HashMap<u32, ChainConfig>,
    // List of all tokens and their configurations.
    pub tokens: HashMap<String, TokenConfig>,
    // Gas pricing API configuration
    pub gas_api: GasApiConfig,
    // Polling cadence of the gas pricing API
    pub polling: PollingConfig,
    // CoinGecko API configuration
    pub coingecko: CoinGeckoConfig,
    // Infra Dependencies
    pub infra: InfraConfig,
    // API Server Configuration
    pub server: ServerConfig,
}

impl Config {
    pub fn from_file(file_path: &str) -> Result<Self, ConfigError> {
        let config_file_content = std::fs::read_to_string(file_path)?;
        Self::from_yaml_str(&config_file_content)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let raw_config = RawConfig::from_yaml_str(s)?;
        let mut chains = HashMap::new();
        for chain in raw_config.chains.0 {
            chains.insert(chain.id, chain);
        }

        fn verify_chain(
            chain_id: u32,
            chains: &HashMap<u32, ChainConfig>,
        ) -> Result<(), ConfigError> {
            if let Some(chain) = chains.get(&chain_id) {
                if !chain.is_enabled {
                    return Err(ConfigError::ChainNotSupported(chain_id));
                }
            } else {
                return Err(ConfigError::ChainNotFound(chain_id));
            }
            Ok(())
        }

        let mut tokens = HashMap::new();

        // Validate chains in the token configuration
        for token in raw_config.tokens.0 {
            for chain_id in token.by_chain.keys() {
                verify_chain(*chain_id, &chains)?;
            }

            tokens.insert(token.symbol.clone(), token);
        }

        // Every enabled chain must be able to price its own gas
        for chain in chains.values().filter(|chain| chain.is_enabled) {
            match tokens.get(&chain.native_token) {
                Some(token) if token.by_chain.contains_key(&chain.id) => {}
                Some(_) => {
                    return Err(ConfigError::TokenNotFoundOnChain(
                        chain.native_token.clone(),
                        chain.id,
                    ))
                }
                None => return Err(ConfigError::TokenNotFound(chain.native_token.clone())),
            }
        }

        Ok(Config {
            chains,
            tokens,
            gas_api: raw_config.gas_api,
            polling: raw_config.polling,
            coingecko: raw_config.coingecko,
            infra: raw_config.infra,
            server: raw_config.server,
        })
    }

    pub fn is_l2_chain(&self, chain_id: u32) -> bool {
        self.chains.get(&chain_id).map(|chain| chain.is_l2).unwrap_or(false)
    }

    pub fn native_token(&self, chain_id: u32) -> Option<&TokenConfig> {
        let chain = self.chains.get(&chain_id)?;
        self.tokens.get(&chain.native_token)
    }
}

#[derive(Debug, From, Display)]
pub enum ConfigError {
    #[display("Chain not supported: {}", _0)]
    #[from(ignore)]
    ChainNotSupported(u32),

    #[display("Chain not found: {}", _0)]
    #[from(ignore)]
    ChainNotFound(u32),

    #[display("Token not found: {}", _0)]
    #[from(ignore)]
    TokenNotFound(String),

    #[display("Token not found: {} on chain: {}", _0, _1)]
    #[from(ignore)]
    TokenNotFoundOnChain(String, u32),

    #[display("Serde Error: {}", _0)]
    SerdeError(serde_valid::Error<serde_yaml::Error>),

    #[display("Error Reading Config File: {}", _0)]
    IoError(std::io::Error),
}

impl std::error::Error for ConfigError {}

// Intermediate Config Type as Deserialization Target
#[derive(Debug, Deserialize, From, Into)]
pub struct Chains(Vec<ChainConfig>);

impl ValidateUniqueItems for Chains {
    fn validate_unique_items(&self) -> Result<(), UniqueItemsError> {
        self.iter().map(|c| c.id).collect::<Vec<_>>().validate_unique_items()
    }
}

impl Deref for Chains {
    type Target = Vec<ChainConfig>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Deserialize, From, Into)]
pub struct TokenConfigs(Vec<TokenConfig>);

impl ValidateUniqueItems for TokenConfigs {
    fn validate_unique_items(&self) -> Result<(), UniqueItemsError> {
        self.iter().map(|t| t.symbol.clone()).collect::<Vec<_>>().validate_unique_items()
    }
}

impl Deref for TokenConfigs {
    type Target = Vec<TokenConfig>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RawConfig {
    #[validate(unique_items)]
    pub chains: Chains,
    #[validate(unique_items)]
    pub tokens: TokenConfigs,
    #[validate]
    pub gas_api: GasApiConfig,
    #[serde(default)]
    #[validate]
    pub polling: PollingConfig,
    #[validate]
    pub coingecko: CoinGeckoConfig,
    #[validate]
    pub infra: InfraConfig,
    #[validate]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct ChainConfig {
    // The chain id
    #[validate(minimum = 1)]
    pub id: u32,
    // The name of the chain
    #[validate(min_length = 1)]
    pub name: String,
    // If the chain is enabled or now
    pub is_enabled: bool,
    // Low-fee, high-throughput chains are polled faster
    #[serde(default)]
    pub is_l2: bool,
    // Symbol of the token gas is paid in, must be present in `tokens`
    #[validate(min_length = 1)]
    pub native_token: String,
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct TokenConfig {
    // The token symbol
    #[validate(min_length = 1)]
    pub symbol: String,
    // The symbol of the token in coingecko API
    #[validate(min_length = 1)]
    pub coingecko_symbol: String,
    // Whether the token across chains is supported
    pub is_enabled: bool,
    // Chain Specific Configuration
    #[validate(unique_items)]
    pub by_chain: TokenConfigByChainConfigs,
}

#[derive(Debug, Deserialize, Validate, Into, From, Clone)]
pub struct TokenConfigByChainConfigs(pub HashMap<u32, ChainSpecificTokenConfig>);

impl ValidateUniqueItems for TokenConfigByChainConfigs {
    fn validate_unique_items(&self) -> Result<(), UniqueItemsError> {
        self.keys().cloned().collect::<Vec<_>>().validate_unique_items()
    }
}

impl Deref for TokenConfigByChainConfigs {
    type Target = HashMap<u32, ChainSpecificTokenConfig>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct ChainSpecificTokenConfig {
    // The number of decimals the token has
    #[validate(minimum = 1)]
    #[validate(maximum = 18)]
    pub decimals: u8,
    // The token address on the chain
    #[validate(pattern = r"0x[a-fA-F0-9]{40}")]
    pub address: String,
    // Whether the token is supported on this chain
    pub is_enabled: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GasApiConfig {
    // The gas fee endpoint, transactions are POSTed to it as is
    #[validate(
        pattern = r"https?:\/\/(www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_\+.~#?&//=]*)"
    )]
    pub base_url: String,

    // Optional API key, sent as x-api-key
    #[serde(default)]
    pub api_key: Option<String>,

    // How long a breakdown waits for the approval fee before reporting it pending
    #[serde(default = "approval_wait_ms")]
    pub approval_wait_ms: u64,
}

fn approval_wait_ms() -> u64 {
    2_000
}

impl GasApiConfig {
    pub fn approval_wait(&self) -> Duration {
        Duration::from_millis(self.approval_wait_ms)
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct PollingConfig {
    // Refresh interval on L1 style chains, one block by default
    #[serde(default = "default_interval_ms")]
    #[validate(minimum = 100)]
    pub default_interval_ms: u64,

    // Refresh interval on chains flagged with `is_l2`
    #[serde(default = "l2_interval_ms")]
    #[validate(minimum = 100)]
    pub l2_interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    12_000
}

fn l2_interval_ms() -> u64 {
    3_000
}

impl PollingConfig {
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }

    pub fn l2_interval(&self) -> Duration {
        Duration::from_millis(self.l2_interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig { default_interval_ms: default_interval_ms(), l2_interval_ms: l2_interval_ms() }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CoinGeckoConfig {
    // The base URL of the CoinGecko API
    #[validate(
        pattern = r"https?:\/\/(www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_\+.~#?&//=]*)"
    )]
    pub base_url: String,

    // API key to access the CoinGecko API
    #[validate(min_length = 1)]
    pub api_key: String,

    // How long a fetched price stays in the cache
    #[validate(minimum = 1)]
    pub expiry_sec: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InfraConfig {
    // The URL of the Redis
    #[validate(pattern = r"redis://[-a-zA-Z0-9@:%._\+~#=]{1,256}")]
    pub redis_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ServerConfig {
    // The port the server will listen on
    #[validate(minimum = 1)]
    pub port: u16,

    // The host the server will listen on
    #[validate(min_length = 1)]
    pub host: String,
}

pub fn get_sample_config() -> Config {
    Config::from_file("../../config.yaml.example").unwrap()
}
