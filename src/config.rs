//! Configuration module for the launch bundler
//!
//! All settings are read once from the process environment (optionally
//! seeded from a `.env` file) into an immutable [`AppConfig`] that is passed
//! by reference to every component that needs it.

use crate::wallet::parse_keypair;
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey, pubkey::Pubkey, signature::Keypair};
use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;

/// Errors raised while reading the environment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required variable: {0}")]
    Missing(String),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Cluster the launch runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkMode {
    Main,
    Dev,
}

/// On-chain program ids that differ between clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    /// Raydium AMM v4 liquidity program
    pub amm_v4: Pubkey,
    /// OpenBook (Serum v3) market program
    pub openbook_market: Pubkey,
    /// Account receiving the pool creation fee
    pub pool_fee_destination: Pubkey,
}

impl NetworkMode {
    pub fn program_ids(&self) -> ProgramIds {
        match self {
            NetworkMode::Main => ProgramIds {
                amm_v4: pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8"),
                openbook_market: pubkey!("srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX"),
                pool_fee_destination: pubkey!("7YttLkHDoNj9wyDur5pM1ejNaAvT9X4eqaYcHQqtj2G5"),
            },
            NetworkMode::Dev => ProgramIds {
                amm_v4: pubkey!("HWy1jotHpo6UqeQxx49dpYYdQB8wj9Qk9MdxwjLvDHB8"),
                openbook_market: pubkey!("EoTcMgcDRTJVZDMZWBoU6rhYHZfkNTVEAfz3uUJRcYGj"),
                pool_fee_destination: pubkey!("3XMrhbv989VxAMi3DErLV9eJht1pHppW5LbKxe9fkEFR"),
            },
        }
    }
}

/// Descriptor of an SPL token (address, decimals, display names)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Pubkey,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
}

impl TokenInfo {
    /// Wrapped SOL, the default quote currency
    pub fn wsol() -> Self {
        Self {
            address: spl_token::native_mint::id(),
            decimals: 9,
            symbol: "WSOL".to_string(),
            name: "WSOL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub main_url: Option<String>,
    pub dev_url: String,
}

/// Block engine relay settings
pub struct RelayConfig {
    pub block_engine_url: String,
    /// Service identity the relay session is opened with
    pub auth_keypair: Arc<Keypair>,
    /// Optional `x-jito-auth` token for higher rate limits
    pub auth_uuid: Option<String>,
    /// Tip paid per bundle, in lamports
    pub tip_lamports: u64,
}

/// Timing and size limits of one bundle submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleSettings {
    /// Relay-imposed maximum number of transactions, tip included
    pub max_transactions: usize,
    /// Interval between direct signature-status polls
    pub poll_interval: Duration,
    /// Hard deadline for a confirmation verdict
    pub confirm_timeout: Duration,
    /// Pause before reporting a failed submission
    pub failure_backoff: Duration,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            max_transactions: default_max_bundle_transactions(),
            poll_interval: Duration::from_secs(2),
            confirm_timeout: Duration::from_secs(20),
            failure_backoff: Duration::from_secs(10),
        }
    }
}

/// Which launch stages run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageToggles {
    pub create_token: bool,
    pub create_market: bool,
    pub create_pool: bool,
    pub sell_after_create: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Total supply in UI units
    pub total_supply: f64,
    /// Pre-hosted metadata JSON carrying description and image
    pub metadata_uri: Option<String>,
}

/// One bundled buy placed right after pool creation
pub struct BuyOrder {
    pub wallet: Arc<Keypair>,
    /// Base tokens to buy, UI units
    pub token_amount: f64,
}

pub struct PoolParams {
    pub mint_address: Option<Pubkey>,
    pub mint_decimals: u8,
    /// Initial base liquidity, UI units
    pub lp_token_amount: f64,
    /// Initial quote liquidity, UI units
    pub lp_quote_amount: f64,
    pub buyers: Vec<BuyOrder>,
}

/// One bundled sell
pub struct SellOrder {
    pub wallet: Arc<Keypair>,
    /// Fraction of the wallet's token balance to sell
    pub fraction: f64,
}

pub struct SellParams {
    pub delay: Duration,
    pub sellers: Vec<SellOrder>,
}

/// Main application configuration
pub struct AppConfig {
    pub network: NetworkMode,
    pub rpc: RpcConfig,
    pub relay: RelayConfig,
    pub bundle: BundleSettings,
    pub quote: TokenInfo,
    pub owner: Option<Arc<Keypair>>,
    pub stages: StageToggles,
    pub token: TokenParams,
    pub pool: PoolParams,
    pub sell: SellParams,
}

// Default value functions
fn default_dev_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_block_engine_url() -> String { "https://ny.mainnet.block-engine.jito.wtf".to_string() }
fn default_tip_lamports() -> u64 { 10_000 }
fn default_max_bundle_transactions() -> usize { 5 }

/// Key/value view over the variables the config is read from
struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> Env<'a> {
    /// Non-empty value of `var`
    fn get(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn flag(&self, var: &str) -> bool {
        self.get(var).as_deref() == Some("true")
    }

    fn parse<T: FromStr>(&self, var: &str) -> Result<Option<T>, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        match self.get(var) {
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| ConfigError::Invalid {
                var: var.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(None),
        }
    }

    fn keypair(&self, var: &str) -> Result<Option<Arc<Keypair>>, ConfigError> {
        match self.get(var) {
            Some(raw) => parse_keypair(&raw)
                .map(|kp| Some(Arc::new(kp)))
                .map_err(|e| ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("{:#}", e),
                }),
            None => Ok(None),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment, after merging `.env`
    pub fn from_env_file(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                dotenvy::from_filename(p)?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        Ok(Self::from_env()?)
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|var| std::env::var(var).ok())
    }

    /// Load configuration from a fixed set of variables
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(&|var| vars.get(var).cloned())
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let network = if env.flag("DEVNET") {
            NetworkMode::Dev
        } else {
            NetworkMode::Main
        };

        let rpc = RpcConfig {
            main_url: env.get("MAIN_NET_URL"),
            dev_url: env.get("DEVNET_URL").unwrap_or_else(default_dev_url),
        };

        let auth_keypair = env
            .keypair("JITO_AUTH_KEY")?
            .ok_or_else(|| ConfigError::Missing("JITO_AUTH_KEY".to_string()))?;
        let relay = RelayConfig {
            block_engine_url: env
                .get("JITO_BLOCK_ENGINE_URL")
                .unwrap_or_else(default_block_engine_url),
            auth_keypair,
            auth_uuid: env.get("JITO_AUTH_UUID"),
            tip_lamports: env.parse("JITO_BUNDLE_TIP")?.unwrap_or_else(default_tip_lamports),
        };

        let quote = match env.get("QUOTE_MINT") {
            Some(_) => TokenInfo {
                address: env.parse("QUOTE_MINT")?.unwrap_or_else(|| TokenInfo::wsol().address),
                decimals: env.parse("QUOTE_DECIMALS")?.unwrap_or(9),
                symbol: env.get("QUOTE_SYMBOL").unwrap_or_default(),
                name: env.get("QUOTE_NAME").unwrap_or_default(),
            },
            None => TokenInfo::wsol(),
        };

        let stages = StageToggles {
            create_token: env.flag("CREATE_TOKEN"),
            create_market: env.flag("CREATE_OPEN_BOOK_MARKET"),
            create_pool: env.flag("CREATE_POOL"),
            sell_after_create: env.flag("SET_SELL_TIME"),
        };

        let token = TokenParams {
            name: env.get("TOKEN_NAME").unwrap_or_default(),
            symbol: env.get("TOKEN_SYMBOL").unwrap_or_default(),
            decimals: env.parse("TOKEN_DECIMAL")?.unwrap_or(0),
            total_supply: env.parse("TOKEN_TOTAL_MINT")?.unwrap_or(0.0),
            metadata_uri: env.get("TOKEN_METADATA_URI"),
        };

        let mut buyers = Vec::new();
        for i in 1.. {
            let (Some(wallet), Some(amount)) = (
                env.keypair(&format!("BUYORSELLER{}", i))?,
                env.parse::<f64>(&format!("BUYAMOUNT{}", i))?,
            ) else {
                break;
            };
            if amount <= 0.0 {
                break;
            }
            buyers.push(BuyOrder {
                wallet,
                token_amount: amount,
            });
        }

        let pool = PoolParams {
            mint_address: env.parse("MINT_ADDRESS")?,
            mint_decimals: env.parse("MINT_DECIMAL")?.unwrap_or(0),
            lp_token_amount: env.parse("LP_TOKEN_AMOUNT")?.unwrap_or(0.0),
            lp_quote_amount: env.parse("LP_SOL_AMOUNT")?.unwrap_or(0.0),
            buyers,
        };

        let mut sellers = Vec::new();
        for i in 1.. {
            let wallet = env.keypair(&format!("SELLER_WALLET{}", i))?;
            let fraction = env.parse::<f64>(&format!("SELL_AMOUNT{}", i))?.unwrap_or(0.0);
            match wallet {
                Some(wallet) if fraction > 0.0 => sellers.push(SellOrder { wallet, fraction }),
                _ => break,
            }
        }

        let sell = SellParams {
            delay: Duration::from_millis(env.parse("SELL_TIME")?.unwrap_or(0)),
            sellers,
        };

        let config = Self {
            network,
            rpc,
            relay,
            bundle: BundleSettings::default(),
            quote,
            owner: env.keypair("OWNER_PRIVATE")?,
            stages,
            token,
            pool,
            sell,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.network == NetworkMode::Main && self.rpc.main_url.is_none() {
            return Err(ConfigError::Missing("MAIN_NET_URL".to_string()));
        }
        let any_stage = self.stages.create_token
            || self.stages.create_market
            || self.stages.create_pool;
        if any_stage && self.owner.is_none() {
            return Err(ConfigError::Missing("OWNER_PRIVATE".to_string()));
        }
        Ok(())
    }

    /// RPC endpoint of the selected network
    pub fn rpc_url(&self) -> &str {
        match self.network {
            NetworkMode::Main => self.rpc.main_url.as_deref().unwrap_or_default(),
            NetworkMode::Dev => &self.rpc.dev_url,
        }
    }

    pub fn program_ids(&self) -> ProgramIds {
        self.network.program_ids()
    }
}
