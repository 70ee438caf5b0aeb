//! Raydium AMM v4 pool model: keys, market decoding, reserves and swap math

pub mod amm;
pub mod keys;
pub mod market;
pub mod reserves;
pub mod simulator;

pub use keys::{derive_pool_keys, PoolKeys};
pub use market::{find_markets_by_mints, MarketStateV3};
pub use reserves::{fetch_pool_reserves, PoolReserves};
pub use simulator::{PoolSimulator, SwapSide};
