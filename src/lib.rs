//! Launch bundler library
//!
//! Token creation, OpenBook market creation and Raydium pool launch with
//! atomic Jito bundles for the pool buys and the follow-up sells.

pub mod bundle;
pub mod compat;
pub mod config;
pub mod dex;
pub mod errors;
pub mod launch;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod pool;
pub mod relay;
pub mod tx_helper;
pub mod wallet;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use bundle::{BundleCoordinator, PendingBundleEntry};
pub use config::AppConfig;
pub use errors::{LaunchError, LaunchResult};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
