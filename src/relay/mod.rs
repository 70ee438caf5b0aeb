//! Block engine relay seam
//!
//! The bundle coordinator only needs three capabilities from the relay:
//! the tip accounts, a push stream of bundle results, and bundle
//! submission. [`BlockEngineRelay`] captures exactly that so tests can
//! drive the confirmation race with a scripted relay.

pub mod jito;
pub mod types;

pub use jito::JitoRelay;
pub use types::{BundleOutcome, BundleResult, Rejection};

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Relay transport error: {0}")]
    Transport(String),

    #[error("Relay returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed relay response: {0}")]
    Decode(String),

    #[error("Relay returned no tip accounts")]
    NoTipAccounts,
}

impl RelayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            // -32097 is the block engine's rate-limit code
            Self::Rpc { code, .. } => *code == -32097,
            Self::Decode(_) | Self::NoTipAccounts => false,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Rpc { .. } => "rpc",
            Self::Decode(_) => "decode",
            Self::NoTipAccounts => "no_tip_accounts",
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Push stream of bundle results; an `Err` item is a stream transport failure
pub type BundleResultStream = mpsc::UnboundedReceiver<Result<BundleResult, RelayError>>;

#[async_trait]
pub trait BlockEngineRelay: Send + Sync {
    /// Accounts the block engine collects tips on
    async fn tip_accounts(&self) -> Result<Vec<Pubkey>, RelayError>;

    /// Subscribe to bundle results; must be called before `send_bundle`
    async fn subscribe_bundle_results(&self) -> Result<BundleResultStream, RelayError>;

    /// Submit signed transactions as one atomic bundle, returning the bundle id
    async fn send_bundle(&self, transactions: &[VersionedTransaction]) -> Result<String, RelayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_error_classification() {
        assert!(RelayError::Transport("reset".to_string()).is_retryable());
        assert!(RelayError::Rpc { code: -32097, message: "rate limited".to_string() }.is_retryable());
        assert!(!RelayError::Rpc { code: -32602, message: "bad params".to_string() }.is_retryable());
        assert!(!RelayError::NoTipAccounts.is_retryable());
        assert_eq!(RelayError::Decode("x".to_string()).category(), "decode");
    }
}
