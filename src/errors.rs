//! Error types for the launch pipeline
//!
//! Every ledger-facing operation (token creation, market creation, pool
//! creation, swaps, send/confirm) returns a [`LaunchError`] instead of
//! throwing. Callers branch on the variant; the top-level runner collapses
//! them into a single failed-stage decision.

use thiserror::Error;

/// Error kinds produced by launch operations
///
/// The set of kinds is fixed:
/// - `InvalidArgument`: malformed or missing input, detected before any network call
/// - `CheckFailed`: local signer/transaction sanity check failed
/// - `SendFailed` / `ConfirmFailed`: network-level submission or confirmation failure
/// - `Fail`: generic or wrapped failure (relay transport, unexpected error)
/// - `CreateMetaFailed` / `TotalMintFailed`: composite token-creation outcomes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    /// Malformed or missing required input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Signer is not allowed to sign the transaction, or the transaction is malformed
    #[error("Transaction check failed: {0}")]
    CheckFailed(String),

    /// Transaction could not be submitted to the ledger
    #[error("Send transaction failed: {0}")]
    SendFailed(String),

    /// Transaction was submitted but did not confirm successfully
    #[error("Confirm transaction failed: {0}")]
    ConfirmFailed(String),

    /// Generic failure
    #[error("Operation failed: {0}")]
    Fail(String),

    /// Token metadata account could not be created
    #[error("Create metadata failed: {0}")]
    CreateMetaFailed(String),

    /// Total supply could not be minted to the owner
    #[error("Total supply mint failed: {0}")]
    TotalMintFailed(String),
}

impl LaunchError {
    /// Check if this error is potentially retryable
    ///
    /// Nothing in the pipeline retries today; this only feeds logging.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SendFailed(_) => true,
            Self::ConfirmFailed(msg) => msg.contains("timed out"),
            Self::Fail(_) => true,

            Self::InvalidArgument(_) => false,
            Self::CheckFailed(_) => false,
            Self::CreateMetaFailed(_) => false,
            Self::TotalMintFailed(_) => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::CheckFailed(_) => "check_failed",
            Self::SendFailed(_) => "send_failed",
            Self::ConfirmFailed(_) => "confirm_failed",
            Self::Fail(_) => "fail",
            Self::CreateMetaFailed(_) => "create_meta_failed",
            Self::TotalMintFailed(_) => "total_mint_failed",
        }
    }
}

// Convenience constructors for common error scenarios
impl LaunchError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    pub fn check_failed(reason: impl Into<String>) -> Self {
        Self::CheckFailed(reason.into())
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail(reason.into())
    }
}

impl From<anyhow::Error> for LaunchError {
    fn from(err: anyhow::Error) -> Self {
        Self::Fail(format!("{:#}", err))
    }
}

impl From<crate::relay::RelayError> for LaunchError {
    fn from(err: crate::relay::RelayError) -> Self {
        Self::Fail(err.to_string())
    }
}

pub type LaunchResult<T> = std::result::Result<T, LaunchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LaunchError::InvalidArgument("empty token name".to_string());
        assert_eq!(err.to_string(), "Invalid argument: empty token name");

        let err = LaunchError::TotalMintFailed("ata missing".to_string());
        assert_eq!(err.to_string(), "Total supply mint failed: ata missing");
    }

    #[test]
    fn test_error_retryability() {
        assert!(LaunchError::SendFailed("rpc down".to_string()).is_retryable());
        assert!(LaunchError::ConfirmFailed("timed out after 90s".to_string()).is_retryable());
        assert!(!LaunchError::ConfirmFailed("custom program error: 0x1".to_string()).is_retryable());

        assert!(!LaunchError::invalid("x").is_retryable());
        assert!(!LaunchError::check_failed("x").is_retryable());
        assert!(!LaunchError::CreateMetaFailed("x".to_string()).is_retryable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(LaunchError::invalid("x").category(), "invalid_argument");
        assert_eq!(LaunchError::fail("x").category(), "fail");
        assert_eq!(
            LaunchError::CreateMetaFailed("x".to_string()).category(),
            "create_meta_failed"
        );
    }

    #[test]
    fn test_anyhow_conversion_keeps_context() {
        let err: LaunchError = anyhow::anyhow!("inner").context("outer").into();
        assert_eq!(err, LaunchError::Fail("outer: inner".to_string()));
    }
}
