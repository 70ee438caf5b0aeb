//! Bundle result notices delivered on the relay's push stream

use serde::{Deserialize, Serialize};

/// Why the block engine rejected a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// A transaction in the bundle failed simulation
    SimulationFailure {
        tx_signature: Option<String>,
        msg: Option<String>,
    },
    /// The bundle was dropped before landing
    DroppedBundle { msg: Option<String> },
    StateAuctionBidRejected { msg: Option<String> },
    WinningBatchBidRejected { msg: Option<String> },
    InternalError { msg: Option<String> },
}

impl Rejection {
    /// Diagnostic message attached by the block engine
    pub fn message(&self) -> Option<&str> {
        match self {
            Rejection::SimulationFailure { msg, .. }
            | Rejection::DroppedBundle { msg }
            | Rejection::StateAuctionBidRejected { msg }
            | Rejection::WinningBatchBidRejected { msg }
            | Rejection::InternalError { msg } => msg.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::SimulationFailure { .. } => "simulation_failure",
            Rejection::DroppedBundle { .. } => "dropped_bundle",
            Rejection::StateAuctionBidRejected { .. } => "state_auction_bid_rejected",
            Rejection::WinningBatchBidRejected { .. } => "winning_batch_bid_rejected",
            Rejection::InternalError { .. } => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleOutcome {
    /// Forwarded to a leader
    Accepted { slot: Option<u64> },
    Rejected(Rejection),
    /// Landed in a block
    Processed { slot: u64 },
    Finalized,
}

/// One notice about a submitted bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleResult {
    pub bundle_id: String,
    pub outcome: BundleOutcome,
}

impl BundleResult {
    pub fn rejected(bundle_id: impl Into<String>, rejection: Rejection) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            outcome: BundleOutcome::Rejected(rejection),
        }
    }
}

/// Status entry of `getInflightBundleStatuses`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InflightBundleStatus {
    pub bundle_id: String,
    pub status: String,
    #[serde(default)]
    pub landed_slot: Option<u64>,
}

impl InflightBundleStatus {
    /// Convert into a push notice; `None` while the engine has no record yet
    pub fn into_result(self) -> Option<BundleResult> {
        let outcome = match self.status.as_str() {
            "Pending" => BundleOutcome::Accepted { slot: None },
            "Landed" => match self.landed_slot {
                Some(slot) => BundleOutcome::Processed { slot },
                None => BundleOutcome::Finalized,
            },
            "Failed" => BundleOutcome::Rejected(Rejection::InternalError {
                msg: Some("Bundle failed without landing".to_string()),
            }),
            _ => return None,
        };
        Some(BundleResult {
            bundle_id: self.bundle_id,
            outcome,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "Landed" | "Failed")
    }
}
