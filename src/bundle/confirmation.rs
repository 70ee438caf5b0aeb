//! Bundle confirmation race
//!
//! Three signals can settle a submitted bundle: a push notice from the
//! relay, a direct signature-status poll, and the hard deadline. They are
//! merged by one `select!` loop; whichever settles first is the verdict.

use crate::{
    config::BundleSettings,
    ledger::LedgerClient,
    relay::{BundleOutcome, BundleResult, BundleResultStream, Rejection},
};
use solana_sdk::signature::Signature;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Rejection messages that mean the bundle itself failed
const FAILURE_MARKERS: [&str; 2] = ["custom program error", "Error processing Instruction"];
/// Simulation rejection meaning the transactions already landed
const ALREADY_PROCESSED: &str = "This transaction has already been processed";
/// Drop notice meaning part of the bundle landed
const PARTIALLY_PROCESSED: &str = "Bundle partially processed";

/// How a bundle submission was settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Status poll saw the last transaction at a confirmation level
    Confirmed,
    /// Relay rejection that implies the transactions landed anyway
    Recovered { reason: String },
    /// Relay rejection naming a program failure
    Rejected { reason: String },
    /// Result stream failed
    TransportFailed { reason: String },
    /// Status query failed
    PollFailed { reason: String },
    TimedOut,
}

impl ConfirmationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Recovered { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Recovered { .. } => "recovered",
            Self::Rejected { .. } => "rejected",
            Self::TransportFailed { .. } => "transport_failed",
            Self::PollFailed { .. } => "poll_failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Verdict of a single push notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushVerdict {
    Landed(String),
    Failed(String),
    /// Not conclusive; keep waiting
    Ignore,
}

pub fn classify_result(result: &BundleResult) -> PushVerdict {
    let BundleOutcome::Rejected(rejection) = &result.outcome else {
        return PushVerdict::Ignore;
    };
    let Some(msg) = rejection.message() else {
        return PushVerdict::Ignore;
    };

    if FAILURE_MARKERS.iter().any(|marker| msg.contains(marker)) {
        return PushVerdict::Failed(msg.to_string());
    }

    match rejection {
        Rejection::SimulationFailure { .. } if msg.contains(ALREADY_PROCESSED) => {
            PushVerdict::Landed(msg.to_string())
        }
        Rejection::DroppedBundle { .. } if msg.contains(PARTIALLY_PROCESSED) => {
            PushVerdict::Landed(msg.to_string())
        }
        _ => PushVerdict::Ignore,
    }
}

/// Race push notices, status polls and the deadline for `signature`
pub async fn wait_for_confirmation(
    ledger: &dyn LedgerClient,
    mut results: BundleResultStream,
    signature: &Signature,
    settings: &BundleSettings,
) -> ConfirmationOutcome {
    let deadline = sleep(settings.confirm_timeout);
    tokio::pin!(deadline);
    let mut poll = interval_at(Instant::now() + settings.poll_interval, settings.poll_interval);
    // a slow status query must not be followed by a burst of catch-up polls
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stream_open = true;

    loop {
        tokio::select! {
            biased;

            item = results.recv(), if stream_open => match item {
                Some(Ok(result)) => match classify_result(&result) {
                    PushVerdict::Landed(reason) => {
                        info!(bundle_id = %result.bundle_id, %reason, "Bundle landed per relay");
                        return ConfirmationOutcome::Recovered { reason };
                    }
                    PushVerdict::Failed(reason) => {
                        warn!(bundle_id = %result.bundle_id, %reason, "Bundle rejected");
                        return ConfirmationOutcome::Rejected { reason };
                    }
                    PushVerdict::Ignore => {
                        debug!(bundle_id = %result.bundle_id, outcome = ?result.outcome, "Bundle notice");
                    }
                },
                Some(Err(e)) => {
                    warn!(error = %e, "Bundle result stream failed");
                    return ConfirmationOutcome::TransportFailed { reason: e.to_string() };
                }
                None => {
                    debug!("Bundle result stream closed, relying on status polls");
                    stream_open = false;
                }
            },

            _ = poll.tick() => match ledger.signature_status(signature).await {
                Ok(Some(state)) if state.confirmation_status.is_some() => {
                    info!(signature = %signature, status = ?state.confirmation_status, "Bundle confirmed");
                    return ConfirmationOutcome::Confirmed;
                }
                Ok(_) => debug!(signature = %signature, "Bundle not yet visible"),
                Err(e) => {
                    warn!(signature = %signature, error = %e, "Bundle status query failed");
                    return ConfirmationOutcome::PollFailed { reason: format!("{:#}", e) };
                }
            },

            _ = &mut deadline => {
                warn!(
                    signature = %signature,
                    timeout_secs = settings.confirm_timeout.as_secs(),
                    "Bundle confirmation timed out"
                );
                return ConfirmationOutcome::TimedOut;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockLedger, StatusReply};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn rejected(rejection: Rejection) -> BundleResult {
        BundleResult::rejected("b1", rejection)
    }

    #[test]
    fn test_program_errors_fail() {
        let r = rejected(Rejection::SimulationFailure {
            tx_signature: None,
            msg: Some("Transaction simulation failed: custom program error: 0x1".to_string()),
        });
        assert!(matches!(classify_result(&r), PushVerdict::Failed(_)));

        let r = rejected(Rejection::InternalError {
            msg: Some("Error processing Instruction 2".to_string()),
        });
        assert!(matches!(classify_result(&r), PushVerdict::Failed(_)));
    }

    #[test]
    fn test_benign_rejections_land() {
        let r = rejected(Rejection::SimulationFailure {
            tx_signature: Some("sig".to_string()),
            msg: Some("This transaction has already been processed".to_string()),
        });
        assert!(matches!(classify_result(&r), PushVerdict::Landed(_)));

        let r = rejected(Rejection::DroppedBundle {
            msg: Some("Bundle partially processed".to_string()),
        });
        assert!(matches!(classify_result(&r), PushVerdict::Landed(_)));
    }

    #[test]
    fn test_other_notices_ignored() {
        let r = rejected(Rejection::StateAuctionBidRejected {
            msg: Some("bid too low".to_string()),
        });
        assert_eq!(classify_result(&r), PushVerdict::Ignore);

        // benign text on the wrong rejection kind
        let r = rejected(Rejection::InternalError {
            msg: Some("Bundle partially processed".to_string()),
        });
        assert_eq!(classify_result(&r), PushVerdict::Ignore);

        let accepted = BundleResult {
            bundle_id: "b1".to_string(),
            outcome: BundleOutcome::Accepted { slot: Some(7) },
        };
        assert_eq!(classify_result(&accepted), PushVerdict::Ignore);
        assert_eq!(classify_result(&rejected(Rejection::DroppedBundle { msg: None })), PushVerdict::Ignore);
    }

    #[test]
    fn test_outcome_success() {
        assert!(ConfirmationOutcome::Confirmed.is_success());
        assert!(ConfirmationOutcome::Recovered { reason: String::new() }.is_success());
        assert!(!ConfirmationOutcome::TimedOut.is_success());
        assert!(!ConfirmationOutcome::PollFailed { reason: String::new() }.is_success());
        assert_eq!(ConfirmationOutcome::TimedOut.label(), "timed_out");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_status_query_keeps_poll_spacing() {
        let ledger = MockLedger::new();
        ledger.script_statuses(vec![StatusReply::Unknown]);
        ledger.delay_statuses(vec![Duration::from_secs(5)]);
        let (_push, results) = mpsc::unbounded_channel();
        let settings = BundleSettings::default();
        let start = Instant::now();

        let outcome = wait_for_confirmation(&ledger, results, &Signature::new_unique(), &settings).await;
        assert_eq!(outcome, ConfirmationOutcome::TimedOut);

        let times = ledger.status_call_times();
        assert_eq!(times[0] - start, Duration::from_secs(2));
        // first query returns at 7 s; the next polls are 2 s apart, not back to back
        assert_eq!(times[1] - start, Duration::from_secs(7));
        for pair in times[1..].windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(2), "{:?}", pair);
        }
    }
}
