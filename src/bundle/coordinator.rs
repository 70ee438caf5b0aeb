use super::{
    confirmation::{wait_for_confirmation, ConfirmationOutcome},
    types::{Bundle, PendingBundleEntry},
};
use crate::{
    config::BundleSettings,
    errors::{LaunchError, LaunchResult},
    ledger::LedgerClient,
    metrics::{metrics, Timer},
    observability::TraceContext,
    relay::{BlockEngineRelay, RelayError},
    tx_helper,
};
use solana_sdk::{commitment_config::CommitmentConfig, signature::Keypair};
use std::sync::Arc;
use tracing::{error, info, Instrument};

/// Signs, tips and submits bundles, then decides whether they landed
///
/// One coordinator (and one relay session) serves the whole process.
pub struct BundleCoordinator {
    ledger: Arc<dyn LedgerClient>,
    relay: Arc<dyn BlockEngineRelay>,
    settings: BundleSettings,
}

impl BundleCoordinator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        relay: Arc<dyn BlockEngineRelay>,
        settings: BundleSettings,
    ) -> Self {
        Self {
            ledger,
            relay,
            settings,
        }
    }

    pub fn settings(&self) -> &BundleSettings {
        &self.settings
    }

    /// Submit `entries` plus a tip paid by `fee_payer`
    ///
    /// `true` means the bundle was observed as landed. `false` means it
    /// was not confirmed in time, or failed; it may still have landed.
    /// Errors before the wait are logged and reported as `false` after the
    /// failure backoff.
    pub async fn submit_bundle(
        &self,
        entries: Vec<PendingBundleEntry>,
        tip_lamports: u64,
        fee_payer: &Keypair,
    ) -> bool {
        let trace = TraceContext::new("submit_bundle");
        let span = trace.span();

        async {
            let timer = Timer::new();
            match self.try_submit_bundle(entries, tip_lamports, fee_payer).await {
                Ok(outcome) => {
                    if let Some(m) = metrics() {
                        m.bundle_outcomes.with_label_values(&[outcome.label()]).inc();
                        timer.observe_duration(&m.bundle_confirm_latency);
                        if outcome.is_success() {
                            m.bundles_confirmed.inc();
                        } else {
                            m.bundles_failed.inc();
                        }
                    }
                    info!(outcome = outcome.label(), elapsed_secs = timer.elapsed_secs(), "Bundle settled");
                    outcome.is_success()
                }
                Err(e) => {
                    if let Some(m) = metrics() {
                        m.bundles_failed.inc();
                    }
                    error!(
                        error = %e,
                        category = e.category(),
                        retryable = e.is_retryable(),
                        "Bundle submission failed"
                    );
                    tokio::time::sleep(self.settings.failure_backoff).await;
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Same as [`submit_bundle`](Self::submit_bundle) without the
    /// error-to-`false` collapse and backoff
    pub async fn try_submit_bundle(
        &self,
        entries: Vec<PendingBundleEntry>,
        tip_lamports: u64,
        fee_payer: &Keypair,
    ) -> LaunchResult<ConfirmationOutcome> {
        let tip_account = self
            .relay
            .tip_accounts()
            .await?
            .first()
            .copied()
            .ok_or(RelayError::NoTipAccounts)?;

        let blockhash = self
            .ledger
            .latest_blockhash(CommitmentConfig::finalized())
            .await?;

        let mut signed = Vec::with_capacity(entries.len());
        for PendingBundleEntry { mut transaction, signer } in entries {
            transaction.message.set_recent_blockhash(blockhash);
            tx_helper::sign_transaction(&mut transaction, &signer)?;
            signed.push(transaction);
        }

        let mut bundle = Bundle::new(self.settings.max_transactions);
        bundle.add_transactions(signed)?;
        bundle.add_tip_tx(fee_payer, tip_lamports, &tip_account, blockhash)?;
        let tip_signature = bundle
            .last_signature()
            .ok_or_else(|| LaunchError::fail("bundle has no tip signature"))?;

        let results = self.relay.subscribe_bundle_results().await?;
        let bundle_id = self.relay.send_bundle(bundle.transactions()).await?;
        if let Some(m) = metrics() {
            m.bundles_submitted.inc();
        }
        info!(
            bundle_id = %bundle_id,
            transactions = bundle.len(),
            tip_account = %tip_account,
            tip_lamports,
            tip_signature = %tip_signature,
            "Bundle submitted"
        );

        Ok(wait_for_confirmation(self.ledger.as_ref(), results, &tip_signature, &self.settings).await)
    }
}
