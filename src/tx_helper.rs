//! Signing, sending and confirming standalone transactions
//!
//! Bundled transactions are signed here as well; only the bundle
//! coordinator decides how they reach the cluster.

use crate::{
    compat,
    errors::{LaunchError, LaunchResult},
    ledger::LedgerClient,
    metrics::{metrics, Timer},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Deadline for a standalone transaction to reach `confirmed`
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(90);
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Compile an unsigned v0 transaction paid by `payer`
pub fn build_v0_transaction(
    payer: &Pubkey,
    instructions: &[Instruction],
    blockhash: Hash,
) -> LaunchResult<VersionedTransaction> {
    let message = MessageV0::try_compile(payer, instructions, &[], blockhash)
        .map_err(|e| LaunchError::fail(format!("Failed to compile message: {}", e)))?;
    let message = VersionedMessage::V0(message);
    let num_signers = compat::get_message_header(&message).num_required_signatures as usize;

    Ok(VersionedTransaction {
        signatures: vec![Signature::default(); num_signers],
        message,
    })
}

/// Verify `signer` is one of the transaction's required signers
pub fn check_transaction(transaction: &VersionedTransaction, signer: &Pubkey) -> LaunchResult<()> {
    let required = compat::get_required_signers(&transaction.message);
    if required.is_empty() {
        return Err(LaunchError::check_failed("transaction has no required signers"));
    }
    if !required.contains(signer) {
        return Err(LaunchError::check_failed(format!(
            "{} is not a required signer",
            signer
        )));
    }
    Ok(())
}

/// Partially sign in place: only `signer`'s slot is written
pub fn sign_transaction(transaction: &mut VersionedTransaction, signer: &Keypair) -> LaunchResult<()> {
    let position = compat::signer_position(&transaction.message, &signer.pubkey()).ok_or_else(|| {
        LaunchError::check_failed(format!("{} is not a required signer", signer.pubkey()))
    })?;

    let num_signers =
        compat::get_message_header(&transaction.message).num_required_signatures as usize;
    if transaction.signatures.len() != num_signers {
        transaction.signatures.resize(num_signers, Signature::default());
    }

    transaction.signatures[position] = signer.sign_message(&transaction.message.serialize());
    Ok(())
}

pub fn sign_transactions(transactions: &mut [VersionedTransaction], signer: &Keypair) -> LaunchResult<()> {
    for transaction in transactions.iter_mut() {
        sign_transaction(transaction, signer)?;
    }
    Ok(())
}

/// Poll until `signature` is confirmed, failed, or [`CONFIRM_TIMEOUT`] passes
pub async fn confirm_signature(ledger: &dyn LedgerClient, signature: &Signature) -> LaunchResult<()> {
    let deadline = Instant::now() + CONFIRM_TIMEOUT;

    loop {
        match ledger.signature_status(signature).await {
            Ok(Some(state)) => {
                if let Some(err) = state.err {
                    return Err(LaunchError::ConfirmFailed(format!("{}: {}", signature, err)));
                }
                if state.is_confirmed() {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => debug!(signature = %signature, error = %e, "Status query failed"),
        }

        if Instant::now() >= deadline {
            return Err(LaunchError::ConfirmFailed(format!(
                "{} timed out after {}s",
                signature,
                CONFIRM_TIMEOUT.as_secs()
            )));
        }
        tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
    }
}

/// Check, stamp a fresh blockhash, sign, send and confirm one transaction
///
/// `signers[0]` is the checked signer; the rest are co-signers such as a
/// freshly generated mint keypair.
pub async fn send_and_confirm_with_check(
    ledger: &dyn LedgerClient,
    mut transaction: VersionedTransaction,
    signers: &[&Keypair],
) -> LaunchResult<Signature> {
    let primary = signers
        .first()
        .ok_or_else(|| LaunchError::invalid("at least one signer is required"))?;
    check_transaction(&transaction, &primary.pubkey())?;

    let blockhash = ledger
        .latest_blockhash(CommitmentConfig::confirmed())
        .await
        .map_err(|e| LaunchError::fail(format!("{:#}", e)))?;
    transaction.message.set_recent_blockhash(blockhash);
    for signer in signers {
        sign_transaction(&mut transaction, signer)?;
    }

    let timer = Timer::new();
    let signature = ledger
        .send_transaction(&transaction)
        .await
        .map_err(|e| LaunchError::SendFailed(format!("{:#}", e)))?;
    if let Some(m) = metrics() {
        m.transactions_sent.inc();
    }
    debug!(signature = %signature, "Transaction sent");

    confirm_signature(ledger, &signature).await?;
    if let Some(m) = metrics() {
        m.transactions_confirmed.inc();
        timer.observe_duration(&m.transaction_confirm_latency);
    }
    info!(signature = %signature, "Transaction confirmed");
    Ok(signature)
}

/// Send transactions one after another; the first failure aborts the rest
pub async fn send_and_confirm_all(
    ledger: &dyn LedgerClient,
    transactions: Vec<VersionedTransaction>,
    signer: &Keypair,
) -> LaunchResult<Vec<Signature>> {
    let total = transactions.len();
    let mut signatures = Vec::with_capacity(total);

    for (index, transaction) in transactions.into_iter().enumerate() {
        match send_and_confirm_with_check(ledger, transaction, &[signer]).await {
            Ok(signature) => signatures.push(signature),
            Err(e) => {
                warn!(index, total, error = %e, "Transaction batch aborted");
                return Err(LaunchError::fail(format!("transaction {}/{}: {}", index + 1, total, e)));
            }
        }
    }
    Ok(signatures)
}
