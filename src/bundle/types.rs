use crate::{
    errors::{LaunchError, LaunchResult},
    tx_helper,
};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use std::sync::Arc;

/// A transaction awaiting bundling, with the identity that must sign it
pub struct PendingBundleEntry {
    pub transaction: VersionedTransaction,
    pub signer: Arc<Keypair>,
}

impl PendingBundleEntry {
    pub fn new(transaction: VersionedTransaction, signer: Arc<Keypair>) -> Self {
        Self { transaction, signer }
    }
}

/// Ordered set of signed transactions submitted atomically
///
/// The relay caps a bundle at `max_transactions`, tip included.
#[derive(Debug, Clone)]
pub struct Bundle {
    transactions: Vec<VersionedTransaction>,
    max_transactions: usize,
}

impl Bundle {
    pub fn new(max_transactions: usize) -> Self {
        Self {
            transactions: Vec::with_capacity(max_transactions),
            max_transactions,
        }
    }

    pub fn add_transactions(&mut self, transactions: Vec<VersionedTransaction>) -> LaunchResult<()> {
        if self.transactions.len() + transactions.len() > self.max_transactions {
            return Err(LaunchError::invalid(format!(
                "bundle holds at most {} transactions, got {}",
                self.max_transactions,
                self.transactions.len() + transactions.len()
            )));
        }
        self.transactions.extend(transactions);
        Ok(())
    }

    /// Append the tip transfer, signed by `fee_payer`
    pub fn add_tip_tx(
        &mut self,
        fee_payer: &Keypair,
        tip_lamports: u64,
        tip_account: &Pubkey,
        blockhash: Hash,
    ) -> LaunchResult<()> {
        let transfer = system_instruction::transfer(&fee_payer.pubkey(), tip_account, tip_lamports);
        let mut tip_tx = tx_helper::build_v0_transaction(&fee_payer.pubkey(), &[transfer], blockhash)?;
        tx_helper::sign_transaction(&mut tip_tx, fee_payer)?;
        self.add_transactions(vec![tip_tx])
    }

    pub fn transactions(&self) -> &[VersionedTransaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// First signature of the last transaction
    pub fn last_signature(&self) -> Option<Signature> {
        self.transactions
            .last()
            .and_then(|tx| tx.signatures.first())
            .copied()
    }
}
