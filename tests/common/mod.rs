//! Lightweight ledger and relay doubles for integration tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use launch_bundler::{
    ledger::{AccountFilter, LedgerClient, SignatureState},
    relay::{BlockEngineRelay, BundleResult, BundleResultStream, RelayError},
};
use parking_lot::Mutex;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::TransactionConfirmationStatus;
use std::{collections::HashMap, time::Duration};
use tokio::sync::mpsc;

/// Ledger that reports a signature confirmed once it was queried
/// `polls_to_confirm` times
pub struct CountingLedger {
    pub blockhash: Hash,
    polls_to_confirm: usize,
    polls: Mutex<HashMap<Signature, usize>>,
}

impl CountingLedger {
    pub fn new(polls_to_confirm: usize) -> Self {
        Self {
            blockhash: Hash::new_unique(),
            polls_to_confirm,
            polls: Mutex::new(HashMap::new()),
        }
    }

    /// Never confirms anything
    pub fn silent() -> Self {
        Self::new(usize::MAX)
    }
}

#[async_trait]
impl LedgerClient for CountingLedger {
    async fn latest_blockhash(&self, _commitment: CommitmentConfig) -> Result<Hash> {
        Ok(self.blockhash)
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<SignatureState>> {
        let mut polls = self.polls.lock();
        let count = polls.entry(*signature).or_insert(0);
        *count += 1;
        if *count >= self.polls_to_confirm {
            Ok(Some(SignatureState {
                confirmation_status: Some(TransactionConfirmationStatus::Confirmed),
                err: None,
            }))
        } else {
            Ok(None)
        }
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        transaction
            .signatures
            .first()
            .copied()
            .ok_or_else(|| anyhow!("unsigned transaction"))
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(data_len as u64 * 7)
    }

    async fn account_data(&self, _address: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn token_balance(&self, token_account: &Pubkey) -> Result<u64> {
        Err(anyhow!("no token account {}", token_account))
    }

    async fn program_accounts(
        &self,
        _program_id: &Pubkey,
        _filters: Vec<AccountFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        Ok(Vec::new())
    }
}

/// Relay that records bundles and replays pushes after each subscription
pub struct ScriptedRelay {
    pub tip_account: Pubkey,
    pushes: Vec<(Duration, BundleResult)>,
    sent: Mutex<Vec<Vec<VersionedTransaction>>>,
}

impl ScriptedRelay {
    pub fn new() -> Self {
        Self {
            tip_account: Pubkey::new_unique(),
            pushes: Vec::new(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_push(mut self, delay: Duration, result: BundleResult) -> Self {
        self.pushes.push((delay, result));
        self
    }

    pub fn sent(&self) -> Vec<Vec<VersionedTransaction>> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl BlockEngineRelay for ScriptedRelay {
    async fn tip_accounts(&self) -> std::result::Result<Vec<Pubkey>, RelayError> {
        Ok(vec![self.tip_account])
    }

    async fn subscribe_bundle_results(&self) -> std::result::Result<BundleResultStream, RelayError> {
        let (tx, rx) = mpsc::unbounded_channel();
        for (delay, result) in self.pushes.clone() {
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(Ok(result));
                // keep the stream open until the race settles
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
        }
        if self.pushes.is_empty() {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                drop(tx);
            });
        }
        Ok(rx)
    }

    async fn send_bundle(
        &self,
        transactions: &[VersionedTransaction],
    ) -> std::result::Result<String, RelayError> {
        let mut sent = self.sent.lock();
        sent.push(transactions.to_vec());
        Ok(format!("bundle-{}", sent.len()))
    }
}
