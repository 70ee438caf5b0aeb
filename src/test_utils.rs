//! Test Utilities Module
//!
//! Scripted stand-ins for the ledger and the block engine relay. Both are
//! deterministic and drive timing through tokio's clock, so tests run with
//! `start_paused = true`.
//!
//! Only compiled for tests or with the `test_utils` feature.

#![cfg(any(test, feature = "test_utils"))]

use crate::{
    ledger::{AccountFilter, LedgerClient, SignatureState},
    relay::{BlockEngineRelay, BundleResult, BundleResultStream, RelayError},
};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{TransactionError, VersionedTransaction},
};
use solana_transaction_status::TransactionConfirmationStatus;
use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};

/// One scripted answer to a signature-status query
#[derive(Debug, Clone)]
pub enum StatusReply {
    /// Cluster has not seen the signature
    Unknown,
    Landed(TransactionConfirmationStatus),
    /// The query itself fails
    Error(String),
}

struct LedgerState {
    blockhash: Hash,
    blockhash_calls: usize,
    blockhash_error: Option<String>,
    send_error: Option<String>,
    execution_error: Option<TransactionError>,
    confirm_sent: bool,
    sent: Vec<VersionedTransaction>,
    status_script: VecDeque<StatusReply>,
    status_calls: usize,
    status_delays: VecDeque<Duration>,
    status_call_times: Vec<Instant>,
    rent_per_byte: u64,
    accounts: HashMap<Pubkey, (Pubkey, Vec<u8>)>,
    token_balances: HashMap<Pubkey, u64>,
}

/// In-memory [`LedgerClient`]
///
/// Sent transactions confirm on the next status query unless told
/// otherwise. A status script, when present, overrides that and answers
/// queries in order, repeating its last entry.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                blockhash: Hash::new_unique(),
                blockhash_calls: 0,
                blockhash_error: None,
                send_error: None,
                execution_error: None,
                confirm_sent: true,
                sent: Vec::new(),
                status_script: VecDeque::new(),
                status_calls: 0,
                status_delays: VecDeque::new(),
                status_call_times: Vec::new(),
                rent_per_byte: 10,
                accounts: HashMap::new(),
                token_balances: HashMap::new(),
            })),
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.state.lock().blockhash
    }

    pub fn blockhash_calls(&self) -> usize {
        self.state.lock().blockhash_calls
    }

    pub fn fail_blockhash(&self, msg: &str) {
        self.state.lock().blockhash_error = Some(msg.to_string());
    }

    pub fn fail_sends(&self, msg: &str) {
        self.state.lock().send_error = Some(msg.to_string());
    }

    /// Sent transactions land but report `err`
    pub fn fail_executions(&self, err: TransactionError) {
        self.state.lock().execution_error = Some(err);
    }

    pub fn never_confirm(&self) {
        self.state.lock().confirm_sent = false;
    }

    pub fn script_statuses(&self, replies: Vec<StatusReply>) {
        self.state.lock().status_script = replies.into();
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().status_calls
    }

    /// Successive status queries take these long to answer
    pub fn delay_statuses(&self, delays: Vec<Duration>) {
        self.state.lock().status_delays = delays.into();
    }

    /// When each status query started
    pub fn status_call_times(&self) -> Vec<Instant> {
        self.state.lock().status_call_times.clone()
    }

    pub fn sent_transactions(&self) -> Vec<VersionedTransaction> {
        self.state.lock().sent.clone()
    }

    pub fn set_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.state.lock().accounts.insert(address, (owner, data));
    }

    pub fn set_token_balance(&self, token_account: Pubkey, amount: u64) {
        self.state.lock().token_balances.insert(token_account, amount);
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter(data: &[u8], filter: &AccountFilter) -> bool {
    match filter {
        AccountFilter::DataSize(size) => data.len() as u64 == *size,
        AccountFilter::Memcmp { offset, bytes } => data
            .get(*offset..offset + bytes.len())
            .is_some_and(|slice| slice == bytes.as_slice()),
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn latest_blockhash(&self, _commitment: CommitmentConfig) -> Result<Hash> {
        let mut state = self.state.lock();
        state.blockhash_calls += 1;
        match &state.blockhash_error {
            Some(msg) => Err(anyhow::anyhow!("{}", msg)),
            None => Ok(state.blockhash),
        }
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<SignatureState>> {
        let delay = {
            let mut state = self.state.lock();
            state.status_call_times.push(Instant::now());
            state.status_delays.pop_front()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.status_calls += 1;

        let reply = if state.status_script.len() > 1 {
            state.status_script.pop_front()
        } else {
            state.status_script.front().cloned()
        };
        if let Some(reply) = reply {
            return match reply {
                StatusReply::Unknown => Ok(None),
                StatusReply::Landed(level) => Ok(Some(SignatureState {
                    confirmation_status: Some(level),
                    err: None,
                })),
                StatusReply::Error(msg) => Err(anyhow::anyhow!("{}", msg)),
            };
        }

        let known = state.sent.iter().any(|tx| tx.signatures.first() == Some(signature));
        if known && state.confirm_sent {
            Ok(Some(SignatureState {
                confirmation_status: Some(TransactionConfirmationStatus::Confirmed),
                err: state.execution_error.clone(),
            }))
        } else {
            Ok(None)
        }
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        let mut state = self.state.lock();
        if let Some(msg) = &state.send_error {
            return Err(anyhow::anyhow!("{}", msg));
        }
        state.sent.push(transaction.clone());
        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(self.state.lock().rent_per_byte * data_len as u64)
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self
            .state
            .lock()
            .accounts
            .get(address)
            .map(|(_, data)| data.clone()))
    }

    async fn token_balance(&self, token_account: &Pubkey) -> Result<u64> {
        self.state
            .lock()
            .token_balances
            .get(token_account)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("could not find token account {}", token_account))
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        filters: Vec<AccountFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        let state = self.state.lock();
        let mut found: Vec<(Pubkey, Vec<u8>)> = state
            .accounts
            .iter()
            .filter(|(_, (owner, data))| {
                owner == program_id && filters.iter().all(|f| matches_filter(data, f))
            })
            .map(|(address, (_, data))| (*address, data.clone()))
            .collect();
        found.sort_by_key(|(address, _)| *address);
        Ok(found)
    }
}

struct RelayState {
    tip_accounts: Vec<Pubkey>,
    tip_calls: usize,
    tip_error: Option<RelayError>,
    subscribe_error: Option<RelayError>,
    send_error: Option<RelayError>,
    pushes: Vec<(Duration, Result<BundleResult, RelayError>)>,
    close_stream: bool,
    sent_bundles: Vec<Vec<VersionedTransaction>>,
    calls: Vec<&'static str>,
    senders: Vec<mpsc::UnboundedSender<Result<BundleResult, RelayError>>>,
}

/// Scripted [`BlockEngineRelay`]
///
/// Push notices are delivered after their delay, measured from the moment
/// of subscription.
#[derive(Clone)]
pub struct MockRelay {
    state: Arc<Mutex<RelayState>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RelayState {
                tip_accounts: vec![Pubkey::new_unique(), Pubkey::new_unique()],
                tip_calls: 0,
                tip_error: None,
                subscribe_error: None,
                send_error: None,
                pushes: Vec::new(),
                close_stream: false,
                sent_bundles: Vec::new(),
                calls: Vec::new(),
                senders: Vec::new(),
            })),
        }
    }

    pub fn tip_accounts_list(&self) -> Vec<Pubkey> {
        self.state.lock().tip_accounts.clone()
    }

    pub fn set_tip_accounts(&self, accounts: Vec<Pubkey>) {
        self.state.lock().tip_accounts = accounts;
    }

    pub fn tip_calls(&self) -> usize {
        self.state.lock().tip_calls
    }

    pub fn fail_tip_accounts(&self, err: RelayError) {
        self.state.lock().tip_error = Some(err);
    }

    pub fn fail_subscribe(&self, err: RelayError) {
        self.state.lock().subscribe_error = Some(err);
    }

    pub fn fail_send(&self, err: RelayError) {
        self.state.lock().send_error = Some(err);
    }

    /// Deliver `item` on the result stream `delay` after subscription
    pub fn push_after(&self, delay: Duration, item: Result<BundleResult, RelayError>) {
        self.state.lock().pushes.push((delay, item));
    }

    /// Close the result stream right after subscription
    pub fn close_stream(&self) {
        self.state.lock().close_stream = true;
    }

    pub fn sent_bundles(&self) -> Vec<Vec<VersionedTransaction>> {
        self.state.lock().sent_bundles.clone()
    }

    /// Order of trait calls made against this relay
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }
}

impl Default for MockRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockEngineRelay for MockRelay {
    async fn tip_accounts(&self) -> std::result::Result<Vec<Pubkey>, RelayError> {
        let mut state = self.state.lock();
        state.tip_calls += 1;
        state.calls.push("tip_accounts");
        match &state.tip_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.tip_accounts.clone()),
        }
    }

    async fn subscribe_bundle_results(&self) -> std::result::Result<BundleResultStream, RelayError> {
        let mut state = self.state.lock();
        state.calls.push("subscribe");
        if let Some(err) = &state.subscribe_error {
            return Err(err.clone());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for (delay, item) in state.pushes.clone() {
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(item);
            });
        }
        if !state.close_stream {
            state.senders.push(tx);
        }
        Ok(rx)
    }

    async fn send_bundle(
        &self,
        transactions: &[VersionedTransaction],
    ) -> std::result::Result<String, RelayError> {
        let mut state = self.state.lock();
        state.calls.push("send_bundle");
        if let Some(err) = &state.send_error {
            return Err(err.clone());
        }
        state.sent_bundles.push(transactions.to_vec());
        Ok(format!("bundle-{}", state.sent_bundles.len()))
    }
}
