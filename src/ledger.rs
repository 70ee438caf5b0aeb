//! Ledger (Solana RPC) seam
//!
//! Every read and write the launch pipeline makes against the cluster goes
//! through [`LedgerClient`], which keeps the coordinator and the stages
//! testable without a validator.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig},
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{TransactionError, VersionedTransaction},
};
use solana_transaction_status::TransactionConfirmationStatus;
use std::sync::Arc;

/// Processing state of a transaction as reported by the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureState {
    /// `None` when the cluster has seen the signature but reports no level
    pub confirmation_status: Option<TransactionConfirmationStatus>,
    pub err: Option<TransactionError>,
}

impl SignatureState {
    /// Reached at least `confirmed`
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status,
            Some(TransactionConfirmationStatus::Confirmed)
                | Some(TransactionConfirmationStatus::Finalized)
        )
    }
}

/// Server-side filter for program-account scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    DataSize(u64),
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl From<AccountFilter> for RpcFilterType {
    fn from(filter: AccountFilter) -> Self {
        match filter {
            AccountFilter::DataSize(size) => RpcFilterType::DataSize(size),
            AccountFilter::Memcmp { offset, bytes } => {
                RpcFilterType::Memcmp(Memcmp::new_raw_bytes(offset, bytes))
            }
        }
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> Result<Hash>;

    /// Status of `signature`, searching transaction history
    async fn signature_status(&self, signature: &Signature) -> Result<Option<SignatureState>>;

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    /// Raw account data, `None` if the account does not exist
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// Raw token amount held by an SPL token account
    async fn token_balance(&self, token_account: &Pubkey) -> Result<u64>;

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        filters: Vec<AccountFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>>;
}

/// [`LedgerClient`] backed by the nonblocking Solana RPC client
pub struct RpcLedger {
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(url: &str) -> Self {
        let commitment = CommitmentConfig::confirmed();
        Self {
            client: Arc::new(RpcClient::new_with_commitment(url.to_string(), commitment)),
            commitment,
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> Result<Hash> {
        let (hash, _) = self
            .client
            .get_latest_blockhash_with_commitment(commitment)
            .await
            .context("getLatestBlockhash failed")?;
        Ok(hash)
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<SignatureState>> {
        let response = self
            .client
            .get_signature_statuses_with_history(&[*signature])
            .await
            .context("getSignatureStatuses failed")?;

        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureState {
                confirmation_status: status.confirmation_status,
                err: status.err,
            }))
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            ..Default::default()
        };
        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .context("sendTransaction failed")
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .context("getMinimumBalanceForRentExemption failed")
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .with_context(|| format!("getAccountInfo failed for {}", address))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn token_balance(&self, token_account: &Pubkey) -> Result<u64> {
        let amount = self
            .client
            .get_token_account_balance(token_account)
            .await
            .with_context(|| format!("getTokenAccountBalance failed for {}", token_account))?;
        amount
            .amount
            .parse::<u64>()
            .with_context(|| format!("Invalid token amount: {}", amount.amount))
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        filters: Vec<AccountFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(filters.into_iter().map(Into::into).collect()),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                data_slice: None,
                min_context_slot: None,
            },
            with_context: None,
            sort_results: None,
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(program_id, config)
            .await
            .with_context(|| format!("getProgramAccounts failed for {}", program_id))?;
        Ok(accounts
            .into_iter()
            .map(|(address, account)| (address, account.data))
            .collect())
    }
}
