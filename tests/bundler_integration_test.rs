//! Integration tests for bundle submission through the public API
//!
//! This test validates:
//! - The coordinator works against trait-object collaborators
//! - Push notices and polling both settle a submission
//! - Several submissions can share one coordinator concurrently

mod common;

use common::{CountingLedger, ScriptedRelay};
use launch_bundler::{
    bundle::{BundleCoordinator, ConfirmationOutcome, PendingBundleEntry},
    compat,
    config::BundleSettings,
    relay::{BundleResult, Rejection},
    tx_helper::build_v0_transaction,
};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinSet, time::Instant};

fn transfer_entry(signer: &Arc<Keypair>) -> PendingBundleEntry {
    let ix = system_instruction::transfer(&signer.pubkey(), &Pubkey::new_unique(), 1_000);
    let tx = build_v0_transaction(&signer.pubkey(), &[ix], Hash::default()).unwrap();
    PendingBundleEntry::new(tx, Arc::clone(signer))
}

#[tokio::test(start_paused = true)]
async fn test_polled_confirmation_through_trait_objects() {
    let ledger = Arc::new(CountingLedger::new(2));
    let relay = Arc::new(ScriptedRelay::new());
    let coordinator = BundleCoordinator::new(ledger.clone(), relay.clone(), BundleSettings::default());

    let payer = Arc::new(Keypair::new());
    let buyer = Arc::new(Keypair::new());
    let start = Instant::now();
    let landed = coordinator
        .submit_bundle(vec![transfer_entry(&buyer)], 10_000, &payer)
        .await;

    assert!(landed);
    // second poll, 2s after the first
    assert_eq!(start.elapsed(), Duration::from_secs(4));

    let sent = relay.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), 2);
    assert_eq!(compat::fee_payer(&sent[0][1].message), Some(&payer.pubkey()));
    assert!(sent[0]
        .iter()
        .all(|tx| *tx.message.recent_blockhash() == ledger.blockhash));
}

#[tokio::test(start_paused = true)]
async fn test_already_processed_notice_lands_before_first_poll() {
    let ledger = Arc::new(CountingLedger::silent());
    let relay = Arc::new(ScriptedRelay::new().with_push(
        Duration::from_millis(300),
        BundleResult::rejected(
            "bundle-1",
            Rejection::SimulationFailure {
                tx_signature: None,
                msg: Some("This transaction has already been processed".to_string()),
            },
        ),
    ));
    let coordinator = BundleCoordinator::new(ledger, relay, BundleSettings::default());

    let payer = Keypair::new();
    let outcome = coordinator
        .try_submit_bundle(vec![transfer_entry(&Arc::new(Keypair::new()))], 5_000, &payer)
        .await
        .unwrap();

    assert!(matches!(outcome, ConfirmationOutcome::Recovered { .. }));
    assert!(outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_program_error_fails_fast() {
    let ledger = Arc::new(CountingLedger::silent());
    let relay = Arc::new(ScriptedRelay::new().with_push(
        Duration::from_millis(500),
        BundleResult::rejected(
            "bundle-1",
            Rejection::SimulationFailure {
                tx_signature: None,
                msg: Some("Error processing Instruction 2: custom program error: 0x1e".to_string()),
            },
        ),
    ));
    let coordinator = BundleCoordinator::new(ledger, relay, BundleSettings::default());

    let start = Instant::now();
    let landed = coordinator
        .submit_bundle(vec![transfer_entry(&Arc::new(Keypair::new()))], 5_000, &Keypair::new())
        .await;

    assert!(!landed);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_bundle_times_out() {
    let coordinator = BundleCoordinator::new(
        Arc::new(CountingLedger::silent()),
        Arc::new(ScriptedRelay::new()),
        BundleSettings::default(),
    );

    let start = Instant::now();
    let outcome = coordinator
        .try_submit_bundle(vec![transfer_entry(&Arc::new(Keypair::new()))], 5_000, &Keypair::new())
        .await
        .unwrap();

    assert_eq!(outcome, ConfirmationOutcome::TimedOut);
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_submissions_share_one_coordinator() {
    let relay = Arc::new(ScriptedRelay::new());
    let coordinator = Arc::new(BundleCoordinator::new(
        Arc::new(CountingLedger::new(1)),
        relay.clone(),
        BundleSettings::default(),
    ));

    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let coordinator = Arc::clone(&coordinator);
        tasks.spawn(async move {
            let signer = Arc::new(Keypair::new());
            coordinator
                .submit_bundle(vec![transfer_entry(&signer)], 10_000, &signer)
                .await
        });
    }

    let mut landed = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap() {
            landed += 1;
        }
    }
    assert_eq!(landed, 4);
    assert_eq!(relay.sent().len(), 4);
}
