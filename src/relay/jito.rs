//! Jito block engine relay over its JSON-RPC HTTP API
//!
//! Bundle results are not pushed by the HTTP API, so the relay runs one
//! background watcher per process that polls `getInflightBundleStatuses`
//! for every submitted bundle and fans the notices out to subscribers.
//! Watched ids are polled round-robin and dropped once they settle or
//! outlive [`WATCH_TTL`]. Rate-limited polls back off and never count as
//! a stream failure.

use super::{
    types::{BundleResult, InflightBundleStatus},
    BlockEngineRelay, BundleResultStream, RelayError,
};
use crate::config::RelayConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Value};
use solana_sdk::{pubkey::Pubkey, signer::Signer, transaction::VersionedTransaction};
use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

/// `getInflightBundleStatuses` accepts at most this many ids per call
const MAX_STATUS_IDS: usize = 5;
/// Consecutive status-poll failures before subscribers see a stream error
const MAX_STATUS_FAILURES: u32 = 3;
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(1000);
/// Longest pause after repeated rate-limit replies
const MAX_THROTTLE_BACKOFF: Duration = Duration::from_secs(8);
/// Watched ids are dropped after this long; outlives the confirmation deadline
pub const WATCH_TTL: Duration = Duration::from_secs(30);

struct WatchedBundle {
    id: String,
    since: Instant,
}

/// Bundle ids awaiting a status, polled in rotation
#[derive(Default)]
struct WatchList {
    bundles: VecDeque<WatchedBundle>,
}

impl WatchList {
    fn push(&mut self, id: String, now: Instant) {
        self.bundles.push_back(WatchedBundle { id, since: now });
    }

    fn remove(&mut self, id: &str) {
        self.bundles.retain(|b| b.id != id);
    }

    /// Evict expired ids, then hand out the next batch and move it to the back
    fn next_batch(&mut self, now: Instant) -> Vec<String> {
        let before = self.bundles.len();
        self.bundles.retain(|b| now.duration_since(b.since) < WATCH_TTL);
        if self.bundles.len() < before {
            debug!(evicted = before - self.bundles.len(), "Stopped watching expired bundles");
        }

        let n = self.bundles.len().min(MAX_STATUS_IDS);
        let batch = self.bundles.iter().take(n).map(|b| b.id.clone()).collect();
        self.bundles.rotate_left(n);
        batch
    }
}

struct RelayInner {
    endpoint: String,
    auth_uuid: Option<String>,
    http_client: Client,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Result<BundleResult, RelayError>>>>,
    watched: Mutex<WatchList>,
}

/// Process-wide relay session
pub struct JitoRelay {
    inner: Arc<RelayInner>,
    identity: Pubkey,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl JitoRelay {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(120))
            .tcp_nodelay(true)
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let identity = config.auth_keypair.pubkey();
        info!(
            endpoint = %config.block_engine_url,
            identity = %identity,
            "Relay session opened"
        );

        Ok(Self {
            inner: Arc::new(RelayInner {
                endpoint: config.block_engine_url.trim_end_matches('/').to_string(),
                auth_uuid: config.auth_uuid.clone(),
                http_client,
                subscribers: Mutex::new(Vec::new()),
                watched: Mutex::new(WatchList::default()),
            }),
            identity,
            watcher: Mutex::new(None),
        })
    }

    /// Service identity this session was opened with
    pub fn identity(&self) -> &Pubkey {
        &self.identity
    }

    fn ensure_watcher(&self) {
        let mut watcher = self.watcher.lock();
        if watcher.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        *watcher = Some(tokio::spawn(watch_bundle_statuses(weak)));
    }
}

impl Drop for JitoRelay {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }
    }
}

impl RelayInner {
    async fn call(&self, path: &str, method: &str, params: Value) -> Result<Value, RelayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let url = match &self.auth_uuid {
            Some(uuid) => format!("{}{}?uuid={}", self.endpoint, path, uuid),
            None => format!("{}{}", self.endpoint, path),
        };
        let mut request = self.http_client.post(&url).json(&body);
        if let Some(uuid) = &self.auth_uuid {
            request = request.header("x-jito-auth", uuid);
        }

        let response: Value = request.send().await?.json().await?;

        if let Some(error) = response.get("error") {
            return Err(RelayError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| RelayError::Decode(format!("{} response has no result", method)))
    }

    fn broadcast(&self, item: Result<BundleResult, RelayError>) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(item.clone()).is_ok());
    }

    async fn poll_statuses(&self) -> Result<(), RelayError> {
        let ids = self.watched.lock().next_batch(Instant::now());
        if ids.is_empty() {
            return Ok(());
        }

        let result = self
            .call("/api/v1/getInflightBundleStatuses", "getInflightBundleStatuses", json!([ids]))
            .await?;
        let statuses: Vec<Option<InflightBundleStatus>> = serde_json::from_value(
            result.get("value").cloned().unwrap_or(Value::Null),
        )
        .map_err(|e| RelayError::Decode(e.to_string()))?;

        for status in statuses.into_iter().flatten() {
            if status.is_terminal() {
                self.watched.lock().remove(&status.bundle_id);
            }
            if let Some(result) = status.into_result() {
                debug!(bundle_id = %result.bundle_id, outcome = ?result.outcome, "Bundle status");
                self.broadcast(Ok(result));
            }
        }
        Ok(())
    }
}

async fn watch_bundle_statuses(inner: Weak<RelayInner>) {
    let mut ticker = tokio::time::interval(STATUS_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures = 0u32;
    let mut throttled = 0u32;

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let polled = inner.poll_statuses().await;
        match polled {
            Ok(()) => {
                failures = 0;
                throttled = 0;
            }
            Err(e) if e.is_retryable() => {
                throttled += 1;
                let backoff = (STATUS_POLL_INTERVAL * throttled).min(MAX_THROTTLE_BACKOFF);
                warn!(error = %e, backoff_ms = backoff.as_millis() as u64, "Bundle status poll throttled");
                drop(inner);
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, failures, "Bundle status poll failed");
                if failures >= MAX_STATUS_FAILURES {
                    inner.broadcast(Err(e));
                    failures = 0;
                }
            }
        }
    }
}

#[async_trait]
impl BlockEngineRelay for JitoRelay {
    async fn tip_accounts(&self) -> Result<Vec<Pubkey>, RelayError> {
        let result = self
            .inner
            .call("/api/v1/bundles", "getTipAccounts", json!([]))
            .await?;
        let accounts: Vec<String> =
            serde_json::from_value(result).map_err(|e| RelayError::Decode(e.to_string()))?;

        accounts
            .iter()
            .map(|a| Pubkey::from_str(a).map_err(|e| RelayError::Decode(e.to_string())))
            .collect()
    }

    async fn subscribe_bundle_results(&self) -> Result<BundleResultStream, RelayError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().push(tx);
        self.ensure_watcher();
        Ok(rx)
    }

    async fn send_bundle(&self, transactions: &[VersionedTransaction]) -> Result<String, RelayError> {
        let encoded = transactions
            .iter()
            .map(|tx| {
                bincode::serialize(tx)
                    .map(|bytes| STANDARD.encode(bytes))
                    .map_err(|e| RelayError::Decode(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = self
            .inner
            .call("/api/v1/bundles", "sendBundle", json!([encoded, { "encoding": "base64" }]))
            .await?;
        let bundle_id = result
            .as_str()
            .ok_or_else(|| RelayError::Decode("sendBundle result is not a string".to_string()))?
            .to_string();

        self.inner.watched.lock().push(bundle_id.clone(), Instant::now());
        info!(bundle_id = %bundle_id, transactions = transactions.len(), "Bundle sent");
        Ok(bundle_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Mock, Server, ServerGuard};
    use solana_sdk::{hash::Hash, message::Message, signature::Keypair, transaction::Transaction};
    #[allow(deprecated)]
    use solana_sdk::system_instruction;

    fn relay(url: &str) -> JitoRelay {
        JitoRelay::new(&RelayConfig {
            block_engine_url: url.to_string(),
            auth_keypair: Arc::new(Keypair::new()),
            auth_uuid: None,
            tip_lamports: 1_000,
        })
        .unwrap()
    }

    fn tip_tx() -> VersionedTransaction {
        let payer = Keypair::new();
        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1_000);
        let message = Message::new(&[ix], Some(&payer.pubkey()));
        VersionedTransaction::from(Transaction::new(&[&payer], message, Hash::default()))
    }

    /// Block engine that accepts bundles and answers every status poll with `status_body`
    async fn engine_with_status_reply(status_body: &str) -> (ServerGuard, Mock, Mock) {
        let mut server = Server::new_async().await;
        let send = server
            .mock("POST", "/api/v1/bundles")
            .match_body(Matcher::PartialJson(json!({ "method": "sendBundle" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"bundle-1"}"#)
            .create_async()
            .await;
        let status = server
            .mock("POST", "/api/v1/getInflightBundleStatuses")
            .with_header("content-type", "application/json")
            .with_body(status_body)
            .expect_at_least(2)
            .create_async()
            .await;
        (server, send, status)
    }

    #[test]
    fn test_watch_list_rotates_batches() {
        let now = Instant::now();
        let mut list = WatchList::default();
        for i in 1..=7 {
            list.push(format!("b{}", i), now);
        }

        assert_eq!(list.next_batch(now), vec!["b1", "b2", "b3", "b4", "b5"]);
        assert_eq!(list.next_batch(now), vec!["b6", "b7", "b1", "b2", "b3"]);

        list.remove("b4");
        assert_eq!(list.bundles.len(), 6);
    }

    #[test]
    fn test_watch_list_evicts_expired_ids() {
        let start = Instant::now();
        let mut list = WatchList::default();
        for i in 1..=5 {
            list.push(format!("stale{}", i), start);
        }
        list.push("fresh".to_string(), start + Duration::from_secs(20));

        let batch = list.next_batch(start + WATCH_TTL + Duration::from_secs(1));
        assert_eq!(batch, vec!["fresh"]);
        assert_eq!(list.bundles.len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_status_poll_not_reported() {
        let (server, _send, status) = engine_with_status_reply(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32097,"message":"Rate limit exceeded"}}"#,
        )
        .await;
        let relay = relay(&server.url());

        let mut results = relay.subscribe_bundle_results().await.unwrap();
        let bundle_id = relay.send_bundle(&[tip_tx()]).await.unwrap();
        assert_eq!(bundle_id, "bundle-1");

        // three failing polls would have been reported by now
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        status.assert_async().await;
        assert!(matches!(results.try_recv(), Err(mpsc::error::TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_persistent_status_errors_reported() {
        let (server, _send, _status) = engine_with_status_reply(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"invalid params"}}"#,
        )
        .await;
        let relay = relay(&server.url());

        let mut results = relay.subscribe_bundle_results().await.unwrap();
        relay.send_bundle(&[tip_tx()]).await.unwrap();

        let item = tokio::time::timeout(Duration::from_secs(8), results.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(item, Err(RelayError::Rpc { code: -32602, .. })));
    }
}
