#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::Semaphore;

use ticket_scanner::error::LedgerError;
use ticket_scanner::keystore::InMemoryKeyStore;
use ticket_scanner::ledger::{ClaimReceipt, Ledger, NodeStatus};
use ticket_scanner::metadata::{DropInfo, FunderInfo, Gas, KeyInfo};
use ticket_scanner::notify::{Notification, Notifier};
use ticket_scanner::{ClaimTarget, PublicKey, SecretKey, TicketVerifier};

pub const NETWORK: &str = "testnet";
pub const CONTRACT: &str = "events.testnet";
pub const EVENT: &str = "evt-42";
pub const CLAIM_GAS: u64 = 100_000_000_000_000;

pub fn ticket(seed: u8) -> SecretKey {
    SecretKey::from_seed([seed; 32])
}

pub fn extra(event_id: &str, pass_valid_through: Option<Value>) -> Value {
    json!({
        "eventId": event_id,
        "dateCreated": "1717000000000",
        "priceNear": "0",
        "passValidThrough": pass_valid_through,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedClaim {
    pub signer: PublicKey,
    pub gas: Gas,
}

/// In-process ledger that counts reads and records claims.
#[derive(Default)]
pub struct MockLedger {
    keys: Mutex<HashMap<PublicKey, KeyInfo>>,
    drops: Mutex<HashMap<String, DropInfo>>,
    pub reads: AtomicUsize,
    pub claims: Mutex<Vec<SubmittedClaim>>,
    pub fail_reads: AtomicBool,
    pub fail_claims: AtomicBool,
    pub offline: AtomicBool,
    claim_gate: Option<Arc<Semaphore>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims block until the returned semaphore receives a permit.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let ledger = Self {
            claim_gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (ledger, gate)
    }

    pub fn add_ticket(&self, secret: &SecretKey, drop_id: &str, uses_remaining: u32, extra: Value) {
        self.keys.lock().unwrap().insert(
            secret.public_key(),
            KeyInfo {
                drop_id: drop_id.to_string(),
                uses_remaining,
                required_gas: Some(Gas(CLAIM_GAS)),
            },
        );
        let drop: DropInfo = serde_json::from_value(json!({
            "drop_id": drop_id,
            "funder_id": "organizer.testnet",
            "drop_config": {
                "nft_keys_config": {
                    "token_metadata": {
                        "title": "VIP",
                        "extra": extra.to_string(),
                    }
                }
            }
        }))
        .unwrap();
        self.drops.lock().unwrap().insert(drop_id.to_string(), drop);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<SubmittedClaim> {
        self.claims.lock().unwrap().clone()
    }

    pub fn uses_remaining(&self, key: &PublicKey) -> u32 {
        self.keys.lock().unwrap()[key].uses_remaining
    }

    fn read_failure(&self) -> Option<LedgerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.fail_reads.load(Ordering::SeqCst).then(|| LedgerError::Rpc {
            name: "TIMEOUT_ERROR".to_string(),
            message: "node did not answer".to_string(),
        })
    }
}

impl Ledger for MockLedger {
    async fn status(&self) -> Result<NodeStatus, LedgerError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(LedgerError::UnexpectedResponse("connection refused".to_string()));
        }
        Ok(NodeStatus {
            chain_id: "testnet".to_string(),
            latest_block_height: 1,
        })
    }

    async fn key_information(&self, key: &PublicKey) -> Result<KeyInfo, LedgerError> {
        tokio::task::yield_now().await;
        if let Some(e) = self.read_failure() {
            return Err(e);
        }
        self.keys
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| LedgerError::Rpc {
                name: "CONTRACT_ERROR".to_string(),
                message: "Key not found".to_string(),
            })
    }

    async fn drop_information(&self, drop_id: &str) -> Result<DropInfo, LedgerError> {
        tokio::task::yield_now().await;
        if let Some(e) = self.read_failure() {
            return Err(e);
        }
        self.drops
            .lock()
            .unwrap()
            .get(drop_id)
            .cloned()
            .ok_or_else(|| LedgerError::Rpc {
                name: "CONTRACT_ERROR".to_string(),
                message: "Drop not found".to_string(),
            })
    }

    async fn funder_information(&self, _funder_id: &str) -> Result<Option<FunderInfo>, LedgerError> {
        Ok(None)
    }

    async fn required_claim_gas(&self, key: &PublicKey) -> Result<Gas, LedgerError> {
        Ok(self.key_information(key).await?.claim_gas())
    }

    async fn submit_claim(&self, signer: &SecretKey, gas: Gas) -> Result<ClaimReceipt, LedgerError> {
        if let Some(gate) = &self.claim_gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(LedgerError::TransactionFailed("NotEnoughAllowance".to_string()));
        }
        let public_key = signer.public_key();
        self.claims.lock().unwrap().push(SubmittedClaim {
            signer: public_key,
            gas,
        });
        if let Some(info) = self.keys.lock().unwrap().get_mut(&public_key) {
            info.uses_remaining -= 1;
        }
        Ok(ClaimReceipt {
            transaction_hash: "tx-hash".to_string(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn seen(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

pub struct Harness {
    pub ledger: Arc<MockLedger>,
    pub key_store: Arc<InMemoryKeyStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub verifier: TicketVerifier<MockLedger>,
}

pub fn harness(ledger: MockLedger) -> Harness {
    let ledger = Arc::new(ledger);
    let key_store = Arc::new(InMemoryKeyStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let verifier = TicketVerifier::new(
        Arc::clone(&ledger),
        key_store.clone(),
        ClaimTarget::new(NETWORK, CONTRACT),
    )
    .with_notifier(notifier.clone());
    Harness {
        ledger,
        key_store,
        notifier,
        verifier,
    }
}
