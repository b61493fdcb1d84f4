//! Ledger claim for an admitted ticket.
//!
//! Consumes one use of the ticket key. Runs detached from verification: a
//! failure here never changes an admission decision already shown at the door.

use std::sync::Arc;

use tracing::info;

use crate::error::ClaimError;
use crate::keys::SecretKey;
use crate::keystore::KeyStore;
use crate::ledger::{ClaimReceipt, Ledger};

/// Where claim keys are installed and which contract receives the claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTarget {
    pub network_id: String,
    pub contract_id: String,
}

impl ClaimTarget {
    pub fn new(network_id: impl Into<String>, contract_id: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            contract_id: contract_id.into(),
        }
    }
}

/// Installs the ticket key, looks up the gas `claim` needs and submits it.
/// Signs with the key in hand rather than whatever the shared slot holds.
pub async fn claim_ticket<L: Ledger>(
    ledger: &L,
    key_store: Arc<dyn KeyStore>,
    target: &ClaimTarget,
    secret: &SecretKey,
) -> Result<ClaimReceipt, ClaimError> {
    let public_key = secret.public_key();
    info!("Ticket claim started {}", public_key);

    // Key stores may touch the filesystem.
    let (network_id, contract_id, key) = (
        target.network_id.clone(),
        target.contract_id.clone(),
        secret.clone(),
    );
    tokio::task::spawn_blocking(move || key_store.set_key(&network_id, &contract_id, &key)).await??;
    let gas = ledger.required_claim_gas(&public_key).await?;
    let receipt = ledger.submit_claim(secret, gas).await?;

    info!("Ticket claim finished {} ({})", public_key, receipt.transaction_hash);
    Ok(receipt)
}
