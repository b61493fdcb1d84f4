//! Remote ledger seam.
//!
//! The verifier only ever talks to the ticketing contract through [`Ledger`]:
//! read-only view calls for key, drop and funder state, and a single mutating
//! `claim` transaction signed by the ticket key itself.

use std::future::Future;

use crate::error::LedgerError;
use crate::keys::{PublicKey, SecretKey};
use crate::metadata::{DropInfo, FunderInfo, Gas, KeyInfo, TicketDetails};

pub mod rpc;
pub mod transaction;

pub use rpc::JsonRpcLedger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub chain_id: String,
    pub latest_block_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    /// Base58 transaction hash.
    pub transaction_hash: String,
}

pub trait Ledger: Send + Sync + 'static {
    fn status(&self) -> impl Future<Output = Result<NodeStatus, LedgerError>> + Send;

    fn key_information(
        &self,
        key: &PublicKey,
    ) -> impl Future<Output = Result<KeyInfo, LedgerError>> + Send;

    fn drop_information(
        &self,
        drop_id: &str,
    ) -> impl Future<Output = Result<DropInfo, LedgerError>> + Send;

    fn funder_information(
        &self,
        funder_id: &str,
    ) -> impl Future<Output = Result<Option<FunderInfo>, LedgerError>> + Send;

    /// Gas the contract's `claim` needs for this key.
    fn required_claim_gas(
        &self,
        key: &PublicKey,
    ) -> impl Future<Output = Result<Gas, LedgerError>> + Send;

    /// Submits `claim` signed by the ticket key.
    fn submit_claim(
        &self,
        signer: &SecretKey,
        gas: Gas,
    ) -> impl Future<Output = Result<ClaimReceipt, LedgerError>> + Send;
}

/// Key info, drop and decoded ticket metadata for a scanned secret.
pub async fn fetch_ticket_details<L: Ledger>(
    ledger: &L,
    secret: &SecretKey,
) -> Result<TicketDetails, LedgerError> {
    let public_key = secret.public_key();
    let key = ledger.key_information(&public_key).await?;
    let drop = ledger.drop_information(&key.drop_id).await?;
    let extra = drop.ticket_extra()?;

    Ok(TicketDetails {
        public_key,
        key,
        drop,
        extra,
    })
}
