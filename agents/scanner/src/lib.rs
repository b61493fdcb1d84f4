//! Door scanner agent for the ticketing contract.
//!
//! - Verifies scanned ticket keys against the current event
//! - Detaches a ledger claim for every first admission
//! - De-duplicates repeat scans within a session

pub mod claim;
pub mod config;
pub mod error;
pub mod event;
pub mod keys;
pub mod keystore;
pub mod ledger;
pub mod metadata;
pub mod notify;
pub mod scanner;
pub mod verifier;
pub mod window;

pub use claim::ClaimTarget;
pub use config::ScannerConfig;
pub use keys::{PublicKey, SecretKey};
pub use ledger::{JsonRpcLedger, Ledger};
pub use scanner::{ScanDebouncer, ScanSession, ScanSummary};
pub use verifier::{TicketVerifier, Verification};
