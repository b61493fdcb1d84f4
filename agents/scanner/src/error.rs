use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key must be of the form `ed25519:<base58>`")]
    MissingCurve,
    #[error("unsupported key curve `{0}`")]
    UnsupportedCurve(String),
    #[error("invalid base58 key data: {0}")]
    Base58(#[from] bs58::decode::Error),
    #[error("invalid key length {0}")]
    InvalidLength(usize),
    #[error("keypair public half does not match its seed")]
    KeypairMismatch,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("drop has no ticket `extra` metadata")]
    MissingExtra,
    #[error("malformed ticket `extra` metadata: {0}")]
    Extra(#[source] serde_json::Error),
    #[error("malformed funder metadata: {0}")]
    Funder(#[source] serde_json::Error),
}

// ======================================================================
// LEDGER ERRORS
// ======================================================================

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC error {name}: {message}")]
    Rpc { name: String, message: String },
    #[error("unexpected RPC response: {0}")]
    UnexpectedResponse(String),
    #[error("failed to decode view result: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to encode transaction: {0}")]
    Encode(#[from] std::io::Error),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Key(#[from] KeyError),
}

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("key store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed credential file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Key(#[from] KeyError),
}

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("failed to install signing key: {0}")]
    KeyStore(#[from] KeyStoreError),
    #[error("key installation aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("ledger is unavailable: {0}")]
    Unavailable(#[source] LedgerError),
}
