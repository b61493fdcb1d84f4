//! Ticket key material.
//!
//! A ticket is an ed25519 keypair minted at purchase time. The QR code on the
//! pass carries the secret half as `ed25519:<base58>`; the ledger indexes the
//! ticket by the public half.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey};

use crate::error::KeyError;

pub const ED25519_PREFIX: &str = "ed25519";

const SEED_LEN: usize = 32;
const KEYPAIR_LEN: usize = 64;

fn split_curve(encoded: &str) -> Result<&str, KeyError> {
    let (curve, data) = encoded.split_once(':').ok_or(KeyError::MissingCurve)?;
    if curve != ED25519_PREFIX {
        return Err(KeyError::UnsupportedCurve(curve.to_string()));
    }
    Ok(data)
}

// ============== PUBLIC KEY ==============

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", ED25519_PREFIX, bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(split_curve(s)?).into_vec()?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        Ok(Self(bytes))
    }
}

// ============== SECRET KEY ==============

/// Signing half of a ticket key.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Parses `ed25519:<base58>` holding either a 64-byte keypair
    /// (seed followed by public key) or a bare 32-byte seed.
    pub fn parse(encoded: &str) -> Result<Self, KeyError> {
        let bytes = bs58::decode(split_curve(encoded.trim())?).into_vec()?;
        let signing = match bytes.len() {
            KEYPAIR_LEN => {
                let mut keypair = [0u8; KEYPAIR_LEN];
                keypair.copy_from_slice(&bytes);
                SigningKey::from_keypair_bytes(&keypair).map_err(|_| KeyError::KeypairMismatch)?
            }
            SEED_LEN => {
                let mut seed = [0u8; SEED_LEN];
                seed.copy_from_slice(&bytes);
                SigningKey::from_bytes(&seed)
            }
            other => return Err(KeyError::InvalidLength(other)),
        };
        Ok(Self(signing))
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self(SigningKey::from_bytes(&seed))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }

    /// Canonical `ed25519:<base58 keypair>` encoding, as printed on passes.
    pub fn to_encoded(&self) -> String {
        format!(
            "{}:{}",
            ED25519_PREFIX,
            bs58::encode(self.0.to_keypair_bytes()).into_string()
        )
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&self.public_key()).finish()
    }
}

impl FromStr for SecretKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
