//! Borsh wire format of a signed function-call transaction.

use std::io::{self, Write};

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};

use crate::keys::{PublicKey, SecretKey};

const ED25519_KEY_TYPE: u8 = 0;
const FUNCTION_CALL_ACTION: u8 = 2;

struct WirePublicKey([u8; 32]);

impl BorshSerialize for WirePublicKey {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        ED25519_KEY_TYPE.serialize(writer)?;
        self.0.serialize(writer)
    }
}

struct WireSignature([u8; 64]);

impl BorshSerialize for WireSignature {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        ED25519_KEY_TYPE.serialize(writer)?;
        self.0.serialize(writer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct FunctionCall {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: u64,
    pub deposit: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FunctionCall(FunctionCall),
}

impl BorshSerialize for Action {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Action::FunctionCall(call) => {
                FUNCTION_CALL_ACTION.serialize(writer)?;
                call.serialize(writer)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: [u8; 32],
    pub actions: Vec<Action>,
}

impl BorshSerialize for Transaction {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.signer_id.serialize(writer)?;
        WirePublicKey(*self.public_key.as_bytes()).serialize(writer)?;
        self.nonce.serialize(writer)?;
        self.receiver_id.serialize(writer)?;
        self.block_hash.serialize(writer)?;
        self.actions.serialize(writer)
    }
}

pub struct SignedTransaction {
    pub transaction: Transaction,
    signature: [u8; 64],
    hash: [u8; 32],
}

impl Transaction {
    /// Signs the SHA-256 digest of the borsh encoding.
    pub fn sign(self, key: &SecretKey) -> io::Result<SignedTransaction> {
        let bytes = borsh::to_vec(&self)?;
        let hash: [u8; 32] = Sha256::digest(&bytes).into();
        let signature = key.sign(&hash);
        Ok(SignedTransaction {
            transaction: self,
            signature,
            hash,
        })
    }
}

impl SignedTransaction {
    pub fn hash(&self) -> String {
        bs58::encode(self.hash).into_string()
    }

    pub fn signature(&self) -> &[u8; 64] {
        &self.signature
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut out = borsh::to_vec(&self.transaction)?;
        WireSignature(self.signature).serialize(&mut out)?;
        Ok(out)
    }
}
