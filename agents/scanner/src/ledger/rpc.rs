//! JSON-RPC client for the ticketing contract.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::transaction::{Action, FunctionCall, Transaction};
use super::{ClaimReceipt, Ledger, NodeStatus};
use crate::error::LedgerError;
use crate::keys::{PublicKey, SecretKey};
use crate::metadata::{DropInfo, FunderInfo, Gas, KeyInfo};

// ── Contract methods ────────────────────────────────────────────

const GET_KEY_INFORMATION: &str = "get_key_information";
const GET_DROP_INFORMATION: &str = "get_drop_information";
const GET_FUNDER_INFO: &str = "get_funder_info";
const CLAIM: &str = "claim";

// ── JSON-RPC envelope ───────────────────────────────────────────

#[derive(Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'static str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct StatusResult {
    chain_id: String,
    sync_info: SyncInfo,
}

#[derive(Deserialize)]
struct SyncInfo {
    latest_block_height: u64,
}

#[derive(Deserialize)]
struct AccessKeyView {
    nonce: u64,
    block_hash: String,
}

fn rpc_error(error: &Value) -> LedgerError {
    let name = error["cause"]["name"]
        .as_str()
        .or_else(|| error["name"].as_str())
        .unwrap_or("RPC_ERROR")
        .to_string();
    let message = error["data"]
        .as_str()
        .or_else(|| error["message"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    LedgerError::Rpc { name, message }
}

fn view_params(contract_id: &str, method_name: &str, args: &Value) -> Result<Value, LedgerError> {
    Ok(json!({
        "request_type": "call_function",
        "finality": "optimistic",
        "account_id": contract_id,
        "method_name": method_name,
        "args_base64": BASE64.encode(serde_json::to_vec(args)?),
    }))
}

fn decode_view_result<T: DeserializeOwned>(result: Value) -> Result<T, LedgerError> {
    if let Some(message) = result["error"].as_str() {
        return Err(LedgerError::Rpc {
            name: "CONTRACT_ERROR".to_string(),
            message: message.to_string(),
        });
    }
    let bytes: Vec<u8> = serde_json::from_value(result["result"].clone())?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn decode_block_hash(encoded: &str) -> Result<[u8; 32], LedgerError> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| LedgerError::UnexpectedResponse(format!("block hash: {e}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| LedgerError::UnexpectedResponse(format!("block hash length {}", bytes.len())))
}

// ── Client ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JsonRpcLedger {
    client: reqwest::Client,
    node_url: String,
    contract_id: String,
}

impl JsonRpcLedger {
    pub fn new(node_url: impl Into<String>, contract_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            node_url: node_url.into(),
            contract_id: contract_id.into(),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, LedgerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: "dontcare",
            method,
            params,
        };

        let resp: RpcResponse = self
            .client
            .post(&self.node_url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = resp.error {
            return Err(rpc_error(&err));
        }
        resp.result
            .ok_or_else(|| LedgerError::UnexpectedResponse(format!("{method}: missing result")))
    }

    async fn view<T: DeserializeOwned>(&self, method_name: &str, args: Value) -> Result<T, LedgerError> {
        debug!("view {}.{} {}", self.contract_id, method_name, args);
        let params = view_params(&self.contract_id, method_name, &args)?;
        decode_view_result(self.call("query", params).await?)
    }

    async fn access_key(&self, key: &PublicKey) -> Result<AccessKeyView, LedgerError> {
        let result = self
            .call(
                "query",
                json!({
                    "request_type": "view_access_key",
                    "finality": "final",
                    "account_id": self.contract_id,
                    "public_key": key.to_string(),
                }),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }
}

impl Ledger for JsonRpcLedger {
    async fn status(&self) -> Result<NodeStatus, LedgerError> {
        let status: StatusResult = serde_json::from_value(self.call("status", json!([])).await?)?;
        Ok(NodeStatus {
            chain_id: status.chain_id,
            latest_block_height: status.sync_info.latest_block_height,
        })
    }

    async fn key_information(&self, key: &PublicKey) -> Result<KeyInfo, LedgerError> {
        self.view(GET_KEY_INFORMATION, json!({ "key": key.to_string() }))
            .await
    }

    async fn drop_information(&self, drop_id: &str) -> Result<DropInfo, LedgerError> {
        self.view(GET_DROP_INFORMATION, json!({ "drop_id": drop_id }))
            .await
    }

    async fn funder_information(&self, funder_id: &str) -> Result<Option<FunderInfo>, LedgerError> {
        self.view(GET_FUNDER_INFO, json!({ "account_id": funder_id }))
            .await
    }

    async fn required_claim_gas(&self, key: &PublicKey) -> Result<Gas, LedgerError> {
        Ok(self.key_information(key).await?.claim_gas())
    }

    async fn submit_claim(&self, signer: &SecretKey, gas: Gas) -> Result<ClaimReceipt, LedgerError> {
        let public_key = signer.public_key();
        let access = self.access_key(&public_key).await?;

        let tx = Transaction {
            signer_id: self.contract_id.clone(),
            public_key,
            nonce: access.nonce + 1,
            receiver_id: self.contract_id.clone(),
            block_hash: decode_block_hash(&access.block_hash)?,
            actions: vec![Action::FunctionCall(FunctionCall {
                method_name: CLAIM.to_string(),
                args: serde_json::to_vec(&json!({ "account_id": self.contract_id }))?,
                gas: gas.0,
                deposit: 0,
            })],
        };
        let signed = tx.sign(signer)?;
        info!("Submitting claim {} for {}", signed.hash(), public_key);

        let result = self
            .call("broadcast_tx_commit", json!([BASE64.encode(signed.to_bytes()?)]))
            .await?;

        if let Some(failure) = result["status"].get("Failure") {
            return Err(LedgerError::TransactionFailed(failure.to_string()));
        }

        let transaction_hash = result["transaction"]["hash"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| signed.hash());
        Ok(ClaimReceipt { transaction_hash })
    }
}
