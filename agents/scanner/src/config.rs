use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::claim::ClaimTarget;
use crate::keystore::{FileKeyStore, InMemoryKeyStore, KeyStore};
use crate::ledger::JsonRpcLedger;

pub const MAINNET: &str = "mainnet";
pub const TESTNET: &str = "testnet";

const MAINNET_NODE_URL: &str = "https://rpc.mainnet.near.org";
const TESTNET_NODE_URL: &str = "https://rpc.testnet.near.org";
const MAINNET_EVENTS_CONTRACT_ID: &str = "ticketing-v1.keypom.near";
const TESTNET_EVENTS_CONTRACT_ID: &str = "1716924460613-kp-ticketing.testnet";

// ============== CONFIG ==============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub network_id: String,
    pub node_url: String,
    pub events_contract_id: String,
    pub log_filter: String,
    pub key_store: KeyStoreConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStoreConfig {
    pub backend: KeyStoreBackend,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreBackend {
    File,
    /// Ticket keys only need to outlive the claim, so nothing is persisted.
    #[default]
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub debounce_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { debounce_ms: 1000 }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::for_network(TESTNET)
    }
}

impl ScannerConfig {
    /// Defaults for a network; anything but `mainnet` is treated as testnet.
    pub fn for_network(network_id: &str) -> Self {
        let (node_url, contract_id) = if network_id == MAINNET {
            (MAINNET_NODE_URL, MAINNET_EVENTS_CONTRACT_ID)
        } else {
            (TESTNET_NODE_URL, TESTNET_EVENTS_CONTRACT_ID)
        };
        Self {
            network_id: network_id.to_string(),
            node_url: node_url.to_string(),
            events_contract_id: contract_id.to_string(),
            log_filter: "info".to_string(),
            key_store: KeyStoreConfig::default(),
            scan: ScanConfig::default(),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!("Config written to {:?}", path);
        Ok(())
    }

    /// Switches to another network's node and contract, keeping local settings.
    pub fn with_network(self, network_id: &str) -> Self {
        let defaults = Self::for_network(network_id);
        Self {
            network_id: defaults.network_id,
            node_url: defaults.node_url,
            events_contract_id: defaults.events_contract_id,
            ..self
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.scan.debounce_ms)
    }

    pub fn ledger(&self) -> JsonRpcLedger {
        JsonRpcLedger::new(&self.node_url, &self.events_contract_id)
    }

    pub fn claim_target(&self) -> ClaimTarget {
        ClaimTarget::new(&self.network_id, &self.events_contract_id)
    }

    pub fn key_store(&self) -> Arc<dyn KeyStore> {
        match self.key_store.backend {
            KeyStoreBackend::Memory => Arc::new(InMemoryKeyStore::new()),
            KeyStoreBackend::File => {
                let root = self
                    .key_store
                    .path
                    .clone()
                    .unwrap_or_else(FileKeyStore::default_root);
                Arc::new(FileKeyStore::new(root))
            }
        }
    }
}
