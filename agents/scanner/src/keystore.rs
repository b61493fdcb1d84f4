//! Key material store, scoped per network and account.
//!
//! The file layout follows the `.near-credentials` convention,
//! `<root>/<network>/<account>.json` holding `account_id`, `public_key` and
//! `private_key`, but lives under the scanner's own data directory so ticket
//! keys never overwrite an operator's account credentials.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::KeyStoreError;
use crate::keys::SecretKey;

pub trait KeyStore: Send + Sync {
    fn set_key(&self, network_id: &str, account_id: &str, key: &SecretKey) -> Result<(), KeyStoreError>;

    fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<SecretKey>, KeyStoreError>;

    fn remove_key(&self, network_id: &str, account_id: &str) -> Result<(), KeyStoreError>;
}

// ============== IN-MEMORY ==============

#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: Mutex<HashMap<(String, String), SecretKey>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for InMemoryKeyStore {
    fn set_key(&self, network_id: &str, account_id: &str, key: &SecretKey) -> Result<(), KeyStoreError> {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((network_id.to_string(), account_id.to_string()), key.clone());
        Ok(())
    }

    fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<SecretKey>, KeyStoreError> {
        Ok(self
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(network_id.to_string(), account_id.to_string()))
            .cloned())
    }

    fn remove_key(&self, network_id: &str, account_id: &str) -> Result<(), KeyStoreError> {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(network_id.to_string(), account_id.to_string()));
        Ok(())
    }
}

// ============== FILE ==============

#[derive(Debug, Serialize, Deserialize)]
struct CredentialFile {
    account_id: String,
    public_key: String,
    private_key: String,
}

#[derive(Debug, Clone)]
pub struct FileKeyStore {
    root: PathBuf,
}

impl FileKeyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<data dir>/ticket-scanner/credentials`, relative to the working
    /// directory when the platform has no data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_default()
            .join("ticket-scanner")
            .join("credentials")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, network_id: &str, account_id: &str) -> PathBuf {
        self.root.join(network_id).join(format!("{account_id}.json"))
    }
}

/// Writes a file readable by its owner only.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path)?;
    // `mode` only applies on create; tighten files left by older runs.
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

impl KeyStore for FileKeyStore {
    fn set_key(&self, network_id: &str, account_id: &str, key: &SecretKey) -> Result<(), KeyStoreError> {
        let path = self.path_for(network_id, account_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let credential = CredentialFile {
            account_id: account_id.to_string(),
            public_key: key.public_key().to_string(),
            private_key: key.to_encoded(),
        };
        write_private(&path, &serde_json::to_vec_pretty(&credential)?)?;
        debug!("Stored key {} at {:?}", credential.public_key, path);
        Ok(())
    }

    fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<SecretKey>, KeyStoreError> {
        let path = self.path_for(network_id, account_id);
        if !path.exists() {
            return Ok(None);
        }
        let credential: CredentialFile = serde_json::from_slice(&fs::read(&path)?)?;
        Ok(Some(SecretKey::parse(&credential.private_key)?))
    }

    fn remove_key(&self, network_id: &str, account_id: &str) -> Result<(), KeyStoreError> {
        let path = self.path_for(network_id, account_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ticket-scanner-keystore-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn in_memory_slots_are_scoped_by_network_and_account() {
        let store = InMemoryKeyStore::new();
        let key = SecretKey::from_seed([1u8; 32]);
        store.set_key("testnet", "events.testnet", &key).unwrap();

        let found = store.get_key("testnet", "events.testnet").unwrap().unwrap();
        assert_eq!(found.public_key(), key.public_key());
        assert!(store.get_key("mainnet", "events.testnet").unwrap().is_none());

        store.remove_key("testnet", "events.testnet").unwrap();
        assert!(store.get_key("testnet", "events.testnet").unwrap().is_none());
    }

    #[test]
    fn file_store_writes_credential_layout() {
        let root = scratch_dir("layout");
        let store = FileKeyStore::new(&root);
        let key = SecretKey::from_seed([2u8; 32]);
        store.set_key("testnet", "events.testnet", &key).unwrap();

        let path = root.join("testnet").join("events.testnet.json");
        let written: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["account_id"], "events.testnet");
        assert_eq!(written["public_key"], key.public_key().to_string());

        let loaded = store.get_key("testnet", "events.testnet").unwrap().unwrap();
        assert_eq!(loaded.public_key(), key.public_key());

        store.remove_key("testnet", "events.testnet").unwrap();
        assert!(!path.exists());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn default_root_is_not_the_shared_credentials_dir() {
        let root = FileKeyStore::default_root();
        assert!(root.ends_with("ticket-scanner/credentials"));
        assert!(!root.components().any(|c| c.as_os_str() == ".near-credentials"));
    }

    #[cfg(unix)]
    #[test]
    fn credential_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let root = scratch_dir("mode");
        let path = root.join("testnet").join("events.testnet.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileKeyStore::new(&root);
        store
            .set_key("testnet", "events.testnet", &SecretKey::from_seed([3u8; 32]))
            .unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);

        store
            .set_key("testnet", "other.testnet", &SecretKey::from_seed([4u8; 32]))
            .unwrap();
        let fresh = root.join("testnet").join("other.testnet.json");
        assert_eq!(fs::metadata(&fresh).unwrap().permissions().mode() & 0o777, 0o600);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_store_reports_corrupt_credentials() {
        let root = scratch_dir("corrupt");
        fs::create_dir_all(root.join("testnet")).unwrap();
        fs::write(root.join("testnet").join("events.testnet.json"), b"{").unwrap();

        let store = FileKeyStore::new(&root);
        assert!(matches!(
            store.get_key("testnet", "events.testnet"),
            Err(KeyStoreError::Json(_))
        ));
        let _ = fs::remove_dir_all(root);
    }
}
