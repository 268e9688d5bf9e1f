use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use near_api::{AccountId, Signer};
use near_api_types::{PublicKey, SecretKey};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::EnvironmentConfig;
use crate::error::{HarnessError, Result};

/// On-disk key file as written by the sandbox (`validator_key.json`).
/// Older tooling writes `private_key` instead of `secret_key`.
#[derive(Debug, Deserialize)]
struct KeyFile {
    #[serde(default)]
    secret_key: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
}

/// An account together with the key it signs with.
#[derive(Clone)]
pub struct Identity {
    account_id: AccountId,
    secret_key: SecretKey,
    signer: Arc<Signer>,
}

impl Identity {
    pub fn from_secret_key(account_id: AccountId, secret_key: SecretKey) -> Result<Self> {
        let signer = Signer::from_secret_key(secret_key.clone()).map_err(|e| {
            HarnessError::Configuration(format!("cannot build signer for {account_id}: {e}"))
        })?;
        Ok(Self {
            account_id,
            secret_key,
            signer,
        })
    }

    /// A new identity for `account_id` that reuses this identity's key pair.
    pub fn derive(&self, account_id: AccountId) -> Self {
        Self {
            account_id,
            secret_key: self.secret_key.clone(),
            signer: self.signer.clone(),
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret_key.public_key()
    }

    pub fn signer(&self) -> &Arc<Signer> {
        &self.signer
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Reads the secret key from a JSON key file.
pub fn load_key_file(path: &Path) -> Result<SecretKey> {
    let key_err = |reason: String| HarnessError::KeyLoad {
        path: path.to_path_buf(),
        reason,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| key_err(e.to_string()))?;
    let file: KeyFile = serde_json::from_str(&raw).map_err(|e| key_err(e.to_string()))?;
    let encoded = file
        .secret_key
        .or(file.private_key)
        .ok_or_else(|| key_err("neither secret_key nor private_key is present".to_string()))?;

    encoded
        .parse::<SecretKey>()
        .map_err(|e| key_err(format!("malformed key: {e}")))
}

/// Loads the master identity named by the configuration.
pub fn load_master_identity(config: &EnvironmentConfig) -> Result<Identity> {
    let secret_key = load_key_file(&config.key_path)?;
    info!(
        account_id = %config.master_account,
        key_path = %config.key_path.display(),
        "Loaded master key"
    );
    Identity::from_secret_key(config.master_account.clone(), secret_key)
}

/// In-memory key store keyed by `(network_id, account_id)`. Lives for one
/// run and is never persisted.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: HashMap<(String, AccountId), Identity>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, network_id: &str, identity: Identity) {
        debug!(network_id, account_id = %identity.account_id, "Registered key");
        self.keys
            .insert((network_id.to_string(), identity.account_id.clone()), identity);
    }

    pub fn get(&self, network_id: &str, account_id: &AccountId) -> Option<&Identity> {
        self.keys.get(&(network_id.to_string(), account_id.clone()))
    }

    /// Looks up a registered identity, failing if the account was never
    /// provisioned on this network.
    pub fn require(&self, network_id: &str, account_id: &AccountId) -> Result<&Identity> {
        self.get(network_id, account_id).ok_or_else(|| {
            HarnessError::Configuration(format!(
                "no key registered for {account_id} on {network_id}"
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use near_api::signer;
    use std::io::Write;

    fn write_key_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn encoded_key() -> String {
        signer::generate_secret_key().unwrap().to_string()
    }

    #[test]
    fn reads_secret_key_field() {
        let key = encoded_key();
        let file = write_key_file(&format!(
            r#"{{"account_id":"test.near","public_key":"ignored","secret_key":"{key}"}}"#
        ));
        let loaded = load_key_file(file.path()).unwrap();
        assert_eq!(loaded.to_string(), key);
    }

    #[test]
    fn falls_back_to_private_key_field() {
        let key = encoded_key();
        let file = write_key_file(&format!(r#"{{"private_key":"{key}"}}"#));
        let loaded = load_key_file(file.path()).unwrap();
        assert_eq!(loaded.to_string(), key);
    }

    #[test]
    fn missing_file_is_a_key_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_key_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, HarnessError::KeyLoad { .. }));
    }

    #[test]
    fn file_without_key_fields_is_rejected() {
        let file = write_key_file(r#"{"account_id":"test.near"}"#);
        let err = load_key_file(file.path()).unwrap_err();
        assert!(matches!(err, HarnessError::KeyLoad { reason, .. } if reason.contains("neither")));
    }

    #[test]
    fn malformed_json_and_key_are_rejected() {
        let not_json = write_key_file("secret_key = nope");
        assert!(matches!(
            load_key_file(not_json.path()),
            Err(HarnessError::KeyLoad { .. })
        ));

        let bad_key = write_key_file(r#"{"secret_key":"ed25519:notbase58!"}"#);
        assert!(matches!(
            load_key_file(bad_key.path()),
            Err(HarnessError::KeyLoad { .. })
        ));
    }

    #[test]
    fn registry_is_scoped_by_network() {
        let master = Identity::from_secret_key(
            "test.near".parse().unwrap(),
            signer::generate_secret_key().unwrap(),
        )
        .unwrap();
        let alice = master.derive("alice.test.near".parse().unwrap());
        assert_eq!(alice.public_key(), master.public_key());

        let mut registry = KeyRegistry::new();
        registry.register("sandbox", alice.clone());

        assert_eq!(registry.len(), 1);
        assert!(registry.get("sandbox", alice.account_id()).is_some());
        assert!(registry.get("testnet", alice.account_id()).is_none());
        assert!(matches!(
            registry.require("sandbox", master.account_id()),
            Err(HarnessError::Configuration(_))
        ));
    }
}
