use std::fmt;
use std::sync::Arc;

use near_api::{Account, AccountId, NetworkConfig, RPCEndpoint, Signer};
use tracing::{info, warn};

use crate::config::EnvironmentConfig;
use crate::error::{HarnessError, Result};
use crate::keys::{self, Identity, KeyRegistry};

/// RPC connection to the target node.
#[derive(Clone)]
pub struct Connection {
    network_id: String,
    network: NetworkConfig,
}

impl Connection {
    /// Builds the network config for `config.node_url` and proves the node is
    /// reachable by querying the master account once.
    pub async fn connect(config: &EnvironmentConfig, master: &Identity) -> Result<Self> {
        let network = network_config(config)?;

        Account(master.account_id().clone())
            .view()
            .fetch_from(&network)
            .await
            .map_err(|e| {
                warn!(url = %config.node_url, error = ?e, "Master account query failed");
                HarnessError::Connectivity {
                    url: config.node_url.clone(),
                    reason: e.to_string(),
                }
            })?;

        info!(network_id = %config.network_id, url = %config.node_url, "Connected to node");
        Ok(Self {
            network_id: config.network_id.clone(),
            network,
        })
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Associates an identity with this connection. No network call.
    pub fn bind_account(&self, identity: Identity) -> AccountHandle {
        AccountHandle {
            identity,
            network_id: self.network_id.clone(),
            network: self.network.clone(),
        }
    }

    /// Binds an account whose key is already in the registry.
    pub fn bind_registered(
        &self,
        registry: &KeyRegistry,
        account_id: &AccountId,
    ) -> Result<AccountHandle> {
        let identity = registry.require(&self.network_id, account_id)?;
        Ok(self.bind_account(identity.clone()))
    }
}

fn network_config(config: &EnvironmentConfig) -> Result<NetworkConfig> {
    let url = config.node_url.parse().map_err(|e| {
        HarnessError::Configuration(format!("invalid node url {:?}: {e}", config.node_url))
    })?;
    Ok(NetworkConfig {
        network_name: config.network_id.clone(),
        rpc_endpoints: vec![RPCEndpoint::new(url)],
        ..NetworkConfig::testnet()
    })
}

/// An identity bound to a connection; everything needed to sign and submit.
#[derive(Clone)]
pub struct AccountHandle {
    identity: Identity,
    network_id: String,
    network: NetworkConfig,
}

impl AccountHandle {
    /// Binds `identity` to the same connection `other` uses.
    pub(crate) fn bind_like(other: &AccountHandle, identity: Identity) -> Self {
        Self {
            identity,
            network_id: other.network_id.clone(),
            network: other.network.clone(),
        }
    }

    /// A handle that has never talked to the node.
    #[cfg(test)]
    pub(crate) fn offline(config: &EnvironmentConfig, identity: Identity) -> Result<Self> {
        Ok(Self {
            identity,
            network_id: config.network_id.clone(),
            network: network_config(config)?,
        })
    }

    pub fn account_id(&self) -> &AccountId {
        self.identity.account_id()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn signer(&self) -> &Arc<Signer> {
        self.identity.signer()
    }

    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

impl fmt::Debug for AccountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountHandle")
            .field("account_id", self.account_id())
            .field("network_id", &self.network_id)
            .finish_non_exhaustive()
    }
}

/// Everything the scenario needs from bootstrap, built once and only read
/// afterwards.
pub struct HarnessContext {
    config: EnvironmentConfig,
    connection: Connection,
    master: AccountHandle,
}

impl HarnessContext {
    /// Loads the master key named by `config` and connects.
    pub async fn init(config: EnvironmentConfig) -> Result<Self> {
        let master = keys::load_master_identity(&config)?;
        Self::with_master(config, master).await
    }

    /// Connects with an already loaded master identity.
    pub async fn with_master(config: EnvironmentConfig, master: Identity) -> Result<Self> {
        if master.account_id() != &config.master_account {
            return Err(HarnessError::Configuration(format!(
                "master key belongs to {}, configuration expects {}",
                master.account_id(),
                config.master_account
            )));
        }
        let connection = Connection::connect(&config, &master).await?;
        let master = connection.bind_account(master);
        Ok(Self {
            config,
            connection,
            master,
        })
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn master(&self) -> &AccountHandle {
        &self.master
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use near_api::signer;

    fn master() -> Identity {
        Identity::from_secret_key(
            "test.near".parse().unwrap(),
            signer::generate_secret_key().unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn invalid_url_is_a_configuration_error() {
        let mut config = EnvironmentConfig::resolve("sandbox").unwrap();
        config.node_url = "not a url".to_string();
        let err = Connection::connect(&config, &master()).await.err().unwrap();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[tokio::test]
    async fn unreachable_node_is_a_connectivity_error() {
        let mut config = EnvironmentConfig::resolve("sandbox").unwrap();
        // Port 9 (discard) is never a NEAR RPC endpoint.
        config.node_url = "http://127.0.0.1:9".to_string();
        let err = Connection::connect(&config, &master()).await.err().unwrap();
        assert!(matches!(err, HarnessError::Connectivity { url, .. } if url == "http://127.0.0.1:9"));
    }

    #[tokio::test]
    async fn mismatched_master_key_is_rejected_before_connecting() {
        let config = EnvironmentConfig::resolve("local").unwrap();
        let stranger = master().derive("someone.near".parse().unwrap());
        let err = HarnessContext::with_master(config, stranger).await.err().unwrap();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }
}
