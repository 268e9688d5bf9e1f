use std::path::PathBuf;

use near_api::AccountId;

use crate::error::{HarnessError, Result};

/// Where the harness runs and who it runs as. Resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub network_id: String,
    pub node_url: String,
    pub master_account: AccountId,
    pub contract_account: AccountId,
    pub key_path: PathBuf,
}

impl EnvironmentConfig {
    /// Resolves a named environment. `sandbox` and `local` both target a
    /// locally running sandbox node; any other name is rejected.
    pub fn resolve(name: &str) -> Result<Self> {
        match name {
            "sandbox" | "local" => Ok(Self {
                network_id: "sandbox".to_string(),
                node_url: "http://localhost:3030".to_string(),
                master_account: parse_account_id("test.near")?,
                contract_account: parse_account_id("ft.test.near")?,
                key_path: PathBuf::from("/tmp/near-sandbox/validator_key.json"),
            }),
            other => Err(HarnessError::Configuration(format!(
                "unknown environment {other:?}, expected \"sandbox\" or \"local\""
            ))),
        }
    }

    /// Configuration for a node the caller already started, e.g. a
    /// `near-sandbox` instance whose master is the genesis account.
    pub fn for_node(node_url: impl Into<String>, master_account: AccountId) -> Result<Self> {
        let contract_account = parse_account_id(&format!("ft.{master_account}"))?;
        Ok(Self {
            network_id: "sandbox".to_string(),
            node_url: node_url.into(),
            master_account,
            contract_account,
            key_path: PathBuf::new(),
        })
    }
}

pub(crate) fn parse_account_id(raw: &str) -> Result<AccountId> {
    raw.parse()
        .map_err(|e| HarnessError::Configuration(format!("invalid account id {raw:?}: {e}")))
}
