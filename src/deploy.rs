use std::path::Path;

use near_api::{AccountId, Contract, NearToken};
use tracing::{info, warn};

use crate::client::AccountHandle;
use crate::error::{HarnessError, Result};
use crate::keys::KeyRegistry;
use crate::provision::create_funded_account;

/// Funding for the contract account: 100 NEAR, enough for code storage.
pub const DEFAULT_DEPLOYMENT_BALANCE: NearToken = NearToken::from_near(100);

/// Reads the compiled contract. The bytes are not inspected.
pub fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    let wasm = std::fs::read(path).map_err(|source| HarnessError::ArtifactRead {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = wasm.len(), "Read contract artifact");
    Ok(wasm)
}

/// Creates `contract_account_id` funded with `deployment_balance` and uploads
/// `wasm` to it, without an init call. The contract account shares the
/// master's key and is registered like any other identity.
pub async fn deploy(
    master: &AccountHandle,
    registry: &mut KeyRegistry,
    contract_account_id: &AccountId,
    wasm: Vec<u8>,
    deployment_balance: NearToken,
) -> Result<AccountHandle> {
    let identity = master.identity().derive(contract_account_id.clone());
    create_funded_account(
        master,
        contract_account_id,
        identity.public_key(),
        deployment_balance,
    )
    .await?;
    registry.register(master.network_id(), identity.clone());

    let code_len = wasm.len();
    let outcome = Contract::deploy(contract_account_id.clone())
        .use_code(wasm)
        .without_init_call()
        .with_signer(identity.signer().clone())
        .send_to(master.network())
        .await
        .map_err(|e| deployment_error(contract_account_id, format!("{e:?}")))?;
    outcome
        .into_result()
        .map_err(|e| deployment_error(contract_account_id, format!("{e:?}")))?;

    info!(
        account_id = %contract_account_id,
        code_len,
        balance = %deployment_balance,
        "Deployed contract"
    );
    Ok(AccountHandle::bind_like(master, identity))
}

fn deployment_error(account_id: &AccountId, detail: String) -> HarnessError {
    warn!(%account_id, %detail, "Deployment rejected");
    HarnessError::Deployment {
        account_id: account_id.to_string(),
        detail,
    }
}
