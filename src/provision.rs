use near_api::{Account, AccountId, NearToken};
use near_api_types::PublicKey;
use tracing::{info, warn};

use crate::client::AccountHandle;
use crate::config::parse_account_id;
use crate::error::{HarnessError, Result, classify_account_failure};
use crate::keys::KeyRegistry;

/// Funding for each test identity: 10 NEAR.
pub const DEFAULT_IDENTITY_BALANCE: NearToken = NearToken::from_near(10);

/// Sub-account id `<prefix>.<master>`.
pub fn sub_account_id(master: &AccountId, prefix: &str) -> Result<AccountId> {
    if prefix.is_empty() || prefix.contains('.') {
        return Err(HarnessError::Configuration(format!(
            "account prefix {prefix:?} must be a single non-empty label"
        )));
    }
    parse_account_id(&format!("{prefix}.{master}"))
}

/// Creates `<prefix>.<master>` funded with `initial_balance`, sharing the
/// master's key, and registers it.
pub async fn create_identity(
    master: &AccountHandle,
    registry: &mut KeyRegistry,
    name_prefix: &str,
    initial_balance: NearToken,
) -> Result<AccountHandle> {
    let account_id = sub_account_id(master.account_id(), name_prefix)?;
    let identity = master.identity().derive(account_id.clone());

    create_funded_account(master, &account_id, identity.public_key(), initial_balance).await?;
    registry.register(master.network_id(), identity.clone());

    info!(%account_id, balance = %initial_balance, "Provisioned identity");
    Ok(AccountHandle::bind_like(master, identity))
}

/// Submits a create-account transaction from `master` and waits for its
/// outcome. Node rejections are mapped onto the provisioning errors.
pub(crate) async fn create_funded_account(
    master: &AccountHandle,
    account_id: &AccountId,
    public_key: PublicKey,
    balance: NearToken,
) -> Result<()> {
    let outcome = Account::create_account(account_id.clone())
        .fund_myself(master.account_id().clone(), balance)
        .with_public_key(public_key)
        .with_signer(master.signer().clone())
        .send_to(master.network())
        .await
        .map_err(|e| rejection(account_id, format!("{e:?}")))?;

    outcome
        .into_result()
        .map_err(|e| rejection(account_id, format!("{e:?}")))?;
    Ok(())
}

fn rejection(account_id: &AccountId, detail: String) -> HarnessError {
    warn!(%account_id, %detail, "Account creation rejected");
    classify_account_failure(account_id.as_str(), &detail).unwrap_or_else(|| {
        HarnessError::Rpc(format!("account creation for {account_id} failed: {detail}"))
    })
}
