use std::fmt;
use std::path::PathBuf;

use near_api::{AccountId, NearToken};
use near_sdk::json_types::{Base64VecU8, U128};
use serde::Serialize;
use tracing::{error, info};

use crate::client::{AccountHandle, HarnessContext};
use crate::config::EnvironmentConfig;
use crate::deploy::{self, DEFAULT_DEPLOYMENT_BALANCE};
use crate::error::{HarnessError, Result};
use crate::keys::{Identity, KeyRegistry};
use crate::provision::{self, DEFAULT_IDENTITY_BALANCE};
use crate::proxy::{ContractProxy, FT_METHODS};
use crate::token::{FungibleToken, FungibleTokenMetadata, StorageBalance, StorageBalanceBounds};

/// Storage cost of one account in the token contract, in yoctoNEAR.
pub const STORAGE_COST: u128 = 1_250_000_000_000_000_000_000;

/// Initial supply minted to the owner; above 2^53 on purpose.
pub const TOTAL_SUPPLY: u128 = 10_000_000_000_000_000_000_000;

/// Prefix of an account that is never provisioned or registered.
const UNREGISTERED_PREFIX: &str = "carol";

/// Scenario progress. Transitions only move forward; any error moves to
/// `Failed`, remembering where it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Uninitialized,
    NetworkReady,
    AccountsReady,
    ContractDeployed,
    MetadataInitialized,
    Verified,
    Failed { during: Stage },
}

/// The non-terminal states, used to record where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uninitialized,
    NetworkReady,
    AccountsReady,
    ContractDeployed,
    MetadataInitialized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Uninitialized => "uninitialized",
            Stage::NetworkReady => "network ready",
            Stage::AccountsReady => "accounts ready",
            Stage::ContractDeployed => "contract deployed",
            Stage::MetadataInitialized => "metadata initialized",
        };
        f.write_str(name)
    }
}

impl ScenarioState {
    fn stage(self) -> Option<Stage> {
        match self {
            ScenarioState::Uninitialized => Some(Stage::Uninitialized),
            ScenarioState::NetworkReady => Some(Stage::NetworkReady),
            ScenarioState::AccountsReady => Some(Stage::AccountsReady),
            ScenarioState::ContractDeployed => Some(Stage::ContractDeployed),
            ScenarioState::MetadataInitialized => Some(Stage::MetadataInitialized),
            ScenarioState::Verified | ScenarioState::Failed { .. } => None,
        }
    }
}

/// Inputs of one run. `artifact_path` has no default.
#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    pub artifact_path: PathBuf,
    pub owner_prefix: String,
    pub peer_prefix: String,
    pub identity_balance: NearToken,
    pub deployment_balance: NearToken,
    pub total_supply: U128,
    pub metadata: FungibleTokenMetadata,
    pub expected_storage_cost: U128,
}

impl ScenarioSettings {
    pub fn new(artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            owner_prefix: "alice".to_string(),
            peer_prefix: "bob".to_string(),
            identity_balance: DEFAULT_IDENTITY_BALANCE,
            deployment_balance: DEFAULT_DEPLOYMENT_BALANCE,
            total_supply: U128(TOTAL_SUPPLY),
            metadata: cat_token_metadata(),
            expected_storage_cost: U128(STORAGE_COST),
        }
    }
}

/// Metadata of the CAT token used by the scenario.
pub fn cat_token_metadata() -> FungibleTokenMetadata {
    FungibleTokenMetadata {
        spec: "1.1.0".to_string(),
        name: "CAT Token".to_string(),
        symbol: "CAT".to_string(),
        icon: Some("C-A-T-C-H".to_string()),
        reference: "https://github.com/near/core-contracts/tree/master/w-near-141".to_string(),
        // base64 "AK3YRHqKhCJNmKfV6SrutnlWW/icN5J8NUPtKsNXR1M="
        reference_hash: Base64VecU8(vec![
            0x00, 0xad, 0xd8, 0x44, 0x7a, 0x8a, 0x84, 0x22, 0x4d, 0x98, 0xa7, 0xd5, 0xe9, 0x2a,
            0xee, 0xb6, 0x79, 0x56, 0x5b, 0xf8, 0x9c, 0x37, 0x92, 0x7c, 0x35, 0x43, 0xed, 0x2a,
            0xc3, 0x57, 0x47, 0x53,
        ]),
        decimals: 0,
    }
}

/// What a verified run observed.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub contract_id: AccountId,
    pub owner_id: AccountId,
    pub peer_id: AccountId,
    pub checks: Vec<String>,
}

/// Drives the deploy-and-verify sequence.
#[derive(Debug)]
pub struct Scenario {
    settings: ScenarioSettings,
    state: ScenarioState,
    registry: KeyRegistry,
    checks: Vec<String>,
}

impl Scenario {
    pub fn new(settings: ScenarioSettings) -> Self {
        Self {
            settings,
            state: ScenarioState::Uninitialized,
            registry: KeyRegistry::new(),
            checks: Vec::new(),
        }
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Runs the scenario, loading the master key from `config.key_path`.
    pub async fn run(&mut self, config: EnvironmentConfig) -> Result<ScenarioReport> {
        let result = match HarnessContext::init(config).await {
            Ok(ctx) => {
                self.advance(ScenarioState::NetworkReady);
                self.run_steps(&ctx).await
            }
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    /// Runs the scenario with a master identity the caller already holds.
    pub async fn run_with_master(
        &mut self,
        config: EnvironmentConfig,
        master: Identity,
    ) -> Result<ScenarioReport> {
        let result = match HarnessContext::with_master(config, master).await {
            Ok(ctx) => {
                self.advance(ScenarioState::NetworkReady);
                self.run_steps(&ctx).await
            }
            Err(e) => Err(e),
        };
        self.settle(result)
    }

    fn settle(&mut self, result: Result<ScenarioReport>) -> Result<ScenarioReport> {
        match result {
            Ok(report) => {
                self.advance(ScenarioState::Verified);
                info!(checks = report.checks.len(), "Scenario verified");
                Ok(report)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    async fn run_steps(&mut self, ctx: &HarnessContext) -> Result<ScenarioReport> {
        let master = ctx.master();
        self.registry
            .register(master.network_id(), master.identity().clone());

        let owner = provision::create_identity(
            master,
            &mut self.registry,
            &self.settings.owner_prefix,
            self.settings.identity_balance,
        )
        .await?;
        let peer = provision::create_identity(
            master,
            &mut self.registry,
            &self.settings.peer_prefix,
            self.settings.identity_balance,
        )
        .await?;
        self.advance(ScenarioState::AccountsReady);

        let contract_id = ctx.config().contract_account.clone();
        let wasm = deploy::read_artifact(&self.settings.artifact_path)?;
        deploy::deploy(
            master,
            &mut self.registry,
            &contract_id,
            wasm,
            self.settings.deployment_balance,
        )
        .await?;
        self.advance(ScenarioState::ContractDeployed);

        let owner_proxy = self.proxy_for(ctx, &owner, &contract_id)?;
        let peer_proxy = self.proxy_for(ctx, &peer, &contract_id)?;
        let as_owner = FungibleToken::new(&owner_proxy);
        let as_peer = FungibleToken::new(&peer_proxy);

        as_owner
            .init(
                owner.account_id(),
                self.settings.total_supply,
                &self.settings.metadata,
            )
            .await?;
        self.advance(ScenarioState::MetadataInitialized);

        self.verify(ctx, &as_owner, &as_peer, owner.account_id(), peer.account_id())
            .await?;

        Ok(ScenarioReport {
            contract_id,
            owner_id: owner.account_id().clone(),
            peer_id: peer.account_id().clone(),
            checks: self.checks.clone(),
        })
    }

    /// Proxies are only built for identities whose key is registered.
    fn proxy_for(
        &self,
        ctx: &HarnessContext,
        identity: &AccountHandle,
        contract_id: &AccountId,
    ) -> Result<ContractProxy> {
        let caller = ctx
            .connection()
            .bind_registered(&self.registry, identity.account_id())?;
        Ok(ContractProxy::new(caller, contract_id.clone(), FT_METHODS))
    }

    async fn verify(
        &mut self,
        ctx: &HarnessContext,
        as_owner: &FungibleToken<'_>,
        as_peer: &FungibleToken<'_>,
        owner_id: &AccountId,
        peer_id: &AccountId,
    ) -> Result<()> {
        let cost = self.settings.expected_storage_cost;
        let expected_bounds = StorageBalanceBounds {
            min: cost,
            max: Some(cost),
        };
        let expected_balance = Some(StorageBalance {
            total: cost,
            available: U128(0),
        });

        let bounds = as_owner.storage_balance_bounds().await?;
        self.check("storage_balance_bounds()", &expected_bounds, &bounds)?;

        let owner_balance = as_peer.storage_balance_of(owner_id).await?;
        self.check(
            &format!("storage_balance_of({owner_id})"),
            &expected_balance,
            &owner_balance,
        )?;

        // Only the owner is registered by `new`; the peer registers itself
        // with exactly the minimum so its record matches the owner's.
        let registered = as_peer
            .storage_deposit(None, NearToken::from_yoctonear(bounds.min.0))
            .await?;
        self.check(
            &format!("storage_deposit() by {peer_id}"),
            &expected_balance,
            &Some(registered),
        )?;

        let peer_balance = as_peer.storage_balance_of(peer_id).await?;
        self.check(
            &format!("storage_balance_of({peer_id})"),
            &expected_balance,
            &peer_balance,
        )?;

        let reinit = as_owner
            .init(owner_id, self.settings.total_supply, &self.settings.metadata)
            .await;
        match reinit {
            Err(HarnessError::ContractExecution { .. }) => self.pass("second new() is rejected"),
            Err(e) => return Err(e),
            Ok(()) => {
                return Err(HarnessError::AssertionMismatch {
                    check: "second new() is rejected".to_string(),
                    expected: "ContractExecutionError".to_string(),
                    actual: "success".to_string(),
                });
            }
        }

        let stranger = provision::sub_account_id(&ctx.config().master_account, UNREGISTERED_PREFIX)?;
        let stranger_balance = as_peer.storage_balance_of(&stranger).await?;
        self.check(
            &format!("storage_balance_of({stranger})"),
            &None::<StorageBalance>,
            &stranger_balance,
        )?;

        let bounds_again = as_peer.storage_balance_bounds().await?;
        self.check("storage_balance_bounds() is repeatable", &bounds, &bounds_again)?;

        let total_supply = self.settings.total_supply;
        let supply = as_peer.ft_total_supply().await?;
        self.check("ft_total_supply()", &total_supply, &supply)?;

        let owner_tokens = as_peer.ft_balance_of(owner_id).await?;
        self.check(
            &format!("ft_balance_of({owner_id})"),
            &total_supply,
            &owner_tokens,
        )?;

        let metadata = as_peer.ft_metadata().await?;
        let expected_metadata = self.settings.metadata.clone();
        self.check("ft_metadata()", &expected_metadata, &metadata)?;

        Ok(())
    }

    /// Structural comparison of an observed record against its expected value.
    fn check<T>(&mut self, name: &str, expected: &T, actual: &T) -> Result<()>
    where
        T: PartialEq + Serialize,
    {
        if expected == actual {
            self.pass(name);
            Ok(())
        } else {
            Err(HarnessError::AssertionMismatch {
                check: name.to_string(),
                expected: render(expected),
                actual: render(actual),
            })
        }
    }

    fn pass(&mut self, name: &str) {
        info!(check = name, "Check passed");
        self.checks.push(name.to_string());
    }

    fn advance(&mut self, next: ScenarioState) {
        info!(from = ?self.state, to = ?next, "Scenario state");
        self.state = next;
    }

    fn fail(&mut self, err: &HarnessError) {
        let during = self.state.stage().unwrap_or(Stage::MetadataInitialized);
        error!(stage = %during, error = %err, "Scenario failed");
        self.state = ScenarioState::Failed { during };
    }
}

fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}
