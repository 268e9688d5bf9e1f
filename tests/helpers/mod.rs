// Test Helpers
use ft_sandbox_harness::provision::{self, DEFAULT_IDENTITY_BALANCE};
use ft_sandbox_harness::scenario::cat_token_metadata;
use ft_sandbox_harness::{
    AccountHandle, ContractProxy, EnvironmentConfig, FT_METHODS, FungibleToken, HarnessContext,
    Identity, KeyRegistry, deploy,
};
use near_api::AccountId;
use near_sandbox::{GenesisAccount, Sandbox};
use near_sdk::json_types::U128;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[allow(dead_code)]
pub const FT_WASM_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/res/ft.wasm");

/// A running sandbox and a context connected to it as the genesis account.
/// The sandbox stops when this is dropped.
pub struct TestEnv {
    #[allow(dead_code)]
    pub sandbox: Sandbox,
    pub ctx: HarnessContext,
    pub registry: KeyRegistry,
}

#[allow(dead_code)]
pub fn genesis_identity() -> TestResult<Identity> {
    let genesis = GenesisAccount::default();
    let account_id: AccountId = genesis.account_id.to_string().parse()?;
    Ok(Identity::from_secret_key(account_id, genesis.private_key.parse()?)?)
}

#[allow(dead_code)]
pub fn sandbox_config(sandbox: &Sandbox) -> TestResult<EnvironmentConfig> {
    let master = genesis_identity()?;
    Ok(EnvironmentConfig::for_node(
        sandbox.rpc_addr.clone(),
        master.account_id().clone(),
    )?)
}

#[allow(dead_code)]
pub async fn start_env() -> TestResult<TestEnv> {
    let sandbox = Sandbox::start_sandbox().await?;
    let config = sandbox_config(&sandbox)?;
    let ctx = HarnessContext::with_master(config, genesis_identity()?).await?;

    let mut registry = KeyRegistry::new();
    registry.register(ctx.master().network_id(), ctx.master().identity().clone());

    Ok(TestEnv {
        sandbox,
        ctx,
        registry,
    })
}

#[allow(dead_code)]
pub async fn create_user(env: &mut TestEnv, prefix: &str) -> TestResult<AccountHandle> {
    Ok(provision::create_identity(
        env.ctx.master(),
        &mut env.registry,
        prefix,
        DEFAULT_IDENTITY_BALANCE,
    )
    .await?)
}

#[allow(dead_code)]
pub async fn deploy_token(env: &mut TestEnv) -> TestResult<AccountId> {
    let contract_id = env.ctx.config().contract_account.clone();
    let wasm = deploy::read_artifact(std::path::Path::new(FT_WASM_PATH))?;
    deploy::deploy(
        env.ctx.master(),
        &mut env.registry,
        &contract_id,
        wasm,
        deploy::DEFAULT_DEPLOYMENT_BALANCE,
    )
    .await?;
    Ok(contract_id)
}

#[allow(dead_code)]
pub fn proxy(env: &TestEnv, caller: &AccountHandle, contract_id: &AccountId) -> TestResult<ContractProxy> {
    let caller = env
        .ctx
        .connection()
        .bind_registered(&env.registry, caller.account_id())?;
    Ok(ContractProxy::new(caller, contract_id.clone(), FT_METHODS))
}

/// Deploys the token and initializes it with `owner` holding `total_supply`.
#[allow(dead_code)]
pub async fn deploy_initialized(
    env: &mut TestEnv,
    owner: &AccountHandle,
    total_supply: u128,
) -> TestResult<ContractProxy> {
    let contract_id = deploy_token(env).await?;
    let owner_proxy = proxy(env, owner, &contract_id)?;
    FungibleToken::new(&owner_proxy)
        .init(owner.account_id(), U128(total_supply), &cat_token_metadata())
        .await?;
    Ok(owner_proxy)
}
