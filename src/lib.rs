//! End-to-end harness for a NEP-141 fungible token contract on a sandboxed
//! NEAR node: provisions test accounts, deploys the contract, initializes it
//! and checks its storage-management views against known constants.

pub mod client;
pub mod config;
pub mod deploy;
pub mod error;
pub mod keys;
pub mod provision;
pub mod proxy;
pub mod scenario;
pub mod token;

pub use client::{AccountHandle, Connection, HarnessContext};
pub use config::EnvironmentConfig;
pub use error::{HarnessError, Result};
pub use keys::{Identity, KeyRegistry};
pub use proxy::{ContractProxy, FT_METHODS, MethodSurface};
pub use scenario::{Scenario, ScenarioReport, ScenarioSettings, ScenarioState, Stage};
pub use token::{FungibleToken, FungibleTokenMetadata, StorageBalance, StorageBalanceBounds};

/// Runs the fixed scenario once against `config`.
pub async fn run(config: EnvironmentConfig, settings: ScenarioSettings) -> Result<ScenarioReport> {
    Scenario::new(settings).run(config).await
}
