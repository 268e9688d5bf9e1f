use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ft_sandbox_harness::{EnvironmentConfig, ScenarioSettings};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Deploys the fungible token contract to a sandbox node and verifies it.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Target environment (`sandbox` or `local`).
    #[arg(long, env = "NEAR_ENV", default_value = "sandbox")]
    env: String,

    /// Compiled contract to deploy.
    #[arg(long, env = "FT_WASM_PATH")]
    wasm: PathBuf,

    /// Overrides the key file of the selected environment.
    #[arg(long, env = "NEAR_KEY_PATH")]
    key_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match EnvironmentConfig::resolve(&args.env) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Cannot resolve environment");
            return ExitCode::FAILURE;
        }
    };
    if let Some(key_path) = args.key_path {
        config.key_path = key_path;
    }

    info!(env = %args.env, wasm = %args.wasm.display(), "Starting scenario");
    match ft_sandbox_harness::run(config, ScenarioSettings::new(args.wasm)).await {
        Ok(report) => {
            info!(
                contract = %report.contract_id,
                checks = report.checks.len(),
                "All checks passed"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Scenario failed");
            ExitCode::FAILURE
        }
    }
}
