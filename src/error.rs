use std::path::PathBuf;

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Every failure the harness can surface. Nothing is recovered locally: the
/// first error aborts the scenario and is reported to the caller.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to load signing key from {path}: {reason}")]
    KeyLoad { path: PathBuf, reason: String },
    #[error("node unreachable at {url}: {reason}")]
    Connectivity { url: String, reason: String },
    #[error("account {0} already exists")]
    DuplicateAccount(String),
    #[error("insufficient funds to create {account_id}: {detail}")]
    InsufficientFunds { account_id: String, detail: String },
    #[error("failed to read contract artifact {path}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("deployment to {account_id} rejected: {detail}")]
    Deployment { account_id: String, detail: String },
    #[error("method {method} is not part of the {kind} surface")]
    UnknownMethod { method: String, kind: &'static str },
    #[error("contract call {method} failed: {detail}")]
    ContractExecution { method: String, detail: String },
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("{check}: expected {expected}, got {actual}")]
    AssertionMismatch {
        check: String,
        expected: String,
        actual: String,
    },
}

/// Maps a node-reported account creation failure onto the provisioning
/// error it represents. Returns `None` when the failure is not one of the
/// recognised on-chain rejections.
pub(crate) fn classify_account_failure(account_id: &str, detail: &str) -> Option<HarnessError> {
    if detail.contains("AccountAlreadyExists") {
        return Some(HarnessError::DuplicateAccount(account_id.to_string()));
    }
    if detail.contains("LackBalanceForState") || detail.contains("NotEnoughBalance") {
        return Some(HarnessError::InsufficientFunds {
            account_id: account_id.to_string(),
            detail: detail.to_string(),
        });
    }
    None
}
