use near_api::{AccountId, Contract, Data, NearToken};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::AccountHandle;
use crate::error::{HarnessError, Result};

/// The method names a contract exposes, split by call kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSurface {
    pub view_methods: &'static [&'static str],
    pub change_methods: &'static [&'static str],
}

impl MethodSurface {
    pub fn is_view(&self, method: &str) -> bool {
        self.view_methods.contains(&method)
    }

    pub fn is_change(&self, method: &str) -> bool {
        self.change_methods.contains(&method)
    }
}

/// Method surface of the fungible token contract under test.
pub const FT_METHODS: MethodSurface = MethodSurface {
    view_methods: &[
        "storage_balance_bounds",
        "storage_balance_of",
        "ft_metadata",
        "ft_total_supply",
        "ft_balance_of",
    ],
    change_methods: &[
        "storage_deposit",
        "storage_withdraw",
        "storage_unregister",
        "ft_transfer",
        "ft_transfer_call",
        "mint",
        "ft_transfer_player_reward",
        "new",
    ],
};

/// A caller bound to one deployed contract.
#[derive(Debug, Clone)]
pub struct ContractProxy {
    caller: AccountHandle,
    contract_id: AccountId,
    surface: MethodSurface,
}

impl ContractProxy {
    pub fn new(caller: AccountHandle, contract_id: AccountId, surface: MethodSurface) -> Self {
        Self {
            caller,
            contract_id,
            surface,
        }
    }

    pub fn caller(&self) -> &AccountHandle {
        &self.caller
    }

    pub fn contract_id(&self) -> &AccountId {
        &self.contract_id
    }

    pub fn surface(&self) -> &MethodSurface {
        &self.surface
    }

    /// Read-only query of a view method.
    pub async fn view<T>(&self, method: &str, args: serde_json::Value) -> Result<T>
    where
        T: DeserializeOwned + Send + Sync,
    {
        if !self.surface.is_view(method) {
            return Err(HarnessError::UnknownMethod {
                method: method.to_string(),
                kind: "view",
            });
        }

        debug!(contract = %self.contract_id, method, %args, "View call");
        let contract = Contract(self.contract_id.clone());
        let result: Data<T> = contract
            .call_function(method, args)
            .read_only()
            .fetch_from(self.caller.network())
            .await
            .map_err(|e| view_failure(method, format!("{e:?}")))?;
        Ok(result.data)
    }

    /// Signs and submits a change call, waits for finality, and decodes the
    /// JSON return value. An empty return value decodes as `null`.
    pub async fn change<T>(
        &self,
        method: &str,
        args: serde_json::Value,
        deposit: Option<NearToken>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if !self.surface.is_change(method) {
            return Err(HarnessError::UnknownMethod {
                method: method.to_string(),
                kind: "change",
            });
        }

        debug!(
            contract = %self.contract_id,
            caller = %self.caller.account_id(),
            method,
            %args,
            "Change call"
        );
        let contract = Contract(self.contract_id.clone());
        let call = contract.call_function(method, args);
        let mut tx = call.transaction();
        if let Some(deposit) = deposit {
            tx = tx.deposit(deposit);
        }

        let outcome = tx
            .with_signer(self.caller.account_id().clone(), self.caller.signer().clone())
            .send_to(self.caller.network())
            .await
            .map_err(|e| HarnessError::Rpc(format!("{method}: {e:?}")))?;

        let success = outcome
            .into_result()
            .map_err(|e| execution_error(method, format!("{e:?}")))?;
        let bytes = success
            .raw_bytes()
            .map_err(|e| execution_error(method, format!("undecodable return value: {e:?}")))?;
        decode_return_value(method, &bytes)
    }
}

fn decode_return_value<T: DeserializeOwned>(method: &str, bytes: &[u8]) -> Result<T> {
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(bytes).map_err(|e| {
            execution_error(method, format!("return value is not JSON: {e}"))
        })?
    };
    serde_json::from_value(value)
        .map_err(|e| execution_error(method, format!("unexpected return value: {e}")))
}

/// Query errors that come from running the contract rather than from
/// reaching the node.
const CONTRACT_SIDE_VIEW_ERRORS: &[&str] = &[
    "ContractExecutionError",
    "MethodResolveError",
    "NoContractCode",
    "ConversionError",
];

fn view_failure(method: &str, detail: String) -> HarnessError {
    if CONTRACT_SIDE_VIEW_ERRORS
        .iter()
        .any(|marker| detail.contains(marker))
    {
        return execution_error(method, detail);
    }
    warn!(method, %detail, "View query failed");
    HarnessError::Rpc(format!("{method}: {detail}"))
}

fn execution_error(method: &str, detail: String) -> HarnessError {
    warn!(method, %detail, "Contract call failed");
    HarnessError::ContractExecution {
        method: method.to_string(),
        detail,
    }
}
