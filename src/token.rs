//! Typed calls against the fungible token contract (NEP-141 core, NEP-145
//! storage management, NEP-148 metadata).

use near_api::{AccountId, NearToken};
use near_sdk::json_types::{Base64VecU8, U128};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::proxy::ContractProxy;

/// NEP-148 token metadata, supplied once to `new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleTokenMetadata {
    pub spec: String,
    pub name: String,
    pub symbol: String,
    pub icon: Option<String>,
    pub reference: String,
    pub reference_hash: Base64VecU8,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBalanceBounds {
    pub min: U128,
    pub max: Option<U128>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBalance {
    pub total: U128,
    pub available: U128,
}

const ONE_YOCTO: NearToken = NearToken::from_yoctonear(1);

/// Typed view over a [`ContractProxy`] bound to the token contract.
#[derive(Debug, Clone, Copy)]
pub struct FungibleToken<'a> {
    proxy: &'a ContractProxy,
}

impl<'a> FungibleToken<'a> {
    pub fn new(proxy: &'a ContractProxy) -> Self {
        Self { proxy }
    }

    pub fn proxy(&self) -> &'a ContractProxy {
        self.proxy
    }

    /// Calls the `new` initializer. The contract rejects a second call.
    pub async fn init(
        &self,
        owner_id: &AccountId,
        total_supply: U128,
        metadata: &FungibleTokenMetadata,
    ) -> Result<()> {
        self.proxy
            .change(
                "new",
                json!({
                    "owner_id": owner_id,
                    "total_supply": total_supply,
                    "metadata": metadata,
                }),
                None,
            )
            .await
    }

    pub async fn storage_balance_bounds(&self) -> Result<StorageBalanceBounds> {
        self.proxy.view("storage_balance_bounds", json!({})).await
    }

    /// `None` for accounts that never registered.
    pub async fn storage_balance_of(&self, account_id: &AccountId) -> Result<Option<StorageBalance>> {
        self.proxy
            .view("storage_balance_of", json!({ "account_id": account_id }))
            .await
    }

    /// Registers `account_id` (or the caller when `None`), attaching `deposit`.
    pub async fn storage_deposit(
        &self,
        account_id: Option<&AccountId>,
        deposit: NearToken,
    ) -> Result<StorageBalance> {
        self.proxy
            .change(
                "storage_deposit",
                json!({ "account_id": account_id }),
                Some(deposit),
            )
            .await
    }

    pub async fn storage_unregister(&self, force: Option<bool>) -> Result<bool> {
        self.proxy
            .change("storage_unregister", json!({ "force": force }), Some(ONE_YOCTO))
            .await
    }

    pub async fn ft_metadata(&self) -> Result<FungibleTokenMetadata> {
        self.proxy.view("ft_metadata", json!({})).await
    }

    pub async fn ft_total_supply(&self) -> Result<U128> {
        self.proxy.view("ft_total_supply", json!({})).await
    }

    pub async fn ft_balance_of(&self, account_id: &AccountId) -> Result<U128> {
        self.proxy
            .view("ft_balance_of", json!({ "account_id": account_id }))
            .await
    }

    pub async fn ft_transfer(
        &self,
        receiver_id: &AccountId,
        amount: U128,
        memo: Option<&str>,
    ) -> Result<()> {
        self.proxy
            .change(
                "ft_transfer",
                json!({ "receiver_id": receiver_id, "amount": amount, "memo": memo }),
                Some(ONE_YOCTO),
            )
            .await
    }

    /// Returns the amount the receiver kept after `ft_on_transfer`.
    pub async fn ft_transfer_call(
        &self,
        receiver_id: &AccountId,
        amount: U128,
        memo: Option<&str>,
        msg: &str,
    ) -> Result<U128> {
        self.proxy
            .change(
                "ft_transfer_call",
                json!({
                    "receiver_id": receiver_id,
                    "amount": amount,
                    "memo": memo,
                    "msg": msg,
                }),
                Some(ONE_YOCTO),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_records_use_string_encoded_amounts() {
        let bounds: StorageBalanceBounds = serde_json::from_value(json!({
            "min": "1250000000000000000000",
            "max": "1250000000000000000000",
        }))
        .unwrap();
        assert_eq!(bounds.min.0, 1_250_000_000_000_000_000_000);
        assert_eq!(bounds.max, Some(bounds.min));

        let balance = StorageBalance {
            total: U128(1_250_000_000_000_000_000_000),
            available: U128(0),
        };
        assert_eq!(
            serde_json::to_value(&balance).unwrap(),
            json!({ "total": "1250000000000000000000", "available": "0" })
        );
    }

    #[test]
    fn unregistered_storage_balance_is_null() {
        let balance: Option<StorageBalance> = serde_json::from_value(json!(null)).unwrap();
        assert!(balance.is_none());
    }

    #[test]
    fn metadata_hash_is_base64_on_the_wire() {
        let metadata: FungibleTokenMetadata = serde_json::from_value(json!({
            "spec": "1.1.0",
            "name": "CAT Token",
            "symbol": "CAT",
            "icon": null,
            "reference": "https://example.org",
            "reference_hash": "AK3YRHqKhCJNmKfV6SrutnlWW/icN5J8NUPtKsNXR1M=",
            "decimals": 0,
        }))
        .unwrap();
        assert_eq!(metadata.reference_hash.0.len(), 32);
        assert_eq!(
            serde_json::to_value(&metadata).unwrap()["reference_hash"],
            "AK3YRHqKhCJNmKfV6SrutnlWW/icN5J8NUPtKsNXR1M="
        );
    }
}
