//! Jetton asset registry.
//!
//! Each registered jetton is cached with its resolved sub-account address
//! and the sub-account's on-chain state at registration time, so balance
//! and transfer paths never re-derive the address. Lookup is by the caller
//! supplied asset name; the native coin is addressed by [`NATIVE_ASSET`]
//! and never lives in the registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::client::ContractState;
use crate::error::WalletError;

/// Reserved name of the native coin.
pub const NATIVE_ASSET: &str = "TON";

/// Caller-facing description of a jetton to register, loadable from
/// configuration files (addresses in either text form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JettonConfig {
    pub name: String,
    pub master_address: Address,
    pub decimals: u32,
}

/// A registered jetton with its resolved sub-account.
#[derive(Debug, Clone)]
pub struct AssetEntry {
    pub master: Address,
    /// The wallet's own jetton sub-account for this asset.
    pub wallet: Address,
    pub decimals: u32,
    /// Sub-account state observed at registration.
    pub state: ContractState,
}

#[derive(Debug, Default)]
pub struct AssetRegistry {
    entries: HashMap<String, AssetEntry>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset under `name`. Returns `true` when a previous entry
    /// with the same name was replaced.
    pub fn insert(&mut self, name: String, entry: AssetEntry) -> bool {
        self.entries.insert(name, entry).is_some()
    }

    pub fn get(&self, name: &str) -> Result<&AssetEntry, WalletError> {
        self.entries
            .get(name)
            .ok_or_else(|| WalletError::AssetNotFound(name.to_string()))
    }

    /// Registered asset names in lookup-friendly sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(byte: u8) -> AssetEntry {
        AssetEntry {
            master: Address::new(0, [byte; 32]),
            wallet: Address::new(0, [byte ^ 0xff; 32]),
            decimals: 9,
            state: ContractState {
                deployed: true,
                active: true,
            },
        }
    }

    #[test]
    fn missing_asset_is_an_error() {
        let registry = AssetRegistry::new();
        assert!(matches!(
            registry.get("USDT"),
            Err(WalletError::AssetNotFound(_))
        ));
    }

    #[test]
    fn reinsert_reports_replacement() {
        let mut registry = AssetRegistry::new();
        assert!(!registry.insert("USDT".into(), entry(1)));
        assert!(registry.insert("USDT".into(), entry(2)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("USDT").unwrap().master, Address::new(0, [2; 32]));
    }

    #[test]
    fn jetton_config_parses_from_json() {
        let master = Address::new(0, [0xaa; 32]);
        let raw = format!(
            r#"{{"name":"USDT","master_address":"{}","decimals":6}}"#,
            master.to_raw()
        );
        let config: JettonConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(config.name, "USDT");
        assert_eq!(config.master_address, master);
        assert_eq!(config.decimals, 6);
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = AssetRegistry::new();
        registry.insert("b".into(), entry(1));
        registry.insert("a".into(), entry(2));
        assert_eq!(registry.names(), vec!["a", "b"]);
    }
}
