//! In-memory account map.

use super::Account;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Registered accounts keyed by checksummed address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    records: HashMap<String, Account>,
}

/// Registry key for an address; independent of the caller's casing.
pub fn registry_key(address: &Address) -> String {
    address.to_checksum(None)
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Get an account by address.
    pub fn get(&self, address: &Address) -> Option<&Account> {
        self.records.get(&registry_key(address))
    }

    /// Check if an address is registered.
    pub fn contains(&self, address: &Address) -> bool {
        self.records.contains_key(&registry_key(address))
    }

    /// Insert an account unless its address is already present.
    ///
    /// Returns `false` and leaves the existing record untouched on conflict.
    pub fn insert_if_absent(&mut self, account: Account) -> bool {
        match self.records.entry(account.address.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(account);
                true
            }
        }
    }

    /// Number of registered accounts.
    pub fn count(&self) -> usize {
        self.records.len()
    }
}
