//! Local account registry: the single source of truth for "already registered".

mod memory;
mod store;

pub use memory::{registry_key, Registry};
pub use store::{EncryptedStore, FileStore, MemoryStore, Store};

use crate::error::GatewayError;
use alloy::primitives::Address;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument, warn};

/// A registered account. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Checksummed address, the primary key
    pub address: String,

    /// Display name as submitted at registration
    pub display_name: String,

    /// Argon2id PHC string of the registration secret
    pub password_hash: String,

    /// User ID assigned by the homeserver
    pub user_id: String,

    /// When the account was committed locally
    pub registered_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        address: &Address,
        display_name: String,
        password_hash: String,
        user_id: String,
    ) -> Self {
        Self {
            address: registry_key(address),
            display_name,
            password_hash,
            user_id,
            registered_at: Utc::now(),
        }
    }
}

/// Hash a registration secret with Argon2id.
///
/// The salt is derived from the address, so the same secret for the same
/// address always produces the same hash.
pub fn hash_secret(secret: &[u8], address: &Address) -> Result<String, GatewayError> {
    let digest = Sha256::digest(address.as_slice());
    let salt = SaltString::encode_b64(&digest[..16])
        .map_err(|e| GatewayError::Internal(format!("Failed to encode salt: {}", e)))?;

    Argon2::default()
        .hash_password(secret, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GatewayError::Internal(format!("Failed to hash secret: {}", e)))
}

/// Check a secret against a stored hash.
pub fn verify_secret(secret: &[u8], password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .and_then(|parsed| Argon2::default().verify_password(secret, &parsed))
        .is_ok()
}

/// How far a successful `create` got.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// Committed and written to the store
    Durable,
    /// Committed in memory only; the store write failed with this reason
    MemoryOnly(String),
}

/// Existence checks and atomic creation of accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// True only on a definitive positive lookup. Lookup failures are errors,
    /// never `false`.
    async fn exists(&self, address: &Address) -> Result<bool, GatewayError>;

    /// Insert-if-absent. Fails with `AlreadyRegistered` when the address
    /// already has an account, regardless of any earlier `exists` answer.
    ///
    /// Once the account is in, it stays in: a failed store write is reported
    /// as [`Commit::MemoryOnly`], not as an error.
    async fn create(&self, account: Account) -> Result<Commit, GatewayError>;
}

/// Registry held in memory and mirrored to a [`Store`].
pub struct LocalRegistry {
    accounts: RwLock<Registry>,
    store: Store,
    /// Serializes snapshot writes so a stale snapshot never lands last.
    persist_lock: Mutex<()>,
}

impl LocalRegistry {
    /// Load the registry from `store`.
    ///
    /// A store that exists but cannot be read is an error: starting empty
    /// would let every persisted address register again.
    pub async fn open(store: Store) -> Result<Self, GatewayError> {
        let registry = store.load().await?;
        info!("Loaded registry with {} accounts", registry.count());

        Ok(Self {
            accounts: RwLock::new(registry),
            store,
            persist_lock: Mutex::new(()),
        })
    }

    /// Empty registry without persistence.
    pub fn in_memory() -> Self {
        Self {
            accounts: RwLock::new(Registry::new()),
            store: Store::memory(),
            persist_lock: Mutex::new(()),
        }
    }

    /// Look up an account.
    pub async fn get(&self, address: &Address) -> Option<Account> {
        self.accounts.read().await.get(address).cloned()
    }

    /// Number of registered accounts.
    pub async fn count(&self) -> usize {
        self.accounts.read().await.count()
    }

    async fn persist(&self) -> Result<(), GatewayError> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.accounts.read().await.clone();
        self.store.save(&snapshot).await
    }
}

#[async_trait]
impl AccountRegistry for LocalRegistry {
    async fn exists(&self, address: &Address) -> Result<bool, GatewayError> {
        Ok(self.accounts.read().await.contains(address))
    }

    #[instrument(skip(self, account), fields(address = %account.address))]
    async fn create(&self, account: Account) -> Result<Commit, GatewayError> {
        let address = account.address.clone();

        if !self.accounts.write().await.insert_if_absent(account) {
            warn!("Account already exists, rejecting duplicate create");
            return Err(GatewayError::AlreadyRegistered(address));
        }

        // The homeserver account already exists, so the in-memory entry must
        // stay to keep deduplicating even when the snapshot cannot be written.
        if let Err(e) = self.persist().await {
            error!(error = %e, "Account committed in memory but not persisted");
            return Ok(Commit::MemoryOnly(e.to_string()));
        }

        info!("Account created");
        Ok(Commit::Durable)
    }
}
