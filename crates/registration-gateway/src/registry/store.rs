//! Persistent storage backends for the registry.

use super::Registry;
use crate::error::GatewayError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Nonce size for AES-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// Write through a temp file and rename so readers never see a torn file.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), GatewayError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Read a file, treating "not found" as absent and anything else as an error.
async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, GatewayError> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Registry sealed with AES-256-GCM.
///
/// File format: [12 bytes nonce][ciphertext with auth tag]
pub struct EncryptedStore {
    storage_path: PathBuf,
    key: [u8; 32],
}

impl EncryptedStore {
    pub fn new(storage_path: PathBuf, key: [u8; 32]) -> Self {
        Self { storage_path, key }
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, GatewayError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, plaintext)?;

        let mut data = nonce_bytes.to_vec();
        data.extend(ciphertext);
        Ok(data)
    }

    fn open(&self, data: &[u8]) -> Result<Vec<u8>, GatewayError> {
        if data.len() < NONCE_SIZE {
            return Err(GatewayError::Encryption(format!(
                "Registry file too short: {} bytes",
                data.len()
            )));
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);

        cipher.decrypt(nonce, &data[NONCE_SIZE..]).map_err(|_| {
            GatewayError::Encryption(
                "Failed to decrypt registry. Was the encryption key changed?".to_string(),
            )
        })
    }

    /// Save the registry to encrypted persistent storage.
    pub async fn save(&self, registry: &Registry) -> Result<(), GatewayError> {
        let plaintext = serde_json::to_vec(registry)?;
        let data = self.seal(&plaintext)?;
        write_atomic(&self.storage_path, &data).await?;

        debug!(
            "Saved encrypted registry ({} bytes) to {:?}",
            data.len(),
            self.storage_path
        );
        Ok(())
    }

    /// Load the registry. A missing file yields an empty registry.
    pub async fn load(&self) -> Result<Registry, GatewayError> {
        let Some(data) = read_if_exists(&self.storage_path).await? else {
            info!(
                "Registry file not found at {:?}, starting with empty registry",
                self.storage_path
            );
            return Ok(Registry::new());
        };

        let plaintext = self.open(&data)?;
        let registry: Registry = serde_json::from_slice(&plaintext)?;

        info!(
            "Loaded encrypted registry with {} accounts from {:?}",
            registry.count(),
            self.storage_path
        );
        Ok(registry)
    }
}

/// Registry stored as plain JSON.
pub struct FileStore {
    storage_path: PathBuf,
}

impl FileStore {
    pub fn new(storage_path: PathBuf) -> Self {
        Self { storage_path }
    }

    pub async fn save(&self, registry: &Registry) -> Result<(), GatewayError> {
        let data = serde_json::to_vec_pretty(registry)?;
        write_atomic(&self.storage_path, &data).await?;
        debug!("Saved registry ({} bytes) to {:?}", data.len(), self.storage_path);
        Ok(())
    }

    pub async fn load(&self) -> Result<Registry, GatewayError> {
        let Some(data) = read_if_exists(&self.storage_path).await? else {
            info!(
                "Registry file not found at {:?}, starting with empty registry",
                self.storage_path
            );
            return Ok(Registry::new());
        };

        let registry: Registry = serde_json::from_slice(&data)?;
        info!(
            "Loaded registry with {} accounts from {:?}",
            registry.count(),
            self.storage_path
        );
        Ok(registry)
    }
}

/// In-memory store for testing or when persistence is disabled.
pub struct MemoryStore;

impl MemoryStore {
    /// "Save" does nothing for memory store.
    pub async fn save(&self, _registry: &Registry) -> Result<(), GatewayError> {
        debug!("Memory store: save is a no-op");
        Ok(())
    }

    /// "Load" returns an empty registry.
    pub async fn load(&self) -> Result<Registry, GatewayError> {
        debug!("Memory store: returning empty registry");
        Ok(Registry::new())
    }
}

/// Storage backend for the registry.
pub enum Store {
    /// AES-256-GCM sealed file
    Encrypted(EncryptedStore),
    /// Plain JSON file
    File(FileStore),
    /// In-memory only (no persistence)
    Memory(MemoryStore),
}

impl Store {
    pub fn encrypted(storage_path: PathBuf, key: [u8; 32]) -> Self {
        Store::Encrypted(EncryptedStore::new(storage_path, key))
    }

    pub fn file(storage_path: PathBuf) -> Self {
        Store::File(FileStore::new(storage_path))
    }

    pub fn memory() -> Self {
        Store::Memory(MemoryStore)
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Store::Encrypted(_) => "encrypted",
            Store::File(_) => "file",
            Store::Memory(_) => "memory",
        }
    }

    /// Save the registry.
    pub async fn save(&self, registry: &Registry) -> Result<(), GatewayError> {
        match self {
            Store::Encrypted(s) => s.save(registry).await,
            Store::File(s) => s.save(registry).await,
            Store::Memory(s) => s.save(registry).await,
        }
    }

    /// Load the registry.
    pub async fn load(&self) -> Result<Registry, GatewayError> {
        match self {
            Store::Encrypted(s) => s.load().await,
            Store::File(s) => s.load().await,
            Store::Memory(s) => s.load().await,
        }
    }
}
