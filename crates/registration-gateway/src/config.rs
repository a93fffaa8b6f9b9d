//! Configuration for the registration gateway.

use crate::signature::SignatureScheme;
use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Homeserver registration endpoint
    pub homeserver: HomeserverConfig,

    /// Registry storage configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Signature verification
    #[serde(default)]
    pub signature: SignatureConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Registration budget
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HomeserverConfig {
    /// Full URL of the registration endpoint
    pub register_url: String,

    /// Application-service token, sent as the `access_token` query parameter
    pub as_token: SecretString,

    /// Request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Idle pooled connections kept per host
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Path to the registry file
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, registry is in-memory only)
    #[serde(default = "default_true")]
    pub persist: bool,

    /// 32-byte AES-256-GCM key as hex; the file is encrypted when set
    #[serde(default)]
    pub encryption_key: Option<SecretString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignatureConfig {
    /// How the signed address string is hashed
    #[serde(default)]
    pub scheme: SignatureScheme,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// How fast registrations may be pushed to the homeserver. Set this at or
/// below the homeserver's own registration rate limit.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained registrations per minute
    #[serde(default = "default_registrations_per_minute")]
    pub registrations_per_minute: u32,

    /// Registrations allowed back to back; defaults to the per-minute figure
    #[serde(default)]
    pub burst: Option<u32>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

// Default implementations
impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
            persist: true,
            encryption_key: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            registrations_per_minute: default_registrations_per_minute(),
            burst: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// Default value functions
fn default_timeout() -> Duration {
    homeserver_client::DEFAULT_TIMEOUT
}

fn default_max_idle_per_host() -> usize {
    homeserver_client::DEFAULT_MAX_IDLE_PER_HOST
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("/data/registry.json")
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8081
}

fn default_registrations_per_minute() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl RegistryConfig {
    /// Decode the configured encryption key, if any.
    pub fn encryption_key(&self) -> Result<Option<[u8; 32]>> {
        let Some(key) = &self.encryption_key else {
            return Ok(None);
        };

        let bytes = hex::decode(key.expose_secret().trim())
            .context("REGISTRY__ENCRYPTION_KEY is not valid hex")?;

        let key: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            anyhow::anyhow!(
                "REGISTRY__ENCRYPTION_KEY must be 32 bytes, got {}",
                bytes.len()
            )
        })?;

        Ok(Some(key))
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.homeserver.register_url.trim().is_empty() {
            bail!("HOMESERVER__REGISTER_URL must be set");
        }

        if self.homeserver.as_token.expose_secret().is_empty() {
            bail!("HOMESERVER__AS_TOKEN must be set");
        }

        self.registry.encryption_key()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn homeserver() -> HomeserverConfig {
        HomeserverConfig {
            register_url: "http://synapse:8008/_matrix/client/r0/admin/register".into(),
            as_token: SecretString::new("as-token".into()),
            timeout: default_timeout(),
            max_idle_per_host: default_max_idle_per_host(),
        }
    }

    fn config() -> Config {
        Config {
            homeserver: homeserver(),
            registry: RegistryConfig::default(),
            signature: SignatureConfig::default(),
            server: ServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            log: LogConfig::default(),
        }
    }

    #[test]
    fn test_defaults() {
        let config = config();

        assert_eq!(config.homeserver.timeout, Duration::from_secs(30));
        assert_eq!(config.homeserver.max_idle_per_host, 100);
        assert_eq!(config.signature.scheme, SignatureScheme::Keccak256);
        assert_eq!(config.server.port, 8081);
        assert!(config.registry.persist);
        assert_eq!(config.rate_limit.registrations_per_minute, 60);
        assert!(config.rate_limit.burst.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_token_rejected() {
        let mut config = config();
        config.homeserver.as_token = SecretString::new(String::new());

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_encryption_key_decoding() {
        let mut registry = RegistryConfig::default();
        assert!(registry.encryption_key().unwrap().is_none());

        registry.encryption_key = Some(SecretString::new("ab".repeat(32)));
        assert_eq!(registry.encryption_key().unwrap(), Some([0xab; 32]));

        registry.encryption_key = Some(SecretString::new("ab".repeat(16)));
        assert!(registry.encryption_key().is_err());

        registry.encryption_key = Some(SecretString::new("not hex".into()));
        assert!(registry.encryption_key().is_err());
    }

    #[test]
    fn test_deserialize_from_json() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "homeserver": {
                "register_url": "http://synapse:8008/register",
                "as_token": "token",
                "timeout": "5s"
            },
            "signature": { "scheme": "eip191" },
            "rate_limit": { "burst": 5 },
            "log": { "format": "json" }
        }))
        .unwrap();

        assert_eq!(config.homeserver.timeout, Duration::from_secs(5));
        assert_eq!(config.signature.scheme, SignatureScheme::Eip191);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.rate_limit.registrations_per_minute, 60);
        assert_eq!(config.rate_limit.burst, Some(5));
    }
}
