//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `BUEN_SABOR_STORAGE_PATH` - JSON file backing the key-value store
//!   (default: `.buen-sabor/storage.json`)
//! - `BUEN_SABOR_CREDENTIAL_KEY` - Storage key of the bearer token (default: `token`)
//! - `BUEN_SABOR_CART_KEY` - Storage key of the serialized cart (default: `cart`)
//! - `BUEN_SABOR_TOKEN_LEEWAY_SECS` - Seconds a token is still accepted past
//!   its `exp` claim (default: 0)
//! - `BUEN_SABOR_BUS_CAPACITY` - Queued notifications per subscriber before
//!   the oldest are dropped (default: 64)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;

use chrono::TimeDelta;
use thiserror::Error;

const DEFAULT_STORAGE_PATH: &str = ".buen-sabor/storage.json";
const DEFAULT_CREDENTIAL_KEY: &str = "token";
const DEFAULT_CART_KEY: &str = "cart";
const DEFAULT_BUS_CAPACITY: usize = 64;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storage keys owned by the session tracker and the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Key holding the bearer credential.
    pub credential: String,
    /// Key holding the JSON-encoded cart.
    pub cart: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            credential: DEFAULT_CREDENTIAL_KEY.to_string(),
            cart: DEFAULT_CART_KEY.to_string(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Path of the file-backed store.
    pub storage_path: PathBuf,
    /// Keys used inside the store.
    pub keys: StorageKeys,
    /// Grace period applied to token expiry.
    pub token_leeway: TimeDelta,
    /// Notification bus capacity.
    pub bus_capacity: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            keys: StorageKeys::default(),
            token_leeway: TimeDelta::zero(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            sentry_dsn: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_path = PathBuf::from(get_or_default(
            &lookup,
            "BUEN_SABOR_STORAGE_PATH",
            DEFAULT_STORAGE_PATH,
        ));
        let keys = StorageKeys {
            credential: get_key(&lookup, "BUEN_SABOR_CREDENTIAL_KEY", DEFAULT_CREDENTIAL_KEY)?,
            cart: get_key(&lookup, "BUEN_SABOR_CART_KEY", DEFAULT_CART_KEY)?,
        };
        if keys.credential == keys.cart {
            return Err(ConfigError::InvalidEnvVar(
                "BUEN_SABOR_CART_KEY".to_string(),
                "must differ from the credential key".to_string(),
            ));
        }

        let leeway_secs = get_or_default(&lookup, "BUEN_SABOR_TOKEN_LEEWAY_SECS", "0")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "BUEN_SABOR_TOKEN_LEEWAY_SECS".to_string(),
                    e.to_string(),
                )
            })?;

        let bus_capacity = get_or_default(
            &lookup,
            "BUEN_SABOR_BUS_CAPACITY",
            &DEFAULT_BUS_CAPACITY.to_string(),
        )
        .parse::<usize>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("BUEN_SABOR_BUS_CAPACITY".to_string(), e.to_string())
        })?;
        if bus_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BUEN_SABOR_BUS_CAPACITY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            storage_path,
            keys,
            token_leeway: TimeDelta::seconds(i64::from(leeway_secs)),
            bus_capacity,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.trim().is_empty()),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable with a default value.
fn get_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Get a storage key name, rejecting blank values.
fn get_key<F>(lookup: &F, key: &str, default: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = get_or_default(lookup, key, default);
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "cannot be blank".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
