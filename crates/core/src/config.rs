//! Adapter options.
//!
//! Everything is optional: a default `StoreConfig` resolves credentials and
//! regions from the environment the way the provider tools do.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ACCOUNT_KEY_ENV: &str = "AZURE_STORAGE_ACCOUNT_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub s3: S3Config,
    pub blob: BlobConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Falls back to `AWS_REGION`, `AWS_DEFAULT_REGION`, then `us-east-1`.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    pub endpoint: Option<String>,
    /// Static credentials; both must be set to take effect.
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Path-style addressing, implied by a custom endpoint.
    pub path_style: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    /// Defaults to `https://<account>.blob.core.windows.net`.
    pub endpoint: Option<String>,
    /// Base64 account key. Read from `AZURE_STORAGE_ACCOUNT_KEY` when unset.
    pub account_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

impl BlobConfig {
    /// Where the account key comes from, decided once per store.
    pub fn account_key_source(&self) -> AccountKeySource {
        match &self.account_key {
            Some(key) => AccountKeySource::Static(key.clone()),
            None => AccountKeySource::Env(ACCOUNT_KEY_ENV),
        }
    }
}

/// Lazily resolved Azure account key.
#[derive(Debug, Clone)]
pub enum AccountKeySource {
    Static(String),
    Env(&'static str),
}

impl AccountKeySource {
    pub fn resolve(&self) -> Result<String> {
        match self {
            AccountKeySource::Static(key) => Ok(key.clone()),
            AccountKeySource::Env(var) => std::env::var(var)
                .map_err(|_| Error::Configuration(format!("{var} could not be found"))),
        }
    }
}
