use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::backend::Backend;
use crate::backend::blob::BlobBackend;
use crate::backend::http::HttpBackend;
use crate::backend::local::LocalBackend;
use crate::backend::s3::S3Backend;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::location::{BackendKind, Location};

/// Object store bound to one base path.
///
/// The backend is chosen once from the base path's scheme; every operation
/// afterwards goes straight to it. Cloning is cheap and clones share the
/// underlying client.
#[derive(Clone)]
pub struct Store {
    location: Location,
    backend: Arc<dyn Backend>,
}

impl Store {
    /// Open a store with the default configuration.
    ///
    /// ```
    /// use objectstore::{BackendKind, Store};
    ///
    /// let store = Store::open("s3://my-bucket/reports").unwrap();
    /// assert_eq!(store.kind(), BackendKind::S3);
    /// ```
    pub fn open(base_path: &str) -> Result<Self> {
        Self::with_config(base_path, &StoreConfig::default())
    }

    pub fn with_config(base_path: &str, config: &StoreConfig) -> Result<Self> {
        let location = Location::parse(base_path)?;
        let backend: Arc<dyn Backend> = match &location {
            Location::Local { root } => Arc::new(LocalBackend::new(root.clone())),
            Location::S3 { bucket, prefix } => Arc::new(S3Backend::new(
                bucket.clone(),
                prefix.clone(),
                config.s3.clone(),
            )),
            Location::AzureBlob {
                account,
                container,
                prefix,
            } => Arc::new(BlobBackend::new(
                http_client(config)?,
                account.clone(),
                container.clone(),
                prefix.clone(),
                &config.blob,
            )?),
            Location::Http { root } => Arc::new(HttpBackend::new(http_client(config)?, root.clone())),
        };
        debug!(kind = %location.kind(), location = %location, "store opened");
        Ok(Self { location, backend })
    }

    /// Bind a prebuilt adapter, e.g. one sharing a client with other stores.
    pub fn from_backend(location: Location, backend: Arc<dyn Backend>) -> Self {
        Self { location, backend }
    }

    pub fn kind(&self) -> BackendKind {
        self.location.kind()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.backend.read(name).await
    }

    /// Create or overwrite `name`.
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.backend.write(name, data).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.backend.delete(name).await
    }

    /// All object names below the base path, relative to it.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.backend.list().await
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("kind", &self.kind())
            .field("location", &self.location)
            .finish()
    }
}

fn http_client(config: &StoreConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))
}
