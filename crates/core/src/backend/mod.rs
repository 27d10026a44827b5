pub mod blob;
pub mod http;
pub mod local;
pub mod s3;

use async_trait::async_trait;

use crate::error::Result;

/// Object operations every storage technology provides.
///
/// Names are relative to the adapter's base address; `list` returns names
/// in the same form, so any listed entry can be passed back to `read`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn read(&self, name: &str) -> Result<Vec<u8>>;
    async fn write(&self, name: &str, data: &[u8]) -> Result<()>;
    async fn delete(&self, name: &str) -> Result<()>;
    async fn list(&self) -> Result<Vec<String>>;
}
