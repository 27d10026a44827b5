use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use super::Backend;
use crate::error::{Error, Result};
use crate::join::join;

/// Read-only access to objects served over HTTP(S).
pub struct HttpBackend {
    client: reqwest::Client,
    root: Url,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client, root: Url) -> Self {
        Self { client, root }
    }

    fn url(&self, name: &str) -> String {
        join(self.root.as_str(), name)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.url(name);
        debug!(url = %url, "HTTP GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::backend("GET", url.as_str(), e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status("GET", url, status.as_u16(), &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::backend("GET", url.as_str(), e))?;
        Ok(body.to_vec())
    }

    async fn write(&self, _name: &str, _data: &[u8]) -> Result<()> {
        Err(Error::Unsupported("HTTP write is not implemented"))
    }

    async fn delete(&self, _name: &str) -> Result<()> {
        Err(Error::Unsupported("HTTP delete is not implemented"))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Err(Error::Unsupported("HTTP list is not implemented"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn backend(root: &str) -> HttpBackend {
        HttpBackend::new(reqwest::Client::new(), Url::parse(root).unwrap())
    }

    #[test]
    fn url_joins_name() {
        let b = backend("https://example.com/files");
        assert_eq!(b.url("a/b.txt"), "https://example.com/files/a/b.txt");
        let b = backend("https://example.com/files/");
        assert_eq!(b.url("/a/b.txt"), "https://example.com/files/a/b.txt");
        let b = backend("https://example.com");
        assert_eq!(b.url("a.txt"), "https://example.com/a.txt");
    }

    #[tokio::test]
    async fn mutations_are_unsupported() {
        let b = backend("https://example.com/files");
        for name in ["a", "", "/x/y"] {
            assert_eq!(
                b.write(name, b"x").await.unwrap_err().kind(),
                ErrorKind::Unsupported
            );
            assert_eq!(b.delete(name).await.unwrap_err().kind(), ErrorKind::Unsupported);
        }
        let err = b.list().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(err.to_string(), "HTTP list is not implemented");
    }
}
