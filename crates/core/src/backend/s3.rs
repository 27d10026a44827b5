use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use tokio::sync::OnceCell;
use tracing::debug;

use super::Backend;
use crate::config::S3Config;
use crate::error::{Error, Result};
use crate::join::{join, strip_prefix};
use crate::sniff;

const LIST_PAGE_SIZE: usize = 100;
const DEFAULT_REGION: &str = "us-east-1";

struct Clients {
    bucket: Box<Bucket>,
    /// Same bucket with `x-amz-acl: private` on every request.
    writer: Box<Bucket>,
}

pub struct S3Backend {
    bucket_name: String,
    prefix: String,
    config: S3Config,
    clients: OnceCell<Clients>,
}

impl S3Backend {
    /// The client is built on first use, so missing credentials surface as
    /// a configuration error of the first operation.
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>, config: S3Config) -> Self {
        Self {
            bucket_name: bucket.into(),
            prefix: prefix.into(),
            config,
            clients: OnceCell::new(),
        }
    }

    /// Use an already configured bucket handle.
    pub fn with_bucket(bucket: Box<Bucket>, prefix: impl Into<String>) -> Self {
        let clients = OnceCell::new_with(Some(Clients::from_bucket(bucket.clone())));
        Self {
            bucket_name: bucket.name(),
            prefix: prefix.into(),
            config: S3Config::default(),
            clients,
        }
    }

    fn key(&self, name: &str) -> String {
        join(&self.prefix, name)
    }

    /// Listing prefix: the base prefix as a directory, so that `reports`
    /// does not pick up `reports-old/...`.
    fn list_prefix(&self) -> String {
        if self.prefix.is_empty() {
            String::new()
        } else {
            join(&self.prefix, "")
        }
    }

    fn coordinate(&self, key: &str) -> String {
        format!("s3://{}/{key}", self.bucket_name)
    }

    async fn clients(&self) -> Result<&Clients> {
        self.clients
            .get_or_try_init(|| async { self.connect() })
            .await
    }

    fn connect(&self) -> Result<Clients> {
        let credentials = match (&self.config.access_key, &self.config.secret_key) {
            (Some(access), Some(secret)) => {
                Credentials::new(Some(access.as_str()), Some(secret.as_str()), None, None, None)
            }
            _ => Credentials::default(),
        }
        .map_err(|e| Error::Configuration(format!("S3 credentials: {e}")))?;

        let region = resolve_region(&self.config);
        let path_style = self.config.path_style || self.config.endpoint.is_some();
        let mut bucket = Bucket::new(&self.bucket_name, region, credentials)
            .map_err(|e| Error::Configuration(format!("S3 bucket {}: {e}", self.bucket_name)))?;
        if path_style {
            bucket = bucket.with_path_style();
        }
        debug!(bucket = %self.bucket_name, path_style, "S3 client ready");
        Ok(Clients::from_bucket(bucket))
    }
}

impl Clients {
    fn from_bucket(bucket: Box<Bucket>) -> Self {
        let mut writer = bucket.clone();
        writer.add_header("x-amz-acl", "private");
        Self { bucket, writer }
    }
}

fn resolve_region(config: &S3Config) -> Region {
    let name = config
        .region
        .clone()
        .or_else(|| std::env::var("AWS_REGION").ok())
        .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    match &config.endpoint {
        Some(endpoint) => Region::Custom {
            region: name,
            endpoint: endpoint.clone(),
        },
        None => name.parse().unwrap_or(Region::UsEast1),
    }
}

/// Map a response status to the store's error kinds.
fn check_status(op: &'static str, coordinate: String, status: u16, body: &[u8]) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(Error::NotFound(coordinate)),
        _ => Err(Error::status(
            op,
            coordinate,
            status,
            &String::from_utf8_lossy(body),
        )),
    }
}

#[async_trait]
impl Backend for S3Backend {
    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let key = self.key(name);
        debug!(bucket = %self.bucket_name, key = %key, "S3 GET");
        let clients = self.clients().await?;
        let response = clients
            .bucket
            .get_object(&key)
            .await
            .map_err(|e| Error::backend("GET", self.coordinate(&key), e))?;
        check_status(
            "GET",
            self.coordinate(&key),
            response.status_code(),
            response.bytes(),
        )?;
        Ok(response.to_vec())
    }

    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let key = self.key(name);
        let content_type = sniff::content_type(data);
        debug!(bucket = %self.bucket_name, key = %key, content_type, "S3 PUT");
        let clients = self.clients().await?;
        let response = clients
            .writer
            .put_object_with_content_type(&key, data, content_type)
            .await
            .map_err(|e| Error::backend("PUT", self.coordinate(&key), e))?;
        check_status(
            "PUT",
            self.coordinate(&key),
            response.status_code(),
            response.bytes(),
        )
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let key = self.key(name);
        debug!(bucket = %self.bucket_name, key = %key, "S3 DELETE");
        let clients = self.clients().await?;
        let response = clients
            .bucket
            .delete_object(&key)
            .await
            .map_err(|e| Error::backend("DELETE", self.coordinate(&key), e))?;
        check_status(
            "DELETE",
            self.coordinate(&key),
            response.status_code(),
            response.bytes(),
        )
    }

    async fn list(&self) -> Result<Vec<String>> {
        let prefix = self.list_prefix();
        let clients = self.clients().await?;
        let mut names = Vec::new();
        let mut token: Option<String> = None;

        loop {
            debug!(bucket = %self.bucket_name, prefix = %prefix, token = ?token, "S3 LIST page");
            let (page, status) = clients
                .bucket
                .list_page(prefix.clone(), None, token.take(), None, Some(LIST_PAGE_SIZE))
                .await
                .map_err(|e| Error::backend("LIST", self.coordinate(&prefix), e))?;
            check_status("LIST", self.coordinate(&prefix), status, &[])?;

            names.extend(
                page.contents
                    .iter()
                    .map(|object| strip_prefix(&self.prefix, &object.key).to_string()),
            );

            match page.next_continuation_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn backend(prefix: &str) -> S3Backend {
        S3Backend::new("my-bucket", prefix, S3Config::default())
    }

    #[test]
    fn key_mapping() {
        let b = backend("reports");
        assert_eq!(b.key("2024/jan.csv"), "reports/2024/jan.csv");
        assert_eq!(b.key("/2024/jan.csv"), "reports/2024/jan.csv");

        let b = backend("reports/");
        assert_eq!(b.key("2024/jan.csv"), "reports/2024/jan.csv");
    }

    #[test]
    fn key_mapping_bucket_root() {
        let b = backend("");
        assert_eq!(b.key("2024/jan.csv"), "2024/jan.csv");
        assert_eq!(b.list_prefix(), "");
    }

    #[test]
    fn list_prefix_is_directory() {
        assert_eq!(backend("reports").list_prefix(), "reports/");
        assert_eq!(backend("reports/").list_prefix(), "reports/");
    }

    #[test]
    fn listed_keys_round_trip_to_names() {
        let b = backend("reports");
        let key = b.key("2024/jan.csv");
        assert_eq!(strip_prefix(&b.prefix, &key), "2024/jan.csv");
    }

    #[test]
    fn coordinate_format() {
        let b = backend("reports");
        assert_eq!(
            b.coordinate(&b.key("a.txt")),
            "s3://my-bucket/reports/a.txt"
        );
    }

    #[test]
    fn status_mapping() {
        assert!(check_status("GET", "c".into(), 200, b"").is_ok());
        assert!(check_status("DELETE", "c".into(), 204, b"").is_ok());
        let err = check_status("GET", "c".into(), 404, b"<Error/>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = check_status("GET", "c".into(), 403, b"AccessDenied").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(err.to_string().contains("AccessDenied"));
    }

    #[test]
    fn custom_endpoint_region() {
        let config = S3Config {
            region: Some("eu-central-1".into()),
            endpoint: Some("http://localhost:9000".into()),
            ..Default::default()
        };
        match resolve_region(&config) {
            Region::Custom { region, endpoint } => {
                assert_eq!(region, "eu-central-1");
                assert_eq!(endpoint, "http://localhost:9000");
            }
            other => panic!("unexpected region {other:?}"),
        }
    }

    #[test]
    fn explicit_region_wins() {
        let config = S3Config {
            region: Some("eu-west-1".into()),
            ..Default::default()
        };
        assert!(matches!(resolve_region(&config), Region::EuWest1));
    }

    #[tokio::test]
    async fn static_credentials_build_client_lazily() {
        let config = S3Config {
            region: Some("us-east-1".into()),
            endpoint: Some("http://127.0.0.1:9".into()),
            access_key: Some("AKIAEXAMPLE".into()),
            secret_key: Some("secret".into()),
            path_style: false,
        };
        let b = S3Backend::new("my-bucket", "p", config);
        assert!(b.clients.get().is_none());
        let clients = b.clients().await.unwrap();
        assert_eq!(clients.bucket.name(), "my-bucket");
        assert!(b.clients.get().is_some());
    }
}
