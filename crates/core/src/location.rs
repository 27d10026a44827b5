//! Base path parsing.
//!
//! A base path is either a URI (`s3://bucket/prefix`,
//! `blob://account/container/prefix`, `http(s)://host/path`) or anything
//! else, which is taken verbatim as a local filesystem path.

use std::fmt;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Local,
    S3,
    AzureBlob,
    Http,
}

impl BackendKind {
    /// Map a URI scheme to a backend. Unknown schemes are local paths.
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme.to_ascii_lowercase().as_str() {
            "s3" => BackendKind::S3,
            "blob" => BackendKind::AzureBlob,
            "http" | "https" => BackendKind::Http,
            _ => BackendKind::Local,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::S3 => "s3",
            BackendKind::AzureBlob => "blob",
            BackendKind::Http => "http",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend address a store is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local {
        root: String,
    },
    S3 {
        bucket: String,
        prefix: String,
    },
    AzureBlob {
        account: String,
        container: String,
        prefix: String,
    },
    Http {
        root: Url,
    },
}

impl Location {
    pub fn parse(base_path: &str) -> Result<Self> {
        let kind = scheme(base_path)
            .map(BackendKind::from_scheme)
            .unwrap_or(BackendKind::Local);

        let parse_url =
            || Url::parse(base_path).map_err(|e| Error::parse(base_path, e.to_string()));
        match kind {
            BackendKind::Local => Ok(Location::Local {
                root: base_path.to_string(),
            }),
            BackendKind::S3 => {
                let url = parse_url()?;
                let bucket = host(&url, base_path, "bucket")?;
                let prefix = decode(base_path, strip_root(url.path()))?;
                Ok(Location::S3 { bucket, prefix })
            }
            BackendKind::AzureBlob => {
                let url = parse_url()?;
                let account = host(&url, base_path, "storage account")?;
                let path = strip_root(url.path());
                let (container, prefix) = path.split_once('/').unwrap_or((path, ""));
                if container.is_empty() {
                    return Err(Error::parse(base_path, "missing container"));
                }
                Ok(Location::AzureBlob {
                    account,
                    container: decode(base_path, container)?,
                    prefix: decode(base_path, prefix)?,
                })
            }
            BackendKind::Http => {
                let url = parse_url()?;
                if url.host_str().is_none() {
                    return Err(Error::parse(base_path, "missing host"));
                }
                Ok(Location::Http { root: url })
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Location::Local { .. } => BackendKind::Local,
            Location::S3 { .. } => BackendKind::S3,
            Location::AzureBlob { .. } => BackendKind::AzureBlob,
            Location::Http { .. } => BackendKind::Http,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local { root } => f.write_str(root),
            Location::S3 { bucket, prefix } => write!(f, "s3://{bucket}/{prefix}"),
            Location::AzureBlob {
                account,
                container,
                prefix,
            } => write!(f, "blob://{account}/{container}/{prefix}"),
            Location::Http { root } => f.write_str(root.as_str()),
        }
    }
}

/// Scheme of `s` per RFC 3986 (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
/// followed by `:`), if it has one.
fn scheme(s: &str) -> Option<&str> {
    let (scheme, _) = s.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    chars
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .then_some(scheme)
}

fn strip_root(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

fn host(url: &Url, base_path: &str, what: &str) -> Result<String> {
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(Error::parse(base_path, format!("missing {what}"))),
    }
}

fn decode(base_path: &str, s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| Error::parse(base_path, e.to_string()))
}
