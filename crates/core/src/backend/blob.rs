//! Azure Blob Storage over the REST API with Shared Key authorization.
//!
//! The account key is looked up on every operation, never at construction,
//! so a store can be created before credentials are in place.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;
use url::Url;

use super::Backend;
use crate::config::{AccountKeySource, BlobConfig};
use crate::error::{Error, Result};
use crate::join::{join, strip_prefix};
use crate::sniff;

const AZURE_API_VERSION: &str = "2023-11-03";

/// Unreserved characters stay as they are, everything else is escaped.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Same as the query set but `/` separates virtual directories.
const PATH_ENCODE_SET: &AsciiSet = &QUERY_ENCODE_SET.remove(b'/');

pub struct BlobBackend {
    client: reqwest::Client,
    account: String,
    container: String,
    prefix: String,
    /// Service URL without trailing slash.
    endpoint: String,
    /// Path part of the endpoint, non-empty for emulators that put the
    /// account into the path.
    endpoint_path: String,
    key_source: AccountKeySource,
}

impl BlobBackend {
    pub fn new(
        client: reqwest::Client,
        account: impl Into<String>,
        container: impl Into<String>,
        prefix: impl Into<String>,
        config: &BlobConfig,
    ) -> Result<Self> {
        let account = account.into();
        let endpoint = match &config.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{account}.blob.core.windows.net"),
        };
        let endpoint_path = Url::parse(&endpoint)
            .map_err(|e| Error::Configuration(format!("blob endpoint '{endpoint}': {e}")))?
            .path()
            .trim_end_matches('/')
            .to_string();
        let key_source = config.account_key_source();

        Ok(Self {
            client,
            account,
            container: container.into(),
            prefix: prefix.into(),
            endpoint,
            endpoint_path,
            key_source,
        })
    }

    pub fn with_key_source(mut self, key_source: AccountKeySource) -> Self {
        self.key_source = key_source;
        self
    }

    fn blob_name(&self, name: &str) -> String {
        join(&self.prefix, name)
    }

    fn coordinate(&self, blob_name: &str) -> String {
        format!("blob://{}/{}/{blob_name}", self.account, self.container)
    }

    fn signing_key(&self) -> Result<Vec<u8>> {
        let key = self.key_source.resolve()?;
        BASE64_STANDARD
            .decode(key.trim())
            .map_err(|e| Error::Configuration(format!("account key is not valid base64: {e}")))
    }

    /// URL-path of a container or blob below the endpoint, percent-encoded.
    fn resource_path(&self, blob_name: Option<&str>) -> String {
        let container = utf8_percent_encode(&self.container, QUERY_ENCODE_SET);
        match blob_name {
            Some(blob) => format!("{container}/{}", utf8_percent_encode(blob, PATH_ENCODE_SET)),
            None => container.to_string(),
        }
    }

    async fn send(
        &self,
        method: Method,
        blob_name: Option<&str>,
        query: &[(&str, &str)],
        body: Option<(&[u8], &str)>,
    ) -> Result<reqwest::Response> {
        let key = self.signing_key()?;

        let path = self.resource_path(blob_name);
        let mut url = format!("{}/{path}", self.endpoint);
        if !query.is_empty() {
            let encoded: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, QUERY_ENCODE_SET)))
                .collect();
            url.push('?');
            url.push_str(&encoded.join("&"));
        }

        let date = httpdate::fmt_http_date(std::time::SystemTime::now());
        let mut ms_headers = vec![
            ("x-ms-date", date.as_str()),
            ("x-ms-version", AZURE_API_VERSION),
        ];
        if body.is_some() {
            ms_headers.push(("x-ms-blob-type", "BlockBlob"));
        }
        ms_headers.sort();

        let (content_length, content_type) = body.map_or((0, ""), |(data, ct)| (data.len(), ct));
        let resource = format!("/{}{}/{path}", self.account, self.endpoint_path);
        let to_sign = string_to_sign(
            method.as_str(),
            content_length,
            content_type,
            &ms_headers,
            &resource,
            query,
        );
        let signature = sign(&key, &to_sign)?;

        let mut request = self.client.request(method.clone(), &url).header(
            "Authorization",
            format!("SharedKey {}:{signature}", self.account),
        );
        for (name, value) in &ms_headers {
            request = request.header(*name, *value);
        }
        if let Some((data, content_type)) = body {
            request = request
                .header("Content-Type", content_type)
                .body(data.to_vec());
        }

        let coordinate = self.coordinate(blob_name.unwrap_or(""));
        request
            .send()
            .await
            .map_err(|e| Error::backend(method_op(&method), coordinate, e))
    }

    async fn check(
        &self,
        op: &'static str,
        blob_name: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let coordinate = self.coordinate(blob_name);
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(coordinate));
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::status(op, coordinate, status.as_u16(), &body))
    }
}

fn method_op(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        _ => "request",
    }
}

/// Shared Key string-to-sign for the Blob service.
///
/// `ms_headers` must be sorted and lower-case; `query` values unencoded.
fn string_to_sign(
    method: &str,
    content_length: usize,
    content_type: &str,
    ms_headers: &[(&str, &str)],
    resource: &str,
    query: &[(&str, &str)],
) -> String {
    // Content-Length is empty rather than 0 for bodiless requests.
    let content_length = match content_length {
        0 => String::new(),
        len => len.to_string(),
    };
    let headers = ms_headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut resource = resource.to_string();
    let mut params = query.to_vec();
    params.sort();
    for (k, v) in params {
        resource.push_str(&format!("\n{}:{v}", k.to_lowercase()));
    }

    format!(
        "{method}\n\n\n{content_length}\n\n{content_type}\n\n\n\n\n\n\n{headers}\n{resource}"
    )
}

fn sign(key: &[u8], string_to_sign: &str) -> Result<String> {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::Configuration(format!("account key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    blobs: Blobs,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Blobs {
    #[serde(rename = "Blob", default)]
    items: Vec<BlobItem>,
}

#[derive(Debug, Deserialize)]
struct BlobItem {
    #[serde(rename = "Name")]
    name: String,
}

type ListPage = (Vec<String>, Option<String>);

fn parse_list_page(xml: &str) -> std::result::Result<ListPage, quick_xml::DeError> {
    let page: EnumerationResults = quick_xml::de::from_str(xml)?;
    let names = page.blobs.items.into_iter().map(|b| b.name).collect();
    let marker = page.next_marker.filter(|m| !m.is_empty());
    Ok((names, marker))
}

#[async_trait]
impl Backend for BlobBackend {
    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let blob = self.blob_name(name);
        debug!(account = %self.account, container = %self.container, blob = %blob, "blob GET");
        let response = self.send(Method::GET, Some(&blob), &[], None).await?;
        let response = self.check("GET", &blob, response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::backend("GET", self.coordinate(&blob), e))?;
        Ok(body.to_vec())
    }

    async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let blob = self.blob_name(name);
        let content_type = sniff::content_type(data);
        debug!(account = %self.account, container = %self.container, blob = %blob, content_type, "blob PUT");
        let response = self
            .send(Method::PUT, Some(&blob), &[], Some((data, content_type)))
            .await?;
        self.check("PUT", &blob, response).await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let blob = self.blob_name(name);
        debug!(account = %self.account, container = %self.container, blob = %blob, "blob DELETE");
        let response = self.send(Method::DELETE, Some(&blob), &[], None).await?;
        self.check("DELETE", &blob, response).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let prefix = if self.prefix.is_empty() {
            String::new()
        } else {
            join(&self.prefix, "")
        };
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            debug!(account = %self.account, container = %self.container, prefix = %prefix, marker = ?marker, "blob LIST page");
            let mut query = vec![("restype", "container"), ("comp", "list")];
            if !prefix.is_empty() {
                query.push(("prefix", prefix.as_str()));
            }
            if let Some(marker) = &marker {
                query.push(("marker", marker.as_str()));
            }

            let response = self.send(Method::GET, None, &query, None).await?;
            let response = self.check("LIST", &prefix, response).await?;
            let xml = response
                .text()
                .await
                .map_err(|e| Error::backend("LIST", self.coordinate(&prefix), e))?;
            let (blobs, next) = parse_list_page(&xml)
                .map_err(|e| Error::backend("LIST", self.coordinate(&prefix), e))?;

            names.extend(
                blobs
                    .iter()
                    .map(|blob| strip_prefix(&self.prefix, blob).to_string()),
            );

            match next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(names)
    }
}
