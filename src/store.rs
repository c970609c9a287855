//! Object storage for raw documentation files.
//!
//! The [`ObjectStore`] trait is the narrow seam the tool handlers consume:
//! key-based `get` plus prefix `list`. The production implementation is
//! [`S3Store`], which talks to the S3 REST API directly with AWS SigV4
//! signing and supports custom endpoints for S3-compatible services
//! (MinIO, LocalStack).
//!
//! A missing object is reported as [`StoreError::NotFound`] so the read
//! handler can distinguish it from transport or permission failures.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use thiserror::Error;

use crate::config::StorageConfig;
use crate::sigv4::{self, Credentials, RequestToSign};

/// Failure modes of an object store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested key does not exist in the store.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Any other failure (network, permission, malformed response).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One stored object, as reported by a listing call.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    /// Full object key (including the corpus prefix).
    pub key: String,
    /// Object size in bytes.
    pub size: i64,
}

/// Key-addressed storage for document bytes and key enumeration.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's content as text.
    async fn get(&self, key: &str) -> Result<String, StoreError>;

    /// Enumerate every key under the given prefix.
    ///
    /// Implementations must return the complete listing; pagination is an
    /// implementation concern, not the caller's.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StoreError>;
}

/// S3-backed [`ObjectStore`] using SigV4-signed REST calls.
pub struct S3Store {
    config: StorageConfig,
    client: reqwest::Client,
}

impl S3Store {
    /// Create a store for the configured bucket. Credentials are read from
    /// the environment on each call, so rotated temporary credentials are
    /// picked up without a restart.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Compute the S3 hostname for the configured bucket and region.
    ///
    /// If a custom `endpoint_url` is set (for MinIO, LocalStack, etc.),
    /// that is used instead of `<bucket>.s3.<region>.amazonaws.com`.
    fn host(&self) -> String {
        if let Some(ref endpoint) = self.config.endpoint_url {
            endpoint
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string()
        } else {
            format!("{}.s3.{}.amazonaws.com", self.config.bucket, self.config.region)
        }
    }

    fn scheme(&self) -> &'static str {
        match self.config.endpoint_url {
            Some(ref endpoint) if endpoint.starts_with("http://") => "http",
            _ => "https",
        }
    }

    /// Leading URI component for the bucket.
    ///
    /// Virtual-hosted addressing puts the bucket in the hostname, so the
    /// path starts at the key. Custom endpoints (MinIO, LocalStack) use
    /// path-style addressing: `/{bucket}/{key}`.
    fn base_uri(&self) -> String {
        if self.config.endpoint_url.is_some() {
            format!("/{}", sigv4::uri_encode(&self.config.bucket))
        } else {
            String::new()
        }
    }

    async fn send_signed_get(
        &self,
        canonical_uri: &str,
        canonical_querystring: &str,
    ) -> Result<reqwest::Response> {
        let creds = Credentials::from_env()?;
        let host = self.host();

        let signed = sigv4::sign(
            &RequestToSign {
                method: "GET",
                host: &host,
                canonical_uri,
                canonical_querystring,
                payload: b"",
                region: &self.config.region,
                service: "s3",
            },
            &creds,
        );

        let url = if canonical_querystring.is_empty() {
            format!("{}://{}{}", self.scheme(), host, canonical_uri)
        } else {
            format!(
                "{}://{}{}?{}",
                self.scheme(),
                host,
                canonical_uri,
                canonical_querystring
            )
        };

        let mut req_builder = self
            .client
            .get(&url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.content_sha256)
            .header("x-amz-date", &signed.amz_date);

        if let Some(ref token) = signed.security_token {
            req_builder = req_builder.header("x-amz-security-token", token);
        }

        let resp = req_builder.send().await.map_err(|e| {
            anyhow!(
                "S3 request to s3://{}{} failed: {}",
                self.config.bucket,
                canonical_uri,
                e
            )
        })?;
        Ok(resp)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let canonical_uri = format!("{}/{}", self.base_uri(), sigv4::uri_encode_path(key));
        let resp = self.send_signed_get(&canonical_uri, "").await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(StoreError::Other(anyhow!(
                "S3 GetObject failed (HTTP {}) for key '{}'",
                status,
                key
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| anyhow!("Failed to read S3 object body for '{}': {}", key, e))?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StoreError> {
        let base = self.base_uri();
        let canonical_uri = if base.is_empty() {
            "/".to_string()
        } else {
            base
        };
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut query_params = vec![
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), "1000".to_string()),
            ];
            if !prefix.is_empty() {
                query_params.push(("prefix".to_string(), prefix.to_string()));
            }
            if let Some(ref token) = continuation_token {
                query_params.push(("continuation-token".to_string(), token.clone()));
            }

            let canonical_querystring = sigv4::canonical_query(&query_params);
            let resp = self
                .send_signed_get(&canonical_uri, &canonical_querystring)
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(StoreError::Other(anyhow!(
                    "S3 ListObjectsV2 failed (HTTP {}): {}",
                    status,
                    body.chars().take(500).collect::<String>()
                )));
            }

            let xml_body = resp
                .text()
                .await
                .map_err(|e| anyhow!("Failed to read S3 listing body: {}", e))?;
            let (batch, is_truncated, next_token) = parse_list_objects_response(&xml_body)?;
            objects.extend(batch);

            if is_truncated {
                continuation_token = next_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }
}

// ============ XML Parsing (minimal, no extra deps) ============

/// Parse a `ListObjectsV2` XML response into [`ObjectSummary`]s.
///
/// Also returns whether the listing is truncated and the next continuation
/// token for pagination. Directory placeholder keys (ending in `/`) are
/// skipped.
fn parse_list_objects_response(xml: &str) -> Result<(Vec<ObjectSummary>, bool, Option<String>)> {
    let mut objects = Vec::new();
    let is_truncated = extract_xml_value(xml, "IsTruncated")
        .map(|v| v == "true")
        .unwrap_or(false);
    let next_token = extract_xml_value(xml, "NextContinuationToken");

    let mut remaining = xml;
    while let Some(start) = remaining.find("<Contents>") {
        let block_start = start + "<Contents>".len();
        if let Some(end) = remaining[block_start..].find("</Contents>") {
            let block = &remaining[block_start..block_start + end];

            let key = extract_xml_value(block, "Key").unwrap_or_default();
            if key.is_empty() || key.ends_with('/') {
                remaining = &remaining[block_start + end + "</Contents>".len()..];
                continue;
            }

            let size = extract_xml_value(block, "Size")
                .and_then(|s| s.parse::<i64>().ok())
                .unwrap_or(0);

            objects.push(ObjectSummary { key, size });

            remaining = &remaining[block_start + end + "</Contents>".len()..];
        } else {
            break;
        }
    }

    Ok((objects, is_truncated, next_token))
}

/// Extract the text content of an XML tag (simple, non-nested), with the
/// five standard entities decoded.
fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    if let Some(start) = xml.find(&open) {
        let value_start = start + open.len();
        if let Some(end) = xml[value_start..].find(&close) {
            return Some(unescape_xml(&xml[value_start..value_start + end]));
        }
    }
    None
}

/// Decode the five predefined XML entities. S3 escapes object keys in
/// listing responses; keys must round-trip into `GetObject` requests.
/// `&amp;` is decoded last so `&amp;lt;` yields the literal `&lt;`.
fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
