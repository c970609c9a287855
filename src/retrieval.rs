//! Semantic retrieval over the documentation corpus.
//!
//! Chunking, embedding, and ranking are entirely delegated to an Amazon
//! Bedrock Knowledge Base; this module only wraps its `Retrieve` API
//! behind the narrow [`Retriever`] trait the search handler consumes.
//! Result ordering is whatever the service returns (descending relevance)
//! and is preserved as-is.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RetrievalConfig;
use crate::sigv4::{self, Credentials, RequestToSign};

/// One ranked content chunk returned by the retrieval service.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// Raw chunk text.
    pub text: String,
    /// Opaque URI identifying the backing object (e.g. `s3://bucket/docs/a.md`).
    pub source_uri: String,
    /// Relevance score assigned by the service.
    pub score: f64,
    /// Service-provided metadata, if any.
    pub metadata: Option<serde_json::Value>,
}

/// External semantic-search capability.
///
/// Implementations must treat the query as opaque — no local relevance
/// judgement — and return at most `limit` results in service order.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<RetrievedChunk>>;
}

/// [`Retriever`] backed by the Bedrock `bedrock-agent-runtime` Retrieve API.
pub struct BedrockRetriever {
    config: RetrievalConfig,
    client: reqwest::Client,
}

impl BedrockRetriever {
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn host(&self) -> String {
        format!("bedrock-agent-runtime.{}.amazonaws.com", self.config.region)
    }
}

// ============ Retrieve API wire types ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest<'a> {
    retrieval_query: RetrievalQuery<'a>,
    retrieval_configuration: RetrievalConfiguration,
}

#[derive(Debug, Serialize)]
struct RetrievalQuery<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfiguration {
    vector_search_configuration: VectorSearchConfiguration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorSearchConfiguration {
    number_of_results: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_results: Vec<RetrievalResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalResult {
    content: Option<ResultContent>,
    location: Option<ResultLocation>,
    score: Option<f64>,
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResultContent {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultLocation {
    s3_location: Option<S3Location>,
}

#[derive(Debug, Deserialize)]
struct S3Location {
    uri: Option<String>,
}

impl RetrievalResult {
    fn into_chunk(self) -> RetrievedChunk {
        RetrievedChunk {
            text: self.content.and_then(|c| c.text).unwrap_or_default(),
            source_uri: self
                .location
                .and_then(|l| l.s3_location)
                .and_then(|l| l.uri)
                .unwrap_or_default(),
            score: self.score.unwrap_or(0.0),
            metadata: self.metadata,
        }
    }
}

#[async_trait]
impl Retriever for BedrockRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<RetrievedChunk>> {
        let creds = Credentials::from_env()?;
        let host = self.host();
        let canonical_uri = format!(
            "/knowledgebases/{}/retrieve",
            sigv4::uri_encode(&self.config.knowledge_base_id)
        );

        let body = serde_json::to_vec(&RetrieveRequest {
            retrieval_query: RetrievalQuery { text: query },
            retrieval_configuration: RetrievalConfiguration {
                vector_search_configuration: VectorSearchConfiguration {
                    number_of_results: limit,
                },
            },
        })?;

        let signed = sigv4::sign(
            &RequestToSign {
                method: "POST",
                host: &host,
                canonical_uri: &canonical_uri,
                canonical_querystring: "",
                payload: &body,
                region: &self.config.region,
                service: "bedrock",
            },
            &creds,
        );

        let url = format!("https://{}{}", host, canonical_uri);
        let mut req_builder = self
            .client
            .post(&url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.content_sha256)
            .header("x-amz-date", &signed.amz_date)
            .header("Content-Type", "application/json")
            .body(body);

        if let Some(ref token) = signed.security_token {
            req_builder = req_builder.header("x-amz-security-token", token);
        }

        let resp = req_builder
            .send()
            .await
            .map_err(|e| anyhow!("Knowledge base request failed: {}", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Knowledge base Retrieve failed (HTTP {}): {}",
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        let parsed: RetrieveResponse = resp
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Retrieve response: {}", e))?;

        Ok(parsed
            .retrieval_results
            .into_iter()
            .map(RetrievalResult::into_chunk)
            .collect())
    }
}
