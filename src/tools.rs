//! Tool-call dispatch for the documentation server.
//!
//! This is the layer between the MCP transport and the two backing
//! collaborators. Three tools are exposed:
//!
//! | Tool | Backing call | Output |
//! |------|--------------|--------|
//! | `search_smithy_docs` | [`Retriever::retrieve`] | ranked-results report |
//! | `read_smithy_doc` | [`ObjectStore::get`] | document heading + body |
//! | `list_smithy_topics` | [`ObjectStore::list`] | directory-grouped listing |
//!
//! Arguments are parsed once, at the dispatch boundary, into the tagged
//! [`ToolCall`] enum; handlers receive strongly-typed parameter structs.
//! Every outcome — including unknown tool names, malformed arguments, and
//! collaborator failures — is absorbed into a [`ToolResponse`] envelope.
//! Nothing here returns `Err` to the transport layer.
//!
//! Handlers are stateless; a [`DocsService`] can serve any number of
//! concurrent requests without coordination.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::retrieval::{RetrievedChunk, Retriever};
use crate::store::{ObjectStore, StoreError};

pub const SEARCH_TOOL: &str = "search_smithy_docs";
pub const READ_TOOL: &str = "read_smithy_doc";
pub const LIST_TOOL: &str = "list_smithy_topics";

/// Default result count when `max_results` is absent.
const DEFAULT_MAX_RESULTS: i64 = 5;
/// Hard cap on `max_results`; larger values are silently reduced.
const MAX_RESULTS_CAP: i64 = 10;

// ============ Response envelope ============

/// One text block inside a [`ToolResponse`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TextBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: String,
}

impl TextBlock {
    fn new(text: impl Into<String>) -> Self {
        Self {
            block_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// The uniform output shape returned for every tool call, success or
/// failure. The only difference on failure is `isError: true` plus
/// human-readable diagnostic text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolResponse {
    pub content: Vec<TextBlock>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResponse {
    /// A successful response with a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextBlock::new(text)],
            is_error: None,
        }
    }

    /// An error response with a single diagnostic text block.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![TextBlock::new(text)],
            is_error: Some(true),
        }
    }

    /// Whether this response is flagged as an error.
    pub fn failed(&self) -> bool {
        self.is_error == Some(true)
    }

    /// The first text block, for callers that expect a single-block body.
    pub fn first_text(&self) -> &str {
        self.content.first().map(|b| b.text.as_str()).unwrap_or("")
    }
}

// ============ Tool calls ============

/// Parameters for `search_smithy_docs`.
///
/// A missing or empty `query` is passed through to the retrieval service
/// as-is; relevance judgement is entirely delegated downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub max_results: Option<i64>,
}

/// Parameters for `read_smithy_doc`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadParams {
    pub file_path: String,
}

/// A tool call parsed into its strongly-typed form.
#[derive(Debug, Clone)]
pub enum ToolCall {
    Search(SearchParams),
    Read(ReadParams),
    List,
}

/// Why a `(name, arguments)` pair could not be turned into a [`ToolCall`].
#[derive(Debug, Error)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },
}

impl ToolCall {
    /// Parse an inbound tool call. Validation happens here, once; handlers
    /// never see raw argument maps.
    pub fn parse(name: &str, arguments: serde_json::Value) -> Result<Self, ToolCallError> {
        match name {
            SEARCH_TOOL => serde_json::from_value(arguments)
                .map(ToolCall::Search)
                .map_err(|e| ToolCallError::InvalidArguments {
                    tool: SEARCH_TOOL,
                    message: e.to_string(),
                }),
            READ_TOOL => serde_json::from_value(arguments)
                .map(ToolCall::Read)
                .map_err(|e| ToolCallError::InvalidArguments {
                    tool: READ_TOOL,
                    message: e.to_string(),
                }),
            LIST_TOOL => Ok(ToolCall::List),
            other => Err(ToolCallError::UnknownTool(other.to_string())),
        }
    }
}

// ============ Tool descriptors ============

/// Static descriptor for one tool, served to clients for introspection.
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

impl ToolDescriptor {
    /// JSON-Schema parameter descriptor for this tool.
    pub fn input_schema(&self) -> serde_json::Value {
        match self.name {
            SEARCH_TOOL => serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for Smithy documentation"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results to return",
                        "minimum": 1,
                        "maximum": 10,
                        "default": 5
                    }
                },
                "required": ["query"]
            }),
            READ_TOOL => serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Relative path of the documentation file (e.g. 'quickstart.md')"
                    }
                },
                "required": ["file_path"]
            }),
            _ => serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }
}

/// All tools this server exposes, in registration order.
pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: SEARCH_TOOL,
            description: "Search Smithy documentation using semantic search",
        },
        ToolDescriptor {
            name: READ_TOOL,
            description: "Read a specific Smithy documentation file by path",
        },
        ToolDescriptor {
            name: LIST_TOOL,
            description: "List all available Smithy documentation files grouped by topic",
        },
    ]
}

// ============ Dispatch service ============

/// The tool handlers and their injected collaborators.
///
/// Holds no mutable state; clones of the inner `Arc`s are shared freely
/// across concurrent requests.
pub struct DocsService {
    retriever: Arc<dyn Retriever>,
    store: Arc<dyn ObjectStore>,
    /// Corpus namespace: fixed key prefix for all documentation objects.
    prefix: String,
}

impl DocsService {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        store: Arc<dyn ObjectStore>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            store,
            prefix: prefix.into(),
        }
    }

    /// Route a tool call to its handler and produce exactly one response.
    ///
    /// Never fails: unknown names and malformed arguments become error
    /// envelopes so the serving process keeps handling later requests.
    pub async fn dispatch(&self, name: &str, arguments: serde_json::Value) -> ToolResponse {
        debug!(tool = name, "dispatching tool call");
        match ToolCall::parse(name, arguments) {
            Ok(ToolCall::Search(params)) => self.search(params).await,
            Ok(ToolCall::Read(params)) => self.read(params).await,
            Ok(ToolCall::List) => self.list().await,
            Err(e) => ToolResponse::error(e.to_string()),
        }
    }

    /// Handle `search_smithy_docs`.
    pub async fn search(&self, params: SearchParams) -> ToolResponse {
        let limit = effective_limit(params.max_results);

        match self.retriever.retrieve(&params.query, limit).await {
            Ok(results) if results.is_empty() => ToolResponse::text(format!(
                "No relevant documentation found for: \"{}\". \
                 Try rephrasing your query or using more specific Smithy terminology.",
                params.query
            )),
            Ok(results) => ToolResponse::text(format_search_report(&params.query, &results)),
            Err(e) => {
                let msg = e.to_string();
                let msg = if msg.is_empty() {
                    "Unknown error".to_string()
                } else {
                    msg
                };
                ToolResponse::error(format!("Error searching documentation: {}", msg))
            }
        }
    }

    /// Handle `read_smithy_doc`.
    pub async fn read(&self, params: ReadParams) -> ToolResponse {
        let key = document_key(&self.prefix, &params.file_path);

        match self.store.get(&key).await {
            Ok(content) if content.trim().is_empty() => ToolResponse::error(format!(
                "Document found but empty: {}",
                params.file_path
            )),
            Ok(content) => ToolResponse::text(format!("# {}\n\n{}", params.file_path, content)),
            Err(StoreError::NotFound(_)) => ToolResponse::error(format!(
                "Document not found: {}. Use the search_smithy_docs tool to discover available documentation.",
                params.file_path
            )),
            Err(e) => ToolResponse::error(format!("Error reading document: {}", e)),
        }
    }

    /// Handle `list_smithy_topics`.
    pub async fn list(&self) -> ToolResponse {
        match self.store.list(&self.prefix).await {
            Ok(objects) => {
                let paths: Vec<String> = objects
                    .iter()
                    .map(|o| {
                        o.key
                            .strip_prefix(&self.prefix)
                            .unwrap_or(&o.key)
                            .to_string()
                    })
                    .filter(|p| !p.is_empty())
                    .collect();

                if paths.is_empty() {
                    ToolResponse::text(
                        "No documentation files found. The corpus may not be populated yet.",
                    )
                } else {
                    ToolResponse::text(format_topic_listing(&paths))
                }
            }
            Err(e) => ToolResponse::error(format!("Error listing documentation: {}", e)),
        }
    }
}

/// Effective retrieval limit: default 5 when absent, clamped to [1, 10].
fn effective_limit(max_results: Option<i64>) -> usize {
    max_results
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(1, MAX_RESULTS_CAP) as usize
}

/// Build the storage key for a client-supplied relative path.
///
/// Leading path separators are stripped so that `a/b.md` and `/a/b.md`
/// resolve to the same key under the corpus prefix.
pub fn document_key(prefix: &str, file_path: &str) -> String {
    format!("{}{}", prefix, file_path.trim_start_matches('/'))
}

/// Final path segment of a source URI, or `unknown` when there is none.
fn source_label(uri: &str) -> &str {
    uri.rsplit('/').find(|s| !s.is_empty()).unwrap_or("unknown")
}

/// Render the ranked-results report for a search.
///
/// The format is stable byte-for-byte: downstream consumers parse the
/// `## Result N (score: X.XXX)` headings.
fn format_search_report(query: &str, results: &[RetrievedChunk]) -> String {
    let mut out = format!(
        "# Search Results for: \"{}\"\n\nFound {} relevant section(s):\n\n",
        query,
        results.len()
    );

    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!(
            "## Result {} (score: {:.3})\nSource: {}\n\n{}\n\n---\n\n",
            i + 1,
            result.score,
            source_label(&result.source_uri),
            result.text
        ));
    }

    out
}

/// Render the topic listing: paths grouped by containing directory.
///
/// Paths without a separator go under the synthetic `Root` group; groups
/// are sorted by name, and files within a group keep listing order.
fn format_topic_listing(paths: &[String]) -> String {
    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for path in paths {
        let group = match path.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => "Root".to_string(),
        };
        groups.entry(group).or_default().push(path);
    }

    let mut out = format!("# Smithy Documentation Topics ({} files)\n\n", paths.len());
    for (group, files) in &groups {
        out.push_str(&format!("## {}\n", group));
        for file in files {
            out.push_str(&format!("- {}\n", file));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit_default_and_clamp() {
        assert_eq!(effective_limit(None), 5);
        assert_eq!(effective_limit(Some(3)), 3);
        assert_eq!(effective_limit(Some(10)), 10);
        assert_eq!(effective_limit(Some(11)), 10);
        assert_eq!(effective_limit(Some(500)), 10);
        assert_eq!(effective_limit(Some(0)), 1);
        assert_eq!(effective_limit(Some(-7)), 1);
    }

    #[test]
    fn test_document_key_normalization() {
        assert_eq!(document_key("docs/", "a/b.md"), "docs/a/b.md");
        assert_eq!(document_key("docs/", "/a/b.md"), "docs/a/b.md");
        assert_eq!(document_key("docs/", "///a/b.md"), "docs/a/b.md");
        assert_eq!(document_key("", "/a.md"), "a.md");
    }

    #[test]
    fn test_source_label() {
        assert_eq!(source_label("s3://bucket/docs/quickstart.md"), "quickstart.md");
        assert_eq!(source_label("quickstart.md"), "quickstart.md");
        assert_eq!(source_label("a/b/"), "b");
        assert_eq!(source_label(""), "unknown");
        assert_eq!(source_label("///"), "unknown");
    }

    #[test]
    fn test_score_rendered_to_three_decimals() {
        let results = vec![RetrievedChunk {
            text: "content".to_string(),
            source_uri: "s3://b/docs/a.md".to_string(),
            score: 0.8234567,
            metadata: None,
        }];
        let report = format_search_report("q", &results);
        assert!(report.contains("## Result 1 (score: 0.823)"));
    }

    #[test]
    fn test_search_report_shape() {
        let results = vec![
            RetrievedChunk {
                text: "first chunk".to_string(),
                source_uri: "s3://b/docs/one.md".to_string(),
                score: 0.91,
                metadata: None,
            },
            RetrievedChunk {
                text: "second chunk".to_string(),
                source_uri: String::new(),
                score: 0.77,
                metadata: None,
            },
        ];
        let report = format_search_report("define a service", &results);
        assert!(report.starts_with("# Search Results for: \"define a service\"\n\n"));
        assert!(report.contains("Found 2 relevant section(s):"));
        let first = report.find("## Result 1 (score: 0.910)").unwrap();
        let second = report.find("## Result 2 (score: 0.770)").unwrap();
        assert!(first < second);
        assert!(report.contains("Source: one.md"));
        assert!(report.contains("Source: unknown"));
        assert!(report.contains("first chunk"));
        assert_eq!(report.matches("---").count(), 2);
    }

    #[test]
    fn test_topic_listing_grouping() {
        let paths = vec![
            "a.md".to_string(),
            "b/c.md".to_string(),
            "b/d.md".to_string(),
        ];
        let listing = format_topic_listing(&paths);
        assert!(listing.contains("(3 files)"));
        let root = listing.find("## Root\n- a.md\n").unwrap();
        let b = listing.find("## b\n- b/c.md\n- b/d.md\n").unwrap();
        assert!(root < b, "groups must be sorted by name");
    }

    #[test]
    fn test_topic_listing_nested_directory_group() {
        let paths = vec!["guides/serde/traits.md".to_string()];
        let listing = format_topic_listing(&paths);
        assert!(listing.contains("## guides/serde\n- guides/serde/traits.md\n"));
    }

    #[test]
    fn test_parse_unknown_tool() {
        let err = ToolCall::parse("bogus_tool", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ToolCallError::UnknownTool(ref n) if n == "bogus_tool"));
        assert_eq!(err.to_string(), "Unknown tool: bogus_tool");
    }

    #[test]
    fn test_parse_search_defaults() {
        let call = ToolCall::parse(SEARCH_TOOL, serde_json::json!({})).unwrap();
        match call {
            ToolCall::Search(p) => {
                assert_eq!(p.query, "");
                assert!(p.max_results.is_none());
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_parse_read_requires_file_path() {
        let err = ToolCall::parse(READ_TOOL, serde_json::json!({})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid arguments for read_smithy_doc:"));
        assert!(msg.contains("file_path"));
    }

    #[test]
    fn test_descriptor_schemas() {
        let descriptors = tool_descriptors();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name).collect();
        assert_eq!(names, vec![SEARCH_TOOL, READ_TOOL, LIST_TOOL]);

        let search = descriptors[0].input_schema();
        assert_eq!(search["required"], serde_json::json!(["query"]));
        assert_eq!(search["properties"]["max_results"]["minimum"], 1);
        assert_eq!(search["properties"]["max_results"]["maximum"], 10);
        assert_eq!(search["properties"]["max_results"]["default"], 5);

        let read = descriptors[1].input_schema();
        assert_eq!(read["required"], serde_json::json!(["file_path"]));

        let list = descriptors[2].input_schema();
        assert_eq!(list["properties"], serde_json::json!({}));
    }

    #[test]
    fn test_envelope_serialization() {
        let ok = ToolResponse::text("hello");
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "content": [{ "type": "text", "text": "hello" }] })
        );

        let err = ToolResponse::error("boom");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["isError"], true);
        assert_eq!(json["content"][0]["type"], "text");
    }
}
