//! End-to-end dispatch tests.
//!
//! These drive the real [`DocsService`] dispatch path with in-memory
//! collaborators implementing the `Retriever` and `ObjectStore` traits,
//! so the full request flow — argument parsing, handler branching,
//! formatting, error absorption — is exercised without any network.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

use smithy_docs_mcp::retrieval::{RetrievedChunk, Retriever};
use smithy_docs_mcp::store::{ObjectStore, ObjectSummary, StoreError};
use smithy_docs_mcp::tools::DocsService;

// ─── Fake collaborators ─────────────────────────────────────────────

/// Retriever returning canned results and recording the limits it sees.
struct FakeRetriever {
    results: Vec<RetrievedChunk>,
    fail_with: Option<String>,
    limits_seen: Mutex<Vec<usize>>,
}

impl FakeRetriever {
    fn returning(results: Vec<RetrievedChunk>) -> Arc<Self> {
        Arc::new(Self {
            results,
            fail_with: None,
            limits_seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            results: Vec::new(),
            fail_with: Some(message.to_string()),
            limits_seen: Mutex::new(Vec::new()),
        })
    }

    fn limits(&self) -> Vec<usize> {
        self.limits_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, _query: &str, limit: usize) -> Result<Vec<RetrievedChunk>> {
        self.limits_seen.lock().unwrap().push(limit);
        if let Some(ref message) = self.fail_with {
            anyhow::bail!("{}", message);
        }
        Ok(self.results.clone())
    }
}

/// Object store over an ordered in-memory key/content list, recording
/// every key it is asked for.
struct FakeStore {
    objects: Vec<(String, String)>,
    fail_get_with: Option<String>,
    fail_list_with: Option<String>,
    keys_seen: Mutex<Vec<String>>,
}

impl FakeStore {
    fn with_objects(objects: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            objects: objects
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fail_get_with: None,
            fail_list_with: None,
            keys_seen: Mutex::new(Vec::new()),
        })
    }

    fn failing_get(message: &str) -> Arc<Self> {
        Arc::new(Self {
            objects: Vec::new(),
            fail_get_with: Some(message.to_string()),
            fail_list_with: None,
            keys_seen: Mutex::new(Vec::new()),
        })
    }

    fn failing_list(message: &str) -> Arc<Self> {
        Arc::new(Self {
            objects: Vec::new(),
            fail_get_with: None,
            fail_list_with: Some(message.to_string()),
            keys_seen: Mutex::new(Vec::new()),
        })
    }

    fn keys(&self) -> Vec<String> {
        self.keys_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        self.keys_seen.lock().unwrap().push(key.to_string());
        if let Some(ref message) = self.fail_get_with {
            return Err(StoreError::Other(anyhow::anyhow!("{}", message)));
        }
        self.objects
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StoreError> {
        if let Some(ref message) = self.fail_list_with {
            return Err(StoreError::Other(anyhow::anyhow!("{}", message)));
        }
        Ok(self
            .objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, content)| ObjectSummary {
                key: k.clone(),
                size: content.len() as i64,
            })
            .collect())
    }
}

fn chunk(text: &str, uri: &str, score: f64) -> RetrievedChunk {
    RetrievedChunk {
        text: text.to_string(),
        source_uri: uri.to_string(),
        score,
        metadata: None,
    }
}

fn service(retriever: Arc<FakeRetriever>, store: Arc<FakeStore>) -> DocsService {
    DocsService::new(retriever, store, "docs/")
}

// ─── Search ─────────────────────────────────────────────────────────

#[tokio::test]
async fn search_clamps_max_results_to_ten() {
    let retriever = FakeRetriever::returning(vec![]);
    let svc = service(retriever.clone(), FakeStore::with_objects(&[]));

    svc.dispatch("search_smithy_docs", json!({ "query": "q", "max_results": 50 }))
        .await;
    svc.dispatch("search_smithy_docs", json!({ "query": "q", "max_results": 10 }))
        .await;
    svc.dispatch("search_smithy_docs", json!({ "query": "q" }))
        .await;
    svc.dispatch("search_smithy_docs", json!({ "query": "q", "max_results": 2 }))
        .await;

    assert_eq!(retriever.limits(), vec![10, 10, 5, 2]);
}

#[tokio::test]
async fn search_formats_ranked_report() {
    // End-to-end scenario A.
    let retriever = FakeRetriever::returning(vec![
        chunk(
            "A service is the entry point of the API.",
            "s3://smithy-docs/docs/quickstart.md",
            0.91,
        ),
        chunk(
            "Operations are bound to services.",
            "s3://smithy-docs/docs/spec/service-types.md",
            0.77,
        ),
    ]);
    let svc = service(retriever, FakeStore::with_objects(&[]));

    let response = svc
        .dispatch(
            "search_smithy_docs",
            json!({ "query": "How do I define a service?", "max_results": 2 }),
        )
        .await;

    assert!(!response.failed());
    let text = response.first_text();
    assert!(text.contains("How do I define a service?"));
    assert!(text.contains("Found 2 relevant section(s)"));
    let first = text.find("## Result 1 (score: 0.910)").unwrap();
    let second = text.find("## Result 2 (score: 0.770)").unwrap();
    assert!(first < second);
    assert!(text.contains("Source: quickstart.md"));
    assert!(text.contains("Source: service-types.md"));
}

#[tokio::test]
async fn search_with_zero_results_is_success_not_error() {
    let svc = service(FakeRetriever::returning(vec![]), FakeStore::with_objects(&[]));

    let response = svc
        .dispatch("search_smithy_docs", json!({ "query": "no matches here" }))
        .await;

    assert!(response.is_error.is_none());
    assert!(response.first_text().contains("No relevant documentation found"));
    assert!(response.first_text().contains("no matches here"));
}

#[tokio::test]
async fn search_failure_is_wrapped_with_prefix() {
    let svc = service(
        FakeRetriever::failing("connection reset by peer"),
        FakeStore::with_objects(&[]),
    );

    let response = svc
        .dispatch("search_smithy_docs", json!({ "query": "anything" }))
        .await;

    assert!(response.failed());
    assert_eq!(
        response.first_text(),
        "Error searching documentation: connection reset by peer"
    );
}

#[tokio::test]
async fn search_failure_without_message_falls_back_to_unknown_error() {
    let svc = service(FakeRetriever::failing(""), FakeStore::with_objects(&[]));

    let response = svc
        .dispatch("search_smithy_docs", json!({ "query": "anything" }))
        .await;

    assert!(response.failed());
    assert_eq!(
        response.first_text(),
        "Error searching documentation: Unknown error"
    );
}

#[tokio::test]
async fn search_renders_unknown_source_label() {
    let svc = service(
        FakeRetriever::returning(vec![chunk("orphan chunk", "", 0.5)]),
        FakeStore::with_objects(&[]),
    );

    let response = svc
        .dispatch("search_smithy_docs", json!({ "query": "q" }))
        .await;

    assert!(response.first_text().contains("Source: unknown"));
}

// ─── Read ───────────────────────────────────────────────────────────

#[tokio::test]
async fn read_returns_heading_and_content() {
    // End-to-end scenario B.
    let store = FakeStore::with_objects(&[("docs/quickstart.md", "# Hello")]);
    let svc = service(FakeRetriever::returning(vec![]), store);

    let response = svc
        .dispatch("read_smithy_doc", json!({ "file_path": "quickstart.md" }))
        .await;

    assert!(!response.failed());
    assert_eq!(response.first_text(), "# quickstart.md\n\n# Hello");
}

#[tokio::test]
async fn read_normalizes_leading_separators() {
    // P2: "a/b.md" and "/a/b.md" resolve to the same storage key.
    let store = FakeStore::with_objects(&[("docs/a/b.md", "content")]);
    let svc = service(FakeRetriever::returning(vec![]), store.clone());

    let plain = svc
        .dispatch("read_smithy_doc", json!({ "file_path": "a/b.md" }))
        .await;
    let slashed = svc
        .dispatch("read_smithy_doc", json!({ "file_path": "/a/b.md" }))
        .await;

    assert!(!plain.failed());
    assert!(!slashed.failed());
    assert_eq!(store.keys(), vec!["docs/a/b.md", "docs/a/b.md"]);
}

#[tokio::test]
async fn read_missing_document_suggests_search() {
    // End-to-end scenario C.
    let svc = service(FakeRetriever::returning(vec![]), FakeStore::with_objects(&[]));

    let response = svc
        .dispatch("read_smithy_doc", json!({ "file_path": "missing.md" }))
        .await;

    assert!(response.failed());
    assert!(response.first_text().contains("missing.md"));
    assert!(response.first_text().contains("search_smithy_docs"));
}

#[tokio::test]
async fn read_empty_document_is_distinct_error() {
    let store = FakeStore::with_objects(&[("docs/blank.md", "   \n")]);
    let svc = service(FakeRetriever::returning(vec![]), store);

    let response = svc
        .dispatch("read_smithy_doc", json!({ "file_path": "blank.md" }))
        .await;

    assert!(response.failed());
    assert!(response.first_text().contains("found but empty"));
    assert!(response.first_text().contains("blank.md"));
}

#[tokio::test]
async fn read_generic_failure_is_wrapped() {
    // A store failure that is not NotFound takes the generic branch.
    let svc = service(
        FakeRetriever::returning(vec![]),
        FakeStore::failing_get("permission denied"),
    );

    let response = svc
        .dispatch("read_smithy_doc", json!({ "file_path": "guarded.md" }))
        .await;

    assert!(response.failed());
    assert_eq!(
        response.first_text(),
        "Error reading document: permission denied"
    );
}

#[tokio::test]
async fn read_without_file_path_is_invalid_arguments() {
    let svc = service(FakeRetriever::returning(vec![]), FakeStore::with_objects(&[]));

    let response = svc.dispatch("read_smithy_doc", json!({})).await;

    assert!(response.failed());
    assert!(response
        .first_text()
        .starts_with("Invalid arguments for read_smithy_doc:"));
}

// ─── List ───────────────────────────────────────────────────────────

#[tokio::test]
async fn list_groups_by_directory() {
    // P4: a.md under Root, b/c.md and b/d.md under b, 3 files total.
    let store = FakeStore::with_objects(&[
        ("docs/a.md", "a"),
        ("docs/b/c.md", "c"),
        ("docs/b/d.md", "d"),
    ]);
    let svc = service(FakeRetriever::returning(vec![]), store);

    let response = svc.dispatch("list_smithy_topics", json!({})).await;

    assert!(!response.failed());
    let text = response.first_text();
    assert!(text.contains("(3 files)"));
    assert!(text.contains("## Root\n- a.md\n"));
    assert!(text.contains("## b\n- b/c.md\n- b/d.md\n"));
}

#[tokio::test]
async fn list_is_deterministic() {
    // P7: identical calls against an unchanged store yield identical bytes.
    let store = FakeStore::with_objects(&[
        ("docs/guides/one.md", "1"),
        ("docs/guides/two.md", "2"),
        ("docs/index.md", "i"),
    ]);
    let svc = service(FakeRetriever::returning(vec![]), store);

    let first = svc.dispatch("list_smithy_topics", json!({})).await;
    let second = svc.dispatch("list_smithy_topics", json!({})).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn list_empty_corpus_is_success() {
    let svc = service(FakeRetriever::returning(vec![]), FakeStore::with_objects(&[]));

    let response = svc.dispatch("list_smithy_topics", json!({})).await;

    assert!(response.is_error.is_none());
    assert!(response.first_text().contains("No documentation files found"));
}

#[tokio::test]
async fn list_failure_is_wrapped() {
    let svc = service(
        FakeRetriever::returning(vec![]),
        FakeStore::failing_list("access denied"),
    );

    let response = svc.dispatch("list_smithy_topics", json!({})).await;

    assert!(response.failed());
    assert!(response
        .first_text()
        .starts_with("Error listing documentation:"));
    assert!(response.first_text().contains("access denied"));
}

// ─── Dispatcher ─────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_tool_names_the_tool() {
    // End-to-end scenario D.
    let svc = service(FakeRetriever::returning(vec![]), FakeStore::with_objects(&[]));

    let response = svc.dispatch("bogus_tool", json!({})).await;

    assert!(response.failed());
    assert_eq!(response.first_text(), "Unknown tool: bogus_tool");
}

#[tokio::test]
async fn dispatch_absorbs_malformed_arguments() {
    let svc = service(FakeRetriever::returning(vec![]), FakeStore::with_objects(&[]));

    // file_path with the wrong JSON type must not panic or propagate.
    let response = svc
        .dispatch("read_smithy_doc", json!({ "file_path": 42 }))
        .await;

    assert!(response.failed());
    assert!(response
        .first_text()
        .starts_with("Invalid arguments for read_smithy_doc:"));
}
