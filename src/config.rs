use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub retrieval: RetrievalConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Settings for the Bedrock Knowledge Base used for semantic search.
#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    pub knowledge_base_id: String,
    pub region: String,
}

/// Settings for the S3 bucket holding the raw documentation files.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Key prefix under which all documentation objects are stored.
    /// Normalized at load time to end with exactly one `/` (or be empty).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

fn default_prefix() -> String {
    "docs/".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7511".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.knowledge_base_id.trim().is_empty() {
        anyhow::bail!("retrieval.knowledge_base_id must not be empty");
    }
    if config.retrieval.region.trim().is_empty() {
        anyhow::bail!("retrieval.region must not be empty");
    }
    if config.storage.bucket.trim().is_empty() {
        anyhow::bail!("storage.bucket must not be empty");
    }
    if config.storage.region.trim().is_empty() {
        anyhow::bail!("storage.region must not be empty");
    }

    config.storage.prefix = normalize_prefix(&config.storage.prefix);

    Ok(config)
}

/// Normalize the corpus prefix: no leading slashes, exactly one trailing
/// slash when non-empty. An empty prefix means the whole bucket.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}
