//! # Smithy Docs MCP server (`smithy-docs-mcp`)
//!
//! Serves a Smithy documentation corpus to MCP clients. Semantic search
//! goes through a Bedrock Knowledge Base; raw files and the topic listing
//! come from an S3 bucket.
//!
//! ## Usage
//!
//! ```bash
//! smithy-docs-mcp --config ./config/smithy-docs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `serve http` | Start the Streamable HTTP MCP server |
//! | `serve stdio` | Serve MCP over stdio (for spawned-process clients) |
//! | `tools` | Print the tool descriptors and their parameter schemas |
//!
//! AWS credentials are read from `AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`, and optionally `AWS_SESSION_TOKEN`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use smithy_docs_mcp::{config, server, tools};

/// Smithy Docs MCP — documentation search, retrieval, and listing for
/// MCP-compatible AI tools.
#[derive(Parser)]
#[command(
    name = "smithy-docs-mcp",
    about = "MCP server exposing Smithy documentation via semantic search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/smithy-docs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server.
    Serve {
        #[command(subcommand)]
        transport: ServeTransport,
    },

    /// Print the exposed tools and their JSON-Schema parameter descriptors.
    Tools,
}

/// Which transport to serve MCP over.
#[derive(Subcommand)]
enum ServeTransport {
    /// Streamable HTTP on the address configured in `[server].bind`.
    Http,
    /// stdio, for clients that spawn this binary as a child process.
    Stdio,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr: stdout is reserved for the stdio MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("smithy_docs_mcp=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { transport } => {
            let cfg = config::load_config(&cli.config)?;
            match transport {
                ServeTransport::Http => server::run_http(&cfg).await?,
                ServeTransport::Stdio => server::run_stdio(&cfg).await?,
            }
        }
        Commands::Tools => {
            for descriptor in tools::tool_descriptors() {
                println!("{} — {}", descriptor.name, descriptor.description);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&descriptor.input_schema())?
                );
                println!();
            }
        }
    }

    Ok(())
}
