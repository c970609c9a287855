//! # Smithy Docs MCP
//!
//! An MCP server that exposes a Smithy documentation corpus to AI tools
//! through three operations: semantic search, document retrieval, and
//! topic listing.
//!
//! Search is delegated to an Amazon Bedrock Knowledge Base (chunking,
//! embedding, and ranking all happen service-side); raw documents live in
//! an S3 bucket under a fixed key prefix. The interesting part of this
//! crate is the dispatch layer in [`tools`], which validates tool-call
//! arguments, invokes exactly one collaborator per request, and converts
//! every outcome — results, empty results, missing documents, collaborator
//! failures — into a uniform text response envelope.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌─────────────────────┐
//! │ MCP client │──▶│  McpBridge   │──▶│    DocsService      │
//! │ (Cursor,   │   │  (rmcp)      │   │  search/read/list   │
//! │  Claude)   │   └──────────────┘   └──────┬───────┬──────┘
//! └────────────┘                             │       │
//!                                            ▼       ▼
//!                                   ┌──────────┐ ┌──────────┐
//!                                   │ Bedrock  │ │    S3    │
//!                                   │ KB       │ │  bucket  │
//!                                   └──────────┘ └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`sigv4`] | AWS Signature V4 signing helpers |
//! | [`retrieval`] | Retriever trait and Bedrock Knowledge Base client |
//! | [`store`] | Object store trait and S3 client |
//! | [`tools`] | Tool-call parsing, dispatch, and response formatting |
//! | [`mcp`] | rmcp JSON-RPC protocol bridge |
//! | [`server`] | HTTP and stdio serving entry points |

pub mod config;
pub mod mcp;
pub mod retrieval;
pub mod server;
pub mod sigv4;
pub mod store;
pub mod tools;
