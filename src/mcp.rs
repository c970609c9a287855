//! MCP JSON-RPC protocol bridge.
//!
//! Adapts [`DocsService`] to the MCP protocol via rmcp so Cursor, Claude,
//! and other MCP clients can call the documentation tools over the
//! standard JSON-RPC framing.
//!
//! The bridge is deliberately thin: `list_tools` serves the static
//! descriptors, and `call_tool` hands `(name, arguments)` to
//! [`DocsService::dispatch`] and passes the resulting envelope through
//! unchanged. Dispatch never fails, so `call_tool` never surfaces a
//! protocol-level error for tool problems — clients always get a
//! `CallToolResult` with text content and an `isError` flag.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::tools::{tool_descriptors, DocsService, ToolDescriptor, ToolResponse};

/// Bridges the dispatch service to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone of this struct (the service is behind
/// `Arc`), so all sessions share the same collaborators.
#[derive(Clone)]
pub struct McpBridge {
    service: Arc<DocsService>,
}

impl McpBridge {
    pub fn new(service: Arc<DocsService>) -> Self {
        Self { service }
    }

    /// Convert a tool descriptor into an rmcp `Tool`.
    fn to_mcp_tool(descriptor: &ToolDescriptor) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match descriptor.input_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        Tool {
            name: Cow::Borrowed(descriptor.name),
            title: None,
            description: Some(Cow::Borrowed(descriptor.description)),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    /// Convert the response envelope into an rmcp `CallToolResult`,
    /// preserving block order and the error flag.
    fn to_call_result(response: ToolResponse) -> CallToolResult {
        let content: Vec<Content> = response
            .content
            .into_iter()
            .map(|block| Content::text(block.text))
            .collect();

        if response.is_error == Some(true) {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "smithy-docs-mcp".to_string(),
                title: Some("Smithy Docs".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Smithy documentation server. Use search_smithy_docs to find relevant \
                 sections by natural-language query, read_smithy_doc to fetch a full \
                 file by its relative path, and list_smithy_topics to browse everything \
                 that is available."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = tool_descriptors().iter().map(Self::to_mcp_tool).collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        tool_descriptors()
            .iter()
            .find(|d| d.name == name)
            .map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let response = self.service.dispatch(&request.name, arguments).await;
        Ok(Self::to_call_result(response))
    }
}
