//! MCP protocol bridge.
//!
//! Exposes the [`ToolRegistry`] as MCP tools. The same bridge is served
//! over stdio (`nko serve mcp`) and mounted as a Streamable HTTP endpoint
//! at `/mcp` by [`crate::server`].

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use tracing::{debug, info};

use crate::app::AppContext;
use crate::tools::{self, ToolContext, ToolRegistry};

/// Serves the tools over stdio until the client disconnects.
///
/// stdout carries the protocol; logs must stay on stderr.
pub async fn run_stdio(ctx: &AppContext) -> anyhow::Result<()> {
    let bridge = McpBridge::new(ctx.tools.clone(), ctx.tool_context());
    info!(tools = ctx.tools.len(), "MCP server on stdio");
    let reason = bridge.serve(rmcp::transport::stdio()).await?.waiting().await?;
    info!(?reason, "MCP session closed");
    Ok(())
}

/// Bridges the tool registry to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone; everything is behind `Arc`.
#[derive(Clone)]
pub struct McpBridge {
    tools: Arc<ToolRegistry>,
    ctx: ToolContext,
}

impl McpBridge {
    pub fn new(tools: Arc<ToolRegistry>, ctx: ToolContext) -> Self {
        Self { tools, ctx }
    }

    fn to_mcp_tool(tool: &dyn tools::Tool) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match tool.parameters_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nko-server".to_string(),
                title: Some("NKO directory".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Directory of Russian non-profit organizations (NKO). \
                 Use get_nko_list to search organizations by city, category or pattern, \
                 get_nko_by_id to fetch one organization, and get_cities to list cities."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!(tool = %request.name, "mcp tool call");
        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        match tools::call_tool(&self.tools, &self.ctx, &request.name, params).await {
            Some((text, false)) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Some((text, true)) => Ok(CallToolResult::error(vec![Content::text(text)])),
            None => Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", request.name),
                None,
            )),
        }
    }
}
