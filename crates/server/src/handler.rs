//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    club::{self, ClubParams, RawParams, TopicsParams, UpdateParams},
    conditions::{cond_impl, muf_impl},
    pota::{ActivationsParams, CallStatsParams, activations_impl, callstats_impl},
};

use hamclub_core::{AppConfig, GuildDb, WebCache};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for hamclub-bot.
///
/// Holds the shared web cache and guild store; every clone shares them.
#[derive(Clone)]
pub struct HamClubServer {
    tool_router: ToolRouter<Self>,
    cache: WebCache,
    db: GuildDb,
    config: Arc<AppConfig>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl HamClubServer {
    /// Create a new server handler.
    pub fn new(cache: WebCache, db: GuildDb, config: AppConfig) -> Self {
        Self { tool_router: Self::tool_router(), cache, db, config: Arc::new(config) }
    }

    #[tool(description = "Current solar conditions image from hamqsl.com. Returns a card plus the image.")]
    async fn cond(&self) -> Result<CallToolResult, McpError> {
        cond_impl(&self.cache).await
    }

    #[tool(description = "Current maximum usable frequency (MUF) map from prop.kc2g.com. Returns a card plus the SVG map.")]
    async fn muf(&self) -> Result<CallToolResult, McpError> {
        muf_impl(&self.cache).await
    }

    /// Parks on the Air activator and hunter statistics for a callsign.
    #[tool(description = "Parks on the Air activator and hunter statistics for a callsign.")]
    async fn pota_callstats(&self, params: Parameters<CallStatsParams>) -> Result<CallToolResult, McpError> {
        callstats_impl(&self.cache, params.0).await
    }

    /// Park details, totals and the five most recent activations.
    #[tool(description = "Parks on the Air statistics and recent activations for a park reference (e.g. US-8081).")]
    async fn pota_activations(&self, params: Parameters<ActivationsParams>) -> Result<CallToolResult, McpError> {
        activations_impl(&self.cache, params.0).await
    }

    #[tool(description = "Show the club information stored for a topic.")]
    async fn club(&self, params: Parameters<ClubParams>) -> Result<CallToolResult, McpError> {
        club::club_impl(&self.db, params.0).await
    }

    #[tool(description = "List club information topics starting with a prefix, for autocomplete.")]
    async fn club_topics(&self, params: Parameters<TopicsParams>) -> Result<CallToolResult, McpError> {
        club::topics_impl(&self.db, params.0).await
    }

    /// Admin upload of a topic's markdown or YAML file.
    #[tool(
        description = "Create or replace a club information topic from an uploaded text file (markdown, or YAML for a structured card). Returns a preview of the saved topic."
    )]
    async fn manage_club_update(&self, params: Parameters<UpdateParams>) -> Result<CallToolResult, McpError> {
        club::update_impl(&self.db, &self.config, params.0).await
    }

    #[tool(description = "Get the raw file content of a club information topic.")]
    async fn manage_club_get(&self, params: Parameters<RawParams>) -> Result<CallToolResult, McpError> {
        club::get_impl(&self.db, params.0).await
    }

    #[tool(description = "Delete a club information topic, returning its raw content for backup.")]
    async fn manage_club_delete(&self, params: Parameters<RawParams>) -> Result<CallToolResult, McpError> {
        club::delete_impl(&self.db, params.0).await
    }
}

impl ServerHandler for HamClubServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "hamclub-bot".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Amateur radio club helper: propagation images, Parks on the Air lookups and per-guild club information."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
