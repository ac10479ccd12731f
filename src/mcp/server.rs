//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! This module provides the MCP server implementation using the pmcp crate
//! for proper JSON-RPC handling over stdio and streamable HTTP.

use crate::mcp::tools::ToolRegistry;
use crate::sources::{Source, SourceError};
use async_trait::async_trait;
use pmcp::{
    server::streamable_http_server::StreamableHttpServer, Error, RequestHandlerExtra, Server,
    ServerCapabilities, ToolHandler, ToolInfo,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// The MCP server exposing the PubMed search tool
#[derive(Debug, Clone)]
pub struct McpServer {
    server: Arc<Mutex<Server>>,
}

impl McpServer {
    /// Create a new MCP server backed by the given source
    pub fn new(source: Arc<dyn Source>) -> Result<Self, pmcp::Error> {
        let tools = ToolRegistry::from_source(source);
        let server = Self::build_server_impl(tools)?;
        Ok(Self {
            server: Arc::new(Mutex::new(server)),
        })
    }

    /// Build the MCP server with tool handlers (internal implementation)
    fn build_server_impl(tools: ToolRegistry) -> Result<Server, pmcp::Error> {
        let mut builder = Server::builder()
            .name(env!("CARGO_PKG_NAME"))
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for tool in tools.all() {
            let tool_handler = ToolWrapper {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema.clone(),
                handler: tool.handler.clone(),
            };
            builder = builder.tool(tool_handler.name.clone(), tool_handler);
        }

        builder.build()
    }

    /// Run the server in stdio mode (for desktop MCP clients)
    pub async fn run(self) -> Result<(), pmcp::Error> {
        tracing::info!("Starting MCP server in stdio mode");
        self.into_server()?.run_stdio().await
    }

    /// Take sole ownership of the pmcp server, which `run_stdio` consumes
    fn into_server(self) -> Result<Server, pmcp::Error> {
        Arc::try_unwrap(self.server)
            .map(Mutex::into_inner)
            .map_err(|_| Error::internal("MCP server is shared with a running transport"))
    }

    /// Start the streamable HTTP transport on `addr`
    ///
    /// Returns the bound address (useful when binding port 0) and the server task.
    pub async fn start_http(
        &self,
        addr: SocketAddr,
    ) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        tracing::debug!("Starting MCP streamable HTTP transport on {}", addr);

        let http_server = StreamableHttpServer::new(addr, self.server.clone());
        http_server.start().await
    }
}

/// Wrapper for adapting our Tool to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<dyn crate::mcp::tools::ToolHandler>,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        self.handler.execute(args).await.map_err(|e| {
            tracing::warn!("Tool {} failed: {}", self.name, e);
            to_protocol_error(&e)
        })
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}

/// Map a tool failure onto the protocol error surfaced to the client
fn to_protocol_error(err: &SourceError) -> Error {
    match err {
        SourceError::InvalidRequest(msg) => Error::invalid_params(msg.clone()),
        other => Error::internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSource;

    #[test]
    fn test_server_initialization() {
        let server = McpServer::new(Arc::new(MockSource::new()));
        assert!(server.is_ok());
    }

    #[test]
    fn test_stdio_mode_owns_server() {
        let server = McpServer::new(Arc::new(MockSource::new())).unwrap();
        assert!(server.into_server().is_ok());
    }

    #[test]
    fn test_stdio_mode_rejects_shared_server() {
        let server = McpServer::new(Arc::new(MockSource::new())).unwrap();
        let _http = server.clone();
        assert!(server.into_server().is_err());
    }

    #[test]
    fn test_protocol_error_messages() {
        let err = to_protocol_error(&SourceError::Api("status 500".to_string()));
        assert!(err.to_string().contains("status 500"));

        let err = to_protocol_error(&SourceError::InvalidRequest("'q' must not be empty".into()));
        assert!(err.to_string().contains("'q' must not be empty"));
    }
}
