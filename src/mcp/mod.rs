//! MCP (Model Context Protocol) implementation.

pub mod server;
mod tools;

pub use server::McpServer;
pub use tools::{
    coerce_limit, parse_search_args, SearchPubMedHandler, Tool, ToolHandler, ToolRegistry,
    SEARCH_PUBMED,
};
