//! # PubMed MCP
//!
//! A Model Context Protocol (MCP) server exposing a single PubMed literature
//! search tool over streamable HTTP, mountable under configurable path prefixes.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (SearchQuery, SummaryRecord, ResultRecord)
//! - [`sources`]: The [`Source`] seam and the E-utilities search/summary orchestration
//! - [`mcp`]: MCP tool registry and pmcp server
//! - [`transport`]: Path dispatcher, embedded MCP sub-application and HTTP routes
//! - [`utils`]: HTTP client
//! - [`config`]: Configuration management

pub mod config;
pub mod mcp;
pub mod models;
pub mod sources;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use models::{ResultRecord, SearchQuery};
pub use sources::{PubMedSource, Source, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
