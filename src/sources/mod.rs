//! Literature sources behind the search tool.
//!
//! The [`Source`] trait is the seam between the MCP tool layer and the
//! bibliographic backends. [`PubMedSource`] talks to NCBI E-utilities;
//! [`MockSource`] returns canned responses for tests.

mod pubmed;

pub mod mock;

pub use mock::MockSource;
pub use pubmed::PubMedSource;

use crate::models::{SearchQuery, SearchResponse};
use async_trait::async_trait;

/// A searchable bibliographic database
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "pubmed")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Search for records matching the query, in ranking order
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Invalid request parameters (rejected before any network call)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP transport error, including timeouts
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream API answered with a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// The upstream API answered with a body that cannot be interpreted at all
    #[error("Parse error: {0}")]
    Parse(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// Whether the failure came from the upstream API rather than the caller
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SourceError::Network(_) | SourceError::Api(_) | SourceError::Parse(_)
        )
    }
}

/// The URL is dropped from the message; it carries the API key.
impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            SourceError::Network(format!("request timed out: {}", err))
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(SourceError::Network("timeout".into()).is_upstream());
        assert!(SourceError::Api("500".into()).is_upstream());
        assert!(SourceError::Parse("not json".into()).is_upstream());
        assert!(!SourceError::InvalidRequest("empty query".into()).is_upstream());
        assert!(!SourceError::Other("client".into()).is_upstream());
    }

    #[test]
    fn test_json_error_maps_to_parse() {
        let err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        assert!(matches!(SourceError::from(err), SourceError::Parse(_)));
    }
}
