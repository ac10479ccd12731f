//! Search request and response models.

use serde::{Deserialize, Serialize};

use super::ResultRecord;

/// Smallest page size ever requested from the search endpoint
pub const MIN_LIMIT: u32 = 1;

/// Largest page size ever requested from the search endpoint
pub const MAX_LIMIT: u32 = 50;

/// Page size used when the caller does not ask for one
pub const DEFAULT_LIMIT: u32 = 5;

/// Clamp any requested page size into `MIN_LIMIT..=MAX_LIMIT`
pub fn clamp_limit(requested: i64) -> u32 {
    requested.clamp(i64::from(MIN_LIMIT), i64::from(MAX_LIMIT)) as u32
}

/// Search query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query passed to the search endpoint
    pub text: String,

    /// Effective page size, always within `MIN_LIMIT..=MAX_LIMIT`
    pub limit: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchQuery {
    /// Create a new search query with the default page size
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set the page size, clamping it into range
    pub fn limit(mut self, requested: i64) -> Self {
        self.limit = clamp_limit(requested);
        self
    }

    /// Whether the query text has anything to search for
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Normalized result of one search invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Records in the ranking order returned by the search endpoint
    pub records: Vec<ResultRecord>,

    /// Query that produced these records
    pub query: String,
}

impl SearchResponse {
    /// Create a new search response
    pub fn new(records: Vec<ResultRecord>, query: impl Into<String>) -> Self {
        Self {
            records,
            query: query.into(),
        }
    }

    /// Empty response for a query with no matches
    pub fn empty(query: impl Into<String>) -> Self {
        Self::new(Vec::new(), query)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_in_range_is_kept() {
        for n in 1..=50 {
            assert_eq!(clamp_limit(n), n as u32);
        }
    }

    #[test]
    fn test_limit_out_of_range_is_clamped() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-7), 1);
        assert_eq!(clamp_limit(51), 50);
        assert_eq!(clamp_limit(i64::MAX), 50);
        assert_eq!(clamp_limit(i64::MIN), 1);
    }

    #[test]
    fn test_query_builder() {
        let query = SearchQuery::new("crispr").limit(3);
        assert_eq!(query.text, "crispr");
        assert_eq!(query.limit, 3);

        let query = SearchQuery::new("crispr");
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_blank_query() {
        assert!(SearchQuery::new("").is_blank());
        assert!(SearchQuery::new("  \t").is_blank());
        assert!(!SearchQuery::new("p53").is_blank());
    }
}
