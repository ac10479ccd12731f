//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::{ResultRecord, SearchQuery, SearchResponse, SummaryRecord};
use crate::sources::{Source, SourceError};

/// A mock source for testing that returns predefined responses.
#[derive(Debug, Default)]
pub struct MockSource {
    search_response: Mutex<Option<Result<Vec<ResultRecord>, String>>>,
    last_query: Mutex<Option<SearchQuery>>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the records to return.
    pub fn set_search_response(&self, records: Vec<ResultRecord>) {
        *self.search_response.lock().unwrap() = Some(Ok(records));
    }

    /// Make every search fail with an upstream API error.
    pub fn set_search_error(&self, message: impl Into<String>) {
        *self.search_response.lock().unwrap() = Some(Err(message.into()));
    }

    /// The query seen by the most recent search.
    pub fn last_query(&self) -> Option<SearchQuery> {
        self.last_query.lock().unwrap().clone()
    }

    /// Number of searches performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());

        if query.is_blank() {
            return Err(SourceError::InvalidRequest(
                "query text must not be empty".to_string(),
            ));
        }

        match &*self.search_response.lock().unwrap() {
            Some(Ok(records)) => Ok(SearchResponse::new(records.clone(), &query.text)),
            Some(Err(message)) => Err(SourceError::Api(message.clone())),
            None => Ok(SearchResponse::empty(&query.text)),
        }
    }
}

/// Helper function to create a record with a title for testing.
pub fn make_record(pmid: &str, title: &str) -> ResultRecord {
    ResultRecord::from_summary(
        pmid,
        SummaryRecord {
            title: Some(title.to_string()),
            ..Default::default()
        },
    )
}
