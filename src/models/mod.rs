//! Core data models for PubMed search operations.

mod record;
mod search;

pub use record::{article_link, ResultRecord, SummaryRecord, MAX_AUTHORS, PUBMED_ARTICLE_URL};
pub use search::{
    clamp_limit, SearchQuery, SearchResponse, DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT,
};
