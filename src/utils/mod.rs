//! Utility modules supporting the PubMed client.
//!
//! - [`HttpClient`]: pooled `reqwest` client carrying the configured User-Agent and timeout

mod http;

pub use http::HttpClient;
