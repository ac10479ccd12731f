//! PubMed literature source implementation using E-utilities API.
//!
//! A search is two sequential calls: `esearch.fcgi` returns the ranked PMIDs,
//! then a single `esummary.fcgi` call fetches metadata for all of them. The
//! summaries are merged back onto the PMID list so ranking is preserved even
//! when a summary is missing.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::config::Config;
use crate::models::{ResultRecord, SearchQuery, SearchResponse, SummaryRecord};
use crate::sources::{Source, SourceError};
use crate::utils::HttpClient;

const ESEARCH_PATH: &str = "esearch.fcgi";
const ESUMMARY_PATH: &str = "esummary.fcgi";
const DATABASE: &str = "pubmed";
const RETMODE: &str = "json";

/// PubMed literature source
///
/// Uses NCBI E-utilities for searching and summarizing PubMed records.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    esearch_url: Url,
    esummary_url: Url,
    api_key: Option<String>,
}

impl PubMedSource {
    /// Create a PubMed source from the application configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = Arc::new(HttpClient::from_config(config)?);
        Self::with_client(
            client,
            &config.ncbi.base_url,
            config.ncbi.api_key().map(str::to_string),
        )
    }

    /// Create with a custom HTTP client and E-utilities base URL
    pub fn with_client(
        client: Arc<HttpClient>,
        base_url: &str,
        api_key: Option<String>,
    ) -> Result<Self, SourceError> {
        let base = parse_base_url(base_url)?;
        let join = |path: &str| {
            base.join(path).map_err(|e| {
                SourceError::Other(format!("Invalid E-utilities URL {}{}: {}", base, path, e))
            })
        };

        Ok(Self {
            esearch_url: join(ESEARCH_PATH)?,
            esummary_url: join(ESUMMARY_PATH)?,
            client,
            api_key,
        })
    }

    /// Query parameters for the esearch call
    fn search_params(&self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", DATABASE.to_string()),
            ("term", query.text.clone()),
            ("retmode", RETMODE.to_string()),
            ("retmax", query.limit.to_string()),
        ];
        self.push_api_key(&mut params);
        params
    }

    /// Query parameters for the esummary call, all ids in one comma-joined value
    fn summary_params(&self, ids: &[String]) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", DATABASE.to_string()),
            ("id", ids.join(",")),
            ("retmode", RETMODE.to_string()),
        ];
        self.push_api_key(&mut params);
        params
    }

    fn push_api_key(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
    }

    /// Full request URL for an endpoint and its parameters
    fn build_url(endpoint: &Url, params: &[(&'static str, String)]) -> String {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", endpoint, query)
    }

    /// Issue one GET and decode its JSON body, failing on transport or status errors
    async fn get_json(&self, url: &str, call: &str) -> Result<Value, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| match SourceError::from(e) {
                SourceError::Network(msg) => {
                    SourceError::Network(format!("PubMed {} failed: {}", call, msg))
                }
                other => other,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Api(format!(
                "PubMed {} returned status: {}",
                call, status
            )));
        }

        let body = response.text().await.map_err(|e| {
            SourceError::Network(format!(
                "Failed to read PubMed {} response: {}",
                call,
                e.without_url()
            ))
        })?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            SourceError::Parse(format!("PubMed {} response is not JSON: {}", call, e))
        })?;

        if !value.is_object() {
            return Err(SourceError::Parse(format!(
                "PubMed {} response is not a JSON object",
                call
            )));
        }

        Ok(value)
    }

    /// Extract the ranked PMID list from an esearch response
    ///
    /// A missing or malformed `esearchresult.idlist` yields no ids.
    fn parse_search_response(value: &Value) -> Vec<String> {
        let result = value.get("esearchresult");

        if let Some(error) = result.and_then(|r| r.get("ERROR")).and_then(Value::as_str) {
            tracing::warn!("PubMed esearch reported an error: {}", error);
        }

        result
            .and_then(|r| r.get("idlist"))
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| match id {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Merge esummary records onto the PMID list, preserving its order
    fn normalize(ids: Vec<String>, summary: &Value) -> Vec<ResultRecord> {
        let result = summary.get("result");

        ids.into_iter()
            .map(|id| {
                let record = result
                    .and_then(|r| r.get(id.as_str()))
                    .map(SummaryRecord::from_value)
                    .unwrap_or_default();
                ResultRecord::from_summary(id, record)
            })
            .collect()
    }
}

fn parse_base_url(raw: &str) -> Result<Url, SourceError> {
    let mut base = Url::parse(raw)
        .map_err(|e| SourceError::Other(format!("Invalid E-utilities base URL {}: {}", raw, e)))?;

    // Url::join replaces the last segment unless the path ends with '/'
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SourceError> {
        if query.is_blank() {
            return Err(SourceError::InvalidRequest(
                "query text must not be empty".to_string(),
            ));
        }

        tracing::debug!(limit = query.limit, "Searching PubMed for {:?}", query.text);
        let search_url = Self::build_url(&self.esearch_url, &self.search_params(query));
        let search = self.get_json(&search_url, "esearch").await.map_err(|e| {
            tracing::warn!("PubMed search failed: {}", e);
            e
        })?;

        let ids = Self::parse_search_response(&search);
        if ids.is_empty() {
            tracing::debug!("PubMed returned no ids, skipping summary call");
            return Ok(SearchResponse::empty(&query.text));
        }

        tracing::debug!("Summarizing {} PubMed ids", ids.len());
        let summary_url = Self::build_url(&self.esummary_url, &self.summary_params(&ids));
        let summary = self.get_json(&summary_url, "esummary").await.map_err(|e| {
            tracing::warn!("PubMed summary failed: {}", e);
            e
        })?;

        let records = Self::normalize(ids, &summary);
        tracing::debug!("Normalized {} PubMed records", records.len());

        Ok(SearchResponse::new(records, &query.text))
    }
}
