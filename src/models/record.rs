//! PubMed summary and result records.
//!
//! E-utilities summaries are loosely shaped: any field may be missing, null or
//! of an unexpected type. [`SummaryRecord::from_value`] reads them
//! permissively, each accessor falling back to `None` (or an empty author
//! list) instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Base URL for PubMed article pages
pub const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov/";

/// Maximum number of authors kept on a [`ResultRecord`]
pub const MAX_AUTHORS: usize = 10;

/// Link to the PubMed page of an article
pub fn article_link(pmid: &str) -> String {
    format!("{}{}/", PUBMED_ARTICLE_URL, pmid)
}

/// Metadata returned by `esummary.fcgi` for one identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryRecord {
    pub title: Option<String>,
    pub journal: Option<String>,
    pub pubdate: Option<String>,

    /// Author names in byline order; entries without a name are dropped
    pub authors: Vec<String>,
}

impl SummaryRecord {
    /// Read a summary object, treating anything that is not an object as empty
    pub fn from_value(value: &Value) -> Self {
        let Some(item) = value.as_object() else {
            return Self::default();
        };

        let text = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);

        let authors = item
            .get("authors")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            title: text("title"),
            journal: text("fulljournalname"),
            pubdate: text("pubdate"),
            authors,
        }
    }
}

/// One normalized search hit, as returned to tool callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// PubMed identifier
    #[serde(rename = "pmid")]
    pub id: String,

    pub title: Option<String>,
    pub journal: Option<String>,
    pub pubdate: Option<String>,

    /// At most [`MAX_AUTHORS`] names
    pub authors: Vec<String>,

    /// Article page, always present
    pub link: String,
}

impl ResultRecord {
    /// Merge an identifier with its (possibly empty) summary
    pub fn from_summary(id: impl Into<String>, summary: SummaryRecord) -> Self {
        let id = id.into();
        let mut authors = summary.authors;
        authors.truncate(MAX_AUTHORS);

        Self {
            link: article_link(&id),
            id,
            title: summary.title,
            journal: summary.journal,
            pubdate: summary.pubdate,
            authors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_full_record() {
        let value = json!({
            "uid": "1",
            "title": "CRISPR screens in T cells",
            "fulljournalname": "Nature",
            "pubdate": "2024 Jan",
            "authors": [{"name": "Doe J", "authtype": "Author"}, {"name": "Roe R"}]
        });

        let summary = SummaryRecord::from_value(&value);
        assert_eq!(summary.title.as_deref(), Some("CRISPR screens in T cells"));
        assert_eq!(summary.journal.as_deref(), Some("Nature"));
        assert_eq!(summary.pubdate.as_deref(), Some("2024 Jan"));
        assert_eq!(summary.authors, vec!["Doe J", "Roe R"]);
    }

    #[test]
    fn test_summary_non_object_is_empty() {
        assert_eq!(SummaryRecord::from_value(&Value::Null), SummaryRecord::default());
        assert_eq!(SummaryRecord::from_value(&json!([1, 2])), SummaryRecord::default());
        assert_eq!(SummaryRecord::from_value(&json!("x")), SummaryRecord::default());
    }

    #[test]
    fn test_summary_wrong_types_are_absent() {
        let value = json!({
            "title": null,
            "fulljournalname": 42,
            "pubdate": ["2020"],
            "authors": "Doe J"
        });

        let summary = SummaryRecord::from_value(&value);
        assert_eq!(summary, SummaryRecord::default());
    }

    #[test]
    fn test_summary_drops_nameless_authors() {
        let value = json!({
            "authors": [{"name": "A"}, {"authtype": "CollectiveName"}, {"name": null}, "B", {"name": "C"}]
        });

        let summary = SummaryRecord::from_value(&value);
        assert_eq!(summary.authors, vec!["A", "C"]);
    }

    #[test]
    fn test_result_truncates_authors_in_order() {
        let summary = SummaryRecord {
            authors: (0..14).map(|i| format!("Author {}", i)).collect(),
            ..Default::default()
        };

        let record = ResultRecord::from_summary("99", summary);
        assert_eq!(record.authors.len(), MAX_AUTHORS);
        assert_eq!(record.authors.first().map(String::as_str), Some("Author 0"));
        assert_eq!(record.authors.last().map(String::as_str), Some("Author 9"));
    }

    #[test]
    fn test_result_link_without_summary() {
        let record = ResultRecord::from_summary("5", SummaryRecord::default());
        assert_eq!(record.link, "https://pubmed.ncbi.nlm.nih.gov/5/");
        assert!(record.title.is_none());
        assert!(record.authors.is_empty());
    }

    #[test]
    fn test_result_serializes_tool_fields() {
        let record = ResultRecord::from_summary("7", SummaryRecord::default());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["pmid"], "7");
        assert!(value["title"].is_null());
        assert!(value["journal"].is_null());
        assert!(value["pubdate"].is_null());
        assert_eq!(value["authors"], json!([]));
        assert_eq!(value["link"], "https://pubmed.ncbi.nlm.nih.gov/7/");
    }
}
