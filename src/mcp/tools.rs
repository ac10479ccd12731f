//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::models::{SearchQuery, DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT};
use crate::sources::{Source, SourceError};

/// Name of the PubMed search tool
pub const SEARCH_PUBMED: &str = "search_pubmed";

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "search_pubmed")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: serde_json::Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, SourceError>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry exposing the search tool for the given source
    pub fn from_source(source: Arc<dyn Source>) -> Self {
        let mut registry = Self::default();

        registry.register(Tool {
            name: SEARCH_PUBMED.to_string(),
            description: format!(
                "Search {} and return the top n results with title, journal, publication date, authors and link",
                source.name()
            ),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "q": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "n": {
                        "type": "integer",
                        "description": "Number of results to return",
                        "default": DEFAULT_LIMIT,
                        "minimum": MIN_LIMIT,
                        "maximum": MAX_LIMIT
                    }
                },
                "required": ["q"]
            }),
            handler: Arc::new(SearchPubMedHandler { source }),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, SourceError> {
        let tool = self
            .get(name)
            .ok_or_else(|| SourceError::InvalidRequest(format!("Tool '{}' not found", name)))?;

        tool.handler.execute(args).await
    }
}

/// Handler for the `search_pubmed` tool
#[derive(Debug)]
pub struct SearchPubMedHandler {
    pub source: Arc<dyn Source>,
}

#[async_trait::async_trait]
impl ToolHandler for SearchPubMedHandler {
    async fn execute(&self, args: Value) -> Result<Value, SourceError> {
        let query = parse_search_args(&args)?;

        tracing::info!(
            source = self.source.id(),
            n = query.limit,
            "search_pubmed invoked"
        );

        let response = self.source.search(&query).await?;
        Ok(serde_json::to_value(response.records)?)
    }
}

/// Validate `{ q, n }` tool arguments into a clamped [`SearchQuery`]
pub fn parse_search_args(args: &Value) -> Result<SearchQuery, SourceError> {
    let text = args
        .get("q")
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::InvalidRequest("Missing 'q' parameter".to_string()))?;

    if text.trim().is_empty() {
        return Err(SourceError::InvalidRequest(
            "'q' must not be empty".to_string(),
        ));
    }

    let requested = coerce_limit(args.get("n"))?;
    Ok(SearchQuery::new(text).limit(requested))
}

/// Coerce the raw `n` argument to an integer before clamping
///
/// Absent or null means the default. Floats truncate toward zero and strings
/// must hold an integer.
pub fn coerce_limit(value: Option<&Value>) -> Result<i64, SourceError> {
    let invalid =
        |v: &Value| SourceError::InvalidRequest(format!("'n' must be an integer, got {}", v));

    match value {
        None | Some(Value::Null) => Ok(i64::from(DEFAULT_LIMIT)),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if n.as_u64().is_some() {
                Ok(i64::MAX)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() => Ok(f.trunc() as i64),
                    _ => Err(invalid(value.unwrap_or(&Value::Null))),
                }
            }
        }
        Some(v @ Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid(v)),
        Some(v) => Err(invalid(v)),
    }
}
