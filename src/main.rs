use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pubmed_mcp::config::{find_config_file, load_config, Config};
use pubmed_mcp::mcp::McpServer;
use pubmed_mcp::models::{SearchQuery, DEFAULT_LIMIT};
use pubmed_mcp::sources::{PubMedSource, Source};
use pubmed_mcp::transport::{self, Dispatcher, EmbeddedMcp};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// PubMed MCP - Literature search for MCP clients over streamable HTTP
#[derive(Parser, Debug)]
#[command(name = "pubmed-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing PubMed search over streamable HTTP", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server (default)
    Serve {
        /// Host to bind to (overrides configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides configuration)
        #[arg(long, short)]
        port: Option<u16>,

        /// Path prefix to mount the MCP transport under (repeatable, overrides configuration)
        #[arg(long = "mount", value_name = "PREFIX")]
        mounts: Vec<String>,

        /// Run in stdio mode instead of HTTP (for desktop MCP clients)
        #[arg(long)]
        stdio: bool,
    },

    /// Run one PubMed search and print the results as JSON
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Number of results (clamped to 1-50)
        #[arg(long, short = 'n', default_value_t = i64::from(DEFAULT_LIMIT), allow_negative_numbers = true)]
        max_results: i64,
    },
}

fn init_tracing(cli: &Cli) {
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pubmed_mcp={}", env_filter)),
    );

    // Logs go to stderr so stdio mode and `search` output stay clean
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => find_config_file(),
    };

    if let Some(path) = &path {
        tracing::info!("Using config file: {}", path.display());
    }

    load_config(path.as_deref()).context("loading configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = resolve_config(&cli)?;
    if config.ncbi.api_key().is_none() {
        tracing::debug!("NCBI_API_KEY not set, using the unauthenticated rate limit");
    }

    let source: Arc<dyn Source> = Arc::new(PubMedSource::from_config(&config)?);

    match cli.command {
        Some(Commands::Search { query, max_results }) => {
            let query = SearchQuery::new(query).limit(max_results);
            let response = source.search(&query).await?;
            println!("{}", serde_json::to_string_pretty(&response.records)?);
        }

        Some(Commands::Serve {
            host,
            port,
            mounts,
            stdio,
        }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if !mounts.is_empty() {
                config.server.mount_prefixes = mounts;
            }

            let server = McpServer::new(source)?;
            if stdio {
                server.run().await?;
            } else {
                serve_http(&config, server).await?;
            }
        }

        None => {
            let server = McpServer::new(source)?;
            serve_http(&config, server).await?;
        }
    }

    Ok(())
}

async fn serve_http(config: &Config, server: McpServer) -> Result<()> {
    let app = Arc::new(EmbeddedMcp::new(server)?);
    let dispatcher = Dispatcher::new(
        config.server.mount_prefixes.iter().map(String::as_str),
        app,
    );

    transport::serve(&config.server, dispatcher).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["pubmed-mcp"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["pubmed-mcp", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from([
            "pubmed-mcp",
            "serve",
            "--port",
            "9000",
            "--mount",
            "/mcp",
            "--mount",
            "/tools",
        ]);
        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                mounts,
                stdio,
            }) => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
                assert_eq!(mounts, vec!["/mcp", "/tools"]);
                assert!(!stdio);
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_search_command() {
        let cli = Cli::parse_from(["pubmed-mcp", "search", "crispr", "-n", "3"]);
        match cli.command {
            Some(Commands::Search { query, max_results }) => {
                assert_eq!(query, "crispr");
                assert_eq!(max_results, 3);
            }
            _ => panic!("Expected Search command"),
        }

        let cli = Cli::parse_from(["pubmed-mcp", "s", "p53"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Search { max_results: 5, .. })
        ));
    }

    #[test]
    fn test_cli_json_logs() {
        let cli = Cli::parse_from(["pubmed-mcp", "--log-format", "json", "serve"]);
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
