//! Configuration management.
//!
//! Configuration is resolved once at startup and handed to the rest of the
//! crate as an immutable value. Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config <path>` or the first file found by [`find_config_file`])
//! 3. `PUBMED_MCP_*` environment variables, using `__` to separate sections
//!    (e.g. `PUBMED_MCP_SERVER__PORT=9000`, `PUBMED_MCP_NCBI__TIMEOUT_SECS=10`)
//! 4. The conventional deployment variables `NCBI_API_KEY`, `CONTACT_EMAIL` and `PORT`
//!
//! # Configuration File Format
//!
//! ```toml
//! [ncbi]
//! api_key = "your-ncbi-key"
//! contact_email = "ops@example.org"
//! timeout_secs = 20
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//! service_name = "pubmed-mcp-server"
//! mount_prefixes = ["/mcp", "/sse"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "pubmed-mcp.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// NCBI E-utilities settings
    #[serde(default)]
    pub ncbi: NcbiConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Client identifier sent with every outbound E-utilities call
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} (+{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            self.ncbi.contact_email
        )
    }
}

/// NCBI E-utilities configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NcbiConfig {
    /// NCBI API key (optional, raises the rate limit from 3 to 10 requests per second)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Operator contact address included in the User-Agent
    #[serde(default = "default_contact_email")]
    pub contact_email: String,

    /// Base URL of the E-utilities service, `esearch.fcgi` and `esummary.fcgi` live below it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-call timeout for outbound requests
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            contact_email: default_contact_email(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NcbiConfig {
    /// The API key, if one is configured and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Per-call timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_contact_email() -> String {
    "your_email@example.com".to_string()
}

fn default_base_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Name reported by `GET /`
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Path prefixes under which the MCP transport is reachable
    #[serde(default = "default_mount_prefixes")]
    pub mount_prefixes: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
            mount_prefixes: default_mount_prefixes(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_service_name() -> String {
    "pubmed-mcp-server".to_string()
}

fn default_mount_prefixes() -> Vec<String> {
    vec!["/mcp".to_string(), "/sse".to_string()]
}

/// Values taken from the conventional, unprefixed deployment variables
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub ncbi_api_key: Option<String>,
    pub contact_email: Option<String>,
    pub port: Option<u16>,
}

impl EnvOverrides {
    /// Read `NCBI_API_KEY`, `CONTACT_EMAIL` and `PORT` from the process environment
    pub fn from_env() -> Self {
        let port = std::env::var("PORT").ok().and_then(|raw| match raw.parse() {
            Ok(port) => Some(port),
            Err(_) => {
                tracing::warn!("Ignoring unparseable PORT value: {}", raw);
                None
            }
        });

        Self {
            ncbi_api_key: std::env::var("NCBI_API_KEY").ok(),
            contact_email: std::env::var("CONTACT_EMAIL").ok(),
            port,
        }
    }
}

/// Load configuration from an optional file, the environment and defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    load_config_with(path, &EnvOverrides::from_env())
}

/// Load configuration with explicitly supplied deployment overrides
pub fn load_config_with(
    path: Option<&Path>,
    overrides: &EnvOverrides,
) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("PUBMED_MCP")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.mount_prefixes")
                .try_parsing(true),
        )
        .set_override_option("ncbi.api_key", overrides.ncbi_api_key.clone())?
        .set_override_option("ncbi.contact_email", overrides.contact_email.clone())?
        .set_override_option("server.port", overrides.port.map(i64::from))?
        .build()?;

    settings.try_deserialize()
}

/// Look for a configuration file in the working directory, then the platform config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("pubmed-mcp").join("config.toml"))
        .filter(|path| path.is_file())
}
