//! Configuration for the registration API.

use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Appwrite database configuration
    #[serde(default)]
    pub appwrite: AppwriteConfig,

    /// Document store selection
    #[serde(default)]
    pub store: StoreConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Application metadata
    #[serde(default)]
    pub app: AppConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteConfig {
    /// Appwrite API endpoint
    #[serde(default = "default_appwrite_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub project_id: String,

    /// Server API key
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default)]
    pub database_id: String,

    /// Collection holding registration documents
    #[serde(default)]
    pub collection_id: String,

    /// Per-request timeout for store calls
    #[serde(default = "default_store_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Appwrite Databases over HTTP
    #[default]
    Appwrite,
    /// In-process memory (data is lost on restart)
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated list of allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,

    /// Deployment environment name
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Debug mode relaxes CORS to any origin
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests per minute per client on registration endpoints
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,

    /// Identify clients by `X-Forwarded-For` (only behind a trusted proxy)
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

// Default implementations
impl Default for AppwriteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_appwrite_endpoint(),
            project_id: String::new(),
            api_key: None,
            database_id: String::new(),
            collection_id: String::new(),
            timeout: default_store_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
            environment: default_environment(),
            debug: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_minute: default_per_minute(),
            trust_forwarded_for: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value functions
fn default_appwrite_endpoint() -> String {
    "https://cloud.appwrite.io/v1".into()
}

fn default_store_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> String {
    "https://rahulj-crypto.github.io".into()
}

fn default_app_name() -> String {
    "Tournament Registration API".into()
}

fn default_app_version() -> String {
    "1.0.0".into()
}

fn default_environment() -> String {
    "production".into()
}

fn default_true() -> bool {
    true
}

fn default_per_minute() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".into()
}

impl ServerConfig {
    /// Address to bind, from `listen_addr` and `port`.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .listen_addr
            .trim()
            .parse()
            .with_context(|| format!("Invalid SERVER__LISTEN_ADDR: {:?}", self.listen_addr))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Allowed CORS origins, split on commas.
    pub fn cors_origins_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Check the listen address and that the selected store backend has
    /// everything it needs.
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;

        if self.store.backend != StoreBackend::Appwrite {
            return Ok(());
        }

        let mut missing = Vec::new();
        if self.appwrite.project_id.is_empty() {
            missing.push("APPWRITE__PROJECT_ID");
        }
        if self.appwrite.api_key.is_none() {
            missing.push("APPWRITE__API_KEY");
        }
        if self.appwrite.database_id.is_empty() {
            missing.push("APPWRITE__DATABASE_ID");
        }
        if self.appwrite.collection_id.is_empty() {
            missing.push("APPWRITE__COLLECTION_ID");
        }

        if !missing.is_empty() {
            bail!("Missing Appwrite configuration: {}", missing.join(", "));
        }
        Ok(())
    }
}
