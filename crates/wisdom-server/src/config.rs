//! Server configuration

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use wisdom_core::{Error, Result};
use wisdom_search::TableMatchMode;

/// Origins of the local development frontends
pub const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:4173"];

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// Directory holding `metadata.json` and `records/`
    pub data_dir: PathBuf,

    /// Origins allowed by CORS; empty allows any origin
    pub frontend_origins: Vec<String>,

    /// Phase 2 page size when the request names none
    pub default_page_size: usize,

    /// Upper bound on requested page sizes
    pub max_page_size: usize,

    /// How Phase 1 decides a table matches
    pub table_match: TableMatchMode,

    /// Log level
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            data_dir: PathBuf::from("./data"),
            frontend_origins: DEV_ORIGINS.iter().map(|o| o.to_string()).collect(),
            default_page_size: 20,
            max_page_size: 500,
            table_match: TableMatchMode::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Create configuration for development
    pub fn for_development<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            host: "127.0.0.1".to_string(),
            frontend_origins: Vec::new(),
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Create configuration for production
    pub fn for_production<P: Into<PathBuf>>(data_dir: P, origins: Vec<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            frontend_origins: origins,
            max_page_size: 200,
            log_level: "info".to_string(),
            ..Default::default()
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// Recognized variables: `HOST`, `PORT`, `WISDOM_DATA_DIR`,
    /// `FRONTEND_ORIGINS` (comma-separated), `FRONTEND_ORIGIN`,
    /// `WISDOM_TABLE_MATCH` and `RUST_LOG`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Configuration(format!("PORT '{}' is not a port number", port)))?;
        }
        if let Some(dir) = lookup("WISDOM_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir.trim());
        }

        let origins = lookup("FRONTEND_ORIGINS")
            .or_else(|| lookup("FRONTEND_ORIGIN"))
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty());
        if let Some(origins) = origins {
            config.frontend_origins = origins;
        }

        if let Some(mode) = lookup("WISDOM_TABLE_MATCH") {
            config.table_match = match mode.trim().to_lowercase().as_str() {
                "metadata" => TableMatchMode::Metadata,
                "verified" => TableMatchMode::Verified,
                other => {
                    return Err(Error::Configuration(format!(
                        "WISDOM_TABLE_MATCH '{}' is not 'metadata' or 'verified'",
                        other
                    )));
                }
            };
        }
        if let Some(level) = lookup("RUST_LOG").filter(|l| !l.trim().is_empty()) {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Builder: set bind address
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Builder: set HTTP port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder: set allowed origins
    pub fn frontend_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frontend_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set default and maximum Phase 2 page sizes
    pub fn page_sizes(mut self, default: usize, max: usize) -> Self {
        self.default_page_size = default.max(1);
        self.max_page_size = max.max(self.default_page_size);
        self
    }

    /// Builder: set Phase 1 table matching
    pub fn table_match(mut self, mode: TableMatchMode) -> Self {
        self.table_match = mode;
        self
    }

    /// Builder: set log level
    pub fn log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }

    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the CORS layer for the configured origins
    pub fn cors_layer(&self) -> CorsLayer {
        if self.frontend_origins.is_empty() {
            return CorsLayer::permissive();
        }

        let origins: Vec<HeaderValue> = self
            .frontend_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("CORS: ignoring invalid origin '{}'", origin);
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
