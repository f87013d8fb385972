//! Server configuration
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `LEAFSCAN__`-prefixed environment variables (`__` separates nesting
//! levels, e.g. `LEAFSCAN__SERVER__PORT=8080`). CLI flags are applied last
//! by the binary.

use axum::http::HeaderValue;
use config::{Config, Environment, File, FileFormat};
use leafscan_classifiers::PipelineConfig;
use leafscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "LEAFSCAN";

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Models, catalog and gate policy
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load from an optional YAML file and the process environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: impl AsRef<Path>, env: Environment) -> Result<Self> {
        let path = path.as_ref();
        let env = env
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("server.cors_allowed_origins")
            .with_list_parse_key("pipeline.gate.keywords");

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(false))
            .add_source(env)
            .build()
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| Error::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document, without consulting the environment
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .map_err(|e| Error::config(format!("invalid configuration: {e}")))?;
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| Error::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.pipeline.validate()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Per-request inference budget in seconds
    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: u64,

    /// Origins allowed by CORS; any origin when empty
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            inference_timeout_secs: default_inference_timeout_secs(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.max_upload_bytes == 0 {
            return Err(Error::config("max_upload_bytes must be greater than 0"));
        }
        if self.inference_timeout_secs == 0 {
            return Err(Error::config("inference_timeout_secs must be greater than 0"));
        }
        for origin in &self.cors_allowed_origins {
            HeaderValue::from_str(origin)
                .map_err(|_| Error::config(format!("invalid CORS origin: {origin:?}")))?;
        }
        Ok(())
    }

    /// Address to bind
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.listen, self.port)
            .parse()
            .map_err(|e| Error::config(format!("invalid listen address {}:{}: {e}", self.listen, self.port)))
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_inference_timeout_secs() -> u64 {
    30
}
