//! Root configuration types.

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_frontend_origin, default_generator_timeout_ms, default_persistence_backend,
    default_persistence_dir, default_port,
};
use super::logging::LoggingConfig;
use super::server::ServerConfig;

/// Root configuration struct for the coordinator.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            server: ServerConfig::default(),
            security: SecurityConfig::default(),
            generator: GeneratorConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Transport security knobs. TLS termination is expected to live in front
/// of the server; only the CORS allow list is ours.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Comma-separated CORS allow list; `*` is permissive.
    #[serde(default = "default_frontend_origin")]
    pub frontend_origin: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            frontend_origin: default_frontend_origin(),
        }
    }
}

/// External AI content generator. Without an endpoint the generate surface
/// is disabled and everything else keeps working.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_generator_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            request_timeout_ms: default_generator_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceBackend {
    /// One JSON document per game under `persistence.dir`.
    Filesystem,
    /// In-memory document store; contents die with the process.
    DocumentStore,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_backend")]
    pub backend: PersistenceBackend,
    /// Only meaningful for the filesystem backend.
    #[serde(default = "default_persistence_dir")]
    pub dir: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: default_persistence_backend(),
            dir: default_persistence_dir(),
        }
    }
}
