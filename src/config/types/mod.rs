//! Configuration types module
//!
//! Re-exports all configuration types.

pub mod provider;
pub mod queue;

use serde::{Deserialize, Serialize};
use secrecy::SecretString;
use std::time::Duration;

use crate::catalog::{DEFAULT_PROJECTS, DEFAULT_STATUSES};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Agent orchestration service
    #[serde(default)]
    pub agents: provider::AgentServiceConfig,

    /// Queue transport and tool queue names
    #[serde(default)]
    pub queues: queue::QueueConfig,

    /// Service principal for tokens that refresh themselves
    #[serde(default)]
    pub credential: CredentialConfig,

    /// Agent run coordination
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// HTTP endpoint
    #[serde(default)]
    pub server: ServerConfig,

    /// Project and status reference data
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from the config file and environment variables
    ///
    /// Precedence: defaults < config file < `PROJECT_AGENT_*` variables <
    /// deployment variables (`AZURE_AI_PROJECT_CONNECTION_STRING`, ...).
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Agent run polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Delay between run status polls
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,
    /// Longest time to wait for a run to reach a terminal state
    #[serde(with = "humantime_serde", default = "default_run_deadline")]
    pub run_deadline: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            poll_interval: default_poll_interval(),
            run_deadline: default_run_deadline(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_run_deadline() -> Duration {
    Duration::from_secs(300)
}

/// Service principal (client secret) used when no static token is set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    #[serde(skip_serializing, default)]
    pub client_secret: Option<SecretString>,
    /// Identity provider, e.g. `https://login.microsoftonline.com`
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
}

impl CredentialConfig {
    /// Whether tenant, client id and secret are all set
    pub fn is_complete(&self) -> bool {
        self.tenant_id.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        CredentialConfig {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority_host: default_authority_host(),
        }
    }
}

fn default_authority_host() -> String {
    "https://login.microsoftonline.com".to_string()
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Function key required on the run endpoint (anonymous when unset)
    #[serde(skip_serializing, default)]
    pub function_key: Option<SecretString>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            bind: default_bind(),
            function_key: None,
        }
    }
}

fn default_port() -> u16 {
    7071
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

/// Reference data served by the project tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Known project names, in order
    #[serde(default = "default_projects")]
    pub projects: Vec<String>,
    /// Possible statuses
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,
    /// Fixed seed for status selection (OS entropy when unset)
    #[serde(default)]
    pub status_seed: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            projects: default_projects(),
            statuses: default_statuses(),
            status_seed: None,
        }
    }
}

fn default_projects() -> Vec<String> {
    DEFAULT_PROJECTS.iter().map(|s| s.to_string()).collect()
}

fn default_statuses() -> Vec<String> {
    DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info,project_agent=debug".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
