//! Agent service configuration types
//!
//! Where the agent orchestration service lives and how agents are created.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Agent orchestration service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentServiceConfig {
    /// Project connection string: `<host>;<subscription>;<resource-group>;<project>`
    pub connection_string: Option<String>,
    /// Explicit endpoint, overriding the one derived from the connection string
    pub endpoint: Option<String>,
    /// Bearer token for the service
    #[serde(skip_serializing, default)]
    pub access_token: Option<SecretString>,
    /// Model deployment name
    #[serde(default = "default_model")]
    pub model: String,
    /// REST API version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Name given to created agents
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    /// Agent instructions
    #[serde(default = "default_instructions")]
    pub instructions: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for AgentServiceConfig {
    fn default() -> Self {
        AgentServiceConfig {
            connection_string: None,
            endpoint: None,
            access_token: None,
            model: default_model(),
            api_version: default_api_version(),
            agent_name: default_agent_name(),
            instructions: default_instructions(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_version() -> String {
    "2024-12-01-preview".to_string()
}

fn default_agent_name() -> String {
    "function-created-agent-project-manager".to_string()
}

fn default_instructions() -> String {
    "You are a helpful agent who answers questions about projects for the Widgets and \
     Things Company. Answer the user's questions to the best of your ability. Do not make \
     up answers without having data to support your answer."
        .to_string()
}

fn default_timeout() -> u64 {
    120
}
