//! Configuration module
//!
//! - types/mod.rs: Core configuration types (Config, BridgeConfig, ServerConfig, ...)
//! - types/provider.rs: Agent service configuration
//! - types/queue.rs: Queue transport and queue names
//! - io.rs: Configuration loading
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

// Re-export core config types
pub use types::{BridgeConfig, CatalogConfig, Config, CredentialConfig, LogConfig, ServerConfig};

// Re-export service types
pub use types::provider::AgentServiceConfig;
pub use types::queue::{MessageEncoding, QueueConfig, QueueNames};

// Re-export IO and utilities
pub use io::{apply_env_overrides, load_config, load_config_from_path, ENV_PREFIX};
pub use paths::{config_dir, config_path};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
