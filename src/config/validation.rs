//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;
use crate::agent::ConnectionString;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_agent_service(config, result);
    result = validate_queues(config, result);
    result = validate_catalog(config, result);
    result = validate_server(config, result);
    result = validate_credential(config, result);

    result
}

fn validate_agent_service(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let agents = &config.agents;

    if let Some(ref endpoint) = agents.endpoint {
        if url::Url::parse(endpoint).is_err() {
            result = result.with_error(ValidationIssue::new(
                "agents.endpoint",
                format!("Invalid URL: {}", endpoint),
            ));
        }
    } else if let Some(ref conn) = agents.connection_string {
        if let Err(e) = conn.parse::<ConnectionString>() {
            result = result.with_error(
                ValidationIssue::new("agents.connection_string", e.to_string())
                    .with_suggestion("Expected <host>;<subscription>;<resource-group>;<project>"),
            );
        }
    } else {
        result = result.with_warning(
            ValidationIssue::new(
                "agents",
                "No agent service configured. The run endpoint will not be available.",
            )
            .with_suggestion("Set AZURE_AI_PROJECT_CONNECTION_STRING"),
        );
    }

    result
}

fn validate_queues(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let queues = &config.queues;

    match queues.service_uri {
        Some(ref uri) if url::Url::parse(uri).is_err() => {
            result = result.with_error(ValidationIssue::new(
                "queues.service_uri",
                format!("Invalid URL: {}", uri),
            ));
        }
        Some(_) => {}
        None => {
            result = result.with_warning(
                ValidationIssue::new(
                    "queues.service_uri",
                    "No queue service configured. Tools are served from in-process queues only.",
                )
                .with_suggestion("Set STORAGE_QUEUES_CONNECTION__queueServiceUri"),
            );
        }
    }

    if queues.batch_size == 0 || queues.batch_size > 32 {
        result = result.with_error(ValidationIssue::new(
            "queues.batch_size",
            format!("Batch size must be between 1 and 32, got {}", queues.batch_size),
        ));
    }

    if queues.max_dequeue_count == 0 {
        result = result.with_error(ValidationIssue::new(
            "queues.max_dequeue_count",
            "Must be at least 1",
        ));
    }

    if queues.min_poll_interval > queues.max_poll_interval {
        result = result.with_error(ValidationIssue::new(
            "queues.min_poll_interval",
            "Must not exceed queues.max_poll_interval",
        ));
    }

    result
}

fn validate_catalog(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.catalog.statuses.is_empty() {
        result = result.with_error(ValidationIssue::new(
            "catalog.statuses",
            "At least one status is required",
        ));
    }
    if config.catalog.projects.is_empty() {
        result = result.with_warning(ValidationIssue::new(
            "catalog.projects",
            "No projects configured. Every status lookup will be unrecognized.",
        ));
    }

    result
}

fn validate_server(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.server.function_key.is_none() {
        result = result.with_warning(
            ValidationIssue::new(
                "server.function_key",
                "No function key configured. The run endpoint accepts anonymous requests.",
            )
            .with_suggestion("Set FUNCTION_KEY"),
        );
    }

    result
}

fn validate_credential(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let principal = &config.credential;
    let any_set =
        principal.tenant_id.is_some() || principal.client_id.is_some() || principal.client_secret.is_some();

    if any_set && !principal.is_complete() {
        result = result.with_warning(
            ValidationIssue::new(
                "credential",
                "Service principal is partially configured and will not be used.",
            )
            .with_suggestion("Set AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET"),
        );
    }
    if url::Url::parse(&principal.authority_host).is_err() {
        result = result.with_error(ValidationIssue::new(
            "credential.authority_host",
            format!("Invalid URL: {}", principal.authority_host),
        ));
    }

    result
}
