//! Configuration I/O - Loading configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;

use super::types::Config;
use crate::error::Result;

/// Prefix of the structured environment overrides (`PROJECT_AGENT_SERVER__PORT=8080`)
pub const ENV_PREFIX: &str = "PROJECT_AGENT";

/// Load configuration with layered precedence:
/// 1. Defaults
/// 2. Config file, if it exists (TOML or JSON, by extension)
/// 3. `PROJECT_AGENT_*` environment variables
/// 4. Deployment environment variables (see [`apply_env_overrides`])
pub fn load_config() -> Result<Config> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let config_path = super::paths::config_path();
    let mut config = load_layers(Some(&config_path), Some(environment()))?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Load configuration from a specific path, without environment overrides
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    load_layers(Some(path), None)
}

/// The `PROJECT_AGENT_*` layer, read from the process environment
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn load_layers(path: Option<&Path>, env: Option<config::Environment>) -> Result<Config> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(false));
    }
    if let Some(env) = env {
        builder = builder.add_source(env);
    }

    Ok(builder.build()?.try_deserialize()?)
}

/// Apply the deployment's environment variables to an existing config.
///
/// These are the variable names the hosted deployment already sets, and they
/// take precedence over everything else. `lookup` resolves a variable name.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Agent service
    if let Some(conn) = lookup("AZURE_AI_PROJECT_CONNECTION_STRING") {
        config.agents.connection_string = Some(conn);
    }
    if let Some(endpoint) = lookup("AZURE_AI_AGENTS_ENDPOINT") {
        config.agents.endpoint = Some(endpoint);
    }
    if let Some(model) = lookup("AZURE_AI_MODEL_DEPLOYMENT_NAME") {
        config.agents.model = model;
    }
    if let Some(token) = lookup("AZURE_AI_ACCESS_TOKEN") {
        config.agents.access_token = Some(SecretString::from(token));
    }

    // Queue service
    if let Some(uri) = lookup("STORAGE_QUEUES_CONNECTION__queueServiceUri") {
        config.queues.service_uri = Some(uri);
    }
    if let Some(token) = lookup("AZURE_STORAGE_ACCESS_TOKEN") {
        config.queues.access_token = Some(SecretString::from(token));
    }

    // Service principal
    if let Some(tenant) = lookup("AZURE_TENANT_ID") {
        config.credential.tenant_id = Some(tenant);
    }
    if let Some(client_id) = lookup("AZURE_CLIENT_ID") {
        config.credential.client_id = Some(client_id);
    }
    if let Some(secret) = lookup("AZURE_CLIENT_SECRET") {
        config.credential.client_secret = Some(SecretString::from(secret));
    }
    if let Some(host) = lookup("AZURE_AUTHORITY_HOST") {
        config.credential.authority_host = host;
    }

    // HTTP endpoint
    if let Some(key) = lookup("FUNCTION_KEY") {
        config.server.function_key = Some(SecretString::from(key));
    }

    // Logging
    if let Some(level) = lookup("RUST_LOG") {
        config.log.level = level;
    }
    if let Some(format) = lookup("LOG_FORMAT") {
        config.log.format = format;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_load_toml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[agents]
model = "gpt-4o"

[queues]
service_uri = "https://acct.queue.core.windows.net"
visibility_timeout = "45s"
message_encoding = "none"

[queues.names]
list_request = "lp-in"

[catalog]
projects = ["Alpha", "Beta"]
"#,
        )
        .unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.agents.model, "gpt-4o");
        assert_eq!(
            config.queues.service_uri.as_deref(),
            Some("https://acct.queue.core.windows.net")
        );
        assert_eq!(config.queues.visibility_timeout, Duration::from_secs(45));
        assert_eq!(
            config.queues.message_encoding,
            crate::config::MessageEncoding::None
        );
        assert_eq!(config.queues.names.list_request, "lp-in");
        assert_eq!(config.queues.names.list_response, "list-projects-response");
        assert_eq!(config.catalog.projects, vec!["Alpha", "Beta"]);
        assert_eq!(config.catalog.statuses.len(), 4);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.agents.model, "gpt-4o-mini");
    }

    #[test]
    fn test_prefixed_environment_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9000

[queues]
visibility_timeout = "10s"
batch_size = 8
"#,
        )
        .unwrap();

        let vars: config::Map<String, String> = [
            ("PROJECT_AGENT_SERVER__PORT", "8080"),
            ("PROJECT_AGENT_QUEUES__VISIBILITY_TIMEOUT", "45s"),
            ("UNRELATED_SERVER__PORT", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = load_layers(Some(&path), Some(environment().source(Some(vars)))).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queues.visibility_timeout, Duration::from_secs(45));
        // Not overridden
        assert_eq!(config.queues.batch_size, 8);
    }

    #[test]
    fn test_deployment_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AZURE_AI_PROJECT_CONNECTION_STRING", "host.example;sub;rg;proj"),
            ("STORAGE_QUEUES_CONNECTION__queueServiceUri", "https://q.example"),
            ("AZURE_AI_MODEL_DEPLOYMENT_NAME", "gpt-4o"),
            ("FUNCTION_KEY", "secret-key"),
            ("AZURE_TENANT_ID", "tenant"),
            ("AZURE_CLIENT_ID", "client"),
            ("AZURE_CLIENT_SECRET", "shh"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(
            config.agents.connection_string.as_deref(),
            Some("host.example;sub;rg;proj")
        );
        assert_eq!(config.queues.service_uri.as_deref(), Some("https://q.example"));
        assert_eq!(config.agents.model, "gpt-4o");
        assert_eq!(
            config.server.function_key.as_ref().map(|k| k.expose_secret()),
            Some("secret-key")
        );
        assert!(config.credential.is_complete());
        // Untouched values keep their defaults
        assert_eq!(config.log.format, "pretty");
        assert_eq!(config.credential.authority_host, "https://login.microsoftonline.com");
    }
}
