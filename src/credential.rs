//! Bearer token credentials for the agent and queue services

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::CredentialConfig;
use crate::error::{Error, Result};

/// Token scope of the agent orchestration service
pub const AGENTS_SCOPE: &str = "https://management.azure.com/.default";

/// Token scope of the queue service
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";

/// Tokens this close to expiry are fetched again
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Source of bearer tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Get a token valid for `scope`
    async fn get_token(&self, scope: &str) -> Result<SecretString>;
}

/// A pre-acquired token, used for every scope. It is never refreshed, so
/// long-running processes should prefer [`ClientSecretCredential`].
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: SecretString,
}

impl StaticTokenCredential {
    pub fn new(token: SecretString) -> Self {
        StaticTokenCredential { token }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scope: &str) -> Result<SecretString> {
        Ok(self.token.clone())
    }
}

struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Service principal credential (OAuth2 client credentials grant).
///
/// Tokens are cached per scope and fetched again shortly before they expire.
pub struct ClientSecretCredential {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: SecretString,
    ) -> Result<Self> {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority_host.trim_end_matches('/'),
            tenant_id
        );
        url::Url::parse(&token_url)?;

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(ClientSecretCredential {
            client,
            token_url,
            client_id: client_id.to_string(),
            client_secret,
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn fetch(&self, scope: &str) -> Result<CachedToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", scope),
        ];
        let response = self.client.post(&self.token_url).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Unauthorized(format!(
                "token request for {} failed ({}): {}",
                scope, status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        debug!(scope = scope, expires_in = token.expires_in, "Token acquired");
        Ok(CachedToken {
            token: SecretString::from(token.access_token),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scope: &str) -> Result<SecretString> {
        // Held across the fetch so concurrent callers share one request
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(scope) {
            if Instant::now() + REFRESH_MARGIN < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.fetch(scope).await?;
        let token = fresh.token.clone();
        cache.insert(scope.to_string(), fresh);
        Ok(token)
    }
}

/// Pick the credential for a service: its static token when set, otherwise
/// the service principal when fully configured, otherwise none.
pub fn resolve(
    static_token: Option<&SecretString>,
    principal: &CredentialConfig,
) -> Result<Option<Arc<dyn TokenCredential>>> {
    if let Some(token) = static_token {
        return Ok(Some(Arc::new(StaticTokenCredential::new(token.clone()))));
    }

    match (&principal.tenant_id, &principal.client_id, &principal.client_secret) {
        (Some(tenant), Some(client_id), Some(secret)) => Ok(Some(Arc::new(
            ClientSecretCredential::new(&principal.authority_host, tenant, client_id, secret.clone())?,
        ))),
        _ => Ok(None),
    }
}
