//! Agent service REST client

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::connection::ConnectionString;
use super::service::AgentService;
use super::types::*;
use crate::config::AgentServiceConfig;
use crate::credential::{TokenCredential, AGENTS_SCOPE};
use crate::error::{Error, Result};

/// Agent service REST client
#[derive(Clone)]
pub struct AgentsClient {
    /// HTTP client
    client: Client,
    /// Project endpoint, without trailing slash
    endpoint: String,
    api_version: String,
    credential: Option<Arc<dyn TokenCredential>>,
}

impl AgentsClient {
    /// Create a client from configuration.
    ///
    /// The endpoint is `agents.endpoint` when set, otherwise the one derived
    /// from `agents.connection_string`. Requests are anonymous without a
    /// credential.
    pub fn new(config: &AgentServiceConfig, credential: Option<Arc<dyn TokenCredential>>) -> Result<Self> {
        let endpoint = match (&config.endpoint, &config.connection_string) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(conn)) => conn.parse::<ConnectionString>()?.endpoint(),
            (None, None) => {
                return Err(Error::Config(
                    "agents.connection_string or agents.endpoint is required".to_string(),
                ))
            }
        };
        url::Url::parse(&endpoint)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(AgentsClient {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            credential,
        })
    }

    /// Project endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = format!("{}/{}", self.endpoint, path);
        let mut builder = self
            .client
            .request(method, url)
            .query(&[("api-version", self.api_version.as_str())]);

        if let Some(ref credential) = self.credential {
            let token = credential.get_token(AGENTS_SCOPE).await?;
            builder = builder.bearer_auth(token.expose_secret());
        }

        Ok(builder)
    }

    /// Send a request and decode a JSON response
    async fn send_request<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            debug!("Agent service {} succeeded ({})", what, status);
            return Ok(response.json::<T>().await?);
        }

        let error_text = response.text().await.unwrap_or_default();
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Rate limit exceeded on {}: {}", what, error_text);
                Err(Error::RateLimit(error_text))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized(format!(
                "{} rejected by agent service ({})",
                what, status
            ))),
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("{}: {}", what, error_text))),
            _ => Err(Error::AgentService(format!(
                "{} failed ({}): {}",
                what, status, error_text
            ))),
        }
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let builder = self.request(Method::POST, path).await?.json(body);
        self.send_request(builder, what).await
    }
}

#[async_trait]
impl AgentService for AgentsClient {
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent> {
        let builder = self
            .request(Method::POST, "assistants")
            .await?
            .header("x-ms-enable-preview", "true")
            .json(request);
        let agent: Agent = self.send_request(builder, "create agent").await?;
        info!(agent_id = %agent.id, model = %request.model, tools = request.tools.len(), "Agent created");
        Ok(agent)
    }

    async fn create_thread(&self) -> Result<AgentThread> {
        let thread: AgentThread = self
            .post_json("threads", &serde_json::json!({}), "create thread")
            .await?;
        info!(thread_id = %thread.id, "Thread created");
        Ok(thread)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        let request = CreateMessageRequest {
            role,
            content: content.to_string(),
        };
        self.post_json(&format!("threads/{}/messages", thread_id), &request, "create message")
            .await
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<ThreadRun> {
        let request = CreateRunRequest {
            assistant_id: agent_id.to_string(),
        };
        let run: ThreadRun = self
            .post_json(&format!("threads/{}/runs", thread_id), &request, "create run")
            .await?;
        info!(run_id = %run.id, thread_id, status = %run.status, "Run created");
        Ok(run)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<ThreadRun> {
        let builder = self
            .request(Method::GET, &format!("threads/{}/runs/{}", thread_id, run_id))
            .await?;
        self.send_request(builder, "get run").await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<ThreadRun> {
        self.post_json(
            &format!("threads/{}/runs/{}/cancel", thread_id, run_id),
            &serde_json::json!({}),
            "cancel run",
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let path = format!("threads/{}/messages", thread_id);
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut builder = self.request(Method::GET, &path).await?;
            if let Some(ref cursor) = after {
                builder = builder.query(&[("after", cursor.as_str())]);
            }

            let page: ListResponse<ThreadMessage> = self.send_request(builder, "list messages").await?;
            let last_id = page.last_id.clone().or_else(|| page.data.last().map(|m| m.id.clone()));
            let has_more = page.has_more;
            messages.extend(page.data);

            match last_id {
                Some(id) if has_more => after = Some(id),
                _ => break,
            }
        }

        debug!(thread_id, count = messages.len(), "Listed thread messages");
        Ok(messages)
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        let builder = self
            .request(Method::DELETE, &format!("assistants/{}", agent_id))
            .await?;
        let _: serde_json::Value = self.send_request(builder, "delete agent").await?;
        info!(agent_id, "Agent deleted");
        Ok(())
    }
}
