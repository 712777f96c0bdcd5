//! Agent orchestration bridge
//!
//! Drives one agent lifecycle per prompt: create an agent with the queue
//! tools, post the prompt on a new thread, run it, wait for a terminal run
//! status and return the thread transcript. The agent is deleted afterwards
//! except when the run failed, in which case it is left for inspection.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::client::AgentsClient;
use super::service::AgentService;
use super::types::{CreateAgentRequest, MessageRole, RunStatus, ThreadMessage, ThreadRun, ToolDefinition};
use crate::config::Config;
use crate::credential;
use crate::error::{Error, Result};
use crate::tools::ToolRegistry;

/// Agent creation and run polling settings
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// Model deployment name
    pub model: String,
    pub agent_name: String,
    pub instructions: String,
    /// Delay between run status polls
    pub poll_interval: Duration,
    /// Longest wait for a terminal run status
    pub run_deadline: Duration,
}

impl BridgeSettings {
    pub fn from_config(config: &Config) -> Self {
        BridgeSettings {
            model: config.agents.model.clone(),
            agent_name: config.agents.agent_name.clone(),
            instructions: config.agents.instructions.clone(),
            poll_interval: config.bridge.poll_interval,
            run_deadline: config.bridge.run_deadline,
        }
    }
}

/// Runs prompts through a freshly created agent
pub struct AgentBridge {
    service: Arc<dyn AgentService>,
    tools: Vec<ToolDefinition>,
    settings: BridgeSettings,
}

impl AgentBridge {
    /// Create a bridge registering `tools` on every agent it creates
    pub fn new(service: Arc<dyn AgentService>, tools: Vec<ToolDefinition>, settings: BridgeSettings) -> Self {
        AgentBridge {
            service,
            tools,
            settings,
        }
    }

    /// Build the bridge described by the configuration.
    ///
    /// Returns `None` when the agent service or the queue service URI is not
    /// configured, since the agent runtime could not reach the tools.
    pub fn from_config(config: &Config, registry: &ToolRegistry) -> Result<Option<Self>> {
        let agents_configured =
            config.agents.endpoint.is_some() || config.agents.connection_string.is_some();
        let Some(ref queue_service_uri) = config.queues.service_uri else {
            return Ok(None);
        };
        if !agents_configured {
            return Ok(None);
        }

        let credential = credential::resolve(config.agents.access_token.as_ref(), &config.credential)?;
        let client = AgentsClient::new(&config.agents, credential)?;
        info!(endpoint = client.endpoint(), tools = registry.count(), "Agent bridge configured");

        Ok(Some(AgentBridge::new(
            Arc::new(client),
            registry.definitions(queue_service_uri),
            BridgeSettings::from_config(config),
        )))
    }

    /// Tools registered on created agents
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Run `prompt` to completion and return the thread transcript
    pub async fn run(&self, prompt: &str, cancel: &CancellationToken) -> Result<Vec<ThreadMessage>> {
        if prompt.trim().is_empty() {
            return Err(Error::InvalidInput("Prompt is required".to_string()));
        }

        let request = CreateAgentRequest {
            model: self.settings.model.clone(),
            name: self.settings.agent_name.clone(),
            instructions: self.settings.instructions.clone(),
            tools: self.tools.clone(),
        };
        let agent = self.service.create_agent(&request).await?;

        match self.converse(&agent.id, prompt, cancel).await {
            Ok(messages) => {
                self.delete_agent(&agent.id).await;
                Ok(messages)
            }
            Err(e @ Error::UpstreamRun { .. }) => {
                error!(agent_id = %agent.id, "{}", e);
                Err(e)
            }
            Err(e) => {
                warn!(agent_id = %agent.id, "Agent run abandoned: {}", e);
                self.delete_agent(&agent.id).await;
                Err(e)
            }
        }
    }

    async fn converse(
        &self,
        agent_id: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ThreadMessage>> {
        let thread = self.service.create_thread().await?;
        self.service
            .create_message(&thread.id, MessageRole::User, prompt)
            .await?;

        let run = self.service.create_run(&thread.id, agent_id).await?;
        let run = self.wait_for_run(run, cancel).await?;

        match run.status {
            RunStatus::Failed => {
                let message = run
                    .last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no error reported".to_string());
                return Err(Error::UpstreamRun {
                    run_id: run.id,
                    message,
                });
            }
            RunStatus::Completed => info!(run_id = %run.id, "Run completed"),
            status => warn!(run_id = %run.id, status = %status, "Run ended without completing"),
        }

        self.service.list_messages(&thread.id).await
    }

    /// Poll until the run is terminal, the deadline passes or `cancel` fires
    async fn wait_for_run(&self, mut run: ThreadRun, cancel: &CancellationToken) -> Result<ThreadRun> {
        let deadline = Instant::now() + self.settings.run_deadline;
        let mut cancel_requested = false;

        loop {
            if run.status.is_terminal() {
                return Ok(run);
            }

            if run.status == RunStatus::RequiresAction && !cancel_requested {
                // Tools are served through queues; nothing here can submit outputs
                warn!(run_id = %run.id, "Run requires local action, cancelling it");
                self.cancel_run(&run).await;
                cancel_requested = true;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.cancel_run(&run).await;
                    return Err(Error::Cancelled(format!("run {} interrupted", run.id)));
                }
                _ = tokio::time::sleep_until(deadline) => {
                    self.cancel_run(&run).await;
                    return Err(Error::Timeout(format!(
                        "run {} still {} after {:?}",
                        run.id, run.status, self.settings.run_deadline
                    )));
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }

            run = self.service.get_run(&run.thread_id, &run.id).await?;
            info!(run_id = %run.id, status = %run.status, "Run status");
        }
    }

    async fn cancel_run(&self, run: &ThreadRun) {
        if let Err(e) = self.service.cancel_run(&run.thread_id, &run.id).await {
            warn!(run_id = %run.id, "Failed to cancel run: {}", e);
        }
    }

    async fn delete_agent(&self, agent_id: &str) {
        if let Err(e) = self.service.delete_agent(agent_id).await {
            warn!(agent_id, "Failed to delete agent: {}", e);
        }
    }
}
