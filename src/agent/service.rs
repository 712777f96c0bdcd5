//! Agent service operations used by the bridge

use async_trait::async_trait;

use super::types::{Agent, AgentThread, CreateAgentRequest, MessageRole, ThreadMessage, ThreadRun};
use crate::error::Result;

/// The agent orchestration service
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Create an agent with its tools
    async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent>;

    /// Create an empty thread
    async fn create_thread(&self) -> Result<AgentThread>;

    /// Append a message to a thread
    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage>;

    /// Start a run of `agent_id` on a thread
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<ThreadRun>;

    /// Fetch the current state of a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<ThreadRun>;

    /// Request cancellation of a run
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<ThreadRun>;

    /// All messages of a thread, every page
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;

    /// Delete an agent
    async fn delete_agent(&self, agent_id: &str) -> Result<()>;
}
