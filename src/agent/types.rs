//! Type definitions for the agent service API

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool registered with an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool type (always "azure_function" here)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function reached through a pair of storage queues
    pub azure_function: AzureFunctionDefinition,
}

/// Queue-bound function: the runtime writes calls to the input binding and
/// reads results from the output binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureFunctionDefinition {
    pub function: FunctionDefinition,
    pub input_binding: QueueBinding,
    pub output_binding: QueueBinding,
}

/// Function definition for tool calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters, omitted for functions without arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// A queue binding of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueBinding {
    /// Binding type (always "storage_queue")
    #[serde(rename = "type")]
    pub binding_type: String,
    pub storage_queue: StorageQueue,
}

impl QueueBinding {
    /// Bind to `queue_name` on the queue service at `queue_service_uri`
    pub fn storage_queue(queue_service_uri: &str, queue_name: &str) -> Self {
        QueueBinding {
            binding_type: "storage_queue".to_string(),
            storage_queue: StorageQueue {
                queue_service_uri: queue_service_uri.to_string(),
                queue_name: queue_name.to_string(),
            },
        }
    }
}

/// Location of a storage queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageQueue {
    pub queue_service_uri: String,
    pub queue_name: String,
}

/// Request body of agent creation
#[derive(Debug, Clone, Serialize)]
pub struct CreateAgentRequest {
    /// Model deployment name
    pub model: String,
    pub name: String,
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
}

/// An agent as returned by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// A conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentThread {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Role of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End-user message
    User,
    /// Agent response
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Request body of message creation
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest {
    pub role: MessageRole,
    pub content: String,
}

/// A message of a thread, as returned by the service.
///
/// Fields the bridge does not look at are kept in `extra` so the transcript
/// is passed through to the HTTP caller unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    /// Content parts (`{"type": "text", "text": {"value": ...}}`, ...)
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ThreadMessage {
    /// Concatenated text parts of the message
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| part.get("text")?.get("value")?.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Request body of run creation
#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    Incomplete,
    /// A status this client does not know, treated as still running
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether the run will not change status any more
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Error attached to a failed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(ref code) => write!(f, "{}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// An execution of an agent on a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRun {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// One page of a list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub first_id: Option<String>,
    #[serde(default)]
    pub last_id: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_parsing() {
        let run: ThreadRun = serde_json::from_str(
            r#"{"id":"run_1","thread_id":"t_1","status":"requires_action","object":"thread.run"}"#,
        )
        .unwrap();
        assert_eq!(run.status, RunStatus::RequiresAction);
        assert!(!run.status.is_terminal());

        let run: ThreadRun =
            serde_json::from_str(r#"{"id":"r","thread_id":"t","status":"something_new"}"#).unwrap();
        assert_eq!(run.status, RunStatus::Unknown);
        assert!(!run.status.is_terminal());
    }

    #[test]
    fn test_terminal_statuses() {
        for status in [
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::Cancelled,
            RunStatus::Expired,
            RunStatus::Incomplete,
        ] {
            assert!(status.is_terminal(), "{} should be terminal", status);
        }
        assert!(!RunStatus::Cancelling.is_terminal());
        assert!(!RunStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_thread_message_keeps_unknown_fields() {
        let json = serde_json::json!({
            "id": "msg_1",
            "object": "thread.message",
            "thread_id": "t_1",
            "role": "assistant",
            "content": [{"type": "text", "text": {"value": "Gizmo Galaxy is Active", "annotations": []}}]
        });
        let message: ThreadMessage = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.text(), "Gizmo Galaxy is Active");
        assert_eq!(serde_json::to_value(&message).unwrap(), json);
    }

    #[test]
    fn test_binding_serialization() {
        let binding = QueueBinding::storage_queue("https://acct.queue.core.windows.net", "q-in");
        assert_eq!(
            serde_json::to_value(&binding).unwrap(),
            serde_json::json!({
                "type": "storage_queue",
                "storage_queue": {
                    "queue_service_uri": "https://acct.queue.core.windows.net",
                    "queue_name": "q-in"
                }
            })
        );
    }

    #[test]
    fn test_run_error_display() {
        let err = RunError {
            code: Some("rate_limit_exceeded".to_string()),
            message: "Try again later".to_string(),
        };
        assert_eq!(err.to_string(), "rate_limit_exceeded: Try again later");
    }
}
