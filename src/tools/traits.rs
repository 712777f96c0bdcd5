//! Core queue tool trait

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::types::{AzureFunctionDefinition, FunctionDefinition, QueueBinding, ToolDefinition};
use crate::error::Result;

/// The request/response queue names a tool is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePair {
    /// Queue the agent runtime writes requests to
    pub input: String,
    /// Queue the tool writes responses to
    pub output: String,
}

impl QueuePair {
    /// Create a queue pair
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        QueuePair {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Dead-letter queue for requests that keep failing to decode
    pub fn poison(&self) -> String {
        format!("{}-poison", self.input)
    }
}

/// A tool the agent runtime calls through a pair of queues.
///
/// `handle` runs to completion without suspending, so implementations must
/// not block on I/O.
pub trait QueueTool: Send + Sync {
    /// Function name registered with the agent
    fn name(&self) -> &str;

    /// Natural-language description for the model
    fn description(&self) -> &str;

    /// JSON schema of the arguments, `None` when the tool takes none
    fn parameters_schema(&self) -> Option<Value>;

    /// Request/response queues
    fn queues(&self) -> &QueuePair;

    /// Decode a request body, compute the result and encode the response body
    fn handle(&self, body: &[u8]) -> Result<Vec<u8>>;

    /// Registration descriptor for the agent service
    fn to_definition(&self, queue_service_uri: &str) -> ToolDefinition {
        ToolDefinition {
            tool_type: "azure_function".to_string(),
            azure_function: AzureFunctionDefinition {
                function: FunctionDefinition {
                    name: self.name().to_string(),
                    description: self.description().to_string(),
                    parameters: self.parameters_schema(),
                },
                input_binding: QueueBinding::storage_queue(queue_service_uri, &self.queues().input),
                output_binding: QueueBinding::storage_queue(
                    queue_service_uri,
                    &self.queues().output,
                ),
            },
        }
    }
}
