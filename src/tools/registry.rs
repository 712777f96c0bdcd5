//! Tool registry - the queue tools exposed to the agent

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::types::ToolDefinition;

use super::traits::QueueTool;

/// Registry of available tools, in registration order
pub struct ToolRegistry {
    tools: Vec<Arc<dyn QueueTool>>,
    by_name: HashMap<String, usize>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        ToolRegistry {
            tools: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name replaces the earlier one.
    pub fn register<T: QueueTool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        let tool: Arc<dyn QueueTool> = Arc::new(tool);
        match self.by_name.get(&name) {
            Some(&index) => self.tools[index] = tool,
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn QueueTool>> {
        self.by_name.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    /// All tools, in registration order
    pub fn tools(&self) -> impl Iterator<Item = &Arc<dyn QueueTool>> {
        self.tools.iter()
    }

    /// Registration descriptors for the agent service
    pub fn definitions(&self, queue_service_uri: &str) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| t.to_definition(queue_service_uri))
            .collect()
    }

    /// Get tool count
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// List tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}
