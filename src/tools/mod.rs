//! Tools module - project tools served over queues
//!
//! Each tool implements the `QueueTool` trait: it reads a request envelope
//! from its input queue and writes a response envelope to its output queue.
//! Tools are registered into a `ToolRegistry`, which the queue workers serve
//! and the agent bridge registers with the agent service.
//!
//! ## Built-in Tools
//!
//! - **ListProjects**: the full project catalog
//! - **GetProjectStatus**: status of one project

mod list_projects;
mod project_status;
mod registry;
mod traits;

use schemars::JsonSchema;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::catalog::Catalog;
use crate::config::QueueNames;

// Core trait and types
pub use traits::{QueuePair, QueueTool};

// Registry
pub use registry::ToolRegistry;

// Built-in tools
pub use list_projects::{ListProjectsTool, ProjectList};
pub use project_status::{ProjectStatus, ProjectStatusArgs, ProjectStatusTool};

/// Build the registry holding both project tools
pub fn default_registry(
    catalog: Arc<Catalog>,
    queues: &QueueNames,
    status_seed: Option<u64>,
) -> ToolRegistry {
    let status_queues = QueuePair::new(&queues.status_request, &queues.status_response);
    let status = match status_seed {
        Some(seed) => ProjectStatusTool::with_seed(Arc::clone(&catalog), status_queues, seed),
        None => ProjectStatusTool::new(Arc::clone(&catalog), status_queues),
    };

    let mut registry = ToolRegistry::new();
    registry.register(status);
    registry.register(ListProjectsTool::new(
        catalog,
        QueuePair::new(&queues.list_request, &queues.list_response),
    ));
    registry
}

/// JSON schema of a tool argument type, without meta-schema or title.
/// `None` when the schema cannot be rendered.
pub(crate) fn schema_for<T: JsonSchema>() -> Option<Value> {
    let generator = schemars::gen::SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<T>();

    let mut value = match serde_json::to_value(schema) {
        Ok(value) => value,
        Err(e) => {
            warn!(schema = %T::schema_name(), "Failed to render parameter schema: {}", e);
            return None;
        }
    };
    if let Some(obj) = value.as_object_mut() {
        obj.remove("title");
    }
    Some(value)
}
