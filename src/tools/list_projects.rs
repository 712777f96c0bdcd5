//! List projects tool
//!
//! Returns the whole project catalog in declared order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::traits::{QueuePair, QueueTool};
use crate::catalog::Catalog;
use crate::envelope::{self, NoArgs, RequestEnvelope, ResponseEnvelope};
use crate::error::Result;

/// Result value of the list operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectList {
    /// Every known project, in catalog order
    #[serde(rename = "Projects")]
    pub projects: Vec<String>,
}

/// Built-in tool: ListProjects
pub struct ListProjectsTool {
    catalog: Arc<Catalog>,
    queues: QueuePair,
}

impl ListProjectsTool {
    pub fn new(catalog: Arc<Catalog>, queues: QueuePair) -> Self {
        ListProjectsTool { catalog, queues }
    }

    /// Answer a decoded request
    pub fn respond(&self, request: &RequestEnvelope<NoArgs>) -> ResponseEnvelope<ProjectList> {
        ResponseEnvelope::reply(
            request,
            ProjectList {
                projects: self.catalog.projects().to_vec(),
            },
        )
    }
}

impl QueueTool for ListProjectsTool {
    fn name(&self) -> &str {
        "ListProjects"
    }

    fn description(&self) -> &str {
        "Retrieves the current list of projects."
    }

    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    fn queues(&self) -> &QueuePair {
        &self.queues
    }

    fn handle(&self, body: &[u8]) -> Result<Vec<u8>> {
        let request: RequestEnvelope<NoArgs> = envelope::decode(body)?;
        info!(
            correlation_id = %request.correlation_id,
            queue = %self.queues.input,
            "ListProjects request decoded"
        );

        let response = self.respond(&request);
        debug!(projects = response.value.projects.len(), "Sending project list");
        envelope::encode(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn tool() -> ListProjectsTool {
        ListProjectsTool::new(
            Arc::new(Catalog::default()),
            QueuePair::new("list-projects-request", "list-projects-response"),
        )
    }

    #[test]
    fn test_lists_full_catalog() {
        let out = tool().handle(br#"{"CorrelationId":"c1"}"#).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"Value":{"Projects":["Widget Wonderland","Gizmo Galaxy","Wacky Widget Workshop","Widget Factory Fiesta","Widget Whirlwind"]},"CorrelationId":"c1"}"#
        );
    }

    #[test]
    fn test_ignores_extra_arguments() {
        let out = tool()
            .handle(br#"{"CorrelationId":"abc-123","Project":"Gizmo Galaxy"}"#)
            .unwrap();
        let response: ResponseEnvelope<ProjectList> = serde_json::from_slice(&out).unwrap();
        assert_eq!(response.correlation_id, "abc-123");
        assert_eq!(response.value.projects, Catalog::default().projects());
    }

    #[test]
    fn test_missing_correlation_id() {
        let err = tool().handle(b"{}").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_definition_has_no_parameters() {
        let def = tool().to_definition("https://acct.queue.core.windows.net");
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["type"], "azure_function");
        assert_eq!(json["azure_function"]["function"]["name"], "ListProjects");
        assert!(json["azure_function"]["function"].get("parameters").is_none());
        assert_eq!(
            json["azure_function"]["input_binding"]["storage_queue"]["queue_name"],
            "list-projects-request"
        );
    }
}
