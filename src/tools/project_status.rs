//! Project status tool
//!
//! Looks up a project's status. Known projects get a status drawn at random
//! from the status catalog on every call; unknown ones get the
//! `Unrecognized Project` sentinel.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::schema_for;
use super::traits::{QueuePair, QueueTool};
use crate::catalog::{Catalog, UNRECOGNIZED_PROJECT};
use crate::envelope::{self, RequestEnvelope, ResponseEnvelope};
use crate::error::Result;

/// Arguments of the status operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectStatusArgs {
    /// Name of the project to look up
    #[serde(rename = "Project")]
    pub project: String,
}

/// Result value of the status operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatus {
    /// Project name, echoed from the request
    #[serde(rename = "Project")]
    pub project: String,
    /// Current status or the unrecognized sentinel
    #[serde(rename = "Status")]
    pub status: String,
}

/// Built-in tool: GetProjectStatus
pub struct ProjectStatusTool {
    catalog: Arc<Catalog>,
    queues: QueuePair,
    rng: Mutex<StdRng>,
}

impl ProjectStatusTool {
    /// Create the tool with an OS-seeded random source
    pub fn new(catalog: Arc<Catalog>, queues: QueuePair) -> Self {
        Self::with_rng(catalog, queues, StdRng::from_os_rng())
    }

    /// Create the tool with a fixed seed, for reproducible statuses
    pub fn with_seed(catalog: Arc<Catalog>, queues: QueuePair, seed: u64) -> Self {
        Self::with_rng(catalog, queues, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: Arc<Catalog>, queues: QueuePair, rng: StdRng) -> Self {
        ProjectStatusTool {
            catalog,
            queues,
            rng: Mutex::new(rng),
        }
    }

    /// Current status of a project
    pub fn status_of(&self, project: &str) -> String {
        if !self.catalog.contains(project) {
            return UNRECOGNIZED_PROJECT.to_string();
        }

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        match self.catalog.statuses().choose(&mut *rng) {
            Some(status) => status.clone(),
            // Catalog::new rejects an empty status list
            None => UNRECOGNIZED_PROJECT.to_string(),
        }
    }

    /// Answer a decoded request
    pub fn respond(
        &self,
        request: &RequestEnvelope<ProjectStatusArgs>,
    ) -> ResponseEnvelope<ProjectStatus> {
        let project = request.args.project.clone();
        let status = self.status_of(&project);
        ResponseEnvelope::reply(request, ProjectStatus { project, status })
    }
}

impl QueueTool for ProjectStatusTool {
    fn name(&self) -> &str {
        "GetProjectStatus"
    }

    fn description(&self) -> &str {
        "Retrieves the current status of the project."
    }

    fn parameters_schema(&self) -> Option<Value> {
        schema_for::<ProjectStatusArgs>()
    }

    fn queues(&self) -> &QueuePair {
        &self.queues
    }

    fn handle(&self, body: &[u8]) -> Result<Vec<u8>> {
        let request: RequestEnvelope<ProjectStatusArgs> = envelope::decode(body)?;
        info!(
            correlation_id = %request.correlation_id,
            project = %request.args.project,
            "Querying project status"
        );

        let response = self.respond(&request);
        debug!(status = %response.value.status, "Sending project status");
        envelope::encode(&response)
    }
}
