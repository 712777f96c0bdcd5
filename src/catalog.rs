//! Project and status reference data served by the tools

use crate::config::CatalogConfig;
use crate::error::{Error, Result};

/// Status reported for a project name that is not in the catalog
pub const UNRECOGNIZED_PROJECT: &str = "Unrecognized Project";

/// Default project names, in declared order
pub const DEFAULT_PROJECTS: [&str; 5] = [
    "Widget Wonderland",
    "Gizmo Galaxy",
    "Wacky Widget Workshop",
    "Widget Factory Fiesta",
    "Widget Whirlwind",
];

/// Default status labels
pub const DEFAULT_STATUSES: [&str; 4] = ["Active", "Completed", "Cancelled", "On Hold"];

/// Immutable lookup tables for the project tools.
///
/// Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    projects: Vec<String>,
    statuses: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            projects: DEFAULT_PROJECTS.iter().map(|s| s.to_string()).collect(),
            statuses: DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Catalog {
    /// Create a catalog. The status list must not be empty.
    pub fn new(projects: Vec<String>, statuses: Vec<String>) -> Result<Self> {
        if statuses.is_empty() {
            return Err(Error::Config(
                "catalog.statuses must contain at least one status".to_string(),
            ));
        }
        Ok(Catalog { projects, statuses })
    }

    /// Build the catalog from configuration
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Self::new(config.projects.clone(), config.statuses.clone())
    }

    /// Known project names in declared order
    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    /// Possible status labels
    pub fn statuses(&self) -> &[String] {
        &self.statuses
    }

    /// Whether the project name is known (exact match)
    pub fn contains(&self, project: &str) -> bool {
        self.projects.iter().any(|p| p == project)
    }
}
