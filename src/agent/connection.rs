//! Project connection strings

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A parsed `<host>;<subscription>;<resource-group>;<project>` connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub host: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub project_name: String,
}

impl ConnectionString {
    /// Base URL of the agent service for this project
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}/agents/v1.0/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            self.host, self.subscription_id, self.resource_group, self.project_name
        )
    }
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(';').map(str::trim).collect();
        match parts.as_slice() {
            [host, subscription, group, project]
                if [host, subscription, group, project].iter().all(|p| !p.is_empty()) =>
            {
                let host = host
                    .trim_start_matches("https://")
                    .trim_end_matches('/')
                    .to_string();
                Ok(ConnectionString {
                    host,
                    subscription_id: subscription.to_string(),
                    resource_group: group.to_string(),
                    project_name: project.to_string(),
                })
            }
            _ => Err(Error::Config(format!(
                "connection string must be '<host>;<subscription>;<resource-group>;<project>', got {} part(s)",
                parts.len()
            ))),
        }
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{}",
            self.host, self.subscription_id, self.resource_group, self.project_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_endpoint() {
        let conn: ConnectionString = "eastus.api.azureml.ms;sub-1;rg-agents;proj-a".parse().unwrap();
        assert_eq!(conn.host, "eastus.api.azureml.ms");
        assert_eq!(
            conn.endpoint(),
            "https://eastus.api.azureml.ms/agents/v1.0/subscriptions/sub-1/resourceGroups/rg-agents/providers/Microsoft.MachineLearningServices/workspaces/proj-a"
        );
        assert_eq!(conn.to_string(), "eastus.api.azureml.ms;sub-1;rg-agents;proj-a");
    }

    #[test]
    fn test_scheme_is_stripped() {
        let conn: ConnectionString = "https://host.example/;s;g;p".parse().unwrap();
        assert_eq!(conn.host, "host.example");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("host;sub;rg".parse::<ConnectionString>().is_err());
        assert!("host;sub;;proj".parse::<ConnectionString>().is_err());
        assert!("".parse::<ConnectionString>().is_err());
    }
}
