//! Queue configuration types

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How envelope bytes are wrapped in the queue message text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageEncoding {
    /// Base64 of the envelope bytes (the Functions host default)
    #[default]
    Base64,
    /// Envelope text as-is
    None,
}

/// Queue transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue service endpoint, e.g. `https://<account>.queue.core.windows.net`.
    /// In-process queues are used when unset.
    pub service_uri: Option<String>,
    /// Bearer token for the queue service
    #[serde(skip_serializing, default)]
    pub access_token: Option<SecretString>,
    /// Message text encoding
    #[serde(default)]
    pub message_encoding: MessageEncoding,
    /// Storage service REST version header
    #[serde(default = "default_service_version")]
    pub service_version: String,
    /// Tool queue names
    #[serde(default)]
    pub names: QueueNames,
    /// How long a received message stays invisible to other consumers
    #[serde(with = "humantime_serde", default = "default_visibility_timeout")]
    pub visibility_timeout: Duration,
    /// Deliveries of an undecodable message before it goes to the poison queue
    #[serde(default = "default_max_dequeue_count")]
    pub max_dequeue_count: u32,
    /// Messages received per poll (1-32)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Poll delay right after an empty poll
    #[serde(with = "humantime_serde", default = "default_min_poll_interval")]
    pub min_poll_interval: Duration,
    /// Upper bound of the idle poll delay
    #[serde(with = "humantime_serde", default = "default_max_poll_interval")]
    pub max_poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            service_uri: None,
            access_token: None,
            message_encoding: MessageEncoding::default(),
            service_version: default_service_version(),
            names: QueueNames::default(),
            visibility_timeout: default_visibility_timeout(),
            max_dequeue_count: default_max_dequeue_count(),
            batch_size: default_batch_size(),
            min_poll_interval: default_min_poll_interval(),
            max_poll_interval: default_max_poll_interval(),
        }
    }
}

fn default_service_version() -> String {
    "2021-12-02".to_string()
}

fn default_visibility_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_dequeue_count() -> u32 {
    5
}

fn default_batch_size() -> usize {
    16
}

fn default_min_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_max_poll_interval() -> Duration {
    Duration::from_secs(60)
}

/// Names of the four tool queues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueNames {
    /// ListProjects requests
    #[serde(default = "default_list_request")]
    pub list_request: String,
    /// ListProjects responses
    #[serde(default = "default_list_response")]
    pub list_response: String,
    /// GetProjectStatus requests
    #[serde(default = "default_status_request")]
    pub status_request: String,
    /// GetProjectStatus responses
    #[serde(default = "default_status_response")]
    pub status_response: String,
}

impl Default for QueueNames {
    fn default() -> Self {
        QueueNames {
            list_request: default_list_request(),
            list_response: default_list_response(),
            status_request: default_status_request(),
            status_response: default_status_response(),
        }
    }
}

fn default_list_request() -> String {
    "list-projects-request".to_string()
}

fn default_list_response() -> String {
    "list-projects-response".to_string()
}

fn default_status_request() -> String {
    "project-status-request".to_string()
}

fn default_status_response() -> String {
    "project-status-response".to_string()
}
