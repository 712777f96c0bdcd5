//! Queue module - transport, tool workers and the caller side of queue RPC
//!
//! - `QueueTransport`: named queues with at-least-once delivery
//! - `MemoryQueue`: in-process transport
//! - `StorageQueueClient`: Storage Queue REST transport
//! - `QueueWorker`: serves one tool from its input queue
//! - `QueueRpcClient`: sends a request and awaits the correlated response

mod memory;
mod rpc;
mod storage;
mod worker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{CredentialConfig, QueueConfig};
use crate::credential;
use crate::error::Result;

pub use memory::MemoryQueue;
pub use rpc::{QueueRpcClient, RpcSettings};
pub use storage::StorageQueueClient;
pub use worker::{spawn_workers, MessageOutcome, QueueWorker, WorkerSettings};

/// A message handed out by `receive`, invisible to other consumers until its
/// visibility timeout passes or it is deleted
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Message identifier
    pub id: String,
    /// Receipt of this delivery, required to delete the message
    pub pop_receipt: String,
    /// Number of times the message has been delivered, this one included
    pub dequeue_count: u32,
    /// When the message was enqueued
    pub inserted_at: DateTime<Utc>,
    /// Message body (envelope bytes)
    pub body: Vec<u8>,
}

/// Named queues with at-least-once delivery
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Create the queue if it does not exist
    async fn create_queue(&self, queue: &str) -> Result<()>;

    /// Enqueue a message
    async fn send(&self, queue: &str, body: &[u8]) -> Result<()>;

    /// Receive up to `max_messages` visible messages, hiding them for `visibility_timeout`
    async fn receive(
        &self,
        queue: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>>;

    /// Delete a received message
    async fn delete(&self, queue: &str, message: &ReceivedMessage) -> Result<()>;
}

/// Build the transport described by the configuration
pub fn transport_from_config(
    config: &QueueConfig,
    principal: &CredentialConfig,
) -> Result<Arc<dyn QueueTransport>> {
    match config.service_uri {
        Some(ref uri) => {
            let credential = credential::resolve(config.access_token.as_ref(), principal)?;
            info!(service_uri = %uri, "Using Storage Queue transport");
            Ok(Arc::new(StorageQueueClient::new(config, credential)?))
        }
        None => {
            info!("Using in-process queue transport");
            Ok(Arc::new(MemoryQueue::new()))
        }
    }
}
