//! In-process queue transport
//!
//! Mirrors the delivery rules of a hosted queue: received messages are hidden
//! for the visibility timeout and come back with a higher dequeue count unless
//! deleted with the receipt of their latest delivery.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use super::{QueueTransport, ReceivedMessage};
use crate::error::{Error, Result};

#[derive(Debug)]
struct StoredMessage {
    id: String,
    body: Vec<u8>,
    inserted_at: DateTime<Utc>,
    dequeue_count: u32,
    pop_receipt: Option<String>,
    visible_at: Instant,
}

/// In-process queues, created on first use
#[derive(Debug, Default)]
pub struct MemoryQueue {
    queues: Mutex<HashMap<String, VecDeque<StoredMessage>>>,
}

impl MemoryQueue {
    /// Create an empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages in a queue, hidden ones included
    pub async fn len(&self, queue: &str) -> usize {
        self.queues.lock().await.get(queue).map_or(0, |q| q.len())
    }

    /// Whether a queue holds no messages
    pub async fn is_empty(&self, queue: &str) -> bool {
        self.len(queue).await == 0
    }
}

#[async_trait]
impl QueueTransport for MemoryQueue {
    async fn create_queue(&self, queue: &str) -> Result<()> {
        self.queues.lock().await.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn send(&self, queue: &str, body: &[u8]) -> Result<()> {
        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            body: body.to_vec(),
            inserted_at: Utc::now(),
            dequeue_count: 0,
            pop_receipt: None,
            visible_at: Instant::now(),
        };
        self.queues
            .lock()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(message);
        Ok(())
    }

    async fn receive(
        &self,
        queue: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>> {
        let mut queues = self.queues.lock().await;
        let Some(messages) = queues.get_mut(queue) else {
            return Ok(Vec::new());
        };

        let now = Instant::now();
        let mut received = Vec::new();
        for message in messages.iter_mut() {
            if received.len() >= max_messages {
                break;
            }
            if message.visible_at > now {
                continue;
            }

            let receipt = Uuid::new_v4().to_string();
            message.dequeue_count += 1;
            message.visible_at = now + visibility_timeout;
            message.pop_receipt = Some(receipt.clone());

            received.push(ReceivedMessage {
                id: message.id.clone(),
                pop_receipt: receipt,
                dequeue_count: message.dequeue_count,
                inserted_at: message.inserted_at,
                body: message.body.clone(),
            });
        }

        Ok(received)
    }

    async fn delete(&self, queue: &str, message: &ReceivedMessage) -> Result<()> {
        let mut queues = self.queues.lock().await;
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| Error::Queue(format!("queue {} does not exist", queue)))?;

        let position = messages
            .iter()
            .position(|m| m.id == message.id && m.pop_receipt.as_deref() == Some(message.pop_receipt.as_str()))
            .ok_or_else(|| {
                Error::Queue(format!(
                    "message {} not found in {} or pop receipt is stale",
                    message.id, queue
                ))
            })?;

        messages.remove(position);
        Ok(())
    }
}
