//! Queue worker - serves one tool from its input queue
//!
//! Each received request is handed to the tool; the response goes to the
//! output queue and the request is deleted afterwards. A request the tool
//! rejects is left on the queue, so it is redelivered after the visibility
//! timeout, until its dequeue count reaches the limit and it is moved to the
//! poison queue.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{QueueTransport, ReceivedMessage};
use crate::config::QueueConfig;
use crate::error::Result;
use crate::tools::{QueueTool, ToolRegistry};

/// Polling and redelivery settings of a worker
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Invisibility window of a received message
    pub visibility_timeout: Duration,
    /// Deliveries before a rejected message is poisoned
    pub max_dequeue_count: u32,
    /// Messages received per poll
    pub batch_size: usize,
    /// Idle delay after the first empty poll
    pub min_poll_interval: Duration,
    /// Idle delay ceiling
    pub max_poll_interval: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings::from(&QueueConfig::default())
    }
}

impl From<&QueueConfig> for WorkerSettings {
    fn from(config: &QueueConfig) -> Self {
        WorkerSettings {
            visibility_timeout: config.visibility_timeout,
            max_dequeue_count: config.max_dequeue_count,
            batch_size: config.batch_size,
            min_poll_interval: config.min_poll_interval,
            max_poll_interval: config.max_poll_interval,
        }
    }
}

/// What happened to one received message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Response enqueued and request deleted
    Responded,
    /// Left on the queue for redelivery
    Retained,
    /// Moved to the poison queue
    Poisoned,
}

/// Serves one tool
pub struct QueueWorker {
    transport: Arc<dyn QueueTransport>,
    tool: Arc<dyn QueueTool>,
    settings: WorkerSettings,
}

impl QueueWorker {
    /// Create a worker for `tool`
    pub fn new(
        transport: Arc<dyn QueueTransport>,
        tool: Arc<dyn QueueTool>,
        settings: WorkerSettings,
    ) -> Self {
        QueueWorker {
            transport,
            tool,
            settings,
        }
    }

    /// Receive one batch and process it concurrently
    pub async fn poll_once(&self) -> Result<Vec<MessageOutcome>> {
        let queue = &self.tool.queues().input;
        let messages = self
            .transport
            .receive(queue, self.settings.batch_size, self.settings.visibility_timeout)
            .await?;

        if !messages.is_empty() {
            debug!(tool = self.tool.name(), queue = %queue, count = messages.len(), "Received messages");
        }

        Ok(futures::future::join_all(messages.iter().map(|m| self.process(m))).await)
    }

    /// Handle one message
    pub async fn process(&self, message: &ReceivedMessage) -> MessageOutcome {
        let queues = self.tool.queues();
        info!(
            tool = self.tool.name(),
            queue = %queues.input,
            message_id = %message.id,
            dequeue_count = message.dequeue_count,
            age_ms = (Utc::now() - message.inserted_at).num_milliseconds(),
            "Tool triggered"
        );

        let response = match self.tool.handle(&message.body) {
            Ok(response) => response,
            Err(e) => return self.reject(message, &e.to_string()).await,
        };

        if let Err(e) = self.transport.send(&queues.output, &response).await {
            error!(tool = self.tool.name(), queue = %queues.output, "Failed to send response: {}", e);
            return MessageOutcome::Retained;
        }
        info!(tool = self.tool.name(), queue = %queues.output, "Response sent");

        // The response is out; a failed delete only means a duplicate response later
        if let Err(e) = self.transport.delete(&queues.input, message).await {
            warn!(message_id = %message.id, "Failed to delete handled request: {}", e);
        }

        MessageOutcome::Responded
    }

    async fn reject(&self, message: &ReceivedMessage, reason: &str) -> MessageOutcome {
        let queues = self.tool.queues();

        if message.dequeue_count < self.settings.max_dequeue_count {
            warn!(
                tool = self.tool.name(),
                message_id = %message.id,
                dequeue_count = message.dequeue_count,
                "Request rejected, left for redelivery: {}",
                reason
            );
            return MessageOutcome::Retained;
        }

        let poison = queues.poison();
        let moved = async {
            self.transport.create_queue(&poison).await?;
            self.transport.send(&poison, &message.body).await?;
            self.transport.delete(&queues.input, message).await
        }
        .await;

        match moved {
            Ok(()) => {
                error!(
                    tool = self.tool.name(),
                    message_id = %message.id,
                    queue = %poison,
                    "Request moved to poison queue after {} deliveries: {}",
                    message.dequeue_count,
                    reason
                );
                MessageOutcome::Poisoned
            }
            Err(e) => {
                error!(message_id = %message.id, "Failed to poison request: {}", e);
                MessageOutcome::Retained
            }
        }
    }

    fn idle_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.settings.min_poll_interval)
            .with_max_interval(self.settings.max_poll_interval)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Delay before the next poll. Empty polls and failures back off; any
    /// received message resets the backoff and polls again right away.
    fn next_delay(&self, idle: &mut ExponentialBackoff, polled: &Result<Vec<MessageOutcome>>) -> Duration {
        match polled {
            Ok(outcomes) if !outcomes.is_empty() => {
                idle.reset();
                Duration::ZERO
            }
            _ => idle.next_backoff().unwrap_or(self.settings.max_poll_interval),
        }
    }

    /// Poll until cancelled
    pub async fn run(self, cancel: CancellationToken) {
        let queues = self.tool.queues().clone();
        info!(tool = self.tool.name(), input = %queues.input, output = %queues.output, "Queue worker started");

        for queue in [&queues.input, &queues.output] {
            if let Err(e) = self.transport.create_queue(queue).await {
                warn!(queue = %queue, "Could not ensure queue exists: {}", e);
            }
        }

        let mut idle = self.idle_backoff();

        loop {
            let polled = self.poll_once().await;
            if let Err(ref e) = polled {
                error!(tool = self.tool.name(), queue = %queues.input, "Receive failed: {}", e);
            }
            let delay = self.next_delay(&mut idle, &polled);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(tool = self.tool.name(), "Queue worker stopped");
    }
}

/// Spawn one worker per registered tool
pub fn spawn_workers(
    registry: &ToolRegistry,
    transport: Arc<dyn QueueTransport>,
    settings: WorkerSettings,
    cancel: CancellationToken,
) -> JoinSet<()> {
    let mut workers = JoinSet::new();
    for tool in registry.tools() {
        let worker = QueueWorker::new(Arc::clone(&transport), Arc::clone(tool), settings.clone());
        workers.spawn(worker.run(cancel.clone()));
    }
    workers
}
