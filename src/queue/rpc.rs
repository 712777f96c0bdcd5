//! Queue RPC client - the calling side of a queue tool
//!
//! A call gets a fresh correlation id, is enqueued on the tool's input queue
//! and resolves when a response carrying the same id shows up on the output
//! queue. One background pump per output queue routes responses to the
//! waiting calls.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::QueueTransport;
use crate::envelope::{self, ResponseEnvelope};
use crate::error::{Error, Result};
use crate::tools::QueuePair;

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<Value>>>>;

/// Response pump settings
#[derive(Debug, Clone)]
pub struct RpcSettings {
    /// Delay between polls of an output queue
    pub poll_interval: Duration,
    /// Invisibility window of a received response; unclaimed ones reappear after it
    pub visibility_timeout: Duration,
}

impl Default for RpcSettings {
    fn default() -> Self {
        RpcSettings {
            poll_interval: Duration::from_millis(200),
            visibility_timeout: Duration::from_secs(2),
        }
    }
}

/// Sends tool requests and awaits their correlated responses
pub struct QueueRpcClient {
    transport: Arc<dyn QueueTransport>,
    settings: RpcSettings,
    pending: Pending,
    pumps: Mutex<HashSet<String>>,
    shutdown: CancellationToken,
}

impl QueueRpcClient {
    /// Create a client
    pub fn new(transport: Arc<dyn QueueTransport>, settings: RpcSettings) -> Self {
        QueueRpcClient {
            transport,
            settings,
            pending: Arc::new(Mutex::new(HashMap::new())),
            pumps: Mutex::new(HashSet::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Call the tool behind `queues` with `args` (a JSON object or null) and
    /// return the response's `Value`
    pub async fn call(&self, queues: &QueuePair, args: Value, timeout: Duration) -> Result<Value> {
        let correlation_id = Uuid::new_v4().to_string();

        let mut request = match args {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(Error::InvalidInput(format!(
                    "Tool arguments must be a JSON object, got {}",
                    other
                )))
            }
        };
        request.insert("CorrelationId".to_string(), Value::String(correlation_id.clone()));

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(correlation_id.clone(), tx);
        self.ensure_pump(&queues.output).await;

        let body = serde_json::to_vec(&request)?;
        if let Err(e) = self.transport.send(&queues.input, &body).await {
            self.pending.lock().await.remove(&correlation_id);
            return Err(e);
        }
        info!(correlation_id = %correlation_id, queue = %queues.input, "Request sent");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(Error::Cancelled(format!(
                "response pump for {} stopped",
                queues.output
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&correlation_id);
                Err(Error::Timeout(format!(
                    "no response to {} on {} within {:?}",
                    correlation_id, queues.output, timeout
                )))
            }
        }
    }

    /// Number of calls waiting for a response
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    async fn ensure_pump(&self, queue: &str) {
        let mut pumps = self.pumps.lock().await;
        if !pumps.insert(queue.to_string()) {
            return;
        }

        tokio::spawn(pump(
            Arc::clone(&self.transport),
            queue.to_string(),
            Arc::clone(&self.pending),
            self.settings.clone(),
            self.shutdown.clone(),
        ));
    }
}

impl Drop for QueueRpcClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn pump(
    transport: Arc<dyn QueueTransport>,
    queue: String,
    pending: Pending,
    settings: RpcSettings,
    shutdown: CancellationToken,
) {
    debug!(queue = %queue, "Response pump started");

    loop {
        match transport.receive(&queue, 32, settings.visibility_timeout).await {
            Ok(messages) => {
                for message in messages {
                    // Malformed responses stay on the queue for whoever can read them
                    let response: ResponseEnvelope<Value> = match envelope::decode(&message.body) {
                        Ok(response) => response,
                        Err(e) => {
                            warn!(queue = %queue, message_id = %message.id, "Malformed response: {}", e);
                            continue;
                        }
                    };
                    let correlation_id = response.correlation_id;

                    let waiter = pending.lock().await.remove(&correlation_id);
                    let Some(waiter) = waiter else {
                        // Someone else's response, or one whose call timed out
                        debug!(queue = %queue, correlation_id = %correlation_id, "Unclaimed response");
                        continue;
                    };

                    if let Err(e) = transport.delete(&queue, &message).await {
                        warn!(queue = %queue, message_id = %message.id, "Failed to delete response: {}", e);
                    }
                    // The caller may have given up in the meantime
                    let _ = waiter.send(response.value);
                }
            }
            Err(e) => warn!(queue = %queue, "Receive failed: {}", e),
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(settings.poll_interval) => {}
        }
    }

    debug!(queue = %queue, "Response pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, UNRECOGNIZED_PROJECT};
    use crate::queue::{MemoryQueue, QueueWorker, WorkerSettings};
    use crate::tools::{ListProjectsTool, ProjectStatusTool, QueueTool};

    fn status_tool() -> Arc<ProjectStatusTool> {
        Arc::new(ProjectStatusTool::with_seed(
            Arc::new(Catalog::default()),
            QueuePair::new("status-in", "status-out"),
            3,
        ))
    }

    fn serve(transport: Arc<MemoryQueue>, tool: Arc<dyn QueueTool>) -> CancellationToken {
        let cancel = CancellationToken::new();
        let settings = WorkerSettings {
            min_poll_interval: Duration::from_millis(10),
            max_poll_interval: Duration::from_millis(50),
            ..WorkerSettings::default()
        };
        tokio::spawn(QueueWorker::new(transport, tool, settings).run(cancel.clone()));
        cancel
    }

    #[tokio::test]
    async fn test_call_resolves_response() {
        let transport = Arc::new(MemoryQueue::new());
        let tool = Arc::new(ListProjectsTool::new(
            Arc::new(Catalog::default()),
            QueuePair::new("list-in", "list-out"),
        ));
        let queues = tool.queues().clone();
        let stop = serve(transport.clone(), tool);

        let client = QueueRpcClient::new(transport.clone(), RpcSettings::default());
        let value = client
            .call(&queues, Value::Null, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(value["Projects"].as_array().unwrap().len(), 5);
        assert_eq!(client.pending_count().await, 0);
        stop.cancel();
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_correlated() {
        let transport = Arc::new(MemoryQueue::new());
        let tool = status_tool();
        let queues = tool.queues().clone();
        let stop = serve(transport.clone(), tool);

        let client = QueueRpcClient::new(transport.clone(), RpcSettings::default());
        let timeout = Duration::from_secs(5);
        let (a, b, c) = tokio::join!(
            client.call(&queues, serde_json::json!({"Project": "Gizmo Galaxy"}), timeout),
            client.call(&queues, serde_json::json!({"Project": "Nonexistent"}), timeout),
            client.call(&queues, serde_json::json!({"Project": "Widget Whirlwind"}), timeout),
        );

        assert_eq!(a.unwrap()["Project"], "Gizmo Galaxy");
        let b = b.unwrap();
        assert_eq!(b["Project"], "Nonexistent");
        assert_eq!(b["Status"], UNRECOGNIZED_PROJECT);
        assert_eq!(c.unwrap()["Project"], "Widget Whirlwind");
        stop.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_times_out_without_worker() {
        let transport = Arc::new(MemoryQueue::new());
        let client = QueueRpcClient::new(transport.clone(), RpcSettings::default());

        let err = client
            .call(&QueuePair::new("in", "out"), Value::Null, Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(client.pending_count().await, 0);
        // The request is still waiting for a consumer
        assert_eq!(transport.len("in").await, 1);
    }

    #[tokio::test]
    async fn test_unclaimed_response_is_left() {
        let transport = Arc::new(MemoryQueue::new());
        transport
            .send("out", br#"{"Value":{},"CorrelationId":"someone-else"}"#)
            .await
            .unwrap();

        let client = QueueRpcClient::new(transport.clone(), RpcSettings::default());
        let err = client
            .call(&QueuePair::new("in", "out"), Value::Null, Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(transport.len("out").await, 1);
    }

    #[tokio::test]
    async fn test_malformed_response_is_left_and_call_keeps_waiting() {
        let transport = Arc::new(MemoryQueue::new());
        let client = QueueRpcClient::new(transport.clone(), RpcSettings::default());
        let queues = QueuePair::new("in", "out");

        // Answer with the right id but no Value
        let responder = {
            let transport = transport.clone();
            tokio::spawn(async move {
                loop {
                    let received = transport.receive("in", 1, Duration::from_secs(30)).await.unwrap();
                    if let Some(request) = received.first() {
                        let id = envelope::peek_correlation_id(&request.body).unwrap();
                        let body = serde_json::json!({ "CorrelationId": id, "Oops": 1 });
                        transport.send("out", body.to_string().as_bytes()).await.unwrap();
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
        };

        let err = client
            .call(&queues, Value::Null, Duration::from_millis(800))
            .await
            .unwrap_err();
        responder.await.unwrap();

        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(client.pending_count().await, 0);
        assert_eq!(transport.len("out").await, 1);
    }

    #[tokio::test]
    async fn test_rejects_non_object_args() {
        let client = QueueRpcClient::new(Arc::new(MemoryQueue::new()), RpcSettings::default());
        let err = client
            .call(&QueuePair::new("in", "out"), serde_json::json!([1]), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
