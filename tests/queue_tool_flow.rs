//! Integration tests for the queue tools
//!
//! These tests drive both project tools end to end:
//! - Requests sent through the RPC client to in-process queues
//! - Workers answering with correlated responses
//! - Malformed requests ending up in the poison queue

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use project_agent::catalog::{Catalog, DEFAULT_STATUSES, UNRECOGNIZED_PROJECT};
use project_agent::config::QueueNames;
use project_agent::queue::{spawn_workers, MemoryQueue, QueueRpcClient, QueueTransport, RpcSettings, WorkerSettings};
use project_agent::tools::{default_registry, QueueTool, ToolRegistry};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fast_settings() -> WorkerSettings {
    WorkerSettings {
        visibility_timeout: Duration::from_millis(200),
        max_dequeue_count: 2,
        min_poll_interval: Duration::from_millis(10),
        max_poll_interval: Duration::from_millis(50),
        ..WorkerSettings::default()
    }
}

/// Start workers for both tools over a shared in-process transport
fn start() -> (Arc<MemoryQueue>, ToolRegistry, CancellationToken) {
    let transport = Arc::new(MemoryQueue::new());
    let registry = default_registry(Arc::new(Catalog::default()), &QueueNames::default(), Some(42));
    let shutdown = CancellationToken::new();

    let mut workers = spawn_workers(&registry, transport.clone(), fast_settings(), shutdown.clone());
    // Workers stop with the token
    workers.detach_all();

    (transport, registry, shutdown)
}

fn tool(registry: &ToolRegistry, name: &str) -> Arc<dyn QueueTool> {
    registry.get(name).expect("tool is registered")
}

#[tokio::test]
async fn test_list_projects_round_trip() {
    let (transport, registry, shutdown) = start();
    let client = QueueRpcClient::new(transport.clone(), RpcSettings::default());
    let list = tool(&registry, "ListProjects");

    let value = client.call(list.queues(), json!({}), TIMEOUT).await.unwrap();
    assert_eq!(
        value,
        json!({"Projects": [
            "Widget Wonderland",
            "Gizmo Galaxy",
            "Wacky Widget Workshop",
            "Widget Factory Fiesta",
            "Widget Whirlwind"
        ]})
    );

    // The response is deleted before the call resolves
    assert!(transport.is_empty(&list.queues().output).await);
    shutdown.cancel();
}

#[tokio::test]
async fn test_project_status_for_known_and_unknown_projects() {
    let (transport, registry, shutdown) = start();
    let client = QueueRpcClient::new(transport.clone(), RpcSettings::default());
    let status = tool(&registry, "GetProjectStatus");

    for _ in 0..5 {
        let value = client
            .call(status.queues(), json!({"Project": "Gizmo Galaxy"}), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(value["Project"], "Gizmo Galaxy");
        assert!(DEFAULT_STATUSES.contains(&value["Status"].as_str().unwrap()));
    }

    let value = client
        .call(status.queues(), json!({"Project": "Nonexistent"}), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(value, json!({"Project": "Nonexistent", "Status": UNRECOGNIZED_PROJECT}));
    shutdown.cancel();
}

#[tokio::test]
async fn test_interleaved_calls_to_both_tools() {
    let (transport, registry, shutdown) = start();
    let client = Arc::new(QueueRpcClient::new(transport.clone(), RpcSettings::default()));
    let status = tool(&registry, "GetProjectStatus");
    let list = tool(&registry, "ListProjects");

    let mut calls = Vec::new();
    for project in ["Widget Wonderland", "Widget Whirlwind", "Unknown Thing"] {
        let client = client.clone();
        let queues = status.queues().clone();
        calls.push(tokio::spawn(async move {
            let value = client.call(&queues, json!({"Project": project}), TIMEOUT).await.unwrap();
            (project, value)
        }));
    }
    let projects = client.call(list.queues(), json!({}), TIMEOUT).await.unwrap();
    assert_eq!(projects["Projects"].as_array().unwrap().len(), 5);

    for call in calls {
        let (project, value) = call.await.unwrap();
        assert_eq!(value["Project"], project);
    }
    assert_eq!(client.pending_count().await, 0);
    shutdown.cancel();
}

#[tokio::test]
async fn test_malformed_request_is_poisoned() {
    let (transport, registry, shutdown) = start();
    let status = tool(&registry, "GetProjectStatus");
    let input = status.queues().input.clone();

    // No Project
    transport
        .send(&input, br#"{"CorrelationId":"bad"}"#)
        .await
        .unwrap();

    let poison = status.queues().poison();
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while transport.is_empty(&poison).await || !transport.is_empty(&input).await {
        assert!(tokio::time::Instant::now() < deadline, "request was never poisoned");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(transport.len(&poison).await, 1);
    assert!(transport.is_empty(&status.queues().output).await);
    shutdown.cancel();
}
