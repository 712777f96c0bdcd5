//! Agent module - agent service client and the orchestration bridge
//!
//! - `AgentService`: operations of the agent orchestration service
//! - `AgentsClient`: REST implementation of `AgentService`
//! - `AgentBridge`: runs a prompt through a freshly created agent
//! - `ConnectionString`: project connection string parsing

mod bridge;
mod client;
mod connection;
mod service;
pub mod types;

pub use bridge::{AgentBridge, BridgeSettings};
pub use client::AgentsClient;
pub use connection::ConnectionString;
pub use service::AgentService;
pub use types::*;

#[cfg(test)]
pub(crate) use bridge::tests::FakeService;
