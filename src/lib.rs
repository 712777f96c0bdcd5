//! # project-agent
//!
//! Project tools served to an AI agent through storage queues, and an HTTP
//! endpoint that runs a prompt through a freshly created agent.
//!
//! ## Features
//!
//! - **Queue RPC:** `{CorrelationId, ...}` requests and `{Value, CorrelationId}` responses
//! - **Project Tools:** `ListProjects` and `GetProjectStatus`
//! - **Queue Workers:** batch polling with redelivery and poison queues
//! - **Agent Bridge:** bounded run polling with cancellation and cleanup

pub mod agent;
pub mod catalog;
pub mod config;
pub mod credential;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod queue;
pub mod server;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
