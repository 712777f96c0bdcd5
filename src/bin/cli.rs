//! project-agent CLI
//!
//! Hosts the queue tool workers and the agent run endpoint, and talks to the
//! tools from the command line.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use project_agent::agent::AgentBridge;
use project_agent::catalog::Catalog;
use project_agent::config::{validate_config, Config, QueueConfig};
use project_agent::queue::{self, spawn_workers, QueueRpcClient, QueueTransport, RpcSettings, WorkerSettings};
use project_agent::server::{self, AppState};
use project_agent::tools::{default_registry, ToolRegistry};
use project_agent::{logging, VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Queue service of the local storage emulator, used in printed descriptors
/// when no queue service is configured
const EMULATOR_QUEUE_URI: &str = "http://127.0.0.1:10001/devstoreaccount1";

#[derive(Parser)]
#[command(
    name = "project-agent",
    version = VERSION,
    about = "Project tools over storage queues, and an agent run endpoint",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the run endpoint and the tool workers
    Serve {
        /// Bind address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port (overrides server.port)
        #[arg(long, short, env = "FUNCTIONS_CUSTOMHANDLER_PORT")]
        port: Option<u16>,
    },

    /// Serve the tool workers only
    Worker,

    /// Print the tool registration descriptors
    Tools,

    /// Call a tool through its queues and print the response
    Call {
        /// Tool to call
        tool: ToolName,
        /// Project name, for project-status
        #[arg(long)]
        project: Option<String>,
        /// Seconds to wait for the response
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ToolName {
    ListProjects,
    ProjectStatus,
}

impl ToolName {
    fn function_name(self) -> &'static str {
        match self {
            ToolName::ListProjects => "ListProjects",
            ToolName::ProjectStatus => "GetProjectStatus",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    logging::init(&config.log);
    report_validation(&config)?;

    match cli.command {
        Commands::Serve { bind, port } => serve(config, bind, port).await,
        Commands::Worker => worker(config).await,
        Commands::Tools => print_tools(&config),
        Commands::Call {
            tool,
            project,
            timeout,
        } => call(&config, tool, project, Duration::from_secs(timeout)).await,
    }
}

fn report_validation(config: &Config) -> Result<()> {
    let result = validate_config(config);
    for warning in &result.warnings {
        warn!("{}", warning);
    }
    for issue in &result.errors {
        error!("{}", issue);
    }
    if !result.valid {
        return Err(anyhow!("Invalid configuration ({} error(s))", result.errors.len()));
    }
    Ok(())
}

fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let catalog = Arc::new(Catalog::from_config(&config.catalog)?);
    Ok(default_registry(catalog, &config.queues.names, config.catalog.status_seed))
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        token.cancel();
    });
}

fn start_workers(
    registry: &ToolRegistry,
    transport: Arc<dyn QueueTransport>,
    queues: &QueueConfig,
    shutdown: &CancellationToken,
) -> JoinSet<()> {
    let workers = spawn_workers(registry, transport, WorkerSettings::from(queues), shutdown.clone());
    info!(workers = workers.len(), tools = ?registry.names(), "Tool workers started");
    workers
}

async fn serve(mut config: Config, bind: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let registry = build_registry(&config)?;
    let transport = queue::transport_from_config(&config.queues, &config.credential)?;
    let bridge = AgentBridge::from_config(&config, &registry)?.map(Arc::new);

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());
    let mut workers = start_workers(&registry, transport, &config.queues, &shutdown);

    let state = AppState {
        bridge,
        function_key: config.server.function_key.clone(),
        shutdown: shutdown.clone(),
    };
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    let served = server::serve(state, addr).await;
    shutdown.cancel();
    while workers.join_next().await.is_some() {}

    served?;
    info!("Stopped");
    Ok(())
}

async fn worker(config: Config) -> Result<()> {
    let registry = build_registry(&config)?;
    let transport = queue::transport_from_config(&config.queues, &config.credential)?;

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let mut workers = start_workers(&registry, transport, &config.queues, &shutdown);
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!("Worker task failed: {}", e);
        }
    }

    info!("Stopped");
    Ok(())
}

fn print_tools(config: &Config) -> Result<()> {
    let registry = build_registry(config)?;
    let uri = config.queues.service_uri.as_deref().unwrap_or(EMULATOR_QUEUE_URI);
    println!("{}", serde_json::to_string_pretty(&registry.definitions(uri))?);
    Ok(())
}

async fn call(config: &Config, tool: ToolName, project: Option<String>, timeout: Duration) -> Result<()> {
    let registry = build_registry(config)?;
    let target = registry
        .get(tool.function_name())
        .ok_or_else(|| anyhow!("{} is not registered", tool.function_name()))?;

    let args = match (tool, project) {
        (ToolName::ProjectStatus, Some(project)) => serde_json::json!({ "Project": project }),
        (ToolName::ProjectStatus, None) => return Err(anyhow!("--project is required for project-status")),
        (ToolName::ListProjects, _) => serde_json::json!({}),
    };

    let transport = queue::transport_from_config(&config.queues, &config.credential)?;
    let shutdown = CancellationToken::new();

    // Without a queue service nobody else reads the in-process queues
    let local_workers = match config.queues.service_uri {
        None => Some(start_workers(&registry, Arc::clone(&transport), &config.queues, &shutdown)),
        Some(_) => None,
    };

    let client = QueueRpcClient::new(transport, RpcSettings::default());
    let value = client.call(target.queues(), args, timeout).await;

    shutdown.cancel();
    if let Some(mut workers) = local_workers {
        while workers.join_next().await.is_some() {}
    }

    println!("{}", serde_json::to_string_pretty(&value?)?);
    Ok(())
}
